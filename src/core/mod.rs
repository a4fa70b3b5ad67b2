pub mod charts;
pub mod engine;
pub mod loader;
pub mod pipeline;
pub mod processor;
pub mod reporter;
pub mod validator;

pub use crate::domain::model::{Record, Table};
pub use crate::domain::ports::Pipeline;
pub use crate::utils::error::Result;
