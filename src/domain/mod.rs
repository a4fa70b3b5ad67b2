// Domain layer: core models and ports. No dependencies on the concrete
// stage implementations.

pub mod model;
pub mod ports;
