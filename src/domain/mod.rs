// Domain layer: models and ports (interfaces) for the remote backend.

pub mod model;
pub mod ports;
