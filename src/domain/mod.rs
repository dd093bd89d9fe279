// Domain layer: core models, pure services and ports (interfaces).
// No I/O here; HTTP and filesystem live in adapters and config.

pub mod model;
pub mod ports;
pub mod services;
