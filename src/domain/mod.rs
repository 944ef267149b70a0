// Domain layer: request/response models, quarters and ports. No I/O.

pub mod model;
pub mod ports;
pub mod quarter;
