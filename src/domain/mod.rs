// Domain layer: cart model, notices and ports. Adapters live in crate::adapters.

pub mod model;
pub mod notice;
pub mod ports;
