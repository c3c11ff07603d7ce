// Domain layer: order/member models and the ports the reconciler talks through.

pub mod model;
pub mod ports;
