// Domain layer: order/report models and the ports to the outside world.

pub mod model;
pub mod ports;
