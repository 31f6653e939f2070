// Domain layer: aggregates, value types and ports. No I/O.

pub mod inspection;
pub mod mint;
pub mod ports;
pub mod scope;
