// Domain layer: the host's file record, remote result types and the two ports.

pub mod model;
pub mod ports;
