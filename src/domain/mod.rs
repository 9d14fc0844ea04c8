// Domain layer: records, the tabular output model and ports (interfaces).

pub mod model;
pub mod ports;
pub mod table;
