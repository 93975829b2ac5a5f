// Domain layer - Plain data types, no I/O
pub mod geo;
pub mod telemetry;
pub mod trip;
pub mod vehicle;
