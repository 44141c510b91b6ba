pub mod float_ext;
pub mod grid;
pub mod log_setup;
pub mod parallel;
pub mod ready_gate;

pub use grid::Grid;
pub use ready_gate::ReadyGate;

pub const EPSILON: f64 = 1e-6;

