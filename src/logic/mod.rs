pub mod calculations;
pub mod cycle;
pub mod engine;
pub mod scheduler;

pub use calculations::WateringAdjustment;
pub use cycle::{CycleReport, WakeCycle};
pub use engine::{DecisionEngine, EngineConfig};
pub use scheduler::{run_cycle, run_until};
