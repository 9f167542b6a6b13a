// Static checks applied to every SQL text before it reaches the engine.
pub mod cost;
pub mod safety;

pub use cost::{CostReport, CostSignal, CostWarning};
pub use safety::SafetyVerdict;
