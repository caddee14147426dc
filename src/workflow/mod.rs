pub mod branch;
pub mod engine;
pub mod stages;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{EngineSettings, WorkflowEngine};
pub use types::{Stage, WorkflowFailure, WorkflowState};
