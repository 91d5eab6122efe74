pub mod memory;
pub mod store;

pub use memory::InMemoryOrchestratorStore;
pub use store::{OrchestratorStore, RecordOutcome, StoreError};
