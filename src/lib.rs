//! FuncFlow Rust Library
//!
//! Este crate actúa como el arnés de demo de FuncFlow:
//! - Expone `fixtures` con el catálogo de ejemplo y el runner local ya
//!   cableado, compartidos entre el binario y los tests de integración.
//!
//! Puede usarse desde `main.rs` o por otros crates/clientes.

pub mod fixtures;

#[cfg(test)]
mod tests {
    use func_core::OrchestratorStore;

    use super::fixtures::DemoHarness;

    #[tokio::test]
    async fn harness_seeds_the_catalog() {
        let harness = DemoHarness::new().await.unwrap();
        let workflow = harness
            .engine
            .store()
            .workflow(harness.catalog.workflow_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(workflow.steps().len(), 2);
        let function = harness
            .engine
            .store()
            .function(harness.catalog.greet)
            .await
            .unwrap();
        assert!(function.is_some());
    }
}
