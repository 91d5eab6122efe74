//! Núcleo del TaskEngine: la estructura, sus colaboradores y los accesos
//! comunes al catálogo. Las operaciones viven en `tasking`, `runs` y
//! `scheduling`, todas sobre esta misma estructura.

use std::sync::Arc;

use uuid::Uuid;

use func_domain::{Environment, Function, Package, Task, Workflow, WorkflowRun};

use crate::config::EngineConfig;
use crate::dispatch::Dispatcher;
use crate::errors::EngineError;
use crate::messaging::{task_topology, InMemoryChannel, MessageChannel};
use crate::objectstore::{InMemoryObjectStore, ObjectStore};
use crate::repo::{InMemoryOrchestratorStore, OrchestratorStore};

use super::builder::TaskEngineBuilder;

pub struct TaskEngine<S: OrchestratorStore, C: MessageChannel, O: ObjectStore> {
    pub(crate) store: Arc<S>,
    pub(crate) channel: Arc<C>,
    pub(crate) dispatcher: Dispatcher<C, O>,
    pub(crate) config: EngineConfig,
}

impl TaskEngine<InMemoryOrchestratorStore, InMemoryChannel, InMemoryObjectStore> {
    /// Motor completamente in-memory, listo para tests y para el binario
    /// demo.
    pub fn in_memory() -> Self {
        TaskEngineBuilder::new(
            Arc::new(InMemoryOrchestratorStore::new()),
            Arc::new(InMemoryChannel::new()),
            Arc::new(InMemoryObjectStore::new()),
        )
        .build()
    }
}

impl<S: OrchestratorStore, C: MessageChannel, O: ObjectStore> TaskEngine<S, C, O> {
    pub fn builder(store: Arc<S>, channel: Arc<C>, objects: Arc<O>) -> TaskEngineBuilder<S, C, O> {
        TaskEngineBuilder::new(store, channel, objects)
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn channel(&self) -> &Arc<C> {
        &self.channel
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Declara la topología estándar de tasking en el canal.
    pub async fn declare_topology(&self) -> Result<(), EngineError> {
        self.channel.declare_topology(&task_topology()).await?;
        Ok(())
    }

    pub(crate) async fn require_task(&self, id: Uuid) -> Result<Task, EngineError> {
        self.store
            .task(id)
            .await?
            .ok_or_else(|| EngineError::not_found("task", id))
    }

    pub(crate) async fn require_function(&self, id: Uuid) -> Result<Function, EngineError> {
        self.store
            .function(id)
            .await?
            .ok_or_else(|| EngineError::not_found("function", id))
    }

    pub(crate) async fn require_package(&self, id: Uuid) -> Result<Package, EngineError> {
        self.store
            .package(id)
            .await?
            .ok_or_else(|| EngineError::not_found("package", id))
    }

    pub(crate) async fn require_environment(&self, id: Uuid) -> Result<Environment, EngineError> {
        self.store
            .environment(id)
            .await?
            .ok_or_else(|| EngineError::not_found("environment", id))
    }

    pub(crate) async fn require_workflow(&self, id: Uuid) -> Result<Workflow, EngineError> {
        self.store
            .workflow(id)
            .await?
            .ok_or_else(|| EngineError::not_found("workflow", id))
    }

    pub(crate) async fn require_run(&self, id: Uuid) -> Result<WorkflowRun, EngineError> {
        self.store
            .run(id)
            .await?
            .ok_or_else(|| EngineError::not_found("workflow run", id))
    }
}
