//! Seam de persistencia del orquestador.
//!
//! El almacenamiento durable real es un colaborador externo; el motor solo
//! exige este contrato. Las operaciones compuestas (registrar un resultado,
//! crear el task de un step junto con su vínculo al run) son atómicas: o
//! persiste todo o no persiste nada, porque dos entregas concurrentes del
//! mismo resultado no pueden avanzar un run dos veces.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use func_domain::{
    DomainError, Environment, Function, Package, ScheduledTask, Task, TaskLog, TaskResult,
    TaskStatus, Workflow, WorkflowRun, WorkflowRunStep,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate {kind} {id}")] Duplicate { kind: &'static str, id: Uuid },
    #[error("{kind} {id} not found")] NotFound { kind: &'static str, id: Uuid },
    #[error("task {0} is already linked to a workflow run step")] TaskAlreadyLinked(Uuid),
    #[error("a workflow run already exists for triggering task {0}")] RunAlreadyExists(Uuid),
    #[error(transparent)] Domain(#[from] DomainError),
    #[error("storage backend failure: {0}")] Backend(String),
}

/// Qué pasó al registrar un resultado: o se registró, o el task ya estaba
/// terminal y la entrega duplicada se ignora sin efectos.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Recorded(Task),
    AlreadyTerminal,
}

#[async_trait]
pub trait OrchestratorStore: Send + Sync {
    // catálogo
    async fn insert_environment(&self, environment: Environment) -> Result<(), StoreError>;
    async fn environment(&self, id: Uuid) -> Result<Option<Environment>, StoreError>;
    async fn insert_package(&self, package: Package) -> Result<(), StoreError>;
    async fn package(&self, id: Uuid) -> Result<Option<Package>, StoreError>;
    async fn insert_function(&self, function: Function) -> Result<(), StoreError>;
    async fn function(&self, id: Uuid) -> Result<Option<Function>, StoreError>;
    async fn insert_workflow(&self, workflow: Workflow) -> Result<(), StoreError>;
    async fn workflow(&self, id: Uuid) -> Result<Option<Workflow>, StoreError>;

    // tasks
    async fn insert_task(&self, task: Task) -> Result<(), StoreError>;
    async fn task(&self, id: Uuid) -> Result<Option<Task>, StoreError>;

    /// Aplica una transición de estado respetando la máquina de estados; la
    /// verificación y la escritura ocurren bajo la misma exclusión.
    async fn update_task_status(&self, id: Uuid, status: TaskStatus) -> Result<Task, StoreError>;

    /// Registro atómico del desenlace de un task: log enmascarado, payload
    /// de resultado y estado terminal en una sola operación. Si el task ya
    /// es terminal devuelve [`RecordOutcome::AlreadyTerminal`] sin tocar
    /// nada, que es lo que hace segura la entrega at-least-once.
    async fn record_task_outcome(
        &self,
        id: Uuid,
        status: TaskStatus,
        log: &str,
        result: &str,
    ) -> Result<RecordOutcome, StoreError>;

    async fn task_log(&self, task_id: Uuid) -> Result<Option<TaskLog>, StoreError>;
    async fn task_result(&self, task_id: Uuid) -> Result<Option<TaskResult>, StoreError>;

    // workflow runs
    async fn insert_run(&self, run: WorkflowRun) -> Result<(), StoreError>;
    async fn run(&self, id: Uuid) -> Result<Option<WorkflowRun>, StoreError>;
    async fn run_for_trigger(&self, task_id: Uuid) -> Result<Option<WorkflowRun>, StoreError>;
    async fn update_run_status(&self, id: Uuid, status: TaskStatus)
        -> Result<WorkflowRun, StoreError>;

    /// Crea el task de un step y su vínculo al run como un solo hecho.
    async fn insert_run_step(
        &self,
        run_step: WorkflowRunStep,
        task: Task,
    ) -> Result<(), StoreError>;

    async fn run_step_for_task(&self, task_id: Uuid)
        -> Result<Option<WorkflowRunStep>, StoreError>;

    /// Run steps de un run, en orden de creación.
    async fn run_steps(&self, run_id: Uuid) -> Result<Vec<WorkflowRunStep>, StoreError>;

    // scheduled tasks
    async fn insert_scheduled_task(&self, scheduled: ScheduledTask) -> Result<(), StoreError>;
    async fn scheduled_task(&self, id: Uuid) -> Result<Option<ScheduledTask>, StoreError>;
    async fn update_scheduled_task(&self, scheduled: ScheduledTask) -> Result<(), StoreError>;
}
