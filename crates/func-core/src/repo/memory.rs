//! Store in-memory: el doble de pruebas y el backend del binario demo.
//!
//! Todo el estado vive bajo un único mutex, así las operaciones compuestas
//! del contrato son atómicas de verdad y no solo por convención.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use func_domain::{
    DomainError, Environment, Function, Package, ScheduledTask, Task, TaskLog, TaskResult,
    TaskStatus, Workflow, WorkflowRun, WorkflowRunStep,
};

use super::store::{OrchestratorStore, RecordOutcome, StoreError};

#[derive(Default)]
struct StoreInner {
    environments: HashMap<Uuid, Environment>,
    packages: HashMap<Uuid, Package>,
    functions: HashMap<Uuid, Function>,
    workflows: HashMap<Uuid, Workflow>,
    scheduled_tasks: HashMap<Uuid, ScheduledTask>,
    tasks: HashMap<Uuid, Task>,
    task_logs: HashMap<Uuid, TaskLog>,
    task_results: HashMap<Uuid, TaskResult>,
    runs: HashMap<Uuid, WorkflowRun>,
    runs_by_trigger: HashMap<Uuid, Uuid>,
    run_steps: HashMap<Uuid, WorkflowRunStep>,
    run_steps_by_task: HashMap<Uuid, Uuid>,
    run_step_order: HashMap<Uuid, Vec<Uuid>>,
}

#[derive(Default)]
pub struct InMemoryOrchestratorStore {
    inner: Mutex<StoreInner>,
}

impl InMemoryOrchestratorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrchestratorStore for InMemoryOrchestratorStore {
    async fn insert_environment(&self, environment: Environment) -> Result<(), StoreError> {
        let mut g = self.inner.lock().await;
        let id = environment.id();
        if g.environments.contains_key(&id) {
            return Err(StoreError::Duplicate { kind: "environment", id });
        }
        g.environments.insert(id, environment);
        Ok(())
    }

    async fn environment(&self, id: Uuid) -> Result<Option<Environment>, StoreError> {
        Ok(self.inner.lock().await.environments.get(&id).cloned())
    }

    async fn insert_package(&self, package: Package) -> Result<(), StoreError> {
        let mut g = self.inner.lock().await;
        let id = package.id();
        if g.packages.contains_key(&id) {
            return Err(StoreError::Duplicate { kind: "package", id });
        }
        g.packages.insert(id, package);
        Ok(())
    }

    async fn package(&self, id: Uuid) -> Result<Option<Package>, StoreError> {
        Ok(self.inner.lock().await.packages.get(&id).cloned())
    }

    async fn insert_function(&self, function: Function) -> Result<(), StoreError> {
        let mut g = self.inner.lock().await;
        let id = function.id();
        if g.functions.contains_key(&id) {
            return Err(StoreError::Duplicate { kind: "function", id });
        }
        g.functions.insert(id, function);
        Ok(())
    }

    async fn function(&self, id: Uuid) -> Result<Option<Function>, StoreError> {
        Ok(self.inner.lock().await.functions.get(&id).cloned())
    }

    async fn insert_workflow(&self, workflow: Workflow) -> Result<(), StoreError> {
        let mut g = self.inner.lock().await;
        let id = workflow.id();
        if g.workflows.contains_key(&id) {
            return Err(StoreError::Duplicate { kind: "workflow", id });
        }
        g.workflows.insert(id, workflow);
        Ok(())
    }

    async fn workflow(&self, id: Uuid) -> Result<Option<Workflow>, StoreError> {
        Ok(self.inner.lock().await.workflows.get(&id).cloned())
    }

    async fn insert_task(&self, task: Task) -> Result<(), StoreError> {
        let mut g = self.inner.lock().await;
        let id = task.id();
        if g.tasks.contains_key(&id) {
            return Err(StoreError::Duplicate { kind: "task", id });
        }
        g.tasks.insert(id, task);
        Ok(())
    }

    async fn task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(self.inner.lock().await.tasks.get(&id).cloned())
    }

    async fn update_task_status(&self, id: Uuid, status: TaskStatus) -> Result<Task, StoreError> {
        let mut g = self.inner.lock().await;
        let task = g
            .tasks
            .get_mut(&id)
            .ok_or(StoreError::NotFound { kind: "task", id })?;
        task.transition_to(status)?;
        Ok(task.clone())
    }

    async fn record_task_outcome(
        &self,
        id: Uuid,
        status: TaskStatus,
        log: &str,
        result: &str,
    ) -> Result<RecordOutcome, StoreError> {
        if !status.is_terminal() {
            return Err(StoreError::Domain(DomainError::Validation(
                "el desenlace de un task debe ser un estado terminal".to_string(),
            )));
        }
        let mut g = self.inner.lock().await;
        let task = g
            .tasks
            .get_mut(&id)
            .ok_or(StoreError::NotFound { kind: "task", id })?;
        if task.status().is_terminal() {
            return Ok(RecordOutcome::AlreadyTerminal);
        }
        task.transition_to(status)?;
        task.set_raw_result(result);
        let snapshot = task.clone();
        g.task_logs.insert(id, TaskLog::new(id, log));
        g.task_results.insert(id, TaskResult::new(id, result));
        Ok(RecordOutcome::Recorded(snapshot))
    }

    async fn task_log(&self, task_id: Uuid) -> Result<Option<TaskLog>, StoreError> {
        Ok(self.inner.lock().await.task_logs.get(&task_id).cloned())
    }

    async fn task_result(&self, task_id: Uuid) -> Result<Option<TaskResult>, StoreError> {
        Ok(self.inner.lock().await.task_results.get(&task_id).cloned())
    }

    async fn insert_run(&self, run: WorkflowRun) -> Result<(), StoreError> {
        let mut g = self.inner.lock().await;
        let id = run.id();
        let trigger = run.triggering_task_id();
        if g.runs.contains_key(&id) {
            return Err(StoreError::Duplicate { kind: "workflow run", id });
        }
        if g.runs_by_trigger.contains_key(&trigger) {
            return Err(StoreError::RunAlreadyExists(trigger));
        }
        g.runs_by_trigger.insert(trigger, id);
        g.runs.insert(id, run);
        Ok(())
    }

    async fn run(&self, id: Uuid) -> Result<Option<WorkflowRun>, StoreError> {
        Ok(self.inner.lock().await.runs.get(&id).cloned())
    }

    async fn run_for_trigger(&self, task_id: Uuid) -> Result<Option<WorkflowRun>, StoreError> {
        let g = self.inner.lock().await;
        Ok(g.runs_by_trigger.get(&task_id).and_then(|id| g.runs.get(id)).cloned())
    }

    async fn update_run_status(
        &self,
        id: Uuid,
        status: TaskStatus,
    ) -> Result<WorkflowRun, StoreError> {
        let mut g = self.inner.lock().await;
        let run = g
            .runs
            .get_mut(&id)
            .ok_or(StoreError::NotFound { kind: "workflow run", id })?;
        run.transition_to(status)?;
        Ok(run.clone())
    }

    async fn insert_run_step(
        &self,
        run_step: WorkflowRunStep,
        task: Task,
    ) -> Result<(), StoreError> {
        let mut g = self.inner.lock().await;
        let run_id = run_step.workflow_run_id();
        let task_id = task.id();
        if !g.runs.contains_key(&run_id) {
            return Err(StoreError::NotFound { kind: "workflow run", id: run_id });
        }
        if g.tasks.contains_key(&task_id) {
            return Err(StoreError::Duplicate { kind: "task", id: task_id });
        }
        if g.run_steps_by_task.contains_key(&task_id) {
            return Err(StoreError::TaskAlreadyLinked(task_id));
        }
        g.tasks.insert(task_id, task);
        g.run_steps_by_task.insert(task_id, run_step.id());
        g.run_step_order.entry(run_id).or_default().push(run_step.id());
        g.run_steps.insert(run_step.id(), run_step);
        Ok(())
    }

    async fn run_step_for_task(
        &self,
        task_id: Uuid,
    ) -> Result<Option<WorkflowRunStep>, StoreError> {
        let g = self.inner.lock().await;
        Ok(g.run_steps_by_task.get(&task_id).and_then(|id| g.run_steps.get(id)).copied())
    }

    async fn run_steps(&self, run_id: Uuid) -> Result<Vec<WorkflowRunStep>, StoreError> {
        let g = self.inner.lock().await;
        let ids = g.run_step_order.get(&run_id).cloned().unwrap_or_default();
        Ok(ids.iter().filter_map(|id| g.run_steps.get(id)).copied().collect())
    }

    async fn insert_scheduled_task(&self, scheduled: ScheduledTask) -> Result<(), StoreError> {
        let mut g = self.inner.lock().await;
        let id = scheduled.id();
        if g.scheduled_tasks.contains_key(&id) {
            return Err(StoreError::Duplicate { kind: "scheduled task", id });
        }
        g.scheduled_tasks.insert(id, scheduled);
        Ok(())
    }

    async fn scheduled_task(&self, id: Uuid) -> Result<Option<ScheduledTask>, StoreError> {
        Ok(self.inner.lock().await.scheduled_tasks.get(&id).cloned())
    }

    async fn update_scheduled_task(&self, scheduled: ScheduledTask) -> Result<(), StoreError> {
        let mut g = self.inner.lock().await;
        let id = scheduled.id();
        if !g.scheduled_tasks.contains_key(&id) {
            return Err(StoreError::NotFound { kind: "scheduled task", id });
        }
        g.scheduled_tasks.insert(id, scheduled);
        Ok(())
    }
}
