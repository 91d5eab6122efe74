//! Controlador de workflow runs: avance secuencial de pasos, resolución de
//! plantillas contra el contexto del run y cierre del run con propagación
//! del estado terminal al task disparador.

use log::{debug, error, info};
use uuid::Uuid;

use func_domain::{
    Function, Task, TaskStatus, TaskedObject, Workflow, WorkflowRun, WorkflowRunStep, WorkflowStep,
};

use crate::errors::EngineError;
use crate::messaging::MessageChannel;
use crate::objectstore::ObjectStore;
use crate::repo::OrchestratorStore;
use crate::template::{resolve_parameters, ResolutionContext};

use super::core::TaskEngine;

/// Resuelve la plantilla de un paso y valida el documento resultante contra
/// la firma de la función. Cualquier fallo aquí es un fallo de resolución,
/// que aborta el run en lugar de tumbar el proceso.
fn resolve_step_parameters(
    step: &WorkflowStep,
    function: &Function,
    context: &ResolutionContext,
) -> Result<serde_json::Value, EngineError> {
    let resolved = resolve_parameters(step.parameter_template(), context)?;
    function.validate_parameters(&resolved)
            .map_err(|e| EngineError::ParameterResolution(e.to_string()))?;
    Ok(resolved)
}

impl<S: OrchestratorStore, C: MessageChannel, O: ObjectStore> TaskEngine<S, C, O> {
    /// Crea el run de un task disparador de workflow y lanza su primer paso.
    /// El run hereda entorno, creador y parámetros del task.
    pub(crate) async fn start_workflow_run(&self, task: &Task) -> Result<(), EngineError> {
        let workflow_id = match task.tasked_object() {
            TaskedObject::Workflow { workflow_id } => workflow_id,
            other => return Err(EngineError::UnsupportedTaskedObject(other.kind_name())),
        };

        let run = WorkflowRun::new(workflow_id,
                                   task.environment_id(),
                                   task.creator(),
                                   task.parameters().clone(),
                                   task.id())?;
        let run_id = run.id();
        self.store.insert_run(run).await?;
        info!("workflow run {} created for task {}", run_id, task.id());

        self.execute_next_step(run_id).await
    }

    /// Avanza el run al paso con la menor secuencia mayor que la más alta ya
    /// ejecutada. Sin paso siguiente, el run se cierra COMPLETE. Un fallo al
    /// resolver los parámetros del paso cierra el run ERROR.
    pub(crate) async fn execute_next_step(&self, run_id: Uuid) -> Result<(), EngineError> {
        let run = self.require_run(run_id).await?;
        if run.status().is_terminal() {
            debug!("run {} is already terminal, nothing to advance", run_id);
            return Ok(());
        }
        let workflow = self.require_workflow(run.workflow_id()).await?;
        let run_steps = self.store.run_steps(run_id).await?;

        let last_sequence = run_steps.iter()
                                     .filter_map(|rs| workflow.step(rs.workflow_step_id()))
                                     .map(|step| step.sequence())
                                     .max()
                                     .unwrap_or(0);

        let next = match workflow.next_step_after(last_sequence) {
            Some(step) => step,
            None => return self.finish_run(run_id, TaskStatus::Complete).await,
        };

        if run.status() == TaskStatus::Pending {
            self.store.update_run_status(run_id, TaskStatus::InProgress).await?;
        }

        let context = self.build_run_context(&run, &workflow, &run_steps).await?;
        let function = self.require_function(next.function_id()).await?;
        let parameters = match resolve_step_parameters(next, &function, &context) {
            Ok(parameters) => parameters,
            Err(e) => {
                error!("run {} aborted: parameters for step {} did not resolve: {}",
                       run_id,
                       next.name(),
                       e);
                self.finish_run(run_id, TaskStatus::Error).await?;
                return Err(e);
            }
        };

        let task = Task::new(run.creator(),
                             run.environment_id(),
                             TaskedObject::Function { function_id: next.function_id() },
                             parameters)?;
        let task_id = task.id();
        let run_step = WorkflowRunStep::new(run_id, next.id(), task_id);

        // el task del paso y su vínculo al run nacen juntos
        self.store.insert_run_step(run_step, task).await?;
        let task = self.store.update_task_status(task_id, TaskStatus::InProgress).await?;
        info!("run {} step {} started as task {}", run_id, next.name(), task_id);

        self.dispatch_function_task(&task).await
    }

    /// Reacción al desenlace del task de un paso: COMPLETE avanza el run,
    /// ERROR lo aborta. El primer fallo cierra el run entero.
    pub(crate) async fn handle_step_task_finished(
        &self,
        run_step: &WorkflowRunStep,
        task: &Task,
    ) -> Result<(), EngineError> {
        match task.status() {
            TaskStatus::Complete => self.execute_next_step(run_step.workflow_run_id()).await,
            TaskStatus::Error => {
                self.finish_run(run_step.workflow_run_id(), TaskStatus::Error).await
            }
            other => {
                debug!("step task {} reported non-terminal status {}, ignoring", task.id(), other);
                Ok(())
            }
        }
    }

    /// Cierra el run con un estado terminal y copia ese estado al task
    /// disparador. Un run ya terminal se deja como está.
    pub(crate) async fn finish_run(
        &self,
        run_id: Uuid,
        status: TaskStatus,
    ) -> Result<(), EngineError> {
        let run = self.require_run(run_id).await?;
        if run.status().is_terminal() {
            return Ok(());
        }
        // un run sin pasos se cierra sin haber pasado por IN_PROGRESS
        if run.status() == TaskStatus::Pending {
            self.store.update_run_status(run_id, TaskStatus::InProgress).await?;
        }
        let run = self.store.update_run_status(run_id, status).await?;
        info!("workflow run {} finished with status {}", run_id, status);

        if let Some(task) = self.store.task(run.triggering_task_id()).await? {
            if !task.status().is_terminal() {
                self.store.update_task_status(task.id(), status).await?;
            }
        }
        Ok(())
    }

    /// Contexto de resolución del run: sus parámetros más el resultado crudo
    /// de cada paso ya completado, bajo el nombre del paso.
    async fn build_run_context(
        &self,
        run: &WorkflowRun,
        workflow: &Workflow,
        run_steps: &[WorkflowRunStep],
    ) -> Result<ResolutionContext, EngineError> {
        let mut context = ResolutionContext::new();
        context.insert_parameters(run.parameters());

        for run_step in run_steps {
            let step = match workflow.step(run_step.workflow_step_id()) {
                Some(step) => step,
                None => continue,
            };
            if let Some(task) = self.store.task(run_step.task_id()).await? {
                if task.status() == TaskStatus::Complete {
                    if let Some(raw) = task.raw_result() {
                        context.insert_step_result(step.name(), raw);
                    }
                }
            }
        }
        Ok(context)
    }
}
