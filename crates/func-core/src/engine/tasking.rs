//! Operaciones sobre tasks individuales: arranque, despacho hacia los
//! runners y registro del resultado que vuelve por la cola de resultados.

use log::{debug, error, info};
use uuid::Uuid;

use func_domain::{Environment, Task, TaskStatus, TaskedObject};

use crate::constants::OUTPUT_MASK;
use crate::errors::EngineError;
use crate::messaging::MessageChannel;
use crate::objectstore::ObjectStore;
use crate::repo::{OrchestratorStore, RecordOutcome};

use super::core::TaskEngine;

/// Enmascara en `output` el valor de cada variable protegida del entorno.
///
/// Valores de hasta 4 caracteres se dejan intactos: enmascararlos revelaría
/// más de lo que oculta, porque strings tan cortos aparecen por todas partes.
pub fn mask_protected_output(output: &str, environment: &Environment) -> String {
    let mut masked = output.to_string();
    for variable in environment.protected_variables() {
        if variable.value().len() > 4 {
            masked = masked.replace(variable.value(), OUTPUT_MASK);
        }
    }
    masked
}

impl<S: OrchestratorStore, C: MessageChannel, O: ObjectStore> TaskEngine<S, C, O> {
    /// Inserta un task nuevo y lo arranca inmediatamente.
    pub async fn submit_task(&self, task: Task) -> Result<Uuid, EngineError> {
        let id = task.id();
        self.store.insert_task(task).await?;
        self.start_task(id).await?;
        Ok(id)
    }

    /// Arranca un task PENDING: lo pasa a IN_PROGRESS y lo entrega según el
    /// tipo de objeto que envuelve. Un task en cualquier otro estado es un
    /// error del llamador, no un reintento silencioso.
    pub async fn start_task(&self, task_id: Uuid) -> Result<(), EngineError> {
        let task = self.require_task(task_id).await?;
        if task.status() != TaskStatus::Pending {
            return Err(EngineError::InvalidTaskState { id: task_id, status: task.status() });
        }

        let task = self.store.update_task_status(task_id, TaskStatus::InProgress).await?;
        info!("task {} started ({})", task_id, task.tasked_object().kind_name());

        match task.tasked_object() {
            TaskedObject::Function { .. } => self.dispatch_function_task(&task).await,
            TaskedObject::Workflow { .. } => self.start_workflow_run(&task).await,
        }
    }

    /// Construye el mensaje de ejecución y lo publica hacia el pool de
    /// runners. El task ya está IN_PROGRESS; si la publicación agota sus
    /// reintentos se queda así, visible para operación, y el error sube.
    pub(crate) async fn dispatch_function_task(&self, task: &Task) -> Result<(), EngineError> {
        let function_id = match task.tasked_object() {
            TaskedObject::Function { function_id } => function_id,
            other => return Err(EngineError::UnsupportedTaskedObject(other.kind_name())),
        };

        let function = self.require_function(function_id).await?;
        let package = self.require_package(function.package_id()).await?;
        let environment = self.require_environment(task.environment_id()).await?;

        let message = self.dispatcher
                          .build_message(task, &function, &package, &environment)
                          .await?;

        if let Err(e) = self.dispatcher.publish_task(task, &message).await {
            error!("task {} left in progress after failed dispatch: {}", task.id(), e);
            return Err(e);
        }
        Ok(())
    }

    /// Registra el desenlace de un task a partir de un mensaje de resultado.
    ///
    /// `status_code` 0 significa éxito; cualquier otro valor, fallo. Entregas
    /// para tasks desconocidos o ya terminales se descartan sin error: la
    /// cola de resultados es at-least-once y los duplicados son esperables.
    pub async fn record_task_result(
        &self,
        task_id: Uuid,
        status_code: i64,
        output: &str,
        result: &str,
    ) -> Result<(), EngineError> {
        let task = match self.store.task(task_id).await? {
            Some(task) => task,
            None => {
                error!("result received for unknown task {}, dropping", task_id);
                return Ok(());
            }
        };
        if task.status().is_terminal() {
            debug!("result received for already terminal task {}, dropping", task_id);
            return Ok(());
        }

        let environment = self.require_environment(task.environment_id()).await?;
        let masked = mask_protected_output(output, &environment);

        let status = if status_code == 0 { TaskStatus::Complete } else { TaskStatus::Error };

        let task = match self.store
                             .record_task_outcome(task_id, status, &masked, result)
                             .await?
        {
            RecordOutcome::Recorded(task) => task,
            RecordOutcome::AlreadyTerminal => {
                debug!("result for task {} lost the race, already terminal", task_id);
                return Ok(());
            }
        };
        info!("task {} finished with status {}", task_id, status);

        // Si el task pertenece a un run, su desenlace avanza (o aborta) el run.
        if let Some(run_step) = self.store.run_step_for_task(task_id).await? {
            self.handle_step_task_finished(&run_step, &task).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::mask_protected_output;
    use func_domain::{Environment, Variable};

    fn environment_with(vars: &[(&str, &str, bool)]) -> Environment {
        let mut environment = Environment::new("staging").unwrap();
        for (name, value, protect) in vars {
            environment.add_variable(Variable::new(name, value, *protect).unwrap()).unwrap();
        }
        environment
    }

    #[test]
    fn masks_every_occurrence_of_a_protected_value() {
        let environment = environment_with(&[("TOKEN", "abcde", true)]);
        let masked = mask_protected_output("pre abcde mid abcde post", &environment);
        assert_eq!(masked, "pre ******** mid ******** post");
    }

    #[test]
    fn short_values_are_left_alone() {
        // cuatro caracteres o menos no se enmascaran
        let environment = environment_with(&[("PIN", "abcd", true)]);
        assert_eq!(mask_protected_output("clave abcd usada", &environment), "clave abcd usada");
    }

    #[test]
    fn five_character_values_are_masked() {
        let environment = environment_with(&[("PIN", "abcde", true)]);
        assert_eq!(mask_protected_output("clave abcde usada", &environment), "clave ******** usada");
    }

    #[test]
    fn unprotected_values_are_never_masked() {
        let environment = environment_with(&[("REGION", "eu-west-1", false)]);
        assert_eq!(
            mask_protected_output("desplegado en eu-west-1", &environment),
            "desplegado en eu-west-1"
        );
    }

    #[test]
    fn multiple_protected_variables_all_apply() {
        let environment =
            environment_with(&[("A", "primero", true), ("B", "segundo", true)]);
        assert_eq!(
            mask_protected_output("primero y segundo", &environment),
            "******** y ********"
        );
    }
}
