//! Disparo de scheduled tasks. El frente cron que decide *cuándo* llamar
//! vive fuera del motor; aquí solo se materializa el task de un disparo y
//! se arranca, dejando rastro del último task creado.

use log::{error, info};
use uuid::Uuid;

use func_domain::{ScheduledTask, Task, TaskedObject};

use crate::errors::EngineError;
use crate::messaging::MessageChannel;
use crate::objectstore::ObjectStore;
use crate::repo::OrchestratorStore;

use super::core::TaskEngine;

impl<S: OrchestratorStore, C: MessageChannel, O: ObjectStore> TaskEngine<S, C, O> {
    /// Crea y arranca el task de un disparo del schedule. Devuelve el id del
    /// task creado. Un fallo al crear o arrancar marca el schedule en ERROR
    /// para que deje de parecer sano en el catálogo.
    pub async fn run_scheduled_task(&self, scheduled_task_id: Uuid) -> Result<Uuid, EngineError> {
        let mut scheduled = self.store
                                .scheduled_task(scheduled_task_id)
                                .await?
                                .ok_or_else(|| {
                                    EngineError::not_found("scheduled task", scheduled_task_id)
                                })?;
        let function = self.require_function(scheduled.function_id()).await?;

        if let Err(e) = function.validate_parameters(scheduled.parameters()) {
            self.mark_schedule_error(&mut scheduled, &e.to_string()).await?;
            return Err(EngineError::ParameterResolution(e.to_string()));
        }

        let task = Task::new(scheduled.creator(),
                             scheduled.environment_id(),
                             TaskedObject::Function { function_id: scheduled.function_id() },
                             scheduled.parameters().clone())?;
        let task_id = task.id();
        self.store.insert_task(task).await?;

        scheduled.update_most_recent_task(task_id);
        self.store.update_scheduled_task(scheduled.clone()).await?;
        info!("scheduled task {} fired as task {}", scheduled_task_id, task_id);

        if let Err(e) = self.start_task(task_id).await {
            self.mark_schedule_error(&mut scheduled, &e.to_string()).await?;
            return Err(e);
        }
        Ok(task_id)
    }

    async fn mark_schedule_error(
        &self,
        scheduled: &mut ScheduledTask,
        reason: &str,
    ) -> Result<(), EngineError> {
        error!("scheduled task {} failed to fire: {}", scheduled.id(), reason);
        scheduled.set_error();
        self.store.update_scheduled_task(scheduled.clone()).await?;
        Ok(())
    }
}
