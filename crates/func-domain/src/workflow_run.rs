//! WorkflowRun: una ejecución concreta de un workflow, disparada por un
//! task cuyo objeto es el workflow. El run y su task disparador comparten
//! ciclo de vida: el estado terminal del run se copia al task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::status::TaskStatus;
use crate::DomainError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    id: Uuid,
    workflow_id: Uuid,
    environment_id: Uuid,
    creator: String,
    status: TaskStatus,
    parameters: Value,
    triggering_task_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl WorkflowRun {
    pub fn new(
        workflow_id: Uuid,
        environment_id: Uuid,
        creator: &str,
        parameters: Value,
        triggering_task_id: Uuid,
    ) -> Result<Self, DomainError> {
        if !parameters.is_object() {
            return Err(DomainError::Validation(
                "los parámetros de un run deben ser un objeto JSON".to_string(),
            ));
        }
        let now = Utc::now();
        Ok(WorkflowRun {
            id: Uuid::new_v4(),
            workflow_id,
            environment_id,
            creator: creator.to_string(),
            status: TaskStatus::Pending,
            parameters,
            triggering_task_id,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn workflow_id(&self) -> Uuid {
        self.workflow_id
    }
    pub fn environment_id(&self) -> Uuid {
        self.environment_id
    }
    pub fn creator(&self) -> &str {
        &self.creator
    }
    pub fn status(&self) -> TaskStatus {
        self.status
    }
    pub fn parameters(&self) -> &Value {
        &self.parameters
    }
    pub fn triggering_task_id(&self) -> Uuid {
        self.triggering_task_id
    }
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Misma máquina de estados que un task.
    pub fn transition_to(&mut self, next: TaskStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Vínculo entre un run, el step de la definición y el task concreto que se
/// creó para ejecutarlo. Un task pertenece a lo sumo a un run step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRunStep {
    id: Uuid,
    workflow_run_id: Uuid,
    workflow_step_id: Uuid,
    task_id: Uuid,
}

impl WorkflowRunStep {
    pub fn new(workflow_run_id: Uuid, workflow_step_id: Uuid, task_id: Uuid) -> Self {
        WorkflowRunStep {
            id: Uuid::new_v4(),
            workflow_run_id,
            workflow_step_id,
            task_id,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn workflow_run_id(&self) -> Uuid {
        self.workflow_run_id
    }
    pub fn workflow_step_id(&self) -> Uuid {
        self.workflow_step_id
    }
    pub fn task_id(&self) -> Uuid {
        self.task_id
    }
}

#[cfg(test)]
mod tests {
    use super::WorkflowRun;
    use crate::status::TaskStatus;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn run_lifecycle_matches_task_lifecycle() {
        let mut run = WorkflowRun::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "admin",
            json!({}),
            Uuid::new_v4(),
        )
        .unwrap();
        assert_eq!(run.status(), TaskStatus::Pending);
        run.transition_to(TaskStatus::InProgress).unwrap();
        run.transition_to(TaskStatus::Error).unwrap();
        assert!(run.transition_to(TaskStatus::Complete).is_err());
    }
}
