//! Task: la unidad atómica de trabajo. Una invocación concreta de una
//! función (o el disparo de un workflow) con parámetros resueltos, seguida
//! a través de su máquina de estados.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::function::ReturnType;
use crate::status::TaskStatus;
use crate::DomainError;

/// Referencia polimórfica al objeto que el Task ejecuta. Unión cerrada:
/// agregar una variante nueva no toca la máquina de estados.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TaskedObject {
    Function { function_id: Uuid },
    Workflow { workflow_id: Uuid },
}

impl TaskedObject {
    pub fn kind_name(&self) -> &'static str {
        match self {
            TaskedObject::Function { .. } => "function",
            TaskedObject::Workflow { .. } => "workflow",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    id: Uuid,
    environment_id: Uuid,
    creator: String,
    tasked_object: TaskedObject,
    parameters: Value,
    status: TaskStatus,
    raw_result: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(
        creator: &str,
        environment_id: Uuid,
        tasked_object: TaskedObject,
        parameters: Value,
    ) -> Result<Self, DomainError> {
        if !parameters.is_object() {
            return Err(DomainError::Validation(
                "los parámetros de un task deben ser un objeto JSON".to_string(),
            ));
        }
        let now = Utc::now();
        Ok(Task {
            id: Uuid::new_v4(),
            environment_id,
            creator: creator.to_string(),
            tasked_object,
            parameters,
            status: TaskStatus::Pending,
            raw_result: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn environment_id(&self) -> Uuid {
        self.environment_id
    }
    pub fn creator(&self) -> &str {
        &self.creator
    }
    pub fn tasked_object(&self) -> TaskedObject {
        self.tasked_object
    }
    pub fn parameters(&self) -> &Value {
        &self.parameters
    }
    pub fn status(&self) -> TaskStatus {
        self.status
    }
    pub fn raw_result(&self) -> Option<&str> {
        self.raw_result.as_deref()
    }
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Avanza la máquina de estados. Solo las aristas de
    /// [`TaskStatus::can_transition_to`] están permitidas.
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

    /// Texto crudo del resultado, tal como lo reportó el runner.
    pub fn set_raw_result(&mut self, raw: &str) {
        self.raw_result = Some(raw.to_string());
        self.updated_at = Utc::now();
    }
}

/// Salida de ejecución del runner asociada a un task, ya enmascarada.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLog {
    task_id: Uuid,
    log: String,
    created_at: DateTime<Utc>,
}

impl TaskLog {
    pub fn new(task_id: Uuid, log: &str) -> Self {
        TaskLog {
            task_id,
            log: log.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn task_id(&self) -> Uuid {
        self.task_id
    }
    pub fn log(&self) -> &str {
        &self.log
    }
}

/// Resultado opaco reportado por el runner, en su forma de texto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    task_id: Uuid,
    result: String,
    created_at: DateTime<Utc>,
}

impl TaskResult {
    pub fn new(task_id: Uuid, result: &str) -> Self {
        TaskResult {
            task_id,
            result: result.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn task_id(&self) -> Uuid {
        self.task_id
    }
    pub fn result(&self) -> &str {
        &self.result
    }

    /// Vista tipada del resultado según el `return_type` declarado por la
    /// función destino.
    pub fn as_value(&self, return_type: ReturnType) -> Result<Value, DomainError> {
        match return_type {
            ReturnType::Json => Ok(serde_json::from_str(&self.result)?),
            ReturnType::String => Ok(Value::String(self.result.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Task, TaskResult, TaskedObject};
    use crate::function::ReturnType;
    use crate::status::TaskStatus;
    use crate::DomainError;
    use serde_json::json;
    use uuid::Uuid;

    fn pending_task() -> Task {
        Task::new(
            "admin",
            Uuid::new_v4(),
            TaskedObject::Function { function_id: Uuid::new_v4() },
            json!({"a": 1}),
        )
        .unwrap()
    }

    #[test]
    fn new_task_starts_pending() {
        let t = pending_task();
        assert_eq!(t.status(), TaskStatus::Pending);
        assert!(t.raw_result().is_none());
    }

    #[test]
    fn rejects_non_object_parameters() {
        let r = Task::new(
            "admin",
            Uuid::new_v4(),
            TaskedObject::Function { function_id: Uuid::new_v4() },
            json!([1, 2, 3]),
        );
        assert!(matches!(r, Err(DomainError::Validation(_))));
    }

    #[test]
    fn transition_enforces_lifecycle() {
        let mut t = pending_task();
        t.transition_to(TaskStatus::InProgress).unwrap();
        t.transition_to(TaskStatus::Complete).unwrap();
        let err = t.transition_to(TaskStatus::Pending).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition { from: TaskStatus::Complete, to: TaskStatus::Pending }
        );
    }

    #[test]
    fn result_view_follows_return_type() {
        let r = TaskResult::new(Uuid::new_v4(), "{\"a\": 1}");
        assert_eq!(r.as_value(ReturnType::Json).unwrap(), json!({"a": 1}));
        assert_eq!(r.as_value(ReturnType::String).unwrap(), json!("{\"a\": 1}"));
        let bad = TaskResult::new(Uuid::new_v4(), "not json");
        assert!(bad.as_value(ReturnType::Json).is_err());
    }
}
