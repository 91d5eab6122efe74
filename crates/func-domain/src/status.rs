use std::fmt;

use serde::{Deserialize, Serialize};

/// Estado de un Task (y de un WorkflowRun) en tiempo de ejecución.
///
/// Las transiciones válidas son:
/// - `Pending` -> `InProgress`
/// - `InProgress` -> `Complete`
/// - `InProgress` -> `Error`
///
/// No se permiten reversiones ni saltos arbitrarios entre estados.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Creado, todavía sin despachar.
    Pending,
    /// Despachado al runner, esperando resultado.
    InProgress,
    /// Terminó con éxito.
    Complete,
    /// Terminó con fallo.
    Error,
}

impl TaskStatus {
    /// Un estado terminal ya no admite transiciones.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Complete | TaskStatus::Error)
    }

    /// Codifica exactamente las tres aristas legales del ciclo de vida.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::InProgress)
                | (TaskStatus::InProgress, TaskStatus::Complete)
                | (TaskStatus::InProgress, TaskStatus::Error)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Complete => "COMPLETE",
            TaskStatus::Error => "ERROR",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::TaskStatus;

    #[test]
    fn forward_edges_only() {
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::InProgress));
        assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::Complete));
        assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::Error));

        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Complete));
        assert!(!TaskStatus::Complete.can_transition_to(TaskStatus::Pending));
        assert!(!TaskStatus::Error.can_transition_to(TaskStatus::InProgress));
        assert!(!TaskStatus::InProgress.can_transition_to(TaskStatus::Pending));
    }

    #[test]
    fn terminal_states() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
        assert!(TaskStatus::Complete.is_terminal());
        assert!(TaskStatus::Error.is_terminal());
    }

    #[test]
    fn wire_form_is_screaming_snake_case() {
        let s = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(s, "\"IN_PROGRESS\"");
        let back: TaskStatus = serde_json::from_str("\"COMPLETE\"").unwrap();
        assert_eq!(back, TaskStatus::Complete);
    }
}
