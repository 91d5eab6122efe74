use thiserror::Error;

use crate::status::TaskStatus;

/// Error de dominio: toda construcción o mutación inválida de una entidad
/// termina aquí, nunca en un panic.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DomainError {
    #[error("Validación fallida: {0}")]
    Validation(String),

    #[error("Transición de estado inválida: {from} -> {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    #[error("Nombre de step inválido: {0}")]
    InvalidStepName(String),

    #[error("Nombre de step duplicado: {0}")]
    DuplicateStepName(String),

    #[error("Secuencia de step duplicada: {0}")]
    DuplicateSequence(u32),

    #[error("Nombre de variable inválido: {0}")]
    InvalidVariableName(String),

    #[error("Variable duplicada: {0}")]
    DuplicateVariable(String),

    #[error("Expresión cron inválida: {0}")]
    InvalidSchedule(String),

    #[error("Error de serialización: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::Serialization(e.to_string())
    }
}
