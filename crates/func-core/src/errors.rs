//! Errores específicos del motor de orquestación.

use thiserror::Error;
use uuid::Uuid;

use func_domain::{DomainError, TaskStatus};

use crate::messaging::ChannelError;
use crate::repo::StoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("task {id} with status {status} cannot be started")] InvalidTaskState { id: Uuid, status: TaskStatus },
    #[error("task references an object kind the engine cannot start: {0}")] UnsupportedTaskedObject(&'static str),
    #[error("dispatch failed after {attempts} attempts: {reason}")] Dispatch { attempts: u32, reason: String },
    #[error("parameter resolution failed: {0}")] ParameterResolution(String),
    #[error("broker unavailable: {0}")] BrokerUnavailable(String),
    #[error("{kind} {id} not found")] NotFound { kind: &'static str, id: Uuid },
    #[error(transparent)] Domain(#[from] DomainError),
    #[error(transparent)] Store(#[from] StoreError),
    #[error(transparent)] Channel(#[from] ChannelError),
}

impl EngineError {
    pub fn not_found(kind: &'static str, id: Uuid) -> Self {
        EngineError::NotFound { kind, id }
    }
}
