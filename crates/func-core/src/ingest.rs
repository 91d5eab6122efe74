//! Consumidor de la cola de resultados.
//!
//! Los runners publican un mensaje por task terminado; este módulo los
//! decodifica y los convierte en llamadas a `record_task_result`. La cola es
//! at-least-once: los duplicados los absorbe el registro idempotente del
//! motor, y un mensaje malformado se registra y se descarta sin tumbar el
//! consumidor.

use std::sync::Arc;

use log::{error, warn};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::constants::{MSG_TYPE_RESULT, TASK_RESULTS_QUEUE};
use crate::engine::TaskEngine;
use crate::errors::EngineError;
use crate::messaging::{Delivery, MessageChannel};
use crate::objectstore::ObjectStore;
use crate::repo::OrchestratorStore;

/// Mensaje que un runner publica al terminar un task. `status` 0 es éxito.
#[derive(Debug, Deserialize)]
pub struct ResultMessage {
    pub task_id: String,
    pub status: i64,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub result: Value,
}

/// Forma textual bajo la que se guarda un resultado: los strings van tal
/// cual, cualquier valor estructurado se guarda como su JSON.
fn normalize_result(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub struct ResultIngestor<S: OrchestratorStore, C: MessageChannel, O: ObjectStore> {
    engine: Arc<TaskEngine<S, C, O>>,
}

impl<S: OrchestratorStore, C: MessageChannel, O: ObjectStore> ResultIngestor<S, C, O> {
    pub fn new(engine: Arc<TaskEngine<S, C, O>>) -> Self {
        ResultIngestor { engine }
    }

    /// Consume la cola de resultados hasta que el canal se cierre.
    pub async fn run(&self) -> Result<(), EngineError> {
        let mut rx = self.engine.channel().subscribe(TASK_RESULTS_QUEUE).await?;
        while let Some(delivery) = rx.recv().await {
            self.handle_delivery(&delivery).await;
        }
        Ok(())
    }

    /// Procesa una entrega. Nunca propaga errores: registrar y descartar es
    /// lo que mantiene vivo al consumidor frente a mensajes basura.
    pub async fn handle_delivery(&self, delivery: &Delivery) {
        if delivery.msg_type != MSG_TYPE_RESULT {
            warn!("ignoring delivery with unexpected type {}", delivery.msg_type);
            return;
        }
        let message: ResultMessage = match serde_json::from_slice(&delivery.payload) {
            Ok(message) => message,
            Err(e) => {
                error!("malformed result message, dropping: {}", e);
                return;
            }
        };
        let task_id = match Uuid::parse_str(&message.task_id) {
            Ok(id) => id,
            Err(e) => {
                error!("result message carries invalid task id {:?}: {}", message.task_id, e);
                return;
            }
        };

        let result = normalize_result(&message.result);
        if let Err(e) = self.engine
                            .record_task_result(task_id, message.status, &message.output, &result)
                            .await
        {
            error!("failed to record result for task {}: {}", task_id, e);
        }
    }
}
