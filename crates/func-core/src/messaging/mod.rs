//! Canal de mensajes hacia los runners.
//!
//! El motor nunca habla con un broker global ambiente: recibe un
//! [`MessageChannel`] construido explícitamente, así el core se testea con
//! el canal in-memory sin levantar infraestructura. La implementación
//! in-memory vive acá mismo, al lado del trait.

mod memory;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use func_domain::Task;

use crate::constants::{DEFAULT_EXCHANGE, PUBLIC_EXCHANGE, PUBLIC_QUEUE, TASK_RESULTS_QUEUE};

pub use memory::InMemoryChannel;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ChannelError {
    #[error("message could not be routed to any queue")] Unroutable,
    #[error("channel unavailable: {0}")] Unavailable(String),
    #[error("unknown queue: {0}")] UnknownQueue(String),
    #[error("payload serialization failed: {0}")] Serialization(String),
}

/// Entrega pendiente de consumo: el header de tipo y el cuerpo crudo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub msg_type: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub exchange: String,
    pub queue: String,
    pub routing_key: String,
}

/// Topología declarable en el broker: exchanges, colas y sus ligaduras.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    pub exchanges: Vec<String>,
    pub queues: Vec<String>,
    pub bindings: Vec<Binding>,
}

/// Destino de publicación de un task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub exchange: String,
    pub routing_key: String,
}

/// Función pura de ruteo. Hoy todo task va al pool público; cuando exista
/// más de un pool, la decisión sale del contenido del task y nada más.
pub fn route(_task: &Task) -> Route {
    Route {
        exchange: PUBLIC_EXCHANGE.to_string(),
        routing_key: PUBLIC_QUEUE.to_string(),
    }
}

/// Topología estándar del protocolo de tasking: el exchange del pool
/// público con su cola, más la cola de resultados colgada del exchange por
/// defecto para que los runners publiquen directo por nombre.
pub fn task_topology() -> Topology {
    Topology {
        exchanges: vec![PUBLIC_EXCHANGE.to_string()],
        queues: vec![PUBLIC_QUEUE.to_string(), TASK_RESULTS_QUEUE.to_string()],
        bindings: vec![
            Binding {
                exchange: PUBLIC_EXCHANGE.to_string(),
                queue: PUBLIC_QUEUE.to_string(),
                routing_key: PUBLIC_QUEUE.to_string(),
            },
            Binding {
                exchange: DEFAULT_EXCHANGE.to_string(),
                queue: TASK_RESULTS_QUEUE.to_string(),
                routing_key: TASK_RESULTS_QUEUE.to_string(),
            },
        ],
    }
}

#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Declara exchanges, colas y ligaduras. Idempotente: re-declarar una
    /// topología existente no la recrea ni pierde mensajes encolados.
    async fn declare_topology(&self, topology: &Topology) -> Result<(), ChannelError>;

    /// Publica con confirmación de entrega: si el mensaje no llega a
    /// ninguna cola el resultado es [`ChannelError::Unroutable`].
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        msg_type: &str,
        payload: Vec<u8>,
    ) -> Result<(), ChannelError>;

    /// Consume una cola. Cada cola admite un consumidor a la vez.
    async fn subscribe(&self, queue: &str) -> Result<mpsc::Receiver<Delivery>, ChannelError>;

    /// Sondeo de salud de la conexión.
    async fn ready(&self) -> bool;
}

/// Espera a que el broker responda, sondeando con una demora fija. Falla de
/// conectividad es asunto de transporte: se reintenta acá, nunca se vuelca
/// al estado de un task.
pub async fn wait_for_channel_ready<C: MessageChannel + ?Sized>(channel: &C, delay: Duration) {
    loop {
        if channel.ready().await {
            return;
        }
        log::warn!("message channel not ready, retrying in {:?}", delay);
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::{route, task_topology};
    use func_domain::{Task, TaskedObject};
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn every_task_routes_to_the_public_pool() {
        let task = Task::new(
            "admin",
            Uuid::new_v4(),
            TaskedObject::Function { function_id: Uuid::new_v4() },
            json!({}),
        )
        .unwrap();
        let r = route(&task);
        assert_eq!(r.exchange, "runners.public");
        assert_eq!(r.routing_key, "public");
    }

    #[test]
    fn standard_topology_binds_public_and_results_queues() {
        let t = task_topology();
        assert!(t.queues.contains(&"tasking.results".to_string()));
        assert_eq!(t.bindings.len(), 2);
        assert_eq!(t.bindings[0].exchange, "runners.public");
        assert_eq!(t.bindings[0].queue, "public");
        assert_eq!(t.bindings[1].exchange, "");
        assert_eq!(t.bindings[1].queue, "tasking.results");
    }
}
