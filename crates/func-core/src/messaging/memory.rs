//! Canal in-memory con la misma semántica observable que un broker en modo
//! confirmación: publicar hacia un destino sin cola ligada falla con
//! `Unroutable`, y cada cola entrega a un único consumidor.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;

use super::{Binding, ChannelError, Delivery, MessageChannel, Topology};

const QUEUE_CAPACITY: usize = 256;

pub struct InMemoryChannel {
    bindings: DashMap<String, Vec<Binding>>,
    senders: DashMap<String, mpsc::Sender<Delivery>>,
    receivers: DashMap<String, Mutex<Option<mpsc::Receiver<Delivery>>>>,
    ready: AtomicBool,
    publish_attempts: AtomicU64,
}

impl InMemoryChannel {
    pub fn new() -> Self {
        InMemoryChannel {
            bindings: DashMap::new(),
            senders: DashMap::new(),
            receivers: DashMap::new(),
            ready: AtomicBool::new(true),
            publish_attempts: AtomicU64::new(0),
        }
    }

    /// Simula caída / recuperación del broker para los tests del lazo de
    /// reconexión.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Cantidad de intentos de publicación observados, confirmados o no.
    pub fn publish_attempts(&self) -> u64 {
        self.publish_attempts.load(Ordering::SeqCst)
    }

    fn ensure_queue(&self, queue: &str) {
        if self.senders.contains_key(queue) {
            return;
        }
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        self.senders.insert(queue.to_string(), tx);
        self.receivers.insert(queue.to_string(), Mutex::new(Some(rx)));
    }

    fn matching_queues(&self, exchange: &str, routing_key: &str) -> Vec<String> {
        match self.bindings.get(exchange) {
            Some(entry) => entry
                .iter()
                .filter(|b| b.routing_key == routing_key)
                .map(|b| b.queue.clone())
                .collect(),
            None => Vec::new(),
        }
    }
}

impl Default for InMemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageChannel for InMemoryChannel {
    async fn declare_topology(&self, topology: &Topology) -> Result<(), ChannelError> {
        for exchange in &topology.exchanges {
            self.bindings.entry(exchange.clone()).or_default();
        }
        for queue in &topology.queues {
            self.ensure_queue(queue);
        }
        for binding in &topology.bindings {
            self.ensure_queue(&binding.queue);
            let mut entry = self.bindings.entry(binding.exchange.clone()).or_default();
            if !entry.contains(binding) {
                entry.push(binding.clone());
            }
        }
        Ok(())
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        msg_type: &str,
        payload: Vec<u8>,
    ) -> Result<(), ChannelError> {
        self.publish_attempts.fetch_add(1, Ordering::SeqCst);
        if !self.ready.load(Ordering::SeqCst) {
            return Err(ChannelError::Unavailable("broker down".to_string()));
        }
        let queues = self.matching_queues(exchange, routing_key);
        if queues.is_empty() {
            return Err(ChannelError::Unroutable);
        }
        // Clonar los senders antes de await: un guard de dashmap no debe
        // cruzar un punto de suspensión.
        let mut targets = Vec::with_capacity(queues.len());
        for queue in &queues {
            match self.senders.get(queue) {
                Some(tx) => targets.push(tx.clone()),
                None => return Err(ChannelError::Unroutable),
            }
        }
        for tx in targets {
            let delivery = Delivery {
                msg_type: msg_type.to_string(),
                payload: payload.clone(),
            };
            tx.send(delivery)
                .await
                .map_err(|_| ChannelError::Unavailable("queue consumer closed".to_string()))?;
        }
        Ok(())
    }

    async fn subscribe(&self, queue: &str) -> Result<mpsc::Receiver<Delivery>, ChannelError> {
        let entry = self
            .receivers
            .get(queue)
            .ok_or_else(|| ChannelError::UnknownQueue(queue.to_string()))?;
        let mut slot = entry
            .lock()
            .map_err(|_| ChannelError::Unavailable("receiver registry poisoned".to_string()))?;
        slot.take()
            .ok_or_else(|| ChannelError::Unavailable(format!("queue {} already has a consumer", queue)))
    }

    async fn ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}
