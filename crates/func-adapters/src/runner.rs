//! Runner local: consume la cola pública y publica resultados.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use log::warn;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::sync::Mutex;

use func_core::constants::{
    DEFAULT_EXCHANGE, MSG_TYPE_RESULT, MSG_TYPE_TASK, PUBLIC_QUEUE, TASK_RESULTS_QUEUE,
};
use func_core::messaging::{ChannelError, Delivery, MessageChannel};
use func_core::TaskMessage;

/// Lo que devuelve un handler que terminó bien: el texto de salida (lo que
/// un runner real capturaría de stdout) y el valor de retorno.
#[derive(Debug, Clone)]
pub struct HandlerOutput {
    pub output: String,
    pub result: Value,
}

type HandlerFn =
    dyn Fn(&Value, &IndexMap<String, String>) -> Result<HandlerOutput, String> + Send + Sync;

/// Sustituto in-process del pool de runners. Cada handler se registra bajo
/// la imagen completa del paquete y el nombre de la función, que es
/// exactamente la identidad que viaja en el mensaje de despacho.
pub struct LocalRunner<C: MessageChannel> {
    channel: Arc<C>,
    handlers: HashMap<(String, String), Box<HandlerFn>>,
    subscription: Mutex<Option<mpsc::Receiver<Delivery>>>,
}

impl<C: MessageChannel> LocalRunner<C> {
    pub fn new(channel: Arc<C>) -> Self {
        LocalRunner {
            channel,
            handlers: HashMap::new(),
            subscription: Mutex::new(None),
        }
    }

    pub fn register<F>(&mut self, package_image: &str, function: &str, handler: F)
    where
        F: Fn(&Value, &IndexMap<String, String>) -> Result<HandlerOutput, String>
            + Send
            + Sync
            + 'static,
    {
        self.handlers
            .insert((package_image.to_string(), function.to_string()), Box::new(handler));
    }

    async fn ensure_subscribed(
        &self,
        slot: &mut Option<mpsc::Receiver<Delivery>>,
    ) -> Result<(), ChannelError> {
        if slot.is_none() {
            *slot = Some(self.channel.subscribe(PUBLIC_QUEUE).await?);
        }
        Ok(())
    }

    /// Consume la cola pública hasta que el canal se cierre.
    pub async fn run(&self) -> Result<(), ChannelError> {
        let mut slot = self.subscription.lock().await;
        self.ensure_subscribed(&mut slot).await?;
        if let Some(rx) = slot.as_mut() {
            while let Some(delivery) = rx.recv().await {
                self.handle_delivery(&delivery).await?;
            }
        }
        Ok(())
    }

    /// Atiende los mensajes ya encolados y devuelve cuántos procesó. Útil en
    /// tests y en la demo, donde el flujo avanza por tandas deterministas.
    pub async fn drain(&self) -> Result<usize, ChannelError> {
        let mut slot = self.subscription.lock().await;
        self.ensure_subscribed(&mut slot).await?;
        let mut handled = 0;
        if let Some(rx) = slot.as_mut() {
            while let Ok(delivery) = rx.try_recv() {
                self.handle_delivery(&delivery).await?;
                handled += 1;
            }
        }
        Ok(handled)
    }

    async fn handle_delivery(&self, delivery: &Delivery) -> Result<(), ChannelError> {
        if delivery.msg_type != MSG_TYPE_TASK {
            warn!("local runner ignoring delivery with type {}", delivery.msg_type);
            return Ok(());
        }
        let message: TaskMessage = match serde_json::from_slice(&delivery.payload) {
            Ok(message) => message,
            Err(e) => {
                warn!("local runner dropping undecodable task message: {}", e);
                return Ok(());
            }
        };

        let key = (message.package.clone(), message.function.clone());
        let (status, output, result) = match self.handlers.get(&key) {
            Some(handler) => {
                match handler(&message.function_parameters, &message.variables) {
                    Ok(done) => (0, done.output, done.result),
                    Err(failure) => (1, failure, Value::Null),
                }
            }
            None => (
                1,
                format!(
                    "function {} not registered for package {}",
                    message.function, message.package
                ),
                Value::Null,
            ),
        };

        let payload = json!({
            "task_id": message.id,
            "status": status,
            "output": output,
            "result": result,
        });
        let body = serde_json::to_vec(&payload)
            .map_err(|e| ChannelError::Serialization(e.to_string()))?;
        self.channel
            .publish(DEFAULT_EXCHANGE, TASK_RESULTS_QUEUE, MSG_TYPE_RESULT, body)
            .await
    }
}
