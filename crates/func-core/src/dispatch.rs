//! Despacho de tasks hacia los runners.
//!
//! Arma el mensaje de alambre, reescribe los parámetros de tipo file a URLs
//! prefirmadas (solo en el mensaje saliente, nunca sobre el task
//! persistido) y publica con confirmación de entrega y reintento acotado.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use func_domain::{Environment, Function, Package, ParameterType, Task};

use crate::config::EngineConfig;
use crate::constants::MSG_TYPE_TASK;
use crate::errors::EngineError;
use crate::messaging::{route, ChannelError, MessageChannel};
use crate::objectstore::ObjectStore;

/// Mensaje de despacho, tal como lo espera el runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMessage {
    pub id: String,
    pub package: String,
    pub function: String,
    pub function_parameters: Value,
    pub variables: IndexMap<String, String>,
}

pub struct Dispatcher<C: MessageChannel, O: ObjectStore> {
    channel: Arc<C>,
    objects: Arc<O>,
    config: EngineConfig,
}

impl<C: MessageChannel, O: ObjectStore> Dispatcher<C, O> {
    pub fn new(channel: Arc<C>, objects: Arc<O>, config: EngineConfig) -> Self {
        Dispatcher { channel, objects, config }
    }

    /// Construye el mensaje de alambre para un task de función: identidad
    /// del paquete/función, parámetros con los file ya prefirmados y las
    /// variables declaradas del environment.
    pub async fn build_message(
        &self,
        task: &Task,
        function: &Function,
        package: &Package,
        environment: &Environment,
    ) -> Result<TaskMessage, EngineError> {
        let parameters = self.presign_file_parameters(task, function, environment).await?;
        let mut variables = IndexMap::new();
        for v in environment.variables() {
            variables.insert(v.name().to_string(), v.value().to_string());
        }
        Ok(TaskMessage {
            id: task.id().to_string(),
            package: package.full_image_name().to_string(),
            function: function.name().to_string(),
            function_parameters: parameters,
            variables,
        })
    }

    /// Publica con reintento acotado y espera fija entre intentos. Si todos
    /// los intentos fallan el task queda como estaba (IN_PROGRESS): nunca
    /// se confirmó entrega, así que marcarlo ERROR mentiría.
    pub async fn publish_task(&self, task: &Task, message: &TaskMessage) -> Result<(), EngineError> {
        let payload = serde_json::to_vec(message)
            .map_err(|e| ChannelError::Serialization(e.to_string()))?;
        let target = route(task);
        let attempts = 1 + self.config.publish_retries;
        let backoff = Duration::from_millis(self.config.publish_backoff_ms);

        let mut last_error = ChannelError::Unroutable;
        for attempt in 1..=attempts {
            match self
                .channel
                .publish(&target.exchange, &target.routing_key, MSG_TYPE_TASK, payload.clone())
                .await
            {
                Ok(()) => {
                    log::debug!("task {} published on attempt {}", task.id(), attempt);
                    return Ok(());
                }
                Err(e) => {
                    log::warn!(
                        "publish attempt {}/{} for task {} failed: {}",
                        attempt,
                        attempts,
                        task.id(),
                        e
                    );
                    last_error = e;
                    if attempt < attempts {
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }
        Err(EngineError::Dispatch { attempts, reason: last_error.to_string() })
    }

    /// Copia los parámetros del task reemplazando cada parámetro declarado
    /// como file por una URL de descarga prefirmada.
    async fn presign_file_parameters(
        &self,
        task: &Task,
        function: &Function,
        environment: &Environment,
    ) -> Result<Value, EngineError> {
        let mut parameters = task.parameters().clone();
        let map = match parameters.as_object_mut() {
            Some(map) => map,
            None => return Ok(parameters),
        };
        for declared in function.parameters() {
            if declared.parameter_type() != ParameterType::File {
                continue;
            }
            if let Some(value) = map.get_mut(declared.name()) {
                if let Some(filename) = value.as_str() {
                    let url = self.objects.presigned_url(environment.id(), filename).await?;
                    *value = Value::String(url);
                }
            }
        }
        Ok(parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::Dispatcher;
    use crate::config::EngineConfig;
    use crate::messaging::InMemoryChannel;
    use crate::objectstore::InMemoryObjectStore;
    use func_domain::{
        Environment, Function, FunctionParameter, Package, ParameterType, ReturnType, Task,
        TaskedObject, Variable,
    };
    use serde_json::json;
    use std::sync::Arc;
    use uuid::Uuid;

    fn dispatcher() -> Dispatcher<InMemoryChannel, InMemoryObjectStore> {
        Dispatcher::new(
            Arc::new(InMemoryChannel::new()),
            Arc::new(InMemoryObjectStore::with_expiry(60)),
            EngineConfig::default(),
        )
    }

    fn catalog() -> (Environment, Package, Function) {
        let mut env = Environment::new("dev").unwrap();
        env.add_variable(Variable::new("API_TOKEN", "supersecret", true).unwrap()).unwrap();
        env.add_variable(Variable::new("REGION", "us-east-1", false).unwrap()).unwrap();
        let package = Package::new(env.id(), "utils", "registry.local/dev/utils:latest").unwrap();
        let function = Function::new(
            package.id(),
            "ingest",
            "",
            vec![
                FunctionParameter::new("source", ParameterType::File, true),
                FunctionParameter::new("rows", ParameterType::Integer, false),
            ],
            ReturnType::Json,
        )
        .unwrap();
        (env, package, function)
    }

    #[tokio::test]
    async fn message_carries_identity_variables_and_presigned_files() {
        let (env, package, function) = catalog();
        let task = Task::new(
            "admin",
            env.id(),
            TaskedObject::Function { function_id: function.id() },
            json!({"source": "input.csv", "rows": 10}),
        )
        .unwrap();

        let d = dispatcher();
        let message = d.build_message(&task, &function, &package, &env).await.unwrap();
        assert_eq!(message.id, task.id().to_string());
        assert_eq!(message.package, "registry.local/dev/utils:latest");
        assert_eq!(message.function, "ingest");
        assert_eq!(message.function_parameters["rows"], json!(10));
        let url = message.function_parameters["source"].as_str().unwrap();
        assert!(url.starts_with("https://objects.local/"));
        assert!(url.contains("input.csv"));
        assert_eq!(message.variables.get("API_TOKEN").map(|s| s.as_str()), Some("supersecret"));
        assert_eq!(message.variables.get("REGION").map(|s| s.as_str()), Some("us-east-1"));
        // el task persistido no se toca
        assert_eq!(task.parameters()["source"], json!("input.csv"));
    }

    #[tokio::test]
    async fn non_file_parameters_pass_through_untouched() {
        let (env, package, function) = catalog();
        let task = Task::new(
            "admin",
            env.id(),
            TaskedObject::Function { function_id: function.id() },
            json!({"rows": 3}),
        )
        .unwrap();
        let d = dispatcher();
        let message = d.build_message(&task, &function, &package, &env).await.unwrap();
        assert_eq!(message.function_parameters, json!({"rows": 3}));
    }
}
