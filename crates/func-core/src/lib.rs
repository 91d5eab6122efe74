//! func-core: motor de orquestación de tasks, workflow runs y schedules
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod engine;
pub mod errors;
pub mod ingest;
pub mod messaging;
pub mod objectstore;
pub mod repo;
pub mod template;

pub use config::EngineConfig;
pub use dispatch::{Dispatcher, TaskMessage};
pub use engine::{mask_protected_output, TaskEngine, TaskEngineBuilder};
pub use errors::EngineError;
pub use ingest::{ResultIngestor, ResultMessage};
pub use messaging::{
    route, task_topology, wait_for_channel_ready, Binding, ChannelError, Delivery,
    InMemoryChannel, MessageChannel, Route, Topology,
};
pub use objectstore::{InMemoryObjectStore, ObjectStore};
pub use repo::{InMemoryOrchestratorStore, OrchestratorStore, RecordOutcome, StoreError};
pub use template::{render, resolve_parameters, ResolutionContext};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use uuid::Uuid;

    use func_domain::{
        Environment, Function, FunctionParameter, Package, ParameterType, ReturnType, Task,
        TaskStatus, TaskedObject, Variable,
    };

    use crate::constants::{MSG_TYPE_RESULT, MSG_TYPE_TASK, PUBLIC_QUEUE};
    use crate::engine::TaskEngine;
    use crate::errors::EngineError;
    use crate::ingest::ResultIngestor;
    use crate::messaging::{Delivery, MessageChannel};
    use crate::repo::OrchestratorStore;
    use crate::TaskMessage;

    type MemoryEngine = TaskEngine<
        crate::InMemoryOrchestratorStore,
        crate::InMemoryChannel,
        crate::InMemoryObjectStore,
    >;

    async fn engine_with_greet_function() -> (Arc<MemoryEngine>, Uuid, Uuid) {
        let engine = Arc::new(TaskEngine::in_memory());
        engine.declare_topology().await.unwrap();

        let mut environment = Environment::new("staging").unwrap();
        environment
            .add_variable(Variable::new("API_KEY", "secret-key-123", true).unwrap())
            .unwrap();
        environment
            .add_variable(Variable::new("REGION", "eu-west-1", false).unwrap())
            .unwrap();
        let environment_id = environment.id();

        let package = Package::new(environment_id, "utils", "registry.local/utils:latest").unwrap();
        let function = Function::new(
            package.id(),
            "greet",
            "saluda por nombre",
            vec![FunctionParameter::new("name", ParameterType::String, true)],
            ReturnType::String,
        )
        .unwrap();
        let function_id = function.id();

        engine.store().insert_environment(environment).await.unwrap();
        engine.store().insert_package(package).await.unwrap();
        engine.store().insert_function(function).await.unwrap();

        (engine, environment_id, function_id)
    }

    fn result_delivery(task_id: Uuid, status: i64, output: &str, result: &str) -> Delivery {
        let payload = json!({
            "task_id": task_id.to_string(),
            "status": status,
            "output": output,
            "result": result,
        });
        Delivery {
            msg_type: MSG_TYPE_RESULT.to_string(),
            payload: serde_json::to_vec(&payload).unwrap(),
        }
    }

    #[tokio::test]
    async fn function_task_round_trips_through_queue_and_result() {
        let (engine, environment_id, function_id) = engine_with_greet_function().await;

        let task = Task::new(
            "ada",
            environment_id,
            TaskedObject::Function { function_id },
            json!({"name": "mundo"}),
        )
        .unwrap();
        let task_id = engine.submit_task(task).await.unwrap();

        let stored = engine.store().task(task_id).await.unwrap().unwrap();
        assert_eq!(stored.status(), TaskStatus::InProgress);

        // el mensaje en la cola pública lleva la identidad completa
        let mut rx = engine.channel().subscribe(PUBLIC_QUEUE).await.unwrap();
        let delivery = rx.recv().await.unwrap();
        assert_eq!(delivery.msg_type, MSG_TYPE_TASK);
        let message: TaskMessage = serde_json::from_slice(&delivery.payload).unwrap();
        assert_eq!(message.id, task_id.to_string());
        assert_eq!(message.package, "registry.local/utils:latest");
        assert_eq!(message.function, "greet");
        assert_eq!(message.function_parameters, json!({"name": "mundo"}));
        assert_eq!(message.variables.get("API_KEY").map(String::as_str), Some("secret-key-123"));

        // el resultado vuelve por el ingestor y cierra el task con el output
        // enmascarado
        let ingestor = ResultIngestor::new(Arc::clone(&engine));
        ingestor
            .handle_delivery(&result_delivery(
                task_id,
                0,
                "token secret-key-123 accepted",
                "hola mundo",
            ))
            .await;

        let finished = engine.store().task(task_id).await.unwrap().unwrap();
        assert_eq!(finished.status(), TaskStatus::Complete);
        assert_eq!(finished.raw_result(), Some("hola mundo"));

        let log = engine.store().task_log(task_id).await.unwrap().unwrap();
        assert_eq!(log.log(), "token ******** accepted");
        let result = engine.store().task_result(task_id).await.unwrap().unwrap();
        assert_eq!(result.result(), "hola mundo");
    }

    #[tokio::test]
    async fn starting_a_non_pending_task_is_rejected() {
        let (engine, environment_id, function_id) = engine_with_greet_function().await;

        let task = Task::new(
            "ada",
            environment_id,
            TaskedObject::Function { function_id },
            json!({"name": "mundo"}),
        )
        .unwrap();
        let task_id = engine.submit_task(task).await.unwrap();

        let err = engine.start_task(task_id).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidTaskState { id, status: TaskStatus::InProgress } if id == task_id
        ));
    }

    #[tokio::test]
    async fn duplicate_result_deliveries_only_record_once() {
        let (engine, environment_id, function_id) = engine_with_greet_function().await;

        let task = Task::new(
            "ada",
            environment_id,
            TaskedObject::Function { function_id },
            json!({"name": "mundo"}),
        )
        .unwrap();
        let task_id = engine.submit_task(task).await.unwrap();

        let ingestor = ResultIngestor::new(Arc::clone(&engine));
        ingestor.handle_delivery(&result_delivery(task_id, 0, "ok", "primero")).await;
        // entrega repetida con desenlace contradictorio: se ignora
        ingestor.handle_delivery(&result_delivery(task_id, 1, "boom", "segundo")).await;

        let finished = engine.store().task(task_id).await.unwrap().unwrap();
        assert_eq!(finished.status(), TaskStatus::Complete);
        assert_eq!(finished.raw_result(), Some("primero"));
    }

    #[tokio::test]
    async fn malformed_and_unknown_results_are_dropped() {
        let (engine, _, _) = engine_with_greet_function().await;
        let ingestor = ResultIngestor::new(Arc::clone(&engine));

        ingestor
            .handle_delivery(&Delivery {
                msg_type: MSG_TYPE_RESULT.to_string(),
                payload: b"not json at all".to_vec(),
            })
            .await;
        ingestor.handle_delivery(&result_delivery(Uuid::new_v4(), 0, "", "huerfano")).await;
    }
}
