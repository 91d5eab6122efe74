//! Tests de integración del despacho: reintento acotado ante fallas de
//! ruteo, prefirmado de parámetros file y entrega de variables.

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use func_core::constants::{MSG_TYPE_TASK, PUBLIC_QUEUE};
use func_core::{
    EngineConfig, EngineError, InMemoryChannel, InMemoryObjectStore, InMemoryOrchestratorStore,
    MessageChannel, OrchestratorStore, TaskEngine, TaskMessage,
};
use func_domain::{
    Environment, Function, FunctionParameter, Package, ParameterType, ReturnType, Task,
    TaskStatus, TaskedObject, Variable,
};

type MemoryEngine = TaskEngine<InMemoryOrchestratorStore, InMemoryChannel, InMemoryObjectStore>;

fn fast_config() -> EngineConfig {
    EngineConfig { publish_retries: 3, publish_backoff_ms: 1, connect_retry_secs: 1 }
}

async fn engine_with_function(
    declare: bool,
    parameter: FunctionParameter,
) -> (Arc<MemoryEngine>, Uuid, Uuid) {
    let engine = Arc::new(
        TaskEngine::builder(
            Arc::new(InMemoryOrchestratorStore::new()),
            Arc::new(InMemoryChannel::new()),
            Arc::new(InMemoryObjectStore::new()),
        )
        .config(fast_config())
        .build(),
    );
    if declare {
        engine.declare_topology().await.unwrap();
    }

    let mut environment = Environment::new("staging").unwrap();
    environment
        .add_variable(Variable::new("API_KEY", "secret-key-123", true).unwrap())
        .unwrap();
    let environment_id = environment.id();
    let package = Package::new(environment_id, "utils", "registry.local/utils:latest").unwrap();
    let function = Function::new(
        package.id(),
        "process",
        "procesa una entrada",
        vec![parameter],
        ReturnType::String,
    )
    .unwrap();
    let function_id = function.id();

    engine.store().insert_environment(environment).await.unwrap();
    engine.store().insert_package(package).await.unwrap();
    engine.store().insert_function(function).await.unwrap();
    (engine, environment_id, function_id)
}

#[tokio::test]
async fn test_unroutable_dispatch_retries_and_leaves_task_in_progress() {
    // sin topología declarada la cola pública no existe: todo publish falla
    let (engine, environment_id, function_id) =
        engine_with_function(false, FunctionParameter::new("text", ParameterType::String, true))
            .await;

    let task = Task::new(
        "ada",
        environment_id,
        TaskedObject::Function { function_id },
        json!({"text": "hola"}),
    )
    .unwrap();
    let task_id = task.id();
    let err = engine.submit_task(task).await.unwrap_err();
    match err {
        EngineError::Dispatch { attempts, .. } => assert_eq!(attempts, 4),
        other => panic!("se esperaba Dispatch, fue: {}", other),
    }

    // un intento inicial más tres reintentos
    assert_eq!(engine.channel().publish_attempts(), 4);

    // el task queda IN_PROGRESS para intervención manual, nunca ERROR
    let stored = engine.store().task(task_id).await.unwrap().unwrap();
    assert_eq!(stored.status(), TaskStatus::InProgress);
}

#[tokio::test]
async fn test_file_parameters_are_presigned_only_on_the_wire() {
    let (engine, environment_id, function_id) =
        engine_with_function(true, FunctionParameter::new("data", ParameterType::File, true))
            .await;

    let task = Task::new(
        "ada",
        environment_id,
        TaskedObject::Function { function_id },
        json!({"data": "informe.csv"}),
    )
    .unwrap();
    let task_id = engine.submit_task(task).await.unwrap();

    let mut rx = engine.channel().subscribe(PUBLIC_QUEUE).await.unwrap();
    let delivery = rx.recv().await.unwrap();
    assert_eq!(delivery.msg_type, MSG_TYPE_TASK);
    let message: TaskMessage = serde_json::from_slice(&delivery.payload).unwrap();
    let url = message.function_parameters["data"].as_str().unwrap();
    assert!(url.starts_with("https://objects.local/"), "url fue: {}", url);
    assert!(url.contains("informe.csv"));
    assert!(url.contains(&environment_id.to_string()));

    // el task persistido conserva el nombre de archivo original
    let stored = engine.store().task(task_id).await.unwrap().unwrap();
    assert_eq!(stored.parameters(), &json!({"data": "informe.csv"}));
}

#[tokio::test]
async fn test_environment_variables_travel_with_the_message() {
    let (engine, environment_id, function_id) =
        engine_with_function(true, FunctionParameter::new("text", ParameterType::String, true))
            .await;

    let task = Task::new(
        "ada",
        environment_id,
        TaskedObject::Function { function_id },
        json!({"text": "hola"}),
    )
    .unwrap();
    engine.submit_task(task).await.unwrap();

    let mut rx = engine.channel().subscribe(PUBLIC_QUEUE).await.unwrap();
    let message: TaskMessage =
        serde_json::from_slice(&rx.recv().await.unwrap().payload).unwrap();
    // las variables viajan sin enmascarar: el runner necesita el valor real
    assert_eq!(message.variables.get("API_KEY").map(String::as_str), Some("secret-key-123"));
}
