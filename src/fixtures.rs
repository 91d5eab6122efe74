//! Catálogo de ejemplo y arnés in-process para la demo y los tests.
//!
//! El arnés junta las tres piezas que en producción serían procesos
//! separados: el motor de orquestación, un runner que ejecuta funciones y
//! el ingestor de resultados. Todo corre sobre el canal in-memory, así que
//! el trabajo avanza por tandas deterministas con [`DemoHarness::pump`].

use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc;
use uuid::Uuid;

use func_adapters::{HandlerOutput, LocalRunner};
use func_core::constants::TASK_RESULTS_QUEUE;
use func_core::messaging::Delivery;
use func_core::{
    EngineError, InMemoryChannel, InMemoryObjectStore, InMemoryOrchestratorStore, MessageChannel,
    OrchestratorStore, ResultIngestor, TaskEngine,
};
use func_domain::{
    Environment, Function, FunctionParameter, Package, ParameterType, ReturnType, Variable,
    Workflow,
};

/// Imagen bajo la que el runner local registra sus handlers. Tiene que
/// coincidir con la del package sembrado, porque es la identidad que viaja
/// en el mensaje de despacho.
pub const DEMO_IMAGE: &str = "registry.local/demo-utils:latest";

pub type DemoEngine = TaskEngine<InMemoryOrchestratorStore, InMemoryChannel, InMemoryObjectStore>;

/// Ids del catálogo sembrado, para armar tasks desde la demo y los tests.
pub struct DemoCatalog {
    pub environment_id: Uuid,
    pub greet: Uuid,
    pub double: Uuid,
    pub echo: Uuid,
    pub workflow_id: Uuid,
}

/// Siembra un environment de demo con su package, tres funciones y un
/// workflow de dos pasos que dobla un entero y lo resume en texto.
pub async fn seed_catalog<S: OrchestratorStore>(store: &S) -> Result<DemoCatalog, EngineError> {
    let mut environment = Environment::new("demo")?;
    environment.add_variable(Variable::new("API_KEY", "super-secreta-123", true)?)?;
    environment.add_variable(Variable::new("REGION", "us-east-1", false)?)?;
    let environment_id = environment.id();

    let package = Package::new(environment_id, "demo-utils", DEMO_IMAGE)?;
    let greet = Function::new(
        package.id(),
        "greet",
        "saluda por nombre",
        vec![FunctionParameter::new("name", ParameterType::String, true)],
        ReturnType::String,
    )?;
    let double = Function::new(
        package.id(),
        "double",
        "duplica un entero",
        vec![FunctionParameter::new("func_int_param", ParameterType::Integer, true)],
        ReturnType::Json,
    )?;
    let echo = Function::new(
        package.id(),
        "echo",
        "repite el texto recibido",
        vec![FunctionParameter::new("text", ParameterType::String, true)],
        ReturnType::String,
    )?;

    let mut workflow = Workflow::new(environment_id, "doblar_y_resumir", "dobla y reporta")?;
    workflow.add_step(
        "doblar",
        1,
        double.id(),
        Some(r#"{"func_int_param": {{parameters.wf_int_param}}}"#),
    )?;
    workflow.add_step("resumir", 2, echo.id(), Some(r#"{"text": "{{doblar.result}}"}"#))?;

    let catalog = DemoCatalog {
        environment_id,
        greet: greet.id(),
        double: double.id(),
        echo: echo.id(),
        workflow_id: workflow.id(),
    };

    store.insert_environment(environment).await?;
    store.insert_package(package).await?;
    store.insert_function(greet).await?;
    store.insert_function(double).await?;
    store.insert_function(echo).await?;
    store.insert_workflow(workflow).await?;
    Ok(catalog)
}

/// Runner local con un handler por función del catálogo.
pub fn demo_runner(channel: Arc<InMemoryChannel>) -> LocalRunner<InMemoryChannel> {
    let mut runner = LocalRunner::new(channel);
    runner.register(DEMO_IMAGE, "greet", |parameters, variables| {
        let name = parameters["name"].as_str().unwrap_or("desconocido");
        let key = variables.get("API_KEY").map(String::as_str).unwrap_or("");
        Ok(HandlerOutput {
            output: format!("greeting {} using key {}", name, key),
            result: json!(format!("hola, {}", name)),
        })
    });
    runner.register(DEMO_IMAGE, "double", |parameters, _| {
        let n = parameters["func_int_param"]
            .as_i64()
            .ok_or("func_int_param no es entero")?;
        Ok(HandlerOutput {
            output: format!("doubling {}", n),
            result: json!(n * 2),
        })
    });
    runner.register(DEMO_IMAGE, "echo", |parameters, _| {
        let text = parameters["text"].as_str().unwrap_or("");
        Ok(HandlerOutput {
            output: format!("echoing {}", text),
            result: json!(format!("eco: {}", text)),
        })
    });
    runner
}

/// Motor in-memory con el catálogo sembrado, más runner e ingestor listos.
pub struct DemoHarness {
    pub engine: Arc<DemoEngine>,
    pub runner: LocalRunner<InMemoryChannel>,
    pub catalog: DemoCatalog,
    ingestor: ResultIngestor<InMemoryOrchestratorStore, InMemoryChannel, InMemoryObjectStore>,
    results: mpsc::Receiver<Delivery>,
}

impl DemoHarness {
    pub async fn new() -> Result<Self, EngineError> {
        let engine = Arc::new(TaskEngine::in_memory());
        engine.declare_topology().await?;
        let catalog = seed_catalog(engine.store().as_ref()).await?;
        let runner = demo_runner(Arc::clone(engine.channel()));
        let ingestor = ResultIngestor::new(Arc::clone(&engine));
        let results = engine.channel().subscribe(TASK_RESULTS_QUEUE).await?;
        Ok(DemoHarness {
            engine,
            runner,
            catalog,
            ingestor,
            results,
        })
    }

    /// Alterna runner e ingestor hasta que las dos colas quedan vacías. Al
    /// volver, todo el trabajo alcanzable desde lo ya encolado terminó.
    pub async fn pump(&mut self) -> Result<(), EngineError> {
        loop {
            let handled = self.runner.drain().await?;
            let mut ingested = 0;
            while let Ok(delivery) = self.results.try_recv() {
                self.ingestor.handle_delivery(&delivery).await;
                ingested += 1;
            }
            if handled == 0 && ingested == 0 {
                return Ok(());
            }
        }
    }
}
