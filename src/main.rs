//! Demo ejecutable de FuncFlow.
//!
//! Siembra el catálogo in-memory, despacha tasks reales por el canal y
//! avanza runner e ingestor por tandas hasta que todo termina. Cada
//! escenario valida con asserts el estado final que persiste el store.
//!
//! Uso: main-core [direct|workflow|schedule]  (sin argumento corre los tres)

use chrono::Utc;
use serde_json::json;

use func_core::OrchestratorStore;
use func_domain::{ScheduledTask, Task, TaskStatus, TaskedObject};
use funcflow_rust::fixtures::DemoHarness;

/// Task directo contra la función `greet`: el runner ve la API_KEY real,
/// pero el log persistido la guarda enmascarada.
async fn run_direct_demo(harness: &mut DemoHarness) {
    println!("--- Demo direct: task de función ---");
    let task = Task::new(
        "ana",
        harness.catalog.environment_id,
        TaskedObject::Function { function_id: harness.catalog.greet },
        json!({ "name": "ada" }),
    )
    .expect("task válido");
    let task_id = harness.engine.submit_task(task).await.expect("submit ok");
    harness.pump().await.expect("pump ok");

    let done = harness
        .engine
        .store()
        .task(task_id)
        .await
        .expect("store ok")
        .expect("el task existe");
    assert_eq!(done.status(), TaskStatus::Complete, "el task debe completar");
    let log = harness
        .engine
        .store()
        .task_log(task_id)
        .await
        .expect("store ok")
        .expect("el log existe");
    assert!(!log.log().contains("super-secreta-123"), "la API_KEY no puede quedar en el log");
    println!("Log persistido (API_KEY enmascarada): {}", log.log());
    println!("Resultado: {}", done.raw_result().unwrap_or(""));
    println!("!Demo direct: OK");
}

/// Workflow de dos pasos: el segundo consume el resultado del primero vía
/// template, y el trigger hereda el estado terminal del run.
async fn run_workflow_demo(harness: &mut DemoHarness) {
    println!("--- Demo workflow: doblar_y_resumir ---");
    let trigger = Task::new(
        "ana",
        harness.catalog.environment_id,
        TaskedObject::Workflow { workflow_id: harness.catalog.workflow_id },
        json!({ "wf_int_param": 21 }),
    )
    .expect("task válido");
    let trigger_id = harness.engine.submit_task(trigger).await.expect("submit ok");
    harness.pump().await.expect("pump ok");

    let run = harness
        .engine
        .store()
        .run_for_trigger(trigger_id)
        .await
        .expect("store ok")
        .expect("el run existe");
    assert_eq!(run.status(), TaskStatus::Complete, "el run debe completar");
    let steps = harness.engine.store().run_steps(run.id()).await.expect("store ok");
    assert_eq!(steps.len(), 2, "deben ejecutarse los dos pasos");
    println!("Run {} con {} pasos:", run.id(), steps.len());
    for run_step in &steps {
        let step_task = harness
            .engine
            .store()
            .task(run_step.task_id())
            .await
            .expect("store ok")
            .expect("el task del paso existe");
        println!(
            "  paso -> estado {:?}, resultado {}",
            step_task.status(),
            step_task.raw_result().unwrap_or("")
        );
    }
    let trigger = harness
        .engine
        .store()
        .task(trigger_id)
        .await
        .expect("store ok")
        .expect("el trigger existe");
    assert_eq!(trigger.status(), TaskStatus::Complete, "el trigger hereda el estado del run");
    println!("!Demo workflow: OK");
}

/// Scheduled task disparado a mano: crea un task nuevo, lo arranca y deja
/// el puntero del schedule en el task más reciente.
async fn run_schedule_demo(harness: &mut DemoHarness) {
    println!("--- Demo schedule: disparo manual de un cron ---");
    let scheduled = ScheduledTask::new(
        "saludo_horario",
        harness.catalog.environment_id,
        "ana",
        harness.catalog.greet,
        json!({ "name": "grace" }),
        "0 0 * * * *",
    )
    .expect("schedule válido");
    let scheduled_id = scheduled.id();
    if let Some(when) = scheduled.next_fire_after(Utc::now()).expect("cron válido") {
        println!("Próximo disparo del cron: {}", when);
    }
    harness
        .engine
        .store()
        .insert_scheduled_task(scheduled)
        .await
        .expect("store ok");

    let task_id = harness
        .engine
        .run_scheduled_task(scheduled_id)
        .await
        .expect("el disparo crea y arranca un task");
    harness.pump().await.expect("pump ok");

    let task = harness
        .engine
        .store()
        .task(task_id)
        .await
        .expect("store ok")
        .expect("el task existe");
    assert_eq!(task.status(), TaskStatus::Complete, "el task del schedule debe completar");
    let refreshed = harness
        .engine
        .store()
        .scheduled_task(scheduled_id)
        .await
        .expect("store ok")
        .expect("el schedule existe");
    assert_eq!(
        refreshed.most_recent_task_id(),
        Some(task_id),
        "el schedule apunta a su último task"
    );
    println!("Resultado del disparo: {}", task.raw_result().unwrap_or(""));
    println!("!Demo schedule: OK");
}

#[tokio::main]
async fn main() {
    let scenario = std::env::args().nth(1);
    let mut harness = DemoHarness::new().await.expect("arnés in-memory listo");
    match scenario.as_deref() {
        Some("direct") => run_direct_demo(&mut harness).await,
        Some("workflow") => run_workflow_demo(&mut harness).await,
        Some("schedule") => run_schedule_demo(&mut harness).await,
        None => {
            run_direct_demo(&mut harness).await;
            run_workflow_demo(&mut harness).await;
            run_schedule_demo(&mut harness).await;
        }
        Some(other) => {
            eprintln!("escenario desconocido: {}", other);
            eprintln!("uso: main-core [direct|workflow|schedule]");
            std::process::exit(2);
        }
    }
}
