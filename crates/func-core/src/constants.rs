//! Constantes del protocolo de mensajería.
//!
//! Nombres de exchange, colas y tipos de mensaje compartidos con los
//! runners. Cambiarlos rompe la compatibilidad con todo runner desplegado,
//! así que viven en un solo lugar.

/// Exchange por defecto del broker: rutea directo a la cola cuyo nombre
/// coincide con la routing key.
pub const DEFAULT_EXCHANGE: &str = "";

/// Exchange al que se publican los tasks del pool público.
pub const PUBLIC_EXCHANGE: &str = "runners.public";

/// Cola del pool público; también es la routing key con la que se liga al
/// exchange.
pub const PUBLIC_QUEUE: &str = "public";

/// Cola donde los runners depositan los resultados de ejecución.
pub const TASK_RESULTS_QUEUE: &str = "tasking.results";

/// Valor del header `x-msg-type` para un despacho de task.
pub const MSG_TYPE_TASK: &str = "TASK_PACKAGE";

/// Valor del header `x-msg-type` para un mensaje de resultado.
pub const MSG_TYPE_RESULT: &str = "TASK_RESULT";

/// Máscara con la que se reemplazan los valores de variables protegidas en
/// la salida persistida.
pub const OUTPUT_MASK: &str = "********";
