//! func-adapters: runner local in-process
//!
//! Este crate provee:
//! - `LocalRunner`: un sustituto in-process del pool de runners externo,
//!   con un registro de handlers por (imagen de paquete, función).
//! - El lazo consume la cola pública, ejecuta el handler y publica el
//!   mensaje de resultado por la cola de resultados.
//!
//! Es maquinaria de demo y test: el contrato de alambre es el mismo que el
//! de un runner real, la ejecución no.

pub mod runner;

pub use runner::{HandlerOutput, LocalRunner};
