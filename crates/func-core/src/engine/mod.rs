//! Módulo del motor de orquestación.
//!
//! Expone el `TaskEngine`, su builder y las operaciones sobre tasks, runs y
//! scheduled tasks. El motor es genérico sobre sus tres colaboradores
//! (store, canal de mensajes, object store) y recibe todos inyectados.

pub mod builder;
pub mod core;
pub mod runs;
pub mod scheduling;
pub mod tasking;

pub use builder::TaskEngineBuilder;
pub use core::TaskEngine;
pub use tasking::mask_protected_output;
