//! Builder para `TaskEngine`.
//!
//! El builder recibe los tres colaboradores obligatorios (store, canal de
//! mensajería y object store) y permite ajustar la configuración antes de
//! construir el motor. Consumimos `self` en `build` porque el builder no
//! tiene más vida útil una vez creado el engine.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::dispatch::Dispatcher;
use crate::messaging::MessageChannel;
use crate::objectstore::ObjectStore;
use crate::repo::OrchestratorStore;

use super::core::TaskEngine;

pub struct TaskEngineBuilder<S: OrchestratorStore, C: MessageChannel, O: ObjectStore> {
    store: Arc<S>,
    channel: Arc<C>,
    objects: Arc<O>,
    config: EngineConfig,
}

impl<S: OrchestratorStore, C: MessageChannel, O: ObjectStore> TaskEngineBuilder<S, C, O> {
    pub fn new(store: Arc<S>, channel: Arc<C>, objects: Arc<O>) -> Self {
        Self { store,
               channel,
               objects,
               config: EngineConfig::default() }
    }

    /// Reemplaza la configuración por una explícita.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Carga la configuración desde variables de entorno.
    pub fn config_from_env(mut self) -> Self {
        self.config = EngineConfig::from_env();
        self
    }

    pub fn build(self) -> TaskEngine<S, C, O> {
        let dispatcher =
            Dispatcher::new(Arc::clone(&self.channel), self.objects, self.config.clone());
        TaskEngine { store: self.store,
                     channel: self.channel,
                     dispatcher,
                     config: self.config }
    }
}
