//! Carga de configuración del motor desde variables de entorno.
//! Todos los parámetros tienen default; un valor ausente o ilegible cae al
//! default en lugar de abortar.

use std::env;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Reintentos de publicación después del primer intento fallido.
    pub publish_retries: u32,
    /// Espera fija entre reintentos de publicación, en milisegundos.
    pub publish_backoff_ms: u64,
    /// Espera fija entre sondeos de conectividad del broker, en segundos.
    pub connect_retry_secs: u64,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        // asegura que .env se haya cargado
        Lazy::force(&DOTENV_LOADED);
        let publish_retries = env::var("FUNCFLOW_PUBLISH_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);
        let publish_backoff_ms = env::var("FUNCFLOW_PUBLISH_BACKOFF_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(500);
        let connect_retry_secs = env::var("FUNCFLOW_CONNECT_RETRY_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);
        Self { publish_retries, publish_backoff_ms, connect_retry_secs }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { publish_retries: 3, publish_backoff_ms: 500, connect_retry_secs: 5 }
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
