//! Colaborador de object storage: lo único que el orquestador le pide es
//! una URL de descarga prefirmada y con vencimiento para los parámetros de
//! tipo file. La subida y el almacenamiento real quedan afuera.

use async_trait::async_trait;
use uuid::Uuid;

use crate::repo::StoreError;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn presigned_url(
        &self,
        environment_id: Uuid,
        filename: &str,
    ) -> Result<String, StoreError>;
}

/// Fake determinista para tests y demo: fabrica URLs con la misma forma que
/// devolvería un object store real.
pub struct InMemoryObjectStore {
    expiry_secs: u64,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        InMemoryObjectStore { expiry_secs: 3600 }
    }

    pub fn with_expiry(expiry_secs: u64) -> Self {
        InMemoryObjectStore { expiry_secs }
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn presigned_url(
        &self,
        environment_id: Uuid,
        filename: &str,
    ) -> Result<String, StoreError> {
        Ok(format!(
            "https://objects.local/{}/{}?expires={}",
            environment_id, filename, self.expiry_secs
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemoryObjectStore, ObjectStore};
    use uuid::Uuid;

    #[tokio::test]
    async fn fake_urls_are_scoped_and_expiring() {
        let store = InMemoryObjectStore::with_expiry(60);
        let env = Uuid::new_v4();
        let url = store.presigned_url(env, "input.csv").await.unwrap();
        assert!(url.contains(&env.to_string()));
        assert!(url.ends_with("input.csv?expires=60"));
    }
}
