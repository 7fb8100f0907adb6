use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};

use super::backend::CacheBackend;
use crate::ai::AiError;

type Generation = Shared<BoxFuture<'static, Result<String, AiError>>>;

/// Read-through cache for generated text.
///
/// Concurrent calls on the same key share one lookup: the first caller
/// registers it, later callers await the same handle, and the handle removes
/// itself once the result is stored.
#[derive(Clone)]
pub struct ResponseCache {
    backend: Option<Arc<dyn CacheBackend>>,
    ttl: Duration,
    in_flight: Arc<Mutex<HashMap<String, Generation>>>,
}

impl ResponseCache {
    pub fn new(backend: Option<Arc<dyn CacheBackend>>, ttl: Duration) -> Self {
        Self {
            backend,
            ttl,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn get_or_generate<F, Fut>(&self, key: &str, generate: F) -> Result<String, AiError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<String, AiError>> + Send + 'static,
    {
        // The registry entry covers the backend read too, so a caller arriving
        // while another one stores its value joins it instead of regenerating.
        let pending = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            match in_flight.get(key) {
                Some(pending) => {
                    tracing::debug!("Joining in-flight lookup for key: {}", key);
                    pending.clone()
                }
                None => {
                    let pending = self.resolve(key.to_string(), generate).boxed().shared();
                    in_flight.insert(key.to_string(), pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    /// Reads `key`, generates and stores it on a miss, then unregisters the key.
    fn resolve<F, Fut>(
        &self,
        key: String,
        generate: F,
    ) -> impl Future<Output = Result<String, AiError>> + Send + 'static
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<String, AiError>> + Send + 'static,
    {
        let backend = self.backend.clone();
        let ttl = self.ttl;
        let in_flight = Arc::clone(&self.in_flight);

        async move {
            let result = lookup_or_generate(backend.as_deref(), &key, ttl, generate).await;
            in_flight
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&key);
            result
        }
    }
}

async fn lookup_or_generate<F, Fut>(
    backend: Option<&dyn CacheBackend>,
    key: &str,
    ttl: Duration,
    generate: F,
) -> Result<String, AiError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<String, AiError>>,
{
    let Some(backend) = backend else {
        return generate().await;
    };

    match backend.get(key).await {
        Ok(Some(value)) => {
            tracing::info!("Cache hit for key: {}", key);
            return Ok(value);
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(
            backend = backend.name(),
            "Cache read failed, generating directly: {}",
            e
        ),
    }

    let value = generate().await?;
    match backend.set(key, &value, ttl).await {
        Ok(()) => tracing::info!("Cached result for key: {}", key),
        Err(e) => tracing::warn!(
            backend = backend.name(),
            "Cache write failed for key {}: {}",
            key,
            e
        ),
    }
    Ok(value)
}
