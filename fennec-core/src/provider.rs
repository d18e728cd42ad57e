//! Default-model resolution
//!
//! Model defaulting is explicit dependency injection: the composer receives
//! a [`ModelProvider`] handle instead of consulting a process-wide global.
//! [`LazyModelProvider`] gives the cached init-once behavior where a default
//! should be resolved at most once per provider instance.

use crate::types::ModelHandle;
use std::sync::OnceLock;

/// Resolves the model to use when the caller supplies none
pub trait ModelProvider: Send + Sync {
    /// The default model for agents built against this provider
    fn default_model(&self) -> ModelHandle;
}

/// Provider returning a fixed model handle
#[derive(Debug, Clone)]
pub struct StaticModelProvider {
    model: ModelHandle,
}

impl StaticModelProvider {
    pub fn new(model: impl Into<ModelHandle>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

impl ModelProvider for StaticModelProvider {
    fn default_model(&self) -> ModelHandle {
        self.model.clone()
    }
}

/// Provider that resolves its default lazily, at most once.
///
/// The init closure runs on first use only; later calls return the cached
/// handle. Scoped to the instance, so tests can construct independent
/// providers with their own lifecycles.
pub struct LazyModelProvider {
    init: Box<dyn Fn() -> ModelHandle + Send + Sync>,
    cell: OnceLock<ModelHandle>,
}

impl LazyModelProvider {
    pub fn new(init: impl Fn() -> ModelHandle + Send + Sync + 'static) -> Self {
        Self {
            init: Box::new(init),
            cell: OnceLock::new(),
        }
    }

    /// Whether the default has been resolved yet
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl ModelProvider for LazyModelProvider {
    fn default_model(&self) -> ModelHandle {
        self.cell.get_or_init(|| (self.init)()).clone()
    }
}

impl std::fmt::Debug for LazyModelProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyModelProvider")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn lazy_provider_initializes_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let provider = LazyModelProvider::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            ModelHandle::from("default-model")
        });

        assert!(!provider.is_initialized());
        assert_eq!(provider.default_model().as_str(), "default-model");
        assert_eq!(provider.default_model().as_str(), "default-model");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(provider.is_initialized());
    }
}
