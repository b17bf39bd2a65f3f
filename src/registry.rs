//! Provider registry keyed by configuration tag.
//!
//! Tasks resolve their provider once, at job start:
//!
//! ```rust
//! use std::sync::Arc;
//! use speech_tasks::registry::ProviderRegistry;
//!
//! trait Greeter: Send + Sync { fn hi(&self) -> &'static str; }
//! struct En;
//! impl Greeter for En { fn hi(&self) -> &'static str { "hello" } }
//!
//! let mut registry: ProviderRegistry<dyn Greeter> = ProviderRegistry::new();
//! registry.register("en", Arc::new(En));
//! assert_eq!(registry.resolve("en").unwrap().hi(), "hello");
//! assert!(registry.resolve("fr").is_err());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::TaskError;

/// Maps a tag (as written in `settings.toml`) to a shared provider.
pub struct ProviderRegistry<T: ?Sized> {
    providers: HashMap<String, Arc<T>>,
}

impl<T: ?Sized> ProviderRegistry<T> {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Register `provider` under `tag`, replacing any previous entry.
    pub fn register(&mut self, tag: impl Into<String>, provider: Arc<T>) -> &mut Self {
        self.providers.insert(tag.into(), provider);
        self
    }

    /// Look up `tag`.
    ///
    /// # Errors
    ///
    /// [`TaskError::UnknownProvider`] when nothing is registered under `tag`.
    pub fn resolve(&self, tag: &str) -> Result<Arc<T>, TaskError> {
        self.providers
            .get(tag)
            .cloned()
            .ok_or_else(|| TaskError::UnknownProvider(tag.to_string()))
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}

impl<T: ?Sized> Default for ProviderRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Named: Send + Sync {
        fn name(&self) -> String;
    }

    struct Fixed(&'static str);

    impl Named for Fixed {
        fn name(&self) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn resolves_registered_tag() {
        let mut registry: ProviderRegistry<dyn Named> = ProviderRegistry::new();
        registry
            .register("edge", Arc::new(Fixed("edge-tts")))
            .register("azure", Arc::new(Fixed("azure-tts")));

        assert_eq!(registry.resolve("azure").unwrap().name(), "azure-tts");
        assert_eq!(registry.tags(), vec!["azure", "edge"]);
    }

    #[test]
    fn later_registration_wins() {
        let mut registry: ProviderRegistry<dyn Named> = ProviderRegistry::new();
        registry.register("x", Arc::new(Fixed("old")));
        registry.register("x", Arc::new(Fixed("new")));
        assert_eq!(registry.resolve("x").unwrap().name(), "new");
    }

    #[test]
    fn unknown_tag_is_an_error() {
        let registry: ProviderRegistry<dyn Named> = ProviderRegistry::default();
        let err = registry.resolve("missing").err().unwrap();
        assert!(matches!(err, TaskError::UnknownProvider(t) if t == "missing"));
    }
}
