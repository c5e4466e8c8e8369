use std::collections::HashMap;

use super::{LlmProvider, ProviderConfig, ProviderKind};
use crate::error::LlmError;

/// Read-through cache of model listings, keyed by provider and a
/// credential fingerprint. Entries are only ever added.
#[derive(Debug, Default)]
pub struct ModelCatalog {
    entries: HashMap<(ProviderKind, String), Vec<String>>,
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Models for `cfg`, asking `provider` only on a cache miss.
    /// Failed lookups are not cached.
    pub fn models(
        &mut self,
        cfg: &ProviderConfig,
        provider: &dyn LlmProvider,
    ) -> Result<&[String], LlmError> {
        let key = (cfg.kind, cfg.credential_fingerprint());

        if !self.entries.contains_key(&key) {
            log::debug!("Model list cache miss for {}", cfg.kind);
            let models = provider.list_models()?;
            self.entries.insert(key.clone(), models);
        }

        Ok(self.entries.get(&key).map(Vec::as_slice).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmResponse;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
        fail: bool,
    }

    impl LlmProvider for CountingProvider {
        fn kind(&self) -> ProviderKind {
            ProviderKind::OpenAi
        }

        fn generate(&self, _prompt: &str) -> Result<LlmResponse, LlmError> {
            unreachable!("catalog never generates")
        }

        fn list_models(&self) -> Result<Vec<String>, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(LlmError::RateLimited { provider: "OpenAI" });
            }
            Ok(vec!["gpt-a".into(), "gpt-b".into()])
        }
    }

    fn cfg(key: &str) -> ProviderConfig {
        let mut cfg = ProviderConfig::new(ProviderKind::OpenAi);
        cfg.api_key = Some(key.into());
        cfg
    }

    #[test]
    fn second_lookup_is_served_from_cache() {
        let provider = CountingProvider { calls: AtomicUsize::new(0), fail: false };
        let mut catalog = ModelCatalog::new();

        assert_eq!(catalog.models(&cfg("sk-aaaaaaaa1"), &provider).unwrap(), ["gpt-a", "gpt-b"]);
        assert_eq!(catalog.models(&cfg("sk-aaaaaaaa1"), &provider).unwrap().len(), 2);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn keys_sharing_a_prefix_are_cached_separately() {
        let provider = CountingProvider { calls: AtomicUsize::new(0), fail: false };
        let mut catalog = ModelCatalog::new();

        catalog.models(&cfg("sk-proj-first-account"), &provider).unwrap();
        catalog.models(&cfg("sk-proj-other-account"), &provider).unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    /// Answers with a model list that depends on which server it stands for.
    struct LocalServer(&'static str);

    impl LlmProvider for LocalServer {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Local
        }

        fn generate(&self, _prompt: &str) -> Result<LlmResponse, LlmError> {
            unreachable!("catalog never generates")
        }

        fn list_models(&self) -> Result<Vec<String>, LlmError> {
            Ok(vec![self.0.to_string()])
        }
    }

    #[test]
    fn local_servers_are_cached_per_endpoint() {
        let mut catalog = ModelCatalog::new();
        let local = |endpoint: &str| {
            let mut cfg = ProviderConfig::new(ProviderKind::Local);
            cfg.endpoint = Some(endpoint.into());
            cfg
        };

        let laptop = catalog
            .models(&local("http://localhost:11434"), &LocalServer("llama3"))
            .unwrap()
            .to_vec();
        let lab = catalog
            .models(&local("http://lab-gpu:11434"), &LocalServer("qwen2.5"))
            .unwrap()
            .to_vec();

        assert_eq!(laptop, ["llama3"]);
        assert_eq!(lab, ["qwen2.5"]);
    }

    #[test]
    fn failures_are_not_cached() {
        let provider = CountingProvider { calls: AtomicUsize::new(0), fail: true };
        let mut catalog = ModelCatalog::new();

        assert!(catalog.models(&cfg("sk-x"), &provider).is_err());
        assert!(catalog.models(&cfg("sk-x"), &provider).is_err());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }
}
