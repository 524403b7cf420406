//! Provider registry and adapter factory
//!
//! Maps case-insensitive provider names to adapter constructors and answers
//! catalog queries without touching the network.

use std::fmt;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::catalog::ModelCatalog;
use crate::error::LlmError;
use crate::provider::{
    Adapter, AdapterOptions, AnthropicAdapter, GeminiAdapter, MistralAdapter, OpenAiAdapter, OpenRouterAdapter,
};
use crate::types::ModelDescriptor;

/// Builds an adapter from options and the shared catalog
pub type AdapterConstructor =
    Arc<dyn Fn(AdapterOptions, Arc<ModelCatalog>) -> Result<Arc<dyn Adapter>, LlmError> + Send + Sync>;

static GLOBAL: OnceLock<AdapterRegistry> = OnceLock::new();

/// Install the process-wide registry with the given catalog
///
/// Returns `false` if the registry was already initialised.
pub fn initialize(catalog: ModelCatalog) -> bool {
    let mut installed = false;
    GLOBAL.get_or_init(|| {
        installed = true;
        AdapterRegistry::with_defaults(Arc::new(catalog))
    });
    installed
}

/// Process-wide registry, initialised with the built-in catalog on first use
pub fn global() -> &'static AdapterRegistry {
    GLOBAL.get_or_init(|| AdapterRegistry::with_defaults(Arc::new(ModelCatalog::builtin())))
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

fn shared<A: Adapter + 'static>(adapter: Result<A, LlmError>) -> Result<Arc<dyn Adapter>, LlmError> {
    Ok(Arc::new(adapter?))
}

/// Registry of adapter constructors keyed by lowercase provider name
pub struct AdapterRegistry {
    constructors: DashMap<String, AdapterConstructor>,
    aliases: DashMap<String, String>,
    catalog: Arc<ModelCatalog>,
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("providers", &self.providers())
            .field("models", &self.catalog.len())
            .finish_non_exhaustive()
    }
}

impl AdapterRegistry {
    /// Empty registry over a catalog
    pub fn new(catalog: Arc<ModelCatalog>) -> Self {
        Self {
            constructors: DashMap::new(),
            aliases: DashMap::new(),
            catalog,
        }
    }

    /// Registry with every built-in provider and its aliases
    pub fn with_defaults(catalog: Arc<ModelCatalog>) -> Self {
        let registry = Self::new(catalog);

        registry.register(crate::provider::openai::PROVIDER, |options, catalog| {
            shared(OpenAiAdapter::new(options, catalog))
        });
        registry.register(crate::provider::anthropic::PROVIDER, |options, catalog| {
            shared(AnthropicAdapter::new(options, catalog))
        });
        registry.register(crate::provider::gemini::PROVIDER, |options, catalog| {
            shared(GeminiAdapter::new(options, catalog))
        });
        registry.register(crate::provider::openrouter::PROVIDER, |options, catalog| {
            shared(OpenRouterAdapter::new(options, catalog))
        });
        registry.register(crate::provider::mistral::PROVIDER, |options, catalog| {
            shared(MistralAdapter::new(options, catalog))
        });

        registry.alias("google", crate::provider::gemini::PROVIDER);
        registry.alias("claude", crate::provider::anthropic::PROVIDER);
        registry
    }

    /// Register or replace a constructor
    pub fn register<F>(&self, name: &str, constructor: F)
    where
        F: Fn(AdapterOptions, Arc<ModelCatalog>) -> Result<Arc<dyn Adapter>, LlmError> + Send + Sync + 'static,
    {
        let name = normalize(name);
        tracing::debug!(provider = %name, "registered adapter constructor");
        self.constructors.insert(name, Arc::new(constructor));
    }

    /// Accept `alias` as another name for `target`
    pub fn alias(&self, alias: &str, target: &str) {
        self.aliases.insert(normalize(alias), normalize(target));
    }

    /// Canonical lowercase name for a provider or alias
    pub fn canonical_name(&self, name: &str) -> String {
        let name = normalize(name);
        match self.aliases.get(&name) {
            Some(target) => target.clone(),
            None => name,
        }
    }

    /// Construct an adapter by provider name
    pub fn create(&self, name: &str, options: AdapterOptions) -> Result<Arc<dyn Adapter>, LlmError> {
        let canonical = self.canonical_name(name);

        // Clone out of the map so the shard lock is not held during construction
        let constructor = self
            .constructors
            .get(&canonical)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LlmError::UnsupportedProvider {
                provider: name.to_owned(),
            })?;

        constructor(options, Arc::clone(&self.catalog))
    }

    pub fn is_supported(&self, name: &str) -> bool {
        self.constructors.contains_key(&self.canonical_name(name))
    }

    /// Registered canonical provider names, sorted
    pub fn providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    pub fn catalog(&self) -> &Arc<ModelCatalog> {
        &self.catalog
    }

    /// Catalogued models for a provider or alias
    pub fn models_for(&self, provider: &str) -> Vec<ModelDescriptor> {
        self.catalog.models_for(&self.canonical_name(provider))
    }

    pub fn all_models(&self) -> Vec<ModelDescriptor> {
        self.catalog.all().to_vec()
    }

    pub fn find_model(&self, id: &str) -> Option<ModelDescriptor> {
        self.catalog.find(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> AdapterRegistry {
        AdapterRegistry::with_defaults(Arc::new(ModelCatalog::builtin()))
    }

    #[test]
    fn creates_every_builtin_provider_with_lowercase_name() {
        let registry = registry();
        for name in ["openai", "OpenAI", "ANTHROPIC", "Gemini", "openrouter", "Mistral"] {
            let adapter = registry.create(name, AdapterOptions::new("key")).unwrap();
            assert_eq!(adapter.provider(), name.to_ascii_lowercase());
        }
    }

    #[test]
    fn aliases_resolve_to_canonical_names() {
        let registry = registry();
        assert_eq!(registry.create("google", AdapterOptions::new("key")).unwrap().provider(), "gemini");
        assert_eq!(registry.create("Claude", AdapterOptions::new("key")).unwrap().provider(), "anthropic");
        assert!(registry.is_supported("GOOGLE"));
        assert_eq!(registry.models_for("google"), registry.models_for("gemini"));
    }

    #[test]
    fn unknown_provider_is_unsupported() {
        let registry = registry();
        let err = registry.create("cohere", AdapterOptions::new("key")).unwrap_err();
        assert!(matches!(err, LlmError::UnsupportedProvider { provider } if provider == "cohere"));
        assert!(!registry.is_supported("cohere"));
    }

    #[test]
    fn empty_key_is_missing_credential_for_every_provider() {
        let registry = registry();
        for name in registry.providers() {
            let err = registry.create(&name, AdapterOptions::new("")).unwrap_err();
            assert!(matches!(err, LlmError::MissingCredential { .. }), "{name}");
        }
    }

    #[test]
    fn providers_are_sorted_and_exclude_aliases() {
        assert_eq!(
            registry().providers(),
            ["anthropic", "gemini", "mistral", "openai", "openrouter"]
        );
    }

    #[test]
    fn runtime_registration_extends_registry() {
        let registry = registry();
        registry.register("Local", |options, catalog| {
            shared(OpenAiAdapter::new(options, catalog))
        });
        assert!(registry.is_supported("local"));
        assert!(registry.providers().contains(&"local".to_owned()));
    }

    #[test]
    fn padded_names_register_and_alias_trimmed() {
        let registry = registry();
        registry.register(" Custom ", |options, catalog| {
            shared(OpenAiAdapter::new(options, catalog))
        });
        registry.alias(" Mine\t", " Custom");

        assert!(registry.is_supported("custom"));
        assert!(registry.providers().contains(&"custom".to_owned()));
        assert_eq!(registry.canonical_name("mine"), "custom");
        assert!(registry.create("mine", AdapterOptions::new("key")).is_ok());
    }

    #[test]
    fn catalog_queries_need_no_adapter() {
        let registry = AdapterRegistry::new(Arc::new(ModelCatalog::builtin()));
        assert!(registry.providers().is_empty());
        assert!(!registry.models_for("openai").is_empty());
        assert_eq!(registry.all_models().len(), registry.catalog().len());
        assert_eq!(registry.find_model("codestral-latest").unwrap().provider, "mistral");
    }

    #[test]
    fn global_registry_has_defaults() {
        assert!(global().is_supported("openai"));
        assert!(!initialize(ModelCatalog::default()));
    }
}
