use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, bail};
use secrecy::ExposeSecret;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// A relative catalog path is resolved against the file's directory.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        let mut config = Self::parse(&raw)?;

        if let Some(catalog) = config.catalog.as_mut()
            && catalog.path.is_relative()
            && let Some(dir) = path.parent()
        {
            catalog.path = dir.join(&catalog.path);
        }

        Ok(config)
    }

    /// Expand, deserialize and validate configuration text
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let expanded = crate::env::expand_env(raw).context("config variable expansion failed")?;
        let config: Self = toml::from_str(&expanded).context("failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration is internally consistent
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_providers()?;

        if let Some(catalog) = &self.catalog
            && catalog.path.as_os_str().is_empty()
        {
            bail!("catalog.path must not be empty");
        }

        Ok(())
    }

    fn validate_providers(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::new();

        for (name, provider) in &self.providers {
            if name.trim().is_empty() {
                bail!("provider names must not be empty");
            }

            if !seen.insert(name.to_ascii_lowercase()) {
                bail!("provider '{name}' is configured more than once");
            }

            if provider.api_key.expose_secret().trim().is_empty() {
                bail!("providers.{name}.api_key must not be empty");
            }

            if let Some(url) = &provider.base_url
                && !matches!(url.scheme(), "http" | "https")
            {
                bail!("providers.{name}.base_url must use http or https, got '{}'", url.scheme());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use secrecy::ExposeSecret;

    use crate::Config;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert!(config.providers.is_empty());
        assert!(config.catalog.is_none());
        assert_eq!(config.telemetry.log_filter, "info");
        assert!(!config.telemetry.json);
    }

    #[test]
    fn full_config() {
        let vars = [("RELAY_CFG_OPENAI", Some("sk-test")), ("RELAY_CFG_OPENROUTER", Some("sk-or"))];
        temp_env::with_vars(vars, || {
            let config = Config::parse(
                r#"
                [providers.openai]
                api_key = "{{ env.RELAY_CFG_OPENAI }}"
                base_url = "http://localhost:9000/v1"

                [providers.openrouter]
                api_key = "{{ env.RELAY_CFG_OPENROUTER }}"
                referer = "https://example.com"
                title = "relay"

                [telemetry]
                log_filter = "relay_llm=debug"
                json = true
                "#,
            )
            .unwrap();

            let names: Vec<&str> = config.providers.keys().map(String::as_str).collect();
            assert_eq!(names, ["openai", "openrouter"]);

            let openai = config.provider("OpenAI").unwrap();
            assert_eq!(openai.api_key.expose_secret(), "sk-test");
            assert_eq!(openai.base_url.as_ref().unwrap().as_str(), "http://localhost:9000/v1");

            let openrouter = config.provider("openrouter").unwrap();
            assert_eq!(openrouter.referer.as_deref(), Some("https://example.com"));
            assert_eq!(openrouter.title.as_deref(), Some("relay"));

            assert_eq!(config.telemetry.log_filter, "relay_llm=debug");
            assert!(config.telemetry.json);
        });
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let err = Config::parse("[providers.mistral]\napi_key = \"  \"").unwrap_err();
        assert!(err.to_string().contains("providers.mistral.api_key"));
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        let err = Config::parse("[providers.openai]\napi_key = \"k\"\nbase_url = \"ftp://example.com\"").unwrap_err();
        assert!(err.to_string().contains("http or https"));
    }

    #[test]
    fn case_insensitive_duplicates_are_rejected() {
        let err = Config::parse("[providers.openai]\napi_key = \"a\"\n[providers.OpenAI]\napi_key = \"b\"").unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = Config::parse("[providers.openai]\napi_key = \"k\"\nregion = \"us\"").unwrap_err();
        assert!(format!("{err:#}").contains("region"));
    }

    #[test]
    fn unset_variable_fails_expansion() {
        temp_env::with_var_unset("RELAY_CFG_UNSET", || {
            let err = Config::parse("[providers.openai]\napi_key = \"{{ env.RELAY_CFG_UNSET }}\"").unwrap_err();
            assert!(format!("{err:#}").contains("RELAY_CFG_UNSET"));
        });
    }

    #[test]
    fn load_resolves_catalog_next_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[catalog]\npath = \"models.toml\"").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.catalog.unwrap().path, dir.path().join("models.toml"));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = Config::load(std::path::Path::new("/nonexistent/relay.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/relay.toml"));
    }
}
