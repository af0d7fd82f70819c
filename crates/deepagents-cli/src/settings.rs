//! Startup settings: `.env` files, model spec, provider credentials.

use deepagents::providers::{OpenAiConfig, DEFAULT_OPENAI_BASE_URL};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";
pub const MODEL_ENV: &str = "DEEPAGENTS_MODEL";
pub const ENV_FILE: &str = ".env";

/// Base URLs for providers that do not need one configured.
const KNOWN_PROVIDERS: &[(&str, &str)] = &[
    ("openai", DEFAULT_OPENAI_BASE_URL),
    ("openrouter", "https://openrouter.ai/api/v1"),
    ("deepseek", "https://api.deepseek.com/v1"),
    ("groq", "https://api.groq.com/openai/v1"),
    ("ollama", "http://localhost:11434/v1"),
];

/// Providers that accept requests without an API key.
const KEYLESS_PROVIDERS: &[&str] = &["ollama"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelSpecError {
    #[error("model spec is empty")]
    Empty,

    #[error("model spec '{0}' has an empty provider (expected provider/model-name)")]
    EmptyProvider(String),

    #[error("model spec '{0}' has an empty model name (expected provider/model-name)")]
    EmptyModel(String),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{var} is not set; add it to .env or export it (see `deepagents help`)")]
    MissingApiKey { provider: String, var: String },

    #[error("unknown provider '{provider}'; set {var} to its OpenAI-compatible base URL")]
    UnknownProvider { provider: String, var: String },

    #[error(transparent)]
    ModelSpec(#[from] ModelSpecError),

    #[error("failed to load {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

/// `<provider>/<model-name>`; a bare name means `openai`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub provider: String,
    pub model: String,
}

impl FromStr for ModelSpec {
    type Err = ModelSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ModelSpecError::Empty);
        }
        let (provider, model) = match s.split_once('/') {
            Some((provider, model)) => (provider.trim(), model.trim()),
            None => ("openai", s),
        };
        if provider.is_empty() {
            return Err(ModelSpecError::EmptyProvider(s.to_string()));
        }
        if model.is_empty() {
            return Err(ModelSpecError::EmptyModel(s.to_string()));
        }
        Ok(Self {
            provider: provider.to_ascii_lowercase(),
            model: model.to_string(),
        })
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

/// `--model`, else `DEEPAGENTS_MODEL`, else the built-in default.
pub fn resolve_model_spec(
    flag: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ModelSpec, ModelSpecError> {
    match flag {
        Some(raw) => raw.parse(),
        None => lookup(MODEL_ENV)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
            .parse(),
    }
}

/// Credentials and endpoint for one model.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub spec: ModelSpec,
    pub api_key: Option<String>,
    pub base_url: String,
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("spec", &self.spec)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn env_prefix(provider: &str) -> String {
    provider.to_ascii_uppercase().replace('-', "_")
}

impl ProviderSettings {
    /// Resolve the API key and base URL as a pair so a key never reaches
    /// another provider's host.
    ///
    /// - `<PROVIDER>_API_KEY` set: `<PROVIDER>_BASE_URL`, else the provider's
    ///   known base URL.
    /// - otherwise `OPENAI_API_KEY`: `<PROVIDER>_BASE_URL`, else
    ///   `OPENAI_BASE_URL`, else the known base URL.
    /// - keyless providers without a key: `<PROVIDER>_BASE_URL`, else the
    ///   known base URL.
    pub fn resolve(
        spec: &ModelSpec,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SettingsError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let prefix = env_prefix(&spec.provider);
        let key_var = format!("{prefix}_API_KEY");
        let url_var = format!("{prefix}_BASE_URL");
        let known_url = || {
            KNOWN_PROVIDERS
                .iter()
                .find(|(name, _)| *name == spec.provider)
                .map(|(_, url)| url.to_string())
        };
        let keyless = KEYLESS_PROVIDERS.contains(&spec.provider.as_str());

        let provider_key = get(&key_var);
        let (api_key, base_url) = match provider_key {
            Some(key) => (Some(key), get(&url_var).or_else(known_url)),
            None if keyless => (None, get(&url_var).or_else(known_url)),
            None => {
                let Some(key) = get("OPENAI_API_KEY") else {
                    return Err(SettingsError::MissingApiKey {
                        provider: spec.provider.clone(),
                        var: key_var,
                    });
                };
                let base_url = get(&url_var)
                    .or_else(|| get("OPENAI_BASE_URL"))
                    .or_else(known_url);
                (Some(key), base_url)
            }
        };

        let base_url = base_url.ok_or_else(|| SettingsError::UnknownProvider {
            provider: spec.provider.clone(),
            var: url_var,
        })?;

        Ok(Self {
            spec: spec.clone(),
            api_key,
            base_url,
        })
    }

    pub fn openai_config(&self) -> OpenAiConfig {
        OpenAiConfig::new(self.api_key.clone(), self.spec.model.clone())
            .with_base_url(self.base_url.clone())
            .with_provider(self.spec.provider.clone())
    }
}

/// `.env` files in load order: the working directory, then `~/.deepagents`.
pub fn env_file_candidates(cwd: &Path, home: Option<&Path>) -> Vec<PathBuf> {
    let mut files = vec![cwd.join(ENV_FILE)];
    if let Some(home) = home {
        files.push(home.join(".deepagents").join(ENV_FILE));
    }
    files
}

/// Load every existing `.env` candidate into the process environment.
///
/// Variables already set are never overridden, so the process environment
/// wins, then the first file that defines a key.
pub fn load_env_files(cwd: &Path, home: Option<&Path>) -> Result<Vec<PathBuf>, SettingsError> {
    let mut loaded = Vec::new();
    for path in env_file_candidates(cwd, home) {
        if !path.is_file() {
            continue;
        }
        dotenvy::from_path(&path).map_err(|source| SettingsError::EnvFile {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Loaded environment file");
        loaded.push(path);
    }
    Ok(loaded)
}

pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

pub fn home_dir() -> Option<PathBuf> {
    directories::UserDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parses_model_specs() {
        assert_eq!(
            "openai/gpt-4o-mini".parse::<ModelSpec>().unwrap(),
            ModelSpec {
                provider: "openai".into(),
                model: "gpt-4o-mini".into()
            }
        );
        let nested: ModelSpec = "openrouter/anthropic/claude-3.5-sonnet".parse().unwrap();
        assert_eq!(nested.provider, "openrouter");
        assert_eq!(nested.model, "anthropic/claude-3.5-sonnet");
        assert_eq!(nested.to_string(), "openrouter/anthropic/claude-3.5-sonnet");

        let bare: ModelSpec = "gpt-4o".parse().unwrap();
        assert_eq!(bare.provider, "openai");

        assert_eq!("".parse::<ModelSpec>(), Err(ModelSpecError::Empty));
        assert!(matches!("/gpt-4o".parse::<ModelSpec>(), Err(ModelSpecError::EmptyProvider(_))));
        assert!(matches!("openai/".parse::<ModelSpec>(), Err(ModelSpecError::EmptyModel(_))));
    }

    #[test]
    fn model_flag_beats_env_beats_default() {
        let lookup = env(&[(MODEL_ENV, "deepseek/deepseek-chat")]);
        assert_eq!(
            resolve_model_spec(Some("groq/llama-3.1-8b-instant"), &lookup)
                .unwrap()
                .provider,
            "groq"
        );
        assert_eq!(resolve_model_spec(None, &lookup).unwrap().provider, "deepseek");
        assert_eq!(
            resolve_model_spec(None, env(&[])).unwrap().to_string(),
            DEFAULT_MODEL
        );
    }

    #[test]
    fn env_file_keys_configure_openai() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ENV_FILE);
        std::fs::write(
            &path,
            "OPENAI_API_KEY=sk-from-file\nOPENAI_BASE_URL=https://gateway.example.com/v1\n",
        )
        .unwrap();

        let pairs: HashMap<String, String> = dotenvy::from_path_iter(&path)
            .unwrap()
            .map(Result::unwrap)
            .collect();
        let lookup = move |key: &str| pairs.get(key).cloned();

        let settings =
            ProviderSettings::resolve(&"openai/gpt-4o-mini".parse().unwrap(), lookup).unwrap();
        assert_eq!(settings.api_key.as_deref(), Some("sk-from-file"));
        assert_eq!(settings.base_url, "https://gateway.example.com/v1");

        let config = settings.openai_config();
        assert_eq!(config.endpoint(), "https://gateway.example.com/v1/chat/completions");
        assert_eq!(config.model, "gpt-4o-mini");
    }

    #[test]
    fn provider_specific_credentials_win() {
        let lookup = env(&[
            ("OPENAI_API_KEY", "sk-openai"),
            ("OPENROUTER_API_KEY", "sk-or"),
        ]);
        let settings =
            ProviderSettings::resolve(&"openrouter/meta/llama".parse().unwrap(), lookup).unwrap();
        assert_eq!(settings.api_key.as_deref(), Some("sk-or"));
        assert_eq!(settings.base_url, "https://openrouter.ai/api/v1");
        assert!(!format!("{settings:?}").contains("sk-or"));

        // An OpenAI endpoint in .env must not receive another provider's key.
        let lookup = env(&[
            ("OPENAI_API_KEY", "sk-openai"),
            ("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            ("OPENROUTER_API_KEY", "sk-or-secret"),
        ]);
        let settings = ProviderSettings::resolve(
            &"openrouter/anthropic/claude-3.5-sonnet".parse().unwrap(),
            lookup,
        )
        .unwrap();
        assert_eq!(settings.api_key.as_deref(), Some("sk-or-secret"));
        assert_eq!(settings.base_url, "https://openrouter.ai/api/v1");

        let lookup = env(&[
            ("OPENAI_BASE_URL", "https://gateway.example.com/v1"),
            ("OPENROUTER_API_KEY", "sk-or"),
            ("OPENROUTER_BASE_URL", "https://or-proxy.example.com/v1"),
        ]);
        let settings =
            ProviderSettings::resolve(&"openrouter/meta/llama".parse().unwrap(), lookup).unwrap();
        assert_eq!(settings.base_url, "https://or-proxy.example.com/v1");
    }

    #[test]
    fn openai_key_travels_with_openai_base_url() {
        let lookup = env(&[
            ("OPENAI_API_KEY", "sk-gateway"),
            ("OPENAI_BASE_URL", "https://gateway.example.com/v1"),
        ]);
        let settings =
            ProviderSettings::resolve(&"openrouter/meta/llama".parse().unwrap(), &lookup).unwrap();
        assert_eq!(settings.api_key.as_deref(), Some("sk-gateway"));
        assert_eq!(settings.base_url, "https://gateway.example.com/v1");

        // Keyless providers never borrow the OpenAI key or endpoint.
        let ollama = ProviderSettings::resolve(&"ollama/llama3".parse().unwrap(), &lookup).unwrap();
        assert_eq!(ollama.api_key, None);
        assert_eq!(ollama.base_url, "http://localhost:11434/v1");
    }

    #[test]
    fn unknown_provider_key_needs_its_own_base_url() {
        let lookup = env(&[
            ("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            ("ACME_API_KEY", "sk-acme"),
        ]);
        let err = ProviderSettings::resolve(&"acme/model".parse().unwrap(), lookup).unwrap_err();
        assert!(matches!(err, SettingsError::UnknownProvider { ref var, .. } if var == "ACME_BASE_URL"));
    }

    #[test]
    fn falls_back_to_openai_credentials() {
        let lookup = env(&[("OPENAI_API_KEY", "sk-openai")]);
        let settings =
            ProviderSettings::resolve(&"deepseek/deepseek-chat".parse().unwrap(), lookup).unwrap();
        assert_eq!(settings.api_key.as_deref(), Some("sk-openai"));
        assert_eq!(settings.base_url, "https://api.deepseek.com/v1");

        let hyphenated = env(&[("MY_GATEWAY_API_KEY", "k"), ("MY_GATEWAY_BASE_URL", "http://gw/v1")]);
        let settings =
            ProviderSettings::resolve(&"my-gateway/model".parse().unwrap(), hyphenated).unwrap();
        assert_eq!(settings.base_url, "http://gw/v1");
    }

    #[test]
    fn missing_credentials_are_reported() {
        let err = ProviderSettings::resolve(&"openai/gpt-4o".parse().unwrap(), env(&[])).unwrap_err();
        assert!(matches!(err, SettingsError::MissingApiKey { ref var, .. } if var == "OPENAI_API_KEY"));

        let err = ProviderSettings::resolve(&"acme/model".parse().unwrap(), env(&[("OPENAI_API_KEY", "k")]))
            .unwrap_err();
        assert!(err.to_string().contains("ACME_BASE_URL"));

        let ollama = ProviderSettings::resolve(&"ollama/llama3".parse().unwrap(), env(&[])).unwrap();
        assert_eq!(ollama.api_key, None);
        assert_eq!(ollama.base_url, "http://localhost:11434/v1");
    }

    #[test]
    fn env_files_load_in_order_without_overriding() {
        let work = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir(home.path().join(".deepagents")).unwrap();
        std::fs::write(
            work.path().join(ENV_FILE),
            "DEEPAGENTS_TEST_ORDER_A=work\n",
        )
        .unwrap();
        std::fs::write(
            home.path().join(".deepagents").join(ENV_FILE),
            "DEEPAGENTS_TEST_ORDER_A=home\nDEEPAGENTS_TEST_ORDER_B=home\n",
        )
        .unwrap();

        let loaded = load_env_files(work.path(), Some(home.path())).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(process_env("DEEPAGENTS_TEST_ORDER_A").as_deref(), Some("work"));
        assert_eq!(process_env("DEEPAGENTS_TEST_ORDER_B").as_deref(), Some("home"));
    }
}
