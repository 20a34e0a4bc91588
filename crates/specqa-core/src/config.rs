//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars. Provides a helper to expand `~` and `${VAR}` in paths.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Every recognized option, flat, with its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub hybrid_search_enabled: bool,
    pub hybrid_search_alpha: f32,
    /// Each sub-search fetches `top_k * candidate_multiplier` before fusion.
    pub candidate_multiplier: usize,
    pub rrf_k: f64,
    pub top_k: usize,

    pub cache_enabled: bool,
    pub cache_max_size: usize,
    pub cache_ttl_seconds: u64,

    pub confidence_scoring_enabled: bool,

    pub metrics_enabled: bool,
    pub metrics_window_size: usize,

    pub embedding_dim: usize,
    pub data_dir: String,

    pub generation_timeout_secs: u64,
    pub generation_max_attempts: u32,
    pub generation_base_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hybrid_search_enabled: false,
            hybrid_search_alpha: 0.5,
            candidate_multiplier: 3,
            rrf_k: 60.0,
            top_k: 5,
            cache_enabled: false,
            cache_max_size: 100,
            cache_ttl_seconds: 3600,
            confidence_scoring_enabled: false,
            metrics_enabled: false,
            metrics_window_size: 100,
            embedding_dim: 384,
            data_dir: "data/documents".to_string(),
            generation_timeout_secs: 60,
            generation_max_attempts: 3,
            generation_base_delay_ms: 2000,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.hybrid_search_alpha) {
            return Err(Error::InvalidConfig(format!(
                "hybrid_search_alpha must be within [0, 1], got {}",
                self.hybrid_search_alpha
            )));
        }
        if self.cache_max_size == 0 {
            return Err(Error::InvalidConfig("cache_max_size must be at least 1".into()));
        }
        if self.metrics_window_size == 0 {
            return Err(Error::InvalidConfig("metrics_window_size must be at least 1".into()));
        }
        if self.top_k == 0 {
            return Err(Error::InvalidConfig("top_k must be at least 1".into()));
        }
        if self.candidate_multiplier == 0 {
            return Err(Error::InvalidConfig("candidate_multiplier must be at least 1".into()));
        }
        if !(self.rrf_k > 0.0 && self.rrf_k.is_finite()) {
            return Err(Error::InvalidConfig(format!("rrf_k must be a positive number, got {}", self.rrf_k)));
        }
        if self.embedding_dim == 0 {
            return Err(Error::InvalidConfig("embedding_dim must be at least 1".into()));
        }
        Ok(())
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    /// Load for the environment named by `RUST_ENV` (defaults to `dev`).
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(&env_name)
    }

    pub fn load_for_env(env_name: &str) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            other => tracing::debug!(env = other, "no environment overlay for RUST_ENV"),
        }
        figment = figment.merge(Env::prefixed("APP_"));

        let config = Self { figment };
        config.settings()?.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    pub fn settings(&self) -> Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| Error::InvalidConfig(format!("Failed to extract settings: {e}")))
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert!(!s.hybrid_search_enabled);
        assert!((s.hybrid_search_alpha - 0.5).abs() < f32::EPSILON);
        assert_eq!(s.cache_max_size, 100);
        assert_eq!(s.cache_ttl_seconds, 3600);
        assert_eq!(s.metrics_window_size, 100);
        assert_eq!(s.candidate_multiplier, 3);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn toml_and_env_layers_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                    hybrid_search_enabled = true
                    hybrid_search_alpha = 0.7
                    cache_enabled = true
                "#,
            )?;
            jail.create_file("config.test.toml", "cache_max_size = 10")?;
            jail.set_env("APP_METRICS_WINDOW_SIZE", "25");

            let config = Config::load_for_env("test").expect("load");
            let s = config.settings().expect("settings");
            assert!(s.hybrid_search_enabled);
            assert!((s.hybrid_search_alpha - 0.7).abs() < 1e-6);
            assert!(s.cache_enabled);
            assert_eq!(s.cache_max_size, 10);
            assert_eq!(s.metrics_window_size, 25);
            assert_eq!(s.cache_ttl_seconds, 3600);
            let ttl: u64 = config.get("cache_ttl_seconds").expect("get");
            assert_eq!(ttl, 3600);
            Ok(())
        });
    }

    #[test]
    fn out_of_range_alpha_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "hybrid_search_alpha = 1.5")?;
            let err = Config::load_for_env("dev").err().expect("should fail");
            assert!(matches!(err, Error::InvalidConfig(_)));
            Ok(())
        });
    }

    #[test]
    fn zero_sizes_are_rejected() {
        let s = Settings { cache_max_size: 0, ..Settings::default() };
        assert!(s.validate().is_err());
        let s = Settings { candidate_multiplier: 0, ..Settings::default() };
        assert!(s.validate().is_err());
    }

    #[test]
    fn non_positive_rrf_k_is_rejected() {
        for rrf_k in [0.0, -1.0, -60.0, f64::NAN, f64::INFINITY] {
            let s = Settings { rrf_k, ..Settings::default() };
            assert!(matches!(s.validate(), Err(Error::InvalidConfig(_))), "rrf_k = {rrf_k}");
        }
        assert!(Settings { rrf_k: 1.0, ..Settings::default() }.validate().is_ok());
    }

    #[test]
    fn expand_path_keeps_plain_paths() {
        assert_eq!(expand_path("data/documents"), PathBuf::from("data/documents"));
        assert_eq!(expand_path("/tmp/docs"), PathBuf::from("/tmp/docs"));
    }
}
