//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/ttyf/ttyf.toml`
//! 3. Compatibility variables: `ENV`, `PLAID_CLIENT_ID`, `SANDBOX_PLAID_SECRET_KEY`, `PROD_PLAID_SECRET_KEY`
//! 4. Environment variables: `TTYF_*` prefix (`__` separates sections)

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{expand_env_vars, PlaidEnvironment};

/// Plaid client configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlaidConfig {
    /// sandbox or production
    pub environment: PlaidEnvironment,
    pub client_id: Option<String>,
    pub secret: Option<String>,
    /// Override the API host (default derived from `environment`)
    pub base_url: Option<String>,
    /// Name shown to the user in Plaid Link
    pub client_name: String,
    pub products: Vec<String>,
    pub country_codes: Vec<String>,
    pub language: String,
}

impl Default for PlaidConfig {
    fn default() -> Self {
        Self {
            environment: PlaidEnvironment::Sandbox,
            client_id: None,
            secret: None,
            base_url: None,
            client_name: "TTYF App".into(),
            products: vec!["transactions".into()],
            country_codes: vec!["CA".into()],
            language: "en".into(),
        }
    }
}

impl PlaidConfig {
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.environment.base_url().to_string())
    }
}

/// Local OAuth callback server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CallbackConfig {
    pub host: String,
    pub port: u16,
    /// How long to wait for the user to finish authorization
    pub timeout_secs: u64,
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 8000,
            timeout_secs: 300,
        }
    }
}

impl CallbackConfig {
    fn origin(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Where Plaid sends the browser after hosted Link completes.
    pub fn redirect_uri(&self) -> String {
        format!("{}/oauth-callback", self.origin())
    }

    pub fn webhook_url(&self) -> String {
        format!("{}/auth/plaid/webhook", self.origin())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Raw Plaid config for intermediate parsing (fields are Option to detect "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawPlaidConfig {
    pub environment: Option<PlaidEnvironment>,
    pub client_id: Option<String>,
    pub secret: Option<String>,
    pub base_url: Option<String>,
    pub client_name: Option<String>,
    pub products: Option<Vec<String>>,
    pub country_codes: Option<Vec<String>>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawCallbackConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub timeout_secs: Option<u64>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub storage_dir: Option<PathBuf>,
    pub banner: Option<bool>,
    pub browser: Option<String>,
    pub plaid: RawPlaidConfig,
    pub callback: RawCallbackConfig,
}

impl PlaidConfig {
    /// Overlay wins for every field it specifies. Arrays replace.
    pub fn merge(&self, overlay: &RawPlaidConfig) -> Self {
        Self {
            environment: overlay.environment.unwrap_or(self.environment),
            client_id: overlay.client_id.clone().or_else(|| self.client_id.clone()),
            secret: overlay.secret.clone().or_else(|| self.secret.clone()),
            base_url: overlay.base_url.clone().or_else(|| self.base_url.clone()),
            client_name: overlay
                .client_name
                .clone()
                .unwrap_or_else(|| self.client_name.clone()),
            products: overlay
                .products
                .clone()
                .unwrap_or_else(|| self.products.clone()),
            country_codes: overlay
                .country_codes
                .clone()
                .unwrap_or_else(|| self.country_codes.clone()),
            language: overlay
                .language
                .clone()
                .unwrap_or_else(|| self.language.clone()),
        }
    }
}

impl CallbackConfig {
    pub fn merge(&self, overlay: &RawCallbackConfig) -> Self {
        Self {
            host: overlay.host.clone().unwrap_or_else(|| self.host.clone()),
            port: overlay.port.unwrap_or(self.port),
            timeout_secs: overlay.timeout_secs.unwrap_or(self.timeout_secs),
        }
    }
}

/// Unified configuration for ttyf.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Directory holding connections, credentials and secrets (default: ~/.ttyf)
    pub storage_dir: PathBuf,
    /// Print the welcome banner
    pub banner: bool,
    /// Command used to open the hosted Link page (default: platform opener)
    pub browser: Option<String>,
    pub plaid: PlaidConfig,
    pub callback: CallbackConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            banner: true,
            browser: None,
            plaid: PlaidConfig::default(),
            callback: CallbackConfig::default(),
        }
    }
}

/// Get the default storage directory (~/.ttyf).
fn default_storage_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".ttyf"))
        .unwrap_or_else(|| PathBuf::from("~/.ttyf"))
}

/// Get the XDG config directory for ttyf.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "ttyf").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("ttyf.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    pub fn connections_path(&self) -> PathBuf {
        self.storage_dir.join("connections.json")
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.storage_dir.join("credentials.json")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.storage_dir.join("secrets.json")
    }

    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.storage_dir.to_string_lossy().as_ref());
        self.storage_dir = PathBuf::from(expanded);

        if let Some(browser) = &self.browser {
            self.browser = Some(expand_env_vars(browser));
        }
    }

    /// Overlay wins for every field it specifies.
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            storage_dir: overlay
                .storage_dir
                .clone()
                .unwrap_or_else(|| self.storage_dir.clone()),
            banner: overlay.banner.unwrap_or(self.banner),
            browser: overlay.browser.clone().or_else(|| self.browser.clone()),
            plaid: self.plaid.merge(&overlay.plaid),
            callback: self.callback.merge(&overlay.callback),
        }
    }

    /// Load settings with layered precedence from the XDG global config.
    pub fn load() -> Result<Self, ApplicationError> {
        Self::load_from(global_config_path().as_deref())
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Optional TOML file layered over the defaults; skipped if missing
    pub fn load_from(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(path) = config_file {
            if path.exists() {
                let raw = load_raw_settings(path)?;
                current = current.merge_with(&raw);
            }
        }

        current = current.apply_environment(|key| std::env::var(key).ok(), env_source())?;

        current.expand_paths();
        Ok(current)
    }

    /// Layer the process environment over file settings.
    ///
    /// Plain Plaid variables first, then `TTYF_*`. The legacy secret is picked
    /// for the final environment and only used when `TTYF_PLAID__SECRET` is unset.
    pub fn apply_environment(
        self,
        lookup: impl Fn(&str) -> Option<String>,
        source: Environment,
    ) -> Result<Self, ApplicationError> {
        let secret_pinned = build_config(source.clone().try_parsing(false))?
            .get_string("plaid.secret")
            .is_ok();
        let settings = Self::apply_overrides_from(self.apply_legacy_env(&lookup), source)?;
        if secret_pinned {
            Ok(settings)
        } else {
            Ok(settings.apply_legacy_secret(&lookup))
        }
    }

    /// Apply `ENV` and `PLAID_CLIENT_ID`.
    pub fn apply_legacy_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(env) = non_empty(&lookup, "ENV") {
            self.plaid.environment = PlaidEnvironment::from_legacy_env(&env);
        }
        if let Some(id) = non_empty(&lookup, "PLAID_CLIENT_ID") {
            self.plaid.client_id = Some(id);
        }
        self
    }

    /// Apply the `*_PLAID_SECRET_KEY` matching the selected environment.
    pub fn apply_legacy_secret(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let secret_key = match self.plaid.environment {
            PlaidEnvironment::Production => "PROD_PLAID_SECRET_KEY",
            PlaidEnvironment::Sandbox => "SANDBOX_PLAID_SECRET_KEY",
        };
        if let Some(secret) = non_empty(&lookup, secret_key) {
            self.plaid.secret = Some(secret);
        }
        self
    }

    /// Apply overrides from a `config` environment source.
    ///
    /// Text values are read unparsed so ids like `0012345` keep their digits.
    pub fn apply_overrides_from(
        mut settings: Self,
        source: Environment,
    ) -> Result<Self, ApplicationError> {
        let raw = build_config(source.clone().try_parsing(false))?;
        let config = build_config(source.try_parsing(true))?;

        if let Ok(val) = raw.get_string("storage_dir") {
            settings.storage_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_bool("banner") {
            settings.banner = val;
        }
        if let Ok(val) = raw.get_string("browser") {
            settings.browser = Some(val);
        }
        if let Ok(val) = raw.get_string("plaid.environment") {
            settings.plaid.environment = val.parse().map_err(|e| ApplicationError::Config {
                message: format!("TTYF_PLAID__ENVIRONMENT: {e}"),
            })?;
        }
        if let Ok(val) = raw.get_string("plaid.client_id") {
            settings.plaid.client_id = Some(val);
        }
        if let Ok(val) = raw.get_string("plaid.secret") {
            settings.plaid.secret = Some(val);
        }
        if let Ok(val) = raw.get_string("plaid.base_url") {
            settings.plaid.base_url = Some(val);
        }
        if let Ok(val) = raw.get_string("plaid.client_name") {
            settings.plaid.client_name = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("plaid.products") {
            settings.plaid.products = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("plaid.country_codes") {
            settings.plaid.country_codes = val;
        }
        if let Ok(val) = raw.get_string("plaid.language") {
            settings.plaid.language = val;
        }
        if let Ok(val) = raw.get_string("callback.host") {
            settings.callback.host = val;
        }
        if let Ok(val) = config.get::<u16>("callback.port") {
            settings.callback.port = val;
        }
        if let Ok(val) = config.get::<u64>("callback.timeout_secs") {
            settings.callback.timeout_secs = val;
        }

        Ok(settings)
    }

    /// Copy with the Plaid secret masked, for display.
    pub fn redacted(&self) -> Self {
        let mut shown = self.clone();
        if shown.plaid.secret.is_some() {
            shown.plaid.secret = Some("********".into());
        }
        shown
    }

    /// Show the effective configuration as TOML (secret masked).
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(&self.redacted()).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# ttyf configuration
#
# Precedence (lowest to highest):
#   Defaults
#   This file: ~/.config/ttyf/ttyf.toml
#   ENV, PLAID_CLIENT_ID, SANDBOX_PLAID_SECRET_KEY, PROD_PLAID_SECRET_KEY
#   TTYF_* environment variables, e.g. TTYF_PLAID__CLIENT_ID, TTYF_CALLBACK__PORT

# Where connections, credentials and secrets are stored
# storage_dir = "~/.ttyf"

# Print the welcome banner
# banner = true

# Command used to open the Plaid Link page (default: open / xdg-open / start)
# browser = "firefox"

[plaid]
# sandbox or production
# environment = "sandbox"
# client_id = "..."
# secret = "..."
# client_name = "TTYF App"
# products = ["transactions"]
# country_codes = ["CA"]
# language = "en"

[callback]
# Local server receiving the OAuth redirect
# host = "localhost"
# port = 8000
# timeout_secs = 300
"#
        .to_string()
    }
}

/// `TTYF_*` variables, `__` between nested keys, comma-separated lists.
fn env_source() -> Environment {
    Environment::with_prefix("TTYF")
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("plaid.products")
        .with_list_parse_key("plaid.country_codes")
}

fn build_config(source: Environment) -> Result<Config, ApplicationError> {
    Config::builder().add_source(source).build().map_err(config_err)
}

fn non_empty(lookup: impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn ttyf_vars(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        env_source().source(Some(map))
    }

    #[test]
    fn given_defaults_when_created_then_matches_link_flow_constants() {
        let settings = Settings::default();
        assert!(settings.storage_dir.to_string_lossy().ends_with(".ttyf"));
        assert!(settings.banner);
        assert_eq!(settings.plaid.environment, PlaidEnvironment::Sandbox);
        assert_eq!(settings.plaid.client_name, "TTYF App");
        assert_eq!(settings.plaid.products, vec!["transactions".to_string()]);
        assert_eq!(settings.plaid.country_codes, vec!["CA".to_string()]);
        assert_eq!(
            settings.callback.redirect_uri(),
            "http://localhost:8000/oauth-callback"
        );
        assert_eq!(
            settings.callback.webhook_url(),
            "http://localhost:8000/auth/plaid/webhook"
        );
        assert_eq!(settings.callback.timeout(), Duration::from_secs(300));
    }

    #[test]
    fn given_prod_env_when_applying_legacy_then_uses_production_secret() {
        let settings = Settings::default()
            .apply_environment(
                lookup(&[
                    ("ENV", "PROD"),
                    ("PLAID_CLIENT_ID", "client-1"),
                    ("SANDBOX_PLAID_SECRET_KEY", "sandbox-secret"),
                    ("PROD_PLAID_SECRET_KEY", "prod-secret"),
                ]),
                ttyf_vars(&[]),
            )
            .unwrap();

        assert_eq!(settings.plaid.environment, PlaidEnvironment::Production);
        assert_eq!(settings.plaid.client_id.as_deref(), Some("client-1"));
        assert_eq!(settings.plaid.secret.as_deref(), Some("prod-secret"));
    }

    #[test]
    fn given_no_env_when_applying_legacy_then_uses_sandbox_secret() {
        let settings = Settings::default()
            .apply_environment(
                lookup(&[
                    ("SANDBOX_PLAID_SECRET_KEY", "sandbox-secret"),
                    ("PROD_PLAID_SECRET_KEY", "prod-secret"),
                ]),
                ttyf_vars(&[]),
            )
            .unwrap();

        assert_eq!(settings.plaid.environment, PlaidEnvironment::Sandbox);
        assert_eq!(settings.plaid.secret.as_deref(), Some("sandbox-secret"));
    }

    #[test]
    fn given_empty_legacy_values_when_applying_then_keeps_current() {
        let mut base = Settings::default();
        base.plaid.client_id = Some("from-file".into());

        let settings = base.apply_legacy_env(lookup(&[("PLAID_CLIENT_ID", "  ")]));

        assert_eq!(settings.plaid.client_id.as_deref(), Some("from-file"));
    }

    #[test]
    fn given_ttyf_production_and_legacy_secrets_when_applying_then_uses_production_secret() {
        let settings = Settings::default()
            .apply_environment(
                lookup(&[
                    ("SANDBOX_PLAID_SECRET_KEY", "sandbox-secret"),
                    ("PROD_PLAID_SECRET_KEY", "prod-secret"),
                ]),
                ttyf_vars(&[("TTYF_PLAID__ENVIRONMENT", "production")]),
            )
            .unwrap();

        assert_eq!(settings.plaid.environment, PlaidEnvironment::Production);
        assert_eq!(settings.plaid.secret.as_deref(), Some("prod-secret"));
    }

    #[test]
    fn given_ttyf_sandbox_over_prod_env_when_applying_then_uses_sandbox_secret() {
        let settings = Settings::default()
            .apply_environment(
                lookup(&[
                    ("ENV", "PROD"),
                    ("SANDBOX_PLAID_SECRET_KEY", "sandbox-secret"),
                    ("PROD_PLAID_SECRET_KEY", "prod-secret"),
                ]),
                ttyf_vars(&[("TTYF_PLAID__ENVIRONMENT", "sandbox")]),
            )
            .unwrap();

        assert_eq!(settings.plaid.environment, PlaidEnvironment::Sandbox);
        assert_eq!(settings.plaid.secret.as_deref(), Some("sandbox-secret"));
    }

    #[test]
    fn given_ttyf_secret_and_legacy_secret_when_applying_then_ttyf_secret_wins() {
        let settings = Settings::default()
            .apply_environment(
                lookup(&[("ENV", "PROD"), ("PROD_PLAID_SECRET_KEY", "prod-secret")]),
                ttyf_vars(&[("TTYF_PLAID__SECRET", "explicit-secret")]),
            )
            .unwrap();

        assert_eq!(settings.plaid.secret.as_deref(), Some("explicit-secret"));
    }

    #[test]
    fn given_numeric_credentials_when_applying_overrides_then_keeps_leading_zeros() {
        let settings = Settings::default()
            .apply_environment(
                lookup(&[]),
                ttyf_vars(&[
                    ("TTYF_PLAID__CLIENT_ID", "0012345"),
                    ("TTYF_PLAID__SECRET", "000987"),
                    ("TTYF_BANNER", "false"),
                    ("TTYF_CALLBACK__TIMEOUT_SECS", "30"),
                ]),
            )
            .unwrap();

        assert_eq!(settings.plaid.client_id.as_deref(), Some("0012345"));
        assert_eq!(settings.plaid.secret.as_deref(), Some("000987"));
        assert!(!settings.banner);
        assert_eq!(settings.callback.timeout_secs, 30);
    }

    #[test]
    fn given_overlay_when_merging_then_specified_fields_win() {
        let raw: RawSettings = toml::from_str(
            r#"
banner = false

[plaid]
environment = "production"
country_codes = ["US", "CA"]

[callback]
port = 8123
"#,
        )
        .unwrap();

        let settings = Settings::default().merge_with(&raw);

        assert!(!settings.banner);
        assert_eq!(settings.plaid.environment, PlaidEnvironment::Production);
        assert_eq!(settings.plaid.country_codes, vec!["US".to_string(), "CA".to_string()]);
        assert_eq!(settings.plaid.products, vec!["transactions".to_string()]);
        assert_eq!(settings.callback.port, 8123);
        assert_eq!(settings.callback.host, "localhost");
    }

    #[test]
    fn given_tilde_in_storage_dir_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            storage_dir: PathBuf::from("~/.ttyf"),
            ..Settings::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        assert!(settings.storage_dir.starts_with(&home));
    }

    #[test]
    fn given_env_source_when_applying_overrides_then_replaces_values() {
        let source = ttyf_vars(&[
            ("TTYF_STORAGE_DIR", "/tmp/ttyf-test"),
            ("TTYF_PLAID__ENVIRONMENT", "production"),
            ("TTYF_PLAID__COUNTRY_CODES", "US,CA"),
            ("TTYF_CALLBACK__PORT", "9001"),
        ]);

        let settings = Settings::apply_overrides_from(Settings::default(), source).unwrap();

        assert_eq!(settings.storage_dir, PathBuf::from("/tmp/ttyf-test"));
        assert_eq!(settings.plaid.environment, PlaidEnvironment::Production);
        assert_eq!(settings.plaid.country_codes, vec!["US".to_string(), "CA".to_string()]);
        assert_eq!(settings.callback.port, 9001);
    }

    #[test]
    fn given_secret_when_rendering_toml_then_masks_it() {
        let mut settings = Settings::default();
        settings.plaid.secret = Some("very-secret".into());

        let toml = settings.to_toml().unwrap();

        assert!(!toml.contains("very-secret"));
        assert!(toml.contains("********"));
    }

    #[test]
    fn given_template_when_parsed_then_is_valid_toml() {
        let raw: RawSettings = toml::from_str(&Settings::template()).unwrap();
        assert!(raw.storage_dir.is_none());
    }
}
