//! Credential resolution
//!
//! Each credential field is looked up, in order, from the value passed at the
//! call site, the process environment and the persisted `config.json`. The
//! config file is read again on every resolution so that edits take effect on
//! the next login without restarting the server.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::error::{Error, Result};
use crate::paths::Paths;

/// One of the four credential fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialField {
    Url,
    Email,
    Password,
    OrganizationId,
}

impl CredentialField {
    pub const ALL: [CredentialField; 4] = [
        Self::Url,
        Self::Email,
        Self::Password,
        Self::OrganizationId,
    ];

    /// Key in config.json
    pub fn key(&self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Email => "email",
            Self::Password => "password",
            Self::OrganizationId => "organization_id",
        }
    }

    /// Environment variable name
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::Url => "SEATSURFING_URL",
            Self::Email => "SEATSURFING_EMAIL",
            Self::Password => "SEATSURFING_PASSWORD",
            Self::OrganizationId => "SEATSURFING_ORG_ID",
        }
    }
}

/// The effective credentials for one login attempt
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSet {
    pub base_url: String,
    pub email: String,
    pub password: String,
    pub organization_id: String,
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("organization_id", &self.organization_id)
            .finish()
    }
}

impl CredentialSet {
    /// Check that every field required for login is present.
    ///
    /// The three failures are distinct so the caller can tell the user
    /// exactly what is missing.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(Error::validation(
                "Seatsurfing URL is required. Set SEATSURFING_URL or add \"url\" to config.json.",
            ));
        }
        if self.email.is_empty() || self.password.is_empty() {
            return Err(Error::validation(
                "Email and password are required. Set SEATSURFING_EMAIL/SEATSURFING_PASSWORD or add them to config.json.",
            ));
        }
        if self.organization_id.is_empty() {
            return Err(Error::validation(
                "Organization ID is required. Set SEATSURFING_ORG_ID or add \"organization_id\" to config.json.",
            ));
        }
        Ok(())
    }

    /// Every field is non-empty
    pub fn is_complete(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Values supplied explicitly by the caller (e.g. tool arguments)
#[derive(Debug, Clone, Default)]
pub struct CredentialOverrides {
    pub url: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub organization_id: Option<String>,
}

impl CredentialOverrides {
    fn get(&self, field: CredentialField) -> Option<&str> {
        match field {
            CredentialField::Url => self.url.as_deref(),
            CredentialField::Email => self.email.as_deref(),
            CredentialField::Password => self.password.as_deref(),
            CredentialField::OrganizationId => self.organization_id.as_deref(),
        }
    }
}

/// Where environment values come from
#[derive(Debug, Clone)]
enum EnvSource {
    Process,
    Fixed(HashMap<String, String>),
}

impl EnvSource {
    fn get(&self, name: &str) -> Option<String> {
        match self {
            Self::Process => std::env::var(name).ok(),
            Self::Fixed(vars) => vars.get(name).cloned(),
        }
    }
}

/// Merges call-site, environment and config-file credentials
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    config_path: PathBuf,
    env: EnvSource,
}

impl CredentialResolver {
    pub fn new(paths: &Paths) -> Self {
        Self {
            config_path: paths.config_file(),
            env: EnvSource::Process,
        }
    }

    /// Replace the process environment with a fixed set of variables
    pub fn with_env(mut self, vars: HashMap<String, String>) -> Self {
        self.env = EnvSource::Fixed(vars);
        self
    }

    /// Resolve a single field. Never fails; absence is an empty string.
    pub fn resolve(&self, field: CredentialField, explicit: Option<&str>) -> String {
        let config = self.load_config();
        self.pick(field, explicit, &config)
    }

    /// Resolve all four fields against one fresh read of the config file
    pub fn resolve_all(&self, overrides: &CredentialOverrides) -> CredentialSet {
        let config = self.load_config();
        CredentialSet {
            base_url: self.pick(CredentialField::Url, overrides.get(CredentialField::Url), &config),
            email: self.pick(CredentialField::Email, overrides.get(CredentialField::Email), &config),
            password: self.pick(
                CredentialField::Password,
                overrides.get(CredentialField::Password),
                &config,
            ),
            organization_id: self.pick(
                CredentialField::OrganizationId,
                overrides.get(CredentialField::OrganizationId),
                &config,
            ),
        }
    }

    fn pick(&self, field: CredentialField, explicit: Option<&str>, config: &Map<String, Value>) -> String {
        if let Some(value) = explicit.filter(|v| !v.is_empty()) {
            return value.to_string();
        }
        if let Some(value) = self.env.get(field.env_var()).filter(|v| !v.is_empty()) {
            return value;
        }
        config
            .get(field.key())
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }

    /// Read config.json; a missing or broken file is treated as empty
    fn load_config(&self) -> Map<String, Value> {
        let content = match fs::read_to_string(&self.config_path) {
            Ok(c) => c,
            Err(_) => return Map::new(),
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                debug!("Ignoring non-object config at {}", self.config_path.display());
                Map::new()
            }
            Err(e) => {
                debug!("Ignoring unparsable config at {}: {}", self.config_path.display(), e);
                Map::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> Paths {
        let paths = Paths::at(dir.path());
        fs::write(paths.config_file(), content).unwrap();
        paths
    }

    fn full_config() -> &'static str {
        r#"{
            "url": "https://file.example.com",
            "email": "file@example.com",
            "password": "file-secret",
            "organization_id": "file-org"
        }"#
    }

    #[test]
    fn test_env_overrides_config_for_every_field() {
        let dir = TempDir::new().unwrap();
        let paths = write_config(&dir, full_config());

        for field in CredentialField::ALL {
            let env = HashMap::from([(field.env_var().to_string(), format!("env-{}", field.key()))]);
            let resolver = CredentialResolver::new(&paths).with_env(env);
            assert_eq!(resolver.resolve(field, None), format!("env-{}", field.key()));
        }
    }

    #[test]
    fn test_explicit_overrides_env() {
        let dir = TempDir::new().unwrap();
        let paths = write_config(&dir, full_config());
        let env = HashMap::from([("SEATSURFING_EMAIL".to_string(), "env@example.com".to_string())]);
        let resolver = CredentialResolver::new(&paths).with_env(env);

        assert_eq!(
            resolver.resolve(CredentialField::Email, Some("arg@example.com")),
            "arg@example.com"
        );
        // Empty explicit values fall through
        assert_eq!(resolver.resolve(CredentialField::Email, Some("")), "env@example.com");
    }

    #[test]
    fn test_missing_everything_is_empty() {
        let dir = TempDir::new().unwrap();
        let resolver = CredentialResolver::new(&Paths::at(dir.path())).with_env(HashMap::new());

        let creds = resolver.resolve_all(&CredentialOverrides::default());
        assert_eq!(creds, CredentialSet::default());
    }

    #[test]
    fn test_unparsable_config_is_empty() {
        let dir = TempDir::new().unwrap();
        let paths = write_config(&dir, "{not json");
        let resolver = CredentialResolver::new(&paths).with_env(HashMap::new());

        assert_eq!(resolver.resolve(CredentialField::Url, None), "");
    }

    #[test]
    fn test_config_edits_take_effect_without_restart() {
        let dir = TempDir::new().unwrap();
        let paths = write_config(&dir, r#"{"organization_id": "first"}"#);
        let resolver = CredentialResolver::new(&paths).with_env(HashMap::new());
        assert_eq!(resolver.resolve(CredentialField::OrganizationId, None), "first");

        fs::write(paths.config_file(), r#"{"organization_id": "second"}"#).unwrap();
        assert_eq!(resolver.resolve(CredentialField::OrganizationId, None), "second");
    }

    #[test]
    fn test_resolve_all_mixes_sources() {
        let dir = TempDir::new().unwrap();
        let paths = write_config(&dir, full_config());
        let env = HashMap::from([("SEATSURFING_PASSWORD".to_string(), "env-secret".to_string())]);
        let resolver = CredentialResolver::new(&paths).with_env(env);

        let overrides = CredentialOverrides {
            url: Some("https://arg.example.com".to_string()),
            ..Default::default()
        };
        let creds = resolver.resolve_all(&overrides);

        assert_eq!(creds.base_url, "https://arg.example.com");
        assert_eq!(creds.email, "file@example.com");
        assert_eq!(creds.password, "env-secret");
        assert_eq!(creds.organization_id, "file-org");
        assert!(creds.is_complete());
    }

    #[test]
    fn test_validation_failures_are_distinct() {
        let complete = CredentialSet {
            base_url: "https://x".to_string(),
            email: "a@b.c".to_string(),
            password: "pw".to_string(),
            organization_id: "org".to_string(),
        };
        assert!(complete.validate().is_ok());

        let no_url = CredentialSet { base_url: String::new(), ..complete.clone() };
        let no_password = CredentialSet { password: String::new(), ..complete.clone() };
        let no_org = CredentialSet { organization_id: String::new(), ..complete.clone() };

        let messages: Vec<String> = [no_url, no_password, no_org]
            .iter()
            .map(|c| match c.validate() {
                Err(Error::Validation(msg)) => msg,
                other => panic!("expected validation error, got {:?}", other),
            })
            .collect();

        assert!(messages[0].contains("URL"));
        assert!(messages[1].contains("Email and password"));
        assert!(messages[2].contains("Organization ID"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = CredentialSet {
            password: "hunter2".to_string(),
            ..Default::default()
        };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
