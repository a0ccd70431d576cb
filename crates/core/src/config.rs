use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::auth::Credential;
use crate::error::{ConfigError, CredentialError};

pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_API_BIND: &str = "0.0.0.0:8080";

/// Sub-resources that may be configured to fall back to a default.
/// Social web counts always fall back and are not listed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionalResource {
    Comments,
    Newsletters,
}

impl OptionalResource {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionalResource::Comments => "comments",
            OptionalResource::Newsletters => "newsletters",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "comments" => Some(OptionalResource::Comments),
            "newsletters" => Some(OptionalResource::Newsletters),
            _ => None,
        }
    }
}

/// Which optional resources fall back to a default value instead of failing
/// the whole cycle. Empty by default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OptionalPolicy {
    degrade: BTreeSet<OptionalResource>,
}

impl OptionalPolicy {
    pub fn degrading(resources: impl IntoIterator<Item = OptionalResource>) -> Self {
        Self {
            degrade: resources.into_iter().collect(),
        }
    }

    /// Every optional resource is required.
    pub fn strict() -> Self {
        Self::degrading([])
    }

    pub fn parse(list: &str) -> Result<Self, ConfigError> {
        let mut degrade = BTreeSet::new();
        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let resource = OptionalResource::from_name(&name.to_ascii_lowercase()).ok_or_else(|| {
                ConfigError::Invalid {
                    name: "GHOSTWATCH_DEGRADE",
                    message: format!("unknown resource '{}'", name),
                }
            })?;
            degrade.insert(resource);
        }
        Ok(Self { degrade })
    }

    pub fn degrades(&self, resource: OptionalResource) -> bool {
        self.degrade.contains(&resource)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub admin_api_key: String,
    pub api_bind: String,
    pub external_url: Option<String>,
    pub scan_interval: Duration,
    pub optional_policy: OptionalPolicy,
}

impl Settings {
    pub fn new(api_url: &str, admin_api_key: &str) -> Self {
        Self {
            api_url: normalize_url(api_url),
            admin_api_key: admin_api_key.trim().to_string(),
            api_bind: DEFAULT_API_BIND.to_string(),
            external_url: None,
            scan_interval: Duration::from_secs(DEFAULT_SCAN_INTERVAL_SECS),
            optional_policy: OptionalPolicy::default(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = std::env::var("GHOST_API_URL")
            .or_else(|_| std::env::var("GHOSTWATCH_API_URL"))
            .map_err(|_| ConfigError::Missing("GHOST_API_URL"))?;
        let admin_api_key = std::env::var("GHOST_ADMIN_API_KEY")
            .or_else(|_| std::env::var("GHOSTWATCH_ADMIN_API_KEY"))
            .map_err(|_| ConfigError::Missing("GHOST_ADMIN_API_KEY"))?;
        let api_bind = std::env::var("GHOSTWATCH_API_BIND")
            .unwrap_or_else(|_| DEFAULT_API_BIND.to_string());
        let external_url = std::env::var("GHOSTWATCH_EXTERNAL_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());
        let scan_interval = match std::env::var("GHOSTWATCH_SCAN_INTERVAL") {
            Ok(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    name: "GHOSTWATCH_SCAN_INTERVAL",
                    message: format!("'{}' is not a number of seconds", raw),
                })?;
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        name: "GHOSTWATCH_SCAN_INTERVAL",
                        message: "must be greater than zero".to_string(),
                    });
                }
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(DEFAULT_SCAN_INTERVAL_SECS),
        };
        let optional_policy = match std::env::var("GHOSTWATCH_DEGRADE") {
            Ok(list) => OptionalPolicy::parse(&list)?,
            Err(_) => OptionalPolicy::default(),
        };

        Ok(Self {
            api_url: normalize_url(&api_url),
            admin_api_key: admin_api_key.trim().to_string(),
            api_bind,
            external_url,
            scan_interval,
            optional_policy,
        })
    }

    pub fn with_external_url(mut self, url: &str) -> Self {
        self.external_url = Some(url.to_string());
        self
    }

    pub fn with_scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval;
        self
    }

    pub fn with_optional_policy(mut self, policy: OptionalPolicy) -> Self {
        self.optional_policy = policy;
        self
    }

    pub fn credential(&self) -> Result<Credential, CredentialError> {
        Credential::parse(&self.admin_api_key)
    }

    /// Base address remote webhooks may call back to, if one is reachable
    /// over https.
    pub fn callback_base(&self) -> Option<String> {
        let raw = self.external_url.as_deref()?;
        let parsed = url::Url::parse(raw.trim()).ok()?;
        if parsed.scheme() != "https" || parsed.host_str().is_none() {
            return None;
        }
        Some(normalize_url(parsed.as_str()))
    }
}

pub fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "650b7a9f8e8c1234567890ab:1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef";

    #[test]
    fn test_new_strips_trailing_slash() {
        let settings = Settings::new("https://blog.example.com///", KEY);
        assert_eq!(settings.api_url, "https://blog.example.com");
    }

    #[test]
    fn test_new_defaults() {
        let settings = Settings::new("https://blog.example.com", KEY);
        assert_eq!(settings.scan_interval, Duration::from_secs(300));
        assert_eq!(settings.api_bind, "0.0.0.0:8080");
        assert!(settings.external_url.is_none());
        assert_eq!(settings.optional_policy, OptionalPolicy::strict());
        assert!(!settings.optional_policy.degrades(OptionalResource::Comments));
    }

    #[test]
    fn test_credential_validated() {
        assert!(Settings::new("https://x.io", KEY).credential().is_ok());
        assert_eq!(
            Settings::new("https://x.io", "nocolon").credential().unwrap_err(),
            CredentialError::MissingSeparator
        );
    }

    #[test]
    fn test_callback_base_requires_https() {
        let settings = Settings::new("https://x.io", KEY);
        assert_eq!(settings.callback_base(), None);

        let settings = settings.with_external_url("http://home.example.com");
        assert_eq!(settings.callback_base(), None);

        let settings = Settings::new("https://x.io", KEY).with_external_url("https://home.example.com/");
        assert_eq!(settings.callback_base().as_deref(), Some("https://home.example.com"));
    }

    #[test]
    fn test_callback_base_rejects_garbage() {
        let settings = Settings::new("https://x.io", KEY).with_external_url("not a url");
        assert_eq!(settings.callback_base(), None);
    }

    #[test]
    fn test_policy_parse() {
        let policy = OptionalPolicy::parse(" Comments,").unwrap();
        assert!(policy.degrades(OptionalResource::Comments));
        assert!(!policy.degrades(OptionalResource::Newsletters));
    }

    #[test]
    fn test_policy_parse_empty_is_strict() {
        assert_eq!(OptionalPolicy::parse("").unwrap(), OptionalPolicy::strict());
    }

    #[test]
    fn test_policy_parse_unknown() {
        assert!(matches!(
            OptionalPolicy::parse("comments,tiers"),
            Err(ConfigError::Invalid { name: "GHOSTWATCH_DEGRADE", .. })
        ));
    }
}
