use crate::prelude::*;

pub mod jira;

/// How requests to Jira authenticate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JiraAuth {
    /// Jira Cloud: account email or username plus API token
    Basic { username: String, api_token: String },
    /// Jira Data Center personal access token
    Bearer { token: String },
}

/// Jira configuration from environment variables
#[derive(Debug, Clone)]
pub struct JiraConfig {
    pub base_url: String,
    pub auth: JiraAuth,
    pub user_cache_size: usize,
}

impl JiraConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `var`, which maps a variable name to its value
    ///
    /// `JIRA_PERSONAL_TOKEN` wins over `JIRA_USERNAME` + `JIRA_API_TOKEN`.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base_url = var("JIRA_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| Error::MissingConfig("JIRA_URL environment variable is not set".into()))?;

        let auth = match var("JIRA_PERSONAL_TOKEN") {
            Some(token) => JiraAuth::Bearer { token },
            None => JiraAuth::Basic {
                username: var("JIRA_USERNAME").ok_or_else(|| {
                    Error::MissingConfig(
                        "JIRA_USERNAME environment variable is not set (or use JIRA_PERSONAL_TOKEN)"
                            .into(),
                    )
                })?,
                api_token: var("JIRA_API_TOKEN").ok_or_else(|| {
                    Error::MissingConfig("JIRA_API_TOKEN environment variable is not set".into())
                })?,
            },
        };

        let user_cache_size = match var("JIRA_USER_CACHE_SIZE") {
            Some(size) => size
                .parse::<usize>()
                .map_err(|e| eyre!("Invalid JIRA_USER_CACHE_SIZE '{}': {}", size, e))?,
            None => jira_prompts_core::users::DEFAULT_CAPACITY,
        };

        Ok(Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            auth,
            user_cache_size,
        })
    }
}

/// Create an authenticated HTTP client for the Jira REST API
pub fn create_jira_client(config: &JiraConfig) -> Result<reqwest::Client> {
    use base64::Engine;
    use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};

    let authorization = match &config.auth {
        JiraAuth::Basic {
            username,
            api_token,
        } => {
            let auth_string = format!("{username}:{api_token}");
            let auth_encoded = base64::engine::general_purpose::STANDARD.encode(&auth_string);
            format!("Basic {auth_encoded}")
        }
        JiraAuth::Bearer { token } => format!("Bearer {token}"),
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&authorization).map_err(|e| eyre!("Invalid header value: {}", e))?,
    );
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| eyre!("Failed to build HTTP client: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_config_basic_auth() {
        let config = JiraConfig::from_lookup(vars(&[
            ("JIRA_URL", "https://example.atlassian.net/"),
            ("JIRA_USERNAME", "ada@example.com"),
            ("JIRA_API_TOKEN", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "https://example.atlassian.net");
        assert_eq!(
            config.auth,
            JiraAuth::Basic {
                username: "ada@example.com".to_string(),
                api_token: "secret".to_string(),
            }
        );
        assert_eq!(config.user_cache_size, 100);
    }

    #[test]
    fn test_config_personal_token_and_cache_size() {
        let config = JiraConfig::from_lookup(vars(&[
            ("JIRA_URL", "https://jira.internal"),
            ("JIRA_PERSONAL_TOKEN", "pat"),
            ("JIRA_USER_CACHE_SIZE", "5"),
        ]))
        .unwrap();

        assert_eq!(
            config.auth,
            JiraAuth::Bearer {
                token: "pat".to_string()
            }
        );
        assert_eq!(config.user_cache_size, 5);
    }

    #[test]
    fn test_config_requires_url() {
        let error = JiraConfig::from_lookup(vars(&[("JIRA_PERSONAL_TOKEN", "pat")])).unwrap_err();

        assert!(error.to_string().contains("JIRA_URL"));
    }

    #[test]
    fn test_config_requires_credentials() {
        let result = JiraConfig::from_lookup(vars(&[("JIRA_URL", "https://x")]));

        assert!(result.is_err());
    }

    #[test]
    fn test_create_client() {
        let config = JiraConfig::from_lookup(vars(&[
            ("JIRA_URL", "https://x"),
            ("JIRA_PERSONAL_TOKEN", "pat"),
        ]))
        .unwrap();

        assert!(create_jira_client(&config).is_ok());
    }
}
