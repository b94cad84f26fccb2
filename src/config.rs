use std::time::Duration;

use log::{ debug, info };

use crate::error::{ HarnessError, Result };
use crate::indexer_wait::WaitPolicy;

pub const DEFAULT_TEST_CONTAINER: &str = "aisearch-skill-test-data";
pub const DEFAULT_EMBEDDING_DEPLOYMENT: &str = "text-embedding-ada-002";
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

const REQUIRED_OPTIONS: [&str; 6] = [
    "SEARCH_SERVICE_NAME",
    "SEARCH_ADMIN_KEY",
    "SEARCH_QUERY_KEY",
    "COGNITIVE_SERVICES_KEY",
    "STORAGE_ACCOUNT_NAME",
    "STORAGE_ACCOUNT_KEY",
];

/// Azure OpenAI settings used by the embedding skill.
#[derive(Clone, Debug, Default)]
pub struct EmbeddingSettings {
    pub resource_uri: Option<String>,
    pub deployment_id: String,
    pub api_key: Option<String>,
    pub dimensions: usize,
}

/// Everything a live skill run needs, resolved once at process start.
#[derive(Clone, Debug)]
pub struct HarnessConfig {
    pub service_name: String,
    pub admin_key: String,
    pub query_key: String,
    pub cognitive_services_key: String,
    pub storage_account_name: String,
    pub storage_account_key: String,
    pub search_endpoint: Option<String>,
    pub blob_endpoint: Option<String>,
    pub container_name: String,
    pub embedding: EmbeddingSettings,
    pub wait: WaitPolicy,
}

impl HarnessConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Every missing required
    /// option is reported in a single `HarnessError::Config`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self> where F: Fn(&str) -> Option<String> {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let missing: Vec<String> = REQUIRED_OPTIONS.iter()
            .filter(|key| read(key).is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(HarnessError::Config(missing));
        }

        let required = |key: &str| read(key).unwrap_or_default();

        let dimensions = parse_number(&read, "ADA_EMBEDDING_DIMENSIONS")?.unwrap_or(
            DEFAULT_EMBEDDING_DIMENSIONS as u64
        ) as usize;
        let poll_secs = parse_number(&read, "INDEXER_POLL_INTERVAL_SECS")?;
        let timeout_secs = parse_number(&read, "INDEXER_TIMEOUT_SECS")?;

        let defaults = WaitPolicy::default();
        let wait = WaitPolicy {
            poll_interval: poll_secs.map(Duration::from_secs).unwrap_or(defaults.poll_interval),
            timeout: timeout_secs.map(Duration::from_secs).unwrap_or(defaults.timeout),
        };

        let config = Self {
            service_name: required("SEARCH_SERVICE_NAME"),
            admin_key: required("SEARCH_ADMIN_KEY"),
            query_key: required("SEARCH_QUERY_KEY"),
            cognitive_services_key: required("COGNITIVE_SERVICES_KEY"),
            storage_account_name: required("STORAGE_ACCOUNT_NAME"),
            storage_account_key: required("STORAGE_ACCOUNT_KEY"),
            search_endpoint: read("SEARCH_ENDPOINT"),
            blob_endpoint: read("STORAGE_BLOB_ENDPOINT"),
            container_name: read("TEST_CONTAINER_NAME").unwrap_or_else(||
                DEFAULT_TEST_CONTAINER.to_string()
            ),
            embedding: EmbeddingSettings {
                resource_uri: read("AOAI_RESOURCE_URI"),
                deployment_id: read("AOAI_DEPLOYMENT_ID").unwrap_or_else(||
                    DEFAULT_EMBEDDING_DEPLOYMENT.to_string()
                ),
                api_key: read("AOAI_API_KEY"),
                dimensions,
            },
            wait,
        };

        info!(
            "Loaded configuration for search service '{}' and storage account '{}'",
            config.service_name,
            config.storage_account_name
        );
        debug!(
            "Indexer wait policy: poll every {:?}, give up after {:?}",
            config.wait.poll_interval,
            config.wait.timeout
        );
        Ok(config)
    }

    pub fn search_endpoint(&self) -> String {
        match &self.search_endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}.search.windows.net", self.service_name),
        }
    }

    pub fn blob_endpoint(&self) -> String {
        match &self.blob_endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}.blob.core.windows.net", self.storage_account_name),
        }
    }
}

fn parse_number<F>(read: &F, key: &str) -> Result<Option<u64>> where F: Fn(&str) -> Option<String> {
    match read(key) {
        None => Ok(None),
        Some(raw) =>
            raw
                .parse::<u64>()
                .map(Some)
                .map_err(|_| HarnessError::Config(vec![format!("{} (not a number: '{}')", key, raw)])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("SEARCH_SERVICE_NAME", "contoso-search"),
            ("SEARCH_ADMIN_KEY", "admin"),
            ("SEARCH_QUERY_KEY", "query"),
            ("COGNITIVE_SERVICES_KEY", "cog"),
            ("STORAGE_ACCOUNT_NAME", "contosostore"),
            ("STORAGE_ACCOUNT_KEY", "c2VjcmV0"),
        ])
    }

    #[test]
    fn reports_every_missing_option_at_once() {
        let env = HashMap::from([("SEARCH_SERVICE_NAME", "svc"), ("SEARCH_QUERY_KEY", "  ")]);
        let err = HarnessConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap_err();
        match err {
            HarnessError::Config(missing) => {
                assert_eq!(missing, vec![
                    "SEARCH_ADMIN_KEY",
                    "SEARCH_QUERY_KEY",
                    "COGNITIVE_SERVICES_KEY",
                    "STORAGE_ACCOUNT_NAME",
                    "STORAGE_ACCOUNT_KEY"
                ]);
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn applies_defaults_and_derives_endpoints() {
        let env = full_env();
        let config = HarnessConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.container_name, DEFAULT_TEST_CONTAINER);
        assert_eq!(config.embedding.dimensions, 1536);
        assert_eq!(config.embedding.deployment_id, "text-embedding-ada-002");
        assert!(config.embedding.resource_uri.is_none());
        assert_eq!(config.wait.timeout, Duration::from_secs(60));
        assert_eq!(config.search_endpoint(), "https://contoso-search.search.windows.net");
        assert_eq!(config.blob_endpoint(), "https://contosostore.blob.core.windows.net");
    }

    #[test]
    fn rejects_malformed_numbers() {
        let mut env = full_env();
        env.insert("INDEXER_TIMEOUT_SECS", "soon");
        let err = HarnessConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap_err();
        assert!(matches!(err, HarnessError::Config(ref v) if v[0].starts_with("INDEXER_TIMEOUT_SECS")));
    }

    #[test]
    fn endpoint_overrides_win() {
        let mut env = full_env();
        env.insert("SEARCH_ENDPOINT", "http://127.0.0.1:7700/");
        env.insert("INDEXER_POLL_INTERVAL_SECS", "5");
        let config = HarnessConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.search_endpoint(), "http://127.0.0.1:7700");
        assert_eq!(config.wait.poll_interval, Duration::from_secs(5));
    }
}
