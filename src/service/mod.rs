pub mod azure_search;
pub mod blob;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use log::info;
use serde::Deserialize;
use serde_json::{ Map, Value };

use crate::config::HarnessConfig;
use crate::error::ServiceError;

pub use azure_search::AzureSearchClient;
pub use blob::AzureBlobStore;

/// One document as returned by the search service, keys in arrival order.
pub type Document = Map<String, Value>;

/// The four resource kinds a skill run provisions on the search service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    DataSource,
    Skillset,
    Index,
    Indexer,
}

impl ResourceKind {
    /// REST collection segment, e.g. `/datasources/{name}`.
    pub fn collection(&self) -> &'static str {
        match self {
            ResourceKind::DataSource => "datasources",
            ResourceKind::Skillset => "skillsets",
            ResourceKind::Index => "indexes",
            ResourceKind::Indexer => "indexers",
        }
    }

    /// Prefix used when naming per-run resources.
    pub fn prefix(&self) -> &'static str {
        match self {
            ResourceKind::DataSource => "ds",
            ResourceKind::Skillset => "ss",
            ResourceKind::Index => "idx",
            ResourceKind::Indexer => "ixr",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResourceKind::DataSource => "data source",
            ResourceKind::Skillset => "skillset",
            ResourceKind::Index => "index",
            ResourceKind::Indexer => "indexer",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Execution state of the indexer's most recent run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    NotStarted,
    Running,
    Success,
    TransientFailure,
    Error,
    Unknown(String),
}

impl ExecutionStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "inProgress" | "running" => ExecutionStatus::Running,
            "success" => ExecutionStatus::Success,
            "transientFailure" => ExecutionStatus::TransientFailure,
            "error" => ExecutionStatus::Error,
            other => ExecutionStatus::Unknown(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Success | ExecutionStatus::TransientFailure | ExecutionStatus::Error
        )
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct IndexerItemIssue {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default, rename = "errorMessage", alias = "message")]
    pub message: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

/// Snapshot of `GET /indexers/{name}/status`, reduced to what the wait loop needs.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexerStatus {
    pub last_result: ExecutionStatus,
    pub errors: Vec<IndexerItemIssue>,
    pub warnings: Vec<IndexerItemIssue>,
    pub items_processed: u64,
    pub items_failed: u64,
}

impl IndexerStatus {
    pub fn not_started() -> Self {
        Self {
            last_result: ExecutionStatus::NotStarted,
            errors: Vec::new(),
            warnings: Vec::new(),
            items_processed: 0,
            items_failed: 0,
        }
    }

    pub fn from_response(body: &Value) -> Result<Self, ServiceError> {
        let last = match body.get("lastResult") {
            None | Some(Value::Null) => {
                return Ok(Self::not_started());
            }
            Some(last) => last,
        };

        let issues = |key: &str| -> Result<Vec<IndexerItemIssue>, ServiceError> {
            match last.get(key) {
                Some(Value::Array(items)) =>
                    items
                        .iter()
                        .map(|item| serde_json::from_value(item.clone()).map_err(ServiceError::from))
                        .collect(),
                _ => Ok(Vec::new()),
            }
        };

        Ok(Self {
            last_result: ExecutionStatus::parse(
                last.get("status").and_then(Value::as_str).unwrap_or("unknown")
            ),
            errors: issues("errors")?,
            warnings: issues("warnings")?,
            items_processed: last.get("itemsProcessed").and_then(Value::as_u64).unwrap_or(0),
            items_failed: last.get("itemsFailed").and_then(Value::as_u64).unwrap_or(0),
        })
    }
}

/// Parameters of a document search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub search_text: String,
    pub top: Option<usize>,
    pub select: Option<Vec<String>>,
}

impl SearchQuery {
    pub fn match_all() -> Self {
        Self {
            search_text: "*".to_string(),
            top: None,
            select: None,
        }
    }
}

#[async_trait]
pub trait SearchService: Send + Sync {
    async fn get_resource(
        &self,
        kind: ResourceKind,
        name: &str
    ) -> Result<Option<Value>, ServiceError>;

    async fn create_or_update(
        &self,
        kind: ResourceKind,
        name: &str,
        definition: &Value
    ) -> Result<(), ServiceError>;

    async fn delete_resource(
        &self,
        kind: ResourceKind,
        name: &str
    ) -> Result<DeleteOutcome, ServiceError>;

    async fn run_indexer(&self, name: &str) -> Result<(), ServiceError>;

    async fn indexer_status(&self, name: &str) -> Result<IndexerStatus, ServiceError>;

    /// Streams every hit of the query. Paging, if any, happens inside the stream.
    fn search<'a>(
        &'a self,
        index_name: &'a str,
        query: SearchQuery
    ) -> BoxStream<'a, Result<Document, ServiceError>>;
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn ensure_container(&self) -> Result<(), ServiceError>;

    async fn upload(
        &self,
        blob_path: &str,
        content: Vec<u8>,
        content_type: &str
    ) -> Result<(), ServiceError>;

    /// Connection string handed to the search service's blob data source.
    fn connection_string(&self) -> String;

    fn container_name(&self) -> &str;
}

pub fn create_search_service(
    config: &HarnessConfig
) -> Result<Arc<dyn SearchService>, ServiceError> {
    info!("Creating search service client for endpoint: {}", config.search_endpoint());
    let client = AzureSearchClient::new(
        &config.search_endpoint(),
        &config.admin_key,
        &config.query_key
    )?;
    Ok(Arc::new(client))
}

pub fn create_blob_store(config: &HarnessConfig) -> Result<Arc<dyn BlobStore>, ServiceError> {
    info!("Creating blob store client for endpoint: {}", config.blob_endpoint());
    let store = AzureBlobStore::new(
        &config.blob_endpoint(),
        &config.storage_account_name,
        &config.storage_account_key,
        &config.container_name
    )?;
    Ok(Arc::new(store))
}
