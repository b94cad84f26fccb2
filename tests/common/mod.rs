#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{ Arc, Mutex };
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{ self, BoxStream, StreamExt };
use serde_json::{ json, Map, Value };

use skill_harness::indexer_wait::WaitPolicy;
use skill_harness::service::{
    BlobStore,
    DeleteOutcome,
    Document,
    ExecutionStatus,
    IndexerItemIssue,
    IndexerStatus,
    ResourceKind,
    SearchQuery,
    SearchService,
};
use skill_harness::{ ServiceError, SkillOptions, SkillTester };

#[derive(Default)]
struct SearchState {
    resources: HashMap<(ResourceKind, String), Value>,
    history: Vec<(ResourceKind, String, Value)>,
    creates: HashMap<ResourceKind, usize>,
    runs: usize,
    status_polls: usize,
    deletes: Vec<(ResourceKind, String)>,
    fail_create: Option<ResourceKind>,
    fail_create_named: Option<(ResourceKind, String)>,
    busy_on_run: bool,
    fail_status: bool,
    fail_delete: Option<ResourceKind>,
    stuck_running: bool,
    enrichments: Map<String, Value>,
    indexed: HashMap<String, Vec<Document>>,
    indexer_errors: HashMap<String, Vec<String>>,
    searches: usize,
}

/// In-memory search service. Running an indexer writes one document whose generic fields are
/// filled from the scripted enrichment values, the way the real service applies
/// `outputFieldMappings`. Mappings to a field the index lacks become indexer item errors.
#[derive(Default)]
pub struct FakeSearchService {
    state: Mutex<SearchState>,
}

impl FakeSearchService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enrichment(self, name: &str, value: Value) -> Self {
        self.state.lock().unwrap().enrichments.insert(name.to_string(), value);
        self
    }

    pub fn failing_create(self, kind: ResourceKind) -> Self {
        self.state.lock().unwrap().fail_create = Some(kind);
        self
    }

    /// Fails creates of `kind` whose name contains `fragment`, e.g. one skill in a batch.
    pub fn failing_create_for(self, kind: ResourceKind, fragment: &str) -> Self {
        self.state.lock().unwrap().fail_create_named = Some((kind, fragment.to_string()));
        self
    }

    /// Answers the explicit run with 409, as the service does while the run it started on
    /// creation is still in progress.
    pub fn busy_on_run(self) -> Self {
        self.state.lock().unwrap().busy_on_run = true;
        self
    }

    pub fn failing_status(self) -> Self {
        self.state.lock().unwrap().fail_status = true;
        self
    }

    pub fn failing_delete(self, kind: ResourceKind) -> Self {
        self.state.lock().unwrap().fail_delete = Some(kind);
        self
    }

    pub fn stuck_running(self) -> Self {
        self.state.lock().unwrap().stuck_running = true;
        self
    }

    pub fn create_count(&self, kind: ResourceKind) -> usize {
        self.state.lock().unwrap().creates.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_creates(&self) -> usize {
        self.state.lock().unwrap().creates.values().sum()
    }

    pub fn run_count(&self) -> usize {
        self.state.lock().unwrap().runs
    }

    pub fn status_polls(&self) -> usize {
        self.state.lock().unwrap().status_polls
    }

    pub fn search_count(&self) -> usize {
        self.state.lock().unwrap().searches
    }

    pub fn deletes(&self) -> Vec<(ResourceKind, String)> {
        self.state.lock().unwrap().deletes.clone()
    }

    pub fn remaining(&self) -> usize {
        self.state.lock().unwrap().resources.len()
    }

    /// Last definition submitted for a resource kind, even if since deleted.
    pub fn definition(&self, kind: ResourceKind) -> Option<Value> {
        self.state
            .lock()
            .unwrap()
            .history.iter()
            .rev()
            .find(|(k, _, _)| *k == kind)
            .map(|(_, _, v)| v.clone())
    }

    pub fn insert_resource(&self, kind: ResourceKind, name: &str, definition: Value) {
        self.state.lock().unwrap().resources.insert((kind, name.to_string()), definition);
    }
}

fn index_fields(index: &Value) -> Vec<String> {
    index["fields"]
        .as_array()
        .map(|fields| {
            fields
                .iter()
                .filter_map(|f| f["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl SearchService for FakeSearchService {
    async fn get_resource(
        &self,
        kind: ResourceKind,
        name: &str
    ) -> Result<Option<Value>, ServiceError> {
        Ok(self.state.lock().unwrap().resources.get(&(kind, name.to_string())).cloned())
    }

    async fn create_or_update(
        &self,
        kind: ResourceKind,
        name: &str,
        definition: &Value
    ) -> Result<(), ServiceError> {
        let mut state = self.state.lock().unwrap();
        let named_failure = state.fail_create_named
            .as_ref()
            .is_some_and(|(k, fragment)| *k == kind && name.contains(fragment.as_str()));
        if state.fail_create == Some(kind) || named_failure {
            return Err(ServiceError::status(format!("create {} '{}'", kind, name), 400, "scripted failure"));
        }
        *state.creates.entry(kind).or_default() += 1;
        state.history.push((kind, name.to_string(), definition.clone()));
        state.resources.insert((kind, name.to_string()), definition.clone());
        Ok(())
    }

    async fn delete_resource(
        &self,
        kind: ResourceKind,
        name: &str
    ) -> Result<DeleteOutcome, ServiceError> {
        let mut state = self.state.lock().unwrap();
        state.deletes.push((kind, name.to_string()));
        if state.fail_delete == Some(kind) {
            return Err(ServiceError::status(format!("delete {} '{}'", kind, name), 500, "scripted failure"));
        }
        Ok(match state.resources.remove(&(kind, name.to_string())) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::NotFound,
        })
    }

    async fn run_indexer(&self, name: &str) -> Result<(), ServiceError> {
        let mut state = self.state.lock().unwrap();
        state.runs += 1;
        let indexer = state.resources
            .get(&(ResourceKind::Indexer, name.to_string()))
            .cloned()
            .ok_or_else(|| ServiceError::status(format!("run indexer '{}'", name), 404, "no such indexer"))?;
        let index_name = indexer["targetIndexName"].as_str().unwrap_or_default().to_string();
        let fields = state.resources
            .get(&(ResourceKind::Index, index_name.clone()))
            .map(index_fields)
            .unwrap_or_default();

        let mut document = Map::new();
        document.insert("id".to_string(), json!("dGVzdF9kYXRh0"));
        document.insert("content".to_string(), json!("uploaded test input"));
        let mut errors = Vec::new();
        for mapping in indexer["outputFieldMappings"].as_array().cloned().unwrap_or_default() {
            let source = mapping["sourceFieldName"].as_str().unwrap_or_default();
            let target = mapping["targetFieldName"].as_str().unwrap_or_default().to_string();
            if !fields.contains(&target) {
                errors.push(format!("Could not map output field '{}' to search index", target));
                continue;
            }
            let enrichment = source.trim_start_matches("/document/");
            if let Some(value) = state.enrichments.get(enrichment).cloned() {
                document.insert(target, value);
            }
        }
        state.indexed.insert(index_name, vec![document]);
        state.indexer_errors.insert(name.to_string(), errors);
        if state.busy_on_run {
            return Err(
                ServiceError::status(
                    format!("run indexer '{}'", name),
                    409,
                    "Another indexer invocation is currently in progress"
                )
            );
        }
        Ok(())
    }

    async fn indexer_status(&self, name: &str) -> Result<IndexerStatus, ServiceError> {
        let mut state = self.state.lock().unwrap();
        state.status_polls += 1;
        if state.fail_status {
            return Err(ServiceError::status(format!("get indexer status '{}'", name), 503, "scripted failure"));
        }
        if state.stuck_running {
            return Ok(IndexerStatus {
                last_result: ExecutionStatus::Running,
                ..IndexerStatus::not_started()
            });
        }
        let errors: Vec<IndexerItemIssue> = state.indexer_errors
            .get(name)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|message| IndexerItemIssue { key: None, message, name: None, details: None })
            .collect();
        Ok(IndexerStatus {
            last_result: if errors.is_empty() {
                ExecutionStatus::Success
            } else {
                ExecutionStatus::TransientFailure
            },
            items_processed: 1,
            items_failed: if errors.is_empty() { 0 } else { 1 },
            errors,
            warnings: Vec::new(),
        })
    }

    fn search<'a>(
        &'a self,
        index_name: &'a str,
        _query: SearchQuery
    ) -> BoxStream<'a, Result<Document, ServiceError>> {
        let mut state = self.state.lock().unwrap();
        state.searches += 1;
        let hits: Vec<Result<Document, ServiceError>> = state.indexed
            .get(index_name)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|doc| {
                let mut hit = Map::new();
                hit.insert("@search.score".to_string(), json!(1.0));
                hit.extend(doc);
                hit.insert("@search.highlights".to_string(), Value::Null);
                Ok(hit)
            })
            .collect();
        stream::iter(hits).boxed()
    }
}

#[derive(Default)]
pub struct FakeBlobStore {
    uploads: Mutex<Vec<(String, Vec<u8>, String)>>,
    fail_upload: bool,
}

impl FakeBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { fail_upload: true, ..Self::default() }
    }

    pub fn uploads(&self) -> Vec<(String, Vec<u8>, String)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for FakeBlobStore {
    async fn ensure_container(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn upload(
        &self,
        blob_path: &str,
        content: Vec<u8>,
        content_type: &str
    ) -> Result<(), ServiceError> {
        if self.fail_upload {
            return Err(ServiceError::status(format!("upload blob '{}'", blob_path), 403, "scripted failure"));
        }
        self.uploads.lock().unwrap().push((blob_path.to_string(), content, content_type.to_string()));
        Ok(())
    }

    fn connection_string(&self) -> String {
        "DefaultEndpointsProtocol=https;AccountName=fake;AccountKey=ZmFrZQ==;EndpointSuffix=core.windows.net".to_string()
    }

    fn container_name(&self) -> &str {
        "aisearch-skill-test-data"
    }
}

pub fn fast_wait() -> WaitPolicy {
    WaitPolicy {
        poll_interval: Duration::from_millis(20),
        timeout: Duration::from_millis(300),
    }
}

pub fn tester(
    search: Arc<FakeSearchService>,
    blobs: Arc<FakeBlobStore>,
    options: SkillOptions
) -> SkillTester {
    SkillTester::new(search, blobs, "cognitive-key", fast_wait(), options)
}
