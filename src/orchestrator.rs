use std::sync::Arc;

use log::{ error, info };
use tokio::sync::mpsc::{ unbounded_channel, UnboundedReceiver, UnboundedSender };
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cleanup::{ cleanup, CleanupReport };
use crate::config::HarnessConfig;
use crate::error::{ HarnessError, Result };
use crate::fetcher::fetch;
use crate::indexer_wait::{ wait_for_indexer, WaitOutcome, WaitPolicy };
use crate::input::{ validate_input, SkillInput };
use crate::naming::{ run_token, RunResources };
use crate::preview::{ preview, PreviewResult };
use crate::provisioner::{ output_field_mappings, IndexerPlan, Provisioner };
use crate::service::{ create_blob_store, create_search_service, BlobStore, Document, SearchService };
use crate::skills::{ SkillGroup, SkillKind, SkillOptions, SkillTestDescriptor };

/// Everything one live skill run produced.
#[derive(Debug, Clone)]
pub struct SkillRunReport {
    pub skill: SkillKind,
    pub resources: RunResources,
    pub blob_path: String,
    pub documents: Vec<Document>,
    pub wait: WaitOutcome,
    pub cleanup: CleanupReport,
}

/// Progress notifications streamed out of a spawned skill run.
#[derive(Debug, Clone)]
pub enum RunEvent {
    Progress(u8),
    Log(String),
    Completed(SkillRunReport),
    Failed(String),
}

/// Sends run events when someone is listening. A dropped receiver is not an error.
struct Progress {
    events: Option<UnboundedSender<RunEvent>>,
}

impl Progress {
    fn silent() -> Self {
        Self { events: None }
    }

    fn send(&self, event: RunEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    fn step(&self, percent: u8, message: String) {
        info!("{}", message);
        self.send(RunEvent::Log(message));
        self.send(RunEvent::Progress(percent));
    }
}

/// One skill's result within a batch run.
#[derive(Debug)]
pub struct BatchEntry {
    pub group: SkillGroup,
    pub skill: SkillKind,
    pub outcome: Result<SkillRunReport>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
    /// Skills left out because their configuration is missing.
    pub skipped: Vec<SkillKind>,
}

impl BatchReport {
    pub fn failures(&self) -> impl Iterator<Item = &BatchEntry> {
        self.entries.iter().filter(|entry| entry.outcome.is_err())
    }

    pub fn succeeded(&self) -> usize {
        self.entries.len() - self.failures().count()
    }
}

struct Execution {
    blob_path: String,
    wait: WaitOutcome,
    documents: Vec<Document>,
}

/// Runs skill tests against a live search service: upload, provision, index, wait, fetch,
/// then cleanup on every exit path.
pub struct SkillTester {
    search: Arc<dyn SearchService>,
    blobs: Arc<dyn BlobStore>,
    cognitive_key: String,
    wait: WaitPolicy,
    options: SkillOptions,
}

impl SkillTester {
    pub fn new(
        search: Arc<dyn SearchService>,
        blobs: Arc<dyn BlobStore>,
        cognitive_key: impl Into<String>,
        wait: WaitPolicy,
        options: SkillOptions
    ) -> Self {
        Self {
            search,
            blobs,
            cognitive_key: cognitive_key.into(),
            wait,
            options,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        Ok(
            Self::new(
                create_search_service(config)?,
                create_blob_store(config)?,
                config.cognitive_services_key.clone(),
                config.wait,
                SkillOptions::from_config(config)
            )
        )
    }

    pub fn options(&self) -> &SkillOptions {
        &self.options
    }

    pub fn descriptor(&self, kind: SkillKind) -> SkillTestDescriptor {
        SkillTestDescriptor::for_kind(kind, &self.options)
    }

    /// Runs one skill end to end and returns the fetched documents with the run's bookkeeping.
    pub async fn run_skill_test(
        &self,
        descriptor: &SkillTestDescriptor,
        input: SkillInput
    ) -> Result<SkillRunReport> {
        self.run_with_progress(descriptor, input, &Progress::silent(), &CancellationToken::new()).await
    }

    /// Runs every skill group in order, each skill with its built-in sample. A failed skill is
    /// recorded and the batch carries on. The embedding group only runs when an embedding
    /// resource is configured.
    pub async fn run_all(&self) -> BatchReport {
        let mut report = BatchReport::default();
        for group in SkillGroup::ORDER {
            if group == SkillGroup::Embedding && self.options.embedding.resource_uri.is_none() {
                info!("No embedding resource configured; skipping {} skills", group.label());
                report.skipped.extend(group.members());
                continue;
            }
            info!("Testing {} skills", group.label());
            for skill in group.members() {
                let descriptor = self.descriptor(skill);
                let outcome = self.run_skill_test(&descriptor, descriptor.sample_input.to_input()).await;
                if let Err(e) = &outcome {
                    error!("Error testing {}: {}", skill, e);
                }
                report.entries.push(BatchEntry { group, skill, outcome });
            }
        }
        info!("Batch finished: {} succeeded, {} failed", report.succeeded(), report.failures().count());
        report
    }

    /// Cancelling `cancel` stops the pipeline at its next suspension point. Cleanup still runs
    /// and the run ends with `HarnessError::Cancelled`.
    async fn run_with_progress(
        &self,
        descriptor: &SkillTestDescriptor,
        input: SkillInput,
        progress: &Progress,
        cancel: &CancellationToken
    ) -> Result<SkillRunReport> {
        // Both checks are local and must fail before anything is created remotely.
        let skill = descriptor.build_skill(&self.options)?;
        validate_input(descriptor, &input)?;

        let resources = RunResources::new(descriptor.name(), &run_token());
        progress.step(5, format!("Starting skill test: {} (run {})", descriptor.name(), resources.run_token));

        let outcome = tokio::select! {
            outcome = self.execute(descriptor, skill, input, &resources, progress) => outcome,
            _ = cancel.cancelled() => {
                progress.send(RunEvent::Log(format!("Run {} cancelled; cleaning up", resources.run_token)));
                Err(
                    HarnessError::Cancelled(
                        format!("{} run {} was cancelled", descriptor.name(), resources.run_token)
                    )
                )
            }
        };

        let cleanup = cleanup(self.search.as_ref(), &resources).await;
        if !cleanup.is_clean() {
            progress.send(RunEvent::Log(format!("Cleanup left {} resources behind", cleanup.failures().count())));
        }

        let execution = outcome?;
        progress.step(
            100,
            format!("{} returned {} documents", descriptor.name(), execution.documents.len())
        );

        Ok(SkillRunReport {
            skill: descriptor.skill_kind,
            resources,
            blob_path: execution.blob_path,
            documents: execution.documents,
            wait: execution.wait,
            cleanup,
        })
    }

    async fn execute(
        &self,
        descriptor: &SkillTestDescriptor,
        skill: serde_json::Value,
        input: SkillInput,
        resources: &RunResources,
        progress: &Progress
    ) -> Result<Execution> {
        let blob_path = resources.blob_path(input.extension());
        let content_type = input.content_type();
        self.blobs.ensure_container().await.map_err(HarnessError::Upload)?;
        self.blobs
            .upload(&blob_path, input.into_bytes(), content_type).await
            .map_err(HarnessError::Upload)?;
        progress.step(15, format!("Uploaded test input to {}", blob_path));

        let provisioner = Provisioner::new(self.search.clone());
        let folder = resources.blob_folder();
        provisioner.ensure_data_source(
            &resources.data_source_name,
            &self.blobs.connection_string(),
            self.blobs.container_name(),
            Some(&folder)
        ).await?;
        provisioner.ensure_skillset(
            &resources.skillset_name,
            std::slice::from_ref(&skill),
            &self.cognitive_key
        ).await?;
        provisioner.ensure_index(
            &resources.index_name,
            descriptor.emits_vector,
            descriptor.vector_dimensions
        ).await?;
        progress.step(30, format!("Provisioned data source, skillset and index for {}", descriptor.name()));

        let plan = IndexerPlan {
            name: resources.indexer_name.clone(),
            data_source_name: resources.data_source_name.clone(),
            skillset_name: resources.skillset_name.clone(),
            index_name: resources.index_name.clone(),
            output_field_mappings: output_field_mappings(descriptor),
            needs_image_processing: descriptor.requires_image_input,
            needs_file_data: descriptor.requires_file_data,
        };
        provisioner.ensure_and_run_indexer(&plan).await?;
        progress.step(50, format!("Executing {} skill via indexer {}", descriptor.name(), plan.name));

        let wait = wait_for_indexer(self.search.as_ref(), &resources.indexer_name, &self.wait).await?;
        progress.step(
            85,
            if wait.timed_out() {
                format!("Indexer {} timed out; fetching partial results", plan.name)
            } else {
                format!("Indexer {} finished", plan.name)
            }
        );

        let documents = fetch(self.search.as_ref(), &resources.index_name).await?;
        Ok(Execution { blob_path, wait, documents })
    }
}

/// A skill run executing on its own task.
pub struct SkillRunHandle {
    pub events: UnboundedReceiver<RunEvent>,
    cancel: CancellationToken,
    task: JoinHandle<Result<SkillRunReport>>,
}

impl SkillRunHandle {
    pub async fn join(self) -> Result<SkillRunReport> {
        self.task.await.map_err(|e| HarnessError::Cancelled(e.to_string()))?
    }

    /// Asks the run to stop. The task still deletes whatever it provisioned before `join`
    /// returns `HarnessError::Cancelled`.
    pub fn abort(&self) {
        self.cancel.cancel();
    }
}

/// Starts a skill test on a separate tokio task, streaming progress over a channel.
/// On failure the progress is reset to zero before the failure event.
pub fn spawn_skill_test(
    tester: Arc<SkillTester>,
    descriptor: SkillTestDescriptor,
    input: SkillInput
) -> SkillRunHandle {
    let (sender, events) = unbounded_channel();
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let task = tokio::spawn(async move {
        let progress = Progress { events: Some(sender) };
        let result = tester.run_with_progress(&descriptor, input, &progress, &token).await;
        match &result {
            Ok(report) => progress.send(RunEvent::Completed(report.clone())),
            Err(e) => {
                error!("Skill test {} failed: {}", descriptor.name(), e);
                progress.send(RunEvent::Progress(0));
                progress.send(RunEvent::Failed(e.to_string()));
            }
        }
        result
    });
    SkillRunHandle { events, cancel, task }
}

/// Runs the preview engine on the blocking pool so callers treat it like a live run.
pub async fn spawn_preview(skill_name: String, input: Option<String>) -> Result<PreviewResult> {
    tokio::task::spawn_blocking(move || preview(&skill_name, input.as_deref())).await
        .map_err(|e| HarnessError::Cancelled(e.to_string()))
}
