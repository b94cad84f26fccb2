use log::{ info, warn };
use serde::Serialize;

use crate::naming::RunResources;
use crate::service::{ DeleteOutcome, ResourceKind, SearchService };

/// Indexer first: it references the other three.
pub const DELETION_ORDER: [ResourceKind; 4] = [
    ResourceKind::Indexer,
    ResourceKind::Index,
    ResourceKind::Skillset,
    ResourceKind::DataSource,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "message", rename_all = "camelCase")]
pub enum CleanupOutcome {
    Deleted,
    NotFound,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupEntry {
    pub kind: String,
    pub name: String,
    #[serde(flatten)]
    pub outcome: CleanupOutcome,
}

/// What happened to each provisioned resource during teardown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub entries: Vec<CleanupEntry>,
}

impl CleanupReport {
    pub fn failures(&self) -> impl Iterator<Item = &CleanupEntry> {
        self.entries.iter().filter(|e| matches!(e.outcome, CleanupOutcome::Failed(_)))
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Deletes the run's indexer, index, skillset and data source, in that order. Every deletion is
/// attempted; failures are logged and recorded in the report, never returned.
pub async fn cleanup(service: &dyn SearchService, resources: &RunResources) -> CleanupReport {
    let mut report = CleanupReport::default();

    for kind in DELETION_ORDER {
        let name = resources.name(kind);
        let outcome = match service.delete_resource(kind, name).await {
            Ok(DeleteOutcome::Deleted) => {
                info!("Deleted {}: {}", kind, name);
                CleanupOutcome::Deleted
            }
            Ok(DeleteOutcome::NotFound) => {
                info!("{} {} was not there to delete", kind, name);
                CleanupOutcome::NotFound
            }
            Err(e) => {
                warn!("Failed to delete {} {}: {}", kind, name, e);
                CleanupOutcome::Failed(e.to_string())
            }
        };
        report.entries.push(CleanupEntry {
            kind: kind.to_string(),
            name: name.to_string(),
            outcome,
        });
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn report_serializes_outcomes_inline() {
        let report = CleanupReport {
            entries: vec![
                CleanupEntry {
                    kind: "indexer".to_string(),
                    name: "ixr-a-1".to_string(),
                    outcome: CleanupOutcome::Deleted,
                },
                CleanupEntry {
                    kind: "index".to_string(),
                    name: "idx-a-1".to_string(),
                    outcome: CleanupOutcome::Failed("boom".to_string()),
                }
            ],
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["entries"][0], json!({ "kind": "indexer", "name": "ixr-a-1", "outcome": "deleted" }));
        assert_eq!(value["entries"][1]["message"], "boom");
        assert!(!report.is_clean());
    }
}
