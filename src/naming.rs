use std::sync::atomic::{ AtomicU64, Ordering };

use chrono::Utc;
use serde::Serialize;

use crate::service::ResourceKind;

static LAST_TOKEN: AtomicU64 = AtomicU64::new(0);

/// Per-run uniqueness token: wall-clock nanoseconds, bumped past the last token handed
/// out by this process so rapid sequential or concurrent runs never share one. Runs in
/// different processes are only as distinct as their clocks.
pub fn run_token() -> String {
    let now = Utc::now()
        .timestamp_nanos_opt()
        .map(|n| n.max(0) as u64)
        .unwrap_or_else(|| (Utc::now().timestamp_millis().max(0) as u64) * 1_000_000);

    let mut previous = LAST_TOKEN.load(Ordering::Relaxed);
    loop {
        let candidate = if now > previous { now } else { previous + 1 };
        match
            LAST_TOKEN.compare_exchange_weak(
                previous,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed
            )
        {
            Ok(_) => {
                return candidate.to_string();
            }
            Err(actual) => {
                previous = actual;
            }
        }
    }
}

/// `<prefix>-<skill_kind_lowercased>-<run_token>`
pub fn name_for(kind: ResourceKind, skill_kind: &str, run_token: &str) -> String {
    format!("{}-{}-{}", kind.prefix(), skill_kind.to_lowercase(), run_token)
}

/// The four search-service resources owned by one skill run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResources {
    pub run_token: String,
    pub data_source_name: String,
    pub skillset_name: String,
    pub index_name: String,
    pub indexer_name: String,
}

impl RunResources {
    pub fn new(skill_kind: &str, run_token: &str) -> Self {
        Self {
            run_token: run_token.to_string(),
            data_source_name: name_for(ResourceKind::DataSource, skill_kind, run_token),
            skillset_name: name_for(ResourceKind::Skillset, skill_kind, run_token),
            index_name: name_for(ResourceKind::Index, skill_kind, run_token),
            indexer_name: name_for(ResourceKind::Indexer, skill_kind, run_token),
        }
    }

    pub fn name(&self, kind: ResourceKind) -> &str {
        match kind {
            ResourceKind::DataSource => &self.data_source_name,
            ResourceKind::Skillset => &self.skillset_name,
            ResourceKind::Index => &self.index_name,
            ResourceKind::Indexer => &self.indexer_name,
        }
    }

    /// Virtual folder holding this run's blobs; the data source reads only from here.
    pub fn blob_folder(&self) -> String {
        format!("test_data/{}", self.run_token)
    }

    /// Blob path the run's input is uploaded to.
    pub fn blob_path(&self, extension: &str) -> String {
        format!("{}/input.{}", self.blob_folder(), extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_follow_prefix_skill_token_shape() {
        let resources = RunResources::new("KeyPhraseExtractionSkill", "1700000000000");
        assert_eq!(resources.data_source_name, "ds-keyphraseextractionskill-1700000000000");
        assert_eq!(resources.skillset_name, "ss-keyphraseextractionskill-1700000000000");
        assert_eq!(resources.index_name, "idx-keyphraseextractionskill-1700000000000");
        assert_eq!(resources.indexer_name, "ixr-keyphraseextractionskill-1700000000000");
        assert_eq!(resources.name(ResourceKind::Index), resources.index_name);
        assert_eq!(resources.blob_path("txt"), "test_data/1700000000000/input.txt");
        assert_eq!(resources.blob_folder(), "test_data/1700000000000");
    }

    #[test]
    fn tokens_never_repeat_within_a_process() {
        let tokens: HashSet<String> = (0..1000).map(|_| run_token()).collect();
        assert_eq!(tokens.len(), 1000);
    }

    #[test]
    fn tokens_are_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..250).map(|_| run_token()).collect::<Vec<_>>()))
            .collect();
        let mut all = HashSet::new();
        for handle in handles {
            for token in handle.join().unwrap() {
                assert!(all.insert(token));
            }
        }
        assert_eq!(all.len(), 1000);
    }
}
