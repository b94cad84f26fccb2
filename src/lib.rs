pub mod cleanup;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod indexer_wait;
pub mod input;
pub mod naming;
pub mod orchestrator;
pub mod preview;
pub mod provisioner;
pub mod report;
pub mod schema;
pub mod service;
pub mod skills;

pub use config::HarnessConfig;
pub use error::{ HarnessError, Result, ServiceError };
pub use orchestrator::{
    spawn_preview,
    spawn_skill_test,
    BatchEntry,
    BatchReport,
    RunEvent,
    SkillRunReport,
    SkillTester,
};
pub use service::{ create_blob_store, create_search_service, BlobStore, SearchService };
pub use skills::{ SkillGroup, SkillKind, SkillOptions, SkillTestDescriptor };
