use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{ Parser, Subcommand };
use log::{ debug, error };
use tracing_subscriber::EnvFilter;

use skill_harness::cleanup::{ CleanupOutcome, CleanupReport };
use skill_harness::input::resolve_input;
use skill_harness::preview::preview;
use skill_harness::report::{ format_results, validate_results };
use skill_harness::{
    spawn_skill_test,
    HarnessConfig,
    Result,
    RunEvent,
    ServiceError,
    SkillKind,
    SkillOptions,
    SkillTestDescriptor,
    SkillTester,
};

#[derive(Parser, Debug)]
#[command(name = "skill-harness", version, about = "Exercise Azure AI Search built-in skills")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every supported skill kind
    List,
    /// Show a representative output document without calling any service
    Preview {
        skill: String,
        #[arg(long)]
        text: Option<String>,
    },
    /// Run a skill against the live search service
    Run {
        skill: String,
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
        /// Print the fetched documents as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run every skill group with its built-in sample, continuing past failures
    RunAll,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::List => {
            list();
            Ok(())
        }
        Command::Preview { skill, text } => print_preview(&skill, text.as_deref()),
        Command::Run { skill, text, file, json } => run(&skill, text, file, json).await,
        Command::RunAll => run_all().await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn list() {
    let options = SkillOptions::default();
    for descriptor in SkillTestDescriptor::all(&options) {
        let mut flags = Vec::new();
        if descriptor.requires_cognitive_services {
            flags.push("cognitive".to_string());
        }
        if descriptor.requires_image_input {
            flags.push("image".to_string());
        }
        if descriptor.requires_file_data {
            flags.push("file-data".to_string());
        }
        if let Some(dims) = descriptor.vector_dimensions {
            flags.push(format!("vector[{}]", dims));
        }
        println!("{:<34} {}", descriptor.name(), flags.join(" "));
    }
}

fn print_preview(skill: &str, text: Option<&str>) -> Result<()> {
    let result = preview(skill, text);
    println!("{}", serde_json::to_string_pretty(&result).map_err(ServiceError::from)?);
    Ok(())
}

async fn run(skill: &str, text: Option<String>, file: Option<PathBuf>, json: bool) -> Result<()> {
    let kind: SkillKind = skill.parse()?;
    let config = HarnessConfig::from_env()?;
    let tester = Arc::new(SkillTester::from_config(&config)?);
    let descriptor = tester.descriptor(kind);
    let input = resolve_input(&descriptor, text, file.as_deref())?;

    let mut handle = spawn_skill_test(tester, descriptor.clone(), input);
    while let Some(event) = handle.events.recv().await {
        if let RunEvent::Progress(percent) = event {
            debug!("{} progress {}%", descriptor.name(), percent);
        }
    }
    let report = handle.join().await?;

    if json {
        let documents = serde_json::to_string_pretty(&report.documents).map_err(ServiceError::from)?;
        println!("{}", documents);
    } else {
        println!("{}", format_results(descriptor.name(), &report.documents));
        if !validate_results(&descriptor, &report.documents) {
            println!("Some expected output fields are missing.");
        }
    }
    if report.wait.timed_out() {
        println!("Indexer did not finish in time; results may be partial.");
    }
    print_cleanup(&report.cleanup);
    Ok(())
}

async fn run_all() -> Result<()> {
    let config = HarnessConfig::from_env()?;
    let tester = SkillTester::from_config(&config)?;
    let batch = tester.run_all().await;

    let mut group = None;
    for entry in &batch.entries {
        if group != Some(entry.group) {
            println!("\n=== Testing {} Skills ===", entry.group.label());
            group = Some(entry.group);
        }
        match &entry.outcome {
            Ok(report) => {
                println!("{}", format_results(entry.skill.name(), &report.documents));
                if !report.cleanup.is_clean() {
                    print_cleanup(&report.cleanup);
                }
            }
            Err(e) => println!("Error testing {}: {}", entry.skill, e),
        }
    }
    for skill in &batch.skipped {
        println!("Skipped {}: no embedding resource configured", skill);
    }
    println!("\n{} succeeded, {} failed", batch.succeeded(), batch.failures().count());
    Ok(())
}

fn print_cleanup(cleanup: &CleanupReport) {
    for entry in &cleanup.entries {
        let outcome = match &entry.outcome {
            CleanupOutcome::Deleted => "deleted".to_string(),
            CleanupOutcome::NotFound => "not found".to_string(),
            CleanupOutcome::Failed(message) => format!("FAILED: {}", message),
        };
        println!("cleanup {} {}: {}", entry.kind, entry.name, outcome);
    }
}
