//! flame-sim: walk one learner through a course headlessly
//!
//! Loads a course from YAML, opens a session with the fixed-delay grader,
//! then activates, studies and completes every scroll it can reach. The
//! final progress snapshot is printed as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use tracing::{info, warn};

use flame_catalog::InMemoryContentSource;
use flame_progress::unlock::first_available;
use flame_progress::{EngineConfig, InMemoryProgressRepository, NextScroll, ProgressEngine};

#[derive(Parser)]
#[command(name = "flame-sim")]
#[command(about = "Simulate a learner working through a Sacred Flame course")]
struct Cli {
    /// Course definition (YAML)
    #[arg(short, long)]
    course: PathBuf,

    /// Engine configuration (YAML)
    #[arg(long, env = "FLAME_CONFIG")]
    config: Option<PathBuf>,

    /// Learner id
    #[arg(short, long, env = "FLAME_USER", default_value = "learner")]
    user: String,

    /// Grader latency in ms (overrides config file)
    #[arg(long, env = "FLAME_GRADING_DELAY_MS")]
    grading_delay_ms: Option<u64>,

    /// Attempts per challenge before giving up
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("flame_progress=info".parse()?)
                .add_directive("flame_catalog=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            EngineConfig::from_yaml(&content)?
        }
        None => EngineConfig::default(),
    };
    if let Some(delay) = cli.grading_delay_ms {
        config.grading.fixed_delay_ms = delay;
    }

    let content = Arc::new(InMemoryContentSource::new());
    let course_id = content.load_yaml_file(&cli.course).await?;
    info!(course_id = %course_id, user = %cli.user, "Starting simulation");

    let engine = ProgressEngine::from_config(config, content, Arc::new(InMemoryProgressRepository::new()));
    let session = engine.open_session(&cli.user, &course_id).await?;
    let course = Arc::clone(session.course());

    loop {
        let progress = session.progress().await;
        let scroll_id = match progress.active_scroll_id {
            Some(id) => id,
            None => match first_available(&course, &progress) {
                Some(scroll) => scroll.id.clone(),
                None => break,
            },
        };
        let scroll = course
            .scroll(&scroll_id)
            .ok_or_else(|| anyhow!("scroll {} vanished from course", scroll_id))?;

        session.activate_scroll(&scroll.id).await?;
        for section in &scroll.sections {
            session.complete_section(&scroll.id, &section.id).await?;
        }

        let mut passed = false;
        for attempt in 1..=cli.max_attempts {
            let pending = session
                .submit_challenge(&scroll.id, serde_json::json!({ "attempt": attempt }))
                .await?;
            match pending.handle.await? {
                Some(graded) if graded.is_passed() => {
                    passed = true;
                    break;
                }
                Some(graded) => warn!(
                    scroll_id = %scroll.id,
                    attempt,
                    feedback = graded.feedback.as_deref().unwrap_or(""),
                    "Challenge failed"
                ),
                None => bail!("grading of {} did not complete", scroll.id),
            }
        }
        if !passed {
            bail!("challenge of {} not passed after {} attempts", scroll.id, cli.max_attempts);
        }

        session.complete_scroll(&scroll.id, NextScroll::FirstAvailable).await?;
    }

    let snapshot = session.snapshot().await;
    info!(
        completed = snapshot.completed_scrolls,
        total = snapshot.total_scrolls,
        earned = snapshot.flame_shards_earned,
        "Simulation finished"
    );
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    Ok(())
}
