//! Safety Walkthrough CLI
//!
//! Walks one safety observation through hazard detection, risk scoring, and
//! corrective-action planning, narrating each stage in the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Canonical scaffolding observation against the offline analyzer
//! safety-walkthrough demo --offline
//!
//! # A specific observation against the analysis service
//! safety-walkthrough run --site "Building A - 3rd Floor" --potential HAZARD \
//!     --type UNSAFE_CONDITION --description "worker on unguarded scaffold"
//!
//! # Liveness of the analysis service
//! safety-walkthrough health
//! ```
//!
//! # Environment Variables
//!
//! - `SAFETY_WALKTHROUGH_CONFIG`: Path to a TOML config file
//! - `SAFETY_WALKTHROUGH_BACKEND_URL`: Override `backend.base_url`
//! - `RUST_LOG`: Logging filter (default: warn, or debug with `--verbose`)

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use safety_walkthrough::{
    config, report, AnalysisBackend, AppConfig, HttpBackend, Observation, ObservationPotential,
    ObservationType, OfflineBackend, OrchestratorOptions, PipelineOrchestrator, PipelineUpdate,
    Stage,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "safety-walkthrough")]
#[command(about = "Staged safety observation analysis walkthrough")]
#[command(version)]
struct CliArgs {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Analysis service base URL (overrides the config file)
    #[arg(long, global = true, env = "SAFETY_WALKTHROUGH_BACKEND_URL")]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Analyze one observation and walk through each stage
    Run(RunArgs),

    /// Walk through the canonical scaffolding observation
    Demo {
        #[command(flatten)]
        walk: WalkFlags,
    },

    /// Check that the analysis service is up
    Health {
        /// Report on the offline analyzer instead
        #[arg(long)]
        offline: bool,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Site or location, e.g. "Building A - 3rd Floor"
    #[arg(long)]
    site: String,

    /// NEAR_MISS | SAFE_PRACTICE | AT_RISK_BEHAVIOR | HAZARD | OTHER
    #[arg(long)]
    potential: ObservationPotential,

    /// AREA_FOR_IMPROVEMENT | POSITIVE_OBSERVATION | UNSAFE_CONDITION | UNSAFE_ACT
    #[arg(long = "type", value_name = "TYPE")]
    observation_type: ObservationType,

    /// What was observed
    #[arg(long)]
    description: String,

    #[arg(long, value_name = "ID")]
    trade_category: Option<String>,

    #[arg(long, value_name = "ID")]
    trade_partner: Option<String>,

    #[arg(long, value_name = "ID")]
    photo: Option<String>,

    /// When the observation was made (RFC 3339, default now)
    #[arg(long, value_name = "RFC3339")]
    observed_at: Option<DateTime<Utc>>,

    #[command(flatten)]
    walk: WalkFlags,
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct WalkFlags {
    /// Use the offline rule-based analyzer instead of the service
    #[arg(long)]
    offline: bool,

    /// Continue through every stage without prompting, then exit
    #[arg(long)]
    auto: bool,

    /// Reveal every stage immediately
    #[arg(long)]
    instant: bool,
}

impl RunArgs {
    fn observation(&self) -> Observation {
        let mut obs = Observation::new(
            self.site.clone(),
            self.potential,
            self.observation_type,
            self.description.clone(),
        );
        if let Some(id) = &self.trade_category {
            obs = obs.with_trade_category(id.clone());
        }
        if let Some(id) = &self.trade_partner {
            obs = obs.with_trade_partner(id.clone());
        }
        if let Some(id) = &self.photo {
            obs = obs.with_photo(id.clone());
        }
        if let Some(at) = self.observed_at {
            obs = obs.observed_at(at);
        }
        obs
    }
}

fn demo_observation() -> Observation {
    Observation::new(
        "Building A - 3rd Floor",
        ObservationPotential::Hazard,
        ObservationType::UnsafeCondition,
        "worker on unguarded scaffold",
    )
}

// ============================================================================
// Backend Selection
// ============================================================================

fn build_backend(
    app_config: &AppConfig,
    url_override: Option<&str>,
    offline: bool,
) -> Result<Arc<dyn AnalysisBackend>> {
    if offline {
        info!("Using offline analyzer");
        return Ok(Arc::new(OfflineBackend::new()));
    }

    let mut backend_config = app_config.backend.clone();
    if let Some(url) = url_override {
        backend_config.base_url = url.to_string();
        let mut check = app_config.clone();
        check.backend = backend_config.clone();
        check.validate().context("Invalid --backend-url")?;
    }
    let backend = HttpBackend::new(&backend_config).context("Failed to create analysis client")?;
    info!(base_url = %backend.base_url(), "Using analysis service");
    Ok(Arc::new(backend))
}

// ============================================================================
// Walkthrough Session
// ============================================================================

/// Interactive (or `--auto`) presenter over one orchestrator.
struct Session {
    orch: PipelineOrchestrator,
    input: Lines<BufReader<Stdin>>,
    auto: bool,
    cancel: CancellationToken,
}

enum Next {
    Update(Option<PipelineUpdate>),
    Line(Option<String>),
}

impl Session {
    /// Read one trimmed line; `None` on EOF or Ctrl-C.
    async fn read_line(&mut self) -> Option<String> {
        tokio::select! {
            () = self.cancel.cancelled() => None,
            line = self.input.next_line() => line.ok().flatten().map(|l| l.trim().to_string()),
        }
    }

    /// Print the current stage's heading and, if it settled already, its result.
    fn render_entry(&self) {
        let state = self.orch.state();
        println!("{}", report::heading(state.stage, state.review_mode));
        if state.stage == Stage::Summary {
            if let Some(summary) = self.orch.summary() {
                print!("{}", report::summary(&summary));
            }
        } else if state.is_ready() {
            self.render_result();
        }
    }

    fn render_result(&self) {
        if let Some(result) = self.orch.state().result_for(self.orch.state().stage) {
            print!("{}", report::stage_result(&result));
        }
    }

    /// Deliver progress until the orchestrator is idle. In interactive mode
    /// `s` skips the running reveal.
    async fn pump(&mut self) {
        while self.orch.has_pending_work() {
            let can_skip = !self.auto && self.orch.state().stage.is_analysis();
            let next = tokio::select! {
                update = self.orch.step() => Next::Update(update),
                line = self.input.next_line(), if can_skip => Next::Line(line.ok().flatten()),
            };

            match next {
                Next::Update(None) => return,
                Next::Update(Some(update)) => match update {
                    PipelineUpdate::Analyzed => self.render_entry(),
                    PipelineUpdate::Phase { phase, .. } => println!("{}", report::phase(&phase)),
                    PipelineUpdate::Ready(_) => self.render_result(),
                    PipelineUpdate::SubmitFailed { message } => {
                        println!("{}", report::submit_error(&message));
                    }
                },
                Next::Line(Some(line)) if line.trim().eq_ignore_ascii_case("s") => {
                    if self.orch.skip_reveal().is_ok() && self.orch.state().is_ready() {
                        self.render_result();
                    }
                }
                Next::Line(Some(_)) => {}
                Next::Line(None) => {
                    // stdin closed; finish the reveal without prompting again
                    self.auto = true;
                }
            }
        }
    }

    fn submit(&mut self, observation: &Observation) -> Result<()> {
        println!("{}", report::heading(Stage::Form, false));
        print!("{}", report::observation(observation));
        println!("  Analyzing with the {} backend...", self.orch.backend_name());
        self.orch
            .submit(observation.clone())
            .context("Observation was not accepted")
    }

    /// Drive one run from submission to quit.
    async fn walk(&mut self, mut observation: Observation) -> Result<()> {
        self.submit(&observation)?;

        loop {
            self.pump().await;
            if self.orch.is_shut_down() {
                println!("\n  Interrupted.");
                return Ok(());
            }

            let state = self.orch.state();
            let stage = state.stage;
            match stage {
                Stage::Form => {
                    let Some(message) = state.last_error.clone() else {
                        return Ok(());
                    };
                    if self.auto {
                        anyhow::bail!(message);
                    }
                    println!("  Re-submit? [y/N]");
                    match self.read_line().await.as_deref() {
                        Some("y" | "Y" | "yes") => self.submit(&observation)?,
                        _ => return Ok(()),
                    }
                }
                Stage::Summary => {
                    if self.auto {
                        return Ok(());
                    }
                    println!("\n  {}", report::prompt(state));
                    let Some(line) = self.read_line().await else {
                        return Ok(());
                    };
                    match line.to_ascii_lowercase().as_str() {
                        "quit" | "q" | "exit" => return Ok(()),
                        "new" => {
                            self.orch.reset();
                            println!("  Description for the new observation (blank to quit):");
                            match self.read_line().await {
                                Some(description) if !description.is_empty() => {
                                    observation = Observation::new(
                                        observation.site.clone(),
                                        observation.potential,
                                        observation.observation_type,
                                        description,
                                    );
                                    self.submit(&observation)?;
                                }
                                _ => return Ok(()),
                            }
                        }
                        other => match other.parse::<Stage>() {
                            Ok(target) => match self.orch.view_stage(target) {
                                Ok(()) => self.render_entry(),
                                Err(e) => println!("  {e}"),
                            },
                            Err(_) => println!("  Unknown command: {other}"),
                        },
                    }
                }
                _ if state.is_ready() => {
                    let review = state.review_mode;
                    if !self.auto {
                        println!("\n  {}", report::prompt(state));
                        let Some(line) = self.read_line().await else {
                            return Ok(());
                        };
                        match line.to_ascii_lowercase().as_str() {
                            "quit" | "q" | "exit" => return Ok(()),
                            "back" if review => {
                                self.orch.return_to_summary()?;
                                self.render_entry();
                                continue;
                            }
                            "" => {}
                            other => {
                                println!("  Unknown command: {other}");
                                continue;
                            }
                        }
                    }
                    self.orch.continue_to_next()?;
                    self.render_entry();
                }
                _ => {
                    debug!(%stage, "Nothing pending and stage not ready");
                    return Ok(());
                }
            }
        }
    }
}

async fn run_walkthrough(
    args: &CliArgs,
    app_config: &AppConfig,
    observation: Observation,
    walk: WalkFlags,
    cancel: CancellationToken,
) -> Result<()> {
    let backend = build_backend(app_config, args.backend_url.as_deref(), walk.offline)?;
    let mut options = OrchestratorOptions::from_config(&app_config.animation);
    if walk.instant {
        options.skip_animation = true;
    }

    let orch = PipelineOrchestrator::new(backend, options).with_shutdown(&cancel);
    let mut session = Session {
        orch,
        input: BufReader::new(tokio::io::stdin()).lines(),
        auto: walk.auto,
        cancel,
    };
    let outcome = session.walk(observation).await;
    session.orch.shutdown();
    outcome
}

async fn run_health(args: &CliArgs, app_config: &AppConfig, offline: bool) -> Result<()> {
    let backend = build_backend(app_config, args.backend_url.as_deref(), offline)?;
    let health = backend
        .health()
        .await
        .context("Health check failed")?;
    println!("status:  {}", health.status);
    println!("version: {}", health.version);
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let app_config = AppConfig::load();
    config::init(app_config.clone());

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, cancelling");
        shutdown_token.cancel();
    });

    match &args.command {
        SubCommand::Run(run) => {
            let observation = run.observation();
            run_walkthrough(&args, &app_config, observation, run.walk, cancel_token).await
        }
        SubCommand::Demo { walk } => {
            run_walkthrough(&args, &app_config, demo_observation(), *walk, cancel_token).await
        }
        SubCommand::Health { offline } => run_health(&args, &app_config, *offline).await,
    }
}
