use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jobdeck::config::{Config, LoggingConfig};
use jobdeck::scheduler::countdown::countdown_until;
use jobdeck::scheduler::JobStatus;

#[derive(Parser)]
#[command(
    name = "jobdeck",
    about = "Job dashboard core: schedules, run-now and execution results",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file (default: $JOBDECK_CONFIG, then ./jobdeck.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Bind address (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Inspect job schedules
    Schedule {
        #[command(subcommand)]
        action: ScheduleAction,
    },

    /// Run a job once, bypassing its schedule
    Run {
        /// Job id as listed by `schedule list`
        job_id: String,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ScheduleAction {
    /// List jobs with their rule and next run
    List,

    /// Preview the next fire instants of every job
    Preview {
        /// Runs to show per job
        #[arg(long, default_value = "5")]
        count: usize,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config events (such as a bad JOBDECK_CONFIG being skipped) are emitted
    // before the configured subscriber exists.
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    let mut config =
        tracing::subscriber::with_default(bootstrap, || Config::resolve(cli.config.as_deref()))?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            tracing::info!(bind = %config.server.bind, "Starting jobdeck");
            jobdeck::serve(&config).await?;
        }
        Commands::Schedule { action } => {
            let state = jobdeck::build_state(&config)?;
            let calculator = &state.calculator;
            let jobs = state.dispatcher.catalog().jobs();
            let now = Utc::now();

            match action {
                ScheduleAction::List => {
                    if jobs.is_empty() {
                        println!("No jobs configured.");
                    } else {
                        println!(
                            "{:<18} | {:<8} | {:<27} | {:<18} | Schedule",
                            "Job", "Active", "Next run", "Countdown"
                        );
                        println!("{:-<18}-|-{:-<8}-|-{:-<27}-|-{:-<18}-|-{:-<30}", "", "", "", "", "");
                        for job in &jobs {
                            let next = calculator.next_run_for(job, now);
                            let next_str = next
                                .map(|at| at.format("%a %Y-%m-%d %H:%M %:z").to_string())
                                .unwrap_or_else(|| "-".to_string());
                            let countdown = next
                                .map(|at| countdown_until(at, now))
                                .unwrap_or_else(|| "-".to_string());
                            println!(
                                "{:<18} | {:<8} | {:<27} | {:<18} | {}",
                                job.id,
                                job.active,
                                next_str,
                                countdown,
                                calculator.describe(job.rule)
                            );
                        }
                    }
                }
                ScheduleAction::Preview { count } => {
                    for job in &jobs {
                        println!("{} ({})", job.name, job.id);
                        let runs = calculator.upcoming(job, now, count);
                        if runs.is_empty() {
                            println!("  (no upcoming runs)");
                        }
                        for at in runs {
                            println!("  {}", at.format("%a %Y-%m-%d %H:%M %:z"));
                        }
                    }
                }
            }
        }
        Commands::Run { job_id, json } => {
            let state = jobdeck::build_state(&config)?;
            let result = state.dispatcher.run_now(&job_id).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("\n=== jobdeck run: {} ===", result.job_id);
                println!("Status:  {}", result.status);
                if !result.message.is_empty() {
                    println!("Message: {}", result.message);
                }
                for line in &result.details {
                    println!(" - {}", line);
                }
                for line in &result.errors {
                    println!(" ! {}", line);
                }
                for (name, value) in &result.counters {
                    println!("{:<12}: {}", name, value);
                }
                println!();
            }

            if result.status == JobStatus::Error {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
