use std::process::ExitCode;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slicectl::cli::{Cli, Commands};
use slicectl::config::{self, Config};
use slicectl::errors::AppError;
use slicectl::inventory::{self, Reporter};
use slicectl::maintain::CredentialMaintainer;
use slicectl::provision::{Orchestrator, Provisioned};
use slicectl::testbed::http::HttpTestbed;
use slicectl::testbed::{ListQuery, Scope, SliceRequest, TestbedClient};
use slicectl::token::FreshnessChecker;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "slicectl=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Cli::parse();
    let cfg = match config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {e:?}");
            return ExitCode::from(2);
        }
    };

    match run(&cfg, args.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            if let Some(hint) = e.hint() {
                eprintln!("Hint: {hint}");
            }
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cfg: &Config, command: Commands) -> Result<(), AppError> {
    match command {
        Commands::Create {
            site,
            image,
            cores,
            ram,
            disk,
            name_prefix,
            timeout,
            poll,
        } => {
            info!("validating config/token before contacting the testbed");
            FreshnessChecker::new(cfg.token_location.clone()).gate()?;
            let testbed = init_client(cfg)?;

            let site = match site {
                Some(site) => site,
                None => testbed.select_site().await.map_err(AppError::Submission)?,
            };
            let request = SliceRequest {
                name: SliceRequest::unique_name(&name_prefix, Utc::now()),
                site,
                image,
                node_name: "node1".into(),
                cores,
                ram_gb: ram,
                disk_gb: disk,
            };

            let outcome = Orchestrator::new(testbed.as_ref())
                .provision(
                    &request,
                    Duration::from_secs(timeout),
                    Duration::from_secs(poll),
                )
                .await?;
            match outcome {
                Provisioned::Stable {
                    slice,
                    polls,
                    elapsed,
                } => {
                    info!(
                        %slice,
                        polls,
                        elapsed_secs = elapsed.as_secs(),
                        "slice is stable; printing summary"
                    );
                    let query = ListQuery {
                        name_filter: Some(request.name.clone()),
                        include_terminal: false,
                        scope: Scope::SelfOnly,
                    };
                    for slice in Reporter::new(testbed.as_ref()).list(&query).await? {
                        print!("{}", inventory::render(&slice));
                    }
                    Ok(())
                }
                Provisioned::TimedOut {
                    slice,
                    last_state,
                    elapsed,
                } => Err(AppError::Timeout {
                    slice: slice.to_string(),
                    elapsed_secs: elapsed.as_secs(),
                    last_state,
                }),
            }
        }

        Commands::List { name, all, project } => {
            FreshnessChecker::new(cfg.token_location.clone()).gate()?;
            let testbed = init_client(cfg)?;
            let query = ListQuery {
                name_filter: name,
                include_terminal: all,
                scope: if project { Scope::Project } else { Scope::SelfOnly },
            };
            let slices = Reporter::new(testbed.as_ref()).list(&query).await?;
            if slices.is_empty() {
                println!("No slices found.");
                return Ok(());
            }
            for slice in &slices {
                print!("{}", inventory::render(slice));
            }
            Ok(())
        }

        Commands::RenewKeys => {
            // No freshness gate: renewal must work for a token at or past expiry.
            let testbed = init_client(cfg)?;
            CredentialMaintainer::new(testbed.as_ref()).renew().await
        }
    }
}

fn init_client(cfg: &Config) -> Result<Box<dyn TestbedClient>, AppError> {
    let Some(path) = &cfg.token_location else {
        return Err(AppError::TokenLocationUnset);
    };
    info!("initializing testbed client");
    let client = HttpTestbed::new(&cfg.orchestrator_url, path, cfg.project_id.clone())
        .map_err(AppError::ClientInit)?;
    Ok(Box::new(client))
}
