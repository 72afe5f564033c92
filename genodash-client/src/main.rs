//! genodash - GenoDash command-line client
//!
//! Drives the consent → upload → analyze → poll pipeline against a
//! running dashboard backend.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use genodash_client::poller::{PollEvent, StopReason};
use genodash_client::session::SessionStore;
use genodash_client::ApiClient;
use genodash_common::access::MenuVisibilityPolicy;
use genodash_common::config::{self, ClientConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "genodash", about = "GenoDash genomic dashboard client")]
struct Cli {
    /// Backend base URL (overrides config file)
    #[arg(long, env = "GENODASH_API_URL")]
    api_url: Option<String>,

    /// Bearer token; starts a fresh session when given
    #[arg(long, env = "GENODASH_TOKEN")]
    token: Option<String>,

    /// Session file location (defaults to the platform data dir)
    #[arg(long)]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign (or confirm) the data-use consent
    Consent,
    /// Upload a genome file (FASTA/VCF/GFF/BED)
    Upload {
        path: PathBuf,
        #[arg(long)]
        project: Option<String>,
    },
    /// List uploaded files
    Files {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Submit a sequence analysis and watch it to completion
    Analyze { file_id: String },
    /// Watch an existing analysis job
    Watch { analysis_id: String },
    /// Run variant detection and watch it to completion
    Variants { file_id: String },
    /// Per-chromosome variant counts for a file
    Density { file_id: String },
    /// Region metrics for a file
    Regions { file_id: String },
    /// Show the navigation entries visible to the logged-in user
    Nav {
        /// Apply hierarchical access instead of exact role membership
        #[arg(long)]
        hierarchy: bool,
    },
    /// Clear the stored session
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    let config = ClientConfig::resolve(cli.api_url.as_deref())?;

    let session_path = cli
        .session_file
        .clone()
        .or_else(config::default_session_path)
        .context("Could not determine a session file location")?;
    let session = Arc::new(SessionStore::with_file(session_path));

    let client = ApiClient::new(&config, session.clone())?;

    if let Some(token) = cli.token {
        // The session file is only written once the token checks out
        let user = genodash_client::login_with_token(&config, &session, token)
            .await
            .context("Token rejected by backend")?;
        info!(user = %user.name, role = ?user.role, "Logged in");
    }

    match cli.command {
        Command::Consent => {
            let consent_id = client.consent.ensure_consent().await?;
            println!("Consent signed: {consent_id}");
        }
        Command::Upload { path, project } => {
            let file = client
                .upload_genome_path(&path, project.as_deref())
                .await?;
            println!("Uploaded {} as {}", file.filename, file.file_id);
        }
        Command::Files { page, limit } => {
            let listing = client.genome.my_files(page, limit).await?;
            println!("{} file(s) total", listing.total);
            for file in listing.files {
                println!(
                    "  {}  {}  {} bytes",
                    file.file_id, file.filename, file.size
                );
            }
        }
        Command::Analyze { file_id } => {
            let analysis_id = client.run_sequence_analysis(&file_id).await?;
            println!("Submitted analysis {analysis_id}");
            watch_to_completion(&client, &analysis_id).await;
        }
        Command::Watch { analysis_id } => {
            watch_to_completion(&client, &analysis_id).await;
        }
        Command::Variants { file_id } => {
            let job = client.run_variant_detection(&file_id).await?;
            println!("Submitted variant detection {}", job.analysis_id);
            watch_to_completion(&client, &job.analysis_id).await;
        }
        Command::Density { file_id } => {
            let density = client.variants.mutation_density(&file_id).await?;
            println!("{} variant(s) total", density.total_variants);
            for bin in density.densities {
                println!("  {}: {}", bin.chrom, bin.count);
            }
        }
        Command::Regions { file_id } => {
            let regions = client.variants.region_metrics(&file_id).await?;
            for (name, value) in regions.metrics {
                println!("  {name}: {value}");
            }
        }
        Command::Nav { hierarchy } => {
            let policy = if hierarchy {
                MenuVisibilityPolicy::Hierarchy
            } else {
                MenuVisibilityPolicy::ExactMembership
            };
            for item in client.navigation(policy) {
                println!("  {}  ->  {}", item.label, item.route);
            }
        }
        Command::Logout => {
            session.logout()?;
            println!("Session cleared");
        }
    }

    Ok(())
}

/// Watch a job until its loop stops, printing each update
async fn watch_to_completion(client: &ApiClient, analysis_id: &str) {
    let handle = client.watch_job(analysis_id, |event| match event {
        PollEvent::Update(job) => {
            let summary = job
                .results
                .as_ref()
                .map(|r| r.summary.clone())
                .unwrap_or_default();
            if summary.is_empty() {
                println!("  {:?}  {:.0}%", job.status, job.progress());
            } else {
                println!("  {:?}  {:.0}%  {}", job.status, job.progress(), summary);
            }
        }
        PollEvent::TransientFailure {
            consecutive,
            message,
        } => {
            eprintln!("  warning: {consecutive} consecutive poll failures ({message}); still retrying");
        }
        PollEvent::Stopped(reason) => match reason {
            StopReason::Completed => println!("Analysis completed."),
            StopReason::Failed => println!("Analysis failed."),
            StopReason::NotFound => eprintln!("Analysis not found."),
            StopReason::Unauthorized => eprintln!("Session expired or access denied."),
            StopReason::Rejected => eprintln!("Backend rejected the status request."),
            StopReason::RetriesExhausted => eprintln!("Backend unreachable, gave up."),
        },
    });
    handle.wait().await;
}
