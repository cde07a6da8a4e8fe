//! Proofline CLI: run the pipeline against the configured backends.
//!
//! Reads the same environment as the API server (`.env` included).

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use proofline_cli::{format_progress, init_tracing, load_upload_file, print_json};
use proofline_core::Config;
use proofline_services::Services;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "proofline", about = "School photo ingestion pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload photos for a classroom and enqueue their processing jobs
    Upload {
        /// Classroom UUID
        #[arg(long, value_name = "UUID")]
        classroom: Uuid,
        /// Alt text applied to every file
        #[arg(long)]
        alt_text: Option<String>,
        /// Photo files (jpg, png, webp)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Run worker batch passes
    Process {
        /// Keep running passes until a pass finds no work
        #[arg(long)]
        drain: bool,
    },
    /// Print queue counts
    Stats,
    /// List processed photos of a classroom
    Photos {
        /// Classroom UUID
        #[arg(long, value_name = "UUID")]
        classroom: Uuid,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    let services = Services::from_config(config).await?;

    match cli.command {
        Commands::Upload {
            classroom,
            alt_text,
            files,
        } => {
            let mut uploads = Vec::with_capacity(files.len());
            for path in &files {
                let file = load_upload_file(path).await?;
                uploads.push(match &alt_text {
                    Some(alt) => file.with_alt_text(alt.clone()),
                    None => file,
                });
            }

            let result = services
                .uploads
                .upload_batch_with_progress(classroom, uploads, |progress| {
                    eprintln!("{}", format_progress(progress));
                })
                .await;
            print_json(&result)?;

            if !result.success {
                anyhow::bail!(
                    "{} of {} uploads failed",
                    result.failed_count,
                    result.failed_count + result.uploaded_count
                );
            }
        }
        Commands::Process { drain } => loop {
            let report = services.runner.run_batch().await?;
            print_json(&report)?;
            if !drain || report.processed_count == 0 {
                break;
            }
        },
        Commands::Stats => {
            let stats = services.queue.stats().await?;
            println!("queue:         {}", services.queue.queue_name());
            println!("visible:       {}", stats.visible);
            println!("leased:        {}", stats.leased);
            println!("archived:      {}", stats.archived);
            println!("dead-lettered: {}", stats.dead_lettered);
        }
        Commands::Photos { classroom } => {
            let photos = services.photos.list_by_classroom(classroom).await?;
            print_json(&photos)?;
        }
    }

    Ok(())
}
