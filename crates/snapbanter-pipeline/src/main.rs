//! SnapBanter — entry point.

use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use snapbanter::{inspect_capture, is_supported_format, Banter, LocalImageStore};
use snapbanter_pipeline::config::{
    resolve_data_dir, resolve_endpoint, BucketSettings, CompletionSettings, EndpointSettings,
};
use snapbanter_pipeline::generation::{BanterGenerator, CompletionClient, EndpointClient};
use snapbanter_pipeline::upload::{BucketUploader, ImageUploader, InlineUploader};
use snapbanter_pipeline::UploadOrchestrator;

#[derive(Parser)]
#[command(
    name = "snapbanter",
    about = "Turn photos into short playful captions and keep them in a local gallery",
    version
)]
struct Cli {
    /// Directory holding banters.json and persisted images.
    #[arg(short, long, global = true)]
    data_dir: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit one or more captures for banter generation.
    Submit {
        /// Image files to submit.
        #[arg(required = true)]
        images: Vec<String>,

        /// generate-banter endpoint URL. Also reads SNAPBANTER_ENDPOINT.
        #[arg(long)]
        endpoint: Option<String>,

        /// Call the chat-completion API directly instead of an endpoint.
        #[arg(long)]
        direct: bool,
    },

    /// Show the gallery, newest first (default).
    List {
        /// Print the raw store records as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Validate the banters.json store.
    Validate,

    /// Serve the generate-banter endpoint over HTTP.
    #[cfg(feature = "server")]
    Serve {
        /// Listen address (host:port).
        #[arg(long, default_value = snapbanter_pipeline::config::DEFAULT_SERVE_ADDR)]
        addr: String,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   snapbanter completions bash > ~/.local/share/bash-completion/completions/snapbanter
    ///   snapbanter completions zsh > ~/.zfunc/_snapbanter
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let data_dir = resolve_data_dir(cli.data_dir.as_deref());

    match cli.command.unwrap_or(Commands::List { json: false }) {
        Commands::Submit {
            images,
            endpoint,
            direct,
        } => {
            let generator = build_generator(endpoint.as_deref(), direct)?;
            let uploader = build_uploader()?;
            let orchestrator = Arc::new(UploadOrchestrator::open(&data_dir, uploader, generator).await);

            let mut failures = 0usize;
            let mut handles = Vec::new();
            for image in images {
                if !is_supported_format(&image) {
                    tracing::warn!("{image} does not have a recognised image extension");
                }
                let capture = image.clone();
                let inspected = tokio::task::spawn_blocking(move || inspect_capture(&capture))
                    .await
                    .context("capture inspection panicked")?;
                match inspected {
                    Ok(info) => {
                        tracing::info!(
                            "Submitting {image} ({:?}, {}x{}, {} bytes)",
                            info.format,
                            info.width,
                            info.height,
                            info.byte_len
                        );
                        handles.push((image.clone(), orchestrator.spawn_submit(image)));
                    }
                    Err(e) => {
                        eprintln!("Skipping {image}: {e}");
                        failures += 1;
                    }
                }
            }

            for (image, handle) in handles {
                match handle.await.context("submission task panicked")? {
                    Ok(banter) => print_banter(&banter),
                    Err(e) => {
                        eprintln!("{image}: {}", e.user_message());
                        tracing::debug!("{image}: {e}");
                        failures += 1;
                    }
                }
            }

            orchestrator.cache().flush().await;

            if failures > 0 {
                eprintln!("{failures} submission(s) failed");
                std::process::exit(1);
            }
        }

        Commands::List { json } => {
            let store = LocalImageStore::new(&data_dir);
            let banters = store.load_banters().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&banters)?);
            } else if banters.is_empty() {
                println!("No banters yet in {}", data_dir.display());
            } else {
                for banter in &banters {
                    print_banter(banter);
                }
            }
        }

        Commands::Validate => {
            let store = LocalImageStore::new(&data_dir);
            match store.read_banters().await {
                Ok(banters) => {
                    let pending = banters.iter().filter(|b| b.is_generating).count();
                    let failed = banters.iter().filter(|b| b.is_failed()).count();
                    println!("Valid banter store: {}", store.data_file().display());
                    println!("  Banters: {}", banters.len());
                    println!("  Still generating: {pending}");
                    println!("  Failed: {failed}");
                }
                Err(e) => {
                    eprintln!("Invalid banter store: {e}");
                    std::process::exit(1);
                }
            }
        }

        #[cfg(feature = "server")]
        Commands::Serve { addr } => {
            use snapbanter_pipeline::server::EndpointServer;

            let settings = CompletionSettings::from_env()?;
            tracing::info!("generate-banter endpoint (model: {})", settings.model);
            let generator: Arc<dyn BanterGenerator> = Arc::new(CompletionClient::new(settings)?);
            EndpointServer::new(generator).run(&addr).await?;
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "snapbanter", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn build_generator(endpoint: Option<&str>, direct: bool) -> anyhow::Result<Arc<dyn BanterGenerator>> {
    if direct {
        let settings = CompletionSettings::from_env()?;
        tracing::info!("Generating directly with {}", settings.model);
        return Ok(Arc::new(CompletionClient::new(settings)?));
    }

    let url = resolve_endpoint(endpoint).context(
        "no generate-banter endpoint configured; pass --endpoint, set SNAPBANTER_ENDPOINT, or use --direct",
    )?;
    tracing::info!("Generating via endpoint {url}");
    Ok(Arc::new(EndpointClient::new(EndpointSettings::from_env(url))?))
}

fn build_uploader() -> anyhow::Result<Arc<dyn ImageUploader>> {
    match BucketSettings::from_env() {
        Some(settings) => {
            tracing::info!("Uploading captures to {}", settings.bucket_url);
            Ok(Arc::new(BucketUploader::new(settings)?))
        }
        None => Ok(Arc::new(InlineUploader)),
    }
}

fn print_banter(banter: &Banter) {
    let status = if banter.is_generating {
        "generating"
    } else if banter.is_failed() {
        "failed"
    } else {
        "done"
    };
    println!(
        "{}  [{status}]  {}",
        banter.created_at.format("%Y-%m-%d %H:%M:%S"),
        banter.image_uri
    );
    for (index, excerpt) in banter.excerpts.iter().enumerate() {
        println!("    {}. {}", index + 1, excerpt.text);
    }
}
