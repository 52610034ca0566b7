use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vidscribe::cli::{Cli, Commands};
use vidscribe::config::Config;
use vidscribe::extractors::{resolve_video_url, Platform};
use vidscribe::media::Transcription;
use vidscribe::stt::TranscribeOptions;
use vidscribe::{output, utils, App};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose { "vidscribe=debug" } else { "vidscribe=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {:#}", err);
        let code = err
            .downcast_ref::<vidscribe::Error>()
            .map(vidscribe::Error::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let Cli {
        command,
        quiet,
        config: config_path,
        ..
    } = cli;

    let config = Config::load(config_path.as_deref()).await?;

    // Missing tools only matter for the commands that use them
    let missing_deps = utils::check_dependencies(&config.tools).await;
    if !missing_deps.is_empty() {
        eprintln!("⚠️  Dependency check warnings:");
        for dep in missing_deps {
            eprintln!("   • {}", dep);
        }
    }

    let app = App::new(config);

    match command {
        Commands::Ingest { urls, json } => {
            let mut records = Vec::new();
            let mut first_error = None;

            for url in &urls {
                match app.ingest(url).await {
                    Ok(record) => records.push(record),
                    Err(err) => {
                        tracing::warn!("Failed to ingest {}: {}", url, err);
                        first_error.get_or_insert(err);
                    }
                }
            }

            if json {
                println!("{}", output::format_records_json(&records)?);
            } else {
                for record in &records {
                    println!("{}", output::format_record(record));
                }
            }

            if let Some(err) = first_error {
                return Err(err.into());
            }
        }
        Commands::Subtitle {
            url,
            language,
            output,
        } => {
            let progress = spinner(quiet, "Fetching subtitles...");
            let result = app.fetch_subtitle(&url, language).await;
            progress.finish_and_clear();

            let transcription = result?;
            write_transcription(&app, &url, &transcription, output).await?;
        }
        Commands::Transcribe {
            url,
            language,
            prompt,
            output,
        } => {
            // Fail on incomplete provider configuration before downloading anything
            let pipeline = app.transcribe_pipeline()?;

            tracing::info!("Starting transcription for URL: {}", url);

            let progress = spinner(quiet, "Downloading audio and transcribing...");
            let result = app
                .transcribe(&pipeline, &url, TranscribeOptions { language, prompt })
                .await;
            progress.finish_and_clear();

            let transcription = result?;
            write_transcription(&app, &url, &transcription, output).await?;
        }
        Commands::Config { show } => {
            if show {
                app.config().display();
            } else {
                let path = match config_path {
                    Some(path) => path,
                    None => Config::config_path()?,
                };
                println!("Configuration file: {}", path.display());
                println!("Edit it to set provider endpoints, or run `vidscribe config --show`.");
            }
        }
        Commands::Platforms => {
            println!("Supported platforms:");
            for platform in Platform::ALL {
                println!("  • {} ({})", platform.platform_name(), platform.hosts().join(", "));
            }
        }
    }

    Ok(())
}

/// Write to `output`, else to the configured output directory, else to the console
async fn write_transcription(
    app: &App,
    url: &str,
    transcription: &Transcription,
    output: Option<PathBuf>,
) -> Result<()> {
    let path = match (output, app.config().app.output_dir.as_deref()) {
        (Some(path), _) => path,
        (None, Some(dir)) => default_path(dir, url, transcription)?,
        (None, None) => {
            output::print_to_console(transcription);
            return Ok(());
        }
    };

    output::save_to_file(transcription, &path).await?;
    println!("Subtitles saved to: {}", path.display());
    Ok(())
}

fn default_path(dir: &Path, url: &str, transcription: &Transcription) -> Result<PathBuf> {
    let identity = resolve_video_url(url).map_err(vidscribe::Error::from)?;
    Ok(output::default_output_path(dir, &identity.native_id, transcription))
}

fn spinner(quiet: bool, message: &'static str) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new_spinner();
    if let Ok(style) =
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
    {
        progress.set_style(style);
    }
    progress.set_message(message);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}
