use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::media::Language;

#[derive(Parser)]
#[command(
    name = "vidscribe",
    about = "Ingest videos and turn them into subtitles, from platform captions or speech-to-text",
    version,
    long_about = "Resolves video URLs to a platform identity, ingests video metadata once \
                  per video, fetches platform subtitles, or transcribes the audio track \
                  through remote background-removal and speech-to-text providers."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (defaults to ./config.yaml, then the user config directory)
    #[arg(long, global = true, env = "VIDSCRIBE_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest video metadata, once per video
    Ingest {
        /// Video URLs; several URLs of the same video produce one record
        #[arg(value_name = "URL", required = true)]
        urls: Vec<String>,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch the subtitles published on the video platform
    Subtitle {
        #[arg(value_name = "URL")]
        url: String,

        /// Subtitle language (en, ja, ko); first available when not specified
        #[arg(short, long, value_name = "LANG")]
        language: Option<Language>,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Transcribe the audio track with the configured providers
    Transcribe {
        #[arg(value_name = "URL")]
        url: String,

        /// Spoken language (en, ja, ko); auto-detected when not specified
        #[arg(short, long, value_name = "LANG")]
        language: Option<Language>,

        /// Initial prompt for the recognizer, e.g. names and vocabulary
        #[arg(long, value_name = "TEXT")]
        prompt: Option<String>,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show configuration
    Config {
        /// Print the current configuration values
        #[arg(short, long)]
        show: bool,
    },

    /// List supported platforms
    Platforms,
}
