use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::media::Language;
use crate::stt::{RunpodUvrConfig, RunpodWhisperConfig};

/// Environment variable filling empty provider API keys
pub const API_KEY_ENV: &str = "RUNPOD_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// External tool locations
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Inference providers
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Application settings
    #[serde(default)]
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    pub yt_dlp_path: String,
    pub ffmpeg_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Runpod UVR endpoint used for background removal
    pub background_remover: Option<RunpodUvrConfig>,

    /// Runpod Whisper endpoint used for speech-to-text
    pub speech_to_text: Option<RunpodWhisperConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Maximum number of extraction calls running at once
    pub max_blocking_tasks: usize,

    /// Language requested when none is given on the command line
    pub default_language: Option<Language>,

    /// Directory for subtitle files when no output path is given
    pub output_dir: Option<PathBuf>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_blocking_tasks: 4,
            default_language: None,
            output_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from `path` or the default location.
    /// A default file is written when none exists.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        let mut config = if config_path.exists() {
            Self::from_file(&config_path)?
        } else {
            let config = Self::default();
            config.save_to(&config_path).await?;
            tracing::info!("Wrote default configuration to {}", config_path.display());
            config
        };

        config.apply_env_overrides(std::env::var(API_KEY_ENV).ok().as_deref());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse config file")
    }

    /// Save configuration to file
    pub async fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("vidscribe").join("config.yaml"))
    }

    /// Fill empty provider API keys from the environment
    fn apply_env_overrides(&mut self, api_key: Option<&str>) {
        let Some(api_key) = api_key.filter(|key| !key.trim().is_empty()) else {
            return;
        };

        if let Some(uvr) = self.providers.background_remover.as_mut() {
            if uvr.api_key.is_empty() {
                uvr.api_key = api_key.to_string();
            }
        }
        if let Some(whisper) = self.providers.speech_to_text.as_mut() {
            if whisper.api_key.is_empty() {
                whisper.api_key = api_key.to_string();
            }
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.app.max_blocking_tasks == 0 {
            anyhow::bail!("app.max_blocking_tasks must be at least 1");
        }

        if self.tools.yt_dlp_path.trim().is_empty() || self.tools.ffmpeg_path.trim().is_empty() {
            anyhow::bail!("tools.yt_dlp_path and tools.ffmpeg_path must not be empty");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  yt-dlp: {}", self.tools.yt_dlp_path);
        println!("  ffmpeg: {}", self.tools.ffmpeg_path);
        println!("  Max Blocking Tasks: {}", self.app.max_blocking_tasks);
        if let Some(lang) = self.app.default_language {
            println!("  Default Language: {}", lang);
        }
        if let Some(dir) = &self.app.output_dir {
            println!("  Output Directory: {}", dir.display());
        }
        match &self.providers.background_remover {
            Some(uvr) => println!("  Background Remover: {}", uvr.endpoint),
            None => println!("  Background Remover: not configured"),
        }
        match &self.providers.speech_to_text {
            Some(whisper) => println!("  Speech-to-Text: {} ({})", whisper.endpoint, whisper.model),
            None => println!("  Speech-to-Text: not configured"),
        }
    }
}
