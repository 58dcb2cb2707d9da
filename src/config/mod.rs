mod file_config;

pub use file_config::{DefaultViewConfig, FileConfig};

use crate::color::Rgb;
use crate::map::{HomeView, LegendScale};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";
pub const DEFAULT_TIMEOUT_SEC: u64 = 30;
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_LOG_FILE: &str = "trendmap.log";
pub const DEFAULT_ACCENT: &str = "#1DB954";

/// CLI arguments that can be used for config resolution.
/// Unset fields fall through to the TOML file, then to defaults.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub backend_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub auto_update: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend_url: String,
    pub request_timeout: Duration,
    pub data_dir: PathBuf,
    pub log_file: PathBuf,
    pub accent: Rgb,
    pub legend_scale: LegendScale,
    /// Render as soon as the selection becomes queryable instead of waiting
    /// for the update action
    pub auto_update: bool,
    pub home: HomeView,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SEC),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            accent: Rgb::new(0x1d, 0xb9, 0x54),
            legend_scale: LegendScale::default(),
            auto_update: false,
            home: HomeView::default(),
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// CLI values win where given.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();
        let defaults = AppConfig::default();

        let backend_url = cli
            .backend_url
            .clone()
            .or(file.backend_url)
            .unwrap_or(defaults.backend_url);
        if !backend_url.starts_with("http://") && !backend_url.starts_with("https://") {
            anyhow::bail!("backend_url must be an http(s) URL, got {:?}", backend_url);
        }

        let request_timeout = file
            .request_timeout_sec
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let data_dir = cli
            .data_dir
            .clone()
            .or_else(|| file.data_dir.map(PathBuf::from))
            .unwrap_or(defaults.data_dir);

        let log_file = cli
            .log_file
            .clone()
            .or_else(|| file.log_file.map(PathBuf::from))
            .unwrap_or(defaults.log_file);

        let accent = match file.accent_color {
            Some(hex) => hex.parse().context("Invalid accent_color")?,
            None => DEFAULT_ACCENT.parse().context("Invalid default accent")?,
        };

        let view = file.default_view.unwrap_or_default();
        let home = HomeView {
            lon: view.lon.unwrap_or(defaults.home.lon),
            lat: view.lat.unwrap_or(defaults.home.lat),
            zoom: view.zoom.unwrap_or(defaults.home.zoom),
        };

        Ok(Self {
            backend_url,
            request_timeout,
            data_dir,
            log_file,
            accent,
            legend_scale: file.legend_scale.unwrap_or(defaults.legend_scale),
            auto_update: cli.auto_update || file.auto_update.unwrap_or(defaults.auto_update),
            home,
        })
    }
}
