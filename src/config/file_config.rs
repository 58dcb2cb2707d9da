use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::map::LegendScale;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub backend_url: Option<String>,
    pub request_timeout_sec: Option<u64>,
    pub data_dir: Option<String>,
    pub log_file: Option<String>,
    pub accent_color: Option<String>,
    pub legend_scale: Option<LegendScale>,
    pub auto_update: Option<bool>,

    pub default_view: Option<DefaultViewConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct DefaultViewConfig {
    pub lon: Option<f64>,
    pub lat: Option<f64>,
    pub zoom: Option<f64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r##"
backend_url = "http://maps.internal:9000"
request_timeout_sec = 10
accent_color = "#ff0000"
legend_scale = "quartiles"
auto_update = true

[default_view]
lon = -0.09
lat = 51.505
zoom = 2.0
"##
        )
        .unwrap();

        let config = FileConfig::load(file.path()).unwrap();
        assert_eq!(config.backend_url.as_deref(), Some("http://maps.internal:9000"));
        assert_eq!(config.request_timeout_sec, Some(10));
        assert_eq!(config.legend_scale, Some(LegendScale::Quartiles));
        assert_eq!(config.auto_update, Some(true));
        let view = config.default_view.unwrap();
        assert_eq!(view.lat, Some(51.505));
    }

    #[test]
    fn test_empty_config() {
        let file = NamedTempFile::new().unwrap();
        let config = FileConfig::load(file.path()).unwrap();
        assert!(config.backend_url.is_none());
        assert!(config.default_view.is_none());
    }

    #[test]
    fn test_unknown_legend_scale_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"legend_scale = "logarithmic""#).unwrap();
        assert!(FileConfig::load(file.path()).is_err());
    }
}
