use std::path::Path;

use serde::{Deserialize, Serialize};

const DEFAULT_BIND: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3400;
const DEFAULT_WIDTH: u32 = 500;
const DEFAULT_HEIGHT: u32 = 300;
const MAX_DIMENSION: u32 = 3000;
const FETCH_TIMEOUT_SECS: u64 = 10;
const MEASURE_CACHE_CAPACITY: usize = 4096;

const FONT_FAMILY: &str = "sans-serif";
const FONT_SIZE: f32 = 12.0;
const TEXT_COLOR: &str = "#666666";
const GRID_COLOR: &str = "#e6e6e6";
const ERROR_FONT_SIZE: f32 = 30.0;
const ERROR_PADDING: f32 = 10.0;
const ERROR_BACKGROUND: &str = "#ffffff";
const ERROR_TEXT_COLOR: &str = "#000000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_width")]
    pub default_width: u32,
    #[serde(default = "default_height")]
    pub default_height: u32,
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,

    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_measure_cache_capacity")]
    pub measure_cache_capacity: usize,

    #[serde(default)]
    pub style: ChartStyle,
}

/// Look of everything the rasterizer draws around the data itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartStyle {
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default = "default_text_color")]
    pub text_color: String,
    #[serde(default = "default_grid_color")]
    pub grid_color: String,

    #[serde(default = "default_error_font_size")]
    pub error_font_size: f32,
    #[serde(default = "default_error_padding")]
    pub error_padding: f32,
    #[serde(default = "default_error_background")]
    pub error_background: String,
    #[serde(default = "default_error_text_color")]
    pub error_text_color: String,
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_width() -> u32 {
    DEFAULT_WIDTH
}
fn default_height() -> u32 {
    DEFAULT_HEIGHT
}
fn default_max_dimension() -> u32 {
    MAX_DIMENSION
}
fn default_fetch_timeout_secs() -> u64 {
    FETCH_TIMEOUT_SECS
}
fn default_measure_cache_capacity() -> usize {
    MEASURE_CACHE_CAPACITY
}
fn default_font_family() -> String {
    FONT_FAMILY.to_string()
}
fn default_font_size() -> f32 {
    FONT_SIZE
}
fn default_text_color() -> String {
    TEXT_COLOR.to_string()
}
fn default_grid_color() -> String {
    GRID_COLOR.to_string()
}
fn default_error_font_size() -> f32 {
    ERROR_FONT_SIZE
}
fn default_error_padding() -> f32 {
    ERROR_PADDING
}
fn default_error_background() -> String {
    ERROR_BACKGROUND.to_string()
}
fn default_error_text_color() -> String {
    ERROR_TEXT_COLOR.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: DEFAULT_PORT,
            default_width: DEFAULT_WIDTH,
            default_height: DEFAULT_HEIGHT,
            max_dimension: MAX_DIMENSION,
            fetch_timeout_secs: FETCH_TIMEOUT_SECS,
            measure_cache_capacity: MEASURE_CACHE_CAPACITY,
            style: ChartStyle::default(),
        }
    }
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            font_family: default_font_family(),
            font_size: FONT_SIZE,
            text_color: default_text_color(),
            grid_color: default_grid_color(),
            error_font_size: ERROR_FONT_SIZE,
            error_padding: ERROR_PADDING,
            error_background: default_error_background(),
            error_text_color: default_error_text_color(),
        }
    }
}

impl ServerConfig {
    /// Read a config file, trying TOML first and then YAML.
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.is_file() {
            return Err(format!("Config file not found: {}", path.display()));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        if let Ok(config) = Self::from_toml(&content) {
            Ok(config)
        } else if let Ok(config) = Self::from_yaml(&content) {
            Ok(config)
        } else {
            Err("Failed to parse config file as TOML or YAML".to_string())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse TOML config: {}", e))
    }

    pub fn from_yaml(content: &str) -> Result<Self, String> {
        serde_yaml::from_str(content).map_err(|e| format!("Failed to parse YAML config: {}", e))
    }

    /// `PORT` from the environment beats the file.
    pub fn with_env_port(mut self, port: Option<&str>) -> Result<Self, String> {
        if let Some(raw) = port {
            self.port = raw
                .trim()
                .parse()
                .map_err(|_| format!("Invalid PORT value: {}", raw))?;
        }
        Ok(self)
    }

    pub fn default_size(&self) -> (u32, u32) {
        (self.default_width, self.default_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ServerConfig::from_toml(
            r#"
port = 8080

[style]
font_size = 14.0
"#,
        )
        .expect("toml config");
        assert_eq!(config.port, 8080);
        assert_eq!(config.default_size(), (500, 300));
        assert_eq!(config.style.font_size, 14.0);
        assert_eq!(config.style.grid_color, GRID_COLOR);
    }

    #[test]
    fn yaml_is_accepted() {
        let config = ServerConfig::from_yaml("max_dimension: 1000\nfetch_timeout_secs: 3\n")
            .expect("yaml config");
        assert_eq!(config.max_dimension, 1000);
        assert_eq!(config.fetch_timeout_secs, 3);
        assert_eq!(config.bind, "0.0.0.0");
    }

    #[test]
    fn env_port_overrides() {
        let config = ServerConfig::default().with_env_port(Some("9000")).unwrap();
        assert_eq!(config.port, 9000);
        assert!(ServerConfig::default().with_env_port(Some("http")).is_err());
    }
}
