//! Configuration file management for the GDL90 decoder.
//!
//! Reads/writes `~/.gdl90/config.yaml` with listener address, output format,
//! and decoder options. The decoder itself only sees `DecoderConfig`; the
//! output section is for the rendering layer.

use std::path::PathBuf;

use serde::Serialize;

use crate::frame::{DEFAULT_MAX_FRAME_LEN, LONGEST_FRAME_LEN};
use crate::types::Gdl90Error;

/// Full configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub listener: ListenerConfig,
    pub output: OutputConfig,
    pub decoder: DecoderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListenerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Also print the raw frame bytes.
    pub hex: bool,
}

/// How decoded messages are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(val: &str) -> Option<Self> {
        match val.to_ascii_lowercase().as_str() {
            "text" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
        }
    }
}

/// Options consumed by the frame extractor, validator and dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecoderConfig {
    /// Drop frames whose CRC does not match.
    pub verify_checksum: bool,
    /// Return fields of messages whose embedded validation failed.
    pub best_effort: bool,
    pub max_frame_len: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            verify_checksum: true,
            best_effort: false,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listener: ListenerConfig {
                host: "0.0.0.0".into(),
                port: 4000,
            },
            output: OutputConfig {
                format: OutputFormat::Text,
                hex: false,
            },
            decoder: DecoderConfig::default(),
        }
    }
}

/// Get the config directory path (`~/.gdl90/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".gdl90")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from `~/.gdl90/config.yaml`.
///
/// Returns default config if file doesn't exist.
pub fn load_config() -> Config {
    load_config_from(&config_file())
}

/// Load config from an explicit path, falling back to defaults.
pub fn load_config_from(path: &std::path::Path) -> Config {
    if !path.exists() {
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(text) => parse_config(&text),
        Err(_) => Config::default(),
    }
}

/// Save config to `~/.gdl90/config.yaml`.
pub fn save_config(config: &Config) -> Result<PathBuf, Gdl90Error> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir).map_err(|e| Gdl90Error::Config(e.to_string()))?;
    let path = config_file();
    save_config_to(config, &path)?;
    Ok(path)
}

pub fn save_config_to(config: &Config, path: &std::path::Path) -> Result<(), Gdl90Error> {
    let text = serialize_config(config);
    std::fs::write(path, text).map_err(|e| Gdl90Error::Config(e.to_string()))
}

/// Parse simple YAML-like config text. Unknown keys are ignored.
pub fn parse_config(text: &str) -> Config {
    let mut config = Config::default();
    let mut current_section: Option<String> = None;

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        let is_indented = line.starts_with("  ") || line.starts_with('\t');

        let Some((key, val)) = stripped.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let val = strip_comment(val.trim());

        if !is_indented {
            current_section = if val.is_empty() {
                Some(key.to_string())
            } else {
                None
            };
            continue;
        }

        match (current_section.as_deref(), key) {
            (Some("listener"), "host") => {
                if let Some(v) = parse_string_value(val) {
                    config.listener.host = v;
                }
            }
            (Some("listener"), "port") => {
                if let Ok(v) = val.parse::<u16>() {
                    config.listener.port = v;
                }
            }
            (Some("output"), "format") => {
                if let Some(f) = parse_string_value(val).and_then(|v| OutputFormat::parse(&v)) {
                    config.output.format = f;
                }
            }
            (Some("output"), "hex") => {
                if let Some(v) = parse_bool_value(val) {
                    config.output.hex = v;
                }
            }
            (Some("decoder"), "verify_checksum") => {
                if let Some(v) = parse_bool_value(val) {
                    config.decoder.verify_checksum = v;
                }
            }
            (Some("decoder"), "best_effort") => {
                if let Some(v) = parse_bool_value(val) {
                    config.decoder.best_effort = v;
                }
            }
            (Some("decoder"), "max_frame_len") => {
                if let Ok(v) = val.parse::<usize>() {
                    config.decoder.max_frame_len = v.max(LONGEST_FRAME_LEN);
                }
            }
            _ => {}
        }
    }

    config
}

fn strip_comment(val: &str) -> &str {
    // A quoted value ends at its closing quote; anything after is comment.
    if let Some(quote) = val.chars().next().filter(|c| *c == '"' || *c == '\'') {
        if let Some(close) = val[1..].find(quote) {
            return &val[..close + 2];
        }
        return val;
    }
    match val.find(" #") {
        Some(i) => val[..i].trim_end(),
        None => val,
    }
}

fn parse_string_value(val: &str) -> Option<String> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    // Strip quotes
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return Some(val[1..val.len() - 1].to_string());
    }
    Some(val.to_string())
}

fn parse_bool_value(val: &str) -> Option<bool> {
    match val.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => Some(true),
        "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Serialize config to YAML-like text.
pub fn serialize_config(config: &Config) -> String {
    let mut lines = vec!["# gdl90 decoder configuration".to_string(), String::new()];

    lines.push("listener:".into());
    lines.push(format!("  host: \"{}\"", config.listener.host));
    lines.push(format!("  port: {}", config.listener.port));
    lines.push(String::new());

    lines.push("output:".into());
    lines.push(format!("  format: \"{}\"", config.output.format.as_str()));
    lines.push(format!("  hex: {}", config.output.hex));
    lines.push(String::new());

    lines.push("decoder:".into());
    lines.push(format!(
        "  verify_checksum: {}",
        config.decoder.verify_checksum
    ));
    lines.push(format!("  best_effort: {}", config.decoder.best_effort));
    lines.push(format!("  max_frame_len: {}", config.decoder.max_frame_len));

    lines.join("\n") + "\n"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.listener.port, 4000);
        assert_eq!(config.output.format, OutputFormat::Text);
        assert!(config.decoder.verify_checksum);
        assert!(!config.decoder.best_effort);
    }

    #[test]
    fn test_parse_config() {
        let text = r#"
listener:
  host: "127.0.0.1"
  port: 4001

output:
  format: "json"   # text | json
  hex: true

decoder:
  verify_checksum: false
  best_effort: yes
  max_frame_len: 512
"#;
        let config = parse_config(text);
        assert_eq!(config.listener.host, "127.0.0.1");
        assert_eq!(config.listener.port, 4001);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.hex);
        assert!(!config.decoder.verify_checksum);
        assert!(config.decoder.best_effort);
        assert_eq!(config.decoder.max_frame_len, 512);
    }

    #[test]
    fn test_quoted_values_with_trailing_comments() {
        let text = "listener:\n  host: \"127.0.0.1\"  # lan\noutput:\n  format: 'json'   # text | json\n";
        let config = parse_config(text);
        assert_eq!(config.listener.host, "127.0.0.1");
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_quoted_value_keeps_hash() {
        let config = parse_config("listener:\n  host: \"a#b\" # note\n");
        assert_eq!(config.listener.host, "a#b");
    }

    #[test]
    fn test_unquoted_value_with_comment() {
        let config = parse_config("listener:\n  host: 10.0.0.1 # lan\n  port: 4001 # gdl90\n");
        assert_eq!(config.listener.host, "10.0.0.1");
        assert_eq!(config.listener.port, 4001);
    }

    #[test]
    fn test_max_frame_len_floor() {
        let config = parse_config("decoder:\n  max_frame_len: 0\n");
        assert_eq!(config.decoder.max_frame_len, LONGEST_FRAME_LEN);
    }

    #[test]
    fn test_parse_config_bad_values_keep_defaults() {
        let text = r#"
listener:
  port: not-a-port
output:
  format: xml
decoder:
  verify_checksum: maybe
"#;
        let config = parse_config(text);
        assert_eq!(config.listener.port, 4000);
        assert_eq!(config.output.format, OutputFormat::Text);
        assert!(config.decoder.verify_checksum);
    }

    #[test]
    fn test_roundtrip() {
        let config = Config {
            listener: ListenerConfig {
                host: "10.0.0.2".into(),
                port: 43211,
            },
            output: OutputConfig {
                format: OutputFormat::Json,
                hex: true,
            },
            decoder: DecoderConfig {
                verify_checksum: false,
                best_effort: true,
                max_frame_len: 600,
            },
        };
        let text = serialize_config(&config);
        assert_eq!(parse_config(&text), config);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut config = Config::default();
        config.listener.port = 5000;
        save_config_to(&config, &path).unwrap();
        assert_eq!(load_config_from(&path).listener.port, 5000);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.yaml"));
        assert_eq!(config, Config::default());
    }
}
