//! Configuration precedence: command flags > environment variables
//! (`KUBECTL_SMART_*`) > user config file
//! (`$XDG_CONFIG_HOME/kubectl-smart/config.yaml`) > defaults. The file is
//! optional and partial: every section and field is `Option`, so a config
//! naming only one value doesn't need to repeat the rest.

use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct Config {
    pub max_concurrent_collectors: usize,
    pub collector_timeout_seconds: f64,
    pub run_timeout_seconds: f64,
    pub colors_enabled: bool,
    pub max_display_issues: usize,
    pub default_format: OutputFormat,
    pub weights_file: Option<PathBuf>,
    pub default_horizon_hours: u32,
    pub cache_dir: PathBuf,
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_collectors: 5,
            collector_timeout_seconds: 1.0,
            run_timeout_seconds: 3.0,
            colors_enabled: true,
            max_display_issues: 10,
            default_format: OutputFormat::Text,
            weights_file: None,
            default_horizon_hours: 48,
            cache_dir: default_cache_dir(),
            log_level: "info".to_string(),
        }
    }
}

/// Mirrors the on-disk YAML shape; every field optional so a partial file is
/// valid and only overrides what it names.
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    performance: Option<PerformanceSection>,
    output: Option<OutputSection>,
    scoring: Option<ScoringSection>,
    forecast: Option<ForecastSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Deserialize, Default)]
struct PerformanceSection {
    max_concurrent_collectors: Option<usize>,
    collector_timeout_seconds: Option<f64>,
    run_timeout_seconds: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct OutputSection {
    colors_enabled: Option<bool>,
    max_display_issues: Option<usize>,
    default_format: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ScoringSection {
    weights_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct ForecastSection {
    default_horizon_hours: Option<u32>,
    cache_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct LoggingSection {
    level: Option<String>,
}

fn default_cache_dir() -> PathBuf {
    config_home().join("kubectl-smart").join("cache")
}

fn config_home() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return PathBuf::from(xdg);
        }
    }
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(".config"))
        .unwrap_or_else(|_| PathBuf::from(".config"))
}

pub fn default_config_file_path() -> PathBuf {
    config_home().join("kubectl-smart").join("config.yaml")
}

impl Config {
    /// Loads defaults, applies the user config file (if present and
    /// readable), then environment variables, in that order (flags are
    /// merged in by the caller, last, since only it knows which flags were
    /// explicitly passed).
    pub fn load(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = Config::default();

        let path = config_path.map(Path::to_path_buf).unwrap_or_else(default_config_file_path);
        if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            let file: FileConfig = serde_yaml::from_str(&text)?;
            cfg.apply_file(file)?;
        }

        cfg.apply_env();
        Ok(cfg)
    }

    fn apply_file(&mut self, file: FileConfig) -> anyhow::Result<()> {
        if let Some(p) = file.performance {
            if let Some(v) = p.max_concurrent_collectors {
                self.max_concurrent_collectors = v;
            }
            if let Some(v) = p.collector_timeout_seconds {
                self.collector_timeout_seconds = v;
            }
            if let Some(v) = p.run_timeout_seconds {
                self.run_timeout_seconds = v;
            }
        }
        if let Some(o) = file.output {
            if let Some(v) = o.colors_enabled {
                self.colors_enabled = v;
            }
            if let Some(v) = o.max_display_issues {
                self.max_display_issues = v;
            }
            if let Some(v) = o.default_format {
                self.default_format = parse_format(&v)?;
            }
        }
        if let Some(s) = file.scoring {
            self.weights_file = s.weights_file;
        }
        if let Some(f) = file.forecast {
            if let Some(v) = f.default_horizon_hours {
                self.default_horizon_hours = v.clamp(1, 168);
            }
            if let Some(v) = f.cache_dir {
                self.cache_dir = v;
            }
        }
        if let Some(l) = file.logging {
            if let Some(v) = l.level {
                self.log_level = v;
            }
        }
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("KUBECTL_SMART_MAX_CONCURRENT_COLLECTORS") {
            if let Ok(n) = v.parse() {
                self.max_concurrent_collectors = n;
            }
        }
        if let Ok(v) = std::env::var("KUBECTL_SMART_COLLECTOR_TIMEOUT_SECONDS") {
            if let Ok(n) = v.parse() {
                self.collector_timeout_seconds = n;
            }
        }
        if let Ok(v) = std::env::var("KUBECTL_SMART_RUN_TIMEOUT_SECONDS") {
            if let Ok(n) = v.parse() {
                self.run_timeout_seconds = n;
            }
        }
        if let Ok(v) = std::env::var("KUBECTL_SMART_COLORS_ENABLED") {
            self.colors_enabled = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Ok(v) = std::env::var("KUBECTL_SMART_DEFAULT_FORMAT") {
            if let Ok(f) = parse_format(&v) {
                self.default_format = f;
            }
        }
        if let Ok(v) = std::env::var("KUBECTL_SMART_HORIZON_HOURS") {
            if let Ok(n) = v.parse::<u32>() {
                self.default_horizon_hours = n.clamp(1, 168);
            }
        }
        if let Ok(v) = std::env::var("KUBECTL_SMART_LOG_LEVEL") {
            self.log_level = v;
        }
    }
}

fn parse_format(s: &str) -> anyhow::Result<OutputFormat> {
    match s.to_lowercase().as_str() {
        "text" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        other => Err(anyhow::anyhow!("unknown output format: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.max_concurrent_collectors, 5);
        assert_eq!(cfg.collector_timeout_seconds, 1.0);
        assert_eq!(cfg.run_timeout_seconds, 3.0);
        assert_eq!(cfg.default_horizon_hours, 48);
        assert_eq!(cfg.max_display_issues, 10);
    }

    #[test]
    fn loads_partial_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "performance:\n  max_concurrent_collectors: 8\noutput:\n  default_format: json\n").unwrap();
        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.max_concurrent_collectors, 8);
        assert_eq!(cfg.default_format, OutputFormat::Json);
        assert_eq!(cfg.run_timeout_seconds, 3.0);
    }

    #[test]
    fn horizon_hours_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "forecast:\n  default_horizon_hours: 9000\n").unwrap();
        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.default_horizon_hours, 168);
    }
}
