use std::path::{Path, PathBuf};
use std::time::Duration;

use crossterm::event::KeyCode;
use serde::Deserialize;
use tracing::warn;

use crate::system::collector::ProcessView;
use crate::system::rate::DEFAULT_SMOOTHING_ALPHA;
use crate::system::snapshot::SortKey;
use crate::system::supervisor::SupervisorOptions;

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub sampling: SamplingConfig,
    pub process: ProcessConfig,
    pub keybinds: KeybindsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Redraw cadence of the dashboard; independent of any collector interval.
    pub refresh_rate_ms: u64,
    pub theme: String,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            refresh_rate_ms: 250,
            theme: "dark".to_string(),
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    #[serde(alias = "cpu_interval")]
    pub cpu_interval_ms: u64,
    #[serde(alias = "memory_interval")]
    pub memory_interval_ms: u64,
    #[serde(alias = "network_interval")]
    pub network_interval_ms: u64,
    #[serde(alias = "process_interval")]
    pub process_interval_ms: u64,
    #[serde(alias = "sysinfo_interval")]
    pub sysinfo_interval_ms: u64,
    pub smoothing_alpha: f64,
    pub shutdown_timeout_ms: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfig {
            cpu_interval_ms: 1000,
            memory_interval_ms: 2000,
            network_interval_ms: 1000,
            process_interval_ms: 2500,
            sysinfo_interval_ms: 10_000,
            smoothing_alpha: DEFAULT_SMOOTHING_ALPHA,
            shutdown_timeout_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    pub default_sort: String,
    /// Rows kept per snapshot; 0 keeps every process.
    pub limit: usize,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        ProcessConfig {
            default_sort: "cpu".to_string(),
            limit: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeybindsConfig {
    pub quit: String,
    pub kill: String,
    pub force_kill: String,
    pub filter: String,
    pub cycle_sort: String,
    pub reverse_sort: String,
    pub help: String,
}

impl Default for KeybindsConfig {
    fn default() -> Self {
        KeybindsConfig {
            quit: "q".to_string(),
            kill: "k".to_string(),
            force_kill: "K".to_string(),
            filter: "/".to_string(),
            cycle_sort: "s".to_string(),
            reverse_sort: "r".to_string(),
            help: "?".to_string(),
        }
    }
}

impl Config {
    /// Replaces values no collector can run with by their defaults.
    /// Returns one message per field that was reset.
    pub fn sanitize(&mut self) -> Vec<String> {
        let defaults = SamplingConfig::default();
        let mut fixed = Vec::new();

        let intervals = [
            ("cpu_interval_ms", &mut self.sampling.cpu_interval_ms, defaults.cpu_interval_ms),
            (
                "memory_interval_ms",
                &mut self.sampling.memory_interval_ms,
                defaults.memory_interval_ms,
            ),
            (
                "network_interval_ms",
                &mut self.sampling.network_interval_ms,
                defaults.network_interval_ms,
            ),
            (
                "process_interval_ms",
                &mut self.sampling.process_interval_ms,
                defaults.process_interval_ms,
            ),
            (
                "sysinfo_interval_ms",
                &mut self.sampling.sysinfo_interval_ms,
                defaults.sysinfo_interval_ms,
            ),
            (
                "shutdown_timeout_ms",
                &mut self.sampling.shutdown_timeout_ms,
                defaults.shutdown_timeout_ms,
            ),
        ];
        for (name, value, default) in intervals {
            if *value == 0 {
                fixed.push(format!("sampling.{name} must be positive, using {default}"));
                *value = default;
            }
        }

        let alpha = self.sampling.smoothing_alpha;
        if !(alpha > 0.0 && alpha <= 1.0) {
            fixed.push(format!(
                "sampling.smoothing_alpha {alpha} outside (0, 1], using {DEFAULT_SMOOTHING_ALPHA}"
            ));
            self.sampling.smoothing_alpha = DEFAULT_SMOOTHING_ALPHA;
        }

        if self.general.refresh_rate_ms == 0 {
            let default = GeneralConfig::default().refresh_rate_ms;
            fixed.push(format!("general.refresh_rate_ms must be positive, using {default}"));
            self.general.refresh_rate_ms = default;
        }

        for message in &fixed {
            warn!("{message}");
        }
        fixed
    }

    pub fn default_sort(&self) -> SortKey {
        SortKey::from_str_config(&self.process.default_sort)
    }
}

impl From<&Config> for SupervisorOptions {
    fn from(config: &Config) -> Self {
        let s = &config.sampling;
        SupervisorOptions {
            cpu_interval: Duration::from_millis(s.cpu_interval_ms),
            memory_interval: Duration::from_millis(s.memory_interval_ms),
            network_interval: Duration::from_millis(s.network_interval_ms),
            process_interval: Duration::from_millis(s.process_interval_ms),
            host_interval: Duration::from_millis(s.sysinfo_interval_ms),
            smoothing_alpha: s.smoothing_alpha,
            shutdown_timeout: Duration::from_millis(s.shutdown_timeout_ms),
            process_view: ProcessView {
                sort: config.default_sort(),
                limit: config.process.limit,
                ..ProcessView::default()
            },
        }
    }
}

/// Parses a keybind like `q`, `K`, `/`, `Enter`, `Esc` or `Space`.
pub fn parse_key(s: &str) -> Option<KeyCode> {
    match s {
        "Enter" | "enter" => Some(KeyCode::Enter),
        "Esc" | "Escape" | "esc" => Some(KeyCode::Esc),
        "Tab" | "tab" => Some(KeyCode::Tab),
        "Backspace" | "backspace" => Some(KeyCode::Backspace),
        "Delete" | "Del" | "delete" => Some(KeyCode::Delete),
        "Space" | "space" => Some(KeyCode::Char(' ')),
        _ => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(KeyCode::Char(c)),
                _ => None,
            }
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("vitals").join("config.toml"))
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Config::default(),
    }
}

pub fn load_config_from_path(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents).unwrap_or_default(),
        Err(_) => Config::default(),
    }
}
