//! Engine configuration - all decision thresholds as tunable TOML values
//!
//! Every threshold, cooldown interval, and cadence the engine consults is a
//! field here. Each struct implements `Default` with the shipped tuning, so
//! behavior is unchanged when no config file is present.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::types::DecisionCategory;

/// Configuration load/parse errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("failed to parse config file {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("config validation failed: {0}")]
    Invalid(String),
}

/// Which generation layers run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EngineMode {
    /// Local heuristics only
    #[default]
    Heuristic,
    /// Remote model replaces the heuristic for tactical decisions
    Remote,
    /// Heuristic tactical layer plus low-cadence remote strategic layer
    Hybrid,
}

impl std::fmt::Display for EngineMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineMode::Heuristic => write!(f, "heuristic"),
            EngineMode::Remote => write!(f, "remote"),
            EngineMode::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// Root engine configuration.
///
/// Load with `EngineConfig::load()` which searches:
/// 1. `$FOREMAN_CONFIG` env var
/// 2. `./foreman.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub mode: EngineMode,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub cooldowns: CooldownConfig,
    #[serde(default)]
    pub cadence: CadenceConfig,
    #[serde(default)]
    pub calibrator: CalibratorConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub savings: SavingsConfig,
    #[serde(default)]
    pub production: ProductionConfig,
}

/// Shift production targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionConfig {
    /// Units expected per shift; progress is tracked against this
    pub shift_target_units: u64,
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            shift_target_units: 600,
        }
    }
}

/// Condition-detection thresholds for the heuristic generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Temperature warning level (°C)
    pub temperature_warning_c: f64,
    /// Temperature critical level (°C)
    pub temperature_critical_c: f64,
    /// Vibration warning level (mm/s)
    pub vibration_warning_mm_s: f64,
    /// Vibration critical level (mm/s)
    pub vibration_critical_mm_s: f64,
    /// Max/min running-machine load ratio that flags imbalance
    pub load_imbalance_ratio: f64,
    /// Fill level (0-1) that flags near-capacity storage
    pub fill_level_warning: f64,
    /// Worker fatigue level (0-1) that flags a fatigue risk
    pub fatigue_warning: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            temperature_warning_c: 75.0,
            temperature_critical_c: 90.0,
            vibration_warning_mm_s: 3.5,
            vibration_critical_mm_s: 6.0,
            load_imbalance_ratio: 1.8,
            fill_level_warning: 0.85,
            fatigue_warning: 0.8,
        }
    }
}

/// Per-category cooldown intervals (simulated seconds).
///
/// Critical-priority safety decisions bypass cooldown entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CooldownConfig {
    pub safety_secs: u64,
    pub maintenance_secs: u64,
    pub assignment_secs: u64,
    pub optimization_secs: u64,
    pub prediction_secs: u64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            safety_secs: 30,
            maintenance_secs: 120,
            assignment_secs: 90,
            optimization_secs: 300,
            prediction_secs: 180,
        }
    }
}

impl CooldownConfig {
    /// Cooldown interval for a category (exhaustive dispatch table).
    pub fn interval_secs(&self, category: DecisionCategory) -> u64 {
        match category {
            DecisionCategory::Safety => self.safety_secs,
            DecisionCategory::Maintenance => self.maintenance_secs,
            DecisionCategory::Assignment => self.assignment_secs,
            DecisionCategory::Optimization => self.optimization_secs,
            DecisionCategory::Prediction => self.prediction_secs,
        }
    }
}

/// Cadences for the independent engine loops (simulated seconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CadenceConfig {
    /// Simulated seconds advanced per telemetry cycle
    pub cycle_secs: u64,
    /// Interval between remote strategic calls (hybrid mode only)
    pub strategic_interval_secs: u64,
    /// Interval between forecast recomputations
    pub forecast_interval_secs: u64,
    /// Interval between cross-machine correlation scans
    pub correlation_interval_secs: u64,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            cycle_secs: 5,
            strategic_interval_secs: 45,
            forecast_interval_secs: 20,
            correlation_interval_secs: 15,
        }
    }
}

/// Confidence calibrator tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibratorConfig {
    /// Maximum absolute adjustment (percentage points)
    pub adjustment_clamp: f64,
    /// Damping pivot: adjustment scales by n / (n + pivot)
    pub damping_pivot: f64,
}

impl Default for CalibratorConfig {
    fn default() -> Self {
        Self {
            adjustment_clamp: 10.0,
            damping_pivot: 5.0,
        }
    }
}

/// Pattern/anomaly memory tuning and metric normalization ranges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Z-score magnitude that flags an anomaly
    pub anomaly_sigma: f64,
    /// Minimum samples in a series before anomaly flagging starts
    pub anomaly_min_samples: usize,
    /// Minimum overlapping samples for a correlation test
    pub correlation_min_samples: usize,
    /// Minimum |r| to record a cross-machine pattern
    pub correlation_min_r: f64,
    /// Maximum p-value to accept a correlation as significant
    pub correlation_max_p: f64,
    /// Normalization maxima: raw metric / max → [0, 1]
    pub rpm_max: f64,
    pub temperature_max_c: f64,
    pub vibration_max_mm_s: f64,
    pub load_max: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            anomaly_sigma: 3.0,
            anomaly_min_samples: 12,
            correlation_min_samples: 30,
            correlation_min_r: 0.75,
            correlation_max_p: 0.05,
            rpm_max: 3000.0,
            temperature_max_c: 120.0,
            vibration_max_mm_s: 10.0,
            load_max: 100.0,
        }
    }
}

/// Remote model call parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Endpoint URL for the HTTP adapter
    pub endpoint: String,
    /// Deadline for one remote call (wall-clock seconds)
    pub timeout_secs: u64,
    /// Cap on the additive strategic bonus in heuristic scoring
    pub strategic_bonus_cap: f64,
    /// Score points contributed per strategic weight unit
    pub strategic_bonus_per_weight: f64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8731/v1/advise".to_string(),
            timeout_secs: 10,
            strategic_bonus_cap: 8.0,
            strategic_bonus_per_weight: 2.0,
        }
    }
}

/// Estimated savings credited per successful decision, by category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsConfig {
    pub maintenance: f64,
    pub safety: f64,
    pub optimization: f64,
    pub assignment: f64,
    pub prediction: f64,
}

impl Default for SavingsConfig {
    fn default() -> Self {
        Self {
            maintenance: 1200.0,
            safety: 2000.0,
            optimization: 800.0,
            assignment: 500.0,
            prediction: 300.0,
        }
    }
}

impl SavingsConfig {
    pub fn for_category(&self, category: DecisionCategory) -> f64 {
        match category {
            DecisionCategory::Maintenance => self.maintenance,
            DecisionCategory::Safety => self.safety,
            DecisionCategory::Optimization => self.optimization,
            DecisionCategory::Assignment => self.assignment,
            DecisionCategory::Prediction => self.prediction,
        }
    }
}

impl EngineConfig {
    /// Load configuration using the standard search order:
    /// 1. `$FOREMAN_CONFIG` environment variable
    /// 2. `./foreman.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("FOREMAN_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), mode = %config.mode, "Loaded engine config from FOREMAN_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from FOREMAN_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "FOREMAN_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("foreman.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(mode = %config.mode, "Loaded engine config from ./foreman.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./foreman.toml, using defaults");
                }
            }
        }

        info!("No foreman.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate thresholds for internal consistency:
    /// critical levels must not sit below warning levels, ratios and
    /// normalization maxima must be positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.thresholds;
        let mut errors: Vec<String> = Vec::new();

        if t.temperature_critical_c < t.temperature_warning_c {
            errors.push("thresholds.temperature: critical < warning".to_string());
        }
        if t.vibration_critical_mm_s < t.vibration_warning_mm_s {
            errors.push("thresholds.vibration: critical < warning".to_string());
        }
        if t.load_imbalance_ratio <= 1.0 {
            errors.push("thresholds.load_imbalance_ratio must be > 1.0".to_string());
        }
        if !(0.0..=1.0).contains(&t.fill_level_warning) {
            errors.push("thresholds.fill_level_warning must be within [0, 1]".to_string());
        }

        let m = &self.memory;
        if m.anomaly_sigma <= 0.0 {
            errors.push("memory.anomaly_sigma must be positive".to_string());
        }
        for (name, v) in [
            ("rpm_max", m.rpm_max),
            ("temperature_max_c", m.temperature_max_c),
            ("vibration_max_mm_s", m.vibration_max_mm_s),
            ("load_max", m.load_max),
        ] {
            if v <= 0.0 {
                errors.push(format!("memory.{name} must be positive"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_escalation_is_rejected() {
        let mut config = EngineConfig::default();
        config.thresholds.temperature_critical_c = 50.0; // below warning (75)
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_src = r#"
            mode = "hybrid"

            [thresholds]
            temperature_warning_c = 70.0
            temperature_critical_c = 85.0
            vibration_warning_mm_s = 3.0
            vibration_critical_mm_s = 5.5
            load_imbalance_ratio = 2.0
            fill_level_warning = 0.9
            fatigue_warning = 0.75
        "#;
        let config: EngineConfig = toml::from_str(toml_src).expect("parses");
        assert_eq!(config.mode, EngineMode::Hybrid);
        assert_eq!(config.thresholds.temperature_warning_c, 70.0);
        // Untouched sections keep defaults
        assert_eq!(config.cooldowns.optimization_secs, 300);
        assert_eq!(config.cadence.strategic_interval_secs, 45);
    }

    #[test]
    fn cooldown_dispatch_covers_every_category() {
        let cooldowns = CooldownConfig::default();
        for category in DecisionCategory::ALL {
            // Safety is the shortest routine interval; optimization the longest
            let secs = cooldowns.interval_secs(category);
            assert!(secs <= cooldowns.optimization_secs);
        }
    }
}
