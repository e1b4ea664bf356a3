//! Application configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{SheetError, SheetResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory backing the disk artifact store.
    pub store_dir: PathBuf,

    /// How long stored artifacts stay retrievable (seconds).
    pub retention_secs: u64,

    /// How often the background reaper sweeps the store (seconds).
    pub reap_interval_secs: u64,

    /// Defaults applied when a caller omits conversion parameters.
    pub defaults: ConversionDefaults,

    /// Grid inference tuning.
    pub analysis: AnalysisSettings,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default conversion parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionDefaults {
    /// Display time of every frame in milliseconds.
    pub frame_duration_ms: u32,

    /// Pixels trimmed from each side of every cell.
    pub margin: i32,
}

/// Weights of the confidence sub-scores. Only their ratios matter;
/// they are normalized before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceWeights {
    /// Weight of spacing regularity between detected separators.
    pub regularity: f64,

    /// Weight of separator darkness relative to cell interiors.
    pub depth: f64,

    /// Weight of the fraction of expected separators that were found.
    pub coverage: f64,
}

/// What the inferencer returns when no separators are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GridFallback {
    /// A single 1x1 cell covering the whole image.
    #[default]
    Single,
    /// The most square-ish common grid that divides the image size.
    SizeGuess,
}

/// Which detection strategies grid inference may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    /// Run every strategy and keep the most confident grid.
    #[default]
    Auto,
    /// Only separators darker than the cells.
    DarkLines,
    /// Only separators brighter than the cells.
    LightLines,
    /// Only periodic brightness transitions, for sheets without lines.
    Edges,
    /// Skip pixel evidence and guess the grid from the image size.
    Guess,
}

/// Tunable constants of grid inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Strategies allowed to propose a grid.
    pub mode: DetectionMode,

    /// Sub-score weights.
    pub weights: ConfidenceWeights,

    /// A profile sample is a separator candidate when it lies more than
    /// `factor * stddev` below the profile mean. Every factor is tried.
    pub spread_factors: Vec<f64>,

    /// Smallest cell size (pixels) a detected grid may produce.
    pub min_cell_size: u32,

    /// Bands wider than this fraction of the cell period are not
    /// separators of that grid.
    pub max_line_width_ratio: f64,

    /// Cell counts that explain fewer than this fraction of their expected
    /// separators are rejected.
    pub min_coverage: f64,

    /// Separators shallower than this fraction of the profile level are
    /// rejected.
    pub min_depth: f64,

    /// Allowed distance between an expected and a detected separator,
    /// as a fraction of the cell period.
    pub match_tolerance: f64,

    /// Confidence multiplier when only one axis shows separators.
    pub single_axis_factor: f64,

    /// Smallest brightness step (luminance units) counted as an edge.
    /// Every strength is tried.
    pub edge_strengths: Vec<f64>,

    /// Allowed deviation of an edge gap from the dominant period, as a
    /// fraction of that period.
    pub edge_tolerance: f64,

    /// Confidence multiplier for grids found from edges alone.
    pub edge_confidence_factor: f64,

    /// Behaviour when no separators are found.
    pub fallback: GridFallback,

    /// Confidence reported for fallback grids.
    pub fallback_confidence: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "sheetanim=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            retention_secs: 3600,
            reap_interval_secs: 600,
            defaults: ConversionDefaults::default(),
            analysis: AnalysisSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ConversionDefaults {
    fn default() -> Self {
        Self {
            frame_duration_ms: 80,
            margin: 2,
        }
    }
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            regularity: 0.35,
            depth: 0.35,
            coverage: 0.30,
        }
    }
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            mode: DetectionMode::Auto,
            weights: ConfidenceWeights::default(),
            spread_factors: vec![1.0, 1.5, 2.0, 3.0],
            min_cell_size: 8,
            max_line_width_ratio: 0.2,
            min_coverage: 0.6,
            min_depth: 0.1,
            match_tolerance: 0.1,
            single_axis_factor: 0.8,
            edge_strengths: vec![20.0, 30.0, 40.0],
            edge_tolerance: 0.2,
            edge_confidence_factor: 0.9,
            fallback: GridFallback::Single,
            fallback_confidence: 0.1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path. Missing fields take defaults.
    pub fn load_from(path: impl AsRef<Path>) -> SheetResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SheetError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            SheetError::config(format!("failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(config_file_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), std::io::Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Retention window as a duration.
    pub fn retention(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.retention_secs)
    }

    /// Reaper cadence as a duration.
    pub fn reap_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.reap_interval_secs.max(1))
    }

    fn validate(&self) -> SheetResult<()> {
        let w = &self.analysis.weights;
        if w.regularity < 0.0 || w.depth < 0.0 || w.coverage < 0.0 {
            return Err(SheetError::config("confidence weights must be non-negative"));
        }
        if w.regularity + w.depth + w.coverage <= 0.0 {
            return Err(SheetError::config("at least one confidence weight must be positive"));
        }
        if self.analysis.spread_factors.is_empty() {
            return Err(SheetError::config("analysis.spread_factors must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.analysis.min_coverage) {
            return Err(SheetError::config("analysis.min_coverage must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.analysis.fallback_confidence) {
            return Err(SheetError::config("analysis.fallback_confidence must be within [0, 1]"));
        }
        if self.defaults.margin < 0 {
            return Err(SheetError::config("defaults.margin must be non-negative"));
        }
        Ok(())
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("sheetanim").join("config.json")
}

/// Default artifact store directory.
fn default_store_dir() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("sheetanim").join("artifacts")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = AppConfig::default();
        assert_eq!(config.retention_secs, 3600);
        assert_eq!(config.reap_interval_secs, 600);
        assert_eq!(config.defaults.frame_duration_ms, 80);
        assert_eq!(config.analysis.fallback, GridFallback::Single);
        assert_eq!(config.analysis.mode, DetectionMode::Auto);
        assert_eq!(config.defaults.margin, 2);
    }

    #[test]
    fn test_detection_mode_parses_snake_case() {
        let settings: AnalysisSettings =
            serde_json::from_str(r#"{ "mode": "light_lines" }"#).unwrap();
        assert_eq!(settings.mode, DetectionMode::LightLines);
        assert_eq!(settings.edge_strengths, vec![20.0, 30.0, 40.0]);
        assert!(serde_json::from_str::<AnalysisSettings>(r#"{ "mode": "sideways" }"#).is_err());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = std::env::temp_dir().join("sheetanim_test_config_partial");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(
            &path,
            r#"{ "retention_secs": 60, "analysis": { "weights": { "depth": 1.0 } } }"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.retention_secs, 60);
        assert_eq!(config.reap_interval_secs, 600);
        assert!((config.analysis.weights.depth - 1.0).abs() < 1e-9);
        assert!((config.analysis.weights.coverage - 0.30).abs() < 1e-9);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_from_rejects_invalid_weights() {
        let dir = std::env::temp_dir().join("sheetanim_test_config_invalid");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(
            &path,
            r#"{ "analysis": { "weights": { "regularity": 0.0, "depth": 0.0, "coverage": 0.0 } } }"#,
        )
        .unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, SheetError::Config { .. }));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_and_reload() {
        let dir = std::env::temp_dir().join("sheetanim_test_config_roundtrip");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.analysis.fallback = GridFallback::SizeGuess;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.analysis.fallback, GridFallback::SizeGuess);

        std::fs::remove_dir_all(&dir).ok();
    }
}
