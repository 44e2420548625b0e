//! Run configuration: model settings, data locations and server binding.
//!
//! Loaded with figment from `config/Config.toml` (or a path given on the
//! command line) overlaid with `VANTEDJO_`-prefixed environment variables.
//! Nested keys use `__`, e.g. `VANTEDJO_SERVER__PORT=9000`.

use crate::core::CoveragePolicy;
use crate::data::{DateFormat, SalesSource};
use crate::error::{ForecastError, Result};
use crate::evaluation::EvaluationConfig;
use crate::features::FeatureSpec;
use crate::models::{ArimaOrder, SarimaxEstimator, SeasonalOrder, TrailingAverage};
use crate::utils::MapePolicy;
use anyhow::Context;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything that shapes one forecasting run. Read-only during the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub order: ArimaOrder,
    pub seasonal_order: SeasonalOrder,
    /// Quantile of historical quantity used as the clip threshold.
    pub clip_quantile: f64,
    /// Forecasts are capped at `clip_threshold × upper_multiplier`.
    pub upper_multiplier: f64,
    /// Default number of days to forecast.
    pub horizon: usize,
    pub features: FeatureSpec,
    pub mape_policy: MapePolicy,
    /// Handling of forecast dates the calendar does not cover.
    pub coverage: CoveragePolicy,
    /// Forecaster used when the model cannot be fitted.
    pub fallback: TrailingAverage,
    pub evaluation: EvaluationConfig,
}

impl ForecastConfig {
    /// SARIMAX(0,1,1)(0,1,1,7) with a 95th-percentile clip.
    pub fn improved() -> Self {
        Self {
            order: ArimaOrder::new(0, 1, 1),
            seasonal_order: SeasonalOrder::new(0, 1, 1, 7),
            clip_quantile: 0.95,
            upper_multiplier: 1.8,
            horizon: 14,
            features: FeatureSpec::default(),
            mape_policy: MapePolicy::ExcludeZeros,
            coverage: CoveragePolicy::DeriveFromDate,
            fallback: TrailingAverage::default(),
            evaluation: EvaluationConfig::default(),
        }
    }

    /// SARIMAX(1,1,1)(1,1,1,7) with a 98th-percentile clip, as served by the dashboard.
    pub fn dashboard() -> Self {
        Self {
            order: ArimaOrder::new(1, 1, 1),
            seasonal_order: SeasonalOrder::new(1, 1, 1, 7),
            clip_quantile: 0.98,
            ..Self::improved()
        }
    }

    pub fn estimator(&self) -> SarimaxEstimator {
        SarimaxEstimator::new(self.order, self.seasonal_order)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.clip_quantile > 0.0 && self.clip_quantile <= 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "clip_quantile must be in (0, 1], got {}",
                self.clip_quantile
            )));
        }
        if !(self.upper_multiplier.is_finite() && self.upper_multiplier > 0.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "upper_multiplier must be positive, got {}",
                self.upper_multiplier
            )));
        }
        if self.horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon must be at least 1 day".into(),
            ));
        }
        if self.fallback.window == 0 {
            return Err(ForecastError::InvalidParameter(
                "fallback window must be at least 1 day".into(),
            ));
        }
        if let MapePolicy::FloorZeros(floor) = self.mape_policy {
            if !(floor.is_finite() && floor > 0.0) {
                return Err(ForecastError::InvalidParameter(format!(
                    "MAPE floor for zero actuals must be positive, got {floor}"
                )));
            }
        }
        self.features.validate()?;
        self.evaluation.validate()
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self::improved()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory that relative category paths are resolved against.
    pub dir: PathBuf,
    /// Optional calendar CSV covering history and forecast dates.
    pub calendar: Option<PathBuf>,
    pub calendar_date_format: DateFormat,
    /// Where the CLI writes forecast and evaluation CSVs.
    pub output_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            calendar: None,
            calendar_date_format: DateFormat::Iso,
            output_dir: PathBuf::from("output"),
        }
    }
}

impl DataConfig {
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.dir.join(path)
        }
    }

    pub fn calendar_path(&self) -> Option<PathBuf> {
        self.calendar.as_deref().map(|p| self.resolve(p))
    }
}

/// One product category and its sales source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    #[serde(flatten)]
    pub source: SalesSource,
}

impl CategoryConfig {
    pub fn new(name: &str, file: &str, value_column: &str) -> Self {
        Self {
            name: name.to_string(),
            source: SalesSource::new(file, value_column),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub model: ForecastConfig,
    pub categories: Vec<CategoryConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            data: DataConfig::default(),
            model: ForecastConfig::dashboard(),
            categories: vec![
                CategoryConfig::new("ayam_potong", "ts_ayam_potong_clean.csv", "Ayam_Potong"),
                CategoryConfig::new("ayam_kampung", "ts_ayam_kampung_clean.csv", "Ayam_Kampung"),
                CategoryConfig::new("ayam_tua", "ts_ayam_tua_clean.csv", "Ayam_Tua"),
            ],
        }
    }
}

impl AppConfig {
    /// Category sources with paths resolved against the data directory.
    pub fn resolved_categories(&self) -> Vec<CategoryConfig> {
        self.categories
            .iter()
            .map(|c| CategoryConfig {
                name: c.name.clone(),
                source: SalesSource {
                    path: self.data.resolve(&c.source.path),
                    ..c.source.clone()
                },
            })
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "at least one category must be configured".into(),
            ));
        }
        self.model.validate()
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub const DEFAULT_PATH: &'static str = "config/Config.toml";

    /// Loads configuration from the default path and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or the result is invalid.
    pub fn load() -> anyhow::Result<AppConfig> {
        Self::load_from(Self::DEFAULT_PATH)
    }

    /// Loads configuration by merging defaults, a TOML file and the environment.
    /// A missing file leaves the defaults in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or the result is invalid.
    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<AppConfig> {
        let path = path.as_ref();
        let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("VANTEDJO_").split("__"))
            .extract()
            .with_context(|| format!("failed to load configuration from {}", path.display()))?;

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}
