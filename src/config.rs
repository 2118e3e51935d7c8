use std::fs;
use std::path::Path;

use num_traits::Float;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::peaks::PeakCriteria;
use crate::resolve::{Scaled, UncertaintyRule};
use crate::spline::{Boundary, DEFAULT_GRID_SIZE};
use crate::{Error, Result};

/// Options of a single analysis run, usually read from a TOML file
///
/// ```toml
/// [table]
/// x_column = "U"
/// y_column = "I"
///
/// [smoothing]
/// grid_size = 2000
///
/// [peaks]
/// prominence = 50.0
/// min_height = 560.0
/// min_count = 2
///
/// [uncertainty]
/// rule = "sample-statistics"
/// source = "peak-spacings"
///
/// [quantity]
/// factor = 1.0
/// unit = "V"
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Config<E> {
    pub table: TableConfig,
    pub smoothing: Option<SmoothingConfig>,
    pub peaks: Option<PeakConfig<E>>,
    pub regression: Option<RegressionConfig>,
    #[serde(default)]
    pub uncertainty: UncertaintyConfig,
    pub quantity: QuantityConfig<E>,
}

/// Columns of the input table forming the analysed series
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct TableConfig {
    pub x_column: String,
    pub y_column: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct SmoothingConfig {
    #[serde(default = "default_grid_size")]
    pub grid_size: usize,
    #[serde(default)]
    pub boundary: Boundary,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            boundary: Boundary::default(),
        }
    }
}

const fn default_grid_size() -> usize {
    DEFAULT_GRID_SIZE
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct PeakConfig<E> {
    pub prominence: E,
    pub min_height: Option<E>,
    /// Fewer detected peaks than this aborts the run
    #[serde(default)]
    pub min_count: usize,
}

impl<E: Float> PeakConfig<E> {
    pub fn criteria(&self) -> PeakCriteria<E> {
        PeakCriteria::new(self.prominence, self.min_height)
    }
}

/// Which pairs are regressed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegressionInput {
    /// The measured series itself
    #[default]
    Series,
    /// Peak positions against their order number `1, 2, ...`
    PeakOrder,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct RegressionConfig {
    #[serde(default = "default_degree")]
    pub degree: usize,
    #[serde(default)]
    pub input: RegressionInput,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            degree: default_degree(),
            input: RegressionInput::default(),
        }
    }
}

const fn default_degree() -> usize {
    1
}

/// Where repeated estimates come from under [`UncertaintyRule::SampleStatistics`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepeatSource {
    /// Distances between successive detected peaks
    #[default]
    PeakSpacings,
    /// Row-wise `y / x` of the measured series
    Ratios,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct UncertaintyConfig {
    #[serde(default)]
    pub rule: UncertaintyRule,
    #[serde(default)]
    pub source: RepeatSource,
}

/// The proportionality between the fitted slope (or each estimate) and the reported quantity
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuantityConfig<E> {
    pub factor: E,
    pub unit: String,
    /// Title of the generated report
    pub label: Option<String>,
}

impl<E: Float> QuantityConfig<E> {
    pub fn formula(&self) -> Scaled<E> {
        Scaled::new(self.factor, self.unit.clone())
    }
}

impl<E: DeserializeOwned> Config<E> {
    /// Read a configuration from a TOML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a valid configuration.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }
}

impl<E: Float> Config<E> {
    /// Check option values and that every stage the uncertainty rule relies on is enabled
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] describing the first inconsistency.
    pub fn validate(&self) -> Result<()> {
        if let Some(smoothing) = &self.smoothing {
            if smoothing.grid_size < 2 {
                return Err(Error::invalid_parameter(format!(
                    "smoothing grid size must be at least 2, got {}",
                    smoothing.grid_size
                )));
            }
        }
        if let Some(peaks) = &self.peaks {
            if !peaks.prominence.is_finite() || peaks.prominence < E::zero() {
                return Err(Error::invalid_parameter(
                    "peak prominence must be finite and non-negative",
                ));
            }
        }
        if let Some(regression) = &self.regression {
            if regression.degree == 0 {
                return Err(Error::invalid_parameter(
                    "regression degree must be at least 1",
                ));
            }
            if regression.input == RegressionInput::PeakOrder && self.peaks.is_none() {
                return Err(Error::invalid_parameter(
                    "regressing peak order requires a [peaks] section",
                ));
            }
        }
        match self.uncertainty.rule {
            UncertaintyRule::Propagated => {
                if self.regression.map_or(true, |regression| regression.degree != 1) {
                    return Err(Error::invalid_parameter(
                        "propagated uncertainty requires a linear regression",
                    ));
                }
            }
            UncertaintyRule::SampleStatistics => {
                if self.uncertainty.source == RepeatSource::PeakSpacings && self.peaks.is_none() {
                    return Err(Error::invalid_parameter(
                        "peak spacings require a [peaks] section",
                    ));
                }
            }
        }
        if !self.quantity.factor.is_finite() {
            return Err(Error::invalid_parameter("quantity factor must be finite"));
        }
        Ok(())
    }
}
