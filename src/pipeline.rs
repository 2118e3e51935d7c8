//! One analysis run, from a validated series to a derived quantity
//!
//! Stages run in a fixed order and each is enabled by its configuration section:
//! smoothing, peak detection, regression, then resolution of the quantity. Every intermediate is
//! returned in the [`Analysis`] so renderers never recompute anything.
use std::fmt;

use log::{debug, info};
use ndarray_linalg::{Lapack, Scalar};
use num_traits::Float;

use crate::config::{Config, RegressionInput, RepeatSource};
use crate::math::from_usize;
use crate::peaks::{find_peaks, PeakSet};
use crate::regression::{
    linear_fit, polynomial_fit_with_r_squared, PolynomialFit, RegressionResult,
};
use crate::resolve::{resolve, DerivedQuantity, Evidence, PhysicalFormula, UncertaintyRule};
use crate::series::Series;
use crate::spline::{smooth, SmoothedSeries};
use crate::{Error, Result};

/// A fitted model of the regressed pairs
#[derive(Clone, Debug, PartialEq)]
pub enum Fit<E> {
    Linear(RegressionResult<E>),
    Polynomial(PolynomialFit<E>),
}

impl<E: Float> Fit<E> {
    pub fn evaluate(&self, x: E) -> E {
        match self {
            Self::Linear(fit) => fit.predict(x),
            Self::Polynomial(fit) => fit.evaluate(x),
        }
    }

    pub fn r_squared(&self) -> E {
        match self {
            Self::Linear(fit) => fit.r_squared,
            Self::Polynomial(fit) => fit.r_squared,
        }
    }

    pub const fn as_linear(&self) -> Option<&RegressionResult<E>> {
        match self {
            Self::Linear(fit) => Some(fit),
            Self::Polynomial(_) => None,
        }
    }
}

/// Everything produced by [`Pipeline::run`]
#[derive(Clone, Debug)]
pub struct Analysis<E> {
    pub series: Series<E>,
    pub smoothed: Option<SmoothedSeries<E>>,
    pub peaks: Option<PeakSet<E>>,
    /// The pairs handed to the regression, when one ran
    pub regressed: Option<Series<E>>,
    pub fit: Option<Fit<E>>,
    pub quantity: DerivedQuantity<E>,
}

#[derive(Clone, Debug)]
pub struct Pipeline<E> {
    config: Config<E>,
}

impl<E> Pipeline<E>
where
    E: Float + Lapack + Scalar<Real = E> + fmt::Display,
{
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] when the configuration is inconsistent.
    pub fn new(config: Config<E>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub const fn config(&self) -> &Config<E> {
        &self.config
    }

    /// Run every configured stage over `series` and resolve the quantity through `formula`
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a stage.
    pub fn run<F: PhysicalFormula<E> + ?Sized>(
        &self,
        series: &Series<E>,
        formula: &F,
    ) -> Result<Analysis<E>> {
        info!("Analysing {} samples", series.len());

        let smoothed = match &self.config.smoothing {
            Some(smoothing) => {
                let smoothed = smooth(series, smoothing.grid_size, smoothing.boundary)?;
                debug!(
                    "Resampled onto {} grid points with {:?} boundaries",
                    smoothing.grid_size, smoothing.boundary
                );
                Some(smoothed)
            }
            None => None,
        };

        let peaks = match &self.config.peaks {
            Some(peak_config) => {
                let scanned = smoothed.as_ref().map_or(series, SmoothedSeries::grid);
                let peaks = find_peaks(scanned, &peak_config.criteria())?;
                info!("Detected {} peaks", peaks.len());
                for peak in peaks.as_slice() {
                    debug!(
                        "Peak at {} with value {} (rank {}, prominence {})",
                        peak.position, peak.value, peak.rank, peak.prominence
                    );
                }
                peaks.require(peak_config.min_count)?;
                Some(peaks)
            }
            None => None,
        };

        let (regressed, fit) = match &self.config.regression {
            Some(regression) => {
                let regressed = match regression.input {
                    RegressionInput::Series => series.clone(),
                    RegressionInput::PeakOrder => peak_order(peaks.as_ref())?,
                };
                let fit = if regression.degree == 1 {
                    let fit = linear_fit(regressed.x(), regressed.y())?;
                    info!(
                        "Linear fit: slope {}, intercept {}, r^2 {}",
                        fit.slope, fit.intercept, fit.r_squared
                    );
                    Fit::Linear(fit)
                } else {
                    let fit = polynomial_fit_with_r_squared(
                        regressed.x(),
                        regressed.y(),
                        regression.degree,
                    )?;
                    info!(
                        "Degree {} polynomial fit: r^2 {}",
                        fit.degree(),
                        fit.r_squared
                    );
                    Fit::Polynomial(fit)
                };
                (Some(regressed), Some(fit))
            }
            None => (None, None),
        };

        let quantity = match self.config.uncertainty.rule {
            UncertaintyRule::Propagated => {
                let line = fit.as_ref().and_then(Fit::as_linear).ok_or_else(|| {
                    Error::invalid_parameter("propagated uncertainty requires a linear regression")
                })?;
                resolve(Evidence::Regression(line), formula, UncertaintyRule::Propagated)?
            }
            UncertaintyRule::SampleStatistics => {
                let estimates = match self.config.uncertainty.source {
                    RepeatSource::PeakSpacings => peaks
                        .as_ref()
                        .ok_or_else(|| {
                            Error::invalid_parameter("peak spacings require peak detection")
                        })?
                        .spacings(),
                    RepeatSource::Ratios => series.ratios()?,
                };
                debug!("Resolving from {} repeated estimates", estimates.len());
                resolve(
                    Evidence::Repeats(&estimates),
                    formula,
                    UncertaintyRule::SampleStatistics,
                )?
            }
        };
        info!("Resolved {quantity}");

        Ok(Analysis {
            series: series.clone(),
            smoothed,
            peaks,
            regressed,
            fit,
            quantity,
        })
    }
}

/// Peak positions against their order number `1, 2, ...`
fn peak_order<E: Float>(peaks: Option<&PeakSet<E>>) -> Result<Series<E>> {
    let peaks =
        peaks.ok_or_else(|| Error::invalid_parameter("regressing peak order requires peaks"))?;
    let order = (1..=peaks.len())
        .map(from_usize)
        .collect::<Vec<E>>();
    Series::new(order, peaks.positions())
}
