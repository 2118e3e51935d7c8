//! Mapping fit parameters or repeated estimates onto a physical result with an uncertainty
use std::fmt;

use num_traits::Float;
use serde::{Deserialize, Serialize};

use crate::math::{from_usize, mean, sample_standard_deviation};
use crate::regression::RegressionResult;
use crate::{Error, Result};

/// A physical result, `value ± uncertainty` in `unit`
#[derive(Clone, Debug, PartialEq)]
pub struct DerivedQuantity<E> {
    value: E,
    uncertainty: E,
    unit: String,
}

impl<E: Copy> DerivedQuantity<E> {
    pub const fn value(&self) -> E {
        self.value
    }

    pub const fn uncertainty(&self) -> E {
        self.uncertainty
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }
}

impl<E: fmt::Display> fmt::Display for DerivedQuantity<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match f.precision() {
            Some(precision) => write!(
                f,
                "({:.*} ± {:.*}) {}",
                precision, self.value, precision, self.uncertainty, self.unit
            ),
            None => write!(f, "({} ± {}) {}", self.value, self.uncertainty, self.unit),
        }
    }
}

/// The experiment-specific formula turning measured parameters into the quantity of interest
///
/// Pipelines are parametrised by an implementation of this trait rather than duplicated per
/// experiment.
pub trait PhysicalFormula<E: Float> {
    fn unit(&self) -> &str;

    /// The quantity implied by a fitted line
    fn from_line(&self, slope: E, intercept: E) -> E;

    /// The quantity implied by one repeated estimate, such as a single peak spacing
    fn from_estimate(&self, estimate: E) -> E {
        estimate
    }

    /// $\partial f / \partial \text{slope}$, by default a central finite difference
    ///
    /// The step is relative to the slope, which may be far from unity (`h / e` is about
    /// `4e-15 V s`).
    fn slope_sensitivity(&self, slope: E, intercept: E) -> E {
        let two = E::one() + E::one();
        let step = if slope == E::zero() {
            E::epsilon().cbrt()
        } else {
            E::epsilon().cbrt() * slope.abs()
        };
        (self.from_line(slope + step, intercept) - self.from_line(slope - step, intercept))
            / (two * step)
    }
}

/// The quantity is proportional to the slope, or to each repeated estimate
///
/// Covers `h = k e` for the photoelectric effect, `alpha = k / R_0` for the bridge, and the
/// identity for an excitation potential read straight off peak spacings.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Scaled<E> {
    pub factor: E,
    pub unit: String,
}

impl<E> Scaled<E> {
    pub fn new<S: Into<String>>(factor: E, unit: S) -> Self {
        Self {
            factor,
            unit: unit.into(),
        }
    }
}

impl<E: Float> PhysicalFormula<E> for Scaled<E> {
    fn unit(&self) -> &str {
        &self.unit
    }

    fn from_line(&self, slope: E, _intercept: E) -> E {
        self.factor * slope
    }

    fn from_estimate(&self, estimate: E) -> E {
        self.factor * estimate
    }

    fn slope_sensitivity(&self, _slope: E, _intercept: E) -> E {
        self.factor
    }
}

/// An arbitrary closure of `(slope, intercept)`, differentiated numerically
pub struct LineFormula<F> {
    unit: String,
    formula: F,
}

impl<F> LineFormula<F> {
    pub fn new<S: Into<String>>(unit: S, formula: F) -> Self {
        Self {
            unit: unit.into(),
            formula,
        }
    }
}

impl<E: Float, F: Fn(E, E) -> E> PhysicalFormula<E> for LineFormula<F> {
    fn unit(&self) -> &str {
        &self.unit
    }

    fn from_line(&self, slope: E, intercept: E) -> E {
        (self.formula)(slope, intercept)
    }
}

/// How the uncertainty of the result is obtained
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UncertaintyRule {
    /// First-order propagation of the slope standard error through the formula
    #[default]
    Propagated,
    /// Standard error of the mean over repeated independent estimates
    SampleStatistics,
}

/// What the result is resolved from
#[derive(Clone, Copy, Debug)]
pub enum Evidence<'a, E> {
    Regression(&'a RegressionResult<E>),
    Repeats(&'a [E]),
}

/// Resolve `evidence` into a [`DerivedQuantity`] through `formula`
///
/// # Errors
///
/// - [`Error::InvalidParameter`] when `rule` does not apply to the kind of evidence given
/// - [`Error::InsufficientSamples`] with fewer than two repeated estimates
/// - [`Error::NonFiniteResult`] when the formula yields NaN or infinity
pub fn resolve<E: Float, F: PhysicalFormula<E> + ?Sized>(
    evidence: Evidence<'_, E>,
    formula: &F,
    rule: UncertaintyRule,
) -> Result<DerivedQuantity<E>> {
    let (value, uncertainty) = match (rule, evidence) {
        (UncertaintyRule::Propagated, Evidence::Regression(fit)) => {
            let value = formula.from_line(fit.slope, fit.intercept);
            let sensitivity = formula.slope_sensitivity(fit.slope, fit.intercept);
            (value, sensitivity.abs() * fit.std_err)
        }
        (UncertaintyRule::SampleStatistics, Evidence::Repeats(estimates)) => {
            if estimates.len() < 2 {
                return Err(Error::InsufficientSamples {
                    required: 2,
                    found: estimates.len(),
                });
            }
            let values: Vec<E> = estimates
                .iter()
                .map(|&estimate| formula.from_estimate(estimate))
                .collect();
            match (mean(&values), sample_standard_deviation(&values)) {
                (Some(mean), Some(deviation)) => {
                    (mean, deviation / from_usize::<E>(values.len()).sqrt())
                }
                _ => {
                    return Err(Error::InsufficientSamples {
                        required: 2,
                        found: values.len(),
                    })
                }
            }
        }
        (UncertaintyRule::Propagated, Evidence::Repeats(_)) => {
            return Err(Error::invalid_parameter(
                "propagated uncertainty requires a regression result",
            ))
        }
        (UncertaintyRule::SampleStatistics, Evidence::Regression(_)) => {
            return Err(Error::invalid_parameter(
                "sample statistics require repeated estimates",
            ))
        }
    };

    if !value.is_finite() {
        return Err(Error::NonFiniteResult("value"));
    }
    if !uncertainty.is_finite() {
        return Err(Error::NonFiniteResult("uncertainty"));
    }

    Ok(DerivedQuantity {
        value,
        uncertainty,
        unit: formula.unit().to_owned(),
    })
}
