use ndarray::Array1;
use ndarray_linalg::{Lapack, Scalar};
use num_traits::Float;

use crate::math::{from_usize, least_squares, mean, vandermonde};
use crate::{Error, Result};

/// Ordinary least squares line `y = slope x + intercept`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegressionResult<E> {
    pub slope: E,
    pub intercept: E,
    /// Signed Pearson correlation coefficient
    pub r_value: E,
    pub r_squared: E,
    /// Standard error of the slope
    pub std_err: E,
    /// Standard error of the intercept
    pub intercept_std_err: E,
    pub points: usize,
}

impl<E: Float> RegressionResult<E> {
    pub fn predict(&self, x: E) -> E {
        self.slope.mul_add(x, self.intercept)
    }

    /// Abscissa at which the fitted line crosses zero, `-intercept / slope`
    ///
    /// # Errors
    ///
    /// Returns [`Error::SingularFit`] for a horizontal line.
    pub fn x_intercept(&self) -> Result<E> {
        if self.slope == E::zero() {
            return Err(Error::SingularFit);
        }
        Ok(-self.intercept / self.slope)
    }
}

/// Fit a straight line to `(x, y)` in closed form
///
/// With exactly two points the line is fully determined and both standard errors are zero.
///
/// # Errors
///
/// - [`Error::LengthMismatch`] or [`Error::TooFewPoints`] for malformed input
/// - [`Error::NonFinite`] for the first row holding NaN or infinity
/// - [`Error::SingularFit`] when every `x` is equal
/// - [`Error::DegenerateVariance`] when every `y` is equal, so the correlation is undefined
pub fn linear_fit<E: Float>(x: &[E], y: &[E]) -> Result<RegressionResult<E>> {
    if x.len() != y.len() {
        return Err(Error::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    let n = x.len();
    if n < 2 {
        return Err(Error::TooFewPoints {
            required: 2,
            actual: n,
        });
    }
    check_finite(x, y)?;
    // Rounding in the means can leave a tiny non-zero variance on identical values
    if x.iter().all(|&xi| xi == x[0]) {
        return Err(Error::SingularFit);
    }
    if y.iter().all(|&yi| yi == y[0]) {
        return Err(Error::DegenerateVariance);
    }

    let n_points = from_usize::<E>(n);
    let x_mean = x.iter().fold(E::zero(), |acc, &xi| acc + xi) / n_points;
    let y_mean = y.iter().fold(E::zero(), |acc, &yi| acc + yi) / n_points;
    let (sxx, syy, sxy) = x.iter().zip(y).fold(
        (E::zero(), E::zero(), E::zero()),
        |(sxx, syy, sxy), (&xi, &yi)| {
            let dx = xi - x_mean;
            let dy = yi - y_mean;
            (sxx + dx * dx, syy + dy * dy, sxy + dx * dy)
        },
    );
    if sxx == E::zero() {
        return Err(Error::SingularFit);
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    let r_value = (sxy / (sxx * syy).sqrt()).max(-E::one()).min(E::one());
    let r_squared = r_value * r_value;

    let (std_err, intercept_std_err) = if n == 2 {
        (E::zero(), E::zero())
    } else {
        let residual_sum_of_squares = x
            .iter()
            .zip(y)
            .fold(E::zero(), |acc, (&xi, &yi)| {
                acc + (yi - slope.mul_add(xi, intercept)).powi(2)
            });
        let std_err = (residual_sum_of_squares / from_usize(n - 2)).sqrt() / sxx.sqrt();
        let mean_of_squares = x.iter().fold(E::zero(), |acc, &xi| acc + xi * xi) / n_points;
        (std_err, std_err * mean_of_squares.sqrt())
    };

    Ok(RegressionResult {
        slope,
        intercept,
        r_value,
        r_squared,
        std_err,
        intercept_std_err,
        points: n,
    })
}

/// Least squares polynomial coefficients in ascending powers of `x`
///
/// # Errors
///
/// - [`Error::UnderdeterminedFit`] when there are no more points than the degree
/// - [`Error::NonFinite`] for the first row holding NaN or infinity
/// - [`Error::SingularFit`] when the design matrix is rank deficient
pub fn polynomial_fit<E>(x: &[E], y: &[E], degree: usize) -> Result<Vec<E>>
where
    E: Float + Lapack + Scalar<Real = E>,
{
    if x.len() != y.len() {
        return Err(Error::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    check_finite(x, y)?;
    if x.len() <= degree {
        return Err(Error::UnderdeterminedFit {
            points: x.len(),
            degree,
        });
    }
    let design = vandermonde(x, degree);
    let observations: Array1<E> = y.iter().copied().collect();
    Ok(least_squares(&design, &observations)?.to_vec())
}

#[derive(Clone, Debug, PartialEq)]
pub struct PolynomialFit<E> {
    /// Coefficients in ascending powers
    pub coefficients: Vec<E>,
    pub r_squared: E,
}

impl<E: Float> PolynomialFit<E> {
    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }

    pub fn evaluate(&self, x: E) -> E {
        evaluate_polynomial(&self.coefficients, x)
    }
}

/// Horner evaluation of ascending-power `coefficients`
pub fn evaluate_polynomial<E: Float>(coefficients: &[E], x: E) -> E {
    coefficients
        .iter()
        .rev()
        .fold(E::zero(), |acc, &c| acc.mul_add(x, c))
}

/// [`polynomial_fit`] together with the coefficient of determination `1 - SS_res / SS_tot`
///
/// # Errors
///
/// As [`polynomial_fit`], plus [`Error::DegenerateVariance`] when `y` is constant but the fit
/// leaves a residual.
pub fn polynomial_fit_with_r_squared<E>(x: &[E], y: &[E], degree: usize) -> Result<PolynomialFit<E>>
where
    E: Float + Lapack + Scalar<Real = E>,
{
    let coefficients = polynomial_fit(x, y, degree)?;
    let r_squared = coefficient_of_determination(x, y, &coefficients)?;
    Ok(PolynomialFit {
        coefficients,
        r_squared,
    })
}

fn check_finite<E: Float>(x: &[E], y: &[E]) -> Result<()> {
    match x
        .iter()
        .zip(y)
        .position(|(xi, yi)| !xi.is_finite() || !yi.is_finite())
    {
        Some(index) => Err(Error::NonFinite { index }),
        None => Ok(()),
    }
}

fn coefficient_of_determination<E: Float>(x: &[E], y: &[E], coefficients: &[E]) -> Result<E> {
    let y_mean = mean(y).ok_or(Error::TooFewPoints {
        required: 1,
        actual: 0,
    })?;
    let (ss_res, ss_tot) = x.iter().zip(y).fold(
        (E::zero(), E::zero()),
        |(ss_res, ss_tot), (&xi, &yi)| {
            (
                ss_res + (yi - evaluate_polynomial(coefficients, xi)).powi(2),
                ss_tot + (yi - y_mean).powi(2),
            )
        },
    );
    if ss_tot == E::zero() {
        // Rounding in the solve leaves a tiny residual on an exactly constant series
        let scale = y.iter().fold(E::zero(), |acc, &yi| acc.max(yi.abs()));
        let tolerance = E::epsilon() * from_usize(100 * y.len()) * scale.max(E::one());
        return if ss_res.sqrt() <= tolerance {
            Ok(E::one())
        } else {
            Err(Error::DegenerateVariance)
        };
    }
    Ok(E::one() - ss_res / ss_tot)
}

#[cfg(test)]
mod tests {
    use ndarray_rand::rand::{Rng, SeedableRng};
    use proptest::prelude::*;
    use rand_isaac::Isaac64Rng;

    use super::{
        coefficient_of_determination, evaluate_polynomial, linear_fit, polynomial_fit,
        polynomial_fit_with_r_squared,
    };
    use crate::{Error, Result};

    #[test]
    fn exact_line_is_recovered() -> Result<()> {
        let fit = linear_fit(&[1., 2., 3., 4.], &[2., 4., 6., 8.])?;

        approx::assert_relative_eq!(fit.slope, 2.0);
        approx::assert_abs_diff_eq!(fit.intercept, 0.0, epsilon = 1e-12);
        approx::assert_relative_eq!(fit.r_squared, 1.0);
        approx::assert_abs_diff_eq!(fit.std_err, 0.0, epsilon = 1e-12);
        assert_eq!(fit.points, 4);
        Ok(())
    }

    #[test]
    fn noiseless_synthetic_line_round_trips() -> Result<()> {
        let x = (0..25).map(|n| f64::from(n) * 0.4).collect::<Vec<_>>();
        let y = x.iter().map(|x| 3.0 * x + 7.0).collect::<Vec<_>>();

        let fit = linear_fit(&x, &y)?;

        approx::assert_relative_eq!(fit.slope, 3.0, max_relative = 1e-12);
        approx::assert_relative_eq!(fit.intercept, 7.0, max_relative = 1e-12);
        approx::assert_relative_eq!(fit.r_squared, 1.0, max_relative = 1e-12);
        approx::assert_relative_eq!(fit.predict(2.0), 13.0, max_relative = 1e-12);
        Ok(())
    }

    #[test]
    fn standard_errors_match_tabulated_values() -> Result<()> {
        // Reference values from an independent least squares routine
        let x = [1., 2., 3., 4., 5.];
        let y = [1.1, 1.9, 3.2, 3.8, 5.1];

        let fit = linear_fit(&x, &y)?;

        approx::assert_relative_eq!(fit.slope, 0.99, max_relative = 1e-12);
        approx::assert_relative_eq!(fit.intercept, 0.05, max_relative = 1e-9);
        approx::assert_relative_eq!(fit.std_err, 0.059721576223896, max_relative = 1e-9);
        approx::assert_relative_eq!(
            fit.intercept_std_err,
            0.198074060223274,
            max_relative = 1e-9
        );
        approx::assert_relative_eq!(fit.r_squared, 0.989200645942673, max_relative = 1e-9);
        Ok(())
    }

    #[test]
    fn constant_abscissae_are_singular() {
        let result = linear_fit(&[5., 5., 5.], &[1., 2., 3.]);
        assert!(matches!(result, Err(Error::SingularFit)));
    }

    #[test]
    fn constant_ordinates_have_undefined_correlation() {
        let result = linear_fit(&[1., 2., 3.], &[4., 4., 4.]);
        assert!(matches!(result, Err(Error::DegenerateVariance)));
    }

    #[test]
    fn inexact_means_of_identical_values_are_still_degenerate() {
        // The mean of three 0.1s is not exactly 0.1
        assert!(matches!(
            linear_fit(&[0.1, 0.1, 0.1], &[1., 2., 3.]),
            Err(Error::SingularFit)
        ));
        assert!(matches!(
            linear_fit(&[1., 2., 3.], &[0.1, 0.1, 0.1]),
            Err(Error::DegenerateVariance)
        ));
    }

    #[test]
    fn non_finite_samples_are_rejected() {
        assert!(matches!(
            linear_fit(&[1., 2., f64::NAN], &[1., 2., 3.]),
            Err(Error::NonFinite { index: 2 })
        ));
        assert!(matches!(
            linear_fit(&[1., 2., 3.], &[f64::INFINITY, 2., 3.]),
            Err(Error::NonFinite { index: 0 })
        ));
        assert!(matches!(
            polynomial_fit(&[0., 1., 2., 3.], &[1., f64::NAN, 3., 4.], 2),
            Err(Error::NonFinite { index: 1 })
        ));
    }

    #[test]
    fn two_points_determine_the_line() -> Result<()> {
        let fit = linear_fit(&[0., 2.], &[1., 5.])?;
        approx::assert_relative_eq!(fit.slope, 2.0);
        approx::assert_relative_eq!(fit.intercept, 1.0);
        assert_eq!(fit.std_err, 0.0);
        approx::assert_relative_eq!(fit.x_intercept()?, -0.5);
        Ok(())
    }

    #[test]
    fn too_few_points_are_rejected() {
        assert!(matches!(
            linear_fit(&[1.], &[1.]),
            Err(Error::TooFewPoints {
                required: 2,
                actual: 1
            })
        ));
        assert!(matches!(
            linear_fit(&[1., 2.], &[1.]),
            Err(Error::LengthMismatch { x: 2, y: 1 })
        ));
    }

    #[test]
    fn polynomial_coefficients_match_input() -> Result<()> {
        let seed = 40;
        let mut rng = Isaac64Rng::seed_from_u64(seed);
        let polynomial_degree = rng.gen_range(2..6);
        let num_samples = rng.gen_range(10..100);
        let coeffs = (0..=polynomial_degree)
            .map(|_| rng.gen::<f64>())
            .collect::<Vec<_>>();
        let x = (0..num_samples)
            .map(|n| n as f64 / num_samples as f64)
            .collect::<Vec<_>>();
        let y = x
            .iter()
            .map(|&x| evaluate_polynomial(&coeffs, x))
            .collect::<Vec<_>>();

        let fit = polynomial_fit_with_r_squared(&x, &y, polynomial_degree)?;

        assert_eq!(fit.degree(), polynomial_degree);
        for (expected, calculated) in coeffs.iter().zip(fit.coefficients.iter()) {
            approx::assert_relative_eq!(expected, calculated, max_relative = 1e-4);
        }
        approx::assert_relative_eq!(fit.r_squared, 1.0, max_relative = 1e-10);
        Ok(())
    }

    #[test]
    fn high_degree_fits_over_wide_ranges_stay_well_posed() -> Result<()> {
        // The coil field profile is fit with degree 8 over positions in centimetres
        let x = (-10..=10).map(f64::from).collect::<Vec<_>>();
        let y = x
            .iter()
            .map(|x| 1.0 / (1.0 + (x / 6.0).powi(2)).powf(1.5))
            .collect::<Vec<_>>();

        let fit = polynomial_fit_with_r_squared(&x, &y, 8)?;

        assert!(fit.r_squared > 0.999);
        approx::assert_relative_eq!(fit.evaluate(0.0), 1.0, max_relative = 1e-2);
        Ok(())
    }

    #[test]
    fn polynomial_with_too_few_points_is_underdetermined() {
        assert!(matches!(
            polynomial_fit(&[1., 2., 3.], &[1., 4., 9.], 3),
            Err(Error::UnderdeterminedFit {
                points: 3,
                degree: 3
            })
        ));
    }

    #[test]
    fn constant_ordinates_are_perfectly_fit_or_degenerate() -> Result<()> {
        let x = [0., 1., 2., 3.];
        let y = [2., 2., 2., 2.];

        let fit = polynomial_fit_with_r_squared(&x, &y, 2)?;
        approx::assert_relative_eq!(fit.r_squared, 1.0);

        // A curve that misses a constant series leaves an unexplained residual
        assert!(matches!(
            coefficient_of_determination(&x, &y, &[2.0, 0.5]),
            Err(Error::DegenerateVariance)
        ));
        Ok(())
    }

    proptest! {
        #[test]
        fn linear_fit_is_deterministic_and_bounded(seed in 0..1000u64, n in 3..60usize) {
            let mut rng = Isaac64Rng::seed_from_u64(seed);
            let x = (0..n).map(|_| rng.gen_range(-10.0..10.0)).collect::<Vec<f64>>();
            let y = x.iter().map(|x| 1.5 * x + rng.gen_range(-3.0..3.0)).collect::<Vec<f64>>();

            let first = linear_fit(&x, &y).unwrap();
            let second = linear_fit(&x, &y).unwrap();

            prop_assert_eq!(first, second);
            prop_assert!((0.0..=1.0).contains(&first.r_squared));
            prop_assert!(first.std_err >= 0.0);
        }
    }
}
