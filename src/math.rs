use ndarray::{Array1, Array2};
use ndarray_linalg::{Lapack, LeastSquaresSvd, Scalar};
use num_traits::Float;

use crate::{Error, Result};

/// Convert a count into the working scalar.
///
/// # Panics
///
/// Panics if `n` cannot be represented in `E`, which does not happen for the point counts this
/// crate handles.
pub(crate) fn from_usize<E: Float>(n: usize) -> E {
    E::from(n).expect("usize must fit in `E`")
}

/// Generate the Vandermonde matrix of `degree` for observations `x`
///
/// The Vandermonde matrix is a (n x degree + 1) matrix. Each row of the matrix is a geometric
/// progression for an individual observation `x` from power `0` to `degree` inclusive, so fitted
/// coefficients come out in ascending power order.
///
/// # Examples
///
/// ```
/// use curve_analysis::math::vandermonde;
/// use ndarray::arr2;
///
/// let observations: Vec<f64> = vec![2., 3.];
/// let vander = vandermonde(&observations, 2);
///
/// let expected = arr2(&[[1., 2., 4.], [1., 3., 9.]]);
/// assert_eq!(vander, expected);
/// ```
///
/// # Panics
///
/// Panics if `degree` exceeds `i32::MAX`.
pub fn vandermonde<T: Float>(x: &[T], degree: usize) -> Array2<T> {
    Array2::from_shape_fn((x.len(), degree + 1), |(ii, jj)| {
        x[ii].powi(i32::try_from(jj).expect("{jj} doesn't fit in `i32`"))
    })
}

/// Arithmetic mean, `None` for an empty slice
pub fn mean<E: Float>(values: &[E]) -> Option<E> {
    if values.is_empty() {
        return None;
    }
    let sum = values.iter().fold(E::zero(), |acc, &v| acc + v);
    Some(sum / from_usize(values.len()))
}

/// Sample standard deviation with the `n - 1` denominator, `None` for fewer than two values
pub fn sample_standard_deviation<E: Float>(values: &[E]) -> Option<E> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let sum_of_squares = values
        .iter()
        .fold(E::zero(), |acc, &v| acc + (v - mean).powi(2));
    Some((sum_of_squares / from_usize(values.len() - 1)).sqrt())
}

/// Solve the linear least squares problem `min ||A c - b||` through the SVD of `A`
///
/// The columns of `A` are equilibrated to unit norm before the decomposition so that the rank test
/// is insensitive to the very different magnitudes of Vandermonde columns.
///
/// # Errors
///
/// - [`Error::UnderdeterminedFit`] when `A` has fewer rows than columns
/// - [`Error::SingularFit`] when `A` is numerically rank deficient
/// - [`Error::LengthMismatch`] when `b` does not have one entry per row of `A`
/// - [`Error::Linalg`] if LAPACK fails to converge
pub fn least_squares<E>(a: &Array2<E>, b: &Array1<E>) -> Result<Array1<E>>
where
    E: Float + Lapack + Scalar<Real = E>,
{
    let (m, n) = a.dim();
    if b.len() != m {
        return Err(Error::LengthMismatch { x: m, y: b.len() });
    }
    if m < n || n == 0 {
        return Err(Error::UnderdeterminedFit {
            points: m,
            degree: n.saturating_sub(1),
        });
    }

    let scale: Array1<E> = (0..n).map(|jj| column_norm(a, jj)).collect();
    if scale.iter().any(|&norm| norm == E::zero()) {
        return Err(Error::SingularFit);
    }
    let equilibrated = a / &scale;

    let result = equilibrated.least_squares(b)?;
    let largest = result
        .singular_values
        .iter()
        .fold(E::zero(), |acc, &sv| Float::max(acc, sv));
    let tolerance = E::epsilon() * from_usize(100 * m.max(n)) * largest;
    let rank = result
        .singular_values
        .iter()
        .filter(|&&sv| sv > tolerance)
        .count();
    if rank < n {
        return Err(Error::SingularFit);
    }

    // Undo the column equilibration
    Ok(result.solution / &scale)
}

fn column_norm<E: Float>(matrix: &Array2<E>, column: usize) -> E {
    matrix
        .column(column)
        .iter()
        .fold(E::zero(), |acc, &v| acc + v * v)
        .sqrt()
}
