//! Dense resampling of scattered measurements through an interpolating cubic spline
//!
//! The spline passes through every measured point exactly. On each knot interval
//! `[x_i, x_{i+1}]` of width `h_i` it is written in terms of the second derivatives `M_i` at the
//! knots,
//!
//! $$
//!     S(x) = M_i \frac{(x_{i+1} - x)^3}{6 h_i} + M_{i+1} \frac{(x - x_i)^3}{6 h_i}
//!         + \left(\frac{y_i}{h_i} - \frac{M_i h_i}{6}\right)(x_{i+1} - x)
//!         + \left(\frac{y_{i+1}}{h_i} - \frac{M_{i+1} h_i}{6}\right)(x - x_i),
//! $$
//!
//! and continuity of the first derivative gives the tridiagonal system
//! $h_{i-1} M_{i-1} + 2 (h_{i-1} + h_i) M_i + h_i M_{i+1} = 6 (s_i - s_{i-1})$ in the secant
//! slopes $s_i$. The two boundary conditions close the system.
use num_traits::Float;
use serde::{Deserialize, Serialize};

use crate::math::from_usize;
use crate::series::Series;
use crate::{Error, Result};

pub const DEFAULT_GRID_SIZE: usize = 2000;

/// End conditions closing the spline system
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Boundary {
    /// Zero curvature at both ends
    Natural,
    /// Continuous third derivative across the second and penultimate knots
    #[default]
    NotAKnot,
}

#[derive(Clone, Debug)]
pub struct CubicSpline<E> {
    knots: Vec<E>,
    values: Vec<E>,
    second_derivatives: Vec<E>,
}

impl<E: Float> CubicSpline<E> {
    /// Build the interpolant through every sample of `series`
    ///
    /// # Errors
    ///
    /// - [`Error::DegenerateInput`] with fewer than three distinct abscissae
    /// - [`Error::DuplicateAbscissa`] if an abscissa repeats, the knots must strictly increase
    pub fn new(series: &Series<E>, boundary: Boundary) -> Result<Self> {
        let sorted = series.sorted();
        let x = sorted.x();

        let distinct = if x.is_empty() {
            0
        } else {
            1 + x.windows(2).filter(|w| w[1] > w[0]).count()
        };
        if distinct < 3 {
            return Err(Error::DegenerateInput {
                required: 3,
                distinct,
            });
        }
        if let Some(index) = x.windows(2).position(|w| w[1] <= w[0]) {
            return Err(Error::DuplicateAbscissa { index: index + 1 });
        }

        let second_derivatives = solve_second_derivatives(x, sorted.y(), boundary);

        Ok(Self {
            knots: x.to_vec(),
            values: sorted.y().to_vec(),
            second_derivatives,
        })
    }

    pub fn knots(&self) -> &[E] {
        &self.knots
    }

    /// Evaluate the spline at `x`
    ///
    /// Outside the knot range the polynomial of the nearest end interval is extended.
    pub fn evaluate(&self, x: E) -> E {
        let last = self.knots.len() - 2;
        let interval = self
            .knots
            .partition_point(|&knot| knot <= x)
            .saturating_sub(1)
            .min(last);

        let (x0, x1) = (self.knots[interval], self.knots[interval + 1]);
        let (y0, y1) = (self.values[interval], self.values[interval + 1]);
        let (m0, m1) = (
            self.second_derivatives[interval],
            self.second_derivatives[interval + 1],
        );
        let six = from_usize::<E>(6);
        let h = x1 - x0;
        let right = x1 - x;
        let left = x - x0;

        m0 * right.powi(3) / (six * h)
            + m1 * left.powi(3) / (six * h)
            + (y0 / h - m0 * h / six) * right
            + (y1 / h - m1 * h / six) * left
    }
}

/// Solve for the knot second derivatives
///
/// `x` must be strictly increasing with at least three entries.
fn solve_second_derivatives<E: Float>(x: &[E], y: &[E], boundary: Boundary) -> Vec<E> {
    let n = x.len();
    let h: Vec<E> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let secants: Vec<E> = y
        .windows(2)
        .zip(h.iter())
        .map(|(w, &h)| (w[1] - w[0]) / h)
        .collect();
    let two = from_usize::<E>(2);
    let six = from_usize::<E>(6);

    if n == 3 && boundary == Boundary::NotAKnot {
        // A single parabola through the three points has constant curvature
        let curvature = two * (secants[1] - secants[0]) / (h[0] + h[1]);
        return vec![curvature; 3];
    }

    // Interior unknowns M_1 ..= M_{n-2}
    let size = n - 2;
    let mut lower = vec![E::zero(); size];
    let mut diagonal = vec![E::zero(); size];
    let mut upper = vec![E::zero(); size];
    let mut rhs = vec![E::zero(); size];
    for row in 0..size {
        let ii = row + 1;
        lower[row] = h[ii - 1];
        diagonal[row] = two * (h[ii - 1] + h[ii]);
        upper[row] = h[ii];
        rhs[row] = six * (secants[ii] - secants[ii - 1]);
    }

    if boundary == Boundary::NotAKnot {
        // Eliminate M_0 = ((h_0 + h_1) M_1 - h_0 M_2) / h_1 from the first row
        let (h0, h1) = (h[0], h[1]);
        diagonal[0] = (h0 + h1) * (h0 + two * h1) / h1;
        upper[0] = (h1 * h1 - h0 * h0) / h1;

        // and symmetrically M_{n-1} from the last row
        let (ha, hb) = (h[n - 3], h[n - 2]);
        let last = size - 1;
        diagonal[last] = (ha + hb) * (hb + two * ha) / ha;
        lower[last] = (ha * ha - hb * hb) / ha;
    }

    let interior = solve_tridiagonal(&lower, &diagonal, &upper, &rhs);

    let mut second_derivatives = Vec::with_capacity(n);
    match boundary {
        Boundary::Natural => {
            second_derivatives.push(E::zero());
            second_derivatives.extend_from_slice(&interior);
            second_derivatives.push(E::zero());
        }
        Boundary::NotAKnot => {
            let (h0, h1) = (h[0], h[1]);
            let first = ((h0 + h1) * interior[0] - h0 * interior[1]) / h1;
            let (ha, hb) = (h[n - 3], h[n - 2]);
            let last = ((ha + hb) * interior[size - 1] - hb * interior[size - 2]) / ha;
            second_derivatives.push(first);
            second_derivatives.extend_from_slice(&interior);
            second_derivatives.push(last);
        }
    }
    second_derivatives
}

/// Thomas algorithm for a tridiagonal system
///
/// `lower[0]` and `upper[last]` are ignored.
fn solve_tridiagonal<E: Float>(lower: &[E], diagonal: &[E], upper: &[E], rhs: &[E]) -> Vec<E> {
    let n = diagonal.len();
    let mut c = vec![E::zero(); n];
    let mut d = vec![E::zero(); n];

    c[0] = upper[0] / diagonal[0];
    d[0] = rhs[0] / diagonal[0];
    for ii in 1..n {
        let denominator = diagonal[ii] - lower[ii] * c[ii - 1];
        c[ii] = upper[ii] / denominator;
        d[ii] = (rhs[ii] - lower[ii] * d[ii - 1]) / denominator;
    }

    let mut solution = vec![E::zero(); n];
    solution[n - 1] = d[n - 1];
    for ii in (0..n - 1).rev() {
        solution[ii] = d[ii] - c[ii] * solution[ii + 1];
    }
    solution
}

/// A series resampled onto a uniform grid, together with the spline that produced it
#[derive(Clone, Debug)]
pub struct SmoothedSeries<E> {
    spline: CubicSpline<E>,
    grid: Series<E>,
}

impl<E: Float> SmoothedSeries<E> {
    pub const fn grid(&self) -> &Series<E> {
        &self.grid
    }

    pub const fn spline(&self) -> &CubicSpline<E> {
        &self.spline
    }

    pub fn evaluate(&self, x: E) -> E {
        self.spline.evaluate(x)
    }
}

/// Resample `series` at `grid_size` uniformly spaced abscissae spanning its range
///
/// The input is never modified. The first and last grid points are the extreme measured
/// abscissae.
///
/// # Errors
///
/// - [`Error::InvalidParameter`] if `grid_size < 2`
/// - the errors of [`CubicSpline::new`]
pub fn smooth<E: Float>(
    series: &Series<E>,
    grid_size: usize,
    boundary: Boundary,
) -> Result<SmoothedSeries<E>> {
    if grid_size < 2 {
        return Err(Error::invalid_parameter(format!(
            "grid size must be at least 2, got {grid_size}"
        )));
    }
    let spline = CubicSpline::new(series, boundary)?;

    let start = spline.knots[0];
    let end = spline.knots[spline.knots.len() - 1];
    let step = (end - start) / from_usize(grid_size - 1);
    let x: Vec<E> = (0..grid_size)
        .map(|ii| {
            if ii == grid_size - 1 {
                end
            } else {
                start + step * from_usize(ii)
            }
        })
        .collect();
    let y = x.iter().map(|&x| spline.evaluate(x)).collect();
    let grid = Series::new(x, y)?;

    Ok(SmoothedSeries { spline, grid })
}

#[cfg(test)]
mod tests {
    use ndarray_rand::rand::{Rng, SeedableRng};
    use proptest::prelude::*;
    use rand_isaac::Isaac64Rng;

    use super::{smooth, Boundary, CubicSpline};
    use crate::series::Series;
    use crate::{Error, Result};

    fn scattered_series(rng: &mut impl Rng, num_samples: usize) -> Series<f64> {
        let mut x = 0.0;
        let mut xs = Vec::with_capacity(num_samples);
        for _ in 0..num_samples {
            x += rng.gen_range(0.1..2.0);
            xs.push(x);
        }
        let ys = xs
            .iter()
            .map(|_| rng.gen_range(-100.0..100.0))
            .collect::<Vec<_>>();
        Series::new(xs, ys).unwrap()
    }

    #[test]
    fn spline_passes_through_every_sample() -> Result<()> {
        let seed = 40;
        let mut rng = Isaac64Rng::seed_from_u64(seed);
        let series = scattered_series(&mut rng, 31);

        for boundary in [Boundary::Natural, Boundary::NotAKnot] {
            let smoothed = smooth(&series, 2000, boundary)?;
            for (x, y) in series.iter() {
                approx::assert_relative_eq!(
                    smoothed.evaluate(x),
                    y,
                    max_relative = 1e-9,
                    epsilon = 1e-9
                );
            }
        }
        Ok(())
    }

    #[test]
    fn not_a_knot_reproduces_cubics() -> Result<()> {
        let cubic = |x: f64| 0.5 * x.powi(3) - 2.0 * x.powi(2) + x - 3.0;
        let x = vec![0.0, 0.7, 1.5, 2.0, 3.1, 4.0];
        let y = x.iter().map(|&x| cubic(x)).collect();
        let spline = CubicSpline::new(&Series::new(x, y)?, Boundary::NotAKnot)?;

        for x in [0.2, 1.1, 2.5, 3.7] {
            approx::assert_relative_eq!(spline.evaluate(x), cubic(x), max_relative = 1e-9);
        }
        Ok(())
    }

    #[test]
    fn natural_spline_has_zero_end_curvature_and_reproduces_lines() -> Result<()> {
        let x = vec![0.0, 1.0, 2.5, 4.0];
        let y = x.iter().map(|x| 2.0 * x + 1.0).collect();
        let spline = CubicSpline::new(&Series::new(x, y)?, Boundary::Natural)?;

        assert_eq!(spline.second_derivatives[0], 0.0);
        assert_eq!(spline.second_derivatives[3], 0.0);
        approx::assert_relative_eq!(spline.evaluate(3.3), 7.6, max_relative = 1e-12);
        Ok(())
    }

    #[test]
    fn three_knots_give_the_interpolating_parabola() -> Result<()> {
        let series = Series::new(vec![0.0, 1.0, 3.0], vec![1.0, 2.0, 10.0])?;
        // y = x^2 + 1
        let spline = CubicSpline::new(&series, Boundary::NotAKnot)?;
        approx::assert_relative_eq!(spline.evaluate(2.0), 5.0, max_relative = 1e-12);
        Ok(())
    }

    #[test]
    fn unsorted_input_is_sorted_before_fitting() -> Result<()> {
        let series = Series::new(vec![2.0, 0.0, 1.0, 3.0], vec![4.0, 0.0, 1.0, 9.0])?;
        let smoothed = smooth(&series, 4, Boundary::NotAKnot)?;

        assert_eq!(smoothed.grid().x(), &[0.0, 1.0, 2.0, 3.0]);
        approx::assert_relative_eq!(smoothed.grid().y()[2], 4.0, max_relative = 1e-12);
        assert_eq!(series.x(), &[2.0, 0.0, 1.0, 3.0]);
        Ok(())
    }

    #[test]
    fn grid_spans_the_measured_range() -> Result<()> {
        let series = Series::new(vec![-1.5, 0.0, 2.0, 7.25], vec![1.0, 3.0, 2.0, 5.0])?;
        let smoothed = smooth(&series, 2000, Boundary::default())?;
        let grid = smoothed.grid();

        assert_eq!(grid.len(), 2000);
        assert_eq!(grid.x()[0], -1.5);
        assert_eq!(grid.x()[1999], 7.25);
        assert!(grid.is_sorted());
        Ok(())
    }

    #[test]
    fn fewer_than_three_distinct_abscissae_are_degenerate() {
        let series = Series::new(vec![1.0, 1.0, 2.0], vec![1.0, 2.0, 3.0]).unwrap();
        assert!(matches!(
            smooth(&series, 100, Boundary::Natural),
            Err(Error::DegenerateInput {
                required: 3,
                distinct: 2
            })
        ));
    }

    #[test]
    fn repeated_abscissae_are_rejected() {
        let series = Series::new(vec![0.0, 1.0, 1.0, 2.0], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!(matches!(
            smooth(&series, 100, Boundary::Natural),
            Err(Error::DuplicateAbscissa { index: 2 })
        ));
    }

    #[test]
    fn tiny_grids_are_rejected() {
        let series = Series::new(vec![0.0, 1.0, 2.0], vec![1.0, 2.0, 3.0]).unwrap();
        assert!(matches!(
            smooth(&series, 1, Boundary::Natural),
            Err(Error::InvalidParameter(_))
        ));
    }

    proptest! {
        #[test]
        fn smoothing_is_deterministic(seed in 0..1000u64, num_samples in 3..40usize) {
            let mut rng = Isaac64Rng::seed_from_u64(seed);
            let series = scattered_series(&mut rng, num_samples);

            let first = smooth(&series, 257, Boundary::NotAKnot).unwrap();
            let second = smooth(&series, 257, Boundary::NotAKnot).unwrap();

            prop_assert_eq!(first.grid(), second.grid());
        }
    }
}
