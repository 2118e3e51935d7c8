use std::cmp::Ordering;

use num_traits::Float;

use crate::{Error, Result};

/// An ordered sequence of `(x, y)` samples
///
/// Values are checked to be finite on construction, so nothing downstream has to guard against
/// NaN leaking out of a malformed table. The abscissae need not be sorted, stages that require
/// monotonic `x` work on [`Series::sorted`].
#[derive(Clone, Debug, PartialEq)]
pub struct Series<E> {
    x: Vec<E>,
    y: Vec<E>,
}

impl<E: Float> Series<E> {
    /// # Errors
    ///
    /// Returns [`Error::LengthMismatch`] when the columns differ in length and
    /// [`Error::NonFinite`] when any value is NaN or infinite.
    pub fn new(x: Vec<E>, y: Vec<E>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(Error::LengthMismatch {
                x: x.len(),
                y: y.len(),
            });
        }
        if let Some(index) = x
            .iter()
            .zip(y.iter())
            .position(|(x, y)| !x.is_finite() || !y.is_finite())
        {
            return Err(Error::NonFinite { index });
        }
        Ok(Self { x, y })
    }

    pub fn x(&self) -> &[E] {
        &self.x
    }

    pub fn y(&self) -> &[E] {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (E, E)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }

    pub fn is_sorted(&self) -> bool {
        self.x.windows(2).all(|w| w[0] <= w[1])
    }

    /// A copy stably sorted by `x`, carrying `y` along
    pub fn sorted(&self) -> Self {
        let mut pairs: Vec<(E, E)> = self.iter().collect();
        // Finite values always compare
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        let (x, y) = pairs.into_iter().unzip();
        Self { x, y }
    }

    /// Smallest and largest abscissa, `None` when empty
    pub fn x_range(&self) -> Option<(E, E)> {
        let first = *self.x.first()?;
        Some(
            self.x
                .iter()
                .fold((first, first), |(lo, hi), &x| (lo.min(x), hi.max(x))),
        )
    }

    /// Transform the abscissae into a derived quantity, such as `cos^2(phi)` from an angle
    ///
    /// # Errors
    ///
    /// Returns [`Error::NonFinite`] if the transform produces NaN or infinity.
    pub fn map_x<F: Fn(E) -> E>(&self, f: F) -> Result<Self> {
        Self::new(self.x.iter().map(|&x| f(x)).collect(), self.y.clone())
    }

    /// Transform the ordinates into a derived quantity
    ///
    /// # Errors
    ///
    /// Returns [`Error::NonFinite`] if the transform produces NaN or infinity.
    pub fn map_y<F: Fn(E) -> E>(&self, f: F) -> Result<Self> {
        Self::new(self.x.clone(), self.y.iter().map(|&y| f(y)).collect())
    }

    /// The sample whose ordinate lies closest to zero
    ///
    /// This is how the stopping potential is read off a photocurrent curve. Ties resolve to the
    /// earliest sample.
    pub fn nearest_zero(&self) -> Option<(E, E)> {
        self.iter().fold(None, |best, (x, y)| match best {
            Some((_, best_y)) if best_y.abs() <= y.abs() => best,
            _ => Some((x, y)),
        })
    }

    /// Row-wise ratios `y / x`, used as repeated estimates of a proportionality constant
    ///
    /// # Errors
    ///
    /// Returns [`Error::DivisionByZero`] for the first row with `x == 0`.
    pub fn ratios(&self) -> Result<Vec<E>> {
        self.iter()
            .enumerate()
            .map(|(index, (x, y))| {
                if x == E::zero() {
                    Err(Error::DivisionByZero { index })
                } else {
                    Ok(y / x)
                }
            })
            .collect()
    }
}
