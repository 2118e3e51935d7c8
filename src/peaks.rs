//! Local maxima of a sampled curve, filtered by prominence and height
use std::cmp::Ordering;

use itertools::Itertools;
use num_traits::Float;
use serde::{Deserialize, Serialize};

use crate::series::Series;
use crate::{Error, Result};

/// Selection thresholds for [`find_peaks`]
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct PeakCriteria<E> {
    /// Minimum drop on both sides before the curve climbs back to the peak height
    pub prominence: E,
    /// Peaks lower than this are discarded
    #[serde(default)]
    pub min_height: Option<E>,
}

impl<E: Float> PeakCriteria<E> {
    pub fn new(prominence: E, min_height: Option<E>) -> Self {
        Self {
            prominence,
            min_height,
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.prominence.is_finite() || self.prominence < E::zero() {
            return Err(Error::invalid_parameter(
                "prominence must be finite and non-negative",
            ));
        }
        if self.min_height.is_some_and(|height| !height.is_finite()) {
            return Err(Error::invalid_parameter("minimum height must be finite"));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak<E> {
    pub position: E,
    pub value: E,
    /// Zero for the largest peak of the set
    pub rank: usize,
    pub prominence: E,
    /// Index of the peak sample in the position-sorted series
    pub index: usize,
}

/// Detected peaks, ordered by ascending position
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PeakSet<E> {
    peaks: Vec<Peak<E>>,
}

/// The peaks of a [`PeakSet`] ordered by descending value
#[derive(Clone, Debug, PartialEq)]
pub struct RankedPeakSet<E>(Vec<Peak<E>>);

impl<E> RankedPeakSet<E> {
    pub fn as_slice(&self) -> &[Peak<E>] {
        &self.0
    }
}

/// Central and first-order maxima of a diffraction pattern
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Maxima<E> {
    pub central: Peak<E>,
    pub first_order: [Peak<E>; 2],
}

impl<E: Float> Maxima<E> {
    pub fn first_order_mean(&self) -> E {
        (self.first_order[0].value + self.first_order[1].value) / (E::one() + E::one())
    }
}

impl<E: Float> PeakSet<E> {
    fn from_unranked(mut peaks: Vec<Peak<E>>) -> Self {
        let mut by_value: Vec<usize> = (0..peaks.len()).collect();
        // Stable, so equal values rank by position
        by_value.sort_by(|&a, &b| {
            peaks[b]
                .value
                .partial_cmp(&peaks[a].value)
                .unwrap_or(Ordering::Equal)
        });
        for (rank, index) in by_value.into_iter().enumerate() {
            peaks[index].rank = rank;
        }
        Self { peaks }
    }

    pub fn as_slice(&self) -> &[Peak<E>] {
        &self.peaks
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    pub fn positions(&self) -> Vec<E> {
        self.peaks.iter().map(|peak| peak.position).collect()
    }

    pub fn values(&self) -> Vec<E> {
        self.peaks.iter().map(|peak| peak.value).collect()
    }

    /// Distances between successive peaks
    pub fn spacings(&self) -> Vec<E> {
        self.peaks
            .iter()
            .tuple_windows()
            .map(|(previous, next)| next.position - previous.position)
            .collect()
    }

    pub fn ranked(&self) -> RankedPeakSet<E> {
        let mut ranked = self.peaks.clone();
        ranked.sort_by_key(|peak| peak.rank);
        RankedPeakSet(ranked)
    }

    /// # Errors
    ///
    /// Returns [`Error::InsufficientPeaks`] when fewer than `required` peaks were detected.
    pub fn require(&self, required: usize) -> Result<&Self> {
        if self.peaks.len() < required {
            return Err(Error::InsufficientPeaks {
                required,
                found: self.peaks.len(),
            });
        }
        Ok(self)
    }

    /// Split into the central maximum and the two first-order maxima
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientPeaks`] with fewer than three peaks.
    pub fn classify(&self) -> Result<Maxima<E>> {
        self.require(3)?;
        let ranked = self.ranked();
        let ranked = ranked.as_slice();
        Ok(Maxima {
            central: ranked[0],
            first_order: [ranked[1], ranked[2]],
        })
    }
}

/// Find the local maxima of `series` satisfying `criteria`
///
/// The series is scanned in ascending `x`. An interior sample, or a run of equal samples, is a
/// candidate when both neighbours are strictly lower; a run is represented by its middle sample.
/// A candidate's prominence is its height above the higher of the two minima found walking
/// outwards until the edge of the series or a strictly higher sample.
///
/// An empty set is a valid outcome; callers requiring peaks use [`PeakSet::require`].
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] for a negative or non-finite threshold.
pub fn find_peaks<E: Float>(series: &Series<E>, criteria: &PeakCriteria<E>) -> Result<PeakSet<E>> {
    criteria.validate()?;
    let sorted;
    let series = if series.is_sorted() {
        series
    } else {
        sorted = series.sorted();
        &sorted
    };
    let x = series.x();
    let y = series.y();

    let peaks = local_maxima(y)
        .into_iter()
        .filter(|&index| criteria.min_height.map_or(true, |height| y[index] >= height))
        .filter_map(|index| {
            let prominence = prominence(y, index);
            (prominence >= criteria.prominence).then_some(Peak {
                position: x[index],
                value: y[index],
                rank: 0,
                prominence,
                index,
            })
        })
        .collect();

    Ok(PeakSet::from_unranked(peaks))
}

fn local_maxima<E: Float>(y: &[E]) -> Vec<usize> {
    let mut maxima = Vec::new();
    if y.len() < 3 {
        return maxima;
    }
    let last = y.len() - 1;
    let mut ii = 1;
    while ii < last {
        if y[ii - 1] < y[ii] {
            let mut ahead = ii + 1;
            while ahead < last && y[ahead] == y[ii] {
                ahead += 1;
            }
            if y[ahead] < y[ii] {
                maxima.push((ii + ahead - 1) / 2);
                ii = ahead;
                continue;
            }
        }
        ii += 1;
    }
    maxima
}

fn prominence<E: Float>(y: &[E], peak: usize) -> E {
    let height = y[peak];
    let left_min = y[..peak]
        .iter()
        .rev()
        .take_while(|&&v| v <= height)
        .fold(height, |acc, &v| acc.min(v));
    let right_min = y[peak + 1..]
        .iter()
        .take_while(|&&v| v <= height)
        .fold(height, |acc, &v| acc.min(v));
    height - left_min.max(right_min)
}
