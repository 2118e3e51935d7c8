use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

use log::debug;
use num_traits::Float;
use serde::Serialize;

use crate::math::from_usize;
use crate::pipeline::Analysis;
use crate::series::Series;
use crate::{Error, Result};

/// Number of samples used to draw a fitted curve in the plot data
const FIT_SAMPLES: usize = 200;

/// A headed CSV table held as text, parsed column by column on request
#[derive(Clone, Debug)]
pub struct Table {
    headers: csv::StringRecord,
    records: Vec<csv::StringRecord>,
}

impl Table {
    /// Read a table from a CSV file whose first row names the columns
    ///
    /// # Errors
    /// Returns [`Error::Io`] if the file cannot be read and [`Error::Csv`] if it is malformed.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!("Reading {path:?}");
        let file = fs::read(path)?;
        Self::from_reader(&file[..])
    }

    /// # Errors
    /// Returns [`Error::Csv`] for malformed input.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = rdr.headers()?.clone();
        let records = rdr.records().collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { headers, records })
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.headers.iter()
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Parse every cell of the column `name`
    ///
    /// Rows are numbered from one, counting data rows only.
    ///
    /// # Errors
    /// - [`Error::MissingColumn`] when no header matches `name`
    /// - [`Error::Parse`] for the first empty, non-numeric or non-finite cell
    pub fn column<E: Float + FromStr>(&self, name: &str) -> Result<Vec<E>> {
        let position = self
            .headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| Error::MissingColumn {
                column: name.to_owned(),
            })?;

        self.records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let cell = record.get(position).unwrap_or_default();
                cell.parse::<E>()
                    .ok()
                    .filter(|value| value.is_finite())
                    .ok_or_else(|| Error::Parse {
                        row: index + 1,
                        column: name.to_owned(),
                        value: cell.to_owned(),
                    })
            })
            .collect()
    }

    /// The series formed by columns `x` and `y`
    ///
    /// # Errors
    /// As [`Table::column`].
    pub fn series<E: Float + FromStr>(&self, x: &str, y: &str) -> Result<Series<E>> {
        Series::new(self.column(x)?, self.column(y)?)
    }
}

#[derive(Serialize)]
struct PlotRow<'a, E> {
    series: &'a str,
    x: E,
    y: E,
}

/// Write the data behind the standard plot of an analysis
///
/// Each row is tagged `measured`, `smoothed`, `peak` or `fit`. The fitted curve is sampled at
/// uniformly spaced points across the regressed abscissae.
///
/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn write_plot_data<E: Float + Serialize>(path: &Path, analysis: &Analysis<E>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;

    for (x, y) in analysis.series.iter() {
        writer.serialize(PlotRow {
            series: "measured",
            x,
            y,
        })?;
    }
    if let Some(smoothed) = &analysis.smoothed {
        for (x, y) in smoothed.grid().iter() {
            writer.serialize(PlotRow {
                series: "smoothed",
                x,
                y,
            })?;
        }
    }
    if let Some(peaks) = &analysis.peaks {
        for peak in peaks.as_slice() {
            writer.serialize(PlotRow {
                series: "peak",
                x: peak.position,
                y: peak.value,
            })?;
        }
    }
    if let (Some(fit), Some((start, end))) = (
        &analysis.fit,
        analysis.regressed.as_ref().and_then(Series::x_range),
    ) {
        let step = (end - start) / from_usize(FIT_SAMPLES - 1);
        for ii in 0..FIT_SAMPLES {
            let x = start + step * from_usize(ii);
            writer.serialize(PlotRow {
                series: "fit",
                x,
                y: fit.evaluate(x),
            })?;
        }
    }

    writer.flush()?;
    debug!("Wrote plot data to {path:?}");
    Ok(())
}
