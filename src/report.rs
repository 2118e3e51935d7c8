//! Plain-text summary of an [`Analysis`]
use std::fmt;

use num_traits::Float;

use crate::pipeline::{Analysis, Fit};

/// Digits after the decimal point for fit parameters
const PRECISION: usize = 4;

/// Qualitative grade of a fit's coefficient of determination
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Excellent,
    Good,
    Fair,
}

impl Verdict {
    pub fn from_r_squared<E: Float>(r_squared: E) -> Self {
        let r_squared = r_squared.to_f64().unwrap_or(f64::NAN);
        if r_squared > 0.9 {
            Self::Excellent
        } else if r_squared > 0.8 {
            Self::Good
        } else {
            Self::Fair
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Excellent => write!(f, "excellent"),
            Self::Good => write!(f, "good"),
            Self::Fair => write!(f, "fair"),
        }
    }
}

pub struct Report<'a, E> {
    analysis: &'a Analysis<E>,
    label: &'a str,
}

impl<'a, E> Report<'a, E> {
    pub const fn new(analysis: &'a Analysis<E>, label: &'a str) -> Self {
        Self { analysis, label }
    }
}

impl<E: Float + fmt::Display> fmt::Display for Report<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let analysis = self.analysis;
        writeln!(f, "{}", self.label)?;
        writeln!(f, "samples: {}", analysis.series.len())?;
        if let Some(smoothed) = &analysis.smoothed {
            writeln!(f, "smoothed onto {} grid points", smoothed.grid().len())?;
        }

        if let Some(peaks) = &analysis.peaks {
            writeln!(f, "peaks: {}", peaks.len())?;
            for peak in peaks.as_slice() {
                writeln!(
                    f,
                    "  rank {}: x = {:.*}, y = {:.*}",
                    peak.rank, PRECISION, peak.position, PRECISION, peak.value
                )?;
            }
        }

        if let Some(fit) = &analysis.fit {
            match fit {
                Fit::Linear(line) => {
                    writeln!(f, "linear fit over {} points", line.points)?;
                    writeln!(f, "  slope: {:.*}", PRECISION, line.slope)?;
                    writeln!(f, "  intercept: {:.*}", PRECISION, line.intercept)?;
                    writeln!(f, "  standard error: {:.*}", PRECISION, line.std_err)?;
                }
                Fit::Polynomial(polynomial) => {
                    writeln!(f, "degree {} polynomial fit", polynomial.degree())?;
                    for (power, coefficient) in polynomial.coefficients.iter().enumerate() {
                        writeln!(f, "  x^{power}: {:.*}", PRECISION, coefficient)?;
                    }
                }
            }
            let r_squared = fit.r_squared();
            writeln!(
                f,
                "  r^2: {:.*} ({})",
                PRECISION,
                r_squared,
                Verdict::from_r_squared(r_squared)
            )?;
        }

        write!(f, "result: {:.*}", PRECISION, analysis.quantity)
    }
}

/// Render `analysis` as a text report titled `label`
pub fn render<E: Float + fmt::Display>(analysis: &Analysis<E>, label: &str) -> String {
    Report::new(analysis, label).to_string()
}

#[cfg(test)]
mod tests {
    use super::{render, Verdict};
    use crate::config::{
        Config, PeakConfig, QuantityConfig, RegressionConfig, RepeatSource, TableConfig,
        UncertaintyConfig,
    };
    use crate::pipeline::Pipeline;
    use crate::resolve::{Scaled, UncertaintyRule};
    use crate::series::Series;
    use crate::Result;

    fn config() -> Config<f64> {
        Config {
            table: TableConfig {
                x_column: "U".into(),
                y_column: "I".into(),
            },
            smoothing: None,
            peaks: None,
            regression: Some(RegressionConfig::default()),
            uncertainty: UncertaintyConfig::default(),
            quantity: QuantityConfig {
                factor: 1.0,
                unit: "mA/V".into(),
                label: None,
            },
        }
    }

    #[test]
    fn verdicts_follow_the_coefficient_of_determination() {
        assert_eq!(Verdict::from_r_squared(0.95), Verdict::Excellent);
        assert_eq!(Verdict::from_r_squared(0.9), Verdict::Good);
        assert_eq!(Verdict::from_r_squared(0.85_f32), Verdict::Good);
        assert_eq!(Verdict::from_r_squared(0.8), Verdict::Fair);
        assert_eq!(Verdict::from_r_squared(f64::NAN), Verdict::Fair);
    }

    #[test]
    fn linear_report_lists_the_fit_and_result() -> Result<()> {
        let series = Series::new(vec![1.0, 2.0, 3.0, 4.0], vec![2.0, 4.0, 6.0, 8.0])?;
        let analysis = Pipeline::new(config())?.run(&series, &Scaled::new(1.0, "mA/V"))?;
        let report = render(&analysis, "Ohmic conductor");

        let lines = report.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "Ohmic conductor");
        assert_eq!(lines[1], "samples: 4");
        assert!(report.contains("  slope: 2.0000"));
        assert!(report.contains("  r^2: 1.0000 (excellent)"));
        assert_eq!(lines.last(), Some(&"result: (2.0000 ± 0.0000) mA/V"));
        Ok(())
    }

    #[test]
    fn peak_report_lists_ranks() -> Result<()> {
        let mut config = config();
        config.regression = None;
        config.peaks = Some(PeakConfig {
            prominence: 1.0,
            min_height: None,
            min_count: 2,
        });
        config.uncertainty = UncertaintyConfig {
            rule: UncertaintyRule::SampleStatistics,
            source: RepeatSource::PeakSpacings,
        };
        let series = Series::new(
            vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            vec![0.0, 5.0, 0.0, 7.0, 0.0, 6.0, 0.0],
        )?;
        let analysis = Pipeline::new(config)?.run(&series, &Scaled::new(1.0, "V"))?;
        let report = render(&analysis, "Franck-Hertz");

        assert!(report.contains("peaks: 3"));
        assert!(report.contains("  rank 2: x = 1.0000, y = 5.0000"));
        assert!(report.contains("  rank 0: x = 3.0000, y = 7.0000"));
        assert!(report.contains("  rank 1: x = 5.0000, y = 6.0000"));
        assert!(!report.contains("r^2"));
        assert!(report.ends_with("result: (2.0000 ± 0.0000) V"));
        Ok(())
    }
}
