use thiserror::Error;

/// Broad classes of failure, used by callers deciding whether to abort a run or substitute a
/// fallback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Too few points, mismatched columns or non-monotonic abscissae
    InputShape,
    /// Zero variance, singular or rank-deficient fits
    NumericDegeneracy,
    /// Fewer peaks survived filtering than the caller requires
    ThresholdMismatch,
    /// Too few repeated estimates for a standard deviation
    SampleSize,
    Parse,
    Io,
    Configuration,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("column `{column}` is missing from the table")]
    MissingColumn { column: String },
    #[error("row {row}, column `{column}`: `{value}` is not a number")]
    Parse {
        row: usize,
        column: String,
        value: String,
    },
    #[error("x has {x} values but y has {y}")]
    LengthMismatch { x: usize, y: usize },
    #[error("value at index {index} is not finite")]
    NonFinite { index: usize },
    #[error("the derived {0} is not finite")]
    NonFiniteResult(&'static str),
    #[error("at least {required} points are required, got {actual}")]
    TooFewPoints { required: usize, actual: usize },
    #[error("x values must be strictly increasing, repeated abscissa at index {index}")]
    DuplicateAbscissa { index: usize },
    #[error("at least {required} distinct x values are required, got {distinct}")]
    DegenerateInput { required: usize, distinct: usize },
    #[error("the fit is singular: the abscissae carry no variance")]
    SingularFit,
    #[error("a degree {degree} polynomial cannot be fit through {points} points")]
    UnderdeterminedFit { points: usize, degree: usize },
    #[error("the ordinate has zero variance, goodness of fit is undefined")]
    DegenerateVariance,
    #[error("at least {required} peaks are required, found {found}")]
    InsufficientPeaks { required: usize, found: usize },
    #[error("at least {required} repeated estimates are required, found {found}")]
    InsufficientSamples { required: usize, found: usize },
    #[error("division by zero at index {index}")]
    DivisionByZero { index: usize },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("linear algebra failure: {0}")]
    Linalg(#[from] ndarray_linalg::error::LinalgError),
}

impl Error {
    pub fn invalid_parameter<S: Into<String>>(message: S) -> Self {
        Self::InvalidParameter(message.into())
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::Csv(_) | Self::Parse { .. } | Self::MissingColumn { .. } => ErrorKind::Parse,
            Self::Toml(_) | Self::InvalidParameter(_) => ErrorKind::Configuration,
            Self::LengthMismatch { .. }
            | Self::NonFinite { .. }
            | Self::TooFewPoints { .. }
            | Self::DuplicateAbscissa { .. }
            | Self::DegenerateInput { .. }
            | Self::UnderdeterminedFit { .. } => ErrorKind::InputShape,
            Self::SingularFit
            | Self::DegenerateVariance
            | Self::DivisionByZero { .. }
            | Self::NonFiniteResult(_)
            | Self::Linalg(_) => ErrorKind::NumericDegeneracy,
            Self::InsufficientPeaks { .. } => ErrorKind::ThresholdMismatch,
            Self::InsufficientSamples { .. } => ErrorKind::SampleSize,
        }
    }
}
