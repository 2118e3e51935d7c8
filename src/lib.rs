#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// #![warn(clippy::cargo)]

extern crate blas_src;

pub mod config;
mod error;
pub mod math;
pub mod peaks;
pub mod pipeline;
pub mod regression;
pub mod report;
pub mod resolve;
pub mod series;
pub mod spline;
pub mod table;

pub use config::Config;
pub use error::{Error, ErrorKind};
pub use pipeline::{Analysis, Fit, Pipeline};
pub use resolve::{DerivedQuantity, PhysicalFormula};
pub use series::Series;

pub type Result<T> = ::std::result::Result<T, Error>;
