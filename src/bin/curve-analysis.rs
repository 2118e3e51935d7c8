use std::path::{Path, PathBuf};

use log::info;

use curve_analysis::report::render;
use curve_analysis::table::{write_plot_data, Table};
use curve_analysis::{Config, Pipeline};

const USAGE: &str = "usage: curve-analysis <config.toml> <input.csv> <output-prefix>";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let [config_path, input_path, prefix] = args.as_slice() else {
        return Err(USAGE.into());
    };

    let config = Config::<f64>::from_file(Path::new(config_path))?;
    let table = Table::from_path(Path::new(input_path))?;
    info!("Read {} rows from {input_path}", table.len());
    let series = table.series(&config.table.x_column, &config.table.y_column)?;

    let formula = config.quantity.formula();
    let label = config
        .quantity
        .label
        .clone()
        .unwrap_or_else(|| format!("{} against {}", config.table.y_column, config.table.x_column));
    let analysis = Pipeline::new(config)?.run(&series, &formula)?;

    let report = render(&analysis, &label);
    let report_path = PathBuf::from(format!("{prefix}_report.txt"));
    std::fs::write(&report_path, format!("{report}\n"))?;
    info!("Wrote report to {report_path:?}");

    write_plot_data(&PathBuf::from(format!("{prefix}_plot.csv")), &analysis)?;

    println!("{report}");
    Ok(())
}
