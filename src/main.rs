use std::error::Error;
use std::fs::File;
use std::io;
use std::path::PathBuf;

use clap::Parser;
use nalgebra::Vector2;

use estimation::config::{ModelConfig, ReplayConfig};
use estimation::data::{read_measurements, write_estimates};
use estimation::filter::replay;
use estimation::models::{LinearMeasurement, LinearProcess, RangeBearing};

/// Runs an extended Kalman filter over a measurement log and prints the estimates as CSV.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON file with the model choice and the filter's initial estimate and noise
    config: PathBuf,
    /// CSV file with one measurement per row
    measurements: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();
    let config = ReplayConfig::from_file(&args.config)?;
    let log = File::open(&args.measurements)?;

    match config.model {
        ModelConfig::RandomWalk => {
            let mut ekf = config.filter.build::<1, 1>(
                Box::new(LinearProcess::<f64, 1>::identity()),
                Box::new(LinearMeasurement::<f64, 1, 1>::identity()),
            )?;
            let measurements = read_measurements::<_, 1>(log)?;
            let estimates = replay(&mut ekf, &measurements);
            write_estimates(io::stdout().lock(), &estimates)?;
        }
        ModelConfig::ConstantVelocityRangeBearing { dt, beacon } => {
            let mut ekf = config.filter.build::<4, 2>(
                Box::new(LinearProcess::constant_velocity(dt)),
                Box::new(RangeBearing::new(Vector2::new(beacon[0], beacon[1]))),
            )?;
            let measurements = read_measurements::<_, 2>(log)?;
            let estimates = replay(&mut ekf, &measurements);
            write_estimates(io::stdout().lock(), &estimates)?;
        }
    }
    Ok(())
}
