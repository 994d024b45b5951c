// This file is part of run_thermal_plate.
//
// See the COPYRIGHT file at the top-level directory of this distribution
// for details of code ownership.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use clap::{value_parser, Arg, Command};
use log::{error, info};
use simplelog::{
    format_description, ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, TermLogger,
    TerminalMode, WriteLogger,
};
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use run_thermal_plate::application::{self, PlateTarget};

fn main() -> ExitCode {
    // Parse the command line arguments
    let matches = Command::new("thermal plate")
        .about("Thermal plate control of the thermocycler.")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Configuration file")
                .default_value("config/parameters_plate.yaml")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("readings")
                .short('r')
                .long("readings")
                .help("CSV file of the readings to replay. The plate is simulated if not given.")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("duration")
                .long("duration")
                .help("Duration of the simulation in second")
                .default_value("60")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("setpoint")
                .short('s')
                .long("setpoint")
                .help("Setpoint in degree Celsius. A value <= 0 deactivates the plate.")
                .required(true)
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("volume")
                .short('v')
                .long("volume")
                .help("Sample volume in uL. The configured default is used if not given.")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("hold")
                .long("hold-time")
                .help("Hold time in second. 0 holds forever.")
                .default_value("0")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("ramp")
                .long("ramp-rate")
                .help("Ramp rate in degree Celsius per second. 0 is the maximum rate.")
                .default_value("0")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("CSV file of the output powers")
                .default_value("powers.csv")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("level")
                .short('l')
                .long("log-level")
                .help("Log level: 0 (Off), 1 (Error), 2 (Warn), 3 (Info), 4 (Debug), 5 (Trace)")
                .default_value("3")
                .value_parser(value_parser!(u32)),
        )
        .get_matches();

    // Check the log filter
    let log_filter = get_log_filter(matches.get_one::<u32>("level"));

    // Initiate the logger
    initiate_logger(log_filter, "application.log");
    info!("Log level: {log_filter}.");

    let target = PlateTarget {
        setpoint: matches.get_one::<f64>("setpoint").copied().unwrap_or(0.0),
        volume_ul: matches.get_one::<f64>("volume").copied(),
        hold_time: matches.get_one::<f64>("hold").copied().unwrap_or(0.0),
        ramp_rate: matches.get_one::<f64>("ramp").copied().unwrap_or(0.0),
    };

    let default_config = PathBuf::from("config/parameters_plate.yaml");
    let default_output = PathBuf::from("powers.csv");

    // Run the application
    let result = application::run(
        matches.get_one::<PathBuf>("config").unwrap_or(&default_config),
        matches.get_one::<PathBuf>("readings").map(|path| path.as_path()),
        matches.get_one::<f64>("duration").copied().unwrap_or(60.0),
        matches.get_one::<PathBuf>("output").unwrap_or(&default_output),
        &target,
    );

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Thermal plate failed: {err}.");

            ExitCode::FAILURE
        }
    }
}

/// Get the log filter.
///
/// # Arguments
/// * `log_level` - Log level.
///
/// # Returns
/// Log filter.
fn get_log_filter(log_level: Option<&u32>) -> LevelFilter {
    match log_level {
        Some(level) => match level {
            0 => LevelFilter::Off,
            1 => LevelFilter::Error,
            2 => LevelFilter::Warn,
            3 => LevelFilter::Info,
            4 => LevelFilter::Debug,
            5 => LevelFilter::Trace,
            _ => LevelFilter::Info,
        },
        None => LevelFilter::Info,
    }
}

/// Initiate the logger.
///
/// # Arguments
/// * `level` - Log level.
/// * `filepath` - Log file path.
fn initiate_logger(level: LevelFilter, filepath: &str) {
    let config = ConfigBuilder::new()
        .set_time_format_custom(format_description!(
            "[year]/[month]/[day] [hour]:[minute]:[second].[subsecond]"
        ))
        .build();

    // Log to the terminal
    let logger_terminal = TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );

    // Log to the file
    match File::create(filepath) {
        Ok(file) => {
            let logger_file = WriteLogger::new(level, config, file);
            let _ = CombinedLogger::init(vec![logger_terminal, logger_file]);
        }
        Err(error) => {
            eprintln!("Failed to create the log file: {error}.");
            let _ = CombinedLogger::init(vec![logger_terminal]);
        }
    }
}
