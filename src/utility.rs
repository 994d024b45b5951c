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

use approx::assert_relative_eq;
use config::{Config, ConfigError, File};
use csv::{ReaderBuilder, WriterBuilder};
use serde::Serialize;
use serde_json::{json, Value};
use std::error::Error;
use std::path::Path;

use crate::constants::NUM_THERMISTOR;
use crate::control::thermal_element::{TemperatureSnapshot, ThermistorReading};
use crate::enums::CommandStatus;

/// Get the configuation from the file.
///
/// # Parameters
/// * `filepath` - Path to the config file.
///
/// # Returns
/// The configuration or the error if the file can not be read.
pub fn get_config(filepath: &Path) -> Result<Config, ConfigError> {
    Config::builder().add_source(File::from(filepath)).build()
}

/// Read the file of replayed thermistor readings.
///
/// # Notes
/// The file has a header row. Each following row is the timestamp in
/// millisecond and the temperatures in the order of `ThermistorId`. An empty
/// cell means the sensor is disconnected.
///
/// # Parameters
/// * `filepath` - Path to the readings file.
///
/// # Returns
/// Snapshots in the order of the file or the error if a row is invalid.
pub fn read_file_readings(filepath: &Path) -> Result<Vec<TemperatureSnapshot>, Box<dyn Error>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(filepath)?;

    let mut snapshots = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.len() != (NUM_THERMISTOR + 1) {
            return Err(format!(
                "Row {:?} should have {} columns instead of {}",
                record.position().map(|position| position.line()),
                NUM_THERMISTOR + 1,
                record.len()
            )
            .into());
        }

        let timestamp_ms = record[0].parse::<u32>()?;

        let mut readings = [ThermistorReading::OutOfRangeLow; NUM_THERMISTOR];
        for (reading, cell) in readings.iter_mut().zip(record.iter().skip(1)) {
            if !cell.is_empty() {
                *reading = ThermistorReading::Temperature(cell.parse::<f64>()?);
            }
        }

        snapshots.push(TemperatureSnapshot {
            timestamp_ms: timestamp_ms,
            readings: readings,
            adc: [0; NUM_THERMISTOR],
        });
    }

    Ok(snapshots)
}

/// One row of the output file of the powers.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PowerRecord {
    pub timestamp_ms: u32,
    pub plate_temperature: f64,
    pub heatsink_temperature: f64,
    pub power_left: f64,
    pub power_right: f64,
    pub power_center: f64,
    pub power_fan: f64,
    pub status: String,
}

/// Write the powers to a file.
///
/// # Parameters
/// * `filepath` - Path to the output file.
/// * `records` - Records to write.
///
/// # Returns
/// Result of the writing.
pub fn write_file_powers(filepath: &Path, records: &[PowerRecord]) -> Result<(), csv::Error> {
    let mut writer = WriterBuilder::new().has_headers(true).from_path(filepath)?;
    for record in records {
        writer.serialize(record)?;
    }

    writer.flush()?;

    Ok(())
}

/// Assert that two vectors are equal within a relative tolerance.
///
/// # Parameters
/// * `v1` - First vector.
/// * `v2` - Second vector.
/// * `epsilon` - Relative tolerance.
///
/// # Panics
/// If the two vectors are not equal within the relative tolerance.
pub fn assert_relative_eq_vector(v1: &[f64], v2: &[f64], epsilon: f64) {
    assert_eq!(v1.len(), v2.len());
    for (a, b) in v1.iter().zip(v2.iter()) {
        assert_relative_eq!(a, b, epsilon = epsilon);
    }
}

/// Check if the message is a command.
///
/// # Arguments
/// * `name` - Name of the message.
///
/// # Returns
/// True if the message is a command, false otherwise.
pub fn is_command(name: &str) -> bool {
    name.starts_with("cmd_")
}

/// Acknowledge the command.
///
/// # Arguments
/// * `command_status` - Command status.
/// * `sequence_id` - Sequence ID.
///
/// # Returns
/// Acknowledged command.
pub fn acknowledge_command(command_status: CommandStatus, sequence_id: i64) -> Value {
    json!({"id": command_status.as_ref().to_lowercase(), "sequence_id": sequence_id})
}

/// Get the message name.
///
/// # Arguments
/// * `message` - Message that should have the "id" field.
///
/// # Returns
/// Message name. Return an empty string if the name is not found.
pub fn get_message_name(message: &Value) -> String {
    match message["id"].as_str() {
        Some(id) => String::from(id),
        None => String::new(),
    }
}

/// Get the message sequence ID.
///
/// # Arguments
/// * `message` - Message.
///
/// # Returns
/// Message sequence ID. Return -1 if the sequence ID is not found.
pub fn get_message_sequence_id(message: &Value) -> i64 {
    match message["sequence_id"].as_i64() {
        Some(sequence_id) => sequence_id,
        None => -1,
    }
}

/// Get the elapsed time between two timestamps of the readings.
///
/// # Arguments
/// * `timestamp_ms` - Current timestamp in millisecond.
/// * `last_timestamp_ms` - Last timestamp in millisecond.
///
/// # Returns
/// Elapsed time in second. The timestamp is allowed to wrap around.
pub fn get_elapsed_time(timestamp_ms: u32, last_timestamp_ms: u32) -> f64 {
    (timestamp_ms.wrapping_sub(last_timestamp_ms) as f64) / 1000.0
}
