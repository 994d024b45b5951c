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

use log::{info, warn};
use serde_json::{json, Value};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    flag::register,
};
use std::error::Error;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::command::command_schema::CommandSchema;
use crate::config::Config;
use crate::control::thermal_element::TemperatureSnapshot;
use crate::control::thermal_plate::ThermalPlate;
use crate::control::thermal_plate_process::ThermalPlateProcess;
use crate::enums::PeltierId;
use crate::mock::mock_hardware::MockPlateHardware;
use crate::utility::{read_file_readings, write_file_powers, PowerRecord};

/// Target of the plate requested by the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateTarget {
    // Setpoint in degree Celsius.
    pub setpoint: f64,
    // Sample volume in uL.
    pub volume_ul: Option<f64>,
    // Hold time in second.
    pub hold_time: f64,
    // Ramp rate in degree Celsius per second.
    pub ramp_rate: f64,
}

impl PlateTarget {
    /// Get the command message of the target.
    ///
    /// # Returns
    /// Message of the set-plate-temperature command.
    pub fn get_command(&self) -> Value {
        let mut message = json!({
            "id": "cmd_setPlateTemperature",
            "sequence_id": 1,
            "setpoint": self.setpoint,
            "holdTime": self.hold_time,
            "rampRate": self.ramp_rate,
        });

        if let Some(volume_ul) = self.volume_ul {
            message["volume"] = json!(volume_ul);
        }

        message
    }
}

/// Run the application.
///
/// # Notes
/// The readings are replayed from the file when it is given. Otherwise, the
/// plate is simulated by the mock hardware for the duration.
///
/// # Arguments
/// * `config_file` - Configuration file.
/// * `readings_file` - File of the readings to replay.
/// * `duration` - Duration of the simulation in second.
/// * `output_file` - File of the output powers.
/// * `target` - Target of the plate.
///
/// # Returns
/// Error if a file can not be read or written, or the target is refused.
pub fn run(
    config_file: &Path,
    readings_file: Option<&Path>,
    duration: f64,
    output_file: &Path,
    target: &PlateTarget,
) -> Result<(), Box<dyn Error>> {
    let config = Config::from_file(config_file)?;
    info!("Configuration is read from {}.", config.filename);

    // Register the signals that stop the application
    let stop = Arc::new(AtomicBool::new(false));
    for signal in [SIGTERM, SIGINT].iter() {
        let _ = register(*signal, stop.clone());
    }

    let records = match readings_file {
        Some(filepath) => {
            info!("Replay the readings in {}.", filepath.display());
            let snapshots = read_file_readings(filepath)?;

            replay(&config, &snapshots, target, &stop)?
        }
        None => {
            info!("Simulate the thermal plate for {duration} seconds.");

            simulate(&config, duration, target, &stop)?
        }
    };

    write_file_powers(output_file, &records)?;
    info!(
        "{} records of the powers are written to {}.",
        records.len(),
        output_file.display()
    );

    Ok(())
}

/// Replay the snapshots of the readings.
///
/// # Arguments
/// * `config` - Configuration.
/// * `snapshots` - Snapshots to replay.
/// * `target` - Target of the plate. It is set after the first snapshot.
/// * `stop` - Stop the replay.
///
/// # Returns
/// Records of the outputs or the error if the target is refused.
pub fn replay(
    config: &Config,
    snapshots: &[TemperatureSnapshot],
    target: &PlateTarget,
    stop: &AtomicBool,
) -> Result<Vec<PowerRecord>, Box<dyn Error>> {
    let mut thermal_plate = ThermalPlate::new(config);
    let mut hardware = MockPlateHardware::new();
    let command_schema = ThermalPlateProcess::create_command_schema();

    let mut records = Vec::with_capacity(snapshots.len());
    for (idx, snapshot) in snapshots.iter().enumerate() {
        if stop.load(Ordering::Relaxed) {
            warn!("Replay is stopped at the snapshot {idx}.");
            break;
        }

        thermal_plate.handle_snapshot(snapshot, &mut hardware);
        if idx == 0 {
            set_target(&command_schema, &mut thermal_plate, &mut hardware, target)?;
        }

        log_events(&mut thermal_plate);
        records.push(get_power_record(&thermal_plate, &hardware));
    }

    Ok(records)
}

/// Simulate the plate with the thermal model of the mock hardware.
///
/// # Arguments
/// * `config` - Configuration.
/// * `duration` - Duration in second.
/// * `target` - Target of the plate. It is set after the first cycle.
/// * `stop` - Stop the simulation.
///
/// # Returns
/// Records of the outputs or the error if the target is refused.
pub fn simulate(
    config: &Config,
    duration: f64,
    target: &PlateTarget,
    stop: &AtomicBool,
) -> Result<Vec<PowerRecord>, Box<dyn Error>> {
    let mut thermal_plate = ThermalPlate::new(config);
    let mut hardware = MockPlateHardware::new();
    let command_schema = ThermalPlateProcess::create_command_schema();

    let period = config.control_period();
    let period_ms = (period * 1000.0).round() as u32;
    let cycles = (duration.max(0.0) / period).round() as u32;

    let mut records = Vec::with_capacity(cycles as usize);
    for cycle in 0..cycles {
        if stop.load(Ordering::Relaxed) {
            warn!("Simulation is stopped at the cycle {cycle}.");
            break;
        }

        let snapshot = hardware.get_snapshot(cycle.wrapping_mul(period_ms));
        thermal_plate.handle_snapshot(&snapshot, &mut hardware);
        if cycle == 0 {
            set_target(&command_schema, &mut thermal_plate, &mut hardware, target)?;
        }

        log_events(&mut thermal_plate);
        records.push(get_power_record(&thermal_plate, &hardware));

        hardware.step(period);
    }

    Ok(records)
}

/// Set the target of the plate through the command schema.
///
/// # Arguments
/// * `command_schema` - Command schema.
/// * `thermal_plate` - Thermal plate.
/// * `hardware` - Output drivers.
/// * `target` - Target of the plate.
///
/// # Returns
/// Error if the command fails.
fn set_target(
    command_schema: &CommandSchema,
    thermal_plate: &mut ThermalPlate,
    hardware: &mut MockPlateHardware,
    target: &PlateTarget,
) -> Result<(), Box<dyn Error>> {
    let result = command_schema.execute(&target.get_command(), Some(thermal_plate), Some(hardware));
    if result["id"] != "success" {
        return Err(format!("Target is refused: {:?}", target).into());
    }

    Ok(())
}

/// Log the queued events.
///
/// # Arguments
/// * `thermal_plate` - Thermal plate.
fn log_events(thermal_plate: &mut ThermalPlate) {
    for event in thermal_plate.event_queue.get_events_and_clear() {
        info!("Event: {event}.");
    }
}

/// Get the record of the outputs.
///
/// # Arguments
/// * `thermal_plate` - Thermal plate.
/// * `hardware` - Output drivers.
///
/// # Returns
/// Record of the outputs.
fn get_power_record(thermal_plate: &ThermalPlate, hardware: &MockPlateHardware) -> PowerRecord {
    let values = thermal_plate.get_thermal_power(hardware);

    PowerRecord {
        timestamp_ms: thermal_plate.telemetry.timestamp_ms,
        plate_temperature: thermal_plate.telemetry.plate_temperature,
        heatsink_temperature: thermal_plate.telemetry.heatsink_temperature,
        power_left: values.peltier_power(PeltierId::Left),
        power_right: values.peltier_power(PeltierId::Right),
        power_center: values.peltier_power(PeltierId::Center),
        power_fan: values.fan_power,
        status: String::from(thermal_plate.status().as_ref()),
    }
}
