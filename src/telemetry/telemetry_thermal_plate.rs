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

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::constants::NUM_THERMISTOR;
use crate::telemetry::telemetry_default::TelemetryDefault;

const KEYS_ELEMENT: [&str; 4] = ["left", "right", "center", "fan"];

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct TelemetryThermalPlate {
    // Timestamp of the last readings in millisecond.
    pub timestamp_ms: u32,
    // Thermistor temperatures ordered by ThermistorId in degree Celsius.
    pub thermistors: Vec<f64>,
    // Raw ADC counts ordered by ThermistorId.
    pub adc: Vec<u16>,
    // Average plate temperature in degree Celsius.
    pub plate_temperature: f64,
    // Heatsink temperature in degree Celsius.
    pub heatsink_temperature: f64,
    // Setpoint of the user in degree Celsius.
    pub setpoint: f64,
    // Setpoint after the overshoot or undershoot in degree Celsius.
    pub current_setpoint: f64,
    // Targets of the peltiers and the fan in degree Celsius.
    pub targets: HashMap<String, f64>,
    // Signed powers of the peltiers and the power of the fan.
    pub powers: HashMap<String, f64>,
    pub is_fan_manual: bool,
    // Status of the task.
    pub status: String,
    // Status of the plate state machine.
    pub plate_status: String,
    pub summary_faults_status: u16,
    // Cycle time in second.
    pub cycle_time: f64,
}

impl TelemetryDefault for TelemetryThermalPlate {
    fn get_messages(&self, digit: i32) -> Vec<Value> {
        vec![
            self.get_message_thermistors(digit),
            self.get_message_plate(digit),
            self.get_message_powers(digit),
        ]
    }
}

impl TelemetryThermalPlate {
    /// Create a new thermal plate telemetry object.
    pub fn new() -> Self {
        Self {
            timestamp_ms: 0,
            thermistors: vec![0.0; NUM_THERMISTOR],
            adc: vec![0; NUM_THERMISTOR],
            plate_temperature: 0.0,
            heatsink_temperature: 0.0,
            setpoint: 0.0,
            current_setpoint: 0.0,
            targets: Self::initialize_dict_value(&KEYS_ELEMENT, 0.0),
            powers: Self::initialize_dict_value(&KEYS_ELEMENT, 0.0),
            is_fan_manual: false,
            status: String::new(),
            plate_status: String::new(),
            summary_faults_status: 0,
            cycle_time: 0.0,
        }
    }

    /// Get the message of the thermistors.
    ///
    /// # Arguments
    /// * `digit` - The number of digits after the decimal point.
    ///
    /// # Returns
    /// The message of the thermistors.
    fn get_message_thermistors(&self, digit: i32) -> Value {
        json!({
            "id": "thermistors",
            "timestamp": self.timestamp_ms,
            "temperature": self.round_vector(&self.thermistors, digit),
            "adc": self.adc,
        })
    }

    /// Get the message of the plate.
    ///
    /// # Arguments
    /// * `digit` - The number of digits after the decimal point.
    ///
    /// # Returns
    /// The message of the plate.
    fn get_message_plate(&self, digit: i32) -> Value {
        json!({
            "id": "plate",
            "status": self.status,
            "plateStatus": self.plate_status,
            "plateTemperature": self.round(self.plate_temperature, digit),
            "heatsinkTemperature": self.round(self.heatsink_temperature, digit),
            "setpoint": self.round(self.setpoint, digit),
            "currentSetpoint": self.round(self.current_setpoint, digit),
            "faults": self.summary_faults_status,
            "cycleTime": self.round(self.cycle_time, digit),
        })
    }

    /// Get the message of the powers and targets.
    ///
    /// # Arguments
    /// * `digit` - The number of digits after the decimal point.
    ///
    /// # Returns
    /// The message of the powers and targets.
    fn get_message_powers(&self, digit: i32) -> Value {
        let mut powers = serde_json::Map::new();
        let mut targets = serde_json::Map::new();
        for key in KEYS_ELEMENT {
            powers.insert(String::from(key), json!(self.round(self.powers[key], digit)));
            targets.insert(String::from(key), json!(self.round(self.targets[key], digit)));
        }

        json!({
            "id": "thermalElements",
            "power": powers,
            "target": targets,
            "fanManual": self.is_fan_manual,
        })
    }
}
