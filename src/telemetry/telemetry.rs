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

use serde_json::Value;

use crate::telemetry::telemetry_thermal_plate::TelemetryThermalPlate;

/// Output of one cycle of the thermal plate process.
pub struct Telemetry {
    // Telemetry of the thermal plate.
    pub thermal_plate: Option<TelemetryThermalPlate>,
    // Acknowledgement of the executed command.
    pub command_result: Option<Value>,
    // Events to publish.
    pub events: Option<Vec<Value>>,
}

impl Telemetry {
    /// Create a new telemetry object.
    ///
    /// # Arguments
    /// * `thermal_plate` - Telemetry of the thermal plate.
    /// * `command_result` - Command execution result.
    /// * `events` - Events to publish.
    ///
    /// # Returns
    /// A new telemetry object.
    pub fn new(
        thermal_plate: Option<TelemetryThermalPlate>,
        command_result: Option<Value>,
        events: Option<Vec<Value>>,
    ) -> Self {
        Self {
            thermal_plate: thermal_plate,
            command_result: command_result,
            events: events,
        }
    }
}
