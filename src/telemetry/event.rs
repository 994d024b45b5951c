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

use serde_json::{json, Value};

use crate::control::plate_control::PlateControlValues;
use crate::enums::{ErrorCode, PlateState};

pub struct Event;
impl Event {
    /// Get the message of the plate temperature.
    ///
    /// # Arguments
    /// * `current` - Average plate temperature in degree Celsius.
    /// * `setpoint` - Setpoint in degree Celsius. 0 if not controlling.
    /// * `hold_time` - Remaining and total hold time in second.
    /// * `at_target` - The plate is holding at the target or not.
    ///
    /// # Returns
    /// The message of the plate temperature.
    pub fn get_message_plate_temperature(
        current: f64,
        setpoint: f64,
        hold_time: (f64, f64),
        at_target: bool,
    ) -> Value {
        json!({
            "id": "plateTemperature",
            "current": current,
            "setpoint": setpoint,
            "holdTimeRemaining": hold_time.0,
            "holdTimeTotal": hold_time.1,
            "atTarget": at_target,
        })
    }

    /// Get the message of the thermal power. The peltier powers are signed
    /// with the positive value as heating.
    ///
    /// # Arguments
    /// * `values` - Powers of the peltiers and the fan.
    ///
    /// # Returns
    /// The message of the thermal power.
    pub fn get_message_thermal_power(values: &PlateControlValues) -> Value {
        json!({
            "id": "thermalPower",
            "left": values.left_power,
            "right": values.right_power,
            "center": values.center_power,
            "fans": values.fan_power,
        })
    }

    /// Get the message of the plate state.
    ///
    /// # Arguments
    /// * `state` - Plate state.
    ///
    /// # Returns
    /// The message of the plate state.
    pub fn get_message_plate_status(state: PlateState) -> Value {
        json!({
            "id": "plateStatus",
            "state": state.as_ref(),
        })
    }

    /// Get the message of the error state.
    ///
    /// # Arguments
    /// * `error` - Most relevant error.
    ///
    /// # Returns
    /// The message of the error state.
    pub fn get_message_error_state(error: ErrorCode) -> Value {
        json!({
            "id": "errorState",
            "code": error.code(),
            "name": error.as_ref(),
        })
    }

    /// Get the message that the fan is in the manual control or not.
    ///
    /// # Arguments
    /// * `is_manual` - The fan is in the manual control or not.
    ///
    /// # Returns
    /// The message of the fan control.
    pub fn get_message_fan_manual_control(is_manual: bool) -> Value {
        json!({
            "id": "fanManualControl",
            "manual": is_manual,
        })
    }
}
