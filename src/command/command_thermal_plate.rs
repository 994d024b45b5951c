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

use log::error;
use serde_json::Value;

use crate::command::command_schema::Command;
use crate::config::PidGains;
use crate::constants::{HOLD_INFINITE, RAMP_INFINITE};
use crate::control::thermal_plate::ThermalPlate;
use crate::enums::{ErrorCode, PidSelection};
use crate::interface::plate_hardware::PlateHardware;
use crate::telemetry::event::Event;

/// Log the error code of a refused command.
///
/// # Arguments
/// * `result` - Result of the command.
///
/// # Returns
/// Some if the command succeeded. Otherwise, None.
fn check_result(result: Result<(), ErrorCode>) -> Option<()> {
    match result {
        Ok(()) => Some(()),
        Err(error) => {
            error!("Command is refused: {} ({}).", error.as_ref(), error.code());

            None
        }
    }
}

/// Command to set the plate temperature.
pub struct CommandSetPlateTemperature;
impl Command for CommandSetPlateTemperature {
    fn name(&self) -> &str {
        "cmd_setPlateTemperature"
    }

    fn execute(
        &self,
        message: &Value,
        thermal_plate: Option<&mut ThermalPlate>,
        hardware: Option<&mut dyn PlateHardware>,
    ) -> Option<()> {
        let setpoint = message["setpoint"].as_f64()?;
        let volume_ul = message["volume"].as_f64();
        let hold_time = message["holdTime"].as_f64().unwrap_or(HOLD_INFINITE);
        let ramp_rate = message["rampRate"].as_f64().unwrap_or(RAMP_INFINITE);

        let plate = thermal_plate?;
        check_result(plate.set_plate_temperature(
            hardware?,
            setpoint,
            volume_ul,
            hold_time,
            ramp_rate,
        ))
    }
}

/// Command to publish the plate temperature.
pub struct CommandGetPlateTemperature;
impl Command for CommandGetPlateTemperature {
    fn name(&self) -> &str {
        "cmd_getPlateTemperature"
    }

    fn execute(
        &self,
        _message: &Value,
        thermal_plate: Option<&mut ThermalPlate>,
        _hardware: Option<&mut dyn PlateHardware>,
    ) -> Option<()> {
        thermal_plate?.get_plate_temperature();

        Some(())
    }
}

/// Command to deactivate the plate.
pub struct CommandDeactivatePlate;
impl Command for CommandDeactivatePlate {
    fn name(&self) -> &str {
        "cmd_deactivatePlate"
    }

    fn execute(
        &self,
        message: &Value,
        thermal_plate: Option<&mut ThermalPlate>,
        hardware: Option<&mut dyn PlateHardware>,
    ) -> Option<()> {
        let from_system = message["fromSystem"].as_bool().unwrap_or(false);

        check_result(thermal_plate?.deactivate(hardware?, from_system))
    }
}

/// Command to control the fan manually.
pub struct CommandSetFanManual;
impl Command for CommandSetFanManual {
    fn name(&self) -> &str {
        "cmd_setFanManual"
    }

    fn execute(
        &self,
        message: &Value,
        thermal_plate: Option<&mut ThermalPlate>,
        hardware: Option<&mut dyn PlateHardware>,
    ) -> Option<()> {
        let power = message["power"].as_f64()?;

        check_result(thermal_plate?.set_fan_manual(hardware?, power))
    }
}

/// Command to return the fan to the automatic control.
pub struct CommandSetFanAutomatic;
impl Command for CommandSetFanAutomatic {
    fn name(&self) -> &str {
        "cmd_setFanAutomatic"
    }

    fn execute(
        &self,
        _message: &Value,
        thermal_plate: Option<&mut ThermalPlate>,
        hardware: Option<&mut dyn PlateHardware>,
    ) -> Option<()> {
        check_result(thermal_plate?.set_fan_automatic(hardware?))
    }
}

/// Command to set the PID constants of the peltiers or the fan.
pub struct CommandSetPidConstants;
impl Command for CommandSetPidConstants {
    fn name(&self) -> &str {
        "cmd_setPidConstants"
    }

    fn execute(
        &self,
        message: &Value,
        thermal_plate: Option<&mut ThermalPlate>,
        _hardware: Option<&mut dyn PlateHardware>,
    ) -> Option<()> {
        let selection = PidSelection::from_name(message["selection"].as_str()?)?;
        let gains = PidGains::new(
            message["p"].as_f64()?,
            message["i"].as_f64()?,
            message["d"].as_f64()?,
        );

        check_result(thermal_plate?.set_pid_constants(selection, gains))
    }
}

/// Command to publish the thermal power.
pub struct CommandGetThermalPower;
impl Command for CommandGetThermalPower {
    fn name(&self) -> &str {
        "cmd_getThermalPower"
    }

    fn execute(
        &self,
        _message: &Value,
        thermal_plate: Option<&mut ThermalPlate>,
        hardware: Option<&mut dyn PlateHardware>,
    ) -> Option<()> {
        let plate = thermal_plate?;
        let values = plate.get_thermal_power(hardware?);
        plate
            .event_queue
            .add_event(Event::get_message_thermal_power(&values));

        Some(())
    }
}

/// Command to clear the latched errors.
pub struct CommandClearErrors;
impl Command for CommandClearErrors {
    fn name(&self) -> &str {
        "cmd_clearErrors"
    }

    fn execute(
        &self,
        _message: &Value,
        thermal_plate: Option<&mut ThermalPlate>,
        hardware: Option<&mut dyn PlateHardware>,
    ) -> Option<()> {
        thermal_plate?.clear_errors(hardware?);

        Some(())
    }
}
