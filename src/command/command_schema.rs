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

use crate::control::thermal_plate::ThermalPlate;
use crate::enums::CommandStatus;
use crate::interface::plate_hardware::PlateHardware;
use crate::utility::{acknowledge_command, get_message_name, get_message_sequence_id, is_command};

pub trait Command {
    /// Get the name of the command.
    ///
    /// # Returns
    /// Command name.
    fn name(&self) -> &str;

    /// Execute the command.
    ///
    /// # Arguments
    /// * `message` - Command message to execute.
    /// * `thermal_plate` - Thermal plate to execute the command.
    /// * `hardware` - Output drivers of the plate.
    ///
    /// # Returns
    /// Command execution result.
    fn execute(
        &self,
        message: &Value,
        thermal_plate: Option<&mut ThermalPlate>,
        hardware: Option<&mut dyn PlateHardware>,
    ) -> Option<()>;
}

pub struct CommandSchema {
    // List of commands.
    pub commands: Vec<Box<dyn Command + Send>>,
}

impl CommandSchema {
    /// Create a new command schema.
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    /// Add a command to the schema.
    pub fn add_command(&mut self, command: Box<dyn Command + Send>) {
        self.commands.push(command);
    }

    /// Execute a command.
    ///
    /// # Arguments
    /// * `message` - Command message to execute.
    /// * `thermal_plate` - Thermal plate to execute the command.
    /// * `hardware` - Output drivers of the plate.
    ///
    /// # Returns
    /// Acknowledgement of the command.
    pub fn execute(
        &self,
        message: &Value,
        thermal_plate: Option<&mut ThermalPlate>,
        hardware: Option<&mut dyn PlateHardware>,
    ) -> Value {
        let name = get_message_name(message);
        let sequence_id = get_message_sequence_id(message);

        if !is_command(&name) {
            error!("Not a command: {message}");

            return acknowledge_command(CommandStatus::Fail, sequence_id);
        }

        match self.commands.iter().find(|cmd| cmd.name() == name) {
            Some(cmd) => {
                let command_status = match cmd.execute(message, thermal_plate, hardware) {
                    Some(_) => CommandStatus::Success,
                    None => {
                        error!("Command execution failed: {message}");

                        CommandStatus::Fail
                    }
                };

                acknowledge_command(command_status, sequence_id)
            }
            None => {
                error!("Unknown command: {message}");

                acknowledge_command(CommandStatus::Fail, sequence_id)
            }
        }
    }

    /// Get the number of commands.
    ///
    /// # Returns
    /// Number of commands.
    pub fn number_of_commands(&self) -> usize {
        self.commands.len()
    }
}
