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

use crate::enums::{PeltierDirection, PeltierId};

/// Output drivers of the thermal plate.
pub trait PlateHardware {
    /// Enable or disable all the outputs.
    ///
    /// # Arguments
    /// * `enabled` - Enable the outputs or not.
    fn set_enabled(&mut self, enabled: bool);

    /// Drive a peltier.
    ///
    /// # Arguments
    /// * `id` - Peltier ID.
    /// * `power` - Magnitude of the power in [0, 1].
    /// * `direction` - Heating or cooling.
    ///
    /// # Returns
    /// True if the driver accepted the power. Otherwise, false.
    fn set_peltier(&mut self, id: PeltierId, power: f64, direction: PeltierDirection) -> bool;

    /// Get the last drive of a peltier.
    ///
    /// # Arguments
    /// * `id` - Peltier ID.
    ///
    /// # Returns
    /// Direction and magnitude of the power.
    fn get_peltier(&self, id: PeltierId) -> (PeltierDirection, f64);

    /// Drive the heatsink fan.
    ///
    /// # Arguments
    /// * `power` - Power in [0, 1].
    ///
    /// # Returns
    /// True if the driver accepted the power. Otherwise, false.
    fn set_fan(&mut self, power: f64) -> bool;

    /// Get the last power of the heatsink fan.
    fn get_fan(&self) -> f64;

    /// Get the signed power of a peltier. The positive value is heating.
    ///
    /// # Arguments
    /// * `id` - Peltier ID.
    ///
    /// # Returns
    /// Signed power in [-1, 1].
    fn get_peltier_signed(&self, id: PeltierId) -> f64 {
        let (direction, power) = self.get_peltier(id);
        match direction {
            PeltierDirection::Heating => power,
            PeltierDirection::Cooling => -power,
        }
    }
}
