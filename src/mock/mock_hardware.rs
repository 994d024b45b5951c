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

use strum::IntoEnumIterator;

use crate::constants::NUM_PELTIER;
use crate::control::thermal_element::TemperatureSnapshot;
use crate::enums::{PeltierDirection, PeltierId};
use crate::interface::plate_hardware::PlateHardware;
use crate::mock::mock_constants::{
    PLANT_FAN_COOLING_RATE, PLANT_HEATSINK_RATE, PLANT_LOSS_RATE, PLANT_PELTIER_RATE,
    PLANT_TEMPERATURE_AMBIENT,
};

#[derive(Debug, Clone)]
pub struct MockPlateHardware {
    // Outputs are enabled or not.
    pub is_enabled: bool,
    // Direction and magnitude of each peltier ordered by PeltierId.
    pub peltiers: [(PeltierDirection, f64); NUM_PELTIER],
    pub fan: f64,
    // Reject the peltier drive to simulate a driver fault.
    pub fail_peltier: bool,
    // Reject the fan drive to simulate a driver fault.
    pub fail_fan: bool,
    // Simulated plate temperature in degree Celsius.
    pub plate_temperature: f64,
    // Simulated heatsink temperature in degree Celsius.
    pub heatsink_temperature: f64,
}

impl MockPlateHardware {
    /// Mock of the output drivers with a lumped thermal model of the plate.
    ///
    /// # Returns
    /// A new mock hardware at the ambient temperature.
    pub fn new() -> Self {
        Self {
            is_enabled: false,
            peltiers: [(PeltierDirection::Heating, 0.0); NUM_PELTIER],
            fan: 0.0,
            fail_peltier: false,
            fail_fan: false,
            plate_temperature: PLANT_TEMPERATURE_AMBIENT,
            heatsink_temperature: PLANT_TEMPERATURE_AMBIENT,
        }
    }

    /// Advance the thermal model.
    ///
    /// # Notes
    /// The heat pumped by the peltiers leaves the heatsink, and the fan
    /// pulls the heatsink back to the ambient.
    ///
    /// # Arguments
    /// * `time` - Time step in second.
    pub fn step(&mut self, time: f64) {
        let power = if self.is_enabled {
            PeltierId::iter()
                .map(|id| self.get_peltier_signed(id))
                .sum::<f64>()
                / (NUM_PELTIER as f64)
        } else {
            0.0
        };

        let loss_plate = (self.plate_temperature - PLANT_TEMPERATURE_AMBIENT) * PLANT_LOSS_RATE;
        self.plate_temperature += (power * PLANT_PELTIER_RATE - loss_plate) * time;

        let loss_heatsink = (self.heatsink_temperature - PLANT_TEMPERATURE_AMBIENT)
            * (PLANT_LOSS_RATE + self.fan * PLANT_FAN_COOLING_RATE);
        self.heatsink_temperature +=
            (power.abs() * PLANT_HEATSINK_RATE - loss_heatsink) * time;
    }

    /// Get the readings of the simulated plate.
    ///
    /// # Arguments
    /// * `timestamp_ms` - Timestamp in millisecond.
    ///
    /// # Returns
    /// Snapshot with the uniform plate temperature.
    pub fn get_snapshot(&self, timestamp_ms: u32) -> TemperatureSnapshot {
        TemperatureSnapshot::uniform(
            timestamp_ms,
            self.plate_temperature,
            self.heatsink_temperature,
        )
    }
}

impl PlateHardware for MockPlateHardware {
    fn set_enabled(&mut self, enabled: bool) {
        self.is_enabled = enabled;

        if !enabled {
            self.peltiers = [(PeltierDirection::Heating, 0.0); NUM_PELTIER];
            self.fan = 0.0;
        }
    }

    fn set_peltier(&mut self, id: PeltierId, power: f64, direction: PeltierDirection) -> bool {
        if self.fail_peltier || !(0.0..=1.0).contains(&power) {
            return false;
        }

        self.peltiers[id as usize] = (direction, power);

        true
    }

    fn get_peltier(&self, id: PeltierId) -> (PeltierDirection, f64) {
        self.peltiers[id as usize]
    }

    fn set_fan(&mut self, power: f64) -> bool {
        if self.fail_fan || !(0.0..=1.0).contains(&power) {
            return false;
        }

        self.fan = power;

        true
    }

    fn get_fan(&self) -> f64 {
        self.fan
    }
}
