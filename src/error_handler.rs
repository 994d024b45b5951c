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

use log::{error, info};

use crate::control::thermal_element::Thermistor;
use crate::enums::{BitEnum, ErrorCode, FaultBit};

pub struct ErrorHandler {
    // Summary of the faults status. Each bit is a FaultBit.
    pub summary_faults_status: u16,
}

impl ErrorHandler {
    /// Create a new error handler.
    ///
    /// # Returns
    /// A new error handler.
    pub fn new() -> Self {
        Self {
            summary_faults_status: 0,
        }
    }

    /// Clear the faults latched by the control. The thermistor faults follow
    /// the readings and are kept.
    pub fn clear_latched(&mut self) {
        for bit in [FaultBit::Peltier, FaultBit::Fan, FaultBit::Drift] {
            self.clear_error(bit);
        }

        info!(
            "Clear the latched faults. Summary: {:#X}.",
            self.summary_faults_status
        );
    }

    /// Add a fault to the summary faults status.
    ///
    /// # Arguments
    /// * `bit` - Fault bit.
    pub fn add_error(&mut self, bit: FaultBit) {
        if self.has_error(bit) {
            return;
        }

        error!("Detected the fault: {:?}.", bit);

        self.summary_faults_status |= bit.bit_value();
    }

    /// Check if there is a specific fault.
    ///
    /// # Arguments
    /// * `bit` - Fault bit.
    pub fn has_error(&self, bit: FaultBit) -> bool {
        (self.summary_faults_status & bit.bit_value()) != 0
    }

    /// Clear a fault from the summary faults status.
    ///
    /// # Arguments
    /// * `bit` - Fault bit.
    pub fn clear_error(&mut self, bit: FaultBit) {
        if self.has_error(bit) {
            info!("Fault is cleared: {:?}.", bit);

            self.summary_faults_status &= !bit.bit_value();
        }
    }

    /// Check if there is any fault.
    ///
    /// # Returns
    /// True if there is any fault. Otherwise, False.
    pub fn has_fault(&self) -> bool {
        self.summary_faults_status != 0
    }

    /// Update the fault of a thermistor from its current error.
    ///
    /// # Arguments
    /// * `thermistor` - Thermistor.
    pub fn update_thermistor(&mut self, thermistor: &Thermistor) {
        if thermistor.has_error() {
            self.add_error(thermistor.error_bit());
        } else {
            self.clear_error(thermistor.error_bit());
        }
    }

    /// Get the single error that sums up the current faults. The output
    /// errors are prioritized over the sensors, and the sensors are
    /// prioritized over the drift that they may cause.
    ///
    /// # Arguments
    /// * `thermistors` - Thermistors in the order of ThermistorId.
    ///
    /// # Returns
    /// Most relevant error.
    pub fn most_relevant_error(&self, thermistors: &[Thermistor]) -> ErrorCode {
        if self.has_error(FaultBit::Peltier) {
            return ErrorCode::ThermalPeltierError;
        }
        if self.has_error(FaultBit::Fan) {
            return ErrorCode::ThermalHeatsinkFanError;
        }

        if let Some(thermistor) = thermistors
            .iter()
            .find(|thermistor| self.has_error(thermistor.error_bit()))
        {
            return thermistor.error;
        }

        if self.has_error(FaultBit::Drift) {
            return ErrorCode::ThermalDrift;
        }

        ErrorCode::NoError
    }
}
