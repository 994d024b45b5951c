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

// Full swing of the power from -100% to +100%.
const FULL_SWING: f64 = 2.0;
// Time to allow the full swing in second.
const FULL_SWING_TIME: f64 = 0.1;

/// Maximum change of the power per second.
pub const MAX_DELTA: f64 = FULL_SWING / FULL_SWING_TIME;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeltierFilter {
    _last: f64,
}

impl PeltierFilter {
    /// Rate limiter of the peltier power.
    ///
    /// # Returns
    /// A new PeltierFilter object.
    pub fn new() -> Self {
        Self { _last: 0.0 }
    }

    /// Reset the remembered power. Call this when the channel is disabled.
    pub fn reset(&mut self) {
        self._last = 0.0;
    }

    /// Filter the power.
    ///
    /// # Arguments
    /// * `power` - Desired power.
    /// * `delta_sec` - Time since the last call in second.
    ///
    /// # Returns
    /// Power whose change from the last output is at most
    /// MAX_DELTA * delta_sec.
    pub fn set_filtered(&mut self, power: f64, delta_sec: f64) -> f64 {
        let max_step = MAX_DELTA * delta_sec.max(0.0);
        self._last = power.clamp(self._last - max_step, self._last + max_step);

        self._last
    }

    /// Get the last output.
    ///
    /// # Returns
    /// Last filtered power.
    pub fn get_last(&self) -> f64 {
        self._last
    }
}
