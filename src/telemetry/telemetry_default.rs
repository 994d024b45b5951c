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
use std::collections::HashMap;

pub trait TelemetryDefault {
    /// Initialize a dictionary with the same value for all keys.
    ///
    /// # Arguments
    /// * `keys` - A list of keys.
    /// * `value` - The value to be assigned to all keys.
    ///
    /// # Returns
    /// A dictionary with the same value for all keys.
    fn initialize_dict_value<T: Clone>(keys: &[&str], value: T) -> HashMap<String, T> {
        keys.iter()
            .map(|key| (String::from(*key), value.clone()))
            .collect()
    }

    /// Round a vector to a specific digit.
    ///
    /// # Arguments
    /// * `vector` - The vector to be rounded.
    /// * `digit` - The number of digits after the decimal point.
    ///
    /// # Returns
    /// The rounded vector.
    fn round_vector(&self, vector: &[f64], digit: i32) -> Vec<f64> {
        vector
            .iter()
            .map(|value| self.round(*value, digit))
            .collect()
    }

    /// Round a value to a specific digit.
    ///
    /// # Arguments
    /// * `value` - The value to be rounded.
    /// * `digit` - The number of digits after the decimal point.
    ///
    /// # Returns
    /// The rounded value.
    fn round(&self, value: f64, digit: i32) -> f64 {
        let normalized = 10.0_f64.powi(digit);
        (value * normalized).round() / normalized
    }

    /// Get the telemetry messages.
    ///
    /// # Arguments
    /// * `digit` - The number of digits after the decimal point.
    ///
    /// # Returns
    /// The messages.
    fn get_messages(&self, digit: i32) -> Vec<Value>;
}
