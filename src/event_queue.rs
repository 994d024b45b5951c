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

use crate::utility::get_message_name;

/// Events of the thermal plate waiting to be published with the next
/// telemetry.
pub struct EventQueue {
    _events: Vec<Value>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            _events: Vec::new(),
        }
    }

    /// There are events to publish or not.
    pub fn has_event(&self) -> bool {
        !self._events.is_empty()
    }

    /// Add an event. The message should have the "id" field.
    pub fn add_event(&mut self, event: Value) {
        self._events.push(event);
    }

    /// Get the latest queued event with a specific name.
    ///
    /// # Arguments
    /// * `name` - Name of the event.
    ///
    /// # Returns
    /// Latest event or None if there is no such event.
    pub fn get_latest_event(&self, name: &str) -> Option<&Value> {
        self._events
            .iter()
            .rev()
            .find(|event| get_message_name(event) == name)
    }

    /// Take all the queued events.
    ///
    /// # Returns
    /// Events in the order they were added.
    pub fn get_events_and_clear(&mut self) -> Vec<Value> {
        std::mem::take(&mut self._events)
    }
}
