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

pub const NUM_PELTIER: usize = 3;
pub const NUM_THERMISTOR_PER_PELTIER: usize = 2;
pub const NUM_PLATE_THERMISTOR: usize = NUM_PELTIER * NUM_THERMISTOR_PER_PELTIER;

// Plate thermistors plus the heatsink.
pub const NUM_THERMISTOR: usize = NUM_PLATE_THERMISTOR + 1;

// Windup limits of the integrator for every PID loop on the plate.
pub const PID_WINDUP_LIMIT_HIGH: f64 = 1.0;
pub const PID_WINDUP_LIMIT_LOW: f64 = -1.0;

// This ramp rate makes the ramped target become the target immediately.
pub const RAMP_INFINITE: f64 = 0.0;
// This hold time means there is no timer for holding.
pub const HOLD_INFINITE: f64 = 0.0;

pub const BOUND_SYNC_CHANNEL: usize = 100;
