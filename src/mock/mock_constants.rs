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

pub const PLANT_TEMPERATURE_AMBIENT: f64 = 23.0;

// Plate temperature change in degree Celsius per second at the full power.
pub const PLANT_PELTIER_RATE: f64 = 4.0;
// Heatsink temperature change in degree Celsius per second at the full power.
pub const PLANT_HEATSINK_RATE: f64 = 1.0;

// Ratio of the difference to the ambient lost per second.
pub const PLANT_LOSS_RATE: f64 = 0.02;
pub const PLANT_FAN_COOLING_RATE: f64 = 0.2;
