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

//! # Thermal Plate Control
//!
//! This library is the thermal control of the sample plate of a
//! thermocycler. Three peltiers pump the heat between the plate and a
//! heatsink that is cooled by a fan, and the plate follows the requested
//! temperature profile with the overshoot, the hold time, and the fault
//! handling of the readings.
pub mod application;
pub mod command;
pub mod config;
pub mod constants;
pub mod control;
pub mod enums;
pub mod error_handler;
pub mod event_queue;
pub mod interface;
pub mod mock;
pub mod telemetry;
pub mod utility;
