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

use log::{debug, info};
use serde_json::Value;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::{sync_channel, Receiver, SyncSender},
    Arc,
};
use std::thread::sleep;
use std::time::{Duration, Instant};

use crate::command::{
    command_schema::CommandSchema,
    command_thermal_plate::{
        CommandClearErrors, CommandDeactivatePlate, CommandGetPlateTemperature,
        CommandGetThermalPower, CommandSetFanAutomatic, CommandSetFanManual,
        CommandSetPidConstants, CommandSetPlateTemperature,
    },
};
use crate::config::Config;
use crate::constants::BOUND_SYNC_CHANNEL;
use crate::control::thermal_element::TemperatureSnapshot;
use crate::control::thermal_plate::ThermalPlate;
use crate::interface::plate_hardware::PlateHardware;
use crate::telemetry::telemetry::Telemetry;

pub struct ThermalPlateProcess {
    // Thermal plate
    pub thermal_plate: ThermalPlate,
    // Command schema
    _command_schema: CommandSchema,
    // Output drivers of the plate.
    _hardware: Box<dyn PlateHardware + Send>,
    // Sender of the telemetry to the caller.
    _sender_telemetry: SyncSender<Telemetry>,
    // Sender and receiver of the commands.
    _sender_command: SyncSender<Value>,
    _receiver_command: Receiver<Value>,
    // Sender and receiver of the snapshots of the readings.
    _sender_snapshot: SyncSender<TemperatureSnapshot>,
    _receiver_snapshot: Receiver<TemperatureSnapshot>,
    // Stop the loop.
    _stop: Arc<AtomicBool>,
}

impl ThermalPlateProcess {
    /// Create a new instance of the thermal plate process.
    ///
    /// # Arguments
    /// * `config` - The configuration.
    /// * `hardware` - Output drivers of the plate.
    /// * `sender_telemetry` - The sender of the telemetry.
    /// * `stop` - An Arc instance that holds the AtomicBool instance to stop
    /// the loop.
    ///
    /// # Returns
    /// New instance of the thermal plate process.
    pub fn new(
        config: &Config,
        hardware: Box<dyn PlateHardware + Send>,
        sender_telemetry: &SyncSender<Telemetry>,
        stop: &Arc<AtomicBool>,
    ) -> Self {
        let (sender_command, receiver_command) = sync_channel(BOUND_SYNC_CHANNEL);
        let (sender_snapshot, receiver_snapshot) = sync_channel(BOUND_SYNC_CHANNEL);

        Self {
            thermal_plate: ThermalPlate::new(config),

            _command_schema: Self::create_command_schema(),

            _hardware: hardware,

            _sender_telemetry: sender_telemetry.clone(),

            _sender_command: sender_command,
            _receiver_command: receiver_command,

            _sender_snapshot: sender_snapshot,
            _receiver_snapshot: receiver_snapshot,

            _stop: stop.clone(),
        }
    }

    /// Create the command schema.
    ///
    /// # Returns
    /// Command schema.
    pub fn create_command_schema() -> CommandSchema {
        let mut command_schema = CommandSchema::new();
        command_schema.add_command(Box::new(CommandSetPlateTemperature));
        command_schema.add_command(Box::new(CommandGetPlateTemperature));
        command_schema.add_command(Box::new(CommandDeactivatePlate));
        command_schema.add_command(Box::new(CommandSetFanManual));
        command_schema.add_command(Box::new(CommandSetFanAutomatic));
        command_schema.add_command(Box::new(CommandSetPidConstants));
        command_schema.add_command(Box::new(CommandGetThermalPower));
        command_schema.add_command(Box::new(CommandClearErrors));

        command_schema
    }

    /// Get the sender of the commands.
    pub fn get_sender_command(&self) -> SyncSender<Value> {
        self._sender_command.clone()
    }

    /// Get the sender of the snapshots.
    pub fn get_sender_snapshot(&self) -> SyncSender<TemperatureSnapshot> {
        self._sender_snapshot.clone()
    }

    /// Get the newest snapshot and drop the older ones.
    ///
    /// # Returns
    /// Newest snapshot if there is any.
    fn get_newest_snapshot(&self) -> Option<TemperatureSnapshot> {
        let mut newest = None;
        while let Ok(snapshot) = self._receiver_snapshot.try_recv() {
            newest = Some(snapshot);
        }

        newest
    }

    /// Run one iteration of the process.
    ///
    /// # Arguments
    /// * `now` - Start time of the iteration.
    ///
    /// # Returns
    /// Telemetry of the iteration if a command or a snapshot was handled.
    fn step(&mut self, now: Instant) -> Option<Telemetry> {
        // At most one command in a cycle.
        let command_result = match self._receiver_command.try_recv() {
            Ok(message) => {
                let hardware: &mut dyn PlateHardware = self._hardware.as_mut();
                Some(self._command_schema.execute(
                    &message,
                    Some(&mut self.thermal_plate),
                    Some(hardware),
                ))
            }
            Err(_) => None,
        };

        let snapshot = self.get_newest_snapshot();
        if let Some(snapshot) = &snapshot {
            let hardware: &mut dyn PlateHardware = self._hardware.as_mut();
            self.thermal_plate.handle_snapshot(snapshot, hardware);
        }

        if command_result.is_none() && snapshot.is_none() {
            return None;
        }

        let mut telemetry = self.thermal_plate.telemetry.clone();
        telemetry.cycle_time = now.elapsed().as_secs_f64();

        let events = if self.thermal_plate.event_queue.has_event() {
            Some(self.thermal_plate.event_queue.get_events_and_clear())
        } else {
            None
        };

        Some(Telemetry::new(Some(telemetry), command_result, events))
    }

    /// Run the thermal plate process.
    pub fn run(&mut self) {
        info!("Thermal plate process is running.");

        let period = (1000.0 / self.thermal_plate.config.control_frequency) as u64;
        while !self._stop.load(Ordering::Relaxed) {
            // Time the cycle
            let now = Instant::now();

            // Send the telemetry and ignore the error.
            if let Some(telemetry) = self.step(now) {
                if let Err(error) = self._sender_telemetry.try_send(telemetry) {
                    debug!("Telemetry is dropped: {error}.");
                }
            }

            // Sleep with the remaining time
            let cycle_time = now.elapsed().as_millis() as u64;
            if period > cycle_time {
                sleep(Duration::from_millis(period - cycle_time));
            }
        }

        let hardware: &mut dyn PlateHardware = self._hardware.as_mut();
        hardware.set_enabled(false);

        info!("Thermal plate process is stopped.");
    }
}
