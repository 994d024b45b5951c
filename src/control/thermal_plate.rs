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

use log::{error, info, warn};
use strum::IntoEnumIterator;

use crate::config::{Config, PidGains};
use crate::control::plate_control::{PlateControl, PlateControlValues};
use crate::control::thermal_element::{TemperatureSnapshot, ThermalSystem};
use crate::enums::{
    ErrorCode, FaultBit, PeltierDirection, PeltierId, PidSelection, PlateState, PlateStatus,
    SystemStatus,
};
use crate::error_handler::ErrorHandler;
use crate::event_queue::EventQueue;
use crate::interface::plate_hardware::PlateHardware;
use crate::telemetry::event::Event;
use crate::telemetry::telemetry_thermal_plate::TelemetryThermalPlate;
use crate::utility::get_elapsed_time;

pub struct ThermalPlate {
    // Configuration.
    pub config: Config,
    // Thermistors, peltiers, and the heatsink fan.
    pub system: ThermalSystem,
    pub plate_control: PlateControl,
    pub error_handler: ErrorHandler,
    // Events to publish.
    pub event_queue: EventQueue,
    pub telemetry: TelemetryThermalPlate,
    _status: SystemStatus,
    // Timestamp of the last handled snapshot in millisecond.
    _last_timestamp_ms: Option<u32>,
    // Last published states.
    _plate_state: PlateState,
    _error: ErrorCode,
    _is_fan_manual: bool,
}

impl ThermalPlate {
    /// Thermal plate task that connects the readings, the plate control, and
    /// the output drivers.
    ///
    /// # Arguments
    /// * `config` - Configuration.
    ///
    /// # Returns
    /// A new ThermalPlate object in the idle status.
    pub fn new(config: &Config) -> Self {
        let mut event_queue = EventQueue::new();
        event_queue.add_event(Event::get_message_plate_status(PlateState::Idle));
        event_queue.add_event(Event::get_message_error_state(ErrorCode::NoError));

        Self {
            config: config.clone(),
            system: ThermalSystem::new(config),
            plate_control: PlateControl::new(config.plate_control.clone()),
            error_handler: ErrorHandler::new(),
            event_queue: event_queue,
            telemetry: TelemetryThermalPlate::new(),
            _status: SystemStatus::Idle,
            _last_timestamp_ms: None,
            _plate_state: PlateState::Idle,
            _error: ErrorCode::NoError,
            _is_fan_manual: false,
        }
    }

    pub fn status(&self) -> SystemStatus {
        self._status
    }

    /// Get the most relevant error of the current faults.
    pub fn get_error(&self) -> ErrorCode {
        self.error_handler
            .most_relevant_error(&self.system.thermistors)
    }

    /// Handle a new snapshot of the readings and run one control cycle.
    ///
    /// # Arguments
    /// * `snapshot` - Complete snapshot of the readings.
    /// * `hardware` - Output drivers.
    pub fn handle_snapshot(
        &mut self,
        snapshot: &TemperatureSnapshot,
        hardware: &mut dyn PlateHardware,
    ) {
        let time = match self._last_timestamp_ms {
            Some(last_timestamp_ms) => get_elapsed_time(snapshot.timestamp_ms, last_timestamp_ms),
            None => self.config.control_period(),
        };

        for id in self.system.apply_snapshot(snapshot) {
            self.error_handler
                .update_thermistor(self.system.thermistor(id));
        }

        if (self._status == SystemStatus::Controlling)
            && (self.plate_control.status() == PlateStatus::SteadyState)
        {
            if let Err(error) = self.plate_control.thermistor_drift_check(&self.system) {
                warn!("Thermistor drift check failed: {:?}.", error);
                self.error_handler.add_error(FaultBit::Drift);
            }
        }

        self.update_status_from_faults(hardware);

        match self._status {
            SystemStatus::Controlling => self.run_control(hardware, time),
            SystemStatus::Idle => self.run_idle_fan(hardware),
            SystemStatus::Error => self.disable_outputs(hardware),
        }

        // The hardware may have failed in this cycle
        self.update_status_from_faults(hardware);

        self._last_timestamp_ms = Some(snapshot.timestamp_ms);

        self.update_events();
        self.update_telemetry(hardware);
    }

    /// Follow the faults: any fault goes to the error status, and clearing
    /// all of them returns to the idle status.
    ///
    /// # Arguments
    /// * `hardware` - Output drivers.
    fn update_status_from_faults(&mut self, hardware: &mut dyn PlateHardware) {
        if self.error_handler.has_fault() {
            if self._status != SystemStatus::Error {
                self.transition_status(SystemStatus::Error);
                self.disable_outputs(hardware);
            }
        } else if self._status == SystemStatus::Error {
            self.transition_status(SystemStatus::Idle);
        }
    }

    /// Run the plate control and drive the outputs.
    ///
    /// # Arguments
    /// * `hardware` - Output drivers.
    /// * `time` - Time since the last cycle in second.
    fn run_control(&mut self, hardware: &mut dyn PlateHardware, time: f64) {
        let values = match self.plate_control.update_control(&mut self.system, time) {
            Some(values) => values,
            None => {
                error!("Plate control has no valid power. Stop the peltiers.");
                self.error_handler.add_error(FaultBit::Peltier);
                return;
            }
        };

        hardware.set_enabled(true);

        for id in PeltierId::iter() {
            let power = values.peltier_power(id);
            let direction = if power < 0.0 {
                PeltierDirection::Cooling
            } else {
                PeltierDirection::Heating
            };

            if !hardware.set_peltier(id, power.abs().clamp(0.0, 1.0), direction) {
                error!("Failed to drive the {} peltier.", id.as_ref());
                self.error_handler.add_error(FaultBit::Peltier);
                return;
            }
        }

        if !self.system.fan.manual_control && !hardware.set_fan(values.fan_power) {
            error!("Failed to drive the heatsink fan.");
            self.error_handler.add_error(FaultBit::Fan);
        }
    }

    /// Protect the heatsink when the plate is not controlled.
    ///
    /// # Arguments
    /// * `hardware` - Output drivers.
    fn run_idle_fan(&mut self, hardware: &mut dyn PlateHardware) {
        let power = self.plate_control.fan_idle_power(&mut self.system);
        if !self.system.fan.manual_control && !hardware.set_fan(power) {
            error!("Failed to drive the heatsink fan.");
            self.error_handler.add_error(FaultBit::Fan);
        }
    }

    /// Disable all the outputs and reset the peltier filters.
    ///
    /// # Arguments
    /// * `hardware` - Output drivers.
    fn disable_outputs(&mut self, hardware: &mut dyn PlateHardware) {
        hardware.set_enabled(false);
        self.system.reset_peltier_filters();
    }

    /// Transition the status.
    ///
    /// # Arguments
    /// * `status` - New status.
    fn transition_status(&mut self, status: SystemStatus) {
        if self._status != status {
            info!(
                "Thermal plate status: {} -> {}.",
                self._status.as_ref(),
                status.as_ref()
            );
            self._status = status;
        }
    }

    /// Get the state of the plate shown to the user.
    ///
    /// # Returns
    /// Plate state.
    pub fn get_plate_state(&self) -> PlateState {
        if self._status != SystemStatus::Controlling {
            return PlateState::Idle;
        }

        let is_ramping = !matches!(
            self.plate_control.status(),
            PlateStatus::Overshoot | PlateStatus::SteadyState
        );
        let is_hot = self.plate_control.setpoint() > self.config.plate_control.temperature_ambient;

        match (is_ramping, is_hot) {
            (true, true) => PlateState::Heating,
            (true, false) => PlateState::Cooling,
            (false, true) => PlateState::AtHotTemp,
            (false, false) => PlateState::AtColdTemp,
        }
    }

    /// Queue the events of the states that changed.
    fn update_events(&mut self) {
        let plate_state = self.get_plate_state();
        if plate_state != self._plate_state {
            self._plate_state = plate_state;
            self.event_queue
                .add_event(Event::get_message_plate_status(plate_state));
        }

        let error = self.get_error();
        if error != self._error {
            self._error = error;
            self.event_queue
                .add_event(Event::get_message_error_state(error));
        }

        let is_fan_manual = self.system.fan.manual_control;
        if is_fan_manual != self._is_fan_manual {
            self._is_fan_manual = is_fan_manual;
            self.event_queue
                .add_event(Event::get_message_fan_manual_control(is_fan_manual));
        }
    }

    /// Update the telemetry.
    ///
    /// # Arguments
    /// * `hardware` - Output drivers.
    fn update_telemetry(&mut self, hardware: &dyn PlateHardware) {
        let telemetry = &mut self.telemetry;

        if let Some(timestamp_ms) = self._last_timestamp_ms {
            telemetry.timestamp_ms = timestamp_ms;
        }

        telemetry.thermistors = self
            .system
            .thermistors
            .iter()
            .map(|thermistor| thermistor.temp_c)
            .collect();
        telemetry.adc = self
            .system
            .thermistors
            .iter()
            .map(|thermistor| thermistor.last_adc)
            .collect();

        telemetry.plate_temperature = self.plate_control.plate_temp(&self.system);
        telemetry.heatsink_temperature = self.system.fan.current_temp(&self.system.thermistors);
        telemetry.setpoint = if self._status == SystemStatus::Controlling {
            self.plate_control.setpoint()
        } else {
            0.0
        };
        telemetry.current_setpoint = self.plate_control.current_setpoint();

        for peltier in &self.system.peltiers {
            let key = peltier.id().as_ref().to_lowercase();
            telemetry.targets.insert(key.clone(), peltier.temp_target);
            telemetry
                .powers
                .insert(key, hardware.get_peltier_signed(peltier.id()));
        }
        telemetry
            .targets
            .insert(String::from("fan"), self.system.fan.temp_target);
        telemetry
            .powers
            .insert(String::from("fan"), hardware.get_fan());

        telemetry.is_fan_manual = self.system.fan.manual_control;
        telemetry.status = String::from(self._status.as_ref());
        telemetry.plate_status = String::from(self.plate_control.status().as_ref());
        telemetry.summary_faults_status = self.error_handler.summary_faults_status;
    }

    /// Refuse the command in the error status.
    ///
    /// # Returns
    /// Most relevant error if in the error status.
    fn check_no_error(&self) -> Result<(), ErrorCode> {
        if self._status == SystemStatus::Error {
            let error = self.get_error();
            warn!("Command is refused in the error status: {:?}.", error);

            return Err(error);
        }

        Ok(())
    }

    /// Set the plate temperature.
    ///
    /// # Arguments
    /// * `hardware` - Output drivers.
    /// * `setpoint` - Setpoint in degree Celsius. A value <= 0 deactivates
    /// the plate.
    /// * `volume_ul` - Sample volume in uL. None or a negative value uses the
    /// default volume.
    /// * `hold_time` - Hold time in second.
    /// * `ramp_rate` - Ramp rate in degree Celsius per second.
    ///
    /// # Returns
    /// Result of the command. A negative hold time or ramp rate is a bad
    /// target.
    pub fn set_plate_temperature(
        &mut self,
        hardware: &mut dyn PlateHardware,
        setpoint: f64,
        volume_ul: Option<f64>,
        hold_time: f64,
        ramp_rate: f64,
    ) -> Result<(), ErrorCode> {
        self.check_no_error()?;

        if setpoint <= 0.0 {
            return self.deactivate(hardware, false);
        }

        if !setpoint.is_finite() || (hold_time < 0.0) || (ramp_rate < 0.0) {
            return Err(ErrorCode::ThermalTargetBad);
        }

        let volume_ul = match volume_ul {
            Some(volume) if volume >= 0.0 => volume,
            _ => self.config.default_volume_ul,
        };

        if !self.plate_control.set_new_target(
            &mut self.system,
            setpoint,
            volume_ul,
            hold_time,
            ramp_rate,
        ) {
            return Err(ErrorCode::ThermalTargetBad);
        }

        self.transition_status(SystemStatus::Controlling);
        self.update_events();

        Ok(())
    }

    /// Publish the plate temperature.
    pub fn get_plate_temperature(&mut self) {
        let setpoint = if self._status == SystemStatus::Controlling {
            self.plate_control.setpoint()
        } else {
            0.0
        };

        self.event_queue
            .add_event(Event::get_message_plate_temperature(
                self.plate_control.plate_temp(&self.system),
                setpoint,
                self.plate_control.get_hold_time(),
                self.plate_control.temp_within_setpoint(&self.system),
            ));
    }

    /// Deactivate the plate.
    ///
    /// # Arguments
    /// * `hardware` - Output drivers.
    /// * `from_system` - Request from the system itself. This is allowed in
    /// the error status.
    ///
    /// # Returns
    /// Result of the command.
    pub fn deactivate(
        &mut self,
        hardware: &mut dyn PlateHardware,
        from_system: bool,
    ) -> Result<(), ErrorCode> {
        if !from_system {
            self.check_no_error()?;
        }

        self.disable_outputs(hardware);

        if self._status != SystemStatus::Error {
            self.transition_status(SystemStatus::Idle);
        }
        self.update_events();

        Ok(())
    }

    /// Control the fan manually.
    ///
    /// # Arguments
    /// * `hardware` - Output drivers.
    /// * `power` - Fan power in [0, 1]. The manual control is released when
    /// the power is 0.
    ///
    /// # Returns
    /// Result of the command.
    pub fn set_fan_manual(
        &mut self,
        hardware: &mut dyn PlateHardware,
        power: f64,
    ) -> Result<(), ErrorCode> {
        self.check_no_error()?;

        if !hardware.set_fan(power) {
            return Err(ErrorCode::ThermalHeatsinkFanError);
        }

        self.system.fan.manual_control = power > 0.0;
        self.update_events();

        Ok(())
    }

    /// Return the fan to the automatic control.
    ///
    /// # Arguments
    /// * `hardware` - Output drivers.
    ///
    /// # Returns
    /// Result of the command.
    pub fn set_fan_automatic(&mut self, hardware: &mut dyn PlateHardware) -> Result<(), ErrorCode> {
        self.check_no_error()?;

        if (self._status == SystemStatus::Idle) && !hardware.set_fan(0.0) {
            return Err(ErrorCode::ThermalHeatsinkFanError);
        }

        self.system.fan.manual_control = false;
        self.update_events();

        Ok(())
    }

    /// Replace the PID constants.
    ///
    /// # Arguments
    /// * `selection` - PID loops to replace.
    /// * `gains` - New gains.
    ///
    /// # Returns
    /// Result of the command.
    pub fn set_pid_constants(
        &mut self,
        selection: PidSelection,
        gains: PidGains,
    ) -> Result<(), ErrorCode> {
        if self._status == SystemStatus::Controlling {
            return Err(ErrorCode::ThermalPlateBusy);
        }

        if !self.config.pid_limits.contains(&gains) {
            return Err(ErrorCode::ThermalConstantOutOfRange);
        }

        let pid = ThermalSystem::create_pid(&gains, self.config.control_period());
        match selection {
            PidSelection::Fans => {
                self.system.fan.pid = pid;
                self.config.pid_fan = gains;
            }
            PidSelection::Peltiers => {
                for peltier in self.system.peltiers.iter_mut() {
                    peltier.pid = pid.clone();
                }
                self.config.pid_peltier = gains;
            }
        }

        info!("New PID constants of the {}: {:?}.", selection.as_ref(), gains);

        Ok(())
    }

    /// Get the thermal power.
    ///
    /// # Arguments
    /// * `hardware` - Output drivers.
    ///
    /// # Returns
    /// Signed powers of the peltiers and the power of the fan.
    pub fn get_thermal_power(&self, hardware: &dyn PlateHardware) -> PlateControlValues {
        PlateControlValues {
            left_power: hardware.get_peltier_signed(PeltierId::Left),
            right_power: hardware.get_peltier_signed(PeltierId::Right),
            center_power: hardware.get_peltier_signed(PeltierId::Center),
            fan_power: hardware.get_fan(),
        }
    }

    /// Clear the latched faults. The thermistor faults stay until the
    /// readings recover.
    ///
    /// # Arguments
    /// * `hardware` - Output drivers.
    pub fn clear_errors(&mut self, hardware: &mut dyn PlateHardware) {
        self.error_handler.clear_latched();
        self.update_status_from_faults(hardware);
        self.update_events();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::{json, Value};

    use crate::constants::{HOLD_INFINITE, RAMP_INFINITE};
    use crate::control::thermal_element::ThermistorReading;
    use crate::enums::ThermistorId;
    use crate::mock::mock_hardware::MockPlateHardware;

    const PERIOD_MS: u32 = 50;
    const ROOM_TEMP: f64 = 23.0;
    const HOT_TEMP: f64 = 90.0;
    const COLD_TEMP: f64 = 4.0;

    fn create_thermal_plate() -> (ThermalPlate, MockPlateHardware) {
        let mut thermal_plate = ThermalPlate::new(&Config::default());
        let mut hardware = MockPlateHardware::new();

        thermal_plate.handle_snapshot(
            &TemperatureSnapshot::uniform(0, ROOM_TEMP, ROOM_TEMP),
            &mut hardware,
        );
        thermal_plate.event_queue.get_events_and_clear();

        (thermal_plate, hardware)
    }

    fn run_cycles(
        thermal_plate: &mut ThermalPlate,
        hardware: &mut MockPlateHardware,
        start_ms: u32,
        cycles: u32,
        plate_temp: f64,
        heatsink_temp: f64,
    ) -> u32 {
        let mut timestamp_ms = start_ms;
        for _ in 0..cycles {
            timestamp_ms = timestamp_ms.wrapping_add(PERIOD_MS);
            thermal_plate.handle_snapshot(
                &TemperatureSnapshot::uniform(timestamp_ms, plate_temp, heatsink_temp),
                hardware,
            );
        }

        timestamp_ms
    }

    fn get_events(thermal_plate: &mut ThermalPlate, name: &str) -> Vec<Value> {
        thermal_plate
            .event_queue
            .get_events_and_clear()
            .into_iter()
            .filter(|event| event["id"] == name)
            .collect()
    }

    #[test]
    fn test_new() {
        let mut thermal_plate = ThermalPlate::new(&Config::default());

        assert_eq!(thermal_plate.status(), SystemStatus::Idle);
        assert_eq!(thermal_plate.get_plate_state(), PlateState::Idle);
        assert_eq!(thermal_plate.get_error(), ErrorCode::NoError);

        let events = thermal_plate.event_queue.get_events_and_clear();
        assert_eq!(events[0], json!({"id": "plateStatus", "state": "Idle"}));
        assert_eq!(events[1]["id"], "errorState");
    }

    #[test]
    fn test_set_plate_temperature_heat() {
        let (mut thermal_plate, mut hardware) = create_thermal_plate();

        assert_eq!(
            thermal_plate.set_plate_temperature(
                &mut hardware,
                HOT_TEMP,
                None,
                HOLD_INFINITE,
                RAMP_INFINITE
            ),
            Ok(())
        );
        assert_eq!(thermal_plate.status(), SystemStatus::Controlling);

        run_cycles(&mut thermal_plate, &mut hardware, 0, 1, ROOM_TEMP, ROOM_TEMP);

        assert!(hardware.is_enabled);
        for id in PeltierId::iter() {
            let (direction, power) = hardware.get_peltier(id);
            assert_eq!(direction, PeltierDirection::Heating);
            assert!(power > 0.0);
            assert!(power <= 1.0);
        }

        let events = get_events(&mut thermal_plate, "plateStatus");
        assert_eq!(events, vec![json!({"id": "plateStatus", "state": "Heating"})]);

        // Default volume is used for the overshoot
        assert_relative_eq!(
            thermal_plate.plate_control.current_setpoint(),
            HOT_TEMP + 25.0 * 0.0105 + 1.0869,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_set_plate_temperature_cool() {
        let (mut thermal_plate, mut hardware) = create_thermal_plate();

        thermal_plate
            .set_plate_temperature(&mut hardware, COLD_TEMP, Some(-1.0), 0.0, RAMP_INFINITE)
            .unwrap();
        run_cycles(&mut thermal_plate, &mut hardware, 0, 2, ROOM_TEMP, ROOM_TEMP);

        for id in PeltierId::iter() {
            assert_eq!(hardware.get_peltier(id).0, PeltierDirection::Cooling);
            assert!(hardware.get_peltier_signed(id) < 0.0);
        }
        assert_eq!(thermal_plate.get_plate_state(), PlateState::Cooling);

        // Fan runs at the power of the cold ramp
        assert_eq!(hardware.get_fan(), 0.7);
    }

    #[test]
    fn test_set_plate_temperature_deactivate() {
        let (mut thermal_plate, mut hardware) = create_thermal_plate();

        thermal_plate
            .set_plate_temperature(&mut hardware, HOT_TEMP, None, 0.0, RAMP_INFINITE)
            .unwrap();
        run_cycles(&mut thermal_plate, &mut hardware, 0, 1, ROOM_TEMP, ROOM_TEMP);

        thermal_plate
            .set_plate_temperature(&mut hardware, 0.0, None, 0.0, RAMP_INFINITE)
            .unwrap();

        assert_eq!(thermal_plate.status(), SystemStatus::Idle);
        assert!(!hardware.is_enabled);
        assert_eq!(
            thermal_plate.system.peltier(PeltierId::Left).filter.get_last(),
            0.0
        );
    }

    #[test]
    fn test_set_plate_temperature_bad_target() {
        let (mut thermal_plate, mut hardware) = create_thermal_plate();

        assert_eq!(
            thermal_plate.set_plate_temperature(&mut hardware, HOT_TEMP, None, -1.0, RAMP_INFINITE),
            Err(ErrorCode::ThermalTargetBad)
        );
        assert_eq!(
            thermal_plate.set_plate_temperature(&mut hardware, HOT_TEMP, None, 0.0, -0.5),
            Err(ErrorCode::ThermalTargetBad)
        );
        assert_eq!(thermal_plate.status(), SystemStatus::Idle);
    }

    #[test]
    fn test_plate_state_at_target() {
        let (mut thermal_plate, mut hardware) = create_thermal_plate();

        thermal_plate
            .set_plate_temperature(&mut hardware, HOT_TEMP, Some(0.0), 0.0, RAMP_INFINITE)
            .unwrap();
        run_cycles(&mut thermal_plate, &mut hardware, 0, 2, HOT_TEMP, ROOM_TEMP);

        assert_eq!(thermal_plate.get_plate_state(), PlateState::AtHotTemp);

        let events = get_events(&mut thermal_plate, "plateStatus");
        assert_eq!(
            events.last().unwrap(),
            &json!({"id": "plateStatus", "state": "AtHotTemp"})
        );

        thermal_plate
            .set_plate_temperature(&mut hardware, COLD_TEMP, Some(0.0), 0.0, RAMP_INFINITE)
            .unwrap();
        run_cycles(&mut thermal_plate, &mut hardware, 100, 2, COLD_TEMP, ROOM_TEMP);

        assert_eq!(thermal_plate.get_plate_state(), PlateState::AtColdTemp);
    }

    #[test]
    fn test_thermistor_fault() {
        let (mut thermal_plate, mut hardware) = create_thermal_plate();

        thermal_plate
            .set_plate_temperature(&mut hardware, HOT_TEMP, None, 0.0, RAMP_INFINITE)
            .unwrap();

        let mut snapshot = TemperatureSnapshot::uniform(PERIOD_MS, ROOM_TEMP, ROOM_TEMP);
        snapshot.readings[ThermistorId::BackCenter as usize] = ThermistorReading::OutOfRangeLow;
        thermal_plate.handle_snapshot(&snapshot, &mut hardware);

        assert_eq!(thermal_plate.status(), SystemStatus::Error);
        assert!(!hardware.is_enabled);
        assert_eq!(
            thermal_plate.get_error(),
            ErrorCode::ThermistorBackCenterDisconnected
        );

        let events = get_events(&mut thermal_plate, "errorState");
        assert_eq!(events[0]["code"], 219);

        // Commands are refused
        assert_eq!(
            thermal_plate.set_plate_temperature(&mut hardware, HOT_TEMP, None, 0.0, RAMP_INFINITE),
            Err(ErrorCode::ThermistorBackCenterDisconnected)
        );
        assert_eq!(
            thermal_plate.set_fan_manual(&mut hardware, 0.5),
            Err(ErrorCode::ThermistorBackCenterDisconnected)
        );

        // Recover the reading
        run_cycles(&mut thermal_plate, &mut hardware, PERIOD_MS, 1, ROOM_TEMP, ROOM_TEMP);

        assert_eq!(thermal_plate.status(), SystemStatus::Idle);

        let events = get_events(&mut thermal_plate, "errorState");
        assert_eq!(events[0]["code"], 0);
    }

    #[test]
    fn test_overtemp_fault() {
        let (mut thermal_plate, mut hardware) = create_thermal_plate();

        run_cycles(&mut thermal_plate, &mut hardware, 0, 1, ROOM_TEMP, 116.0);

        assert_eq!(thermal_plate.status(), SystemStatus::Error);
        assert_eq!(
            thermal_plate.get_error(),
            ErrorCode::ThermistorHeatsinkOvertemp
        );
    }

    #[test]
    fn test_peltier_failure() {
        let (mut thermal_plate, mut hardware) = create_thermal_plate();
        hardware.fail_peltier = true;

        thermal_plate
            .set_plate_temperature(&mut hardware, HOT_TEMP, None, 0.0, RAMP_INFINITE)
            .unwrap();
        run_cycles(&mut thermal_plate, &mut hardware, 0, 1, ROOM_TEMP, ROOM_TEMP);

        assert_eq!(thermal_plate.status(), SystemStatus::Error);
        assert_eq!(thermal_plate.get_error(), ErrorCode::ThermalPeltierError);
        assert!(!hardware.is_enabled);

        // Latched until cleared
        hardware.fail_peltier = false;
        run_cycles(&mut thermal_plate, &mut hardware, PERIOD_MS, 1, ROOM_TEMP, ROOM_TEMP);

        assert_eq!(thermal_plate.status(), SystemStatus::Error);

        thermal_plate.clear_errors(&mut hardware);

        assert_eq!(thermal_plate.status(), SystemStatus::Idle);
        assert_eq!(thermal_plate.get_error(), ErrorCode::NoError);
    }

    #[test]
    fn test_fan_failure() {
        let (mut thermal_plate, mut hardware) = create_thermal_plate();
        hardware.fail_fan = true;

        thermal_plate
            .set_plate_temperature(&mut hardware, HOT_TEMP, None, 0.0, RAMP_INFINITE)
            .unwrap();
        run_cycles(&mut thermal_plate, &mut hardware, 0, 1, ROOM_TEMP, ROOM_TEMP);

        assert_eq!(thermal_plate.status(), SystemStatus::Error);
        assert_eq!(thermal_plate.get_error(), ErrorCode::ThermalHeatsinkFanError);
    }

    #[test]
    fn test_clear_errors_keep_thermistor_fault() {
        let (mut thermal_plate, mut hardware) = create_thermal_plate();

        let mut snapshot = TemperatureSnapshot::uniform(PERIOD_MS, ROOM_TEMP, ROOM_TEMP);
        snapshot.readings[ThermistorId::Heatsink as usize] = ThermistorReading::OutOfRangeHigh;
        thermal_plate.handle_snapshot(&snapshot, &mut hardware);

        thermal_plate.clear_errors(&mut hardware);

        assert_eq!(thermal_plate.status(), SystemStatus::Error);
        assert_eq!(thermal_plate.get_error(), ErrorCode::ThermistorHeatsinkShort);
    }

    #[test]
    fn test_drift_fault() {
        let (mut thermal_plate, mut hardware) = create_thermal_plate();

        thermal_plate
            .set_plate_temperature(&mut hardware, HOT_TEMP, Some(0.0), 0.0, RAMP_INFINITE)
            .unwrap();

        // Settle and wait for the uniformity delay
        let timestamp_ms = run_cycles(&mut thermal_plate, &mut hardware, 0, 700, HOT_TEMP, ROOM_TEMP);

        assert_eq!(thermal_plate.status(), SystemStatus::Controlling);
        assert_eq!(thermal_plate.plate_control.uniformity_error_timer(), 0.0);

        let mut snapshot = TemperatureSnapshot::uniform(timestamp_ms + PERIOD_MS, HOT_TEMP, ROOM_TEMP);
        snapshot.readings[ThermistorId::FrontLeft as usize] =
            ThermistorReading::Temperature(HOT_TEMP - 5.0);
        thermal_plate.handle_snapshot(&snapshot, &mut hardware);

        assert_eq!(thermal_plate.status(), SystemStatus::Error);
        assert_eq!(thermal_plate.get_error(), ErrorCode::ThermalDrift);
        assert!(!hardware.is_enabled);
    }

    #[test]
    fn test_deactivate() {
        let (mut thermal_plate, mut hardware) = create_thermal_plate();
        hardware.fail_fan = true;

        thermal_plate
            .set_plate_temperature(&mut hardware, HOT_TEMP, None, 0.0, RAMP_INFINITE)
            .unwrap();
        run_cycles(&mut thermal_plate, &mut hardware, 0, 1, ROOM_TEMP, ROOM_TEMP);

        assert_eq!(
            thermal_plate.deactivate(&mut hardware, false),
            Err(ErrorCode::ThermalHeatsinkFanError)
        );
        assert_eq!(thermal_plate.deactivate(&mut hardware, true), Ok(()));

        // Stay in the error status
        assert_eq!(thermal_plate.status(), SystemStatus::Error);

        hardware.fail_fan = false;
        thermal_plate.clear_errors(&mut hardware);
        thermal_plate
            .set_plate_temperature(&mut hardware, HOT_TEMP, None, 0.0, RAMP_INFINITE)
            .unwrap();

        assert_eq!(thermal_plate.deactivate(&mut hardware, false), Ok(()));
        assert_eq!(thermal_plate.status(), SystemStatus::Idle);
    }

    #[test]
    fn test_set_fan_manual() {
        let (mut thermal_plate, mut hardware) = create_thermal_plate();

        assert_eq!(thermal_plate.set_fan_manual(&mut hardware, 0.4), Ok(()));
        assert!(thermal_plate.system.fan.manual_control);
        assert_eq!(hardware.get_fan(), 0.4);

        let events = get_events(&mut thermal_plate, "fanManualControl");
        assert_eq!(events, vec![json!({"id": "fanManualControl", "manual": true})]);

        // Control does not take the fan
        thermal_plate
            .set_plate_temperature(&mut hardware, HOT_TEMP, None, 0.0, RAMP_INFINITE)
            .unwrap();
        run_cycles(&mut thermal_plate, &mut hardware, 0, 3, ROOM_TEMP, ROOM_TEMP);

        assert_eq!(hardware.get_fan(), 0.4);

        // Zero power releases the manual control
        assert_eq!(thermal_plate.set_fan_manual(&mut hardware, 0.0), Ok(()));
        assert!(!thermal_plate.system.fan.manual_control);

        hardware.fail_fan = true;
        assert_eq!(
            thermal_plate.set_fan_manual(&mut hardware, 0.5),
            Err(ErrorCode::ThermalHeatsinkFanError)
        );
    }

    #[test]
    fn test_set_fan_automatic() {
        let (mut thermal_plate, mut hardware) = create_thermal_plate();
        thermal_plate.set_fan_manual(&mut hardware, 0.6).unwrap();

        assert_eq!(thermal_plate.set_fan_automatic(&mut hardware), Ok(()));
        assert!(!thermal_plate.system.fan.manual_control);
        assert_eq!(hardware.get_fan(), 0.0);

        hardware.fail_fan = true;
        assert_eq!(
            thermal_plate.set_fan_automatic(&mut hardware),
            Err(ErrorCode::ThermalHeatsinkFanError)
        );
    }

    #[test]
    fn test_idle_fan_reclaim() {
        let (mut thermal_plate, mut hardware) = create_thermal_plate();
        thermal_plate.set_fan_manual(&mut hardware, 0.1).unwrap();
        thermal_plate.event_queue.get_events_and_clear();

        // Warm heatsink keeps the manual power
        run_cycles(&mut thermal_plate, &mut hardware, 0, 1, ROOM_TEMP, 70.0);

        assert_eq!(hardware.get_fan(), 0.1);

        // Dangerous heatsink
        run_cycles(&mut thermal_plate, &mut hardware, PERIOD_MS, 1, ROOM_TEMP, 80.0);

        assert!(!thermal_plate.system.fan.manual_control);
        assert_eq!(hardware.get_fan(), 0.8);

        let events = get_events(&mut thermal_plate, "fanManualControl");
        assert_eq!(events, vec![json!({"id": "fanManualControl", "manual": false})]);
    }

    #[test]
    fn test_set_pid_constants() {
        let (mut thermal_plate, mut hardware) = create_thermal_plate();

        assert_eq!(
            thermal_plate.set_pid_constants(PidSelection::Fans, PidGains::new(1.0, 2.0, 3.0)),
            Ok(())
        );
        assert_eq!(thermal_plate.system.fan.pid.kd(), 3.0);
        assert_eq!(thermal_plate.system.fan.pid.windup_limit_low(), -1.0);

        assert_eq!(
            thermal_plate.set_pid_constants(PidSelection::Peltiers, PidGains::new(0.5, 0.1, 0.0)),
            Ok(())
        );
        for id in PeltierId::iter() {
            assert_eq!(thermal_plate.system.peltier(id).pid.kp(), 0.5);
        }

        assert_eq!(
            thermal_plate.set_pid_constants(PidSelection::Peltiers, PidGains::new(0.5, 0.1, 201.0)),
            Err(ErrorCode::ThermalConstantOutOfRange)
        );

        thermal_plate
            .set_plate_temperature(&mut hardware, HOT_TEMP, None, 0.0, RAMP_INFINITE)
            .unwrap();

        assert_eq!(
            thermal_plate.set_pid_constants(PidSelection::Fans, PidGains::new(1.0, 0.0, 0.0)),
            Err(ErrorCode::ThermalPlateBusy)
        );
    }

    #[test]
    fn test_get_thermal_power() {
        let (thermal_plate, mut hardware) = create_thermal_plate();
        hardware.set_peltier(PeltierId::Left, 0.5, PeltierDirection::Cooling);
        hardware.set_peltier(PeltierId::Center, 0.25, PeltierDirection::Heating);
        hardware.set_fan(0.3);

        let values = thermal_plate.get_thermal_power(&hardware);

        assert_eq!(values.left_power, -0.5);
        assert_eq!(values.right_power, 0.0);
        assert_eq!(values.center_power, 0.25);
        assert_eq!(values.fan_power, 0.3);
    }

    #[test]
    fn test_get_plate_temperature() {
        let (mut thermal_plate, mut hardware) = create_thermal_plate();

        thermal_plate.get_plate_temperature();

        let events = get_events(&mut thermal_plate, "plateTemperature");
        assert_eq!(events[0]["current"], ROOM_TEMP);
        assert_eq!(events[0]["setpoint"], 0.0);
        assert_eq!(events[0]["atTarget"], false);

        thermal_plate
            .set_plate_temperature(&mut hardware, HOT_TEMP, Some(0.0), 10.0, RAMP_INFINITE)
            .unwrap();
        run_cycles(&mut thermal_plate, &mut hardware, 0, 3, HOT_TEMP, ROOM_TEMP);

        thermal_plate.get_plate_temperature();

        let events = get_events(&mut thermal_plate, "plateTemperature");
        assert_eq!(events[0]["setpoint"], HOT_TEMP);
        assert_eq!(events[0]["holdTimeTotal"], 10.0);
        assert_eq!(events[0]["atTarget"], true);
    }

    #[test]
    fn test_timestamp_wrap_around() {
        let (mut thermal_plate, mut hardware) = create_thermal_plate();

        thermal_plate.handle_snapshot(
            &TemperatureSnapshot::uniform(u32::MAX - 10, ROOM_TEMP, ROOM_TEMP),
            &mut hardware,
        );
        thermal_plate
            .set_plate_temperature(&mut hardware, HOT_TEMP, Some(0.0), 10.0, RAMP_INFINITE)
            .unwrap();

        let timestamp_ms =
            run_cycles(&mut thermal_plate, &mut hardware, u32::MAX - 10, 20, HOT_TEMP, ROOM_TEMP);

        assert_eq!(timestamp_ms, 989);

        // The first cycle leaves the ramp and keeps the hold time
        let (remaining, _) = thermal_plate.plate_control.get_hold_time();
        assert_relative_eq!(remaining, 9.05, epsilon = 1e-6);
    }

    #[test]
    fn test_telemetry() {
        let (mut thermal_plate, mut hardware) = create_thermal_plate();

        thermal_plate
            .set_plate_temperature(&mut hardware, HOT_TEMP, None, 0.0, RAMP_INFINITE)
            .unwrap();
        run_cycles(&mut thermal_plate, &mut hardware, 0, 1, ROOM_TEMP, 30.0);

        let telemetry = &thermal_plate.telemetry;
        assert_eq!(telemetry.timestamp_ms, PERIOD_MS);
        assert_eq!(telemetry.thermistors[ThermistorId::Heatsink as usize], 30.0);
        assert_eq!(telemetry.plate_temperature, ROOM_TEMP);
        assert_eq!(telemetry.setpoint, HOT_TEMP);
        assert_eq!(telemetry.status, "Controlling");
        assert_eq!(
            telemetry.powers["left"],
            hardware.get_peltier_signed(PeltierId::Left)
        );
        assert!(telemetry.targets["center"] > telemetry.targets["left"]);
    }
}
