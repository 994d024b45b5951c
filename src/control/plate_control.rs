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

use log::{debug, info, warn};

use crate::config::PlateControlConfig;
use crate::constants::{NUM_PELTIER, NUM_PLATE_THERMISTOR, RAMP_INFINITE};
use crate::control::thermal_element::{HeatsinkFan, TemperatureElement, ThermalSystem};
use crate::enums::{ErrorCode, PeltierId, PlateStatus, TemperatureZone};

/// Powers of one control cycle. The peltier powers are in [-1, 1] where the
/// positive value is heating. The fan power is in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlateControlValues {
    pub left_power: f64,
    pub right_power: f64,
    pub center_power: f64,
    pub fan_power: f64,
}

impl PlateControlValues {
    /// Get the power of a peltier.
    ///
    /// # Arguments
    /// * `id` - Peltier ID.
    ///
    /// # Returns
    /// Power of the peltier.
    pub fn peltier_power(&self, id: PeltierId) -> f64 {
        match id {
            PeltierId::Left => self.left_power,
            PeltierId::Right => self.right_power,
            PeltierId::Center => self.center_power,
        }
    }

    fn is_finite(&self) -> bool {
        [
            self.left_power,
            self.right_power,
            self.center_power,
            self.fan_power,
        ]
        .iter()
        .all(|power| power.is_finite())
    }
}

/// Reset the PID of an element for a new target.
///
/// # Arguments
/// * `element` - Element to reset.
/// * `target` - New target temperature.
/// * `reference_error` - Signed error toward the final target. The integrator
/// is reset again when the error crosses zero.
fn reset_element<T: TemperatureElement>(element: &mut T, target: f64, reference_error: f64) {
    let pid = element.pid_mut();
    pid.reset();
    pid.arm_integrator_reset(reference_error);

    element.set_target(target);
}

pub struct PlateControl {
    _status: PlateStatus,
    // Setpoint of the user.
    _setpoint: f64,
    // Adjusted setpoint after the overshoot or undershoot.
    _current_setpoint: f64,
    // Ramp rate in degree Celsius per second.
    _ramp_rate: f64,
    // Hold time in second.
    _hold_time: f64,
    _remaining_hold_time: f64,
    // Remaining time in second before the drift check is enabled.
    _uniformity_error_timer: f64,
    _left: PeltierId,
    _right: PeltierId,
    _center: PeltierId,
    _config: PlateControlConfig,
}

impl PlateControl {
    /// Plate control that drives the three peltiers and the heatsink fan.
    ///
    /// # Arguments
    /// * `config` - Configuration of the plate control.
    ///
    /// # Returns
    /// A new PlateControl object.
    pub fn new(config: PlateControlConfig) -> Self {
        Self {
            _status: PlateStatus::InitialHeat,
            _setpoint: 0.0,
            _current_setpoint: 0.0,
            _ramp_rate: RAMP_INFINITE,
            _hold_time: 0.0,
            _remaining_hold_time: 0.0,
            _uniformity_error_timer: config.uniformity_check_delay,
            _left: PeltierId::Left,
            _right: PeltierId::Right,
            _center: PeltierId::Center,
            _config: config,
        }
    }

    pub fn status(&self) -> PlateStatus {
        self._status
    }

    pub fn setpoint(&self) -> f64 {
        self._setpoint
    }

    pub fn current_setpoint(&self) -> f64 {
        self._current_setpoint
    }

    pub fn ramp_rate(&self) -> f64 {
        self._ramp_rate
    }

    pub fn uniformity_error_timer(&self) -> f64 {
        self._uniformity_error_timer
    }

    pub fn config(&self) -> &PlateControlConfig {
        &self._config
    }

    /// Get the hold time.
    ///
    /// # Returns
    /// Remaining and total hold time in second.
    pub fn get_hold_time(&self) -> (f64, f64) {
        (self._remaining_hold_time, self._hold_time)
    }

    fn channels(&self) -> [PeltierId; NUM_PELTIER] {
        [self._left, self._right, self._center]
    }

    /// Start a new thermal step.
    ///
    /// # Arguments
    /// * `system` - Thermal system.
    /// * `setpoint` - Setpoint in degree Celsius.
    /// * `volume_ul` - Sample volume in uL.
    /// * `hold_time` - Hold time in second. Use HOLD_INFINITE to hold
    /// without a timer.
    /// * `ramp_rate` - Ramp rate in degree Celsius per second. Use
    /// RAMP_INFINITE to jump to the target.
    ///
    /// # Returns
    /// True if the new target is applied.
    pub fn set_new_target(
        &mut self,
        system: &mut ThermalSystem,
        setpoint: f64,
        volume_ul: f64,
        hold_time: f64,
        ramp_rate: f64,
    ) -> bool {
        self._setpoint = setpoint;
        self._ramp_rate = ramp_rate;
        self._hold_time = hold_time;
        self._remaining_hold_time = hold_time;
        self._uniformity_error_timer = self._config.uniformity_check_delay;

        let plate_temp = self.plate_temp(system);
        if setpoint > plate_temp {
            self._status = PlateStatus::InitialHeat;
            self._current_setpoint = self.calculate_overshoot(setpoint, volume_ul);
        } else {
            self._status = PlateStatus::InitialCool;
            self._current_setpoint = self.calculate_undershoot(setpoint, volume_ul);
        }

        for id in self.channels() {
            let target = if ramp_rate == RAMP_INFINITE {
                self.channel_setpoint(id)
            } else {
                plate_temp
            };

            let peltier = &mut system.peltiers[id as usize];
            let reference_error = self._current_setpoint - peltier.current(&system.thermistors);
            reset_element(peltier, target, reference_error);
            peltier.filter.reset();
        }

        // The error of the fan is the inverse of the peltiers.
        let fan_target = self._current_setpoint + self._config.fan_setpoint_offset;
        let reference_error = system.fan.current(&system.thermistors) - fan_target;
        reset_element(&mut system.fan, fan_target, reference_error);

        info!(
            "New target of the plate: {:.2} C (adjusted: {:.2} C), volume: {} uL, hold: {} s, ramp: {} C/s, {}.",
            setpoint,
            self._current_setpoint,
            volume_ul,
            hold_time,
            ramp_rate,
            self._status.as_ref()
        );

        true
    }

    /// Update the control for one cycle.
    ///
    /// # Arguments
    /// * `system` - Thermal system with the latest readings.
    /// * `time` - Time since the last update in second.
    ///
    /// # Returns
    /// Powers of the cycle. None if any power is not a finite value.
    pub fn update_control(
        &mut self,
        system: &mut ThermalSystem,
        time: f64,
    ) -> Option<PlateControlValues> {
        let plate_temp = self.plate_temp(system);
        match self._status {
            PlateStatus::InitialHeat | PlateStatus::InitialCool => {
                if (plate_temp - self._current_setpoint).abs() < self._config.setpoint_threshold {
                    self.transition_status(PlateStatus::Overshoot);
                    self._uniformity_error_timer = self._config.uniformity_check_delay;
                    self.set_channel_targets(system, self._current_setpoint);
                } else {
                    for id in self.channels() {
                        self.update_ramp(system, id, time);
                    }
                }
            }
            PlateStatus::Overshoot => {
                self.count_down_hold_time(time);

                self._current_setpoint = self._setpoint;
                self.set_channel_targets(system, self._setpoint);
                self.transition_status(PlateStatus::SteadyState);
                self._uniformity_error_timer = self._config.uniformity_check_delay;
            }
            PlateStatus::SteadyState => {
                self.count_down_hold_time(time);

                if plate_temp > self._setpoint {
                    self.transition_status(PlateStatus::Overshoot);
                } else {
                    self._uniformity_error_timer =
                        (self._uniformity_error_timer - time).max(0.0);
                }
            }
        }

        let mut values = PlateControlValues {
            left_power: Self::update_pid(system, self._left, time),
            right_power: Self::update_pid(system, self._right, time),
            center_power: Self::update_pid(system, self._center, time),
            fan_power: 0.0,
        };

        if system.fan.manual_control {
            // Keep watching the heatsink even if the fan is not ours.
            let heatsink_temp = system.fan.current_temp(&system.thermistors);
            if heatsink_temp > self._config.idle_fan_inactive_threshold {
                system.fan.manual_control = false;
                warn!(
                    "Heatsink is at {:.2} C. Take back the fan from the manual control.",
                    heatsink_temp
                );
            }
        }
        if !system.fan.manual_control {
            values.fan_power = self.update_fan(system, time);
        }

        if !values.is_finite() {
            warn!("Power is not a finite value: {:?}.", values);
            return None;
        }

        debug!("Plate temperature: {:.3} C, powers: {:?}.", plate_temp, values);

        Some(values)
    }

    /// Count down the hold time. The ramp never consumes it.
    ///
    /// # Arguments
    /// * `time` - Time since the last update in second.
    fn count_down_hold_time(&mut self, time: f64) {
        self._remaining_hold_time = (self._remaining_hold_time - time).max(0.0);
    }

    /// Transition the control status.
    ///
    /// # Arguments
    /// * `status` - New status.
    fn transition_status(&mut self, status: PlateStatus) {
        if self._status != status {
            info!(
                "Plate status: {} -> {}.",
                self._status.as_ref(),
                status.as_ref()
            );
            self._status = status;
        }
    }

    /// Set the targets of all the channels.
    ///
    /// # Arguments
    /// * `system` - Thermal system.
    /// * `target` - Target in degree Celsius.
    fn set_channel_targets(&self, system: &mut ThermalSystem, target: f64) {
        for id in self.channels() {
            system.peltier_mut(id).set_target(target);
        }
    }

    /// Setpoint of a channel while ramping. The center channel has more
    /// thermal mass, so it is driven further from the ambient.
    ///
    /// # Arguments
    /// * `id` - Peltier ID.
    ///
    /// # Returns
    /// Setpoint of the channel in degree Celsius.
    fn channel_setpoint(&self, id: PeltierId) -> f64 {
        if id != self._center {
            return self._current_setpoint;
        }

        match self._status {
            PlateStatus::InitialHeat => self._current_setpoint + self._config.center_heat_offset,
            PlateStatus::InitialCool => self._current_setpoint + self._config.center_cool_offset,
            _ => self._current_setpoint,
        }
    }

    /// Move the target of a channel toward its setpoint.
    ///
    /// # Arguments
    /// * `system` - Thermal system.
    /// * `id` - Peltier ID.
    /// * `time` - Time since the last update in second.
    fn update_ramp(&self, system: &mut ThermalSystem, id: PeltierId, time: f64) {
        let goal = self.channel_setpoint(id);
        let step = self._ramp_rate * time;

        let peltier = system.peltier_mut(id);
        peltier.temp_target = if self._ramp_rate == RAMP_INFINITE {
            goal
        } else if peltier.temp_target < goal {
            (peltier.temp_target + step).min(goal)
        } else {
            (peltier.temp_target - step).max(goal)
        };
    }

    /// Update the PID control of a channel.
    ///
    /// # Arguments
    /// * `system` - Thermal system.
    /// * `id` - Peltier ID.
    /// * `time` - Time since the last update in second.
    ///
    /// # Returns
    /// Filtered power of the channel.
    fn update_pid(system: &mut ThermalSystem, id: PeltierId, time: f64) -> f64 {
        let peltier = &mut system.peltiers[id as usize];
        let error = peltier.temp_target - peltier.current_temp(&system.thermistors);
        let power = peltier.pid.compute_with_time(error, time).clamp(-1.0, 1.0);

        peltier.filter.set_filtered(power, time)
    }

    /// Update the fan power in the automatic control.
    ///
    /// # Arguments
    /// * `system` - Thermal system.
    /// * `time` - Time since the last update in second.
    ///
    /// # Returns
    /// Fan power.
    pub fn update_fan(&self, system: &mut ThermalSystem, time: f64) -> f64 {
        let config = &self._config;

        let heatsink_temp = system.fan.current_temp(&system.thermistors);
        if heatsink_temp > config.idle_fan_danger_threshold {
            return config.idle_fan_danger_power;
        }

        let zone = self.temperature_zone(self._setpoint);
        if zone == TemperatureZone::Cold {
            if self._status == PlateStatus::InitialCool {
                return config.fan_power_ramp_cold;
            }

            return Self::regulate_fan(
                &mut system.fan,
                heatsink_temp,
                config.fan_target_temp_cold,
                time,
                config.fan_power_limits_cold,
            );
        }

        if self._status == PlateStatus::InitialCool {
            return config.fan_power_ramp_down_non_cold;
        }

        // Keep the heatsink under the setpoint with a safety threshold.
        let threshold = config
            .heatsink_safety_threshold_warm
            .min(self._setpoint + config.fan_target_diff_warm);
        if heatsink_temp < threshold {
            return config.fan_power_under_warm_threshold;
        }

        let limits = if zone == TemperatureZone::Hot {
            config.fan_power_limits_hot
        } else {
            config.fan_power_limits_warm
        };

        Self::regulate_fan(&mut system.fan, heatsink_temp, threshold, time, limits)
    }

    /// Regulate the heatsink to a target with the PID of the fan.
    ///
    /// # Arguments
    /// * `fan` - Heatsink fan.
    /// * `heatsink_temp` - Heatsink temperature in degree Celsius.
    /// * `target` - Target of the heatsink in degree Celsius.
    /// * `time` - Time since the last update in second.
    /// * `limits` - Lower and upper limits of the power.
    ///
    /// # Returns
    /// Fan power.
    fn regulate_fan(
        fan: &mut HeatsinkFan,
        heatsink_temp: f64,
        target: f64,
        time: f64,
        limits: (f64, f64),
    ) -> f64 {
        // The fan cools with a positive power.
        let error = heatsink_temp - target;
        if fan.temp_target != target {
            fan.temp_target = target;
            fan.pid.arm_integrator_reset(error);
        }

        fan.pid.compute_with_time(error, time).clamp(limits.0, limits.1)
    }

    /// Fan power when the plate is not controlled.
    ///
    /// # Arguments
    /// * `system` - Thermal system. The manual control of the fan is cleared
    /// if the heatsink is in danger.
    ///
    /// # Returns
    /// Fan power.
    pub fn fan_idle_power(&self, system: &mut ThermalSystem) -> f64 {
        let heatsink_temp = system.fan.current_temp(&system.thermistors);
        if heatsink_temp < self._config.idle_fan_inactive_threshold {
            return 0.0;
        }

        if heatsink_temp > self._config.idle_fan_danger_threshold {
            system.fan.manual_control = false;
            return self._config.idle_fan_danger_power;
        }

        heatsink_temp * self._config.idle_fan_power_slope
    }

    /// Calculate the overshoot target of heating.
    ///
    /// # Arguments
    /// * `setpoint` - Setpoint in degree Celsius.
    /// * `volume_ul` - Sample volume in uL.
    ///
    /// # Returns
    /// Adjusted target in degree Celsius.
    pub fn calculate_overshoot(&self, setpoint: f64, volume_ul: f64) -> f64 {
        setpoint + self.overshoot_bias(setpoint, volume_ul)
    }

    /// Calculate the undershoot target of cooling.
    ///
    /// # Arguments
    /// * `setpoint` - Setpoint in degree Celsius.
    /// * `volume_ul` - Sample volume in uL.
    ///
    /// # Returns
    /// Adjusted target in degree Celsius.
    pub fn calculate_undershoot(&self, setpoint: f64, volume_ul: f64) -> f64 {
        setpoint - self.overshoot_bias(setpoint, volume_ul)
    }

    fn overshoot_bias(&self, setpoint: f64, volume_ul: f64) -> f64 {
        let config = &self._config;
        if (setpoint > config.temperature_ambient) && (volume_ul > config.overshoot_min_volume_ul) {
            config.overshoot_degrees_per_ul * volume_ul + config.overshoot_target_switch_difference
        } else {
            0.0
        }
    }

    /// Get the zone of a temperature.
    ///
    /// # Arguments
    /// * `temperature` - Temperature in degree Celsius.
    ///
    /// # Returns
    /// Temperature zone.
    pub fn temperature_zone(&self, temperature: f64) -> TemperatureZone {
        if temperature < (TemperatureZone::Cold as u8 as f64) {
            TemperatureZone::Cold
        } else if temperature < (TemperatureZone::Warm as u8 as f64) {
            TemperatureZone::Warm
        } else {
            TemperatureZone::Hot
        }
    }

    /// Average temperature of the plate.
    ///
    /// # Arguments
    /// * `system` - Thermal system.
    ///
    /// # Returns
    /// Average of the three channels in degree Celsius.
    pub fn plate_temp(&self, system: &ThermalSystem) -> f64 {
        self.channels()
            .iter()
            .map(|id| system.peltier(*id).current_temp(&system.thermistors))
            .sum::<f64>()
            / (NUM_PELTIER as f64)
    }

    /// The plate is holding at the target or not.
    ///
    /// # Arguments
    /// * `system` - Thermal system.
    ///
    /// # Returns
    /// True if in the steady state and the plate is close to the target.
    pub fn temp_within_setpoint(&self, system: &ThermalSystem) -> bool {
        (self._status == PlateStatus::SteadyState)
            && ((self._current_setpoint - self.plate_temp(system)).abs()
                < self._config.setpoint_threshold)
    }

    /// Get the temperatures of the plate thermistors.
    ///
    /// # Arguments
    /// * `system` - Thermal system.
    ///
    /// # Returns
    /// Front and back temperatures of the left, right, and center channels.
    pub fn get_peltier_temps(&self, system: &ThermalSystem) -> [f64; NUM_PLATE_THERMISTOR] {
        let mut temperatures = [0.0; NUM_PLATE_THERMISTOR];
        for (idx, id) in self.channels().iter().enumerate() {
            let (front, back) = system.peltier(*id).thermistors;
            temperatures[2 * idx] = system.thermistor(front).temp_c;
            temperatures[2 * idx + 1] = system.thermistor(back).temp_c;
        }

        temperatures
    }

    /// Check the drift between the front and back thermistors of each
    /// channel. The check is only done in the steady state after the
    /// uniformity delay.
    ///
    /// # Arguments
    /// * `system` - Thermal system.
    ///
    /// # Returns
    /// Error if any channel drifts.
    pub fn thermistor_drift_check(&self, system: &ThermalSystem) -> Result<(), ErrorCode> {
        if (self._status != PlateStatus::SteadyState) || (self._uniformity_error_timer > 0.0) {
            return Ok(());
        }

        for id in self.channels() {
            let peltier = system.peltier(id);
            let (front, back) = peltier.thermistors;
            let hotter = system
                .thermistor(front)
                .temp_c
                .max(system.thermistor(back).temp_c);

            if (peltier.current_temp_delta(&system.thermistors)
                > self._config.thermistor_drift_max_c)
                && (hotter >= self._config.drift_check_ignore_max_temp)
            {
                return Err(ErrorCode::ThermalDrift);
            }
        }

        Ok(())
    }
}
