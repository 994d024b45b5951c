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

use config::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::utility::get_config;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl PidGains {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp: kp,
            ki: ki,
            kd: kd,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct PidLimits {
    // Minimum value of each gain.
    pub min: f64,
    // Maximum value of each gain.
    pub max: f64,
}

impl PidLimits {
    /// All of the gains are in the range or not.
    ///
    /// # Arguments
    /// * `gains` - PID gains.
    ///
    /// # Returns
    /// True if all of the gains are in [min, max]. Otherwise, false.
    pub fn contains(&self, gains: &PidGains) -> bool {
        [gains.kp, gains.ki, gains.kd]
            .iter()
            .all(|gain| (self.min..=self.max).contains(gain))
    }
}

/// Tuning of the plate state machine and the fan regulation. The unit of
/// temperature is degree Celsius and the unit of power is the ratio in
/// [0, 1].
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(default)]
pub struct PlateControlConfig {
    // Distance from the adjusted target to leave the ramp.
    pub setpoint_threshold: f64,
    pub temperature_ambient: f64,
    // Overshoot and undershoot are only applied above this volume in uL.
    pub overshoot_min_volume_ul: f64,
    pub overshoot_degrees_per_ul: f64,
    pub overshoot_target_switch_difference: f64,
    // Extra target of the center channel while ramping.
    pub center_heat_offset: f64,
    pub center_cool_offset: f64,
    pub fan_setpoint_offset: f64,
    pub idle_fan_inactive_threshold: f64,
    pub idle_fan_danger_threshold: f64,
    pub idle_fan_power_slope: f64,
    pub idle_fan_danger_power: f64,
    pub fan_power_ramp_cold: f64,
    pub fan_target_temp_cold: f64,
    pub fan_power_limits_cold: (f64, f64),
    pub fan_power_ramp_down_non_cold: f64,
    pub heatsink_safety_threshold_warm: f64,
    pub fan_power_under_warm_threshold: f64,
    pub fan_target_diff_warm: f64,
    pub fan_power_limits_warm: (f64, f64),
    pub fan_power_limits_hot: (f64, f64),
    pub thermistor_drift_max_c: f64,
    pub drift_check_ignore_max_temp: f64,
    // Delay in second after settling before the drift check is enabled.
    pub uniformity_check_delay: f64,
}

impl Default for PlateControlConfig {
    fn default() -> Self {
        Self {
            setpoint_threshold: 2.0,
            temperature_ambient: 23.0,
            overshoot_min_volume_ul: 20.0,
            overshoot_degrees_per_ul: 0.0105,
            overshoot_target_switch_difference: 1.0869,
            center_heat_offset: 1.5,
            center_cool_offset: -3.0,
            fan_setpoint_offset: -2.0,
            idle_fan_inactive_threshold: 68.0,
            idle_fan_danger_threshold: 75.0,
            idle_fan_power_slope: 1.0 / 100.0,
            idle_fan_danger_power: 0.8,
            fan_power_ramp_cold: 0.7,
            fan_target_temp_cold: 60.0,
            fan_power_limits_cold: (0.35, 0.7),
            fan_power_ramp_down_non_cold: 0.55,
            heatsink_safety_threshold_warm: 70.0,
            fan_power_under_warm_threshold: 0.15,
            fan_target_diff_warm: -2.0,
            fan_power_limits_warm: (0.35, 0.55),
            fan_power_limits_hot: (0.30, 0.55),
            thermistor_drift_max_c: 4.0,
            drift_check_ignore_max_temp: 7.5,
            uniformity_check_delay: 30.0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(default)]
pub struct Config {
    // Configuration filename.
    pub filename: String,
    // Control frequency in Hz.
    pub control_frequency: f64,
    // Sample volume in uL used when the command does not give one.
    pub default_volume_ul: f64,
    // Over-temperature limit of every thermistor in degree Celsius.
    pub overtemp_limit_c: f64,
    pub pid_peltier: PidGains,
    pub pid_fan: PidGains,
    // Range of the gains accepted by the command.
    pub pid_limits: PidLimits,
    pub plate_control: PlateControlConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            filename: String::new(),
            control_frequency: 20.0,
            default_volume_ul: 25.0,
            overtemp_limit_c: 115.0,
            pid_peltier: PidGains::new(0.3, 0.05, 0.3),
            pid_fan: PidGains::new(0.2, 0.01, 0.05),
            pid_limits: PidLimits {
                min: -200.0,
                max: 200.0,
            },
            plate_control: PlateControlConfig::default(),
        }
    }
}

impl Config {
    /// Read the configuration file. The missing keys fall back to the
    /// default values.
    ///
    /// # Arguments
    /// * `filepath` - Path of the configuration file.
    ///
    /// # Returns
    /// Configuration or the error if the file can not be parsed.
    pub fn from_file(filepath: &Path) -> Result<Self, ConfigError> {
        let mut config: Config = get_config(filepath)?.try_deserialize()?;
        config.filename = filepath.to_string_lossy().into_owned();

        if config.control_frequency <= 0.0 {
            return Err(ConfigError::Message(format!(
                "control_frequency should be positive instead of {}",
                config.control_frequency
            )));
        }

        Ok(config)
    }

    /// Control period in second.
    pub fn control_period(&self) -> f64 {
        1.0 / self.control_frequency
    }
}
