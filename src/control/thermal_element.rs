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

use strum::IntoEnumIterator;

use crate::config::{Config, PidGains};
use crate::constants::{NUM_THERMISTOR, PID_WINDUP_LIMIT_HIGH, PID_WINDUP_LIMIT_LOW};
use crate::control::peltier_filter::PeltierFilter;
use crate::control::pid::Pid;
use crate::enums::{ErrorCode, FaultBit, PeltierId, ThermistorId};

/// Result of the thermistor conversion done by the upstream collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThermistorReading {
    // Converted temperature in degree Celsius.
    Temperature(f64),
    // Reading is under the conversion table (disconnected).
    OutOfRangeLow,
    // Reading is over the conversion table (shorted).
    OutOfRangeHigh,
}

/// One complete set of readings. The sampling side builds the whole snapshot
/// before handing it over, so the control side never sees a partial update.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureSnapshot {
    // Timestamp of the readings in millisecond. Wraps around.
    pub timestamp_ms: u32,
    // Readings ordered by ThermistorId.
    pub readings: [ThermistorReading; NUM_THERMISTOR],
    // Raw ADC counts ordered by ThermistorId.
    pub adc: [u16; NUM_THERMISTOR],
}

impl TemperatureSnapshot {
    /// Snapshot with every thermistor at the same temperature.
    ///
    /// # Arguments
    /// * `timestamp_ms` - Timestamp in millisecond.
    /// * `plate_temp` - Temperature of the plate thermistors.
    /// * `heatsink_temp` - Temperature of the heatsink thermistor.
    ///
    /// # Returns
    /// A new snapshot.
    pub fn uniform(timestamp_ms: u32, plate_temp: f64, heatsink_temp: f64) -> Self {
        let mut readings = [ThermistorReading::Temperature(plate_temp); NUM_THERMISTOR];
        readings[ThermistorId::Heatsink as usize] = ThermistorReading::Temperature(heatsink_temp);

        Self {
            timestamp_ms: timestamp_ms,
            readings: readings,
            adc: [0; NUM_THERMISTOR],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Thermistor {
    // Last converted temperature in degree Celsius (0 if invalid).
    pub temp_c: f64,
    // Last ADC result.
    pub last_adc: u16,
    // Current error.
    pub error: ErrorCode,
    // Constants below are fixed for the life of the sensor.
    overtemp_limit_c: f64,
    disconnected_error: ErrorCode,
    short_error: ErrorCode,
    overtemp_error: ErrorCode,
    error_bit: FaultBit,
}

impl Thermistor {
    /// Create a new thermistor record.
    ///
    /// # Arguments
    /// * `id` - Thermistor ID.
    /// * `overtemp_limit_c` - Over-temperature limit in degree Celsius.
    ///
    /// # Returns
    /// A new Thermistor object.
    pub fn new(id: ThermistorId, overtemp_limit_c: f64) -> Self {
        let (disconnected_error, short_error, overtemp_error) = ErrorCode::thermistor_errors(id);

        Self {
            temp_c: 0.0,
            last_adc: 0,
            error: ErrorCode::NoError,
            overtemp_limit_c: overtemp_limit_c,
            disconnected_error: disconnected_error,
            short_error: short_error,
            overtemp_error: overtemp_error,
            error_bit: FaultBit::from_thermistor(id),
        }
    }

    pub fn overtemp_limit_c(&self) -> f64 {
        self.overtemp_limit_c
    }

    pub fn error_bit(&self) -> FaultBit {
        self.error_bit
    }

    pub fn has_error(&self) -> bool {
        self.error != ErrorCode::NoError
    }

    /// Apply a new reading.
    ///
    /// # Arguments
    /// * `reading` - Converted reading.
    /// * `adc` - Raw ADC count.
    ///
    /// # Returns
    /// True if the error state changed. Otherwise, false.
    pub fn apply_reading(&mut self, reading: ThermistorReading, adc: u16) -> bool {
        let old_error = self.error;

        self.last_adc = adc;
        match reading {
            ThermistorReading::Temperature(temp) => {
                self.error = if temp > self.overtemp_limit_c {
                    self.overtemp_error
                } else {
                    ErrorCode::NoError
                };
                self.temp_c = temp;
            }
            ThermistorReading::OutOfRangeLow => {
                self.temp_c = 0.0;
                self.error = self.disconnected_error;
            }
            ThermistorReading::OutOfRangeHigh => {
                self.temp_c = 0.0;
                self.error = self.short_error;
            }
        }

        old_error != self.error
    }
}

/// Element whose temperature is regulated by a PID loop.
pub trait TemperatureElement {
    /// Get the target temperature in degree Celsius.
    fn target(&self) -> f64;

    /// Set the target temperature in degree Celsius.
    fn set_target(&mut self, target: f64);

    /// Get the current temperature in degree Celsius.
    ///
    /// # Arguments
    /// * `thermistors` - Thermistors of the thermal system.
    fn current(&self, thermistors: &[Thermistor]) -> f64;

    /// Get the PID loop of the element.
    fn pid_mut(&mut self) -> &mut Pid;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Peltier {
    // Target temperature in degree Celsius.
    pub temp_target: f64,
    id: PeltierId,
    // Front and back thermistors.
    pub thermistors: (ThermistorId, ThermistorId),
    pub pid: Pid,
    pub filter: PeltierFilter,
}

impl Peltier {
    /// Create a new peltier channel.
    ///
    /// # Arguments
    /// * `id` - Peltier ID.
    /// * `thermistors` - Front and back thermistors.
    /// * `pid` - PID loop of the channel.
    ///
    /// # Returns
    /// A new Peltier object.
    pub fn new(id: PeltierId, thermistors: (ThermistorId, ThermistorId), pid: Pid) -> Self {
        Self {
            temp_target: 0.0,
            id: id,
            thermistors: thermistors,
            pid: pid,
            filter: PeltierFilter::new(),
        }
    }

    pub fn id(&self) -> PeltierId {
        self.id
    }

    /// Current temperature as the average of the front and back thermistors.
    pub fn current_temp(&self, thermistors: &[Thermistor]) -> f64 {
        (thermistors[self.thermistors.0 as usize].temp_c
            + thermistors[self.thermistors.1 as usize].temp_c)
            / 2.0
    }

    /// Absolute difference between the front and back thermistors.
    pub fn current_temp_delta(&self, thermistors: &[Thermistor]) -> f64 {
        (thermistors[self.thermistors.0 as usize].temp_c
            - thermistors[self.thermistors.1 as usize].temp_c)
            .abs()
    }
}

impl TemperatureElement for Peltier {
    fn target(&self) -> f64 {
        self.temp_target
    }

    fn set_target(&mut self, target: f64) {
        self.temp_target = target;
    }

    fn current(&self, thermistors: &[Thermistor]) -> f64 {
        self.current_temp(thermistors)
    }

    fn pid_mut(&mut self) -> &mut Pid {
        &mut self.pid
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeatsinkFan {
    // Target temperature of the heatsink in degree Celsius.
    pub temp_target: f64,
    // The fan is controlled by the operator or not.
    pub manual_control: bool,
    pub thermistor: ThermistorId,
    pub pid: Pid,
}

impl HeatsinkFan {
    pub fn new(thermistor: ThermistorId, pid: Pid) -> Self {
        Self {
            temp_target: 0.0,
            manual_control: false,
            thermistor: thermistor,
            pid: pid,
        }
    }

    pub fn current_temp(&self, thermistors: &[Thermistor]) -> f64 {
        thermistors[self.thermistor as usize].temp_c
    }
}

impl TemperatureElement for HeatsinkFan {
    fn target(&self) -> f64 {
        self.temp_target
    }

    fn set_target(&mut self, target: f64) {
        self.temp_target = target;
    }

    fn current(&self, thermistors: &[Thermistor]) -> f64 {
        self.current_temp(thermistors)
    }

    fn pid_mut(&mut self) -> &mut Pid {
        &mut self.pid
    }
}

/// Owner of every thermal record on the plate. Other components refer to the
/// records by ThermistorId and PeltierId.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalSystem {
    // Thermistors ordered by ThermistorId.
    pub thermistors: Vec<Thermistor>,
    // Peltiers ordered by PeltierId.
    pub peltiers: Vec<Peltier>,
    pub fan: HeatsinkFan,
}

impl ThermalSystem {
    /// Create the thermal system.
    ///
    /// # Arguments
    /// * `config` - Configuration.
    ///
    /// # Returns
    /// A new ThermalSystem object.
    pub fn new(config: &Config) -> Self {
        let thermistors = ThermistorId::iter()
            .map(|id| Thermistor::new(id, config.overtemp_limit_c))
            .collect();

        let sampletime = config.control_period();
        let peltiers = PeltierId::iter()
            .map(|id| {
                Peltier::new(
                    id,
                    Self::thermistors_of_peltier(id),
                    Self::create_pid(&config.pid_peltier, sampletime),
                )
            })
            .collect();

        Self {
            thermistors: thermistors,
            peltiers: peltiers,
            fan: HeatsinkFan::new(
                ThermistorId::Heatsink,
                Self::create_pid(&config.pid_fan, sampletime),
            ),
        }
    }

    /// Create a PID loop with the windup limits used on the plate.
    ///
    /// # Arguments
    /// * `gains` - PID gains.
    /// * `sampletime` - Control period in second.
    ///
    /// # Returns
    /// A new Pid object.
    pub fn create_pid(gains: &PidGains, sampletime: f64) -> Pid {
        Pid::with_windup_limits(
            gains.kp,
            gains.ki,
            gains.kd,
            sampletime,
            PID_WINDUP_LIMIT_LOW,
            PID_WINDUP_LIMIT_HIGH,
        )
    }

    /// Get the front and back thermistors of a peltier.
    ///
    /// # Arguments
    /// * `id` - Peltier ID.
    ///
    /// # Returns
    /// Front and back thermistors.
    pub fn thermistors_of_peltier(id: PeltierId) -> (ThermistorId, ThermistorId) {
        match id {
            PeltierId::Left => (ThermistorId::FrontLeft, ThermistorId::BackLeft),
            PeltierId::Right => (ThermistorId::FrontRight, ThermistorId::BackRight),
            PeltierId::Center => (ThermistorId::FrontCenter, ThermistorId::BackCenter),
        }
    }

    pub fn thermistor(&self, id: ThermistorId) -> &Thermistor {
        &self.thermistors[id as usize]
    }

    pub fn peltier(&self, id: PeltierId) -> &Peltier {
        &self.peltiers[id as usize]
    }

    pub fn peltier_mut(&mut self, id: PeltierId) -> &mut Peltier {
        &mut self.peltiers[id as usize]
    }

    /// Set the temperature of a thermistor directly.
    ///
    /// # Arguments
    /// * `id` - Thermistor ID.
    /// * `temperature` - Temperature in degree Celsius.
    pub fn set_temperature(&mut self, id: ThermistorId, temperature: f64) {
        self.thermistors[id as usize].temp_c = temperature;
    }

    /// Set all the plate thermistors and the heatsink thermistor.
    ///
    /// # Arguments
    /// * `plate_temp` - Temperature of the plate in degree Celsius.
    /// * `heatsink_temp` - Temperature of the heatsink in degree Celsius.
    pub fn set_temperatures(&mut self, plate_temp: f64, heatsink_temp: f64) {
        self.thermistors
            .iter_mut()
            .for_each(|thermistor| thermistor.temp_c = plate_temp);
        self.set_temperature(ThermistorId::Heatsink, heatsink_temp);
    }

    /// Apply a complete snapshot of readings.
    ///
    /// # Arguments
    /// * `snapshot` - Snapshot of the readings.
    ///
    /// # Returns
    /// Thermistors whose error state changed.
    pub fn apply_snapshot(&mut self, snapshot: &TemperatureSnapshot) -> Vec<ThermistorId> {
        ThermistorId::iter()
            .filter(|id| {
                let idx = *id as usize;
                self.thermistors[idx].apply_reading(snapshot.readings[idx], snapshot.adc[idx])
            })
            .collect()
    }

    /// Reset the filters of all the peltiers.
    pub fn reset_peltier_filters(&mut self) {
        self.peltiers
            .iter_mut()
            .for_each(|peltier| peltier.filter.reset());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn create_thermal_system() -> ThermalSystem {
        ThermalSystem::new(&Config::default())
    }

    #[test]
    fn test_new() {
        let system = create_thermal_system();

        assert_eq!(system.thermistors.len(), NUM_THERMISTOR);
        assert_eq!(system.peltiers.len(), 3);

        for id in PeltierId::iter() {
            assert_eq!(system.peltier(id).id(), id);
            assert_eq!(system.peltier(id).pid.windup_limit_high(), 1.0);
        }
        assert_eq!(system.fan.thermistor, ThermistorId::Heatsink);
        assert!(!system.fan.manual_control);

        let thermistor = system.thermistor(ThermistorId::BackCenter);
        assert_eq!(thermistor.error_bit(), FaultBit::ThermistorBackCenter);
        assert_eq!(thermistor.overtemp_limit_c(), 115.0);
    }

    #[test]
    fn test_apply_reading() {
        let mut thermistor = Thermistor::new(ThermistorId::FrontLeft, 105.0);

        assert!(!thermistor.apply_reading(ThermistorReading::Temperature(50.0), 100));
        assert_eq!(thermistor.temp_c, 50.0);
        assert_eq!(thermistor.last_adc, 100);

        assert!(thermistor.apply_reading(ThermistorReading::OutOfRangeLow, 0));
        assert_eq!(thermistor.temp_c, 0.0);
        assert_eq!(thermistor.error, ErrorCode::ThermistorFrontLeftDisconnected);

        assert!(thermistor.apply_reading(ThermistorReading::OutOfRangeHigh, 0));
        assert_eq!(thermistor.error, ErrorCode::ThermistorFrontLeftShort);

        assert!(thermistor.apply_reading(ThermistorReading::Temperature(106.0), 0));
        assert_eq!(thermistor.temp_c, 106.0);
        assert_eq!(thermistor.error, ErrorCode::ThermistorFrontLeftOvertemp);
        assert!(thermistor.has_error());

        assert!(thermistor.apply_reading(ThermistorReading::Temperature(20.0), 0));
        assert!(!thermistor.has_error());
    }

    #[test]
    fn test_peltier_temperature() {
        let mut system = create_thermal_system();
        system.set_temperature(ThermistorId::FrontRight, 10.0);
        system.set_temperature(ThermistorId::BackRight, 14.0);

        let peltier = system.peltier(PeltierId::Right);
        assert_relative_eq!(peltier.current_temp(&system.thermistors), 12.0);
        assert_relative_eq!(peltier.current_temp_delta(&system.thermistors), 4.0);

        system.set_temperature(ThermistorId::FrontRight, 20.0);
        let peltier = system.peltier(PeltierId::Right);
        assert_relative_eq!(peltier.current_temp_delta(&system.thermistors), 6.0);
    }

    #[test]
    fn test_temperature_element() {
        let mut system = create_thermal_system();
        system.set_temperatures(30.0, 45.0);

        let thermistors = system.thermistors.clone();
        let elements: Vec<&mut dyn TemperatureElement> =
            vec![system.peltier_mut(PeltierId::Left)];
        for element in elements {
            element.set_target(40.0);
            assert_eq!(element.target(), 40.0);
            assert_eq!(element.current(&thermistors), 30.0);
            assert_eq!(element.pid_mut().last_error(), 0.0);
        }

        system.fan.set_target(50.0);
        assert_eq!(system.fan.target(), 50.0);
        assert_eq!(system.fan.current(&thermistors), 45.0);
    }

    #[test]
    fn test_apply_snapshot() {
        let mut system = create_thermal_system();

        let mut snapshot = TemperatureSnapshot::uniform(10, 25.0, 30.0);
        assert!(system.apply_snapshot(&snapshot).is_empty());
        assert_eq!(system.thermistor(ThermistorId::BackLeft).temp_c, 25.0);
        assert_eq!(system.thermistor(ThermistorId::Heatsink).temp_c, 30.0);

        snapshot.readings[ThermistorId::Heatsink as usize] = ThermistorReading::OutOfRangeHigh;
        assert_eq!(
            system.apply_snapshot(&snapshot),
            vec![ThermistorId::Heatsink]
        );

        // No change in the error state
        assert!(system.apply_snapshot(&snapshot).is_empty());
    }

    #[test]
    fn test_reset_peltier_filters() {
        let mut system = create_thermal_system();
        system.peltier_mut(PeltierId::Center).filter.set_filtered(0.5, 1.0);

        system.reset_peltier_filters();

        assert_eq!(system.peltier(PeltierId::Center).filter.get_last(), 0.0);
    }
}
