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

use num_traits::PrimInt;
use strum_macros::{AsRefStr, EnumIter, FromRepr};

/// A trait to provide value and bit value methods for the bit enum.
pub trait BitEnum<T: PrimInt> {
    /// Get the value.
    ///
    /// # Returns
    /// Value.
    fn value(&self) -> T;

    /// Get the bit value.
    ///
    /// # Returns
    /// Bit value. If the value is not defined, it returns 0.
    fn bit_value(&self) -> T {
        match self.value().to_usize() {
            Some(value) => T::one() << value,
            None => T::zero(),
        }
    }
}

impl BitEnum<u16> for FaultBit {
    fn value(&self) -> u16 {
        *self as u16
    }
}

/// Command status.
#[derive(Debug, AsRefStr)]
pub enum CommandStatus {
    Success,
    Fail,
}

/// Control status of the plate state machine.
#[derive(FromRepr, Debug, PartialEq, Clone, Copy, AsRefStr)]
#[repr(u8)]
pub enum PlateStatus {
    InitialHeat = 1,
    InitialCool = 2,
    Overshoot = 3,
    SteadyState = 4,
}

/// Zone of a target temperature. The discriminants are the lower bounds of
/// the next zone in degree Celsius.
#[derive(Debug, PartialEq, Clone, Copy, AsRefStr)]
#[repr(u8)]
pub enum TemperatureZone {
    Cold = 23,
    Warm = 31,
    Hot,
}

/// Status of the thermal plate task.
#[derive(FromRepr, Debug, PartialEq, Clone, Copy, AsRefStr)]
#[repr(u8)]
pub enum SystemStatus {
    Idle = 1,
    Error = 2,
    Controlling = 3,
}

/// State of the plate shown to the user.
#[derive(Debug, PartialEq, Clone, Copy, AsRefStr)]
pub enum PlateState {
    Idle,
    Heating,
    AtHotTemp,
    Cooling,
    AtColdTemp,
}

/// Thermistors on the board. All of the plate thermistors come before the
/// heatsink so they can be indexed 1:1 with the plate readings.
#[derive(FromRepr, Debug, PartialEq, Eq, Hash, Clone, Copy, EnumIter, AsRefStr)]
#[repr(u8)]
pub enum ThermistorId {
    FrontRight,
    FrontLeft,
    FrontCenter,
    BackRight,
    BackLeft,
    BackCenter,
    Heatsink,
}

/// Peltier channels under the plate.
#[derive(FromRepr, Debug, PartialEq, Eq, Hash, Clone, Copy, EnumIter, AsRefStr)]
#[repr(u8)]
pub enum PeltierId {
    Left,
    Right,
    Center,
}

/// Drive direction of a peltier.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum PeltierDirection {
    Heating,
    Cooling,
}

/// Which PID loops a set of constants applies to.
#[derive(Debug, PartialEq, Clone, Copy, AsRefStr)]
pub enum PidSelection {
    Peltiers,
    Fans,
}

impl PidSelection {
    /// Parse the selection used by the command messages.
    ///
    /// # Arguments
    /// * `name` - Name of the selection.
    ///
    /// # Returns
    /// Selection or None if the name is unknown.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "peltiers" => Some(PidSelection::Peltiers),
            "fans" => Some(PidSelection::Fans),
            _ => None,
        }
    }
}

/// Error code reported to the command layer. The discriminants match the
/// numeric codes published to the host.
#[derive(FromRepr, Debug, PartialEq, Eq, Clone, Copy, AsRefStr)]
#[repr(u16)]
pub enum ErrorCode {
    NoError = 0,
    ThermistorHeatsinkDisconnected = 201,
    ThermistorHeatsinkShort = 202,
    ThermistorHeatsinkOvertemp = 203,
    ThermistorFrontRightDisconnected = 204,
    ThermistorFrontRightShort = 205,
    ThermistorFrontRightOvertemp = 206,
    ThermistorFrontLeftDisconnected = 207,
    ThermistorFrontLeftShort = 208,
    ThermistorFrontLeftOvertemp = 209,
    ThermistorFrontCenterDisconnected = 210,
    ThermistorFrontCenterShort = 211,
    ThermistorFrontCenterOvertemp = 212,
    ThermistorBackRightDisconnected = 213,
    ThermistorBackRightShort = 214,
    ThermistorBackRightOvertemp = 215,
    ThermistorBackLeftDisconnected = 216,
    ThermistorBackLeftShort = 217,
    ThermistorBackLeftOvertemp = 218,
    ThermistorBackCenterDisconnected = 219,
    ThermistorBackCenterShort = 220,
    ThermistorBackCenterOvertemp = 221,
    ThermalPlateBusy = 401,
    ThermalPeltierError = 402,
    ThermalHeatsinkFanError = 403,
    ThermalConstantOutOfRange = 406,
    ThermalTargetBad = 407,
    ThermalDrift = 408,
}

impl ErrorCode {
    /// Get the (disconnected, short, overtemp) error codes of a thermistor.
    ///
    /// # Arguments
    /// * `id` - Thermistor ID.
    ///
    /// # Returns
    /// Error codes of the thermistor.
    pub fn thermistor_errors(id: ThermistorId) -> (ErrorCode, ErrorCode, ErrorCode) {
        match id {
            ThermistorId::Heatsink => (
                ErrorCode::ThermistorHeatsinkDisconnected,
                ErrorCode::ThermistorHeatsinkShort,
                ErrorCode::ThermistorHeatsinkOvertemp,
            ),
            ThermistorId::FrontRight => (
                ErrorCode::ThermistorFrontRightDisconnected,
                ErrorCode::ThermistorFrontRightShort,
                ErrorCode::ThermistorFrontRightOvertemp,
            ),
            ThermistorId::FrontLeft => (
                ErrorCode::ThermistorFrontLeftDisconnected,
                ErrorCode::ThermistorFrontLeftShort,
                ErrorCode::ThermistorFrontLeftOvertemp,
            ),
            ThermistorId::FrontCenter => (
                ErrorCode::ThermistorFrontCenterDisconnected,
                ErrorCode::ThermistorFrontCenterShort,
                ErrorCode::ThermistorFrontCenterOvertemp,
            ),
            ThermistorId::BackRight => (
                ErrorCode::ThermistorBackRightDisconnected,
                ErrorCode::ThermistorBackRightShort,
                ErrorCode::ThermistorBackRightOvertemp,
            ),
            ThermistorId::BackLeft => (
                ErrorCode::ThermistorBackLeftDisconnected,
                ErrorCode::ThermistorBackLeftShort,
                ErrorCode::ThermistorBackLeftOvertemp,
            ),
            ThermistorId::BackCenter => (
                ErrorCode::ThermistorBackCenterDisconnected,
                ErrorCode::ThermistorBackCenterShort,
                ErrorCode::ThermistorBackCenterOvertemp,
            ),
        }
    }

    /// Get the numeric code.
    ///
    /// # Returns
    /// Numeric code published to the host.
    pub fn code(&self) -> u16 {
        *self as u16
    }
}

/// Bit of the fault bitmap. The thermistor bits share the order of
/// `ThermistorId`.
#[derive(Debug, PartialEq, Clone, Copy, EnumIter)]
pub enum FaultBit {
    ThermistorFrontRight,
    ThermistorFrontLeft,
    ThermistorFrontCenter,
    ThermistorBackRight,
    ThermistorBackLeft,
    ThermistorBackCenter,
    ThermistorHeatsink,
    Peltier,
    Fan,
    Drift,
}

impl FaultBit {
    /// Get the fault bit of a thermistor.
    ///
    /// # Arguments
    /// * `id` - Thermistor ID.
    ///
    /// # Returns
    /// Fault bit.
    pub fn from_thermistor(id: ThermistorId) -> Self {
        match id {
            ThermistorId::FrontRight => FaultBit::ThermistorFrontRight,
            ThermistorId::FrontLeft => FaultBit::ThermistorFrontLeft,
            ThermistorId::FrontCenter => FaultBit::ThermistorFrontCenter,
            ThermistorId::BackRight => FaultBit::ThermistorBackRight,
            ThermistorId::BackLeft => FaultBit::ThermistorBackLeft,
            ThermistorId::BackCenter => FaultBit::ThermistorBackCenter,
            ThermistorId::Heatsink => FaultBit::ThermistorHeatsink,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_command_status() {
        assert_eq!(CommandStatus::Success.as_ref().to_lowercase(), "success");
        assert_eq!(CommandStatus::Fail.as_ref().to_lowercase(), "fail");
    }

    #[test]
    fn test_plate_status_value() {
        assert_eq!(PlateStatus::from_repr(1).unwrap(), PlateStatus::InitialHeat);
        assert_eq!(PlateStatus::from_repr(4).unwrap(), PlateStatus::SteadyState);
        assert!(PlateStatus::from_repr(5).is_none());

        assert_eq!(PlateStatus::Overshoot as u8, 3);
    }

    #[test]
    fn test_temperature_zone_value() {
        assert_eq!(TemperatureZone::Cold as u8, 23);
        assert_eq!(TemperatureZone::Warm as u8, 31);
    }

    #[test]
    fn test_fault_bit_value() {
        assert_eq!(FaultBit::ThermistorFrontRight.bit_value(), 1);
        assert_eq!(FaultBit::ThermistorHeatsink.bit_value(), 1 << 6);
        assert_eq!(FaultBit::Peltier.bit_value(), 1 << 7);
        assert_eq!(FaultBit::Fan.bit_value(), 1 << 8);
        assert_eq!(FaultBit::Drift.bit_value(), 1 << 9);
    }

    #[test]
    fn test_fault_bit_from_thermistor() {
        for (id, bit) in ThermistorId::iter().zip(FaultBit::iter()) {
            assert_eq!(FaultBit::from_thermistor(id), bit);
        }
    }

    #[test]
    fn test_error_code() {
        assert_eq!(ErrorCode::ThermalDrift.code(), 408);
        assert_eq!(
            ErrorCode::from_repr(402).unwrap(),
            ErrorCode::ThermalPeltierError
        );

        let (disconnected, short, overtemp) = ErrorCode::thermistor_errors(ThermistorId::BackLeft);
        assert_eq!(disconnected.code(), 216);
        assert_eq!(short.code(), 217);
        assert_eq!(overtemp.code(), 218);
    }

    #[test]
    fn test_pid_selection_from_name() {
        assert_eq!(
            PidSelection::from_name("Peltiers"),
            Some(PidSelection::Peltiers)
        );
        assert_eq!(PidSelection::from_name("fans"), Some(PidSelection::Fans));
        assert_eq!(PidSelection::from_name("lid"), None);
    }
}
