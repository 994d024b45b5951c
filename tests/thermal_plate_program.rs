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

use serde_json::{json, Value};

use run_thermal_plate::command::command_schema::CommandSchema;
use run_thermal_plate::config::Config;
use run_thermal_plate::control::thermal_plate::ThermalPlate;
use run_thermal_plate::control::thermal_plate_process::ThermalPlateProcess;
use run_thermal_plate::enums::{PeltierId, SystemStatus};
use run_thermal_plate::interface::plate_hardware::PlateHardware;
use run_thermal_plate::mock::mock_hardware::MockPlateHardware;

const PERIOD_MS: u32 = 50;

struct Program {
    thermal_plate: ThermalPlate,
    hardware: MockPlateHardware,
    command_schema: CommandSchema,
    timestamp_ms: u32,
    events: Vec<Value>,
}

impl Program {
    fn new() -> Self {
        let mut program = Self {
            thermal_plate: ThermalPlate::new(&Config::default()),
            hardware: MockPlateHardware::new(),
            command_schema: ThermalPlateProcess::create_command_schema(),
            timestamp_ms: 0,
            events: Vec::new(),
        };
        program.run(1);

        program
    }

    fn execute(&mut self, message: Value) -> Value {
        let result = self.command_schema.execute(
            &message,
            Some(&mut self.thermal_plate),
            Some(&mut self.hardware),
        );
        self.collect_events();

        result
    }

    fn run(&mut self, cycles: u32) {
        for _ in 0..cycles {
            let snapshot = self.hardware.get_snapshot(self.timestamp_ms);
            self.thermal_plate
                .handle_snapshot(&snapshot, &mut self.hardware);
            self.collect_events();

            self.hardware.step(f64::from(PERIOD_MS) / 1000.0);
            self.timestamp_ms = self.timestamp_ms.wrapping_add(PERIOD_MS);
        }
    }

    fn collect_events(&mut self) {
        self.events
            .extend(self.thermal_plate.event_queue.get_events_and_clear());
    }

    fn plate_states(&self) -> Vec<String> {
        self.events
            .iter()
            .filter(|event| event["id"] == "plateStatus")
            .filter_map(|event| event["state"].as_str().map(String::from))
            .collect()
    }

    fn latest_event(&self, name: &str) -> Option<&Value> {
        self.events.iter().rev().find(|event| event["id"] == name)
    }
}

#[test]
fn test_program_step() {
    let mut program = Program::new();

    // Hot step with a hold time
    let result = program.execute(json!({
        "id": "cmd_setPlateTemperature",
        "sequence_id": 1,
        "setpoint": 90.0,
        "volume": 25.0,
        "holdTime": 10.0,
    }));
    assert_eq!(result, json!({"id": "success", "sequence_id": 1}));

    program.run(1200);

    assert_eq!(program.thermal_plate.status(), SystemStatus::Controlling);
    assert!((program.hardware.plate_temperature - 90.0).abs() < 3.0);

    // The hold time is over
    program.execute(json!({"id": "cmd_getPlateTemperature", "sequence_id": 2}));

    let event = program.latest_event("plateTemperature").unwrap();
    assert_eq!(event["setpoint"], 90.0);
    assert_eq!(event["holdTimeTotal"], 10.0);
    assert_eq!(event["holdTimeRemaining"], 0.0);

    // Cold step
    let result = program.execute(json!({
        "id": "cmd_setPlateTemperature",
        "sequence_id": 3,
        "setpoint": 4.0,
    }));
    assert_eq!(result, json!({"id": "success", "sequence_id": 3}));

    program.run(1600);

    assert!(program.hardware.plate_temperature < 10.0);

    program.execute(json!({"id": "cmd_getThermalPower", "sequence_id": 4}));

    let event = program.latest_event("thermalPower").unwrap().clone();
    for (key, id) in [
        ("left", PeltierId::Left),
        ("right", PeltierId::Right),
        ("center", PeltierId::Center),
    ] {
        assert_eq!(
            event[key].as_f64().unwrap(),
            program.hardware.get_peltier_signed(id)
        );
    }
    assert_eq!(event["fans"].as_f64().unwrap(), program.hardware.get_fan());

    // Deactivate
    let result = program.execute(json!({"id": "cmd_deactivatePlate", "sequence_id": 5}));
    assert_eq!(result, json!({"id": "success", "sequence_id": 5}));

    assert_eq!(program.thermal_plate.status(), SystemStatus::Idle);
    assert!(!program.hardware.is_enabled);

    assert_eq!(
        program.plate_states(),
        vec!["Idle", "Heating", "AtHotTemp", "Cooling", "AtColdTemp", "Idle"]
    );
}

#[test]
fn test_program_fan_failure() {
    let mut program = Program::new();

    program.execute(json!({
        "id": "cmd_setPlateTemperature",
        "sequence_id": 1,
        "setpoint": 60.0,
    }));
    program.run(20);

    // Fan driver fails
    program.hardware.fail_fan = true;
    program.run(1);

    assert_eq!(program.thermal_plate.status(), SystemStatus::Error);
    assert!(!program.hardware.is_enabled);
    assert_eq!(
        program.latest_event("errorState").unwrap()["name"],
        "ThermalHeatsinkFanError"
    );

    // Refused in the error status
    let result = program.execute(json!({
        "id": "cmd_setPlateTemperature",
        "sequence_id": 2,
        "setpoint": 60.0,
    }));
    assert_eq!(result, json!({"id": "fail", "sequence_id": 2}));

    // Recover
    program.hardware.fail_fan = false;
    let result = program.execute(json!({"id": "cmd_clearErrors", "sequence_id": 3}));
    assert_eq!(result, json!({"id": "success", "sequence_id": 3}));

    assert_eq!(program.thermal_plate.status(), SystemStatus::Idle);
    assert_eq!(
        program.latest_event("errorState").unwrap()["name"],
        "NoError"
    );
}
