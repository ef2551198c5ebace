//! ---
//! plc_section: "11-simulation"
//! plc_subsection: "module"
//! plc_type: "source"
//! plc_scope: "code"
//! plc_description: "Two-state valve and heater actuators."
//! plc_version: "v0.1.0"
//! plc_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

/// Valve position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValveState {
    Open,
    #[default]
    Closed,
}

impl ValveState {
    /// Line-protocol flag: `1` when open.
    pub fn as_flag(self) -> u8 {
        match self {
            ValveState::Open => 1,
            ValveState::Closed => 0,
        }
    }
}

/// Heater power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaterState {
    On,
    #[default]
    Off,
}

impl HeaterState {
    /// Line-protocol flag: `1` when on.
    pub fn as_flag(self) -> u8 {
        match self {
            HeaterState::On => 1,
            HeaterState::Off => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValveActuator {
    actuator_id: String,
    state: ValveState,
}

impl ValveActuator {
    pub fn new(actuator_id: impl Into<String>, initial: ValveState) -> Self {
        Self {
            actuator_id: actuator_id.into(),
            state: initial,
        }
    }

    pub fn id(&self) -> &str {
        &self.actuator_id
    }

    pub fn state(&self) -> ValveState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ValveState::Open
    }

    pub fn open(&mut self) {
        self.state = ValveState::Open;
    }

    pub fn close(&mut self) {
        self.state = ValveState::Closed;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaterActuator {
    actuator_id: String,
    state: HeaterState,
}

impl HeaterActuator {
    pub fn new(actuator_id: impl Into<String>, initial: HeaterState) -> Self {
        Self {
            actuator_id: actuator_id.into(),
            state: initial,
        }
    }

    pub fn id(&self) -> &str {
        &self.actuator_id
    }

    pub fn state(&self) -> HeaterState {
        self.state
    }

    pub fn is_on(&self) -> bool {
        self.state == HeaterState::On
    }

    pub fn turn_on(&mut self) {
        self.state = HeaterState::On;
    }

    pub fn turn_off(&mut self) {
        self.state = HeaterState::Off;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valve_commands_are_idempotent() {
        let mut valve = ValveActuator::new("inlet_valve_01", ValveState::Closed);
        valve.open();
        let after_first = valve.clone();
        valve.open();
        assert_eq!(valve, after_first);
        assert!(valve.is_open());

        valve.close();
        valve.close();
        assert_eq!(valve.state(), ValveState::Closed);
    }

    #[test]
    fn heater_commands_are_idempotent() {
        let mut heater = HeaterActuator::new("heater_actuator_01", HeaterState::Off);
        heater.turn_on();
        heater.turn_on();
        assert!(heater.is_on());
        heater.turn_off();
        let after_first = heater.clone();
        heater.turn_off();
        assert_eq!(heater, after_first);
    }

    #[test]
    fn flags_follow_state() {
        assert_eq!(ValveState::Open.as_flag(), 1);
        assert_eq!(ValveState::Closed.as_flag(), 0);
        assert_eq!(HeaterState::On.as_flag(), 1);
        assert_eq!(HeaterState::Off.as_flag(), 0);
        assert_eq!(ValveState::default(), ValveState::Closed);
        assert_eq!(HeaterState::default(), HeaterState::Off);
    }
}
