//! Traffic Light State

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Phase of the traffic light affecting the ego vehicle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficLightState {
    /// No light affecting the vehicle (0)
    #[default]
    NoTraffic,
    /// Red (1)
    Red,
    /// Yellow (2)
    Yellow,
    /// Green (3)
    Green,
}

/// Binary stop/go signal consumed by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrafficSignal {
    Stop,
    Go,
}

impl TrafficLightState {
    /// Numeric value used by the simulator and in recorded logs
    pub fn value(&self) -> i32 {
        match self {
            TrafficLightState::NoTraffic => 0,
            TrafficLightState::Red => 1,
            TrafficLightState::Yellow => 2,
            TrafficLightState::Green => 3,
        }
    }

    /// Red and yellow mean stop, everything else means go
    pub fn signal(&self) -> TrafficSignal {
        TrafficSignal::from_value(self.value())
    }
}

impl TryFrom<i32> for TrafficLightState {
    type Error = ProtocolError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TrafficLightState::NoTraffic),
            1 => Ok(TrafficLightState::Red),
            2 => Ok(TrafficLightState::Yellow),
            3 => Ok(TrafficLightState::Green),
            other => Err(ProtocolError::UnknownTrafficState(other)),
        }
    }
}

impl TrafficSignal {
    /// Collapse a raw light value: 1 (red) and 2 (yellow) stop, anything else goes
    pub fn from_value(value: i32) -> Self {
        match value {
            1 | 2 => TrafficSignal::Stop,
            _ => TrafficSignal::Go,
        }
    }

    /// Model input scalar: 0 for stop, 1 for go
    pub fn as_scalar(&self) -> f32 {
        match self {
            TrafficSignal::Stop => 0.0,
            TrafficSignal::Go => 1.0,
        }
    }
}
