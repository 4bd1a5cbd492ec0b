//! Driving Protocol Types
//!
//! Values exchanged between the simulator loop, the driving agent and the
//! dataset recorder: high-level navigation commands, traffic light phases,
//! vehicle telemetry and actuator commands.

mod command;
mod control;
mod error;
mod traffic;

pub use command::NavigationCommand;
pub use control::{ActuatorCommand, Measurements, RawAction, VehicleTelemetry};
pub use error::ProtocolError;
pub use traffic::{TrafficLightState, TrafficSignal};
