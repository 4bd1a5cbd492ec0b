//! High-Level Navigation Commands
//!
//! Discrete directives emitted by the route planner, one per simulation tick.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Navigation command from the local planner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationCommand {
    /// No directive (-1)
    Void,
    /// Turn left at the next intersection (1)
    Left,
    /// Turn right at the next intersection (2)
    Right,
    /// Go straight through the next intersection (3)
    Straight,
    /// Follow the current lane (4)
    LaneFollow,
}

impl NavigationCommand {
    /// All commands, in dataset directory order
    pub const ALL: [NavigationCommand; 5] = [
        NavigationCommand::Left,
        NavigationCommand::Right,
        NavigationCommand::Straight,
        NavigationCommand::LaneFollow,
        NavigationCommand::Void,
    ];

    /// Numeric value used by the planner and in recorded logs
    pub fn value(&self) -> i32 {
        match self {
            NavigationCommand::Void => -1,
            NavigationCommand::Left => 1,
            NavigationCommand::Right => 2,
            NavigationCommand::Straight => 3,
            NavigationCommand::LaneFollow => 4,
        }
    }

    /// Decode a planner value.
    ///
    /// Lane-change options (5, 6) and anything else outside 1..=4 decode to
    /// `Void`.
    pub fn from_value(value: i32) -> Self {
        match value {
            1 => NavigationCommand::Left,
            2 => NavigationCommand::Right,
            3 => NavigationCommand::Straight,
            4 => NavigationCommand::LaneFollow,
            _ => NavigationCommand::Void,
        }
    }

    /// Lowercase name, also the dataset category directory
    pub fn as_str(&self) -> &'static str {
        match self {
            NavigationCommand::Void => "void",
            NavigationCommand::Left => "left",
            NavigationCommand::Right => "right",
            NavigationCommand::Straight => "straight",
            NavigationCommand::LaneFollow => "lanefollow",
        }
    }

    /// Whether this is one of the intersection maneuvers
    pub fn is_turn(&self) -> bool {
        matches!(
            self,
            NavigationCommand::Left | NavigationCommand::Right | NavigationCommand::Straight
        )
    }
}

impl fmt::Display for NavigationCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NavigationCommand {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "void" => Ok(NavigationCommand::Void),
            "left" => Ok(NavigationCommand::Left),
            "right" => Ok(NavigationCommand::Right),
            "straight" => Ok(NavigationCommand::Straight),
            "lanefollow" | "lane_follow" | "follow" => Ok(NavigationCommand::LaneFollow),
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_value_round_trip_for_known_commands() {
        for command in NavigationCommand::ALL {
            assert_eq!(NavigationCommand::from_value(command.value()), command);
        }
    }

    #[test]
    fn test_lane_change_options_decode_to_void() {
        assert_eq!(NavigationCommand::from_value(5), NavigationCommand::Void);
        assert_eq!(NavigationCommand::from_value(6), NavigationCommand::Void);
        assert_eq!(NavigationCommand::from_value(0), NavigationCommand::Void);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("LEFT".parse::<NavigationCommand>(), Ok(NavigationCommand::Left));
        assert_eq!("lanefollow".parse::<NavigationCommand>(), Ok(NavigationCommand::LaneFollow));
        assert!("reverse".parse::<NavigationCommand>().is_err());
    }

    #[test]
    fn test_only_intersections_are_turns() {
        assert!(NavigationCommand::Straight.is_turn());
        assert!(!NavigationCommand::LaneFollow.is_turn());
        assert!(!NavigationCommand::Void.is_turn());
    }

    proptest! {
        #[test]
        fn test_unknown_values_are_void(value in any::<i32>()) {
            prop_assume!(!(1..=4).contains(&value));
            prop_assert_eq!(NavigationCommand::from_value(value), NavigationCommand::Void);
        }
    }
}
