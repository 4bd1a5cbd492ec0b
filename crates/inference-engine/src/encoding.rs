//! Navigation command encoding

use drive_protocol::NavigationCommand;
use serde::{Deserialize, Serialize};

/// How the navigation command is fed to the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandEncoding {
    /// Length-4 one-hot vector, slots {lanefollow, straight, right, left}
    OneHot,
    /// Single scalar `value / 10`
    Scalar,
}

impl CommandEncoding {
    /// Width of the encoded command input
    pub fn width(&self) -> usize {
        match self {
            CommandEncoding::OneHot => 4,
            CommandEncoding::Scalar => 1,
        }
    }
}

/// Encodes navigation commands into the layout a model was trained with
#[derive(Debug, Clone, Copy)]
pub struct CommandEncoder {
    encoding: CommandEncoding,
}

impl CommandEncoder {
    pub fn new(encoding: CommandEncoding) -> Self {
        Self { encoding }
    }

    pub fn encoding(&self) -> CommandEncoding {
        self.encoding
    }

    /// Encode a command
    pub fn encode(&self, command: NavigationCommand) -> Vec<f32> {
        self.encode_value(command.value())
    }

    /// Encode a raw planner value
    pub fn encode_value(&self, value: i32) -> Vec<f32> {
        match self.encoding {
            CommandEncoding::OneHot => Self::one_hot(value).to_vec(),
            CommandEncoding::Scalar => vec![Self::scalar(value)],
        }
    }

    /// One-hot over {LANEFOLLOW, STRAIGHT, RIGHT, LEFT}.
    ///
    /// Left, void and any unrecognized value share the last slot; the
    /// trained models depend on this layout.
    pub fn one_hot(value: i32) -> [f32; 4] {
        let slot = match value {
            4 => 0,
            3 => 1,
            2 => 2,
            _ => 3,
        };
        let mut cmd = [0.0; 4];
        cmd[slot] = 1.0;
        cmd
    }

    pub fn scalar(value: i32) -> f32 {
        value as f32 / 10.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_one_hot_slot_order() {
        assert_eq!(CommandEncoder::one_hot(4), [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(CommandEncoder::one_hot(3), [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(CommandEncoder::one_hot(2), [0.0, 0.0, 1.0, 0.0]);
        assert_eq!(CommandEncoder::one_hot(1), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_void_shares_left_slot() {
        let encoder = CommandEncoder::new(CommandEncoding::OneHot);
        assert_eq!(
            encoder.encode(NavigationCommand::Void),
            encoder.encode(NavigationCommand::Left)
        );
    }

    #[test]
    fn test_scalar_encoding() {
        let encoder = CommandEncoder::new(CommandEncoding::Scalar);
        assert_eq!(encoder.encode(NavigationCommand::LaneFollow), vec![0.4]);
        assert_eq!(encoder.encode(NavigationCommand::Void), vec![-0.1]);
    }

    #[test]
    fn test_encoded_width_matches_encoding() {
        for encoding in [CommandEncoding::OneHot, CommandEncoding::Scalar] {
            let encoder = CommandEncoder::new(encoding);
            for command in NavigationCommand::ALL {
                assert_eq!(encoder.encode(command).len(), encoding.width());
            }
        }
    }

    proptest! {
        #[test]
        fn test_one_hot_has_single_hot_slot(value in any::<i32>()) {
            let cmd = CommandEncoder::one_hot(value);
            prop_assert_eq!(cmd.iter().filter(|&&v| v == 1.0).count(), 1);
            prop_assert_eq!(cmd.iter().filter(|&&v| v == 0.0).count(), 3);
            if !(2..=4).contains(&value) {
                prop_assert_eq!(cmd[3], 1.0);
            }
        }
    }
}
