use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Axis a split divides. `Horizontal` places children side by side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn flip(self) -> Self {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum Direction {
    #[strum(to_string = "left", serialize = "l")]
    Left,
    #[strum(to_string = "right", serialize = "r")]
    Right,
    #[strum(to_string = "up", serialize = "u", serialize = "t")]
    Up,
    #[strum(to_string = "down", serialize = "d", serialize = "b")]
    Down,
}

impl Direction {
    pub fn orientation(self) -> Orientation {
        match self {
            Direction::Left | Direction::Right => Orientation::Horizontal,
            Direction::Up | Direction::Down => Orientation::Vertical,
        }
    }

    /// Whether a window placed in this direction becomes the first child of a split.
    pub fn is_first(self) -> bool { matches!(self, Direction::Left | Direction::Up) }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn parses_short_and_long_direction_names() {
        assert_eq!(Direction::from_str("l").unwrap(), Direction::Left);
        assert_eq!(Direction::from_str("Right").unwrap(), Direction::Right);
        assert_eq!(Direction::from_str("t").unwrap(), Direction::Up);
        assert_eq!(Direction::from_str("down").unwrap(), Direction::Down);
        assert!(Direction::from_str("sideways").is_err());
    }
}
