use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::config::MasterOrientation;
use crate::layout_engine::{Direction, LayoutError};

/// Absolute or relative ratio adjustment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioChange {
    Exact(f32),
    Delta(f32),
}

impl RatioChange {
    pub fn apply(self, current: f32) -> f32 {
        match self {
            RatioChange::Exact(v) => v,
            RatioChange::Delta(d) => current + d,
        }
    }

    /// Accepts `exact 0.6`, `+0.1`, `-0.1` or a bare number (treated as a delta).
    pub fn parse(args: &[&str], verb: &'static str) -> Result<Self, LayoutError> {
        let invalid = |value: &str| LayoutError::InvalidArgument { verb, value: value.to_string() };
        match args {
            [] => Err(LayoutError::MissingArgument { verb }),
            ["exact", value] => {
                value.parse().map(RatioChange::Exact).map_err(|_| invalid(*value))
            }
            [value] => value
                .trim_start_matches('+')
                .parse()
                .map(RatioChange::Delta)
                .map_err(|_| invalid(*value)),
            _ => Err(invalid(&args.join(" "))),
        }
    }
}

/// Layout-specific verbs sent through the keybinding dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMessage {
    ToggleSplit,
    SwapSplit,
    Preselect(Direction),
    MoveToRoot { stable: bool },

    SwapWithMaster,
    FocusMaster,
    CycleNext,
    CyclePrev,
    SwapNext,
    SwapPrev,
    AddMaster,
    RemoveMaster,
    Orientation(MasterOrientation),
    OrientationNext,
    OrientationPrev,
    Mfact(RatioChange),
}

impl LayoutMessage {
    pub fn is_binary_tree_message(&self) -> bool {
        matches!(
            self,
            LayoutMessage::ToggleSplit
                | LayoutMessage::SwapSplit
                | LayoutMessage::Preselect(_)
                | LayoutMessage::MoveToRoot { .. }
        )
    }
}

impl FromStr for LayoutMessage {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let Some(verb) = parts.next() else {
            return Err(LayoutError::UnknownMessage(s.to_string()));
        };
        let args: Vec<&str> = parts.collect();
        let verb = verb.to_ascii_lowercase();

        let msg = match verb.as_str() {
            "togglesplit" => LayoutMessage::ToggleSplit,
            "swapsplit" => LayoutMessage::SwapSplit,
            "preselect" => {
                let Some(arg) = args.first() else {
                    return Err(LayoutError::MissingArgument { verb: "preselect" });
                };
                let direction = Direction::from_str(arg).map_err(|_| {
                    LayoutError::InvalidArgument { verb: "preselect", value: arg.to_string() }
                })?;
                LayoutMessage::Preselect(direction)
            }
            "movetoroot" => LayoutMessage::MoveToRoot {
                stable: !args.contains(&"unstable"),
            },
            "swapwithmaster" => LayoutMessage::SwapWithMaster,
            "focusmaster" => LayoutMessage::FocusMaster,
            "cyclenext" => LayoutMessage::CycleNext,
            "cycleprev" => LayoutMessage::CyclePrev,
            "swapnext" => LayoutMessage::SwapNext,
            "swapprev" => LayoutMessage::SwapPrev,
            "addmaster" => LayoutMessage::AddMaster,
            "removemaster" => LayoutMessage::RemoveMaster,
            "orientationleft" => LayoutMessage::Orientation(MasterOrientation::Left),
            "orientationright" => LayoutMessage::Orientation(MasterOrientation::Right),
            "orientationtop" => LayoutMessage::Orientation(MasterOrientation::Top),
            "orientationbottom" => LayoutMessage::Orientation(MasterOrientation::Bottom),
            "orientationcenter" => LayoutMessage::Orientation(MasterOrientation::Center),
            "orientationnext" | "orientationcycle" => LayoutMessage::OrientationNext,
            "orientationprev" => LayoutMessage::OrientationPrev,
            "mfact" => LayoutMessage::Mfact(RatioChange::parse(&args, "mfact")?),
            _ => return Err(LayoutError::UnknownMessage(s.to_string())),
        };
        Ok(msg)
    }
}
