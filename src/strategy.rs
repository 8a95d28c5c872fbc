//! Named strategic framings injected into the model prompt.
//!
//! A strategy changes only the wording the model sees; board mechanics are
//! unaffected.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Prompt framing style for the model-backed oracle.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum StrategyId {
    /// Keep tiles ordered along a zig-zag path ending in one corner.
    #[default]
    Snake,
    /// Anchor the largest tile in a single corner.
    CornerFocus,
    /// Fill one edge row with the biggest tiles first.
    EdgePriority,
    /// Shift priorities with how crowded the board is.
    DynamicAdaptive,
    /// Leave the reasoning to the model.
    Innovation,
}

impl StrategyId {
    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Snake => "Snake",
            Self::CornerFocus => "Corner focus",
            Self::EdgePriority => "Edge priority",
            Self::DynamicAdaptive => "Dynamic adaptive",
            Self::Innovation => "Free-form",
        }
    }

    /// Instructional block placed in the prompt.
    pub fn guidance(self) -> &'static str {
        match self {
            Self::Snake => SNAKE,
            Self::CornerFocus => CORNER_FOCUS,
            Self::EdgePriority => EDGE_PRIORITY,
            Self::DynamicAdaptive => DYNAMIC_ADAPTIVE,
            Self::Innovation => INNOVATION,
        }
    }
}

const SNAKE: &str = "\
Strategy: SNAKE
- Keep the largest tile in the bottom-right corner.
- Arrange the bottom row in decreasing order from right to left, then continue \
the chain along the row above in the opposite direction.
- Prefer moves that keep the chain ordered; avoid UP unless nothing else is possible.";

const CORNER_FOCUS: &str = "\
Strategy: CORNER FOCUS
- Choose one corner for the largest tile and never move it out.
- Favour the two moves that push tiles toward that corner.
- Merge smaller tiles next to the corner tile so it keeps growing.";

const EDGE_PRIORITY: &str = "\
Strategy: EDGE PRIORITY
- Fill the bottom edge with the biggest tiles and keep that row full.
- A full edge row cannot shift sideways unexpectedly; protect it.
- Build the next row up only once the edge is stable.";

const DYNAMIC_ADAPTIVE: &str = "\
Strategy: DYNAMIC ADAPTIVE
- With many empty cells, set up merges of large tiles toward a corner.
- With few empty cells, take any merge that frees space.
- Never make a move that leaves the board with no follow-up merge if another move avoids it.";

const INNOVATION: &str = "\
Strategy: FREE-FORM
- Use your own judgement. Weigh merges, empty space and the position of \
large tiles, and pick the move you believe scores best over the next few turns.";

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_strategy_names_are_kebab_case() {
        assert_eq!(StrategyId::CornerFocus.to_string(), "corner-focus");
        assert_eq!(
            StrategyId::from_str("dynamic-adaptive").unwrap(),
            StrategyId::DynamicAdaptive
        );
    }

    #[test]
    fn test_every_strategy_has_distinct_guidance() {
        let blocks: Vec<&str> = StrategyId::iter().map(StrategyId::guidance).collect();
        for (i, a) in blocks.iter().enumerate() {
            assert!(!a.is_empty());
            for b in &blocks[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
