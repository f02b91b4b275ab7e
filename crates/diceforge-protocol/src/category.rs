//! The thirteen scoring categories of a scorecard.

use serde::{Deserialize, Serialize};

/// One slot on a player's scorecard.
///
/// A category can be scored at most once per game; `None` means unscored,
/// `Some(0)` means scored as a zero (deliberately or via AFK auto-score).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Ones,
    Twos,
    Threes,
    Fours,
    Fives,
    Sixes,
    ThreeOfAKind,
    FourOfAKind,
    FullHouse,
    SmallStraight,
    LargeStraight,
    Yahtzee,
    Chance,
}

impl Category {
    pub const ALL: [Category; 13] = [
        Category::Ones,
        Category::Twos,
        Category::Threes,
        Category::Fours,
        Category::Fives,
        Category::Sixes,
        Category::ThreeOfAKind,
        Category::FourOfAKind,
        Category::FullHouse,
        Category::SmallStraight,
        Category::LargeStraight,
        Category::Yahtzee,
        Category::Chance,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_has_thirteen_categories() {
        assert_eq!(Category::ALL.len(), 13);
    }

    #[test]
    fn test_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&Category::FullHouse).unwrap();
        assert_eq!(json, "\"FULL_HOUSE\"");
    }
}
