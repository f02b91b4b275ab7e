//! Dice-evaluation math: turning five kept dice into a category score.
//!
//! The distilled specification treats "the dice-evaluation math library
//! (scoring rules)" as an external collaborator — a contract, not an
//! implementation the room owns. [`ScoringRules`] is that contract: the
//! room actor calls it to price a category against the current dice and
//! never computes a score itself. [`StandardScoring`] is the concrete
//! Yahtzee-style ruleset this server ships with; a different ruleset
//! could be swapped in without touching `room.rs`.

use diceforge_protocol::Category;

/// Prices scorecard categories against a hand of five dice.
///
/// Implementations must be pure functions of `(category, dice, already
/// has a Yahtzee scored)` — no randomness, no hidden state — since the
/// room calls this synchronously inside `SCORE_CATEGORY` handling and
/// persists the result.
pub trait ScoringRules: Send + Sync + 'static {
    /// The score `category` would award for `dice`, applying the joker
    /// rule (`yahtzee_already_scored`) when `dice` is itself a Yahtzee
    /// and the `Yahtzee` category has already been filled.
    fn score(&self, category: Category, dice: &[u8; 5], yahtzee_already_scored: bool) -> u32;

    /// Whether `dice` fills the `Yahtzee` category for a joker bonus —
    /// i.e. whether this is a *second* Yahtzee after the first was
    /// scored. Worth 100 bonus points, awarded in addition to whatever
    /// `score` returns for the category actually chosen.
    fn is_bonus_yahtzee(&self, dice: &[u8; 5], yahtzee_already_scored: bool) -> bool {
        yahtzee_already_scored && is_yahtzee(dice)
    }

    /// The maximum value `category` can ever award — used for tie-break
    /// ranking ("number of perfect-category scores").
    fn max_value(&self, category: Category) -> u32;
}

/// The standard American Yahtzee scoring table.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardScoring;

pub const YAHTZEE_BONUS: u32 = 100;

impl ScoringRules for StandardScoring {
    fn score(&self, category: Category, dice: &[u8; 5], yahtzee_already_scored: bool) -> u32 {
        let counts = value_counts(dice);
        let sum: u32 = dice.iter().map(|&d| d as u32).sum();
        let joker = yahtzee_already_scored && is_yahtzee(dice);

        match category {
            Category::Ones => counts[1] as u32 * 1,
            Category::Twos => counts[2] as u32 * 2,
            Category::Threes => counts[3] as u32 * 3,
            Category::Fours => counts[4] as u32 * 4,
            Category::Fives => counts[5] as u32 * 5,
            Category::Sixes => counts[6] as u32 * 6,
            Category::ThreeOfAKind => {
                if joker || counts.iter().any(|&c| c >= 3) {
                    sum
                } else {
                    0
                }
            }
            Category::FourOfAKind => {
                if joker || counts.iter().any(|&c| c >= 4) {
                    sum
                } else {
                    0
                }
            }
            Category::FullHouse => {
                if joker || is_full_house(&counts) {
                    25
                } else {
                    0
                }
            }
            Category::SmallStraight => {
                if joker || has_straight(&counts, 4) {
                    30
                } else {
                    0
                }
            }
            Category::LargeStraight => {
                if joker || has_straight(&counts, 5) {
                    40
                } else {
                    0
                }
            }
            Category::Yahtzee => {
                if is_yahtzee(dice) {
                    50
                } else {
                    0
                }
            }
            Category::Chance => sum,
        }
    }

    fn max_value(&self, category: Category) -> u32 {
        match category {
            Category::Ones => 5,
            Category::Twos => 10,
            Category::Threes => 15,
            Category::Fours => 20,
            Category::Fives => 25,
            Category::Sixes => 30,
            Category::ThreeOfAKind | Category::FourOfAKind | Category::Chance => 30,
            Category::FullHouse => 25,
            Category::SmallStraight => 30,
            Category::LargeStraight => 40,
            Category::Yahtzee => 50,
        }
    }
}

/// `counts[v]` = how many of the five dice show value `v` (1-indexed;
/// `counts[0]` is unused padding so indices line up with die faces).
fn value_counts(dice: &[u8; 5]) -> [u8; 7] {
    let mut counts = [0u8; 7];
    for &d in dice {
        if (1..=6).contains(&d) {
            counts[d as usize] += 1;
        }
    }
    counts
}

fn is_yahtzee(dice: &[u8; 5]) -> bool {
    dice.windows(2).all(|pair| pair[0] == pair[1])
}

fn is_full_house(counts: &[u8; 7]) -> bool {
    let has_three = counts.iter().any(|&c| c == 3);
    let has_two = counts.iter().any(|&c| c == 2);
    has_three && has_two
}

fn has_straight(counts: &[u8; 7], run_len: usize) -> bool {
    let present: Vec<bool> = (1..=6).map(|v| counts[v] > 0).collect();
    present
        .windows(run_len)
        .any(|window| window.iter().all(|&present| present))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STD: StandardScoring = StandardScoring;

    #[test]
    fn test_upper_section_counts_matching_faces() {
        assert_eq!(STD.score(Category::Fours, &[4, 4, 1, 2, 3], false), 8);
    }

    #[test]
    fn test_three_of_a_kind_sums_all_dice_when_met() {
        assert_eq!(STD.score(Category::ThreeOfAKind, &[3, 3, 3, 5, 6], false), 20);
    }

    #[test]
    fn test_three_of_a_kind_zero_when_not_met() {
        assert_eq!(STD.score(Category::ThreeOfAKind, &[1, 2, 3, 4, 5], false), 0);
    }

    #[test]
    fn test_full_house_scores_25() {
        assert_eq!(STD.score(Category::FullHouse, &[2, 2, 2, 5, 5], false), 25);
        assert_eq!(STD.score(Category::FullHouse, &[2, 2, 3, 5, 5], false), 0);
    }

    #[test]
    fn test_small_straight() {
        assert_eq!(STD.score(Category::SmallStraight, &[1, 2, 3, 4, 6], false), 30);
        assert_eq!(STD.score(Category::SmallStraight, &[1, 1, 3, 4, 6], false), 0);
    }

    #[test]
    fn test_large_straight() {
        assert_eq!(STD.score(Category::LargeStraight, &[2, 3, 4, 5, 6], false), 40);
        assert_eq!(STD.score(Category::LargeStraight, &[1, 2, 3, 4, 6], false), 0);
    }

    #[test]
    fn test_yahtzee_scores_50() {
        assert_eq!(STD.score(Category::Yahtzee, &[6, 6, 6, 6, 6], false), 50);
        assert_eq!(STD.score(Category::Yahtzee, &[6, 6, 6, 6, 5], false), 0);
    }

    #[test]
    fn test_chance_is_always_the_sum() {
        assert_eq!(STD.score(Category::Chance, &[1, 2, 3, 4, 5], false), 15);
    }

    #[test]
    fn test_joker_rule_fills_lower_section_at_full_value() {
        assert_eq!(
            STD.score(Category::FullHouse, &[4, 4, 4, 4, 4], true),
            25
        );
        assert!(STD.is_bonus_yahtzee(&[4, 4, 4, 4, 4], true));
        assert!(!STD.is_bonus_yahtzee(&[4, 4, 4, 4, 4], false));
    }

    #[test]
    fn test_max_value_table() {
        assert_eq!(STD.max_value(Category::Yahtzee), 50);
        assert_eq!(STD.max_value(Category::Sixes), 30);
    }
}
