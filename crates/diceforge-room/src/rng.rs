//! Dice rolls and player-order shuffles.
//!
//! Both draw from `rand`'s thread-local CSPRNG (`rand::rng()`, backed by
//! ChaCha on this platform). The distilled spec is explicit that no
//! attempt is made to make rolls reproducible — there is no seed to
//! persist, unlike the turn/phase state that does need to survive a
//! cold start.

use diceforge_protocol::UserId;
use rand::seq::SliceRandom;
use rand::Rng;

/// Rolls fresh values for every index where `kept_mask` is `false`,
/// leaving the dice at masked indices untouched.
pub fn roll_unmasked(dice: &mut [u8; 5], kept_mask: &[bool; 5]) {
    let mut rng = rand::rng();
    for i in 0..5 {
        if !kept_mask[i] {
            dice[i] = rng.random_range(1..=6);
        }
    }
}

/// A uniformly random permutation of `players` (Fisher-Yates via
/// `SliceRandom::shuffle`, which is unbiased for any RNG that itself
/// produces uniform output).
pub fn shuffle_player_order(players: &[UserId]) -> Vec<UserId> {
    let mut order: Vec<UserId> = players.to_vec();
    order.shuffle(&mut rand::rng());
    order
}
