//! Team balancing policy
//!
//! Picks the team with fewer members; exact ties are broken by a fair coin.
//! Pure decision logic: counts come from the caller, who must read them
//! immediately before the call.

use crate::team::TeamSlot;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Source of tie-break coin flips
///
/// Each call is an independent fair Bernoulli trial. Not required to be
/// cryptographically secure.
pub trait RandomSource: Send + Sync {
    /// Returns `true` with probability 0.5
    fn coin_flip(&self) -> bool;
}

/// Thread-local RNG, used in production
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn coin_flip(&self) -> bool {
        rand::thread_rng().gen_bool(0.5)
    }
}

/// Reproducible RNG seeded up front
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn coin_flip(&self) -> bool {
        // A poisoned lock still holds a usable RNG state
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        rng.gen_bool(0.5)
    }
}

/// Choose the team a new member should join.
///
/// The smaller team wins; on a tie `rng` decides, `true` meaning team A.
pub fn choose_team(count_a: u64, count_b: u64, rng: &dyn RandomSource) -> TeamSlot {
    if count_a < count_b {
        TeamSlot::A
    } else if count_b < count_a {
        TeamSlot::B
    } else if rng.coin_flip() {
        TeamSlot::A
    } else {
        TeamSlot::B
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Always answers the same and counts how often it was asked
    struct Fixed {
        heads: bool,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(heads: bool) -> Self {
            Self {
                heads,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl RandomSource for Fixed {
        fn coin_flip(&self) -> bool {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.heads
        }
    }

    #[test]
    fn smaller_team_always_wins() {
        let rng = Fixed::new(true);
        assert_eq!(choose_team(3, 5, &rng), TeamSlot::A);
        assert_eq!(choose_team(5, 3, &rng), TeamSlot::B);
        assert_eq!(choose_team(0, 1, &rng), TeamSlot::A);
        assert_eq!(choose_team(u64::MAX, 0, &rng), TeamSlot::B);
    }

    #[test]
    fn unequal_counts_never_consult_rng() {
        let rng = Fixed::new(false);
        for a in 0..20u64 {
            for b in 0..20u64 {
                if a != b {
                    let expected = if a < b { TeamSlot::A } else { TeamSlot::B };
                    assert_eq!(choose_team(a, b, &rng), expected, "counts ({a}, {b})");
                }
            }
        }
        assert_eq!(rng.calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn tie_follows_the_coin() {
        let heads = Fixed::new(true);
        let tails = Fixed::new(false);
        assert_eq!(choose_team(4, 4, &heads), TeamSlot::A);
        assert_eq!(choose_team(4, 4, &tails), TeamSlot::B);
        assert_eq!(heads.calls.load(Ordering::Relaxed), 1);
        assert_eq!(tails.calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn tie_is_fair_over_many_calls() {
        let rng = SeededRandom::new(0x7ea5_0b1a);
        let trials = 10_000;
        let team_a = (0..trials)
            .filter(|_| choose_team(0, 0, &rng) == TeamSlot::A)
            .count();

        // 5 sigma around 5000 for n=10_000, p=0.5 is +-250
        assert!(
            (4_750..=5_250).contains(&team_a),
            "team A chosen {team_a} times out of {trials}"
        );
    }

    #[test]
    fn thread_random_reaches_both_outcomes() {
        let rng = ThreadRandom;
        let mut seen = [false, false];
        for _ in 0..200 {
            match choose_team(1, 1, &rng) {
                TeamSlot::A => seen[0] = true,
                TeamSlot::B => seen[1] = true,
            }
        }
        assert_eq!(seen, [true, true]);
    }
}
