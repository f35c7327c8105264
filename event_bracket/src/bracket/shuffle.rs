//! Team order randomization for round-1 seeding.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::sync::Mutex;

use super::models::TeamId;

/// Reorders the team list before round-1 pairing
pub trait TeamShuffler: Send + Sync {
    fn shuffle(&self, teams: &mut [TeamId]);
}

/// Uniform random permutation from the thread-local RNG
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomShuffler;

impl TeamShuffler for RandomShuffler {
    fn shuffle(&self, teams: &mut [TeamId]) {
        teams.shuffle(&mut rand::rng());
    }
}

/// Reproducible permutation from a fixed seed
pub struct SeededShuffler {
    rng: Mutex<StdRng>,
}

impl SeededShuffler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl TeamShuffler for SeededShuffler {
    fn shuffle(&self, teams: &mut [TeamId]) {
        // A poisoned lock still holds a usable RNG
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        teams.shuffle(&mut *rng);
    }
}

/// Keeps the given order
#[derive(Debug, Default, Clone, Copy)]
pub struct NoShuffle;

impl TeamShuffler for NoShuffle {
    fn shuffle(&self, _teams: &mut [TeamId]) {}
}
