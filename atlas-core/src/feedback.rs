//! Maps a proximity value to the discrete hint tier shown to players.

use atlas_types::{Country, Hint};

use crate::geometry;

/// Classify a guess relative to the answer. An exact match is always
/// `Correct`, everything else is bucketed by centroid distance.
pub fn classify(guess: &Country, answer: &Country) -> Hint {
    if guess.id == answer.id {
        return Hint::Correct;
    }
    hint_for_distance(geometry::proximity(guess, answer))
}

pub fn hint_for_distance(km: f64) -> Hint {
    match km {
        d if d < 500.0 => Hint::Boiling,
        d if d < 1500.0 => Hint::Hot,
        d if d < 3000.0 => Hint::Warm,
        d if d < 6000.0 => Hint::Cool,
        _ => Hint::Cold,
    }
}
