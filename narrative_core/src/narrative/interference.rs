//! Message interference - obscures text the way a weak transmission would.
//!
//! The RNG is seeded from the event id, so a given event at a given level always
//! renders the same way.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const GLYPHS: &[char] = &['█', '▓', '▒', '░', '#', '%', '~', '*'];

/// Replace each non-whitespace character with a static glyph with probability `level`.
pub fn apply_interference(message: &str, level: f64, seed: &str) -> String {
    let level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
    if level == 0.0 {
        return message.to_string();
    }

    let mut rng = StdRng::seed_from_u64(seed_hash(seed));
    message
        .chars()
        .map(|c| {
            if c.is_whitespace() {
                c
            } else if rng.gen::<f64>() < level {
                GLYPHS[rng.gen_range(0..GLYPHS.len())]
            } else {
                c
            }
        })
        .collect()
}

// FNV-1a
fn seed_hash(seed: &str) -> u64 {
    seed.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGE: &str = "This is station seven. Do not reply.";

    #[test]
    fn test_zero_level_is_identity() {
        assert_eq!(apply_interference(MESSAGE, 0.0, "intro"), MESSAGE);
    }

    #[test]
    fn test_full_level_hides_every_letter() {
        let obscured = apply_interference(MESSAGE, 1.0, "intro");

        assert_eq!(obscured.chars().count(), MESSAGE.chars().count());
        assert!(obscured
            .chars()
            .filter(|c| !c.is_whitespace())
            .all(|c| GLYPHS.contains(&c)));
        assert_eq!(
            obscured.chars().filter(|c| c.is_whitespace()).count(),
            MESSAGE.chars().filter(|c| c.is_whitespace()).count()
        );
    }

    #[test]
    fn test_stable_for_same_seed() {
        let a = apply_interference(MESSAGE, 0.5, "intro");
        let b = apply_interference(MESSAGE, 0.5, "intro");
        assert_eq!(a, b);
    }

    #[test]
    fn test_partial_level_changes_some_characters() {
        let obscured = apply_interference(MESSAGE, 0.5, "intro");
        let changed = obscured
            .chars()
            .zip(MESSAGE.chars())
            .filter(|(a, b)| a != b)
            .count();
        assert!(changed > 0);
        assert!(changed < MESSAGE.chars().filter(|c| !c.is_whitespace()).count());
    }
}
