//! Jumbled phrase generation.

use rand::{Rng, seq::SliceRandom};

/// Returned when there is nothing to jumble.
pub const PLACEHOLDER: &str = "...";

/// Default number of words in a generated phrase.
pub const DEFAULT_WORD_COUNT: usize = 24;

/// Words this short (in chars) are never scrambled.
const MAX_FIXED_WORD_LEN: usize = 3;

/// Build a scrambled phrase of `word_count` words sampled from `pool`.
///
/// Words are sampled with replacement; roughly half of the longer ones get
/// their interior letters shuffled, and the word order is shuffled too.
pub fn generate<R>(pool: &[&str], word_count: usize, rng: &mut R) -> String
where
    R: Rng + ?Sized,
{
    if pool.is_empty() {
        return PLACEHOLDER.to_string();
    }

    let mut words = Vec::with_capacity(word_count);
    for _ in 0..word_count {
        if let Some(word) = pool.choose(rng) {
            words.push(scramble_word(word, rng));
        }
    }
    words.shuffle(rng);
    words.join(" ")
}

/// Shuffle the interior of `word`, keeping its first and last char.
fn scramble_word<R>(word: &str, rng: &mut R) -> String
where
    R: Rng + ?Sized,
{
    let chars: Vec<char> = word.chars().collect();
    if chars.len() <= MAX_FIXED_WORD_LEN || rng.gen_bool(0.5) {
        return word.to_string();
    }

    let last = chars.len() - 1;
    let mut interior = chars[1..last].to_vec();
    interior.shuffle(rng);

    let mut scrambled = String::with_capacity(word.len());
    scrambled.push(chars[0]);
    scrambled.extend(interior);
    scrambled.push(chars[last]);
    scrambled
}
