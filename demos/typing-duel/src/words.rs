//! Random word generation for the demo.
//!
//! Gameplay, not synchronization: the session layer transports whatever
//! words it is given. Kind probabilities are normal 0.8, malus 0.1,
//! bonus 0.1.

use rand::Rng;
use rand::seq::IndexedRandom;
use wordwire::Word;

const BANK: &[&str] = &[
    "anchor", "breeze", "cursor", "dagger", "ember", "falcon", "glacier",
    "harbor", "ignite", "jigsaw", "kernel", "lantern", "marble", "nectar",
    "orbit", "prism", "quiver", "raven", "saddle", "tunnel", "umbra",
    "velvet", "willow", "xenon", "yonder", "zephyr",
];

/// Draws one word from the bank with a randomly rolled kind.
pub fn random_word(rng: &mut impl Rng) -> Word {
    let content = *BANK.choose(rng).unwrap_or(&"rust");
    let roll: f64 = rng.random();
    if roll < 0.1 {
        Word::bonus(content)
    } else if roll < 0.2 {
        Word::malus(content)
    } else {
        Word::normal(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wordwire::WordKind;

    #[test]
    fn test_generated_words_come_from_the_bank() {
        let mut rng = rand::rng();
        for _ in 0..100 {
            let word = random_word(&mut rng);
            assert!(BANK.contains(&word.content()));
        }
    }

    #[test]
    fn test_all_kinds_show_up_eventually() {
        let mut rng = rand::rng();
        let mut seen = [false; 3];
        for _ in 0..2000 {
            match random_word(&mut rng).kind() {
                WordKind::Normal => seen[0] = true,
                WordKind::Bonus => seen[1] = true,
                WordKind::Malus => seen[2] = true,
            }
        }
        assert_eq!(seen, [true; 3]);
    }
}
