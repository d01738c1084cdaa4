use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};

/// Randomises the order in which recipients are processed.
///
/// Tokens land in the ledger in processing order, so processing in list order
/// would let anyone holding both files pair line N with member N. The RNG is
/// seeded from the OS and has nothing to do with the campaign salt.
#[derive(Debug, Clone)]
pub struct RecipientShuffler<R = StdRng> {
    rng: R,
}

impl RecipientShuffler<StdRng> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }
}

impl Default for RecipientShuffler<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> RecipientShuffler<R> {
    pub const fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Uniformly permute `items` (Fisher-Yates).
    pub fn shuffle<T>(&mut self, mut items: Vec<T>) -> Vec<T> {
        items.shuffle(&mut self.rng);
        ballot_common::internal!("Shuffled {} recipients", items.len());
        items
    }
}

#[cfg(test)]
mod tests {
    use ballot_common::Recipient;

    use super::*;

    fn members(count: usize) -> Vec<Recipient> {
        (0..count)
            .map(|i| Recipient::new(format!("Member {i}"), format!("m{i}@example.org")))
            .collect()
    }

    #[test]
    fn test_is_a_permutation() {
        let input = members(50);
        let mut shuffled = RecipientShuffler::new().shuffle(input.clone());

        assert_eq!(shuffled.len(), input.len());
        shuffled.sort_by(|a, b| a.address.cmp(&b.address));
        let mut expected = input;
        expected.sort_by(|a, b| a.address.cmp(&b.address));
        assert_eq!(shuffled, expected);
    }

    #[test]
    fn test_different_seeds_give_different_orders() {
        let input = members(20);
        let first = RecipientShuffler::with_rng(StdRng::seed_from_u64(1)).shuffle(input.clone());
        let second = RecipientShuffler::with_rng(StdRng::seed_from_u64(2)).shuffle(input.clone());

        assert_ne!(first, second);
        assert_ne!(first, input);
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let input = members(20);
        let first = RecipientShuffler::with_rng(StdRng::seed_from_u64(7)).shuffle(input.clone());
        let second = RecipientShuffler::with_rng(StdRng::seed_from_u64(7)).shuffle(input);

        assert_eq!(first, second);
    }

    #[test]
    fn test_each_position_moves() {
        // Every member should land away from its input slot at least once
        // across a handful of shuffles.
        let input = members(10);
        let mut shuffler = RecipientShuffler::with_rng(StdRng::seed_from_u64(42));
        let mut moved = [false; 10];

        for _ in 0..50 {
            let output = shuffler.shuffle(input.clone());
            for (i, recipient) in output.iter().enumerate() {
                if recipient != &input[i] {
                    moved[i] = true;
                }
            }
        }

        assert!(moved.iter().all(|m| *m));
    }

    #[test]
    fn test_empty_and_single() {
        let mut shuffler = RecipientShuffler::new();
        assert!(shuffler.shuffle(Vec::<Recipient>::new()).is_empty());
        assert_eq!(shuffler.shuffle(members(1)), members(1));
    }
}
