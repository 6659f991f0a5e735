//! Uniform random sampling for limiting export scope.

/// Draws a uniform sample of `k` items from a list.
///
/// A limit of zero means "no limit"; a limit at or above the list length
/// passes the list through unchanged, preserving order.
pub struct Sampler {
    rng: fastrand::Rng,
}

impl Sampler {
    pub fn new() -> Self {
        Self {
            rng: fastrand::Rng::new(),
        }
    }

    /// Seeded constructor for reproducible runs.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    pub fn sample<T>(&mut self, mut items: Vec<T>, limit: usize) -> Vec<T> {
        if limit == 0 || limit >= items.len() {
            return items;
        }
        self.rng.shuffle(&mut items);
        items.truncate(limit);
        items
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_limit_passes_through_in_order() {
        let items = vec![1, 2, 3, 4, 5];
        assert_eq!(Sampler::new().sample(items.clone(), 0), items);
    }

    #[test]
    fn limit_at_or_above_length_passes_through_in_order() {
        let items = vec![1, 2, 3];
        assert_eq!(Sampler::new().sample(items.clone(), 3), items);
        assert_eq!(Sampler::new().sample(items.clone(), 10), items);
    }

    #[test]
    fn sample_has_requested_size_and_no_duplicates() {
        let items: Vec<u32> = (0..100).collect();
        let picked = Sampler::new().sample(items, 10);
        assert_eq!(picked.len(), 10);

        let mut sorted = picked.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 10);
        assert!(picked.iter().all(|n| *n < 100));
    }

    #[test]
    fn seeded_sampling_is_deterministic() {
        let items: Vec<u32> = (0..50).collect();
        let a = Sampler::with_seed(7).sample(items.clone(), 5);
        let b = Sampler::with_seed(7).sample(items, 5);
        assert_eq!(a, b);
    }
}
