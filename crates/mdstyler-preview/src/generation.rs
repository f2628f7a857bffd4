//! Render generations.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counter identifying source document versions.
///
/// Every render takes a new generation before it starts. A finished render
/// may only be committed while its generation is still the latest one.
#[derive(Debug, Default)]
pub struct GenerationCounter {
    latest: AtomicU64,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation and return it. The first generation is 1.
    pub fn advance(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// The latest generation handed out, 0 before the first render.
    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.latest() == generation
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_generations_supersede() {
        let counter = GenerationCounter::new();
        assert_eq!(counter.latest(), 0);

        let first = counter.advance();
        assert!(counter.is_current(first));

        let second = counter.advance();
        assert_eq!((first, second), (1, 2));
        assert!(!counter.is_current(first));
        assert!(counter.is_current(second));
    }
}
