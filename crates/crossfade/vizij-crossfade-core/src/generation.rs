//! Generation counter used as the cancellation token between requests.
//!
//! Every top-level request advances the counter exactly once and keeps the
//! returned [`Generation`]. After each suspension point a task compares its
//! token against the live counter; on mismatch it stops without touching
//! slots or weights again. There is no other cancellation signal.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Generation(pub u64);

#[derive(Debug, Default)]
pub struct GenerationCounter {
    current: Generation,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance and return the post-increment value.
    #[inline]
    pub fn advance(&mut self) -> Generation {
        self.current = Generation(self.current.0.wrapping_add(1));
        self.current
    }

    #[inline]
    pub fn current(&self) -> Generation {
        self.current
    }

    #[inline]
    pub fn is_current(&self, generation: Generation) -> bool {
        self.current == generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_returns_post_increment_value() {
        let mut counter = GenerationCounter::new();
        assert_eq!(counter.current(), Generation(0));
        let first = counter.advance();
        assert_eq!(first, Generation(1));
        assert!(counter.is_current(first));

        let second = counter.advance();
        assert!(!counter.is_current(first));
        assert!(counter.is_current(second));
        assert!(second > first);
    }
}
