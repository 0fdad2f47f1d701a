//! Slot Generations
//!
//! Each arena slot carries a generation counter that increments when
//! the slot is released. Ids captured before the release keep the old
//! generation and stop resolving.

/// Generation counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Generation(u32);

impl Generation {
    /// Initial generation (never released)
    pub const INITIAL: Self = Generation(0);

    /// Get the raw value
    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Get the next generation
    #[inline]
    pub const fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_next() {
        let g = Generation::INITIAL;
        assert_eq!(g.next().value(), 1);
        assert_eq!(Generation(u32::MAX).next(), Generation::INITIAL);
    }
}
