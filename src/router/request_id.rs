//! Correlation ID allocation.
//!
//! IDs start at 1, grow by one and wrap from `u32::MAX` back to 1. Zero is
//! never handed out.

/// Monotonic u32 counter owned by a single task.
#[derive(Debug, Clone, Default)]
pub(crate) struct RequestIdAllocator {
    last: u32,
}

impl RequestIdAllocator {
    /// Allocator whose first ID is 1.
    pub fn new() -> Self {
        Self { last: 0 }
    }

    /// Allocator whose next ID follows `last`.
    #[cfg(test)]
    pub fn starting_after(last: u32) -> Self {
        Self { last }
    }

    /// Issue the next ID.
    pub fn next_id(&mut self) -> u32 {
        if self.last == u32::MAX {
            self.last = 0;
        }
        self.last += 1;
        self.last
    }
}
