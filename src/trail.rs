// Fixed-capacity ring of the most recent pointer samples.
// Visual expectation: the newest sample is the brightest dot; once the ring
// is full, every push silently drops the oldest dot off the tail.

use crate::types::Sample;

pub struct TrailBuffer {
    slots: Vec<Sample>, // length never changes after `new`
    head: usize,        // next slot to overwrite
}

impl TrailBuffer {
    /// Allocate `capacity` never-written slots.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "trail capacity must be non-zero");
        Self { slots: vec![Sample::default(); capacity], head: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Record a sample at `head` and advance. O(1), overwrites unconditionally.
    pub fn push(&mut self, x: i32, y: i32, clicked: bool) {
        self.slots[self.head] = Sample { x, y, valid: true, clicked };
        self.head = (self.head + 1) % self.slots.len();
    }

    /// Walk from the newest slot (age 0) back to the oldest (age N-1).
    /// Every slot is yielded; callers must check `valid`.
    pub fn iter_by_age(&self) -> impl Iterator<Item = (usize, Sample)> + '_ {
        let n = self.slots.len();
        (0..n).map(move |age| (age, self.slots[(self.head + n - 1 - age) % n]))
    }

    /// Number of slots holding real data.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.valid).count()
    }
}
