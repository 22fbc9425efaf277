//! Two-slot buffer with a read side and a write side.

/// A pair of resources where one is read while the other is written.
///
/// Operators read [`current`](Self::current), write [`next`](Self::next)
/// and then [`swap`](Self::swap), so after `k` operators the current slot is
/// the one written by the `k`-th.
#[derive(Clone, Debug)]
pub struct PingPong<T> {
    slots: [T; 2],
    current: usize,
}

impl<T> PingPong<T> {
    /// `first` starts as the current slot.
    pub fn new(first: T, second: T) -> Self {
        Self {
            slots: [first, second],
            current: 0,
        }
    }

    /// Build both slots from a constructor taking the slot index.
    pub fn from_fn(mut make: impl FnMut(usize) -> T) -> Self {
        let first = make(0);
        let second = make(1);
        Self::new(first, second)
    }

    /// The readable slot.
    #[inline]
    pub fn current(&self) -> &T {
        &self.slots[self.current]
    }

    /// Mutable access to the readable slot.
    #[inline]
    pub fn current_mut(&mut self) -> &mut T {
        &mut self.slots[self.current]
    }

    /// The write target.
    #[inline]
    pub fn next(&self) -> &T {
        &self.slots[1 - self.current]
    }

    /// Mutable access to the write target.
    #[inline]
    pub fn next_mut(&mut self) -> &mut T {
        &mut self.slots[1 - self.current]
    }

    /// Borrow the read slot and the write slot at once.
    pub fn split(&mut self) -> (&T, &mut T) {
        let [a, b] = &mut self.slots;
        if self.current == 0 {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Index of the current slot, 0 or 1.
    #[inline]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Make the slot just written the current one.
    #[inline]
    pub fn swap(&mut self) {
        self.current = 1 - self.current;
    }
}
