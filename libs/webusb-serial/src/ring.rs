/// Fixed-capacity circular byte queue.
///
/// A push into a full channel is refused and leaves the indices untouched, so losing a byte never
/// corrupts the queue. `head` is the next slot to write, `tail` the next slot to read.
pub struct RingChannel<const N: usize> {
    data: [u8; N],
    head: usize,
    tail: usize,
    count: usize,
}

impl<const N: usize> RingChannel<N> {
    pub const fn new() -> Self { RingChannel { data: [0u8; N], head: 0, tail: 0, count: 0 } }

    /// Reinitializes the indices. Callers sharing the channel with an interrupt handler must do this
    /// inside a critical section.
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }

    /// Returns `false` (and drops `byte`) when the channel is full.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }
        self.data[self.head] = byte;
        self.head = (self.head + 1) % N;
        self.count += 1;
        true
    }

    pub fn pop(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let byte = self.data[self.tail];
        self.tail = (self.tail + 1) % N;
        self.count -= 1;
        Some(byte)
    }

    pub fn peek(&self) -> Option<u8> { if self.is_empty() { None } else { Some(self.data[self.tail]) } }

    /// Moves up to `dest.len()` bytes out of the channel, oldest first.
    pub fn drain_into(&mut self, dest: &mut [u8]) -> usize {
        let mut moved = 0;
        for slot in dest.iter_mut() {
            match self.pop() {
                Some(b) => {
                    *slot = b;
                    moved += 1;
                }
                None => break,
            }
        }
        moved
    }

    pub fn len(&self) -> usize { self.count }

    pub fn is_empty(&self) -> bool { self.count == 0 }

    pub fn is_full(&self) -> bool { self.count == N }

    pub const fn capacity(&self) -> usize { N }

    pub fn free(&self) -> usize { N - self.count }
}

impl<const N: usize> Default for RingChannel<N> {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut ring = RingChannel::<32>::new();
        for i in 0..32u8 {
            assert!(ring.push(i));
        }
        for i in 0..32u8 {
            assert_eq!(ring.pop(), Some(i));
        }
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn test_full_push_is_noop() {
        let mut ring = RingChannel::<8>::new();
        for i in 0..8u8 {
            assert!(ring.push(i));
        }
        assert!(ring.is_full());
        assert!(!ring.push(0xaa));
        assert!(!ring.push(0xbb));
        assert_eq!(ring.len(), 8);
        // the refused bytes never show up
        let mut out = [0u8; 16];
        assert_eq!(ring.drain_into(&mut out), 8);
        assert_eq!(&out[..8], &[0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_wraparound_and_clear() {
        let mut ring = RingChannel::<4>::new();
        for round in 0..10u8 {
            assert!(ring.push(round));
            assert!(ring.push(round.wrapping_add(100)));
            assert_eq!(ring.peek(), Some(round));
            assert_eq!(ring.pop(), Some(round));
            assert_eq!(ring.pop(), Some(round.wrapping_add(100)));
        }
        ring.push(1);
        ring.push(2);
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.free(), 4);
        assert_eq!(ring.peek(), None);
    }

    #[test]
    fn test_matches_model_under_random_traffic() {
        let mut rng = ChaCha8Rng::seed_from_u64(0x5745_4255);
        let mut ring = RingChannel::<32>::new();
        let mut model: VecDeque<u8> = VecDeque::new();
        for _ in 0..10_000 {
            if rng.gen_bool(0.55) {
                let b: u8 = rng.gen();
                let accepted = ring.push(b);
                assert_eq!(accepted, model.len() < 32);
                if accepted {
                    model.push_back(b);
                }
            } else {
                assert_eq!(ring.pop(), model.pop_front());
            }
            assert!(ring.len() <= ring.capacity());
            assert_eq!(ring.len(), model.len());
            assert_eq!(ring.peek(), model.front().copied());
        }
    }
}
