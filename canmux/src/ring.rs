//! Fixed-capacity single-producer single-consumer ring buffer
//!
//! This is the only synchronization primitive in the stack. Every queue is
//! owned by exactly one component and shared between exactly one producer
//! context and one consumer context, e.g., a bus controller interrupt filling
//! the RX queue that the dispatch cycle drains. With that discipline the
//! read and write indices each have a single writer, so atomic index accesses
//! with acquire/release ordering are sufficient; no critical section is ever
//! entered and no operation suspends.
//!
//! One slot is always left empty to disambiguate full from empty:
//! `(write + 1) % N == read` means full, so a buffer of capacity `N` holds at
//! most `N - 1` elements and `occupied() + free() == N - 1` holds at all
//! times.
//!
//! Use the inherent `&mut self` methods for single-context queues and
//! [`RingBuffer::split`] to obtain [`Producer`]/[`Consumer`] ends that may
//! live in different execution contexts.

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicUsize, Ordering};

#[repr(transparent)]
struct Slot<T>(UnsafeCell<MaybeUninit<T>>);

pub struct RingBuffer<T, const N: usize> {
    read: AtomicUsize,
    write: AtomicUsize,
    slots: [Slot<T>; N],
}

// Safety: index updates are atomic and each index has a single writer under
// the SPSC discipline; slot contents are only written by the producer while
// unreachable from the consumer and vice versa.
unsafe impl<T: Copy + Send, const N: usize> Sync for RingBuffer<T, N> {}

impl<T: Copy, const N: usize> RingBuffer<T, N> {
    const _CAPACITY: () = assert!(N >= 2, "a ring buffer needs at least one usable slot");

    pub const fn new() -> Self {
        let () = Self::_CAPACITY;
        Self {
            read: AtomicUsize::new(0),
            write: AtomicUsize::new(0),
            slots: [const { Slot(UnsafeCell::new(MaybeUninit::uninit())) }; N],
        }
    }

    /// Splits the buffer into its producer and consumer ends.
    ///
    /// The ends may be moved to different execution contexts. The exclusive
    /// borrow guarantees there is at most one of each at any time.
    pub fn split(&mut self) -> (Producer<'_, T>, Consumer<'_, T>) {
        let view = View {
            read: &self.read,
            write: &self.write,
            slots: &self.slots,
        };
        (Producer { view }, Consumer { view })
    }

    pub fn push(&mut self, value: T) -> bool {
        self.view().push(value)
    }

    /// Pushes all items or none: fails without mutation if free space is
    /// insufficient.
    pub fn push_all(&mut self, items: &[T]) -> bool {
        self.view().push_all(items)
    }

    pub fn pop(&mut self) -> Option<T> {
        self.view().pop()
    }

    /// Pops up to `out.len()` elements in FIFO order, returning the count.
    pub fn pop_into(&mut self, out: &mut [T]) -> usize {
        self.view().pop_into(out)
    }

    pub fn occupied(&self) -> usize {
        self.view().occupied()
    }

    pub fn free(&self) -> usize {
        self.view().free()
    }

    pub fn is_empty(&self) -> bool {
        self.view().occupied() == 0
    }

    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Discards all queued data.
    pub fn clear(&mut self) {
        self.view().clear();
    }

    fn view(&self) -> View<'_, T> {
        View {
            read: &self.read,
            write: &self.write,
            slots: &self.slots,
        }
    }
}

impl<T: Copy, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
struct View<'a, T> {
    read: &'a AtomicUsize,
    write: &'a AtomicUsize,
    slots: &'a [Slot<T>],
}

impl<'a, T: Copy> View<'a, T> {
    fn push(&self, value: T) -> bool {
        let write = self.write.load(Ordering::Relaxed);
        let next = (write + 1) % self.slots.len();
        if next == self.read.load(Ordering::Acquire) {
            return false;
        }
        // Safety: the slot at `write` is outside the readable region, and
        // only the single producer writes it.
        unsafe { (*self.slots[write].0.get()).write(value) };
        self.write.store(next, Ordering::Release);
        true
    }

    fn push_all(&self, items: &[T]) -> bool {
        // Free space only grows from the consumer side, so the check cannot
        // be invalidated mid-loop in a single-producer context.
        if self.free() < items.len() {
            return false;
        }
        for &item in items {
            let pushed = self.push(item);
            debug_assert!(pushed);
        }
        true
    }

    fn pop(&self) -> Option<T> {
        let read = self.read.load(Ordering::Relaxed);
        if read == self.write.load(Ordering::Acquire) {
            return None;
        }
        // Safety: the slot at `read` was initialized by the producer before
        // the write index moved past it.
        let value = unsafe { (*self.slots[read].0.get()).assume_init_read() };
        self.read.store((read + 1) % self.slots.len(), Ordering::Release);
        Some(value)
    }

    fn pop_into(&self, out: &mut [T]) -> usize {
        let mut count = 0;
        while count < out.len() {
            match self.pop() {
                Some(value) => {
                    out[count] = value;
                    count += 1;
                }
                None => break,
            }
        }
        count
    }

    fn occupied(&self) -> usize {
        let write = self.write.load(Ordering::Acquire);
        let read = self.read.load(Ordering::Acquire);
        (self.slots.len() + write - read) % self.slots.len()
    }

    fn free(&self) -> usize {
        self.slots.len() - 1 - self.occupied()
    }

    fn clear(&self) {
        self.read
            .store(self.write.load(Ordering::Acquire), Ordering::Release);
    }
}

/// Producing end of a split [`RingBuffer`]
pub struct Producer<'a, T> {
    view: View<'a, T>,
}

// Safety: see the Sync rationale on RingBuffer; a producer is the single
// writer of the write index.
unsafe impl<T: Copy + Send> Send for Producer<'_, T> {}

impl<'a, T: Copy> Producer<'a, T> {
    pub fn push(&mut self, value: T) -> bool {
        self.view.push(value)
    }

    /// Pushes all items or none: fails without mutation if free space is
    /// insufficient.
    pub fn push_all(&mut self, items: &[T]) -> bool {
        self.view.push_all(items)
    }

    pub fn free(&self) -> usize {
        self.view.free()
    }
}

/// Consuming end of a split [`RingBuffer`]
pub struct Consumer<'a, T> {
    view: View<'a, T>,
}

// Safety: see the Sync rationale on RingBuffer; a consumer is the single
// writer of the read index.
unsafe impl<T: Copy + Send> Send for Consumer<'_, T> {}

impl<'a, T: Copy> Consumer<'a, T> {
    pub fn pop(&mut self) -> Option<T> {
        self.view.pop()
    }

    /// Pops up to `out.len()` elements in FIFO order, returning the count.
    pub fn pop_into(&mut self, out: &mut [T]) -> usize {
        self.view.pop_into(out)
    }

    pub fn occupied(&self) -> usize {
        self.view.occupied()
    }

    pub fn is_empty(&self) -> bool {
        self.view.occupied() == 0
    }

    /// Discards all queued data.
    pub fn clear(&mut self) {
        self.view.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut ring = RingBuffer::<u32, 8>::new();
        for value in 0..5 {
            assert!(ring.push(value));
        }
        for value in 0..5 {
            assert_eq!(ring.pop(), Some(value));
        }
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn test_full_push_fails_unchanged() {
        let mut ring = RingBuffer::<u8, 4>::new();
        assert_eq!(ring.capacity(), 3);
        for value in 0..3 {
            assert!(ring.push(value));
        }
        assert!(!ring.push(99));
        assert_eq!(ring.occupied(), 3);
        for value in 0..3 {
            assert_eq!(ring.pop(), Some(value));
        }
    }

    #[test]
    fn test_occupied_plus_free_invariant() {
        let mut ring = RingBuffer::<u8, 8>::new();
        for step in 0..20 {
            assert_eq!(ring.occupied() + ring.free(), 7);
            ring.push(step);
            assert_eq!(ring.occupied() + ring.free(), 7);
            if step % 3 == 0 {
                ring.pop();
            }
        }
    }

    #[test]
    fn test_wrap_around() {
        let mut ring = RingBuffer::<u16, 4>::new();
        for value in 0..100u16 {
            assert!(ring.push(value));
            assert!(ring.push(value + 1000));
            assert_eq!(ring.pop(), Some(value));
            assert_eq!(ring.pop(), Some(value + 1000));
        }
    }

    #[test]
    fn test_push_all_is_atomic() {
        let mut ring = RingBuffer::<u8, 6>::new();
        assert!(ring.push(7));
        assert!(!ring.push_all(&[1, 2, 3, 4, 5]));
        assert_eq!(ring.occupied(), 1);
        assert!(ring.push_all(&[1, 2, 3, 4]));
        assert_eq!(ring.occupied(), 5);
        assert_eq!(ring.pop(), Some(7));
    }

    #[test]
    fn test_pop_into() {
        let mut ring = RingBuffer::<u8, 8>::new();
        ring.push_all(&[1, 2, 3]);

        let mut out = [0u8; 8];
        assert_eq!(ring.pop_into(&mut out), 3);
        assert_eq!(&out[..3], &[1, 2, 3]);
        assert_eq!(ring.pop_into(&mut out), 0);

        ring.push_all(&[4, 5, 6]);
        assert_eq!(ring.pop_into(&mut out[..2]), 2);
        assert_eq!(&out[..2], &[4, 5]);
        assert_eq!(ring.pop(), Some(6));
    }

    #[test]
    fn test_clear() {
        let mut ring = RingBuffer::<u8, 8>::new();
        ring.push_all(&[1, 2, 3]);
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.pop(), None);
        assert!(ring.push(9));
        assert_eq!(ring.pop(), Some(9));
    }

    #[test]
    fn test_split_ends() {
        let mut ring = RingBuffer::<u8, 4>::new();
        let (mut producer, mut consumer) = ring.split();

        assert!(producer.push(1));
        assert!(producer.push(2));
        assert_eq!(consumer.occupied(), 2);
        assert_eq!(consumer.pop(), Some(1));
        assert!(producer.push(3));
        assert!(producer.push(4));
        assert!(!producer.push(5));
        assert_eq!(consumer.pop(), Some(2));
        assert_eq!(consumer.pop(), Some(3));
        assert_eq!(consumer.pop(), Some(4));
        assert!(consumer.is_empty());
    }
}
