use std::sync::Arc;

use super::{BufferAllocator, BufferId, FrameSlot, PoolError, PooledBuffer};

/// Minimum allocation size (64KB).
const DEFAULT_MIN_ALLOCATION: u64 = 64 * 1024;

/// Allocation sizes are rounded up to this many bytes.
const DEFAULT_GRANULARITY: u64 = 256;

/// Sizing policy for new allocations.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PoolConfig {
    /// Smallest buffer the pool creates, so tiny requests share one reusable size class.
    pub min_allocation: u64,
    /// Allocation sizes are rounded up to a multiple of this (treated as 4 if smaller).
    pub granularity: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_allocation: DEFAULT_MIN_ALLOCATION,
            granularity: DEFAULT_GRANULARITY,
        }
    }
}

impl PoolConfig {
    /// Size actually allocated for a request of `min_size` bytes.
    pub fn allocation_size(&self, min_size: u64) -> u64 {
        let granularity = self.granularity.max(4);
        let size = min_size.max(self.min_allocation).max(1);
        size.div_ceil(granularity).saturating_mul(granularity)
    }
}

struct Entry<B> {
    id: BufferId,
    capacity: u64,
    buffer: Arc<B>,
}

struct SlotBuffers<B> {
    available: Vec<Entry<B>>,
    acquired: Vec<Entry<B>>,
}

impl<B> Default for SlotBuffers<B> {
    fn default() -> Self {
        Self {
            available: Vec::new(),
            acquired: Vec::new(),
        }
    }
}

/// Device buffers recycled per in-flight frame slot.
///
/// - `acquire()` is first-fit over the slot's available buffers, allocating only on a miss
/// - `release()` moves a buffer back to available without deallocating it
/// - a buffer belongs to the slot it was allocated for, for its whole lifetime
///
/// The pool itself is not synchronized. The frame pipeline shares it behind a
/// `Mutex` between the recording thread and GPU completion callbacks.
pub struct BufferPool<A: BufferAllocator> {
    allocator: A,
    config: PoolConfig,
    slots: Vec<SlotBuffers<A::Buffer>>,
    next_id: u64,
}

impl<A: BufferAllocator> BufferPool<A> {
    /// Creates an empty pool with `frames_in_flight` slots (at least one).
    pub fn new(allocator: A, frames_in_flight: u32, config: PoolConfig) -> Self {
        let slots = (0..frames_in_flight.max(1)).map(|_| SlotBuffers::default()).collect();
        Self {
            allocator,
            config,
            slots,
            next_id: 0,
        }
    }

    #[inline]
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    #[inline]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Returns a buffer of at least `min_size` bytes owned by `slot`.
    ///
    /// Never blocks. Allocation failures are returned to the caller, which
    /// decides what to drop.
    pub fn acquire(&mut self, min_size: u64, slot: FrameSlot) -> Result<PooledBuffer<A::Buffer>, PoolError> {
        let slots = self.slots.len();
        let Some(buffers) = self.slots.get_mut(slot.index()) else {
            return Err(PoolError::InvalidSlot { slot, slots });
        };

        let entry = match buffers.available.iter().position(|e| e.capacity >= min_size) {
            Some(i) => buffers.available.swap_remove(i),
            None => {
                let size = self.config.allocation_size(min_size);
                let buffer = self.allocator.allocate(size, slot)?;
                let id = BufferId(self.next_id);
                self.next_id += 1;
                log::debug!("buffer pool: allocated {size} bytes for {slot} (requested {min_size})");
                Entry {
                    id,
                    capacity: size,
                    buffer: Arc::new(buffer),
                }
            }
        };

        let handle = PooledBuffer {
            id: entry.id,
            slot,
            capacity: entry.capacity,
            buffer: Arc::clone(&entry.buffer),
        };
        buffers.acquired.push(entry);
        Ok(handle)
    }

    /// Moves `buffer` from acquired back to available for its slot.
    ///
    /// Releasing a buffer the pool does not consider acquired is logged and ignored.
    pub fn release(&mut self, buffer: &PooledBuffer<A::Buffer>) {
        let Some(buffers) = self.slots.get_mut(buffer.slot.index()) else {
            log::warn!("buffer pool: release for unknown {}; ignored", buffer.slot);
            return;
        };
        match buffers.acquired.iter().position(|e| e.id == buffer.id) {
            Some(i) => {
                let entry = buffers.acquired.swap_remove(i);
                buffers.available.push(entry);
            }
            None => log::warn!(
                "buffer pool: release of buffer {:?} not acquired in {}; ignored",
                buffer.id,
                buffer.slot
            ),
        }
    }

    /// Marks `slot` as no longer read by the GPU.
    ///
    /// Buffers are neither moved nor freed. Anything still acquired at this
    /// point was never released by its frame and is reported.
    pub fn reset_frame(&mut self, slot: FrameSlot) {
        let Some(buffers) = self.slots.get(slot.index()) else {
            log::warn!("buffer pool: reset_frame for unknown {slot}; ignored");
            return;
        };
        if !buffers.acquired.is_empty() {
            log::warn!(
                "buffer pool: {} buffer(s) still acquired when {slot} was reset",
                buffers.acquired.len()
            );
        }
    }

    /// Drops every buffer in every slot.
    ///
    /// Handles still held by callers keep their allocation alive, but the pool
    /// forgets them; releasing them later is ignored.
    pub fn clear(&mut self) {
        let dropped = self.pool_size();
        for buffers in &mut self.slots {
            buffers.available.clear();
            buffers.acquired.clear();
        }
        if dropped > 0 {
            log::debug!("buffer pool: cleared {dropped} buffer(s)");
        }
    }

    /// Total number of buffers tracked, acquired and available.
    pub fn pool_size(&self) -> usize {
        self.acquired_count() + self.available_count()
    }

    pub fn acquired_count(&self) -> usize {
        self.slots.iter().map(|s| s.acquired.len()).sum()
    }

    pub fn available_count(&self) -> usize {
        self.slots.iter().map(|s| s.available.len()).sum()
    }

    /// Number of buffers owned by `slot` (0 for an unknown slot).
    pub fn slot_size(&self, slot: FrameSlot) -> usize {
        self.slots
            .get(slot.index())
            .map_or(0, |s| s.acquired.len() + s.available.len())
    }

    /// Bytes allocated across all slots.
    pub fn allocated_bytes(&self) -> u64 {
        self.slots
            .iter()
            .flat_map(|s| s.available.iter().chain(s.acquired.iter()))
            .map(|e| e.capacity)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[derive(Debug)]
    struct TestBuffer {
        size: u64,
        slot: FrameSlot,
    }

    #[derive(Default)]
    struct CountingAllocator {
        allocations: Cell<usize>,
        limit: Option<u64>,
    }

    impl BufferAllocator for CountingAllocator {
        type Buffer = TestBuffer;

        fn allocate(&self, size: u64, slot: FrameSlot) -> Result<TestBuffer, PoolError> {
            if self.limit.is_some_and(|limit| size > limit) {
                return Err(PoolError::Allocation {
                    size,
                    slot,
                    reason: "over limit".into(),
                });
            }
            self.allocations.set(self.allocations.get() + 1);
            Ok(TestBuffer { size, slot })
        }
    }

    fn pool(slots: u32) -> BufferPool<CountingAllocator> {
        let config = PoolConfig {
            min_allocation: 0,
            granularity: 4,
        };
        BufferPool::new(CountingAllocator::default(), slots, config)
    }

    // ── acquire / release ─────────────────────────────────────────────────

    #[test]
    fn release_moves_to_available_and_reacquire_reuses_instance() {
        let mut p = pool(3);
        let a = p.acquire(256, FrameSlot(0)).unwrap();
        assert_eq!(p.pool_size(), 1);
        assert_eq!(p.acquired_count(), 1);

        p.release(&a);
        assert_eq!(p.pool_size(), 1);
        assert_eq!(p.acquired_count(), 0);
        assert_eq!(p.available_count(), 1);

        let b = p.acquire(128, FrameSlot(0)).unwrap();
        assert!(a.same_instance(&b));
        assert_eq!(p.allocator().allocations.get(), 1);
    }

    #[test]
    fn distinct_slots_get_distinct_buffers() {
        let mut p = pool(3);
        let buffers: Vec<_> = (0..3)
            .map(|s| p.acquire(1000, FrameSlot(s)).unwrap())
            .collect();

        for (i, a) in buffers.iter().enumerate() {
            assert!(a.capacity() >= 1000);
            assert_eq!(a.buffer().slot, FrameSlot(i as u32));
            for b in &buffers[i + 1..] {
                assert!(!a.same_instance(b));
            }
        }
        assert_eq!(p.pool_size(), 3);
    }

    #[test]
    fn released_buffer_is_not_shared_across_slots() {
        let mut p = pool(2);
        let a = p.acquire(64, FrameSlot(0)).unwrap();
        p.release(&a);
        let b = p.acquire(64, FrameSlot(1)).unwrap();
        assert!(!a.same_instance(&b));
        assert_eq!(p.slot_size(FrameSlot(0)), 1);
        assert_eq!(p.slot_size(FrameSlot(1)), 1);
    }

    #[test]
    fn too_small_available_buffer_is_skipped() {
        let mut p = pool(1);
        let small = p.acquire(64, FrameSlot(0)).unwrap();
        p.release(&small);
        let big = p.acquire(4096, FrameSlot(0)).unwrap();
        assert!(!small.same_instance(&big));
        assert!(big.buffer().size >= 4096);
        assert_eq!(p.pool_size(), 2);
        assert_eq!(p.available_count(), 1);
    }

    #[test]
    fn acquired_buffers_are_never_handed_out_twice() {
        let mut p = pool(1);
        let a = p.acquire(64, FrameSlot(0)).unwrap();
        let b = p.acquire(64, FrameSlot(0)).unwrap();
        assert!(!a.same_instance(&b));
    }

    #[test]
    fn double_release_is_ignored() {
        let mut p = pool(1);
        let a = p.acquire(64, FrameSlot(0)).unwrap();
        p.release(&a);
        p.release(&a);
        assert_eq!(p.available_count(), 1);
        assert_eq!(p.pool_size(), 1);
    }

    // ── failures ──────────────────────────────────────────────────────────

    #[test]
    fn invalid_slot_is_an_error() {
        let mut p = pool(2);
        let err = p.acquire(64, FrameSlot(5)).unwrap_err();
        assert_eq!(err, PoolError::InvalidSlot { slot: FrameSlot(5), slots: 2 });
    }

    #[test]
    fn allocation_failure_leaves_pool_unchanged() {
        let allocator = CountingAllocator {
            limit: Some(1024),
            ..Default::default()
        };
        let mut p = BufferPool::new(allocator, 1, PoolConfig { min_allocation: 0, granularity: 4 });
        assert!(matches!(p.acquire(4096, FrameSlot(0)), Err(PoolError::Allocation { .. })));
        assert_eq!(p.pool_size(), 0);
        assert!(p.acquire(512, FrameSlot(0)).is_ok());
    }

    // ── sizing ────────────────────────────────────────────────────────────

    #[test]
    fn allocation_size_rounds_up() {
        let c = PoolConfig::default();
        assert_eq!(c.allocation_size(1), DEFAULT_MIN_ALLOCATION);
        assert_eq!(c.allocation_size(DEFAULT_MIN_ALLOCATION + 1), DEFAULT_MIN_ALLOCATION + 256);

        let tight = PoolConfig { min_allocation: 0, granularity: 0 };
        assert_eq!(tight.allocation_size(0), 4);
        assert_eq!(tight.allocation_size(9), 12);
    }

    // ── clear / reset ─────────────────────────────────────────────────────

    #[test]
    fn clear_drops_everything() {
        let mut p = pool(2);
        let a = p.acquire(64, FrameSlot(0)).unwrap();
        let _b = p.acquire(64, FrameSlot(1)).unwrap();
        p.release(&a);
        p.clear();
        assert_eq!(p.pool_size(), 0);
        assert_eq!(p.acquired_count(), 0);
        assert_eq!(p.available_count(), 0);
        assert_eq!(p.allocated_bytes(), 0);
    }

    #[test]
    fn reset_frame_keeps_buffers() {
        let mut p = pool(2);
        let a = p.acquire(64, FrameSlot(1)).unwrap();
        p.release(&a);
        p.reset_frame(FrameSlot(1));
        p.reset_frame(FrameSlot(9));
        assert_eq!(p.slot_size(FrameSlot(1)), 1);
        let b = p.acquire(64, FrameSlot(1)).unwrap();
        assert!(a.same_instance(&b));
    }
}
