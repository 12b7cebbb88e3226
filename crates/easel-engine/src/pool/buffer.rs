use std::fmt;
use std::sync::Arc;

use super::PoolError;

/// Index of one of the N frames that can be in flight at once.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct FrameSlot(pub u32);

impl FrameSlot {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The slot after this one, wrapping at `frames_in_flight`.
    #[inline]
    pub const fn next(self, frames_in_flight: u32) -> Self {
        if frames_in_flight == 0 {
            return Self(0);
        }
        Self((self.0 + 1) % frames_in_flight)
    }
}

impl fmt::Display for FrameSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {}", self.0)
    }
}

/// Pool-unique id of an allocation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BufferId(pub(crate) u64);

/// Creates device buffers on behalf of a [`BufferPool`](super::BufferPool).
///
/// The pool never inspects the buffer; it only tracks capacity and ownership.
/// Buffers must be writable through the owning backend (`COPY_DST` on wgpu) and
/// usable as vertex, index and uniform storage.
pub trait BufferAllocator {
    type Buffer: Send + Sync + 'static;

    /// Allocates a buffer of exactly `size` bytes for `slot`.
    fn allocate(&self, size: u64, slot: FrameSlot) -> Result<Self::Buffer, PoolError>;
}

/// A buffer handed out by the pool.
///
/// Cloning shares the underlying allocation. Give it back with
/// [`BufferPool::release`](super::BufferPool::release) once the GPU no longer reads it.
pub struct PooledBuffer<B> {
    pub(crate) id: BufferId,
    pub(crate) slot: FrameSlot,
    pub(crate) capacity: u64,
    pub(crate) buffer: Arc<B>,
}

impl<B> PooledBuffer<B> {
    #[inline]
    pub fn id(&self) -> BufferId {
        self.id
    }

    #[inline]
    pub fn slot(&self) -> FrameSlot {
        self.slot
    }

    /// Allocated size in bytes; never smaller than the size requested at acquisition.
    #[inline]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    #[inline]
    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    /// True when both handles refer to the same allocation.
    #[inline]
    pub fn same_instance(&self, other: &PooledBuffer<B>) -> bool {
        Arc::ptr_eq(&self.buffer, &other.buffer)
    }
}

impl<B> Clone for PooledBuffer<B> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            slot: self.slot,
            capacity: self.capacity,
            buffer: Arc::clone(&self.buffer),
        }
    }
}

impl<B> fmt::Debug for PooledBuffer<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("id", &self.id)
            .field("slot", &self.slot)
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_wrap_around() {
        assert_eq!(FrameSlot(0).next(3), FrameSlot(1));
        assert_eq!(FrameSlot(2).next(3), FrameSlot(0));
        assert_eq!(FrameSlot(0).next(1), FrameSlot(0));
    }
}
