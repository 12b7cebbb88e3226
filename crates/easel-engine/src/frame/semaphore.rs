use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::pool::FrameSlot;

/// Counting semaphore bounding the number of frames in flight, one permit per slot.
///
/// Permits are taken by the recording thread in `begin_frame` and returned
/// from GPU completion callbacks, which may run on any thread. Each permit is
/// tied to a slot: acquiring a slot waits for that slot's own completion, so a
/// permit returned early by another slot never hands out a slot still in use.
#[derive(Debug)]
pub struct FrameSemaphore {
    state: Mutex<SlotState>,
    cond: Condvar,
}

#[derive(Debug)]
struct SlotState {
    busy: Vec<bool>,
    free: usize,
}

impl SlotState {
    fn is_free(&self, slot: FrameSlot) -> bool {
        self.busy.get(slot.index()).is_some_and(|busy| !busy)
    }

    fn take(&mut self, slot: FrameSlot) {
        self.busy[slot.index()] = true;
        self.free -= 1;
    }
}

impl FrameSemaphore {
    pub fn new(slots: usize) -> Self {
        Self {
            state: Mutex::new(SlotState {
                busy: vec![false; slots],
                free: slots,
            }),
            cond: Condvar::new(),
        }
    }

    /// Takes `slot`'s permit if that slot is free.
    pub fn try_acquire(&self, slot: FrameSlot) -> bool {
        let mut state = self.lock();
        if !state.is_free(slot) {
            return false;
        }
        state.take(slot);
        true
    }

    /// Waits up to `timeout` for `slot` to be released. Returns `false` on timeout.
    pub fn acquire_timeout(&self, slot: FrameSlot, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        while !state.is_free(slot) {
            let now = Instant::now();
            if now >= deadline || slot.index() >= state.busy.len() {
                return false;
            }
            state = self
                .cond
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        state.take(slot);
        true
    }

    /// Returns `slot`'s permit. Releasing a slot that is not held is logged and ignored.
    pub fn release(&self, slot: FrameSlot) {
        let mut state = self.lock();
        match state.busy.get_mut(slot.index()) {
            Some(busy) if *busy => *busy = false,
            _ => {
                log::warn!("frame semaphore: {slot} released while not held; ignored");
                return;
            }
        }
        state.free += 1;
        drop(state);
        self.cond.notify_all();
    }

    /// True while `slot`'s permit is held.
    pub fn is_busy(&self, slot: FrameSlot) -> bool {
        self.lock().busy.get(slot.index()).copied().unwrap_or(false)
    }

    /// Currently free permits.
    pub fn available(&self) -> usize {
        self.lock().free
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.lock().busy.len()
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn permits_are_counted_per_slot() {
        let s = FrameSemaphore::new(2);
        assert!(s.try_acquire(FrameSlot(0)));
        assert!(!s.try_acquire(FrameSlot(0)));
        assert!(s.try_acquire(FrameSlot(1)));
        assert_eq!(s.available(), 0);

        s.release(FrameSlot(1));
        assert_eq!(s.available(), 1);
        assert!(!s.is_busy(FrameSlot(1)));
        assert!(s.is_busy(FrameSlot(0)));
    }

    #[test]
    fn free_slot_does_not_unlock_a_busy_one() {
        let s = FrameSemaphore::new(2);
        assert!(s.try_acquire(FrameSlot(0)));
        assert!(s.try_acquire(FrameSlot(1)));
        s.release(FrameSlot(1));

        assert!(!s.try_acquire(FrameSlot(0)));
        assert!(!s.acquire_timeout(FrameSlot(0), Duration::from_millis(10)));
        assert_eq!(s.available(), 1);
    }

    #[test]
    fn release_of_a_free_or_unknown_slot_is_ignored() {
        let s = FrameSemaphore::new(1);
        s.release(FrameSlot(0));
        s.release(FrameSlot(5));
        assert_eq!(s.available(), 1);
        assert!(!s.try_acquire(FrameSlot(5)));
    }

    #[test]
    fn acquire_times_out() {
        let s = FrameSemaphore::new(1);
        assert!(s.try_acquire(FrameSlot(0)));
        let start = Instant::now();
        assert!(!s.acquire_timeout(FrameSlot(0), Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn release_from_another_thread_wakes_waiter() {
        let s = Arc::new(FrameSemaphore::new(1));
        assert!(s.try_acquire(FrameSlot(0)));

        let releaser = Arc::clone(&s);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            releaser.release(FrameSlot(0));
        });

        assert!(s.acquire_timeout(FrameSlot(0), Duration::from_secs(5)));
        handle.join().unwrap();
        assert_eq!(s.available(), 0);
    }
}
