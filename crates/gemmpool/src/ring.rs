use crate::invariants::{
    debug_assert_bounded_count, debug_assert_claimed_in_range, debug_assert_monotonic,
};
use crate::sem::Semaphore;
use crate::task::TileTask;
use crate::STEAL_CHUNK;
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// One ring per worker. One producer (the dispatcher), many consumers (the
// owning worker plus any stealing worker).
//
// ## Sequence Numbers
//
// `head` and `tail` are unbounded u64 sequence numbers, not wrapped indices;
// the slot index is `sequence & mask` computed only at access time. The live
// window is `[head, tail)` and never exceeds capacity (driver precondition).
//
// ## Publication protocol
//
// **Producer (`push`):**
// 1. Load `tail` with Relaxed (single producer, nobody else writes it)
// 2. Write the task into slot `tail & mask`
// 3. Store `tail` with Release (publishes the slot write)
// 4. Post the semaphore (occupancy hint for the sleeping owner)
//
// **Consumers (`try_pop` / `pop_blocking` / `steal_batch`):**
// 1. Load `tail` with Acquire (synchronizes with the producer's Release)
// 2. Claim a slot range by CAS on `head` (AcqRel success / Acquire failure)
// 3. Copy the claimed tasks out
//
// Every `head` advance is a CAS, so claims are serialized and disjoint: a
// task is consumed by exactly one worker. The semaphore is only a wakeup
// hint; stealers drain it best-effort, so a permit does not promise a task
// and every claim re-tests `head < tail` first.
//
// =============================================================================

/// Bounded single-producer multi-consumer queue of tile tasks.
///
/// Fixed power-of-two capacity, monotonic u64 cursors, and a counting
/// semaphore mirroring occupancy for the owner's sleeping path. The cursors
/// are cache-padded so the dispatcher and thieves do not false-share with
/// the owner.
pub struct TaskRing {
    /// Producer cursor (written by the dispatcher only).
    tail: CachePadded<AtomicU64>,
    /// Consumer cursor (CAS-advanced by owner and thieves).
    head: CachePadded<AtomicU64>,
    /// Occupancy hint; the owner parks on it when stealing finds nothing.
    sem: Semaphore,
    /// Slot storage. Per-slot `UnsafeCell` so concurrent claim-and-copy on
    /// disjoint slots needs no shared reference to the whole buffer.
    slots: Box<[UnsafeCell<MaybeUninit<TileTask>>]>,
    mask: u64,
}

// Safety: slot access is governed by the cursor protocol above: a slot is
// written only before its sequence is published via `tail` and read only by
// the single consumer whose CAS claimed that sequence.
unsafe impl Send for TaskRing {}
unsafe impl Sync for TaskRing {}

impl TaskRing {
    /// Creates a ring with `capacity` slots. `capacity` must be a power of
    /// two and at least `STEAL_CHUNK + 1` (the config layer rounds requests
    /// accordingly).
    pub fn new(capacity: usize) -> Self {
        assert!(capacity.is_power_of_two(), "ring capacity must be a power of two");
        assert!(capacity > STEAL_CHUNK, "ring capacity must exceed a steal batch");

        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || UnsafeCell::new(MaybeUninit::uninit()));

        Self {
            tail: CachePadded::new(AtomicU64::new(0)),
            head: CachePadded::new(AtomicU64::new(0)),
            sem: Semaphore::new(),
            slots: slots.into_boxed_slice(),
            mask: capacity as u64 - 1,
        }
    }

    /// Returns the slot count.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the current occupancy.
    #[inline]
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Relaxed);
        tail.wrapping_sub(head) as usize
    }

    /// Returns true if no tasks are queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ---------------------------------------------------------------------
    // PRODUCER API (dispatcher side)
    // ---------------------------------------------------------------------

    /// Enqueues a task and signals the semaphore. Non-blocking.
    ///
    /// Single-producer: only the dispatching thread of the current driver
    /// call may push. Overflow is a precondition violation (the driver
    /// sizes queues so a full decomposition fits) and is caught by a debug
    /// assertion only.
    pub fn push(&self, task: TileTask) {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        debug_assert_bounded_count!(
            tail.wrapping_sub(head) as usize + 1,
            self.capacity()
        );

        let idx = (tail & self.mask) as usize;
        // Safety: `[tail, tail]` is outside the published window until the
        // Release store below, so no consumer can touch this slot yet.
        unsafe {
            (*self.slots[idx].get()).write(task);
        }
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        self.sem.post();
    }

    // ---------------------------------------------------------------------
    // CONSUMER API (owning worker)
    // ---------------------------------------------------------------------

    /// Owner's fast path: non-blocking semaphore decrement, then claim.
    ///
    /// Returns `None` when no permit is available or when the permit turned
    /// out stale (a thief already drained the slots it hinted at).
    pub fn try_pop(&self) -> Option<TileTask> {
        if !self.sem.try_acquire() {
            return None;
        }
        self.claim_one()
    }

    /// Owner's sleeping path: park on the semaphore, then claim.
    ///
    /// Returns `None` on a stale permit, including the artificial permit
    /// posted by [`wake`](Self::wake) at shutdown. The caller re-checks the
    /// shutdown flag and loops.
    pub fn pop_blocking(&self) -> Option<TileTask> {
        self.sem.acquire();
        self.claim_one()
    }

    /// Posts one artificial permit so a parked owner re-checks shutdown.
    pub fn wake(&self) {
        self.sem.post();
    }

    /// Claims one slot by CAS. A permit is only a hint, so emptiness is
    /// re-tested on every attempt.
    fn claim_one(&self) -> Option<TileTask> {
        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            let tail = self.tail.load(Ordering::Acquire);
            if head == tail {
                return None;
            }
            debug_assert_monotonic!("head", head, head.wrapping_add(1));
            match self.head.compare_exchange_weak(
                head,
                head.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    let idx = (head & self.mask) as usize;
                    // Safety: the CAS claimed sequence `head` exclusively,
                    // and the Acquire on `tail` ordered the slot write
                    // before this read.
                    return Some(unsafe { (*self.slots[idx].get()).assume_init_read() });
                }
                Err(observed) => head = observed,
            }
        }
    }

    // ---------------------------------------------------------------------
    // CONSUMER API (foreign worker)
    // ---------------------------------------------------------------------

    /// Claims `STEAL_CHUNK` tasks in one CAS for a foreign worker.
    ///
    /// Requires strictly more than `STEAL_CHUNK` queued tasks, so a queue
    /// holding exactly one batch is left to its owner. Returns the number
    /// stolen: `STEAL_CHUNK`, or 0 when the queue is too short or the CAS
    /// lost a race.
    ///
    /// The semaphore is drained best-effort afterwards; a failed decrement
    /// just leaves the owner one spurious wakeup.
    pub fn steal_batch(&self, out: &mut [MaybeUninit<TileTask>; STEAL_CHUNK]) -> usize {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);

        let available = tail.wrapping_sub(head);
        if available <= STEAL_CHUNK as u64 {
            return 0;
        }

        let new_head = head.wrapping_add(STEAL_CHUNK as u64);
        debug_assert_claimed_in_range!(head, new_head, tail);
        if self
            .head
            .compare_exchange(head, new_head, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return 0;
        }

        for (k, slot) in out.iter_mut().enumerate() {
            let idx = (head.wrapping_add(k as u64) & self.mask) as usize;
            // Safety: the CAS claimed `[head, head + STEAL_CHUNK)`
            // exclusively; the Acquire load of `tail` ordered the writes.
            *slot = MaybeUninit::new(unsafe { (*self.slots[idx].get()).assume_init_read() });
            let _ = self.sem.try_acquire();
        }
        STEAL_CHUNK
    }
}
