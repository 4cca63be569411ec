use crate::affinity;
use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::kernel::KernelFn;
use crate::ring::TaskRing;
use crate::task::TileTask;
use crate::{SPIN_LIMIT, STEAL_CHUNK};
use crossbeam_utils::CachePadded;
use std::hint;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

/// Pinned worker pool executing tile tasks from per-worker rings.
///
/// Dropping the pool sets the sticky shutdown flag, wakes every queue's
/// semaphore once, and joins all workers. Tasks still queued at that point
/// are silently dropped; callers issue [`wait`](Pool::wait) first.
pub struct Pool {
    inner: Arc<PoolInner>,
    threads: Vec<JoinHandle<()>>,
}

/// Shared interior. Workers hold an `Arc` to this, not to [`Pool`] itself,
/// so the pool handle owns the threads without a reference cycle and the
/// queues never move once workers start.
struct PoolInner {
    /// One ring per worker, each padded to its own cache lines.
    queues: Box<[CachePadded<TaskRing>]>,
    /// Round-robin dispatch cursor.
    next_queue: AtomicUsize,
    /// Submitted-but-unfinished tasks across all queues.
    tasks_remaining: AtomicUsize,
    /// Guards the completion broadcast so a waiter cannot miss the
    /// zero transition between its predicate check and `Condvar::wait`.
    done_lock: Mutex<()>,
    all_done: Condvar,
    /// Sticky termination signal; workers exit at their next check point.
    shutdown: AtomicBool,
    /// Tile kernel shared by all workers, chosen once at construction.
    kernel: KernelFn,
}

impl Pool {
    /// Builds a pool with `config.workers` pinned workers, queues rounded to
    /// the effective capacity, and the configured kernel variant.
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        Self::with_kernel(config, config.kernel.select())
    }

    /// Builds a pool around an explicit kernel pointer.
    ///
    /// This is how instrumented kernels (execution counters, coverage
    /// recorders) are installed for tests; production callers go through
    /// [`Pool::new`].
    pub fn with_kernel(config: PoolConfig, kernel: KernelFn) -> Result<Self, PoolError> {
        config.validate()?;
        let capacity = config.capacity();

        let mut queues = Vec::with_capacity(config.workers);
        queues.resize_with(config.workers, || CachePadded::new(TaskRing::new(capacity)));

        let inner = Arc::new(PoolInner {
            queues: queues.into_boxed_slice(),
            next_queue: AtomicUsize::new(0),
            tasks_remaining: AtomicUsize::new(0),
            done_lock: Mutex::new(()),
            all_done: Condvar::new(),
            shutdown: AtomicBool::new(false),
            kernel,
        });

        let mut threads = Vec::with_capacity(config.workers);
        for id in 0..config.workers {
            let worker_inner = Arc::clone(&inner);
            let spawned = thread::Builder::new()
                .name(format!("gemm-worker-{id}"))
                .spawn(move || worker_loop(&worker_inner, id));
            match spawned {
                Ok(handle) => threads.push(handle),
                Err(_) => {
                    // Tear down the workers that did start before reporting.
                    shutdown_workers(&inner, &mut threads);
                    return Err(PoolError::Spawn { worker: id });
                }
            }
        }

        Ok(Self { inner, threads })
    }

    /// Number of workers (and queues).
    #[inline]
    pub fn workers(&self) -> usize {
        self.inner.queues.len()
    }

    /// Effective slots per queue (power of two).
    #[inline]
    pub fn queue_capacity(&self) -> usize {
        self.inner.queues[0].capacity()
    }

    /// Tasks submitted but not yet finished.
    #[inline]
    pub fn outstanding(&self) -> usize {
        self.inner.tasks_remaining.load(Ordering::Acquire)
    }

    /// Round-robin submission: claims the next queue, bumps the outstanding
    /// counter, then publishes the task.
    ///
    /// Single-dispatcher: concurrent submitters would violate the queues'
    /// single-producer protocol. The driver submits from one thread and the
    /// queues are sized so a full decomposition fits (see
    /// [`queue_capacity_for`](crate::queue_capacity_for)).
    pub fn submit(&self, task: TileTask) {
        let qid = self.inner.next_queue.fetch_add(1, Ordering::Relaxed) % self.workers();
        // Counted before publication so a worker finishing instantly cannot
        // drive the counter below the number of live tasks.
        self.inner.tasks_remaining.fetch_add(1, Ordering::Relaxed);
        self.inner.queues[qid].push(task);
    }

    /// Blocks until every submitted task has finished.
    ///
    /// Pairs an Acquire read of the outstanding counter with the workers'
    /// AcqRel decrements, so all tile writes are visible when this returns.
    pub fn wait(&self) {
        let mut guard = self.inner.done_lock.lock().unwrap();
        while self.inner.tasks_remaining.load(Ordering::Acquire) > 0 {
            guard = self.inner.all_done.wait(guard).unwrap();
        }
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        shutdown_workers(&self.inner, &mut self.threads);
    }
}

/// Sets the sticky shutdown flag, wakes every queue once, and joins the
/// workers. A wake permit can be drained by a concurrent steal, so each
/// worker keeps getting nudged until it has actually exited.
fn shutdown_workers(inner: &PoolInner, threads: &mut Vec<JoinHandle<()>>) {
    inner.shutdown.store(true, Ordering::Release);
    for queue in inner.queues.iter() {
        queue.wake();
    }
    for (id, handle) in threads.drain(..).enumerate() {
        while !handle.is_finished() {
            inner.queues[id].wake();
            thread::yield_now();
        }
        let _ = handle.join();
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("workers", &self.workers())
            .field("queue_capacity", &self.queue_capacity())
            .field("outstanding", &self.outstanding())
            .finish_non_exhaustive()
    }
}

/// Worker state machine.
///
/// Drain any buffered stolen batch, then pop the own queue, then spin up to
/// `SPIN_LIMIT` rounds stealing from the other queues in rotation, then park
/// on the own semaphore. Shutdown is observed between spin rounds and after
/// every wakeup.
fn worker_loop(inner: &PoolInner, id: usize) {
    affinity::pin_current_thread(id % affinity::core_count());

    let workers = inner.queues.len();
    let own = &inner.queues[id];
    let mut steal_buf: [MaybeUninit<TileTask>; STEAL_CHUNK] = [MaybeUninit::uninit(); STEAL_CHUNK];
    let mut steal_len = 0usize;
    let mut steal_pos = 0usize;

    loop {
        // Finish the buffered stolen batch before touching any queue.
        if steal_pos < steal_len {
            // Safety: `steal_batch` initialized `steal_len` entries.
            let task = unsafe { steal_buf[steal_pos].assume_init() };
            steal_pos += 1;
            execute(inner, &task);
            continue;
        }

        if let Some(task) = own.try_pop() {
            execute(inner, &task);
            continue;
        }

        // Spin-steal: rotate over the victims starting at offset 1 so
        // neighbours do not all hammer the same queue.
        let mut stolen = 0;
        for _ in 0..SPIN_LIMIT {
            stolen = steal_round(inner, id, workers, &mut steal_buf);
            if stolen > 0 {
                break;
            }
            if inner.shutdown.load(Ordering::Acquire) {
                return;
            }
            hint::spin_loop();
        }
        if stolen > 0 {
            steal_len = stolen;
            steal_pos = 0;
            continue;
        }

        // Out of patience: sleep on the own queue's semaphore.
        match own.pop_blocking() {
            Some(task) => execute(inner, &task),
            // Stale permit: either a thief drained the hinted slot or this
            // is the shutdown wake.
            None => {
                if inner.shutdown.load(Ordering::Acquire) {
                    return;
                }
            }
        }
    }
}

/// One walk over the other workers' queues; returns the first batch taken.
fn steal_round(
    inner: &PoolInner,
    id: usize,
    workers: usize,
    buf: &mut [MaybeUninit<TileTask>; STEAL_CHUNK],
) -> usize {
    for offset in 1..workers {
        let victim = &inner.queues[(id + offset) % workers];
        let stolen = victim.steal_batch(buf);
        if stolen > 0 {
            return stolen;
        }
    }
    0
}

/// Runs the kernel, retires the task, and broadcasts completion on the last
/// one. The lock around the broadcast is what makes the barrier race-free.
fn execute(inner: &PoolInner, task: &TileTask) {
    // Safety: the driver constructed the task over live, disjoint tiles and
    // holds its borrows until `wait` returns.
    unsafe { (inner.kernel)(task) };

    if inner.tasks_remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
        let _guard = inner.done_lock.lock().unwrap();
        inner.all_done.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;
    use std::sync::atomic::AtomicU32;

    fn tagged(tag: usize) -> TileTask {
        // Safety: consumed by instrumented kernels that never dereference.
        unsafe { TileTask::new(ptr::null(), ptr::null(), ptr::null_mut(), 0, 0, 0, tag) }
    }

    #[test]
    fn test_empty_pool_drops_cleanly() {
        let pool = Pool::new(PoolConfig::new(4, 16)).unwrap();
        assert_eq!(pool.workers(), 4);
        drop(pool);
    }

    #[test]
    fn test_wait_with_nothing_submitted_returns() {
        let pool = Pool::new(PoolConfig::new(2, 16)).unwrap();
        pool.wait();
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn test_queue_capacity_is_rounded() {
        let pool = Pool::new(PoolConfig::new(2, 5)).unwrap();
        assert_eq!(pool.queue_capacity(), 8);
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(Pool::new(PoolConfig::new(0, 16)).is_err());
        assert!(Pool::new(PoolConfig::new(4, 0)).is_err());
    }

    #[test]
    fn test_every_task_executes_exactly_once() {
        #[allow(clippy::declare_interior_mutable_const)]
        const ZERO: AtomicU32 = AtomicU32::new(0);
        static HITS: [AtomicU32; 256] = [ZERO; 256];

        unsafe fn counting_kernel(task: &TileTask) {
            HITS[task.n_k].fetch_add(1, Ordering::SeqCst);
        }

        let config = PoolConfig::new(4, 256);
        let pool = Pool::with_kernel(config, counting_kernel).unwrap();
        for tag in 0..256 {
            pool.submit(tagged(tag));
        }
        pool.wait();
        assert_eq!(pool.outstanding(), 0);

        for (tag, hits) in HITS.iter().enumerate() {
            assert_eq!(hits.load(Ordering::SeqCst), 1, "task {} ran wrong count", tag);
        }
    }

    #[test]
    fn test_uneven_task_durations_drain_via_stealing() {
        #[allow(clippy::declare_interior_mutable_const)]
        const ZERO: AtomicU32 = AtomicU32::new(0);
        static HITS: [AtomicU32; 128] = [ZERO; 128];

        unsafe fn lumpy_kernel(task: &TileTask) {
            // Make the queue-0 tasks slow so other workers must steal to
            // keep the barrier from serializing on one worker.
            if task.n_k % 4 == 0 {
                std::thread::sleep(std::time::Duration::from_millis(1));
            }
            HITS[task.n_k].fetch_add(1, Ordering::SeqCst);
        }

        let pool = Pool::with_kernel(PoolConfig::new(4, 128), lumpy_kernel).unwrap();
        for tag in 0..128 {
            pool.submit(tagged(tag));
        }
        pool.wait();

        for (tag, hits) in HITS.iter().enumerate() {
            assert_eq!(hits.load(Ordering::SeqCst), 1, "task {} ran wrong count", tag);
        }
    }

    #[test]
    fn test_repeated_batches_reuse_the_pool() {
        #[allow(clippy::declare_interior_mutable_const)]
        const ZERO: AtomicU32 = AtomicU32::new(0);
        static HITS: [AtomicU32; 32] = [ZERO; 32];

        unsafe fn counting_kernel(task: &TileTask) {
            HITS[task.n_k].fetch_add(1, Ordering::SeqCst);
        }

        let pool = Pool::with_kernel(PoolConfig::new(3, 32), counting_kernel).unwrap();
        for _round in 0..4 {
            for tag in 0..32 {
                pool.submit(tagged(tag));
            }
            pool.wait();
            assert_eq!(pool.outstanding(), 0);
        }

        for hits in &HITS {
            assert_eq!(hits.load(Ordering::SeqCst), 4);
        }
    }
}
