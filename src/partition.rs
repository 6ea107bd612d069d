//! Work partitioning: fixed-size packages handed out through an atomic cursor,
//! and the fixed worker pool that drains them.

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::GeomSetupError;

/// Number of packages of `package_size` items needed to cover `item_count` items.
#[inline]
pub fn compute_package_count(item_count: usize, package_size: usize) -> usize {
    debug_assert!(package_size > 0, "package size must be non-zero");
    item_count.div_ceil(package_size)
}

/// One claimed package: a contiguous item range plus its package index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageCursor {
    package_index: usize,
    first: usize,
    last: usize,
}

impl PackageCursor {
    #[inline]
    pub fn package_index(&self) -> usize {
        self.package_index
    }

    /// Items `[first, last)` covered by this package.
    #[inline]
    pub fn item_range(&self) -> Range<usize> {
        self.first..self.last
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.last - self.first
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.first == self.last
    }
}

/// Hands out packages of one dispatch, each exactly once.
///
/// Claims are a single `fetch_add`, so the claimed indices are monotonically
/// increasing across all workers and no two workers ever see the same package.
#[derive(Debug)]
pub struct PackageDispatcher {
    item_count: usize,
    package_size: usize,
    package_count: usize,
    cursor: AtomicUsize,
}

impl PackageDispatcher {
    pub fn new(item_count: usize, package_size: usize) -> Self {
        Self {
            item_count,
            package_size,
            package_count: compute_package_count(item_count, package_size),
            cursor: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn package_count(&self) -> usize {
        self.package_count
    }

    #[inline]
    pub fn package_size(&self) -> usize {
        self.package_size
    }

    /// Claim the next unclaimed package, or `None` once all are taken.
    #[inline]
    pub fn next_package(&self) -> Option<PackageCursor> {
        let package_index = self.cursor.fetch_add(1, Ordering::Relaxed);
        if package_index >= self.package_count {
            return None;
        }
        let first = package_index * self.package_size;
        let last = (first + self.package_size).min(self.item_count);
        Some(PackageCursor {
            package_index,
            first,
            last,
        })
    }
}

/// What a worker sees during one dispatch.
pub struct ThreadContext<'a> {
    pub thread_id: usize,
    dispatcher: &'a PackageDispatcher,
}

impl<'a> ThreadContext<'a> {
    #[inline]
    pub fn next_package(&self) -> Option<PackageCursor> {
        self.dispatcher.next_package()
    }

    #[inline]
    pub fn package_size(&self) -> usize {
        self.dispatcher.package_size()
    }

    /// Iterate packages until the dispatch is drained.
    pub fn packages(&self) -> impl Iterator<Item = PackageCursor> + '_ {
        std::iter::from_fn(move || self.next_package())
    }
}

/// Fixed set of workers, created once and reused by every dispatch.
pub struct WorkerPool {
    num_workers: usize,
    #[cfg(feature = "parallel")]
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    /// Number of hardware execution contexts, falling back to 1.
    pub fn available_workers() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    #[cfg(feature = "parallel")]
    pub fn new(num_workers: usize) -> Result<Self, GeomSetupError> {
        let num_workers = num_workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_workers)
            .thread_name(|i| format!("geom-setup-{}", i))
            .build()
            .map_err(|e| GeomSetupError::ThreadPool(e.to_string()))?;
        Ok(Self { num_workers, pool })
    }

    #[cfg(not(feature = "parallel"))]
    pub fn new(num_workers: usize) -> Result<Self, GeomSetupError> {
        Ok(Self {
            num_workers: num_workers.max(1),
        })
    }

    #[inline]
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Fork one task per entry of `states`, let them drain packages of
    /// `package_size` over `[0, item_count)`, and join.
    ///
    /// Task `i` gets exclusive access to `states[i]` and reports
    /// `thread_id == i`. Results come back in task order, regardless of which
    /// task finished first.
    pub fn execute<S, R, F>(
        &self,
        item_count: usize,
        package_size: usize,
        states: &mut [S],
        f: F,
    ) -> Vec<R>
    where
        S: Send,
        R: Send,
        F: Fn(&ThreadContext<'_>, &mut S) -> R + Sync,
    {
        let dispatcher = PackageDispatcher::new(item_count, package_size);
        let mut results: Vec<Option<R>> = (0..states.len()).map(|_| None).collect();

        #[cfg(feature = "parallel")]
        {
            let dispatcher = &dispatcher;
            let f = &f;
            self.pool.scope(|scope| {
                for (thread_id, (state, slot)) in
                    states.iter_mut().zip(results.iter_mut()).enumerate()
                {
                    scope.spawn(move |_| {
                        let ctx = ThreadContext {
                            thread_id,
                            dispatcher,
                        };
                        *slot = Some(f(&ctx, state));
                    });
                }
            });
        }

        #[cfg(not(feature = "parallel"))]
        for (thread_id, (state, slot)) in states.iter_mut().zip(results.iter_mut()).enumerate() {
            let ctx = ThreadContext {
                thread_id,
                dispatcher: &dispatcher,
            };
            *slot = Some(f(&ctx, state));
        }

        results
            .into_iter()
            .map(|r| r.unwrap_or_else(|| unreachable!("worker task did not run")))
            .collect()
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("num_workers", &self.num_workers)
            .finish()
    }
}
