//! # Memoization strategies
//!
//! [`Memo`] is the capability the recursive evaluator uses to skip work:
//! look a result up by index, store a result for an index. Any number of
//! memos can be handed to [`Fibonacci::recurse`](crate::Fibonacci::recurse);
//! they are consulted in the order given and the first hit wins.
//!
//! Implementations must be referentially stable: once `lookup(i)` returned a
//! value, it never returns a different one for `i` unless `store(i, _)` was
//! called in between.
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Lookup and store of Fibonacci results by index.
pub trait Memo {
    /// Returns the stored result for `index`, if any.
    fn lookup(&self, index: u64) -> Option<u64>;

    /// Records `value` as the result for `index`.
    fn store(&mut self, index: u64, value: u64);
}

impl<M: Memo + ?Sized> Memo for &mut M {
    fn lookup(&self, index: u64) -> Option<u64> {
        (**self).lookup(index)
    }

    fn store(&mut self, index: u64, value: u64) {
        (**self).store(index, value)
    }
}

impl<M: Memo + ?Sized> Memo for Box<M> {
    fn lookup(&self, index: u64) -> Option<u64> {
        (**self).lookup(index)
    }

    fn store(&mut self, index: u64, value: u64) {
        (**self).store(index, value)
    }
}

/// Unbounded in-memory table. Not safe for concurrent use.
#[derive(Clone, Debug, Default)]
pub struct SimpleMemo {
    results: HashMap<u64, u64>,
}

impl SimpleMemo {
    /// Creates an empty memo.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// True if nothing has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Forgets every stored result.
    pub fn clear(&mut self) {
        self.results.clear();
    }
}

impl Memo for SimpleMemo {
    fn lookup(&self, index: u64) -> Option<u64> {
        self.results.get(&index).copied()
    }

    fn store(&mut self, index: u64, value: u64) {
        self.results.insert(index, value);
    }
}

/// Table holding at most `capacity` results.
///
/// When full, storing a new index evicts the index that was inserted
/// first. Overwriting an index already present does not change its age.
#[derive(Clone, Debug)]
pub struct BoundedMemo {
    capacity: usize,
    results: HashMap<u64, u64>,
    order: VecDeque<u64>,
}

impl BoundedMemo {
    /// Creates an empty memo. A capacity of zero stores nothing.
    pub fn with_capacity(capacity: usize) -> Self {
        BoundedMemo {
            capacity,
            results: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// Maximum number of results kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stored results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// True if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl Memo for BoundedMemo {
    fn lookup(&self, index: u64) -> Option<u64> {
        self.results.get(&index).copied()
    }

    fn store(&mut self, index: u64, value: u64) {
        if self.capacity == 0 {
            return;
        }
        if let Some(existing) = self.results.get_mut(&index) {
            *existing = value;
            return;
        }
        if self.results.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.results.remove(&oldest);
            }
        }
        self.results.insert(index, value);
        self.order.push_back(index);
    }
}

/// Thread-safe table; clones share the same storage.
///
/// Useful to reuse results across evaluator calls running on different
/// threads, at the cost of a lock per lookup and store.
#[derive(Clone, Default)]
pub struct SharedMemo {
    results: Arc<Mutex<HashMap<u64, u64>>>,
}

impl fmt::Debug for SharedMemo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedMemo")
            .field("len", &self.len())
            .finish()
    }
}

impl SharedMemo {
    /// Creates an empty memo.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored results.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if nothing has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forgets every stored result.
    pub fn clear(&self) {
        self.lock().clear();
    }

    // A writer that panicked mid-insert cannot leave a half-written u64 behind,
    // so the table is still consistent and the poison can be ignored.
    fn lock(&self) -> MutexGuard<'_, HashMap<u64, u64>> {
        self.results.lock().unwrap_or_else(|poisoned| {
            fib_warn!(name: "SharedMemo.LockPoisoned");
            poisoned.into_inner()
        })
    }
}

impl Memo for SharedMemo {
    fn lookup(&self, index: u64) -> Option<u64> {
        self.lock().get(&index).copied()
    }

    fn store(&mut self, index: u64, value: u64) {
        self.lock().insert(index, value);
    }
}
