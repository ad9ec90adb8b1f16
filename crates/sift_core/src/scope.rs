//! Scopes
//!
//! A [`Scope`] is what a query function sees of its host: a logging channel
//! and a keyed cache store that outlives individual calls. Scopes are shared
//! across the threads serving one query, so both halves are thread-safe.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Destination for scope log lines.
pub trait LogSink: Send + Sync {
    fn log(&self, message: &str);
}

/// Sink that forwards every line to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl LogSink for TracingLog {
    fn log(&self, message: &str) {
        tracing::info!(target: "sift::scope", "{}", message);
    }
}

/// Sink that keeps every line in memory (and forwards it to `tracing`).
#[derive(Debug, Default)]
pub struct MemoryLog {
    lines: Mutex<Vec<String>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether any recorded line starts with `prefix`.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.lines().iter().any(|line| line.starts_with(prefix))
    }

    pub fn is_empty(&self) -> bool {
        self.lines().is_empty()
    }

    pub fn clear(&self) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl LogSink for MemoryLog {
    fn log(&self, message: &str) {
        TracingLog.log(message);
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

type CacheEntry = Arc<dyn Any + Send + Sync>;

/// Execution scope: logging plus a keyed cache store.
pub struct Scope {
    sink: Arc<dyn LogSink>,
    cache: DashMap<String, CacheEntry>,
}

impl Scope {
    /// Scope that logs through `tracing`.
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingLog))
    }

    pub fn with_sink(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            cache: DashMap::new(),
        }
    }

    pub fn log(&self, message: impl AsRef<str>) {
        self.sink.log(message.as_ref());
    }

    /// Shared handle to this scope's log sink, for objects that must log
    /// without holding the scope itself.
    pub fn sink(&self) -> Arc<dyn LogSink> {
        Arc::clone(&self.sink)
    }

    /// Look up a cached value. Returns `None` if absent or of another type.
    pub fn cache_get<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let entry = Arc::clone(self.cache.get(key)?.value());
        entry.downcast::<T>().ok()
    }

    /// Return the value cached under `key`, creating it with `init` if absent.
    ///
    /// Atomic per key: concurrent first calls for the same key run `init`
    /// exactly once, the others observe its result. `init` runs while the
    /// key's shard is locked and must not touch this scope's cache. An entry
    /// of a different type under the same key is replaced.
    pub fn cache_get_or_try_insert<T, E, F>(&self, key: &str, init: F) -> Result<Arc<T>, E>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Result<T, E>,
    {
        match self.cache.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if let Ok(existing) = Arc::clone(occupied.get()).downcast::<T>() {
                    return Ok(existing);
                }

                tracing::warn!(key, "replacing cache entry of a different type");
                let value = Arc::new(init()?);
                let entry: CacheEntry = value.clone();
                occupied.insert(entry);
                Ok(value)
            }
            Entry::Vacant(vacant) => {
                let value = Arc::new(init()?);
                let entry: CacheEntry = value.clone();
                vacant.insert(entry);
                Ok(value)
            }
        }
    }

    /// Remove a cached entry. Returns whether anything was removed.
    pub fn cache_remove(&self, key: &str) -> bool {
        self.cache.remove(key).is_some()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Drop every cached entry, releasing whatever the entries own.
    pub fn cache_clear(&self) {
        self.cache.clear();
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_memory_log_records_lines() {
        let log = Arc::new(MemoryLog::new());
        let scope = Scope::with_sink(log.clone());

        scope.log("js: first");
        scope.log(String::from("js_call: second"));

        assert_eq!(log.lines(), vec!["js: first", "js_call: second"]);
        assert!(log.has_prefix("js_call:"));
        assert!(!log.has_prefix("PANIC"));
    }

    #[test]
    fn test_get_or_insert_returns_same_instance() {
        let scope = Scope::new();

        let first = scope
            .cache_get_or_try_insert::<String, (), _>("k", || Ok("a".to_string()))
            .unwrap();
        let second = scope
            .cache_get_or_try_insert::<String, (), _>("k", || Ok("b".to_string()))
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*second, "a");
        assert_eq!(scope.cache_len(), 1);
    }

    #[test]
    fn test_failed_init_leaves_no_entry() {
        let scope = Scope::new();

        let result = scope.cache_get_or_try_insert::<String, &str, _>("k", || Err("boom"));
        assert_eq!(result.unwrap_err(), "boom");
        assert!(scope.cache_get::<String>("k").is_none());
        assert_eq!(scope.cache_len(), 0);
    }

    #[test]
    fn test_type_mismatch_replaces_entry() {
        let scope = Scope::new();
        scope
            .cache_get_or_try_insert::<u32, (), _>("k", || Ok(7))
            .unwrap();

        let replaced = scope
            .cache_get_or_try_insert::<String, (), _>("k", || Ok("s".to_string()))
            .unwrap();

        assert_eq!(*replaced, "s");
        assert!(scope.cache_get::<u32>("k").is_none());
    }

    #[test]
    fn test_concurrent_first_calls_init_once() {
        let scope = Arc::new(Scope::new());
        let inits = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let scope = scope.clone();
                let inits = inits.clone();
                thread::spawn(move || {
                    scope
                        .cache_get_or_try_insert::<usize, (), _>("shared", || {
                            Ok(inits.fetch_add(1, Ordering::SeqCst))
                        })
                        .unwrap()
                })
            })
            .collect();

        let values: Vec<Arc<usize>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(inits.load(Ordering::SeqCst), 1);
        assert!(values.iter().all(|v| Arc::ptr_eq(v, &values[0])));
    }

    #[test]
    fn test_clear_releases_entries() {
        let scope = Scope::new();
        let value = scope
            .cache_get_or_try_insert::<String, (), _>("k", || Ok("v".to_string()))
            .unwrap();
        assert_eq!(Arc::strong_count(&value), 2);

        scope.cache_clear();
        assert_eq!(Arc::strong_count(&value), 1);
        assert!(!scope.cache_remove("k"));
    }
}
