//! `Runtime`: the fixed-capacity, mutex-guarded LRU cache of mapped code
//! (spec §5).

use std::sync::{Arc, Mutex};

use crate::code_holder::FinalizedCode;
use crate::error::CodegenResult;

use super::memory::MappedCode;

/// Owns zero or more [`MappedCode`] mappings. `add` hands back a mapping
/// with no further bookkeeping; `add_cached` additionally keeps a strong
/// reference inside a capacity-bounded LRU so a repeat `add_cached` for
/// the same `key` reuses the mapping instead of re-allocating pages.
pub struct Runtime {
    capacity: usize,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    /// Ordered oldest (front) to most-recently-used (back).
    entries: Vec<(u64, Arc<MappedCode>)>,
}

impl Runtime {
    /// A runtime whose `add_cached` LRU holds at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Runtime {
            capacity,
            state: Mutex::new(State::default()),
        }
    }

    /// Map `code` into fresh read-execute memory. The returned `Arc` is
    /// the only strong reference; the mapping is unmapped once it (and
    /// every clone) is dropped.
    pub fn add(&self, code: &FinalizedCode) -> CodegenResult<Arc<MappedCode>> {
        Ok(Arc::new(MappedCode::new(code)?))
    }

    /// Like [`Self::add`], but keyed and cached: a later call with the
    /// same `key` returns the existing mapping (marking it
    /// most-recently-used) instead of mapping `code` again. When the
    /// cache is full, evicts the least-recently-used entry first. Does
    /// not re-validate that `code` matches what is already cached under
    /// `key` — callers are expected to derive `key` from `code`'s
    /// content or origin.
    pub fn add_cached(&self, key: u64, code: &FinalizedCode) -> CodegenResult<Arc<MappedCode>> {
        let mut state = self.state.lock().expect("runtime mutex poisoned");

        if let Some(pos) = state.entries.iter().position(|(k, _)| *k == key) {
            let entry = state.entries.remove(pos);
            let mapped = entry.1.clone();
            state.entries.push(entry);
            return Ok(mapped);
        }

        if state.entries.len() >= self.capacity {
            if let Some((evicted_key, _)) = state.entries.first() {
                log::debug!("runtime cache full, evicting key {evicted_key}");
            }
            state.entries.remove(0);
        }

        let mapped = Arc::new(MappedCode::new(code)?);
        state.entries.push((key, mapped.clone()));
        Ok(mapped)
    }

    /// Drop the runtime's own reference to `key`'s mapping, if cached.
    /// The mapping itself stays alive as long as some other `Arc` to it
    /// exists.
    pub fn release(&self, key: u64) {
        let mut state = self.state.lock().expect("runtime mutex poisoned");
        state.entries.retain(|(k, _)| *k != key);
    }

    /// Number of entries currently cached.
    pub fn cached_len(&self) -> usize {
        self.state.lock().expect("runtime mutex poisoned").entries.len()
    }
}
