//! Fetch-cycle bookkeeping shared by every screen.
//!
//! A screen begins a cycle when it gains focus or is refreshed. The cycle
//! gets a fresh [`CycleId`]; every request issued for it carries that id back
//! in its completion event. Beginning a new cycle or cancelling the scope
//! makes the old id stale, and a stale completion is dropped without touching
//! state. This is the cooperative "is this scope still current" check; the
//! transport itself is never interrupted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use crate::capabilities::{ApiError, ApiResult};

// Ids come from one process-wide counter so a scope rebuilt after sign-out
// can never reissue an id an old completion still carries.
static NEXT_CYCLE: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CycleId(u64);

/// One independently loaded resource on a screen.
pub trait SliceKey: Copy + Ord + Debug {
    fn name(self) -> &'static str;
}

#[derive(Debug, Clone)]
pub struct FetchScope<S: SliceKey> {
    current: Option<CycleId>,
    loading: BTreeMap<S, bool>,
    refreshing: bool,
}

impl<S: SliceKey> Default for FetchScope<S> {
    fn default() -> Self {
        Self {
            current: None,
            loading: BTreeMap::new(),
            refreshing: false,
        }
    }
}

impl<S: SliceKey> FetchScope<S> {
    /// Starts a cycle for `slices`, superseding whatever was in flight.
    pub fn begin(&mut self, slices: &[S], refreshing: bool) -> CycleId {
        if let Some(previous) = self.current {
            debug!(cycle = previous.0, "superseding fetch cycle");
        }
        let cycle = CycleId(NEXT_CYCLE.fetch_add(1, Ordering::Relaxed));
        self.current = Some(cycle);
        for flag in self.loading.values_mut() {
            *flag = false;
        }
        for slice in slices {
            self.loading.insert(*slice, true);
        }
        self.refreshing = refreshing;
        cycle
    }

    /// Aborts the current cycle. Every loading flag drops to false.
    pub fn cancel(&mut self) -> Option<CycleId> {
        let cancelled = self.current.take();
        if let Some(cycle) = cancelled {
            debug!(cycle = cycle.0, "fetch cycle cancelled");
        }
        for flag in self.loading.values_mut() {
            *flag = false;
        }
        self.refreshing = false;
        cancelled
    }

    #[must_use]
    pub fn is_current(&self, cycle: CycleId) -> bool {
        self.current == Some(cycle)
    }

    /// Marks `slice` finished for `cycle`. Returns false, and changes nothing,
    /// when `cycle` is no longer current.
    pub fn settle(&mut self, cycle: CycleId, slice: S) -> bool {
        if !self.is_current(cycle) {
            debug!(
                cycle = cycle.0,
                slice = slice.name(),
                "dropping completion from stale cycle"
            );
            return false;
        }
        self.loading.insert(slice, false);
        if !self.any_loading() {
            self.refreshing = false;
        }
        true
    }

    #[must_use]
    pub fn is_loading(&self, slice: S) -> bool {
        self.loading.get(&slice).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn any_loading(&self) -> bool {
        self.loading.values().any(|flag| *flag)
    }

    #[must_use]
    pub const fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    #[must_use]
    pub const fn current(&self) -> Option<CycleId> {
        self.current
    }

    /// Loading flags keyed by slice name, for the view model.
    #[must_use]
    pub fn loading_flags(&self) -> BTreeMap<String, bool> {
        self.loading
            .iter()
            .map(|(slice, flag)| (slice.name().to_string(), *flag))
            .collect()
    }
}

/// Writes a successful result into `slot`. A failure leaves the previous
/// value in place and is handed back to the caller for reporting.
pub fn commit_slice<T>(slot: &mut Option<T>, result: ApiResult<T>, slice: &str) -> Result<(), ApiError> {
    match result {
        Ok(value) => {
            *slot = Some(value);
            Ok(())
        }
        Err(error) => {
            warn!(slice, %error, "fetch failed, keeping previous data");
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    enum Slice {
        A,
        B,
    }

    impl SliceKey for Slice {
        fn name(self) -> &'static str {
            match self {
                Self::A => "a",
                Self::B => "b",
            }
        }
    }

    #[test]
    fn begin_marks_slices_loading() {
        let mut scope = FetchScope::default();
        let cycle = scope.begin(&[Slice::A, Slice::B], false);
        assert!(scope.is_current(cycle));
        assert!(scope.is_loading(Slice::A));
        assert!(scope.is_loading(Slice::B));
    }

    #[test]
    fn settle_clears_only_its_slice() {
        let mut scope = FetchScope::default();
        let cycle = scope.begin(&[Slice::A, Slice::B], true);
        assert!(scope.settle(cycle, Slice::A));
        assert!(!scope.is_loading(Slice::A));
        assert!(scope.is_loading(Slice::B));
        assert!(scope.is_refreshing());
        assert!(scope.settle(cycle, Slice::B));
        assert!(!scope.is_refreshing());
    }

    #[test]
    fn new_cycle_makes_old_one_stale() {
        let mut scope = FetchScope::default();
        let first = scope.begin(&[Slice::A], false);
        let second = scope.begin(&[Slice::A], true);
        assert_ne!(first, second);
        assert!(!scope.settle(first, Slice::A));
        // The stale completion must not clear the live cycle's flag.
        assert!(scope.is_loading(Slice::A));
        assert!(scope.settle(second, Slice::A));
        assert!(!scope.is_loading(Slice::A));
    }

    #[test]
    fn cancel_clears_flags_and_invalidates() {
        let mut scope = FetchScope::default();
        let cycle = scope.begin(&[Slice::A, Slice::B], true);
        assert_eq!(scope.cancel(), Some(cycle));
        assert!(!scope.any_loading());
        assert!(!scope.is_refreshing());
        assert!(!scope.settle(cycle, Slice::A));
    }

    #[test]
    fn commit_slice_keeps_stale_value_on_error() {
        let mut slot = Some(1);
        let result = commit_slice(&mut slot, Err(ApiError::MissingData), "a");
        assert!(result.is_err());
        assert_eq!(slot, Some(1));
        commit_slice(&mut slot, Ok(2), "a").unwrap();
        assert_eq!(slot, Some(2));
    }

    #[test]
    fn loading_flags_use_slice_names() {
        let mut scope = FetchScope::default();
        scope.begin(&[Slice::B], false);
        let flags = scope.loading_flags();
        assert_eq!(flags.get("b"), Some(&true));
    }
}
