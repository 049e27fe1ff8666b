use serde::{Deserialize, Serialize};

/// A committed value plus an optional in-progress edit of it.
///
/// Modals open a draft, edit it freely, and either commit it into the live
/// value or discard it. Nothing outside the modal ever sees a half-edited
/// value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Draft<T> {
    committed: T,
    draft: Option<T>,
}

impl<T: Clone + PartialEq> Draft<T> {
    pub fn new(committed: T) -> Self {
        Self {
            committed,
            draft: None,
        }
    }

    pub const fn committed(&self) -> &T {
        &self.committed
    }

    pub const fn draft(&self) -> Option<&T> {
        self.draft.as_ref()
    }

    pub const fn is_open(&self) -> bool {
        self.draft.is_some()
    }

    /// Starts editing from the last committed value. Reopening an open draft
    /// resets it.
    pub fn open(&mut self) {
        self.draft = Some(self.committed.clone());
    }

    /// Applies `f` to the draft, opening one first if needed.
    pub fn edit(&mut self, f: impl FnOnce(&mut T)) {
        let draft = self.draft.get_or_insert_with(|| self.committed.clone());
        f(draft);
    }

    /// Moves the draft into the committed slot. Returns whether the committed
    /// value changed.
    pub fn commit(&mut self) -> bool {
        match self.draft.take() {
            Some(draft) if draft != self.committed => {
                self.committed = draft;
                true
            }
            _ => false,
        }
    }

    pub fn discard(&mut self) {
        self.draft = None;
    }

    /// Replaces the committed value outright, dropping any open draft.
    pub fn reset(&mut self, committed: T) {
        self.committed = committed;
        self.draft = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_applies_edits() {
        let mut d = Draft::new(1);
        d.open();
        d.edit(|v| *v = 5);
        assert_eq!(*d.committed(), 1);
        assert!(d.commit());
        assert_eq!(*d.committed(), 5);
        assert!(!d.is_open());
    }

    #[test]
    fn discard_restores_committed() {
        let mut d = Draft::new(String::from("all"));
        d.edit(|v| v.push_str("-changed"));
        d.discard();
        assert_eq!(d.committed(), "all");
        d.open();
        assert_eq!(d.draft().map(String::as_str), Some("all"));
    }

    #[test]
    fn commit_without_change_reports_false() {
        let mut d = Draft::new(3);
        d.open();
        assert!(!d.commit());
        assert!(!d.commit());
    }
}
