//! Per-target record of the structural moves a merge caused, sufficient to
//! reverse exactly that merge later.

use super::surface::{ListRef, NodeId, SurfaceId};

/// Which class of control a merge moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergedKind {
    /// A whole top-level tab subtree grafted into the target.
    Tab,
    /// A mid-level group excised from its source tab.
    Group,
    /// A leaf item, under a matched group or in a flat strip.
    Item,
    /// An entry of one of the auxiliary flat lists.
    AuxItem,
}

/// Where an excised control came from, and the index it held there at the
/// moment of excision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub list: ListRef,
    pub index: usize,
}

/// One structural move caused by a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvenanceEntry {
    pub kind: MergedKind,
    /// The control that moved. Always the exact node, never its parent.
    pub control: NodeId,
    /// Surface the merge call took its source from.
    pub source: SurfaceId,
    /// Collection the control lives in now.
    pub target_list: ListRef,
    /// Collection and position to return the control to on unmerge. `None`
    /// for grafted tabs and auxiliary items, which stay referenced by their
    /// source surface and have nothing to return to.
    pub origin: Option<Origin>,
}

/// Ordered log of every merge-caused move into one target surface.
///
/// Created lazily on the first merge into a target and kept for the target's
/// lifetime; a fully unmerged target simply has an empty log.
#[derive(Debug, Default)]
pub struct ProvenanceLog {
    entries: Vec<ProvenanceEntry>,
}

impl ProvenanceLog {
    pub fn entries(&self) -> &[ProvenanceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn push(&mut self, entry: ProvenanceEntry) {
        self.entries.push(entry);
    }

    pub(crate) fn pop(&mut self) -> Option<ProvenanceEntry> {
        self.entries.pop()
    }

    /// Remove and return the entries for `source`, or every entry when no
    /// source is given, preserving log order.
    pub(crate) fn take_matching(&mut self, source: Option<SurfaceId>) -> Vec<ProvenanceEntry> {
        match source {
            None => std::mem::take(&mut self.entries),
            Some(source) => {
                let (taken, kept): (Vec<_>, Vec<_>) = self
                    .entries
                    .drain(..)
                    .partition(|entry| entry.source == source);
                self.entries = kept;
                taken
            }
        }
    }
}
