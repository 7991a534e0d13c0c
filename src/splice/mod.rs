//! Merge/unmerge engine for plugin command surfaces.
//!
//! Two structural shapes share one engine: hierarchical surfaces (tabs
//! containing groups containing items, plus flat auxiliary lists attached at
//! the root) and flat surfaces (a single ordered item list). Merging walks
//! the source top-down. At each level an unmatched control is grafted whole
//! at the position its merge-order hint resolves to; a matched control is
//! descended into instead. Every structural move appends one entry to the
//! target's provenance log, keyed by the source surface that caused it, so
//! any one contribution can be withdrawn later without touching the others.
//!
//! Unmerging replays the matching entries in reverse. Undoing the newest
//! move first rewinds every collection through the exact states it passed
//! through during the merge, which is what makes the round trip restore
//! original positions, not just membership. The same replay runs when a
//! merge fails halfway: the entries recorded so far are undone and both
//! surfaces come back exactly as they were, so a merge either applies fully
//! or not at all.

pub mod provenance;
pub mod surface;


use log::{trace, warn};

pub use provenance::{MergedKind, Origin, ProvenanceEntry, ProvenanceLog};
pub use surface::{AuxBar, ListRef, NodeId, SurfaceArena, SurfaceElement, SurfaceId, SurfaceKind};

use crate::error::{Error, Result};

/// Policy knobs for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Clamp an out-of-range merge-order hint to the end of the destination
    /// instead of failing the merge with [`Error::InvalidIndex`].
    pub clamp_hints: bool,
    /// Re-insert controls at their recorded positions on unmerge. When off,
    /// restored controls are appended to their original collection.
    pub restore_positions: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            clamp_hints: false,
            restore_positions: true,
        }
    }
}

impl<E: SurfaceElement> SurfaceArena<E> {
    /// Splice `source` into `target`, matching existing controls by label.
    ///
    /// Both surfaces must have the same shape. The merge is transactional: on
    /// error the target and the source are restored exactly and the error is
    /// returned.
    pub fn merge(&mut self, target: SurfaceId, source: SurfaceId) -> Result<()> {
        self.merge_impl(target, source, None)
    }

    /// Flat-surface merge that additionally offers each moved element a
    /// replacement data-binding context. Hierarchical targets reject the
    /// override with [`Error::ContextOverrideUnsupported`].
    pub fn merge_with_context(
        &mut self,
        target: SurfaceId,
        source: SurfaceId,
        context: &E::Context,
    ) -> Result<()> {
        self.merge_impl(target, source, Some(context))
    }

    /// Reverse a previous merge of `source` into `target`.
    ///
    /// A target that was never merged into, or a source with no logged
    /// entries, is a no-op: unmerge is idempotent. Contributions from other
    /// sources are left untouched.
    pub fn unmerge(&mut self, target: SurfaceId, source: SurfaceId) -> Result<()> {
        self.unmerge_impl(target, Some(source))
    }

    /// Reverse every merge ever applied to `target`, regardless of source.
    pub fn unmerge_all(&mut self, target: SurfaceId) -> Result<()> {
        self.unmerge_impl(target, None)
    }

    fn merge_impl(
        &mut self,
        target: SurfaceId,
        source: SurfaceId,
        context: Option<&E::Context>,
    ) -> Result<()> {
        if target == source {
            return Err(Error::SelfMerge);
        }
        let target_kind = self.surface_kind(target).ok_or(Error::MissingSurface)?;
        let source_kind = self.surface_kind(source).ok_or(Error::MissingSurface)?;
        if target_kind != source_kind {
            return Err(Error::ShapeMismatch);
        }
        if context.is_some() && target_kind != SurfaceKind::Strip {
            return Err(Error::ContextOverrideUnsupported);
        }
        // A second merge of the same source would give controls a second log
        // entry; the log must stay one entry per merged control.
        if self
            .provenance(target)
            .iter()
            .any(|entry| entry.source == source)
        {
            return Err(Error::AlreadyMerged);
        }

        // The log outlives individual merges; create it on first use only.
        if !self.ledgers.contains_key(target) {
            self.ledgers.insert(target, ProvenanceLog::default());
        }
        let checkpoint = self.provenance(target).len();

        trace!("merging {source:?} into {target:?} ({target_kind:?})");
        let result = match target_kind {
            SurfaceKind::Ribbon => self.merge_ribbon(target, source),
            SurfaceKind::Strip => self.merge_strip(target, source, context),
        };

        if let Err(err) = result {
            self.rollback(target, checkpoint);
            return Err(err);
        }
        Ok(())
    }

    fn merge_ribbon(&mut self, target: SurfaceId, source: SurfaceId) -> Result<()> {
        let source_tabs = self.in_merge_order(self.list(ListRef::Tabs(source))?.clone());
        for tab in source_tabs {
            let matched = self.match_by_label(self.list(ListRef::Tabs(target))?, tab);
            match matched {
                None => {
                    // The whole subtree moves as one unit under one entry,
                    // and the source keeps its reference to the tab.
                    self.graft(target, source, MergedKind::Tab, tab, ListRef::Tabs(target), None)?;
                }
                Some(target_tab) => {
                    self.merge_groups(target, source, tab, target_tab)?;
                }
            }
        }

        // Auxiliary lists never match anything; they are purely additive.
        for bar in AuxBar::ALL {
            let items = self.list(ListRef::Aux(source, bar))?.clone();
            for item in items {
                self.record(
                    target,
                    ProvenanceEntry {
                        kind: MergedKind::AuxItem,
                        control: item,
                        source,
                        target_list: ListRef::Aux(target, bar),
                        origin: None,
                    },
                );
                self.list_mut(ListRef::Aux(target, bar))?.push(item);
            }
        }
        Ok(())
    }

    fn merge_groups(
        &mut self,
        target: SurfaceId,
        source: SurfaceId,
        source_tab: NodeId,
        target_tab: NodeId,
    ) -> Result<()> {
        let source_groups = self.in_merge_order(self.list(ListRef::Children(source_tab))?.clone());
        for group in source_groups {
            let matched = self.match_by_label(self.list(ListRef::Children(target_tab))?, group);
            match matched {
                None => {
                    let index = self.excise(ListRef::Children(source_tab), group)?;
                    self.graft(
                        target,
                        source,
                        MergedKind::Group,
                        group,
                        ListRef::Children(target_tab),
                        Some(Origin {
                            list: ListRef::Children(source_tab),
                            index,
                        }),
                    )?;
                }
                Some(target_group) => {
                    // Leaves are never matched by identity: the source
                    // contributes all of them under the matched group.
                    let items = self.in_merge_order(self.list(ListRef::Children(group))?.clone());
                    for item in items {
                        let index = self.excise(ListRef::Children(group), item)?;
                        self.graft(
                            target,
                            source,
                            MergedKind::Item,
                            item,
                            ListRef::Children(target_group),
                            Some(Origin {
                                list: ListRef::Children(group),
                                index,
                            }),
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    fn merge_strip(
        &mut self,
        target: SurfaceId,
        source: SurfaceId,
        context: Option<&E::Context>,
    ) -> Result<()> {
        let items = self.in_merge_order(self.list(ListRef::Strip(source))?.clone());
        for &item in &items {
            let index = self.excise(ListRef::Strip(source), item)?;
            self.graft(
                target,
                source,
                MergedKind::Item,
                item,
                ListRef::Strip(target),
                Some(Origin {
                    list: ListRef::Strip(source),
                    index,
                }),
            )?;
        }
        // Rebinds run only once every structural move has succeeded, so a
        // failed merge never re-homes a context.
        if let Some(context) = context {
            for &item in &items {
                if let Some(element) = self.element_mut(item) {
                    element.rebind_context(context);
                }
            }
        }
        Ok(())
    }

    fn unmerge_impl(&mut self, target: SurfaceId, source: Option<SurfaceId>) -> Result<()> {
        if !self.surfaces.contains_key(target) {
            return Err(Error::MissingSurface);
        }
        let Some(log) = self.ledgers.get_mut(target) else {
            return Ok(());
        };
        let entries = log.take_matching(source);
        trace!("unmerging {} entries from {target:?}", entries.len());
        let restore = self.options.restore_positions;
        for entry in entries.into_iter().rev() {
            self.undo_entry(entry, restore);
        }
        Ok(())
    }

    /// Record one entry and insert `control` into `dest` at its resolved
    /// position. The entry goes in first: if the resolve fails, rollback must
    /// still see any excision that already happened.
    fn graft(
        &mut self,
        target: SurfaceId,
        source: SurfaceId,
        kind: MergedKind,
        control: NodeId,
        dest: ListRef,
        origin: Option<Origin>,
    ) -> Result<()> {
        self.record(
            target,
            ProvenanceEntry {
                kind,
                control,
                source,
                target_list: dest,
                origin,
            },
        );
        let position = self.resolve_position(control, dest)?;
        self.list_mut(dest)?.insert(position, control);
        Ok(())
    }

    /// Undo everything this merge call recorded, newest first.
    fn rollback(&mut self, target: SurfaceId, checkpoint: usize) {
        while self.provenance(target).len() > checkpoint {
            let Some(entry) = self.ledgers.get_mut(target).and_then(|log| log.pop()) else {
                break;
            };
            // Positions are always restored here: a failed merge must leave
            // both surfaces exactly as it found them.
            self.undo_entry(entry, true);
        }
    }

    fn undo_entry(&mut self, entry: ProvenanceEntry, restore_positions: bool) {
        match self.list_mut(entry.target_list) {
            Ok(list) => {
                if let Some(position) = list.iter().position(|&id| id == entry.control) {
                    list.remove(position);
                } else {
                    warn!("merged control {:?} is gone from its target list", entry.control);
                }
            }
            Err(err) => warn!("target list of {:?} is unreachable: {err}", entry.control),
        }

        let Some(origin) = entry.origin else {
            return;
        };
        match self.list_mut(origin.list) {
            Ok(list) => {
                let position = if restore_positions {
                    // Interleaved merges can have shortened the original list
                    // in the meantime; fall back to the closest valid slot.
                    origin.index.min(list.len())
                } else {
                    list.len()
                };
                list.insert(position, entry.control);
            }
            Err(err) => warn!("origin list of {:?} is unreachable: {err}", entry.control),
        }
    }

    /// First match wins; a linear scan is plenty at ribbon sizes.
    fn match_by_label(&self, candidates: &[NodeId], probe: NodeId) -> Option<NodeId> {
        let probe_label = self.label(probe);
        candidates
            .iter()
            .copied()
            .find(|&candidate| labels_match(self.label(candidate), probe_label))
    }

    /// Siblings merge in ascending hint order; hintless nodes go last and
    /// keep their relative order among themselves.
    fn in_merge_order(&self, mut ids: Vec<NodeId>) -> Vec<NodeId> {
        ids.sort_by_key(|&id| match self.merge_order(id) {
            Some(hint) => (false, hint),
            None => (true, 0),
        });
        ids
    }

    fn resolve_position(&self, control: NodeId, dest: ListRef) -> Result<usize> {
        let len = self.list(dest)?.len();
        match self.merge_order(control) {
            None => Ok(len),
            Some(hint) if hint <= len => Ok(hint),
            Some(_) if self.options.clamp_hints => Ok(len),
            Some(hint) => Err(Error::InvalidIndex { index: hint, len }),
        }
    }

    /// Remove `control` from `list`, returning the index it held.
    fn excise(&mut self, list: ListRef, control: NodeId) -> Result<usize> {
        let items = self.list_mut(list)?;
        let position = items
            .iter()
            .position(|&id| id == control)
            .ok_or(Error::MissingNode)?;
        items.remove(position);
        Ok(position)
    }

    fn record(&mut self, target: SurfaceId, entry: ProvenanceEntry) {
        if let Some(log) = self.ledgers.get_mut(target) {
            log.push(entry);
        }
    }
}

/// Two controls are the same mergeable element when both are unlabeled, or
/// when both carry equal labels. A single missing label never matches.
fn labels_match(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
impl<E: SurfaceElement> SurfaceArena<E> {
    pub(crate) fn verify_invariants(&self) {
        use std::collections::{HashMap, HashSet};

        // Every key held by a collection must resolve to a live node.
        let mut reference_counts: HashMap<NodeId, usize> = HashMap::new();
        for list in self.all_lists() {
            for &id in self.list(list).unwrap() {
                assert!(
                    self.nodes.contains_key(id),
                    "collection holds a stale node key"
                );
                *reference_counts.entry(id).or_default() += 1;
            }
        }

        for (_, log) in self.ledgers.iter() {
            let mut seen = HashSet::new();
            for entry in log.entries() {
                assert!(
                    self.nodes.contains_key(entry.control),
                    "log entry references a stale control"
                );
                assert!(
                    seen.insert(entry.control),
                    "control is represented by two entries in one log"
                );
                assert!(
                    self.list(entry.target_list).unwrap().contains(&entry.control),
                    "logged control is absent from its target list"
                );
            }
        }

        // A key may appear in several collections only while a graft of an
        // un-excised control (a tab or an auxiliary item) aliases it.
        for (&id, &count) in &reference_counts {
            if count <= 1 {
                continue;
            }
            let aliasing_grafts = self
                .ledgers
                .iter()
                .flat_map(|(_, log)| log.entries())
                .filter(|entry| entry.control == id && entry.origin.is_none())
                .count();
            assert!(
                count <= 1 + aliasing_grafts,
                "node appears in {count} collections with only {aliasing_grafts} aliasing grafts"
            );
        }
    }

    fn all_lists(&self) -> Vec<ListRef> {
        let mut lists = Vec::new();
        for surface in self.surfaces.keys() {
            match self.surface_kind(surface) {
                Some(SurfaceKind::Ribbon) => {
                    lists.push(ListRef::Tabs(surface));
                    for bar in AuxBar::ALL {
                        lists.push(ListRef::Aux(surface, bar));
                    }
                }
                Some(SurfaceKind::Strip) => lists.push(ListRef::Strip(surface)),
                None => {}
            }
        }
        for node in self.nodes.keys() {
            lists.push(ListRef::Children(node));
        }
        lists
    }
}
