//! Surface arena: nodes, surface roots and the attached side tables.
//!
//! All structural state lives here. Nodes are stored in a `SlotMap` and
//! referenced by copyable keys, so moving a control between collections moves
//! a key, never the element itself. Per-object metadata that a retained-mode
//! toolkit would stash in attached properties (merge-order hints, provenance
//! logs, the stored-strip slot) lives in `SecondaryMap` side tables keyed by
//! the owning object's id.

use slotmap::{new_key_type, SecondaryMap, SlotMap};

use super::provenance::{ProvenanceEntry, ProvenanceLog};
use super::Options;
use crate::error::{Error, Result};

new_key_type! {
    /// Key referencing a node in the arena.
    pub struct NodeId;

    /// Key referencing a surface root in the arena.
    pub struct SurfaceId;
}

/// Host-side view of one externally-owned UI element.
///
/// The engine only ever asks an element for its identity label and, during
/// flat merges, offers it a replacement data-binding context. Everything else
/// about the element is the host's business.
pub trait SurfaceElement {
    /// Opaque data-binding context that can be re-homed during a flat merge.
    type Context;

    /// Label used to match controls across surfaces. `None` is a valid
    /// identity: two unlabeled controls match each other.
    fn label(&self) -> Option<&str>;

    /// Offer the element a replacement data context. Elements that do not
    /// expose a rebindable context return `false` and are skipped.
    fn rebind_context(&mut self, context: &Self::Context) -> bool {
        let _ = context;
        false
    }
}

/// The root-attached flat collections of a hierarchical surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuxBar {
    Toolbar,
    QuickAccess,
}

impl AuxBar {
    pub const ALL: [AuxBar; 2] = [AuxBar::Toolbar, AuxBar::QuickAccess];
}

/// Structural shape of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Tabs containing groups containing items, plus auxiliary flat lists
    /// attached at the root.
    Ribbon,
    /// A single flat list of items, e.g. a status line.
    Strip,
}

/// Identity of one concrete ordered collection.
///
/// Provenance entries refer to collections through this tag instead of
/// holding references into the arena, so the log never keeps a borrow alive
/// and stays valid across arbitrary mutation in between. `Children` addresses
/// a node's child list wherever that node currently lives, which is what
/// keeps multi-tenant unmerge working after a parent control has moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListRef {
    /// Top-level tab list of a hierarchical surface.
    Tabs(SurfaceId),
    /// Child list of a node: groups under a tab, items under a group.
    Children(NodeId),
    /// One of the auxiliary flat lists of a hierarchical surface.
    Aux(SurfaceId, AuxBar),
    /// The item list of a flat surface.
    Strip(SurfaceId),
}

#[derive(Debug)]
pub(crate) enum Surface {
    Ribbon {
        tabs: Vec<NodeId>,
        toolbar: Vec<NodeId>,
        quick_access: Vec<NodeId>,
    },
    Strip {
        items: Vec<NodeId>,
    },
}

#[derive(Debug)]
pub(crate) struct Node<E> {
    pub(crate) element: E,
    pub(crate) children: Vec<NodeId>,
}

/// Arena owning every surface and node, plus the engine's side tables.
#[derive(Debug)]
pub struct SurfaceArena<E: SurfaceElement> {
    pub(crate) nodes: SlotMap<NodeId, Node<E>>,
    pub(crate) surfaces: SlotMap<SurfaceId, Surface>,
    /// Attached merge-order hints; absent means "no preference".
    pub(crate) merge_order: SecondaryMap<NodeId, usize>,
    /// Per-target provenance logs, created lazily on first merge.
    pub(crate) ledgers: SecondaryMap<SurfaceId, ProvenanceLog>,
    /// Host slot remembering which strip a surface displaced.
    stored_strips: SecondaryMap<SurfaceId, SurfaceId>,
    pub(crate) options: Options,
}

impl<E: SurfaceElement> SurfaceArena<E> {
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    pub fn with_options(options: Options) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            surfaces: SlotMap::with_key(),
            merge_order: SecondaryMap::new(),
            ledgers: SecondaryMap::new(),
            stored_strips: SecondaryMap::new(),
            options,
        }
    }

    pub fn options(&self) -> Options {
        self.options
    }

    pub fn set_options(&mut self, options: Options) {
        self.options = options;
    }

    // ========================================================================
    // Surface and node construction
    // ========================================================================

    /// Create an empty hierarchical surface.
    pub fn create_ribbon(&mut self) -> SurfaceId {
        self.surfaces.insert(Surface::Ribbon {
            tabs: Vec::new(),
            toolbar: Vec::new(),
            quick_access: Vec::new(),
        })
    }

    /// Create an empty flat surface.
    pub fn create_strip(&mut self) -> SurfaceId {
        self.surfaces.insert(Surface::Strip { items: Vec::new() })
    }

    /// Take ownership of a host element and return its node key.
    pub fn insert(&mut self, element: E) -> NodeId {
        self.nodes.insert(Node {
            element,
            children: Vec::new(),
        })
    }

    /// Append a tab to a hierarchical surface.
    pub fn push_tab(&mut self, surface: SurfaceId, tab: NodeId) -> Result<()> {
        if !self.nodes.contains_key(tab) {
            return Err(Error::MissingNode);
        }
        self.list_mut(ListRef::Tabs(surface))?.push(tab);
        Ok(())
    }

    /// Append a group under a tab.
    pub fn push_group(&mut self, tab: NodeId, group: NodeId) -> Result<()> {
        self.push_child(tab, group)
    }

    /// Append a leaf item under a group.
    pub fn push_item(&mut self, group: NodeId, item: NodeId) -> Result<()> {
        self.push_child(group, item)
    }

    /// Append an item to one of a surface's auxiliary flat lists.
    pub fn push_aux(&mut self, surface: SurfaceId, bar: AuxBar, item: NodeId) -> Result<()> {
        if !self.nodes.contains_key(item) {
            return Err(Error::MissingNode);
        }
        self.list_mut(ListRef::Aux(surface, bar))?.push(item);
        Ok(())
    }

    /// Append an item to a flat surface.
    pub fn push_strip_item(&mut self, surface: SurfaceId, item: NodeId) -> Result<()> {
        if !self.nodes.contains_key(item) {
            return Err(Error::MissingNode);
        }
        self.list_mut(ListRef::Strip(surface))?.push(item);
        Ok(())
    }

    fn push_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if !self.nodes.contains_key(child) {
            return Err(Error::MissingNode);
        }
        self.list_mut(ListRef::Children(parent))?.push(child);
        Ok(())
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn surface_kind(&self, surface: SurfaceId) -> Option<SurfaceKind> {
        match self.surfaces.get(surface)? {
            Surface::Ribbon { .. } => Some(SurfaceKind::Ribbon),
            Surface::Strip { .. } => Some(SurfaceKind::Strip),
        }
    }

    pub fn tabs(&self, surface: SurfaceId) -> Option<&[NodeId]> {
        match self.surfaces.get(surface)? {
            Surface::Ribbon { tabs, .. } => Some(tabs),
            Surface::Strip { .. } => None,
        }
    }

    pub fn aux(&self, surface: SurfaceId, bar: AuxBar) -> Option<&[NodeId]> {
        match self.surfaces.get(surface)? {
            Surface::Ribbon {
                toolbar,
                quick_access,
                ..
            } => Some(match bar {
                AuxBar::Toolbar => toolbar,
                AuxBar::QuickAccess => quick_access,
            }),
            Surface::Strip { .. } => None,
        }
    }

    pub fn strip_items(&self, surface: SurfaceId) -> Option<&[NodeId]> {
        match self.surfaces.get(surface)? {
            Surface::Strip { items } => Some(items),
            Surface::Ribbon { .. } => None,
        }
    }

    pub fn children(&self, node: NodeId) -> Option<&[NodeId]> {
        self.nodes.get(node).map(|node| node.children.as_slice())
    }

    pub fn element(&self, node: NodeId) -> Option<&E> {
        self.nodes.get(node).map(|node| &node.element)
    }

    pub fn element_mut(&mut self, node: NodeId) -> Option<&mut E> {
        self.nodes.get_mut(node).map(|node| &mut node.element)
    }

    pub fn label(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node).and_then(|node| node.element.label())
    }

    /// Every move recorded against `target`, in merge order. Empty when the
    /// target was never merged into or is fully unmerged.
    pub fn provenance(&self, target: SurfaceId) -> &[ProvenanceEntry] {
        match self.ledgers.get(target) {
            Some(log) => log.entries(),
            None => &[],
        }
    }

    // ========================================================================
    // Attached properties
    // ========================================================================

    /// Read a node's merge-order hint.
    pub fn merge_order(&self, node: NodeId) -> Option<usize> {
        self.merge_order.get(node).copied()
    }

    /// Set or clear a node's merge-order hint.
    pub fn set_merge_order(&mut self, node: NodeId, order: Option<usize>) -> Result<()> {
        if !self.nodes.contains_key(node) {
            return Err(Error::MissingNode);
        }
        match order {
            Some(order) => {
                self.merge_order.insert(node, order);
            }
            None => {
                self.merge_order.remove(node);
            }
        }
        Ok(())
    }

    /// Read the strip a host stashed against this surface.
    pub fn stored_strip(&self, surface: SurfaceId) -> Option<SurfaceId> {
        self.stored_strips.get(surface).copied()
    }

    /// Stash (or clear) the strip a surface displaced, so the host can swap
    /// it back later. The engine itself never reads this slot.
    pub fn set_stored_strip(&mut self, surface: SurfaceId, stored: Option<SurfaceId>) -> Result<()> {
        if !self.surfaces.contains_key(surface) {
            return Err(Error::MissingSurface);
        }
        match stored {
            Some(stored) => {
                self.stored_strips.insert(surface, stored);
            }
            None => {
                self.stored_strips.remove(surface);
            }
        }
        Ok(())
    }

    // ========================================================================
    // Collection resolution
    // ========================================================================

    pub(crate) fn list(&self, list: ListRef) -> Result<&Vec<NodeId>> {
        match list {
            ListRef::Tabs(surface) => match self.surfaces.get(surface) {
                Some(Surface::Ribbon { tabs, .. }) => Ok(tabs),
                Some(Surface::Strip { .. }) => Err(Error::ShapeMismatch),
                None => Err(Error::MissingSurface),
            },
            ListRef::Children(node) => self
                .nodes
                .get(node)
                .map(|node| &node.children)
                .ok_or(Error::MissingNode),
            ListRef::Aux(surface, bar) => match self.surfaces.get(surface) {
                Some(Surface::Ribbon {
                    toolbar,
                    quick_access,
                    ..
                }) => Ok(match bar {
                    AuxBar::Toolbar => toolbar,
                    AuxBar::QuickAccess => quick_access,
                }),
                Some(Surface::Strip { .. }) => Err(Error::ShapeMismatch),
                None => Err(Error::MissingSurface),
            },
            ListRef::Strip(surface) => match self.surfaces.get(surface) {
                Some(Surface::Strip { items }) => Ok(items),
                Some(Surface::Ribbon { .. }) => Err(Error::ShapeMismatch),
                None => Err(Error::MissingSurface),
            },
        }
    }

    pub(crate) fn list_mut(&mut self, list: ListRef) -> Result<&mut Vec<NodeId>> {
        match list {
            ListRef::Tabs(surface) => match self.surfaces.get_mut(surface) {
                Some(Surface::Ribbon { tabs, .. }) => Ok(tabs),
                Some(Surface::Strip { .. }) => Err(Error::ShapeMismatch),
                None => Err(Error::MissingSurface),
            },
            ListRef::Children(node) => self
                .nodes
                .get_mut(node)
                .map(|node| &mut node.children)
                .ok_or(Error::MissingNode),
            ListRef::Aux(surface, bar) => match self.surfaces.get_mut(surface) {
                Some(Surface::Ribbon {
                    toolbar,
                    quick_access,
                    ..
                }) => Ok(match bar {
                    AuxBar::Toolbar => toolbar,
                    AuxBar::QuickAccess => quick_access,
                }),
                Some(Surface::Strip { .. }) => Err(Error::ShapeMismatch),
                None => Err(Error::MissingSurface),
            },
            ListRef::Strip(surface) => match self.surfaces.get_mut(surface) {
                Some(Surface::Strip { items }) => Ok(items),
                Some(Surface::Ribbon { .. }) => Err(Error::ShapeMismatch),
                None => Err(Error::MissingSurface),
            },
        }
    }

    #[cfg(test)]
    pub(crate) fn debug_surface(&self, surface: SurfaceId) -> String {
        use std::fmt::Write as _;

        let mut out = String::new();
        let Some(root) = self.surfaces.get(surface) else {
            out.push_str("(missing)\n");
            return out;
        };

        match root {
            Surface::Ribbon {
                tabs,
                toolbar,
                quick_access,
            } => {
                out.push_str("Ribbon\n");
                for &tab in tabs {
                    let _ = writeln!(out, "  Tab {}", self.debug_label(tab));
                    for &group in self.children(tab).unwrap_or_default() {
                        let _ = writeln!(out, "    Group {}", self.debug_label(group));
                        for &item in self.children(group).unwrap_or_default() {
                            let _ = writeln!(out, "      Item {}", self.debug_label(item));
                        }
                    }
                }
                for (name, items) in [("Toolbar", toolbar), ("QuickAccess", quick_access)] {
                    if items.is_empty() {
                        continue;
                    }
                    let _ = writeln!(out, "  {name}");
                    for &item in items {
                        let _ = writeln!(out, "    Item {}", self.debug_label(item));
                    }
                }
            }
            Surface::Strip { items } => {
                out.push_str("Strip\n");
                for &item in items {
                    let _ = writeln!(out, "  Item {}", self.debug_label(item));
                }
            }
        }
        out
    }

    #[cfg(test)]
    fn debug_label(&self, node: NodeId) -> &str {
        self.label(node).unwrap_or("(unlabeled)")
    }
}
