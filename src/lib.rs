//! Reversible splicing of plugin command surfaces.
//!
//! Independent feature modules each contribute tabs, groups, controls or
//! status items into one shared command surface. This crate grafts such a
//! "source" surface into a "target" surface control-for-control, matching
//! existing controls by label, and can later withdraw exactly that
//! contribution again without disturbing anything another module merged into
//! the same target in the meantime.
//!
//! The crate deliberately knows nothing about rendering. Surfaces are ordered
//! collections of node keys in a [`SurfaceArena`]; the host's widget type
//! plugs in through the [`SurfaceElement`] trait, which only exposes an
//! optional identity label and an optional re-bindable data context.
//!
//! ```
//! use ribbon_splice::{SurfaceArena, SurfaceElement};
//!
//! struct Control {
//!     label: Option<String>,
//! }
//!
//! impl SurfaceElement for Control {
//!     type Context = ();
//!
//!     fn label(&self) -> Option<&str> {
//!         self.label.as_deref()
//!     }
//! }
//!
//! # fn control(label: &str) -> Control {
//! #     Control { label: Some(label.to_owned()) }
//! # }
//! let mut arena = SurfaceArena::new();
//!
//! let shell = arena.create_ribbon();
//! let home = arena.insert(control("Home"));
//! arena.push_tab(shell, home)?;
//!
//! let plugin = arena.create_ribbon();
//! let review = arena.insert(control("Review"));
//! arena.push_tab(plugin, review)?;
//!
//! arena.merge(shell, plugin)?;
//! assert_eq!(arena.tabs(shell).unwrap().len(), 2);
//!
//! arena.unmerge(shell, plugin)?;
//! assert_eq!(arena.tabs(shell).unwrap().len(), 1);
//! # Ok::<(), ribbon_splice::Error>(())
//! ```

pub mod error;
pub mod splice;

pub use error::{Error, Result};
pub use splice::{
    AuxBar, ListRef, MergedKind, NodeId, Options, Origin, ProvenanceEntry, ProvenanceLog,
    SurfaceArena, SurfaceElement, SurfaceId, SurfaceKind,
};
