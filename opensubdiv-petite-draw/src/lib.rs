//#![warn(missing_docs)]
#![doc(
    html_logo_url = "https://raw.githubusercontent.com/virtualritz/opensubdiv/master/osd-logo.png"
)]
//! # Patch Draw Context
//!
//! Turns a set of already classified, feature-adaptive subdivision patches
//! into one linearized, device-ready layout:
//!
//! * a flat patch index buffer,
//! * a per-primitive refinement level buffer,
//! * the vertex valence and quad offset tables needed by *Gregory* patches,
//! * and an ordered list of [`PatchArray`](osd::PatchArray)s that split the
//!   flat buffers into ranges drawable with one uniform render state each.
//!
//! The patch tables themselves are produced upstream, by whatever performs
//! feature-adaptive refinement. They enter this crate as plain data
//! ([`far::PatchTables`], [`far::Mesh`]). Buffers are allocated through a
//! caller supplied [`ResourceProvider`](osd::ResourceProvider); this crate
//! never talks to a graphics API itself unless the `wgpu` feature is enabled.
//!
//! ```
//! use opensubdiv_petite_draw::{far, osd};
//!
//! // A mesh that was only refined uniformly has no patch tables.
//! let mesh = far::Mesh::uniform(
//!     far::Scheme::CatmullClark,
//!     4,
//!     vec![vec![0, 1, 2, 3]],
//! );
//!
//! let provider = osd::CpuResourceProvider::new();
//! let context = osd::DrawContext::new(
//!     &provider,
//!     &mesh,
//!     None,
//!     osd::DrawContextOptions::default(),
//! )?;
//!
//! assert!(!context.is_adaptive());
//! assert_eq!(context.patch_arrays().len(), 1);
//! assert_eq!(context.patch_arrays()[0].patch_size(), 4);
//! # Ok::<(), opensubdiv_petite_draw::Error>(())
//! ```
//!
//! ## Features
#![doc = document_features::document_features!()]
//!
//! ## API Changes From C++
//!
//! The layout rules mirror the *OpenSubdiv* 2.x draw contexts. Naming follows
//! the conventions of [`opensubdiv-petite`](https://docs.rs/opensubdiv-petite/):
//! * Canonical Rust naming – (`GetNumElements()` becomes `elements_len()`).
//! * Unsigned integer types, `usize` and `u32`, for anything that can only
//!   contain positive values (indices, sizes, counts, valences, levels).
//! * Resources are owned handles. Nothing needs to be released manually and
//!   a failed build drops whatever it allocated so far.

pub mod error;
pub mod far;
pub mod osd;

pub use error::{Error, Result};

/// A vertex index as stored in the patch index buffer.
///
/// # Examples
///
/// ```
/// use opensubdiv_petite_draw::Index;
///
/// // Create an index from a u32
/// let idx = Index::from(42u32);
/// assert_eq!(idx.0, 42);
///
/// // Convert back to u32
/// let value: u32 = idx.into();
/// assert_eq!(value, 42);
///
/// // Create from usize
/// let idx = Index::from(100usize);
/// let as_usize: usize = idx.into();
/// assert_eq!(as_usize, 100);
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    bytemuck::Pod,
    bytemuck::Zeroable,
    derive_more::Display,
)]
#[repr(transparent)]
pub struct Index(pub u32);

impl From<u32> for Index {
    fn from(value: u32) -> Self {
        Index(value)
    }
}

impl From<Index> for u32 {
    fn from(index: Index) -> Self {
        index.0
    }
}

impl From<usize> for Index {
    fn from(value: usize) -> Self {
        Index(value as u32)
    }
}

impl From<Index> for usize {
    fn from(index: Index) -> Self {
        index.0 as usize
    }
}
