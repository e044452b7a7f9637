//! # OpenSubdiv Drawing
//! `osd` contains the device facing half of the crate. It turns the
//! [`far`](crate::far) patch classification into buffers a tessellation
//! pipeline can draw:
//! * **Layout**
//!
//!   Pack all patch categories into one flat index buffer and one flat level
//!   buffer and record the [`PatchArray`] ranges ([`layout`]).
//! * **Draw Context**
//!
//!   Allocate and fill the device buffers and keep them together with the
//!   patch arrays ([`DrawContext`]).
//! * **Resource Providers**
//!
//!   Abstract buffer creation and mapping ([`ResourceProvider`]). A host
//!   memory implementation ([`CpuResourceProvider`]) is always available,
//!   a `wgpu` one behind the `wgpu` feature.
pub mod cpu_resources;
pub use cpu_resources::*;

pub mod draw_context;
pub use draw_context::*;

pub mod layout;
pub use layout::{LayoutBuilder, LayoutTotals, PatchLayout};

pub mod patch_descriptor;
pub use patch_descriptor::*;

pub mod resource;
pub use resource::*;

#[cfg(feature = "wgpu")]
pub mod wgpu;
