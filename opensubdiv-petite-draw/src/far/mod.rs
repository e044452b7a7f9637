//! # Feature Adaptive Representation
//!
//! `far` holds the device independent input of a draw context: the refined
//! [`Mesh`] and, for adaptively refined meshes, its [`PatchTables`].
//!
//! Nothing in here is computed by this crate. Refinement and patch
//! classification happen upstream; these types only carry their results in
//! a form the [`osd`](crate::osd) layout code can read.
pub mod mesh;
pub use mesh::*;

pub mod patch_table;
pub use patch_table::*;
