//! The refined mesh a draw context is built from.
use num_enum::{IntoPrimitive, TryFromPrimitive};

use super::PatchTables;
use crate::Index;

/// Subdivision scheme the mesh was refined with.
#[repr(u32)]
#[derive(
    TryFromPrimitive, IntoPrimitive, Copy, Clone, Debug, PartialEq, Eq, Hash, derive_more::Display,
)]
pub enum Scheme {
    /// *Bilinear* interpolation.
    Bilinear,
    /// [*Catmull-Clark* subdivision](https://en.wikipedia.org/wiki/Catmull%E2%80%93Clark_subdivision_surface).
    CatmullClark,
    /// [*Loop* subdivision](https://en.wikipedia.org/wiki/Loop_subdivision_surface).
    Loop,
}

impl Scheme {
    /// Returns `true` if refining with this scheme yields triangles.
    #[inline]
    pub fn is_triangular(self) -> bool {
        matches!(self, Scheme::Loop)
    }

    /// Number of vertices per face of the refined mesh.
    #[inline]
    pub fn face_size(self) -> usize {
        if self.is_triangular() {
            3
        } else {
            4
        }
    }
}

/// A refined mesh as seen by the draw context.
///
/// A mesh either carries [`PatchTables`] (it was refined adaptively and its
/// patches classified) or only the face-vertex lists of its uniformly refined
/// levels.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    scheme: Scheme,
    vertices_len: usize,
    face_vertices: Vec<Vec<Index>>,
    patch_tables: Option<PatchTables>,
    fvar_width: usize,
}

impl Mesh {
    /// Create a uniformly refined mesh from the face-vertex lists of each
    /// refinement level, coarsest first.
    pub fn uniform<L, I>(scheme: Scheme, vertices_len: usize, face_vertices: L) -> Self
    where
        L: IntoIterator<Item = I>,
        I: IntoIterator<Item = u32>,
    {
        Self {
            scheme,
            vertices_len,
            face_vertices: face_vertices
                .into_iter()
                .map(|level| level.into_iter().map(Index).collect())
                .collect(),
            patch_tables: None,
            fvar_width: 0,
        }
    }

    /// Create an adaptively refined mesh from its classified patches.
    pub fn adaptive(scheme: Scheme, vertices_len: usize, patch_tables: PatchTables) -> Self {
        Self {
            scheme,
            vertices_len,
            face_vertices: Vec::new(),
            patch_tables: Some(patch_tables),
            fvar_width: 0,
        }
    }

    /// Set the total width of all face-varying primvars.
    pub fn with_fvar_width(mut self, fvar_width: usize) -> Self {
        self.fvar_width = fvar_width;
        self
    }

    #[inline]
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Returns the total number of vertices, over all levels.
    #[inline]
    pub fn vertices_len(&self) -> usize {
        self.vertices_len
    }

    /// Returns the number of uniformly refined levels.
    #[inline]
    pub fn refinement_levels(&self) -> usize {
        self.face_vertices.len()
    }

    /// Returns the face-vertex list of `level`.
    #[inline]
    pub fn face_vertices(&self, level: usize) -> Option<&[Index]> {
        self.face_vertices.get(level).map(Vec::as_slice)
    }

    /// Returns the patch classification, if the mesh was refined adaptively.
    #[inline]
    pub fn patch_tables(&self) -> Option<&PatchTables> {
        self.patch_tables.as_ref()
    }

    /// Returns the total width of all face-varying primvars.
    #[inline]
    pub fn total_fvar_width(&self) -> usize {
        self.fvar_width
    }
}
