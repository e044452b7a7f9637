//! Patch array descriptors.
//!
//! A [`PatchArray`] delimits a contiguous range of the flat patch index
//! buffer whose patches are all drawn with the same render state, described
//! by its [`PatchDescriptor`].
use std::ops::Range;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::far::PatchCategory;

/// Number of sub-patches each transition pattern is drawn as.
///
/// Indexed by transition pattern. The values come from how the tessellation
/// shaders split a transition patch along its finer edges.
pub const SUBPATCH_COUNTS: [usize; 5] = [3, 4, 4, 4, 2];

/// The kind of patch a [`PatchArray`] draws.
///
/// The discriminants are the values shaders see.
#[repr(u32)]
#[derive(
    TryFromPrimitive,
    IntoPrimitive,
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    derive_more::Display,
)]
pub enum PatchType {
    /// Plain faces of a uniformly refined mesh.
    NonPatch,
    Regular,
    Boundary,
    Corner,
    Gregory,
    BoundaryGregory,
    TransitionRegular,
    TransitionBoundary,
    TransitionCorner,
}

impl PatchType {
    #[inline]
    pub fn is_transition(self) -> bool {
        matches!(
            self,
            PatchType::TransitionRegular
                | PatchType::TransitionBoundary
                | PatchType::TransitionCorner
        )
    }
}

impl From<PatchCategory> for PatchType {
    fn from(category: PatchCategory) -> Self {
        match category {
            PatchCategory::FullRegular => PatchType::Regular,
            PatchCategory::FullBoundary => PatchType::Boundary,
            PatchCategory::FullCorner => PatchType::Corner,
            PatchCategory::FullGregory => PatchType::Gregory,
            PatchCategory::FullBoundaryGregory => PatchType::BoundaryGregory,
            PatchCategory::TransitionRegular { .. } => PatchType::TransitionRegular,
            PatchCategory::TransitionBoundary { .. } => PatchType::TransitionBoundary,
            PatchCategory::TransitionCorner { .. } => PatchType::TransitionCorner,
        }
    }
}

/// Render state shared by every patch of a [`PatchArray`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PatchDescriptor {
    patch_type: PatchType,
    pattern: u8,
    rotation: u8,
    subpatch: u8,
    max_valence: u32,
    elements_len: u32,
}

impl PatchDescriptor {
    pub fn new(patch_type: PatchType, pattern: u8, rotation: u8) -> Self {
        Self {
            patch_type,
            pattern,
            rotation,
            subpatch: 0,
            max_valence: 0,
            elements_len: 0,
        }
    }

    /// Set the data *Gregory* evaluation needs: the maximum vertex valence
    /// and the number of float elements per vertex.
    pub fn with_gregory_payload(mut self, max_valence: u32, elements_len: u32) -> Self {
        self.max_valence = max_valence;
        self.elements_len = elements_len;
        self
    }

    pub(crate) fn with_subpatch(mut self, subpatch: u8) -> Self {
        self.subpatch = subpatch;
        self
    }

    #[inline]
    pub fn patch_type(&self) -> PatchType {
        self.patch_type
    }

    /// The transition pattern, `0` for non-transition patches.
    #[inline]
    pub fn pattern(&self) -> u8 {
        self.pattern
    }

    /// The transition rotation, `0` where the patch type has none.
    #[inline]
    pub fn rotation(&self) -> u8 {
        self.rotation
    }

    /// Which sub-patch of a transition pattern this descriptor draws.
    #[inline]
    pub fn subpatch(&self) -> u8 {
        self.subpatch
    }

    #[inline]
    pub fn max_valence(&self) -> u32 {
        self.max_valence
    }

    /// Number of float elements per vertex, only set for *Gregory* patches.
    #[inline]
    pub fn elements_len(&self) -> u32 {
        self.elements_len
    }

    /// Returns how many sub-patches a patch with this descriptor is drawn
    /// as: [`SUBPATCH_COUNTS`] for transition patches, `1` otherwise.
    ///
    /// # Panics
    ///
    /// If the pattern of a transition descriptor is out of range.
    #[inline]
    pub fn subpatches_len(&self) -> usize {
        if self.patch_type.is_transition() {
            SUBPATCH_COUNTS[self.pattern as usize]
        } else {
            1
        }
    }
}

impl From<PatchCategory> for PatchDescriptor {
    fn from(category: PatchCategory) -> Self {
        Self::new(category.into(), category.pattern(), category.rotation())
    }
}

/// A contiguous range of the patch index buffer drawable with one
/// [`PatchDescriptor`].
///
/// `first_index`/`indices_len` address the index buffer, `level_base` the
/// level buffer. Since ptex coordinates and face-varying data are stored per
/// patch as well, `level_base` addresses those buffers too.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PatchArray {
    descriptor: PatchDescriptor,
    patch_size: usize,
    first_index: usize,
    indices_len: usize,
    level_base: usize,
    gregory_quad_offset_base: usize,
}

impl PatchArray {
    pub fn new(
        descriptor: PatchDescriptor,
        patch_size: usize,
        first_index: usize,
        indices_len: usize,
        level_base: usize,
        gregory_quad_offset_base: usize,
    ) -> Self {
        Self {
            descriptor,
            patch_size,
            first_index,
            indices_len,
            level_base,
            gregory_quad_offset_base,
        }
    }

    pub(crate) fn with_subpatch(mut self, subpatch: u8) -> Self {
        self.descriptor = self.descriptor.with_subpatch(subpatch);
        self
    }

    #[inline]
    pub fn descriptor(&self) -> &PatchDescriptor {
        &self.descriptor
    }

    /// Number of indices per patch.
    #[inline]
    pub fn patch_size(&self) -> usize {
        self.patch_size
    }

    #[inline]
    pub fn first_index(&self) -> usize {
        self.first_index
    }

    #[inline]
    pub fn indices_len(&self) -> usize {
        self.indices_len
    }

    /// Returns the range of the index buffer this array draws.
    #[inline]
    pub fn index_range(&self) -> Range<usize> {
        self.first_index..self.first_index + self.indices_len
    }

    /// Returns the number of patches in this array.
    #[inline]
    pub fn patches_len(&self) -> usize {
        if self.patch_size == 0 {
            0
        } else {
            self.indices_len / self.patch_size
        }
    }

    #[inline]
    pub fn level_base(&self) -> usize {
        self.level_base
    }

    /// Offset of this array's first entry in the quad offset table.
    #[inline]
    pub fn gregory_quad_offset_base(&self) -> usize {
        self.gregory_quad_offset_base
    }
}
