//! # Patch Tables
//!
//! [`PatchTables`] hold the output of feature-adaptive refinement after every
//! patch has been classified. Patches are grouped into one [`PatchTable`] per
//! [`PatchCategory`]: five *full* categories (regular, boundary, corner,
//! *Gregory*, boundary *Gregory*) and three *transition* categories that are
//! further split by transition pattern and, for boundary and corner patches,
//! by rotation.
//!
//! Every patch in a table consumes the same number of indices, the *ring
//! size* of its category. Inside a table, patches are sorted by the
//! refinement level they originate from and the level boundaries are
//! recorded as *markers*.

use crate::{Error, Index, Result};

/// Number of transition patterns.
pub const TRANSITION_PATTERNS_LEN: usize = 5;

/// Number of rotations of a transition boundary or corner pattern.
pub const TRANSITION_ROTATIONS_LEN: usize = 4;

/// The patch classification a [`PatchTable`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchCategory {
    FullRegular,
    FullBoundary,
    FullCorner,
    FullGregory,
    FullBoundaryGregory,
    TransitionRegular { pattern: u8 },
    TransitionBoundary { pattern: u8, rotation: u8 },
    TransitionCorner { pattern: u8, rotation: u8 },
}

impl PatchCategory {
    /// Iterates all categories in the order their patches are packed.
    ///
    /// The full categories come first. Then, for each transition pattern,
    /// the transition regular category followed by the boundary and corner
    /// categories of each rotation, interleaved.
    ///
    /// This order decides where every group lands in the flat buffers. Draw
    /// code and shaders depend on it.
    pub fn canonical_order() -> impl Iterator<Item = PatchCategory> {
        [
            PatchCategory::FullRegular,
            PatchCategory::FullBoundary,
            PatchCategory::FullCorner,
            PatchCategory::FullGregory,
            PatchCategory::FullBoundaryGregory,
        ]
        .into_iter()
        .chain((0..TRANSITION_PATTERNS_LEN as u8).flat_map(|pattern| {
            std::iter::once(PatchCategory::TransitionRegular { pattern }).chain(
                (0..TRANSITION_ROTATIONS_LEN as u8).flat_map(move |rotation| {
                    [
                        PatchCategory::TransitionBoundary { pattern, rotation },
                        PatchCategory::TransitionCorner { pattern, rotation },
                    ]
                }),
            )
        }))
    }

    /// Returns `true` for the two *Gregory* categories.
    #[inline]
    pub fn is_gregory(&self) -> bool {
        matches!(
            self,
            PatchCategory::FullGregory | PatchCategory::FullBoundaryGregory
        )
    }

    /// The transition pattern, `0` for full categories.
    #[inline]
    pub fn pattern(&self) -> u8 {
        match *self {
            PatchCategory::TransitionRegular { pattern }
            | PatchCategory::TransitionBoundary { pattern, .. }
            | PatchCategory::TransitionCorner { pattern, .. } => pattern,
            _ => 0,
        }
    }

    /// The transition rotation, `0` where the category has none.
    #[inline]
    pub fn rotation(&self) -> u8 {
        match *self {
            PatchCategory::TransitionBoundary { rotation, .. }
            | PatchCategory::TransitionCorner { rotation, .. } => rotation,
            _ => 0,
        }
    }
}

/// Number of indices each patch of a category consumes.
///
/// The defaults are the control point counts of bicubic *B-spline* patches
/// and of the four-corner *Gregory* representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingSizes {
    pub regular: usize,
    pub boundary: usize,
    pub corner: usize,
    pub gregory: usize,
}

impl Default for RingSizes {
    /// | Property   | Value |
    /// |------------|-------|
    /// | `regular`  | `16`  |
    /// | `boundary` | `12`  |
    /// | `corner`   | `9`   |
    /// | `gregory`  | `4`   |
    fn default() -> Self {
        Self {
            regular: 16,
            boundary: 12,
            corner: 9,
            gregory: 4,
        }
    }
}

impl RingSizes {
    /// Returns the ring size used by `category`.
    ///
    /// Transition categories share the ring size of their full counterpart.
    pub fn of(&self, category: PatchCategory) -> usize {
        match category {
            PatchCategory::FullRegular | PatchCategory::TransitionRegular { .. } => self.regular,
            PatchCategory::FullBoundary | PatchCategory::TransitionBoundary { .. } => {
                self.boundary
            }
            PatchCategory::FullCorner | PatchCategory::TransitionCorner { .. } => self.corner,
            PatchCategory::FullGregory | PatchCategory::FullBoundaryGregory => self.gregory,
        }
    }
}

/// The patches of one [`PatchCategory`].
///
/// `indices` holds the control vertex indices of all patches back to back.
/// `markers` delimits the refinement levels: the patches of level `i` occupy
/// `indices[markers[i]..markers[i + 1]]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchTable {
    indices: Vec<Index>,
    markers: Vec<usize>,
    ptex_coordinates: Vec<[u32; 2]>,
    fvar_data: Vec<f32>,
}

impl PatchTable {
    /// Create a patch table from raw indices and level markers.
    pub fn new(indices: Vec<Index>, markers: Vec<usize>) -> Self {
        Self {
            indices,
            markers,
            ..Default::default()
        }
    }

    /// Create a patch table from the patch indices of each refinement level,
    /// coarsest level first.
    ///
    /// # Examples
    ///
    /// ```
    /// use opensubdiv_petite_draw::far::PatchTable;
    ///
    /// // One 4-index patch on level 0, none on level 1, two on level 2.
    /// let table = PatchTable::from_levels([
    ///     vec![0, 1, 2, 3],
    ///     vec![],
    ///     vec![4, 5, 6, 7, 8, 9, 10, 11],
    /// ]);
    ///
    /// assert_eq!(table.len(), 12);
    /// assert_eq!(table.markers(), &[0, 4, 4, 12]);
    /// assert_eq!(table.segment_elements_len(2), 8);
    /// ```
    pub fn from_levels<L, I>(levels: L) -> Self
    where
        L: IntoIterator<Item = I>,
        I: IntoIterator<Item = u32>,
    {
        let mut indices = Vec::new();
        let mut markers = vec![0];

        for level in levels {
            indices.extend(level.into_iter().map(Index));
            markers.push(indices.len());
        }

        Self::new(indices, markers)
    }

    /// Attach per-patch ptex coordinates (face index and packed level/uv).
    pub fn with_ptex_coordinates(mut self, ptex_coordinates: Vec<[u32; 2]>) -> Self {
        self.ptex_coordinates = ptex_coordinates;
        self
    }

    /// Attach per-patch face-varying data.
    pub fn with_fvar_data(mut self, fvar_data: Vec<f32>) -> Self {
        self.fvar_data = fvar_data;
        self
    }

    /// Returns the number of indices in the table.
    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Returns `true` if the table holds no patches.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[inline]
    pub fn indices(&self) -> &[Index] {
        &self.indices
    }

    #[inline]
    pub fn markers(&self) -> &[usize] {
        &self.markers
    }

    /// Returns the number of level segments, one less than the number of
    /// markers.
    #[inline]
    pub fn segments_len(&self) -> usize {
        self.markers.len().saturating_sub(1)
    }

    /// Returns the number of indices in level segment `segment`.
    ///
    /// Out of range segments and decreasing markers yield `0`.
    #[inline]
    pub fn segment_elements_len(&self, segment: usize) -> usize {
        match (self.markers.get(segment), self.markers.get(segment + 1)) {
            (Some(&start), Some(&end)) => end.saturating_sub(start),
            _ => 0,
        }
    }

    #[inline]
    pub fn ptex_coordinates(&self) -> &[[u32; 2]] {
        &self.ptex_coordinates
    }

    #[inline]
    pub fn fvar_data(&self) -> &[f32] {
        &self.fvar_data
    }

    /// Checks that the markers describe whole patches of `ring_size` indices
    /// and together cover the whole table.
    pub fn validate(&self, ring_size: usize) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }

        if ring_size == 0 {
            return Err(Error::InvalidPatch("ring size must not be zero".into()));
        }

        if self.len() % ring_size != 0 {
            return Err(Error::InvalidPatch(format!(
                "table of {} indices is not a multiple of ring size {}",
                self.len(),
                ring_size
            )));
        }

        if self.markers.first().copied().unwrap_or(0) != 0 {
            return Err(Error::InvalidPatch("first level marker must be 0".into()));
        }

        match self.markers.last() {
            None => {
                return Err(Error::InvalidPatch("table without level markers".into()));
            }
            Some(&last) if last > self.len() => {
                return Err(Error::IndexOutOfBounds {
                    index: last,
                    max: self.len(),
                });
            }
            Some(&last) if last < self.len() => {
                return Err(Error::InvalidPatch(format!(
                    "last level marker {} leaves indices {}..{} without a level",
                    last,
                    last,
                    self.len()
                )));
            }
            Some(_) => {}
        }

        for (segment, pair) in self.markers.windows(2).enumerate() {
            if pair[1] < pair[0] {
                return Err(Error::InvalidPatch(format!(
                    "level marker {} decreases ({} < {})",
                    segment + 1,
                    pair[1],
                    pair[0]
                )));
            }
            if (pair[1] - pair[0]) % ring_size != 0 {
                return Err(Error::InvalidPatch(format!(
                    "level {} holds {} indices, not a multiple of ring size {}",
                    segment,
                    pair[1] - pair[0],
                    ring_size
                )));
            }
        }

        Ok(())
    }
}

/// The complete patch classification of one adaptively refined mesh.
///
/// Besides the per-category [`PatchTable`]s this carries the tables shared
/// by both *Gregory* categories: the vertex valence table and the quad
/// offset table.
///
/// # Examples
///
/// ```
/// use opensubdiv_petite_draw::far::{PatchCategory, PatchTable, PatchTables};
///
/// let tables = PatchTables::new()
///     .with_table(
///         PatchCategory::FullRegular,
///         PatchTable::from_levels([(0..16).collect::<Vec<u32>>()]),
///     )
///     .with_max_valence(4)
///     .with_max_level(1);
///
/// assert_eq!(tables.table(PatchCategory::FullRegular).len(), 16);
/// assert!(tables.table(PatchCategory::FullCorner).is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchTables {
    full_regular: PatchTable,
    full_boundary: PatchTable,
    full_corner: PatchTable,
    full_gregory: PatchTable,
    full_boundary_gregory: PatchTable,
    transition_regular: [PatchTable; TRANSITION_PATTERNS_LEN],
    transition_boundary: [[PatchTable; TRANSITION_ROTATIONS_LEN]; TRANSITION_PATTERNS_LEN],
    transition_corner: [[PatchTable; TRANSITION_ROTATIONS_LEN]; TRANSITION_PATTERNS_LEN],
    ring_sizes: RingSizes,
    vertex_valence_table: Vec<i32>,
    quad_offset_table: Vec<u32>,
    max_valence: u32,
    max_level: u32,
}

impl PatchTables {
    /// Create empty patch tables with default [`RingSizes`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the table of `category`.
    ///
    /// # Panics
    ///
    /// If a transition pattern or rotation is out of range.
    pub fn with_table(mut self, category: PatchCategory, table: PatchTable) -> Self {
        *self.table_mut(category) = table;
        self
    }

    pub fn with_ring_sizes(mut self, ring_sizes: RingSizes) -> Self {
        self.ring_sizes = ring_sizes;
        self
    }

    pub fn with_vertex_valence_table(mut self, vertex_valence_table: Vec<i32>) -> Self {
        self.vertex_valence_table = vertex_valence_table;
        self
    }

    pub fn with_quad_offset_table(mut self, quad_offset_table: Vec<u32>) -> Self {
        self.quad_offset_table = quad_offset_table;
        self
    }

    pub fn with_max_valence(mut self, max_valence: u32) -> Self {
        self.max_valence = max_valence;
        self
    }

    pub fn with_max_level(mut self, max_level: u32) -> Self {
        self.max_level = max_level;
        self
    }

    /// Returns the table of `category`.
    ///
    /// # Panics
    ///
    /// If a transition pattern or rotation is out of range.
    pub fn table(&self, category: PatchCategory) -> &PatchTable {
        match category {
            PatchCategory::FullRegular => &self.full_regular,
            PatchCategory::FullBoundary => &self.full_boundary,
            PatchCategory::FullCorner => &self.full_corner,
            PatchCategory::FullGregory => &self.full_gregory,
            PatchCategory::FullBoundaryGregory => &self.full_boundary_gregory,
            PatchCategory::TransitionRegular { pattern } => {
                &self.transition_regular[pattern as usize]
            }
            PatchCategory::TransitionBoundary { pattern, rotation } => {
                &self.transition_boundary[pattern as usize][rotation as usize]
            }
            PatchCategory::TransitionCorner { pattern, rotation } => {
                &self.transition_corner[pattern as usize][rotation as usize]
            }
        }
    }

    /// Returns the table of `category` for modification.
    ///
    /// # Panics
    ///
    /// If a transition pattern or rotation is out of range.
    pub fn table_mut(&mut self, category: PatchCategory) -> &mut PatchTable {
        match category {
            PatchCategory::FullRegular => &mut self.full_regular,
            PatchCategory::FullBoundary => &mut self.full_boundary,
            PatchCategory::FullCorner => &mut self.full_corner,
            PatchCategory::FullGregory => &mut self.full_gregory,
            PatchCategory::FullBoundaryGregory => &mut self.full_boundary_gregory,
            PatchCategory::TransitionRegular { pattern } => {
                &mut self.transition_regular[pattern as usize]
            }
            PatchCategory::TransitionBoundary { pattern, rotation } => {
                &mut self.transition_boundary[pattern as usize][rotation as usize]
            }
            PatchCategory::TransitionCorner { pattern, rotation } => {
                &mut self.transition_corner[pattern as usize][rotation as usize]
            }
        }
    }

    #[inline]
    pub fn ring_sizes(&self) -> &RingSizes {
        &self.ring_sizes
    }

    /// Returns the ring size of `category`.
    #[inline]
    pub fn ring_size(&self, category: PatchCategory) -> usize {
        self.ring_sizes.of(category)
    }

    /// Per-vertex valence data used to evaluate *Gregory* patches.
    #[inline]
    pub fn vertex_valence_table(&self) -> &[i32] {
        &self.vertex_valence_table
    }

    /// Per-patch quad offsets used to evaluate *Gregory* patches.
    #[inline]
    pub fn quad_offset_table(&self) -> &[u32] {
        &self.quad_offset_table
    }

    /// Returns the maximum vertex valence of the refined mesh.
    #[inline]
    pub fn max_valence(&self) -> u32 {
        self.max_valence
    }

    /// Returns the maximum refinement level of the refined mesh.
    #[inline]
    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    /// Iterates `(category, table)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (PatchCategory, &PatchTable)> + '_ {
        PatchCategory::canonical_order().map(move |category| (category, self.table(category)))
    }

    /// Returns `true` if no category holds any patch.
    pub fn is_empty(&self) -> bool {
        self.iter().all(|(_, table)| table.is_empty())
    }

    /// Validates every table against the ring size of its category.
    pub fn validate(&self) -> Result<()> {
        self.iter().try_for_each(|(category, table)| {
            table.validate(self.ring_size(category)).map_err(|error| match error {
                Error::InvalidPatch(message) => {
                    Error::InvalidPatch(format!("{category:?}: {message}"))
                }
                other => other,
            })
        })
    }
}
