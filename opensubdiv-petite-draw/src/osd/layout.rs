//! # Patch Layout
//!
//! Packs the per-category [`PatchTable`]s of a [`PatchTables`] into one flat
//! index buffer and one flat level buffer, and records a [`PatchArray`] for
//! every range that is drawn with the same state.
//!
//! Categories are packed in [`PatchCategory::canonical_order()`]. Empty
//! categories take up no space and produce no patch array. Transition
//! categories produce one patch array per sub-patch, all covering the same
//! range.
//!
//! The writes go into caller supplied byte regions, normally the mapped
//! memory of the device buffers sized by [`LayoutTotals`]. Every write is
//! bounds-checked against its region.
use bytemuck::Pod;

use super::{PatchArray, PatchDescriptor};
use crate::far::{PatchCategory, PatchTable, PatchTables};
use crate::{Error, Result};

/// Number of face-varying values per patch and primvar element; adaptive
/// patches are quads.
const FVAR_VALUES_PER_PATCH: usize = 4;

/// Sizes of the flat buffers, in elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LayoutTotals {
    /// Number of entries in the flat index buffer.
    pub indices_len: usize,
    /// Number of entries in the flat level buffer, one per patch.
    pub levels_len: usize,
}

impl LayoutTotals {
    /// Sums index and level counts over every category of `tables`.
    pub fn accumulate(tables: &PatchTables) -> Self {
        tables
            .iter()
            .fold(Self::default(), |totals, (category, table)| Self {
                indices_len: totals.indices_len + table.len(),
                levels_len: totals.levels_len
                    + table
                        .len()
                        .checked_div(tables.ring_size(category))
                        .unwrap_or(0),
            })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        0 == self.indices_len
    }
}

/// Writes patch groups into flat index and level regions.
///
/// The builder keeps a write cursor into each region. Groups are appended
/// back to back; nothing is ever rewritten.
#[derive(Debug)]
pub struct LayoutBuilder<'a> {
    index_region: &'a mut [u8],
    level_region: &'a mut [u8],
    index_base: usize,
    level_base: usize,
    patch_arrays: Vec<PatchArray>,
}

impl<'a> LayoutBuilder<'a> {
    /// Create a builder writing `u32` indices into `index_region` and `u32`
    /// levels into `level_region`, both starting at element `0`.
    pub fn new(index_region: &'a mut [u8], level_region: &'a mut [u8]) -> Self {
        Self {
            index_region,
            level_region,
            index_base: 0,
            level_base: 0,
            patch_arrays: Vec::new(),
        }
    }

    /// Element offset the next group's indices are written to.
    #[inline]
    pub fn index_base(&self) -> usize {
        self.index_base
    }

    /// Element offset the next group's levels are written to.
    #[inline]
    pub fn level_base(&self) -> usize {
        self.level_base
    }

    /// Returns the patch arrays appended so far.
    #[inline]
    pub fn patch_arrays(&self) -> &[PatchArray] {
        &self.patch_arrays
    }

    /// Appends the patches of `table`.
    ///
    /// Copies the raw indices, writes one level entry per patch (the index
    /// of the marker segment the patch lies in) and records
    /// [`subpatches_len()`](PatchDescriptor::subpatches_len) patch arrays
    /// that differ only in their sub-patch id.
    ///
    /// An empty table appends nothing. A table whose markers do not assign
    /// exactly one level to every patch is rejected before anything is
    /// written.
    pub fn append_group(
        &mut self,
        table: &PatchTable,
        ring_size: usize,
        descriptor: PatchDescriptor,
        gregory_quad_offset_base: usize,
    ) -> Result<()> {
        if table.is_empty() {
            return Ok(());
        }

        if 0 == ring_size {
            return Err(Error::InvalidPatch(format!(
                "{:?} patches have a ring size of zero",
                descriptor.patch_type()
            )));
        }

        let levels = (0..table.segments_len())
            .flat_map(|segment| {
                let patches_len = table.segment_elements_len(segment) / ring_size;
                std::iter::repeat(segment as u32).take(patches_len)
            })
            .collect::<Vec<u32>>();

        let patches_len = table.len() / ring_size;
        if levels.len() != patches_len || 0 != table.len() % ring_size {
            return Err(Error::InvalidPatch(format!(
                "{} level markers assign {} levels to {} indices of {}-index patches",
                descriptor.patch_type(),
                levels.len(),
                table.len(),
                ring_size
            )));
        }

        write_elements(self.index_region, self.index_base, table.indices())?;
        write_elements(self.level_region, self.level_base, &levels)?;

        let patch_array = PatchArray::new(
            descriptor,
            ring_size,
            self.index_base,
            table.len(),
            self.level_base,
            gregory_quad_offset_base,
        );

        let subpatches_len = descriptor.subpatches_len();
        self.patch_arrays.extend(
            (0..subpatches_len).map(|subpatch| patch_array.with_subpatch(subpatch as u8)),
        );

        log::trace!(
            "{} patch group: indices {}..{}, {} levels from {}, {} sub-patches",
            descriptor.patch_type(),
            self.index_base,
            self.index_base + table.len(),
            levels.len(),
            self.level_base,
            subpatches_len
        );

        self.index_base += table.len();
        self.level_base += levels.len();

        Ok(())
    }

    /// Consumes the builder and returns the recorded patch arrays.
    pub fn finish(self) -> Vec<PatchArray> {
        self.patch_arrays
    }
}

/// Copies `values` into `region` starting at element `offset`.
fn write_elements<T: Pod>(region: &mut [u8], offset: usize, values: &[T]) -> Result<()> {
    let element_size = std::mem::size_of::<T>();
    let bytes: &[u8] = bytemuck::cast_slice(values);
    let start = offset * element_size;
    let max = region.len() / element_size;

    region
        .get_mut(start..start + bytes.len())
        .ok_or(Error::IndexOutOfBounds {
            index: offset + values.len(),
            max,
        })?
        .copy_from_slice(bytes);

    Ok(())
}

/// Packs all categories of `tables` into `index_region` and `level_region`
/// in canonical order.
///
/// *Gregory* descriptors carry the maximum valence of `tables` and
/// `vertex_elements_len`. The boundary *Gregory* group addresses the quad
/// offset table right after the entries of the full *Gregory* group.
pub fn lay_out_patch_tables(
    tables: &PatchTables,
    index_region: &mut [u8],
    level_region: &mut [u8],
    vertex_elements_len: u32,
) -> Result<Vec<PatchArray>> {
    let mut builder = LayoutBuilder::new(index_region, level_region);

    for (category, table) in tables.iter() {
        let mut descriptor = PatchDescriptor::from(category);
        if category.is_gregory() {
            descriptor = descriptor.with_gregory_payload(tables.max_valence(), vertex_elements_len);
        }

        let gregory_quad_offset_base = match category {
            PatchCategory::FullBoundaryGregory => tables.table(PatchCategory::FullGregory).len(),
            _ => 0,
        };

        builder.append_group(
            table,
            tables.ring_size(category),
            descriptor,
            gregory_quad_offset_base,
        )?;
    }

    Ok(builder.finish())
}

/// A layout packed into host memory.
///
/// Produces exactly the bytes a draw context uploads, without going through
/// a [`ResourceProvider`](super::ResourceProvider).
///
/// # Examples
///
/// ```
/// use opensubdiv_petite_draw::far::{PatchCategory, PatchTable, PatchTables};
/// use opensubdiv_petite_draw::osd::PatchLayout;
///
/// let tables = PatchTables::new().with_table(
///     PatchCategory::TransitionRegular { pattern: 4 },
///     PatchTable::from_levels([(0..16).collect::<Vec<u32>>()]),
/// );
///
/// let layout = PatchLayout::new(&tables, 0)?;
///
/// // Pattern 4 is drawn as two sub-patches.
/// assert_eq!(layout.patch_arrays().len(), 2);
/// assert_eq!(layout.levels(), &[0]);
/// # Ok::<(), opensubdiv_petite_draw::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchLayout {
    indices: Vec<u32>,
    levels: Vec<u32>,
    patch_arrays: Vec<PatchArray>,
}

impl PatchLayout {
    pub fn new(tables: &PatchTables, vertex_elements_len: u32) -> Result<Self> {
        let totals = LayoutTotals::accumulate(tables);
        let mut indices = vec![0u32; totals.indices_len];
        let mut levels = vec![0u32; totals.levels_len];

        let patch_arrays = lay_out_patch_tables(
            tables,
            bytemuck::cast_slice_mut(&mut indices),
            bytemuck::cast_slice_mut(&mut levels),
            vertex_elements_len,
        )?;

        Ok(Self {
            indices,
            levels,
            patch_arrays,
        })
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[inline]
    pub fn levels(&self) -> &[u32] {
        &self.levels
    }

    #[inline]
    pub fn patch_arrays(&self) -> &[PatchArray] {
        &self.patch_arrays
    }
}

/// Concatenates the ptex coordinates of every non-empty category in
/// canonical order, one pair per patch.
pub fn gather_ptex_coordinates(tables: &PatchTables) -> Result<Vec<[u32; 2]>> {
    gather_per_patch(tables, 1, PatchTable::ptex_coordinates)
}

/// Concatenates the face-varying data of every non-empty category in
/// canonical order, `fvar_width` values per patch corner.
pub fn gather_fvar_data(tables: &PatchTables, fvar_width: usize) -> Result<Vec<f32>> {
    gather_per_patch(
        tables,
        fvar_width * FVAR_VALUES_PER_PATCH,
        PatchTable::fvar_data,
    )
}

fn gather_per_patch<T: Copy>(
    tables: &PatchTables,
    values_per_patch: usize,
    values: impl Fn(&PatchTable) -> &[T],
) -> Result<Vec<T>> {
    let mut gathered = Vec::new();

    for (category, table) in tables.iter().filter(|(_, table)| !table.is_empty()) {
        let patches_len = table
            .len()
            .checked_div(tables.ring_size(category))
            .unwrap_or(0);
        let data = values(table);

        if data.len() != patches_len * values_per_patch {
            return Err(Error::InvalidBufferSize {
                expected: patches_len * values_per_patch,
                actual: data.len(),
            });
        }

        gathered.extend_from_slice(data);
    }

    Ok(gathered)
}
