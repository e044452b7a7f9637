//! # Draw Context
//!
//! A [`DrawContext`] owns everything a renderer needs to draw one refined
//! mesh: the ordered [`PatchArray`]s and the device buffers they address.
//!
//! It is built in one go by [`DrawContext::new()`] and never changes
//! afterwards. If any step of the build fails, everything allocated so far
//! is dropped and the error is returned; there is no partially built
//! context.
use std::fmt;

use super::layout::{gather_fvar_data, gather_ptex_coordinates, lay_out_patch_tables};
use super::{
    Binding, BufferInfo, ElementFormat, LayoutTotals, MappedRegion, PatchArray, PatchDescriptor,
    PatchType, ResourceProvider, Usage,
};
use crate::far::{Mesh, PatchTables};
use crate::Result;

const INDEX_BYTE_SIZE: usize = std::mem::size_of::<u32>();

/// Options for building a [`DrawContext`].
///
/// # Examples
///
/// ```
/// use opensubdiv_petite_draw::osd::DrawContextOptions;
///
/// let options = DrawContextOptions {
///     vertex_elements_len: 6,
///     require_ptex_coordinates: true,
///     ..Default::default()
/// };
/// assert!(!options.require_fvar_data);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawContextOptions {
    /// Number of float elements per vertex in the vertex buffer. Stored in
    /// *Gregory* descriptors and used to size the vertex buffer view.
    pub vertex_elements_len: u32,
    /// Upload per-patch ptex coordinates.
    pub require_ptex_coordinates: bool,
    /// Upload per-patch face-varying data.
    pub require_fvar_data: bool,
}

struct ViewedBuffer<P: ResourceProvider> {
    buffer: P::Buffer,
    view: P::View,
}

impl<P: ResourceProvider> ViewedBuffer<P> {
    /// Creates a static shader resource buffer holding `data` and a view of
    /// it.
    fn upload(
        provider: &P,
        label: &'static str,
        data: &[u8],
        format: ElementFormat,
        elements_len: usize,
    ) -> Result<Self> {
        let buffer = provider.create_buffer(
            &BufferInfo {
                label,
                byte_size: data.len(),
                usage: Usage::Static,
                binding: Binding::ShaderResource,
            },
            Some(data),
        )?;
        let view = provider.create_view(&buffer, format, elements_len)?;

        Ok(Self { buffer, view })
    }
}

/// Device-ready layout of one refined mesh.
pub struct DrawContext<P: ResourceProvider> {
    patch_arrays: Vec<PatchArray>,
    is_adaptive: bool,
    patch_index_buffer: Option<P::Buffer>,
    patch_level: Option<ViewedBuffer<P>>,
    vertex_valence: Option<ViewedBuffer<P>>,
    vertex_buffer_view: Option<P::View>,
    quad_offset: Option<ViewedBuffer<P>>,
    ptex_coordinate: Option<ViewedBuffer<P>>,
    fvar_data: Option<ViewedBuffer<P>>,
}

impl<P: ResourceProvider> DrawContext<P> {
    /// Build the draw context of `mesh`.
    ///
    /// Meshes with [`PatchTables`] are packed adaptively. Meshes without
    /// are drawn as plain faces of their finest uniformly refined level.
    ///
    /// `vertex_buffer` is the caller's vertex buffer. When given, and the
    /// mesh has *Gregory* patches, a float view of it is created for
    /// *Gregory* evaluation.
    pub fn new(
        provider: &P,
        mesh: &Mesh,
        vertex_buffer: Option<&P::Buffer>,
        options: DrawContextOptions,
    ) -> Result<Self> {
        let context = match mesh.patch_tables() {
            Some(tables) => Self::new_adaptive(provider, mesh, tables, vertex_buffer, options),
            None => Self::new_uniform(provider, mesh),
        };

        context.inspect_err(|error| log::warn!("Draw context build failed: {error}"))
    }

    fn new_uniform(provider: &P, mesh: &Mesh) -> Result<Self> {
        let level = mesh.refinement_levels().saturating_sub(1);
        let indices = mesh.face_vertices(level).unwrap_or_default();

        let patch_index_buffer = provider.create_buffer(
            &BufferInfo {
                label: "patch index buffer",
                byte_size: indices.len() * INDEX_BYTE_SIZE,
                usage: Usage::Static,
                binding: Binding::Index,
            },
            Some(bytemuck::cast_slice(indices)),
        )?;

        let patch_array = PatchArray::new(
            PatchDescriptor::new(PatchType::NonPatch, 0, 0),
            mesh.scheme().face_size(),
            0,
            indices.len(),
            0,
            0,
        );

        log::debug!(
            "Uniform draw context: {} scheme, level {}, {} indices",
            mesh.scheme(),
            level,
            indices.len()
        );

        Ok(Self {
            patch_arrays: vec![patch_array],
            is_adaptive: false,
            patch_index_buffer: Some(patch_index_buffer),
            patch_level: None,
            vertex_valence: None,
            vertex_buffer_view: None,
            quad_offset: None,
            ptex_coordinate: None,
            fvar_data: None,
        })
    }

    fn new_adaptive(
        provider: &P,
        mesh: &Mesh,
        tables: &PatchTables,
        vertex_buffer: Option<&P::Buffer>,
        options: DrawContextOptions,
    ) -> Result<Self> {
        #[cfg(feature = "topology_validation")]
        tables.validate()?;

        let totals = LayoutTotals::accumulate(tables);

        // Reject mismatched per-patch tables before anything is allocated.
        let ptex_coordinates = if options.require_ptex_coordinates {
            gather_ptex_coordinates(tables)?
        } else {
            Vec::new()
        };
        let fvar_data = if options.require_fvar_data {
            gather_fvar_data(tables, mesh.total_fvar_width())?
        } else {
            Vec::new()
        };

        let (patch_arrays, patch_index_buffer, patch_level) = if totals.is_empty() {
            (Vec::new(), None, None)
        } else {
            let patch_index_buffer = provider.create_buffer(
                &BufferInfo {
                    label: "patch index buffer",
                    byte_size: totals.indices_len * INDEX_BYTE_SIZE,
                    usage: Usage::DynamicWritable,
                    binding: Binding::Index,
                },
                None,
            )?;
            let mut index_region = MappedRegion::map(provider, &patch_index_buffer)?;

            let level_buffer = provider.create_buffer(
                &BufferInfo {
                    label: "patch level buffer",
                    byte_size: totals.levels_len * INDEX_BYTE_SIZE,
                    usage: Usage::DynamicWritable,
                    binding: Binding::ShaderResource,
                },
                None,
            )?;
            let level_view =
                provider.create_view(&level_buffer, ElementFormat::R32Sint, totals.levels_len)?;
            let mut level_region = MappedRegion::map(provider, &level_buffer)?;

            let patch_arrays = lay_out_patch_tables(
                tables,
                index_region.bytes_mut(),
                level_region.bytes_mut(),
                options.vertex_elements_len,
            )?;

            drop(level_region);
            drop(index_region);

            (
                patch_arrays,
                Some(patch_index_buffer),
                Some(ViewedBuffer {
                    buffer: level_buffer,
                    view: level_view,
                }),
            )
        };

        let vertex_valence = match tables.vertex_valence_table() {
            [] => None,
            valences => Some(ViewedBuffer::upload(
                provider,
                "vertex valence buffer",
                bytemuck::cast_slice(valences),
                ElementFormat::R32Sint,
                valences.len(),
            )?),
        };

        let vertex_buffer_view = match (&vertex_valence, vertex_buffer) {
            (Some(_), Some(vertex_buffer)) => Some(provider.create_view(
                vertex_buffer,
                ElementFormat::R32Float,
                options.vertex_elements_len as usize * mesh.vertices_len(),
            )?),
            _ => None,
        };

        let quad_offset = match tables.quad_offset_table() {
            [] => None,
            offsets => Some(ViewedBuffer::upload(
                provider,
                "quad offset buffer",
                bytemuck::cast_slice(offsets),
                ElementFormat::R32Sint,
                offsets.len(),
            )?),
        };

        let ptex_coordinate = match ptex_coordinates.as_slice() {
            [] => None,
            coordinates => Some(ViewedBuffer::upload(
                provider,
                "ptex coordinate buffer",
                bytemuck::cast_slice(coordinates),
                ElementFormat::Rg32Uint,
                coordinates.len(),
            )?),
        };

        let fvar_data = match fvar_data.as_slice() {
            [] => None,
            values => Some(ViewedBuffer::upload(
                provider,
                "face-varying data buffer",
                bytemuck::cast_slice(values),
                ElementFormat::R32Float,
                values.len(),
            )?),
        };

        log::debug!(
            "Adaptive draw context: {} indices, {} levels, {} patch arrays",
            totals.indices_len,
            totals.levels_len,
            patch_arrays.len()
        );

        Ok(Self {
            patch_arrays,
            is_adaptive: true,
            patch_index_buffer,
            patch_level,
            vertex_valence,
            vertex_buffer_view,
            quad_offset,
            ptex_coordinate,
            fvar_data,
        })
    }

    /// Returns the patch arrays in draw order.
    #[inline]
    pub fn patch_arrays(&self) -> &[PatchArray] {
        &self.patch_arrays
    }

    /// Returns `true` if the context was built from patch tables.
    #[inline]
    pub fn is_adaptive(&self) -> bool {
        self.is_adaptive
    }

    /// The flat patch index buffer.
    ///
    /// `None` for an adaptive mesh without any patches.
    #[inline]
    pub fn patch_index_buffer(&self) -> Option<&P::Buffer> {
        self.patch_index_buffer.as_ref()
    }

    /// The per-patch level buffer. Adaptive contexts only.
    #[inline]
    pub fn patch_level_buffer(&self) -> Option<&P::Buffer> {
        self.patch_level.as_ref().map(|level| &level.buffer)
    }

    #[inline]
    pub fn patch_level_view(&self) -> Option<&P::View> {
        self.patch_level.as_ref().map(|level| &level.view)
    }

    /// Present if the mesh has a non-empty vertex valence table.
    #[inline]
    pub fn vertex_valence_buffer(&self) -> Option<&P::Buffer> {
        self.vertex_valence.as_ref().map(|valence| &valence.buffer)
    }

    #[inline]
    pub fn vertex_valence_view(&self) -> Option<&P::View> {
        self.vertex_valence.as_ref().map(|valence| &valence.view)
    }

    /// Float view of the caller's vertex buffer used by *Gregory* patches.
    #[inline]
    pub fn vertex_buffer_view(&self) -> Option<&P::View> {
        self.vertex_buffer_view.as_ref()
    }

    /// Present if the mesh has a non-empty quad offset table.
    #[inline]
    pub fn quad_offset_buffer(&self) -> Option<&P::Buffer> {
        self.quad_offset.as_ref().map(|quad_offset| &quad_offset.buffer)
    }

    #[inline]
    pub fn quad_offset_view(&self) -> Option<&P::View> {
        self.quad_offset.as_ref().map(|quad_offset| &quad_offset.view)
    }

    #[inline]
    pub fn ptex_coordinate_buffer(&self) -> Option<&P::Buffer> {
        self.ptex_coordinate.as_ref().map(|ptex| &ptex.buffer)
    }

    #[inline]
    pub fn ptex_coordinate_view(&self) -> Option<&P::View> {
        self.ptex_coordinate.as_ref().map(|ptex| &ptex.view)
    }

    #[inline]
    pub fn fvar_data_buffer(&self) -> Option<&P::Buffer> {
        self.fvar_data.as_ref().map(|fvar| &fvar.buffer)
    }

    #[inline]
    pub fn fvar_data_view(&self) -> Option<&P::View> {
        self.fvar_data.as_ref().map(|fvar| &fvar.view)
    }
}

impl<P: ResourceProvider> fmt::Debug for DrawContext<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawContext")
            .field("patch_arrays", &self.patch_arrays)
            .field("is_adaptive", &self.is_adaptive)
            .field("patch_index_buffer", &self.patch_index_buffer.is_some())
            .field("patch_level", &self.patch_level.is_some())
            .field("vertex_valence", &self.vertex_valence.is_some())
            .field("vertex_buffer_view", &self.vertex_buffer_view.is_some())
            .field("quad_offset", &self.quad_offset.is_some())
            .field("ptex_coordinate", &self.ptex_coordinate.is_some())
            .field("fvar_data", &self.fvar_data.is_some())
            .finish()
    }
}
