//! Tests for building draw contexts on the host memory provider.


use std::cell::Cell;

use opensubdiv_petite_draw::far::{Mesh, PatchCategory, PatchTable, PatchTables, Scheme};
use opensubdiv_petite_draw::osd::{
    Binding, BufferInfo, CpuBuffer, CpuResourceProvider, DrawContext, DrawContextOptions,
    ElementFormat, PatchLayout, PatchType, ResourceProvider, Usage,
};
use opensubdiv_petite_draw::{Error, Index, Result};
use test_utils::{mixed_patch_tables, patch_table};

#[test]
fn test_uniform_catmull_clark() -> anyhow::Result<()> {
    let mesh = Mesh::uniform(
        Scheme::CatmullClark,
        9,
        vec![
            vec![0, 1, 2, 3],
            vec![0, 4, 8, 7, 4, 1, 5, 8, 8, 5, 2, 6, 7, 8, 6, 3],
        ],
    );

    let provider = CpuResourceProvider::new();
    let context = DrawContext::new(&provider, &mesh, None, DrawContextOptions::default())?;

    assert!(!context.is_adaptive());
    assert_eq!(context.patch_arrays().len(), 1);

    let array = &context.patch_arrays()[0];
    assert_eq!(array.descriptor().patch_type(), PatchType::NonPatch);
    assert_eq!(array.patch_size(), 4);
    assert_eq!(array.first_index(), 0);
    assert_eq!(array.indices_len(), 16);
    assert_eq!(array.level_base(), 0);

    // The finest level is drawn.
    let index_buffer = context.patch_index_buffer().expect("index buffer");
    assert_eq!(
        index_buffer.to_vec::<u32>(),
        vec![0, 4, 8, 7, 4, 1, 5, 8, 8, 5, 2, 6, 7, 8, 6, 3]
    );
    assert_eq!(index_buffer.info().usage, Usage::Static);
    assert_eq!(index_buffer.info().binding, Binding::Index);

    assert!(context.patch_level_buffer().is_none());
    assert!(context.vertex_valence_buffer().is_none());
    assert!(context.quad_offset_buffer().is_none());
    assert!(context.ptex_coordinate_buffer().is_none());
    assert!(context.fvar_data_buffer().is_none());

    Ok(())
}

#[test]
fn test_uniform_loop() -> anyhow::Result<()> {
    let mesh = Mesh::uniform(Scheme::Loop, 3, vec![vec![0, 1, 2]]);

    let provider = CpuResourceProvider::new();
    let context = DrawContext::new(&provider, &mesh, None, DrawContextOptions::default())?;

    assert_eq!(context.patch_arrays().len(), 1);
    assert_eq!(context.patch_arrays()[0].patch_size(), 3);
    assert_eq!(context.patch_arrays()[0].patches_len(), 1);

    Ok(())
}

#[test]
fn test_uniform_without_levels() -> anyhow::Result<()> {
    let mesh = Mesh::uniform(Scheme::Bilinear, 0, Vec::<Vec<u32>>::new());

    let provider = CpuResourceProvider::new();
    let context = DrawContext::new(&provider, &mesh, None, DrawContextOptions::default())?;

    assert_eq!(context.patch_arrays().len(), 1);
    assert_eq!(context.patch_arrays()[0].indices_len(), 0);
    assert_eq!(
        context.patch_index_buffer().map(CpuBuffer::byte_size),
        Some(0)
    );

    Ok(())
}

#[test]
fn test_adaptive_matches_host_layout() -> anyhow::Result<()> {
    let tables = mixed_patch_tables();
    let mesh = Mesh::adaptive(Scheme::CatmullClark, 20, tables.clone());
    let options = DrawContextOptions {
        vertex_elements_len: 3,
        ..Default::default()
    };

    let provider = CpuResourceProvider::new();
    let context = DrawContext::new(&provider, &mesh, None, options)?;
    let layout = PatchLayout::new(&tables, 3)?;

    assert!(context.is_adaptive());
    assert_eq!(context.patch_arrays(), layout.patch_arrays());
    assert_eq!(context.patch_arrays().len(), 17);

    let index_buffer = context.patch_index_buffer().expect("index buffer");
    assert_eq!(index_buffer.to_vec::<u32>(), layout.indices());
    assert_eq!(index_buffer.byte_size(), 134 * 4);
    assert_eq!(index_buffer.info().usage, Usage::DynamicWritable);
    assert_eq!(index_buffer.info().binding, Binding::Index);
    assert!(!index_buffer.is_mapped());

    let level_buffer = context.patch_level_buffer().expect("level buffer");
    assert_eq!(level_buffer.to_vec::<u32>(), layout.levels());
    assert_eq!(level_buffer.info().binding, Binding::ShaderResource);
    assert!(!level_buffer.is_mapped());

    let level_view = context.patch_level_view().expect("level view");
    assert_eq!(level_view.format(), ElementFormat::R32Sint);
    assert_eq!(level_view.elements_len(), 12);

    let valence_view = context.vertex_valence_view().expect("valence view");
    assert_eq!(valence_view.format(), ElementFormat::R32Sint);
    assert_eq!(
        valence_view.buffer().to_vec::<i32>(),
        tables.vertex_valence_table()
    );
    assert_eq!(
        context.vertex_valence_buffer().map(|buffer| buffer.info().usage),
        Some(Usage::Static)
    );

    let quad_offset_view = context.quad_offset_view().expect("quad offset view");
    assert_eq!(quad_offset_view.format(), ElementFormat::R32Sint);
    assert_eq!(quad_offset_view.elements_len(), 12);
    assert_eq!(
        quad_offset_view.buffer().to_vec::<u32>(),
        tables.quad_offset_table()
    );

    // Not requested.
    assert!(context.ptex_coordinate_buffer().is_none());
    assert!(context.fvar_data_buffer().is_none());
    // No vertex buffer given.
    assert!(context.vertex_buffer_view().is_none());

    Ok(())
}

#[test]
fn test_adaptive_without_patches() -> anyhow::Result<()> {
    let mesh = Mesh::adaptive(Scheme::CatmullClark, 4, PatchTables::new());

    let provider = CpuResourceProvider::new();
    let context = DrawContext::new(&provider, &mesh, None, DrawContextOptions::default())?;

    assert!(context.is_adaptive());
    assert!(context.patch_arrays().is_empty());
    assert!(context.patch_index_buffer().is_none());
    assert!(context.patch_level_buffer().is_none());
    assert!(context.vertex_valence_buffer().is_none());
    assert!(context.quad_offset_buffer().is_none());
    assert_eq!(provider.allocated_bytes(), 0);

    Ok(())
}

#[test]
fn test_vertex_buffer_view() -> anyhow::Result<()> {
    let provider = CpuResourceProvider::new();
    let vertex_buffer = provider.create_buffer(
        &BufferInfo {
            label: "vertex buffer",
            byte_size: 20 * 6 * 4,
            usage: Usage::DynamicWritable,
            binding: Binding::ShaderResource,
        },
        None,
    )?;

    let mesh = Mesh::adaptive(Scheme::CatmullClark, 20, mixed_patch_tables());
    let options = DrawContextOptions {
        vertex_elements_len: 6,
        ..Default::default()
    };
    let context = DrawContext::new(&provider, &mesh, Some(&vertex_buffer), options)?;

    let view = context.vertex_buffer_view().expect("vertex buffer view");
    assert_eq!(view.format(), ElementFormat::R32Float);
    assert_eq!(view.elements_len(), 120);

    for array in context.patch_arrays() {
        let descriptor = array.descriptor();
        if matches!(
            descriptor.patch_type(),
            PatchType::Gregory | PatchType::BoundaryGregory
        ) {
            assert_eq!(descriptor.max_valence(), 5);
            assert_eq!(descriptor.elements_len(), 6);
        }
    }

    // Too few vertices in the caller's buffer.
    let mesh = Mesh::adaptive(Scheme::CatmullClark, 21, mixed_patch_tables());
    assert!(matches!(
        DrawContext::new(&provider, &mesh, Some(&vertex_buffer), options),
        Err(Error::AllocationFailed { .. })
    ));

    // Without a valence table there is nothing to view the vertices for.
    let tables = PatchTables::new().with_table(
        PatchCategory::FullRegular,
        patch_table(0, 16, &[1]),
    );
    let mesh = Mesh::adaptive(Scheme::CatmullClark, 20, tables);
    let context = DrawContext::new(&provider, &mesh, Some(&vertex_buffer), options)?;
    assert!(context.vertex_buffer_view().is_none());

    Ok(())
}

#[test]
fn test_ptex_and_fvar_data() -> anyhow::Result<()> {
    let mesh = Mesh::adaptive(Scheme::CatmullClark, 20, mixed_patch_tables()).with_fvar_width(1);
    let options = DrawContextOptions {
        require_ptex_coordinates: true,
        require_fvar_data: true,
        ..Default::default()
    };

    let provider = CpuResourceProvider::new();
    let context = DrawContext::new(&provider, &mesh, None, options)?;

    let ptex_view = context.ptex_coordinate_view().expect("ptex view");
    assert_eq!(ptex_view.format(), ElementFormat::Rg32Uint);
    assert_eq!(ptex_view.elements_len(), 12);

    let ptex_coordinates = ptex_view.buffer().to_vec::<[u32; 2]>();

    // Each level entry has the ptex coordinate of the same patch, so both
    // buffers are addressed through the level base of a patch array.
    for array in context
        .patch_arrays()
        .iter()
        .filter(|array| 0 == array.descriptor().subpatch())
    {
        let first_vertex = ptex_coordinates[array.level_base()][0];
        for patch in 0..array.patches_len() {
            assert_eq!(
                ptex_coordinates[array.level_base() + patch],
                [first_vertex, patch as u32]
            );
        }
    }

    let fvar_view = context.fvar_data_view().expect("fvar view");
    assert_eq!(fvar_view.format(), ElementFormat::R32Float);
    assert_eq!(fvar_view.elements_len(), 48);
    assert_eq!(fvar_view.buffer().to_vec::<f32>()[4], 1001.0);

    Ok(())
}

#[test]
fn test_mismatched_per_patch_data_allocates_nothing() {
    let tables = mixed_patch_tables().with_table(
        PatchCategory::FullCorner,
        PatchTable::from_levels([(0..9).collect::<Vec<u32>>()]),
    );
    let mesh = Mesh::adaptive(Scheme::CatmullClark, 20, tables).with_fvar_width(1);

    let provider = CountingProvider::new(usize::MAX);

    let result = DrawContext::new(
        &provider,
        &mesh,
        None,
        DrawContextOptions {
            require_ptex_coordinates: true,
            ..Default::default()
        },
    );
    assert!(matches!(result, Err(Error::InvalidBufferSize { .. })));

    let result = DrawContext::new(
        &provider,
        &mesh,
        None,
        DrawContextOptions {
            require_fvar_data: true,
            ..Default::default()
        },
    );
    assert!(matches!(result, Err(Error::InvalidBufferSize { .. })));

    assert_eq!(provider.calls.get(), 0);
}

#[test]
fn test_budget_exceeded() {
    let mesh = Mesh::adaptive(Scheme::CatmullClark, 20, mixed_patch_tables());

    let provider = CpuResourceProvider::with_budget(256);
    let result = DrawContext::new(&provider, &mesh, None, DrawContextOptions::default());

    match result {
        Err(error @ Error::AllocationFailed { label, .. }) => {
            assert!(error.is_resource_failure());
            assert_eq!(label, "patch index buffer");
        }
        other => panic!("expected an allocation failure, got {other:?}"),
    }
    assert_eq!(provider.allocated_bytes(), 0);
}

#[test]
fn test_failure_at_every_step_releases_everything() {
    let mesh = Mesh::adaptive(Scheme::CatmullClark, 20, mixed_patch_tables()).with_fvar_width(1);
    let options = DrawContextOptions {
        vertex_elements_len: 4,
        require_ptex_coordinates: true,
        require_fvar_data: true,
    };

    let vertex_provider = CpuResourceProvider::new();
    let vertex_buffer = vertex_provider
        .create_buffer(
            &BufferInfo {
                label: "vertex buffer",
                byte_size: 20 * 4 * 4,
                usage: Usage::Static,
                binding: Binding::ShaderResource,
            },
            Some(&[0u8; 20 * 4 * 4][..]),
        )
        .expect("vertex buffer");

    // Count the provider calls of a successful build first.
    let provider = CountingProvider::new(usize::MAX);
    let context = DrawContext::new(&provider, &mesh, Some(&vertex_buffer), options);
    assert!(context.is_ok());
    let calls_len = provider.calls.get();
    drop(context);

    // index buffer, map, level buffer, level view, map, valence buffer and
    // view, vertex view, quad offset buffer and view, ptex buffer and view,
    // fvar buffer and view
    assert_eq!(calls_len, 14);
    assert_eq!(provider.cpu.allocated_bytes(), 0);

    for fail_at in 0..calls_len {
        let provider = CountingProvider::new(fail_at);
        let result = DrawContext::new(&provider, &mesh, Some(&vertex_buffer), options);

        assert!(
            matches!(&result, Err(error) if error.is_resource_failure()),
            "call {fail_at} should fail the build"
        );
        // Fail fast.
        assert_eq!(provider.calls.get(), fail_at + 1);
        assert_eq!(provider.unmaps.get(), provider.maps.get());
        assert_eq!(provider.cpu.allocated_bytes(), 0);
    }
}

#[test]
fn test_uniform_index_buffer_failure() {
    let mesh = Mesh::uniform(Scheme::CatmullClark, 4, vec![vec![0, 1, 2, 3]]);

    // The uniform build makes exactly one provider call.
    let provider = CountingProvider::new(usize::MAX);
    assert!(DrawContext::new(&provider, &mesh, None, DrawContextOptions::default()).is_ok());
    assert_eq!(provider.calls.get(), 1);

    let provider = CountingProvider::new(0);
    let result = DrawContext::new(&provider, &mesh, None, DrawContextOptions::default());

    assert!(matches!(
        result,
        Err(Error::AllocationFailed {
            label: "patch index buffer",
            ..
        })
    ));
    assert_eq!(provider.calls.get(), 1);
    assert_eq!(provider.cpu.allocated_bytes(), 0);
}

#[test]
fn test_short_markers_fail_the_build() {
    let tables = mixed_patch_tables().with_table(
        PatchCategory::FullRegular,
        PatchTable::new((0..32).map(Index).collect(), vec![0, 16]),
    );
    let mesh = Mesh::adaptive(Scheme::CatmullClark, 20, tables);

    let provider = CpuResourceProvider::new();
    let result = DrawContext::new(&provider, &mesh, None, DrawContextOptions::default());

    assert!(matches!(result, Err(Error::InvalidPatch(_))));
    assert_eq!(provider.allocated_bytes(), 0);
}

#[cfg(feature = "topology_validation")]
#[test]
fn test_invalid_tables_are_rejected() {
    let tables = mixed_patch_tables().with_table(
        PatchCategory::FullBoundary,
        PatchTable::new(vec![Index(0); 10], vec![0, 10]),
    );
    let mesh = Mesh::adaptive(Scheme::CatmullClark, 20, tables);

    let provider = CountingProvider::new(usize::MAX);
    let result = DrawContext::new(&provider, &mesh, None, DrawContextOptions::default());

    match result {
        Err(error @ Error::InvalidPatch(_)) => assert!(!error.is_resource_failure()),
        other => panic!("expected an invalid patch error, got {other:?}"),
    }
    assert_eq!(provider.calls.get(), 0);
}

/// Wraps a [`CpuResourceProvider`], counts its calls and fails the call with
/// the given ordinal.
struct CountingProvider {
    cpu: CpuResourceProvider,
    fail_at: usize,
    calls: Cell<usize>,
    maps: Cell<usize>,
    unmaps: Cell<usize>,
}

impl CountingProvider {
    fn new(fail_at: usize) -> Self {
        Self {
            cpu: CpuResourceProvider::new(),
            fail_at,
            calls: Cell::new(0),
            maps: Cell::new(0),
            unmaps: Cell::new(0),
        }
    }

    fn count(&self) -> bool {
        let call = self.calls.get();
        self.calls.set(call + 1);
        call == self.fail_at
    }
}

impl ResourceProvider for CountingProvider {
    type Buffer = <CpuResourceProvider as ResourceProvider>::Buffer;
    type View = <CpuResourceProvider as ResourceProvider>::View;
    type Mapping = <CpuResourceProvider as ResourceProvider>::Mapping;

    fn create_buffer(
        &self,
        info: &BufferInfo,
        initial_data: Option<&[u8]>,
    ) -> Result<Self::Buffer> {
        if self.count() {
            return Err(Error::AllocationFailed {
                label: info.label,
                reason: "injected".into(),
            });
        }
        self.cpu.create_buffer(info, initial_data)
    }

    fn create_view(
        &self,
        buffer: &Self::Buffer,
        format: ElementFormat,
        elements_len: usize,
    ) -> Result<Self::View> {
        if self.count() {
            return Err(Error::AllocationFailed {
                label: "view",
                reason: "injected".into(),
            });
        }
        self.cpu.create_view(buffer, format, elements_len)
    }

    fn map_for_write(&self, buffer: &Self::Buffer) -> Result<Self::Mapping> {
        if self.count() {
            return Err(Error::MapFailed {
                label: buffer.info().label,
                reason: "injected".into(),
            });
        }
        let mapping = self.cpu.map_for_write(buffer)?;
        self.maps.set(self.maps.get() + 1);
        Ok(mapping)
    }

    fn unmap(&self, buffer: &Self::Buffer, mapping: Self::Mapping) {
        self.unmaps.set(self.unmaps.get() + 1);
        self.cpu.unmap(buffer, mapping);
    }
}
