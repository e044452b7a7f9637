//! # Resource Provider
//!
//! The draw context does not create device resources itself. It asks a
//! [`ResourceProvider`] for buffers and views and for writable regions of
//! those buffers.
//!
//! A writable region is only ever held through a [`MappedRegion`], which
//! hands it back to the provider when it goes out of scope, whichever way
//! that happens.

/// How a buffer is going to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum Usage {
    /// Filled once at creation from initial data, never mapped.
    Static,
    /// Created empty, filled by the host through
    /// [`map_for_write()`](ResourceProvider::map_for_write).
    DynamicWritable,
}

/// Which pipeline stage a buffer is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum Binding {
    /// Bound as an index buffer.
    Index,
    /// Read by shaders through a view.
    ShaderResource,
}

/// Element format of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ElementFormat {
    /// One signed 32 bit integer.
    R32Sint,
    /// One 32 bit float.
    R32Float,
    /// Two unsigned 32 bit integers.
    Rg32Uint,
}

impl ElementFormat {
    /// Returns the size of one element in bytes.
    #[inline]
    pub fn byte_size(self) -> usize {
        match self {
            ElementFormat::R32Sint | ElementFormat::R32Float => 4,
            ElementFormat::Rg32Uint => 8,
        }
    }
}

/// Describes a buffer to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferInfo {
    /// Debug label.
    pub label: &'static str,
    pub byte_size: usize,
    pub usage: Usage,
    pub binding: Binding,
}

/// Creates and fills device buffers on behalf of a draw context.
///
/// Handles are owned: dropping a [`Buffer`](ResourceProvider::Buffer) or
/// [`View`](ResourceProvider::View) releases it. Every method takes `&self`
/// so that several regions can be mapped at the same time; implementations
/// use interior mutability where they need it.
pub trait ResourceProvider {
    type Buffer;
    type View;
    /// A writable region of a buffer. Writes become visible to readers once
    /// the region is handed back through [`unmap()`](ResourceProvider::unmap).
    type Mapping: AsMut<[u8]>;

    /// Creates a buffer, optionally filled with `initial_data`.
    ///
    /// Must fail with [`Error::AllocationFailed`](crate::Error::AllocationFailed)
    /// if the buffer can not be created.
    fn create_buffer(
        &self,
        info: &BufferInfo,
        initial_data: Option<&[u8]>,
    ) -> crate::Result<Self::Buffer>;

    /// Creates a view of the first `elements_len` elements of `buffer`.
    ///
    /// Must fail with [`Error::AllocationFailed`](crate::Error::AllocationFailed)
    /// if the view can not be created.
    fn create_view(
        &self,
        buffer: &Self::Buffer,
        format: ElementFormat,
        elements_len: usize,
    ) -> crate::Result<Self::View>;

    /// Acquires exclusive write access to the whole of `buffer`.
    ///
    /// Must fail with [`Error::MapFailed`](crate::Error::MapFailed) if no
    /// writable region can be obtained.
    fn map_for_write(&self, buffer: &Self::Buffer) -> crate::Result<Self::Mapping>;

    /// Releases a region obtained from
    /// [`map_for_write()`](ResourceProvider::map_for_write).
    fn unmap(&self, buffer: &Self::Buffer, mapping: Self::Mapping);
}

/// A writable region of a buffer that is unmapped when dropped.
pub struct MappedRegion<'a, P: ResourceProvider + ?Sized> {
    provider: &'a P,
    buffer: &'a P::Buffer,
    mapping: Option<P::Mapping>,
}

impl<'a, P: ResourceProvider + ?Sized> MappedRegion<'a, P> {
    /// Maps `buffer` for writing.
    pub fn map(provider: &'a P, buffer: &'a P::Buffer) -> crate::Result<Self> {
        let mapping = provider.map_for_write(buffer)?;

        Ok(Self {
            provider,
            buffer,
            mapping: Some(mapping),
        })
    }

    /// Returns the bytes of the region.
    #[inline]
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        match self.mapping.as_mut() {
            Some(mapping) => mapping.as_mut(),
            None => &mut [],
        }
    }
}

impl<P: ResourceProvider + ?Sized> Drop for MappedRegion<'_, P> {
    fn drop(&mut self) {
        if let Some(mapping) = self.mapping.take() {
            self.provider.unmap(self.buffer, mapping);
        }
    }
}
