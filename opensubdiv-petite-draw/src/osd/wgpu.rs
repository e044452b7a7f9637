//! `wgpu` [`ResourceProvider`].
//!
//! Index buffers are created with `INDEX` usage, everything else as storage
//! buffers. *WebGPU* has no typed buffer views; a [`WgpuBufferView`] records
//! the element format and count the shaders are expected to bind the buffer
//! with.
//!
//! *WebGPU* does not allow mapping a buffer that the GPU may be using, so a
//! writable region is host staging memory that is uploaded through
//! [`wgpu::Queue::write_buffer()`] on unmap.
//!
//! Buffer creation errors are reported by the device asynchronously. They
//! are captured with error scopes and turned into
//! [`Error::AllocationFailed`] instead of reaching the uncaptured error
//! handler.
use wgpu::util::DeviceExt;

use super::{Binding, BufferInfo, ElementFormat, ResourceProvider};
use crate::{Error, Result};

/// A [`ResourceProvider`] creating buffers on a `wgpu` device.
#[derive(Debug, Clone, Copy)]
pub struct WgpuResourceProvider<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
}

impl<'a> WgpuResourceProvider<'a> {
    pub fn new(device: &'a wgpu::Device, queue: &'a wgpu::Queue) -> Self {
        Self { device, queue }
    }
}

/// A `wgpu` buffer and the label it was created with.
///
/// Dereferences to the [`wgpu::Buffer`].
#[derive(Debug, Clone, derive_more::Deref)]
pub struct WgpuBuffer {
    #[deref]
    pub buffer: wgpu::Buffer,
    pub label: &'static str,
}

impl WgpuBuffer {
    /// Wrap a buffer created elsewhere, e.g. the caller's vertex buffer.
    pub fn new(buffer: wgpu::Buffer, label: &'static str) -> Self {
        Self { buffer, label }
    }
}

/// A `wgpu` buffer together with how shaders read it.
#[derive(Debug, Clone)]
pub struct WgpuBufferView {
    pub buffer: WgpuBuffer,
    pub format: ElementFormat,
    pub elements_len: usize,
}

impl WgpuBufferView {
    /// Binding resource covering the viewed elements.
    pub fn as_binding(&self) -> wgpu::BindingResource<'_> {
        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer: &self.buffer.buffer,
            offset: 0,
            size: wgpu::BufferSize::new((self.elements_len * self.format.byte_size()) as u64),
        })
    }
}

/// Host staging memory for a [`wgpu::Buffer`].
#[derive(Debug)]
pub struct WgpuStaging(Vec<u8>);

impl AsMut<[u8]> for WgpuStaging {
    #[inline]
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

fn buffer_usages(binding: Binding) -> wgpu::BufferUsages {
    match binding {
        Binding::Index => wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        Binding::ShaderResource => wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
    }
}

impl ResourceProvider for WgpuResourceProvider<'_> {
    type Buffer = WgpuBuffer;
    type View = WgpuBufferView;
    type Mapping = WgpuStaging;

    fn create_buffer(
        &self,
        info: &BufferInfo,
        initial_data: Option<&[u8]>,
    ) -> Result<WgpuBuffer> {
        let max_buffer_size = self.device.limits().max_buffer_size;
        if info.byte_size as u64 > max_buffer_size {
            return Err(Error::AllocationFailed {
                label: info.label,
                reason: format!(
                    "{} bytes exceed the device limit of {} bytes",
                    info.byte_size, max_buffer_size
                ),
            });
        }

        if 0 != info.byte_size as u64 % wgpu::COPY_BUFFER_ALIGNMENT {
            return Err(Error::AllocationFailed {
                label: info.label,
                reason: format!(
                    "{} bytes is not a multiple of {}",
                    info.byte_size,
                    wgpu::COPY_BUFFER_ALIGNMENT
                ),
            });
        }

        if let Some(contents) = initial_data {
            if contents.len() != info.byte_size {
                return Err(Error::InvalidBufferSize {
                    expected: info.byte_size,
                    actual: contents.len(),
                });
            }
        }

        let usage = buffer_usages(info.binding);

        let out_of_memory_scope = self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let validation_scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let buffer = match initial_data {
            Some(contents) => self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(info.label),
                    contents,
                    usage,
                }),
            None => self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(info.label),
                size: info.byte_size as u64,
                usage,
                mapped_at_creation: false,
            }),
        };

        // Pop both scopes before looking at either error.
        let validation_error = pollster::block_on(validation_scope.pop());
        let out_of_memory_error = pollster::block_on(out_of_memory_scope.pop());

        match out_of_memory_error.or(validation_error) {
            Some(error) => Err(Error::AllocationFailed {
                label: info.label,
                reason: error.to_string(),
            }),
            None => Ok(WgpuBuffer::new(buffer, info.label)),
        }
    }

    fn create_view(
        &self,
        buffer: &WgpuBuffer,
        format: ElementFormat,
        elements_len: usize,
    ) -> Result<WgpuBufferView> {
        let byte_size = (elements_len as u64).saturating_mul(format.byte_size() as u64);
        if byte_size > buffer.size() {
            return Err(Error::AllocationFailed {
                label: buffer.label,
                reason: format!(
                    "view of {} {} elements exceeds the {} byte buffer",
                    elements_len,
                    format,
                    buffer.size()
                ),
            });
        }

        Ok(WgpuBufferView {
            buffer: buffer.clone(),
            format,
            elements_len,
        })
    }

    fn map_for_write(&self, buffer: &WgpuBuffer) -> Result<WgpuStaging> {
        if !buffer.usage().contains(wgpu::BufferUsages::COPY_DST) {
            return Err(Error::MapFailed {
                label: buffer.label,
                reason: "buffer was created without COPY_DST usage".into(),
            });
        }

        Ok(WgpuStaging(vec![0; buffer.size() as usize]))
    }

    fn unmap(&self, buffer: &WgpuBuffer, mapping: WgpuStaging) {
        if !mapping.0.is_empty() {
            self.queue.write_buffer(&buffer.buffer, 0, &mapping.0);
        }
    }
}
