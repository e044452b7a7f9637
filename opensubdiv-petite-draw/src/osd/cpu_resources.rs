//! Host memory [`ResourceProvider`].
//!
//! [`CpuResourceProvider`] keeps every buffer in a plain byte vector. It is
//! useful for evaluating patches on the CPU, for reading back what a draw
//! context produced and for testing.
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use bytemuck::Pod;

use super::{BufferInfo, ElementFormat, ResourceProvider, Usage};
use crate::{Error, Result};

/// A [`ResourceProvider`] backed by host memory.
///
/// An optional byte budget limits how much memory all live buffers may
/// occupy together. Creating a buffer beyond the budget fails with
/// [`Error::AllocationFailed`]. Dropping a buffer returns its bytes to the
/// budget.
#[derive(Debug, Default)]
pub struct CpuResourceProvider {
    budget: Option<usize>,
    allocated: Arc<AtomicUsize>,
}

impl CpuResourceProvider {
    /// Create a provider without a byte budget.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider that refuses to hold more than `budget` bytes.
    pub fn with_budget(budget: usize) -> Self {
        Self {
            budget: Some(budget),
            ..Default::default()
        }
    }

    /// Returns the number of bytes held by live buffers.
    #[inline]
    pub fn allocated_bytes(&self) -> usize {
        self.allocated.load(Ordering::Acquire)
    }

    fn reserve(&self, info: &BufferInfo) -> Result<()> {
        let mut current = self.allocated.load(Ordering::Acquire);
        loop {
            let requested = current.checked_add(info.byte_size).ok_or_else(|| {
                Error::AllocationFailed {
                    label: info.label,
                    reason: format!("{} bytes overflow the address space", info.byte_size),
                }
            })?;

            if let Some(budget) = self.budget {
                if requested > budget {
                    return Err(Error::AllocationFailed {
                        label: info.label,
                        reason: format!(
                            "{} bytes exceed the remaining budget of {} bytes",
                            info.byte_size,
                            budget.saturating_sub(current)
                        ),
                    });
                }
            }

            match self.allocated.compare_exchange_weak(
                current,
                requested,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }
}

#[derive(Debug)]
struct CpuStorage {
    data: RwLock<Vec<u8>>,
    mapped: AtomicBool,
    byte_size: usize,
    allocated: Arc<AtomicUsize>,
}

impl Drop for CpuStorage {
    fn drop(&mut self) {
        self.allocated.fetch_sub(self.byte_size, Ordering::AcqRel);
    }
}

/// A buffer created by a [`CpuResourceProvider`].
///
/// Clones share the same storage.
#[derive(Debug, Clone)]
pub struct CpuBuffer {
    info: BufferInfo,
    storage: Arc<CpuStorage>,
}

impl CpuBuffer {
    #[inline]
    pub fn info(&self) -> &BufferInfo {
        &self.info
    }

    #[inline]
    pub fn byte_size(&self) -> usize {
        self.storage.byte_size
    }

    /// Returns `true` while a writable region of the buffer is outstanding.
    #[inline]
    pub fn is_mapped(&self) -> bool {
        self.storage.mapped.load(Ordering::Acquire)
    }

    /// Returns a copy of the buffer contents.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self.storage.data.read() {
            Ok(data) => data.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Returns a copy of the buffer contents as elements of type `T`.
    ///
    /// Trailing bytes that do not fill a whole element are ignored.
    pub fn to_vec<T: Pod>(&self) -> Vec<T> {
        self.to_bytes()
            .chunks_exact(std::mem::size_of::<T>().max(1))
            .map(bytemuck::pod_read_unaligned)
            .collect()
    }
}

/// A typed view of a [`CpuBuffer`].
#[derive(Debug, Clone)]
pub struct CpuView {
    buffer: CpuBuffer,
    format: ElementFormat,
    elements_len: usize,
}

impl CpuView {
    #[inline]
    pub fn buffer(&self) -> &CpuBuffer {
        &self.buffer
    }

    #[inline]
    pub fn format(&self) -> ElementFormat {
        self.format
    }

    #[inline]
    pub fn elements_len(&self) -> usize {
        self.elements_len
    }
}

/// Staging memory handed out by
/// [`CpuResourceProvider::map_for_write()`]. Its contents replace the
/// buffer's on unmap.
#[derive(Debug)]
pub struct CpuMapping(Vec<u8>);

impl AsMut<[u8]> for CpuMapping {
    #[inline]
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl ResourceProvider for CpuResourceProvider {
    type Buffer = CpuBuffer;
    type View = CpuView;
    type Mapping = CpuMapping;

    fn create_buffer(&self, info: &BufferInfo, initial_data: Option<&[u8]>) -> Result<CpuBuffer> {
        let data = match initial_data {
            Some(data) if data.len() != info.byte_size => {
                return Err(Error::InvalidBufferSize {
                    expected: info.byte_size,
                    actual: data.len(),
                });
            }
            Some(data) => data.to_vec(),
            None => vec![0; info.byte_size],
        };

        self.reserve(info)?;

        Ok(CpuBuffer {
            info: *info,
            storage: Arc::new(CpuStorage {
                data: RwLock::new(data),
                mapped: AtomicBool::new(false),
                byte_size: info.byte_size,
                allocated: self.allocated.clone(),
            }),
        })
    }

    fn create_view(
        &self,
        buffer: &CpuBuffer,
        format: ElementFormat,
        elements_len: usize,
    ) -> Result<CpuView> {
        let byte_size = elements_len
            .checked_mul(format.byte_size())
            .unwrap_or(usize::MAX);

        if byte_size > buffer.byte_size() {
            return Err(Error::AllocationFailed {
                label: buffer.info.label,
                reason: format!(
                    "view of {} {} elements exceeds the {} byte buffer",
                    elements_len,
                    format,
                    buffer.byte_size()
                ),
            });
        }

        Ok(CpuView {
            buffer: buffer.clone(),
            format,
            elements_len,
        })
    }

    fn map_for_write(&self, buffer: &CpuBuffer) -> Result<CpuMapping> {
        if Usage::Static == buffer.info.usage {
            return Err(Error::MapFailed {
                label: buffer.info.label,
                reason: "static buffers can not be mapped".into(),
            });
        }

        if buffer.storage.mapped.swap(true, Ordering::AcqRel) {
            return Err(Error::MapFailed {
                label: buffer.info.label,
                reason: "buffer is already mapped".into(),
            });
        }

        Ok(CpuMapping(vec![0; buffer.byte_size()]))
    }

    fn unmap(&self, buffer: &CpuBuffer, mapping: CpuMapping) {
        match buffer.storage.data.write() {
            Ok(mut data) => *data = mapping.0,
            Err(poisoned) => *poisoned.into_inner() = mapping.0,
        }
        buffer.storage.mapped.store(false, Ordering::Release);
    }
}
