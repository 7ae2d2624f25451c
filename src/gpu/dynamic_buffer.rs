//! Growable GPU buffers for per-instance data.
//!
//! Instance data is rewritten wholesale whenever a new frame is applied;
//! the buffer only reallocates when the data outgrows it (2x growth).

use std::marker::PhantomData;

/// A GPU buffer holding a slice of `T`, grown on demand.
///
/// Never shrinks (GPU buffers cannot be resized in place).
pub struct InstanceBuffer<T: bytemuck::Pod> {
    buffer: wgpu::Buffer,
    capacity: usize,
    len: u32,
    label: String,
    _marker: PhantomData<T>,
}

/// Smallest allocation, in elements.
const MIN_CAPACITY: usize = 64;

impl<T: bytemuck::Pod> InstanceBuffer<T> {
    /// Empty buffer with room for [`MIN_CAPACITY`] elements.
    pub fn new(device: &wgpu::Device, label: &str) -> Self {
        Self {
            buffer: Self::allocate(device, label, MIN_CAPACITY),
            capacity: MIN_CAPACITY,
            len: 0,
            label: label.to_owned(),
            _marker: PhantomData,
        }
    }

    fn allocate(
        device: &wgpu::Device,
        label: &str,
        capacity: usize,
    ) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (capacity * size_of::<T>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Replace the contents with `data`, growing if necessary.
    ///
    /// Returns `true` if the buffer was reallocated.
    pub fn write(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[T],
    ) -> bool {
        let reallocated = if data.len() > self.capacity {
            let new_capacity = (data.len() * 2).max(self.capacity * 2);
            log::debug!(
                "growing {} to {new_capacity} instances",
                self.label
            );
            self.buffer = Self::allocate(device, &self.label, new_capacity);
            self.capacity = new_capacity;
            true
        } else {
            false
        };

        if !data.is_empty() {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(data));
        }
        self.len = u32::try_from(data.len()).unwrap_or(u32::MAX);
        reallocated
    }

    /// The underlying buffer.
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Number of elements last written.
    pub fn len(&self) -> u32 {
        self.len
    }

    /// `true` if the last write was empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Slice covering exactly the written elements.
    pub fn slice(&self) -> wgpu::BufferSlice<'_> {
        self.buffer
            .slice(..u64::from(self.len) * size_of::<T>() as u64)
    }
}
