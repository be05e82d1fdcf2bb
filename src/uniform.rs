use crate::render::Renderer;
use bytemuck::NoUninit;
use std::marker::PhantomData;

mod builder;
pub use builder::UniformBuilder;

/// A uniform bound with a dynamic offset, holding one aligned slot per draw
/// Values are staged on the CPU and buffered to the GPU with `flush`
pub struct Uniform<T: NoUninit> {
    buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    slots: Slots<T>,
}

/// CPU staging for a dynamic-offset uniform buffer
/// Slot `i` starts at byte `i * stride`
pub struct Slots<T: NoUninit> {
    stride: u32,
    len: u32,
    staging: Vec<u8>,
    data: PhantomData<T>,
}

/// Size of one slot: `size` rounded up to the device's offset alignment
pub fn slot_stride(size: usize, alignment: u32) -> u32 {
    let size = size as u32;
    let alignment = alignment.max(1);
    size.div_ceil(alignment) * alignment
}

impl<T: NoUninit> Slots<T> {
    /// Zeroed staging for `len` slots; zero is raised to one
    pub fn new(len: u32, alignment: u32) -> Self {
        let len = len.max(1);
        let stride = slot_stride(std::mem::size_of::<T>(), alignment);

        Self {
            stride,
            len,
            staging: vec![0u8; (stride * len) as usize],
            data: PhantomData,
        }
    }

    /// Stage `value` into `slot`
    /// Returns the dynamic offset to bind, or None if the slot does not exist
    pub fn set(&mut self, slot: u32, value: T) -> Option<wgpu::DynamicOffset> {
        if slot >= self.len {
            return None;
        }

        let offset = slot * self.stride;
        let start = offset as usize;
        let bytes = bytemuck::bytes_of(&value);
        self.staging[start..start + bytes.len()].copy_from_slice(bytes);

        Some(offset)
    }

    pub fn count(&self) -> u32 {
        self.len
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// The staged bytes of every slot, padding included
    pub fn as_bytes(&self) -> &[u8] {
        self.staging.as_slice()
    }
}

impl<T: NoUninit> Uniform<T> {
    /// Buffer every staged slot to the GPU
    /// Takes effect with the next queue submission
    pub fn flush(&self, renderer: &Renderer) {
        renderer
            .queue
            .write_buffer(&self.buffer, 0, self.slots.as_bytes());
    }

    /// The staging slots together with the bind group their offsets apply to
    pub fn staging_mut(&mut self) -> (&mut Slots<T>, &wgpu::BindGroup) {
        (&mut self.slots, &self.bind_group)
    }

    /// Get the bind group layout (useful for setting up render pipelines)
    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_case::test_case;

    #[test_case(16, 256, 256)]
    #[test_case(16, 16, 16)]
    #[test_case(20, 16, 32)]
    #[test_case(256, 256, 256)]
    #[test_case(16, 0, 16)]
    fn stride_is_aligned(size: usize, alignment: u32, expected: u32) {
        assert_eq!(expected, slot_stride(size, alignment));
    }

    #[test]
    fn set_places_value_at_its_offset() {
        let mut slots = Slots::<[f32; 4]>::new(3, 256);

        assert_eq!(Some(256), slots.set(1, [0.25, 0.5, 0.75, 1.0]));
        assert_eq!(Some(512), slots.set(2, [1.0; 4]));

        let bytes = slots.as_bytes();
        assert_eq!(768, bytes.len());
        assert_eq!(
            [0.25f32, 0.5, 0.75, 1.0],
            bytemuck::pod_read_unaligned::<[f32; 4]>(&bytes[256..272])
        );
        assert_eq!([1.0f32; 4], bytemuck::pod_read_unaligned::<[f32; 4]>(&bytes[512..528]));
        assert!(bytes[..256].iter().all(|&byte| byte == 0));
    }

    #[test]
    fn set_past_the_last_slot_is_rejected() {
        let mut slots = Slots::<[f32; 4]>::new(2, 16);

        assert_eq!(None, slots.set(2, [1.0; 4]));
        assert!(slots.as_bytes().iter().all(|&byte| byte == 0));
    }

    #[test]
    fn zero_slots_are_raised_to_one() {
        let slots = Slots::<[f32; 4]>::new(0, 256);

        assert_eq!(1, slots.count());
        assert_eq!(256, slots.stride());
        assert_eq!(256, slots.as_bytes().len());
    }
}
