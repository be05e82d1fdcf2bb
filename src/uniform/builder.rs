use super::{Slots, Uniform};
use crate::render::Renderer;
use bytemuck::NoUninit;
use std::{marker::PhantomData, num::NonZeroU64};

mod sealed {
    pub trait Sealed {
        type AddBindGroupLayout: Sealed;
        type AddSlots: Sealed;
    }
}

pub trait BuilderState: sealed::Sealed {
    type AddBindGroupLayout: sealed::Sealed;
    type AddSlots: sealed::Sealed;
}

pub struct BuilderInit;
pub struct BuilderLayout;
pub struct BuilderSlots;
pub struct BuilderComplete;

impl sealed::Sealed for BuilderInit {
    type AddBindGroupLayout = BuilderLayout;
    type AddSlots = BuilderSlots;
}
impl sealed::Sealed for BuilderLayout {
    type AddBindGroupLayout = Self;
    type AddSlots = BuilderComplete;
}
impl sealed::Sealed for BuilderSlots {
    type AddBindGroupLayout = BuilderComplete;
    type AddSlots = Self;
}
impl sealed::Sealed for BuilderComplete {
    type AddBindGroupLayout = Self;
    type AddSlots = Self;
}

impl<T: sealed::Sealed> BuilderState for T {
    type AddBindGroupLayout = T::AddBindGroupLayout;
    type AddSlots = T::AddSlots;
}

pub struct UniformBuilder<'a, T: NoUninit, S: BuilderState> {
    bind_group_layout: Option<wgpu::BindGroupLayout>,
    label: Option<&'a str>,
    slots: u32,
    data: PhantomData<T>,
    state: PhantomData<S>,
}

impl<T: NoUninit> Default for UniformBuilder<'_, T, BuilderInit> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: NoUninit> UniformBuilder<'_, T, BuilderInit> {
    pub fn new() -> Self {
        Self {
            bind_group_layout: None,
            label: None,
            slots: 0,
            data: PhantomData,
            state: PhantomData,
        }
    }
}

impl<T: NoUninit> UniformBuilder<'_, T, BuilderComplete> {
    /// Allocates the zeroed slots and binds the first one
    /// The layout must declare binding 0 with a dynamic offset
    pub fn build(self, renderer: &Renderer) -> Uniform<T> {
        let Self {
            bind_group_layout,
            label,
            slots,
            data: _,
            state: _,
        } = self;

        let bind_group_layout = unsafe { bind_group_layout.unwrap_unchecked() };
        let slots = Slots::<T>::new(
            slots,
            renderer.device.limits().min_uniform_buffer_offset_alignment,
        );

        let buffer = renderer.device.create_buffer(&wgpu::BufferDescriptor {
            label,
            size: slots.as_bytes().len() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = renderer
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label,
                layout: &bind_group_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &buffer,
                        offset: 0,
                        size: NonZeroU64::new(std::mem::size_of::<T>() as u64),
                    }),
                }],
            });

        Uniform {
            buffer,
            bind_group_layout,
            bind_group,
            slots,
        }
    }
}

impl<'a, T: NoUninit, S: BuilderState> UniformBuilder<'a, T, S> {
    /// Add a label to the uniform
    /// The label will be applied to the buffer and the bind group
    pub fn with_label(mut self, label: Option<&'a str>) -> Self {
        self.label = label;
        self
    }

    /// Adds a BindGroupLayout to the uniform
    /// This will replace any previous layout
    /// see tricolor::render::BindGroupLayoutBuilder
    pub fn with_bind_group_layout(
        self,
        layout: wgpu::BindGroupLayout,
    ) -> UniformBuilder<'a, T, <S as sealed::Sealed>::AddBindGroupLayout> {
        UniformBuilder {
            bind_group_layout: Some(layout),
            label: self.label,
            slots: self.slots,
            data: PhantomData,
            state: PhantomData,
        }
    }

    /// Sets how many values can be staged per submission
    /// This will replace any previous count; zero is raised to one
    pub fn with_slots(self, slots: u32) -> UniformBuilder<'a, T, <S as sealed::Sealed>::AddSlots> {
        UniformBuilder {
            bind_group_layout: self.bind_group_layout,
            label: self.label,
            slots,
            data: PhantomData,
            state: PhantomData,
        }
    }
}
