//! Constellation line rendering.
//!
//! Segments are found on the CPU by [`crate::constellation::Constellation`];
//! this only uploads the vertex list and draws it as a line list in the
//! scene pass, blended additively with the points.

use wgpu::util::DeviceExt;

use super::{SceneUniforms, ADDITIVE};
use crate::constellation::{Constellation, LineVertex, MAX_SEGMENTS};
use crate::shaders;

/// GPU resources for the constellation overlay.
pub struct LineRenderer {
    vertex_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    pipeline: wgpu::RenderPipeline,
    /// Segments uploaded this frame. Zero skips the draw.
    segments: u32,
}

impl LineRenderer {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        format: wgpu::TextureFormat,
    ) -> Self {
        let zeros = vec![[0.0f32; 4]; MAX_SEGMENTS * 2];
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Constellation Vertices"),
            contents: bytemuck::cast_slice(&zeros),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Constellation Uniforms"),
            size: std::mem::size_of::<SceneUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Constellation Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Constellation Shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::line_shader().into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Constellation Pipeline Layout"),
            bind_group_layouts: &[layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Constellation Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_line"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<LineVertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[wgpu::VertexAttribute {
                        offset: 0,
                        shader_location: 0,
                        format: wgpu::VertexFormat::Float32x4,
                    }],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_line"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(ADDITIVE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            vertex_buffer,
            uniform_buffer,
            bind_group,
            pipeline,
            segments: 0,
        }
    }

    /// Upload this frame's segments. `None` hides the overlay.
    pub fn update(
        &mut self,
        queue: &wgpu::Queue,
        constellation: Option<&Constellation>,
        uniforms: &SceneUniforms,
    ) {
        let Some(constellation) = constellation else {
            self.segments = 0;
            return;
        };
        let segments = constellation.segment_count().min(MAX_SEGMENTS);
        self.segments = segments as u32;
        if segments == 0 {
            return;
        }
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
        queue.write_buffer(
            &self.vertex_buffer,
            0,
            bytemuck::cast_slice(&constellation.vertices()[..segments * 2]),
        );
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        if self.segments == 0 {
            return;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.draw(0..self.segments * 2, 0..1);
    }
}
