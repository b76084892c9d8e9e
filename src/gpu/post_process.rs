//! Trails, bloom and the final composite.
//!
//! The scene pass renders into [`PostFx::scene_view`]. From there:
//!
//! 1. **Trails** (optional): `max(scene, previous * damp)` into a ping-pong
//!    accumulation pair.
//! 2. **Bloom** (optional): bright-pass into a reduced-size target, then a
//!    separable blur (horizontal, vertical).
//! 3. **Composite**: trail or scene output plus weighted bloom over the slide
//!    background, written to the surface.
//!
//! Every pass binds the same shape (two textures, a sampler, a parameter
//! block), so one layout serves them all. Unused texture slots get a 1x1
//! black texture.

use bytemuck::{Pod, Zeroable};

use super::SCENE_FORMAT;
use crate::fx::FxSettings;
use crate::shaders;

/// Blur tap spacing grows with the preset radius.
const BLUR_SPREAD: f32 = 4.0;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
struct PostParams {
    a: [f32; 4],
    b: [f32; 4],
}

/// Texture plus its default view.
struct Target {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl Target {
    fn new(device: &wgpu::Device, label: &str, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SCENE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// Size-dependent render targets, rebuilt on resize.
struct Targets {
    scene: Target,
    accum: [Target; 2],
    bloom_a: Target,
    bloom_b: Target,
    bloom_size: (u32, u32),
}

impl Targets {
    fn new(device: &wgpu::Device, width: u32, height: u32, bloom_divisor: u32) -> Self {
        let divisor = bloom_divisor.max(1);
        let bloom_size = ((width / divisor).max(1), (height / divisor).max(1));
        Self {
            scene: Target::new(device, "Scene Target", width, height),
            accum: [
                Target::new(device, "Trail Accumulation A", width, height),
                Target::new(device, "Trail Accumulation B", width, height),
            ],
            bloom_a: Target::new(device, "Bloom Target A", bloom_size.0, bloom_size.1),
            bloom_b: Target::new(device, "Bloom Target B", bloom_size.0, bloom_size.1),
            bloom_size,
        }
    }
}

/// Parameter buffers, one per pass so a frame's writes never alias.
struct ParamBuffers {
    trail: wgpu::Buffer,
    bright: wgpu::Buffer,
    blur_h: wgpu::Buffer,
    blur_v: wgpu::Buffer,
    composite: wgpu::Buffer,
}

impl ParamBuffers {
    fn new(device: &wgpu::Device) -> Self {
        let make = |label: &str| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: std::mem::size_of::<PostParams>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        Self {
            trail: make("Trail Params"),
            bright: make("Bright Params"),
            blur_h: make("Blur H Params"),
            blur_v: make("Blur V Params"),
            composite: make("Composite Params"),
        }
    }
}

pub struct PostFx {
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    trail_pipeline: wgpu::RenderPipeline,
    bright_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    targets: Targets,
    black: Target,
    params: ParamBuffers,
    /// Accumulation texture holding the latest trail frame.
    current: usize,
    /// False until the accumulation holds a frame of the current run of
    /// trails; the first frame ignores whatever stale data is there.
    primed: bool,
}

impl PostFx {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        bloom_divisor: u32,
    ) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Post Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let texture_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Post Bind Group Layout"),
            entries: &[
                texture_entry(0),
                texture_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Post Shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::post_shader().into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Post Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let make_pipeline = |label: &str, entry: &str, format: wgpu::TextureFormat| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_fullscreen"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(entry),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        Self {
            trail_pipeline: make_pipeline("Trail Pipeline", "fs_trail", SCENE_FORMAT),
            bright_pipeline: make_pipeline("Bright Pipeline", "fs_bright", SCENE_FORMAT),
            blur_pipeline: make_pipeline("Blur Pipeline", "fs_blur", SCENE_FORMAT),
            composite_pipeline: make_pipeline("Composite Pipeline", "fs_composite", surface_format),
            targets: Targets::new(device, width, height, bloom_divisor),
            black: Target::new(device, "Black Texture", 1, 1),
            params: ParamBuffers::new(device),
            layout,
            sampler,
            current: 0,
            primed: false,
        }
    }

    /// View the scene pass renders into.
    pub fn scene_view(&self) -> &wgpu::TextureView {
        &self.targets.scene.view
    }

    /// Recreate size-dependent targets. Trails restart from empty.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32, bloom_divisor: u32) {
        self.targets = Targets::new(device, width, height, bloom_divisor);
        self.primed = false;
    }

    /// Record the post passes, ending with the composite into `output`.
    pub fn encode(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        output: &wgpu::TextureView,
        fx: &FxSettings,
        background: [f32; 3],
    ) {
        let trails_on = match fx.trails {
            Some(trails) => {
                let damp = if self.primed { trails.damp } else { 0.0 };
                queue.write_buffer(
                    &self.params.trail,
                    0,
                    bytemuck::bytes_of(&PostParams {
                        a: [damp, 0.0, 0.0, 0.0],
                        b: [0.0; 4],
                    }),
                );
                let previous = self.current;
                let next = 1 - previous;
                self.run_pass(
                    device,
                    encoder,
                    "Trail Pass",
                    &self.trail_pipeline,
                    &self.targets.accum[next].view,
                    &self.targets.scene.view,
                    &self.targets.accum[previous].view,
                    &self.params.trail,
                );
                self.current = next;
                self.primed = true;
                true
            }
            None => {
                self.primed = false;
                false
            }
        };

        let source = if trails_on {
            &self.targets.accum[self.current].view
        } else {
            &self.targets.scene.view
        };

        let strength = match fx.bloom {
            Some(bloom) => {
                let (bw, bh) = self.targets.bloom_size;
                let spread = 1.0 + bloom.radius * BLUR_SPREAD;
                let texel = [spread / bw as f32, spread / bh as f32];
                queue.write_buffer(
                    &self.params.bright,
                    0,
                    bytemuck::bytes_of(&PostParams {
                        a: [bloom.threshold, 0.0, 0.0, 0.0],
                        b: [0.0; 4],
                    }),
                );
                queue.write_buffer(
                    &self.params.blur_h,
                    0,
                    bytemuck::bytes_of(&PostParams {
                        a: [texel[0], 0.0, 0.0, 0.0],
                        b: [0.0; 4],
                    }),
                );
                queue.write_buffer(
                    &self.params.blur_v,
                    0,
                    bytemuck::bytes_of(&PostParams {
                        a: [0.0, texel[1], 0.0, 0.0],
                        b: [0.0; 4],
                    }),
                );

                self.run_pass(
                    device,
                    encoder,
                    "Bloom Bright Pass",
                    &self.bright_pipeline,
                    &self.targets.bloom_a.view,
                    source,
                    &self.black.view,
                    &self.params.bright,
                );
                self.run_pass(
                    device,
                    encoder,
                    "Bloom Blur H Pass",
                    &self.blur_pipeline,
                    &self.targets.bloom_b.view,
                    &self.targets.bloom_a.view,
                    &self.black.view,
                    &self.params.blur_h,
                );
                self.run_pass(
                    device,
                    encoder,
                    "Bloom Blur V Pass",
                    &self.blur_pipeline,
                    &self.targets.bloom_a.view,
                    &self.targets.bloom_b.view,
                    &self.black.view,
                    &self.params.blur_v,
                );
                bloom.strength
            }
            None => 0.0,
        };

        let bloom_view = if fx.bloom.is_some() {
            &self.targets.bloom_a.view
        } else {
            &self.black.view
        };
        queue.write_buffer(
            &self.params.composite,
            0,
            bytemuck::bytes_of(&PostParams {
                a: [strength, 0.0, 0.0, 0.0],
                b: [background[0], background[1], background[2], 1.0],
            }),
        );
        self.run_pass(
            device,
            encoder,
            "Composite Pass",
            &self.composite_pipeline,
            output,
            source,
            bloom_view,
            &self.params.composite,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn run_pass(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
        pipeline: &wgpu::RenderPipeline,
        target: &wgpu::TextureView,
        tex_a: &wgpu::TextureView,
        tex_b: &wgpu::TextureView,
        params: &wgpu::Buffer,
    ) {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(tex_a),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(tex_b),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: params.as_entire_binding(),
                },
            ],
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}
