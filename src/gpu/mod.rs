//! wgpu renderer.
//!
//! The CPU owns the simulation; the GPU only draws it. Each frame the
//! particle positions are copied into an instance buffer, the points and
//! constellation lines are drawn additively into an HDR offscreen target, and
//! [`post_process::PostFx`] layers trails and bloom on top before compositing
//! to the surface.
//!
//! Offscreen targets are sized by `min(scale_factor, tier ceiling)` rather
//! than the raw scale factor, so high-density screens on a low tier render
//! fewer pixels and upsample.

mod camera;
mod connections;
mod post_process;

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use wgpu::util::DeviceExt;
use winit::window::Window;

pub use camera::Camera;
use connections::LineRenderer;
use post_process::PostFx;

use crate::capability::QualityTier;
use crate::deck::OverlayStyle;
use crate::engine::Engine;
use crate::error::GpuError;
use crate::shaders;
use crate::state::ParticleState;

/// HDR format of every offscreen target.
const SCENE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Premultiplied additive blending: overlapping particles brighten.
const ADDITIVE: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

/// Uniform block shared by the point and line shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SceneUniforms {
    pub view_proj: [[f32; 4]; 4],
    /// rgb, opacity
    pub color: [f32; 4],
    pub viewport: [f32; 2],
    pub time: f32,
    pub pixel_ratio: f32,
    pub point_scale: f32,
    pub sparkle: f32,
    pub softness: f32,
    pub _pad: f32,
}

/// Pixel ratio actually rendered at.
pub fn effective_pixel_ratio(scale_factor: f32, tier: QualityTier) -> f32 {
    let scale = if scale_factor.is_finite() && scale_factor > 0.0 { scale_factor } else { 1.0 };
    scale.min(tier.max_pixel_ratio())
}

/// Offscreen size for a surface of `width x height` physical pixels.
pub fn offscreen_size(width: u32, height: u32, scale_factor: f32, tier: QualityTier) -> (u32, u32) {
    let scale = if scale_factor.is_finite() && scale_factor > 0.0 { scale_factor } else { 1.0 };
    let ratio = effective_pixel_ratio(scale, tier) / scale;
    let w = ((width as f32 * ratio).round() as u32).max(1);
    let h = ((height as f32 * ratio).round() as u32).max(1);
    (w, h)
}

fn uniform_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Scene Uniform Layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

/// Per-particle instance buffers.
struct ParticleBuffers {
    /// xyz, rewritten every frame.
    positions: wgpu::Buffer,
    /// (size, seed), static for the store's life.
    attributes: wgpu::Buffer,
    count: u32,
}

impl ParticleBuffers {
    fn new(device: &wgpu::Device, state: &ParticleState) -> Self {
        let positions = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Positions"),
            contents: bytemuck::cast_slice(&state.positions),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        let packed: Vec<[f32; 2]> = state
            .sizes
            .iter()
            .zip(&state.seeds)
            .map(|(&size, &seed)| [size, seed])
            .collect();
        let attributes = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Attributes"),
            contents: bytemuck::cast_slice(&packed),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self {
            positions,
            attributes,
            count: state.count(),
        }
    }
}

pub struct GpuState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: Camera,
    scale_factor: f32,
    tier: QualityTier,
    offscreen: (u32, u32),
    point_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    particles: ParticleBuffers,
    lines: LineRenderer,
    post: PostFx,
}

impl GpuState {
    /// Bring up a surface, device and every pipeline for `engine`.
    pub async fn new(window: Arc<Window>, engine: &Engine) -> Result<Self, GpuError> {
        let size = window.inner_size();
        let scale_factor = window.scale_factor() as f32;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;
        let info = adapter.get_info();
        log::info!("GPU adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Choreo Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(GpuError::NoSurfaceFormat)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let tier = engine.tier();
        let offscreen = offscreen_size(config.width, config.height, scale_factor, tier);

        let layout = uniform_layout(&device);
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Point Uniforms"),
            size: std::mem::size_of::<SceneUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Point Uniform Bind Group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let point_pipeline = create_point_pipeline(&device, &layout);
        let particles = ParticleBuffers::new(&device, engine.state());
        let lines = LineRenderer::new(&device, &layout, SCENE_FORMAT);
        let post = PostFx::new(
            &device,
            surface_format,
            offscreen.0,
            offscreen.1,
            tier.bloom_divisor(),
        );

        log::info!(
            "renderer ready: surface {}x{} {:?}, offscreen {}x{}",
            config.width,
            config.height,
            surface_format,
            offscreen.0,
            offscreen.1
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            camera: Camera::new(),
            scale_factor,
            tier,
            offscreen,
            point_pipeline,
            uniform_buffer,
            uniform_bind_group,
            particles,
            lines,
            post,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.resize_offscreen();
        }
    }

    pub fn set_scale_factor(&mut self, scale_factor: f32) {
        self.scale_factor = scale_factor;
        self.resize_offscreen();
    }

    /// Reconfigure the surface at its current size, e.g. after it was lost.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    fn resize_offscreen(&mut self) {
        let size = offscreen_size(self.config.width, self.config.height, self.scale_factor, self.tier);
        if size != self.offscreen {
            self.offscreen = size;
            self.post
                .resize(&self.device, size.0, size.1, self.tier.bloom_divisor());
        }
    }

    /// Match buffers and targets to the engine after a tier change.
    pub fn sync_tier(&mut self, engine: &Engine) {
        if engine.tier() != self.tier {
            self.tier = engine.tier();
            self.offscreen = (0, 0);
            self.resize_offscreen();
        }
        if engine.state().count() != self.particles.count {
            log::info!(
                "reallocating particle buffers: {} -> {}",
                self.particles.count,
                engine.state().count()
            );
            self.particles = ParticleBuffers::new(&self.device, engine.state());
        }
    }

    fn scene_uniforms(&self, engine: &Engine, color: Vec3, opacity: f32) -> SceneUniforms {
        let style = &engine.variant().render;
        let aspect = self.config.width as f32 / self.config.height.max(1) as f32;
        let (softness, point_scale) = match style.overlay {
            OverlayStyle::Glow => (1.0, style.point_scale),
            OverlayStyle::Crisp => (0.0, style.point_scale * 0.8),
        };
        SceneUniforms {
            view_proj: self.camera.view_proj(aspect).to_cols_array_2d(),
            color: [color.x, color.y, color.z, opacity],
            viewport: [self.offscreen.0 as f32, self.offscreen.1 as f32],
            time: engine.time(),
            pixel_ratio: effective_pixel_ratio(self.scale_factor, self.tier),
            point_scale,
            sparkle: style.sparkle,
            softness,
            _pad: 0.0,
        }
    }

    /// Draw the engine's current frame.
    pub fn render(&mut self, engine: &Engine) -> Result<(), wgpu::SurfaceError> {
        self.sync_tier(engine);
        self.camera.update_drift(engine.time(), engine.reduced_motion());

        let slide = engine.current_slide();
        let style = &engine.variant().render;
        let color = slide.particle_color.0;

        let points = self.scene_uniforms(engine, color, style.opacity);
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&points));
        self.queue.write_buffer(
            &self.particles.positions,
            0,
            bytemuck::cast_slice(&engine.state().positions),
        );
        let lines = self.scene_uniforms(engine, color, style.line_opacity);
        self.lines.update(&self.queue, engine.constellation(), &lines);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.post.scene_view(),
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

            pass.set_pipeline(&self.point_pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_vertex_buffer(0, self.particles.positions.slice(..));
            pass.set_vertex_buffer(1, self.particles.attributes.slice(..));
            pass.draw(0..6, 0..self.particles.count);

            self.lines.draw(&mut pass);
        }

        self.post.encode(
            &self.device,
            &self.queue,
            &mut encoder,
            &view,
            engine.fx(),
            slide.background_color.to_array(),
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

fn create_point_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let source = shaders::point_shader();
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Point Shader"),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Point Pipeline Layout"),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Point Pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_point"),
            buffers: &[
                wgpu::VertexBufferLayout {
                    array_stride: 12,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &[wgpu::VertexAttribute {
                        offset: 0,
                        shader_location: 0,
                        format: wgpu::VertexFormat::Float32x3,
                    }],
                },
                wgpu::VertexBufferLayout {
                    array_stride: 8,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &[wgpu::VertexAttribute {
                        offset: 0,
                        shader_location: 1,
                        format: wgpu::VertexFormat::Float32x2,
                    }],
                },
            ],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_point"),
            targets: &[Some(wgpu::ColorTargetState {
                format: SCENE_FORMAT,
                blend: Some(ADDITIVE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_size_matches_wgsl() {
        // mat4 + vec4 + vec2 + six f32, rounded to 16
        assert_eq!(std::mem::size_of::<SceneUniforms>(), 112);
    }

    #[test]
    fn test_pixel_ratio_ceiling() {
        assert_eq!(effective_pixel_ratio(3.0, QualityTier::Low), 1.0);
        assert_eq!(effective_pixel_ratio(3.0, QualityTier::Ultra), 2.0);
        assert_eq!(effective_pixel_ratio(1.0, QualityTier::Ultra), 1.0);
        assert_eq!(effective_pixel_ratio(f32::NAN, QualityTier::High), 1.0);
    }

    #[test]
    fn test_offscreen_downscales_dense_screens() {
        // 2x display on the low tier renders at logical resolution
        assert_eq!(offscreen_size(2560, 1440, 2.0, QualityTier::Low), (1280, 720));
        assert_eq!(offscreen_size(2560, 1440, 2.0, QualityTier::Ultra), (2560, 1440));
        assert_eq!(offscreen_size(1920, 1080, 1.0, QualityTier::Medium), (1920, 1080));
    }
}
