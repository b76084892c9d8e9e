//! WGSL sources.
//!
//! Points are drawn as instanced camera-facing quads (six vertices per
//! particle) since WebGPU has no point size. Post passes share one
//! fullscreen-triangle vertex stage and one bind group shape: two textures,
//! a sampler and a small parameter block.

/// Scene uniforms shared by the point and line passes. Mirrors
/// [`crate::gpu::SceneUniforms`].
const SCENE_UNIFORMS: &str = r#"
struct SceneUniforms {
    view_proj: mat4x4<f32>,
    // rgb, opacity
    color: vec4<f32>,
    // offscreen target size in physical pixels
    viewport: vec2<f32>,
    time: f32,
    pixel_ratio: f32,
    point_scale: f32,
    sparkle: f32,
    // 0 = crisp, 1 = soft glow
    softness: f32,
    _pad: f32,
};

@group(0) @binding(0)
var<uniform> u: SceneUniforms;
"#;

const POINT_BODY: &str = r#"
// base sprite diameter in logical pixels at the reference depth
const BASE_POINT_PX: f32 = 5.0;
const REFERENCE_DEPTH: f32 = 8.0;
const TAU: f32 = 6.2831853;

struct PointOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) twinkle: f32,
};

@vertex
fn vs_point(
    @builtin(vertex_index) vertex_index: u32,
    @location(0) position: vec3<f32>,
    @location(1) size_seed: vec2<f32>,
) -> PointOut {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    let corner = corners[vertex_index];
    let size = size_seed.x;
    let seed = size_seed.y;

    let twinkle = 0.5 + 0.5 * sin(u.time * (0.8 + seed * 1.7) + seed * TAU);
    let clip = u.view_proj * vec4<f32>(position, 1.0);
    let depth = max(clip.w, 0.1);

    let diameter = BASE_POINT_PX * size * u.point_scale * (0.75 + 0.5 * twinkle)
        * u.pixel_ratio * (REFERENCE_DEPTH / depth);
    // corner spans [-1, 1]; a pixel is 2 / viewport in NDC
    let offset = corner * diameter / u.viewport * clip.w;

    var out: PointOut;
    out.clip = vec4<f32>(clip.xy + offset, clip.zw);
    out.uv = corner;
    out.twinkle = twinkle;
    return out;
}

@fragment
fn fs_point(in: PointOut) -> @location(0) vec4<f32> {
    let r2 = dot(in.uv, in.uv);
    if r2 > 1.0 {
        discard;
    }
    let falloff = mix(9.0, 3.5, u.softness);
    let alpha = exp(-r2 * falloff) * (1.0 - r2) * u.color.a;
    let brightness = 1.0 + u.sparkle * (in.twinkle - 0.5);
    // additive blend: premultiplied color
    return vec4<f32>(u.color.rgb * brightness * alpha, alpha);
}
"#;

const LINE_BODY: &str = r#"
struct LineOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) fade: f32,
};

@vertex
fn vs_line(@location(0) vertex: vec4<f32>) -> LineOut {
    var out: LineOut;
    out.clip = u.view_proj * vec4<f32>(vertex.xyz, 1.0);
    out.fade = vertex.w;
    return out;
}

@fragment
fn fs_line(in: LineOut) -> @location(0) vec4<f32> {
    let a = in.fade * in.fade * u.color.a;
    return vec4<f32>(u.color.rgb * a, a);
}
"#;

const POST_BODY: &str = r#"
struct PostParams {
    a: vec4<f32>,
    b: vec4<f32>,
};

struct FullscreenOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@group(0) @binding(0)
var tex_a: texture_2d<f32>;
@group(0) @binding(1)
var tex_b: texture_2d<f32>;
@group(0) @binding(2)
var samp: sampler;
@group(0) @binding(3)
var<uniform> params: PostParams;

@vertex
fn vs_fullscreen(@builtin(vertex_index) vertex_index: u32) -> FullscreenOut {
    var positions = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(3.0, -1.0),
        vec2<f32>(-1.0, 3.0),
    );
    var uvs = array<vec2<f32>, 3>(
        vec2<f32>(0.0, 1.0),
        vec2<f32>(2.0, 1.0),
        vec2<f32>(0.0, -1.0),
    );
    var out: FullscreenOut;
    out.clip = vec4<f32>(positions[vertex_index], 0.0, 1.0);
    out.uv = uvs[vertex_index];
    return out;
}

// a: scene, b: previous accumulation, params.a.x: damp
@fragment
fn fs_trail(in: FullscreenOut) -> @location(0) vec4<f32> {
    let scene = textureSample(tex_a, samp, in.uv);
    let previous = textureSample(tex_b, samp, in.uv) * params.a.x;
    return max(scene, previous);
}

// a: source, params.a.x: threshold
@fragment
fn fs_bright(in: FullscreenOut) -> @location(0) vec4<f32> {
    let c = textureSample(tex_a, samp, in.uv).rgb;
    let luma = dot(c, vec3<f32>(0.2126, 0.7152, 0.0722));
    let keep = smoothstep(params.a.x, params.a.x + 0.25, luma);
    return vec4<f32>(c * keep, 1.0);
}

// a: source, params.a.xy: one-tap step in uv
@fragment
fn fs_blur(in: FullscreenOut) -> @location(0) vec4<f32> {
    var weights = array<f32, 5>(0.227027, 0.1945946, 0.1216216, 0.054054, 0.016216);
    let texel_step = params.a.xy;
    var sum = textureSample(tex_a, samp, in.uv).rgb * weights[0];
    for (var i = 1; i < 5; i = i + 1) {
        let o = texel_step * f32(i);
        sum = sum + textureSample(tex_a, samp, in.uv + o).rgb * weights[i];
        sum = sum + textureSample(tex_a, samp, in.uv - o).rgb * weights[i];
    }
    return vec4<f32>(sum, 1.0);
}

// a: scene, b: bloom, params.a.x: bloom strength, params.b.rgb: background
@fragment
fn fs_composite(in: FullscreenOut) -> @location(0) vec4<f32> {
    let scene = textureSample(tex_a, samp, in.uv).rgb;
    let bloom = textureSample(tex_b, samp, in.uv).rgb * params.a.x;
    // exposure curve: stacked particles saturate instead of clipping
    let light = vec3<f32>(1.0) - exp(-(scene + bloom) * 1.4);
    return vec4<f32>(clamp(params.b.rgb + light, vec3<f32>(0.0), vec3<f32>(1.0)), 1.0);
}
"#;

/// Point sprite pass: `vs_point`, `fs_point`.
pub fn point_shader() -> String {
    format!("{SCENE_UNIFORMS}{POINT_BODY}")
}

/// Constellation line pass: `vs_line`, `fs_line`.
pub fn line_shader() -> String {
    format!("{SCENE_UNIFORMS}{LINE_BODY}")
}

/// Fullscreen passes: `vs_fullscreen` with `fs_trail`, `fs_bright`,
/// `fs_blur` and `fs_composite`.
pub fn post_shader() -> &'static str {
    POST_BODY
}
