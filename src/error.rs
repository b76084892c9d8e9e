//! Error types for the choreography engine.
//!
//! Only two things can actually fail here: bringing up a GPU rendering
//! context, and loading a deck description. Per-particle numeric trouble is
//! handled inside the integrator and never becomes an error.

use thiserror::Error;

/// Errors that can occur during GPU initialization.
#[derive(Debug, Error)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    #[error("failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    #[error("no compatible GPU adapter found; a GPU with WebGPU/Vulkan/Metal/DX12 support is required")]
    NoAdapter,
    /// Failed to create GPU device.
    #[error("failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
    /// The surface reported no usable texture format.
    #[error("surface exposes no usable texture format")]
    NoSurfaceFormat,
}

/// Errors raised while loading or validating a deck.
#[derive(Debug, Error)]
pub enum DeckError {
    /// A deck needs at least one slide.
    #[error("deck has no slides")]
    Empty,
    /// `trails_damp` must lie in `[0, 1]`.
    #[error("slide {index} has trails_damp {value} outside [0, 1]")]
    TrailsDampOutOfRange { index: usize, value: f32 },
    /// A scale multiplier in the variant config is negative or not finite.
    #[error("variant field `{field}` must be a finite non-negative number, got {value}")]
    InvalidScale { field: &'static str, value: f32 },
    /// The deck JSON could not be parsed.
    #[error("failed to parse deck: {0}")]
    Parse(#[from] serde_json::Error),
    /// The deck file could not be read.
    #[error("failed to read deck file: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur when running a deck.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No GPU rendering context could be created. Fatal to the engine only;
    /// the host shows a fallback notice.
    #[error("rendering unavailable: {0}")]
    CapabilityUnavailable(#[from] GpuError),
    /// Failed to create event loop.
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    /// Failed to create window.
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    /// The deck description was rejected.
    #[error("invalid deck: {0}")]
    Deck(#[from] DeckError),
}
