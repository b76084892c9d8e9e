//! Device capability detection and quality tiers.
//!
//! The tier is picked once from a handful of coarse device hints and fixes
//! the particle count and the pixel-ratio ceiling for the life of an engine.
//!
//! ```ignore
//! let hints = DeviceHints::probe(Some(&window));
//! let tier = QualityTier::detect(&hints);
//! assert!(tier.particle_count() >= 1200);
//! ```

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Environment variable that forces the motion-reduction preference on.
pub const ENV_REDUCED_MOTION: &str = "CHOREO_REDUCED_MOTION";
/// Environment variable that forces a specific tier.
pub const ENV_TIER: &str = "CHOREO_TIER";

/// Discrete fidelity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    Medium,
    High,
    Ultra,
}

impl QualityTier {
    /// Every tier, lowest first.
    pub const ALL: [QualityTier; 4] = [
        QualityTier::Low,
        QualityTier::Medium,
        QualityTier::High,
        QualityTier::Ultra,
    ];

    /// Pick a tier from device hints.
    ///
    /// Priority: motion reduction, then mobile or few cores, then a many-core
    /// machine with a modest pixel ratio, otherwise high.
    pub fn detect(hints: &DeviceHints) -> Self {
        if hints.reduced_motion {
            QualityTier::Low
        } else if hints.is_mobile || hints.logical_cores <= 4 {
            QualityTier::Medium
        } else if hints.logical_cores >= 10 && hints.pixel_ratio <= 1.5 {
            QualityTier::Ultra
        } else {
            QualityTier::High
        }
    }

    /// Number of simulated particles.
    pub fn particle_count(self) -> u32 {
        match self {
            QualityTier::Low => 1200,
            QualityTier::Medium => 2500,
            QualityTier::High => 3500,
            QualityTier::Ultra => 5000,
        }
    }

    /// Upper bound on the device pixel ratio used for offscreen targets.
    pub fn max_pixel_ratio(self) -> f32 {
        match self {
            QualityTier::Low => 1.0,
            QualityTier::Medium => 1.25,
            QualityTier::High => 1.75,
            QualityTier::Ultra => 2.0,
        }
    }

    /// Bloom chain runs at `1 / divisor` of the scene resolution.
    pub fn bloom_divisor(self) -> u32 {
        match self {
            QualityTier::Low | QualityTier::Medium => 4,
            QualityTier::High | QualityTier::Ultra => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            QualityTier::Low => "low",
            QualityTier::Medium => "medium",
            QualityTier::High => "high",
            QualityTier::Ultra => "ultra",
        }
    }
}

impl FromStr for QualityTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(QualityTier::Low),
            "medium" => Ok(QualityTier::Medium),
            "high" => Ok(QualityTier::High),
            "ultra" => Ok(QualityTier::Ultra),
            other => Err(format!("unknown quality tier `{}`", other)),
        }
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Coarse facts about the host device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceHints {
    /// Logical CPU cores.
    pub logical_cores: usize,
    /// Physical pixels per logical pixel.
    pub pixel_ratio: f32,
    /// Touch-first / handheld device.
    pub is_mobile: bool,
    /// User asked for reduced motion.
    pub reduced_motion: bool,
}

impl DeviceHints {
    /// Gather hints from the running process and, if available, the window.
    ///
    /// Motion reduction comes from `CHOREO_REDUCED_MOTION`; there is no
    /// portable OS query for it.
    pub fn probe(window: Option<&winit::window::Window>) -> Self {
        let logical_cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let pixel_ratio = window.map(|w| w.scale_factor() as f32).unwrap_or(1.0);
        let is_mobile = cfg!(any(target_os = "android", target_os = "ios"));
        let reduced_motion = env_flag(ENV_REDUCED_MOTION);

        Self {
            logical_cores,
            pixel_ratio,
            is_mobile,
            reduced_motion,
        }
    }

    /// Tier for these hints, honoring a `CHOREO_TIER` override.
    pub fn tier(&self) -> QualityTier {
        match std::env::var(ENV_TIER) {
            Ok(value) => match value.parse::<QualityTier>() {
                Ok(tier) => {
                    log::info!("quality tier forced to {} by {}", tier, ENV_TIER);
                    tier
                }
                Err(e) => {
                    log::warn!("ignoring {}: {}", ENV_TIER, e);
                    QualityTier::detect(self)
                }
            },
            Err(_) => QualityTier::detect(self),
        }
    }
}

impl Default for DeviceHints {
    fn default() -> Self {
        Self {
            logical_cores: 8,
            pixel_ratio: 1.0,
            is_mobile: false,
            reduced_motion: false,
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
