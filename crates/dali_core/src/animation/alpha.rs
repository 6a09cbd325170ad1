//! Alpha functions map linear progress to eased progress.

use crate::foundation::math::constants::{PI, TAU};

/// Easing curve applied to animator progress
#[derive(Debug, Clone, Copy, Default)]
pub enum AlphaFunction {
    /// No easing
    #[default]
    Linear,
    /// Starts slow (cubic)
    EaseIn,
    /// Ends slow (cubic)
    EaseOut,
    /// Starts and ends slow (smoothstep)
    EaseInOut,
    /// Runs from 1 down to 0
    Reverse,
    /// Goes out to 1 and back to 0
    Bounce,
    /// One full sine wave centred on 0.5
    Sin,
    /// User supplied curve
    Custom(fn(f32) -> f32),
}

impl AlphaFunction {
    /// Eased value of `progress` in `[0, 1]`
    pub fn apply(self, progress: f32) -> f32 {
        match self {
            Self::Linear => progress,
            Self::EaseIn => progress * progress * progress,
            Self::EaseOut => {
                let p = progress - 1.0;
                p * p * p + 1.0
            }
            Self::EaseInOut => progress * progress * (3.0 - 2.0 * progress),
            Self::Reverse => 1.0 - progress,
            Self::Bounce => (progress * PI).sin(),
            Self::Sin => 0.5 - (progress * TAU).cos() * 0.5,
            Self::Custom(f) => f(progress),
        }
    }
}
