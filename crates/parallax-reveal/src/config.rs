//! Reveal configuration

/// Default reveal speed, roughly 15 ms per character
pub const DEFAULT_CHARS_PER_SECOND: f32 = 66.0;

#[derive(Clone, Debug, PartialEq)]
pub struct RevealConfig {
    /// Characters revealed per second of tick time
    pub chars_per_second: f32,
}

impl Default for RevealConfig {
    fn default() -> Self {
        RevealConfig {
            chars_per_second: DEFAULT_CHARS_PER_SECOND,
        }
    }
}

impl RevealConfig {
    /// Near-instant reveal for reduced-motion viewers
    pub fn instant() -> Self {
        RevealConfig {
            chars_per_second: 10_000.0,
        }
    }

    /// `rate` if usable, otherwise the configured speed
    pub fn effective_rate(&self, rate: Option<f32>) -> f32 {
        match rate {
            Some(r) if r.is_finite() && r > 0.0 => r,
            Some(r) => {
                tracing::warn!(rate = r, "unusable reveal rate, using configured speed");
                self.chars_per_second
            }
            None => self.chars_per_second,
        }
    }
}
