//! Runtime configuration

use std::time::Duration;

use parallax_reveal::RevealConfig;
use parallax_time::SchedulerConfig;
use parallax_visual::Easing;

/// Transition timing
#[derive(Clone, Debug)]
pub struct TransitionConfig {
    /// Minimum time between two admitted transitions
    pub debounce: Duration,
    /// Upper bound on waiting for camera and reveal
    pub animate_timeout: Duration,
    /// Upper bound on waiting for the new scene's first paint
    pub settle_timeout: Duration,
    /// Length of the camera move toward the target
    pub camera_duration: Duration,
    pub camera_easing: Easing,
    pub reveal: RevealConfig,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        TransitionConfig {
            debounce: Duration::from_millis(300),
            animate_timeout: Duration::from_millis(3000),
            settle_timeout: Duration::from_millis(500),
            camera_duration: Duration::from_millis(1200),
            camera_easing: Easing::EaseInOutCubic,
            reveal: RevealConfig::default(),
        }
    }
}

impl TransitionConfig {
    /// Cuts instead of flights, text shown at once
    pub fn reduced_motion() -> Self {
        TransitionConfig {
            camera_duration: Duration::ZERO,
            camera_easing: Easing::Linear,
            reveal: RevealConfig::instant(),
            ..Self::default()
        }
    }
}

/// Everything a [`crate::Viewer`] needs
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub scheduler: SchedulerConfig,
    pub transition: TransitionConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        ViewerConfig {
            scheduler: SchedulerConfig::default(),
            transition: TransitionConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn reduced_motion() -> Self {
        ViewerConfig {
            scheduler: SchedulerConfig::default(),
            transition: TransitionConfig::reduced_motion(),
        }
    }

    /// 120 Hz displays
    pub fn high_refresh() -> Self {
        ViewerConfig {
            scheduler: SchedulerConfig::high_refresh(),
            transition: TransitionConfig::default(),
        }
    }

    pub fn low_power() -> Self {
        ViewerConfig {
            scheduler: SchedulerConfig::low_power(),
            transition: TransitionConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransitionConfig::default();
        assert_eq!(config.debounce, Duration::from_millis(300));
        assert_eq!(config.animate_timeout, Duration::from_secs(3));
        assert_eq!(config.settle_timeout, Duration::from_millis(500));
        assert_eq!(config.reveal.chars_per_second, 66.0);
    }

    #[test]
    fn test_viewer_presets_differ_only_in_tick_rate() {
        let fast = ViewerConfig::high_refresh();
        let slow = ViewerConfig::low_power();
        assert!(fast.scheduler.frame_interval < ViewerConfig::default().scheduler.frame_interval);
        assert!(slow.scheduler.frame_interval > ViewerConfig::default().scheduler.frame_interval);
        assert_eq!(fast.transition.debounce, slow.transition.debounce);
    }

    #[test]
    fn test_reduced_motion_keeps_guards() {
        let config = TransitionConfig::reduced_motion();
        assert!(config.camera_duration.is_zero());
        assert_eq!(config.debounce, TransitionConfig::default().debounce);
        assert!(config.reveal.chars_per_second > 1000.0);
    }
}
