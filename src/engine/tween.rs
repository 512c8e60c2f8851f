//! Tweens driving gear values over time.

use tracing::trace;

use super::ease::{evaluate, EaseType, PathPoint};
use crate::component::TweenConfig;
use crate::util::lerp;

/// Up to four interpolated channels.
pub type Channels = [f32; 4];

/// A running interpolation between two channel sets.
#[derive(Clone, Debug, PartialEq)]
pub struct Tween {
    from: Channels,
    to: Channels,
    ease: EaseType,
    path: Vec<PathPoint>,
    duration: f32,
    delay: f32,
    elapsed: f32,
    value: Channels,
}

impl Tween {
    pub fn new(from: Channels, to: Channels, config: &TweenConfig) -> Self {
        Self {
            from,
            to,
            ease: config.ease,
            path: config.custom_path.clone(),
            duration: config.duration.max(0.0),
            delay: config.delay.max(0.0),
            elapsed: 0.0,
            value: from,
        }
    }

    pub fn start(&self) -> Channels {
        self.from
    }

    pub fn end(&self) -> Channels {
        self.to
    }

    /// Current interpolated value.
    pub fn value(&self) -> Channels {
        self.value
    }

    /// Advance by `dt` seconds. Returns `true` once the tween has finished,
    /// at which point [`value`](Self::value) equals the end value exactly.
    pub fn advance(&mut self, dt: f32) -> bool {
        self.elapsed += dt.max(0.0);
        if self.elapsed < self.delay {
            return false;
        }
        let t = if self.duration > 0.0 {
            (self.elapsed - self.delay) / self.duration
        } else {
            1.0
        };
        if t >= 1.0 {
            self.value = self.to;
            return true;
        }
        let k = evaluate(self.ease, t, &self.path);
        for i in 0..4 {
            self.value[i] = lerp(self.from[i], self.to[i], k);
        }
        trace!("tween t={:.3} value={:?}", t, self.value);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ease: EaseType, duration: f32, delay: f32) -> TweenConfig {
        TweenConfig { ease, duration, delay, custom_path: Vec::new() }
    }

    #[test]
    fn test_snaps_exactly_to_end() {
        let to = [0.1, 0.7, 1.0 / 3.0, 99.9];
        let mut t = Tween::new([0.0; 4], to, &config(EaseType::SineInOut, 0.3, 0.0));
        let mut done = false;
        for _ in 0..7 {
            done = t.advance(0.05);
        }
        assert!(done);
        assert_eq!(t.value(), to);
    }

    #[test]
    fn test_delay_holds_start() {
        let mut t = Tween::new([10.0, 0.0, 0.0, 0.0], [20.0, 0.0, 0.0, 0.0], &config(EaseType::Linear, 1.0, 0.5));
        assert!(!t.advance(0.4));
        assert_eq!(t.value()[0], 10.0);
        assert!(!t.advance(0.6));
        assert!((t.value()[0] - 15.0).abs() < 1e-4);
        assert!(t.advance(0.5));
        assert_eq!(t.value()[0], 20.0);
    }

    #[test]
    fn test_zero_duration_finishes_immediately() {
        let mut t = Tween::new([0.0; 4], [1.0; 4], &config(EaseType::Linear, 0.0, 0.0));
        assert!(t.advance(0.0));
        assert_eq!(t.value(), [1.0; 4]);
    }
}
