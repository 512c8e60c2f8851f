//! Easing curves for gear tweens.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use crate::util::{lerp, Vec2};

/// Default overshoot for Back curves and amplitude for Elastic curves.
const OVERSHOOT: f32 = 1.70158;

/// Easing curve of a gear tween.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EaseType {
    Linear = 0,
    SineIn,
    SineOut,
    SineInOut,
    QuadIn,
    #[default]
    QuadOut,
    QuadInOut,
    CubicIn,
    CubicOut,
    CubicInOut,
    QuartIn,
    QuartOut,
    QuartInOut,
    QuintIn,
    QuintOut,
    QuintInOut,
    ExpoIn,
    ExpoOut,
    ExpoInOut,
    CircIn,
    CircOut,
    CircInOut,
    ElasticIn,
    ElasticOut,
    ElasticInOut,
    BackIn,
    BackOut,
    BackInOut,
    BounceIn,
    BounceOut,
    BounceInOut,
    Custom = 31,
}

impl EaseType {
    const ALL: [EaseType; 32] = {
        use EaseType::*;
        [
            Linear, SineIn, SineOut, SineInOut, QuadIn, QuadOut, QuadInOut, CubicIn, CubicOut,
            CubicInOut, QuartIn, QuartOut, QuartInOut, QuintIn, QuintOut, QuintInOut, ExpoIn,
            ExpoOut, ExpoInOut, CircIn, CircOut, CircInOut, ElasticIn, ElasticOut, ElasticInOut,
            BackIn, BackOut, BackInOut, BounceIn, BounceOut, BounceInOut, Custom,
        ]
    };

    /// Decode an ease byte; unknown values fall back to linear.
    pub fn from_u8(v: u8) -> Self {
        Self::ALL.get(v as usize).copied().unwrap_or(Self::Linear)
    }

    /// Whether the curve stays within `[0, 1]` and never moves backwards.
    pub fn is_monotonic(self) -> bool {
        use EaseType::*;
        !matches!(
            self,
            ElasticIn | ElasticOut | ElasticInOut | BackIn | BackOut | BackInOut
                | BounceIn | BounceOut | BounceInOut | Custom
        )
    }
}

/// Anchor of a custom ease path. Control points are not kept.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathPoint {
    pub pos: Vec2,
    /// Curve type tag of the segment starting here.
    pub curve: u8,
}

/// Evaluate `ease` at normalized time `t` in `[0, 1]`.
pub fn evaluate(ease: EaseType, t: f32, path: &[PathPoint]) -> f32 {
    use EaseType::*;

    let t = t.clamp(0.0, 1.0);
    match ease {
        Linear => t,
        SineIn => 1.0 - (t * FRAC_PI_2).cos(),
        SineOut => (t * FRAC_PI_2).sin(),
        SineInOut => -0.5 * ((PI * t).cos() - 1.0),
        QuadIn => t * t,
        QuadOut => -t * (t - 2.0),
        QuadInOut => in_out(t, |t| t * t, |t| -((t - 1.0) * (t - 3.0) - 1.0)),
        CubicIn => t.powi(3),
        CubicOut => (t - 1.0).powi(3) + 1.0,
        CubicInOut => in_out(t, |t| t.powi(3), |t| (t - 2.0).powi(3) + 2.0),
        QuartIn => t.powi(4),
        QuartOut => 1.0 - (t - 1.0).powi(4),
        QuartInOut => in_out(t, |t| t.powi(4), |t| 2.0 - (t - 2.0).powi(4)),
        QuintIn => t.powi(5),
        QuintOut => (t - 1.0).powi(5) + 1.0,
        QuintInOut => in_out(t, |t| t.powi(5), |t| (t - 2.0).powi(5) + 2.0),
        ExpoIn => if t == 0.0 { 0.0 } else { 2f32.powf(10.0 * (t - 1.0)) },
        ExpoOut => if t == 1.0 { 1.0 } else { 1.0 - 2f32.powf(-10.0 * t) },
        ExpoInOut => {
            if t == 0.0 || t == 1.0 {
                t
            } else {
                in_out(t, |t| 2f32.powf(10.0 * (t - 1.0)), |t| 2.0 - 2f32.powf(-10.0 * (t - 1.0)))
            }
        }
        CircIn => 1.0 - (1.0 - t * t).sqrt(),
        CircOut => (1.0 - (t - 1.0) * (t - 1.0)).sqrt(),
        CircInOut => in_out(
            t,
            |t| 1.0 - (1.0 - t * t).sqrt(),
            |t| (1.0 - (t - 2.0) * (t - 2.0)).sqrt() + 1.0,
        ),
        ElasticIn => elastic_in(t, 0.3),
        ElasticOut => elastic_out(t, 0.3),
        ElasticInOut => {
            let period = 0.3 * 1.5;
            if t == 0.0 || t == 1.0 {
                t
            } else if t < 0.5 {
                elastic_in(t * 2.0, period) * 0.5
            } else {
                elastic_out(t * 2.0 - 1.0, period) * 0.5 + 0.5
            }
        }
        BackIn => t * t * ((OVERSHOOT + 1.0) * t - OVERSHOOT),
        BackOut => {
            let t = t - 1.0;
            t * t * ((OVERSHOOT + 1.0) * t + OVERSHOOT) + 1.0
        }
        BackInOut => {
            let s = OVERSHOOT * 1.525;
            in_out(
                t,
                |t| t * t * ((s + 1.0) * t - s),
                |t| {
                    let t = t - 2.0;
                    t * t * ((s + 1.0) * t + s) + 2.0
                },
            )
        }
        BounceIn => 1.0 - bounce_out(1.0 - t),
        BounceOut => bounce_out(t),
        BounceInOut => {
            if t < 0.5 {
                (1.0 - bounce_out(1.0 - t * 2.0)) * 0.5
            } else {
                bounce_out(t * 2.0 - 1.0) * 0.5 + 0.5
            }
        }
        Custom => evaluate_path(path, t),
    }
}

/// Split an in-out curve: `first` and `second` see time scaled to `[0, 2]`
/// and return values in `[0, 2]`.
#[inline]
fn in_out(t: f32, first: impl Fn(f32) -> f32, second: impl Fn(f32) -> f32) -> f32 {
    let t2 = t * 2.0;
    if t2 < 1.0 {
        0.5 * first(t2)
    } else {
        0.5 * second(t2)
    }
}

fn elastic_shift(period: f32) -> f32 {
    period / TAU * (1.0 / OVERSHOOT).asin()
}

fn elastic_in(t: f32, period: f32) -> f32 {
    if t == 0.0 || t == 1.0 {
        return t;
    }
    let s = elastic_shift(period);
    let t = t - 1.0;
    -(OVERSHOOT * 2f32.powf(10.0 * t) * ((t - s) * TAU / period).sin())
}

fn elastic_out(t: f32, period: f32) -> f32 {
    if t == 0.0 || t == 1.0 {
        return t;
    }
    let s = elastic_shift(period);
    OVERSHOOT * 2f32.powf(-10.0 * t) * ((t - s) * TAU / period).sin() + 1.0
}

fn bounce_out(t: f32) -> f32 {
    const N: f32 = 7.5625;
    const D: f32 = 2.75;
    if t < 1.0 / D {
        N * t * t
    } else if t < 2.0 / D {
        let t = t - 1.5 / D;
        N * t * t + 0.75
    } else if t < 2.5 / D {
        let t = t - 2.25 / D;
        N * t * t + 0.9375
    } else {
        let t = t - 2.625 / D;
        N * t * t + 0.984375
    }
}

/// Piecewise-linear evaluation through the path anchors, keyed on x.
fn evaluate_path(path: &[PathPoint], t: f32) -> f32 {
    let (first, last) = match (path.first(), path.last()) {
        (Some(f), Some(l)) if path.len() >= 2 => (f.pos, l.pos),
        _ => return t,
    };
    if t <= first.x {
        return first.y;
    }
    if t >= last.x {
        return last.y;
    }
    for pair in path.windows(2) {
        let (a, b) = (pair[0].pos, pair[1].pos);
        if t >= a.x && t <= b.x {
            let span = b.x - a.x;
            let k = if span > f32::EPSILON { (t - a.x) / span } else { 1.0 };
            return lerp(a.y, b.y, k);
        }
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        for &ease in EaseType::ALL.iter().filter(|&&e| e != EaseType::Custom) {
            assert!(evaluate(ease, 0.0, &[]).abs() < 1e-4, "{:?} at 0", ease);
            assert!((evaluate(ease, 1.0, &[]) - 1.0).abs() < 1e-4, "{:?} at 1", ease);
        }
    }

    #[test]
    fn test_monotonic_curves_stay_in_range() {
        for &ease in EaseType::ALL.iter().filter(|e| e.is_monotonic()) {
            let mut prev = 0.0;
            for i in 0..=100 {
                let v = evaluate(ease, i as f32 / 100.0, &[]);
                assert!(v >= prev - 1e-5, "{:?} moved backwards at {}", ease, i);
                assert!((-1e-5..=1.0 + 1e-5).contains(&v), "{:?} left range at {}", ease, i);
                prev = v;
            }
        }
    }

    #[test]
    fn test_from_u8() {
        assert_eq!(EaseType::from_u8(0), EaseType::Linear);
        assert_eq!(EaseType::from_u8(5), EaseType::QuadOut);
        assert_eq!(EaseType::from_u8(30), EaseType::BounceInOut);
        assert_eq!(EaseType::from_u8(31), EaseType::Custom);
        assert_eq!(EaseType::from_u8(200), EaseType::Linear);
    }

    #[test]
    fn test_custom_path() {
        let p = |x: f32, y: f32| PathPoint { pos: Vec2::new(x, y), curve: 3 };
        let path = [p(0.0, 0.0), p(0.5, 0.8), p(1.0, 1.0)];
        assert_eq!(evaluate(EaseType::Custom, 0.25, &path), 0.4);
        assert!((evaluate(EaseType::Custom, 0.75, &path) - 0.9).abs() < 1e-6);
        assert_eq!(evaluate(EaseType::Custom, 1.0, &path), 1.0);
        assert_eq!(evaluate(EaseType::Custom, 0.3, &[]), 0.3);
    }
}
