//! Scalar functions of time used to drive trajectories (distance, angle,
//! speed).

use serde::{Deserialize, Serialize};

/// How sharply [`TimeFunction::Decay`] falls off. Larger is a faster initial
/// drop.
const DECAY_SHARPNESS: f32 = 5.0;

/// Number of Simpson slices for numeric integration. Must be even.
const INTEGRATION_SLICES: usize = 32;

/// One segment of a [`TimeFunction::Piecewise`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Time at which this segment takes over. The segment's function is
    /// evaluated with `time - start`.
    pub start: f32,
    pub function: TimeFunction,
}

/// A scalar function of time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TimeFunction {
    Constant(f32),
    /// `c[0] + c[1]·t + c[2]·t² + ...`
    Polynomial(Vec<f32>),
    Sine {
        amplitude: f32,
        /// Cycles per second.
        frequency: f32,
        phase: f32,
        offset: f32,
    },
    /// Eases from `initial` to `target`, arriving exactly at `settle_time` and
    /// holding `target` afterwards. The approach is exponential, so most of
    /// the change happens early.
    Decay {
        initial: f32,
        target: f32,
        settle_time: f32,
    },
    /// Segments ordered by `start`. Times before the first segment use the
    /// first segment.
    Piecewise(Vec<Segment>),
}

impl TimeFunction {
    /// `value(t) = initial + rate·t`.
    pub fn linear(initial: f32, rate: f32) -> Self {
        Self::Polynomial(vec![initial, rate])
    }

    pub fn value(&self, time: f32) -> f32 {
        match self {
            Self::Constant(c) => *c,
            Self::Polynomial(coefficients) => coefficients
                .iter()
                .rev()
                .fold(0.0, |acc, c| acc * time + c),
            Self::Sine {
                amplitude,
                frequency,
                phase,
                offset,
            } => offset + amplitude * (std::f32::consts::TAU * frequency * time + phase).sin(),
            Self::Decay {
                initial,
                target,
                settle_time,
            } => {
                if *settle_time <= 0.0 || time >= *settle_time {
                    return *target;
                }
                let u = (time / settle_time).max(0.0);
                let floor = (-DECAY_SHARPNESS).exp();
                let weight = ((-DECAY_SHARPNESS * u).exp() - floor) / (1.0 - floor);
                target + (initial - target) * weight
            }
            Self::Piecewise(segments) => match Self::active_segment(segments, time) {
                Some(segment) => segment.function.value(time - segment.start),
                None => 0.0,
            },
        }
    }

    /// Integral of the function over `[from, to]`.
    pub fn integrate(&self, from: f32, to: f32) -> f32 {
        match self {
            Self::Constant(c) => c * (to - from),
            Self::Polynomial(coefficients) => {
                let antiderivative = |t: f32| {
                    coefficients
                        .iter()
                        .enumerate()
                        .rev()
                        .fold(0.0, |acc, (i, c)| acc * t + c / (i as f32 + 1.0))
                        * t
                };
                antiderivative(to) - antiderivative(from)
            }
            _ => self.simpson(from, to),
        }
    }

    fn simpson(&self, from: f32, to: f32) -> f32 {
        if from == to {
            return 0.0;
        }
        let h = (to - from) / INTEGRATION_SLICES as f32;
        let mut sum = self.value(from) + self.value(to);
        for i in 1..INTEGRATION_SLICES {
            let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
            sum += weight * self.value(from + h * i as f32);
        }
        sum * h / 3.0
    }

    fn active_segment(segments: &[Segment], time: f32) -> Option<&Segment> {
        let index = segments
            .partition_point(|s| s.start <= time)
            .saturating_sub(1);
        segments.get(index)
    }
}

impl Default for TimeFunction {
    fn default() -> Self {
        Self::Constant(0.0)
    }
}
