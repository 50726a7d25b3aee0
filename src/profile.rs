//! Elevation profiles along routes.
//!
//! A profile is a uniform resampling of a route's per-edge elevation data
//! over `[0, length]`. Edges without elevation samples yield NaN during the
//! raw pass; the gaps are repaired afterwards (boundary gaps by propagating
//! the nearest valid sample, interior gaps by linear interpolation), so a
//! finished profile never contains NaN.

use serde::Serialize;

use crate::route::Route;

/// An immutable uniform elevation profile.
#[derive(Debug, Clone, Serialize)]
pub struct ElevationProfile {
    length: f64,
    samples: Vec<f32>,
}

impl ElevationProfile {
    /// Panics unless `length > 0` and there are at least two samples.
    pub fn new(length: f64, samples: Vec<f32>) -> Self {
        assert!(length > 0.0, "profile length must be positive");
        assert!(samples.len() >= 2, "a profile needs at least two samples");
        Self { length, samples }
    }

    /// Profiled route length in meters.
    #[inline]
    pub fn length(&self) -> f64 {
        self.length
    }

    /// The uniform samples over `[0, length]`.
    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Elevation at a position, clamped to the profile's extent and linearly
    /// interpolated between the neighboring samples.
    pub fn elevation_at(&self, position: f64) -> f64 {
        if position <= 0.0 {
            return f64::from(self.samples[0]);
        }
        if position >= self.length {
            return f64::from(*self.samples.last().unwrap());
        }
        let x = position / self.length * (self.samples.len() - 1) as f64;
        let i = (x.floor() as usize).min(self.samples.len() - 2);
        let frac = x - i as f64;
        f64::from(self.samples[i]) * (1.0 - frac) + f64::from(self.samples[i + 1]) * frac
    }

    /// Lowest sample.
    pub fn min_elevation(&self) -> f64 {
        self.samples.iter().copied().fold(f64::INFINITY, |m, s| m.min(f64::from(s)))
    }

    /// Highest sample.
    pub fn max_elevation(&self) -> f64 {
        self.samples
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, |m, s| m.max(f64::from(s)))
    }

    /// Sum of the positive sample-to-sample deltas, in meters.
    pub fn total_ascent(&self) -> f64 {
        self.samples
            .windows(2)
            .map(|w| f64::from(w[1] - w[0]).max(0.0))
            .sum()
    }

    /// Sum of the negative sample-to-sample deltas, as a non-negative
    /// magnitude in meters.
    pub fn total_descent(&self) -> f64 {
        self.samples
            .windows(2)
            .map(|w| f64::from(w[0] - w[1]).max(0.0))
            .sum()
    }
}

/// Sample `route`'s elevation every at most `max_step_length` meters and
/// repair the gaps. Panics unless `max_step_length > 0`.
pub fn elevation_profile(route: &Route, max_step_length: f64) -> ElevationProfile {
    assert!(max_step_length > 0.0, "step length must be positive");
    let length = route.length();
    assert!(length > 0.0, "cannot profile a zero-length route");
    let sample_count = 1 + (length / max_step_length).ceil() as usize;
    let step = length / (sample_count - 1) as f64;
    let mut samples: Vec<f32> = (0..sample_count)
        .map(|i| route.elevation_at(i as f64 * step) as f32)
        .collect();
    fill_gaps(&mut samples);
    ElevationProfile::new(length, samples)
}

/// Replace NaN runs: leading ones with the first valid sample, trailing ones
/// with the last, interior ones by linear interpolation between their valid
/// neighbors. An all-NaN array (a route with no elevation data at all)
/// becomes all zeros.
fn fill_gaps(samples: &mut [f32]) {
    let Some(first) = samples.iter().position(|s| !s.is_nan()) else {
        samples.fill(0.0);
        return;
    };
    let last = samples.iter().rposition(|s| !s.is_nan()).unwrap();

    let head = samples[first];
    samples[..first].fill(head);
    let tail = samples[last];
    samples[last + 1..].fill(tail);

    let mut i = first;
    while i <= last {
        if !samples[i].is_nan() {
            i += 1;
            continue;
        }
        // Run of NaNs inside [first, last]: both neighbors are valid
        let run_start = i;
        let mut run_end = i;
        while samples[run_end].is_nan() {
            run_end += 1;
        }
        let a = samples[run_start - 1];
        let b = samples[run_end];
        let span = (run_end - run_start + 1) as f32;
        for (k, slot) in samples[run_start..run_end].iter_mut().enumerate() {
            *slot = a + (b - a) * (k as f32 + 1.0) / span;
        }
        i = run_end;
    }
}
