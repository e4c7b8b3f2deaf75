use std::cell::RefCell;
use std::ops::RangeInclusive;
use std::rc::Rc;

use crate::math::cubicsegment::CubicSegment;
use crate::math::curve::curve::Curve;
use crate::ramp::rampparameters::{
    RampParameters,
    BOUNDARY_NAMES
};
use crate::ramp::waveformerror::{
    RampEdge,
    WaveformError
};

pub const NR_BOUNDARIES: usize = 8;

/// Smallest rampup start index that leaves room for `i0 >= 1` below it.
pub const MIN_RAMPUP_START_INDEX: usize = 2;

// ─────────────────────────────────────────────────────────────────────────────
// RegionModel
// ─────────────────────────────────────────────────────────────────────────────
//
// The 8 boundaries split [0, N) into 9 regions:
//
//   region  0     1     2      3     4      5     6      7     8
//   kind   line cubic line  cubic  line  cubic  line  cubic  line
//   span  [0,i0)[i0,i1)[i1,i2)[i2,i3)[i3,i4)[i4,i5)[i5,i6)[i6,i7)[i7,N)
//
// Region r starts at anchor value r (vL, v0, ..., v7) and ends at the next
// one (vR after region 8). Lines carry the natural slopes D0, D2, D4, D6, D8;
// each cubic is fitted to the slopes of the two lines around it, so value
// and slope are continuous everywhere.

#[derive(Clone, Debug)]
struct RegionModel {
    edges: [usize; NR_BOUNDARIES + 2],
    anchors: [f64; NR_BOUNDARIES + 1],
    slopes: [f64; 5],
    transitions: [CubicSegment; 4],
    scale: f64,
}

fn linear_slope(dv: f64, length: usize) -> f64 {
    if length == 0 {
        0.0
    } else {
        dv / length as f64
    }
}

impl RegionModel {
    fn new(param: &WaveformParam) -> RegionModel {
        let mut edges = [0; NR_BOUNDARIES + 2];
        edges[1..=NR_BOUNDARIES].copy_from_slice(&param.indices);
        edges[NR_BOUNDARIES + 1] = param.wfm_nrpoints;

        let mut anchors = [0.0; NR_BOUNDARIES + 1];
        anchors[0] = param.start_value;
        anchors[1..].copy_from_slice(&param.values);

        let region_len = |r: usize| edges[r + 1] - edges[r];
        let region_dv = |r: usize| {
            let end = if r < NR_BOUNDARIES { anchors[r + 1] } else { param.stop_value };
            end - anchors[r]
        };

        let mut slopes = [0.0; 5];
        for (j, slope) in slopes.iter_mut().enumerate() {
            *slope = linear_slope(region_dv(2 * j), region_len(2 * j));
        }

        let transitions = std::array::from_fn(|j| {
            let r = 2 * j + 1;
            CubicSegment::fit(region_len(r) as f64, region_dv(r), slopes[j], slopes[j + 1])
        });

        RegionModel { edges, anchors, slopes, transitions, scale: param.scale }
    }

    fn region(&self, x: f64) -> usize {
        let count = self.edges.partition_point(|&e| e as f64 <= x);
        count.clamp(1, NR_BOUNDARIES + 1) - 1
    }

    fn sample(&self, nrpoints: usize) -> Vec<f64> {
        (0..nrpoints).map(|t| self.value(t as f64)).collect()
    }
}

impl Curve for RegionModel {
    fn value(&self, x: f64) -> f64 {
        let r = self.region(x);
        let local = x - self.edges[r] as f64;
        let delta = if r % 2 == 0 {
            self.slopes[r / 2] * local
        } else {
            self.transitions[r / 2].value(local)
        };
        self.scale * (self.anchors[r] + delta)
    }

    fn derivative(&self, x: f64) -> f64 {
        let r = self.region(x);
        let local = x - self.edges[r] as f64;
        let slope = if r % 2 == 0 {
            self.slopes[r / 2]
        } else {
            self.transitions[r / 2].derivative(local)
        };
        self.scale * slope
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// WaveformParam
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Sampled {
    model: RegionModel,
    waveform: Vec<f64>,
}

#[derive(Clone, Debug)]
enum CacheState {
    Stale,
    Fresh(Rc<Sampled>),
}

/// Arguments of `rampup_change`/`rampdown_change`; `None` keeps the current
/// value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RampChange {
    pub start_index: Option<usize>,
    pub stop_index: Option<usize>,
    pub start_value: Option<f64>,
    pub stop_value: Option<f64>,
}

/// Parameterized ramp: 8 boundary indices and values over `wfm_nrpoints`
/// samples.
///
/// Every mutation marks the sampled waveform stale and bumps `revision()`;
/// the waveform and the region coefficients are recomputed on the next read
/// (or eagerly by `update()`). Rejected mutations leave the object untouched.
#[derive(Clone, Debug)]
pub struct WaveformParam {
    scale: f64,
    start_value: f64,
    stop_value: f64,
    indices: [usize; NR_BOUNDARIES],
    values: [f64; NR_BOUNDARIES],
    wfm_nrpoints: usize,
    duration: f64,
    revision: u64,
    state: RefCell<CacheState>,
}

impl Default for WaveformParam {
    fn default() -> Self {
        let params = RampParameters::default();
        WaveformParam {
            scale: 1.0,
            start_value: params.start_value,
            stop_value: params.stop_value,
            indices: params.boundary_indices,
            values: params.boundary_values,
            wfm_nrpoints: params.wfm_nrpoints,
            duration: params.duration,
            revision: 0,
            state: RefCell::new(CacheState::Stale),
        }
    }
}

impl WaveformParam {
    pub fn new(
        scale: f64,
        start_value: f64,
        stop_value: f64,
        boundary_indices: [usize; NR_BOUNDARIES],
        boundary_values: [f64; NR_BOUNDARIES],
        wfm_nrpoints: usize,
        duration: f64,
    ) -> Result<WaveformParam, WaveformError> {
        let params = RampParameters {
            start_value,
            stop_value,
            boundary_indices,
            boundary_values,
            wfm_nrpoints,
            duration,
        };
        WaveformParam::from_parameters(scale, &params)
    }

    pub fn from_parameters(scale: f64, params: &RampParameters) -> Result<WaveformParam, WaveformError> {
        params.validate()?;
        if !scale.is_finite() {
            return Err(WaveformError::InvalidParameters(format!("scale {} is not finite", scale)));
        }
        Ok(WaveformParam {
            scale,
            start_value: params.start_value,
            stop_value: params.stop_value,
            indices: params.boundary_indices,
            values: params.boundary_values,
            wfm_nrpoints: params.wfm_nrpoints,
            duration: params.duration,
            revision: 0,
            state: RefCell::new(CacheState::Stale),
        })
    }

    pub fn parameters(&self) -> RampParameters {
        RampParameters {
            start_value: self.start_value,
            stop_value: self.stop_value,
            boundary_indices: self.indices,
            boundary_values: self.values,
            wfm_nrpoints: self.wfm_nrpoints,
            duration: self.duration,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn wfm_nrpoints(&self) -> usize {
        self.wfm_nrpoints
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_stale(&self) -> bool {
        matches!(*self.state.borrow(), CacheState::Stale)
    }

    pub fn boundary_indices(&self) -> [usize; NR_BOUNDARIES] {
        self.indices
    }

    pub fn boundary_values(&self) -> [f64; NR_BOUNDARIES] {
        self.values
    }

    // ── sampled curve ───────────────────────────────────────────────────────

    /// The sampled waveform, `wfm_nrpoints` values multiplied by `scale`.
    pub fn waveform(&self) -> Vec<f64> {
        self.sampled().waveform.clone()
    }

    /// Continuous evaluation of the piecewise model at a fractional sample
    /// position.
    pub fn value_at(&self, position: f64) -> f64 {
        self.sampled().model.value(position)
    }

    /// Slope per sample of the piecewise model at `position`.
    pub fn slope_at(&self, position: f64) -> f64 {
        self.sampled().model.derivative(position)
    }

    /// Natural slopes `[D0, D2, D4, D6, D8]` of the linear regions, unscaled.
    pub fn linear_slopes(&self) -> [f64; 5] {
        self.sampled().model.slopes
    }

    /// Recomputes the region coefficients and the sampled waveform now.
    pub fn update(&self) {
        self.recompute();
    }

    fn recompute(&self) -> Rc<Sampled> {
        let model = RegionModel::new(self);
        let waveform = model.sample(self.wfm_nrpoints);
        tracing::trace!(revision = self.revision, "ramp waveform recomputed");
        let sampled = Rc::new(Sampled { model, waveform });
        *self.state.borrow_mut() = CacheState::Fresh(Rc::clone(&sampled));
        sampled
    }

    fn sampled(&self) -> Rc<Sampled> {
        if let CacheState::Fresh(sampled) = &*self.state.borrow() {
            return Rc::clone(sampled);
        }
        self.recompute()
    }

    fn invalidate(&mut self) {
        self.revision += 1;
        *self.state.get_mut() = CacheState::Stale;
    }

    /// Checks whether the current parameters form a valid ramp: the curve
    /// samples to finite values and both ramp edges can be re-derived
    /// without overshoot. The object itself is not modified.
    pub fn check(&self) -> bool {
        let mut trial = self.clone();
        trial.update();
        if !trial.sampled().waveform.iter().all(|v| v.is_finite()) {
            return false;
        }
        trial.rampup_change(RampChange::default()).is_ok()
            && trial.rampdown_change(RampChange::default()).is_ok()
    }

    // ── named landmarks ─────────────────────────────────────────────────────

    pub fn start_value(&self) -> f64 {
        self.start_value
    }

    pub fn rampup_start_index(&self) -> usize {
        self.indices[1]
    }

    pub fn rampup_start_value(&self) -> f64 {
        self.values[1]
    }

    pub fn rampup_stop_index(&self) -> usize {
        self.indices[2]
    }

    pub fn rampup_stop_value(&self) -> f64 {
        self.values[2]
    }

    pub fn plateau_start_index(&self) -> usize {
        self.indices[3]
    }

    pub fn plateau_stop_index(&self) -> usize {
        self.indices[4]
    }

    pub fn plateau_value(&self) -> f64 {
        self.values[3]
    }

    pub fn rampdown_start_index(&self) -> usize {
        self.indices[5]
    }

    pub fn rampdown_start_value(&self) -> f64 {
        self.values[5]
    }

    pub fn rampdown_stop_index(&self) -> usize {
        self.indices[6]
    }

    pub fn rampdown_stop_value(&self) -> f64 {
        self.values[6]
    }

    pub fn stop_value(&self) -> f64 {
        self.stop_value
    }

    pub fn set_start_value(&mut self, value: f64) -> Result<(), WaveformError> {
        Self::check_finite(value)?;
        self.start_value = value;
        self.invalidate();
        Ok(())
    }

    pub fn set_rampup_start_index(&mut self, index: usize) -> Result<(), WaveformError> {
        self.set_index(1, index)
    }

    pub fn set_rampup_start_value(&mut self, value: f64) -> Result<(), WaveformError> {
        self.set_value(1, value)
    }

    pub fn set_rampup_stop_index(&mut self, index: usize) -> Result<(), WaveformError> {
        self.set_index(2, index)
    }

    pub fn set_rampup_stop_value(&mut self, value: f64) -> Result<(), WaveformError> {
        self.set_value(2, value)
    }

    pub fn set_plateau_start_index(&mut self, index: usize) -> Result<(), WaveformError> {
        self.set_index(3, index)
    }

    pub fn set_plateau_stop_index(&mut self, index: usize) -> Result<(), WaveformError> {
        self.set_index(4, index)
    }

    /// Sets both plateau boundary values. The plateau must stay the maximum
    /// of the curve: it may not drop below the rampup stop value nor the
    /// rampdown start value.
    pub fn set_plateau_value(&mut self, value: f64) -> Result<(), WaveformError> {
        Self::check_finite(value)?;
        for adjacent in [self.values[2], self.values[5]] {
            if value < adjacent {
                return Err(WaveformError::InvalidPlateau { value, adjacent });
            }
        }
        self.values[3] = value;
        self.values[4] = value;
        self.invalidate();
        Ok(())
    }

    pub fn set_rampdown_start_index(&mut self, index: usize) -> Result<(), WaveformError> {
        self.set_index(5, index)
    }

    pub fn set_rampdown_start_value(&mut self, value: f64) -> Result<(), WaveformError> {
        self.set_value(5, value)
    }

    pub fn set_rampdown_stop_index(&mut self, index: usize) -> Result<(), WaveformError> {
        self.set_index(6, index)
    }

    pub fn set_rampdown_stop_value(&mut self, value: f64) -> Result<(), WaveformError> {
        self.set_value(6, value)
    }

    pub fn set_stop_value(&mut self, value: f64) -> Result<(), WaveformError> {
        Self::check_finite(value)?;
        self.stop_value = value;
        self.invalidate();
        Ok(())
    }

    // Neighbouring boundaries stay strictly ordered: every region between
    // two boundaries keeps at least one sample.
    fn set_index(&mut self, k: usize, index: usize) -> Result<(), WaveformError> {
        let lower = if k == 0 { 0 } else { self.indices[k - 1] + 1 };
        let upper = if k + 1 == NR_BOUNDARIES {
            self.wfm_nrpoints
        } else {
            self.indices[k + 1].saturating_sub(1)
        };
        if index < lower || index > upper {
            return Err(WaveformError::InvalidBoundary {
                name: BOUNDARY_NAMES[k],
                index,
                lower,
                upper,
            });
        }
        self.indices[k] = index;
        self.invalidate();
        Ok(())
    }

    fn set_value(&mut self, k: usize, value: f64) -> Result<(), WaveformError> {
        Self::check_finite(value)?;
        self.values[k] = value;
        self.invalidate();
        Ok(())
    }

    fn check_finite(value: f64) -> Result<(), WaveformError> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(WaveformError::InvalidParameters(format!("value {} is not finite", value)))
        }
    }

    // ── ramp edits ──────────────────────────────────────────────────────────

    /// Moves the linear rampup region to `(i1, v1) -> (i2, v2)` and re-derives
    /// `i0` and `i3` so that the transitions on both sides stay monotonic.
    ///
    /// Among the admissible boundaries the one closest to the current value
    /// is kept, so an edit only moves what it has to.
    pub fn rampup_change(&mut self, change: RampChange) -> Result<(), WaveformError> {
        let edge = RampEdge::Up;
        let i1 = change.start_index.unwrap_or(self.indices[1]);
        let i2 = change.stop_index.unwrap_or(self.indices[2]);
        let v1 = change.start_value.unwrap_or(self.values[1]);
        let v2 = change.stop_value.unwrap_or(self.values[2]);

        if !v1.is_finite() || !v2.is_finite() {
            return Err(WaveformError::ramp(edge, "values must be finite"));
        }
        if i1 < MIN_RAMPUP_START_INDEX {
            return Err(WaveformError::ramp(
                edge,
                format!("start index {} below {}", i1, MIN_RAMPUP_START_INDEX),
            ));
        }
        if i2 <= i1 {
            return Err(WaveformError::ramp(edge, format!("stop index {} not after start index {}", i2, i1)));
        }
        if i2 >= self.plateau_stop_index() {
            return Err(WaveformError::ramp(
                edge,
                format!("stop index {} not before plateau stop {}", i2, self.plateau_stop_index()),
            ));
        }
        if v1 >= v2 {
            return Err(WaveformError::ramp(edge, format!("start value {} not below stop value {}", v1, v2)));
        }
        if v1 <= self.start_value {
            return Err(WaveformError::ramp(
                edge,
                format!("start value {} not above waveform start {}", v1, self.start_value),
            ));
        }
        if v2 >= self.plateau_value() {
            return Err(WaveformError::ramp(
                edge,
                format!("stop value {} not below plateau {}", v2, self.plateau_value()),
            ));
        }

        let d2 = (v2 - v1) / (i2 - i1) as f64;
        let (v_l, v0) = (self.start_value, self.values[0]);
        let (v3, i4, v4) = (self.values[3], self.indices[4], self.values[4]);
        let (i5, v5) = (self.indices[5], self.values[5]);
        let d6 = linear_slope(self.values[6] - v5, self.indices[6] - i5);

        // i3 sets the plateau slope, which the rampdown transition starts from
        let i3 = search_boundary(3, (i2 + 1)..=(i4 - 1), self.indices[3], |k| {
            let d4 = linear_slope(v4 - v3, i4 - k);
            CubicSegment::fit((k - i2) as f64, v3 - v2, d2, d4).is_monotonic()
                && CubicSegment::fit((i5 - i4) as f64, v5 - v4, d4, d6).is_monotonic()
        })?;
        let i0 = search_boundary(0, 1..=(i1 - 1), self.indices[0], |k| {
            CubicSegment::fit((i1 - k) as f64, v1 - v0, linear_slope(v0 - v_l, k), d2).is_monotonic()
        })?;

        self.indices[..4].copy_from_slice(&[i0, i1, i2, i3]);
        self.values[1] = v1;
        self.values[2] = v2;
        self.invalidate();
        tracing::debug!(i0, i1, i2, i3, v1, v2, "rampup changed");
        Ok(())
    }

    /// Moves the linear rampdown region to `(i5, v5) -> (i6, v6)` and
    /// re-derives `i4` and `i7`, mirroring `rampup_change`.
    pub fn rampdown_change(&mut self, change: RampChange) -> Result<(), WaveformError> {
        let edge = RampEdge::Down;
        let n = self.wfm_nrpoints;
        let i5 = change.start_index.unwrap_or(self.indices[5]);
        let i6 = change.stop_index.unwrap_or(self.indices[6]);
        let v5 = change.start_value.unwrap_or(self.values[5]);
        let v6 = change.stop_value.unwrap_or(self.values[6]);

        if !v5.is_finite() || !v6.is_finite() {
            return Err(WaveformError::ramp(edge, "values must be finite"));
        }
        if i5 <= self.plateau_start_index() {
            return Err(WaveformError::ramp(
                edge,
                format!("start index {} not after plateau start {}", i5, self.plateau_start_index()),
            ));
        }
        if i6 <= i5 {
            return Err(WaveformError::ramp(edge, format!("stop index {} not after start index {}", i6, i5)));
        }
        if i6 + 1 >= n {
            return Err(WaveformError::ramp(
                edge,
                format!("stop index {} leaves no room before sample {}", i6, n),
            ));
        }
        if v5 <= v6 {
            return Err(WaveformError::ramp(edge, format!("start value {} not above stop value {}", v5, v6)));
        }
        if v6 <= self.stop_value {
            return Err(WaveformError::ramp(
                edge,
                format!("stop value {} not above waveform stop {}", v6, self.stop_value),
            ));
        }
        if v5 >= self.plateau_value() {
            return Err(WaveformError::ramp(
                edge,
                format!("start value {} not below plateau {}", v5, self.plateau_value()),
            ));
        }

        let d6 = (v6 - v5) / (i6 - i5) as f64;
        let (i3, v3, v4) = (self.indices[3], self.values[3], self.values[4]);
        let (v7, v_r) = (self.values[7], self.stop_value);
        let (i2, v2) = (self.indices[2], self.values[2]);
        let d2 = linear_slope(v2 - self.values[1], i2 - self.indices[1]);

        // i4 sets the plateau slope, which the rampup transition ends on
        let i4 = search_boundary(4, (i3 + 1)..=(i5 - 1), self.indices[4], |k| {
            let d4 = linear_slope(v4 - v3, k - i3);
            CubicSegment::fit((i5 - k) as f64, v5 - v4, d4, d6).is_monotonic()
                && CubicSegment::fit((i3 - i2) as f64, v3 - v2, d2, d4).is_monotonic()
        })?;
        let i7 = search_boundary(7, (i6 + 1)..=(n - 1), self.indices[7], |k| {
            CubicSegment::fit((k - i6) as f64, v7 - v6, d6, linear_slope(v_r - v7, n - k)).is_monotonic()
        })?;

        self.indices[4..].copy_from_slice(&[i4, i5, i6, i7]);
        self.values[5] = v5;
        self.values[6] = v6;
        self.invalidate();
        tracing::debug!(i4, i5, i6, i7, v5, v6, "rampdown changed");
        Ok(())
    }
}

/// Scans `candidates` for boundary `k` and returns the admissible candidate
/// closest to `previous` (the lowest one on ties). A candidate is admissible
/// when every transition it reshapes stays monotonic.
fn search_boundary(
    k: usize,
    candidates: RangeInclusive<usize>,
    previous: usize,
    admissible: impl Fn(usize) -> bool,
) -> Result<usize, WaveformError> {
    let (lower, upper) = (*candidates.start(), *candidates.end());
    candidates
        .filter(|&candidate| admissible(candidate))
        .min_by_key(|&candidate| candidate.abs_diff(previous))
        .ok_or_else(|| {
            tracing::warn!(boundary = BOUNDARY_NAMES[k], lower, upper, "no monotonic transition");
            WaveformError::NoSolution { boundary: BOUNDARY_NAMES[k], lower, upper }
        })
}
