use crate::math::curve::curve::Curve;

/// Roots of the derivative closer than this to a segment end (in samples)
/// are treated as lying on the end itself.
pub const ROOT_TOLERANCE: f64 = 1e-6;

// ─────────────────────────────────────────────
// CubicSegment
// ─────────────────────────────────────────────
//
// Transition segment between two linear regions, in local coordinates
// measured from the left boundary of the segment:
//
//   f(x) = slope*x + b*x^2 + c*x^3
//
// with f(0) = 0, f(d) = dv, f'(0) = left slope, f'(d) = right slope.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CubicSegment {
    slope: f64,
    b: f64,
    c: f64,
    length: f64,
}

impl CubicSegment {
    /// Hermite fit of a segment of length `d` rising by `dv`, with the given
    /// end slopes.
    ///
    ///   v1 = dv - left_slope*d
    ///   v2 = right_slope - left_slope
    ///   b  = 3/d^2 * v1 - 1/d * v2
    ///   c  = -2/d^3 * v1 + 1/d^2 * v2
    ///
    /// `d` must be positive. A zero-length segment is never sampled, so it
    /// degenerates to the straight line with the left slope.
    pub fn fit(d: f64, dv: f64, left_slope: f64, right_slope: f64) -> CubicSegment {
        if d <= 0.0 {
            return CubicSegment { slope: left_slope, b: 0.0, c: 0.0, length: 0.0 };
        }
        let v1 = dv - left_slope * d;
        let v2 = right_slope - left_slope;
        let b = 3.0 / (d * d) * v1 - v2 / d;
        let c = -2.0 / (d * d * d) * v1 + v2 / (d * d);
        CubicSegment { slope: left_slope, b, c, length: d }
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn b(&self) -> f64 {
        self.b
    }

    pub fn c(&self) -> f64 {
        self.c
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    /// Real roots of `f'(x) = slope + 2b*x + 3c*x^2`, smallest first.
    ///
    /// A linear derivative reports its single root twice. `None` means the
    /// derivative never vanishes: constant non-zero, or negative
    /// discriminant.
    pub fn derivative_roots(&self) -> Option<(f64, f64)> {
        let qa = 3.0 * self.c;
        let qb = 2.0 * self.b;
        let qc = self.slope;

        if qa == 0.0 {
            if qb == 0.0 {
                return None;
            }
            let root = -qc / qb;
            return Some((root, root));
        }

        let discriminant = qb * qb - 4.0 * qa * qc;
        if discriminant < 0.0 {
            return None;
        }
        let sqrt_disc = discriminant.sqrt();
        let r1 = (-qb - sqrt_disc) / (2.0 * qa);
        let r2 = (-qb + sqrt_disc) / (2.0 * qa);
        Some((r1.min(r2), r1.max(r2)))
    }

    /// True when no extremum of the cubic falls strictly inside the segment,
    /// i.e. the transition does not overshoot its end values.
    pub fn is_monotonic(&self) -> bool {
        match self.derivative_roots() {
            None => true,
            Some((r1, r2)) => self.is_outside(r1) && self.is_outside(r2),
        }
    }

    fn is_outside(&self, root: f64) -> bool {
        root <= ROOT_TOLERANCE || root >= self.length - ROOT_TOLERANCE
    }
}

impl Curve for CubicSegment {
    fn value(&self, x: f64) -> f64 {
        // Horner: x*(slope + x*(b + x*c))
        x * f64::mul_add(x, f64::mul_add(x, self.c, self.b), self.slope)
    }

    fn derivative(&self, x: f64) -> f64 {
        f64::mul_add(x, f64::mul_add(x, 3.0 * self.c, 2.0 * self.b), self.slope)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{Matrix2, Vector2};

    use super::*;

    #[test]
    fn fit_matches_end_conditions() {
        let seg = CubicSegment::fit(96.0, 0.01607, 4.241e-4, 0.0);
        assert_eq!(seg.value(0.0), 0.0);
        assert_relative_eq!(seg.value(96.0), 0.01607, max_relative = 1e-12);
        assert_relative_eq!(seg.derivative(0.0), 4.241e-4, max_relative = 1e-12);
        assert!(seg.derivative(96.0).abs() < 1e-15);
    }

    #[test]
    fn closed_form_agrees_with_linear_solve() {
        let (d, dv, s0, s1) = (103.0_f64, 0.01625, 0.0, 4.241e-4);
        let a = Matrix2::new(d * d, d * d * d, 2.0 * d, 3.0 * d * d);
        let rhs = Vector2::new(dv - s0 * d, s1 - s0);
        let bc = a.lu().solve(&rhs).unwrap();

        let seg = CubicSegment::fit(d, dv, s0, s1);
        assert_relative_eq!(seg.b(), bc[0], max_relative = 1e-9);
        assert_relative_eq!(seg.c(), bc[1], max_relative = 1e-9);
    }

    #[test]
    fn zero_left_slope_has_root_at_origin() {
        let seg = CubicSegment::fit(50.0, 0.01, 0.0, 5.4e-4);
        let (r1, r2) = seg.derivative_roots().unwrap();
        assert!(r1 == 0.0 || r2 == 0.0);
        assert!(seg.is_monotonic());
    }

    #[test]
    fn steep_right_slope_overshoots() {
        // secant 1e-4, right slope 5.4e-4 > 3 * secant
        let seg = CubicSegment::fit(100.0, 0.01, 0.0, 5.4e-4);
        assert!(!seg.is_monotonic());
        let (_, r2) = seg.derivative_roots().unwrap();
        assert!(r2 > 0.0 && r2 < 100.0);
    }

    #[test]
    fn linear_segment_has_no_roots() {
        let seg = CubicSegment::fit(10.0, 1.0, 0.1, 0.1);
        assert_eq!(seg.c(), 0.0);
        assert_eq!(seg.b(), 0.0);
        assert_eq!(seg.derivative_roots(), None);
        assert!(seg.is_monotonic());
    }

    #[test]
    fn complex_roots_are_accepted() {
        // f'(x) = 1 + 2*0*x + 3*c*x^2 with c > 0 never vanishes
        let seg = CubicSegment { slope: 1.0, b: 0.0, c: 1.0, length: 5.0 };
        assert_eq!(seg.derivative_roots(), None);
        assert!(seg.is_monotonic());
    }
}
