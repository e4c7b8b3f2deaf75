use serde::{
    Deserialize,
    Serialize
};

use crate::magnet::conversion::ConversionError;
use crate::math::curve::curve::Curve;
use crate::math::curve::nonparametriccurve::nonparametriccurve::{
    NonparametricCurve,
    Point2D
};
use crate::math::curve::nonparametriccurve::piecewisepolynomial::{
    PiecewisePolynomial,
    PolynomialType
};

/// Tabulated calibration of a magnet: integrated field as a function of the
/// power supply current.
///
/// The table must be strictly monotonic in both columns so that it can be
/// inverted. No extrapolation is done in either direction.
///
/// Currents are found by inverting the interpolated field itself, so
/// `field(current(f)) == f` up to rounding for either interpolation.
pub struct ExcitationCurve {
    forward: PiecewisePolynomial,
    knots: Vec<Point2D>,
    increasing: bool,
}

const MAX_BISECTIONS: usize = 200;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExcitationJsonProp {
    pub currents: Vec<f64>,
    pub fields: Vec<f64>,
    #[serde(default)]
    pub interpolation: PolynomialType,
}

impl ExcitationCurve {
    pub fn new(
        currents: &[f64],
        fields: &[f64],
        polynomial_type: PolynomialType,
    ) -> Result<ExcitationCurve, ConversionError> {
        if currents.len() != fields.len() {
            return Err(ConversionError::InvalidExcitation(format!(
                "{} currents for {} fields",
                currents.len(),
                fields.len()
            )));
        }
        if currents.len() < 2 {
            return Err(ConversionError::InvalidExcitation(
                "at least two calibration points are needed".to_owned(),
            ));
        }

        let points: Vec<Point2D> = currents
            .iter()
            .zip(fields.iter())
            .map(|(&i, &f)| Point2D::new(i, f))
            .collect();

        let increasing = points.windows(2).all(|p| p[1].y() > p[0].y());
        let decreasing = points.windows(2).all(|p| p[1].y() < p[0].y());
        if !increasing && !decreasing {
            return Err(ConversionError::InvalidExcitation(
                "fields are not strictly monotonic".to_owned(),
            ));
        }

        let forward = PiecewisePolynomial::new(polynomial_type, points.clone()).ok_or_else(|| {
            ConversionError::InvalidExcitation("currents are not strictly increasing".to_owned())
        })?;

        Ok(ExcitationCurve { forward, knots: points, increasing })
    }

    pub fn from_json_prop(prop: &ExcitationJsonProp) -> Result<ExcitationCurve, ConversionError> {
        ExcitationCurve::new(&prop.currents, &prop.fields, prop.interpolation)
    }

    /// The calibration knots as `(current, field)` pairs.
    pub fn calibration(&self) -> Vec<Point2D> {
        self.forward.points()
    }

    pub fn field(&self, current: f64) -> Result<f64, ConversionError> {
        if !self.forward.contains(current) {
            return Err(ConversionError::OutOfRange {
                value: current,
                min: self.forward.min_x(),
                max: self.forward.max_x(),
            });
        }
        Ok(self.forward.value(current))
    }

    pub fn current(&self, field: f64) -> Result<f64, ConversionError> {
        let first = self.knots[0].y();
        let last = self.knots[self.knots.len() - 1].y();
        let (min, max) = (first.min(last), first.max(last));
        if !(field >= min && field <= max) {
            return Err(ConversionError::OutOfRange { value: field, min, max });
        }
        // first knot past `field` along the current axis
        let ahead = if self.increasing {
            self.knots.partition_point(|p| p.y() <= field)
        } else {
            self.knots.partition_point(|p| p.y() >= field)
        };
        let hi = ahead.clamp(1, self.knots.len() - 1);
        Ok(self.invert_segment(hi - 1, field))
    }

    // Bisection on one knot interval, where the interpolant is monotonic.
    fn invert_segment(&self, lo: usize, field: f64) -> f64 {
        let (left, right) = (self.knots[lo], self.knots[lo + 1]);
        if field == left.y() {
            return left.x();
        }
        if field == right.y() {
            return right.x();
        }
        let sign = if self.increasing { 1.0 } else { -1.0 };
        let (mut a, mut b) = (left.x(), right.x());
        for _ in 0..MAX_BISECTIONS {
            let mid = 0.5 * (a + b);
            if mid <= a || mid >= b {
                break;
            }
            if sign * (self.forward.value(mid) - field) < 0.0 {
                a = mid;
            } else {
                b = mid;
            }
        }
        0.5 * (a + b)
    }
}
