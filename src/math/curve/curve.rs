/// A real function of one variable with a first derivative.
///
/// Implemented by the transition cubics, by the ramp region model and by the
/// excitation tables of the magnets.
pub trait Curve {
    fn value(&self, x: f64) -> f64;

    fn derivative(&self, x: f64) -> f64;
}
