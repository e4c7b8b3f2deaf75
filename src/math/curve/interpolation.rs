/// Linear interpolation of the table `(xs, ys)` at `x`.
///
/// `xs` must be non-decreasing and as long as `ys`. Outside `[xs[0], xs[n-1]]`
/// the end values are returned.
pub fn interp(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return f64::NAN;
    }
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[n - 1] {
        return ys[n - 1];
    }
    // first knot strictly right of x, in 1..n
    let hi = xs[..n].partition_point(|&xi| xi <= x);
    let lo = hi - 1;
    let span = xs[hi] - xs[lo];
    if span <= 0.0 {
        return ys[hi];
    }
    ys[lo] + (ys[hi] - ys[lo]) * (x - xs[lo]) / span
}
