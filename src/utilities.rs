// Numeric helpers shared by the table builder and the samplers

/// Find the interval `i` with `x[i] <= x_new < x[i + 1]` by bisection.
///
/// Values below the first abscissa map to interval 0 and values at or above
/// the last map to the final interval, so the result is always a valid left
/// index for slices with at least two entries.
pub fn find_interval(x: &[f64], x_new: f64) -> usize {
    debug_assert!(x.len() >= 2);
    if x_new <= x[0] {
        return 0;
    }
    if x_new >= x[x.len() - 1] {
        return x.len() - 2;
    }
    let mut low = 0usize;
    let mut high = x.len() - 1; // target interval within (low, high]
    while high - low > 1 {
        let mid = (low + high) >> 1;
        if x[mid] <= x_new {
            low = mid;
        } else {
            high = mid;
        }
    }
    low
}

/// Linear interpolation on a tabulated function.
///
/// Given arrays of x and y values, interpolate to find the y value at x_new.
/// If x_new is outside the range of x, returns the first or last y value.
pub fn interpolate_linear(x: &[f64], y: &[f64], x_new: f64) -> f64 {
    if x.is_empty() {
        return f64::NAN;
    }
    if x.len() == 1 {
        return y[0];
    }
    if x_new <= x[0] {
        return y[0];
    }
    if x_new >= x[x.len() - 1] {
        return y[y.len() - 1];
    }
    let idx = find_interval(x, x_new);
    lerp(x[idx], x[idx + 1], y[idx], y[idx + 1], x_new)
}

/// Straight line through (x1, y1) and (x2, y2) evaluated at x.
#[inline]
pub fn lerp(x1: f64, x2: f64, y1: f64, y2: f64, x: f64) -> f64 {
    if x2 == x1 {
        return y1;
    }
    y1 + (x - x1) * (y2 - y1) / (x2 - x1)
}

/// Exact ∫ dE / n(E)² over [e1, e2] when n varies linearly from n1 to n2.
///
/// For n = a + bE the antiderivative is -1 / (b n), so the integral is
/// (e2 - e1) / (n1 n2), which also covers the constant-index limit.
#[inline]
pub fn integrate_inverse_square_linear(e1: f64, e2: f64, n1: f64, n2: f64) -> f64 {
    (e2 - e1) / (n1 * n2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
        x.windows(2)
            .zip(y.windows(2))
            .map(|(xs, ys)| 0.5 * (ys[0] + ys[1]) * (xs[1] - xs[0]))
            .sum()
    }

    #[test]
    fn test_find_interval_bounds() {
        let x = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(find_interval(&x, 0.5), 0);
        assert_eq!(find_interval(&x, 1.0), 0);
        assert_eq!(find_interval(&x, 2.5), 1);
        assert_eq!(find_interval(&x, 3.0), 2);
        assert_eq!(find_interval(&x, 4.0), 2);
        assert_eq!(find_interval(&x, 9.0), 2);
    }

    #[test]
    fn test_interpolate_linear_inside_and_clamped() {
        let x = [1.0, 2.0, 4.0];
        let y = [10.0, 20.0, 0.0];
        assert!((interpolate_linear(&x, &y, 1.5) - 15.0).abs() < 1e-12);
        assert!((interpolate_linear(&x, &y, 3.0) - 10.0).abs() < 1e-12);
        assert_eq!(interpolate_linear(&x, &y, 0.0), 10.0);
        assert_eq!(interpolate_linear(&x, &y, 5.0), 0.0);
        assert!(interpolate_linear(&[], &[], 1.0).is_nan());
    }

    #[test]
    fn test_inverse_square_integral_matches_quadrature() {
        let (e1, e2, n1, n2) = (2.0, 4.0, 1.33, 1.37);
        let exact = integrate_inverse_square_linear(e1, e2, n1, n2);
        let samples = 20_001;
        let xs: Vec<f64> = (0..samples)
            .map(|i| e1 + (e2 - e1) * i as f64 / (samples - 1) as f64)
            .collect();
        let ys: Vec<f64> = xs
            .iter()
            .map(|&e| {
                let n = lerp(e1, e2, n1, n2, e);
                1.0 / (n * n)
            })
            .collect();
        let numeric = trapezoid(&xs, &ys);
        assert!((exact - numeric).abs() / exact < 1e-8);
    }

    #[test]
    fn test_inverse_square_integral_constant_index() {
        let v = integrate_inverse_square_linear(1.0, 3.0, 1.5, 1.5);
        assert!((v - 2.0 / 2.25).abs() < 1e-14);
    }
}
