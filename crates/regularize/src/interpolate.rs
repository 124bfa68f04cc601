//! Linear interpolation over interior nulls.
//!
//! Leading and trailing nulls have no bounding neighbor and are left alone.

use gapfix_core::TimestampMs;

/// Linear blend between `left` and `right` at `weight` in `[0, 1]`.
#[inline]
pub fn lerp(left: f64, right: f64, weight: f64) -> f64 {
    left + (right - left) * weight
}

/// Elapsed-time fraction of `t` between `t_left` and `t_right`.
#[inline]
pub fn time_weight(t: TimestampMs, t_left: TimestampMs, t_right: TimestampMs) -> f64 {
    if t_right == t_left {
        0.0
    } else {
        (t as i128 - t_left as i128) as f64 / (t_right as i128 - t_left as i128) as f64
    }
}

/// Fill interior nulls by row position. Returns the number of cells filled.
pub fn interpolate_by_position(values: &mut [Option<f64>]) -> usize {
    fill_interior(values, |i, a, b| (i - a) as f64 / (b - a) as f64)
}

/// Fill interior nulls weighted by elapsed time. Returns the number of cells filled.
///
/// `times` must be as long as `values` and sorted ascending.
pub fn interpolate_by_time(values: &mut [Option<f64>], times: &[TimestampMs]) -> usize {
    debug_assert_eq!(values.len(), times.len());
    fill_interior(values, |i, a, b| time_weight(times[i], times[a], times[b]))
}

fn fill_interior(values: &mut [Option<f64>], weight: impl Fn(usize, usize, usize) -> f64) -> usize {
    let mut filled = 0;
    let mut last_valid: Option<usize> = None;
    let mut i = 0;

    while i < values.len() {
        if values[i].is_some() {
            last_valid = Some(i);
            i += 1;
            continue;
        }

        let run_start = i;
        while i < values.len() && values[i].is_none() {
            i += 1;
        }

        // Null run [run_start, i); fill only when bounded on both sides.
        if let (Some(a), true) = (last_valid, i < values.len()) {
            let (left, right) = match (values[a], values[i]) {
                (Some(l), Some(r)) => (l, r),
                _ => continue,
            };
            for j in run_start..i {
                values[j] = Some(lerp(left, right, weight(j, a, i)));
                filled += 1;
            }
        }
    }

    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_position_interior_only() {
        let mut v = vec![None, Some(1.0), None, None, Some(4.0), None];
        assert_eq!(interpolate_by_position(&mut v), 2);
        assert_eq!(v[0], None);
        assert_abs_diff_eq!(v[2].unwrap(), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v[3].unwrap(), 3.0, epsilon = 1e-12);
        assert_eq!(v[5], None);
    }

    #[test]
    fn test_time_weighted() {
        // Null at t=1 between t=0 (0.0) and t=4 (8.0): weight 0.25.
        let mut v = vec![Some(0.0), None, Some(8.0)];
        let t = vec![0, 1, 4];
        assert_eq!(interpolate_by_time(&mut v, &t), 1);
        assert_abs_diff_eq!(v[1].unwrap(), 2.0, epsilon = 1e-12);

        let mut by_pos = vec![Some(0.0), None, Some(8.0)];
        interpolate_by_position(&mut by_pos);
        assert_abs_diff_eq!(by_pos[1].unwrap(), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_nothing_to_fill() {
        let mut v = vec![Some(1.0), Some(2.0)];
        assert_eq!(interpolate_by_position(&mut v), 0);
        let mut all_null: Vec<Option<f64>> = vec![None, None];
        assert_eq!(interpolate_by_position(&mut all_null), 0);
        let mut empty: Vec<Option<f64>> = Vec::new();
        assert_eq!(interpolate_by_time(&mut empty, &[]), 0);
    }

    #[test]
    fn test_time_weight_degenerate() {
        assert_eq!(time_weight(5, 5, 5), 0.0);
        assert_abs_diff_eq!(time_weight(15, 10, 30), 0.25, epsilon = 1e-12);
    }
}
