pub const EARTH_RADIUS_MILES: f64 = 3959.0;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() { return None; }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

// Great-circle distance in miles between two (lat, lon) points given in degrees
pub fn haversine_miles(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());

    let d_lat = lat2 - lat1;
    let d_lon = lon2 - lon1;

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * h.sqrt().min(1.0).asin()
}

/// Ordinal ranks 1..=N for `values`, best first. `higher_is_better` picks the direction.
/// Equal values keep their input order, so the result is always a permutation.
pub fn ordinal_ranks(values: &[f64], higher_is_better: bool) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        let cmp = values[a].total_cmp(&values[b]);
        if higher_is_better { cmp.reverse() } else { cmp }
    });

    let mut ranks = vec![0; values.len()];
    for (position, idx) in order.into_iter().enumerate() {
        ranks[idx] = position + 1;
    }
    ranks
}
