use crate::models::PointI;

/// Unsigned polygon area via the shoelace formula
///
/// The polygon is implicitly closed. Fewer than three vertices give 0.
pub fn polygon_area(points: &[PointI]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let mut twice_area: i64 = 0;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        twice_area += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }
    twice_area.abs() as f64 * 0.5
}

/// Drop vertices that sit in the middle of a straight horizontal, vertical or
/// diagonal run, keeping only the run endpoints
///
/// Input is a closed chain of 8-connected boundary pixels.
pub fn compress_chain(chain: &[PointI]) -> Vec<PointI> {
    let n = chain.len();
    if n <= 2 {
        return chain.to_vec();
    }

    let mut kept = Vec::new();
    for i in 0..n {
        let prev = &chain[(i + n - 1) % n];
        let cur = &chain[i];
        let next = &chain[(i + 1) % n];
        if prev.delta(cur) != cur.delta(next) {
            kept.push(*cur);
        }
    }

    // A chain that is one straight run everywhere has no corners left
    if kept.is_empty() {
        kept.push(chain[0]);
    }
    kept
}
