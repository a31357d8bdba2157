use crate::models::PointI;
use crate::utils::geometry::polygon_area;
use serde::Serialize;

/// Closed polyline traced around a foreground region
///
/// The last vertex connects back to the first. Vertices are pixel centers of
/// the region's boundary pixels, so a filled `w x h` block has area
/// `(w - 1) * (h - 1)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contour {
    /// Polygon vertices in tracing order
    pub points: Vec<PointI>,
    /// Enclosed area in square pixels (shoelace, unsigned)
    pub area: f64,
}

impl Contour {
    /// Build a contour and compute its area
    pub fn new(points: Vec<PointI>) -> Self {
        let area = polygon_area(&points);
        Self { points, area }
    }

    /// Number of vertices
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the contour has no vertices
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Inclusive bounding box as `(min_x, min_y, max_x, max_y)`
    pub fn bounding_box(&self) -> Option<(i32, i32, i32, i32)> {
        let first = self.points.first()?;
        let mut bbox = (first.x, first.y, first.x, first.y);
        for p in &self.points[1..] {
            bbox.0 = bbox.0.min(p.x);
            bbox.1 = bbox.1.min(p.y);
            bbox.2 = bbox.2.max(p.x);
            bbox.3 = bbox.3.max(p.y);
        }
        Some(bbox)
    }
}
