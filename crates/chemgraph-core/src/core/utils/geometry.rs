use nalgebra::{Point2, Point3, Vector2, Vector3};

/// Arithmetic mean of a set of 2D points, `None` for an empty set.
pub fn centroid_2d<'a, I>(points: I) -> Option<Vector2<f64>>
where
    I: IntoIterator<Item = &'a Point2<f64>>,
{
    let (sum, count) = points
        .into_iter()
        .fold((Vector2::<f64>::zeros(), 0usize), |(sum, n), p| (sum + p.coords, n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Arithmetic mean of a set of 3D points, `None` for an empty set.
pub fn centroid_3d<'a, I>(points: I) -> Option<Vector3<f64>>
where
    I: IntoIterator<Item = &'a Point3<f64>>,
{
    let (sum, count) = points
        .into_iter()
        .fold((Vector3::<f64>::zeros(), 0usize), |(sum, n), p| (sum + p.coords, n + 1));
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centroid_2d_averages_points() {
        let points = [Point2::new(0.0, 0.0), Point2::new(2.0, 4.0)];
        let c = centroid_2d(points.iter()).unwrap();
        assert!((c - Vector2::new(1.0, 2.0)).norm() < 1e-12);
    }

    #[test]
    fn centroid_3d_averages_points() {
        let points = [
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        let c = centroid_3d(points.iter()).unwrap();
        assert!((c - Vector3::new(1.0, 1.0, 1.0) / 3.0).norm() < 1e-12);
    }

    #[test]
    fn centroid_of_empty_set_is_none() {
        let empty: [Point2<f64>; 0] = [];
        assert!(centroid_2d(empty.iter()).is_none());
        let empty: [Point3<f64>; 0] = [];
        assert!(centroid_3d(empty.iter()).is_none());
    }
}
