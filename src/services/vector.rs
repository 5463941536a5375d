//! Small dense-vector helpers shared by the content index and the collaborative model.

pub fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum()
}

pub fn norm(v: &[f32]) -> f64 {
    dot(v, v).sqrt()
}

/// Scales `v` to unit length. A zero vector is returned unchanged.
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let n = norm(v);
    if n <= f64::EPSILON {
        return v.to_vec();
    }
    v.iter().map(|x| (f64::from(*x) / n) as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f64 {
        let denom = norm(a) * norm(b);
        if denom <= f64::EPSILON {
            return 0.0;
        }
        dot(a, b) / denom
    }

    #[test]
    fn test_dot_and_norm() {
        assert_eq!(dot(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]), 32.0);
        assert!((norm(&[3.0, 4.0]) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_l2_normalize() {
        let v = l2_normalize(&[3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
        assert_eq!(l2_normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_cosine() {
        assert!((cosine(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-9);
        assert!(cosine(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_dot_of_unit_vectors_is_cosine() {
        let a = [0.9, 0.1, 0.0];
        let b = [0.6, 0.0, 0.8];
        let unit_dot = dot(&l2_normalize(&a), &l2_normalize(&b));
        assert!((unit_dot - cosine(&a, &b)).abs() < 1e-6);
    }
}
