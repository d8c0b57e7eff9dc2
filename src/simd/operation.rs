/// Vector kernels for embedding scoring (manually unrolled so the
/// compiler can auto-vectorize without target-specific intrinsics)
pub struct SimdOps;

/// Added to norms so zero vectors normalize to zero instead of NaN
pub const NORM_EPSILON: f32 = 1e-12;

impl SimdOps {
    /// Dot product of two equal-length vectors; extra elements of the
    /// longer one are ignored.
    pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
        let len = a.len().min(b.len());
        let mut sum = 0.0;
        let mut i = 0;

        // Process 4 elements at a time (helps compiler auto-vectorize)
        while i + 4 <= len {
            sum += a[i] * b[i];
            sum += a[i + 1] * b[i + 1];
            sum += a[i + 2] * b[i + 2];
            sum += a[i + 3] * b[i + 3];
            i += 4;
        }

        while i < len {
            sum += a[i] * b[i];
            i += 1;
        }

        sum
    }

    /// Integer dot product over quantized codes
    pub fn dot_product_i8(a: &[i8], b: &[i8]) -> i32 {
        let len = a.len().min(b.len());
        let mut sum = 0i32;
        let mut i = 0;

        while i + 8 <= len {
            sum += a[i] as i32 * b[i] as i32
                + a[i + 1] as i32 * b[i + 1] as i32
                + a[i + 2] as i32 * b[i + 2] as i32
                + a[i + 3] as i32 * b[i + 3] as i32
                + a[i + 4] as i32 * b[i + 4] as i32
                + a[i + 5] as i32 * b[i + 5] as i32
                + a[i + 6] as i32 * b[i + 6] as i32
                + a[i + 7] as i32 * b[i + 7] as i32;
            i += 8;
        }

        while i < len {
            sum += a[i] as i32 * b[i] as i32;
            i += 1;
        }

        sum
    }

    pub fn l2_norm(v: &[f32]) -> f32 {
        Self::dot_product(v, v).sqrt()
    }

    /// Scale `v` to unit length in place
    pub fn normalize(v: &mut [f32]) {
        let scale = 1.0 / (Self::l2_norm(v) + NORM_EPSILON);
        for x in v.iter_mut() {
            *x *= scale;
        }
    }

    /// Normalize every `dim`-wide row of a row-major matrix
    pub fn normalize_rows(matrix: &mut [f32], dim: usize) {
        if dim == 0 {
            return;
        }
        for row in matrix.chunks_exact_mut(dim) {
            Self::normalize(row);
        }
    }

    /// Symmetric int8 quantization; returns the codes and the scale that
    /// maps a code back to its float value
    pub fn quantize(v: &[f32]) -> (Vec<i8>, f32) {
        let max_abs = v.iter().fold(0.0f32, |m, x| m.max(x.abs()));
        if max_abs == 0.0 {
            return (vec![0; v.len()], 0.0);
        }
        let scale = max_abs / 127.0;
        let codes = v.iter()
            .map(|x| (x / scale).round().clamp(-127.0, 127.0) as i8)
            .collect();
        (codes, scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_product_handles_tail() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [1.0, 1.0, 1.0, 1.0, 2.0];
        assert_eq!(SimdOps::dot_product(&a, &b), 20.0);
    }

    #[test]
    fn normalize_keeps_zero_vector() {
        let mut v = [3.0, 4.0];
        SimdOps::normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6 && (v[1] - 0.8).abs() < 1e-6);

        let mut zero = [0.0f32; 3];
        SimdOps::normalize(&mut zero);
        assert_eq!(zero, [0.0; 3]);
    }

    #[test]
    fn quantized_dot_tracks_float_dot() {
        let a = [0.5, -0.25, 0.75, 0.1, 0.0, -0.6, 0.3, 0.2, 0.9];
        let b = [0.4, 0.3, -0.2, 0.8, 0.1, -0.1, 0.5, 0.0, 0.6];
        let (qa, sa) = SimdOps::quantize(&a);
        let (qb, sb) = SimdOps::quantize(&b);
        let approx = SimdOps::dot_product_i8(&qa, &qb) as f32 * sa * sb;
        assert!((approx - SimdOps::dot_product(&a, &b)).abs() < 0.05);
    }
}
