//! Math utilities and helpers.

use glam::Mat4;

/// Round `size` up to the next multiple of `alignment`.
///
/// An alignment of zero or one leaves the size unchanged. Vulkan guarantees
/// uniform offset alignments are powers of two, but non-power-of-two values
/// are still handled correctly.
#[inline]
pub const fn align_up(size: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        return size;
    }
    size.div_ceil(alignment) * alignment
}

/// Matrix that transforms normals by `model`.
///
/// This is the inverse transpose, which keeps normals perpendicular to
/// surfaces under non-uniform scale.
#[inline]
pub fn normal_matrix(model: Mat4) -> Mat4 {
    model.inverse().transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::{Vec3, Vec4};

    #[test]
    fn align_up_multiples() {
        assert_eq!(align_up(128, 256), 256);
        assert_eq!(align_up(256, 256), 256);
        assert_eq!(align_up(257, 256), 512);
        assert_eq!(align_up(128, 64), 128);
        assert_eq!(align_up(0, 64), 0);
    }

    #[test]
    fn align_up_degenerate_alignment() {
        assert_eq!(align_up(100, 0), 100);
        assert_eq!(align_up(100, 1), 100);
        assert_eq!(align_up(100, 48), 144);
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let model = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let normal = normal_matrix(model);

        // A 45 degree surface normal stays perpendicular to the scaled tangent.
        let tangent = model * Vec4::new(1.0, -1.0, 0.0, 0.0);
        let n = normal * Vec4::new(1.0, 1.0, 0.0, 0.0);
        assert_relative_eq!(tangent.dot(n), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn normal_matrix_of_rotation_is_rotation() {
        let model = Mat4::from_rotation_y(0.7);
        let normal = normal_matrix(model);
        for (a, b) in model.to_cols_array().iter().zip(normal.to_cols_array()) {
            assert_relative_eq!(*a, b, epsilon = 1e-5);
        }
    }
}
