//! Mesh primitive generation.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use std::f32::consts::PI;

/// Vertex layout shared by every mesh.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 3],
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, uv: [f32; 2], color: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv,
            color: color.to_array(),
        }
    }
}

/// CPU-side indexed triangle list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Axis-aligned cube centered on the origin, four vertices per face.
    pub fn cube(size: f32, color: Vec3) -> Self {
        let h = size * 0.5;
        // (normal, u axis, v axis) per face; corners wind counter-clockwise seen from outside.
        let faces = [
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        ];

        let mut mesh = Self {
            vertices: Vec::with_capacity(24),
            indices: Vec::with_capacity(36),
        };
        for (normal, u, v) in faces {
            let base = mesh.base_index();
            for (du, dv) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
                let position = (normal + u * (du * 2.0 - 1.0) + v * (dv * 2.0 - 1.0)) * h;
                mesh.vertices.push(Vertex::new(position, normal, [du, dv], color));
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }
        mesh
    }

    /// UV sphere with `segments` around and `rings` from pole to pole.
    ///
    /// Values below 3 segments or 2 rings are raised to those minimums.
    #[allow(clippy::cast_precision_loss)]
    pub fn sphere(radius: f32, segments: u32, rings: u32, color: Vec3) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);
        let mut mesh = Self::default();

        for ring in 0..=rings {
            let phi = PI * ring as f32 / rings as f32;
            let (ring_radius, y) = (phi.sin(), phi.cos());
            for seg in 0..=segments {
                let theta = 2.0 * PI * seg as f32 / segments as f32;
                let normal = Vec3::new(ring_radius * theta.cos(), y, ring_radius * theta.sin());
                let uv = [seg as f32 / segments as f32, ring as f32 / rings as f32];
                mesh.vertices.push(Vertex::new(normal * radius, normal, uv, color));
            }
        }

        for ring in 0..rings {
            for seg in 0..segments {
                let current = ring * (segments + 1) + seg;
                let next = current + segments + 1;
                mesh.indices.extend_from_slice(&[
                    current,
                    current + 1,
                    next,
                    current + 1,
                    next + 1,
                    next,
                ]);
            }
        }
        mesh
    }

    /// Flat grid in the XZ plane facing +Y.
    ///
    /// Subdivision counts below 1 are raised to 1.
    #[allow(clippy::cast_precision_loss)]
    pub fn plane(width: f32, depth: f32, subdivisions_x: u32, subdivisions_z: u32, color: Vec3) -> Self {
        let sx = subdivisions_x.max(1);
        let sz = subdivisions_z.max(1);
        let mut mesh = Self::default();

        for z in 0..=sz {
            for x in 0..=sx {
                let u = x as f32 / sx as f32;
                let v = z as f32 / sz as f32;
                let position = Vec3::new((u - 0.5) * width, 0.0, (v - 0.5) * depth);
                mesh.vertices.push(Vertex::new(position, Vec3::Y, [u, v], color));
            }
        }

        for z in 0..sz {
            for x in 0..sx {
                let top_left = z * (sx + 1) + x;
                let top_right = top_left + 1;
                let bottom_left = (z + 1) * (sx + 1) + x;
                let bottom_right = bottom_left + 1;
                mesh.indices.extend_from_slice(&[
                    top_left,
                    bottom_left,
                    top_right,
                    top_right,
                    bottom_left,
                    bottom_right,
                ]);
            }
        }
        mesh
    }

    #[allow(clippy::cast_possible_truncation)]
    fn base_index(&self) -> u32 {
        self.vertices.len() as u32
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_normal(mesh: &MeshData, tri: &[u32]) -> Vec3 {
        let p = |i: u32| Vec3::from_array(mesh.vertices[i as usize].position);
        (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]))
    }

    fn assert_outward_winding(mesh: &MeshData) {
        for tri in mesh.indices.chunks_exact(3) {
            let normal = triangle_normal(mesh, tri);
            if normal.length_squared() < 1e-10 {
                continue; // degenerate triangle at a sphere pole
            }
            let vertex_normal = Vec3::from_array(mesh.vertices[tri[0] as usize].normal);
            assert!(normal.dot(vertex_normal) > 0.0, "triangle {tri:?} winds inward");
        }
    }

    #[test]
    fn cube_counts() {
        let cube = MeshData::cube(1.0, Vec3::ONE);
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.index_count(), 36);
        for v in &cube.vertices {
            assert!(v.position.iter().all(|c| (c.abs() - 0.5).abs() < 1e-6));
        }
    }

    #[test]
    fn cube_winds_outward() {
        assert_outward_winding(&MeshData::cube(2.0, Vec3::ONE));
    }

    #[test]
    fn sphere_counts() {
        let sphere = MeshData::sphere(1.0, 16, 8, Vec3::ONE);
        assert_eq!(sphere.vertices.len(), 17 * 9);
        assert_eq!(sphere.indices.len(), 16 * 8 * 6);
        assert!(sphere.indices.iter().all(|&i| (i as usize) < sphere.vertices.len()));
    }

    #[test]
    fn sphere_vertices_on_radius() {
        let sphere = MeshData::sphere(2.5, 12, 6, Vec3::ONE);
        for v in &sphere.vertices {
            assert!((Vec3::from_array(v.position).length() - 2.5).abs() < 1e-4);
        }
        assert_outward_winding(&sphere);
    }

    #[test]
    fn sphere_minimums() {
        let sphere = MeshData::sphere(1.0, 0, 0, Vec3::ONE);
        assert_eq!(sphere.vertices.len(), 4 * 3);
    }

    #[test]
    fn plane_counts() {
        let plane = MeshData::plane(10.0, 4.0, 4, 2, Vec3::ONE);
        assert_eq!(plane.vertices.len(), 5 * 3);
        assert_eq!(plane.indices.len(), 4 * 2 * 6);
        let first = plane.vertices[0].position;
        let last = plane.vertices[plane.vertices.len() - 1].position;
        assert_eq!(first, [-5.0, 0.0, -2.0]);
        assert_eq!(last, [5.0, 0.0, 2.0]);
        assert_outward_winding(&plane);
    }
}
