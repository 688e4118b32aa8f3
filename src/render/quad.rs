// SPDX-License-Identifier: GPL-3.0-only

//! Static full-screen quad
//!
//! Two triangles covering clip space [-1, 1]. Texture coordinates are flipped
//! vertically relative to the positions: the first texture row is the top of
//! the camera image, so the top vertices (y = 1) sample v = 0 and the bottom
//! vertices (y = -1) sample v = 1. The shader passes coordinates through
//! unchanged.

use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
}

const fn vertex(x: f32, y: f32, u: f32, v: f32) -> QuadVertex {
    QuadVertex {
        position: [x, y],
        tex_coords: [u, v],
    }
}

pub const QUAD_VERTICES: [QuadVertex; 6] = [
    vertex(-1.0, -1.0, 0.0, 1.0),
    vertex(1.0, -1.0, 1.0, 1.0),
    vertex(-1.0, 1.0, 0.0, 0.0),
    vertex(-1.0, 1.0, 0.0, 0.0),
    vertex(1.0, -1.0, 1.0, 1.0),
    vertex(1.0, 1.0, 1.0, 0.0),
];

pub const QUAD_VERTEX_COUNT: u32 = QUAD_VERTICES.len() as u32;

const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

impl QuadVertex {
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_covers_clip_space() {
        for v in QUAD_VERTICES {
            assert!(v.position.iter().all(|c| c.abs() == 1.0));
        }
    }

    #[test]
    fn test_texture_rows_flipped() {
        for v in QUAD_VERTICES {
            let [_, y] = v.position;
            let [u, tv] = v.tex_coords;
            assert_eq!(tv, (1.0 - y) / 2.0);
            assert_eq!(u, (v.position[0] + 1.0) / 2.0);
        }
    }

    #[test]
    fn test_vertex_bytes_tightly_packed() {
        assert_eq!(bytemuck::cast_slice::<_, u8>(&QUAD_VERTICES).len(), 6 * 16);
    }
}
