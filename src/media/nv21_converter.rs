// SPDX-License-Identifier: MPL-2.0

//! Planar YUV 4:2:0 to NV21 repacking
//!
//! NV21 is the luma plane followed by interleaved chroma in V,U order. The
//! conversion is a pure function that allocates its output on every call.

use crate::backends::camera::types::{Plane, SensorImage};
use crate::errors::FrameError;

/// Repack three planes into one NV21 buffer
///
/// The output is exactly `y.len() + u.len() + v.len()` bytes: the luma plane
/// verbatim, then chroma interleaved byte by byte starting with V. When the
/// chroma planes differ in length the walk covers the longer plane and its
/// extra bytes are appended unpaired, so an empty chroma plane degenerates to
/// copying the other one.
pub fn yuv420_to_nv21(y: &[u8], u: &[u8], v: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(y.len() + u.len() + v.len());
    out.extend_from_slice(y);
    interleave_chroma(u, v, &mut out);
    out
}

/// Append V/U interleaved chroma to `out`
pub fn interleave_chroma(u: &[u8], v: &[u8], out: &mut Vec<u8>) {
    let paired = u.len().min(v.len());
    for (&vb, &ub) in v[..paired].iter().zip(&u[..paired]) {
        out.push(vb);
        out.push(ub);
    }

    // At most one of these is non-empty
    out.extend_from_slice(&v[paired..]);
    out.extend_from_slice(&u[paired..]);
}

/// Convert a sensor image to NV21, dropping row padding first
///
/// The luma plane becomes exactly `width * height` bytes and each chroma plane
/// `ceil(width/2) * ceil(height/2)` bytes (or less if the driver delivered a
/// truncated plane).
pub fn sensor_image_to_nv21(image: &SensorImage) -> Result<Vec<u8>, FrameError> {
    if image.width == 0 || image.height == 0 {
        return Err(FrameError::Conversion(format!(
            "empty frame {}x{}",
            image.width, image.height
        )));
    }

    let luma = pack_plane(image.luma(), image.width as usize, image.height as usize);
    let expected_luma = image.width as usize * image.height as usize;
    if luma.len() < expected_luma {
        return Err(FrameError::Conversion(format!(
            "luma plane holds {} of {} bytes",
            luma.len(),
            expected_luma
        )));
    }

    let chroma_width = image.width.div_ceil(2) as usize;
    let chroma_height = image.height.div_ceil(2) as usize;
    let u = pack_plane(image.chroma_u(), chroma_width, chroma_height);
    let v = pack_plane(image.chroma_v(), chroma_width, chroma_height);

    Ok(yuv420_to_nv21(&luma, &u, &v))
}

/// Copy `rows` rows of `row_len` samples out of a strided plane
fn pack_plane(plane: &Plane, row_len: usize, rows: usize) -> Vec<u8> {
    let stride = (plane.row_stride as usize).max(row_len);
    let pixel_stride = (plane.pixel_stride as usize).max(1);

    if stride == row_len && pixel_stride == 1 {
        let len = (row_len * rows).min(plane.data.len());
        return plane.data[..len].to_vec();
    }

    let mut packed = Vec::with_capacity(row_len * rows);
    for row in 0..rows {
        let start = row * stride;
        if start >= plane.data.len() {
            break;
        }
        let row_data = &plane.data[start..];
        packed.extend(row_data.iter().step_by(pixel_stride).take(row_len));
    }
    packed
}
