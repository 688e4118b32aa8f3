// SPDX-License-Identifier: MPL-2.0

//! CPU edge detection on the luma plane
//!
//! Canny-style: optional 3x3 binomial smoothing, Sobel gradient with L1
//! magnitude, non-maximum suppression along the gradient direction, then a
//! double threshold with hysteresis. Output is one byte per pixel, 255 on
//! edges and 0 elsewhere.

use super::{FrameProcessor, InputFormat};
use crate::constants::{DEFAULT_EDGE_HIGH_THRESHOLD, DEFAULT_EDGE_LOW_THRESHOLD};

const EDGE: u8 = 255;

/// Edge detector with hysteresis thresholds on the L1 gradient magnitude
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeDetector {
    low_threshold: u16,
    high_threshold: u16,
    smooth: bool,
}

impl Default for EdgeDetector {
    fn default() -> Self {
        Self::new(DEFAULT_EDGE_LOW_THRESHOLD, DEFAULT_EDGE_HIGH_THRESHOLD)
    }
}

impl EdgeDetector {
    /// Thresholds are reordered if given high-first
    pub fn new(low_threshold: u16, high_threshold: u16) -> Self {
        Self {
            low_threshold: low_threshold.min(high_threshold),
            high_threshold: low_threshold.max(high_threshold),
            smooth: true,
        }
    }

    pub fn with_smoothing(mut self, smooth: bool) -> Self {
        self.smooth = smooth;
        self
    }

    pub fn thresholds(&self) -> (u16, u16) {
        (self.low_threshold, self.high_threshold)
    }

    /// Edge map of a tightly packed `width x height` grayscale image
    pub fn detect(&self, gray: &[u8], width: usize, height: usize) -> Vec<u8> {
        let mut edges = vec![0u8; width * height];
        if width < 3 || height < 3 || gray.len() < width * height {
            return edges;
        }

        let smoothed;
        let src = if self.smooth {
            smoothed = binomial_blur(gray, width, height);
            &smoothed[..]
        } else {
            &gray[..width * height]
        };

        let (magnitude, direction) = sobel(src, width, height);
        let low = i32::from(self.low_threshold);
        let high = i32::from(self.high_threshold);

        // Non-maximum suppression and classification
        let mut strong = Vec::new();
        let mut weak = vec![false; width * height];
        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let i = y * width + x;
                let m = magnitude[i];
                if m <= low {
                    continue;
                }

                let (a, b) = match direction[i] {
                    Direction::Horizontal => (i - 1, i + 1),
                    Direction::Vertical => (i - width, i + width),
                    Direction::Diagonal => (i - width - 1, i + width + 1),
                    Direction::AntiDiagonal => (i - width + 1, i + width - 1),
                };
                // Ties keep the first pixel only, so plateaus give thin lines
                if m < magnitude[a] || m <= magnitude[b] {
                    continue;
                }

                if m > high {
                    strong.push(i);
                    edges[i] = EDGE;
                } else {
                    weak[i] = true;
                }
            }
        }

        // Hysteresis: grow strong edges through connected weak pixels
        while let Some(i) = strong.pop() {
            let (x, y) = (i % width, i / width);
            for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                    let n = ny * width + nx;
                    if weak[n] && edges[n] == 0 {
                        edges[n] = EDGE;
                        strong.push(n);
                    }
                }
            }
        }

        edges
    }
}

impl FrameProcessor for EdgeDetector {
    fn process_frame(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        format: InputFormat,
    ) -> Option<Vec<u8>> {
        let luma = luma_plane(pixels, width, height, format)?;
        Some(self.detect(luma, width as usize, height as usize))
    }
}

/// Passes the luma plane through unchanged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Grayscale;

impl FrameProcessor for Grayscale {
    fn process_frame(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        format: InputFormat,
    ) -> Option<Vec<u8>> {
        luma_plane(pixels, width, height, format).map(<[u8]>::to_vec)
    }
}

fn luma_plane(pixels: &[u8], width: u32, height: u32, format: InputFormat) -> Option<&[u8]> {
    let len = width as usize * height as usize;
    match format {
        InputFormat::Nv21 if len > 0 && pixels.len() >= len => Some(&pixels[..len]),
        InputFormat::Nv21 => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Gradient points along x: compare left/right
    Horizontal,
    /// Gradient points along y: compare up/down
    Vertical,
    /// Top-left to bottom-right
    Diagonal,
    /// Top-right to bottom-left
    AntiDiagonal,
}

/// 1-2-1 separable blur with clamped borders
fn binomial_blur(src: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut horizontal = vec![0u16; width * height];
    for y in 0..height {
        let row = &src[y * width..(y + 1) * width];
        for x in 0..width {
            let left = row[x.saturating_sub(1)] as u16;
            let right = row[(x + 1).min(width - 1)] as u16;
            horizontal[y * width + x] = left + 2 * row[x] as u16 + right;
        }
    }

    let mut out = vec![0u8; width * height];
    for y in 0..height {
        let up = y.saturating_sub(1) * width;
        let down = (y + 1).min(height - 1) * width;
        for x in 0..width {
            let sum = horizontal[up + x] + 2 * horizontal[y * width + x] + horizontal[down + x];
            out[y * width + x] = ((sum + 8) / 16) as u8;
        }
    }
    out
}

/// Sobel gradient; border pixels get zero magnitude
fn sobel(src: &[u8], width: usize, height: usize) -> (Vec<i32>, Vec<Direction>) {
    let mut magnitude = vec![0i32; width * height];
    let mut direction = vec![Direction::Horizontal; width * height];
    let px = |x: usize, y: usize| i32::from(src[y * width + x]);

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let gx = (px(x + 1, y - 1) + 2 * px(x + 1, y) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2 * px(x - 1, y) + px(x - 1, y + 1));
            let gy = (px(x - 1, y + 1) + 2 * px(x, y + 1) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2 * px(x, y - 1) + px(x + 1, y - 1));

            let (ax, ay) = (gx.abs(), gy.abs());
            let i = y * width + x;
            magnitude[i] = ax + ay;

            // tan(22.5°) ≈ 0.4142, tan(67.5°) ≈ 2.4142, in fixed point
            direction[i] = if ay * 10_000 < ax * 4_142 {
                Direction::Horizontal
            } else if ay * 10_000 > ax * 24_142 {
                Direction::Vertical
            } else if (gx > 0) == (gy > 0) {
                Direction::Diagonal
            } else {
                Direction::AntiDiagonal
            };
        }
    }

    (magnitude, direction)
}
