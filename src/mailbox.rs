// SPDX-License-Identifier: GPL-3.0-only

//! Single-slot latest-wins frame handoff
//!
//! The capture thread deposits, the render thread reads. Every deposit is a
//! total overwrite of the slot, so a frame that was not read before the next
//! deposit is simply gone. The slot keeps the dimensions of the last frame it
//! held so the reader can detect size changes without a side channel.

use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Contents of the slot
#[derive(Debug, Default)]
pub struct FrameSlot {
    /// Pixel storage, always exactly `width * height` bytes
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Bumped on every deposit; 0 means nothing was ever deposited
    pub generation: u64,
    /// How often the storage had to be reallocated for a new size
    pub reallocations: u64,
}

impl FrameSlot {
    pub fn has_frame(&self) -> bool {
        self.generation > 0
    }
}

/// Thread-safe handle to the slot; clones share the same slot
#[derive(Debug, Clone, Default)]
pub struct FrameMailbox {
    slot: Arc<Mutex<FrameSlot>>,
}

impl FrameMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock leaves the slot in a consistent state
    // (every write is a full overwrite), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, FrameSlot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the slot contents with a `width x height` luminance frame
    ///
    /// Storage is reallocated to the exact new size when the dimensions
    /// change. A short `pixels` buffer is zero-padded, a long one truncated.
    pub fn deposit(&self, pixels: &[u8], width: u32, height: u32) {
        let len = width as usize * height as usize;
        let mut slot = self.lock();

        if slot.width != width || slot.height != height || slot.data.len() != len {
            debug!(
                from_width = slot.width,
                from_height = slot.height,
                width,
                height,
                "Reallocating frame storage"
            );
            slot.data = vec![0; len];
            slot.width = width;
            slot.height = height;
            slot.reallocations += 1;
        }

        let copied = pixels.len().min(len);
        slot.data[..copied].copy_from_slice(&pixels[..copied]);
        slot.data[copied..].fill(0);
        slot.generation += 1;
    }

    /// Run `f` on the slot while holding the lock
    ///
    /// Keep `f` short: the capture thread blocks on the same lock.
    pub fn read_latest<R>(&self, f: impl FnOnce(&FrameSlot) -> R) -> R {
        let slot = self.lock();
        f(&slot)
    }

    /// Dimensions of the last deposited frame, if any
    pub fn last_dimensions(&self) -> Option<(u32, u32)> {
        let slot = self.lock();
        slot.has_frame().then_some((slot.width, slot.height))
    }

    pub fn has_frame(&self) -> bool {
        self.lock().has_frame()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }
}
