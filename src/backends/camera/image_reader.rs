// SPDX-License-Identifier: GPL-3.0-only

//! Bounded latest-wins reader for sensor images
//!
//! Backends submit raw images; the capture loop acquires only the newest one.
//! The reader holds at most `capacity` images, counting both queued images and
//! images the consumer currently holds. When it is full the oldest queued image
//! is discarded. Acquired images are returned to the reader when their
//! [`AcquiredImage`] guard drops, on every exit path of the frame handler.

use super::types::{BackendError, BackendResult, SensorImage};
use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, trace};

#[derive(Debug, Default)]
struct ReaderQueue {
    images: VecDeque<SensorImage>,
    outstanding: usize,
    dropped: u64,
    closed: bool,
}

#[derive(Debug)]
struct ReaderInner {
    queue: Mutex<ReaderQueue>,
    capacity: usize,
}

impl ReaderInner {
    fn lock(&self) -> MutexGuard<'_, ReaderQueue> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// What happened to a submitted image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Queued for the consumer
    Queued,
    /// Every slot is held by the consumer; the image was discarded
    Discarded,
}

/// Shared reader handle; clones refer to the same queue
#[derive(Debug, Clone)]
pub struct ImageReader {
    inner: Arc<ReaderInner>,
}

impl ImageReader {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(ReaderInner {
                queue: Mutex::new(ReaderQueue::default()),
                capacity: capacity.max(1),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Hand a freshly captured image to the reader
    pub fn submit(&self, image: SensorImage) -> BackendResult<SubmitOutcome> {
        let mut queue = self.inner.lock();
        if queue.closed {
            return Err(BackendError::Closed);
        }

        while queue.images.len() + queue.outstanding >= self.inner.capacity {
            if queue.images.pop_front().is_none() {
                queue.dropped += 1;
                trace!(sequence = image.sequence, "Reader full, discarding image");
                return Ok(SubmitOutcome::Discarded);
            }
            queue.dropped += 1;
        }

        queue.images.push_back(image);
        Ok(SubmitOutcome::Queued)
    }

    /// Take the newest queued image, discarding any older ones
    pub fn acquire_latest(&self) -> Option<AcquiredImage> {
        let mut queue = self.inner.lock();
        let image = queue.images.pop_back()?;

        let stale = queue.images.len() as u64;
        if stale > 0 {
            queue.images.clear();
            queue.dropped += stale;
            trace!(stale, "Dropped older images in favour of the latest");
        }
        queue.outstanding += 1;

        Some(AcquiredImage {
            image,
            reader: Arc::clone(&self.inner),
        })
    }

    /// Stop accepting images and discard queued ones
    ///
    /// Images already acquired stay valid until their guards drop.
    pub fn close(&self) {
        let mut queue = self.inner.lock();
        if !queue.closed {
            debug!(
                queued = queue.images.len(),
                outstanding = queue.outstanding,
                "Closing image reader"
            );
            queue.closed = true;
            queue.images.clear();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Images currently held by the consumer
    pub fn outstanding(&self) -> usize {
        self.inner.lock().outstanding
    }

    pub fn queued(&self) -> usize {
        self.inner.lock().images.len()
    }

    /// Images discarded without being acquired
    pub fn dropped(&self) -> u64 {
        self.inner.lock().dropped
    }
}

/// Scoped ownership of one acquired image
#[derive(Debug)]
pub struct AcquiredImage {
    image: SensorImage,
    reader: Arc<ReaderInner>,
}

impl Deref for AcquiredImage {
    type Target = SensorImage;

    fn deref(&self) -> &SensorImage {
        &self.image
    }
}

impl Drop for AcquiredImage {
    fn drop(&mut self) {
        let mut queue = self.reader.lock();
        queue.outstanding = queue.outstanding.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::Plane;
    use std::time::Instant;

    fn image(sequence: u64) -> SensorImage {
        SensorImage {
            width: 1,
            height: 1,
            planes: [
                Plane::new(vec![sequence as u8], 1),
                Plane::default(),
                Plane::default(),
            ],
            sequence,
            captured_at: Instant::now(),
        }
    }

    #[test]
    fn test_acquire_latest_drops_older() {
        let reader = ImageReader::new(2);
        reader.submit(image(1)).unwrap();
        reader.submit(image(2)).unwrap();
        reader.submit(image(3)).unwrap();

        let latest = reader.acquire_latest().unwrap();
        assert_eq!(latest.sequence, 3);
        assert_eq!(reader.queued(), 0);
        assert_eq!(reader.dropped(), 2);
    }

    #[test]
    fn test_release_on_drop() {
        let reader = ImageReader::new(2);
        reader.submit(image(1)).unwrap();
        {
            let _held = reader.acquire_latest().unwrap();
            assert_eq!(reader.outstanding(), 1);
        }
        assert_eq!(reader.outstanding(), 0);
    }

    #[test]
    fn test_release_on_panic_path() {
        let reader = ImageReader::new(2);
        reader.submit(image(1)).unwrap();
        let clone = reader.clone();
        let result = std::panic::catch_unwind(move || {
            let _held = clone.acquire_latest().unwrap();
            panic!("processing failed");
        });
        assert!(result.is_err());
        assert_eq!(reader.outstanding(), 0);
    }

    #[test]
    fn test_full_reader_discards_incoming() {
        let reader = ImageReader::new(1);
        reader.submit(image(1)).unwrap();
        let _held = reader.acquire_latest().unwrap();
        assert_eq!(reader.submit(image(2)).unwrap(), SubmitOutcome::Discarded);
    }

    #[test]
    fn test_close_is_idempotent() {
        let reader = ImageReader::new(2);
        reader.submit(image(1)).unwrap();
        reader.close();
        reader.close();
        assert!(reader.is_closed());
        assert!(reader.acquire_latest().is_none());
        assert_eq!(reader.submit(image(2)), Err(BackendError::Closed));
    }
}
