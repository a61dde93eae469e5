//! Per-camera history targets that carry state across frames.
//!
//! Every `(camera, channel)` key owns two targets. One is "current" (the
//! slot this frame writes) and the other "previous" (last frame's output,
//! read this frame). The allocator never flips roles on its own: the frame
//! driver calls [`HistorySlotAllocator::swap_camera`] once at the start of
//! each frame, so lookups within a frame always see the same pair.
//!
//! A pair only holds valid data once a frame that wrote it has been
//! submitted. Until [`HistorySlotAllocator::mark_seeded`] is called for it,
//! [`HistorySlotAllocator::needs_seed`] reports it as needing a reset, as it
//! does when the camera skipped frames since the pair was last written.

use rustc_hash::FxHashMap;

use super::camera::CameraId;
use super::target::TargetId;
use crate::error::AllocationError;

/// Logical history channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryChannel {
    /// 1x1 exposure value (EV100, multiplier).
    Exposure,
    /// Full-resolution temporal anti-aliasing color.
    TemporalAa,
}

/// The two slots of a history channel as seen by the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryPair {
    /// Written last frame, read this frame.
    pub previous: TargetId,
    /// Written this frame.
    pub current: TargetId,
}

#[derive(Debug)]
struct HistoryEntry {
    slots: [TargetId; 2],
    current: usize,
    extent: (u32, u32),
    /// Frame index of the last submitted frame that wrote the pair.
    written: Option<u32>,
}

impl HistoryEntry {
    const fn pair(&self) -> HistoryPair {
        HistoryPair {
            previous: self.slots[self.current ^ 1],
            current: self.slots[self.current],
        }
    }
}

/// Lazily allocates and tracks history pairs keyed by camera and channel.
#[derive(Debug, Default)]
pub struct HistorySlotAllocator {
    entries: FxHashMap<(CameraId, HistoryChannel), HistoryEntry>,
}

impl HistorySlotAllocator {
    /// Empty allocator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the pair for `(camera, channel)`, allocating both slots with
    /// `allocate` if the key has none yet. `extent` records the camera size
    /// the pair was allocated for.
    ///
    /// # Errors
    ///
    /// Propagates the allocation failure; nothing is recorded for the key,
    /// so the next frame will try again from scratch.
    pub fn get_or_create<F>(
        &mut self,
        camera: CameraId,
        channel: HistoryChannel,
        extent: (u32, u32),
        allocate: F,
    ) -> Result<HistoryPair, AllocationError>
    where
        F: FnOnce() -> Result<[TargetId; 2], AllocationError>,
    {
        if let Some(entry) = self.entries.get(&(camera, channel)) {
            return Ok(entry.pair());
        }
        let slots = allocate()?;
        log::debug!(
            "allocated {channel:?} history for camera {} ({}x{})",
            camera.0,
            extent.0,
            extent.1
        );
        let entry = HistoryEntry {
            slots,
            current: 0,
            extent,
            written: None,
        };
        let pair = entry.pair();
        let _ = self.entries.insert((camera, channel), entry);
        Ok(pair)
    }

    /// Pair for `(camera, channel)` if it has been allocated.
    #[must_use]
    pub fn pair(&self, camera: CameraId, channel: HistoryChannel) -> Option<HistoryPair> {
        self.entries.get(&(camera, channel)).map(HistoryEntry::pair)
    }

    /// Whether `(camera, channel)` has been allocated.
    #[must_use]
    pub fn contains(&self, camera: CameraId, channel: HistoryChannel) -> bool {
        self.entries.contains_key(&(camera, channel))
    }

    /// Whether `(camera, channel)` must be seeded rather than read at
    /// `frame_index`: it is missing, no submitted frame has written it yet,
    /// or the last write is older than the previous frame. Rendering the
    /// same frame index again does not count as a gap.
    #[must_use]
    pub fn needs_seed(&self, camera: CameraId, channel: HistoryChannel, frame_index: u32) -> bool {
        self.entries
            .get(&(camera, channel))
            .and_then(|entry| entry.written)
            .is_none_or(|written| frame_index.wrapping_sub(written) > 1)
    }

    /// Record that the submitted frame `frame_index` wrote `(camera, channel)`.
    pub fn mark_seeded(&mut self, camera: CameraId, channel: HistoryChannel, frame_index: u32) {
        if let Some(entry) = self.entries.get_mut(&(camera, channel)) {
            entry.written = Some(frame_index);
        }
    }

    /// Swap previous/current for every channel of `camera`.
    pub fn swap_camera(&mut self, camera: CameraId) {
        for ((owner, _), entry) in &mut self.entries {
            if *owner == camera {
                entry.current ^= 1;
            }
        }
    }

    /// Drop every pair of `camera` that was allocated for a different extent,
    /// handing its targets to `release`. Returns whether anything was dropped.
    pub fn release_mismatched<F>(&mut self, camera: CameraId, extent: (u32, u32), mut release: F) -> bool
    where
        F: FnMut(TargetId),
    {
        let before = self.entries.len();
        self.entries.retain(|(owner, channel), entry| {
            if *owner != camera || entry.extent == extent {
                return true;
            }
            log::debug!(
                "releasing {channel:?} history for camera {}: {}x{} -> {}x{}",
                camera.0,
                entry.extent.0,
                entry.extent.1,
                extent.0,
                extent.1
            );
            entry.slots.iter().copied().for_each(&mut release);
            false
        });
        self.entries.len() != before
    }

    /// Drop every pair owned by `camera`.
    pub fn release_camera<F>(&mut self, camera: CameraId, mut release: F)
    where
        F: FnMut(TargetId),
    {
        self.entries.retain(|(owner, _), entry| {
            if *owner != camera {
                return true;
            }
            entry.slots.iter().copied().for_each(&mut release);
            false
        });
    }

    /// Number of allocated pairs across all cameras.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no pair is allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
