//! Headless resource backend
//!
//! Hands out sequential texture names and keeps the pixel data in memory.
//! Used by the CLI and in tests to observe exactly which handles are live.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::source::{RawImage, ResourceBackend, ResourceHandle};
use crate::{Error, Result};

#[derive(Debug, Default)]
struct MemoryState {
    next_name: u32,
    live: HashMap<ResourceHandle, usize>,
    uploads: usize,
    releases: usize,
    rejected_releases: usize,
    release_attempts: usize,
    fail_uploads: bool,
    fail_releases: bool,
}

/// In-memory stand-in for a GPU texture store
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every following upload fail (simulates a lost context)
    pub fn set_fail_uploads(&self, fail: bool) {
        self.state().fail_uploads = fail;
    }

    /// Make every following release fail and keep the texture alive
    pub fn set_fail_releases(&self, fail: bool) {
        self.state().fail_releases = fail;
    }

    /// Textures uploaded and not yet released
    pub fn live_count(&self) -> usize {
        self.state().live.len()
    }

    /// Bytes held by live textures
    pub fn live_bytes(&self) -> usize {
        self.state().live.values().sum()
    }

    pub fn is_live(&self, handle: ResourceHandle) -> bool {
        self.state().live.contains_key(&handle)
    }

    pub fn upload_count(&self) -> usize {
        self.state().uploads
    }

    pub fn release_count(&self) -> usize {
        self.state().releases
    }

    /// Every call to `release`, successful or not
    pub fn release_attempts(&self) -> usize {
        self.state().release_attempts
    }

    /// Releases of handles that were unknown or already released
    pub fn rejected_release_count(&self) -> usize {
        self.state().rejected_releases
    }
}

impl ResourceBackend for MemoryBackend {
    fn upload(&self, image: RawImage) -> Result<ResourceHandle> {
        let mut state = self.state();
        if state.fail_uploads {
            return Err(Error::Upload("backend is not accepting uploads".to_string()));
        }
        if !image.is_well_formed() {
            return Err(Error::Upload(format!(
                "{}x{} image has {} bytes",
                image.width,
                image.height,
                image.byte_len()
            )));
        }

        state.next_name = state.next_name.wrapping_add(1);
        let handle = ResourceHandle::new(state.next_name)
            .ok_or_else(|| Error::Upload("texture names exhausted".to_string()))?;
        state.live.insert(handle, image.byte_len());
        state.uploads += 1;
        Ok(handle)
    }

    fn release(&self, handle: ResourceHandle) -> Result<()> {
        let mut state = self.state();
        state.release_attempts += 1;
        if state.fail_releases {
            return Err(Error::Release(format!("backend refused to free {}", handle)));
        }
        if state.live.remove(&handle).is_none() {
            state.rejected_releases += 1;
            return Err(Error::UnknownHandle(handle));
        }
        state.releases += 1;
        Ok(())
    }
}
