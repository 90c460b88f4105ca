use super::Space;
use super::error::Result;
use std::ops::{Deref, DerefMut};

/// Scoped update bracket over a [`Space`].
///
/// While the guard lives, change notifications are queued and coalesced. They are delivered
/// when the outermost guard is dropped, including on early return through `?`.
pub struct UpdateBatch<'a> {
    space: &'a mut Space,
}

impl Deref for UpdateBatch<'_> {
    type Target = Space;

    fn deref(&self) -> &Space {
        self.space
    }
}

impl DerefMut for UpdateBatch<'_> {
    fn deref_mut(&mut self) -> &mut Space {
        self.space
    }
}

impl Drop for UpdateBatch<'_> {
    fn drop(&mut self) {
        self.space.notifier.end_update();
    }
}

impl Space {
    pub fn begin_update(&mut self) -> UpdateBatch<'_> {
        self.notifier.begin_update();
        UpdateBatch { space: self }
    }

    /// Runs `action` inside an update bracket.
    pub fn batch<F, R>(&mut self, action: F) -> Result<R>
    where
        F: FnOnce(&mut Space) -> Result<R>,
    {
        let mut guard = self.begin_update();
        action(&mut *guard)
    }

    pub fn is_updating(&self) -> bool {
        self.notifier.is_updating()
    }
}
