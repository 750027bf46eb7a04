use std::ops::Deref;

use super::manager::{WorkspaceHandle, WorkspaceManager};

/// Releases its workspace when dropped, so every exit path of a job
/// (early return, error, panic, cancelled future) reclaims the artifacts.
pub struct WorkspaceGuard<'a> {
    manager: &'a WorkspaceManager,
    handle: WorkspaceHandle,
}

impl<'a> WorkspaceGuard<'a> {
    pub fn new(manager: &'a WorkspaceManager, handle: WorkspaceHandle) -> Self {
        Self { manager, handle }
    }

    pub fn handle(&self) -> &WorkspaceHandle {
        &self.handle
    }
}

impl Deref for WorkspaceGuard<'_> {
    type Target = WorkspaceHandle;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

impl Drop for WorkspaceGuard<'_> {
    fn drop(&mut self) {
        self.manager.release(&self.handle);
    }
}
