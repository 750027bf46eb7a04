use std::fs;
use std::io::ErrorKind as IoKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::error::JobError;

/// Number of random bytes in a workspace id (128 bits).
const WORKSPACE_ID_BYTES: usize = 16;

const TMP_SUFFIX: &str = ".tmp";

/// Role of an artifact inside a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactRole {
    Input,
    Output,
    Script,
}

impl ArtifactRole {
    pub const ALL: [ArtifactRole; 3] = [ArtifactRole::Input, ArtifactRole::Output, ArtifactRole::Script];

    fn suffix(&self) -> &'static str {
        match self {
            ArtifactRole::Input => "input.lua",
            ArtifactRole::Output => "output.lua",
            ArtifactRole::Script => "script",
        }
    }
}

/// Handle to one job's artifacts. The files themselves do not exist until
/// something is written to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceHandle {
    id: String,
    root: PathBuf,
}

impl WorkspaceHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self, role: ArtifactRole) -> PathBuf {
        self.root.join(format!("{}.{}", self.id, role.suffix()))
    }

    pub fn input_path(&self) -> PathBuf {
        self.path(ArtifactRole::Input)
    }

    pub fn output_path(&self) -> PathBuf {
        self.path(ArtifactRole::Output)
    }

    pub fn script_path(&self) -> PathBuf {
        self.path(ArtifactRole::Script)
    }
}

/// Counts produced by a single sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub removed: usize,
    pub failed: usize,
}

/// Allocates and reclaims per-job storage under a shared root directory.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn allocate(&self) -> Result<WorkspaceHandle, JobError> {
        fs::create_dir_all(&self.root).map_err(|e| JobError::StorageUnavailable {
            path: self.root.clone(),
            source: e,
        })?;

        let id = generate_workspace_id().map_err(|e| JobError::StorageUnavailable {
            path: self.root.clone(),
            source: std::io::Error::other(format!("OS random source failed: {}", e)),
        })?;

        debug!(workspace_id = %id, "Allocated workspace");
        Ok(WorkspaceHandle {
            id,
            root: self.root.clone(),
        })
    }

    /// Writes an artifact via a temporary sibling and a rename, so readers never
    /// observe a partially written file.
    pub fn write(
        &self,
        handle: &WorkspaceHandle,
        role: ArtifactRole,
        content: &str,
    ) -> Result<PathBuf, JobError> {
        let path = handle.path(role);
        let tmp_path = tmp_sibling(&path);

        if let Err(e) = fs::write(&tmp_path, content.as_bytes()) {
            let _ = fs::remove_file(&tmp_path);
            return Err(JobError::from_io(&tmp_path, e));
        }
        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(JobError::from_io(&path, e));
        }

        Ok(path)
    }

    pub fn read(&self, handle: &WorkspaceHandle, role: ArtifactRole) -> Result<String, JobError> {
        let path = handle.path(role);
        match fs::read(&path) {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == IoKind::NotFound => Err(JobError::ArtifactMissing(path)),
            Err(e) => Err(JobError::IoFault { path, source: e }),
        }
    }

    pub fn exists(&self, handle: &WorkspaceHandle, role: ArtifactRole) -> bool {
        handle.path(role).is_file()
    }

    /// Best-effort removal of every artifact of the handle. Never fails; the
    /// sweep reclaims whatever is left behind.
    pub fn release(&self, handle: &WorkspaceHandle) {
        for role in ArtifactRole::ALL {
            let path = handle.path(role);
            for candidate in [tmp_sibling(&path), path] {
                match fs::remove_file(&candidate) {
                    Ok(()) => {}
                    Err(e) if e.kind() == IoKind::NotFound => {}
                    Err(e) => warn!(
                        workspace_id = %handle.id,
                        path = %candidate.display(),
                        "Failed to remove workspace artifact: {}",
                        e
                    ),
                }
            }
        }
        debug!(workspace_id = %handle.id, "Released workspace");
    }

    /// Lists artifacts currently present on disk for the handle.
    pub fn artifacts(&self, handle: &WorkspaceHandle) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let prefix = format!("{}.", handle.id);
        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
            .map(|entry| entry.path())
            .collect()
    }

    /// Removes every file under the root older than `retention`.
    ///
    /// Files disappearing mid-scan (a concurrent `release`) are not errors.
    pub fn sweep(&self, retention: Duration) -> SweepReport {
        let mut report = SweepReport::default();

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == IoKind::NotFound => return report,
            Err(e) => {
                warn!(root = %self.root.display(), "Failed to scan workspace root: {}", e);
                report.failed += 1;
                return report;
            }
        };

        let now = SystemTime::now();
        for entry in entries.filter_map(|entry| entry.ok()) {
            let path = entry.path();
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == IoKind::NotFound => continue,
                Err(e) => {
                    warn!(path = %path.display(), "Failed to stat workspace artifact: {}", e);
                    report.failed += 1;
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }
            report.scanned += 1;

            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or(Duration::ZERO);
            if age <= retention {
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => report.removed += 1,
                Err(e) if e.kind() == IoKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), "Failed to remove stale artifact: {}", e);
                    report.failed += 1;
                }
            }
        }

        report
    }
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(TMP_SUFFIX);
    PathBuf::from(name)
}

fn generate_workspace_id() -> Result<String, getrandom::Error> {
    let mut bytes = [0u8; WORKSPACE_ID_BYTES];
    getrandom::fill(&mut bytes)?;
    Ok(bytes.iter().map(|b| format!("{:02x}", b)).collect())
}
