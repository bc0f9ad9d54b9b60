//! Disposable per-execution workspaces.
//!
//! A workspace is a fresh directory under an injected root, named with a uuid
//! plus tempfile's random suffix so concurrent executions never share one. The
//! same uuid names the sandbox container.
//!
//! Containers run as the `uid:gid` that owns the workspace, so every file a
//! candidate leaves behind can be deleted by the host. A root-owned workspace
//! keeps the image's unprivileged user instead.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempDir};
use uuid::Uuid;

pub trait WorkspaceProvider: Send + Sync {
    fn create(&self) -> io::Result<Workspace>;
}

#[derive(Debug)]
pub struct Workspace {
    id: Uuid,
    dir: TempDir,
    user: Option<String>,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn container_name(&self) -> String {
        format!("gavel-{}", self.id)
    }

    /// `uid:gid` the sandbox container should run as.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Delete the directory now and report failures. Dropping a workspace
    /// also deletes it, silently.
    pub fn release(self) -> io::Result<()> {
        self.dir.close()
    }
}

/// Creates workspaces under a configured root directory.
#[derive(Debug, Clone)]
pub struct TempWorkspaceProvider {
    root: PathBuf,
}

impl TempWorkspaceProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl WorkspaceProvider for TempWorkspaceProvider {
    fn create(&self) -> io::Result<Workspace> {
        std::fs::create_dir_all(&self.root)?;
        let id = Uuid::new_v4();
        let dir = Builder::new()
            .prefix(&format!("gavel-{}-", id))
            .tempdir_in(&self.root)?;

        let user = owner(dir.path())?;

        // The image's own user must be able to write compiler output into a
        // root-owned bind mount.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if user.is_none() {
                std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o777))?;
            }
        }

        Ok(Workspace { id, dir, user })
    }
}

#[cfg(unix)]
fn owner(path: &Path) -> io::Result<Option<String>> {
    use std::os::unix::fs::MetadataExt;
    let meta = std::fs::metadata(path)?;
    Ok((meta.uid() != 0).then(|| format!("{}:{}", meta.uid(), meta.gid())))
}

#[cfg(not(unix))]
fn owner(_path: &Path) -> io::Result<Option<String>> {
    Ok(None)
}
