//! Ephemeral per-job workspace.
//!
//! A [`Workspace`] owns one uniquely named directory. It is removed exactly
//! once: by [`Workspace::destroy`] on the normal path, or by `Drop` on every
//! other path (early `?` return, panic).

use crate::error::{ExecError, ExecResult};
use camino::{Utf8Path, Utf8PathBuf};
use codemigrate_codegen::DRIVER_FILE_NAME;
use fs_err as fs;
use std::io;
use tempfile::TempDir;
use tracing::{debug, warn};

const PREFIX: &str = "codemigrate-";

#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    root: Utf8PathBuf,
}

impl Workspace {
    /// Allocate a fresh, empty directory under `parent` (or the system temp dir).
    pub fn create(parent: Option<&Utf8Path>) -> ExecResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(PREFIX);
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
        .map_err(|source| ExecError::workspace_io("create workspace", source))?;

        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).map_err(|path| {
            ExecError::workspace_io(
                format!("workspace path {} is not UTF-8", path.display()),
                io::Error::new(io::ErrorKind::InvalidData, "non-UTF-8 path"),
            )
        })?;
        debug!(workspace = %root, "workspace created");
        Ok(Self {
            dir: Some(dir),
            root,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.root
    }

    /// Copy the migration source in, keeping its base name.
    pub fn copy_migration(&self, source: &Utf8Path) -> ExecResult<Utf8PathBuf> {
        let name = source
            .file_name()
            .ok_or_else(|| ExecError::invalid_migration(source, "path has no file name"))?;
        if name == DRIVER_FILE_NAME {
            return Err(ExecError::invalid_migration(
                source,
                format!("file name collides with the generated {}", DRIVER_FILE_NAME),
            ));
        }
        let dest = self.root.join(name);
        fs::copy(source, &dest)
            .map_err(|e| ExecError::workspace_io(format!("copy migration {}", source), e))?;
        debug!(from = %source, to = %dest, "migration copied");
        Ok(dest)
    }

    /// Write the rendered driver program.
    pub fn write_driver(&self, contents: &str) -> ExecResult<Utf8PathBuf> {
        let dest = self.root.join(DRIVER_FILE_NAME);
        fs::write(&dest, contents)
            .map_err(|e| ExecError::workspace_io("write driver program", e))?;
        Ok(dest)
    }

    /// File names currently in the workspace, sorted.
    pub fn artifacts(&self) -> ExecResult<Vec<String>> {
        let read_err = |e| ExecError::workspace_io("list workspace", e);
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(read_err)? {
            let entry = entry.map_err(read_err)?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    /// Remove the workspace, surfacing any IO error.
    pub fn destroy(mut self) -> ExecResult<()> {
        match self.dir.take() {
            Some(dir) => {
                dir.close().map_err(|e| {
                    ExecError::workspace_io(format!("remove workspace {}", self.root), e)
                })?;
                debug!(workspace = %self.root, "workspace removed");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(err) = dir.close() {
                warn!(workspace = %self.root, error = %err, "failed to remove workspace");
            } else {
                debug!(workspace = %self.root, "workspace removed on unwind");
            }
        }
    }
}
