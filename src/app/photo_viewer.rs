//! Showing an attached photo in an external image viewer.
//!
//! The terminal cannot draw the image itself, so the photo bytes are written
//! to a temporary file and handed to a viewer program. The file lives as long
//! as the [`ShownPhoto`] returned for it.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use log::{debug, info, warn};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::app::models::Photo;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("photo viewer unavailable: {0}")]
    Unavailable(String),

    #[error("could not write the photo to a temporary file: {0}")]
    TempFile(std::io::Error),

    #[error("could not run `{program}`: {source}")]
    Launch {
        program: String,
        source: std::io::Error,
    },
}

pub trait PhotoViewer {
    fn show(&self, photo: &Photo) -> Result<ShownPhoto, ViewerError>;
}

pub struct DisabledViewer;

impl PhotoViewer for DisabledViewer {
    fn show(&self, _photo: &Photo) -> Result<ShownPhoto, ViewerError> {
        Err(ViewerError::Unavailable("no viewer configured".to_string()))
    }
}

/// Viewer started as `command... <file>` for every photo shown.
pub struct CommandViewer {
    pub command: Vec<String>,
}

impl PhotoViewer for CommandViewer {
    fn show(&self, photo: &Photo) -> Result<ShownPhoto, ViewerError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| ViewerError::Unavailable("viewer command is empty".to_string()))?;

        let mut file = tempfile::Builder::new()
            .prefix("todomatic-photo-")
            .suffix(extension_for(&photo.mime))
            .tempfile()
            .map_err(ViewerError::TempFile)?;
        file.write_all(&photo.data).map_err(ViewerError::TempFile)?;
        file.flush().map_err(ViewerError::TempFile)?;

        let child = Command::new(program)
            .args(args)
            .arg(file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ViewerError::Launch {
                program: program.clone(),
                source,
            })?;
        info!(
            "event=photo_view module=photo_viewer status=ok program={program} bytes={}",
            photo.data.len()
        );

        Ok(ShownPhoto {
            program: program.clone(),
            file,
            child,
        })
    }
}

/// A photo handed to a viewer. Dropping it removes the temporary file.
#[derive(Debug)]
pub struct ShownPhoto {
    program: String,
    file: NamedTempFile,
    child: Child,
}

impl ShownPhoto {
    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    // Handle on the file contents, used to check what the viewer was given
    pub fn reopen(&self) -> std::io::Result<File> {
        self.file.reopen()
    }
}

impl Drop for ShownPhoto {
    fn drop(&mut self) {
        // Reap the viewer if it is done; a viewer still running is left alone
        match self.child.try_wait() {
            Ok(Some(status)) => debug!(
                "event=photo_view_close module=photo_viewer status=ok program={} exit={status}",
                self.program
            ),
            Ok(None) => debug!(
                "event=photo_view_close module=photo_viewer status=ok program={} exit=running",
                self.program
            ),
            Err(err) => warn!(
                "event=photo_view_close module=photo_viewer status=error program={} error={err}",
                self.program
            ),
        }
    }
}

// File suffix viewers use to pick a decoder
fn extension_for(mime: &str) -> &str {
    match mime {
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        _ => ".img",
    }
}
