//! Access to a video capture device.
//!
//! A [`CameraStream`] holds the device for as long as it lives; dropping it
//! releases the device.

use std::fs::File;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use log::{debug, info};
use thiserror::Error;

use crate::app::models::Photo;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera unavailable: {0}")]
    Unavailable(String),

    #[error("could not open camera device `{path}`: {source}")]
    Device {
        path: String,
        source: std::io::Error,
    },

    #[error("capture failed: {0}")]
    Capture(String),
}

pub trait Camera {
    fn open(&self) -> Result<Box<dyn CameraStream>, CameraError>;
}

pub trait CameraStream {
    // Grab a single still frame from the running stream
    fn capture_still(&mut self) -> Result<Photo, CameraError>;
}

pub struct DisabledCamera;

impl Camera for DisabledCamera {
    fn open(&self) -> Result<Box<dyn CameraStream>, CameraError> {
        Err(CameraError::Unavailable("no camera configured".to_string()))
    }
}

/// Camera backed by a video device node and an external capture program.
///
/// Opening only holds a read-only handle on the device node: it fails early
/// when the device is missing or unreadable and keeps the node reserved while
/// the modal is open. No frames are streamed in between. Each still is taken
/// by running `capture_command`, which opens the device itself and must write
/// exactly one JPEG frame to stdout.
pub struct CommandCamera {
    pub device: PathBuf,
    pub capture_command: Vec<String>,
}

impl Camera for CommandCamera {
    fn open(&self) -> Result<Box<dyn CameraStream>, CameraError> {
        if self.capture_command.is_empty() {
            return Err(CameraError::Unavailable(
                "capture command is empty".to_string(),
            ));
        }
        let device = File::open(&self.device).map_err(|source| CameraError::Device {
            path: self.device.display().to_string(),
            source,
        })?;
        info!(
            "event=camera_open module=camera status=ok device={}",
            self.device.display()
        );

        Ok(Box::new(CommandStream {
            _device: device,
            device_path: self.device.clone(),
            capture_command: self.capture_command.clone(),
        }))
    }
}

struct CommandStream {
    _device: File,
    device_path: PathBuf,
    capture_command: Vec<String>,
}

impl CameraStream for CommandStream {
    fn capture_still(&mut self) -> Result<Photo, CameraError> {
        let (program, args) = self
            .capture_command
            .split_first()
            .ok_or_else(|| CameraError::Capture("capture command is empty".to_string()))?;

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|err| CameraError::Capture(format!("could not run `{program}`: {err}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CameraError::Capture(format!(
                "`{program}` exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let frame = output.stdout;
        if !is_jpeg(&frame) {
            return Err(CameraError::Capture(
                "capture output is not a JPEG image".to_string(),
            ));
        }
        debug!(
            "event=camera_capture module=camera status=ok bytes={}",
            frame.len()
        );
        Ok(Photo::jpeg(frame))
    }
}

impl Drop for CommandStream {
    fn drop(&mut self) {
        info!(
            "event=camera_release module=camera status=ok device={}",
            self.device_path.display()
        );
    }
}

// JPEG frames start with SOI (FF D8) and end with EOI (FF D9)
fn is_jpeg(frame: &[u8]) -> bool {
    frame.len() >= 4 && frame.starts_with(&[0xff, 0xd8]) && frame.ends_with(&[0xff, 0xd9])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn shell_camera(device: PathBuf, script: &str) -> CommandCamera {
        CommandCamera {
            device,
            capture_command: vec!["sh".to_string(), "-c".to_string(), script.to_string()],
        }
    }

    #[test]
    fn is_jpeg_checks_markers() {
        assert!(is_jpeg(&[0xff, 0xd8, 0x00, 0xff, 0xd9]));
        assert!(!is_jpeg(&[0xff, 0xd8]));
        assert!(!is_jpeg(b"not an image"));
    }

    #[test]
    fn disabled_camera_never_opens() {
        assert!(matches!(
            DisabledCamera.open(),
            Err(CameraError::Unavailable(_))
        ));
    }

    #[test]
    fn missing_device_fails_to_open() {
        let camera = shell_camera(PathBuf::from("/nonexistent/video9"), "true");
        assert!(matches!(camera.open(), Err(CameraError::Device { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn capture_reads_frame_from_command_output() {
        let mut device = tempfile::NamedTempFile::new().unwrap();
        device.write_all(b"device").unwrap();
        let camera = shell_camera(device.path().to_path_buf(), r"printf '\377\330abc\377\331'");

        let mut stream = camera.open().unwrap();
        let photo = stream.capture_still().unwrap();

        assert_eq!(photo.mime, "image/jpeg");
        assert_eq!(photo.data, vec![0xff, 0xd8, b'a', b'b', b'c', 0xff, 0xd9]);
    }

    #[cfg(unix)]
    #[test]
    fn capture_rejects_non_image_output() {
        let device = tempfile::NamedTempFile::new().unwrap();
        let camera = shell_camera(device.path().to_path_buf(), "echo hello");

        let mut stream = camera.open().unwrap();
        assert!(matches!(
            stream.capture_still(),
            Err(CameraError::Capture(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_is_a_capture_error() {
        let device = tempfile::NamedTempFile::new().unwrap();
        let camera = shell_camera(device.path().to_path_buf(), "echo busy >&2; exit 3");

        let mut stream = camera.open().unwrap();
        let err = stream.capture_still().err().unwrap();
        assert!(err.to_string().contains("busy"));
    }
}
