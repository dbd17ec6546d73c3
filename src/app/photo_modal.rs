use derivative::Derivative;
use log::{error, info};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::app::camera::{Camera, CameraStream};
use crate::app::models::{Task, TaskId};
use crate::app::photo_viewer::{PhotoViewer, ShownPhoto, ViewerError};
use crate::app::store::TaskActions;

// Photo modal of a single task row.
// At most one of the camera and the photo viewer is open at a time.
// The camera stream lives inside the CameraOpen state, so leaving that state
// by any path (save, cancel, dropping the row) releases the device.
// PhotoOpen likewise owns the photo handed to the viewer; closing removes its
// temporary file. A viewer that failed to start keeps the modal open with the error.
#[derive(Derivative, Default)]
#[derivative(Debug)]
pub enum PhotoModal {
    #[default]
    Closed,
    CameraOpen(#[derivative(Debug = "ignore")] Box<dyn CameraStream>),
    PhotoOpen(Result<ShownPhoto, ViewerError>),
}

impl PhotoModal {
    pub fn is_open(&self) -> bool {
        !matches!(self, PhotoModal::Closed)
    }

    // Start the camera. Ignored while another modal is open.
    pub fn open_camera(&mut self, camera: &dyn Camera) {
        if self.is_open() {
            return;
        }
        match camera.open() {
            Ok(stream) => *self = PhotoModal::CameraOpen(stream),
            Err(err) => error!("event=camera_open module=photo_modal status=error error={err}"),
        }
    }

    // Show the attached photo. Ignored without a photo or while another modal is open.
    pub fn view_photo(&mut self, task: &Task, viewer: &dyn PhotoViewer) {
        if self.is_open() {
            return;
        }
        let Some(photo) = &task.photo else {
            return;
        };
        let shown = viewer.show(photo);
        if let Err(err) = &shown {
            error!("event=photo_view module=photo_modal status=error id={} error={err}", task.id);
        }
        *self = PhotoModal::PhotoOpen(shown);
    }

    // Capture a still, attach it to the task and close the camera
    pub fn save(&mut self, id: &TaskId, actions: &mut dyn TaskActions) {
        let PhotoModal::CameraOpen(stream) = self else {
            return;
        };
        match stream.capture_still() {
            Ok(photo) => {
                info!(
                    "event=photo_capture module=photo_modal status=ok id={id} bytes={}",
                    photo.data.len()
                );
                actions.attach_photo(id, photo);
            }
            Err(err) => error!("event=photo_capture module=photo_modal status=error id={id} error={err}"),
        }
        *self = PhotoModal::Closed;
    }

    // Close whichever modal is open without changing the task
    pub fn close(&mut self) {
        *self = PhotoModal::Closed;
    }
}

// Returns the UI content of the open modal
pub fn get_photo_modal_ui<'a>(modal: &PhotoModal, task: &'a Task) -> Vec<Line<'a>> {
    const WHITE_TEXT: Style = Style::new().fg(Color::White);
    const GRAY_TEXT: Style = Style::new().fg(Color::Rgb(120, 120, 120));

    match modal {
        PhotoModal::Closed => Vec::new(),
        PhotoModal::CameraOpen(_) => vec![
            Line::from(Span::styled(task.name.as_str(), WHITE_TEXT)),
            Line::raw(""),
            Line::from(Span::styled("Camera is running.", WHITE_TEXT)),
            Line::raw(""),
            Line::from(Span::styled("Enter - save photo, Esc - cancel", GRAY_TEXT)),
        ],
        PhotoModal::PhotoOpen(shown) => {
            let mut lines = vec![
                Line::from(Span::styled(task.name.as_str(), WHITE_TEXT)),
                Line::raw(""),
            ];
            match shown {
                Ok(shown) => lines.push(Line::from(Span::styled(
                    format!("Opened in {}", shown.program()),
                    WHITE_TEXT,
                ))),
                Err(err) => lines.push(Line::from(Span::styled(
                    err.to_string(),
                    Style::new().fg(Color::Red),
                ))),
            }
            if let Some(photo) = &task.photo {
                lines.push(Line::from(format!("Type: {}", photo.mime)));
                lines.push(Line::from(format!("Size: {:.1} KiB", photo.data.len() as f64 / 1024.0)));
            }
            lines.push(Line::raw(""));
            lines.push(Line::from(Span::styled("Esc - close", GRAY_TEXT)));
            lines
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::camera::CameraError;
    use crate::app::models::{Location, Photo, TaskEdit};
    use crate::app::photo_viewer::{CommandViewer, DisabledViewer};
    use std::cell::Cell;
    use std::rc::Rc;

    struct FakeCamera {
        fail_capture: bool,
        open_streams: Rc<Cell<usize>>,
    }

    struct FakeStream {
        fail_capture: bool,
        open_streams: Rc<Cell<usize>>,
    }

    impl Camera for FakeCamera {
        fn open(&self) -> Result<Box<dyn CameraStream>, CameraError> {
            self.open_streams.set(self.open_streams.get() + 1);
            Ok(Box::new(FakeStream {
                fail_capture: self.fail_capture,
                open_streams: Rc::clone(&self.open_streams),
            }))
        }
    }

    impl CameraStream for FakeStream {
        fn capture_still(&mut self) -> Result<Photo, CameraError> {
            if self.fail_capture {
                Err(CameraError::Capture("lens cap".to_string()))
            } else {
                Ok(Photo::jpeg(vec![0xff, 0xd8, 0xff, 0xd9]))
            }
        }
    }

    impl Drop for FakeStream {
        fn drop(&mut self) {
            self.open_streams.set(self.open_streams.get() - 1);
        }
    }

    #[derive(Default)]
    struct RecordedActions {
        photos: Vec<(TaskId, Photo)>,
    }

    impl TaskActions for RecordedActions {
        fn add(&mut self, _name: &str, _location: Option<Location>) -> TaskId {
            TaskId::generate()
        }
        fn toggle_completed(&mut self, _id: &TaskId) {}
        fn delete(&mut self, _id: &TaskId) {}
        fn edit(&mut self, _id: &TaskId, _edit: TaskEdit) {}
        fn attach_photo(&mut self, id: &TaskId, photo: Photo) {
            self.photos.push((id.clone(), photo));
        }
    }

    fn camera(fail_capture: bool) -> (FakeCamera, Rc<Cell<usize>>) {
        let open_streams = Rc::new(Cell::new(0));
        (
            FakeCamera {
                fail_capture,
                open_streams: Rc::clone(&open_streams),
            },
            open_streams,
        )
    }

    #[test]
    fn save_attaches_photo_and_releases_camera() {
        let (camera, open_streams) = camera(false);
        let mut actions = RecordedActions::default();
        let id = TaskId::from("t1");
        let mut modal = PhotoModal::default();

        modal.open_camera(&camera);
        assert!(matches!(modal, PhotoModal::CameraOpen(_)));
        assert_eq!(open_streams.get(), 1);

        modal.save(&id, &mut actions);

        assert!(matches!(modal, PhotoModal::Closed));
        assert_eq!(open_streams.get(), 0);
        assert_eq!(actions.photos, vec![(id, Photo::jpeg(vec![0xff, 0xd8, 0xff, 0xd9]))]);
    }

    #[test]
    fn cancel_releases_camera_without_photo() {
        let (camera, open_streams) = camera(false);
        let mut modal = PhotoModal::default();

        modal.open_camera(&camera);
        modal.close();

        assert!(matches!(modal, PhotoModal::Closed));
        assert_eq!(open_streams.get(), 0);
    }

    #[test]
    fn failed_capture_closes_without_photo() {
        let (camera, open_streams) = camera(true);
        let mut actions = RecordedActions::default();
        let mut modal = PhotoModal::default();

        modal.open_camera(&camera);
        modal.save(&TaskId::from("t1"), &mut actions);

        assert!(matches!(modal, PhotoModal::Closed));
        assert!(actions.photos.is_empty());
        assert_eq!(open_streams.get(), 0);
    }

    #[test]
    fn dropping_the_modal_releases_camera() {
        let (camera, open_streams) = camera(false);
        let mut modal = PhotoModal::default();
        modal.open_camera(&camera);

        drop(modal);

        assert_eq!(open_streams.get(), 0);
    }

    #[test]
    fn only_one_modal_at_a_time() {
        let (camera, open_streams) = camera(false);
        let mut task = Task::new("t", None);
        task.photo = Some(Photo::jpeg(vec![1]));
        let mut modal = PhotoModal::default();

        modal.view_photo(&task, &DisabledViewer);
        modal.open_camera(&camera);
        assert!(matches!(modal, PhotoModal::PhotoOpen(_)));
        assert_eq!(open_streams.get(), 0);

        modal.close();
        modal.open_camera(&camera);
        modal.view_photo(&task, &DisabledViewer);
        assert!(matches!(modal, PhotoModal::CameraOpen(_)));
    }

    #[test]
    fn view_requires_a_photo() {
        let mut modal = PhotoModal::default();
        modal.view_photo(&Task::new("no photo", None), &DisabledViewer);
        assert!(!modal.is_open());
    }

    fn lines_text(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|span| span.content.as_ref()).collect())
            .collect()
    }

    #[cfg(unix)]
    #[test]
    fn view_hands_photo_to_viewer_until_closed() {
        let mut task = Task::new("receipt", None);
        task.photo = Some(Photo::jpeg(vec![0xff, 0xd8, 0x42, 0xff, 0xd9]));
        let viewer = CommandViewer {
            command: vec!["sh".to_string(), "-c".to_string(), "true".to_string()],
        };
        let mut modal = PhotoModal::default();

        modal.view_photo(&task, &viewer);

        let PhotoModal::PhotoOpen(Ok(shown)) = &modal else {
            panic!("viewer did not start: {modal:?}");
        };
        let path = shown.path().to_path_buf();
        assert_eq!(std::fs::read(&path).unwrap(), vec![0xff, 0xd8, 0x42, 0xff, 0xd9]);
        assert!(lines_text(&get_photo_modal_ui(&modal, &task)).contains(&"Opened in sh".to_string()));

        modal.close();
        assert!(!path.exists());
    }

    #[test]
    fn viewer_failure_is_shown_in_the_modal() {
        let mut task = Task::new("receipt", None);
        task.photo = Some(Photo::jpeg(vec![1]));
        let mut modal = PhotoModal::default();

        modal.view_photo(&task, &DisabledViewer);

        assert!(matches!(modal, PhotoModal::PhotoOpen(Err(_))));
        let text = lines_text(&get_photo_modal_ui(&modal, &task));
        assert!(text.iter().any(|line| line.contains("no viewer configured")));
    }
}
