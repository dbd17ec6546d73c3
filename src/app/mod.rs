pub mod add_form;
pub mod camera;
pub mod config;
pub mod error;
pub mod filter;
pub mod geolocation;
pub mod logging;
pub mod models;
pub mod photo_modal;
pub mod photo_viewer;
pub mod storage;
pub mod store;
pub mod task_edit;
pub mod task_list;
pub mod ui;
