//! TodoMatic: a personal task list for the terminal.
//!
//! Tasks carry a priority, an optional deadline, a repeat cadence, the
//! position where they were created and an optional photo. The list is kept
//! in a local SQLite file and survives restarts.

pub mod app;
