// Communication with SQLite
// The database plays the role of browser local storage: one table of
// string keys and values, with the whole task list kept under a single key.
// Based on https://github.com/rusqlite/rusqlite/blob/master/examples/persons/main.rs
use log::{debug, warn};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

use crate::app::error::StorageError;
use crate::app::models::Task;

// Key under which the serialized task list is stored
pub const TASKS_KEY: &str = "tasks";

pub struct Storage {
    db_con: Connection,
}

impl Storage {
    // Open (or create) the database file and make sure the table exists
    pub fn open(path: impl AsRef<Path>) -> Result<Storage, StorageError> {
        let storage = Storage {
            db_con: Connection::open(path)?,
        };
        storage.create_table_if_not_exists()?;
        Ok(storage)
    }

    pub fn open_in_memory() -> Result<Storage, StorageError> {
        let storage = Storage {
            db_con: Connection::open_in_memory()?,
        };
        storage.create_table_if_not_exists()?;
        Ok(storage)
    }

    fn create_table_if_not_exists(&self) -> Result<(), StorageError> {
        self.db_con.execute(
            "CREATE TABLE IF NOT EXISTS local_storage (
                Key TEXT PRIMARY KEY NOT NULL,
                Value TEXT NOT NULL
            );",
            (),
        )?;
        Ok(())
    }

    // READ
    pub fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .db_con
            .query_row(
                "SELECT Value FROM local_storage WHERE Key = ?1;",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    // CREATE / UPDATE
    pub fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.db_con.execute(
            "INSERT INTO local_storage (Key, Value) VALUES (?1, ?2)
             ON CONFLICT(Key) DO UPDATE SET Value = excluded.Value;",
            (key, value),
        )?;
        Ok(())
    }

    // DELETE
    pub fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.db_con
            .execute("DELETE FROM local_storage WHERE Key = ?1;", [key])?;
        Ok(())
    }

    /// Reads the task list written by [`Storage::save_tasks`].
    ///
    /// A missing record, a database failure or a record that no longer
    /// decodes all yield an empty list; the cause is logged.
    pub fn load_tasks(&self) -> Vec<Task> {
        let raw = match self.get_item(TASKS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("event=tasks_load module=storage status=ok reason=absent count=0");
                return Vec::new();
            }
            Err(err) => {
                warn!("event=tasks_load module=storage status=error error={err}");
                return Vec::new();
            }
        };

        return match serde_json::from_str::<Vec<Task>>(&raw) {
            Ok(tasks) => {
                debug!(
                    "event=tasks_load module=storage status=ok count={}",
                    tasks.len()
                );
                tasks
            }
            Err(err) => {
                warn!("event=tasks_load module=storage status=error reason=malformed error={err}");
                Vec::new()
            }
        };
    }

    // Overwrite the stored record with the whole collection
    pub fn save_tasks(&self, tasks: &[Task]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(tasks)?;
        self.set_item(TASKS_KEY, &raw)?;
        debug!(
            "event=tasks_save module=storage status=ok count={} bytes={}",
            tasks.len(),
            raw.len()
        );
        Ok(())
    }
}
