//! The in-memory task collection and its mutations.
//!
//! [`TaskStore`] is the single owner of the task list. It is loaded once at
//! startup and every mutation that changes something writes the whole list
//! back to [`Storage`]. Mutations addressed to an unknown id do nothing.

use log::{error, info};

use crate::app::models::{Location, Photo, Task, TaskEdit, TaskId};
use crate::app::storage::Storage;

/// Mutations the presentation components are allowed to request.
pub trait TaskActions {
    /// Appends a new task with default fields and returns its id.
    fn add(&mut self, name: &str, location: Option<Location>) -> TaskId;
    fn toggle_completed(&mut self, id: &TaskId);
    fn delete(&mut self, id: &TaskId);
    /// Replaces name, priority, deadline and repeat of the task.
    fn edit(&mut self, id: &TaskId, edit: TaskEdit);
    fn attach_photo(&mut self, id: &TaskId, photo: Photo);
}

pub struct TaskStore {
    tasks: Vec<Task>,
    storage: Storage,
}

impl TaskStore {
    // Initialize the store with the tasks saved by the previous session
    pub fn open(storage: Storage) -> TaskStore {
        let tasks = storage.load_tasks();
        info!(
            "event=store_open module=store status=ok count={}",
            tasks.len()
        );
        TaskStore { tasks, storage }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    // Perform a function on the task with the given id, then persist.
    // Nothing happens (and nothing is written) when the id is unknown.
    fn apply_for_task(&mut self, id: &TaskId, action: &str, function: impl FnOnce(&mut Task)) {
        match self.tasks.iter_mut().find(|task| &task.id == id) {
            Some(task) => function(task),
            None => {
                info!("event=task_{action} module=store status=ignored reason=unknown_id id={id}");
                return;
            }
        }
        self.persist(action);
    }

    fn persist(&self, action: &str) {
        if let Err(err) = self.storage.save_tasks(&self.tasks) {
            error!("event=task_{action} module=store status=error stage=persist error={err}");
        }
    }
}

impl TaskActions for TaskStore {
    fn add(&mut self, name: &str, location: Option<Location>) -> TaskId {
        let task = Task::new(name, location);
        let id = task.id.clone();
        info!(
            "event=task_add module=store status=ok id={id} has_location={}",
            location.is_some()
        );
        self.tasks.push(task);
        self.persist("add");
        id
    }

    fn toggle_completed(&mut self, id: &TaskId) {
        self.apply_for_task(id, "toggle", |task| task.completed = !task.completed);
    }

    fn delete(&mut self, id: &TaskId) {
        let before = self.tasks.len();
        self.tasks.retain(|task| &task.id != id);
        if self.tasks.len() == before {
            info!("event=task_delete module=store status=ignored reason=unknown_id id={id}");
            return;
        }
        self.persist("delete");
    }

    fn edit(&mut self, id: &TaskId, edit: TaskEdit) {
        self.apply_for_task(id, "edit", |task| {
            task.name = edit.name;
            task.priority = edit.priority;
            task.deadline = edit.deadline;
            task.repeat = edit.repeat;
        });
    }

    fn attach_photo(&mut self, id: &TaskId, photo: Photo) {
        self.apply_for_task(id, "attach_photo", |task| task.photo = Some(photo));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::{Priority, Repeat};
    use chrono::NaiveDate;
    use rstest::{fixture, rstest};

    #[fixture]
    fn store() -> TaskStore {
        TaskStore::open(Storage::open_in_memory().unwrap())
    }

    #[rstest]
    fn open_loads_saved_tasks() {
        let storage = Storage::open_in_memory().unwrap();
        let saved = vec![Task::new("a", None), Task::new("b", None)];
        storage.save_tasks(&saved).unwrap();

        let store = TaskStore::open(storage);

        assert_eq!(store.tasks(), saved.as_slice());
    }

    #[rstest]
    fn add_appends_and_persists(mut store: TaskStore) {
        store.add("first", None);
        let id = store.add("second", Some(Location { latitude: 10.0, longitude: 20.0 }));

        assert_eq!(store.tasks().len(), 2);
        assert_eq!(store.tasks()[1].id, id);
        assert_eq!(
            store.get(&id).unwrap().location,
            Some(Location { latitude: 10.0, longitude: 20.0 })
        );
        assert_eq!(store.storage().load_tasks(), store.tasks());
    }

    #[rstest]
    fn toggle_twice_restores_original(mut store: TaskStore) {
        let id = store.add("x", None);
        store.add("y", None);
        let before = store.tasks().to_vec();

        store.toggle_completed(&id);
        assert!(store.get(&id).unwrap().completed);
        assert!(!store.tasks()[1].completed);
        assert!(store.storage().load_tasks()[0].completed);

        store.toggle_completed(&id);
        assert_eq!(store.tasks(), before.as_slice());
    }

    #[rstest]
    fn edit_leaves_other_fields_alone(mut store: TaskStore) {
        let id = store.add("draft", Some(Location { latitude: 1.0, longitude: 2.0 }));
        store.toggle_completed(&id);
        store.attach_photo(&id, Photo::jpeg(vec![9]));

        store.edit(
            &id,
            TaskEdit {
                name: "final".to_string(),
                priority: Priority::Medium,
                deadline: NaiveDate::from_ymd_opt(2030, 6, 1),
                repeat: Repeat::Daily,
            },
        );

        let task = store.get(&id).unwrap();
        assert_eq!(task.name, "final");
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.deadline, NaiveDate::from_ymd_opt(2030, 6, 1));
        assert_eq!(task.repeat, Repeat::Daily);
        assert_eq!(task.id, id);
        assert!(task.completed);
        assert_eq!(task.location, Some(Location { latitude: 1.0, longitude: 2.0 }));
        assert_eq!(task.photo, Some(Photo::jpeg(vec![9])));
    }

    #[rstest]
    fn unknown_id_does_not_write(mut store: TaskStore) {
        store.add("kept", None);
        store.storage().remove_item(crate::app::storage::TASKS_KEY).unwrap();
        let missing = TaskId::from("todo-missing");

        store.toggle_completed(&missing);
        store.delete(&missing);
        store.attach_photo(&missing, Photo::jpeg(vec![1]));
        store.edit(
            &missing,
            TaskEdit {
                name: "renamed".to_string(),
                priority: Priority::High,
                deadline: NaiveDate::from_ymd_opt(2030, 1, 1),
                repeat: Repeat::Daily,
            },
        );

        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.tasks()[0].name, "kept");
        assert_eq!(
            store
                .storage()
                .get_item(crate::app::storage::TASKS_KEY)
                .unwrap(),
            None
        );
    }
}
