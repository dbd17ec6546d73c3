use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

use todomatic::app::filter::{visible_tasks, Filter};
use todomatic::app::geolocation::{locate_once, DisabledGeolocator, GeolocationError, Geolocator};
use todomatic::app::models::{Location, Photo, Priority, Repeat, Task, TaskEdit, TaskId};
use todomatic::app::storage::Storage;
use todomatic::app::store::{TaskActions, TaskStore};

struct DeniedGeolocator;

#[async_trait::async_trait]
impl Geolocator for DeniedGeolocator {
    async fn current_position(&self) -> Result<Location, GeolocationError> {
        Err(GeolocationError::PermissionDenied)
    }
}

fn task(id: &str, priority: Priority) -> Task {
    let mut task = Task::new(id, None);
    task.id = TaskId::from(id);
    task.priority = priority;
    task
}

fn store_with(tasks: &[Task]) -> TaskStore {
    let storage = Storage::open_in_memory().unwrap();
    storage.save_tasks(tasks).unwrap();
    TaskStore::open(storage)
}

#[tokio::test]
async fn add_with_denied_geolocation_creates_task_without_location() {
    let mut store = store_with(&[task("t0", Priority::Medium)]);

    let location = locate_once(&DeniedGeolocator, Duration::from_secs(1)).await;
    let id = store.add("Buy milk", location);

    assert_eq!(store.tasks().len(), 2);
    let added = store.get(&id).unwrap();
    assert_eq!(added.name, "Buy milk");
    assert!(!added.completed);
    assert_eq!(added.priority, Priority::Low);
    assert_eq!(added.repeat, Repeat::None);
    assert_eq!(added.location, None);

    // The whole collection is written, not just the new task
    let saved = store.storage().load_tasks();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved, store.tasks());
}

#[tokio::test]
async fn disabled_geolocation_behaves_like_a_failure() {
    let locator: Arc<dyn Geolocator> = Arc::new(DisabledGeolocator);
    assert_eq!(locate_once(locator.as_ref(), Duration::from_secs(1)).await, None);
}

#[test]
fn high_priority_task_precedes_low_one() {
    let store = store_with(&[task("t1", Priority::Low), task("t2", Priority::High)]);

    let visible = visible_tasks(store.tasks(), Filter::All);

    let ids: Vec<&str> = visible.iter().map(|task| task.id.as_str()).collect();
    assert_eq!(ids, vec!["t2", "t1"]);
    // Deriving the view leaves the stored order alone
    assert_eq!(store.tasks()[0].id.as_str(), "t1");
}

#[test]
fn attach_photo_sets_photo_and_persists_everything() {
    let mut store = store_with(&[task("t1", Priority::Low), task("t2", Priority::High)]);
    let image = Photo::jpeg(vec![0xff, 0xd8, 0x10, 0x20, 0xff, 0xd9]);

    store.attach_photo(&TaskId::from("t1"), image.clone());

    assert_eq!(store.tasks()[0].photo.as_ref(), Some(&image));
    assert_eq!(store.tasks()[1].photo, None);
    assert_eq!(store.storage().load_tasks(), store.tasks());
}

#[test]
fn attach_photo_overwrites_previous_one() {
    let mut store = store_with(&[task("t1", Priority::Low)]);
    let id = TaskId::from("t1");

    store.attach_photo(&id, Photo::jpeg(vec![1]));
    store.attach_photo(&id, Photo::jpeg(vec![2]));

    assert_eq!(store.tasks()[0].photo, Some(Photo::jpeg(vec![2])));
}

#[test]
fn delete_removes_only_the_matching_task() {
    let mut store = store_with(&[
        task("a", Priority::Low),
        task("b", Priority::High),
        task("c", Priority::Medium),
    ]);

    store.delete(&TaskId::from("b"));
    let ids: Vec<&str> = store.tasks().iter().map(|task| task.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c"]);

    store.delete(&TaskId::from("missing"));
    assert_eq!(store.tasks().len(), 2);
    assert_eq!(store.storage().load_tasks(), store.tasks());
}

#[test]
fn toggle_changes_only_the_matching_task() {
    let mut store = store_with(&[task("a", Priority::Low), task("b", Priority::Low)]);
    let before = store.tasks().to_vec();

    store.toggle_completed(&TaskId::from("b"));

    assert_eq!(store.tasks()[0], before[0]);
    let mut expected = before[1].clone();
    expected.completed = true;
    assert_eq!(store.tasks()[1], expected);
}

#[test]
fn edit_on_unknown_id_is_ignored() {
    let mut store = store_with(&[task("a", Priority::Low)]);
    let before = store.tasks().to_vec();

    store.edit(
        &TaskId::from("zzz"),
        TaskEdit {
            name: "nope".to_string(),
            priority: Priority::High,
            deadline: NaiveDate::from_ymd_opt(2030, 1, 1),
            repeat: Repeat::Weekly,
        },
    );

    assert_eq!(store.tasks(), before.as_slice());
}

#[test]
fn tasks_survive_reopening_the_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.db");

    let id = {
        let mut store = TaskStore::open(Storage::open(&path).unwrap());
        let id = store.add(
            "Renew passport",
            Some(Location {
                latitude: -33.86,
                longitude: 151.2,
            }),
        );
        store.edit(
            &id,
            TaskEdit {
                name: "Renew passport".to_string(),
                priority: Priority::High,
                deadline: NaiveDate::from_ymd_opt(2026, 11, 30),
                repeat: Repeat::None,
            },
        );
        store.attach_photo(&id, Photo::jpeg(vec![0xff, 0xd8, 0xff, 0xd9]));
        store.add("Call mum", None);
        id
    };

    let reopened = TaskStore::open(Storage::open(&path).unwrap());

    assert_eq!(reopened.tasks().len(), 2);
    let task = reopened.get(&id).unwrap();
    assert_eq!(task.priority, Priority::High);
    assert_eq!(task.deadline, NaiveDate::from_ymd_opt(2026, 11, 30));
    assert_eq!(task.location.map(|l| l.latitude), Some(-33.86));
    assert_eq!(task.photo, Some(Photo::jpeg(vec![0xff, 0xd8, 0xff, 0xd9])));
    assert_eq!(reopened.tasks()[1].name, "Call mum");
}

#[test]
fn record_written_by_the_web_version_loads() {
    let storage = Storage::open_in_memory().unwrap();
    storage
        .set_item(
            "tasks",
            r#"[
                {"id":"todo-V1StGXR8","name":"Eat","completed":true,"priority":"Low",
                 "deadline":null,"repeat":"None","location":null},
                {"id":"todo-9fjs0xQ2","name":"Sleep","completed":false,"priority":"High",
                 "deadline":"2024-02-29","repeat":"Daily",
                 "location":{"latitude":59.33,"longitude":18.06},
                 "photo":"data:image/jpeg;base64,/9j/2Q=="}
            ]"#,
        )
        .unwrap();

    let store = TaskStore::open(storage);

    assert_eq!(store.tasks().len(), 2);
    let sleep = store.get(&TaskId::from("todo-9fjs0xQ2")).unwrap();
    assert_eq!(sleep.deadline, NaiveDate::from_ymd_opt(2024, 2, 29));
    assert_eq!(sleep.repeat, Repeat::Daily);
    assert_eq!(sleep.photo, Some(Photo::jpeg(vec![0xff, 0xd8, 0xff, 0xd9])));
    assert_eq!(
        visible_tasks(store.tasks(), Filter::Active)
            .iter()
            .map(|task| task.name.as_str())
            .collect::<Vec<_>>(),
        vec!["Sleep"]
    );
}
