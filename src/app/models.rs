use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

// Stable identifier of a task. Generated ids look like "todo-<uuid>",
// but any string found in storage is accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn generate() -> TaskId {
        TaskId(format!("todo-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        TaskId(value.to_string())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }

    // Cycle forward through the options, used by the edit selector
    pub fn next(self) -> Priority {
        match self {
            Priority::Low => Priority::Medium,
            Priority::Medium => Priority::High,
            Priority::High => Priority::Low,
        }
    }

    pub fn previous(self) -> Priority {
        match self {
            Priority::Low => Priority::High,
            Priority::Medium => Priority::Low,
            Priority::High => Priority::Medium,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Repeat {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl Repeat {
    pub const ALL: [Repeat; 4] = [Repeat::None, Repeat::Daily, Repeat::Weekly, Repeat::Monthly];

    pub fn as_str(self) -> &'static str {
        match self {
            Repeat::None => "None",
            Repeat::Daily => "Daily",
            Repeat::Weekly => "Weekly",
            Repeat::Monthly => "Monthly",
        }
    }

    pub fn next(self) -> Repeat {
        match self {
            Repeat::None => Repeat::Daily,
            Repeat::Daily => Repeat::Weekly,
            Repeat::Weekly => Repeat::Monthly,
            Repeat::Monthly => Repeat::None,
        }
    }

    pub fn previous(self) -> Repeat {
        match self {
            Repeat::None => Repeat::Monthly,
            Repeat::Daily => Repeat::None,
            Repeat::Weekly => Repeat::Daily,
            Repeat::Monthly => Repeat::Weekly,
        }
    }
}

impl fmt::Display for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Position captured when the task was created
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Encoded still image attached to a task.
///
/// Persisted as a `data:<mime>;base64,<payload>` URL so a stored record
/// stays a single self-contained JSON document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub mime: String,
    pub data: Vec<u8>,
}

impl Photo {
    pub fn jpeg(data: Vec<u8>) -> Photo {
        Photo {
            mime: "image/jpeg".to_string(),
            data,
        }
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.data))
    }

    pub fn from_data_url(url: &str) -> Result<Photo, String> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| "photo is not a data URL".to_string())?;
        let (mime, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| "photo data URL is not base64 encoded".to_string())?;
        let data = STANDARD
            .decode(payload)
            .map_err(|err| format!("photo payload is not valid base64: {err}"))?;

        Ok(Photo {
            mime: mime.to_string(),
            data,
        })
    }
}

impl Serialize for Photo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_data_url())
    }
}

impl<'de> Deserialize<'de> for Photo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let url = String::deserialize(deserializer)?;
        Photo::from_data_url(&url).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, deserialize_with = "deserialize_deadline")]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub repeat: Repeat,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<Photo>,
}

impl Task {
    // A freshly added task: not completed, Low priority, no repeat
    pub fn new(name: impl Into<String>, location: Option<Location>) -> Task {
        Task {
            id: TaskId::generate(),
            name: name.into(),
            completed: false,
            priority: Priority::default(),
            deadline: None,
            repeat: Repeat::default(),
            location,
            photo: None,
        }
    }
}

// The editable subset of a task, committed together from the edit form
#[derive(Debug, Clone, PartialEq)]
pub struct TaskEdit {
    pub name: String,
    pub priority: Priority,
    pub deadline: Option<NaiveDate>,
    pub repeat: Repeat,
}

// A cleared date input used to be stored as "", which means "no deadline"
fn deserialize_deadline<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
