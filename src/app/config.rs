//! Runtime settings read from the environment.
//!
//! Values come from process environment variables, with a `.env` file in the
//! working directory loaded first when present. Every setting has a default.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use derivative::Derivative;
use log::debug;

use crate::app::camera::{Camera, CommandCamera, DisabledCamera};
use crate::app::error::ConfigError;
use crate::app::geolocation::{DisabledGeolocator, FixedGeolocator, Geolocator, IpGeolocator};
use crate::app::logging::default_log_level;
use crate::app::models::Location;
use crate::app::photo_viewer::{CommandViewer, DisabledViewer, PhotoViewer};

const DEFAULT_GEOLOCATION_URL: &str = "http://ip-api.com/json/?fields=status,message,lat,lon";
const DEFAULT_CAMERA_COMMAND: &str =
    "ffmpeg -loglevel error -f v4l2 -i /dev/video0 -frames:v 1 -f image2pipe -vcodec mjpeg -";
const DEFAULT_PHOTO_VIEWER: &str = "xdg-open";

// Where new tasks get their position from
#[derive(Debug, Clone, PartialEq, Default)]
pub enum GeolocationSource {
    #[default]
    Ip,
    Fixed(Location),
    Off,
}

#[derive(Debug, Clone, PartialEq, Derivative)]
#[derivative(Default)]
pub struct Config {
    #[derivative(Default(value = "PathBuf::from(\"todomatic.db\")"))]
    pub db_path: PathBuf,
    #[derivative(Default(value = "default_log_level().to_string()"))]
    pub log_level: String,
    // Resolved against the working directory when not set
    pub log_dir: Option<PathBuf>,
    pub geolocation: GeolocationSource,
    #[derivative(Default(value = "DEFAULT_GEOLOCATION_URL.to_string()"))]
    pub geolocation_url: String,
    #[derivative(Default(value = "Duration::from_secs(10)"))]
    pub geolocation_timeout: Duration,
    #[derivative(Default(value = "PathBuf::from(\"/dev/video0\")"))]
    pub camera_device: PathBuf,
    #[derivative(Default(value = "split_command(DEFAULT_CAMERA_COMMAND)"))]
    pub camera_command: Vec<String>,
    #[derivative(Default(value = "split_command(DEFAULT_PHOTO_VIEWER)"))]
    pub photo_viewer: Vec<String>,
    #[derivative(Default(value = "Duration::from_millis(250)"))]
    pub tick_rate: Duration,
}

impl Config {
    // Load `.env` (if any) and read the process environment
    pub fn from_env() -> Result<Config, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("event=config_dotenv module=config status=ok path={}", path.display()),
            Err(err) if err.not_found() => {}
            Err(err) => {
                return Err(ConfigError::invalid(".env", "", err.to_string()));
            }
        }
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    // Build the configuration from any key lookup, defaults filling the gaps
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        let mut config = Config::default();

        if let Some(value) = lookup("TODOMATIC_DB_PATH") {
            config.db_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("TODOMATIC_LOG_LEVEL") {
            config.log_level = value;
        }
        if let Some(value) = lookup("TODOMATIC_LOG_DIR") {
            config.log_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup("TODOMATIC_GEOLOCATION") {
            config.geolocation = parse_geolocation(&value)?;
        }
        if let Some(value) = lookup("TODOMATIC_GEOLOCATION_URL") {
            config.geolocation_url = value;
        }
        if let Some(value) = lookup("TODOMATIC_GEOLOCATION_TIMEOUT_MS") {
            config.geolocation_timeout = parse_millis("TODOMATIC_GEOLOCATION_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("TODOMATIC_CAMERA_DEVICE") {
            config.camera_device = PathBuf::from(value);
        }
        if let Some(value) = lookup("TODOMATIC_CAMERA_COMMAND") {
            config.camera_command = split_command(&value);
        }
        if let Some(value) = lookup("TODOMATIC_PHOTO_VIEWER") {
            config.photo_viewer = split_command(&value);
        }
        if let Some(value) = lookup("TODOMATIC_TICK_MS") {
            config.tick_rate = parse_millis("TODOMATIC_TICK_MS", &value)?;
        }

        Ok(config)
    }

    // Absolute log directory, `<cwd>/logs` unless configured
    pub fn resolved_log_dir(&self) -> Result<PathBuf, ConfigError> {
        let cwd = std::env::current_dir()?;
        return Ok(match &self.log_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => cwd.join(dir),
            None => cwd.join("logs"),
        });
    }

    pub fn geolocator(&self) -> Arc<dyn Geolocator> {
        match &self.geolocation {
            GeolocationSource::Ip => Arc::new(IpGeolocator::new(self.geolocation_url.clone())),
            GeolocationSource::Fixed(location) => Arc::new(FixedGeolocator {
                location: *location,
            }),
            GeolocationSource::Off => Arc::new(DisabledGeolocator),
        }
    }

    pub fn camera(&self) -> Box<dyn Camera> {
        if self.camera_command.is_empty() {
            return Box::new(DisabledCamera);
        }
        Box::new(CommandCamera {
            device: self.camera_device.clone(),
            capture_command: self.camera_command.clone(),
        })
    }

    pub fn photo_viewer(&self) -> Box<dyn PhotoViewer> {
        if self.photo_viewer.is_empty() {
            return Box::new(DisabledViewer);
        }
        Box::new(CommandViewer {
            command: self.photo_viewer.clone(),
        })
    }
}

fn parse_geolocation(value: &str) -> Result<GeolocationSource, ConfigError> {
    let key = "TODOMATIC_GEOLOCATION";
    let trimmed = value.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "ip" => return Ok(GeolocationSource::Ip),
        "off" | "none" | "disabled" => return Ok(GeolocationSource::Off),
        _ => {}
    }

    let Some(coordinates) = trimmed.strip_prefix("fixed:") else {
        return Err(ConfigError::invalid(key, value, "expected ip, off or fixed:<lat>,<lon>"));
    };
    let (latitude, longitude) = coordinates
        .split_once(',')
        .ok_or_else(|| ConfigError::invalid(key, value, "expected fixed:<lat>,<lon>"))?;
    let latitude: f64 = latitude
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, value, "latitude is not a number"))?;
    let longitude: f64 = longitude
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, value, "longitude is not a number"))?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(ConfigError::invalid(key, value, "coordinates out of range"));
    }

    Ok(GeolocationSource::Fixed(Location {
        latitude,
        longitude,
    }))
}

fn parse_millis(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::invalid(key, value, "must be greater than zero")),
        Ok(millis) => Ok(Duration::from_millis(millis)),
        Err(err) => Err(ConfigError::invalid(key, value, err.to_string())),
    }
}

// Whitespace separated program and arguments; an empty value disables the camera or viewer
fn split_command(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}
