use std::env::var_os;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use log::{debug, error, info, warn};
use serde::{Serialize, Deserialize};
use crate::code::Code;

/// Runtime configuration, read from the JSON file named by `CONFIG_FILE` (`config.json` by
/// default). Missing fields take their defaults.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Where the enrolled code is kept.
    pub code_file: PathBuf,
    /// Code used until one is enrolled.
    pub default_code: Code,
    /// Number dialed when the duress code is entered. No call is placed without one.
    pub emergency_number: Option<String>,
    pub modem_port: String,
    pub modem_baud: u32,
    pub lcd_rows: usize,
    pub lcd_cols: usize,
    pub timings: Timings,
}

impl Config {
    fn path() -> PathBuf {
        PathBuf::from(var_os("CONFIG_FILE").unwrap_or_else(|| OsString::from("config.json")))
    }

    /// Reads the config at `path`. `Ok(None)` if there is no such file.
    pub fn try_load_from(path: &Path) -> std::io::Result<Option<Self>> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let config = serde_json::from_reader(BufReader::new(file))?;
        Ok(Some(config))
    }

    /// Loads the config at `path`, writing the defaults there if the file doesn't exist.
    ///
    /// A file that can't be read or parsed is left as it is and the defaults are used for this
    /// run only.
    pub fn load_from(path: &Path) -> Self {
        debug!("Trying to load config from {}...", path.display());
        match Self::try_load_from(path) {
            Ok(Some(config)) => {
                info!("Config loaded.");
                config
            }
            Ok(None) => {
                info!("Config not found. Using default");
                let config = Config::default();
                match config.save_to(path) {
                    Ok(()) => info!("Default config saved."),
                    Err(e) => warn!("Couldn't save default config to {}: {}", path.display(), e),
                }
                config
            }
            Err(e) => {
                error!("Config file {} is invalid, using defaults: {}", path.display(), e);
                Config::default()
            }
        }
    }

    /// Loads the config named by `CONFIG_FILE`.
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            code_file: PathBuf::from("code.txt"),
            default_code: Code::default(),
            emergency_number: None,
            modem_port: "/dev/serial0".to_string(),
            modem_baud: 9600,
            lcd_rows: 2,
            lcd_cols: 16,
            timings: Timings::default(),
        }
    }
}

/// Every delay of the lock, in milliseconds.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Timings {
    /// Pause between two iterations of the main loop.
    pub poll_ms: u64,
    /// Pause after each handled key press.
    pub debounce_ms: u64,
    /// Pause between keypad polls while waiting for a new code.
    pub idle_poll_ms: u64,
    /// How long a raw keypad reading must be stable to count.
    pub key_debounce_ms: u64,
    /// Number of chances to press the terminator at boot.
    pub prompt_attempts: u32,
    /// How long the status LED is lit for each chance.
    pub prompt_indicator_ms: u64,
    /// Wait after each chance without the terminator.
    pub prompt_window_ms: u64,
    /// How long the door release stays energized.
    pub unlock_hold_ms: u64,
    /// Period of the display reset.
    pub display_clear_ms: u64,
}

impl Timings {
    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    pub fn key_debounce(&self) -> Duration {
        Duration::from_millis(self.key_debounce_ms)
    }

    pub fn prompt_indicator(&self) -> Duration {
        Duration::from_millis(self.prompt_indicator_ms)
    }

    pub fn prompt_window(&self) -> Duration {
        Duration::from_millis(self.prompt_window_ms)
    }

    pub fn unlock_hold(&self) -> Duration {
        Duration::from_millis(self.unlock_hold_ms)
    }

    pub fn display_clear(&self) -> Duration {
        Duration::from_millis(self.display_clear_ms)
    }
}

impl Default for Timings {
    fn default() -> Self {
        Timings {
            poll_ms: 200,
            debounce_ms: 350,
            idle_poll_ms: 20,
            key_debounce_ms: 30,
            prompt_attempts: 2,
            prompt_indicator_ms: 500,
            prompt_window_ms: 1000,
            unlock_hold_ms: 5000,
            display_clear_ms: 5000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{
            "emergency_number": "+15550100",
            "timings": { "unlock_hold_ms": 3000 }
        }"#).unwrap();

        assert_eq!(config.emergency_number.as_deref(), Some("+15550100"));
        assert_eq!(config.timings.unlock_hold(), Duration::from_secs(3));
        assert_eq!(config.timings.poll(), Duration::from_millis(200));
        assert_eq!(config.default_code, Code::default());
        assert_eq!(config.code_file, PathBuf::from("code.txt"));
    }

    #[test]
    fn default_code_is_validated() {
        let result = serde_json::from_str::<Config>(r#"{ "default_code": "12a4" }"#);
        assert!(result.is_err());
    }

    #[test]
    fn round_trips_through_json() {
        let config = Config {
            default_code: "2580".parse().unwrap(),
            ..Config::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<Config>(&json).unwrap(), config);
    }

    #[test]
    fn invalid_file_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let contents = r#"{ "default_code": "12a4", "emergency_number": "+15550100" }"#;
        std::fs::write(&path, contents).unwrap();

        let config = Config::load_from(&path);

        assert_eq!(config, Config::default());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), contents);
    }

    #[test]
    fn missing_file_gets_the_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        assert_eq!(Config::load_from(&path), Config::default());
        assert_eq!(Config::try_load_from(&path).unwrap(), Some(Config::default()));
    }

    #[test]
    fn existing_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "modem_baud": 115200 }"#).unwrap();

        assert_eq!(Config::load_from(&path).modem_baud, 115200);
    }
}
