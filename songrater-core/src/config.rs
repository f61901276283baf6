use std::{env, env::VarError, fs::File, path::PathBuf, time::Duration};

use platform_dirs::AppDirs;
use serde::{Deserialize, Serialize};

use crate::{error::Error, fetch::FetchPolicy, util::mkdir_if_not_exists};

const APP_NAME: &str = "SongRater";
const CONFIG_FILENAME: &str = "config.json";
const STORAGE_FILENAME: &str = "ratings.json";
const PROXY_ENV_VAR: &str = "HTTPS_PROXY";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upper bound on playlist tracks loaded by a single fetch-all.
    pub paginated_limit: usize,
    pub page_size: usize,
    pub saved_tracks_batch: usize,
    pub saved_tracks_cap: usize,
    pub fetch_delay_ms: u64,
    pub reconcile_interval_ms: u64,
    pub attach_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paginated_limit: 10_000,
            page_size: 100,
            saved_tracks_batch: 50,
            saved_tracks_cap: 100,
            fetch_delay_ms: 500,
            reconcile_interval_ms: 1000,
            attach_interval_ms: 500,
        }
    }
}

impl Config {
    fn app_dirs() -> Option<AppDirs> {
        const USE_XDG_ON_MACOS: bool = false;

        AppDirs::new(Some(APP_NAME), USE_XDG_ON_MACOS)
    }

    pub fn config_dir() -> Option<PathBuf> {
        Self::app_dirs().map(|dirs| dirs.config_dir)
    }

    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join(CONFIG_FILENAME))
    }

    pub fn storage_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join(STORAGE_FILENAME))
    }

    pub fn load() -> Result<Option<Config>, Error> {
        let path = Self::config_path()
            .ok_or_else(|| Error::ConfigError("no config directory".into()))?;
        match File::open(&path) {
            Ok(file) => {
                log::info!("loading config: {:?}", &path);
                let config: Config = serde_json::from_reader(file)
                    .map_err(|err| Error::ConfigError(err.to_string()))?;
                config.validate()?;
                Ok(Some(config))
            }
            Err(_) => Ok(None),
        }
    }

    pub fn save(&self) -> Result<(), Error> {
        let dir = Self::config_dir()
            .ok_or_else(|| Error::ConfigError("no config directory".into()))?;
        mkdir_if_not_exists(&dir)?;
        let file = File::create(dir.join(CONFIG_FILENAME))?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.page_size == 0 || self.saved_tracks_batch == 0 {
            return Err(Error::ConfigError("window sizes must be positive".into()));
        }
        Ok(())
    }

    pub fn proxy() -> Option<String> {
        env::var(PROXY_ENV_VAR).map_or_else(
            |err| match err {
                VarError::NotPresent => None,
                VarError::NotUnicode(_) => {
                    log::error!("proxy URL is not a valid unicode");
                    None
                }
            },
            Some,
        )
    }

    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            page_size: self.page_size,
            paginated_limit: self.paginated_limit,
            saved_tracks_batch: self.saved_tracks_batch,
            saved_tracks_cap: self.saved_tracks_cap,
            delay: Duration::from_millis(self.fetch_delay_ms),
        }
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.reconcile_interval_ms)
    }

    pub fn attach_interval(&self) -> Duration {
        Duration::from_millis(self.attach_interval_ms)
    }
}
