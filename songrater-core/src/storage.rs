use std::{
    collections::{BTreeMap, HashMap},
    fs::File,
    path::{Path, PathBuf},
};

use parking_lot::Mutex;

use crate::{error::Error, util::mkdir_if_not_exists};

/// Local persistent key-value storage for ratings and playlist bindings.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), Error>;
    fn remove(&self, key: &str) -> Result<(), Error>;

    /// Write every entry or none of them.  Entries already written are put
    /// back when a later one fails.
    fn set_all(&self, entries: &[(String, String)]) -> Result<(), Error> {
        let previous: Vec<Option<String>> = entries.iter().map(|(key, _)| self.get(key)).collect();
        for (written, (key, value)) in entries.iter().enumerate() {
            if let Err(err) = self.set(key, value) {
                for ((key, _), old) in entries[..written].iter().zip(&previous) {
                    let restored = match old {
                        Some(old) => self.set(key, old),
                        None => self.remove(key),
                    };
                    if let Err(err) = restored {
                        log::warn!("failed to restore {}: {}", key, err);
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.values.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        self.values.lock().remove(key);
        Ok(())
    }

    fn set_all(&self, entries: &[(String, String)]) -> Result<(), Error> {
        self.values.lock().extend(entries.iter().cloned());
        Ok(())
    }
}

/// A single JSON object on disk, rewritten after every change.
pub struct JsonStorage {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl JsonStorage {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let values = match File::open(&path) {
            Ok(file) => {
                log::info!("loading storage: {:?}", &path);
                serde_json::from_reader(file)?
            }
            Err(_) => BTreeMap::new(),
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &BTreeMap<String, String>) -> Result<(), Error> {
        if let Some(dir) = self.path.parent() {
            mkdir_if_not_exists(dir)?;
        }
        let file = File::create(&self.path)?;
        serde_json::to_writer_pretty(file, values)?;
        Ok(())
    }
}

impl Storage for JsonStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let mut values = self.values.lock();
        values.insert(key.to_owned(), value.to_owned());
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        let mut values = self.values.lock();
        if values.remove(key).is_some() {
            self.flush(&values)?;
        }
        Ok(())
    }

    fn set_all(&self, entries: &[(String, String)]) -> Result<(), Error> {
        let mut values = self.values.lock();
        let previous = values.clone();
        values.extend(entries.iter().cloned());
        if let Err(err) = self.flush(&values) {
            *values = previous;
            return Err(err);
        }
        Ok(())
    }
}
