use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{error::Error, rating::MAX_STARS, storage::Storage};

const PLAYLIST_KEY_PREFIX: &str = "SONGRATING-PLAYLIST-";

pub const SAVED_NOTICE: &str = "Playlists saved successfully. Song ratings will be added to them.";
pub const INCOMPLETE_NOTICE: &str = "You need to add the URL for all playlists.";
pub const CLEARED_NOTICE: &str = "All playlist settings have been deleted.";

static PLAYLIST_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?://open\.spotify\.com/playlist/|spotify:playlist:)([a-zA-Z0-9]+)(\?.*)?$")
        .expect("valid playlist URL pattern")
});

/// The playlist a rating level is mirrored into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaylistBinding {
    url: Arc<str>,
    playlist_id: Arc<str>,
}

impl PlaylistBinding {
    /// Accepts `https://open.spotify.com/playlist/<id>[?...]` and
    /// `spotify:playlist:<id>`.
    pub fn parse(url: &str) -> Option<Self> {
        let url = url.trim();
        let caps = PLAYLIST_URL.captures(url)?;
        Some(Self {
            url: url.into(),
            playlist_id: caps[2].into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn playlist_id(&self) -> &str {
        &self.playlist_id
    }
}

/// User-configured playlist per rating level.  An absent or unparseable
/// binding means the level has no sync target.
#[derive(Clone)]
pub struct Bindings {
    storage: Arc<dyn Storage>,
}

impl Bindings {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn get(&self, level: u8) -> Option<PlaylistBinding> {
        if !(1..=MAX_STARS).contains(&level) {
            return None;
        }
        self.storage
            .get(&Self::key(level))
            .and_then(|url| PlaylistBinding::parse(&url))
    }

    /// Stored values for levels `1..=MAX_STARS`, for pre-filling a settings
    /// form.
    pub fn load_all(&self) -> Vec<Option<String>> {
        (1..=MAX_STARS)
            .map(|level| self.storage.get(&Self::key(level)))
            .collect()
    }

    /// Replace every binding.  All `MAX_STARS` URLs must be valid, otherwise
    /// nothing is written.
    pub fn save_all<S: AsRef<str>>(&self, urls: &[S]) -> Result<(), Error> {
        let mut parsed = Vec::with_capacity(MAX_STARS as usize);
        for level in 1..=MAX_STARS {
            let binding = urls
                .get(usize::from(level - 1))
                .and_then(|url| PlaylistBinding::parse(url.as_ref()))
                .ok_or(Error::InvalidBinding { level })?;
            parsed.push((level, binding));
        }
        let entries: Vec<(String, String)> = parsed
            .iter()
            .map(|(level, binding)| (Self::key(*level), binding.url().to_owned()))
            .collect();
        self.storage.set_all(&entries)?;
        log::info!("saved playlist bindings");
        Ok(())
    }

    pub fn clear_all(&self) -> Result<(), Error> {
        for level in 1..=MAX_STARS {
            self.storage.remove(&Self::key(level))?;
        }
        Ok(())
    }

    fn key(level: u8) -> String {
        format!("{PLAYLIST_KEY_PREFIX}{level}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_accepted_url_forms() {
        let web = PlaylistBinding::parse("https://open.spotify.com/playlist/37i9dQZF1DX?si=abc").unwrap();
        assert_eq!(web.playlist_id(), "37i9dQZF1DX");

        let uri = PlaylistBinding::parse("  spotify:playlist:37i9dQZF1DX ").unwrap();
        assert_eq!(uri.playlist_id(), "37i9dQZF1DX");
        assert_eq!(uri.url(), "spotify:playlist:37i9dQZF1DX");

        assert!(PlaylistBinding::parse("https://open.spotify.com/album/37i9dQZF1DX").is_none());
        assert!(PlaylistBinding::parse("spotify:playlist:").is_none());
        assert!(PlaylistBinding::parse("").is_none());
    }

    #[test]
    fn test_one_invalid_url_saves_nothing() {
        let storage = Arc::new(MemoryStorage::new());
        let bindings = Bindings::new(storage);
        let urls = [
            "spotify:playlist:one",
            "spotify:playlist:two",
            "not a playlist",
            "spotify:playlist:four",
            "spotify:playlist:five",
        ];

        assert_eq!(
            bindings.save_all(&urls),
            Err(Error::InvalidBinding { level: 3 })
        );
        assert_eq!(bindings.load_all(), vec![None; 5]);
    }

    #[test]
    fn test_missing_level_saves_nothing() {
        let bindings = Bindings::new(Arc::new(MemoryStorage::new()));
        assert_eq!(
            bindings.save_all(&["spotify:playlist:one"]),
            Err(Error::InvalidBinding { level: 2 })
        );
        assert!(bindings.get(1).is_none());
    }

    /// Memory storage whose writes to one key fail.
    struct FailingKey {
        inner: MemoryStorage,
        key: String,
    }

    impl Storage for FailingKey {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), Error> {
            if key == self.key {
                return Err(Error::StorageError("disk full".into()));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), Error> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_failed_write_saves_nothing() {
        let storage = Arc::new(FailingKey {
            inner: MemoryStorage::new(),
            key: format!("{PLAYLIST_KEY_PREFIX}4"),
        });
        storage.inner.set(&format!("{PLAYLIST_KEY_PREFIX}1"), "spotify:playlist:old").unwrap();
        let bindings = Bindings::new(storage.clone());
        let urls: Vec<String> = (1..=5).map(|n| format!("spotify:playlist:list{n}")).collect();

        assert!(matches!(
            bindings.save_all(&urls),
            Err(Error::StorageError(_))
        ));
        assert_eq!(
            bindings.load_all(),
            vec![Some("spotify:playlist:old".to_owned()), None, None, None, None]
        );
    }

    #[test]
    fn test_save_and_clear_all() {
        let bindings = Bindings::new(Arc::new(MemoryStorage::new()));
        let urls: Vec<String> = (1..=5)
            .map(|n| format!("https://open.spotify.com/playlist/list{n}"))
            .collect();

        bindings.save_all(&urls).unwrap();
        assert_eq!(bindings.get(4).unwrap().playlist_id(), "list4");
        assert!(bindings.get(0).is_none());
        assert!(bindings.get(6).is_none());

        bindings.clear_all().unwrap();
        assert_eq!(bindings.load_all(), vec![None; 5]);
    }
}
