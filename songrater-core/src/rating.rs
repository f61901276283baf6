use std::sync::Arc;

use crate::{error::Error, storage::Storage, track::TrackUri};

pub const MAX_STARS: u8 = 5;

const TRACK_KEY_PREFIX: &str = "TRACK-";

/// Check that `stars` is a settable rating, `1..=MAX_STARS`.
pub fn check_stars(stars: u8) -> Result<u8, Error> {
    if (1..=MAX_STARS).contains(&stars) {
        Ok(stars)
    } else {
        Err(Error::InvalidRating(stars))
    }
}

/// Persisted per-track ratings.  `0` means unrated.
#[derive(Clone)]
pub struct RatingStore {
    storage: Arc<dyn Storage>,
}

impl RatingStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn rating(&self, uri: &TrackUri) -> u8 {
        self.storage
            .get(&Self::key(uri))
            .and_then(|value| value.trim().parse::<u8>().ok())
            .filter(|stars| check_stars(*stars).is_ok())
            .unwrap_or(0)
    }

    pub fn set(&self, uri: &TrackUri, stars: u8) -> Result<(), Error> {
        let stars = check_stars(stars)?;
        self.storage.set(&Self::key(uri), &stars.to_string())
    }

    pub fn clear(&self, uri: &TrackUri) -> Result<(), Error> {
        self.storage.remove(&Self::key(uri))
    }

    fn key(uri: &TrackUri) -> String {
        format!("{TRACK_KEY_PREFIX}{uri}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_unrated_and_garbage_read_as_zero() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set("TRACK-spotify:track:b", "eleven").unwrap();
        storage.set("TRACK-spotify:track:c", "9").unwrap();
        let store = RatingStore::new(storage);

        assert_eq!(store.rating(&"spotify:track:a".into()), 0);
        assert_eq!(store.rating(&"spotify:track:b".into()), 0);
        assert_eq!(store.rating(&"spotify:track:c".into()), 0);
    }

    #[test]
    fn test_out_of_range_rating_is_rejected() {
        let store = RatingStore::new(Arc::new(MemoryStorage::new()));
        assert_eq!(
            store.set(&"spotify:track:a".into(), 6),
            Err(Error::InvalidRating(6))
        );
        store.set(&"spotify:track:a".into(), 5).unwrap();
        assert_eq!(store.rating(&"spotify:track:a".into()), 5);
    }
}
