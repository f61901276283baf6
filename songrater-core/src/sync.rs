use std::sync::Arc;

use parking_lot::Mutex;
use threadpool::ThreadPool;

use crate::{
    binding::{Bindings, PlaylistBinding},
    bus::{RatingBus, RatingEvent},
    error::Error,
    host::Notifier,
    rating::{check_stars, RatingStore},
    track::{Track, TrackUri},
};

// One worker keeps remote updates in the order the ratings changed.
const SYNC_THREADS: usize = 1;

/// Write endpoints of the remote playlist API.
pub trait PlaylistApi: Send + Sync {
    fn add_tracks(&self, playlist_id: &str, uris: &[TrackUri]) -> Result<(), Error>;
    fn remove_tracks(&self, playlist_id: &str, uris: &[TrackUri]) -> Result<(), Error>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RatingChange {
    Rated { previous: u8, rating: u8 },
    Cleared { rating: u8 },
}

/// Owns the rating state transition.  The local rating is updated and
/// broadcast synchronously; playlists are reconciled afterwards on a worker
/// and a failure there never rolls the local state back.
pub struct RatingSync {
    store: RatingStore,
    bindings: Bindings,
    bus: RatingBus,
    api: Arc<dyn PlaylistApi>,
    notifier: Arc<dyn Notifier>,
    pool: Mutex<ThreadPool>,
}

impl RatingSync {
    pub fn new(
        store: RatingStore,
        bindings: Bindings,
        api: Arc<dyn PlaylistApi>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            bindings,
            bus: RatingBus::new(),
            api,
            notifier,
            pool: Mutex::new(ThreadPool::with_name("playlist_sync".into(), SYNC_THREADS)),
        }
    }

    pub fn bus(&self) -> &RatingBus {
        &self.bus
    }

    pub fn rating(&self, uri: &TrackUri) -> u8 {
        self.store.rating(uri)
    }

    /// Rate `track` with `stars`.  Choosing the rating the track already has
    /// clears it.
    pub fn set_rating(&self, track: &Track, stars: u8) -> Result<RatingChange, Error> {
        let stars = check_stars(stars)?;
        let previous = self.store.rating(&track.uri);

        if stars == previous {
            self.store.clear(&track.uri)?;
            self.bus.publish(&RatingEvent {
                uri: track.uri.clone(),
                rating: stars,
                clear: true,
            });
            if let Some(binding) = self.bindings.get(stars) {
                self.sync(track.uri.clone(), Some(binding), None);
            }
            log::info!("cleared rating of {}", track.uri);
            return Ok(RatingChange::Cleared { rating: stars });
        }

        self.store.set(&track.uri, stars)?;
        self.bus.publish(&RatingEvent {
            uri: track.uri.clone(),
            rating: stars,
            clear: false,
        });
        self.notifier
            .notify(&format!("The song '{}' has been rated.", track.name));

        let next = self.bindings.get(stars);
        let stale = Some(previous)
            .filter(|previous| *previous > 0)
            .and_then(|previous| self.bindings.get(previous))
            .filter(|binding| Some(binding) != next.as_ref());
        self.sync(track.uri.clone(), stale, next);

        log::info!("rated {} with {} (was {})", track.uri, stars, previous);
        Ok(RatingChange::Rated {
            previous,
            rating: stars,
        })
    }

    /// Block until every queued playlist update has finished.
    pub fn wait_idle(&self) {
        let pool = self.pool.lock().clone();
        pool.join();
    }

    fn sync(
        &self,
        uri: TrackUri,
        remove_from: Option<PlaylistBinding>,
        add_to: Option<PlaylistBinding>,
    ) {
        if remove_from.is_none() && add_to.is_none() {
            return;
        }
        let api = self.api.clone();
        self.pool.lock().execute(move || {
            let uris = [uri];
            if let Some(binding) = remove_from {
                if let Err(err) = api.remove_tracks(binding.playlist_id(), &uris) {
                    log::warn!(
                        "failed to remove {} from playlist {}: {}",
                        uris[0],
                        binding.playlist_id(),
                        err
                    );
                }
            }
            if let Some(binding) = add_to {
                if let Err(err) = api.add_tracks(binding.playlist_id(), &uris) {
                    log::warn!(
                        "failed to add {} to playlist {}: {}",
                        uris[0],
                        binding.playlist_id(),
                        err
                    );
                }
            }
        });
    }
}
