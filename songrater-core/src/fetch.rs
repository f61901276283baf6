use std::{sync::Arc, thread, time::Duration};

use crate::{
    error::Error,
    page::{PageKey, PageKind},
    track::{RemoteTrack, Track},
};

/// Read endpoints of the remote track API.  Missing entries (deleted or
/// unavailable tracks) come back as `None` in their slot.
pub trait TrackApi: Send + Sync {
    fn playlist_tracks(
        &self,
        playlist_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Option<RemoteTrack>>, Error>;

    fn album_tracks(&self, album_id: &str) -> Result<Vec<Option<RemoteTrack>>, Error>;

    fn saved_tracks(&self, offset: usize, limit: usize) -> Result<Vec<Option<RemoteTrack>>, Error>;
}

/// A span of a source's ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub offset: usize,
    pub limit: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchPolicy {
    pub page_size: usize,
    pub paginated_limit: usize,
    pub saved_tracks_batch: usize,
    pub saved_tracks_cap: usize,
    /// Pause between two window requests of a fetch-all.  The API is vague
    /// about burst limits.
    pub delay: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            page_size: 100,
            paginated_limit: 10_000,
            saved_tracks_batch: 50,
            saved_tracks_cap: 100,
            delay: Duration::from_millis(500),
        }
    }
}

pub struct TrackFetcher {
    api: Arc<dyn TrackApi>,
    policy: FetchPolicy,
}

impl TrackFetcher {
    pub fn new(api: Arc<dyn TrackApi>, policy: FetchPolicy) -> Self {
        Self { api, policy }
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Load one window.  Albums are listed whole, so the window is ignored
    /// for them.
    pub fn fetch_window(&self, page: &PageKey, window: Window) -> Result<Vec<Track>, Error> {
        let batch = match page.kind {
            PageKind::Playlist => self
                .api
                .playlist_tracks(&page.id, window.offset, window.limit)?,
            PageKind::SavedTracks => self.api.saved_tracks(window.offset, window.limit)?,
            PageKind::Album => return self.fetch_album(&page.id),
        };
        Ok(place(batch, window.offset))
    }

    /// Load the complete ordering of a page.  Any failed window fails the
    /// whole operation; nothing accumulated so far is returned.
    pub fn fetch_all(&self, page: &PageKey) -> Result<Vec<Track>, Error> {
        log::debug!("fetching all tracks of {}", page);
        match page.kind {
            PageKind::Playlist => self.paginate(
                page,
                self.policy.page_size,
                self.policy.paginated_limit,
            ),
            PageKind::SavedTracks => self.paginate(
                page,
                self.policy.saved_tracks_batch,
                self.policy.saved_tracks_cap,
            ),
            PageKind::Album => self.fetch_album(&page.id),
        }
    }

    fn fetch_album(&self, album_id: &str) -> Result<Vec<Track>, Error> {
        Ok(place(self.api.album_tracks(album_id)?, 0))
    }

    fn paginate(&self, page: &PageKey, limit: usize, cap: usize) -> Result<Vec<Track>, Error> {
        let mut tracks = Vec::new();
        let mut offset = 0;
        loop {
            let batch = match page.kind {
                PageKind::Playlist => self.api.playlist_tracks(&page.id, offset, limit)?,
                _ => self.api.saved_tracks(offset, limit)?,
            };
            let batch_len = batch.len();
            tracks.extend(place(batch, offset));

            if batch_len < limit || offset + batch_len >= cap {
                break Ok(tracks);
            }
            offset += batch_len;
            thread::sleep(self.policy.delay);
        }
    }
}

/// Index a batch by its position in the source.  Missing entries are
/// dropped without shifting the indices of the ones after them.
fn place(batch: Vec<Option<RemoteTrack>>, offset: usize) -> Vec<Track> {
    batch
        .into_iter()
        .enumerate()
        .filter_map(|(position, item)| item.map(|track| track.at(offset + position)))
        .collect()
}
