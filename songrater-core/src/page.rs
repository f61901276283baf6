use std::{fmt, sync::Arc};

use once_cell::sync::Lazy;
use regex::Regex;

/// Sentinel page id of the saved tracks ("liked songs") view.
pub const SAVED_TRACKS_ID: &str = "liked";

static ALBUM_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"album/([a-zA-Z0-9]+)").expect("valid album path pattern"));

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PageKind {
    /// An ordered, user-editable collection.
    Playlist,
    /// A fixed-size set, listed in one request.
    Album,
    SavedTracks,
}

impl PageKind {
    /// Albums never change length, so only the other kinds need a row-count
    /// watch.
    pub fn watches_row_count(self) -> bool {
        !matches!(self, PageKind::Album)
    }
}

/// Identity of the listing currently on screen.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub kind: PageKind,
    pub id: Arc<str>,
}

impl PageKey {
    pub fn playlist(id: impl Into<Arc<str>>) -> Self {
        Self {
            kind: PageKind::Playlist,
            id: id.into(),
        }
    }

    pub fn album(id: impl Into<Arc<str>>) -> Self {
        Self {
            kind: PageKind::Album,
            id: id.into(),
        }
    }

    pub fn saved_tracks() -> Self {
        Self {
            kind: PageKind::SavedTracks,
            id: SAVED_TRACKS_ID.into(),
        }
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            PageKind::Playlist => write!(f, "playlist:{}", self.id),
            PageKind::Album => write!(f, "album:{}", self.id),
            PageKind::SavedTracks => write!(f, "saved:{}", self.id),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Candidate {
    Page(PageKey),
    /// The path names a page whose landmark is not rendered yet.
    Waiting,
    NoPage,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Resolution {
    Unchanged,
    Changed(Option<PageKey>),
}

/// Tracks which page is displayed.  Resolution runs on every host mutation,
/// so resolving the same identity again must not produce a transition.
#[derive(Debug, Default)]
pub struct PageResolver {
    current: Option<PageKey>,
}

impl PageResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&PageKey> {
        self.current.as_ref()
    }

    /// `location` is the host navigation path, `playlist_uri` the
    /// `data-test-uri` of the playlist page landmark, if rendered.
    pub fn resolve(&mut self, location: &str, playlist_uri: Option<&str>) -> Resolution {
        let next = match Self::candidate(location, playlist_uri) {
            Candidate::Waiting => return Resolution::Unchanged,
            Candidate::Page(page) => Some(page),
            Candidate::NoPage => None,
        };
        if next == self.current {
            return Resolution::Unchanged;
        }
        self.current = next.clone();
        Resolution::Changed(next)
    }

    fn candidate(location: &str, playlist_uri: Option<&str>) -> Candidate {
        if location.contains("playlist") {
            match playlist_uri.and_then(|uri| uri.split(':').nth(2)) {
                Some(id) if !id.is_empty() => Candidate::Page(PageKey::playlist(id)),
                _ => Candidate::Waiting,
            }
        } else if location.contains("album") {
            match ALBUM_PATH.captures(location) {
                Some(caps) => Candidate::Page(PageKey::album(&caps[1])),
                None => Candidate::Waiting,
            }
        } else if location.contains("collection/tracks") {
            Candidate::Page(PageKey::saved_tracks())
        } else {
            Candidate::NoPage
        }
    }
}
