use std::{fmt, sync::Arc};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Opaque, globally unique track identity, e.g. `spotify:track:4uLU6hMCjMI75M1A2tKUQC`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackUri(Arc<str>);

impl TrackUri {
    pub fn new(uri: impl Into<Arc<str>>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TrackUri {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

impl fmt::Display for TrackUri {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A track as listed by one of the remote sources.  `index` is the position
/// in the source's full ordering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
    pub uri: TrackUri,
    pub name: Arc<str>,
    pub artists: Arc<str>,
    pub index: usize,
}

impl Track {
    pub fn new(uri: impl Into<TrackUri>, name: impl Into<Arc<str>>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            artists: "".into(),
            index: 0,
        }
    }
}

/// A resolved, ordered track sequence.  Shared by every reader of a cache entry.
pub type TrackList = Arc<[Track]>;

/// Track metadata exactly as returned by a source, before it is placed in
/// the source ordering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteTrack {
    pub uri: TrackUri,
    pub name: Arc<str>,
    pub artists: Arc<str>,
}

impl RemoteTrack {
    pub fn new<'a>(
        uri: impl Into<TrackUri>,
        name: &str,
        artists: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            artists: artists.into_iter().join(", ").into(),
        }
    }

    pub fn at(self, index: usize) -> Track {
        Track {
            uri: self.uri,
            name: self.name,
            artists: self.artists,
            index,
        }
    }
}
