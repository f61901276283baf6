use std::{thread, time::Duration};

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use ureq::{
    http::{Response, StatusCode},
    Agent, Body,
};
use url::Url;

use crate::{
    error::Error,
    fetch::TrackApi,
    sync::PlaylistApi,
    track::{RemoteTrack, TrackUri},
    util::default_ureq_agent_builder,
};

const API_BASE: &str = "https://api.spotify.com/v1/";

/// Bearer-authenticated client of the Spotify Web API.
pub struct WebApi {
    agent: Agent,
    token: String,
    base: Url,
}

impl WebApi {
    pub fn new(token: impl Into<String>, proxy_url: Option<&str>) -> Result<Self, Error> {
        Ok(Self {
            agent: default_ureq_agent_builder(proxy_url).build().into(),
            token: token.into(),
            base: Url::parse(API_BASE)?,
        })
    }

    fn request(&self, request: &RequestBuilder) -> Result<Response<Body>, Error> {
        let url = request.build(&self.base)?;
        let authorization = format!("Bearer {}", self.token);
        let response = match request.method {
            Method::Get => self
                .agent
                .get(url.as_str())
                .header("Authorization", &authorization)
                .call()?,
            Method::Post => self
                .agent
                .post(url.as_str())
                .header("Authorization", &authorization)
                .send_json(&request.body)?,
            Method::Delete => self
                .agent
                .delete(url.as_str())
                .header("Authorization", &authorization)
                .force_send_body()
                .send_json(&request.body)?,
        };
        Ok(response)
    }

    fn with_retry(f: impl Fn() -> Result<Response<Body>, Error>) -> Result<Response<Body>, Error> {
        loop {
            let mut response = f()?;
            match response.status() {
                StatusCode::TOO_MANY_REQUESTS => {
                    let retry_after_secs = response
                        .headers()
                        .get("Retry-After")
                        .and_then(|secs| secs.to_str().ok());
                    let secs = retry_after_secs.unwrap_or("2").parse::<u64>().unwrap_or(2);
                    log::debug!("rate limited, retrying in {}s", secs);
                    thread::sleep(Duration::from_secs(secs));
                }
                status if status.is_success() => {
                    break Ok(response);
                }
                status => {
                    let body = response.body_mut().read_to_string().unwrap_or_default();
                    break Err(Error::WebApiError(format!("{}: {}", status, body)));
                }
            }
        }
    }

    /// Send a request and throw away the response body.  Use for POST/DELETE
    /// requests.
    fn send(&self, request: &RequestBuilder) -> Result<(), Error> {
        Self::with_retry(|| self.request(request)).map(|_| ())
    }

    /// Send a request and return the deserialized JSON body.
    fn load<T: DeserializeOwned>(&self, request: &RequestBuilder) -> Result<T, Error> {
        let mut response = Self::with_retry(|| self.request(request))?;
        response
            .body_mut()
            .read_json()
            .map_err(|err| Error::WebApiError(err.to_string()))
    }
}

impl TrackApi for WebApi {
    fn playlist_tracks(
        &self,
        playlist_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Option<RemoteTrack>>, Error> {
        let request = RequestBuilder::new(format!("playlists/{}/tracks", playlist_id), Method::Get)
            .query("offset", offset)
            .query("limit", limit);
        let page: Page<TrackItem> = self.load(&request)?;
        Ok(page.items.into_iter().map(TrackItem::into_remote).collect())
    }

    fn album_tracks(&self, album_id: &str) -> Result<Vec<Option<RemoteTrack>>, Error> {
        let request = RequestBuilder::new(format!("albums/{}", album_id), Method::Get);
        let album: AlbumListing = self.load(&request)?;
        Ok(album
            .tracks
            .items
            .into_iter()
            .map(OptionalTrack::into_remote)
            .collect())
    }

    fn saved_tracks(&self, offset: usize, limit: usize) -> Result<Vec<Option<RemoteTrack>>, Error> {
        let request = RequestBuilder::new("me/tracks", Method::Get)
            .query("offset", offset)
            .query("limit", limit);
        let page: Page<TrackItem> = self.load(&request)?;
        Ok(page.items.into_iter().map(TrackItem::into_remote).collect())
    }
}

impl PlaylistApi for WebApi {
    fn add_tracks(&self, playlist_id: &str, uris: &[TrackUri]) -> Result<(), Error> {
        let request = RequestBuilder::new(format!("playlists/{}/tracks", playlist_id), Method::Post)
            .body(add_body(uris));
        self.send(&request)
    }

    fn remove_tracks(&self, playlist_id: &str, uris: &[TrackUri]) -> Result<(), Error> {
        let request =
            RequestBuilder::new(format!("playlists/{}/tracks", playlist_id), Method::Delete)
                .body(remove_body(uris));
        self.send(&request)
    }
}

fn add_body(uris: &[TrackUri]) -> Value {
    json!({ "uris": uris })
}

fn remove_body(uris: &[TrackUri]) -> Value {
    let tracks: Vec<Value> = uris.iter().map(|uri| json!({ "uri": uri })).collect();
    json!({ "tracks": tracks })
}

#[derive(Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Deserialize)]
struct AlbumListing {
    tracks: Page<OptionalTrack>,
}

/// Entry of a playlist or the saved tracks.  `track` is `null` for removed
/// or unavailable items.
#[derive(Deserialize)]
struct TrackItem {
    #[serde(default)]
    track: Option<OptionalTrack>,
}

impl TrackItem {
    fn into_remote(self) -> Option<RemoteTrack> {
        self.track.and_then(OptionalTrack::into_remote)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OptionalTrack {
    Track(WireTrack),
    Other(Value),
}

impl OptionalTrack {
    fn into_remote(self) -> Option<RemoteTrack> {
        match self {
            Self::Track(track) => Some(RemoteTrack::new(
                track.uri.as_str(),
                &track.name,
                track.artists.iter().map(|artist| artist.name.as_str()),
            )),
            Self::Other(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct WireTrack {
    name: String,
    uri: String,
    #[serde(default)]
    artists: Vec<WireArtist>,
}

#[derive(Deserialize)]
struct WireArtist {
    name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Post,
    Delete,
}

#[derive(Debug, Clone)]
struct RequestBuilder {
    path: String,
    method: Method,
    queries: Vec<(String, String)>,
    body: Value,
}

impl RequestBuilder {
    fn new(path: impl Into<String>, method: Method) -> Self {
        Self {
            path: path.into(),
            method,
            queries: Vec::new(),
            body: Value::Null,
        }
    }

    fn query(mut self, key: impl ToString, value: impl ToString) -> Self {
        self.queries.push((key.to_string(), value.to_string()));
        self
    }

    fn body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    fn build(&self, base: &Url) -> Result<Url, Error> {
        let mut url = base.join(&self.path)?;
        if !self.queries.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.queries);
        }
        Ok(url)
    }
}
