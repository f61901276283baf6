//! Fakes of the host, the remote API and notifications, shared by the unit
//! tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, MutexGuard};

use crate::{
    binding::Bindings,
    error::Error,
    fetch::TrackApi,
    host::{HostView, Notifier, RowInfo},
    overlay::OverlayView,
    page::PageKind,
    rating::RatingStore,
    storage::{MemoryStorage, Storage},
    sync::{PlaylistApi, RatingSync},
    track::{RemoteTrack, TrackUri},
};

pub fn remote_tracks(prefix: &str, count: usize) -> Vec<Option<RemoteTrack>> {
    (0..count)
        .map(|n| {
            Some(RemoteTrack::new(
                format!("spotify:track:{prefix}{n}").as_str(),
                &format!("{prefix} song {n}"),
                ["Artist"],
            ))
        })
        .collect()
}

pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[derive(Default)]
pub struct FakeTrackApi {
    playlists: Mutex<HashMap<String, Vec<Option<RemoteTrack>>>>,
    albums: Mutex<HashMap<String, Vec<Option<RemoteTrack>>>>,
    saved: Mutex<Vec<Option<RemoteTrack>>>,
    windows: Mutex<Vec<(usize, usize)>>,
    calls: AtomicUsize,
    fail_on: Mutex<Option<usize>>,
    gate: Mutex<Option<Receiver<()>>>,
}

impl FakeTrackApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_playlist(&self, id: &str, items: Vec<Option<RemoteTrack>>) {
        self.playlists.lock().insert(id.to_owned(), items);
    }

    pub fn set_album(&self, id: &str, items: Vec<Option<RemoteTrack>>) {
        self.albums.lock().insert(id.to_owned(), items);
    }

    pub fn set_saved(&self, items: Vec<Option<RemoteTrack>>) {
        *self.saved.lock() = items;
    }

    /// Fail the `call`-th request (1-based).
    pub fn fail_on_call(&self, call: usize) {
        *self.fail_on.lock() = Some(call);
    }

    /// Hold every request until a unit is sent on the returned channel.
    pub fn gate(&self) -> Sender<()> {
        let (tx, rx) = crossbeam_channel::unbounded();
        *self.gate.lock() = Some(rx);
        tx
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn windows(&self) -> Vec<(usize, usize)> {
        self.windows.lock().clone()
    }

    fn enter(&self) -> Result<(), Error> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            let _ = gate.recv_timeout(Duration::from_secs(10));
        }
        if *self.fail_on.lock() == Some(call) {
            return Err(Error::WebApiError("injected failure".into()));
        }
        Ok(())
    }

    fn window(
        &self,
        items: &[Option<RemoteTrack>],
        offset: usize,
        limit: usize,
    ) -> Vec<Option<RemoteTrack>> {
        self.windows.lock().push((offset, limit));
        items.iter().skip(offset).take(limit).cloned().collect()
    }
}

impl TrackApi for FakeTrackApi {
    fn playlist_tracks(
        &self,
        playlist_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Option<RemoteTrack>>, Error> {
        self.enter()?;
        let items = self
            .playlists
            .lock()
            .get(playlist_id)
            .cloned()
            .ok_or_else(|| Error::WebApiError("no such playlist".into()))?;
        Ok(self.window(&items, offset, limit))
    }

    fn album_tracks(&self, album_id: &str) -> Result<Vec<Option<RemoteTrack>>, Error> {
        self.enter()?;
        self.albums
            .lock()
            .get(album_id)
            .cloned()
            .ok_or_else(|| Error::WebApiError("no such album".into()))
    }

    fn saved_tracks(&self, offset: usize, limit: usize) -> Result<Vec<Option<RemoteTrack>>, Error> {
        self.enter()?;
        let items = self.saved.lock().clone();
        Ok(self.window(&items, offset, limit))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaylistCall {
    Add(String, TrackUri),
    Remove(String, TrackUri),
}

#[derive(Default)]
pub struct FakePlaylistApi {
    calls: Mutex<Vec<PlaylistCall>>,
    failing: AtomicBool,
}

impl FakePlaylistApi {
    pub fn calls(&self) -> Vec<PlaylistCall> {
        self.calls.lock().clone()
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn record(&self, call: PlaylistCall) -> Result<(), Error> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::WebApiError("injected failure".into()));
        }
        self.calls.lock().push(call);
        Ok(())
    }
}

impl PlaylistApi for FakePlaylistApi {
    fn add_tracks(&self, playlist_id: &str, uris: &[TrackUri]) -> Result<(), Error> {
        for uri in uris {
            self.record(PlaylistCall::Add(playlist_id.to_owned(), uri.clone()))?;
        }
        Ok(())
    }

    fn remove_tracks(&self, playlist_id: &str, uris: &[TrackUri]) -> Result<(), Error> {
        for uri in uris {
            self.record(PlaylistCall::Remove(playlist_id.to_owned(), uri.clone()))?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().push(message.to_owned());
    }
}

/// A rating synchronizer over memory storage with no playlist bindings.
pub fn ratings() -> (Arc<RatingSync>, Arc<FakePlaylistApi>, Arc<RecordingNotifier>) {
    ratings_over(Arc::new(MemoryStorage::new()))
}

/// Same as `ratings`, with level `n` bound to playlist `list<n>`.
pub fn bound_ratings() -> (Arc<RatingSync>, Arc<FakePlaylistApi>, Arc<RecordingNotifier>) {
    let storage = Arc::new(MemoryStorage::new());
    let urls: Vec<String> = (1..=5).map(|n| format!("spotify:playlist:list{n}")).collect();
    Bindings::new(storage.clone()).save_all(&urls).unwrap();
    ratings_over(storage)
}

fn ratings_over(
    storage: Arc<dyn Storage>,
) -> (Arc<RatingSync>, Arc<FakePlaylistApi>, Arc<RecordingNotifier>) {
    let api = Arc::new(FakePlaylistApi::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let sync = RatingSync::new(
        RatingStore::new(storage.clone()),
        Bindings::new(storage),
        api.clone(),
        notifier.clone(),
    );
    (Arc::new(sync), api, notifier)
}

#[derive(Default)]
pub struct HostState {
    pub location: String,
    pub playlist_uri: Option<String>,
    pub rows: HashMap<PageKind, Vec<RowInfo<u32>>>,
    pub row_counts: HashMap<PageKind, usize>,
    /// Rows lacking the section overlays are rendered into.
    pub bare_rows: HashSet<u32>,
    pub mounted: HashMap<u32, OverlayView>,
    pub mount_calls: usize,
    pub now_playing_widget: bool,
    pub now_playing: Option<OverlayView>,
    pub main_present: bool,
    pub content_observers: usize,
    pub row_count_watch: Option<PageKind>,
}

#[derive(Clone, Default)]
pub struct FakeHost(Arc<Mutex<HostState>>);

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, HostState> {
        self.0.lock()
    }

    /// Show the grid of `kind` with rows `(handle, aria-rowindex)`.
    pub fn show_rows(&self, kind: PageKind, rows: &[(u32, usize)], row_count: usize) {
        let mut state = self.state();
        state.rows.insert(
            kind,
            rows.iter()
                .map(|&(row, index)| RowInfo {
                    row,
                    index,
                    recommended: false,
                })
                .collect(),
        );
        state.row_counts.insert(kind, row_count);
    }

    pub fn mounted_uri(&self, row: u32) -> Option<String> {
        self.state()
            .mounted
            .get(&row)
            .map(|view| view.track().uri.to_string())
    }
}

impl HostView for FakeHost {
    type Row = u32;

    fn location(&self) -> String {
        self.state().location.clone()
    }

    fn playlist_uri(&self) -> Option<String> {
        self.state().playlist_uri.clone()
    }

    fn rows(&self, kind: PageKind) -> Option<Vec<RowInfo<u32>>> {
        self.state().rows.get(&kind).cloned()
    }

    fn row_count(&self, kind: PageKind) -> Option<usize> {
        self.state().row_counts.get(&kind).copied()
    }

    fn mount_overlay(&mut self, row: &u32, overlay: OverlayView) -> bool {
        let mut state = self.state();
        if state.bare_rows.contains(row) {
            return false;
        }
        state.mount_calls += 1;
        state.mounted.insert(*row, overlay);
        true
    }

    fn unmount_overlay(&mut self, row: &u32) {
        self.state().mounted.remove(row);
    }

    fn mount_now_playing(&mut self, overlay: Option<OverlayView>) -> bool {
        let mut state = self.state();
        if !state.now_playing_widget {
            return false;
        }
        state.now_playing = overlay;
        true
    }

    fn observe_content(&mut self) -> bool {
        let mut state = self.state();
        if state.main_present {
            state.content_observers += 1;
        }
        state.main_present
    }

    fn observe_row_count(&mut self, kind: Option<PageKind>) -> bool {
        let mut state = self.state();
        match kind {
            Some(kind) if state.row_counts.contains_key(&kind) => {
                state.row_count_watch = Some(kind);
                true
            }
            Some(_) => {
                state.row_count_watch = None;
                false
            }
            None => {
                state.row_count_watch = None;
                true
            }
        }
    }
}
