use std::sync::Arc;

use crossbeam_channel::Sender;

use crate::{
    actor::{Act, Actor, ActorHandle, Capacity, Timer},
    cache::TrackCache,
    config::Config,
    error::Error,
    fetch::TrackFetcher,
    host::{HostView, Notifier},
    overlay::RatingOverlay,
    page::{PageKey, PageResolver, Resolution},
    rows::{Pass, RowReconciler},
    sync::RatingSync,
    track::Track,
    watch::{ContentWatch, RowCountWatch},
};

const STARTUP_NOTICE: &str = "Song Rater is Working.";

const INBOX_CAPACITY: usize = 128;

pub enum EngineMsg {
    ContentMutated,
    BodyMutated,
    ContentDetached,
    RowCountMutated,
    TrackChanged(Option<Track>),
    /// A track fetch finished.  Failed fetches are retried by the reconcile
    /// timer, not by this message.
    FetchSettled { page: PageKey, loaded: bool },
    Reconcile,
    Attach,
    Shutdown,
}

#[derive(Default)]
struct NowPlaying {
    overlay: Option<RatingOverlay>,
    /// The widget does not show `overlay` yet.
    stale: bool,
}

/// Owns all state tied to the host's DOM.  Runs on its own thread and is
/// driven by host events, settled fetches and two timers: a reconcile
/// backstop and the container re-attach poll.
pub struct Engine<H: HostView> {
    host: H,
    cache: TrackCache,
    resolver: PageResolver,
    rows: RowReconciler<H::Row>,
    content: ContentWatch,
    row_count: RowCountWatch,
    now_playing: NowPlaying,
    ratings: Arc<RatingSync>,
    notifier: Arc<dyn Notifier>,
}

impl<H: HostView> Engine<H> {
    pub fn new(
        host: H,
        fetcher: Arc<TrackFetcher>,
        ratings: Arc<RatingSync>,
        notifier: Arc<dyn Notifier>,
        sender: Sender<EngineMsg>,
    ) -> Self {
        let cache = TrackCache::new(fetcher, notifier.clone()).with_settle_listener(move |page, loaded| {
            let msg = EngineMsg::FetchSettled {
                page: page.clone(),
                loaded,
            };
            if sender.send(msg).is_err() {
                log::debug!("engine stopped before {} settled", page);
            }
        });
        Self {
            host,
            cache,
            resolver: PageResolver::new(),
            rows: RowReconciler::new(),
            content: ContentWatch::default(),
            row_count: RowCountWatch::default(),
            now_playing: NowPlaying::default(),
            ratings,
            notifier,
        }
    }

    /// Spawn the engine thread.  Feed it host events through
    /// `HostEvents::new(handle.sender())`.
    pub fn start(
        config: &Config,
        host: H,
        fetcher: Arc<TrackFetcher>,
        ratings: Arc<RatingSync>,
        notifier: Arc<dyn Notifier>,
    ) -> ActorHandle<EngineMsg> {
        let timers = vec![
            Timer {
                interval: config.reconcile_interval(),
                message: || EngineMsg::Reconcile,
            },
            Timer {
                interval: config.attach_interval(),
                message: || EngineMsg::Attach,
            },
        ];
        Self::spawn(
            Capacity::Bounded(INBOX_CAPACITY),
            timers,
            move |sender| Self::new(host, fetcher, ratings, notifier, sender),
        )
    }

    pub fn current_page(&self) -> Option<&PageKey> {
        self.resolver.current()
    }

    pub fn cache(&self) -> &TrackCache {
        &self.cache
    }

    pub fn rows(&self) -> &RowReconciler<H::Row> {
        &self.rows
    }

    /// Resolution always runs first, a changed page resets the rows before
    /// they are reconciled.
    fn refresh_page(&mut self) {
        self.resolve();
        self.reconcile();
    }

    fn resolve(&mut self) {
        let location = self.host.location();
        let playlist_uri = self.host.playlist_uri();
        let Resolution::Changed(page) = self.resolver.resolve(&location, playlist_uri.as_deref())
        else {
            return;
        };
        match &page {
            Some(page) => log::info!("showing {}", page),
            None => log::info!("left track listings"),
        }
        self.rows.clear(&mut self.host);
        self.row_count.watch(page.as_ref(), &mut self.host);
    }

    fn reconcile(&mut self) {
        let Some(page) = self.resolver.current().cloned() else {
            return;
        };
        let pass = self
            .rows
            .reconcile(&page, &mut self.host, &self.cache, &self.ratings);
        if let Pass::Rendered {
            mounted, removed, ..
        } = pass
        {
            if mounted > 0 || removed > 0 {
                log::debug!("{}: {} mounted, {} removed", page, mounted, removed);
            }
        }
    }

    fn attach(&mut self) {
        if self.content.ensure_attached(&mut self.host) {
            self.refresh_page();
        }
        self.row_count.ensure_armed(&mut self.host);
        self.mount_now_playing();
    }

    fn track_changed(&mut self, track: Option<Track>) {
        self.now_playing.overlay = track.map(|track| RatingOverlay::mount(track, &self.ratings, true));
        self.now_playing.stale = true;
        self.mount_now_playing();
    }

    fn mount_now_playing(&mut self) {
        if !self.now_playing.stale {
            return;
        }
        let view = self.now_playing.overlay.as_ref().map(RatingOverlay::view);
        if self.host.mount_now_playing(view) {
            self.now_playing.stale = false;
        }
    }

    fn teardown(&mut self) {
        self.rows.clear(&mut self.host);
        self.row_count.watch(None, &mut self.host);
        if self.now_playing.overlay.take().is_some() {
            self.host.mount_now_playing(None);
        }
        self.content.detach();
    }
}

impl<H: HostView> Actor for Engine<H> {
    type Message = EngineMsg;
    type Error = Error;

    fn started(&mut self) {
        self.notifier.notify(STARTUP_NOTICE);
        self.content.ensure_attached(&mut self.host);
        self.refresh_page();
    }

    fn handle(&mut self, msg: EngineMsg) -> Result<Act, Error> {
        match msg {
            EngineMsg::ContentMutated | EngineMsg::Reconcile => {
                self.refresh_page();
            }
            EngineMsg::BodyMutated => {
                if self.content.ensure_attached(&mut self.host) {
                    self.refresh_page();
                }
            }
            EngineMsg::ContentDetached => {
                self.content.detach();
                self.attach();
            }
            EngineMsg::RowCountMutated => {
                self.row_count.on_mutation(&self.host, &self.cache);
            }
            EngineMsg::TrackChanged(track) => {
                self.track_changed(track);
            }
            EngineMsg::FetchSettled { page, loaded } => {
                if loaded && self.resolver.current() == Some(&page) {
                    self.reconcile();
                }
            }
            EngineMsg::Attach => {
                self.attach();
            }
            EngineMsg::Shutdown => {
                self.teardown();
                return Ok(Act::Shutdown);
            }
        }
        Ok(Act::Continue)
    }
}
