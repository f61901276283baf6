use std::{
    collections::HashMap,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use parking_lot::Mutex;
use threadpool::ThreadPool;

use crate::{
    error::Error,
    fetch::{TrackFetcher, Window},
    host::Notifier,
    page::{PageKey, PageKind},
    promise::SharedPromise,
    track::TrackList,
};

const FETCH_THREADS: usize = 2;

const SAVED_TRACKS_NOTICE: &str = "Rating stars will load only the first 100 liked songs.";

/// An in-flight fetch-all, deferred with the row count it was started for.
pub type PendingFetch = SharedPromise<TrackList, usize>;

pub enum TrackFetch {
    Ready(TrackList),
    Pending(Arc<PendingFetch>),
}

struct CacheEntry {
    tracks: TrackList,
    row_count: usize,
}

#[derive(Default)]
struct Tables {
    entries: HashMap<PageKey, CacheEntry>,
    pending: HashMap<PageKey, Arc<PendingFetch>>,
}

type SettleListener = Arc<dyn Fn(&PageKey, bool) + Send + Sync>;

/// Full track lists per page identity.  An entry is either complete for the
/// row count it was fetched at or absent; at most one fetch per page is in
/// flight at any time.
pub struct TrackCache {
    fetcher: Arc<TrackFetcher>,
    notifier: Arc<dyn Notifier>,
    tables: Arc<Mutex<Tables>>,
    pool: Mutex<ThreadPool>,
    on_settle: Option<SettleListener>,
}

impl TrackCache {
    pub fn new(fetcher: Arc<TrackFetcher>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            fetcher,
            notifier,
            tables: Arc::new(Mutex::new(Tables::default())),
            pool: Mutex::new(ThreadPool::with_name("track_fetch".into(), FETCH_THREADS)),
            on_settle: None,
        }
    }

    /// Called on the fetch worker after every settled fetch with whether the
    /// tracks were stored.
    pub fn with_settle_listener(
        mut self,
        listener: impl Fn(&PageKey, bool) + Send + Sync + 'static,
    ) -> Self {
        self.on_settle = Some(Arc::new(listener));
        self
    }

    /// Blocking lookup.  Concurrent callers for the same page share one
    /// fetch and all receive its result.
    pub fn get(
        &self,
        page: &PageKey,
        window: Window,
        force: bool,
        live_row_count: usize,
    ) -> Result<TrackList, Error> {
        match self.request(page, window, force, live_row_count) {
            TrackFetch::Ready(tracks) => Ok(tracks),
            TrackFetch::Pending(pending) => pending.wait(),
        }
    }

    /// Non-blocking lookup.  The entry always holds the page's full
    /// ordering; `window` only describes the rows the caller is about to
    /// read.
    pub fn request(
        &self,
        page: &PageKey,
        window: Window,
        force: bool,
        live_row_count: usize,
    ) -> TrackFetch {
        let mut tables = self.tables.lock();
        if !force {
            if let Some(entry) = tables.entries.get_mut(page) {
                entry.row_count = live_row_count;
                return TrackFetch::Ready(entry.tracks.clone());
            }
        }
        if let Some(pending) = tables.pending.get(page) {
            return TrackFetch::Pending(pending.clone());
        }

        log::debug!(
            "loading {} for rows {}..{} (force: {})",
            page,
            window.offset,
            window.offset + window.limit,
            force
        );
        tables.entries.remove(page);
        let pending = Arc::new(PendingFetch::deferred(live_row_count));
        tables.pending.insert(page.clone(), pending.clone());
        drop(tables);

        self.launch(page.clone(), pending.clone(), live_row_count, force);
        TrackFetch::Pending(pending)
    }

    /// Drop the entry so the next lookup refetches.
    pub fn invalidate(&self, page: &PageKey) {
        if self.tables.lock().entries.remove(page).is_some() {
            log::debug!("invalidated {}", page);
        }
    }

    /// Refetch the page's full ordering in the background and store it.
    pub fn refresh(&self, page: &PageKey, live_row_count: usize) -> TrackFetch {
        let window = Window {
            offset: 0,
            limit: self.fetcher.policy().page_size,
        };
        self.request(page, window, true, live_row_count)
    }

    /// Row count the entry (or the fetch in flight) belongs to.
    pub fn row_count(&self, page: &PageKey) -> Option<usize> {
        let tables = self.tables.lock();
        tables
            .entries
            .get(page)
            .map(|entry| entry.row_count)
            .or_else(|| tables.pending.get(page)?.deferred_value())
    }

    pub fn cached(&self, page: &PageKey) -> Option<TrackList> {
        self.tables
            .lock()
            .entries
            .get(page)
            .map(|entry| entry.tracks.clone())
    }

    pub fn is_pending(&self, page: &PageKey) -> bool {
        self.tables.lock().pending.contains_key(page)
    }

    fn launch(&self, page: PageKey, pending: Arc<PendingFetch>, row_count: usize, force: bool) {
        // Refetches of a page already shown do not repeat the notice.
        if page.kind == PageKind::SavedTracks && !force {
            self.notifier.notify(SAVED_TRACKS_NOTICE);
        }
        let fetcher = self.fetcher.clone();
        let tables = self.tables.clone();
        let on_settle = self.on_settle.clone();

        self.pool.lock().execute(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| fetcher.fetch_all(&page)))
                .unwrap_or(Err(Error::FetchAborted))
                .map(TrackList::from);
            {
                let mut tables = tables.lock();
                tables.pending.remove(&page);
                match &result {
                    Ok(tracks) => {
                        log::info!("loaded {} tracks of {}", tracks.len(), page);
                        tables.entries.insert(
                            page.clone(),
                            CacheEntry {
                                tracks: tracks.clone(),
                                row_count,
                            },
                        );
                    }
                    Err(err) => log::warn!("failed to load tracks of {}: {}", page, err),
                }
            }
            let loaded = result.is_ok();
            pending.settle(result);
            if let Some(on_settle) = on_settle {
                on_settle(&page, loaded);
            }
        });
    }
}
