//! The contract with the media player that hosts the overlays.  The player
//! owns its DOM; the engine only reads the landmarks below and mounts
//! overlays into rows it is handed.

use std::{fmt, hash::Hash};

use crossbeam_channel::Sender;

use crate::{engine::EngineMsg, overlay::OverlayView, page::PageKind, track::Track};

/// A row of the host's virtualized track grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowInfo<R> {
    pub row: R,
    /// The 1-based `aria-rowindex`.  Index 1 is the grid header.
    pub index: usize,
    /// Rows of the "recommended tracks" list below a playlist are not part of
    /// the page's ordering.
    pub recommended: bool,
}

pub trait HostView: Send + 'static {
    type Row: Clone + Eq + Hash + fmt::Debug + Send;

    /// Current navigation path.
    fn location(&self) -> String;

    /// `data-test-uri` of the playlist page section, when rendered.
    fn playlist_uri(&self) -> Option<String>;

    /// `role="row"` elements of the page container for `kind`, in DOM order.
    /// `None` when the container is not rendered.
    fn rows(&self, kind: PageKind) -> Option<Vec<RowInfo<Self::Row>>>;

    /// `aria-rowcount` of the page's grid.
    fn row_count(&self, kind: PageKind) -> Option<usize>;

    /// Render `overlay` into the row's leading section, replacing whatever
    /// was there.  Returns `false` if the row has no such section.
    fn mount_overlay(&mut self, row: &Self::Row, overlay: OverlayView) -> bool;

    fn unmount_overlay(&mut self, row: &Self::Row);

    /// Render into the now-playing widget, or empty it with `None`.  Returns
    /// `false` while the widget is not rendered.
    fn mount_now_playing(&mut self, overlay: Option<OverlayView>) -> bool;

    /// (Re)attach the structural observer of the main content container.
    /// Returns `false` when the container does not exist yet.
    fn observe_content(&mut self) -> bool;

    /// Watch `aria-rowcount` on the grid of `kind`, dropping any previous
    /// watch.  `None` only drops it.  Returns `false` when the grid is absent.
    fn observe_row_count(&mut self, kind: Option<PageKind>) -> bool;
}

/// Fire-and-forget user notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        log::info!("notification: {}", message);
    }
}

/// What the host reports back to a running engine.
#[derive(Clone)]
pub struct HostEvents {
    sender: Sender<EngineMsg>,
}

impl HostEvents {
    pub fn new(sender: Sender<EngineMsg>) -> Self {
        Self { sender }
    }

    /// Structural mutation below the main content container.
    pub fn content_mutated(&self) {
        self.post(EngineMsg::ContentMutated);
    }

    /// Structural mutation anywhere in the document body.
    pub fn body_mutated(&self) {
        self.post(EngineMsg::BodyMutated);
    }

    /// The main content container was replaced or removed.
    pub fn content_detached(&self) {
        self.post(EngineMsg::ContentDetached);
    }

    pub fn row_count_mutated(&self) {
        self.post(EngineMsg::RowCountMutated);
    }

    pub fn track_changed(&self, track: Option<Track>) {
        if self.sender.send(EngineMsg::TrackChanged(track)).is_err() {
            log::warn!("engine is not running");
        }
    }

    fn post(&self, msg: EngineMsg) {
        // A full inbox drops the mutation, the reconcile timer covers it.
        if let Err(err) = self.sender.try_send(msg) {
            log::debug!("dropped host event: {}", err);
        }
    }
}
