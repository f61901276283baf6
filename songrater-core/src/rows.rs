use std::{
    collections::{HashMap, HashSet},
    hash::Hash,
    sync::Arc,
};

use crate::{
    cache::{TrackCache, TrackFetch},
    fetch::Window,
    host::{HostView, RowInfo},
    overlay::RatingOverlay,
    page::PageKey,
    sync::RatingSync,
    track::TrackUri,
};

/// Fetch window handed to the cache for every pass.
pub const PAGE_SIZE: usize = 100;

/// `aria-rowindex` is 1-based and row 1 is the grid header.
const HEADER_ROWS: usize = 1;

/// Offset of the visible window: the smallest visible row index, minus the
/// header.
pub fn visible_offset<R>(rows: &[RowInfo<R>]) -> Option<usize> {
    rows.iter()
        .map(|row| row.index)
        .min()
        .map(|min| min.saturating_sub(HEADER_ROWS))
}

/// Position in the track list displayed by the row at `row_index`.
pub fn track_position(row_index: usize, offset: usize) -> Option<usize> {
    row_index.checked_sub(offset + HEADER_ROWS + 1)
}

#[derive(Debug, PartialEq, Eq)]
pub enum Pass {
    /// No container or no rows on screen.
    Idle,
    /// The track list is being fetched; a later pass will render.
    Fetching,
    Rendered {
        mounted: usize,
        kept: usize,
        removed: usize,
    },
}

struct RenderedRow {
    uri: TrackUri,
    _overlay: RatingOverlay,
}

/// Maps visible rows of the host's virtualized grid onto the page's track
/// list and keeps one rating overlay mounted per row.
pub struct RowReconciler<R> {
    rendered: HashMap<R, RenderedRow>,
}

impl<R: Clone + Eq + Hash> Default for RowReconciler<R> {
    fn default() -> Self {
        Self {
            rendered: HashMap::new(),
        }
    }
}

impl<R: Clone + Eq + Hash> RowReconciler<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rendered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rendered.is_empty()
    }

    pub fn rendered_uri(&self, row: &R) -> Option<&TrackUri> {
        self.rendered.get(row).map(|rendered| &rendered.uri)
    }

    /// Unmount every overlay and forget all rows.
    pub fn clear<H: HostView<Row = R>>(&mut self, host: &mut H) {
        for (row, _) in self.rendered.drain() {
            host.unmount_overlay(&row);
        }
    }

    pub fn reconcile<H: HostView<Row = R>>(
        &mut self,
        page: &PageKey,
        host: &mut H,
        cache: &TrackCache,
        ratings: &Arc<RatingSync>,
    ) -> Pass {
        let Some(rows) = host.rows(page.kind) else {
            return Pass::Idle;
        };
        let rows: Vec<RowInfo<R>> = rows.into_iter().filter(|row| !row.recommended).collect();
        let Some(offset) = visible_offset(&rows) else {
            return Pass::Idle;
        };

        // Without a declared count there is nothing to compare against.
        let live_row_count = host.row_count(page.kind);
        let force = match (cache.row_count(page), live_row_count) {
            (Some(known), Some(live)) => known != live,
            _ => false,
        };
        let window = Window {
            offset,
            limit: PAGE_SIZE,
        };
        let tracks = match cache.request(page, window, force, live_row_count.unwrap_or(0)) {
            TrackFetch::Ready(tracks) => tracks,
            TrackFetch::Pending(_) => return Pass::Fetching,
        };

        let mut mounted = 0;
        let mut kept = 0;
        for info in &rows {
            let Some(track) = track_position(info.index, offset).and_then(|pos| tracks.get(pos))
            else {
                continue;
            };
            if self.rendered_uri(&info.row) == Some(&track.uri) {
                kept += 1;
                continue;
            }
            if self.rendered.remove(&info.row).is_some() {
                host.unmount_overlay(&info.row);
            }
            let overlay = RatingOverlay::mount(track.clone(), ratings, true);
            if host.mount_overlay(&info.row, overlay.view()) {
                self.rendered.insert(
                    info.row.clone(),
                    RenderedRow {
                        uri: track.uri.clone(),
                        _overlay: overlay,
                    },
                );
                mounted += 1;
            }
        }

        let visible: HashSet<&R> = rows.iter().map(|info| &info.row).collect();
        let before = self.rendered.len();
        self.rendered.retain(|row, _| {
            let keep = visible.contains(row);
            if !keep {
                host.unmount_overlay(row);
            }
            keep
        });

        Pass::Rendered {
            mounted,
            kept,
            removed: before - self.rendered.len(),
        }
    }
}
