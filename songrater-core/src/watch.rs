use crate::{cache::TrackCache, host::HostView, page::PageKey};

/// Structural observer of the main content container.  The host may replace
/// the container at any time, so attachment is re-checked on a timer and on
/// body mutations.
#[derive(Debug, Default)]
pub struct ContentWatch {
    attached: bool,
}

impl ContentWatch {
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Returns `true` if this call attached the observer.
    pub fn ensure_attached<H: HostView>(&mut self, host: &mut H) -> bool {
        if self.attached {
            return false;
        }
        self.attached = host.observe_content();
        if self.attached {
            log::debug!("observing main content");
        }
        self.attached
    }

    pub fn detach(&mut self) {
        if self.attached {
            log::debug!("main content detached");
        }
        self.attached = false;
    }
}

/// The single watch of the grid's declared row count.  Follows the current
/// page and is dropped for pages that never change length.
#[derive(Debug, Default)]
pub struct RowCountWatch {
    page: Option<PageKey>,
    previous: Option<usize>,
    armed: bool,
}

impl RowCountWatch {
    pub fn page(&self) -> Option<&PageKey> {
        self.page.as_ref()
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Retarget the watch at `page`, dropping the previous one.
    pub fn watch<H: HostView>(&mut self, page: Option<&PageKey>, host: &mut H) {
        let page = page.filter(|page| page.kind.watches_row_count()).cloned();
        if page == self.page && (self.armed || page.is_none()) {
            return;
        }
        if self.armed {
            host.observe_row_count(None);
        }
        self.page = page;
        self.previous = None;
        self.armed = false;
        self.ensure_armed(host);
    }

    /// Arm the watch if the grid has appeared since the last attempt.
    pub fn ensure_armed<H: HostView>(&mut self, host: &mut H) -> bool {
        let Some(page) = &self.page else {
            return false;
        };
        if !self.armed && host.observe_row_count(Some(page.kind)) {
            log::debug!("watching row count of {}", page);
            self.armed = true;
            self.previous = host.row_count(page.kind);
        }
        self.armed
    }

    /// Handle a row-count attribute mutation.  A changed count drops the
    /// page's cache entry and refetches it.  Returns `true` if a refresh was
    /// started.
    pub fn on_mutation<H: HostView>(&mut self, host: &H, cache: &TrackCache) -> bool {
        let Some(page) = &self.page else {
            return false;
        };
        if !self.armed {
            return false;
        }
        let Some(count) = host.row_count(page.kind) else {
            // Grid is gone, re-armed on the attach timer.
            self.armed = false;
            return false;
        };
        if self.previous == Some(count) {
            return false;
        }
        log::info!(
            "row count of {} changed from {:?} to {}",
            page,
            self.previous,
            count
        );
        self.previous = Some(count);
        cache.invalidate(page);
        cache.refresh(page, count);
        true
    }
}
