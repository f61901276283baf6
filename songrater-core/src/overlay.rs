use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    bus::{RatingEvent, Subscription},
    error::Error,
    rating::MAX_STARS,
    sync::{RatingChange, RatingSync},
    track::Track,
};

#[derive(Debug, Default)]
struct OverlayState {
    rating: u8,
    hovered: u8,
}

/// A mounted star control.  Listens for rating changes of its track for as
/// long as it lives.
pub struct RatingOverlay {
    view: OverlayView,
    _subscription: Subscription,
}

impl RatingOverlay {
    pub fn mount(track: Track, ratings: &Arc<RatingSync>, editable: bool) -> Self {
        let state = Arc::new(Mutex::new(OverlayState {
            rating: ratings.rating(&track.uri),
            hovered: 0,
        }));
        let subscription = ratings.bus().subscribe(track.uri.clone(), {
            let state = state.clone();
            move |event: &RatingEvent| {
                state.lock().rating = if event.clear { 0 } else { event.rating };
            }
        });
        Self {
            view: OverlayView {
                track,
                editable,
                state,
                ratings: ratings.clone(),
            },
            _subscription: subscription,
        }
    }

    pub fn view(&self) -> OverlayView {
        self.view.clone()
    }

    pub fn track(&self) -> &Track {
        &self.view.track
    }
}

/// The handle a host renders from and forwards input to.
#[derive(Clone)]
pub struct OverlayView {
    track: Track,
    editable: bool,
    state: Arc<Mutex<OverlayState>>,
    ratings: Arc<RatingSync>,
}

impl OverlayView {
    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn max_stars(&self) -> u8 {
        MAX_STARS
    }

    pub fn rating(&self) -> u8 {
        self.state.lock().rating
    }

    /// Stars drawn filled: the hovered star while hovering, else the rating.
    pub fn filled(&self) -> u8 {
        let state = self.state.lock();
        if state.hovered > 0 {
            state.hovered
        } else {
            state.rating
        }
    }

    pub fn hover(&self, star: u8) {
        if self.editable {
            self.state.lock().hovered = star.min(MAX_STARS);
        }
    }

    pub fn leave(&self) {
        if self.editable {
            self.state.lock().hovered = 0;
        }
    }

    pub fn click(&self, star: u8) -> Result<Option<RatingChange>, Error> {
        if !self.editable {
            return Ok(None);
        }
        self.ratings.set_rating(&self.track, star).map(Some)
    }
}
