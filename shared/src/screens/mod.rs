//! Per-screen state machines.
//!
//! Each screen owns a [`FetchScope`], the records it fetched, and the drafts
//! its modals edit. The functions here are the pieces every screen shares:
//! landing a slice, finishing a mutation, and touching device storage.

pub mod community;
pub mod favorites;
pub mod food_log;
pub mod leaderboard;
pub mod profile;
pub mod reminders;
pub mod subscriptions;
pub mod trainer;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::capabilities::{encode_value, ApiError, ApiResult, Capabilities, StoredKey};
use crate::event::{Event, Screen};
use crate::fetch::{commit_slice, CycleId, FetchScope, SliceKey};
use crate::model::{Model, Session, ToastKind};
use crate::AppError;

/// Outcome of a slice completion.
#[derive(Debug, PartialEq)]
pub(crate) enum Landing {
    /// The cycle was superseded or cancelled; nothing was written.
    Stale,
    Stored,
    Failed { error: ApiError, refreshing: bool },
}

/// Settles `slice` for `cycle` and, when still current, writes `result` into
/// `slot`. A failure keeps whatever `slot` held before.
pub(crate) fn land<S: SliceKey, T>(
    scope: &mut FetchScope<S>,
    cycle: CycleId,
    slice: S,
    slot: &mut Option<T>,
    result: ApiResult<T>,
) -> Landing {
    let refreshing = scope.is_refreshing();
    if !scope.settle(cycle, slice) {
        return Landing::Stale;
    }
    match commit_slice(slot, result, slice.name()) {
        Ok(()) => Landing::Stored,
        Err(error) => Landing::Failed { error, refreshing },
    }
}

/// Background fetch failures stay quiet. A refresh the user asked for gets a
/// toast so the pull-to-refresh gesture isn't answered with silence.
pub(crate) fn report(model: &mut Model, landing: Landing) {
    if let Landing::Failed {
        error,
        refreshing: true,
    } = landing
    {
        let error = AppError::from(error);
        model.show_toast(error.user_facing_message(), ToastKind::Error);
    }
}

/// A request that could not even be built never reaches the transport, so
/// its slice is settled on the spot.
pub(crate) fn issued<S: SliceKey>(
    scope: &mut FetchScope<S>,
    cycle: CycleId,
    slice: S,
    sent: ApiResult<()>,
) {
    if let Err(error) = sent {
        warn!(slice = slice.name(), %error, "request not sent");
        scope.settle(cycle, slice);
    }
}

/// The readiness guard. `None` means "not ready": no request goes out.
pub(crate) fn ready_session(model: &Model, screen: Screen) -> Option<Session> {
    let session = model.session.ready().cloned();
    if session.is_none() {
        debug!(screen = screen.name(), "session not ready, skipping fetch");
    }
    session
}

/// Reports a finished mutation. Returns true when the caller should re-fetch.
pub(crate) fn finish_mutation(
    model: &mut Model,
    action: &'static str,
    result: ApiResult<()>,
    success: &str,
) -> bool {
    match result {
        Ok(()) => {
            info!(action, "mutation succeeded");
            model.show_toast(success, ToastKind::Success);
            true
        }
        Err(error) => {
            warn!(action, %error, "mutation failed");
            let error = AppError::from(error);
            model.show_toast(error.user_facing_message(), ToastKind::Error);
            false
        }
    }
}

/// A mutation whose request could not be built.
pub(crate) fn mutation_not_sent(model: &mut Model, action: &'static str, error: ApiError) {
    warn!(action, %error, "mutation not sent");
    let error = AppError::from(error);
    model.show_toast(error.user_facing_message(), ToastKind::Error);
}

/// Rejected user input.
pub(crate) fn reject(model: &mut Model, error: impl Into<AppError>) {
    let error = error.into();
    debug!(code = error.code(), "input rejected");
    model.show_toast(error.user_facing_message(), ToastKind::Warning);
}

pub(crate) fn load_stored(caps: &Capabilities, key: StoredKey) {
    let raw = match key.raw() {
        Ok(raw) => raw,
        Err(error) => {
            warn!(key = key.name(), %error, "invalid storage key");
            return;
        }
    };
    caps.kv.get(raw, move |result| Event::StoredValueLoaded {
        key,
        result: result.map_err(|e| e.to_string()),
    });
}

/// Fire-and-forget write; the outcome only gets logged.
pub(crate) fn store<T: Serialize>(caps: &Capabilities, key: StoredKey, value: &T) {
    match encode_value(value) {
        Ok(bytes) => write_stored(caps, key, bytes),
        Err(error) => warn!(key = key.name(), %error, "value not stored"),
    }
}

/// Overwrites with an empty value, which reads back as "nothing stored".
pub(crate) fn clear_stored(caps: &Capabilities, key: StoredKey) {
    write_stored(caps, key, Vec::new());
}

fn write_stored(caps: &Capabilities, key: StoredKey, bytes: Vec<u8>) {
    let raw = match key.raw() {
        Ok(raw) => raw,
        Err(error) => {
            warn!(key = key.name(), %error, "invalid storage key");
            return;
        }
    };
    caps.kv.set(raw, bytes, move |result| Event::StoredValueWritten {
        key,
        result: result.map(|_| ()).map_err(|e| e.to_string()),
    });
}

/// Starts a fetch cycle for `screen`.
pub fn fetch(screen: Screen, model: &mut Model, caps: &Capabilities, refreshing: bool) {
    match screen {
        Screen::Profile => profile::fetch(model, caps, refreshing),
        Screen::Subscriptions => subscriptions::fetch(model, caps, refreshing),
        Screen::FoodLog => food_log::fetch(model, caps, refreshing),
        Screen::Leaderboard => leaderboard::fetch(model, caps, refreshing),
        Screen::Reminders => reminders::fetch(model, caps, refreshing),
        Screen::TrainerServices => trainer::fetch(model, caps, refreshing),
        Screen::Favorites => favorites::fetch(model, caps, refreshing),
        Screen::Community => {}
    }
}

/// Aborts `screen`'s in-flight cycle. Its late completions will be dropped.
pub fn cancel(screen: Screen, model: &mut Model) {
    match screen {
        Screen::Profile => {
            model.profile.scope.cancel();
        }
        Screen::Subscriptions => {
            model.subscriptions.scope.cancel();
        }
        Screen::FoodLog => {
            model.food_log.scope.cancel();
        }
        Screen::Leaderboard => {
            model.leaderboard.scope.cancel();
        }
        Screen::Reminders => {
            model.reminders.scope.cancel();
        }
        Screen::TrainerServices => {
            model.trainer.scope.cancel();
        }
        Screen::Favorites => {
            model.favorites.scope.cancel();
        }
        Screen::Community => {}
    }
}

pub fn cancel_all(model: &mut Model) {
    for screen in [
        Screen::Profile,
        Screen::Subscriptions,
        Screen::FoodLog,
        Screen::Leaderboard,
        Screen::Reminders,
        Screen::TrainerServices,
        Screen::Favorites,
        Screen::Community,
    ] {
        cancel(screen, model);
    }
}

/// Re-fetches `screen` after a successful mutation, but only while it's the
/// screen the user is looking at.
pub(crate) fn refetch_if_active(screen: Screen, model: &mut Model, caps: &Capabilities) {
    if model.active_screen == Some(screen) {
        fetch(screen, model, caps, false);
    }
}
