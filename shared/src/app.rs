use chrono::NaiveDate;
use secrecy::SecretString;
use tracing::{debug, info, warn};

use crate::capabilities::{decode_value, ApiConfig, Capabilities, StoredKey};
use crate::event::{Event, Screen};
use crate::model::{CachedUser, Model, Role, Session, SessionState, TrainerId, UserId};
use crate::screens::{
    self, clear_stored, community, favorites, food_log, leaderboard, load_stored, profile,
    reminders, store, subscriptions, trainer,
};
use crate::view::{self, ViewModel};
use crate::{AppError, ValidationError};

#[derive(Default)]
pub struct App;

impl App {
    fn configure(model: &mut Model, base_url: &str) {
        match ApiConfig::new(base_url) {
            Ok(config) => {
                info!(base_url = config.base_url(), "api configured");
                model.config = config;
            }
            Err(error) => {
                warn!(%error, "rejected api base url, keeping previous");
                model.set_error(AppError::from(error).with_context("setting", "base_url"));
            }
        }
    }

    fn app_started(model: &mut Model, caps: &Capabilities, today: NaiveDate) {
        model.today = today;
        if model.food_log.entries.is_none() {
            model.food_log.selected_date = today;
        }
        if model.session.ready().is_none() {
            model.session = SessionState::Restoring;
            load_stored(caps, StoredKey::CurrentUser);
        }
    }

    fn date_changed(model: &mut Model, caps: &Capabilities, today: NaiveDate) {
        let previous = model.today;
        if previous == today {
            return;
        }
        model.today = today;
        // A log left on "today" follows the calendar; a day picked by hand stays.
        if model.food_log.selected_date == previous {
            model.food_log.selected_date = today;
            model.food_log.entries = None;
            if model.active_screen == Some(Screen::FoodLog) {
                food_log::fetch(model, caps, false);
            }
        }
    }

    fn session_started(
        model: &mut Model,
        caps: &Capabilities,
        user_id: UserId,
        token: SecretString,
        display_name: String,
        role: Role,
        trainer_id: Option<TrainerId>,
    ) {
        if user_id.as_str().trim().is_empty() {
            warn!("session started without a user id");
            model.set_error(AppError::from(ValidationError::Blank { field: "user id" }));
            return;
        }

        let same_user = model
            .session
            .ready()
            .is_some_and(|s| s.user_id == user_id);
        if !same_user {
            // Nothing fetched for another identity may survive into this one.
            let active = model.active_screen;
            screens::cancel_all(model);
            model.reset_screens();
            model.active_screen = active;
        }

        let session = Session {
            user_id,
            token,
            display_name,
            role,
            trainer_id,
        };
        store(caps, StoredKey::CurrentUser, &session.cached_user());
        info!(role = ?session.role, "session started");
        model.session = SessionState::SignedIn(session);

        if let Some(screen) = model.active_screen {
            screens::fetch(screen, model, caps, false);
        }
    }

    fn signed_out(model: &mut Model, caps: &Capabilities) {
        screens::cancel_all(model);
        model.reset_screens();
        model.clear_toast();
        model.clear_error();
        model.session = SessionState::SignedOut { cached: None };
        clear_stored(caps, StoredKey::CurrentUser);
        info!("signed out");
    }

    fn screen_focused(model: &mut Model, caps: &Capabilities, screen: Screen) {
        if let Some(previous) = model.active_screen.filter(|s| *s != screen) {
            screens::cancel(previous, model);
        }
        model.active_screen = Some(screen);
        screens::fetch(screen, model, caps, false);
    }

    fn screen_blurred(model: &mut Model, screen: Screen) {
        screens::cancel(screen, model);
        if model.active_screen == Some(screen) {
            model.active_screen = None;
        }
    }

    fn stored_value_loaded(
        model: &mut Model,
        key: &StoredKey,
        result: Result<Option<Vec<u8>>, String>,
    ) {
        match key {
            StoredKey::CurrentUser => {
                if !model.session.is_restoring() {
                    debug!("session already settled, ignoring cached user");
                    return;
                }
                let cached = match decode_value::<CachedUser>(result) {
                    Ok(cached) => cached,
                    Err(error) => {
                        warn!(%error, "unreadable cached user");
                        None
                    }
                };
                model.session = SessionState::SignedOut { cached };
            }
            StoredKey::LastCheckIn(_) | StoredKey::CheckInDay(..) => {
                profile::stored_value(model, key, result);
            }
            StoredKey::FavoritesCache(_) => favorites::stored_value(model, key, result),
        }
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        let event_name = event.name();
        if event.is_user_initiated() {
            info!(event = event_name, "user action");
        } else {
            debug!(event = event_name, "event");
        }
        let render = !matches!(event, Event::StoredValueWritten { .. });

        match event {
            Event::Configure { base_url } => Self::configure(model, &base_url),
            Event::AppStarted { today } => Self::app_started(model, caps, today),
            Event::DateChanged { today } => Self::date_changed(model, caps, today),

            Event::SessionStarted {
                user_id,
                token,
                display_name,
                role,
                trainer_id,
            } => Self::session_started(
                model,
                caps,
                user_id,
                token,
                display_name,
                role,
                trainer_id,
            ),
            Event::SignedOut => Self::signed_out(model, caps),

            Event::ScreenFocused(screen) => Self::screen_focused(model, caps, screen),
            Event::ScreenBlurred(screen) => Self::screen_blurred(model, screen),
            Event::RefreshRequested(screen) => screens::fetch(screen, model, caps, true),

            Event::DismissToast => model.clear_toast(),
            Event::DismissError => model.clear_error(),

            Event::Profile(e) => profile::update(e, model, caps),
            Event::Subscriptions(e) => subscriptions::update(e, model, caps),
            Event::FoodLog(e) => food_log::update(e, model, caps),
            Event::Leaderboard(e) => leaderboard::update(e, model, caps),
            Event::Reminders(e) => reminders::update(e, model, caps),
            Event::Trainer(e) => trainer::update(e, model, caps),
            Event::Favorites(e) => favorites::update(e, model, caps),
            Event::Community(e) => community::update(e, model, caps),

            Event::StoredValueLoaded { key, result } => {
                Self::stored_value_loaded(model, &key, result);
            }
            Event::StoredValueWritten { key, result } => {
                if let Err(error) = result {
                    warn!(key = key.name(), %error, "device storage write failed");
                }
            }
        }

        if render {
            caps.render.render();
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        view::build(model)
    }
}
