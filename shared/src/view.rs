//! What the shells render. Everything here is derived from the model on
//! demand; nothing in it is stored.

use serde::{Deserialize, Serialize};

use crate::event::Screen;
use crate::model::{Model, Role, SessionState, ToastKind, UserId};
use crate::screens::{
    community::{self, CommunityView},
    favorites::{self, FavoritesView},
    food_log::{self, FoodLogView},
    leaderboard::{self, LeaderboardView},
    profile::{self, ProfileView},
    reminders::{self, RemindersView},
    subscriptions::{self, SubscriptionsView},
    trainer::{self, TrainerView},
};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ViewModel {
    pub session: SessionView,
    pub screen: ScreenView,
    pub toast: Option<ToastView>,
    pub error: Option<ErrorView>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum SessionView {
    /// Auth still loading. Screens show their skeletons.
    Restoring,
    SignedOut {
        /// Name of the last signed-in user, for a "welcome back" prompt.
        cached_name: Option<String>,
    },
    SignedIn {
        user_id: UserId,
        display_name: String,
        role: Role,
        is_trainer: bool,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum ScreenView {
    None,
    Profile(ProfileView),
    Subscriptions(SubscriptionsView),
    FoodLog(FoodLogView),
    Leaderboard(LeaderboardView),
    Reminders(RemindersView),
    TrainerServices(TrainerView),
    Favorites(FavoritesView),
    Community(CommunityView),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ToastView {
    pub message: String,
    pub kind: ToastKind,
    pub duration_ms: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ErrorView {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

fn session_view(session: &SessionState) -> SessionView {
    match session {
        SessionState::Restoring => SessionView::Restoring,
        SessionState::SignedOut { cached } => SessionView::SignedOut {
            cached_name: cached.as_ref().map(|c| c.display_name.clone()),
        },
        SessionState::SignedIn(s) => SessionView::SignedIn {
            user_id: s.user_id.clone(),
            display_name: s.display_name.clone(),
            role: s.role,
            is_trainer: s.role == Role::Trainer || s.trainer_id.is_some(),
        },
    }
}

fn screen_view(model: &Model) -> ScreenView {
    match model.active_screen {
        None => ScreenView::None,
        Some(Screen::Profile) => ScreenView::Profile(profile::view(model)),
        Some(Screen::Subscriptions) => ScreenView::Subscriptions(subscriptions::view(model)),
        Some(Screen::FoodLog) => ScreenView::FoodLog(food_log::view(model)),
        Some(Screen::Leaderboard) => ScreenView::Leaderboard(leaderboard::view(model)),
        Some(Screen::Reminders) => ScreenView::Reminders(reminders::view(model)),
        Some(Screen::TrainerServices) => ScreenView::TrainerServices(trainer::view(model)),
        Some(Screen::Favorites) => ScreenView::Favorites(favorites::view(model)),
        Some(Screen::Community) => ScreenView::Community(community::view(model)),
    }
}

#[must_use]
pub fn build(model: &Model) -> ViewModel {
    ViewModel {
        session: session_view(&model.session),
        screen: screen_view(model),
        toast: model.active_toast.as_ref().map(|t| ToastView {
            message: t.message.clone(),
            kind: t.kind,
            duration_ms: t.kind.duration_ms(),
        }),
        error: model.active_error.as_ref().map(|e| ErrorView {
            code: e.code().to_string(),
            message: e.user_facing_message(),
            retryable: e.is_retryable(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CachedUser;
    use crate::AppError;

    #[test]
    fn restoring_until_cached_user_read() {
        let model = Model::default();
        let view = build(&model);
        assert_eq!(view.session, SessionView::Restoring);
        assert_eq!(view.screen, ScreenView::None);
    }

    #[test]
    fn signed_out_shows_cached_name() {
        let mut model = Model::default();
        model.session = SessionState::SignedOut {
            cached: Some(CachedUser {
                user_id: UserId::new("u1"),
                display_name: "Ana".into(),
                role: Role::Member,
                trainer_id: None,
            }),
        };
        assert_eq!(
            build(&model).session,
            SessionView::SignedOut {
                cached_name: Some("Ana".into())
            }
        );
    }

    #[test]
    fn error_uses_user_facing_message() {
        let mut model = Model::default();
        model.set_error(AppError::from_http_status(503, Some("upstream down")));
        let error = build(&model).error.unwrap();
        assert!(error.retryable);
        assert!(!error.message.contains("upstream"));
    }

    #[test]
    fn active_screen_selects_view() {
        let mut model = Model::default();
        model.active_screen = Some(Screen::Leaderboard);
        assert!(matches!(build(&model).screen, ScreenView::Leaderboard(_)));
    }
}
