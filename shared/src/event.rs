use chrono::NaiveDate;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::capabilities::StoredKey;
use crate::model::{Role, TrainerId, UserId};
use crate::screens::{
    community::CommunityEvent, favorites::FavoritesEvent, food_log::FoodLogEvent,
    leaderboard::LeaderboardEvent, profile::ProfileEvent, reminders::RemindersEvent,
    subscriptions::SubscriptionsEvent, trainer::TrainerEvent,
};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Screen {
    Profile,
    Subscriptions,
    FoodLog,
    Leaderboard,
    Reminders,
    TrainerServices,
    Favorites,
    Community,
}

impl Screen {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Subscriptions => "subscriptions",
            Self::FoodLog => "food_log",
            Self::Leaderboard => "leaderboard",
            Self::Reminders => "reminders",
            Self::TrainerServices => "trainer_services",
            Self::Favorites => "favorites",
            Self::Community => "community",
        }
    }
}

// Variants marked `serde(skip)` are internal: capability completions the shell
// never sends.
#[derive(Serialize, Deserialize, Debug)]
pub enum Event {
    // Lifecycle
    Configure {
        base_url: String,
    },
    AppStarted {
        today: NaiveDate,
    },
    DateChanged {
        today: NaiveDate,
    },

    // Session
    SessionStarted {
        user_id: UserId,
        #[serde(skip_serializing)]
        token: SecretString,
        display_name: String,
        role: Role,
        trainer_id: Option<TrainerId>,
    },
    SignedOut,

    // Screen lifecycle
    ScreenFocused(Screen),
    ScreenBlurred(Screen),
    RefreshRequested(Screen),

    DismissToast,
    DismissError,

    // Screens
    Profile(ProfileEvent),
    Subscriptions(SubscriptionsEvent),
    FoodLog(FoodLogEvent),
    Leaderboard(LeaderboardEvent),
    Reminders(RemindersEvent),
    Trainer(TrainerEvent),
    Favorites(FavoritesEvent),
    Community(CommunityEvent),

    // Device storage
    #[serde(skip)]
    StoredValueLoaded {
        key: StoredKey,
        result: Result<Option<Vec<u8>>, String>,
    },
    #[serde(skip)]
    StoredValueWritten {
        key: StoredKey,
        result: Result<(), String>,
    },
}

impl Event {
    /// Stable name for logs. Never includes payload data.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Configure { .. } => "configure",
            Self::AppStarted { .. } => "app_started",
            Self::DateChanged { .. } => "date_changed",
            Self::SessionStarted { .. } => "session_started",
            Self::SignedOut => "signed_out",
            Self::ScreenFocused(_) => "screen_focused",
            Self::ScreenBlurred(_) => "screen_blurred",
            Self::RefreshRequested(_) => "refresh_requested",
            Self::DismissToast => "dismiss_toast",
            Self::DismissError => "dismiss_error",
            Self::Profile(e) => e.name(),
            Self::Subscriptions(e) => e.name(),
            Self::FoodLog(e) => e.name(),
            Self::Leaderboard(e) => e.name(),
            Self::Reminders(e) => e.name(),
            Self::Trainer(e) => e.name(),
            Self::Favorites(e) => e.name(),
            Self::Community(e) => e.name(),
            Self::StoredValueLoaded { .. } => "stored_value_loaded",
            Self::StoredValueWritten { .. } => "stored_value_written",
        }
    }

    /// Whether the event came from something the user did, as opposed to a
    /// lifecycle signal or a capability completion.
    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        match self {
            Self::RefreshRequested(_) | Self::SignedOut => true,
            Self::Profile(e) => e.is_user_initiated(),
            Self::Subscriptions(e) => e.is_user_initiated(),
            Self::FoodLog(e) => e.is_user_initiated(),
            Self::Leaderboard(e) => e.is_user_initiated(),
            Self::Reminders(e) => e.is_user_initiated(),
            Self::Trainer(e) => e.is_user_initiated(),
            Self::Favorites(e) => e.is_user_initiated(),
            Self::Community(e) => e.is_user_initiated(),
            _ => false,
        }
    }
}
