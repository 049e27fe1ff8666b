use chrono::{DateTime, NaiveDate, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::capabilities::ApiConfig;
use crate::event::Screen;
use crate::screens::{
    community::CommunityState, favorites::FavoritesState, food_log::FoodLogState,
    leaderboard::LeaderboardState, profile::ProfileState, reminders::RemindersState,
    subscriptions::SubscriptionsState, trainer::TrainerState,
};
use crate::AppError;

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(UserId);
typed_id!(TrainerId);
typed_id!(MeasurementId);
typed_id!(WeightEntryId);
typed_id!(FoodEntryId);
typed_id!(SubscriptionId);
typed_id!(ReminderPlanId);
typed_id!(ReminderId);
typed_id!(PackageId);
typed_id!(ExerciseId);
typed_id!(PostId);

// --- Session ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Member,
    Trainer,
}

/// Auth token and identity. The token never leaves the core except as a
/// request header.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub token: SecretString,
    pub display_name: String,
    pub role: Role,
    pub trainer_id: Option<TrainerId>,
}

impl Session {
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token.expose_secret())
    }

    #[must_use]
    pub fn cached_user(&self) -> CachedUser {
        CachedUser {
            user_id: self.user_id.clone(),
            display_name: self.display_name.clone(),
            role: self.role,
            trainer_id: self.trainer_id.clone(),
        }
    }
}

/// Persisted on device so the shell can show who is signed in before the
/// token is re-supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedUser {
    pub user_id: UserId,
    pub display_name: String,
    pub role: Role,
    pub trainer_id: Option<TrainerId>,
}

#[derive(Debug, Clone, Default)]
pub enum SessionState {
    /// Auth still loading: the cached user is being read back.
    #[default]
    Restoring,
    SignedOut {
        cached: Option<CachedUser>,
    },
    SignedIn(Session),
}

impl SessionState {
    /// The readiness guard every fetch goes through.
    #[must_use]
    pub fn ready(&self) -> Option<&Session> {
        match self {
            Self::SignedIn(session) if !session.user_id.as_str().trim().is_empty() => {
                Some(session)
            }
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_restoring(&self) -> bool {
        matches!(self, Self::Restoring)
    }
}

// --- Fetched records ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub goal_weight_kg: Option<f64>,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub streak_days: u32,
    #[serde(default)]
    pub daily_calorie_target: Option<f64>,
}

const fn default_level() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyMeasurement {
    pub id: MeasurementId,
    pub recorded_at: DateTime<Utc>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub body_fat_percent: Option<f64>,
    #[serde(default)]
    pub waist_cm: Option<f64>,
    #[serde(default)]
    pub chest_cm: Option<f64>,
    #[serde(default)]
    pub hips_cm: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightEntry {
    pub id: WeightEntryId,
    pub weight_kg: f64,
    pub recorded_at: DateTime<Utc>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodEntry {
    pub id: FoodEntryId,
    pub name: String,
    pub meal: MealType,
    pub calories: f64,
    #[serde(default)]
    pub protein_g: f64,
    #[serde(default)]
    pub carbs_g: f64,
    #[serde(default)]
    pub fat_g: f64,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    pub logged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Pending,
    Expired,
    Cancelled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: SubscriptionId,
    pub plan_name: String,
    pub status: SubscriptionStatus,
    pub price: f64,
    #[serde(default)]
    pub currency: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub auto_renew: bool,
    #[serde(default)]
    pub trainer_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub level: u32,
    pub xp: u64,
    #[serde(default)]
    pub rank: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardPage {
    pub users: Vec<LeaderboardRow>,
    pub total_pages: u32,
    pub total_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardPeriod {
    Weekly,
    Monthly,
    #[default]
    AllTime,
}

impl LeaderboardPeriod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::AllTime => "all_time",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    Water,
    Workout,
    Meal,
    Sleep,
    Weigh,
    #[serde(other)]
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: ReminderId,
    pub title: String,
    pub kind: ReminderKind,
    /// 24h `HH:MM`.
    pub time: String,
    #[serde(default)]
    pub days: Vec<DayOfWeek>,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderPlan {
    pub id: ReminderPlanId,
    #[serde(default)]
    pub reminders: Vec<Reminder>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageStatus {
    Active,
    Inactive,
}

impl PackageStatus {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Inactive,
            Self::Inactive => Self::Active,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePackage {
    pub id: PackageId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub duration_weeks: Option<u32>,
    pub status: PackageStatus,
    #[serde(default)]
    pub subscriber_count: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagePage {
    pub packages: Vec<ServicePackage>,
    pub total_pages: u32,
    pub total_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteExercise {
    pub id: ExerciseId,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub equipment: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityPost {
    pub id: PostId,
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub url: String,
}

// --- Request payloads ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_weight_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_calorie_target: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streak_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWeightEntry {
    pub user_id: UserId,
    pub weight_kg: f64,
    pub recorded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_fat_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waist_cm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chest_cm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hips_cm: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementRequest {
    pub user_id: UserId,
    #[serde(flatten)]
    pub input: MeasurementInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFoodEntry {
    pub name: String,
    pub meal: MealType,
    pub calories: f64,
    #[serde(default)]
    pub protein_g: f64,
    #[serde(default)]
    pub carbs_g: f64,
    #[serde(default)]
    pub fat_g: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodLogRequest<'a> {
    pub user_id: &'a UserId,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub entry: &'a NewFoodEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkFoodRequest<'a> {
    pub user_id: &'a UserId,
    pub date: NaiveDate,
    pub entries: &'a [NewFoodEntry],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: PackageStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost<'a> {
    pub content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<&'a str>,
}

// --- Toasts ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl ToastKind {
    #[must_use]
    pub const fn duration_ms(self) -> u64 {
        match self {
            Self::Info | Self::Success => crate::TOAST_DURATION_MS,
            Self::Warning | Self::Error => crate::TOAST_DURATION_MS * 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
}

// --- Model ---

pub struct Model {
    pub config: ApiConfig,
    pub session: SessionState,
    pub today: NaiveDate,
    pub active_screen: Option<Screen>,

    pub profile: ProfileState,
    pub subscriptions: SubscriptionsState,
    pub food_log: FoodLogState,
    pub leaderboard: LeaderboardState,
    pub reminders: RemindersState,
    pub trainer: TrainerState,
    pub favorites: FavoritesState,
    pub community: CommunityState,

    pub active_toast: Option<Toast>,
    pub active_error: Option<AppError>,
}

impl Default for Model {
    fn default() -> Self {
        let today = Utc::now().date_naive();
        Self {
            config: ApiConfig::default(),
            session: SessionState::default(),
            today,
            active_screen: None,
            profile: ProfileState::default(),
            subscriptions: SubscriptionsState::default(),
            food_log: FoodLogState::new(today),
            leaderboard: LeaderboardState::default(),
            reminders: RemindersState::default(),
            trainer: TrainerState::default(),
            favorites: FavoritesState::default(),
            community: CommunityState::default(),
            active_toast: None,
            active_error: None,
        }
    }
}

impl Model {
    pub fn show_toast(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.active_toast = Some(Toast {
            message: message.into(),
            kind,
        });
    }

    pub fn clear_toast(&mut self) {
        self.active_toast = None;
    }

    pub fn set_error(&mut self, error: AppError) {
        self.active_error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.active_error = None;
    }

    /// Drops every screen's fetched state and aborts every in-flight cycle.
    pub fn reset_screens(&mut self) {
        self.profile = ProfileState::default();
        self.subscriptions = SubscriptionsState::default();
        self.food_log = FoodLogState::new(self.today);
        self.leaderboard = LeaderboardState::default();
        self.reminders = RemindersState::default();
        self.trainer = TrainerState::default();
        self.favorites = FavoritesState::default();
        self.community = CommunityState::default();
        self.active_screen = None;
    }
}
