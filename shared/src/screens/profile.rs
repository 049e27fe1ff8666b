use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::{
    finish_mutation, issued, land, load_stored, mutation_not_sent, ready_session, refetch_if_active,
    reject, report, store,
};
use crate::capabilities::{decode_value, ApiResult, Capabilities, StoredKey, UserScope};
use crate::event::{Event, Screen};
use crate::fetch::{CycleId, FetchScope, SliceKey};
use crate::model::{
    BodyMeasurement, MeasurementId, MeasurementInput, MeasurementRequest, Model, NewWeightEntry,
    ProfileUpdate, ToastKind, UserProfile, WeightEntry, WeightEntryId,
};
use crate::progress::{
    bmi, format_bmi, level_up, next_streak, streak_message, weight_trend, xp_progress_percent,
    xp_required, xp_to_next_level, BmiCategory, LevelProgress,
};
use crate::services::Api;
use crate::{ValidationError, XP_PER_CHECK_IN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProfileSlice {
    Profile,
    Measurements,
    Weights,
}

impl SliceKey for ProfileSlice {
    fn name(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Measurements => "measurements",
            Self::Weights => "weights",
        }
    }
}

const SLICES: [ProfileSlice; 3] = [
    ProfileSlice::Profile,
    ProfileSlice::Measurements,
    ProfileSlice::Weights,
];

#[derive(Debug, Default)]
pub struct ProfileState {
    pub scope: FetchScope<ProfileSlice>,
    pub profile: Option<UserProfile>,
    pub measurements: Option<Vec<BodyMeasurement>>,
    pub weights: Option<Vec<WeightEntry>>,
    pub last_check_in: Option<NaiveDate>,
    /// Day of the most recent per-day check-in marker seen for this user.
    pub checked_in_on: Option<NaiveDate>,
    pub pending_check_in: Option<PendingCheckIn>,
}

/// A check-in sent to the server but not yet accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCheckIn {
    pub day: NaiveDate,
    pub progress: LevelProgress,
    pub streak: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileAction {
    ProfileUpdated,
    WeightAdded,
    WeightDeleted,
    MeasurementSaved,
    MeasurementDeleted,
    CheckedIn,
}

impl ProfileAction {
    const fn name(self) -> &'static str {
        match self {
            Self::ProfileUpdated => "profile_updated",
            Self::WeightAdded => "weight_added",
            Self::WeightDeleted => "weight_deleted",
            Self::MeasurementSaved => "measurement_saved",
            Self::MeasurementDeleted => "measurement_deleted",
            Self::CheckedIn => "checked_in",
        }
    }

    const fn success_message(self) -> &'static str {
        match self {
            Self::ProfileUpdated => "Profile updated",
            Self::WeightAdded => "Weight logged",
            Self::WeightDeleted => "Weight entry deleted",
            Self::MeasurementSaved => "Measurements saved",
            Self::MeasurementDeleted => "Measurement deleted",
            Self::CheckedIn => "Check-in saved",
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub enum ProfileEvent {
    UpdateProfile(ProfileUpdate),
    AddWeight {
        weight_kg: f64,
        note: Option<String>,
    },
    DeleteWeight(WeightEntryId),
    /// Creates when `id` is `None`, otherwise updates that measurement.
    SaveMeasurement {
        id: Option<MeasurementId>,
        input: MeasurementInput,
    },
    DeleteMeasurement(MeasurementId),
    CheckInRequested {
        today: NaiveDate,
    },

    #[serde(skip)]
    ProfileLoaded {
        cycle: CycleId,
        result: ApiResult<UserProfile>,
    },
    #[serde(skip)]
    MeasurementsLoaded {
        cycle: CycleId,
        result: ApiResult<Vec<BodyMeasurement>>,
    },
    #[serde(skip)]
    WeightsLoaded {
        cycle: CycleId,
        result: ApiResult<Vec<WeightEntry>>,
    },
    #[serde(skip)]
    Mutated {
        action: ProfileAction,
        result: ApiResult<()>,
    },
}

impl ProfileEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UpdateProfile(_) => "profile.update",
            Self::AddWeight { .. } => "profile.add_weight",
            Self::DeleteWeight(_) => "profile.delete_weight",
            Self::SaveMeasurement { .. } => "profile.save_measurement",
            Self::DeleteMeasurement(_) => "profile.delete_measurement",
            Self::CheckInRequested { .. } => "profile.check_in",
            Self::ProfileLoaded { .. } => "profile.profile_loaded",
            Self::MeasurementsLoaded { .. } => "profile.measurements_loaded",
            Self::WeightsLoaded { .. } => "profile.weights_loaded",
            Self::Mutated { .. } => "profile.mutated",
        }
    }

    pub const fn is_user_initiated(&self) -> bool {
        !matches!(
            self,
            Self::ProfileLoaded { .. }
                | Self::MeasurementsLoaded { .. }
                | Self::WeightsLoaded { .. }
                | Self::Mutated { .. }
        )
    }
}

fn wrap(event: ProfileEvent) -> Event {
    Event::Profile(event)
}

pub fn fetch(model: &mut Model, caps: &Capabilities, refreshing: bool) {
    let Some(session) = ready_session(model, Screen::Profile) else {
        return;
    };
    let state = &mut model.profile;
    let cycle = state.scope.begin(&SLICES, refreshing);
    let api = Api::new(&caps.http, &model.config, &session);

    let sent = api.user_profile(&session.user_id, move |result| {
        wrap(ProfileEvent::ProfileLoaded { cycle, result })
    });
    issued(&mut state.scope, cycle, ProfileSlice::Profile, sent);

    let sent = api.measurements(&session.user_id, move |result| {
        wrap(ProfileEvent::MeasurementsLoaded { cycle, result })
    });
    issued(&mut state.scope, cycle, ProfileSlice::Measurements, sent);

    let sent = api.weights(&session.user_id, move |result| {
        wrap(ProfileEvent::WeightsLoaded { cycle, result })
    });
    issued(&mut state.scope, cycle, ProfileSlice::Weights, sent);

    load_stored(caps, StoredKey::last_check_in(&session.user_id));
    load_stored(caps, StoredKey::check_in_day(&session.user_id, model.today));
}

fn validate_positive(value: Option<f64>, field: &'static str) -> Result<(), ValidationError> {
    match value {
        Some(v) if !(v.is_finite() && v > 0.0) => Err(ValidationError::NotPositive { field }),
        _ => Ok(()),
    }
}

fn validate_measurement(input: &MeasurementInput) -> Result<(), ValidationError> {
    validate_positive(input.height_cm, "height")?;
    validate_positive(input.weight_kg, "weight")?;
    validate_positive(input.body_fat_percent, "body fat")?;
    validate_positive(input.waist_cm, "waist")?;
    validate_positive(input.chest_cm, "chest")?;
    validate_positive(input.hips_cm, "hips")
}

fn validate_update(update: &ProfileUpdate) -> Result<(), ValidationError> {
    if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ValidationError::Blank { field: "name" });
    }
    validate_positive(update.height_cm, "height")?;
    validate_positive(update.weight_kg, "weight")?;
    validate_positive(update.goal_weight_kg, "goal weight")?;
    validate_positive(update.daily_calorie_target, "daily calorie target")
}

pub fn update(event: ProfileEvent, model: &mut Model, caps: &Capabilities) {
    match event {
        ProfileEvent::ProfileLoaded { cycle, result } => {
            let state = &mut model.profile;
            let landing = land(&mut state.scope, cycle, ProfileSlice::Profile, &mut state.profile, result);
            report(model, landing);
        }

        ProfileEvent::MeasurementsLoaded { cycle, result } => {
            let state = &mut model.profile;
            let landing = land(
                &mut state.scope,
                cycle,
                ProfileSlice::Measurements,
                &mut state.measurements,
                result,
            );
            report(model, landing);
        }

        ProfileEvent::WeightsLoaded { cycle, result } => {
            let state = &mut model.profile;
            let landing = land(&mut state.scope, cycle, ProfileSlice::Weights, &mut state.weights, result);
            report(model, landing);
        }

        ProfileEvent::Mutated {
            action: ProfileAction::CheckedIn,
            result,
        } => {
            if confirm_check_in(model, caps, result) {
                refetch_if_active(Screen::Profile, model, caps);
            }
        }
        ProfileEvent::Mutated { action, result } => {
            if finish_mutation(model, action.name(), result, action.success_message()) {
                refetch_if_active(Screen::Profile, model, caps);
            }
        }

        ProfileEvent::UpdateProfile(profile_update) => {
            if let Err(e) = validate_update(&profile_update) {
                reject(model, e);
                return;
            }
            let Some(session) = ready_session(model, Screen::Profile) else {
                return;
            };
            let action = ProfileAction::ProfileUpdated;
            let sent = Api::new(&caps.http, &model.config, &session).update_profile(
                &session.user_id,
                &profile_update,
                move |result| wrap(ProfileEvent::Mutated { action, result }),
            );
            if let Err(e) = sent {
                mutation_not_sent(model, action.name(), e);
            }
        }

        ProfileEvent::AddWeight { weight_kg, note } => {
            if let Err(e) = validate_positive(Some(weight_kg), "weight") {
                reject(model, e);
                return;
            }
            let Some(session) = ready_session(model, Screen::Profile) else {
                return;
            };
            let entry = NewWeightEntry {
                user_id: session.user_id.clone(),
                weight_kg,
                recorded_at: Utc::now(),
                note: note.filter(|n| !n.trim().is_empty()),
            };
            let action = ProfileAction::WeightAdded;
            let sent = Api::new(&caps.http, &model.config, &session)
                .create_weight(&entry, move |result| wrap(ProfileEvent::Mutated { action, result }));
            if let Err(e) = sent {
                mutation_not_sent(model, action.name(), e);
            }
        }

        ProfileEvent::DeleteWeight(id) => {
            let Some(session) = ready_session(model, Screen::Profile) else {
                return;
            };
            let action = ProfileAction::WeightDeleted;
            let sent = Api::new(&caps.http, &model.config, &session)
                .delete_weight(&id, move |result| wrap(ProfileEvent::Mutated { action, result }));
            if let Err(e) = sent {
                mutation_not_sent(model, action.name(), e);
            }
        }

        ProfileEvent::SaveMeasurement { id, input } => {
            if let Err(e) = validate_measurement(&input) {
                reject(model, e);
                return;
            }
            let Some(session) = ready_session(model, Screen::Profile) else {
                return;
            };
            let request = MeasurementRequest {
                user_id: session.user_id.clone(),
                input,
            };
            let action = ProfileAction::MeasurementSaved;
            let api = Api::new(&caps.http, &model.config, &session);
            let make_event = move |result| wrap(ProfileEvent::Mutated { action, result });
            let sent = match &id {
                Some(id) => api.update_measurement(id, &request, make_event),
                None => api.create_measurement(&request, make_event),
            };
            if let Err(e) = sent {
                mutation_not_sent(model, action.name(), e);
            }
        }

        ProfileEvent::DeleteMeasurement(id) => {
            let Some(session) = ready_session(model, Screen::Profile) else {
                return;
            };
            let action = ProfileAction::MeasurementDeleted;
            let sent = Api::new(&caps.http, &model.config, &session)
                .delete_measurement(&id, move |result| wrap(ProfileEvent::Mutated { action, result }));
            if let Err(e) = sent {
                mutation_not_sent(model, action.name(), e);
            }
        }

        ProfileEvent::CheckInRequested { today } => check_in(model, caps, today),
    }
}

fn check_in(model: &mut Model, caps: &Capabilities, today: NaiveDate) {
    model.today = today;
    let Some(session) = ready_session(model, Screen::Profile) else {
        return;
    };
    let Some((level, xp, streak_days)) = model
        .profile
        .profile
        .as_ref()
        .map(|p| (p.level, p.xp, p.streak_days))
    else {
        debug!("profile not loaded, skipping check-in");
        return;
    };

    let state = &model.profile;
    if state.pending_check_in.is_some() {
        debug!("check-in already in flight");
        return;
    }
    if state.checked_in_on == Some(today) || state.last_check_in == Some(today) {
        model.show_toast("You've already checked in today", ToastKind::Info);
        return;
    }

    let pending = PendingCheckIn {
        day: today,
        progress: level_up(level, xp, XP_PER_CHECK_IN),
        streak: next_streak(streak_days, state.last_check_in, today),
    };
    let profile_update = ProfileUpdate {
        level: Some(pending.progress.level),
        xp: Some(pending.progress.xp),
        streak_days: Some(pending.streak),
        ..ProfileUpdate::default()
    };
    let action = ProfileAction::CheckedIn;
    let sent = Api::new(&caps.http, &model.config, &session).update_profile(
        &session.user_id,
        &profile_update,
        move |result| wrap(ProfileEvent::Mutated { action, result }),
    );
    match sent {
        Ok(()) => model.profile.pending_check_in = Some(pending),
        Err(e) => mutation_not_sent(model, action.name(), e),
    }
}

/// Applies the in-flight check-in once the server has accepted it. A rejected
/// check-in leaves the profile and the device markers as they were, so the
/// user can try again. Returns true when the profile should be re-fetched.
fn confirm_check_in(model: &mut Model, caps: &Capabilities, result: ApiResult<()>) -> bool {
    let Some(pending) = model.profile.pending_check_in.take() else {
        debug!("no check-in in flight");
        return false;
    };
    let message = if pending.progress.levels_gained > 0 {
        format!("Level up! You're now level {}", pending.progress.level)
    } else {
        format!("+{XP_PER_CHECK_IN} XP")
    };
    if !finish_mutation(model, ProfileAction::CheckedIn.name(), result, &message) {
        return false;
    }
    let Some(session) = model.session.ready().cloned() else {
        return false;
    };

    let state = &mut model.profile;
    if let Some(profile) = state.profile.as_mut() {
        profile.level = pending.progress.level;
        profile.xp = pending.progress.xp;
        profile.streak_days = pending.streak;
    }
    state.last_check_in = Some(pending.day);
    state.checked_in_on = Some(pending.day);

    store(caps, StoredKey::last_check_in(&session.user_id), &pending.day);
    store(caps, StoredKey::check_in_day(&session.user_id, pending.day), &true);

    info!(
        level = pending.progress.level,
        levels_gained = pending.progress.levels_gained,
        streak = pending.streak,
        "checked in"
    );
    true
}

/// Applies a check-in marker read back from device storage. Markers for a
/// user other than the signed-in one are ignored.
pub fn stored_value(model: &mut Model, key: &StoredKey, stored: Result<Option<Vec<u8>>, String>) {
    let Some(session) = model.session.ready() else {
        return;
    };
    let current = UserScope::of(&session.user_id);

    match key {
        StoredKey::LastCheckIn(scope) if *scope == current => {
            match decode_value::<NaiveDate>(stored) {
                Ok(Some(day)) => model.profile.last_check_in = Some(day),
                Ok(None) => {}
                Err(error) => warn!(%error, "unreadable last check-in"),
            }
        }
        StoredKey::CheckInDay(scope, day) if *scope == current => {
            match decode_value::<bool>(stored) {
                Ok(Some(true)) => model.profile.checked_in_on = Some(*day),
                Ok(_) => {}
                Err(error) => warn!(%error, "unreadable check-in marker"),
            }
        }
        _ => debug!(key = key.name(), "ignoring stored value for another user"),
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProfileView {
    pub loading: BTreeMap<String, bool>,
    pub refreshing: bool,
    pub profile: Option<UserProfile>,
    pub bmi: String,
    pub bmi_category: Option<BmiCategory>,
    pub latest_weight_kg: Option<f64>,
    pub previous_weight_kg: Option<f64>,
    pub weight_change_kg: Option<f64>,
    pub weights: Vec<WeightEntry>,
    pub measurements: Vec<BodyMeasurement>,
    pub level: u32,
    pub xp: u64,
    pub xp_required: u64,
    pub xp_progress_percent: f64,
    pub xp_to_next_level: u64,
    pub streak_days: u32,
    pub streak_message: String,
    pub checked_in_today: bool,
    pub checking_in: bool,
}

pub fn view(model: &Model) -> ProfileView {
    let state = &model.profile;
    let weights = state.weights.as_deref().unwrap_or_default();
    let trend = weight_trend(weights);

    let profile = state.profile.as_ref();
    let level = profile.map_or(1, |p| p.level.max(1));
    let xp = profile.map_or(0, |p| p.xp);
    let streak_days = profile.map_or(0, |p| p.streak_days);

    let current_weight = trend
        .latest
        .map(|e| e.weight_kg)
        .or_else(|| profile.and_then(|p| p.weight_kg));
    let bmi_value = bmi(profile.and_then(|p| p.height_cm), current_weight);

    let mut sorted_weights = weights.to_vec();
    sorted_weights.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
    let mut measurements = state.measurements.clone().unwrap_or_default();
    measurements.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));

    ProfileView {
        loading: state.scope.loading_flags(),
        refreshing: state.scope.is_refreshing(),
        profile: state.profile.clone(),
        bmi: format_bmi(bmi_value),
        bmi_category: bmi_value.map(BmiCategory::from_bmi),
        latest_weight_kg: trend.latest.map(|e| e.weight_kg),
        previous_weight_kg: trend.previous.map(|e| e.weight_kg),
        weight_change_kg: trend.change_kg(),
        weights: sorted_weights,
        measurements,
        level,
        xp,
        xp_required: xp_required(level),
        xp_progress_percent: xp_progress_percent(xp, level),
        xp_to_next_level: xp_to_next_level(xp, level),
        streak_days,
        streak_message: streak_message(streak_days),
        checked_in_today: state.checked_in_on == Some(model.today)
            || state.last_check_in == Some(model.today),
        checking_in: state.pending_check_in.is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Role, Session, SessionState, UserId};
    use secrecy::SecretString;

    fn signed_in() -> Model {
        let mut model = Model::default();
        model.session = SessionState::SignedIn(Session {
            user_id: UserId::new("u1"),
            token: SecretString::new("t".into()),
            display_name: "Ana".into(),
            role: Role::Member,
            trainer_id: None,
        });
        model
    }

    fn profile(height: Option<f64>, weight: Option<f64>) -> UserProfile {
        UserProfile {
            id: UserId::new("u1"),
            name: "Ana".into(),
            email: None,
            avatar_url: None,
            height_cm: height,
            weight_kg: weight,
            goal_weight_kg: None,
            level: 2,
            xp: 30,
            streak_days: 3,
            daily_calorie_target: None,
        }
    }

    #[test]
    fn view_shows_na_bmi_for_zero_height() {
        let mut model = signed_in();
        model.profile.profile = Some(profile(Some(0.0), Some(70.0)));
        let view = view(&model);
        assert_eq!(view.bmi, "N/A");
        assert_eq!(view.bmi_category, None);
    }

    #[test]
    fn view_derives_level_progress() {
        let mut model = signed_in();
        model.profile.profile = Some(profile(Some(180.0), Some(81.0)));
        let view = view(&model);
        assert_eq!(view.bmi, "25.0");
        assert_eq!(view.bmi_category, Some(BmiCategory::Overweight));
        assert_eq!(view.xp_required, 120);
        assert_eq!(view.xp_to_next_level, 90);
        assert!((view.xp_progress_percent - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn stale_profile_response_is_dropped() {
        let mut model = signed_in();
        let first = model.profile.scope.begin(&SLICES, false);
        let _second = model.profile.scope.begin(&SLICES, false);
        let landing = land(
            &mut model.profile.scope,
            first,
            ProfileSlice::Profile,
            &mut model.profile.profile,
            Ok(profile(None, None)),
        );
        assert_eq!(landing, super::super::Landing::Stale);
        assert!(model.profile.profile.is_none());
        assert!(model.profile.scope.is_loading(ProfileSlice::Profile));
    }

    #[test]
    fn measurement_validation_rejects_non_positive() {
        let input = MeasurementInput {
            waist_cm: Some(-3.0),
            ..MeasurementInput::default()
        };
        assert_eq!(
            validate_measurement(&input),
            Err(ValidationError::NotPositive { field: "waist" })
        );
        assert!(validate_measurement(&MeasurementInput::default()).is_ok());
    }

    #[test]
    fn blank_name_is_rejected() {
        let update = ProfileUpdate {
            name: Some("  ".into()),
            ..ProfileUpdate::default()
        };
        assert_eq!(validate_update(&update), Err(ValidationError::Blank { field: "name" }));
    }

    #[test]
    fn check_in_marker_for_another_user_is_ignored() {
        let mut model = signed_in();
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        let other = StoredKey::check_in_day(&UserId::new("u2"), today);
        stored_value(&mut model, &other, Ok(Some(b"true".to_vec())));
        assert_eq!(model.profile.checked_in_on, None);

        let own = StoredKey::check_in_day(&UserId::new("u1"), today);
        stored_value(&mut model, &own, Ok(Some(b"true".to_vec())));
        assert_eq!(model.profile.checked_in_on, Some(today));
    }
}
