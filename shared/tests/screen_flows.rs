use chrono::{NaiveDate, TimeZone, Utc};
use crux_core::testing::AppTester;
use fitness_shared::capabilities::ApiError;
use fitness_shared::model::{
    DayOfWeek, ExerciseId, FavoriteExercise, LeaderboardPage, LeaderboardRow, PackageId,
    PackagePage, PackageStatus, Reminder, ReminderId, ReminderKind, ReminderPlan, ReminderPlanId,
    Role, ServicePackage, ToastKind, TrainerId, UserId, UserProfile, WeightEntry, WeightEntryId,
};
use fitness_shared::screens::favorites::FavoritesEvent;
use fitness_shared::screens::leaderboard::LeaderboardEvent;
use fitness_shared::screens::profile::{ProfileAction, ProfileEvent};
use fitness_shared::screens::reminders::{ReminderAction, RemindersEvent};
use fitness_shared::screens::trainer::TrainerEvent;
use fitness_shared::view::ScreenView;
use fitness_shared::{App, CruxApp, Effect, Event, Model, Screen};
use secrecy::SecretString;

struct Call {
    method: String,
    url: String,
    body: Vec<u8>,
    authorization: Option<String>,
}

fn http_calls(effects: Vec<Effect>) -> Vec<Call> {
    effects
        .into_iter()
        .filter_map(|effect| match effect {
            Effect::Http(request) => {
                let op = request.operation;
                let authorization = op
                    .headers
                    .iter()
                    .find(|h| h.name.eq_ignore_ascii_case("authorization"))
                    .map(|h| h.value.clone());
                Some(Call {
                    method: op.method,
                    url: op.url,
                    body: op.body,
                    authorization,
                })
            }
            _ => None,
        })
        .collect()
}

fn sign_in(app: &AppTester<App, Effect>, model: &mut Model, user: &str, trainer: Option<&str>) {
    app.update(
        Event::SessionStarted {
            user_id: UserId::new(user),
            token: SecretString::new("tok_123".into()),
            display_name: "Ana".into(),
            role: if trainer.is_some() {
                Role::Trainer
            } else {
                Role::Member
            },
            trainer_id: trainer.map(TrainerId::new),
        },
        model,
    );
}

fn board(rows: u32, total_pages: u32, total_count: u32) -> LeaderboardPage {
    LeaderboardPage {
        users: (0..rows)
            .map(|i| LeaderboardRow {
                user_id: UserId::new(format!("u{i}")),
                name: format!("Runner {i}"),
                avatar_url: None,
                level: 5,
                xp: 1_000 - u64::from(i),
                rank: None,
            })
            .collect(),
        total_pages,
        total_count,
    }
}

#[test]
fn test_no_requests_before_sign_in() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    let update = app.update(Event::ScreenFocused(Screen::Profile), &mut model);

    assert!(http_calls(update.effects).is_empty());
    assert!(!model.profile.scope.any_loading());
    assert!(model.profile.profile.is_none());
}

#[test]
fn test_focus_issues_authorized_requests_for_every_slice() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    sign_in(&app, &mut model, "u1", None);

    let update = app.update(Event::ScreenFocused(Screen::Profile), &mut model);
    let calls = http_calls(update.effects);

    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|c| c.method == "GET"));
    assert!(calls
        .iter()
        .all(|c| c.authorization.as_deref() == Some("Bearer tok_123")));
    assert!(calls.iter().any(|c| c.url.ends_with("/users/u1")));
    assert!(!model.profile.scope.is_refreshing());
    assert!(model.profile.scope.any_loading());
}

#[test]
fn test_stale_cycle_never_overwrites() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    sign_in(&app, &mut model, "u1", None);

    app.update(Event::ScreenFocused(Screen::Leaderboard), &mut model);
    let first = model.leaderboard.scope.current().unwrap();
    app.update(Event::RefreshRequested(Screen::Leaderboard), &mut model);
    let second = model.leaderboard.scope.current().unwrap();
    assert_ne!(first, second);

    app.update(
        Event::Leaderboard(LeaderboardEvent::Loaded {
            cycle: first,
            result: Ok(board(3, 1, 3)),
        }),
        &mut model,
    );
    assert!(model.leaderboard.board.is_none());
    assert!(model.leaderboard.scope.is_refreshing());

    app.update(
        Event::Leaderboard(LeaderboardEvent::Loaded {
            cycle: second,
            result: Ok(board(10, 3, 25)),
        }),
        &mut model,
    );
    assert_eq!(model.leaderboard.board.as_ref().map(|b| b.users.len()), Some(10));
    assert!(!model.leaderboard.scope.is_refreshing());
}

#[test]
fn test_blur_cancels_in_flight_cycle() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    sign_in(&app, &mut model, "u1", None);

    app.update(Event::ScreenFocused(Screen::Leaderboard), &mut model);
    let cycle = model.leaderboard.scope.current().unwrap();
    app.update(Event::ScreenBlurred(Screen::Leaderboard), &mut model);
    assert!(!model.leaderboard.scope.any_loading());

    app.update(
        Event::Leaderboard(LeaderboardEvent::Loaded {
            cycle,
            result: Ok(board(10, 3, 25)),
        }),
        &mut model,
    );
    assert!(model.leaderboard.board.is_none());
}

#[test]
fn test_leaderboard_paging() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    sign_in(&app, &mut model, "u3", None);

    let update = app.update(Event::ScreenFocused(Screen::Leaderboard), &mut model);
    let calls = http_calls(update.effects);
    assert_eq!(calls.len(), 1);
    assert!(calls[0].url.contains("page=1"));
    assert!(calls[0].url.contains("limit=10"));
    assert!(calls[0].url.contains("period=all_time"));

    let cycle = model.leaderboard.scope.current().unwrap();
    app.update(
        Event::Leaderboard(LeaderboardEvent::Loaded {
            cycle,
            result: Ok(board(10, 3, 25)),
        }),
        &mut model,
    );

    let ScreenView::Leaderboard(view) = App.view(&model).screen else {
        panic!("leaderboard view expected");
    };
    assert_eq!(view.rows.len(), 10);
    assert_eq!(view.page_label, "Page 1 of 3");
    assert_eq!(view.total_count, 25);
    assert!(view.rows.iter().any(|r| r.is_current_user));

    // Previous from page 1 is out of range: nothing is fetched.
    let update = app.update(Event::Leaderboard(LeaderboardEvent::PrevPage), &mut model);
    assert!(http_calls(update.effects).is_empty());

    let update = app.update(Event::Leaderboard(LeaderboardEvent::NextPage), &mut model);
    let calls = http_calls(update.effects);
    assert_eq!(calls.len(), 1);
    assert!(calls[0].url.contains("page=2"));
    assert_eq!(model.leaderboard.page, 2);

    let update = app.update(Event::Leaderboard(LeaderboardEvent::GoToPage(4)), &mut model);
    assert!(http_calls(update.effects).is_empty());
    assert_eq!(model.leaderboard.page, 2);
}

#[test]
fn test_period_change_returns_to_first_page() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    sign_in(&app, &mut model, "u1", None);
    app.update(Event::ScreenFocused(Screen::Leaderboard), &mut model);
    let cycle = model.leaderboard.scope.current().unwrap();
    app.update(
        Event::Leaderboard(LeaderboardEvent::Loaded {
            cycle,
            result: Ok(board(10, 3, 25)),
        }),
        &mut model,
    );
    app.update(Event::Leaderboard(LeaderboardEvent::NextPage), &mut model);
    assert_eq!(model.leaderboard.page, 2);

    app.update(Event::Leaderboard(LeaderboardEvent::OpenPeriodPicker), &mut model);
    app.update(
        Event::Leaderboard(LeaderboardEvent::PeriodDraftChanged(
            fitness_shared::model::LeaderboardPeriod::Weekly,
        )),
        &mut model,
    );
    let update = app.update(Event::Leaderboard(LeaderboardEvent::ApplyPeriod), &mut model);
    let calls = http_calls(update.effects);

    assert_eq!(model.leaderboard.page, 1);
    assert_eq!(calls.len(), 1);
    assert!(calls[0].url.contains("page=1"));
    assert!(calls[0].url.contains("period=weekly"));
}

fn package(id: &str, status: PackageStatus) -> ServicePackage {
    ServicePackage {
        id: PackageId::new(id),
        title: format!("Package {id}"),
        description: None,
        price: 49.0,
        duration_weeks: Some(4),
        status,
        subscriber_count: 2,
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    }
}

#[test]
fn test_trainer_screen_needs_trainer_id() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    sign_in(&app, &mut model, "u1", None);

    let update = app.update(Event::ScreenFocused(Screen::TrainerServices), &mut model);
    assert!(http_calls(update.effects).is_empty());
    assert!(!model.trainer.scope.any_loading());
}

#[test]
fn test_toggle_sends_opposite_status_then_one_refetch() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    sign_in(&app, &mut model, "u1", Some("t9"));

    let update = app.update(Event::ScreenFocused(Screen::TrainerServices), &mut model);
    let calls = http_calls(update.effects);
    assert_eq!(calls.len(), 1);
    assert!(calls[0].url.contains("/trainers/t9/packages"));
    assert!(!calls[0].url.contains("status="));

    let cycle = model.trainer.scope.current().unwrap();
    app.update(
        Event::Trainer(TrainerEvent::Loaded {
            cycle,
            result: Ok(PackagePage {
                packages: vec![package("p1", PackageStatus::Active)],
                total_pages: 1,
                total_count: 1,
            }),
        }),
        &mut model,
    );

    let update = app.update(
        Event::Trainer(TrainerEvent::ToggleStatus(PackageId::new("p1"))),
        &mut model,
    );
    let calls = http_calls(update.effects);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, "PATCH");
    assert!(calls[0].url.ends_with("/packages/p1/status"));
    let body: serde_json::Value = serde_json::from_slice(&calls[0].body).unwrap();
    assert_eq!(body, serde_json::json!({ "status": "inactive" }));

    let update = app.update(
        Event::Trainer(TrainerEvent::StatusChanged {
            id: PackageId::new("p1"),
            result: Ok(()),
        }),
        &mut model,
    );
    let calls = http_calls(update.effects);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, "GET");
    assert!(model.trainer.toggling.is_none());
}

#[test]
fn test_failed_refresh_keeps_data_and_toasts() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    sign_in(&app, &mut model, "u1", None);

    app.update(Event::ScreenFocused(Screen::Leaderboard), &mut model);
    let cycle = model.leaderboard.scope.current().unwrap();
    app.update(
        Event::Leaderboard(LeaderboardEvent::Loaded {
            cycle,
            result: Ok(board(10, 3, 25)),
        }),
        &mut model,
    );
    assert!(model.active_toast.is_none());

    app.update(Event::RefreshRequested(Screen::Leaderboard), &mut model);
    let cycle = model.leaderboard.scope.current().unwrap();
    app.update(
        Event::Leaderboard(LeaderboardEvent::Loaded {
            cycle,
            result: Err(ApiError::transport("offline")),
        }),
        &mut model,
    );

    assert_eq!(model.leaderboard.board.as_ref().map(|b| b.total_count), Some(25));
    let toast = model.active_toast.as_ref().unwrap();
    assert!(toast.message.contains("pull to refresh"));
}

fn weight(id: &str, kg: f64, day: u32) -> WeightEntry {
    WeightEntry {
        id: WeightEntryId::new(id),
        weight_kg: kg,
        recorded_at: Utc.with_ymd_and_hms(2024, 5, day, 7, 0, 0).unwrap(),
        note: None,
    }
}

#[test]
fn test_profile_view_derives_weight_trend_and_bmi() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    sign_in(&app, &mut model, "u1", None);
    app.update(Event::ScreenFocused(Screen::Profile), &mut model);
    let cycle = model.profile.scope.current().unwrap();

    app.update(
        Event::Profile(ProfileEvent::WeightsLoaded {
            cycle,
            result: Ok(vec![weight("w1", 72.0, 1), weight("w3", 70.5, 9), weight("w2", 71.0, 5)]),
        }),
        &mut model,
    );
    app.update(
        Event::Profile(ProfileEvent::ProfileLoaded {
            cycle,
            result: Ok(UserProfile {
                id: UserId::new("u1"),
                name: "Ana".into(),
                email: None,
                avatar_url: None,
                height_cm: None,
                weight_kg: Some(70.0),
                goal_weight_kg: None,
                level: 1,
                xp: 0,
                streak_days: 0,
                daily_calorie_target: None,
            }),
        }),
        &mut model,
    );

    let ScreenView::Profile(view) = App.view(&model).screen else {
        panic!("profile view expected");
    };
    assert_eq!(view.latest_weight_kg, Some(70.5));
    assert_eq!(view.previous_weight_kg, Some(71.0));
    assert_eq!(view.bmi, "N/A");
    assert!(view.loading.get("measurements").copied().unwrap_or(false));
}

fn storage_effects(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|e| !matches!(e, Effect::Http(_) | Effect::Render(_)))
        .count()
}

fn server_error() -> ApiError {
    ApiError::Status {
        code: 500,
        message: "boom".into(),
    }
}

fn profile_on_screen(app: &AppTester<App, Effect>, model: &mut Model) {
    sign_in(app, model, "u1", None);
    app.update(Event::ScreenFocused(Screen::Profile), model);
    let cycle = model.profile.scope.current().unwrap();
    app.update(
        Event::Profile(ProfileEvent::ProfileLoaded {
            cycle,
            result: Ok(UserProfile {
                id: UserId::new("u1"),
                name: "Ana".into(),
                email: None,
                avatar_url: None,
                height_cm: Some(170.0),
                weight_kg: Some(65.0),
                goal_weight_kg: None,
                level: 1,
                xp: 90,
                streak_days: 4,
                daily_calorie_target: None,
            }),
        }),
        model,
    );
}

#[test]
fn test_check_in_applies_once_the_server_accepts_it() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    profile_on_screen(&app, &mut model);

    let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
    let update = app.update(
        Event::Profile(ProfileEvent::CheckInRequested { today }),
        &mut model,
    );
    assert_eq!(storage_effects(&update.effects), 0);
    let calls = http_calls(update.effects);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, "PUT");
    let body: serde_json::Value = serde_json::from_slice(&calls[0].body).unwrap();
    assert_eq!(body["level"], 2);
    assert_eq!(body["xp"], 15);
    assert_eq!(model.profile.profile.as_ref().unwrap().xp, 90);

    // A second tap while the first is in flight sends nothing.
    let update = app.update(
        Event::Profile(ProfileEvent::CheckInRequested { today }),
        &mut model,
    );
    assert!(http_calls(update.effects).is_empty());

    let update = app.update(
        Event::Profile(ProfileEvent::Mutated {
            action: ProfileAction::CheckedIn,
            result: Ok(()),
        }),
        &mut model,
    );
    assert_eq!(storage_effects(&update.effects), 2);

    let profile = model.profile.profile.as_ref().unwrap();
    assert_eq!(profile.level, 2);
    assert_eq!(profile.xp, 15);
    // No check-in on record, so the streak starts over.
    assert_eq!(profile.streak_days, 1);
    assert_eq!(model.profile.checked_in_on, Some(today));

    let update = app.update(
        Event::Profile(ProfileEvent::CheckInRequested { today }),
        &mut model,
    );
    assert!(http_calls(update.effects).is_empty());
    assert_eq!(model.profile.profile.as_ref().unwrap().xp, 15);
}

#[test]
fn test_failed_check_in_keeps_profile_and_allows_retry() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    profile_on_screen(&app, &mut model);

    let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    app.update(
        Event::Profile(ProfileEvent::CheckInRequested { today }),
        &mut model,
    );
    let update = app.update(
        Event::Profile(ProfileEvent::Mutated {
            action: ProfileAction::CheckedIn,
            result: Err(server_error()),
        }),
        &mut model,
    );

    assert_eq!(storage_effects(&update.effects), 0);
    assert!(http_calls(update.effects).is_empty());
    let profile = model.profile.profile.as_ref().unwrap();
    assert_eq!((profile.level, profile.xp, profile.streak_days), (1, 90, 4));
    assert_eq!(model.profile.checked_in_on, None);
    assert_eq!(model.profile.last_check_in, None);
    assert!(model.profile.pending_check_in.is_none());
    assert_eq!(model.active_toast.as_ref().unwrap().kind, ToastKind::Error);

    let update = app.update(
        Event::Profile(ProfileEvent::CheckInRequested { today }),
        &mut model,
    );
    assert_eq!(http_calls(update.effects).len(), 1);
}

fn favorite(i: u32) -> FavoriteExercise {
    FavoriteExercise {
        id: ExerciseId::new(format!("e{i}")),
        name: format!("Exercise {i}"),
        category: if i % 2 == 0 { "Legs" } else { "Core" }.into(),
        equipment: None,
        thumbnail_url: None,
        added_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::hours(i.into()),
    }
}

fn land_favorites(app: &AppTester<App, Effect>, model: &mut Model, count: u32) {
    let cycle = model.favorites.scope.current().unwrap();
    app.update(
        Event::Favorites(FavoritesEvent::Loaded {
            cycle,
            result: Ok((0..count).map(favorite).collect()),
        }),
        model,
    );
}

#[test]
fn test_paging_recovers_when_favorites_shrink() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    sign_in(&app, &mut model, "u1", None);
    app.update(Event::ScreenFocused(Screen::Favorites), &mut model);
    land_favorites(&app, &mut model, 50);

    app.update(Event::Favorites(FavoritesEvent::GoToPage(5)), &mut model);
    assert_eq!(model.favorites.query.page(), 5);

    app.update(Event::RefreshRequested(Screen::Favorites), &mut model);
    land_favorites(&app, &mut model, 15);
    assert_eq!(model.favorites.query.page(), 2);

    app.update(Event::Favorites(FavoritesEvent::PrevPage), &mut model);
    let ScreenView::Favorites(view) = App.view(&model).screen else {
        panic!("favorites view expected");
    };
    assert_eq!(model.favorites.query.page(), 1);
    assert_eq!(view.page_label, "Page 1 of 2");
    assert!(!view.has_prev);
}

#[test]
fn test_failed_favorite_removal_keeps_the_list() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    sign_in(&app, &mut model, "u1", None);
    app.update(Event::ScreenFocused(Screen::Favorites), &mut model);
    land_favorites(&app, &mut model, 3);

    let update = app.update(
        Event::Favorites(FavoritesEvent::Remove(ExerciseId::new("e1"))),
        &mut model,
    );
    let calls = http_calls(update.effects);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, "DELETE");
    assert_eq!(model.favorites.removing, Some(ExerciseId::new("e1")));

    let update = app.update(
        Event::Favorites(FavoritesEvent::Removed {
            id: ExerciseId::new("e1"),
            result: Err(server_error()),
        }),
        &mut model,
    );
    assert!(http_calls(update.effects).is_empty());
    assert_eq!(model.favorites.items.as_ref().map(Vec::len), Some(3));
    assert!(model.favorites.removing.is_none());
    assert_eq!(model.active_toast.as_ref().unwrap().kind, ToastKind::Error);
}

fn reminder_plan() -> ReminderPlan {
    ReminderPlan {
        id: ReminderPlanId::new("plan1"),
        reminders: vec![Reminder {
            id: ReminderId::new("r1"),
            title: "Drink water".into(),
            kind: ReminderKind::Water,
            time: "09:00".into(),
            days: vec![DayOfWeek::Mon, DayOfWeek::Wed],
            enabled: true,
        }],
    }
}

#[test]
fn test_failed_reminder_save_keeps_plan_and_editor() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    sign_in(&app, &mut model, "u1", None);
    app.update(Event::ScreenFocused(Screen::Reminders), &mut model);
    let cycle = model.reminders.scope.current().unwrap();
    app.update(
        Event::Reminders(RemindersEvent::Loaded {
            cycle,
            result: Ok(reminder_plan()),
        }),
        &mut model,
    );

    let update = app.update(
        Event::Reminders(RemindersEvent::Toggle(ReminderId::new("r1"))),
        &mut model,
    );
    let calls = http_calls(update.effects);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, "PUT");
    app.update(
        Event::Reminders(RemindersEvent::Mutated {
            action: ReminderAction::Toggled,
            result: Err(server_error()),
        }),
        &mut model,
    );
    assert_eq!(model.reminders.plan, Some(reminder_plan()));
    assert!(!model.reminders.saving);

    app.update(
        Event::Reminders(RemindersEvent::OpenEditor(ReminderId::new("r1"))),
        &mut model,
    );
    app.update(
        Event::Reminders(RemindersEvent::EditTime("07:30".into())),
        &mut model,
    );
    app.update(Event::Reminders(RemindersEvent::SaveEditor), &mut model);
    let update = app.update(
        Event::Reminders(RemindersEvent::Mutated {
            action: ReminderAction::Edited,
            result: Err(server_error()),
        }),
        &mut model,
    );

    assert!(http_calls(update.effects).is_empty());
    assert_eq!(model.reminders.plan, Some(reminder_plan()));
    let draft = model
        .reminders
        .editing
        .as_ref()
        .and_then(|e| e.draft())
        .map(|r| r.time.clone());
    assert_eq!(draft.as_deref(), Some("07:30"));
}

#[test]
fn test_switching_user_drops_previous_state() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    sign_in(&app, &mut model, "u1", None);
    app.update(Event::ScreenFocused(Screen::Leaderboard), &mut model);
    let cycle = model.leaderboard.scope.current().unwrap();
    app.update(
        Event::Leaderboard(LeaderboardEvent::Loaded {
            cycle,
            result: Ok(board(10, 3, 25)),
        }),
        &mut model,
    );

    let update = app.update(
        Event::SessionStarted {
            user_id: UserId::new("u2"),
            token: SecretString::new("tok_456".into()),
            display_name: "Bo".into(),
            role: Role::Member,
            trainer_id: None,
        },
        &mut model,
    );

    assert!(model.leaderboard.board.is_none());
    assert_eq!(model.active_screen, Some(Screen::Leaderboard));
    let calls = http_calls(update.effects);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].authorization.as_deref(), Some("Bearer tok_456"));

    // The first user's late response is dropped.
    app.update(
        Event::Leaderboard(LeaderboardEvent::Loaded {
            cycle,
            result: Ok(board(10, 3, 25)),
        }),
        &mut model,
    );
    assert!(model.leaderboard.board.is_none());
}

#[test]
fn test_sign_out_clears_everything() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    sign_in(&app, &mut model, "u1", None);
    app.update(Event::ScreenFocused(Screen::Leaderboard), &mut model);

    let update = app.update(Event::SignedOut, &mut model);

    // The cached user is wiped from device storage.
    assert!(update
        .effects
        .iter()
        .any(|e| !matches!(e, Effect::Http(_) | Effect::Render(_))));
    assert!(model.session.ready().is_none());
    assert!(model.active_screen.is_none());
    assert!(!model.leaderboard.scope.any_loading());
    let view = App.view(&model);
    assert_eq!(view.screen, ScreenView::None);
}
