use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::{
    finish_mutation, issued, land, mutation_not_sent, ready_session, refetch_if_active, reject,
    report,
};
use crate::capabilities::{ApiResult, Capabilities};
use crate::draft::Draft;
use crate::event::{Event, Screen};
use crate::fetch::{CycleId, FetchScope, SliceKey};
use crate::model::{DayOfWeek, Model, Reminder, ReminderId, ReminderPlan};
use crate::services::Api;
use crate::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RemindersSlice {
    Plan,
}

impl SliceKey for RemindersSlice {
    fn name(self) -> &'static str {
        "plan"
    }
}

#[derive(Debug, Default)]
pub struct RemindersState {
    pub scope: FetchScope<RemindersSlice>,
    pub plan: Option<ReminderPlan>,
    pub editing: Option<Draft<Reminder>>,
    pub saving: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReminderAction {
    Toggled,
    Edited,
}

impl ReminderAction {
    const fn name(self) -> &'static str {
        match self {
            Self::Toggled => "reminder_toggled",
            Self::Edited => "reminder_edited",
        }
    }

    const fn success_message(self) -> &'static str {
        match self {
            Self::Toggled => "Reminder updated",
            Self::Edited => "Reminder saved",
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub enum RemindersEvent {
    Toggle(ReminderId),
    OpenEditor(ReminderId),
    EditTime(String),
    ToggleDay(DayOfWeek),
    SetEnabled(bool),
    SetTitle(String),
    SaveEditor,
    CancelEditor,

    #[serde(skip)]
    Loaded {
        cycle: CycleId,
        result: ApiResult<ReminderPlan>,
    },
    #[serde(skip)]
    Mutated {
        action: ReminderAction,
        result: ApiResult<()>,
    },
}

impl RemindersEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Toggle(_) => "reminders.toggle",
            Self::OpenEditor(_) => "reminders.open_editor",
            Self::EditTime(_) => "reminders.edit_time",
            Self::ToggleDay(_) => "reminders.toggle_day",
            Self::SetEnabled(_) => "reminders.set_enabled",
            Self::SetTitle(_) => "reminders.set_title",
            Self::SaveEditor => "reminders.save_editor",
            Self::CancelEditor => "reminders.cancel_editor",
            Self::Loaded { .. } => "reminders.loaded",
            Self::Mutated { .. } => "reminders.mutated",
        }
    }

    pub const fn is_user_initiated(&self) -> bool {
        !matches!(self, Self::Loaded { .. } | Self::Mutated { .. })
    }
}

fn wrap(event: RemindersEvent) -> Event {
    Event::Reminders(event)
}

pub fn fetch(model: &mut Model, caps: &Capabilities, refreshing: bool) {
    let Some(session) = ready_session(model, Screen::Reminders) else {
        return;
    };
    let state = &mut model.reminders;
    let cycle = state.scope.begin(&[RemindersSlice::Plan], refreshing);
    let sent = Api::new(&caps.http, &model.config, &session)
        .reminder_plan(&session.user_id, move |result| {
            wrap(RemindersEvent::Loaded { cycle, result })
        });
    issued(&mut state.scope, cycle, RemindersSlice::Plan, sent);
}

/// 24-hour `HH:MM`.
pub fn validate_time(time: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidTime(time.to_string());
    let (hours, minutes) = time.split_once(':').ok_or_else(invalid)?;
    let two_digits = |part: &str| part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit());
    if !two_digits(hours) || !two_digits(minutes) {
        return Err(invalid());
    }
    let hours: u8 = hours.parse().map_err(|_| invalid())?;
    let minutes: u8 = minutes.parse().map_err(|_| invalid())?;
    if hours < 24 && minutes < 60 {
        Ok(())
    } else {
        Err(invalid())
    }
}

pub fn validate_reminder(reminder: &Reminder) -> Result<(), ValidationError> {
    if reminder.title.trim().is_empty() {
        return Err(ValidationError::Blank { field: "title" });
    }
    validate_time(&reminder.time)?;
    if reminder.enabled && reminder.days.is_empty() {
        return Err(ValidationError::NoDaysSelected);
    }
    Ok(())
}

/// The plan with `reminder` swapped in for the one sharing its id.
fn plan_with(plan: &ReminderPlan, reminder: &Reminder) -> ReminderPlan {
    let mut plan = plan.clone();
    if let Some(slot) = plan.reminders.iter_mut().find(|r| r.id == reminder.id) {
        *slot = reminder.clone();
    }
    plan
}

fn send_plan(model: &mut Model, caps: &Capabilities, plan: &ReminderPlan, action: ReminderAction) {
    let Some(session) = ready_session(model, Screen::Reminders) else {
        return;
    };
    let sent = Api::new(&caps.http, &model.config, &session)
        .update_reminder_plan(plan, move |result| wrap(RemindersEvent::Mutated { action, result }));
    match sent {
        Ok(()) => model.reminders.saving = true,
        Err(e) => mutation_not_sent(model, action.name(), e),
    }
}

pub fn update(event: RemindersEvent, model: &mut Model, caps: &Capabilities) {
    let state = &mut model.reminders;
    match event {
        RemindersEvent::Loaded { cycle, result } => {
            let landing = land(&mut state.scope, cycle, RemindersSlice::Plan, &mut state.plan, result);
            report(model, landing);
        }

        RemindersEvent::Toggle(id) => {
            if state.saving {
                return;
            }
            let Some(plan) = state.plan.as_ref() else {
                debug!("plan not loaded, ignoring toggle");
                return;
            };
            let Some(mut reminder) = plan.reminders.iter().find(|r| r.id == id).cloned() else {
                return;
            };
            reminder.enabled = !reminder.enabled;
            if let Err(e) = validate_reminder(&reminder) {
                reject(model, e);
                return;
            }
            // Not optimistic: the switch flips once the server re-fetch lands.
            let plan = plan_with(plan, &reminder);
            send_plan(model, caps, &plan, ReminderAction::Toggled);
        }

        RemindersEvent::OpenEditor(id) => {
            let reminder = state
                .plan
                .as_ref()
                .and_then(|p| p.reminders.iter().find(|r| r.id == id))
                .cloned();
            state.editing = reminder.map(|r| {
                let mut draft = Draft::new(r);
                draft.open();
                draft
            });
        }
        RemindersEvent::EditTime(time) => edit(state, |r| r.time = time),
        RemindersEvent::ToggleDay(day) => edit(state, |r| {
            if let Some(i) = r.days.iter().position(|d| *d == day) {
                r.days.remove(i);
            } else {
                r.days.push(day);
                r.days.sort();
            }
        }),
        RemindersEvent::SetEnabled(enabled) => edit(state, |r| r.enabled = enabled),
        RemindersEvent::SetTitle(title) => edit(state, |r| r.title = title),
        RemindersEvent::CancelEditor => state.editing = None,

        RemindersEvent::SaveEditor => {
            if state.saving {
                return;
            }
            let Some(reminder) = state.editing.as_ref().and_then(Draft::draft).cloned() else {
                return;
            };
            if let Err(e) = validate_reminder(&reminder) {
                reject(model, e);
                return;
            }
            let Some(plan) = state.plan.as_ref() else {
                return;
            };
            let plan = plan_with(plan, &reminder);
            send_plan(model, caps, &plan, ReminderAction::Edited);
        }

        RemindersEvent::Mutated { action, result } => {
            state.saving = false;
            if action == ReminderAction::Edited && result.is_ok() {
                if let Some(editing) = state.editing.as_mut() {
                    editing.commit();
                }
                state.editing = None;
            }
            if finish_mutation(model, action.name(), result, action.success_message()) {
                refetch_if_active(Screen::Reminders, model, caps);
            }
        }
    }
}

fn edit(state: &mut RemindersState, f: impl FnOnce(&mut Reminder)) {
    match state.editing.as_mut() {
        Some(editing) => editing.edit(f),
        None => debug!("no reminder open for editing"),
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RemindersView {
    pub loading: BTreeMap<String, bool>,
    pub refreshing: bool,
    pub reminders: Vec<Reminder>,
    pub enabled_count: usize,
    pub editing: Option<Reminder>,
    /// Inline message for the open editor, if its current draft wouldn't save.
    pub editor_error: Option<String>,
    pub saving: bool,
}

pub fn view(model: &Model) -> RemindersView {
    let state = &model.reminders;
    let reminders = state
        .plan
        .as_ref()
        .map(|p| p.reminders.clone())
        .unwrap_or_default();
    let editing = state.editing.as_ref().and_then(Draft::draft).cloned();
    let editor_error = editing
        .as_ref()
        .and_then(|r| validate_reminder(r).err())
        .map(|e| e.to_string());

    RemindersView {
        loading: state.scope.loading_flags(),
        refreshing: state.scope.is_refreshing(),
        enabled_count: reminders.iter().filter(|r| r.enabled).count(),
        reminders,
        editing,
        editor_error,
        saving: state.saving,
    }
}
