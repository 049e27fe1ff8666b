use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::info;

use super::{
    finish_mutation, issued, land, mutation_not_sent, ready_session, refetch_if_active, reject,
    report, Landing,
};
use crate::capabilities::{ApiResult, Capabilities};
use crate::draft::Draft;
use crate::event::{Event, Screen};
use crate::fetch::{CycleId, FetchScope, SliceKey};
use crate::listing::{
    any_field_contains, apply, cmp_f64, page_label, ListQuery, Listable, SortDirection, SortSpec,
};
use crate::model::{
    BulkFoodRequest, FoodEntry, FoodEntryId, FoodLogRequest, MealType, Model, NewFoodEntry,
};
use crate::progress::progress_percent;
use crate::services::Api;
use crate::{ValidationError, DEFAULT_DAILY_CALORIE_TARGET, MAX_MEAL_ITEMS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FoodLogSlice {
    Entries,
}

impl SliceKey for FoodLogSlice {
    fn name(self) -> &'static str {
        "entries"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodSort {
    Time,
    Calories,
}

impl Listable for FoodEntry {
    type Filter = Option<MealType>;
    type SortKey = FoodSort;

    fn matches_search(&self, needle: &str) -> bool {
        any_field_contains(needle, &[self.name.as_str()])
    }

    fn matches_filter(&self, filter: &Option<MealType>) -> bool {
        filter.map_or(true, |meal| self.meal == meal)
    }

    fn listed_on(&self) -> Option<NaiveDate> {
        Some(self.logged_at.date_naive())
    }

    fn compare(&self, other: &Self, key: FoodSort) -> Ordering {
        match key {
            FoodSort::Time => self.logged_at.cmp(&other.logged_at),
            FoodSort::Calories => cmp_f64(self.calories, other.calories),
        }
    }
}

/// Items collected for one meal before they are logged together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealBuilder {
    pub meal: MealType,
    pub items: Vec<NewFoodEntry>,
}

impl Default for MealBuilder {
    fn default() -> Self {
        Self {
            meal: MealType::Breakfast,
            items: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FoodLogAction {
    EntryAdded,
    EntryDeleted,
    MealSaved,
}

impl FoodLogAction {
    const fn name(self) -> &'static str {
        match self {
            Self::EntryAdded => "food_entry_added",
            Self::EntryDeleted => "food_entry_deleted",
            Self::MealSaved => "meal_saved",
        }
    }

    const fn success_message(self) -> &'static str {
        match self {
            Self::EntryAdded => "Food logged",
            Self::EntryDeleted => "Entry removed",
            Self::MealSaved => "Meal logged",
        }
    }
}

#[derive(Debug)]
pub struct FoodLogState {
    pub scope: FetchScope<FoodLogSlice>,
    pub selected_date: NaiveDate,
    pub entries: Option<Vec<FoodEntry>>,
    pub query: ListQuery<Option<MealType>, FoodSort>,
    pub meal_builder: Draft<MealBuilder>,
    pub saving_meal: bool,
}

impl FoodLogState {
    #[must_use]
    pub fn new(today: NaiveDate) -> Self {
        Self {
            scope: FetchScope::default(),
            selected_date: today,
            entries: None,
            query: ListQuery::new(SortSpec {
                key: FoodSort::Time,
                direction: SortDirection::Ascending,
            }),
            meal_builder: Draft::default(),
            saving_meal: false,
        }
    }

    fn total_pages(&self) -> usize {
        apply(self.entries.as_deref().unwrap_or_default(), &self.query).total_pages
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub enum FoodLogEvent {
    SelectDate(NaiveDate),
    AddEntry(NewFoodEntry),
    DeleteEntry(FoodEntryId),
    FilterMeal(Option<MealType>),
    SortBy(FoodSort),
    NextPage,
    PrevPage,
    OpenMealBuilder { meal: MealType },
    MealBuilderAddItem(NewFoodEntry),
    MealBuilderRemoveItem(usize),
    SaveMeal,
    DiscardMeal,

    #[serde(skip)]
    Loaded {
        cycle: CycleId,
        result: ApiResult<Vec<FoodEntry>>,
    },
    #[serde(skip)]
    Mutated {
        action: FoodLogAction,
        result: ApiResult<()>,
    },
}

impl FoodLogEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SelectDate(_) => "food_log.select_date",
            Self::AddEntry(_) => "food_log.add_entry",
            Self::DeleteEntry(_) => "food_log.delete_entry",
            Self::FilterMeal(_) => "food_log.filter_meal",
            Self::SortBy(_) => "food_log.sort_by",
            Self::NextPage => "food_log.next_page",
            Self::PrevPage => "food_log.prev_page",
            Self::OpenMealBuilder { .. } => "food_log.open_meal_builder",
            Self::MealBuilderAddItem(_) => "food_log.meal_builder_add_item",
            Self::MealBuilderRemoveItem(_) => "food_log.meal_builder_remove_item",
            Self::SaveMeal => "food_log.save_meal",
            Self::DiscardMeal => "food_log.discard_meal",
            Self::Loaded { .. } => "food_log.loaded",
            Self::Mutated { .. } => "food_log.mutated",
        }
    }

    pub const fn is_user_initiated(&self) -> bool {
        !matches!(self, Self::Loaded { .. } | Self::Mutated { .. })
    }
}

fn wrap(event: FoodLogEvent) -> Event {
    Event::FoodLog(event)
}

pub fn fetch(model: &mut Model, caps: &Capabilities, refreshing: bool) {
    let Some(session) = ready_session(model, Screen::FoodLog) else {
        return;
    };
    let state = &mut model.food_log;
    let cycle = state.scope.begin(&[FoodLogSlice::Entries], refreshing);
    let sent = Api::new(&caps.http, &model.config, &session).food_logs(
        &session.user_id,
        state.selected_date,
        move |result| wrap(FoodLogEvent::Loaded { cycle, result }),
    );
    issued(&mut state.scope, cycle, FoodLogSlice::Entries, sent);
}

fn validate_amount(value: f64, field: &'static str) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::Negative { field })
    }
}

fn validate_entry(entry: &NewFoodEntry) -> Result<(), ValidationError> {
    if entry.name.trim().is_empty() {
        return Err(ValidationError::Blank { field: "food name" });
    }
    validate_amount(entry.calories, "calories")?;
    validate_amount(entry.protein_g, "protein")?;
    validate_amount(entry.carbs_g, "carbs")?;
    validate_amount(entry.fat_g, "fat")
}

fn validate_meal(items: &[NewFoodEntry]) -> Result<(), ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::EmptyMeal);
    }
    if items.len() > MAX_MEAL_ITEMS {
        return Err(ValidationError::TooManyMealItems {
            max: MAX_MEAL_ITEMS,
        });
    }
    items.iter().try_for_each(validate_entry)
}

pub fn update(event: FoodLogEvent, model: &mut Model, caps: &Capabilities) {
    let state = &mut model.food_log;
    match event {
        FoodLogEvent::Loaded { cycle, result } => {
            let landing = land(
                &mut state.scope,
                cycle,
                FoodLogSlice::Entries,
                &mut state.entries,
                result,
            );
            if landing == Landing::Stored {
                let total = state.total_pages();
                state.query.clamp_page(total);
            }
            report(model, landing);
        }

        FoodLogEvent::SelectDate(date) => {
            if state.selected_date == date && state.entries.is_some() {
                return;
            }
            state.selected_date = date;
            // The old day's entries must not be shown under the new date.
            state.entries = None;
            fetch(model, caps, false);
        }

        FoodLogEvent::FilterMeal(meal) => state.query.set_filter(meal),
        FoodLogEvent::SortBy(key) => state.query.sort_by(key),
        FoodLogEvent::NextPage => {
            let total = state.total_pages();
            state.query.next_page(total);
        }
        FoodLogEvent::PrevPage => {
            let total = state.total_pages();
            state.query.prev_page(total);
        }

        FoodLogEvent::AddEntry(entry) => {
            if let Err(e) = validate_entry(&entry) {
                reject(model, e);
                return;
            }
            let Some(session) = ready_session(model, Screen::FoodLog) else {
                return;
            };
            let action = FoodLogAction::EntryAdded;
            let request = FoodLogRequest {
                user_id: &session.user_id,
                date: model.food_log.selected_date,
                entry: &entry,
            };
            let sent = Api::new(&caps.http, &model.config, &session)
                .create_food_log(&request, move |result| {
                    wrap(FoodLogEvent::Mutated { action, result })
                });
            if let Err(e) = sent {
                mutation_not_sent(model, action.name(), e);
            }
        }

        FoodLogEvent::DeleteEntry(id) => {
            let Some(session) = ready_session(model, Screen::FoodLog) else {
                return;
            };
            let action = FoodLogAction::EntryDeleted;
            let sent = Api::new(&caps.http, &model.config, &session)
                .delete_food_log(&id, move |result| wrap(FoodLogEvent::Mutated { action, result }));
            if let Err(e) = sent {
                mutation_not_sent(model, action.name(), e);
            }
        }

        FoodLogEvent::OpenMealBuilder { meal } => {
            state.meal_builder.reset(MealBuilder {
                meal,
                items: Vec::new(),
            });
            state.meal_builder.open();
        }
        FoodLogEvent::MealBuilderAddItem(item) => {
            if let Err(e) = validate_entry(&item) {
                reject(model, e);
                return;
            }
            state.meal_builder.edit(|builder| {
                let mut item = item;
                item.meal = builder.meal;
                builder.items.push(item);
            });
        }
        FoodLogEvent::MealBuilderRemoveItem(index) => {
            state.meal_builder.edit(|builder| {
                if index < builder.items.len() {
                    builder.items.remove(index);
                }
            });
        }
        FoodLogEvent::DiscardMeal => state.meal_builder.discard(),

        FoodLogEvent::SaveMeal => {
            if state.saving_meal {
                return;
            }
            let Some(builder) = state.meal_builder.draft().cloned() else {
                return;
            };
            if let Err(e) = validate_meal(&builder.items) {
                reject(model, e);
                return;
            }
            let Some(session) = ready_session(model, Screen::FoodLog) else {
                return;
            };
            let action = FoodLogAction::MealSaved;
            let request = BulkFoodRequest {
                user_id: &session.user_id,
                date: model.food_log.selected_date,
                entries: &builder.items,
            };
            info!(items = builder.items.len(), "logging meal");
            let sent = Api::new(&caps.http, &model.config, &session)
                .bulk_create_food_logs(&request, move |result| {
                    wrap(FoodLogEvent::Mutated { action, result })
                });
            match sent {
                Ok(()) => model.food_log.saving_meal = true,
                Err(e) => mutation_not_sent(model, action.name(), e),
            }
        }

        FoodLogEvent::Mutated { action, result } => {
            if action == FoodLogAction::MealSaved {
                state.saving_meal = false;
                // A failed save keeps the builder open so nothing typed is lost.
                if result.is_ok() {
                    state.meal_builder.discard();
                }
            }
            if finish_mutation(model, action.name(), result, action.success_message()) {
                refetch_if_active(Screen::FoodLog, model, caps);
            }
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub struct DayTotals {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

impl DayTotals {
    #[must_use]
    pub fn of(entries: &[FoodEntry]) -> Self {
        entries.iter().fold(Self::default(), |acc, e| Self {
            calories: acc.calories + e.calories,
            protein_g: acc.protein_g + e.protein_g,
            carbs_g: acc.carbs_g + e.carbs_g,
            fat_g: acc.fat_g + e.fat_g,
        })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FoodLogView {
    pub loading: BTreeMap<String, bool>,
    pub refreshing: bool,
    pub selected_date: NaiveDate,
    pub is_today: bool,
    pub entries: Vec<FoodEntry>,
    pub meal_filter: Option<MealType>,
    pub sort: SortSpec<FoodSort>,
    pub page_label: String,
    pub has_prev: bool,
    pub has_next: bool,
    pub totals: DayTotals,
    pub calorie_target: f64,
    pub calorie_progress_percent: f64,
    pub calories_remaining: f64,
    pub meal_builder: Option<MealBuilder>,
    pub meal_builder_calories: f64,
    pub saving_meal: bool,
}

pub fn view(model: &Model) -> FoodLogView {
    let state = &model.food_log;
    let entries = state.entries.as_deref().unwrap_or_default();
    let totals = DayTotals::of(entries);
    let calorie_target = model
        .profile
        .profile
        .as_ref()
        .and_then(|p| p.daily_calorie_target)
        .filter(|t| t.is_finite() && *t > 0.0)
        .unwrap_or(DEFAULT_DAILY_CALORIE_TARGET);

    let paged = apply(entries, &state.query);
    let meal_builder = state.meal_builder.draft().cloned();
    let meal_builder_calories = meal_builder
        .as_ref()
        .map_or(0.0, |b| b.items.iter().map(|i| i.calories).sum());

    FoodLogView {
        loading: state.scope.loading_flags(),
        refreshing: state.scope.is_refreshing(),
        selected_date: state.selected_date,
        is_today: state.selected_date == model.today,
        page_label: page_label(paged.page, paged.total_pages),
        has_prev: paged.has_prev,
        has_next: paged.has_next,
        entries: paged.items.into_iter().cloned().collect(),
        meal_filter: *state.query.filter(),
        sort: state.query.sort(),
        totals,
        calorie_target,
        calorie_progress_percent: progress_percent(totals.calories, calorie_target),
        calories_remaining: (calorie_target - totals.calories).max(0.0),
        meal_builder,
        meal_builder_calories,
        saving_meal: state.saving_meal,
    }
}
