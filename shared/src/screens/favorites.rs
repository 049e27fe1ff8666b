use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use super::{
    finish_mutation, issued, land, load_stored, mutation_not_sent, ready_session,
    refetch_if_active, report, store, Landing,
};
use crate::capabilities::{decode_value, ApiResult, Capabilities, StoredKey, UserScope};
use crate::draft::Draft;
use crate::event::{Event, Screen};
use crate::fetch::{CycleId, FetchScope, SliceKey};
use crate::listing::{
    any_field_contains, apply, page_label, DateRange, ListQuery, Listable, SortDirection, SortSpec,
};
use crate::model::{ExerciseId, FavoriteExercise, Model};
use crate::services::Api;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FavoritesSlice {
    Favorites,
}

impl SliceKey for FavoritesSlice {
    fn name(self) -> &'static str {
        "favorites"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FavoriteSort {
    Name,
    DateAdded,
    Category,
}

impl Listable for FavoriteExercise {
    /// Category, matched case-insensitively.
    type Filter = Option<String>;
    type SortKey = FavoriteSort;

    fn matches_search(&self, needle: &str) -> bool {
        any_field_contains(
            needle,
            &[
                self.name.as_str(),
                self.category.as_str(),
                self.equipment.as_deref().unwrap_or_default(),
            ],
        )
    }

    fn matches_filter(&self, filter: &Option<String>) -> bool {
        filter
            .as_deref()
            .map_or(true, |category| self.category.eq_ignore_ascii_case(category))
    }

    fn listed_on(&self) -> Option<NaiveDate> {
        Some(self.added_at.date_naive())
    }

    fn compare(&self, other: &Self, key: FavoriteSort) -> Ordering {
        match key {
            FavoriteSort::Name => self.name.to_lowercase().cmp(&other.name.to_lowercase()),
            FavoriteSort::DateAdded => self.added_at.cmp(&other.added_at),
            FavoriteSort::Category => self
                .category
                .to_lowercase()
                .cmp(&other.category.to_lowercase())
                .then_with(|| self.name.to_lowercase().cmp(&other.name.to_lowercase())),
        }
    }
}

/// What the filter modal edits before it is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FavoriteFilterDraft {
    pub category: Option<String>,
    pub date_range: DateRange,
}

#[derive(Debug)]
pub struct FavoritesState {
    pub scope: FetchScope<FavoritesSlice>,
    pub items: Option<Vec<FavoriteExercise>>,
    /// True while `items` holds the device copy and the network read is
    /// still outstanding.
    pub from_cache: bool,
    pub query: ListQuery<Option<String>, FavoriteSort>,
    pub filter_draft: Draft<FavoriteFilterDraft>,
    pub removing: Option<ExerciseId>,
}

impl Default for FavoritesState {
    fn default() -> Self {
        Self {
            scope: FetchScope::default(),
            items: None,
            from_cache: false,
            query: ListQuery::new(SortSpec {
                key: FavoriteSort::DateAdded,
                direction: SortDirection::Descending,
            }),
            filter_draft: Draft::default(),
            removing: None,
        }
    }
}

impl FavoritesState {
    fn total_pages(&self) -> usize {
        apply(self.items.as_deref().unwrap_or_default(), &self.query).total_pages
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub enum FavoritesEvent {
    SearchChanged(String),
    SortBy(FavoriteSort),
    NextPage,
    PrevPage,
    GoToPage(usize),
    OpenFilters,
    FilterDraftChanged(FavoriteFilterDraft),
    ApplyFilters,
    CancelFilters,
    ClearFilters,
    Remove(ExerciseId),

    #[serde(skip)]
    Loaded {
        cycle: CycleId,
        result: ApiResult<Vec<FavoriteExercise>>,
    },
    #[serde(skip)]
    Removed {
        id: ExerciseId,
        result: ApiResult<()>,
    },
}

impl FavoritesEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SearchChanged(_) => "favorites.search_changed",
            Self::SortBy(_) => "favorites.sort_by",
            Self::NextPage => "favorites.next_page",
            Self::PrevPage => "favorites.prev_page",
            Self::GoToPage(_) => "favorites.go_to_page",
            Self::OpenFilters => "favorites.open_filters",
            Self::FilterDraftChanged(_) => "favorites.filter_draft_changed",
            Self::ApplyFilters => "favorites.apply_filters",
            Self::CancelFilters => "favorites.cancel_filters",
            Self::ClearFilters => "favorites.clear_filters",
            Self::Remove(_) => "favorites.remove",
            Self::Loaded { .. } => "favorites.loaded",
            Self::Removed { .. } => "favorites.removed",
        }
    }

    pub const fn is_user_initiated(&self) -> bool {
        !matches!(self, Self::Loaded { .. } | Self::Removed { .. })
    }
}

fn wrap(event: FavoritesEvent) -> Event {
    Event::Favorites(event)
}

pub fn fetch(model: &mut Model, caps: &Capabilities, refreshing: bool) {
    let Some(session) = ready_session(model, Screen::Favorites) else {
        return;
    };
    if model.favorites.items.is_none() {
        load_stored(caps, StoredKey::favorites_cache(&session.user_id));
    }
    let state = &mut model.favorites;
    let cycle = state.scope.begin(&[FavoritesSlice::Favorites], refreshing);
    let sent = Api::new(&caps.http, &model.config, &session).favorites(
        &session.user_id,
        move |result| wrap(FavoritesEvent::Loaded { cycle, result }),
    );
    issued(&mut state.scope, cycle, FavoritesSlice::Favorites, sent);
}

/// Shows the device copy of the list, but only until the network answers.
pub fn stored_value(model: &mut Model, key: &StoredKey, stored: Result<Option<Vec<u8>>, String>) {
    let StoredKey::FavoritesCache(scope) = key else {
        return;
    };
    let Some(session) = model.session.ready() else {
        return;
    };
    if *scope != UserScope::of(&session.user_id) {
        debug!("ignoring favorites cache for another user");
        return;
    }
    let state = &mut model.favorites;
    if state.items.is_some() {
        debug!("network list already landed, cache not applied");
        return;
    }
    match decode_value::<Vec<FavoriteExercise>>(stored) {
        Ok(Some(items)) => {
            state.items = Some(items);
            state.from_cache = true;
        }
        Ok(None) => {}
        Err(error) => warn!(%error, "unreadable favorites cache"),
    }
}

pub fn update(event: FavoritesEvent, model: &mut Model, caps: &Capabilities) {
    let state = &mut model.favorites;
    match event {
        FavoritesEvent::Loaded { cycle, result } => {
            let landing = land(
                &mut state.scope,
                cycle,
                FavoritesSlice::Favorites,
                &mut state.items,
                result,
            );
            if landing == Landing::Stored {
                state.from_cache = false;
                let total = state.total_pages();
                state.query.clamp_page(total);
                if let (Some(session), Some(items)) = (model.session.ready(), state.items.as_ref()) {
                    store(caps, StoredKey::favorites_cache(&session.user_id), items);
                }
            }
            report(model, landing);
        }

        FavoritesEvent::SearchChanged(search) => state.query.set_search(search),
        FavoritesEvent::SortBy(key) => state.query.sort_by(key),
        FavoritesEvent::NextPage => {
            let total = state.total_pages();
            state.query.next_page(total);
        }
        FavoritesEvent::PrevPage => {
            let total = state.total_pages();
            state.query.prev_page(total);
        }
        FavoritesEvent::GoToPage(page) => {
            let total = state.total_pages();
            state.query.go_to_page(page, total);
        }

        FavoritesEvent::OpenFilters => state.filter_draft.open(),
        FavoritesEvent::FilterDraftChanged(draft) => state.filter_draft.edit(|d| *d = draft),
        FavoritesEvent::ApplyFilters => {
            if state.filter_draft.commit() {
                let applied = state.filter_draft.committed().clone();
                state.query.set_filter(applied.category);
                state.query.set_date_range(applied.date_range);
            }
        }
        FavoritesEvent::CancelFilters => state.filter_draft.discard(),
        FavoritesEvent::ClearFilters => {
            state.filter_draft.reset(FavoriteFilterDraft::default());
            state.query.reset();
        }

        FavoritesEvent::Remove(id) => {
            if state.removing.is_some() {
                return;
            }
            let Some(session) = ready_session(model, Screen::Favorites) else {
                return;
            };
            let callback_id = id.clone();
            let sent = Api::new(&caps.http, &model.config, &session).remove_favorite(
                &session.user_id,
                &id,
                move |result| {
                    wrap(FavoritesEvent::Removed {
                        id: callback_id,
                        result,
                    })
                },
            );
            match sent {
                Ok(()) => model.favorites.removing = Some(id),
                Err(e) => mutation_not_sent(model, "remove_favorite", e),
            }
        }

        FavoritesEvent::Removed { id, result } => {
            if state.removing.as_ref() == Some(&id) {
                state.removing = None;
            }
            if finish_mutation(model, "remove_favorite", result, "Removed from favorites") {
                refetch_if_active(Screen::Favorites, model, caps);
            }
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FavoritesView {
    pub loading: BTreeMap<String, bool>,
    pub refreshing: bool,
    pub from_cache: bool,
    pub items: Vec<FavoriteExercise>,
    pub categories: Vec<String>,
    pub search: String,
    pub category: Option<String>,
    pub date_range: DateRange,
    pub filter_draft: Option<FavoriteFilterDraft>,
    pub sort: SortSpec<FavoriteSort>,
    pub page_label: String,
    pub total_count: usize,
    pub has_prev: bool,
    pub has_next: bool,
    pub removing: Option<ExerciseId>,
}

pub fn view(model: &Model) -> FavoritesView {
    let state = &model.favorites;
    let records = state.items.as_deref().unwrap_or_default();
    let categories: BTreeSet<&str> = records.iter().map(|f| f.category.as_str()).collect();
    let paged = apply(records, &state.query);

    FavoritesView {
        loading: state.scope.loading_flags(),
        refreshing: state.scope.is_refreshing(),
        from_cache: state.from_cache,
        page_label: page_label(paged.page, paged.total_pages),
        total_count: paged.total_count,
        has_prev: paged.has_prev,
        has_next: paged.has_next,
        items: paged.items.into_iter().cloned().collect(),
        categories: categories.into_iter().map(str::to_string).collect(),
        search: state.query.search().to_string(),
        category: state.query.filter().clone(),
        date_range: state.query.date_range(),
        filter_draft: state.filter_draft.draft().cloned(),
        sort: state.query.sort(),
        removing: state.removing.clone(),
    }
}
