use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::{
    finish_mutation, issued, land, mutation_not_sent, ready_session, refetch_if_active, report,
};
use crate::capabilities::{ApiResult, Capabilities};
use crate::draft::Draft;
use crate::event::{Event, Screen};
use crate::fetch::{CycleId, FetchScope, SliceKey};
use crate::listing::{
    any_field_contains, apply, cmp_f64, page_label, ListQuery, Listable, SortDirection, SortSpec,
};
use crate::model::{Model, PackageId, PackagePage, PackageStatus, ServicePackage, Session, TrainerId};
use crate::services::Api;
use crate::TRAINER_PACKAGES_PAGE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TrainerSlice {
    Packages,
}

impl SliceKey for TrainerSlice {
    fn name(self) -> &'static str {
        "packages"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageSort {
    Title,
    Price,
    CreatedAt,
}

// The status filter is applied by the server, so the client-side filter is
// empty and only search and sort run locally.
impl Listable for ServicePackage {
    type Filter = ();
    type SortKey = PackageSort;

    fn matches_search(&self, needle: &str) -> bool {
        any_field_contains(
            needle,
            &[self.title.as_str(), self.description.as_deref().unwrap_or_default()],
        )
    }

    fn matches_filter(&self, _: &()) -> bool {
        true
    }

    fn listed_on(&self) -> Option<NaiveDate> {
        Some(self.created_at.date_naive())
    }

    fn compare(&self, other: &Self, key: PackageSort) -> Ordering {
        match key {
            PackageSort::Title => self.title.to_lowercase().cmp(&other.title.to_lowercase()),
            PackageSort::Price => cmp_f64(self.price, other.price),
            PackageSort::CreatedAt => self.created_at.cmp(&other.created_at),
        }
    }
}

#[derive(Debug)]
pub struct TrainerState {
    pub scope: FetchScope<TrainerSlice>,
    pub page: u32,
    pub packages: Option<PackagePage>,
    pub status_filter: Draft<Option<PackageStatus>>,
    pub query: ListQuery<(), PackageSort>,
    pub toggling: Option<PackageId>,
}

impl Default for TrainerState {
    fn default() -> Self {
        let mut query = ListQuery::new(SortSpec {
            key: PackageSort::CreatedAt,
            direction: SortDirection::Descending,
        });
        // One server page is one client page.
        query.set_page_size(TRAINER_PACKAGES_PAGE_SIZE as usize);
        Self {
            scope: FetchScope::default(),
            page: 1,
            packages: None,
            status_filter: Draft::default(),
            query,
            toggling: None,
        }
    }
}

impl TrainerState {
    fn total_pages(&self) -> u32 {
        self.packages.as_ref().map_or(0, |p| p.total_pages)
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub enum TrainerEvent {
    NextPage,
    PrevPage,
    GoToPage(u32),
    SearchChanged(String),
    SortBy(PackageSort),
    OpenStatusFilter,
    StatusFilterDraftChanged(Option<PackageStatus>),
    ApplyStatusFilter,
    CancelStatusFilter,
    ToggleStatus(PackageId),

    #[serde(skip)]
    Loaded {
        cycle: CycleId,
        result: ApiResult<PackagePage>,
    },
    #[serde(skip)]
    StatusChanged {
        id: PackageId,
        result: ApiResult<()>,
    },
}

impl TrainerEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NextPage => "trainer.next_page",
            Self::PrevPage => "trainer.prev_page",
            Self::GoToPage(_) => "trainer.go_to_page",
            Self::SearchChanged(_) => "trainer.search_changed",
            Self::SortBy(_) => "trainer.sort_by",
            Self::OpenStatusFilter => "trainer.open_status_filter",
            Self::StatusFilterDraftChanged(_) => "trainer.status_filter_draft_changed",
            Self::ApplyStatusFilter => "trainer.apply_status_filter",
            Self::CancelStatusFilter => "trainer.cancel_status_filter",
            Self::ToggleStatus(_) => "trainer.toggle_status",
            Self::Loaded { .. } => "trainer.loaded",
            Self::StatusChanged { .. } => "trainer.status_changed",
        }
    }

    pub const fn is_user_initiated(&self) -> bool {
        !matches!(self, Self::Loaded { .. } | Self::StatusChanged { .. })
    }
}

fn wrap(event: TrainerEvent) -> Event {
    Event::Trainer(event)
}

/// The trainer screen is additionally gated on the session carrying a
/// trainer id.
fn trainer_session(model: &Model) -> Option<(Session, TrainerId)> {
    let session = ready_session(model, Screen::TrainerServices)?;
    match session.trainer_id.clone() {
        Some(trainer_id) => Some((session, trainer_id)),
        None => {
            debug!("no trainer id on session, skipping");
            None
        }
    }
}

pub fn fetch(model: &mut Model, caps: &Capabilities, refreshing: bool) {
    let Some((session, trainer_id)) = trainer_session(model) else {
        return;
    };
    let state = &mut model.trainer;
    let cycle = state.scope.begin(&[TrainerSlice::Packages], refreshing);
    let sent = Api::new(&caps.http, &model.config, &session).trainer_packages(
        &trainer_id,
        state.page,
        TRAINER_PACKAGES_PAGE_SIZE,
        *state.status_filter.committed(),
        move |result| wrap(TrainerEvent::Loaded { cycle, result }),
    );
    issued(&mut state.scope, cycle, TrainerSlice::Packages, sent);
}

fn go_to_page(model: &mut Model, caps: &Capabilities, page: u32) {
    let state = &mut model.trainer;
    let total = state.total_pages();
    if page < 1 || page > total || page == state.page {
        debug!(page, total, "page out of range");
        return;
    }
    state.page = page;
    fetch(model, caps, false);
}

pub fn update(event: TrainerEvent, model: &mut Model, caps: &Capabilities) {
    let state = &mut model.trainer;
    match event {
        TrainerEvent::Loaded { cycle, result } => {
            let landing = land(
                &mut state.scope,
                cycle,
                TrainerSlice::Packages,
                &mut state.packages,
                result,
            );
            report(model, landing);
        }

        TrainerEvent::NextPage => {
            let page = state.page.saturating_add(1);
            go_to_page(model, caps, page);
        }
        TrainerEvent::PrevPage => {
            let page = state.page.saturating_sub(1);
            go_to_page(model, caps, page);
        }
        TrainerEvent::GoToPage(page) => go_to_page(model, caps, page),

        TrainerEvent::SearchChanged(search) => state.query.set_search(search),
        TrainerEvent::SortBy(key) => state.query.sort_by(key),

        TrainerEvent::OpenStatusFilter => state.status_filter.open(),
        TrainerEvent::StatusFilterDraftChanged(status) => {
            state.status_filter.edit(|s| *s = status);
        }
        TrainerEvent::ApplyStatusFilter => {
            if state.status_filter.commit() {
                state.page = 1;
                fetch(model, caps, false);
            }
        }
        TrainerEvent::CancelStatusFilter => state.status_filter.discard(),

        TrainerEvent::ToggleStatus(id) => {
            if state.toggling.is_some() {
                return;
            }
            let Some(current) = state
                .packages
                .as_ref()
                .and_then(|p| p.packages.iter().find(|pkg| pkg.id == id))
                .map(|pkg| pkg.status)
            else {
                debug!("package not on the current page");
                return;
            };
            let Some((session, _)) = trainer_session(model) else {
                return;
            };
            let status = current.toggled();
            info!(status = status.as_str(), "toggling package status");
            let callback_id = id.clone();
            let sent = Api::new(&caps.http, &model.config, &session).set_package_status(
                &id,
                status,
                move |result| {
                    wrap(TrainerEvent::StatusChanged {
                        id: callback_id,
                        result,
                    })
                },
            );
            match sent {
                Ok(()) => model.trainer.toggling = Some(id),
                Err(e) => mutation_not_sent(model, "toggle_package_status", e),
            }
        }

        TrainerEvent::StatusChanged { id, result } => {
            if state.toggling.as_ref() == Some(&id) {
                state.toggling = None;
            }
            if finish_mutation(model, "toggle_package_status", result, "Package updated") {
                refetch_if_active(Screen::TrainerServices, model, caps);
            }
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PackageRow {
    pub package: ServicePackage,
    pub toggling: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TrainerView {
    pub loading: BTreeMap<String, bool>,
    pub refreshing: bool,
    /// False when the signed-in user has no trainer profile.
    pub available: bool,
    pub rows: Vec<PackageRow>,
    pub search: String,
    pub sort: SortSpec<PackageSort>,
    pub status_filter: Option<PackageStatus>,
    pub status_filter_draft: Option<Option<PackageStatus>>,
    pub page: u32,
    pub total_pages: u32,
    pub page_label: String,
    pub total_count: u32,
    pub has_prev: bool,
    pub has_next: bool,
}

pub fn view(model: &Model) -> TrainerView {
    let state = &model.trainer;
    let records = state
        .packages
        .as_ref()
        .map(|p| p.packages.as_slice())
        .unwrap_or_default();
    let rows = apply(records, &state.query)
        .items
        .into_iter()
        .map(|p| PackageRow {
            package: p.clone(),
            toggling: state.toggling.as_ref() == Some(&p.id),
        })
        .collect();
    let total_pages = state.total_pages();

    TrainerView {
        loading: state.scope.loading_flags(),
        refreshing: state.scope.is_refreshing(),
        available: model
            .session
            .ready()
            .is_some_and(|s| s.trainer_id.is_some()),
        rows,
        search: state.query.search().to_string(),
        sort: state.query.sort(),
        status_filter: *state.status_filter.committed(),
        status_filter_draft: state.status_filter.draft().copied(),
        page: state.page,
        total_pages,
        page_label: page_label(state.page as usize, total_pages as usize),
        total_count: state.packages.as_ref().map_or(0, |p| p.total_count),
        has_prev: state.page > 1,
        has_next: state.page < total_pages,
    }
}
