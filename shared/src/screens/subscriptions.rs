use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::info;

use super::{
    finish_mutation, issued, land, mutation_not_sent, ready_session, refetch_if_active, report,
    Landing,
};
use crate::capabilities::{ApiResult, Capabilities};
use crate::draft::Draft;
use crate::event::{Event, Screen};
use crate::fetch::{CycleId, FetchScope, SliceKey};
use crate::listing::{
    any_field_contains, apply, cmp_f64, page_label, ListQuery, Listable, SortDirection, SortSpec,
};
use crate::model::{Model, Subscription, SubscriptionId, SubscriptionStatus};
use crate::progress::{days_remaining, period_elapsed_percent};
use crate::services::Api;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SubscriptionSlice {
    Subscriptions,
}

impl SliceKey for SubscriptionSlice {
    fn name(self) -> &'static str {
        "subscriptions"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SubscriptionFilter {
    pub status: Option<SubscriptionStatus>,
    pub auto_renew_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionSort {
    PlanName,
    StartDate,
    EndDate,
    Price,
}

impl Listable for Subscription {
    type Filter = SubscriptionFilter;
    type SortKey = SubscriptionSort;

    fn matches_search(&self, needle: &str) -> bool {
        any_field_contains(
            needle,
            &[self.plan_name.as_str(), self.trainer_name.as_deref().unwrap_or_default()],
        )
    }

    fn matches_filter(&self, filter: &SubscriptionFilter) -> bool {
        filter.status.map_or(true, |s| self.status == s) && (!filter.auto_renew_only || self.auto_renew)
    }

    fn listed_on(&self) -> Option<NaiveDate> {
        Some(self.start_date)
    }

    fn compare(&self, other: &Self, key: SubscriptionSort) -> Ordering {
        match key {
            SubscriptionSort::PlanName => self
                .plan_name
                .to_lowercase()
                .cmp(&other.plan_name.to_lowercase()),
            SubscriptionSort::StartDate => self.start_date.cmp(&other.start_date),
            SubscriptionSort::EndDate => self.end_date.cmp(&other.end_date),
            SubscriptionSort::Price => cmp_f64(self.price, other.price),
        }
    }
}

#[derive(Debug)]
pub struct SubscriptionsState {
    pub scope: FetchScope<SubscriptionSlice>,
    pub subscriptions: Option<Vec<Subscription>>,
    pub query: ListQuery<SubscriptionFilter, SubscriptionSort>,
    pub filter_draft: Draft<SubscriptionFilter>,
    pub renewing: Option<SubscriptionId>,
}

impl Default for SubscriptionsState {
    fn default() -> Self {
        Self {
            scope: FetchScope::default(),
            subscriptions: None,
            query: ListQuery::new(SortSpec {
                key: SubscriptionSort::EndDate,
                direction: SortDirection::Ascending,
            }),
            filter_draft: Draft::default(),
            renewing: None,
        }
    }
}

impl SubscriptionsState {
    fn total_pages(&self) -> usize {
        let records = self.subscriptions.as_deref().unwrap_or_default();
        apply(records, &self.query).total_pages
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub enum SubscriptionsEvent {
    SearchChanged(String),
    SortBy(SubscriptionSort),
    NextPage,
    PrevPage,
    GoToPage(usize),
    OpenFilters,
    FilterDraftChanged(SubscriptionFilter),
    ApplyFilters,
    CancelFilters,
    ClearFilters,
    Renew(SubscriptionId),

    #[serde(skip)]
    Loaded {
        cycle: CycleId,
        result: ApiResult<Vec<Subscription>>,
    },
    #[serde(skip)]
    Renewed {
        id: SubscriptionId,
        result: ApiResult<()>,
    },
}

impl SubscriptionsEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SearchChanged(_) => "subscriptions.search_changed",
            Self::SortBy(_) => "subscriptions.sort_by",
            Self::NextPage => "subscriptions.next_page",
            Self::PrevPage => "subscriptions.prev_page",
            Self::GoToPage(_) => "subscriptions.go_to_page",
            Self::OpenFilters => "subscriptions.open_filters",
            Self::FilterDraftChanged(_) => "subscriptions.filter_draft_changed",
            Self::ApplyFilters => "subscriptions.apply_filters",
            Self::CancelFilters => "subscriptions.cancel_filters",
            Self::ClearFilters => "subscriptions.clear_filters",
            Self::Renew(_) => "subscriptions.renew",
            Self::Loaded { .. } => "subscriptions.loaded",
            Self::Renewed { .. } => "subscriptions.renewed",
        }
    }

    pub const fn is_user_initiated(&self) -> bool {
        !matches!(self, Self::Loaded { .. } | Self::Renewed { .. })
    }
}

fn wrap(event: SubscriptionsEvent) -> Event {
    Event::Subscriptions(event)
}

pub fn fetch(model: &mut Model, caps: &Capabilities, refreshing: bool) {
    let Some(session) = ready_session(model, Screen::Subscriptions) else {
        return;
    };
    let state = &mut model.subscriptions;
    let cycle = state
        .scope
        .begin(&[SubscriptionSlice::Subscriptions], refreshing);
    let sent = Api::new(&caps.http, &model.config, &session).subscriptions(
        &session.user_id,
        move |result| wrap(SubscriptionsEvent::Loaded { cycle, result }),
    );
    issued(&mut state.scope, cycle, SubscriptionSlice::Subscriptions, sent);
}

pub fn update(event: SubscriptionsEvent, model: &mut Model, caps: &Capabilities) {
    let state = &mut model.subscriptions;
    match event {
        SubscriptionsEvent::Loaded { cycle, result } => {
            let landing = land(
                &mut state.scope,
                cycle,
                SubscriptionSlice::Subscriptions,
                &mut state.subscriptions,
                result,
            );
            if landing == Landing::Stored {
                let total = state.total_pages();
                state.query.clamp_page(total);
            }
            report(model, landing);
        }

        SubscriptionsEvent::SearchChanged(search) => state.query.set_search(search),
        SubscriptionsEvent::SortBy(key) => state.query.sort_by(key),
        SubscriptionsEvent::NextPage => {
            let total = state.total_pages();
            state.query.next_page(total);
        }
        SubscriptionsEvent::PrevPage => {
            let total = state.total_pages();
            state.query.prev_page(total);
        }
        SubscriptionsEvent::GoToPage(page) => {
            let total = state.total_pages();
            state.query.go_to_page(page, total);
        }

        SubscriptionsEvent::OpenFilters => state.filter_draft.open(),
        SubscriptionsEvent::FilterDraftChanged(filter) => {
            state.filter_draft.edit(|draft| *draft = filter);
        }
        SubscriptionsEvent::ApplyFilters => {
            if state.filter_draft.commit() {
                state.query.set_filter(state.filter_draft.committed().clone());
            }
        }
        SubscriptionsEvent::CancelFilters => state.filter_draft.discard(),
        SubscriptionsEvent::ClearFilters => {
            state.filter_draft.reset(SubscriptionFilter::default());
            state.query.set_filter(SubscriptionFilter::default());
        }

        SubscriptionsEvent::Renew(id) => {
            if state.renewing.is_some() {
                return;
            }
            let Some(session) = ready_session(model, Screen::Subscriptions) else {
                return;
            };
            info!("renewing subscription");
            let callback_id = id.clone();
            let sent = Api::new(&caps.http, &model.config, &session).renew_subscription(
                &id,
                move |result| {
                    wrap(SubscriptionsEvent::Renewed {
                        id: callback_id,
                        result,
                    })
                },
            );
            match sent {
                Ok(()) => model.subscriptions.renewing = Some(id),
                Err(e) => mutation_not_sent(model, "renew_subscription", e),
            }
        }

        SubscriptionsEvent::Renewed { id, result } => {
            if state.renewing.as_ref() == Some(&id) {
                state.renewing = None;
            }
            if finish_mutation(model, "renew_subscription", result, "Subscription renewed") {
                refetch_if_active(Screen::Subscriptions, model, caps);
            }
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SubscriptionRow {
    pub subscription: Subscription,
    pub days_remaining: i64,
    pub period_elapsed_percent: f64,
    pub renewing: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SubscriptionsView {
    pub loading: BTreeMap<String, bool>,
    pub refreshing: bool,
    pub loaded: bool,
    pub rows: Vec<SubscriptionRow>,
    pub search: String,
    pub filter: SubscriptionFilter,
    pub filter_draft: Option<SubscriptionFilter>,
    pub sort: SortSpec<SubscriptionSort>,
    pub page_label: String,
    pub total_count: usize,
    pub has_prev: bool,
    pub has_next: bool,
}

pub fn view(model: &Model) -> SubscriptionsView {
    let state = &model.subscriptions;
    let today = model.today;
    let records = state.subscriptions.as_deref().unwrap_or_default();
    let paged = apply(records, &state.query).map(|s| SubscriptionRow {
        subscription: s.clone(),
        days_remaining: days_remaining(s.end_date, today),
        period_elapsed_percent: period_elapsed_percent(s.start_date, s.end_date, today),
        renewing: state.renewing.as_ref() == Some(&s.id),
    });

    SubscriptionsView {
        loading: state.scope.loading_flags(),
        refreshing: state.scope.is_refreshing(),
        loaded: state.subscriptions.is_some(),
        page_label: page_label(paged.page, paged.total_pages),
        total_count: paged.total_count,
        has_prev: paged.has_prev,
        has_next: paged.has_next,
        rows: paged.items,
        search: state.query.search().to_string(),
        filter: state.query.filter().clone(),
        filter_draft: state.filter_draft.draft().cloned(),
        sort: state.query.sort(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(id: &str, plan: &str, status: SubscriptionStatus, price: f64) -> Subscription {
        Subscription {
            id: SubscriptionId::new(id),
            plan_name: plan.into(),
            status,
            price,
            currency: None,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            auto_renew: false,
            trainer_name: None,
        }
    }

    fn loaded(count: usize) -> Model {
        let mut model = Model::default();
        model.today = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
        model.subscriptions.subscriptions = Some(
            (0..count)
                .map(|i| {
                    let status = if i % 2 == 0 {
                        SubscriptionStatus::Active
                    } else {
                        SubscriptionStatus::Expired
                    };
                    sub(&format!("s{i}"), &format!("Plan {i:02}"), status, 10.0 + i as f64)
                })
                .collect(),
        );
        model
    }

    #[test]
    fn applying_a_filter_resets_page() {
        let mut model = loaded(25);
        let state = &mut model.subscriptions;
        state.query.next_page(3);
        assert_eq!(state.query.page(), 2);

        state.filter_draft.open();
        state.filter_draft.edit(|f| f.status = Some(SubscriptionStatus::Active));
        assert!(state.filter_draft.commit());
        state
            .query
            .set_filter(state.filter_draft.committed().clone());
        assert_eq!(state.query.page(), 1);

        let view = view(&model);
        assert_eq!(view.total_count, 13);
        assert_eq!(view.page_label, "Page 1 of 2");
        assert!(view
            .rows
            .iter()
            .all(|r| r.subscription.status == SubscriptionStatus::Active));
    }

    #[test]
    fn rows_carry_billing_progress() {
        let model = loaded(1);
        let view = view(&model);
        assert_eq!(view.rows[0].days_remaining, 15);
        assert!((view.rows[0].period_elapsed_percent - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sort_by_price_descending_on_second_click() {
        let mut model = loaded(3);
        model.subscriptions.query.sort_by(SubscriptionSort::Price);
        model.subscriptions.query.sort_by(SubscriptionSort::Price);
        let view = view(&model);
        let prices: Vec<f64> = view.rows.iter().map(|r| r.subscription.price).collect();
        assert_eq!(prices, vec![12.0, 11.0, 10.0]);
    }

    #[test]
    fn search_matches_plan_name() {
        let mut model = loaded(12);
        model.subscriptions.query.set_search("plan 1");
        let view = view(&model);
        // "Plan 10" and "Plan 11"
        assert_eq!(view.total_count, 2);
    }
}
