use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::{issued, land, ready_session, report};
use crate::capabilities::{ApiResult, Capabilities};
use crate::draft::Draft;
use crate::event::{Event, Screen};
use crate::fetch::{CycleId, FetchScope, SliceKey};
use crate::listing::page_label;
use crate::model::{LeaderboardPage, LeaderboardPeriod, Model, UserId};
use crate::services::Api;
use crate::LEADERBOARD_PAGE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LeaderboardSlice {
    Board,
}

impl SliceKey for LeaderboardSlice {
    fn name(self) -> &'static str {
        "board"
    }
}

/// Pages are server-side here; only the name search runs over the rows
/// already fetched.
#[derive(Debug)]
pub struct LeaderboardState {
    pub scope: FetchScope<LeaderboardSlice>,
    pub page: u32,
    pub board: Option<LeaderboardPage>,
    pub period: Draft<LeaderboardPeriod>,
    pub search: String,
}

impl Default for LeaderboardState {
    fn default() -> Self {
        Self {
            scope: FetchScope::default(),
            page: 1,
            board: None,
            period: Draft::default(),
            search: String::new(),
        }
    }
}

impl LeaderboardState {
    fn total_pages(&self) -> u32 {
        self.board.as_ref().map_or(0, |b| b.total_pages)
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub enum LeaderboardEvent {
    NextPage,
    PrevPage,
    GoToPage(u32),
    SearchChanged(String),
    OpenPeriodPicker,
    PeriodDraftChanged(LeaderboardPeriod),
    ApplyPeriod,
    CancelPeriod,

    #[serde(skip)]
    Loaded {
        cycle: CycleId,
        result: ApiResult<LeaderboardPage>,
    },
}

impl LeaderboardEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NextPage => "leaderboard.next_page",
            Self::PrevPage => "leaderboard.prev_page",
            Self::GoToPage(_) => "leaderboard.go_to_page",
            Self::SearchChanged(_) => "leaderboard.search_changed",
            Self::OpenPeriodPicker => "leaderboard.open_period_picker",
            Self::PeriodDraftChanged(_) => "leaderboard.period_draft_changed",
            Self::ApplyPeriod => "leaderboard.apply_period",
            Self::CancelPeriod => "leaderboard.cancel_period",
            Self::Loaded { .. } => "leaderboard.loaded",
        }
    }

    pub const fn is_user_initiated(&self) -> bool {
        !matches!(self, Self::Loaded { .. })
    }
}

pub fn fetch(model: &mut Model, caps: &Capabilities, refreshing: bool) {
    let Some(session) = ready_session(model, Screen::Leaderboard) else {
        return;
    };
    let state = &mut model.leaderboard;
    let cycle = state.scope.begin(&[LeaderboardSlice::Board], refreshing);
    let sent = Api::new(&caps.http, &model.config, &session).leaderboard(
        state.page,
        LEADERBOARD_PAGE_SIZE,
        *state.period.committed(),
        move |result| Event::Leaderboard(LeaderboardEvent::Loaded { cycle, result }),
    );
    issued(&mut state.scope, cycle, LeaderboardSlice::Board, sent);
}

/// Moves to `page` and fetches it, provided it lies within the known range.
fn go_to_page(model: &mut Model, caps: &Capabilities, page: u32) {
    let state = &mut model.leaderboard;
    let total = state.total_pages();
    if page < 1 || page > total || page == state.page {
        debug!(page, total, "page out of range");
        return;
    }
    state.page = page;
    fetch(model, caps, false);
}

pub fn update(event: LeaderboardEvent, model: &mut Model, caps: &Capabilities) {
    let state = &mut model.leaderboard;
    match event {
        LeaderboardEvent::Loaded { cycle, result } => {
            let landing = land(
                &mut state.scope,
                cycle,
                LeaderboardSlice::Board,
                &mut state.board,
                result,
            );
            report(model, landing);
        }

        LeaderboardEvent::NextPage => {
            let page = state.page.saturating_add(1);
            go_to_page(model, caps, page);
        }
        LeaderboardEvent::PrevPage => {
            let page = state.page.saturating_sub(1);
            go_to_page(model, caps, page);
        }
        LeaderboardEvent::GoToPage(page) => go_to_page(model, caps, page),

        LeaderboardEvent::SearchChanged(search) => state.search = search,

        LeaderboardEvent::OpenPeriodPicker => state.period.open(),
        LeaderboardEvent::PeriodDraftChanged(period) => state.period.edit(|p| *p = period),
        LeaderboardEvent::ApplyPeriod => {
            if state.period.commit() {
                state.page = 1;
                fetch(model, caps, false);
            }
        }
        LeaderboardEvent::CancelPeriod => state.period.discard(),
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LeaderboardRowView {
    pub rank: u32,
    pub user_id: UserId,
    pub name: String,
    pub avatar_url: Option<String>,
    pub level: u32,
    pub xp: u64,
    pub is_current_user: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LeaderboardView {
    pub loading: BTreeMap<String, bool>,
    pub refreshing: bool,
    pub rows: Vec<LeaderboardRowView>,
    pub period: LeaderboardPeriod,
    pub period_draft: Option<LeaderboardPeriod>,
    pub search: String,
    pub page: u32,
    pub total_pages: u32,
    pub page_label: String,
    pub total_count: u32,
    pub has_prev: bool,
    pub has_next: bool,
}

pub fn view(model: &Model) -> LeaderboardView {
    let state = &model.leaderboard;
    let current_user = model.session.ready().map(|s| &s.user_id);
    let needle = state.search.trim().to_lowercase();
    let offset = state.page.saturating_sub(1).saturating_mul(LEADERBOARD_PAGE_SIZE);

    let rows = state
        .board
        .iter()
        .flat_map(|b| b.users.iter())
        .enumerate()
        .map(|(i, row)| LeaderboardRowView {
            rank: row.rank.unwrap_or_else(|| {
                offset.saturating_add(u32::try_from(i).unwrap_or(u32::MAX)).saturating_add(1)
            }),
            user_id: row.user_id.clone(),
            name: row.name.clone(),
            avatar_url: row.avatar_url.clone(),
            level: row.level,
            xp: row.xp,
            is_current_user: current_user == Some(&row.user_id),
        })
        .filter(|row| needle.is_empty() || row.name.to_lowercase().contains(&needle))
        .collect();

    let total_pages = state.total_pages();
    LeaderboardView {
        loading: state.scope.loading_flags(),
        refreshing: state.scope.is_refreshing(),
        rows,
        period: *state.period.committed(),
        period_draft: state.period.draft().copied(),
        search: state.search.clone(),
        page: state.page,
        total_pages,
        page_label: page_label(state.page as usize, total_pages as usize),
        total_count: state.board.as_ref().map_or(0, |b| b.total_count),
        has_prev: state.page > 1,
        has_next: state.page < total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LeaderboardRow;

    fn board(count: u32, total_pages: u32, total_count: u32) -> LeaderboardPage {
        LeaderboardPage {
            users: (0..count)
                .map(|i| LeaderboardRow {
                    user_id: UserId::new(format!("u{i}")),
                    name: format!("Runner {i}"),
                    avatar_url: None,
                    level: 3,
                    xp: 100 - u64::from(i),
                    rank: None,
                })
                .collect(),
            total_pages,
            total_count,
        }
    }

    #[test]
    fn ranks_continue_across_pages() {
        let mut model = Model::default();
        model.leaderboard.page = 2;
        model.leaderboard.board = Some(board(10, 3, 25));
        let view = view(&model);
        assert_eq!(view.rows.first().map(|r| r.rank), Some(11));
        assert_eq!(view.rows.last().map(|r| r.rank), Some(20));
        assert_eq!(view.page_label, "Page 2 of 3");
        assert!(view.has_prev && view.has_next);
    }

    #[test]
    fn search_filters_fetched_rows_only() {
        let mut model = Model::default();
        model.leaderboard.board = Some(board(10, 3, 25));
        model.leaderboard.search = "runner 7".into();
        let view = view(&model);
        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.rows[0].rank, 8);
        assert_eq!(view.total_count, 25);
    }

    #[test]
    fn empty_board_reads_as_one_page() {
        let view = view(&Model::default());
        assert_eq!(view.page_label, "Page 1 of 1");
        assert!(!view.has_prev && !view.has_next);
    }
}
