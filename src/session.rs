use crate::classifier::classify;
use crate::error::Result;
use crate::forest::{build_forests, ROOT_KEY};
use crate::normalize::normalize_rows;
use crate::schema::{BalanceSheetView, EngineOptions, FetchResponse, LedgerRow, Side};
use crate::build_balance_sheet;
use chrono::NaiveDate;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Heads the user has expanded on one side of the balance sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpandState {
    expanded: BTreeSet<i64>,
}

impl ExpandState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, head_id: i64) -> bool {
        self.expanded.contains(&head_id)
    }

    /// Flips `head_id` and returns whether it is now expanded.
    pub fn toggle(&mut self, head_id: i64) -> bool {
        if self.expanded.remove(&head_id) {
            false
        } else {
            self.expanded.insert(head_id);
            true
        }
    }

    pub fn expand(&mut self, head_id: i64) {
        self.expanded.insert(head_id);
    }

    pub fn collapse(&mut self, head_id: i64) {
        self.expanded.remove(&head_id);
    }

    pub fn clear(&mut self) {
        self.expanded.clear();
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.expanded.iter().copied()
    }
}

impl FromIterator<i64> for ExpandState {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self {
            expanded: iter.into_iter().collect(),
        }
    }
}

/// Holds the loaded rows and per-side expand state, and rebuilds the whole
/// view from scratch whenever either changes. Expand state survives reloads
/// and resets; everything derived does not.
#[derive(Debug, Clone, Default)]
pub struct BalanceSheetSession {
    options: EngineOptions,
    rows: Vec<LedgerRow>,
    as_of: Option<NaiveDate>,
    asset_state: ExpandState,
    liability_state: ExpandState,
    view: BalanceSheetView,
}

impl BalanceSheetSession {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn with_expand_state(mut self, asset_state: ExpandState, liability_state: ExpandState) -> Self {
        self.asset_state = asset_state;
        self.liability_state = liability_state;
        self.rebuild();
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn view(&self) -> &BalanceSheetView {
        &self.view
    }

    pub fn rows(&self) -> &[LedgerRow] {
        &self.rows
    }

    pub fn expand_state(&self, side: Side) -> &ExpandState {
        match side {
            Side::Asset => &self.asset_state,
            Side::Liability => &self.liability_state,
        }
    }

    fn expand_state_mut(&mut self, side: Side) -> &mut ExpandState {
        match side {
            Side::Asset => &mut self.asset_state,
            Side::Liability => &mut self.liability_state,
        }
    }

    /// Replaces the loaded rows with the payload's. A payload without `data`
    /// clears the sheet.
    pub fn load(&mut self, response: FetchResponse) -> &BalanceSheetView {
        match response.data {
            Some(data) => {
                self.as_of = response.as_of;
                self.load_rows(&data)
            }
            None => {
                info!("Ledger payload carried no data; clearing balance sheet");
                self.reset();
                &self.view
            }
        }
    }

    pub fn load_rows(&mut self, raw: &[serde_json::Value]) -> &BalanceSheetView {
        self.rows = normalize_rows(raw);
        info!("Loaded {} ledger rows", self.rows.len());
        self.rebuild();
        &self.view
    }

    /// Applies the outcome of a fetch. A failed fetch leaves the session
    /// empty and hands the error back for the caller to surface.
    pub fn apply_fetch(&mut self, outcome: Result<FetchResponse>) -> Result<&BalanceSheetView> {
        match outcome {
            Ok(response) => Ok(self.load(response)),
            Err(err) => {
                warn!("Ledger fetch failed, clearing balance sheet: {}", err);
                self.reset();
                Err(err)
            }
        }
    }

    pub fn reset(&mut self) {
        self.rows.clear();
        self.as_of = None;
        self.view = BalanceSheetView::default();
    }

    pub fn toggle(&mut self, head_id: i64, side: Side) -> &BalanceSheetView {
        self.expand_state_mut(side).toggle(head_id);
        self.rebuild();
        &self.view
    }

    /// Expands every head on `side` that has children.
    pub fn expand_all(&mut self, side: Side) -> &BalanceSheetView {
        let forests = build_forests(&self.rows, classify);
        let parents: ExpandState = forests
            .side(side)
            .children_by_parent
            .keys()
            .copied()
            .filter(|parent| *parent != ROOT_KEY)
            .collect();
        *self.expand_state_mut(side) = parents;
        self.rebuild();
        &self.view
    }

    pub fn collapse_all(&mut self, side: Side) -> &BalanceSheetView {
        self.expand_state_mut(side).clear();
        self.rebuild();
        &self.view
    }

    fn rebuild(&mut self) {
        let mut view = build_balance_sheet(
            &self.rows,
            &self.asset_state,
            &self.liability_state,
            &self.options,
        );
        view.as_of = self.as_of;
        self.view = view;
    }
}
