//! # Ledger Tree Balancer
//!
//! Turns the flat list of ledger heads returned by an ERP's balance sheet
//! endpoint into two collapsible account trees (assets and liabilities) whose
//! displayed totals always agree.
//!
//! ## Pipeline
//!
//! 1. **Normalize** raw JSON records into [`LedgerRow`]s (camelCase or PascalCase
//!    keys, comma-formatted numbers).
//! 2. **Classify** each row as an asset or liability head, falling back to
//!    descriptive text when the side tag is missing.
//! 3. **Build** one forest per side, re-rooting self-referencing and dangling
//!    parents under a synthetic root.
//! 4. **Aggregate** subtree totals with a memoized, cycle-safe depth-first walk.
//! 5. **Materialize** the visible rows, hiding zero branches and rolling up
//!    collapsed heads.
//! 6. **Reconcile** the two totals with a synthetic balancing figure.
//!
//! The whole pipeline is a pure function of the rows and the expand state and
//! re-runs in full on every load and every toggle.
//!
//! ## Example
//!
//! ```rust
//! use ledger_tree_balancer::*;
//! use serde_json::json;
//!
//! let mut session = BalanceSheetSession::new(EngineOptions::default());
//! session.load_rows(&[
//!     json!({ "HeadId": 1, "HeadName": "Cash", "SideTag": "A", "Balance": "500" }),
//!     json!({ "HeadId": 2, "HeadName": "Capital", "SideTag": "L", "Balance": 300 }),
//! ]);
//!
//! let view = session.view();
//! assert_eq!(view.display_assets_total, 500.0);
//! assert_eq!(view.display_liabilities_total, 500.0);
//! assert!(view.liability_rows.last().unwrap().is_synthetic);
//! ```

pub mod aggregate;
pub mod balancer;
pub mod classifier;
pub mod error;
pub mod forest;
pub mod normalize;
pub mod schema;
pub mod session;
pub mod view;

#[cfg(feature = "http")]
pub mod source;

pub use aggregate::{aggregate, subtree_total, SubtreeTotals};
pub use balancer::{reconcile, verify_balanced, BalancingReconciler, Reconciliation};
pub use classifier::classify;
pub use error::{BalanceSheetError, Result};
pub use forest::{build_forests, ChildrenByParent, ForestIndex, Forests, ROOT_KEY};
pub use normalize::{normalize_row, normalize_rows, to_finite_number, to_head_id};
pub use schema::*;
pub use session::{BalanceSheetSession, ExpandState};
pub use view::{materialize, MaterializedView};

#[cfg(feature = "http")]
pub use source::HttpRowSource;

use log::debug;

/// Runs the full pipeline over already-normalized rows.
///
/// Never fails: malformed structure is re-rooted, cycles are broken and rows
/// without a side are dropped.
pub fn build_balance_sheet(
    rows: &[LedgerRow],
    asset_state: &ExpandState,
    liability_state: &ExpandState,
    options: &EngineOptions,
) -> BalanceSheetView {
    let forests = build_forests(rows, classify);

    let asset_totals = aggregate(&forests.assets.children_by_parent);
    let liability_totals = aggregate(&forests.liabilities.children_by_parent);

    let assets = materialize(
        &forests.assets.children_by_parent,
        &asset_totals,
        asset_state,
        options,
    );
    let liabilities = materialize(
        &forests.liabilities.children_by_parent,
        &liability_totals,
        liability_state,
        options,
    );

    debug!(
        "Materialized {} asset rows (total {:.2}) and {} liability rows (total {:.2})",
        assets.visible_rows.len(),
        assets.grand_total,
        liabilities.visible_rows.len(),
        liabilities.grand_total
    );

    let reconciled = BalancingReconciler::new(options).reconcile(
        assets.grand_total,
        liabilities.grand_total,
        assets.visible_rows,
        liabilities.visible_rows,
    );

    BalanceSheetView {
        as_of: None,
        asset_rows: reconciled.asset_rows,
        liability_rows: reconciled.liability_rows,
        assets_total: assets.grand_total,
        liabilities_total: liabilities.grand_total,
        display_assets_total: reconciled.display_asset_total,
        display_liabilities_total: reconciled.display_liability_total,
    }
}
