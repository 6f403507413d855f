use crate::error::{BalanceSheetError, Result};
use crate::schema::{BalanceSheetView, EngineOptions, Side, ViewRow};
use log::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub display_asset_total: f64,
    pub display_liability_total: f64,
    pub asset_rows: Vec<ViewRow>,
    pub liability_rows: Vec<ViewRow>,
    /// Side that received the balancing figure, if one was needed.
    pub balanced_on: Option<Side>,
}

pub struct BalancingReconciler<'a> {
    options: &'a EngineOptions,
}

impl<'a> BalancingReconciler<'a> {
    pub fn new(options: &'a EngineOptions) -> Self {
        Self { options }
    }

    /// Makes both displayed totals agree by appending a balancing figure to
    /// the smaller side. Totals are compared by absolute value. Balancing rows
    /// from an earlier pass are stripped first, so calling this again on its
    /// own output never stacks figures.
    pub fn reconcile(
        &self,
        asset_total: f64,
        liability_total: f64,
        mut asset_rows: Vec<ViewRow>,
        mut liability_rows: Vec<ViewRow>,
    ) -> Reconciliation {
        asset_rows.retain(|row| !row.is_synthetic);
        liability_rows.retain(|row| !row.is_synthetic);

        let asset_abs = display_magnitude(asset_total);
        let liability_abs = display_magnitude(liability_total);
        let diff = asset_abs - liability_abs;

        let mut display_asset_total = asset_abs;
        let mut display_liability_total = liability_abs;
        let balanced_on = if diff.abs() < self.options.balance_epsilon {
            None
        } else if diff > 0.0 {
            liability_rows.push(ViewRow::balancing_figure(&self.options.balancing_label, diff));
            display_liability_total = liability_abs + diff;
            Some(Side::Liability)
        } else {
            asset_rows.push(ViewRow::balancing_figure(&self.options.balancing_label, -diff));
            display_asset_total = asset_abs - diff;
            Some(Side::Asset)
        };

        if let Some(side) = balanced_on {
            debug!("Added balancing figure of {:.2} on the {:?} side", diff.abs(), side);
        }

        Reconciliation {
            display_asset_total,
            display_liability_total,
            asset_rows,
            liability_rows,
            balanced_on,
        }
    }

    pub fn verify(&self, view: &BalanceSheetView) -> Result<()> {
        verify_balanced(view, self.options.balance_epsilon)
    }
}

/// Absolute value of a forest total, kept finite so the two sides can always
/// be compared. Overflowed totals clamp to `f64::MAX`; NaN reads as 0.
fn display_magnitude(total: f64) -> f64 {
    if total.is_nan() {
        warn!("Forest total is NaN; treating it as 0 for balancing");
        0.0
    } else if total.is_infinite() {
        warn!("Forest total overflowed; clamping to the largest finite amount");
        f64::MAX
    } else {
        total.abs()
    }
}

pub fn reconcile(
    asset_total: f64,
    liability_total: f64,
    asset_rows: Vec<ViewRow>,
    liability_rows: Vec<ViewRow>,
    options: &EngineOptions,
) -> Reconciliation {
    BalancingReconciler::new(options).reconcile(asset_total, liability_total, asset_rows, liability_rows)
}

/// Checks that the displayed totals of `view` agree within `tolerance`.
pub fn verify_balanced(view: &BalanceSheetView, tolerance: f64) -> Result<()> {
    let difference = (view.display_assets_total - view.display_liabilities_total).abs();

    if difference > tolerance {
        return Err(BalanceSheetError::BalanceMismatch {
            assets: view.display_assets_total,
            liabilities: view.display_liabilities_total,
            difference,
        });
    }

    Ok(())
}
