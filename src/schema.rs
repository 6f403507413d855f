use crate::error::{BalanceSheetError, Result};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BALANCING_LABEL: &str = "Balancing Figure";
pub const DEFAULT_BALANCE_EPSILON: f64 = 0.005;

/// Which of the two balance sheet forests a ledger head belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum Side {
    #[schemars(description = "Resources owned: cash, receivables, inventory, fixed assets")]
    Asset,

    #[schemars(description = "Obligations and owner's funds: payables, loans, capital, reserves")]
    Liability,
}

impl Side {
    /// Single-letter tag used by the ledger API ("A" / "L").
    pub fn tag(self) -> &'static str {
        match self {
            Side::Asset => "A",
            Side::Liability => "L",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "A" => Some(Side::Asset),
            "L" => Some(Side::Liability),
            _ => None,
        }
    }
}

/// A ledger head after normalization. Immutable for the rest of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRow {
    #[schemars(description = "Unique key of the head within its forest. Rows without one are never placed in a forest.")]
    pub head_id: Option<i64>,

    #[schemars(description = "Declared parent head. Null, 0, self or a missing head means the row is a root.")]
    pub parent_head: Option<i64>,

    pub head_name: String,

    #[schemars(description = "Structured side tag, normally \"A\" or \"L\"")]
    pub side_tag: Option<String>,

    #[serde(rename = "side")]
    #[schemars(description = "Free-text side label used when the tag is missing")]
    pub side_label: Option<String>,

    #[schemars(description = "Name of the group head this head is filed under")]
    pub group_head_name: Option<String>,

    pub balance: f64,
}

impl LedgerRow {
    #[must_use]
    pub fn new(head_id: i64, head_name: impl Into<String>, balance: f64) -> Self {
        Self {
            head_id: Some(head_id),
            parent_head: None,
            head_name: head_name.into(),
            side_tag: None,
            side_label: None,
            group_head_name: None,
            balance,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent_head: i64) -> Self {
        self.parent_head = Some(parent_head);
        self
    }

    #[must_use]
    pub fn with_side(mut self, side: Side) -> Self {
        self.side_tag = Some(side.tag().to_string());
        self
    }

    #[must_use]
    pub fn with_side_label(mut self, label: impl Into<String>) -> Self {
        self.side_label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_group_head_name(mut self, name: impl Into<String>) -> Self {
        self.group_head_name = Some(name.into());
        self
    }
}

/// One visible line of a materialized forest. Rebuilt on every pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewRow {
    #[serde(flatten)]
    pub row: LedgerRow,

    #[schemars(description = "Indentation depth, 0 for forest roots")]
    pub level: usize,

    pub has_children: bool,

    pub expanded: bool,

    #[schemars(
        description = "Amount to display: own balance for leaves, rolled-up total for collapsed parents, 0 for expanded parents"
    )]
    pub amount: f64,

    #[schemars(description = "True only for the injected balancing figure")]
    pub is_synthetic: bool,
}

impl ViewRow {
    pub fn head_id(&self) -> Option<i64> {
        self.row.head_id
    }

    pub fn balancing_figure(label: &str, amount: f64) -> Self {
        Self {
            row: LedgerRow {
                head_id: None,
                parent_head: None,
                head_name: label.to_string(),
                side_tag: None,
                side_label: None,
                group_head_name: None,
                balance: amount,
            },
            level: 0,
            has_children: false,
            expanded: false,
            amount,
            is_synthetic: true,
        }
    }
}

/// Everything the presentation layer needs to draw the balance sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSheetView {
    #[schemars(description = "Date the balances were reported as on, when the source supplied one")]
    pub as_of: Option<NaiveDate>,

    pub asset_rows: Vec<ViewRow>,

    pub liability_rows: Vec<ViewRow>,

    #[schemars(description = "Raw sum of non-zero asset root totals")]
    pub assets_total: f64,

    #[schemars(description = "Raw sum of non-zero liability root totals")]
    pub liabilities_total: f64,

    #[schemars(description = "Asset total after the balancing figure is applied")]
    pub display_assets_total: f64,

    #[schemars(description = "Liability total after the balancing figure is applied")]
    pub display_liabilities_total: f64,
}

impl BalanceSheetView {
    pub fn rows(&self, side: Side) -> &[ViewRow] {
        match side {
            Side::Asset => &self.asset_rows,
            Side::Liability => &self.liability_rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.asset_rows.is_empty() && self.liability_rows.is_empty()
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(BalanceSheetView)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

/// Payload returned by the ledger-head endpoint. A missing `data` array means
/// "nothing to show", not an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResponse {
    #[serde(default)]
    pub data: Option<Vec<serde_json::Value>>,

    #[serde(default, alias = "asOnDate")]
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineOptions {
    #[schemars(description = "Head name given to the synthetic balancing row")]
    pub balancing_label: String,

    #[schemars(description = "Differences smaller than this are treated as balanced")]
    pub balance_epsilon: f64,

    #[schemars(description = "Hide heads whose subtree total is exactly zero")]
    pub prune_zero_branches: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            balancing_label: DEFAULT_BALANCING_LABEL.to_string(),
            balance_epsilon: DEFAULT_BALANCE_EPSILON,
            prune_zero_branches: true,
        }
    }
}

impl EngineOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        let options: EngineOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.balance_epsilon.is_finite() || self.balance_epsilon < 0.0 {
            return Err(BalanceSheetError::InvalidOptions(format!(
                "balance_epsilon must be a non-negative finite number, got {}",
                self.balance_epsilon
            )));
        }
        if self.balancing_label.trim().is_empty() {
            return Err(BalanceSheetError::InvalidOptions(
                "balancing_label must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
