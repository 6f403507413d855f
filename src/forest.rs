use crate::schema::{LedgerRow, Side};
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Synthetic parent key every forest root hangs from.
pub const ROOT_KEY: i64 = 0;

/// Parent head id to its children, in input order.
pub type ChildrenByParent = BTreeMap<i64, Vec<LedgerRow>>;

pub fn children_of(children: &ChildrenByParent, parent: i64) -> &[LedgerRow] {
    children.get(&parent).map(Vec::as_slice).unwrap_or(&[])
}

#[derive(Debug, Clone, Default)]
pub struct ForestIndex {
    pub children_by_parent: ChildrenByParent,
    pub head_map: HashMap<i64, LedgerRow>,
}

impl ForestIndex {
    fn from_rows(rows: &[&LedgerRow]) -> Self {
        let mut head_map: HashMap<i64, LedgerRow> = HashMap::new();
        for row in rows {
            if let Some(head_id) = row.head_id {
                head_map.entry(head_id).or_insert_with(|| (*row).clone());
            }
        }

        let mut children_by_parent = ChildrenByParent::new();
        let mut placed: HashSet<i64> = HashSet::new();
        for row in rows {
            let Some(head_id) = row.head_id else {
                continue;
            };
            if !placed.insert(head_id) {
                warn!(
                    "Duplicate ledger head {} ({}); keeping the first occurrence",
                    head_id, row.head_name
                );
                continue;
            }
            let parent = effective_parent(head_id, row.parent_head, &head_map);
            children_by_parent
                .entry(parent)
                .or_default()
                .push((*row).clone());
        }

        Self {
            children_by_parent,
            head_map,
        }
    }

    pub fn roots(&self) -> &[LedgerRow] {
        children_of(&self.children_by_parent, ROOT_KEY)
    }

    pub fn children(&self, head_id: i64) -> &[LedgerRow] {
        children_of(&self.children_by_parent, head_id)
    }

    /// Number of rows placed in this forest.
    pub fn len(&self) -> usize {
        self.children_by_parent.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.children_by_parent.is_empty()
    }
}

/// A row hangs from the synthetic root when its parent is missing, zero,
/// itself, or not a head of the same forest.
fn effective_parent(head_id: i64, parent_head: Option<i64>, head_map: &HashMap<i64, LedgerRow>) -> i64 {
    match parent_head {
        Some(parent) if parent != ROOT_KEY && parent != head_id && head_map.contains_key(&parent) => {
            parent
        }
        _ => ROOT_KEY,
    }
}

#[derive(Debug, Clone, Default)]
pub struct Forests {
    pub assets: ForestIndex,
    pub liabilities: ForestIndex,
    /// Rows left out of both forests: no usable head id, or no side.
    pub dropped: usize,
}

impl Forests {
    pub fn side(&self, side: Side) -> &ForestIndex {
        match side {
            Side::Asset => &self.assets,
            Side::Liability => &self.liabilities,
        }
    }
}

/// Splits rows into the asset and liability forests. Input rows are not
/// modified. Head id 0 is reserved for the synthetic root, so rows carrying it
/// are dropped along with rows that have no head id.
pub fn build_forests<F>(rows: &[LedgerRow], classify: F) -> Forests
where
    F: Fn(&LedgerRow) -> Option<Side>,
{
    let mut asset_rows = Vec::new();
    let mut liability_rows = Vec::new();
    let mut dropped = 0;

    for row in rows {
        let keyed = matches!(row.head_id, Some(id) if id != ROOT_KEY);
        match (keyed, classify(row)) {
            (true, Some(Side::Asset)) => asset_rows.push(row),
            (true, Some(Side::Liability)) => liability_rows.push(row),
            _ => dropped += 1,
        }
    }

    debug!(
        "Classified {} asset heads and {} liability heads, dropped {}",
        asset_rows.len(),
        liability_rows.len(),
        dropped
    );

    Forests {
        assets: ForestIndex::from_rows(&asset_rows),
        liabilities: ForestIndex::from_rows(&liability_rows),
        dropped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;

    fn ids(rows: &[LedgerRow]) -> Vec<i64> {
        rows.iter().filter_map(|r| r.head_id).collect()
    }

    #[test]
    fn test_split_by_side() {
        let rows = vec![
            LedgerRow::new(1, "Fixed Assets", 0.0).with_side(Side::Asset),
            LedgerRow::new(2, "Capital", 0.0).with_side(Side::Liability),
            LedgerRow::new(3, "Sales", 0.0),
        ];

        let forests = build_forests(&rows, classify);
        assert_eq!(ids(forests.assets.roots()), vec![1]);
        assert_eq!(ids(forests.liabilities.roots()), vec![2]);
        assert_eq!(forests.dropped, 1);
    }

    #[test]
    fn test_rows_without_head_id_are_dropped() {
        let mut row = LedgerRow::new(1, "Cash", 10.0).with_side(Side::Asset);
        row.head_id = None;
        let zero_key = LedgerRow::new(0, "Bank", 10.0).with_side(Side::Asset);

        let forests = build_forests(&[row, zero_key], classify);
        assert!(forests.assets.is_empty());
        assert_eq!(forests.dropped, 2);
    }

    #[test]
    fn test_re_rooting() {
        let rows = vec![
            LedgerRow::new(1, "Current Assets", 0.0).with_side(Side::Asset),
            LedgerRow::new(2, "Cash", 5.0).with_side(Side::Asset).with_parent(1),
            LedgerRow::new(3, "Self Loop", 5.0).with_side(Side::Asset).with_parent(3),
            LedgerRow::new(4, "Dangling", 5.0).with_side(Side::Asset).with_parent(99),
            LedgerRow::new(5, "Zero Parent", 5.0).with_side(Side::Asset).with_parent(0),
        ];

        let forests = build_forests(&rows, classify);
        assert_eq!(ids(forests.assets.roots()), vec![1, 3, 4, 5]);
        assert_eq!(ids(forests.assets.children(1)), vec![2]);
        assert_eq!(forests.assets.len(), 5);
    }

    #[test]
    fn test_parent_on_other_side_is_dangling() {
        let rows = vec![
            LedgerRow::new(1, "Loans", 0.0).with_side(Side::Liability),
            LedgerRow::new(2, "Loan Advance", 5.0).with_side(Side::Asset).with_parent(1),
        ];

        let forests = build_forests(&rows, classify);
        assert_eq!(ids(forests.assets.roots()), vec![2]);
        assert_eq!(ids(forests.liabilities.roots()), vec![1]);
    }

    #[test]
    fn test_duplicate_head_ids_keep_first() {
        let rows = vec![
            LedgerRow::new(5, "Cash", 10.0).with_side(Side::Asset),
            LedgerRow::new(5, "Cash (copy)", 20.0).with_side(Side::Asset),
        ];

        let forests = build_forests(&rows, classify);
        assert_eq!(forests.assets.len(), 1);
        assert_eq!(forests.assets.roots()[0].balance, 10.0);
        assert_eq!(forests.assets.head_map[&5].balance, 10.0);
    }

    #[test]
    fn test_input_order_is_kept() {
        let rows = vec![
            LedgerRow::new(10, "Parent", 0.0).with_side(Side::Asset),
            LedgerRow::new(30, "B", 1.0).with_side(Side::Asset).with_parent(10),
            LedgerRow::new(20, "A", 1.0).with_side(Side::Asset).with_parent(10),
        ];

        let forests = build_forests(&rows, classify);
        assert_eq!(ids(forests.assets.children(10)), vec![30, 20]);
        assert_eq!(rows[1].parent_head, Some(10));
    }
}
