use crate::forest::{children_of, ChildrenByParent, ROOT_KEY};
use crate::schema::LedgerRow;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};

/// Head id to the total of its subtree.
pub type SubtreeTotals = HashMap<i64, f64>;

/// Total for `row`, falling back to its own balance when it was never
/// aggregated.
pub fn subtree_total(totals: &SubtreeTotals, row: &LedgerRow) -> f64 {
    row.head_id
        .and_then(|id| totals.get(&id).copied())
        .unwrap_or(row.balance)
}

struct Aggregator<'a> {
    children: &'a ChildrenByParent,
    memo: SubtreeTotals,
    visiting: HashSet<i64>,
}

impl<'a> Aggregator<'a> {
    fn new(children: &'a ChildrenByParent) -> Self {
        Self {
            children,
            memo: SubtreeTotals::new(),
            visiting: HashSet::new(),
        }
    }

    fn dfs(&mut self, node: &LedgerRow) -> f64 {
        let Some(head_id) = node.head_id else {
            return node.balance;
        };

        if let Some(&total) = self.memo.get(&head_id) {
            return total;
        }

        if self.visiting.contains(&head_id) {
            warn!(
                "Cycle detected at ledger head {} ({}); using its own balance {}",
                head_id, node.head_name, node.balance
            );
            self.memo.insert(head_id, node.balance);
            return node.balance;
        }

        self.visiting.insert(head_id);

        let children = children_of(self.children, head_id);
        let total = if children.is_empty() {
            node.balance
        } else {
            let mut sum = 0.0;
            for child in children {
                sum += self.dfs(child);
            }
            sum
        };

        self.visiting.remove(&head_id);
        self.memo.insert(head_id, total);
        total
    }
}

/// Computes subtree totals for one forest.
///
/// A leaf's total is its own balance; a parent's total is the sum of its
/// children's totals. Roots are aggregated first, in forest order. Heads that
/// only form a closed loop among themselves (A -> B -> A) cannot be reached
/// from the root, so they are swept afterwards. Any cycle is broken at the head
/// that closes it, which contributes its own balance instead.
pub fn aggregate(children: &ChildrenByParent) -> SubtreeTotals {
    let mut aggregator = Aggregator::new(children);

    for root in children_of(children, ROOT_KEY) {
        aggregator.dfs(root);
    }
    let reached = aggregator.memo.len();

    for (_, rows) in children.iter().filter(|(parent, _)| **parent != ROOT_KEY) {
        for row in rows {
            aggregator.dfs(row);
        }
    }

    let unreachable = aggregator.memo.len() - reached;
    if unreachable > 0 {
        debug!(
            "{} ledger heads are not reachable from any root and will not be displayed",
            unreachable
        );
    }

    aggregator.memo
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;
    use crate::forest::build_forests;
    use crate::schema::Side;

    fn asset(id: i64, balance: f64) -> LedgerRow {
        LedgerRow::new(id, format!("Head {}", id), balance).with_side(Side::Asset)
    }

    #[test]
    fn test_leaf_and_parent_totals() {
        let rows = vec![
            asset(1, 0.0),
            asset(2, 0.0).with_parent(1),
            asset(3, 30.0).with_parent(2),
            asset(4, 12.5).with_parent(2),
            asset(5, 7.5).with_parent(1),
        ];
        let forests = build_forests(&rows, classify);
        let totals = aggregate(&forests.assets.children_by_parent);

        assert_eq!(totals[&3], 30.0);
        assert_eq!(totals[&2], 42.5);
        assert_eq!(totals[&1], 50.0);
    }

    #[test]
    fn test_parent_balance_is_replaced_by_children() {
        let rows = vec![asset(1, 100.0), asset(2, 40.0).with_parent(1)];
        let forests = build_forests(&rows, classify);
        let totals = aggregate(&forests.assets.children_by_parent);

        assert_eq!(totals[&1], 40.0);
        assert_eq!(totals[&2], 40.0);
    }

    #[test]
    fn test_two_node_cycle_terminates() {
        let rows = vec![asset(1, 10.0).with_parent(2), asset(2, 10.0).with_parent(1)];
        let forests = build_forests(&rows, classify);
        assert!(forests.assets.roots().is_empty());

        let totals = aggregate(&forests.assets.children_by_parent);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[&1], 10.0);
        assert_eq!(totals[&2], 10.0);
    }

    #[test]
    fn test_cycle_below_a_root() {
        // 1 is a root; 2 and 3 point at each other, and 4 hangs off 3.
        let rows = vec![
            asset(1, 5.0),
            asset(2, 20.0).with_parent(3),
            asset(3, 30.0).with_parent(2),
            asset(4, 4.0).with_parent(3),
        ];
        let forests = build_forests(&rows, classify);
        let totals = aggregate(&forests.assets.children_by_parent);

        assert_eq!(totals[&1], 5.0);
        assert!(totals.values().all(|t| t.is_finite()));
        assert_eq!(totals.len(), 4);
    }

    #[test]
    fn test_subtree_total_fallback() {
        let totals = SubtreeTotals::new();
        assert_eq!(subtree_total(&totals, &asset(9, 3.0)), 3.0);
    }

    #[test]
    fn test_empty_forest() {
        assert!(aggregate(&ChildrenByParent::new()).is_empty());
    }
}
