use crate::aggregate::{subtree_total, SubtreeTotals};
use crate::forest::{children_of, ChildrenByParent, ROOT_KEY};
use crate::schema::{EngineOptions, LedgerRow, ViewRow};
use crate::session::ExpandState;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterializedView {
    pub visible_rows: Vec<ViewRow>,
    /// Sum of the subtree totals of every displayed root.
    pub grand_total: f64,
}

struct Materializer<'a> {
    children: &'a ChildrenByParent,
    totals: &'a SubtreeTotals,
    expand_state: &'a ExpandState,
    prune_zero_branches: bool,
    rows: Vec<ViewRow>,
}

impl<'a> Materializer<'a> {
    fn is_pruned(&self, total: f64) -> bool {
        self.prune_zero_branches && total == 0.0
    }

    fn visit(&mut self, node: &LedgerRow, level: usize) {
        let total = subtree_total(self.totals, node);
        if self.is_pruned(total) {
            return;
        }

        let children: &[LedgerRow] = match node.head_id {
            Some(head_id) => children_of(self.children, head_id),
            None => &[],
        };
        let has_children = !children.is_empty();
        let expanded = node
            .head_id
            .is_some_and(|head_id| self.expand_state.is_expanded(head_id));

        let amount = match (has_children, expanded) {
            (false, _) => node.balance,
            (true, true) => 0.0,
            (true, false) => total,
        };

        self.rows.push(ViewRow {
            row: node.clone(),
            level,
            has_children,
            expanded,
            amount,
            is_synthetic: false,
        });

        if has_children && expanded {
            for child in children {
                self.visit(child, level + 1);
            }
        }
    }
}

/// Walks a forest top-down and produces its visible rows.
///
/// Collapsed parents show their rolled-up total; expanded parents show 0 and
/// let their children carry the amounts. With pruning on, any head whose
/// subtree total is exactly zero is hidden together with its descendants.
/// Totals themselves are never changed here.
pub fn materialize(
    children: &ChildrenByParent,
    totals: &SubtreeTotals,
    expand_state: &ExpandState,
    options: &EngineOptions,
) -> MaterializedView {
    let mut materializer = Materializer {
        children,
        totals,
        expand_state,
        prune_zero_branches: options.prune_zero_branches,
        rows: Vec::new(),
    };

    let mut grand_total = 0.0;
    for root in children_of(children, ROOT_KEY) {
        let total = subtree_total(totals, root);
        if materializer.is_pruned(total) {
            continue;
        }
        grand_total += total;
        materializer.visit(root, 0);
    }

    MaterializedView {
        visible_rows: materializer.rows,
        grand_total,
    }
}
