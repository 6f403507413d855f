use crate::schema::{LedgerRow, Side};

fn side_from_text(text: &str) -> Option<Side> {
    let lower = text.trim().to_lowercase();

    if lower.starts_with("asset") {
        Some(Side::Asset)
    } else if lower.starts_with("liabilit") {
        Some(Side::Liability)
    } else {
        None
    }
}

/// Decides which forest a row belongs to.
///
/// The structured tag wins when it reads "A" or "L". Otherwise the tag text
/// itself (which some payloads spell out as "Assets"), the side label, the
/// group head name and finally the head's own name are checked for an
/// "asset"/"liabilit" prefix. Rows matching nothing (P&L-only heads, for
/// instance) return `None` and are left out of both forests.
pub fn classify(row: &LedgerRow) -> Option<Side> {
    if let Some(side) = row.side_tag.as_deref().and_then(Side::from_tag) {
        return Some(side);
    }

    [
        row.side_tag.as_deref(),
        row.side_label.as_deref(),
        row.group_head_name.as_deref(),
        Some(row.head_name.as_str()),
    ]
    .into_iter()
    .flatten()
    .find_map(side_from_text)
}
