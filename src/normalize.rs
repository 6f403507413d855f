use crate::schema::LedgerRow;
use serde_json::{Map, Value};

/// Coerces a loosely typed JSON value into a finite `f64`.
///
/// - missing or `null` gives `default`
/// - numbers pass through when finite
/// - strings have thousands separators stripped, then the longest leading
///   number is read, so `"1,500.00 Dr"` gives 1500
/// - no leading number, non-finite, boolean, array or object gives `default`
pub fn to_finite_number(value: Option<&Value>, default: f64) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let cleaned: String = s.chars().filter(|c| *c != ',').collect();
            leading_number(cleaned.trim())
        }
        _ => None,
    };

    match parsed {
        Some(n) if n.is_finite() => n,
        _ => default,
    }
}

fn count_digits(bytes: &[u8], from: usize) -> usize {
    bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Parses the longest prefix of `text` shaped like `[+-]digits[.digits][e[+-]digits]`.
fn leading_number(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    let int_digits = count_digits(bytes, end);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(bytes, end + 1);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }

    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(bytes, exp_end);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    text[..end].parse::<f64>().ok()
}

/// Reads an integer head key. Accepts integral numbers and numeric strings.
pub fn to_head_id(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn to_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn pascal_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Looks a logical field up under its camelCase key, then its PascalCase key.
/// The first non-null value wins.
fn field<'a>(record: &'a Map<String, Value>, camel: &str) -> Option<&'a Value> {
    let pascal = pascal_case(camel);
    let found = [camel, pascal.as_str()]
        .into_iter()
        .filter_map(|key| record.get(key))
        .find(|value| !value.is_null());
    found
}

pub fn normalize_row(raw: &Value) -> LedgerRow {
    let empty = Map::new();
    let record = raw.as_object().unwrap_or(&empty);

    LedgerRow {
        head_id: to_head_id(field(record, "headId")),
        parent_head: to_head_id(field(record, "parentHead")),
        head_name: to_text(field(record, "headName")).unwrap_or_default(),
        side_tag: to_text(field(record, "sideTag")),
        side_label: to_text(field(record, "side")),
        group_head_name: to_text(field(record, "groupHeadName")),
        balance: to_finite_number(field(record, "balance"), 0.0),
    }
}

pub fn normalize_rows(raw: &[Value]) -> Vec<LedgerRow> {
    raw.iter().map(normalize_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_finite_number() {
        assert_eq!(to_finite_number(None, 0.0), 0.0);
        assert_eq!(to_finite_number(Some(&Value::Null), 0.0), 0.0);
        assert_eq!(to_finite_number(Some(&json!(12.5)), 0.0), 12.5);
        assert_eq!(to_finite_number(Some(&json!(-3)), 0.0), -3.0);
        assert_eq!(to_finite_number(Some(&json!("1,234,567.89")), 0.0), 1_234_567.89);
        assert_eq!(to_finite_number(Some(&json!(" -42 ")), 0.0), -42.0);
        assert_eq!(to_finite_number(Some(&json!("")), 0.0), 0.0);
        assert_eq!(to_finite_number(Some(&json!("abc")), 0.0), 0.0);
        assert_eq!(to_finite_number(Some(&json!("NaN")), 0.0), 0.0);
        assert_eq!(to_finite_number(Some(&json!("inf")), 7.0), 7.0);
        assert_eq!(to_finite_number(Some(&json!(true)), 0.0), 0.0);
        assert_eq!(to_finite_number(Some(&json!([1])), 0.0), 0.0);
    }

    #[test]
    fn test_to_finite_number_reads_leading_number() {
        assert_eq!(to_finite_number(Some(&json!("1,500.00 Dr")), 0.0), 1500.0);
        assert_eq!(to_finite_number(Some(&json!("250abc")), 0.0), 250.0);
        assert_eq!(to_finite_number(Some(&json!("-12.5 Cr")), 0.0), -12.5);
        assert_eq!(to_finite_number(Some(&json!(".75")), 0.0), 0.75);
        assert_eq!(to_finite_number(Some(&json!("3.")), 0.0), 3.0);
        assert_eq!(to_finite_number(Some(&json!("1.5e3 units")), 0.0), 1500.0);
        assert_eq!(to_finite_number(Some(&json!("2e")), 0.0), 2.0);
        assert_eq!(to_finite_number(Some(&json!("abc")), 0.0), 0.0);
        assert_eq!(to_finite_number(Some(&json!("-")), 0.0), 0.0);
        assert_eq!(to_finite_number(Some(&json!(".")), 0.0), 0.0);
        assert_eq!(to_finite_number(Some(&json!("Dr 100")), 0.0), 0.0);
        assert_eq!(to_finite_number(Some(&json!("1e999")), 4.0), 4.0);
    }

    #[test]
    fn test_balance_with_suffix_is_kept() {
        let row = normalize_row(&json!({ "HeadId": 3, "Balance": "1,500.00 Dr" }));
        assert_eq!(row.balance, 1500.0);
    }

    #[test]
    fn test_to_head_id() {
        assert_eq!(to_head_id(Some(&json!(12))), Some(12));
        assert_eq!(to_head_id(Some(&json!(12.0))), Some(12));
        assert_eq!(to_head_id(Some(&json!(12.5))), None);
        assert_eq!(to_head_id(Some(&json!(" 40 "))), Some(40));
        assert_eq!(to_head_id(Some(&json!("x"))), None);
        assert_eq!(to_head_id(Some(&Value::Null)), None);
        assert_eq!(to_head_id(None), None);
    }

    #[test]
    fn test_camel_and_pascal_keys() {
        let camel = normalize_row(&json!({
            "headId": 1,
            "parentHead": 0,
            "headName": "Current Assets",
            "sideTag": "A",
            "balance": "1,000"
        }));
        let pascal = normalize_row(&json!({
            "HeadId": 1,
            "ParentHead": 0,
            "HeadName": "Current Assets",
            "SideTag": "A",
            "Balance": "1,000"
        }));

        assert_eq!(camel, pascal);
        assert_eq!(camel.head_id, Some(1));
        assert_eq!(camel.parent_head, Some(0));
        assert_eq!(camel.balance, 1000.0);
        assert_eq!(camel.side_tag.as_deref(), Some("A"));
    }

    #[test]
    fn test_first_non_null_key_wins() {
        let row = normalize_row(&json!({
            "headId": null,
            "HeadId": "9",
            "balance": null,
            "Balance": 15
        }));
        assert_eq!(row.head_id, Some(9));
        assert_eq!(row.balance, 15.0);
    }

    #[test]
    fn test_malformed_records_degrade() {
        let rows = normalize_rows(&[json!("not an object"), json!({}), json!(null)]);
        assert_eq!(rows.len(), 3);
        for row in rows {
            assert_eq!(row.head_id, None);
            assert_eq!(row.balance, 0.0);
            assert!(row.head_name.is_empty());
        }
    }

    #[test]
    fn test_free_text_fields() {
        let row = normalize_row(&json!({
            "HeadId": 4,
            "Side": "Liabilities",
            "GroupHeadName": "Capital Account"
        }));
        assert_eq!(row.side_label.as_deref(), Some("Liabilities"));
        assert_eq!(row.group_head_name.as_deref(), Some("Capital Account"));
        assert_eq!(row.side_tag, None);
    }
}
