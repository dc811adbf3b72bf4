//! Stored estimate encoding and hour arithmetic.

use crate::error::{EstimatorError, Result};
use crate::host::{Host, SceneNode};
use crate::protocol::LineItem;

/// Plugin-data key every estimate is stored under.
pub const ESTIMATE_KEY: &str = "estimator";

/// Decodes stored text. Unset storage is an empty estimate; anything else must
/// be a valid item list.
pub fn decode(raw: &str) -> std::result::Result<Vec<LineItem>, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(vec![]);
    }
    serde_json::from_str(raw)
}

pub fn encode(items: &[LineItem]) -> Result<String> {
    Ok(serde_json::to_string(items)?)
}

/// Reads and decodes the estimate stored on `node`.
pub fn read<H: Host + ?Sized>(host: &H, node: &SceneNode) -> Result<Vec<LineItem>> {
    decode(&host.plugin_data(&node.id, ESTIMATE_KEY)).map_err(|source| {
        EstimatorError::CorruptEstimate {
            id: node.id.clone(),
            name: node.name.clone(),
            source,
        }
    })
}

/// Hours for one value. Blank, non-numeric and non-finite text counts as 0.
/// Only decimal notation is numeric; hex literals such as `0x10` are not.
pub fn hours(value: &str) -> f64 {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

pub fn total(items: &[LineItem]) -> f64 {
    items.iter().map(|item| hours(&item.value)).sum()
}

/// Renders an hour count without a trailing `.0` for whole numbers.
pub fn format_hours(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let text = format!("{value:.2}");
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("3", 3.0)]
    #[case(" 2.5 ", 2.5)]
    #[case("", 0.0)]
    #[case("abc", 0.0)]
    #[case("1e2", 100.0)]
    #[case("-4", -4.0)]
    #[case("inf", 0.0)]
    #[case("NaN", 0.0)]
    #[case("Infinity", 0.0)]
    #[case("0x10", 0.0)]
    fn value_coercion(#[case] raw: &str, #[case] expected: f64) {
        assert_eq!(hours(raw), expected);
    }

    #[test]
    fn non_numeric_items_stay_in_the_list_but_add_nothing() {
        let items = vec![
            LineItem::new("Design", "3"),
            LineItem::new("Review", "soon"),
            LineItem::new("Build", "5"),
        ];
        assert_eq!(total(&items), 8.0);
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn unset_storage_is_empty_but_garbage_is_an_error() {
        assert_eq!(decode("").unwrap(), vec![]);
        assert_eq!(decode("[]").unwrap(), vec![]);
        assert!(decode("{not json").is_err());
        assert!(decode("{\"label\":\"x\"}").is_err());
    }

    #[test]
    fn encoding_is_stable_across_saves() {
        let items = vec![LineItem::new("Design", "3"), LineItem::new("Build", "5")];
        let first = encode(&items).unwrap();
        let second = encode(&decode(&first).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[rstest]
    #[case(8.0, "8")]
    #[case(2.5, "2.5")]
    #[case(1.0 / 3.0, "0.33")]
    #[case(-1.0, "-1")]
    fn hour_formatting(#[case] value: f64, #[case] expected: &str) {
        assert_eq!(format_hours(value), expected);
    }
}
