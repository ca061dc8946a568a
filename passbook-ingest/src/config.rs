//! Parser tuning knobs. Every field has a default so a partial TOML table works.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::DateOrder;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Lines without date or amount that may extend the previous description.
    pub continuation_limit: usize,
    /// Maximum number of unparsed samples kept in a result.
    pub unparsed_cap: usize,
    /// Used when no date in the document settles the day/month order.
    pub default_date_order: DateOrder,
    /// Year for `MM/DD` rows when the document itself has no year.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_year: Option<i32>,
    /// Strip page numbers, repeated letterhead and similar boilerplate.
    pub drop_boilerplate: bool,
    /// Numbers above this are treated as identifiers rather than money.
    pub max_amount: Decimal,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            continuation_limit: 3,
            unparsed_cap: 50,
            default_date_order: DateOrder::DayFirst,
            fallback_year: None,
            drop_boilerplate: true,
            max_amount: Decimal::from(1_000_000_000u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ParserConfig::default();
        assert_eq!(cfg.continuation_limit, 3);
        assert_eq!(cfg.unparsed_cap, 50);
        assert_eq!(cfg.default_date_order, DateOrder::DayFirst);
        assert!(cfg.drop_boilerplate);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: ParserConfig =
            serde_json::from_str(r#"{"continuation_limit": 5, "default_date_order": "month_first"}"#)
                .unwrap();
        assert_eq!(cfg.continuation_limit, 5);
        assert_eq!(cfg.default_date_order, DateOrder::MonthFirst);
        assert_eq!(cfg.unparsed_cap, 50);
    }
}
