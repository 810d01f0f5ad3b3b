//! Schema-Tolerant Episode Normalization
//!
//! Episode artifacts come from several policy runners that never agreed on a
//! schema. Every field we need is probed through a fixed, ordered alias list;
//! the first match wins and absence is an ordinary `None`.
//!
//! # Accepted Shapes
//!
//! ```text
//! collection:  [ ep, ep, ... ]
//!              { "episodes": [ ... ] }     (primary container)
//!              { "data": [ ... ] }         (fallback container)
//!
//! episode:     { "equity" | "equity_curve" | "equityCurve" | "values": [..] }
//!              { "curve": { "equity": [..] } }
//!              + optional "episode_id" | "episodeId" | "id" | "seed"
//!              + optional "symbol" | "ticker" | "asset"
//! ```

use serde_json::Value;

use crate::eval::equity_stats::EquitySeries;

/// Top-level aliases for the equity sequence, probed in order.
pub const EQUITY_ALIASES: &[&str] = &["equity", "equity_curve", "equityCurve", "values"];

/// Sub-object probed when no top-level alias matches.
pub const NESTED_CURVE_KEY: &str = "curve";

/// Aliases probed inside [`NESTED_CURVE_KEY`].
pub const NESTED_EQUITY_ALIASES: &[&str] = &["equity"];

/// Identity-key aliases linking episodes across policy runs.
pub const IDENTITY_ALIASES: &[&str] = &["episode_id", "episodeId", "id", "seed"];

/// Symbol / ticker aliases.
pub const SYMBOL_ALIASES: &[&str] = &["symbol", "ticker", "asset"];

/// Primary container field of a collection object.
pub const PRIMARY_CONTAINER: &str = "episodes";

/// Fallback container field of a collection object.
pub const FALLBACK_CONTAINER: &str = "data";

// =============================================================================
// ALIAS PROBING
// =============================================================================

/// First value under `aliases` accepted by `accept`.
fn probe<'a>(
    obj: &'a serde_json::Map<String, Value>,
    aliases: &[&str],
    accept: impl Fn(&Value) -> bool,
) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|key| obj.get(*key))
        .find(|v| accept(v))
}

/// Coerce one JSON scalar to a finite `f64`, or NaN.
pub fn coerce_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => f64::NAN,
    };
    if n.is_finite() {
        n
    } else {
        f64::NAN
    }
}

/// Render a JSON value as a plain string (strings unquoted).
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|x| x != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

// =============================================================================
// EPISODE RECORD
// =============================================================================

/// Borrowed view over one raw episode record.
#[derive(Debug, Clone, Copy)]
pub struct EpisodeRecord<'a> {
    raw: &'a Value,
}

impl<'a> EpisodeRecord<'a> {
    pub fn new(raw: &'a Value) -> Self {
        Self { raw }
    }

    /// Extract the equity sequence, or `None` when no alias holds a list.
    ///
    /// `None` means "skip this episode"; it is never an error.
    pub fn equity(&self) -> Option<EquitySeries> {
        let obj = self.raw.as_object()?;
        let list = probe(obj, EQUITY_ALIASES, Value::is_array).or_else(|| {
            obj.get(NESTED_CURVE_KEY)
                .and_then(Value::as_object)
                .and_then(|curve| probe(curve, NESTED_EQUITY_ALIASES, Value::is_array))
        })?;

        let values = list.as_array()?.iter().map(coerce_number).collect();
        Some(EquitySeries::new(values))
    }

    /// Identity key as a string. `null` counts as absent.
    pub fn identity_key(&self) -> Option<String> {
        let obj = self.raw.as_object()?;
        probe(obj, IDENTITY_ALIASES, |v| !v.is_null()).map(value_to_string)
    }

    /// Normalized (trimmed, upper-cased) symbol.
    pub fn symbol(&self) -> Option<String> {
        let obj = self.raw.as_object()?;
        let sym = probe(obj, SYMBOL_ALIASES, is_truthy).map(value_to_string)?;
        let sym = sym.trim().to_uppercase();
        if sym.is_empty() {
            None
        } else {
            Some(sym)
        }
    }
}

// =============================================================================
// COLLECTION SHAPE
// =============================================================================

/// How a policy artifact packages its episodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionShape {
    /// Bare JSON array.
    Sequence,
    /// Object holding the array under the named container field.
    Container(&'static str),
    /// Anything else; yields no episodes.
    Unrecognized,
}

impl CollectionShape {
    pub fn detect(value: &Value) -> Self {
        match value {
            Value::Array(_) => Self::Sequence,
            Value::Object(obj) => [PRIMARY_CONTAINER, FALLBACK_CONTAINER]
                .into_iter()
                .find(|key| obj.get(*key).map(Value::is_array).unwrap_or(false))
                .map(Self::Container)
                .unwrap_or(Self::Unrecognized),
            _ => Self::Unrecognized,
        }
    }
}

/// Episode records of one artifact, in document order. Never fails.
pub fn episodes(value: &Value) -> &[Value] {
    let list = match CollectionShape::detect(value) {
        CollectionShape::Sequence => value.as_array(),
        CollectionShape::Container(key) => value.get(key).and_then(Value::as_array),
        CollectionShape::Unrecognized => None,
    };
    list.map(Vec::as_slice).unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn equity_of(v: Value) -> Option<Vec<f64>> {
        EpisodeRecord::new(&v).equity().map(|s| s.values().to_vec())
    }

    #[test]
    fn test_equity_alias_priority() {
        let eq = equity_of(json!({"values": [9, 9], "equity_curve": [1, 2], "equity": "x"}));
        assert_eq!(eq, Some(vec![1.0, 2.0]));
    }

    #[test]
    fn test_equity_nested_curve() {
        let eq = equity_of(json!({"curve": {"equity": [100, 101.5]}}));
        assert_eq!(eq, Some(vec![100.0, 101.5]));
    }

    #[test]
    fn test_equity_top_level_wins_over_nested() {
        let eq = equity_of(json!({"curve": {"equity": [1, 1]}, "equityCurve": [2, 2]}));
        assert_eq!(eq, Some(vec![2.0, 2.0]));
    }

    #[test]
    fn test_equity_missing_is_none() {
        assert!(equity_of(json!({"id": 1})).is_none());
        assert!(equity_of(json!({"curve": [1, 2]})).is_none());
        assert!(equity_of(json!([1, 2, 3])).is_none());
        assert!(equity_of(json!(null)).is_none());
    }

    #[test]
    fn test_equity_coercion_sanitizes() {
        let eq = equity_of(json!({"equity": [1, "2.5", " 3 ", "abc", null, true, "inf", {"a": 1}]}))
            .unwrap();
        assert_eq!(eq[0], 1.0);
        assert_eq!(eq[1], 2.5);
        assert_eq!(eq[2], 3.0);
        assert!(eq[3].is_nan());
        assert!(eq[4].is_nan());
        assert_eq!(eq[5], 1.0);
        assert!(eq[6].is_nan());
        assert!(eq[7].is_nan());
    }

    #[test]
    fn test_identity_key() {
        let rec = json!({"id": 7, "seed": 3});
        assert_eq!(EpisodeRecord::new(&rec).identity_key().as_deref(), Some("7"));

        let rec = json!({"episode_id": null, "episodeId": "ep-1"});
        assert_eq!(EpisodeRecord::new(&rec).identity_key().as_deref(), Some("ep-1"));

        let rec = json!({"equity": [1, 2]});
        assert!(EpisodeRecord::new(&rec).identity_key().is_none());
    }

    #[test]
    fn test_symbol_normalization() {
        for raw in [json!({"symbol": " abc "}), json!({"ticker": "ABC"}), json!({"asset": "abc"})] {
            assert_eq!(EpisodeRecord::new(&raw).symbol().as_deref(), Some("ABC"));
        }
    }

    #[test]
    fn test_symbol_skips_falsy_aliases() {
        let rec = json!({"symbol": "", "ticker": "msft"});
        assert_eq!(EpisodeRecord::new(&rec).symbol().as_deref(), Some("MSFT"));

        let rec = json!({"symbol": "   "});
        assert!(EpisodeRecord::new(&rec).symbol().is_none());
    }

    #[test]
    fn test_collection_shapes() {
        let bare = json!([{"a": 1}, {"a": 2}]);
        assert_eq!(CollectionShape::detect(&bare), CollectionShape::Sequence);
        assert_eq!(episodes(&bare).len(), 2);

        let primary = json!({"episodes": [{"a": 1}], "data": [{}, {}]});
        assert_eq!(CollectionShape::detect(&primary), CollectionShape::Container("episodes"));
        assert_eq!(episodes(&primary).len(), 1);

        let fallback = json!({"episodes": "nope", "data": [{}, {}]});
        assert_eq!(CollectionShape::detect(&fallback), CollectionShape::Container("data"));
        assert_eq!(episodes(&fallback).len(), 2);

        for other in [json!({"rows": []}), json!(42), json!("x"), json!(null)] {
            assert_eq!(CollectionShape::detect(&other), CollectionShape::Unrecognized);
            assert!(episodes(&other).is_empty());
        }
    }
}
