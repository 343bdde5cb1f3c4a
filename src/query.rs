//! Serialization of the filter state into backend payloads and URL query
//! strings, and the reverse direction for the chat page's query summary.
//!
//! A parameter that is not active (or an active text parameter left empty)
//! is sent as a sentinel the backend reads as "not specified". The sentinel
//! depends on the target endpoint and the parameter type:
//!
//! | Situation                  | ranking / query string | report        |
//! |----------------------------|------------------------|---------------|
//! | active, non-empty value    | value                  | value         |
//! | active text, empty         | `"undefined"`          | `"undefined"` |
//! | inactive switch            | `false`                | `"undefined"` |
//! | inactive select            | `null`                 | `"undefined"` |
//! | inactive number/slider/text| `NaN`                  | `"undefined"` |
//!
//! JSON has no `NaN`, so it goes out as `null` in payloads and as the literal
//! `NaN` in query strings.

use serde::Serialize;
use serde_json::{Map, Number, Value};
use url::form_urlencoded;

use crate::parameters::{ActiveParameterSet, Catalog, ParamValue, ParameterType, ParameterValues};

/// Query-string keys that carry flow state rather than a user filter.
pub const CONTROL_KEYS: [&str; 5] = ["similarity", "place_id", "k", "imageUrl", "notes"];

/// Query-string values that mean "not specified".
pub const SENTINEL_VALUES: [&str; 4] = ["NaN", "null", "false", ""];

/// Marker meaning "parameter not specified"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    Undefined,
    Null,
    False,
    NaN,
}

impl Sentinel {
    /// Sentinel for a parameter left out of the active set.
    pub fn for_inactive(kind: ParameterType) -> Self {
        match kind {
            ParameterType::Switch => Self::False,
            ParameterType::Select => Self::Null,
            ParameterType::Number | ParameterType::Slider | ParameterType::Text => Self::NaN,
        }
    }

    fn to_json(self) -> Value {
        match self {
            Self::Undefined => Value::String("undefined".to_string()),
            Self::Null | Self::NaN => Value::Null,
            Self::False => Value::Bool(false),
        }
    }

    fn as_query(self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::False => "false",
            Self::NaN => "NaN",
        }
    }
}

/// Encoded slot of one parameter
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Present(ParamValue),
    Absent(Sentinel),
}

impl WireValue {
    pub fn to_json(&self) -> Value {
        match self {
            Self::Present(ParamValue::Bool(b)) => Value::Bool(*b),
            Self::Present(ParamValue::Number(n)) => {
                Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null)
            }
            Self::Present(ParamValue::Text(s)) => Value::String(s.clone()),
            Self::Absent(sentinel) => sentinel.to_json(),
        }
    }

    pub fn to_query(&self) -> String {
        match self {
            Self::Present(ParamValue::Bool(b)) => b.to_string(),
            Self::Present(ParamValue::Number(n)) => format_number(*n),
            Self::Present(ParamValue::Text(s)) => s.clone(),
            Self::Absent(sentinel) => sentinel.as_query().to_string(),
        }
    }
}

/// Which endpoint's sentinel rules to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentinelPolicy {
    /// `/get_ranking` and the cross-page query string
    Ranking,
    /// `/report`
    Report,
}

/// Encode every catalog parameter, in catalog order.
pub fn encode_parameters(
    catalog: &Catalog,
    active: &ActiveParameterSet,
    values: &ParameterValues,
    policy: SentinelPolicy,
) -> Vec<(String, WireValue)> {
    catalog
        .iter()
        .map(|param| {
            let slot = if active.contains(&param.id) {
                let value = values
                    .get(&param.id)
                    .cloned()
                    .unwrap_or_else(|| param.default_value());
                match value {
                    ParamValue::Text(ref s) if param.kind == ParameterType::Text && s.is_empty() => {
                        WireValue::Absent(Sentinel::Undefined)
                    }
                    value => WireValue::Present(value),
                }
            } else {
                match policy {
                    SentinelPolicy::Ranking => {
                        WireValue::Absent(Sentinel::for_inactive(param.kind))
                    }
                    SentinelPolicy::Report => WireValue::Absent(Sentinel::Undefined),
                }
            };
            (param.id.clone(), slot)
        })
        .collect()
}

fn to_json_map(slots: Vec<(String, WireValue)>) -> Map<String, Value> {
    slots
        .into_iter()
        .map(|(id, slot)| (id, slot.to_json()))
        .collect()
}

/// Body of `POST /get_ranking`: one key per catalog entry plus `place_id` and `k`.
pub fn build_payload(
    catalog: &Catalog,
    active: &ActiveParameterSet,
    values: &ParameterValues,
    place_id: &str,
    k: u32,
) -> Map<String, Value> {
    let mut payload = to_json_map(encode_parameters(
        catalog,
        active,
        values,
        SentinelPolicy::Ranking,
    ));
    payload.insert("place_id".to_string(), Value::String(place_id.to_string()));
    payload.insert("k".to_string(), Value::from(k));
    payload
}

/// Body of `POST /report`: one key per catalog entry plus `placeId`.
pub fn build_report_payload(
    catalog: &Catalog,
    active: &ActiveParameterSet,
    values: &ParameterValues,
    place_id: &str,
) -> Map<String, Value> {
    let mut payload = to_json_map(encode_parameters(
        catalog,
        active,
        values,
        SentinelPolicy::Report,
    ));
    payload.insert("placeId".to_string(), Value::String(place_id.to_string()));
    payload
}

/// URL query string carrying the filter state to the next page, followed by `extra`.
pub fn build_query_string(
    catalog: &Catalog,
    active: &ActiveParameterSet,
    values: &ParameterValues,
    extra: &[(&str, String)],
) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (id, slot) in encode_parameters(catalog, active, values, SentinelPolicy::Ranking) {
        serializer.append_pair(&id, &slot.to_query());
    }
    for (key, value) in extra {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Decoded `(key, value)` pairs of a query string, with an optional leading `?`.
pub fn query_pairs(query: &str) -> Vec<(String, String)> {
    let query = query.strip_prefix('?').unwrap_or(query);
    form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Label (and value) of one user filter shown on the chat page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayParam {
    pub label: String,
    pub value: Option<String>,
}

impl DisplayParam {
    /// Badge text: `label` or `label: value`.
    pub fn badge(&self) -> String {
        match &self.value {
            Some(value) => format!("{}: {}", self.label, value),
            None => self.label.clone(),
        }
    }
}

/// Human-readable list of the user filters carried by a query string.
pub fn parse_display_params(query: &str, catalog: &Catalog) -> Vec<DisplayParam> {
    query_pairs(query)
        .into_iter()
        .filter_map(|(key, value)| {
            if CONTROL_KEYS.contains(&key.as_str()) || SENTINEL_VALUES.contains(&value.as_str()) {
                return None;
            }
            // Leftover flag from an earlier parameter set, kept for display parity.
            if key == "isUrgent" && value == "true" {
                return Some(DisplayParam {
                    label: "Urgent".to_string(),
                    value: None,
                });
            }
            let label = catalog
                .get(&key)
                .map(|p| p.label.clone())
                .unwrap_or_else(|| key.clone());
            Some(DisplayParam {
                label,
                value: Some(value),
            })
        })
        .collect()
}

/// Number formatting matching the browser's `Number#toString`: plain
/// decimals in `[1e-6, 1e21)`, exponent form (`1.2e-7`, `1e+21`) outside.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        let s = if n > 0.0 { "Infinity" } else { "-Infinity" };
        return s.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let magnitude = n.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return n.to_string();
    }
    let exp = format!("{n:e}");
    match exp.split_once('e') {
        Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
        _ => exp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::ParameterConfig;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            ParameterConfig::new("isUrgent", "Urgent", ParameterType::Switch),
            ParameterConfig::new("quantity", "Quantity", ParameterType::Number),
            ParameterConfig::new("notes", "Notes", ParameterType::Text),
            ParameterConfig::new("rate", "Transfer Rate", ParameterType::Slider)
                .with_range(0.0, Some(1.0), 0.01),
            ParameterConfig::new("Major", "Major", ParameterType::Select)
                .with_options(["STEM", "Arts and Humanities"]),
        ])
        .unwrap()
    }

    fn activate(catalog: &Catalog, ids: &[&str]) -> ActiveParameterSet {
        let mut active = ActiveParameterSet::new();
        for id in ids {
            active.toggle(catalog, id).unwrap();
        }
        active
    }

    #[test]
    fn test_payload_uses_per_type_sentinels_when_inactive() {
        let catalog = catalog();
        let values = ParameterValues::defaults(&catalog);
        let payload = build_payload(&catalog, &ActiveParameterSet::new(), &values, "abc", 5);

        assert_eq!(payload.len(), catalog.len() + 2);
        assert_eq!(payload["isUrgent"], Value::Bool(false));
        assert_eq!(payload["Major"], Value::Null);
        // NaN goes out as JSON null
        assert_eq!(payload["quantity"], Value::Null);
        assert_eq!(payload["rate"], Value::Null);
        assert_eq!(payload["notes"], Value::Null);
        assert_eq!(payload["place_id"], Value::String("abc".into()));
        assert_eq!(payload["k"], Value::from(5));
    }

    #[test]
    fn test_payload_emits_active_values() {
        let catalog = catalog();
        let mut values = ParameterValues::defaults(&catalog);
        values.set(&catalog, "quantity", ParamValue::Number(4.0)).unwrap();
        values.set(&catalog, "Major", ParamValue::Text("STEM".into())).unwrap();
        values.set(&catalog, "isUrgent", ParamValue::Bool(true)).unwrap();
        let active = activate(&catalog, &["quantity", "Major", "isUrgent"]);

        let payload = build_payload(&catalog, &active, &values, "abc", 10);
        assert_eq!(payload["quantity"], Value::from(4.0));
        assert_eq!(payload["Major"], Value::String("STEM".into()));
        assert_eq!(payload["isUrgent"], Value::Bool(true));
    }

    #[test]
    fn test_empty_active_text_is_undefined_literal() {
        let catalog = catalog();
        let values = ParameterValues::defaults(&catalog);
        let active = activate(&catalog, &["notes"]);

        let payload = build_payload(&catalog, &active, &values, "abc", 1);
        assert_eq!(payload["notes"], Value::String("undefined".into()));

        let report = build_report_payload(&catalog, &active, &values, "abc");
        assert_eq!(report["notes"], Value::String("undefined".into()));

        let query = build_query_string(&catalog, &active, &values, &[]);
        assert!(query.contains("notes=undefined"));
        assert!(!query.contains("notes=&"));
    }

    #[test]
    fn test_report_payload_marks_all_inactive_undefined() {
        let catalog = catalog();
        let values = ParameterValues::defaults(&catalog);
        let active = activate(&catalog, &["quantity"]);

        let report = build_report_payload(&catalog, &active, &values, "place-1");
        assert_eq!(report["placeId"], Value::String("place-1".into()));
        assert_eq!(report["quantity"], Value::from(1.0));
        for id in ["isUrgent", "notes", "rate", "Major"] {
            assert_eq!(report[id], Value::String("undefined".into()), "{id}");
        }
        assert!(!report.contains_key("k"));
    }

    #[test]
    fn test_query_string_mirrors_sentinels() {
        let catalog = catalog();
        let mut values = ParameterValues::defaults(&catalog);
        values.set(&catalog, "rate", ParamValue::Number(0.25)).unwrap();
        let active = activate(&catalog, &["rate"]);

        let query = build_query_string(
            &catalog,
            &active,
            &values,
            &[("place_id", "abc".to_string()), ("k", "3".to_string())],
        );
        assert_eq!(
            query,
            "isUrgent=false&quantity=NaN&notes=NaN&rate=0.25&Major=null&place_id=abc&k=3"
        );
    }

    #[test]
    fn test_query_string_encodes_spaces_like_a_form() {
        let catalog = catalog();
        let mut values = ParameterValues::defaults(&catalog);
        values
            .set(&catalog, "Major", ParamValue::Text("Arts and Humanities".into()))
            .unwrap();
        let active = activate(&catalog, &["Major"]);
        let query = build_query_string(&catalog, &active, &values, &[]);
        assert!(query.ends_with("Major=Arts+and+Humanities"));
    }

    #[test]
    fn test_display_params_filters_control_keys_and_sentinels() {
        let catalog = catalog();
        let query = "?isUrgent=true&quantity=NaN&notes=hello&rate=0.25&Major=null\
                     &place_id=abc&k=3&similarity=0.5&imageUrl=u2&empty=&flag=false&other=x";
        let shown = parse_display_params(query, &catalog);
        assert_eq!(
            shown,
            vec![
                DisplayParam { label: "Urgent".into(), value: None },
                DisplayParam { label: "Transfer Rate".into(), value: Some("0.25".into()) },
                DisplayParam { label: "other".into(), value: Some("x".into()) },
            ]
        );
        assert_eq!(shown[0].badge(), "Urgent");
        assert_eq!(shown[1].badge(), "Transfer Rate: 0.25");
    }

    #[test]
    fn test_display_params_keeps_undefined_literal() {
        let catalog = catalog();
        let shown = parse_display_params("quantity=undefined", &catalog);
        assert_eq!(
            shown,
            vec![DisplayParam { label: "Quantity".into(), value: Some("undefined".into()) }]
        );
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
    }

    #[test]
    fn test_format_number_switches_to_exponent_form() {
        assert_eq!(format_number(0.000001), "0.000001");
        assert_eq!(format_number(1.2e-7), "1.2e-7");
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(-2.5e22), "-2.5e+22");
    }
}
