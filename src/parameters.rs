//! Filter parameter catalog and the per-parameter state the search form edits.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{Result, SchoolMatchError};

/// Widget type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    Switch,
    Number,
    Text,
    Slider,
    Select,
}

/// One entry of the static filter catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterConfig {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: ParameterType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl ParameterConfig {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: ParameterType) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
            min: None,
            max: None,
            step: None,
            options: Vec::new(),
        }
    }

    pub fn with_range(mut self, min: f64, max: Option<f64>, step: f64) -> Self {
        self.min = Some(min);
        self.max = max;
        self.step = Some(step);
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Value a parameter holds before the user touches its widget.
    pub fn default_value(&self) -> ParamValue {
        match self.kind {
            ParameterType::Switch => ParamValue::Bool(false),
            ParameterType::Number => ParamValue::Number(self.min.unwrap_or(1.0)),
            ParameterType::Slider => ParamValue::Number(self.min.unwrap_or(0.0)),
            ParameterType::Text => ParamValue::Text(String::new()),
            ParameterType::Select => {
                ParamValue::Text(self.options.first().cloned().unwrap_or_default())
            }
        }
    }

    /// Check a value against this parameter's widget, clamping numeric input.
    fn accept(&self, value: ParamValue) -> Result<ParamValue> {
        match (self.kind, value) {
            (ParameterType::Switch, v @ ParamValue::Bool(_)) => Ok(v),
            (ParameterType::Text, v @ ParamValue::Text(_)) => Ok(v),
            (ParameterType::Number | ParameterType::Slider, ParamValue::Number(n)) => {
                if !n.is_finite() {
                    return Err(SchoolMatchError::invalid_parameter(
                        &self.id,
                        "value must be a finite number",
                    ));
                }
                let mut n = n;
                if let Some(min) = self.min {
                    n = n.max(min);
                }
                if let Some(max) = self.max {
                    n = n.min(max);
                }
                Ok(ParamValue::Number(n))
            }
            (ParameterType::Select, ParamValue::Text(choice)) => {
                if self.options.iter().any(|o| *o == choice) {
                    Ok(ParamValue::Text(choice))
                } else {
                    Err(SchoolMatchError::invalid_parameter(
                        &self.id,
                        format!("'{choice}' is not one of the available options"),
                    ))
                }
            }
            (kind, other) => Err(SchoolMatchError::invalid_parameter(
                &self.id,
                format!("{} widget cannot hold {other:?}", kind.as_str()),
            )),
        }
    }
}

impl ParameterType {
    /// Parse raw text input (e.g. a `KEY=VALUE` flag) into this widget's value type.
    pub fn parse_value(self, raw: &str) -> Option<ParamValue> {
        match self {
            Self::Switch => raw.parse().ok().map(ParamValue::Bool),
            Self::Number | Self::Slider => raw.trim().parse().ok().map(ParamValue::Number),
            Self::Text | Self::Select => Some(ParamValue::Text(raw.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Switch => "switch",
            Self::Number => "number",
            Self::Text => "text",
            Self::Slider => "slider",
            Self::Select => "select",
        }
    }
}

/// Current value of a parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// Immutable, ordered set of parameter definitions with unique ids
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    params: Vec<ParameterConfig>,
}

impl Catalog {
    pub fn new(params: Vec<ParameterConfig>) -> Result<Self> {
        let mut seen = HashSet::new();
        for param in &params {
            if !seen.insert(param.id.as_str()) {
                return Err(SchoolMatchError::invalid_parameter(
                    &param.id,
                    "duplicate id in catalog",
                ));
            }
            if param.kind == ParameterType::Select && param.options.is_empty() {
                return Err(SchoolMatchError::invalid_parameter(
                    &param.id,
                    "select parameter needs at least one option",
                ));
            }
        }
        Ok(Self { params })
    }

    /// Filters understood by the ranking backend.
    pub fn schools() -> Self {
        use ParameterType::*;

        let params = vec![
            ParameterConfig::new("Average Cost of Attendance", "Average Cost of Attendance", Number)
                .with_range(0.0, None, 100.0),
            ParameterConfig::new("Total Enrollment", "Total Enrollment", Number)
                .with_range(0.0, None, 1.0),
            ParameterConfig::new(
                "Median Earnings of Students Working and Not Enrolled 10 Years After Entry",
                "Median Earnings (10 Years After Entry)",
                Number,
            )
            .with_range(0.0, None, 1000.0),
            ParameterConfig::new(
                "Income Earned from Working 10 Hours a Week at State's Minimum Wage",
                "Income from 10 hrs/week at Minimum Wage",
                Number,
            )
            .with_range(0.0, None, 100.0),
            ParameterConfig::new(
                "Affordability Gap (net price minus income earned working 10 hrs at min wage)",
                "Affordability Gap",
                Number,
            )
            .with_range(0.0, None, 100.0),
            ParameterConfig::new(
                "Adjusted Monthly Center-Based Child Care Cost",
                "Monthly Child Care Cost",
                Number,
            )
            .with_range(0.0, None, 10.0),
            ParameterConfig::new("Transfer Out Rate", "Transfer Out Rate", Slider)
                .with_range(0.0, Some(1.0), 0.01),
            ParameterConfig::new(
                "Percent of Undergraduates Age 25 and Older",
                "Undergraduates Age 25 and Older",
                Slider,
            )
            .with_range(0.0, Some(1.0), 0.01),
            ParameterConfig::new("Major", "Major", Select)
                .with_options(["STEM", "Arts and Humanities"]),
            ParameterConfig::new("Race", "Race", Select).with_options([
                "White",
                "American Indian or Alaska Native",
                "Asian",
                "Black or African American",
                "Latino",
                "Native Hawaiian or Other Pacific Islander",
            ]),
            ParameterConfig::new("notes", "Notes", Text),
        ];

        Self { params }
    }

    pub fn get(&self, id: &str) -> Option<&ParameterConfig> {
        self.params.iter().find(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterConfig> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    fn require(&self, id: &str) -> Result<&ParameterConfig> {
        self.get(id)
            .ok_or_else(|| SchoolMatchError::invalid_parameter(id, "not in catalog"))
    }
}

/// Current value of every catalog parameter, keyed by id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterValues {
    values: HashMap<String, ParamValue>,
}

impl ParameterValues {
    pub fn defaults(catalog: &Catalog) -> Self {
        Self {
            values: catalog
                .iter()
                .map(|p| (p.id.clone(), p.default_value()))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&ParamValue> {
        self.values.get(id)
    }

    /// Update a value through the widget of its parameter type.
    pub fn set(&mut self, catalog: &Catalog, id: &str, value: ParamValue) -> Result<()> {
        let param = catalog.require(id)?;
        let accepted = param.accept(value)?;
        tracing::debug!(param = %id, value = ?accepted, "parameter value updated");
        self.values.insert(id.to_string(), accepted);
        Ok(())
    }
}

/// Parameter ids currently included in outgoing requests, in toggle order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveParameterSet {
    ids: Vec<String>,
}

impl ActiveParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `id`; returns whether it is active afterwards.
    pub fn toggle(&mut self, catalog: &Catalog, id: &str) -> Result<bool> {
        catalog.require(id)?;
        if let Some(pos) = self.ids.iter().position(|p| p == id) {
            self.ids.remove(pos);
            Ok(false)
        } else {
            self.ids.push(id.to_string());
            Ok(true)
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|p| p == id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

/// Input widget to render for one active parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Widget {
    pub id: String,
    pub label: String,
    pub kind: ParameterType,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub options: Vec<String>,
    pub placeholder: Option<String>,
    pub value: ParamValue,
}

/// One widget per active parameter, in catalog order.
pub fn render_widgets(
    catalog: &Catalog,
    active: &ActiveParameterSet,
    values: &ParameterValues,
) -> Vec<Widget> {
    catalog
        .iter()
        .filter(|p| active.contains(&p.id))
        .map(|p| Widget {
            id: p.id.clone(),
            label: p.label.clone(),
            kind: p.kind,
            min: p.min,
            max: p.max,
            step: p.step,
            options: p.options.clone(),
            placeholder: (p.kind == ParameterType::Text)
                .then(|| format!("Add any {} here...", p.label.to_lowercase())),
            value: values.get(&p.id).cloned().unwrap_or_else(|| p.default_value()),
        })
        .collect()
}
