use std::sync::Arc;

/// Plugin identifier carried by every group this crate produces.
pub const PLUGIN_NAME: &str = "nfs";

/// A single sample value.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Value {
    /// Instantaneous value.
    Gauge(f64),
    /// Monotonic counter; rates are computed downstream.
    Derive(u64),
}

/// A named sub-series of a [`MetricGroup`].
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Series {
    pub name: &'static str,
    #[serde(flatten)]
    pub value: Value,
}

/// One sample group as handed to a [`super::MetricSink`].
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MetricGroup {
    pub host: Arc<str>,
    pub plugin: &'static str,
    pub plugin_instance: String,
    #[serde(rename = "type")]
    pub type_: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_instance: Option<String>,
    /// UNIX epoch seconds of the pass that produced the group.
    pub timestamp: u64,
    pub values: Vec<Series>,
}

impl MetricGroup {
    pub fn new(
        host: Arc<str>,
        plugin_instance: impl Into<String>,
        type_: &'static str,
        timestamp: u64,
    ) -> Self {
        Self {
            host,
            plugin: PLUGIN_NAME,
            plugin_instance: plugin_instance.into(),
            type_,
            type_instance: None,
            timestamp,
            values: Vec::new(),
        }
    }

    pub fn with_type_instance(mut self, type_instance: impl Into<String>) -> Self {
        self.type_instance = Some(type_instance.into());
        self
    }

    pub fn with_gauge(mut self, name: &'static str, value: f64) -> Self {
        self.values.push(Series {
            name,
            value: Value::Gauge(value),
        });
        self
    }

    /// Appends one derive series per `(name, value)` pair.
    pub fn with_derives(mut self, names: &[&'static str], values: &[u64]) -> Self {
        debug_assert_eq!(names.len(), values.len());
        self.values
            .extend(names.iter().zip(values).map(|(&name, &value)| Series {
                name,
                value: Value::Derive(value),
            }));
        self
    }

    /// Key identifying the series this group belongs to within one host.
    pub fn series_key(&self) -> (String, &'static str, Option<String>) {
        (
            self.plugin_instance.clone(),
            self.type_,
            self.type_instance.clone(),
        )
    }

    /// Looks up a sub-series by name.
    pub fn value(&self, name: &str) -> Option<Value> {
        self.values.iter().find(|s| s.name == name).map(|s| s.value)
    }
}

/// Builds an instance label from a path.
///
/// Every character outside `[A-Za-z0-9]` becomes `_`, one per character.
pub fn sanitize_instance(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
