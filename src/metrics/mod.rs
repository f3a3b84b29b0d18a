//! Metric samples produced by the collectors and the sink they are handed to.
//!
//! A [`MetricGroup`] is one dispatch unit: a single gauge, or a vector of
//! named counters sharing the same plugin instance, type and type instance.
mod sample;
mod sink;

pub use sample::{MetricGroup, PLUGIN_NAME, Series, Value, sanitize_instance};
pub use sink::MetricSink;
