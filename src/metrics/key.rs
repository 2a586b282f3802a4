//! Metric identity: name plus canonical label set.

use std::collections::BTreeMap;
use std::fmt;

/// Identifies one time series.
///
/// Labels are held sorted by name, so two keys built from the same pairs in
/// a different order compare equal and render identically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricKey {
    name: String,
    labels: BTreeMap<String, String>,
}

impl MetricKey {
    /// Build a key from a name and `(label, value)` pairs.
    ///
    /// A repeated label name keeps the last value given.
    pub fn new(name: impl Into<String>, labels: &[(&str, &str)]) -> Self {
        Self::from_pairs(name, labels.iter().copied())
    }

    pub fn from_pairs<I, K, V>(name: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            labels: labels
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    /// Render the label block, optionally with one trailing extra label.
    ///
    /// Returns an empty string when there is nothing to render.
    pub fn label_block(&self, extra: Option<(&str, &str)>) -> String {
        if self.labels.is_empty() && extra.is_none() {
            return String::new();
        }

        let mut parts: Vec<String> = self
            .labels
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
            .collect();
        if let Some((k, v)) = extra {
            parts.push(format!("{}=\"{}\"", k, escape_label_value(v)));
        }

        format!("{{{}}}", parts.join(","))
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.label_block(None))
    }
}

fn escape_label_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}
