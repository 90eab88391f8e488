//! Downstream publish boundary
//!
//! Observations leave the crate as [`Point`]s: one measurement per named
//! field, carrying a single `value`, the caller's tags and the observation
//! time in seconds.

use crate::core::ObsData;
use std::collections::BTreeMap;
use std::fmt::Write;

pub type Tags = BTreeMap<String, String>;

/// One time-series point
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub tags: Tags,
    pub value: f64,
    /// Epoch seconds
    pub time: i64,
}

impl Point {
    /// One point per measurement of `obs`
    pub fn from_obs(obs: &ObsData, tags: &Tags) -> Vec<Point> {
        obs.measurements()
            .into_iter()
            .map(|(name, value)| Point {
                measurement: name.to_string(),
                tags: tags.clone(),
                value,
                time: obs.time,
            })
            .collect()
    }

    /// InfluxDB line protocol, seconds precision
    pub fn to_line_protocol(&self) -> String {
        let mut line = escape(&self.measurement, &[',', ' ']);
        for (key, value) in &self.tags {
            let _ = write!(
                line,
                ",{}={}",
                escape(key, &[',', '=', ' ']),
                escape(value, &[',', '=', ' '])
            );
        }
        let _ = write!(line, " value={} {}", self.value, self.time);
        line
    }
}

fn escape(text: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Parse tags from a JSON object; non-string values keep their JSON text
pub fn parse_tags(json: &str) -> Result<Tags, serde_json::Error> {
    let map: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)?;
    Ok(map
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}
