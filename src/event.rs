//! Decodes `<timestamp> $ <packet_type> $ <k1>: <v1>, <k2>: <v2>, …` lines.

use std::collections::HashMap;

use crate::error::Error;

/// A single decoded event from the trace. Timestamps are opaque strings,
/// compared only for equality; ordering comes from stream position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub timestamp: String,
    pub packet_type: String,
    pub fields: HashMap<String, String>,
}

impl Event {
    /// Decodes a single trace line. `line_no` is the 1-based line number,
    /// used only to annotate a `MalformedEvent` error.
    pub fn decode(line: &str, line_no: usize) -> Result<Self, Error> {
        let parts: Vec<&str> = line.split('$').collect();
        if parts.len() != 3 {
            return Err(Error::MalformedEvent {
                line: line_no,
                raw: line.to_string(),
            });
        }

        let timestamp = parts[0].trim().to_string();
        let packet_type = parts[1].trim().to_string();
        let mut fields = HashMap::new();
        for entry in parts[2].split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let (key, value) = match entry.split_once(':') {
                Some((k, v)) => (k.trim().to_string(), v.trim().to_string()),
                None => (entry.to_string(), String::new()),
            };
            fields.insert(key, value);
        }

        Ok(Self {
            timestamp,
            packet_type,
            fields,
        })
    }

    /// Looks up a field required by the current `packet_type`, failing with
    /// `MissingField` if absent. Each parser calls this only for the keys it
    /// actually reads on a given packet type.
    pub fn field(&self, key: &'static str) -> Result<&str, Error> {
        self.fields
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| Error::MissingField {
                packet_type: self.packet_type.clone(),
                field: key,
            })
    }
}
