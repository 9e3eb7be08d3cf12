//! Durable wire format: a JSON object keyed by item id whose values are
//! `{"rp"?: number, "done"?: bool}`. Older payloads stored a bare number.

use std::collections::BTreeMap;

use log::warn;
use serde::{Deserialize, Serialize};

use super::entry::ProgressEntry;
use crate::tree::item::ItemId;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum PersistedValue {
	Legacy(f64),
	Entry {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		rp: Option<f64>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		done: Option<bool>,
	},
}

impl From<PersistedValue> for ProgressEntry {
	fn from(value: PersistedValue) -> Self {
		let (rp, done) = match value {
			PersistedValue::Legacy(rp) => (Some(rp), None),
			PersistedValue::Entry { rp, done } => (rp, done),
		};
		ProgressEntry {
			accumulated: rp.filter(|v| v.is_finite()).unwrap_or(0.0).max(0.0),
			completed: done.unwrap_or(false),
		}
	}
}

/// Drops zero points and unset flags from each entry.
pub fn encode(entries: &BTreeMap<ItemId, ProgressEntry>) -> Result<String, serde_json::Error> {
	let wire: BTreeMap<String, PersistedValue> = entries
		.iter()
		.map(|(id, e)| {
			let value = PersistedValue::Entry {
				rp: (e.accumulated > 0.0).then_some(e.accumulated),
				done: e.completed.then_some(true),
			};
			(id.to_string(), value)
		})
		.collect();
	serde_json::to_string(&wire)
}

/// Decodes a stored partition, upgrading legacy numbers. Keys that are not
/// item ids and values that are neither a number nor an entry object are
/// skipped one by one; only a payload that is not a JSON object is an error.
pub fn decode(raw: &str) -> Result<BTreeMap<ItemId, ProgressEntry>, serde_json::Error> {
	let wire: BTreeMap<String, serde_json::Value> = serde_json::from_str(raw)?;
	Ok(wire
		.into_iter()
		.filter_map(|(key, value)| {
			let id = key.trim().parse().ok().map(ItemId)?;
			match PersistedValue::deserialize(value) {
				Ok(value) => Some((id, value.into())),
				Err(e) => {
					warn!("skipping stored progress for item {id}: {e}");
					None
				}
			}
		})
		.collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn upgrades_legacy_numbers() {
		let decoded = decode(r#"{"4": 2500, "5": {"rp": 10, "done": true}, "6": {}}"#).unwrap();
		assert_eq!(
			decoded[&ItemId(4)],
			ProgressEntry {
				accumulated: 2500.0,
				completed: false
			}
		);
		assert_eq!(
			decoded[&ItemId(5)],
			ProgressEntry {
				accumulated: 10.0,
				completed: true
			}
		);
		assert_eq!(decoded[&ItemId(6)], ProgressEntry::default());
	}

	#[test]
	fn skips_foreign_keys() {
		let decoded = decode(r#"{"version": 3, "8": 1}"#).unwrap();
		assert_eq!(decoded.len(), 1);
	}

	#[test]
	fn encode_omits_default_fields() {
		let mut entries = BTreeMap::new();
		entries.insert(ItemId(1), ProgressEntry::default());
		entries.insert(
			ItemId(2),
			ProgressEntry {
				accumulated: 40.0,
				completed: true,
			},
		);
		assert_eq!(encode(&entries).unwrap(), r#"{"1":{},"2":{"rp":40.0,"done":true}}"#);
	}

	#[test]
	fn bad_values_only_drop_their_own_entry() {
		let decoded =
			decode(r#"{"1": {"rp": 500}, "2": {"done": true}, "3": "oops", "4": [1], "5": {"rp": "x"}}"#)
				.unwrap();
		assert_eq!(decoded.keys().copied().collect::<Vec<_>>(), [ItemId(1), ItemId(2)]);
		assert_eq!(decoded[&ItemId(1)].accumulated, 500.0);
		assert!(decoded[&ItemId(2)].completed);
	}

	#[test]
	fn rejects_non_objects() {
		assert!(decode("[1, 2]").is_err());
	}
}
