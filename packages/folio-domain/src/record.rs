use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::category;

/// A record exactly as the collection endpoint returned it.
pub type RawRecord = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
	#[serde(rename = "notes")]
	Note,
	#[serde(rename = "appointments")]
	Appointment,
	#[serde(rename = "orders")]
	Order,
}
impl EntityKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Note => "notes",
			Self::Appointment => "appointments",
			Self::Order => "orders",
		}
	}

	/// Label used when a record carries no category of its own.
	pub fn default_category(self) -> &'static str {
		match self {
			Self::Note => category::NOTES,
			Self::Appointment => category::APPOINTMENTS,
			Self::Order => category::ORDERS,
		}
	}

	/// Maps one backend contract version of this entity onto [`SourceFields`].
	pub fn adapt(self, record: &RawRecord) -> SourceFields {
		match self {
			Self::Note => adapt_note(record),
			Self::Appointment => adapt_appointment(record),
			Self::Order => adapt_order(record),
		}
	}
}
impl fmt::Display for EntityKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for EntityKind {
	type Err = String;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		match raw.trim() {
			"notes" | "note" => Ok(Self::Note),
			"appointments" | "appointment" => Ok(Self::Appointment),
			"orders" | "order" => Ok(Self::Order),
			other => Err(format!("Unknown entity kind {other:?}.")),
		}
	}
}

/// Entity-independent view of the fields normalization reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFields {
	pub source_id: Option<String>,
	pub primary_date: Option<String>,
	pub created_at: Option<String>,
	pub category: Option<String>,
	pub summary: Option<String>,
	pub time_of_day: Option<String>,
}

// Notes only ever surface the system-authored summary. The free-text `note`, `url`, and `event`
// fields stay out of the feed.
fn adapt_note(record: &RawRecord) -> SourceFields {
	SourceFields {
		source_id: text_field(record, &["id", "_id"]),
		primary_date: text_field(record, &["date"]),
		created_at: text_field(record, &["createdAt", "created_at"]),
		category: text_field(record, &["category", "type"]),
		summary: text_field(record, &["system_note"]),
		time_of_day: None,
	}
}

fn adapt_appointment(record: &RawRecord) -> SourceFields {
	let summary = match (
		text_field(record, &["title", "reason"]),
		text_field(record, &["customerName", "kundenName"]),
	) {
		(Some(title), Some(customer)) => Some(format!("{title} - {customer}")),
		(Some(title), None) => Some(title),
		(None, customer) => customer,
	};

	SourceFields {
		source_id: text_field(record, &["id", "_id"]),
		primary_date: text_field(record, &["appointmentDate", "date"]),
		created_at: text_field(record, &["createdAt", "created_at"]),
		category: text_field(record, &["category"]),
		summary,
		time_of_day: text_field(record, &["time", "startTime"]),
	}
}

fn adapt_order(record: &RawRecord) -> SourceFields {
	let summary = match (
		text_field(record, &["orderNumber", "order_number"]),
		text_field(record, &["status", "orderStatus"]),
	) {
		(Some(number), Some(status)) => Some(format!("{number} ({status})")),
		(Some(number), None) => Some(number),
		(None, _) => None,
	};

	SourceFields {
		source_id: text_field(record, &["id", "_id"]),
		primary_date: text_field(record, &["orderDate", "date"]),
		created_at: text_field(record, &["createdAt", "created_at"]),
		category: text_field(record, &["category"]),
		summary,
		time_of_day: None,
	}
}

/// First non-blank string or number among `keys`.
fn text_field(record: &RawRecord, keys: &[&str]) -> Option<String> {
	keys.iter().find_map(|key| match record.get(*key)? {
		Value::String(raw) => {
			let trimmed = raw.trim();

			(!trimmed.is_empty()).then(|| trimmed.to_string())
		},
		Value::Number(number) => Some(number.to_string()),
		_ => None,
	})
}
