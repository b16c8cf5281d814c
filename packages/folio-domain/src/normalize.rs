use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{CategoryMap, EntityKind, RawRecord, identity, schedule};

/// Canonical feed entry shared by every entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewItem {
	pub id: u64,
	pub partition_key: String,
	pub category: String,
	pub display_text: String,
	#[serde(with = "crate::time_serde")]
	pub timestamp: OffsetDateTime,
	pub time_of_day: Option<String>,
	/// Backend identity. `None` for items that were never persisted.
	pub source_id: Option<String>,
}
impl ViewItem {
	pub fn is_local(&self) -> bool {
		self.source_id.is_none()
	}
}

pub struct NormalizeContext<'a> {
	pub entity: EntityKind,
	pub categories: &'a CategoryMap,
	pub now: OffsetDateTime,
}

#[derive(Debug, Default)]
pub struct Normalized {
	pub items: Vec<ViewItem>,
	pub skipped: Vec<MalformedRecord>,
	/// Records placed at `now` because none of their timestamps could be read.
	pub clock_fallbacks: usize,
	pub dropped_empty: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Record {index} skipped: {reason}")]
pub struct MalformedRecord {
	pub index: usize,
	pub reason: String,
}

/// Maps one fetched page onto view items, preserving page order.
///
/// Never fails as a whole: records without a usable identity land in `skipped`, records without
/// display text are dropped, and unreadable timestamps fall back to `ctx.now`.
pub fn normalize(records: &[RawRecord], ctx: &NormalizeContext<'_>) -> Normalized {
	let mut out = Normalized { items: Vec::with_capacity(records.len()), ..Default::default() };

	for (index, record) in records.iter().enumerate() {
		let fields = ctx.entity.adapt(record);
		let display_text = fields.summary.as_deref().map(str::trim).unwrap_or_default();

		if display_text.is_empty() {
			out.dropped_empty += 1;

			continue;
		}

		let Some(source_id) = fields.source_id.clone() else {
			out.skipped.push(MalformedRecord { index, reason: "missing id".to_string() });

			continue;
		};
		let Some(id) = identity::derive_id(&source_id) else {
			out.skipped.push(MalformedRecord { index, reason: format!("unusable id {source_id:?}") });

			continue;
		};
		let parsed = fields
			.primary_date
			.as_deref()
			.and_then(schedule::parse_timestamp)
			.or_else(|| fields.created_at.as_deref().and_then(schedule::parse_timestamp));
		let timestamp = match parsed {
			Some(ts) => ts,
			None => {
				out.clock_fallbacks += 1;

				ctx.now
			},
		};
		let category = match fields.category.as_deref() {
			Some(raw) => ctx.categories.to_label(raw),
			None => ctx.entity.default_category().to_string(),
		};

		out.items.push(ViewItem {
			id,
			partition_key: schedule::partition_key(timestamp),
			category,
			display_text: display_text.to_string(),
			timestamp,
			time_of_day: fields.time_of_day,
			source_id: Some(source_id),
		});
	}

	out
}
