use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use folio_domain::{EntityKind, ViewItem, schedule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
	/// Drop everything held and rebuild from the incoming items.
	Replace,
	/// Union with what is held; the first item seen under an id wins.
	Append,
}

/// How items are ordered inside a partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderPolicy {
	/// Fetch order.
	#[default]
	Arrival,
	/// Ascending time of day; unparseable times last, ties keep fetch order.
	TimeOfDay,
}
impl OrderPolicy {
	pub fn for_entity(entity: EntityKind) -> Self {
		match entity {
			EntityKind::Appointment => Self::TimeOfDay,
			EntityKind::Note | EntityKind::Order => Self::Arrival,
		}
	}
}

/// Feed items grouped by calendar date.
///
/// Partitions are never empty and never hold two items with the same id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PartitionedCollection {
	partitions: BTreeMap<String, Vec<ViewItem>>,
	#[serde(skip)]
	order: OrderPolicy,
}
impl PartitionedCollection {
	pub fn new(order: OrderPolicy) -> Self {
		Self { partitions: BTreeMap::new(), order }
	}

	pub fn order(&self) -> OrderPolicy {
		self.order
	}

	/// Merges a batch and returns how many items were actually added.
	pub fn merge<I>(&mut self, incoming: I, mode: MergeMode) -> usize
	where
		I: IntoIterator<Item = ViewItem>,
	{
		if mode == MergeMode::Replace {
			self.partitions.clear();
		}

		let mut touched = BTreeSet::new();
		let mut added = 0;

		for item in incoming {
			let partition = self.partitions.entry(item.partition_key.clone()).or_default();

			if partition.iter().any(|existing| existing.id == item.id) {
				continue;
			}

			touched.insert(item.partition_key.clone());
			partition.push(item);

			added += 1;
		}

		for key in touched {
			self.sort_partition(&key);
		}

		added
	}

	/// Partition keys, most recent first.
	pub fn partition_keys(&self) -> Vec<String> {
		self.partitions
			.iter()
			.rev()
			.filter(|(_, items)| !items.is_empty())
			.map(|(key, _)| key.clone())
			.collect()
	}

	pub fn items(&self, key: &str) -> &[ViewItem] {
		self.partitions.get(key).map(Vec::as_slice).unwrap_or_default()
	}

	pub fn items_for(&self, key: &str, category: &str) -> Vec<&ViewItem> {
		self.items(key).iter().filter(|item| item.category == category).collect()
	}

	pub fn get(&self, key: &str, id: u64) -> Option<&ViewItem> {
		self.items(key).iter().find(|item| item.id == id)
	}

	pub fn contains(&self, key: &str, id: u64) -> bool {
		self.get(key, id).is_some()
	}

	pub fn len(&self) -> usize {
		self.partitions.values().map(Vec::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.partitions.is_empty()
	}

	/// Removes an item and reports the position it held. Prunes the partition when it empties.
	pub fn remove(&mut self, key: &str, id: u64) -> Option<(usize, ViewItem)> {
		let partition = self.partitions.get_mut(key)?;
		let index = partition.iter().position(|item| item.id == id)?;
		let item = partition.remove(index);

		if partition.is_empty() {
			self.partitions.remove(key);
		}

		Some((index, item))
	}

	/// Puts an item back at `index` (clamped). Returns `false` if its id is already present.
	pub fn insert_at(&mut self, index: usize, item: ViewItem) -> bool {
		let key = item.partition_key.clone();
		let partition = self.partitions.entry(key.clone()).or_default();

		if partition.iter().any(|existing| existing.id == item.id) {
			return false;
		}

		partition.insert(index.min(partition.len()), item);

		if self.order == OrderPolicy::TimeOfDay {
			self.sort_partition(&key);
		}

		true
	}

	/// Swaps the item under `(key, id)` for `replacement`, keeping its slot when the partition is
	/// unchanged. When the replacement's id already exists, the old item is only removed.
	pub fn replace(&mut self, key: &str, id: u64, replacement: ViewItem) -> bool {
		let Some((index, _)) = self.remove(key, id) else {
			return false;
		};
		let index = if replacement.partition_key == key { index } else { 0 };

		self.insert_at(index, replacement);

		true
	}

	fn sort_partition(&mut self, key: &str) {
		if self.order != OrderPolicy::TimeOfDay {
			return;
		}
		if let Some(partition) = self.partitions.get_mut(key) {
			partition.sort_by(|a, b| {
				schedule::compare_time_of_day(a.time_of_day.as_deref(), b.time_of_day.as_deref())
			});
		}
	}
}
