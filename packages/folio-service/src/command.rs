//! Collection mutations paired with their inverse.
//!
//! Every command captures what it needs to undo itself before touching the collection, so an
//! optimistic change can be rolled back once the backend refuses it.

use folio_domain::ViewItem;

use crate::{Error, PartitionedCollection, Result};

type UndoFn = Box<dyn FnOnce(&mut PartitionedCollection) + Send>;

pub struct Undo {
	label: &'static str,
	apply: UndoFn,
}
impl Undo {
	pub fn new<F>(label: &'static str, apply: F) -> Self
	where
		F: FnOnce(&mut PartitionedCollection) + Send + 'static,
	{
		Self { label, apply: Box::new(apply) }
	}

	pub fn label(&self) -> &'static str {
		self.label
	}

	pub fn run(self, collection: &mut PartitionedCollection) {
		(self.apply)(collection);
	}
}
impl std::fmt::Debug for Undo {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Undo").field("label", &self.label).finish_non_exhaustive()
	}
}

pub trait Command {
	type Output;

	fn apply(self, collection: &mut PartitionedCollection) -> Result<(Self::Output, Undo)>;
}

#[derive(Debug, Clone)]
pub struct RemoveItem {
	pub partition_key: String,
	pub id: u64,
}
impl Command for RemoveItem {
	type Output = ViewItem;

	fn apply(self, collection: &mut PartitionedCollection) -> Result<(ViewItem, Undo)> {
		let (index, item) = collection.remove(&self.partition_key, self.id).ok_or_else(|| {
			Error::MutationRejected {
				message: format!("Item {} is not in partition {}.", self.id, self.partition_key),
			}
		})?;
		let restored = item.clone();
		let undo = Undo::new("remove", move |collection: &mut PartitionedCollection| {
			collection.insert_at(index, restored);
		});

		Ok((item, undo))
	}
}

/// Inserts at the head of the item's partition.
#[derive(Debug, Clone)]
pub struct InsertItem {
	pub item: ViewItem,
}
impl Command for InsertItem {
	type Output = ViewItem;

	fn apply(self, collection: &mut PartitionedCollection) -> Result<(ViewItem, Undo)> {
		let key = self.item.partition_key.clone();
		let id = self.item.id;

		if !collection.insert_at(0, self.item.clone()) {
			return Err(Error::MutationRejected {
				message: format!("Item {id} is already in partition {key}."),
			});
		}

		let undo = Undo::new("insert", move |collection: &mut PartitionedCollection| {
			collection.remove(&key, id);
		});

		Ok((self.item, undo))
	}
}
