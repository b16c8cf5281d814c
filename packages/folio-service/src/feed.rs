use std::{
	collections::HashMap,
	sync::{Arc, Mutex, MutexGuard},
};

use time::OffsetDateTime;
use tokio::sync::watch;

use folio_domain::{
	CategoryMap, EntityKind, FilterContext, NormalizeContext, ViewItem, identity, normalize,
	schedule,
};
use folio_providers::PageRequest;

use crate::{
	Backend, Command, Cursor, Error, InsertItem, MergeMode, OrderPolicy, PartitionedCollection,
	RemoveItem, Result,
};

#[derive(Debug, Clone)]
pub struct FeedOptions {
	pub entity: EntityKind,
	pub page_size: u32,
	pub mutable_category: String,
	pub categories: CategoryMap,
	pub order: OrderPolicy,
}
impl FeedOptions {
	pub fn new(entity: EntityKind) -> Self {
		Self {
			entity,
			page_size: 20,
			mutable_category: folio_domain::category::NOTES.to_string(),
			categories: CategoryMap::default(),
			order: OrderPolicy::for_entity(entity),
		}
	}

	pub fn from_config(cfg: &folio_config::Config, entity: EntityKind) -> Self {
		Self {
			page_size: cfg.feed.page_size,
			mutable_category: cfg.feed.mutable_category.clone(),
			categories: CategoryMap::from_config(&cfg.categories),
			..Self::new(entity)
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
	Applied,
	/// Nothing was requested: a load is already running or the last page was reached.
	Skipped,
	/// The response arrived after a filter change and was discarded.
	Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOutcome {
	pub items_added: usize,
	pub status: LoadStatus,
}
impl LoadOutcome {
	fn nothing(status: LoadStatus) -> Self {
		Self { items_added: 0, status }
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
	/// The backend confirmed the delete.
	Deleted,
	/// The backend no longer knew the record.
	AlreadyGone,
	/// The item was never persisted; no request was made.
	Local,
}

struct FeedState {
	collection: PartitionedCollection,
	cursor: Cursor,
	/// Items with a delete in flight. Holds the latest copy a page delivered meanwhile, so a failed
	/// delete can put it back after the collection was rebuilt.
	pending_deletes: HashMap<u64, Option<ViewItem>>,
	/// Bumped on every replacing merge; undo positions are only valid within one epoch.
	epoch: u64,
	next_local: u64,
}
impl FeedState {
	/// Takes out incoming items whose delete is still pending.
	fn hold_back_pending(&mut self, items: Vec<ViewItem>) -> Vec<ViewItem> {
		if self.pending_deletes.is_empty() {
			return items;
		}

		items
			.into_iter()
			.filter_map(|item| match self.pending_deletes.get_mut(&item.id) {
				Some(held) => {
					*held = Some(item);

					None
				},
				None => Some(item),
			})
			.collect()
	}
}

/// Incrementally loaded, date-partitioned view of one customer's records of one entity kind.
///
/// All state changes go through this type. The lock is never held across a backend call, and
/// every change bumps the version published to [`Feed::subscribe`] receivers.
pub struct Feed {
	backend: Arc<dyn Backend>,
	options: FeedOptions,
	state: Mutex<FeedState>,
	version: watch::Sender<u64>,
}
impl Feed {
	pub fn new(backend: Arc<dyn Backend>, options: FeedOptions, filter: FilterContext) -> Self {
		let state = FeedState {
			collection: PartitionedCollection::new(options.order),
			cursor: Cursor::new(filter),
			pending_deletes: HashMap::new(),
			epoch: 0,
			next_local: 1,
		};
		let (version, _) = watch::channel(0);

		Self { backend, options, state: Mutex::new(state), version }
	}

	pub fn options(&self) -> &FeedOptions {
		&self.options
	}

	pub fn subscribe(&self) -> watch::Receiver<u64> {
		self.version.subscribe()
	}

	pub fn filter(&self) -> FilterContext {
		self.lock().cursor.filter().clone()
	}

	pub fn generation(&self) -> u64 {
		self.lock().cursor.generation()
	}

	pub fn partition_keys(&self) -> Vec<String> {
		self.lock().collection.partition_keys()
	}

	pub fn items_for(&self, key: &str, category: &str) -> Vec<ViewItem> {
		self.lock().collection.items_for(key, category).into_iter().cloned().collect()
	}

	pub fn snapshot(&self) -> PartitionedCollection {
		self.lock().collection.clone()
	}

	pub fn is_loading_more(&self) -> bool {
		self.lock().cursor.is_loading()
	}

	pub fn has_more(&self) -> bool {
		self.lock().cursor.has_next_page()
	}

	/// Activates `filter`. A different filter starts a new generation at page 1 whose first page
	/// replaces the collection; the current items stay visible until then.
	pub fn set_filter(&self, filter: FilterContext) -> bool {
		let generation = {
			let mut state = self.lock();

			if !state.cursor.reset(filter) {
				return false;
			}

			state.cursor.generation()
		};

		tracing::debug!(entity = %self.options.entity, generation, "Feed filter changed.");

		self.publish();

		true
	}

	/// Reloads page 1 of the active filter and replaces the collection with it.
	pub async fn refresh(&self) -> Result<LoadOutcome> {
		self.lock().cursor.restart();

		self.load_next_page().await
	}

	pub async fn load_next_page(&self) -> Result<LoadOutcome> {
		let (ticket, request) = {
			let mut state = self.lock();
			let Some(ticket) = state.cursor.begin() else {
				return Ok(LoadOutcome::nothing(LoadStatus::Skipped));
			};
			let request = self.page_request(state.cursor.filter(), ticket.page);

			(ticket, request)
		};

		self.publish();

		tracing::debug!(
			entity = %self.options.entity,
			generation = ticket.generation,
			page = ticket.page,
			"Loading feed page."
		);

		let result = self.backend.fetch_page(&request).await;
		let mut state = self.lock();

		if !state.cursor.is_current(&ticket) {
			tracing::debug!(
				entity = %self.options.entity,
				generation = ticket.generation,
				page = ticket.page,
				"Discarding stale feed page."
			);

			return Ok(LoadOutcome::nothing(LoadStatus::Stale));
		}

		let page = match result {
			Ok(page) => page,
			Err(err) => {
				state.cursor.fail(&ticket);

				drop(state);

				tracing::warn!(
					entity = %self.options.entity,
					page = ticket.page,
					timeout = err.is_timeout(),
					error = %err,
					"Feed page fetch failed."
				);

				self.publish();

				return Err(Error::TransientFetch { message: err.to_string() });
			},
		};
		let ctx = NormalizeContext {
			entity: self.options.entity,
			categories: &self.options.categories,
			now: OffsetDateTime::now_utc(),
		};
		let normalized = normalize(&page.items, &ctx);

		for skipped in &normalized.skipped {
			tracing::warn!(entity = %self.options.entity, page = ticket.page, "{skipped}");
		}
		if page.discarded > 0 || normalized.clock_fallbacks > 0 {
			tracing::debug!(
				entity = %self.options.entity,
				page = ticket.page,
				discarded = page.discarded,
				clock_fallbacks = normalized.clock_fallbacks,
				"Feed page had unreadable entries."
			);
		}

		let incoming = state.hold_back_pending(normalized.items);

		if ticket.mode == MergeMode::Replace {
			state.epoch += 1;
		}

		let items_added = state.collection.merge(incoming, ticket.mode);

		state.cursor.complete(&ticket, &page.pagination);

		let has_more = state.cursor.has_next_page();

		drop(state);

		tracing::info!(
			entity = %self.options.entity,
			page = ticket.page,
			items_added,
			has_more,
			"Feed page applied."
		);

		self.publish();

		Ok(LoadOutcome { items_added, status: LoadStatus::Applied })
	}

	/// Optimistically removes an item of the mutable category and deletes it on the backend.
	///
	/// Policy violations and overlapping deletes of the same item are rejected before anything
	/// changes. Pages that arrive while the request is out never bring the item back. A backend
	/// failure puts the item back where it was, or merges the copy the latest page delivered when
	/// the collection was rebuilt in the meantime.
	pub async fn delete_item(&self, partition_key: &str, id: u64) -> Result<DeleteOutcome> {
		let (source_id, undo, epoch) = {
			let mut state = self.lock();

			if state.pending_deletes.contains_key(&id) {
				return Err(Error::MutationRejected {
					message: format!("Item {id} is already being deleted."),
				});
			}

			let item = state.collection.get(partition_key, id).ok_or_else(|| {
				Error::MutationRejected {
					message: format!("Item {id} is not in partition {partition_key}."),
				}
			})?;

			if item.category != self.options.mutable_category {
				return Err(Error::MutationRejected {
					message: format!(
						"Only {} items can be deleted, item {id} is {}.",
						self.options.mutable_category, item.category
					),
				});
			}

			let command = RemoveItem { partition_key: partition_key.to_string(), id };
			let (removed, undo) = command.apply(&mut state.collection)?;

			if removed.source_id.is_some() {
				state.pending_deletes.insert(id, None);
			}

			(removed.source_id, undo, state.epoch)
		};

		self.publish();

		let Some(source_id) = source_id else {
			tracing::debug!(entity = %self.options.entity, id, "Deleted local feed item.");

			return Ok(DeleteOutcome::Local);
		};
		let result = self.backend.delete_record(self.options.entity, &source_id).await;
		let mut state = self.lock();
		let held = state.pending_deletes.remove(&id).flatten();

		match result {
			Ok(()) => Ok(DeleteOutcome::Deleted),
			Err(err) if err.is_not_found() => {
				tracing::debug!(entity = %self.options.entity, %source_id, "Record was already deleted.");

				Ok(DeleteOutcome::AlreadyGone)
			},
			Err(err) => {
				let same_epoch = state.epoch == epoch;

				if same_epoch {
					undo.run(&mut state.collection);
				} else if let Some(item) = held {
					state.collection.merge([item], MergeMode::Append);
				}

				drop(state);

				tracing::warn!(
					entity = %self.options.entity,
					%source_id,
					same_epoch,
					error = %err,
					"Feed delete failed."
				);

				self.publish();

				Err(Error::MutationFailed { message: err.to_string() })
			},
		}
	}

	/// Shows a new note immediately and persists it. The placeholder is swapped for the server's
	/// record on success, or removed again on failure.
	///
	/// Returns `None` when the stored record carries no system text and is therefore not shown.
	pub async fn add_note(&self, text: &str) -> Result<Option<ViewItem>> {
		let text = text.trim();

		if self.options.entity != EntityKind::Note {
			return Err(Error::InvalidRequest {
				message: format!("Notes cannot be added to a {} feed.", self.options.entity),
			});
		}
		if text.is_empty() {
			return Err(Error::InvalidRequest { message: "Note text must be non-empty.".to_string() });
		}

		let now = OffsetDateTime::now_utc();
		let (placeholder, undo, epoch, customer_id) = {
			let mut state = self.lock();
			let item = ViewItem {
				id: identity::local_id(state.next_local),
				partition_key: schedule::partition_key(now),
				category: self.options.mutable_category.clone(),
				display_text: text.to_string(),
				timestamp: now,
				time_of_day: None,
				source_id: None,
			};

			state.next_local += 1;

			let (placeholder, undo) = InsertItem { item }.apply(&mut state.collection)?;

			(placeholder, undo, state.epoch, state.cursor.filter().customer_id.clone())
		};

		self.publish();

		let result = self.backend.create_note(&customer_id, text).await;
		let mut state = self.lock();
		let same_epoch = state.epoch == epoch;

		match result {
			Ok(record) => {
				let ctx = NormalizeContext {
					entity: self.options.entity,
					categories: &self.options.categories,
					now,
				};
				let stored = normalize(std::slice::from_ref(&record), &ctx).items.into_iter().next();

				if same_epoch {
					match stored.clone() {
						Some(item) => {
							state.collection.replace(&placeholder.partition_key, placeholder.id, item);
						},
						None => undo.run(&mut state.collection),
					}
				}

				drop(state);

				tracing::info!(entity = %self.options.entity, shown = stored.is_some(), "Note created.");

				self.publish();

				Ok(stored)
			},
			Err(err) => {
				undo.run(&mut state.collection);

				drop(state);

				tracing::warn!(entity = %self.options.entity, error = %err, "Note creation failed.");

				self.publish();

				Err(Error::MutationFailed { message: err.to_string() })
			},
		}
	}

	/// Adds an item that only lives in this feed. It gets a local id and no source id.
	pub fn add_local(
		&self,
		category: &str,
		display_text: &str,
		timestamp: OffsetDateTime,
	) -> Result<ViewItem> {
		let item = {
			let mut state = self.lock();
			let item = ViewItem {
				id: identity::local_id(state.next_local),
				partition_key: schedule::partition_key(timestamp),
				category: category.to_string(),
				display_text: display_text.to_string(),
				timestamp,
				time_of_day: None,
				source_id: None,
			};

			state.next_local += 1;

			let (item, _) = InsertItem { item }.apply(&mut state.collection)?;

			item
		};

		self.publish();

		Ok(item)
	}

	fn page_request(&self, filter: &FilterContext, page: u32) -> PageRequest {
		PageRequest {
			entity: self.options.entity,
			customer_id: filter.customer_id.clone(),
			category: filter.category.as_deref().map(|label| self.options.categories.to_backend(label)),
			search: filter.search.clone(),
			group_by: filter.group_by.clone(),
			page,
			limit: self.options.page_size,
		}
	}

	fn lock(&self) -> MutexGuard<'_, FeedState> {
		self.state.lock().unwrap_or_else(|err| err.into_inner())
	}

	fn publish(&self) {
		self.version.send_modify(|version| *version += 1);
	}
}
