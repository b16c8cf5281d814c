pub mod collection;
pub mod command;
pub mod debounce;
pub mod feed;
pub mod pagination;

mod error;

pub use collection::{MergeMode, OrderPolicy, PartitionedCollection};
pub use command::{Command, InsertItem, RemoveItem, Undo};
pub use debounce::Debouncer;
pub use error::{Error, Result};
pub use feed::{DeleteOutcome, Feed, FeedOptions, LoadOutcome, LoadStatus};
pub use pagination::{Cursor, Ticket};

use std::{future::Future, pin::Pin};

use folio_domain::{EntityKind, RawRecord};
use folio_providers::{Page, PageRequest, RestClient};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Remote collection endpoint a [`Feed`] reads from and mutates through.
///
/// `fetch_page` must be idempotent for identical requests. `delete_record` must report an already
/// deleted record as [`folio_providers::Error::NotFound`].
pub trait Backend
where
	Self: Send + Sync,
{
	fn fetch_page<'a>(&'a self, req: &'a PageRequest) -> BoxFuture<'a, folio_providers::Result<Page>>;

	fn delete_record<'a>(
		&'a self,
		entity: EntityKind,
		source_id: &'a str,
	) -> BoxFuture<'a, folio_providers::Result<()>>;

	fn create_note<'a>(
		&'a self,
		customer_id: &'a str,
		text: &'a str,
	) -> BoxFuture<'a, folio_providers::Result<RawRecord>>;
}

impl Backend for RestClient {
	fn fetch_page<'a>(&'a self, req: &'a PageRequest) -> BoxFuture<'a, folio_providers::Result<Page>> {
		Box::pin(RestClient::fetch_page(self, req))
	}

	fn delete_record<'a>(
		&'a self,
		entity: EntityKind,
		source_id: &'a str,
	) -> BoxFuture<'a, folio_providers::Result<()>> {
		Box::pin(RestClient::delete_record(self, entity, source_id))
	}

	fn create_note<'a>(
		&'a self,
		customer_id: &'a str,
		text: &'a str,
	) -> BoxFuture<'a, folio_providers::Result<RawRecord>> {
		Box::pin(RestClient::create_note(self, customer_id, text))
	}
}
