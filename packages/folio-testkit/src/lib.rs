use std::{
	collections::VecDeque,
	sync::{Mutex, MutexGuard},
};

use serde_json::Value;
use tokio::sync::oneshot;

use folio_domain::{EntityKind, RawRecord};
use folio_providers::{Error, Page, PageRequest, Pagination, Result};
use folio_service::{Backend, BoxFuture};

/// Scripted reply for one backend call.
pub enum Reply<T> {
	Ok(T),
	Fail(String),
	NotFound,
	/// Holds the reply until the paired [`Gate`] opens.
	Gated(Box<Reply<T>>, oneshot::Receiver<()>),
}

/// Releases a gated reply.
pub struct Gate(oneshot::Sender<()>);
impl Gate {
	pub fn open(self) {
		let _ = self.0.send(());
	}
}

/// In-memory stand-in for the REST collections.
///
/// Replies are consumed in call order. An unscripted fetch fails; unscripted deletes succeed.
#[derive(Default)]
pub struct FakeBackend {
	pages: Mutex<VecDeque<Reply<Page>>>,
	deletes: Mutex<VecDeque<Reply<()>>>,
	creates: Mutex<VecDeque<Reply<RawRecord>>>,
	fetch_log: Mutex<Vec<PageRequest>>,
	delete_log: Mutex<Vec<String>>,
	create_log: Mutex<Vec<(String, String)>>,
}
impl FakeBackend {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push_page(&self, page: Page) {
		lock(&self.pages).push_back(Reply::Ok(page));
	}

	pub fn push_fetch_failure(&self, message: &str) {
		lock(&self.pages).push_back(Reply::Fail(message.to_string()));
	}

	pub fn push_gated_page(&self, page: Page) -> Gate {
		let (tx, rx) = oneshot::channel();

		lock(&self.pages).push_back(Reply::Gated(Box::new(Reply::Ok(page)), rx));

		Gate(tx)
	}

	pub fn push_delete(&self, reply: Reply<()>) {
		lock(&self.deletes).push_back(reply);
	}

	pub fn push_gated_delete(&self, reply: Reply<()>) -> Gate {
		let (tx, rx) = oneshot::channel();

		lock(&self.deletes).push_back(Reply::Gated(Box::new(reply), rx));

		Gate(tx)
	}

	pub fn push_create(&self, reply: Reply<RawRecord>) {
		lock(&self.creates).push_back(reply);
	}

	pub fn fetches(&self) -> Vec<PageRequest> {
		lock(&self.fetch_log).clone()
	}

	pub fn deletes(&self) -> Vec<String> {
		lock(&self.delete_log).clone()
	}

	pub fn creates(&self) -> Vec<(String, String)> {
		lock(&self.create_log).clone()
	}
}
impl Backend for FakeBackend {
	fn fetch_page<'a>(&'a self, req: &'a PageRequest) -> BoxFuture<'a, Result<Page>> {
		lock(&self.fetch_log).push(req.clone());

		let reply = lock(&self.pages).pop_front();

		Box::pin(async move {
			match reply {
				Some(reply) => resolve(reply).await,
				None => Err(Error::InvalidResponse { message: "No scripted page.".to_string() }),
			}
		})
	}

	fn delete_record<'a>(
		&'a self,
		_entity: EntityKind,
		source_id: &'a str,
	) -> BoxFuture<'a, Result<()>> {
		lock(&self.delete_log).push(source_id.to_string());

		let reply = lock(&self.deletes).pop_front().unwrap_or(Reply::Ok(()));

		resolve(reply)
	}

	fn create_note<'a>(
		&'a self,
		customer_id: &'a str,
		text: &'a str,
	) -> BoxFuture<'a, Result<RawRecord>> {
		lock(&self.create_log).push((customer_id.to_string(), text.to_string()));

		let reply = lock(&self.creates).pop_front();

		Box::pin(async move {
			match reply {
				Some(reply) => resolve(reply).await,
				None => Err(Error::InvalidResponse { message: "No scripted record.".to_string() }),
			}
		})
	}
}

/// Builds a page from a JSON array of records.
pub fn page(records: Value, current_page: u32, has_next_page: bool) -> Page {
	let items: Vec<RawRecord> = records
		.as_array()
		.map(|entries| entries.iter().filter_map(|entry| entry.as_object().cloned()).collect())
		.unwrap_or_default();

	Page {
		items,
		pagination: Pagination { current_page, has_next_page, total_pages: None },
		discarded: 0,
	}
}

/// A customer note as the notes endpoint returns it.
pub fn note(id: &str, category: &str, system_note: &str, created_at: &str) -> Value {
	serde_json::json!({
		"_id": id,
		"category": category,
		"system_note": system_note,
		"note": "free text that must never be shown",
		"createdAt": created_at
	})
}

pub fn appointment(id: &str, date: &str, time: &str, title: &str) -> Value {
	serde_json::json!({ "_id": id, "appointmentDate": date, "time": time, "title": title })
}

pub fn record(value: Value) -> RawRecord {
	value.as_object().cloned().unwrap_or_default()
}

fn resolve<T>(reply: Reply<T>) -> BoxFuture<'static, Result<T>>
where
	T: Send + 'static,
{
	Box::pin(async move {
		match reply {
			Reply::Ok(value) => Ok(value),
			Reply::Fail(message) => Err(Error::InvalidResponse { message }),
			Reply::NotFound => Err(Error::NotFound { message: "Scripted not found.".to_string() }),
			Reply::Gated(inner, gate) => {
				let _ = gate.await;

				resolve(*inner).await
			},
		}
	})
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|err| err.into_inner())
}
