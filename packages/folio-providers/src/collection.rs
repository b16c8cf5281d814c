use std::time::Duration;

use reqwest::{Client, StatusCode, header::HeaderMap};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};
use folio_domain::{EntityKind, RawRecord};

/// One page request against a collection endpoint. `category` is already a backend value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
	pub entity: EntityKind,
	pub customer_id: String,
	pub category: Option<String>,
	pub search: Option<String>,
	pub group_by: Option<String>,
	pub page: u32,
	pub limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
	pub current_page: u32,
	pub has_next_page: bool,
	pub total_pages: Option<u32>,
}
impl Default for Pagination {
	fn default() -> Self {
		Self { current_page: 1, has_next_page: false, total_pages: None }
	}
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
	pub items: Vec<RawRecord>,
	pub pagination: Pagination,
	/// Entries of the data array that were not JSON objects.
	pub discarded: usize,
}

/// HTTP access to the dashboard's REST collections.
#[derive(Debug, Clone)]
pub struct RestClient {
	http: Client,
	api_base: String,
	headers: HeaderMap,
}
impl RestClient {
	pub fn new(cfg: &folio_config::Backend) -> Result<Self> {
		let http = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
		let headers = crate::auth_headers(cfg.api_key.as_deref(), &cfg.default_headers)?;

		Ok(Self { http, api_base: cfg.api_base.trim_end_matches('/').to_string(), headers })
	}

	pub async fn fetch_page(&self, req: &PageRequest) -> Result<Page> {
		let url = format!("{}/{}", self.api_base, req.entity.as_str());
		let mut query = vec![
			("customerId", req.customer_id.clone()),
			("page", req.page.to_string()),
			("limit", req.limit.to_string()),
		];

		for (key, value) in [
			("category", &req.category),
			("search", &req.search),
			("groupBy", &req.group_by),
		] {
			if let Some(value) = value {
				query.push((key, value.clone()));
			}
		}

		let res = self.http.get(url).headers(self.headers.clone()).query(&query).send().await?;
		let json: Value = res.error_for_status()?.json().await?;
		let page = parse_page_response(json)?;

		tracing::debug!(
			entity = %req.entity,
			page = page.pagination.current_page,
			items = page.items.len(),
			has_next_page = page.pagination.has_next_page,
			"Fetched collection page."
		);

		Ok(page)
	}

	/// Deletes one record. A 404 maps to [`Error::NotFound`] so callers can treat repeated deletes
	/// as settled.
	pub async fn delete_record(&self, entity: EntityKind, source_id: &str) -> Result<()> {
		let url = format!("{}/{}/{}", self.api_base, entity.as_str(), source_id);
		let res = self.http.delete(url).headers(self.headers.clone()).send().await?;

		if res.status() == StatusCode::NOT_FOUND {
			tracing::debug!(%entity, source_id, "Delete target not found.");

			return Err(Error::NotFound { message: format!("{entity}/{source_id}") });
		}

		res.error_for_status()?;

		Ok(())
	}

	pub async fn create_note(&self, customer_id: &str, text: &str) -> Result<RawRecord> {
		let url = format!("{}/{}", self.api_base, EntityKind::Note.as_str());
		let body = serde_json::json!({ "customerId": customer_id, "note": text });
		let res = self.http.post(url).headers(self.headers.clone()).json(&body).send().await?;
		let json: Value = res.error_for_status()?.json().await?;

		parse_created_record(json)
	}
}

pub fn parse_page_response(json: Value) -> Result<Page> {
	let data = json
		.get("data")
		.or_else(|| json.get("items"))
		.and_then(Value::as_array)
		.ok_or_else(|| Error::InvalidResponse {
			message: "Page response is missing data array.".to_string(),
		})?;
	let meta = json.get("pagination").and_then(Value::as_object).ok_or_else(|| {
		Error::InvalidResponse { message: "Page response is missing pagination.".to_string() }
	})?;
	let current_page = meta_u32(meta, &["currentPage", "current_page", "page"]).ok_or_else(|| {
		Error::InvalidResponse { message: "Pagination is missing currentPage.".to_string() }
	})?;
	let total_pages = meta_u32(meta, &["totalPages", "total_pages"]);
	let has_next_page = ["hasNextPage", "has_next_page"]
		.iter()
		.find_map(|key| meta.get(*key).and_then(Value::as_bool))
		.or_else(|| total_pages.map(|total| current_page < total))
		.ok_or_else(|| Error::InvalidResponse {
			message: "Pagination is missing hasNextPage.".to_string(),
		})?;
	let mut items = Vec::with_capacity(data.len());
	let mut discarded = 0;

	for entry in data {
		match entry.as_object() {
			Some(record) => items.push(record.clone()),
			None => discarded += 1,
		}
	}

	Ok(Page { items, pagination: Pagination { current_page, has_next_page, total_pages }, discarded })
}

fn meta_u32(meta: &Map<String, Value>, keys: &[&str]) -> Option<u32> {
	keys.iter()
		.find_map(|key| meta.get(*key).and_then(Value::as_u64))
		.and_then(|value| u32::try_from(value).ok())
}

fn parse_created_record(json: Value) -> Result<RawRecord> {
	let record = json.get("data").unwrap_or(&json);

	record.as_object().cloned().ok_or_else(|| Error::InvalidResponse {
		message: "Create response must be a JSON object.".to_string(),
	})
}
