use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub backend: Backend,
	#[serde(default)]
	pub feed: Feed,
	#[serde(default)]
	pub categories: Categories,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Backend {
	pub api_base: String,
	/// Optional. Sent as a bearer token when present.
	pub api_key: Option<String>,
	#[serde(default = "default_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Feed {
	#[serde(default = "default_page_size")]
	pub page_size: u32,
	#[serde(default = "default_debounce_ms")]
	pub debounce_ms: u64,
	/// The only category whose items may be deleted from the feed.
	#[serde(default = "default_mutable_category")]
	pub mutable_category: String,
}
impl Default for Feed {
	fn default() -> Self {
		Self {
			page_size: default_page_size(),
			debounce_ms: default_debounce_ms(),
			mutable_category: default_mutable_category(),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Categories {
	/// Backend category -> display label. Merged over the built-in table.
	#[serde(default)]
	pub remap: BTreeMap<String, String>,
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_timeout_ms() -> u64 {
	10_000
}

fn default_page_size() -> u32 {
	20
}

fn default_debounce_ms() -> u64 {
	300
}

fn default_mutable_category() -> String {
	"Notizen".to_string()
}
