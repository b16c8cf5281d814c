mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Backend, Categories, Config, Feed, Service};

use std::{fs, path::Path};

pub const MAX_PAGE_SIZE: u32 = 500;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse(&raw).map_err(|err| match err {
		Error::ParseConfig { source, .. } => Error::ParseConfig { path: path.to_path_buf(), source },
		other => other,
	})
}

/// Parses, normalizes, and validates a config from TOML text.
pub fn parse(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: Default::default(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}

	let api_base = cfg.backend.api_base.trim();

	if api_base.is_empty() {
		return Err(Error::Validation {
			message: "backend.api_base must be non-empty.".to_string(),
		});
	}
	if !(api_base.starts_with("http://") || api_base.starts_with("https://")) {
		return Err(Error::Validation {
			message: "backend.api_base must start with http:// or https://.".to_string(),
		});
	}
	if cfg.backend.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "backend.timeout_ms must be greater than zero.".to_string(),
		});
	}

	for (key, value) in &cfg.backend.default_headers {
		if !value.is_string() {
			return Err(Error::Validation {
				message: format!("backend.default_headers.{key} must be a string."),
			});
		}
	}

	if cfg.feed.page_size == 0 {
		return Err(Error::Validation {
			message: "feed.page_size must be greater than zero.".to_string(),
		});
	}
	if cfg.feed.page_size > MAX_PAGE_SIZE {
		return Err(Error::Validation {
			message: format!("feed.page_size must be {MAX_PAGE_SIZE} or less."),
		});
	}
	if cfg.feed.mutable_category.trim().is_empty() {
		return Err(Error::Validation {
			message: "feed.mutable_category must be non-empty.".to_string(),
		});
	}

	for (backend, label) in &cfg.categories.remap {
		if backend.trim().is_empty() || label.trim().is_empty() {
			return Err(Error::Validation {
				message: "categories.remap keys and values must be non-empty.".to_string(),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.backend.api_key = cfg
		.backend
		.api_key
		.as_deref()
		.map(str::trim)
		.filter(|key| !key.is_empty())
		.map(str::to_string);

	let trimmed = cfg.backend.api_base.trim().trim_end_matches('/').to_string();

	cfg.backend.api_base = trimmed;
	cfg.feed.mutable_category = cfg.feed.mutable_category.trim().to_string();
}
