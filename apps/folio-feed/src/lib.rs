use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use color_eyre::eyre;
use tracing_subscriber::EnvFilter;

use folio_domain::{EntityKind, FilterContext};
use folio_providers::RestClient;
use folio_service::{Feed, FeedOptions, LoadStatus};

#[derive(Debug, Parser)]
#[command(
	version = folio_cli::VERSION,
	rename_all = "kebab",
	styles = folio_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// notes, appointments or orders.
	#[arg(long, default_value = "notes")]
	pub entity: EntityKind,
	#[arg(long, value_name = "ID")]
	pub customer: String,
	/// Display label, for example "E-mails".
	#[arg(long)]
	pub category: Option<String>,
	#[arg(long)]
	pub search: Option<String>,
	#[arg(long)]
	pub group_by: Option<String>,
	/// Upper bound on pages to load.
	#[arg(long, default_value_t = 1)]
	pub pages: u32,
	/// Creates this note before loading.
	#[arg(long, value_name = "TEXT")]
	pub add_note: Option<String>,
}
impl Args {
	fn filter(&self) -> FilterContext {
		let mut filter = FilterContext::for_customer(&self.customer);

		if let Some(category) = &self.category {
			filter = filter.with_category(category);
		}
		if let Some(search) = &self.search {
			filter = filter.with_search(search);
		}
		if let Some(group_by) = &self.group_by {
			filter = filter.with_group_by(group_by);
		}

		filter
	}
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = folio_config::load(&args.config)?;
	init_tracing(&config)?;

	if args.pages == 0 {
		return Err(eyre::eyre!("--pages must be greater than zero."));
	}

	let client = RestClient::new(&config.backend)?;
	let feed = Feed::new(
		Arc::new(client),
		FeedOptions::from_config(&config, args.entity),
		args.filter(),
	);

	if let Some(text) = &args.add_note {
		let stored = feed.add_note(text).await?;

		tracing::info!(shown = stored.is_some(), "Note stored.");
	}

	for _ in 0..args.pages {
		let outcome = feed.load_next_page().await?;

		if outcome.status != LoadStatus::Applied || !feed.has_more() {
			break;
		}
	}

	println!("{}", serde_json::to_string_pretty(&feed.snapshot())?);

	Ok(())
}

fn init_tracing(config: &folio_config::Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt().with_writer(std::io::stderr).with_env_filter(filter).init();
	Ok(())
}
