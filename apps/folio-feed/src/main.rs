use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = folio_feed::Args::parse();
	folio_feed::run(args).await
}
