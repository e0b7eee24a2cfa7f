use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = fabrec_api::Args::parse();
	fabrec_api::run(args).await
}
