use anyhow::Result;
use clap::Parser;
use stream_telecom_exporter::cli;

#[derive(Parser)]
#[command(name = "stream-telecom-exporter")]
#[command(version = stream_telecom_exporter::VERSION)]
#[command(about = "Prometheus exporter for the Stream Telecom account balance", long_about = None)]
struct Cli {
    #[command(flatten)]
    serve: cli::ServeArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = cli::serve::run(cli.serve).await {
        tracing::error!("{:#}", e);
        return Err(e);
    }

    Ok(())
}
