use clap::Parser;
use curio::{factory::AppFactory, web};
use serde_json::json;
use tracing_subscriber::EnvFilter;

mod cli;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();

    let paths = AppFactory::get_paths()?;
    let config = AppFactory::create_config(&paths.base_path)?;
    let service = AppFactory::create_service(&paths, args.data, &config)?;

    match args.command {
        cli::Command::Suggest { user, limit } => {
            let limit = limit.unwrap_or(config.suggestions.default_limit);
            let suggestions = service.suggest(&user, limit)?;

            println!("{}", serde_json::to_string_pretty(&suggestions)?);
            Ok(())
        }

        cli::Command::Centroid { user, preview } => {
            let centroid = service.centroid_for(&user)?;

            let summary = json!({
                "source": centroid.source(),
                "dimension": centroid.dimension(),
                "preview": &centroid.values()[..preview.min(centroid.dimension())],
            });

            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }

        cli::Command::Daemon { listen } => {
            let listen = listen.unwrap_or_else(|| config.daemon.listen.clone());
            web::start_daemon(service, &listen)
        }
    }
}
