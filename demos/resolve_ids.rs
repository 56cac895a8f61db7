use anyhow::Result;
use pluvia::{Client, Described, FileKind, ForecastModel, Mode, PrecipitationSource};
use std::path::Path;

fn main() -> Result<()> {
    // Example program that calls the library API.
    // Configure credentials via env vars or a `.pluviarc` file; RUST_LOG=pluvia=debug
    // shows when the cached token is reused.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let client = Client::from_env()?;
    let mut session = client.authenticate(None)?;

    for mode in Mode::ALL {
        println!("{mode}: {}", client.mode_id(&mut session, *mode)?);
    }
    let merge = client.precipitation_source_id(&mut session, PrecipitationSource::Merge)?;
    println!("{}: {merge}", PrecipitationSource::Merge);
    let smap = client.forecast_model_id(&mut session, ForecastModel::Smap)?;
    println!("{}: {smap}", ForecastModel::Smap);

    // Optionally download one result file: `cargo run --example resolve_ids -- <endpoint>`.
    if let Some(endpoint) = std::env::args().nth(1) {
        let data_dir = Path::new("data");
        std::fs::create_dir_all(data_dir)?;
        if let Some(path) = client.get_file(&mut session, &endpoint, Some(data_dir))? {
            let kind = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(FileKind::from_file_name);
            match kind {
                Some(kind) => println!("saved {kind} file to {}", path.display()),
                None => println!("saved {}", path.display()),
            }
        }
    }

    Ok(())
}
