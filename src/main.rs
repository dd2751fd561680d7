use anyhow::Context;
use clap::Parser;
use geotract::server::{AppState, run_server};
use geotract::{BoundingBox2D, RegionStore, StoreConfig};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// GeoJSON dataset of census tracts
    #[arg(short, long)]
    dataset: PathBuf,

    #[arg(short, long, default_value_t = 5000)]
    port: u16,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Store configuration file (.toml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Feature property holding the tract code; overrides the config file
    #[arg(long)]
    id_field: Option<String>,

    /// Only answer lookups inside min_lng,min_lat,max_lng,max_lat
    #[arg(long, value_parser = parse_service_area)]
    service_area: Option<BoundingBox2D>,
}

fn parse_service_area(raw: &str) -> Result<BoundingBox2D, String> {
    let values = raw
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("{:?}: {}", v, e)))
        .collect::<Result<Vec<_>, _>>()?;

    match values.as_slice() {
        [min_lng, min_lat, max_lng, max_lat] => {
            Ok(BoundingBox2D::new(*min_lng, *min_lat, *max_lng, *max_lat))
        }
        _ => Err(format!("expected 4 comma-separated numbers, got {}", values.len())),
    }
}

fn load_config(path: &Path) -> anyhow::Result<StoreConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;

    let config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => StoreConfig::from_toml(&text)?,
        _ => StoreConfig::from_json(&text)?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geotract=info,geotract_server=info,info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => StoreConfig::default(),
    };
    if let Some(field) = args.id_field {
        config = config.with_id_field(field);
    }

    info!("Loading census tracts from {}", args.dataset.display());
    let dataset = args.dataset.clone();
    let store = tokio::task::spawn_blocking(move || {
        RegionStore::builder().path(dataset).config(config).build()
    })
    .await?
    .with_context(|| format!("loading {}", args.dataset.display()))?;

    let mut state = AppState::new(Arc::new(store));
    if let Some(area) = args.service_area {
        info!(
            "Restricting lookups to [{}, {}] x [{}, {}]",
            area.min_x(),
            area.max_x(),
            area.min_y(),
            area.max_y()
        );
        state = state.with_service_area(area);
        if !state.service_area_reaches_store() {
            warn!("Service area does not overlap the loaded tracts; every lookup will miss");
        }
    }

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let shutdown = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl_c signal");
    };

    run_server(addr, state, shutdown).await?;

    Ok(())
}
