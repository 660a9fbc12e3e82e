#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line driver for the biogeography viewer core.
//!
//! ```text
//! biogeography search <text>
//! biogeography report <feature-id> [--name <name>] [--lat <lat> --lng <lng>] [--state <file>]
//! biogeography upload <file>
//! biogeography version
//! ```
//!
//! Service locations come from `BIS_API_URL` and `SCIENCEBASE_URL`;
//! `BIOGEOGRAPHY_DEV=1` mounts dev-only packages.

use std::path::PathBuf;

use biogeography::{AppConfig, Biogeography};
use biogeography_bap_models::PersistedState;
use biogeography_map::{HeadlessSurface, MapEvent, MapView};
use biogeography_map_models::{BasemapState, Feature, FeatureProperties, Point};
use biogeography_search::{FeatureSearchClient, result_label};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "biogeography",
    about = "Query analysis packages for a place and build the printed report"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search places by name
    Search {
        /// Text to search for
        text: String,
    },
    /// Fetch every package for a feature and print the report as JSON
    Report {
        /// Feature identifier (e.g. `US_County:08069`)
        feature_id: String,
        /// Feature name used in chart titles
        #[arg(long, default_value = "")]
        name: String,
        /// Latitude of the clicked point, for point-keyed packages
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,
        /// Longitude of the clicked point
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,
        /// Persisted state JSON to restore before fetching
        #[arg(long)]
        state: Option<PathBuf>,
        /// Print the resulting persisted state instead of the report
        #[arg(long)]
        share: bool,
    },
    /// Validate a polygon upload (.zip shapefile, .geojson or .json)
    Upload {
        /// File to upload
        path: PathBuf,
    },
    /// Print the BIS API version
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();
    let config = AppConfig::from_env();
    let client = reqwest::Client::builder()
        .user_agent("biogeography-cli")
        .build()?;

    match cli.command {
        Commands::Search { text } => {
            let search = FeatureSearchClient::new(client, &config.bis_api);
            let results = search.search(&text).await?;
            if results.is_empty() {
                println!("No places found.");
                return Ok(());
            }
            for result in &results {
                println!("{:<40} {}", result.feature_id, result_label(result));
            }
        }
        Commands::Report {
            feature_id,
            name,
            lat,
            lng,
            state,
            share,
        } => {
            let persisted: PersistedState = match state {
                Some(path) => serde_json::from_str(&tokio::fs::read_to_string(path).await?)?,
                None => PersistedState::default(),
            };

            let mut bioscape = Biogeography::with_registry(config, persisted);
            bioscape.load_metadata(&client).await;
            bioscape.set_feature(Some(Feature {
                geometry: None,
                properties: FeatureProperties {
                    feature_id,
                    feature_name: name,
                    ..FeatureProperties::default()
                },
            }));
            if let (Some(lat), Some(lng)) = (lat, lng) {
                bioscape.set_point(Some(Point::new(lat, lng)));
            }
            bioscape.refresh(&client).await;

            for bap in bioscape.baps() {
                if let Some(notice) = bap.error_notice() {
                    log::error!("{}: {notice}", bap.id());
                }
            }

            if share {
                println!("{}", serde_json::to_string_pretty(bioscape.share())?);
            } else {
                let report = bioscape.report();
                log::info!("Report has {} sections", report.len());
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
        Commands::Upload { path } => {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let bytes = tokio::fs::read(&path).await?;

            let mut view = MapView::new(Box::new(HeadlessSurface::new()), BasemapState::default());
            view.open_upload_dialog();
            let events = view.upload(&file_name, &bytes);
            if let Some(error) = view.upload_dialog().error.clone() {
                return Err(error.into());
            }

            for event in events {
                if let MapEvent::Draw(Some(geometry)) = event {
                    if let Some(bounds) = biogeography_map::bounds::geometry_bounds(&geometry) {
                        log::info!("Upload extent: {:?}", bounds.corners());
                    }
                    let feature = Feature::from_drawn(geometry);
                    println!("{}", serde_json::to_string_pretty(&feature.to_geojson())?);
                }
            }
        }
        Commands::Version => {
            let version =
                biogeography_map::version::fetch_api_version(&client, &config.bis_api).await;
            println!("{version}");
        }
    }

    Ok(())
}
