use photo_catalog::{Catalog, CatalogConfig, CatalogError, FacetSet};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage:
  photo-catalog search <facets.json>
  photo-catalog like <photo-id> <viewer-id>
  photo-catalog unlike <photo-id> <viewer-id>

Set PHOTO_CATALOG_CONFIG to a JSON config file to override the defaults.";

/// Parsed command line
enum Command {
    Search(PathBuf),
    Like(i64, String),
    Unlike(i64, String),
}

fn parse_args(args: &[String]) -> Option<Command> {
    match args {
        [cmd, path] if cmd == "search" => Some(Command::Search(PathBuf::from(path))),
        [cmd, photo, viewer] if cmd == "like" => Some(Command::Like(photo.parse().ok()?, viewer.clone())),
        [cmd, photo, viewer] if cmd == "unlike" => {
            Some(Command::Unlike(photo.parse().ok()?, viewer.clone()))
        }
        _ => None,
    }
}

fn load_config() -> Result<CatalogConfig, CatalogError> {
    match std::env::var_os("PHOTO_CATALOG_CONFIG") {
        Some(path) => CatalogConfig::from_json_file(PathBuf::from(path).as_path()),
        None => Ok(CatalogConfig::default()),
    }
}

fn run(command: Command) -> Result<(), CatalogError> {
    let catalog = Catalog::open(load_config()?)?;

    match command {
        Command::Search(path) => {
            let facets: FacetSet = serde_json::from_str(&std::fs::read_to_string(path)?)?;
            let page = catalog.search(&facets)?;
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
        Command::Like(photo_id, viewer) => {
            let recorded = catalog.like(photo_id, &viewer)?;
            println!("{}", if recorded { "liked" } else { "already liked" });
        }
        Command::Unlike(photo_id, viewer) => {
            let removed = catalog.unlike(photo_id, &viewer)?;
            println!("{}", if removed { "unliked" } else { "not liked" });
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = parse_args(&args) else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };

    match run(command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            if e.is_retryable() {
                ExitCode::from(75)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
