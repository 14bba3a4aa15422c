use std::path::{Path, PathBuf};

use crate::catalog::source::ManifestSource;
use crate::cli::Cli;
use crate::config::Config;
use crate::error::Result;
use crate::service::OverlayCatalog;
use crate::storage::Database;

const DB_FILENAME: &str = "loradex.db";
const DEFAULT_MANIFEST: &str = "overlays.json";

pub struct AppContext {
    pub root: PathBuf,
    pub config: Config,
    pub catalog: OverlayCatalog,
    pub json: bool,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let root = Self::find_root()?;
        let config = Config::load(cli.config.as_deref(), &root)?;

        let manifest = cli
            .manifest
            .clone()
            .or_else(|| config.catalog.manifest.clone())
            .unwrap_or_else(|| root.join(DEFAULT_MANIFEST));

        let db = Database::open(root.join(DB_FILENAME))?;
        let catalog = OverlayCatalog::new(db, ManifestSource::new(manifest), config.clone());

        Ok(Self {
            root,
            config,
            catalog,
            json: cli.json,
        })
    }

    fn find_root() -> Result<PathBuf> {
        if let Ok(root) = std::env::var("LORADEX_ROOT") {
            return Ok(PathBuf::from(root));
        }
        let cwd = std::env::current_dir()?;
        if let Some(found) = find_upwards(&cwd, ".loradex")? {
            return Ok(found);
        }

        let data_dir = dirs::data_dir().ok_or_else(|| {
            crate::error::LdxError::MissingConfig("data directory not found".to_string())
        })?;
        Ok(data_dir.join("loradex"))
    }
}

fn find_upwards(start: &Path, name: &str) -> Result<Option<PathBuf>> {
    let mut current = Some(start);
    while let Some(dir) = current {
        let candidate = dir.join(name);
        if candidate.is_dir() {
            return Ok(Some(candidate));
        }
        current = dir.parent();
    }
    Ok(None)
}
