use std::path::{Path, PathBuf};

pub mod ingest;
pub mod list;
pub mod show;
pub mod status;

const DB_FILE: &str = "paperbase.sqlite";

fn resolve_db_path(cache_root: &Path, override_path: Option<PathBuf>) -> PathBuf {
    override_path.unwrap_or_else(|| cache_root.join(DB_FILE))
}
