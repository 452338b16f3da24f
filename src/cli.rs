use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::model::EntityKind;

#[derive(Parser, Debug)]
#[command(
    name = "paperbase",
    version,
    about = "Local scientific-paper extraction and ingestion tooling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Ingest(IngestArgs),
    List(ListArgs),
    Show(ShowArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    /// Markdown paper file to ingest.
    pub paper_path: PathBuf,

    #[arg(long, default_value = ".cache/paperbase")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub run_manifest_path: Option<PathBuf>,

    /// What to do when the paper already exists in the database.
    #[arg(long, value_enum, default_value_t = DuplicateMode::Keep)]
    pub on_duplicate: DuplicateMode,

    /// Entity kinds to overwrite on a duplicate. Repeatable; with
    /// --on-duplicate overwrite and no kinds given, all kinds are replaced.
    #[arg(long = "overwrite", value_enum)]
    pub overwrite_kinds: Vec<OverwriteKind>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[arg(long, default_value = ".cache/paperbase")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long, default_value_t = 50)]
    pub limit: usize,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Paper id as stored in the database.
    pub paper_id: i64,

    #[arg(long, default_value = ".cache/paperbase")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/paperbase")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum DuplicateMode {
    /// Keep every stored entity kind untouched (skip the run).
    Keep,
    /// Replace the selected entity kinds.
    Overwrite,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OverwriteKind {
    Metadata,
    Sections,
    Tables,
    Images,
}

impl From<OverwriteKind> for EntityKind {
    fn from(kind: OverwriteKind) -> Self {
        match kind {
            OverwriteKind::Metadata => EntityKind::Metadata,
            OverwriteKind::Sections => EntityKind::Sections,
            OverwriteKind::Tables => EntityKind::Tables,
            OverwriteKind::Images => EntityKind::Images,
        }
    }
}
