use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cli::{DuplicateMode, IngestArgs};
use crate::config::AnalyzerConfig;
use crate::extract::{HeuristicAnalyzer, MarkdownExtractor};
use crate::model::{EntityKind, IngestRunManifest, OverwriteSet};
use crate::pipeline::IngestPipeline;
use crate::resolve::{FixedOverwrite, KeepExisting, OverwritePolicy};
use crate::store;
use crate::util::{ensure_directory, now_utc_string, utc_compact_string, write_json_pretty};

pub fn run(args: IngestArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let manifest_dir = args.cache_root.join("manifests");
    ensure_directory(&manifest_dir)?;

    let db_path = super::resolve_db_path(&args.cache_root, args.db_path.clone());
    let manifest_path = args.run_manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!(
            "ingest_run_{}.json",
            utc_compact_string(started_ts)
        ))
    });

    info!(
        run_id = %run_id,
        paper = %args.paper_path.display(),
        db = %db_path.display(),
        "starting ingest"
    );

    let mut connection = store::open_database(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    store::ensure_schema(&connection).context("failed to prepare schema")?;

    let config = AnalyzerConfig::default();
    debug!(
        metadata_model = %config.metadata_model,
        text_model = %config.text_model,
        table_model = %config.table_model,
        image_model = %config.image_model,
        temperature = %config.temperature,
        max_output_tokens = config.max_output_tokens,
        timeout_secs = config.timeout.as_secs(),
        "analyzer configuration"
    );
    let extractor = MarkdownExtractor::new(&config, Box::new(HeuristicAnalyzer))
        .context("failed to build extractor")?;
    let policy = overwrite_policy(&args);

    let pipeline = IngestPipeline::new(&extractor, policy.as_ref());
    let report = pipeline.run(&mut connection, &args.paper_path)?;

    for warning in &report.warnings {
        warn!(warning = %warning, "extraction degraded");
    }

    let manifest = IngestRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        status: "completed".to_string(),
        started_at,
        completed_at: now_utc_string(),
        paper_path: args.paper_path.display().to_string(),
        db_path: db_path.display().to_string(),
        report: report.clone(),
    };
    write_json_pretty(&manifest_path, &manifest)?;

    info!(
        run_id = %run_id,
        paper_id = report.paper_id,
        decision = %report.decision,
        sections = report.counts.sections_saved,
        tables = report.counts.tables_saved,
        images = report.counts.images_saved,
        references = report.counts.references_saved,
        manifest = %manifest_path.display(),
        "ingest completed"
    );

    Ok(())
}

fn overwrite_policy(args: &IngestArgs) -> Box<dyn OverwritePolicy> {
    match args.on_duplicate {
        DuplicateMode::Keep => {
            if !args.overwrite_kinds.is_empty() {
                warn!("--overwrite kinds are ignored without --on-duplicate overwrite");
            }
            Box::new(KeepExisting)
        }
        DuplicateMode::Overwrite => {
            let set = if args.overwrite_kinds.is_empty() {
                OverwriteSet::all()
            } else {
                let kinds: Vec<EntityKind> = args
                    .overwrite_kinds
                    .iter()
                    .copied()
                    .map(EntityKind::from)
                    .collect();
                OverwriteSet::of(&kinds)
            };
            Box::new(FixedOverwrite(set))
        }
    }
}
