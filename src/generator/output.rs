use super::filters::render_filters;
use super::handlers::{referenced_filters, HandlerRenderer};
use super::render::{format_rust, RenderContext};
use crate::filters::FilterRegistry;
use crate::schema::SchemaModel;
use crate::spec::Endpoint;
use anyhow::Context;
use quote::quote;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One rendered output file, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub name: &'static str,
    pub contents: String,
}

/// Outcome of committing a set of files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub written: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
}

/// Render every output file in memory.
///
/// Nothing touches the filesystem here, so a failure leaves the output
/// directory as it was.
pub fn render_files(
    endpoints: &[Endpoint],
    schema: &SchemaModel,
    registry: &FilterRegistry,
    ctx: &RenderContext,
) -> anyhow::Result<Vec<GeneratedFile>> {
    let descriptors = referenced_filters(endpoints, registry);
    let filters = render_filters(registry, &descriptors, ctx).context("failed to render filters.rs")?;

    let handlers = HandlerRenderer {
        schema,
        registry,
        ctx,
    }
    .render(endpoints)
    .context("failed to render handlers.rs")?;

    let module = format_rust(quote! {
        pub mod filters;
        pub mod handlers;
    })
    .context("failed to render mod.rs")?;

    Ok(vec![
        GeneratedFile {
            name: "filters.rs",
            contents: filters,
        },
        GeneratedFile {
            name: "handlers.rs",
            contents: handlers,
        },
        GeneratedFile {
            name: "mod.rs",
            contents: module,
        },
    ])
}

/// Write `contents` to a temporary sibling of `path` without touching `path`.
fn stage(path: &Path, contents: &[u8]) -> anyhow::Result<tempfile::NamedTempFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;
    tmp.write_all(contents)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(tmp)
}

fn commit(tmp: tempfile::NamedTempFile, path: &Path) -> anyhow::Result<()> {
    tmp.persist(path)
        .with_context(|| format!("failed to move temporary file into {}", path.display()))?;
    Ok(())
}

/// Write `contents` to a temporary sibling of `path`, then rename it into place.
pub fn write_atomic(path: &Path, contents: &[u8]) -> anyhow::Result<()> {
    commit(stage(path, contents)?, path)
}

/// Commit rendered files to `dir`.
///
/// Every changed file is staged next to its target before any rename
/// happens, so a failed write leaves the previous files in place. Files
/// whose bytes already match are left alone. With `dry_run` nothing is
/// written and the report lists what would change.
pub fn write_files(dir: &Path, files: &[GeneratedFile], dry_run: bool) -> anyhow::Result<WriteReport> {
    let mut report = WriteReport::default();
    if !dry_run {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    }

    let mut staged = Vec::new();
    for file in files {
        let path = dir.join(file.name);
        let current = std::fs::read(&path).ok();
        if current.as_deref() == Some(file.contents.as_bytes()) {
            debug!(path = %path.display(), "Unchanged");
            report.unchanged.push(path);
            continue;
        }
        if dry_run {
            info!(path = %path.display(), "Would write");
            report.written.push(path);
            continue;
        }
        let tmp = stage(&path, file.contents.as_bytes())?;
        staged.push((tmp, path));
    }

    for (tmp, path) in staged {
        commit(tmp, &path)?;
        info!(path = %path.display(), "Wrote");
        report.written.push(path);
    }
    Ok(report)
}
