use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use markup_canvas::{ExportCompositor, ExportMode, PageSummary, PaintOptions};
use markup_editor::EditorConfig;
use markup_model::{Annotation, AnnotationCollection, AnnotationId, FileId, Rect, Shape};
use markup_pages::{default_backend, DocumentKind, LoadedDocument, PageRenderer, PdfBackend, SourceDocument};
use markup_store::{decode, HttpStore, JsonFileStore, PersistenceBridge};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "markup-cli")]
#[command(about = "Markup CLI")]
pub struct Cli {
    /// Configuration file, instead of MARKUP_CONFIG or the user config directory.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable document metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Render one page with its annotations to a PNG.
    RenderPage {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[command(flatten)]
        source: AnnotationSource,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Export the annotated document as a PDF.
    Export {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[command(flatten)]
        source: AnnotationSource,
        #[arg(long, default_value = "flatten")]
        mode: ExportMode,
    },
    /// List the annotations of a document.
    Annotations {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[command(flatten)]
        source: AnnotationSource,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    kind: DocumentKind,
    page_count: u32,
    pages: Vec<PageOutput>,
    path: String,
}

#[derive(Debug, Serialize)]
struct PageOutput {
    height: f32,
    page: u32,
    width: f32,
}

#[derive(Debug, Serialize)]
struct ExportOutput<'a> {
    mode: ExportMode,
    output: String,
    pages: &'a [PageSummary],
}

#[derive(Debug, Serialize)]
struct AnnotationOutput<'a> {
    id: Option<AnnotationId>,
    page: u32,
    color: String,
    line_width: f64,
    rotation: f64,
    bounds: Rect,
    shape: &'a Shape,
}

impl<'a> From<&'a Annotation> for AnnotationOutput<'a> {
    fn from(annotation: &'a Annotation) -> Self {
        Self {
            id: annotation.id(),
            page: annotation.page(),
            color: annotation.style().color.to_string(),
            line_width: annotation.style().line_width,
            rotation: annotation.rotation(),
            bounds: annotation.bounding_box(),
            shape: annotation.shape(),
        }
    }
}

/// Where a command reads annotations from.
#[derive(Debug, Args)]
struct AnnotationSource {
    /// Annotation file in sidecar layout. Defaults to the document's sidecar.
    #[arg(long, value_name = "JSON")]
    annotations: Option<PathBuf>,
    /// Persistence API root, instead of the configured `store.base_url`.
    #[arg(long, value_name = "URL", conflicts_with = "annotations")]
    api: Option<String>,
    /// Only annotations of this file. Required when listing from an API.
    #[arg(long, value_name = "ID")]
    file_id: Option<i64>,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    let config = EditorConfig::discover(cli.config.as_deref())
        .context("failed to load configuration")?;
    init_logging(&config.logging.level);

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::RenderPage { file, page, source, output } => {
            run_render_page(&config, &file, page, &source, output.as_deref())
        }
        Commands::Export { file, output, source, mode } => {
            run_export(&config, &file, &output, &source, mode)
        }
        Commands::Annotations { file, source } => run_annotations(&config, &file, &source),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Route log events to stderr. `RUST_LOG` wins over the configured level.
fn init_logging(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn run_info(file: &Path) -> Result<()> {
    let (mut renderer, document) = open_document(file)?;

    let pages = document
        .page_sizes()
        .iter()
        .zip(1..)
        .map(|(size, page)| PageOutput { height: size.height_pt, page, width: size.width_pt })
        .collect();
    let payload = InfoOutput {
        kind: document.kind(),
        page_count: document.page_count(),
        pages,
        path: file.display().to_string(),
    };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");

    renderer.close(document)?;

    Ok(())
}

fn run_render_page(
    config: &EditorConfig,
    file: &Path,
    page: u32,
    source: &AnnotationSource,
    output: Option<&Path>,
) -> Result<()> {
    if page == 0 {
        anyhow::bail!("--page is 1-based and must be >= 1");
    }

    let (mut renderer, document) = open_document(file)?;
    let collection = load_annotations(config, file, source)?;

    let bitmap = ExportCompositor::new(&renderer, PaintOptions::from_config(&config.drawing))
        .with_target_width(config.canvas.reference_width)
        .flatten_page(&document, page, &collection)
        .with_context(|| format!("failed to render page {page}"))?;

    let output = output.map(ToOwned::to_owned).unwrap_or_else(|| default_page_output(file, page));
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    bitmap
        .save(&output)
        .with_context(|| format!("failed to write image to {}", output.display()))?;

    println!("{}", output.display());

    renderer.close(document)?;

    Ok(())
}

fn run_export(
    config: &EditorConfig,
    file: &Path,
    output: &Path,
    source: &AnnotationSource,
    mode: ExportMode,
) -> Result<()> {
    let (mut renderer, document) = open_document(file)?;
    let collection = load_annotations(config, file, source)?;

    let artifact = ExportCompositor::new(&renderer, PaintOptions::from_config(&config.drawing))
        .with_mode(mode)
        .with_target_width(config.canvas.reference_width)
        .export(&document, &collection)
        .context("failed to export document")?;

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    artifact
        .write_to(output)
        .with_context(|| format!("failed to write PDF to {}", output.display()))?;
    tracing::info!(path = %output.display(), "{}", artifact.notice().message);

    let payload =
        ExportOutput { mode: artifact.mode, output: output.display().to_string(), pages: &artifact.pages };
    println!("{}", serde_json::to_string_pretty(&payload)?);

    renderer.close(document)?;

    Ok(())
}

fn run_annotations(config: &EditorConfig, file: &Path, source: &AnnotationSource) -> Result<()> {
    ensure_file_exists(file)?;
    let annotations = load_annotations(config, file, source)?;

    let payload: Vec<AnnotationOutput<'_>> = annotations.iter().map(AnnotationOutput::from).collect();
    println!("{}", serde_json::to_string_pretty(&payload)?);

    Ok(())
}

fn open_document(file: &Path) -> Result<(PageRenderer<Box<dyn PdfBackend>>, LoadedDocument)> {
    ensure_file_exists(file)?;

    let source = SourceDocument::from_path(file).context("failed to open document")?;
    let mut renderer = PageRenderer::new(default_backend());
    let document = renderer.load(&source).context("failed to open document")?;
    Ok((renderer, document))
}

/// Read annotations from `--annotations`, else from the persistence API
/// (`--api` or the configured base URL), else from the document's sidecar.
fn load_annotations(
    config: &EditorConfig,
    file: &Path,
    source: &AnnotationSource,
) -> Result<AnnotationCollection> {
    let file_id = source.file_id.map(FileId);

    if let Some(path) = &source.annotations {
        ensure_file_exists(path)?;
        let store = JsonFileStore::open(path)
            .with_context(|| format!("invalid annotation file {}", path.display()))?;
        return from_file_store(store, file_id);
    }

    if let Some(api) = source.api.as_deref().or(config.store.base_url.as_deref()) {
        let Some(file_id) = file_id else {
            anyhow::bail!("listing annotations from {api} needs --file-id");
        };
        let mut store = HttpStore::new(api, config.store.list_style, config.store.timeout());
        if let Some(token) = &config.store.bearer_token {
            store = store.with_bearer_token(token.as_str());
        }
        let annotations = PersistenceBridge::new(store)
            .list_by_file(file_id)
            .with_context(|| format!("failed to list annotations from {api}"))?;
        return Ok(annotations.into_iter().collect());
    }

    let store = JsonFileStore::for_document(file)
        .with_context(|| format!("invalid sidecar for {}", file.display()))?;
    from_file_store(store, file_id)
}

/// Decode the records of a sidecar, skipping those that do not decode.
fn from_file_store(store: JsonFileStore, file_id: Option<FileId>) -> Result<AnnotationCollection> {
    let path = store.path().to_path_buf();
    if let Some(file_id) = file_id {
        let annotations = PersistenceBridge::new(store)
            .list_by_file(file_id)
            .with_context(|| format!("failed to read annotations from {}", path.display()))?;
        return Ok(annotations.into_iter().collect());
    }

    let records = store.records();
    let collection: AnnotationCollection = records
        .iter()
        .filter_map(|record| match decode(record) {
            Ok(annotation) => Some(annotation),
            Err(error) => {
                tracing::warn!(id = ?record.id, kind = %record.kind, %error, "skipping record");
                None
            }
        })
        .collect();
    tracing::debug!(path = %path.display(), loaded = collection.len(), total = records.len(), "annotations read");
    Ok(collection)
}

fn ensure_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn default_page_output(file: &Path, page: u32) -> PathBuf {
    let stem = file.file_stem().and_then(|name| name.to_str()).unwrap_or("page");

    file.with_file_name(format!("{stem}-page-{page}.png"))
}
