mod logger;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use futures::StreamExt;
use pdf_gallery::{
    Arrangement, BatchPreviewGenerator, CancelToken, Document, ExportRequest, Fetcher,
    GalleryConfig, HttpFetcher, ImageFormat, PageRasterizer, PreviewCache, QualityPreset,
    RenderTarget,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::logger::StderrLogger;

#[derive(Parser)]
#[command(name = "pdfg", about = "PDF gallery CLI", version)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log more (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show page count, fingerprint and page sizes
    Info {
        /// PDF file path or http(s) URL
        source: String,
    },

    /// Render previews of every page into a directory
    Previews {
        /// PDF file path or http(s) URL
        source: String,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Quality preset
        #[arg(long, value_enum, conflicts_with = "quality")]
        preset: Option<PresetArg>,

        /// Quality 0-100, selecting the resolution tier
        #[arg(long)]
        quality: Option<u8>,

        /// Image format
        #[arg(long, default_value = "jpeg", value_enum)]
        format: FormatArg,

        /// Quantize PNG output to a 256-color palette
        #[arg(long)]
        palette: bool,
    },

    /// Render a single page
    Preview {
        /// PDF file path or http(s) URL
        source: String,

        /// 1-indexed page number
        #[arg(long)]
        page: usize,

        /// Output image file
        #[arg(short, long)]
        output: PathBuf,

        /// Quality 0-100, selecting the resolution tier
        #[arg(long, default_value = "90")]
        quality: u8,

        /// Image format
        #[arg(long, default_value = "png", value_enum)]
        format: FormatArg,
    },

    /// Copy pages into a new PDF, in the given order
    Extract {
        /// PDF file path or http(s) URL
        source: String,

        /// 1-indexed pages, e.g. 3,1,1
        #[arg(long)]
        pages: String,

        /// Output PDF file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Render previews and assemble them into a PDF
    Export {
        /// PDF file path or http(s) URL
        source: String,

        /// Zero-based page order, e.g. 2,0,1
        #[arg(long)]
        arrangement: Option<String>,

        /// Quality preset
        #[arg(long, default_value = "medium", value_enum)]
        preset: PresetArg,

        /// Output PDF file (defaults to a name derived from the preset)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PresetArg {
    Low,
    Medium,
    High,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Jpeg,
    Png,
}

impl From<PresetArg> for QualityPreset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Low => Self::Low,
            PresetArg::Medium => Self::Medium,
            PresetArg::High => Self::High,
        }
    }
}

impl From<FormatArg> for ImageFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Jpeg => Self::Jpeg,
            FormatArg::Png => Self::Png,
        }
    }
}

/// One line of the previews manifest
#[derive(Serialize)]
struct ManifestEntry {
    page: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    width: f32,
    height: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    StderrLogger::for_verbosity(cli.verbose).init()?;

    let config = match &cli.config {
        Some(path) => GalleryConfig::load(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => GalleryConfig::default(),
    };

    match cli.command {
        Commands::Info { source } => {
            let document = load_source(&source, &config).await?;
            println!("Pages: {}", document.page_count());
            println!("Fingerprint: {}", document.fingerprint());
            for (index, geometry) in document.geometry().iter().enumerate() {
                println!(
                    "  {:>4}: {} × {} pt",
                    index + 1,
                    geometry.width,
                    geometry.height
                );
            }
        }

        Commands::Previews {
            source,
            output,
            preset,
            quality,
            format,
            palette,
        } => {
            let document = load_source(&source, &config).await?;
            let quality = match (preset, quality) {
                (_, Some(quality)) => quality,
                (Some(preset), None) => QualityPreset::from(preset).jpeg_quality(),
                (None, None) => QualityPreset::default().jpeg_quality(),
            };
            let target = render_target(&config, RenderTarget::from_quality(quality, format.into()))
                .with_reduced_palette(palette);
            write_previews(&document, target, &output, &config).await?;
        }

        Commands::Preview {
            source,
            page,
            output,
            quality,
            format,
        } => {
            let document = load_source(&source, &config).await?;
            let target = render_target(&config, RenderTarget::from_quality(quality, format.into()));
            let (preview, _) = generator(&config)
                .preview_single(&document, page, target)
                .await?;
            tokio::fs::write(&output, preview.image_bytes()).await?;
            println!("Page {} → {}", page, output.display());
        }

        Commands::Extract {
            source,
            pages,
            output,
        } => {
            let document = load_source(&source, &config).await?;
            let pages = parse_pages(&pages)?;
            let extracted = pdf_gallery::extract_pages(&document, &pages)?;
            pdf_gallery::save_pdf(extracted.bytes(), &output).await?;
            println!(
                "Extracted {} pages → {}",
                extracted.page_count(),
                output.display()
            );
        }

        Commands::Export {
            source,
            arrangement,
            preset,
            output,
        } => {
            let document = load_source(&source, &config).await?;
            let preset = QualityPreset::from(preset);
            let arrangement = match arrangement {
                Some(order) => order.parse::<Arrangement>()?,
                None => Arrangement::identity(document.page_count()),
            };

            let target = render_target(&config, preset.render_target());
            let report = generator(&config)
                .generate_report(&document, target, &CancelToken::new())
                .await;
            if report.failed() > 0 {
                eprintln!("{} pages failed to render", report.failed());
            }

            let ordered = arrangement
                .apply(&report.previews)
                .context("Arrangement does not match the document's page count")?;
            let filename = output
                .as_deref()
                .and_then(Path::file_stem)
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            let request = ExportRequest::from_previews(ordered, filename, preset);

            let fetcher = HttpFetcher::new(&config.fetch);
            let outcome = pdf_gallery::export(request, &fetcher, &config.export).await?;
            let output = output.unwrap_or_else(|| PathBuf::from(&outcome.filename));
            pdf_gallery::save_pdf(&outcome.bytes, &output).await?;

            println!(
                "Exported {} pages → {} ({} skipped)",
                outcome.page_count,
                output.display(),
                outcome.skipped.len()
            );
        }

        Commands::Serve { addr } => {
            let state = pdf_gallery_server::AppState::from_config(config);
            pdf_gallery_server::serve(addr, state).await?;
        }
    }

    Ok(())
}

async fn load_source(source: &str, config: &GalleryConfig) -> Result<Document> {
    let document = if pdf_gallery::fetch::is_remote(source) {
        let bytes = HttpFetcher::new(&config.fetch).fetch_pdf(source).await?;
        pdf_gallery::load_bytes(bytes).await?
    } else {
        pdf_gallery::load_pdf(source)
            .await
            .with_context(|| format!("Failed to load {}", source))?
    };
    log::info!(
        "Loaded {} ({} pages, {})",
        source,
        document.page_count(),
        document.fingerprint()
    );
    Ok(document)
}

fn generator(config: &GalleryConfig) -> BatchPreviewGenerator {
    let rasterizer = PageRasterizer::pdfium(config.render.pdfium_library_path.clone());
    BatchPreviewGenerator::new(rasterizer, PreviewCache::from_config(&config.cache))
        .with_concurrency(config.render.concurrency)
}

fn render_target(config: &GalleryConfig, target: RenderTarget) -> RenderTarget {
    target.with_enlargement(!config.render.without_enlargement)
}

/// Parse a comma separated list of 1-indexed page numbers
fn parse_pages(pages: &str) -> Result<Vec<usize>> {
    let parsed = pages
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<usize>()
                .with_context(|| format!("Invalid page number: {}", part))
        })
        .collect::<Result<Vec<_>>>()?;
    if parsed.is_empty() {
        bail!("No pages given");
    }
    Ok(parsed)
}

fn preview_file_name(page_number: usize, format: ImageFormat) -> String {
    format!("page-{:03}.{}", page_number, format.extension())
}

async fn write_previews(
    document: &Document,
    target: RenderTarget,
    output: &Path,
    config: &GalleryConfig,
) -> Result<()> {
    tokio::fs::create_dir_all(output).await?;

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, finishing pages in flight");
            on_interrupt.cancel();
        }
    });

    let mut outcomes = generator(config).generate_all_cancellable(document, target, cancel);
    let mut manifest = Vec::with_capacity(document.page_count());
    let mut failed = 0;

    while let Some(outcome) = outcomes.next().await {
        let preview = &outcome.preview;
        let entry = match &outcome.status {
            Ok(source) => {
                let file = preview_file_name(preview.page_number, target.format);
                tokio::fs::write(output.join(&file), preview.image_bytes()).await?;
                println!(
                    "[{:>3}%] page {} {:?}",
                    (outcome.progress() * 100.0).round(),
                    preview.page_number,
                    source
                );
                ManifestEntry {
                    page: preview.page_number,
                    file: Some(file),
                    width: preview.width,
                    height: preview.height,
                    error: None,
                }
            }
            Err(e) => {
                failed += 1;
                println!(
                    "[{:>3}%] page {} failed: {}",
                    (outcome.progress() * 100.0).round(),
                    preview.page_number,
                    e
                );
                ManifestEntry {
                    page: preview.page_number,
                    file: None,
                    width: preview.width,
                    height: preview.height,
                    error: Some(e.to_string()),
                }
            }
        };
        manifest.push(entry);
    }

    let manifest_path = output.join("previews.json");
    tokio::fs::write(&manifest_path, serde_json::to_vec_pretty(&manifest)?).await?;

    if manifest.len() < document.page_count() {
        println!(
            "Cancelled after {} of {} pages",
            manifest.len(),
            document.page_count()
        );
    }
    println!(
        "Wrote {} previews ({} failed) → {}",
        manifest.len() - failed,
        failed,
        output.display()
    );
    Ok(())
}
