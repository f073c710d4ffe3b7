//! CLI binary for blogbook.
//!
//! A thin shim over the library crate that loads a JSON blog export, maps
//! CLI flags to `WriterConfig` and writes the PDF book.

use anyhow::{Context, Result};
use blogbook::{
    select_posts, BlogFeed, BookWriter, ColorSet, DateRange, FeedImageResolver, FontFamily,
    HttpImageResolver, LayoutOptions, LocalImageResolver, MultiImageLayout, PageGeometry,
    PostOrder, SingleImageLayout, StatusEvent, StatusSink, StyleRegistry, WriterConfig,
};
use chrono::NaiveDate;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI status sink using indicatif ──────────────────────────────────────────

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Terminal status sink: a spinner until the post count is known, then a
/// progress bar with one step per chapter.
struct CliStatusSink {
    bar: ProgressBar,
}

impl CliStatusSink {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} posts  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Writing");
    }
}

impl StatusSink for CliStatusSink {
    fn on_status(&self, event: &StatusEvent) {
        match event {
            StatusEvent::TitlePage => self.bar.set_message(event.to_string()),
            StatusEvent::Content { total_posts } => {
                self.activate_bar(*total_posts);
                self.bar.println(format!(
                    "{} {}",
                    cyan("◆"),
                    bold(&format!("Writing {total_posts} posts…"))
                ));
            }
            StatusEvent::DownloadingImages { images, .. } => {
                self.bar.set_message(format!("fetching {images} images"));
            }
            StatusEvent::WritingPost { chapter, title } => {
                self.bar.set_position(u64::from(chapter.saturating_sub(1)));
                self.bar.set_message(title.clone());
            }
            StatusEvent::Completing => {
                if let Some(len) = self.bar.length() {
                    self.bar.set_position(len);
                }
                self.bar.set_message(event.to_string());
            }
            StatusEvent::Complete => self.bar.finish_and_clear(),
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Whole feed, default layouts (blog.json → blog.pdf)
  blog2pdf blog.json

  # One year, oldest post first
  blog2pdf blog.json --start 2011-01-01 --end 2011-12-31 --order ascending -o 2011.pdf

  # Three-column grids with borders
  blog2pdf blog.json --images-per-row 3 --image-border

  # Properties by their long names
  blog2pdf blog.json --property "Max Leading Images=2" --multi-layout leading

  # Machine-readable summary
  blog2pdf blog.json --json > summary.json

LAYOUTS:
  Single image   wrap-left (default), wrap-right, centered-top, centered-bottom
  Multi image    grid (default), leading, alternate

PROPERTIES (--property KEY=VALUE):
  Images Per Row         columns in the image grid (default 2)
  Max Leading Images     images above the body in the leading layout (default 1)
  Use Image Border       true/false (default false)
  Image Border Width     points (default 10)
  Use Image Background   true/false (default false)
  Single Image Layout    as --single-layout
  Multi Image Layout     as --multi-layout

FEED FORMAT:
  { "title": "...", "posts": [ { "id": "...", "title": "...",
    "published": "2011-03-05T08:00:00-05:00", "content": "...",
    "images": [ { "source": "img/a.jpg" } ], "comment_count": 1,
    "comments": [ { "author": "...", "text": "..." } ] } ] }

  Relative image paths resolve against --base-dir (default: the feed's
  directory). http(s) URLs are downloaded.
"#;

/// Render a blog export into a paginated PDF book.
#[derive(Parser, Debug)]
#[command(
    name = "blog2pdf",
    version,
    about = "Render a blog export into a paginated PDF book",
    long_about = "Render a JSON blog export into a print-ready PDF: a title page, one chapter \
per post with its photos laid out around the text, page numbers, bookmarks and blank binding \
pages at the end.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// JSON blog export.
    #[arg(required_unless_present = "list_fonts")]
    input: Option<PathBuf>,

    /// Write the PDF here (default: the input path with a .pdf extension).
    #[arg(short, long, env = "BLOG2PDF_OUTPUT")]
    output: Option<PathBuf>,

    /// Book title (default: the feed title).
    #[arg(long, env = "BLOG2PDF_TITLE")]
    title: Option<String>,

    /// First day to include, YYYY-MM-DD (default: earliest post).
    #[arg(long, env = "BLOG2PDF_START")]
    start: Option<NaiveDate>,

    /// Last day to include, YYYY-MM-DD (default: latest post).
    #[arg(long, env = "BLOG2PDF_END")]
    end: Option<NaiveDate>,

    /// Chapter order by publish date.
    #[arg(long, env = "BLOG2PDF_ORDER", value_enum, default_value = "descending")]
    order: OrderArg,

    /// Layout for posts with one image.
    #[arg(long, env = "BLOG2PDF_SINGLE_LAYOUT")]
    single_layout: Option<SingleImageLayout>,

    /// Layout for posts with several images.
    #[arg(long, env = "BLOG2PDF_MULTI_LAYOUT")]
    multi_layout: Option<MultiImageLayout>,

    /// Columns in the image grid.
    #[arg(long, env = "BLOG2PDF_IMAGES_PER_ROW",
          value_parser = clap::value_parser!(u32).range(1..=8))]
    images_per_row: Option<u32>,

    /// Images centered above the body in the leading layout.
    #[arg(long, env = "BLOG2PDF_LEADING_IMAGES")]
    leading_images: Option<usize>,

    /// Draw a border around every image.
    #[arg(long, env = "BLOG2PDF_IMAGE_BORDER")]
    image_border: bool,

    /// Border width in points.
    #[arg(long, env = "BLOG2PDF_IMAGE_BORDER_WIDTH")]
    image_border_width: Option<f32>,

    /// Fill grid cells with the image background color.
    #[arg(long, env = "BLOG2PDF_IMAGE_BACKGROUND")]
    image_background: bool,

    /// Layout property by name, e.g. "Images Per Row=3". Repeatable.
    #[arg(long = "property", value_name = "KEY=VALUE")]
    properties: Vec<String>,

    /// Leave comments out.
    #[arg(long, env = "BLOG2PDF_NO_COMMENTS")]
    no_comments: bool,

    /// Do not pad the end of the book with blank pages.
    #[arg(long, env = "BLOG2PDF_NO_TRAILING_BLANK")]
    no_trailing_blank: bool,

    /// Page size.
    #[arg(long, env = "BLOG2PDF_PAGE_SIZE", value_enum, default_value = "a4")]
    page_size: PageSizeArg,

    /// Font family for every text style.
    #[arg(long, env = "BLOG2PDF_FONT", value_enum, default_value = "helvetica")]
    font: FontArg,

    /// JSON file with a full font/color registry (overrides --font).
    #[arg(long, env = "BLOG2PDF_STYLE")]
    style: Option<PathBuf>,

    /// Directory relative image paths resolve against.
    #[arg(long, env = "BLOG2PDF_BASE_DIR")]
    base_dir: Option<PathBuf>,

    /// HTTP image download timeout in seconds.
    #[arg(long, env = "BLOG2PDF_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print the write summary as JSON on stdout.
    #[arg(long, env = "BLOG2PDF_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "BLOG2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// List the available font families and exit.
    #[arg(long)]
    list_fonts: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "BLOG2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "BLOG2PDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OrderArg {
    Ascending,
    Descending,
}

impl From<OrderArg> for PostOrder {
    fn from(v: OrderArg) -> Self {
        match v {
            OrderArg::Ascending => PostOrder::Ascending,
            OrderArg::Descending => PostOrder::Descending,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PageSizeArg {
    A4,
    Letter,
}

impl From<PageSizeArg> for PageGeometry {
    fn from(v: PageSizeArg) -> Self {
        match v {
            PageSizeArg::A4 => PageGeometry::A4,
            PageSizeArg::Letter => PageGeometry::LETTER,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FontArg {
    Helvetica,
    Times,
    Courier,
}

impl From<FontArg> for FontFamily {
    fn from(v: FontArg) -> Self {
        match v {
            FontArg::Helvetica => FontFamily::Helvetica,
            FontArg::Times => FontFamily::TimesRoman,
            FontArg::Courier => FontFamily::Courier,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless --verbose asks for them.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Font listing ─────────────────────────────────────────────────────
    if cli.list_fonts {
        for family in FontFamily::all() {
            println!("{}", family.name());
        }
        return Ok(());
    }

    let input = cli
        .input
        .clone()
        .context("An input feed is required")?;

    // ── Load feed ────────────────────────────────────────────────────────
    let raw = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read feed {}", input.display()))?;
    let feed = BlogFeed::from_json(&raw)
        .with_context(|| format!("Failed to parse feed {}", input.display()))?;

    let spanning = DateRange::spanning(&feed.posts);
    let range = match (cli.start, cli.end, spanning) {
        (Some(start), Some(end), _) => DateRange::new(start, end),
        (start, end, Some(span)) => {
            DateRange::new(start.unwrap_or(span.start), end.unwrap_or(span.end))
        }
        (_, _, None) => anyhow::bail!("The feed {} has no posts", input.display()),
    };
    if range.start > range.end {
        anyhow::bail!("--start {} is after --end {}", range.start, range.end);
    }
    let posts = select_posts(&feed.posts, range, cli.order.into());
    if posts.is_empty() && !cli.quiet {
        eprintln!(
            "{} no posts between {} and {}",
            yellow("⚠"),
            range.start,
            range.end
        );
    }

    // ── Build config ─────────────────────────────────────────────────────
    let sink = show_progress.then(CliStatusSink::new);
    let config = build_config(&cli, sink.clone())?;

    let base_dir = cli
        .base_dir
        .clone()
        .or_else(|| input.parent().map(|p| p.to_path_buf()))
        .unwrap_or_default();
    let resolver = FeedImageResolver::new(
        LocalImageResolver::new(base_dir),
        HttpImageResolver::new(cli.download_timeout).context("Failed to set up HTTP client")?,
    );

    // ── Write ────────────────────────────────────────────────────────────
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| input.with_extension("pdf"));
    let title = cli.title.clone().unwrap_or_else(|| feed.title.clone());

    let result = BookWriter::new(config).write_to_file(&title, range, &posts, &resolver, &output);
    if let Some(sink) = &sink {
        sink.bar.finish_and_clear();
    }
    let summary = result.context("Writing the book failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?;
        println!("{json}");
        return Ok(());
    }

    if !cli.quiet {
        for (chapter, skipped) in summary.skipped() {
            eprintln!("  {} chapter {:>3}  {}", yellow("⚠"), chapter, dim(&skipped.to_string()));
        }
        eprintln!(
            "{}  {} chapters  {} pages  {}/{} images  {}ms  →  {}",
            green("✔"),
            summary.chapters.len(),
            summary.physical_pages,
            summary.images_rendered(),
            summary.images_requested(),
            summary.duration_ms,
            bold(&output.display().to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `WriterConfig`.
fn build_config(cli: &Cli, sink: Option<Arc<CliStatusSink>>) -> Result<WriterConfig> {
    let styles = match &cli.style {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read style file {}", path.display()))?;
            serde_json::from_str::<StyleRegistry>(&raw)
                .with_context(|| format!("Invalid style file {}", path.display()))?
        }
        None => StyleRegistry::with_family(cli.font.into(), ColorSet::default()),
    };

    let mut layout = LayoutOptions::builder();
    if let Some(single) = cli.single_layout {
        layout = layout.single_image(single);
    }
    if let Some(multi) = cli.multi_layout {
        layout = layout.multi_image(multi);
    }
    if let Some(n) = cli.images_per_row {
        layout = layout.images_per_row(n as usize);
    }
    if let Some(n) = cli.leading_images {
        layout = layout.leading_images(n);
    }
    if cli.image_border {
        layout = layout.image_border(true);
    }
    if let Some(width) = cli.image_border_width {
        layout = layout.image_border_width(width);
    }
    if cli.image_background {
        layout = layout.use_image_background(true);
    }
    for property in &cli.properties {
        let (key, value) = property
            .split_once('=')
            .with_context(|| format!("Expected KEY=VALUE, got '{property}'"))?;
        layout
            .apply_property(key.trim(), value.trim())
            .context("Invalid --property")?;
    }

    let mut builder = WriterConfig::builder()
        .geometry(cli.page_size.into())
        .include_comments(!cli.no_comments)
        .trailing_blank(!cli.no_trailing_blank)
        .styles(Arc::new(styles))
        .layout(layout.build());

    if let Some(sink) = sink {
        builder = builder.status_sink(sink);
    }

    builder.build().context("Invalid configuration")
}
