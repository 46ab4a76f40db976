//! CLI binary for edgequake-pdf-ocr.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `OcrConfig` and prints the extracted text.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf_ocr::{
    extract_text, extract_text_to_file, pdf_to_markdown, pdf_to_markdown_file,
    ExtractionProgressCallback, FailurePolicy, OcrConfig, OcrService, PageSelection,
    PageSeparator, ProgressCallback, ProviderSettings,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── Terminal styling ─────────────────────────────────────────────────────────

fn sgr(code: &str, s: &str) -> String {
    format!("\x1b[{code}m{s}\x1b[0m")
}
fn green(s: &str) -> String {
    sgr("32", s)
}
fn red(s: &str) -> String {
    sgr("31", s)
}
fn dim(s: &str) -> String {
    sgr("2", s)
}
fn bold(s: &str) -> String {
    sgr("1", s)
}
fn cyan(s: &str) -> String {
    sgr("36", s)
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live progress bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start time of the page currently being recognised.
    page_started: Mutex<Option<Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_conversion_start` reports the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Recognising");
        self.bar.reset_eta();
    }

    fn page_elapsed_secs(&self) -> f64 {
        self.page_started
            .lock()
            .ok()
            .and_then(|mut started| started.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Recognising {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut started) = self.page_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, text_len: usize) {
        let elapsed = self.page_elapsed_secs();
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{text_len:>5} chars")),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let elapsed = self.page_elapsed_secs();
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Keep the log line on one terminal row.
        let first_line = error.lines().next().unwrap_or_default();
        let msg = if first_line.chars().count() > 80 {
            let head: String = first_line.chars().take(79).collect();
            format!("{head}\u{2026}")
        } else {
            first_line.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        let failed = self.errors.load(Ordering::SeqCst);
        self.bar.finish_and_clear();

        if failed == 0 && success_count == total_pages {
            eprintln!(
                "{} {} pages recognised",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages recognised  ({} failed)",
                if success_count == 0 {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Azure AI Vision, text on stdout
  pdf-ocr --file scan.pdf --service azure

  # Google Cloud Vision, write to a file
  pdf-ocr --file scan.pdf --service google -o scan.txt

  # Amazon Textract, pages 2 to 5 only, in eu-west-1
  pdf-ocr --file scan.pdf --service aws --pages 2-5 --aws-region eu-west-1

  # Keep going when a page fails; failed pages are left out
  pdf-ocr --file book.pdf --service azure --skip-failed-pages -o book.txt

  # Structured output with per-page timings
  pdf-ocr --file scan.pdf --service google --json > scan.json

  # PDF that already has text: Markdown from the text layer, no OCR service
  pdf-ocr --file report.pdf --markdown -o report.md

OUTPUT FORMAT:
  --- Page 1 ---
  <text of page 1>

  --- Page 2 ---
  <text of page 2>

  Change the page header with --separator (banner, hr, comment, none, or any
  text; "{page}" is replaced by the page number).

CREDENTIALS:
  google  Application-default credentials: `gcloud auth application-default login`
          or GOOGLE_APPLICATION_CREDENTIALS=/path/key.json (or --google-credentials).
  azure   AZURE_VISION_ENDPOINT and AZURE_VISION_KEY (or --azure-endpoint/--azure-key).
  aws     The standard AWS chain: AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY, ~/.aws/credentials,
          SSO, or instance roles. Region from AWS_REGION, ~/.aws/config or --aws-region.

ENVIRONMENT VARIABLES:
  PDF_OCR_SERVICE         Default for --service
  AZURE_VISION_ENDPOINT   Azure AI Vision endpoint URL
  AZURE_VISION_KEY        Azure AI Vision subscription key
  PDFIUM_LIB_PATH         Path to libpdfium (otherwise ./ then the system library path)
  RUST_LOG                Log filter, overrides -v / -q
"#;

/// Extract text from scanned PDFs with a cloud OCR service.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-ocr",
    version,
    about = "Extract text from scanned PDFs with Google Cloud Vision, Azure AI Vision or Amazon Textract",
    long_about = "Render every page of a PDF to an image and send it to a cloud OCR service, \
one page at a time and in page order. The recognised text is printed with a header per page.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to the PDF file.
    #[arg(long)]
    file: PathBuf,

    /// OCR service: google, azure, aws.
    #[arg(long, env = "PDF_OCR_SERVICE",
          value_parser = clap::value_parser!(OcrService),
          required_unless_present = "markdown")]
    service: Option<OcrService>,

    /// Convert the PDF's existing text layer to Markdown instead of running OCR.
    #[arg(long, conflicts_with_all = ["json", "skip_failed_pages"])]
    markdown: bool,

    /// Write text to this file instead of stdout.
    #[arg(short, long, env = "PDF_OCR_OUTPUT")]
    output: Option<PathBuf>,

    /// Rendering DPI (72–400).
    #[arg(long, env = "PDF_OCR_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF_OCR_PAGES", default_value = "all",
          value_parser = clap::value_parser!(PageSelection))]
    pages: PageSelection,

    /// Page header: banner, hr, comment, none, or custom text with {page}.
    #[arg(long, env = "PDF_OCR_SEPARATOR", default_value = "banner")]
    separator: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF_OCR_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Leave failed pages out instead of aborting on the first failure.
    #[arg(long, env = "PDF_OCR_SKIP_FAILED")]
    skip_failed_pages: bool,

    /// Output structured JSON (OcrOutput) instead of plain text.
    #[arg(long)]
    json: bool,

    /// Per-call OCR request timeout in seconds.
    #[arg(long, env = "PDF_OCR_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Azure AI Vision endpoint.
    #[arg(long, env = "AZURE_VISION_ENDPOINT")]
    azure_endpoint: Option<String>,

    /// Azure AI Vision key.
    #[arg(long, env = "AZURE_VISION_KEY", hide_env_values = true)]
    azure_key: Option<String>,

    /// Google service-account JSON file (default: application-default credentials).
    #[arg(long, env = "PDF_OCR_GOOGLE_CREDENTIALS")]
    google_credentials: Option<PathBuf>,

    /// AWS region override (default: the AWS config chain).
    #[arg(long)]
    aws_region: Option<String>,

    /// Disable progress bar.
    #[arg(long, env = "PDF_OCR_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF_OCR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF_OCR_QUIET")]
    quiet: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO logs would fight with the progress bar for the terminal.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.markdown;
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    if cli.markdown {
        return write_markdown(&cli, &config).await;
    }
    let service = cli
        .service
        .context("--service is required unless --markdown is given")?;

    // ── Run extraction ───────────────────────────────────────────────────
    match (&cli.output, cli.json) {
        (Some(output_path), false) => {
            let stats = extract_text_to_file(&cli.file, service, output_path, &config)
                .await
                .context("Text extraction failed")?;

            if !cli.quiet {
                eprintln!(
                    "{}  {}/{} pages  {}ms  →  {}",
                    if stats.failed_pages == 0 {
                        green("✔")
                    } else {
                        cyan("⚠")
                    },
                    stats.processed_pages,
                    stats.processed_pages + stats.failed_pages,
                    stats.total_duration_ms,
                    bold(&output_path.display().to_string()),
                );
            }
        }
        (output_path, json) => {
            let output = extract_text(&cli.file, service, &config)
                .await
                .context("Text extraction failed")?;

            let rendered = if json {
                let mut s = serde_json::to_string_pretty(&output)
                    .context("Failed to serialise output")?;
                s.push('\n');
                s
            } else {
                output.text.clone()
            };

            match output_path {
                Some(path) => tokio::fs::write(path, rendered.as_bytes())
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => {
                    let stdout = io::stdout();
                    let mut handle = stdout.lock();
                    handle
                        .write_all(rendered.as_bytes())
                        .and_then(|_| handle.flush())
                        .context("Failed to write to stdout")?;
                }
            }

            if !cli.quiet && !show_progress && !json {
                eprintln!(
                    "Recognised {}/{} pages with {} in {}ms",
                    output.stats.processed_pages,
                    output.stats.processed_pages + output.stats.failed_pages,
                    output.stats.provider,
                    output.stats.total_duration_ms
                );
                if output.stats.failed_pages > 0 {
                    eprintln!("  {} pages failed", output.stats.failed_pages);
                }
            }
        }
    }

    Ok(())
}

/// Map CLI args to `OcrConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<OcrConfig> {
    let providers = ProviderSettings {
        azure_endpoint: cli.azure_endpoint.clone(),
        azure_key: cli.azure_key.clone(),
        google_credentials_path: cli.google_credentials.clone(),
        aws_region: cli.aws_region.clone(),
        api_timeout_secs: cli.api_timeout,
    };

    let mut builder = OcrConfig::builder()
        .dpi(cli.dpi)
        .pages(cli.pages.clone())
        .page_separator(PageSeparator::parse(&cli.separator))
        .failure_policy(if cli.skip_failed_pages {
            FailurePolicy::Skip
        } else {
            FailurePolicy::Abort
        })
        .providers(providers);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `--markdown`: text layer to Markdown, on stdout or into `--output`.
async fn write_markdown(cli: &Cli, config: &OcrConfig) -> Result<()> {
    match &cli.output {
        Some(path) => {
            pdf_to_markdown_file(&cli.file, path, config)
                .await
                .context("Markdown conversion failed")?;
            if !cli.quiet {
                eprintln!("{}  Markdown  →  {}", green("✔"), bold(&path.display().to_string()));
            }
        }
        None => {
            let markdown = pdf_to_markdown(&cli.file, config).context("Markdown conversion failed")?;
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(markdown.as_bytes())
                .and_then(|_| handle.flush())
                .context("Failed to write to stdout")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn service_flag_maps_to_library_enum() {
        let cli = Cli::try_parse_from(["pdf-ocr", "--file", "a.pdf", "--service", "AWS"]).unwrap();
        assert_eq!(cli.service, Some(OcrService::Aws));
        assert_eq!(cli.pages, PageSelection::All);
        assert_eq!(cli.dpi, 200);
        assert_eq!(cli.separator, "banner");
    }

    #[test]
    fn unknown_service_is_rejected_by_the_parser() {
        let err = Cli::try_parse_from(["pdf-ocr", "--file", "a.pdf", "--service", "tesseract"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert!(err.to_string().contains("google, azure, aws"));
    }

    #[test]
    fn pages_flag_uses_the_library_parser() {
        let cli = Cli::try_parse_from([
            "pdf-ocr", "--file", "a.pdf", "--service", "google", "--pages", "2-4",
        ])
        .unwrap();
        assert_eq!(cli.pages, PageSelection::Range(2, 4));

        let err = Cli::try_parse_from([
            "pdf-ocr", "--file", "a.pdf", "--service", "google", "--pages", "4-2",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn service_is_required_without_markdown() {
        let err = Cli::try_parse_from(["pdf-ocr", "--file", "a.pdf"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let cli = Cli::try_parse_from(["pdf-ocr", "--file", "a.pdf", "--markdown"]).unwrap();
        assert!(cli.markdown);
        assert_eq!(cli.service, None);
    }

    #[test]
    fn markdown_conflicts_with_json() {
        let err = Cli::try_parse_from(["pdf-ocr", "--file", "a.pdf", "--markdown", "--json"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn skip_flag_selects_skip_policy() {
        let cli = Cli::try_parse_from([
            "pdf-ocr",
            "--file",
            "a.pdf",
            "--service",
            "azure",
            "--skip-failed-pages",
            "--separator",
            "hr",
        ])
        .unwrap();
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.failure_policy, FailurePolicy::Skip);
        assert_eq!(config.page_separator, PageSeparator::HorizontalRule);
    }
}
