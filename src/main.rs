use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::{Parser, ValueEnum};
use serde_json::json;
use strip_restore::config::{RestoreConfig, parse_duration, parse_header};
use strip_restore::error::classify;
use strip_restore::{
    DirStorage, HasRecoverySuggestion, HasSeverity, HttpFetcher, RestoreError, RestoreResult,
    RestoredImage, Restorer, Retryable, SourceRequest,
};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// Restore strip-scrambled images.
///
/// Each URL is fetched, reassembled into its original strip order, re-encoded as
/// JPEG and cached under the MD5 of the URL. Cached URLs are served without a fetch.
#[derive(Parser, Debug)]
#[command(name = "restore")]
#[command(about = "Restore strip-scrambled images into their original layout")]
struct Args {
    /// Source URLs, e.g. https://cdn.example.com/media/photos/300000/00005.webp
    #[arg(required = true)]
    urls: Vec<String>,

    /// Directory for restored images
    #[arg(long, default_value = "restored")]
    cache_dir: PathBuf,

    /// Directory for transient downloads (defaults to the system temp dir)
    #[arg(long)]
    scratch_dir: Option<PathBuf>,

    /// Fetch timeout: 500ms, 30s, 2m, 1h or bare seconds
    #[arg(short, long, default_value = "30s")]
    timeout: String,

    /// JPEG quality of the restored image (1-100)
    #[arg(short, long, default_value_t = 90)]
    quality: u8,

    /// Referer header sent with every fetch
    #[arg(long)]
    referer: Option<String>,

    /// User-Agent header sent with every fetch
    #[arg(long)]
    user_agent: Option<String>,

    /// Cookie header sent with every fetch
    #[arg(long)]
    cookie: Option<String>,

    /// Extra request header, "Name: value" (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// What to print for each URL
    #[arg(long, value_enum, default_value_t = Emit::Path)]
    emit: Emit,

    /// Also copy the restored image here (single URL only)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// Path of the cached image
    Path,
    /// Image bytes as base64
    Base64,
    /// {"status":200,"result":<base64>,"msg":""} envelope, one per line
    Json,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if args.output.is_some() && args.urls.len() != 1 {
        bail!("--output needs exactly one URL, got {}", args.urls.len());
    }

    let config = build_config(&args)?;
    config.validate().map_err(anyhow::Error::msg)?;

    let restorer = Restorer::new(
        HttpFetcher::new(&config)?,
        DirStorage::new(&config.cache_dir),
        config.to_restore_options(),
    );
    restorer
        .ping()
        .await
        .with_context(|| format!("cache directory {} is not usable", config.cache_dir.display()))?;

    let requests: Vec<SourceRequest> = args.urls.iter().map(SourceRequest::new).collect();
    let results = restorer.handle_many(&requests).await;

    let mut failed = 0usize;
    for (request, result) in requests.iter().zip(&results) {
        if result.is_err() {
            failed += 1;
        }
        emit(args.emit, request, result);
    }

    if let (Some(output), [Ok(image)]) = (&args.output, results.as_slice()) {
        tokio::fs::write(output, &image.bytes)
            .await
            .with_context(|| format!("failed to write {}", output.display()))?;
    }

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn build_config(args: &Args) -> Result<RestoreConfig> {
    let mut config = RestoreConfig::new(&args.cache_dir);
    config.scratch_dir = args.scratch_dir.clone();
    config.fetch_timeout = parse_duration(&args.timeout).map_err(anyhow::Error::msg)?;
    config.jpeg_quality = args.quality;
    config.referer = args.referer.clone();
    config.cookie = args.cookie.clone();
    if let Some(user_agent) = &args.user_agent {
        config.user_agent = user_agent.clone();
    }
    config.headers = args
        .headers
        .iter()
        .map(|h| parse_header(h))
        .collect::<Result<_, _>>()
        .map_err(anyhow::Error::msg)?;
    Ok(config)
}

fn emit(mode: Emit, request: &SourceRequest, result: &RestoreResult<RestoredImage>) {
    match (mode, result) {
        (Emit::Path, Ok(image)) => println!("{}", image.entry.path.display()),
        (Emit::Base64, Ok(image)) => println!("{}", STANDARD.encode(&image.bytes)),
        (Emit::Json, Ok(image)) => println!(
            "{}",
            json!({ "status": 200, "result": STANDARD.encode(&image.bytes), "msg": "" })
        ),
        (Emit::Json, Err(e)) => {
            report(request, e);
            println!(
                "{}",
                json!({ "status": 200, "result": "", "msg": e.to_string() })
            );
        }
        (_, Err(e)) => report(request, e),
    }
}

/// Log a failed URL on stderr with whatever the error knows about recovery.
fn report(request: &SourceRequest, e: &RestoreError) {
    let hint = e.recovery_suggestion().unwrap_or("");
    if classify::is_internal(e) {
        error!(
            url = %request.url,
            category = e.category(),
            severity = ?e.severity(),
            "{} (this is a bug, please report it)",
            e
        );
    } else if classify::is_transient(e) {
        warn!(
            url = %request.url,
            category = e.category(),
            retry_after_ms = e.retry_delay_ms(),
            hint,
            "{}",
            e
        );
    } else if classify::is_caller_error(e) {
        warn!(url = %request.url, category = e.category(), "{}; skipping", e);
    } else {
        error!(url = %request.url, category = e.category(), hint, "{}", e);
    }
}
