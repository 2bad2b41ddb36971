use clap::Parser;
use console::style;
use shared_utils::logging::{init_logging, LogConfig};
use shared_utils::{install_panic_handler, report_failure};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

use vid_shrink::{
    AdaptiveEncoder, AttemptResult, CompressionTarget, EngineConfig, FfmpegEngine, FileSize,
    SearchLimits, SearchOutcome, SearchReport, ShrinkError, ThreadPolicy,
};

/// Largest `--max-size-mb` whose byte count still fits in a u64
const MAX_SIZE_MB: u64 = u64::MAX / (1024 * 1024);

#[derive(Parser)]
#[command(name = "compress")]
#[command(version, about = "Shrink a video under a size limit (ffmpeg + libx264)", long_about = None)]
struct Cli {
    #[arg(value_name = "INPUT")]
    input: PathBuf,
    /// Defaults to overwriting INPUT once a small enough encode exists
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u64).range(1..=MAX_SIZE_MB))]
    max_size_mb: u64,
    #[arg(long, default_value_t = shared_utils::DEFAULT_MAX_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: u32,
    #[arg(long, default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: u64,
    /// Encoder thread count (default: 1 on Linux, encoder default elsewhere)
    #[arg(long, conflicts_with = "all_threads")]
    threads: Option<usize>,
    /// Let the encoder use every core
    #[arg(long)]
    all_threads: bool,
    #[arg(long, value_name = "PATH", default_value = "ffmpeg")]
    ffmpeg: PathBuf,
    /// Print the search report as JSON on stdout
    #[arg(long)]
    json: bool,
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn thread_policy(&self) -> ThreadPolicy {
        match (self.threads, self.all_threads) {
            (_, true) => ThreadPolicy::Unbounded,
            (Some(n), false) => ThreadPolicy::Fixed(n),
            (None, false) => ThreadPolicy::Auto,
        }
    }

    fn limits(&self) -> SearchLimits {
        SearchLimits::default()
            .with_size_threshold(FileSize::from_mb(self.max_size_mb))
            .with_max_attempts(self.max_attempts)
            .with_attempt_timeout(Duration::from_secs(self.timeout_secs))
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    if let Err(e) = init_logging("vid_shrink", LogConfig::default().with_level(level)) {
        eprintln!("⚠️  Could not initialise logging: {:#}", e);
    }
    install_panic_handler();

    let target = CompressionTarget::new(&cli.input, cli.output.clone());
    let engine_config = EngineConfig::default()
        .with_ffmpeg_path(&cli.ffmpeg)
        .with_thread_policy(cli.thread_policy());
    let encoder = AdaptiveEncoder::new(FfmpegEngine::new(engine_config), cli.limits());

    let result = encoder.compress(&target);

    if cli.json {
        print_json(&result);
    }

    let exit_code = match result {
        Ok(outcome) => {
            let success = outcome.is_success();
            if !cli.json {
                print_summary(outcome.report(), success);
            }
            match outcome.into_result() {
                Ok(_) => 0,
                Err(e) => {
                    fail(&e);
                    1
                }
            }
        }
        Err(e) => {
            fail(&e);
            1
        }
    };

    std::process::exit(exit_code);
}

fn fail(error: &ShrinkError) {
    report_failure(error, error.category(), error.suggestion());
}

fn print_json(result: &vid_shrink::Result<SearchOutcome>) {
    let rendered = match result {
        Ok(outcome) => serde_json::to_string_pretty(outcome),
        Err(e) => serde_json::to_string_pretty(&serde_json::json!({
            "status": "error",
            "error": e.to_string(),
        })),
    };
    match rendered {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("⚠️  Could not serialise report: {}", e),
    }
}

fn print_summary(report: &SearchReport, success: bool) {
    println!();
    println!("📊 Size Search Report");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📁 Input:  {}", report.target.input().display());
    println!("📁 Output: {}", report.target.output().display());
    println!("💾 Original: {}  →  limit {}", report.original_size, report.threshold);
    println!();

    for record in &report.attempts {
        let verdict = match &record.result {
            AttemptResult::Fit { size } => style(format!("✅ {}", size)).green().to_string(),
            AttemptResult::Oversized { size } => style(format!("📏 {}", size)).yellow().to_string(),
            AttemptResult::EngineFailed { exit_code, .. } => style(format!(
                "⚠️ encoder failed (exit {})",
                exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string())
            ))
            .red()
            .to_string(),
        };
        println!("  #{:<3} {:<40} {}", record.index, record.params.to_string(), verdict);
    }

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    match (success, report.final_size, report.final_params) {
        (true, Some(size), Some(params)) => {
            println!(
                "{} {} ({})",
                style("✅ Done:").green().bold(),
                size,
                params
            );
            if let Some(ratio) = size.compression_ratio(report.original_size) {
                println!("   Size: {:.1}% of original", ratio * 100.0);
            }
        }
        _ => println!(
            "{} no configuration fit under {}",
            style("❌ Failed:").red().bold(),
            report.threshold
        ),
    }
}
