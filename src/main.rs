//! # Email Probe CLI
//!
//! Command-line interface for the Email Probe library (`email_probe_core`).
//! Validates a single address, or a file of addresses through the task
//! registry with a progress bar, and writes JSON result records.

use email_probe_core::{
    check_smtp_connectivity, initialize_validator, validate_single_email, Config, ConfigBuilder,
    FileAddressSource, ResultRecord, TaskRegistry, TaskStatus, ValidationResult,
};

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Checks whether email addresses are deliverable without sending mail.",
    long_about = "Email Probe validates syntax, looks up MX records, asks the mail servers whether they would accept the recipient (RCPT TO, no DATA) and flags catch-all, disposable and role addresses."
)]
struct AppArgs {
    /// Single address to validate (enables single address mode).
    #[arg(short, long, env = "EMAIL_PROBE_EMAIL", conflicts_with = "input")]
    email: Option<String>,

    /// Input file with one address per line, or a JSON array of strings.
    #[arg(short, long, env = "EMAIL_PROBE_INPUT")]
    input: Option<String>,

    /// Path to the output JSON file where results will be saved.
    #[arg(short, long, default_value = "results.json", env = "EMAIL_PROBE_OUTPUT")]
    output: String,

    /// Print results to standard output instead of writing the output file.
    #[arg(long, default_value = "false", env = "EMAIL_PROBE_STDOUT")]
    stdout: bool,

    /// Path to a configuration file (TOML format). CLI args override file settings.
    #[arg(long, env = "EMAIL_PROBE_CONFIG")]
    config_file: Option<String>,

    /// Maximum number of concurrent validations.
    #[arg(short, long, env = "EMAIL_PROBE_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Number of addresses per progress batch.
    #[arg(long, env = "EMAIL_PROBE_BATCH_SIZE")]
    batch_size: Option<usize>,

    /// SMTP connection/command timeout in seconds.
    #[arg(long, env = "EMAIL_PROBE_SMTP_TIMEOUT")]
    smtp_timeout: Option<u64>,

    /// Number of full MX scans before an address is given up on.
    #[arg(long, env = "EMAIL_PROBE_SMTP_RETRIES")]
    smtp_retries: Option<u32>,

    /// DNS resolution timeout in seconds.
    #[arg(long, env = "EMAIL_PROBE_DNS_TIMEOUT")]
    dns_timeout: Option<u64>,

    /// Comma-separated list of DNS servers to use for lookups.
    #[arg(long, value_delimiter = ',', env = "EMAIL_PROBE_DNS_SERVERS")]
    dns_servers: Option<Vec<String>>,

    /// How long domain and catch-all verdicts are reused, in seconds.
    #[arg(long, env = "EMAIL_PROBE_CACHE_TTL")]
    cache_ttl: Option<u64>,

    /// Newline-delimited list of disposable domains.
    #[arg(long, env = "EMAIL_PROBE_DISPOSABLE_LIST")]
    disposable_list: Option<String>,

    /// Comma-separated local-part prefixes that mark role accounts.
    #[arg(long, value_delimiter = ',', env = "EMAIL_PROBE_ROLE_PREFIXES")]
    role_prefixes: Option<Vec<String>>,

    /// Treat accepted addresses on catch-all domains as valid.
    #[arg(long, action = clap::ArgAction::SetTrue, env = "EMAIL_PROBE_ALLOW_CATCH_ALL")]
    allow_catch_all: Option<bool>,

    /// Skip the outbound port 25 self-test.
    #[arg(long, default_value = "false", env = "EMAIL_PROBE_SKIP_CONNECTIVITY_CHECK")]
    skip_connectivity_check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_thread_names(true)
        .with_target(true)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Setting up tracing subscriber failed")?;

    tracing::info!("Email Probe CLI v{} starting...", env!("CARGO_PKG_VERSION"));

    let args = AppArgs::parse();
    tracing::debug!("Parsed CLI arguments: {:?}", args);

    if args.email.is_none() && args.input.is_none() {
        return Err(anyhow::anyhow!(
            "Nothing to do: pass --email <ADDRESS> or --input <FILE>"
        ));
    }

    let config = match build_config(&args) {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            return Err(anyhow::anyhow!("Failed to build configuration: {}", e));
        }
    };
    tracing::debug!("Effective configuration loaded: {:?}", *config);

    if !args.skip_connectivity_check {
        match check_smtp_connectivity(&config).await {
            Ok(_) => tracing::info!(
                "SMTP connectivity test passed (outbound port {} likely open).",
                config.smtp_port
            ),
            Err(e) => {
                tracing::error!("SMTP connectivity test failed: {}", e);
                tracing::warn!("SMTP probes may fail and report addresses as undeliverable.");
                tracing::warn!("Check firewall rules or ISP restrictions on outbound port {}.", config.smtp_port);
            }
        }
    }

    let validator = initialize_validator(Arc::clone(&config))
        .await
        .map(Arc::new)
        .map_err(|e| {
            tracing::error!("Initialization error: {}", e);
            anyhow::anyhow!("Failed to initialize the validator: {}", e)
        })?;

    let start_time = Instant::now();
    let execution_result = match args.email.as_deref() {
        Some(email) => process_single_mode(&validator, email, &args).await,
        None => process_file_mode(validator, &args, start_time).await,
    };

    if let Err(e) = execution_result {
        tracing::error!("Execution failed: {}", e);
        return Err(e);
    }

    tracing::info!("Finished. Total duration: {:.2?}", start_time.elapsed());
    Ok(())
}

fn build_config(args: &AppArgs) -> email_probe_core::Result<Config> {
    let mut config_builder = ConfigBuilder::new();

    if let Some(ref path) = args.config_file {
        config_builder = config_builder.config_file(path);
    }
    if let Some(c) = args.concurrency {
        config_builder = config_builder.max_workers(c);
    }
    if let Some(b) = args.batch_size {
        config_builder = config_builder.batch_size(b);
    }
    if let Some(t) = args.smtp_timeout {
        config_builder = config_builder.smtp_timeout(Duration::from_secs(t));
    }
    if let Some(r) = args.smtp_retries {
        config_builder = config_builder.smtp_retries(r);
    }
    if let Some(t) = args.dns_timeout {
        config_builder = config_builder.dns_timeout(Duration::from_secs(t));
    }
    if let Some(ref servers) = args.dns_servers {
        if !servers.is_empty() {
            config_builder = config_builder.dns_servers(servers.clone());
        }
    }
    if let Some(ttl) = args.cache_ttl {
        config_builder = config_builder.cache_ttl(Duration::from_secs(ttl));
    }
    if let Some(ref path) = args.disposable_list {
        config_builder = config_builder.disposable_domains_path(path);
    }
    if let Some(ref prefixes) = args.role_prefixes {
        config_builder = config_builder.role_prefixes(prefixes.clone());
    }
    if args.allow_catch_all == Some(true) {
        config_builder = config_builder.catch_all_invalidates(false);
    }

    config_builder.build()
}

async fn process_single_mode(
    validator: &email_probe_core::EmailValidator,
    email: &str,
    args: &AppArgs,
) -> Result<()> {
    tracing::info!("Running in single address mode.");
    let result = validate_single_email(validator, email).await;

    if args.stdout {
        print_cli_result(&result);
    } else {
        tracing::info!("Saving result to '{}'...", args.output);
        prepare_output(&args.output)?;
        save_results(&[result.to_record()], &args.output)?;
        tracing::info!("Result saved successfully to '{}'.", args.output);
    }
    Ok(())
}

async fn process_file_mode(
    validator: Arc<email_probe_core::EmailValidator>,
    args: &AppArgs,
    start_time: Instant,
) -> Result<()> {
    let input = args
        .input
        .as_deref()
        .context("File mode requires --input")?;
    tracing::info!("Running in file mode. Input: '{}', Output: '{}'", input, args.output);

    if !args.stdout {
        prepare_output(&args.output)?;
    }

    let source = FileAddressSource::open(input)
        .with_context(|| format!("Cannot open input file '{}'", input))?;
    let registry = TaskRegistry::new(validator);
    let handle = registry.submit_source(source, args.concurrency);

    let pb = ProgressBar::new(0);
    pb.set_style(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) | ETA: {eta} | {msg}")
        .context("Failed to set progress bar template")?
        .progress_chars("=> "));
    pb.set_message("Validating addresses...");

    let report = loop {
        let report = registry.poll(&handle)?;
        pb.set_length(report.total_rows as u64);
        pb.set_position(report.processed_rows as u64);
        if report.status.is_terminal() {
            break report;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    };

    if report.status == TaskStatus::Failed {
        pb.abandon_with_message("Failed");
        return Err(anyhow::anyhow!(
            "Task {} failed: {}",
            handle,
            report.error.unwrap_or_default()
        ));
    }
    pb.finish_with_message(format!("Validated {} addresses", report.processed_rows));

    let results = registry.results(&handle)?;
    let records: Vec<ResultRecord> = results.iter().map(ValidationResult::to_record).collect();

    if args.stdout {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        serde_json::to_writer_pretty(&mut lock, &records).context("Failed to write results to stdout")?;
        writeln!(lock)?;
    } else {
        tracing::info!("Saving results to '{}'...", args.output);
        save_results(&records, &args.output)?;
        tracing::info!("Results saved successfully.");
    }

    log_summary(&results, start_time.elapsed());
    Ok(())
}

/// Creates the output directory if needed and checks the file is writable.
fn prepare_output(output: &str) -> Result<()> {
    let output_path = Path::new(output);
    if let Some(parent_dir) = output_path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            tracing::debug!("Creating output directory: {}", parent_dir.display());
            std::fs::create_dir_all(parent_dir).with_context(|| {
                format!("Failed to create output directory '{}'", parent_dir.display())
            })?;
        }
    }
    File::create(output)
        .with_context(|| format!("Cannot write to output file '{}'. Check permissions.", output))?;
    Ok(())
}

/// Saves the result records as pretty-printed JSON.
fn save_results(records: &[ResultRecord], file_path: &str) -> Result<()> {
    let file = File::create(file_path)
        .with_context(|| format!("Failed to create/truncate output file '{}'", file_path))?;
    let writer = BufWriter::new(file);

    tracing::debug!("Writing {} results as JSON to file: {}", records.len(), file_path);
    serde_json::to_writer_pretty(writer, records)
        .with_context(|| format!("Failed to serialize results to JSON for '{}'", file_path))?;

    Ok(())
}

fn log_summary(results: &[ValidationResult], duration: Duration) {
    let total = results.len();
    let count = |pred: fn(&ValidationResult) -> bool| results.iter().filter(|r| pred(r)).count();

    tracing::info!("-------------------- Validation Summary --------------------");
    tracing::info!("Addresses Validated         : {}", total);
    tracing::info!("  - Valid                   : {}", count(|r| r.is_valid));
    tracing::info!("  - Invalid Syntax          : {}", count(|r| !r.syntax_valid));
    tracing::info!("  - Disposable              : {}", count(|r| r.is_disposable));
    tracing::info!("  - Role Accounts           : {}", count(|r| r.is_role));
    tracing::info!("  - No MX / Bad Domain      : {}", count(|r| r.syntax_valid && !r.is_disposable && !r.domain_valid));
    tracing::info!("  - Refused by Server       : {}", count(|r| r.domain_valid && !r.smtp_valid));
    tracing::info!("  - Catch-all Domain        : {}", count(|r| r.is_catch_all));
    tracing::info!("Total Time Taken            : {:.2?}", duration);
    if duration.as_secs_f64() > 0.01 && total > 0 {
        let rate = (total as f64) / duration.as_secs_f64();
        tracing::info!("Processing Rate             : {:.2} addresses/sec", rate);
    }
    tracing::info!("----------------------------------------------------------");
}

/// Prints the result for a single address to standard output.
fn print_cli_result(result: &ValidationResult) {
    const BLUE: &str = "\x1b[34m";
    const GREEN: &str = "\x1b[32m";
    const YELLOW: &str = "\x1b[33m";
    const RED: &str = "\x1b[31m";
    const RESET: &str = "\x1b[0m";

    let mark = |flag: bool| if flag { format!("{GREEN}yes{RESET}") } else { format!("{RED}no{RESET}") };
    let warn = |flag: bool| if flag { format!("{YELLOW}yes{RESET}") } else { "no".to_string() };

    println!("\n{BLUE}===== Email Probe Result ====={RESET}");
    println!("Email:       {}", result.email);
    println!("Syntax:      {}", mark(result.syntax_valid));
    println!("Domain (MX): {}", mark(result.domain_valid));
    println!("SMTP:        {}", mark(result.smtp_valid));
    println!("Disposable:  {}", warn(result.is_disposable));
    println!("Role:        {}", warn(result.is_role));
    println!("Catch-all:   {}", warn(result.is_catch_all));

    if result.is_valid {
        println!("\n{GREEN}Status: VALID{RESET}");
    } else {
        println!("\n{RED}Status: NOT VALID{RESET}");
    }
    if !result.errors.is_empty() {
        println!("Errors:      {}", result.errors.join("; "));
    }
    println!("{BLUE}=============================={RESET}\n");
}
