//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use wikimirror_client::ApiClient;
use wikimirror_export::{Exporter, ProgressReporter, RunSummary};
use wikimirror_shared::{
    AppConfig, ExportConfig, init_config, load_config, resolve_api_token,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// wikimirror — mirror a hosted knowledge base to local files.
#[derive(Parser)]
#[command(
    name = "wikimirror",
    version,
    about = "Mirror spaces, pages, and attachments from a hosted knowledge base to local files.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Export spaces, pages, and attachments to a local directory.
    Export {
        /// Site domain, e.g. yourcompany.atlassian.net.
        #[arg(long, env = "WIKIMIRROR_DOMAIN")]
        domain: Option<String>,

        /// Account email used for API authentication.
        #[arg(long, env = "WIKIMIRROR_EMAIL")]
        email: Option<String>,

        /// Output directory for the mirrored tree.
        #[arg(short, long)]
        out: Option<String>,

        /// Also convert page bodies to Markdown with frontmatter.
        #[arg(long)]
        markdown: bool,

        /// Export at most this many randomly chosen spaces (0 = all).
        #[arg(long)]
        sample_spaces: Option<usize>,

        /// Export at most this many randomly chosen pages per space (0 = all).
        #[arg(long)]
        sample_pages: Option<usize>,

        /// Concurrent page exports per space.
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "wikimirror=info",
        1 => "wikimirror=debug",
        _ => "wikimirror=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Export {
            domain,
            email,
            out,
            markdown,
            sample_spaces,
            sample_pages,
            concurrency,
        } => {
            cmd_export(ExportFlags {
                domain,
                email,
                out,
                markdown,
                sample_spaces,
                sample_pages,
                concurrency,
            })
            .await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Export flags bundled for merging with the config file.
struct ExportFlags {
    domain: Option<String>,
    email: Option<String>,
    out: Option<String>,
    markdown: bool,
    sample_spaces: Option<usize>,
    sample_pages: Option<usize>,
    concurrency: Option<usize>,
}

async fn cmd_export(flags: ExportFlags) -> Result<()> {
    let config = load_config()?;

    let domain = flags
        .domain
        .or_else(|| (!config.site.domain.is_empty()).then(|| config.site.domain.clone()))
        .ok_or_else(|| eyre!("no site domain: pass --domain or set site.domain in the config"))?;
    let email = flags
        .email
        .or_else(|| (!config.site.email.is_empty()).then(|| config.site.email.clone()))
        .ok_or_else(|| eyre!("no account email: pass --email or set site.email in the config"))?;
    let token = resolve_api_token(&config)?;

    let mut export_config = ExportConfig::from(&config);
    if let Some(out) = flags.out {
        export_config.output_dir = PathBuf::from(out);
    }
    if flags.markdown {
        export_config.export_markdown = true;
    }
    if let Some(n) = flags.sample_spaces {
        export_config.sample_spaces = n;
    }
    if let Some(n) = flags.sample_pages {
        export_config.sample_pages = n;
    }
    if let Some(n) = flags.concurrency {
        export_config.page_concurrency = n;
    }

    info!(
        domain,
        out = %export_config.output_dir.display(),
        markdown = export_config.export_markdown,
        "starting export"
    );

    let client = ApiClient::new(&domain, &email, &token)?;
    let exporter = Exporter::new(client, export_config).with_domain(&domain);

    let reporter = Arc::new(CliProgress::new());
    let summary = exporter.run(reporter).await?;

    println!();
    println!("  Export complete!");
    println!(
        "  Spaces:      {} exported, {} skipped, {} failed",
        summary.spaces_exported, summary.spaces_skipped, summary.spaces_failed
    );
    println!(
        "  Pages:       {} exported, {} skipped, {} failed",
        summary.pages_exported, summary.pages_skipped, summary.pages_failed
    );
    println!(
        "  Attachments: {} downloaded, {} failed",
        summary.attachments_downloaded, summary.attachments_failed
    );
    println!("  Time:        {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn status(&self, line: &str) {
        self.spinner.set_message(line.to_string());
    }

    fn notice(&self, line: &str) {
        self.spinner.println(line);
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
