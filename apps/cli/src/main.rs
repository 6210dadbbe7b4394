use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Result;
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use synopsis_core::{
    ClientConfig, ExportArtifact, ExportFormat, FileStore, JobClient, KeyValueStore,
    ModelOptions, Preferences, Stage, SubmissionInput, Theme, format_markdown, get_export_path,
    save_artifact,
};
use tracing_subscriber::EnvFilter;

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

/// CLI wrapper for ExportFormat (needed for clap ValueEnum)
#[derive(Clone, Copy, Default, ValueEnum)]
enum CliFormat {
    #[default]
    Markdown,
    Json,
    Pdf,
}

impl From<CliFormat> for ExportFormat {
    fn from(cli: CliFormat) -> Self {
        match cli {
            CliFormat::Markdown => ExportFormat::Markdown,
            CliFormat::Json => ExportFormat::Json,
            CliFormat::Pdf => ExportFormat::Pdf,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CliTheme {
    Dark,
    Light,
}

impl From<CliTheme> for Theme {
    fn from(cli: CliTheme) -> Self {
        match cli {
            CliTheme::Dark => Theme::Dark,
            CliTheme::Light => Theme::Light,
        }
    }
}

#[derive(Parser)]
#[command(name = "synopsis")]
#[command(about = "Summarize videos, audio, and text: transcript, summaries, chapters, quiz, and sentiment")]
struct Cli {
    /// Backend base URL (overrides SYNOPSIS_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit input, wait for processing, and print the report
    Run(RunArgs),

    /// List processed jobs, most recent first
    History {
        /// Only show favorites
        #[arg(short, long)]
        favorites: bool,
    },

    /// Toggle a job's favorite mark
    Favorite { job_id: String },

    /// Export the results of a completed job
    Export {
        job_id: String,

        #[arg(short, long, value_enum)]
        format: CliFormat,

        /// Output file. Defaults to summary_<job>.<ext> in the current directory.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Translate text; the original is printed if translation fails
    Translate {
        text: String,

        /// Target language code. Defaults to the saved language preference.
        #[arg(long)]
        to: Option<String>,
    },

    /// Show or update preferences
    Prefs {
        #[arg(long, value_enum, conflicts_with = "toggle_theme")]
        theme: Option<CliTheme>,

        #[arg(long)]
        toggle_theme: bool,

        /// Preferred language code (e.g., "en", "ta")
        #[arg(long)]
        language: Option<String>,
    },
}

#[derive(Args)]
#[command(group(ArgGroup::new("input").required(true).args(["url", "file", "text"])))]
struct RunArgs {
    /// Video or audio URL
    #[arg(long)]
    url: Option<String>,

    /// Local media or document file to upload
    #[arg(long)]
    file: Option<PathBuf>,

    /// Raw text to summarize
    #[arg(long)]
    text: Option<String>,

    /// Summarization model; repeat for several. Defaults to facebook/bart-large-cnn.
    #[arg(short, long = "model")]
    models: Vec<String>,

    /// Export format. Without --output, markdown and JSON are printed.
    #[arg(short, long, value_enum)]
    format: Option<CliFormat>,

    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn create_progress_bar() -> Result<ProgressBar> {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos:>3}% {msg}")?
            .progress_chars("=> "),
    );
    pb.enable_steady_tick(Duration::from_millis(80));
    Ok(pb)
}

fn create_spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")?,
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    Ok(pb)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = ClientConfig::from_env()?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    tracing::debug!(api_url = %config.api_url, state_file = %config.state_file.display(), "Loaded config");

    let kv: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(config.state_file.clone())?);

    match cli.command {
        Command::Run(args) => run_job(&config, kv, args).await,
        Command::History { favorites } => show_history(&config, kv, favorites),
        Command::Favorite { job_id } => {
            let mut client = JobClient::from_config(&config, kv)?;
            let favorite = client.toggle_favorite(&job_id)?;
            let mark = if favorite {
                style("★ Added to favorites").yellow().bold()
            } else {
                style("☆ Removed from favorites").dim()
            };
            println!("{} {}", mark, style(&job_id).cyan());
            Ok(())
        }
        Command::Export {
            job_id,
            format,
            output,
        } => export_job(&config, kv, &job_id, format.into(), output).await,
        Command::Translate { text, to } => {
            let target = match to {
                Some(lang) => lang,
                None => Preferences::load(&*kv)?.language,
            };
            let client = JobClient::from_config(&config, kv)?;
            println!("{}", client.translate(&text, &target).await);
            Ok(())
        }
        Command::Prefs {
            theme,
            toggle_theme,
            language,
        } => update_prefs(&*kv, theme.map(Theme::from), toggle_theme, language),
    }
}

async fn run_job(config: &ClientConfig, kv: Arc<dyn KeyValueStore>, args: RunArgs) -> Result<()> {
    let input = if let Some(url) = args.url {
        SubmissionInput::url(url)
    } else if let Some(path) = &args.file {
        SubmissionInput::from_path(path).await?
    } else {
        SubmissionInput::text(args.text.unwrap_or_default())
    };
    let options = ModelOptions::with_models(args.models);

    println!(
        "\n{}  {}\n",
        style("synopsis").cyan().bold(),
        style("Media Summarizer").dim()
    );
    println!(
        "{} {} {}",
        style("→").cyan().bold(),
        input.label(),
        style(format!("({}, {})", input.kind, options.models.join(", "))).dim()
    );
    println!("{}", style("─".repeat(60)).dim());

    let mut client = JobClient::from_config(config, kv)?;
    let total_start = Instant::now();
    let pb = create_progress_bar()?;

    let processed = client
        .process(&input, &options, |job| {
            pb.set_position(job.progress as u64);
            pb.set_message(job.stage.label().to_string());
        })
        .await;

    let report = match processed {
        Ok(bundle) => {
            pb.finish_and_clear();
            format_markdown(bundle)
        }
        Err(e) => {
            pb.abandon_with_message(format!("{}", style(e.short_message()).red()));
            return Err(e.into());
        }
    };

    let job_id = client
        .store()
        .job()
        .map(|job| job.id.clone())
        .unwrap_or_default();
    println!(
        "{} Processed {} {}",
        style("✓").green().bold(),
        style(&job_id).cyan(),
        style(format!("[{}]", format_duration(total_start.elapsed()))).dim()
    );

    match (args.format, args.output) {
        (None, None) => {
            println!("{}", style("─".repeat(60)).dim());
            println!("{}", report);
        }
        (format, output) => {
            let format: ExportFormat = format.unwrap_or_default().into();
            let artifact = client.export_results(format).await?;
            write_artifact(&artifact, &job_id, output).await?;
        }
    }

    Ok(())
}

async fn export_job(
    config: &ClientConfig,
    kv: Arc<dyn KeyValueStore>,
    job_id: &str,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut client = JobClient::from_config(config, kv)?;

    let spinner = create_spinner(&format!("Loading job {}...", job_id))?;
    let status = match client.refresh(job_id).await {
        Ok(status) => status,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };
    if status.stage != Stage::Completed {
        spinner.finish_and_clear();
        anyhow::bail!(
            "job {} is still {} ({}%)",
            job_id,
            status.stage,
            status.progress
        );
    }

    spinner.set_message(format!("Exporting {}...", format));
    let exported = match client.fetch_results(job_id).await {
        Ok(_) => client.export_results(format).await,
        Err(e) => Err(e),
    };
    spinner.finish_and_clear();

    write_artifact(&exported?, job_id, output).await
}

/// Save the artifact to `output`, or print text exports when no path is
/// given. PDFs always go to a file.
async fn write_artifact(artifact: &ExportArtifact, job_id: &str, output: Option<PathBuf>) -> Result<()> {
    let path = match (output, artifact.as_text()) {
        (Some(path), _) => path,
        (None, Some(text)) => {
            println!("{}", text);
            return Ok(());
        }
        (None, None) => get_export_path(&std::env::current_dir()?, job_id, artifact.format),
    };

    save_artifact(artifact, &path).await?;
    println!(
        "\n{} {}\n",
        style("Saved:").dim(),
        style(path.display()).cyan()
    );
    Ok(())
}

fn show_history(config: &ClientConfig, kv: Arc<dyn KeyValueStore>, favorites_only: bool) -> Result<()> {
    let client = JobClient::from_config(config, kv)?;
    let history = client.history();

    let items: Vec<_> = history
        .items()
        .iter()
        .filter(|item| !favorites_only || item.favorite)
        .collect();

    if items.is_empty() {
        let what = if favorites_only { "favorites" } else { "jobs" };
        println!("{}", style(format!("No {} yet.", what)).dim());
        return Ok(());
    }

    for item in items {
        let star = if item.favorite {
            style("★").yellow().bold()
        } else {
            style(" ").dim()
        };
        let local = item.timestamp.with_timezone(&chrono::Local);
        println!(
            "{} {} {} {} {}",
            star,
            style(local.format("%Y-%m-%d %H:%M")).dim(),
            style(format!("{:<4}", item.kind.as_str())).yellow(),
            item.title,
            style(format!("[{}]", item.job_id)).dim()
        );
    }

    Ok(())
}

fn update_prefs(
    kv: &dyn KeyValueStore,
    theme: Option<Theme>,
    toggle_theme: bool,
    language: Option<String>,
) -> Result<()> {
    let mut prefs = Preferences::load(kv)?;
    let changed = theme.is_some() || toggle_theme || language.is_some();

    if let Some(theme) = theme {
        prefs.theme = theme;
    }
    if toggle_theme {
        prefs.toggle_theme();
    }
    if let Some(language) = language {
        prefs.language = language;
    }

    if changed {
        prefs.save(kv)?;
        println!("{} Preferences saved", style("✓").green().bold());
    }
    println!("{} {}", style("theme:   ").dim(), prefs.theme);
    println!("{} {}", style("language:").dim(), prefs.language);
    Ok(())
}
