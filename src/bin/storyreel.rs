use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use storyreel::export::OutputFormat;
use storyreel::generate::HttpVideoModel;
use storyreel::script::{create_script_template, load_script, prompt_preset, save_script};
use storyreel::{CancelReason, CancelToken, Orchestrator, PipelineConfig, StubVideoModel, VideoModel};

#[derive(Parser, Debug)]
#[command(name = "storyreel", version, about = "Render a scripted short-form video")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline and write a video (mp4 needs `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Check a script without generating anything.
    Validate(ValidateArgs),
    /// Write the four-beat 60 second script template.
    Template(TemplateArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Script JSON.
    #[arg(long)]
    script: PathBuf,

    /// Output path; `.y4m` selects the uncompressed format.
    #[arg(long)]
    out: PathBuf,

    /// Pipeline config JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use the offline stub model.
    #[arg(long, conflicts_with = "endpoint")]
    stub: bool,

    /// Text-to-video HTTP endpoint.
    #[arg(long)]
    endpoint: Option<String>,

    /// Bearer token sent to the endpoint.
    #[arg(long, requires = "endpoint")]
    token: Option<String>,

    /// Write the JSON run report here.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Abort on the first scene failure.
    #[arg(long, default_value_t = false)]
    fail_fast: bool,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Script JSON.
    #[arg(long)]
    script: PathBuf,

    /// Pipeline config JSON (only the `validation` section is used).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct TemplateArgs {
    /// Output script JSON.
    #[arg(long)]
    out: PathBuf,

    /// Fill the title and recreation beat from a preset (e.g. `suffrage_movement`).
    #[arg(long)]
    event: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let outcome = match cli.cmd {
        Command::Render(args) => cmd_render(args).await,
        Command::Validate(args) => cmd_validate(args).map(|()| 0),
        Command::Template(args) => cmd_template(args).map(|()| 0),
    };
    match outcome {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    match path {
        Some(p) => Ok(PipelineConfig::from_path(p)?),
        None => Ok(PipelineConfig::default()),
    }
}

async fn cmd_render(args: RenderArgs) -> anyhow::Result<u8> {
    let mut cfg = load_config(args.config.as_deref())?;
    if args.fail_fast {
        cfg.fail_fast = true;
    }
    if let Some(format) = args
        .out
        .extension()
        .and_then(|e| e.to_str())
        .and_then(OutputFormat::from_extension)
    {
        cfg.export.format = format;
    }

    let model: Arc<dyn VideoModel> = match (&args.endpoint, args.stub) {
        (Some(url), _) => {
            let mut http = HttpVideoModel::new(url.clone())?;
            if let Some(token) = &args.token {
                http = http.with_bearer_token(token.clone());
            }
            Arc::new(http)
        }
        (None, true) => Arc::new(StubVideoModel::default()),
        (None, false) => anyhow::bail!("pass --stub or --endpoint URL"),
    };

    let text = std::fs::read_to_string(&args.script)
        .with_context(|| format!("read script '{}'", args.script.display()))?;
    let raw: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("parse script '{}'", args.script.display()))?;

    let orchestrator = Orchestrator::builder(model).config(cfg).build()?;
    let cancel = CancelToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling");
                cancel.cancel(CancelReason::Requested);
            }
        })
    };

    let result = orchestrator
        .run_with_cancel(&raw, &args.out, &cancel)
        .await;
    ctrl_c.abort();

    if let Some(path) = &args.report {
        let json = result.to_json_pretty()?;
        std::fs::write(path, json)
            .with_context(|| format!("write report '{}'", path.display()))?;
    }
    eprint!("{}", result.summary());
    Ok(u8::try_from(result.exit_code()).unwrap_or(1))
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let script = load_script(&args.script, &cfg.validation)?;
    println!(
        "ok: '{}', {} scene(s), {:.1}s",
        script.title(),
        script.len(),
        script.total_duration_secs()
    );
    Ok(())
}

fn cmd_template(args: TemplateArgs) -> anyhow::Result<()> {
    let template = create_script_template();
    let script = match &args.event {
        None => template,
        Some(event) => {
            let preset = prompt_preset(event);
            let mut value = serde_json::to_value(&template)?;
            value["title"] = serde_json::Value::String(preset.description);
            value["scenes"][1]["description"] = serde_json::Value::String(preset.prompt);
            storyreel::validate_script(&value, &Default::default())?
        }
    };
    save_script(&script, &args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}
