use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use repolens_analyze::{
    clean_mermaid_code, detect_diagram_type, validate_completeness, validate_syntax, Analyzer, LlmTransport,
};
use repolens_core::{AnalysisResult, Settings};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "repolens")]
#[command(about = "Ask questions about a repository and get validated architecture diagrams", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a question about a repository description (JSON)
    Analyze(AnalyzeArgs),
    /// Show or update the AI provider settings
    Settings(SettingsArgs),
    /// Repair and validate a diagram file without calling a model
    Check(CheckArgs),
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Repository description exported by the repository reader
    repo: PathBuf,
    /// Question to ask about the repository
    question: String,
    /// JSON array of prior {"role", "content"} turns
    #[arg(long)]
    history: Option<PathBuf>,
    /// Print the full result as JSON
    #[arg(long)]
    json: bool,
    /// API key for this run only
    #[arg(long, env = "REPOLENS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[derive(Args)]
struct SettingsArgs {
    /// openai, anthropic, google, ollama, groq, mistral, or deepseek
    #[arg(long)]
    provider: Option<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    api_key: Option<String>,
}

#[derive(Args)]
struct CheckArgs {
    /// File holding Mermaid source
    diagram: PathBuf,
    /// Repository file count to judge completeness against
    #[arg(long, default_value_t = 0)]
    files: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze(args) => run_analyze(args).await,
        Commands::Settings(args) => run_settings(args),
        Commands::Check(args) => run_check(args),
    }
}

async fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let mut settings = repolens_core::read_settings();
    if let Some(key) = args.api_key {
        settings.ai.api_key = key;
    }
    if !repolens_core::ai_configured(&settings.ai) {
        bail!("AI provider is not configured. Run `repolens settings --provider <name> --model <model> --api-key <key>` first.");
    }

    let repo = repolens_core::read_repository(&args.repo)
        .with_context(|| format!("failed to read repository description {}", args.repo.display()))?;
    let history = match &args.history {
        Some(path) => repolens_core::read_history(path)
            .with_context(|| format!("failed to read history {}", path.display()))?,
        None => vec![],
    };

    tracing::info!(provider = %settings.ai.provider, model = %settings.ai.model, repo = repo.display_name(), "analyzing");

    let Settings { ai, analyzer } = settings;
    let result = Analyzer::new(LlmTransport::new(ai), analyzer)
        .analyze(&repo, &args.question, &history)
        .await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

fn print_result(result: &AnalysisResult) {
    println!("{}", result.answer);
    if let (Some(code), Some(kind)) = (&result.mermaid_code, result.diagram_type) {
        println!("\n--- {kind} diagram ---\n{code}\n---");
    }
    if !result.follow_up_questions.is_empty() {
        println!("\nFollow-up questions:");
        for q in &result.follow_up_questions {
            println!("  - {q}");
        }
    }
}

fn run_settings(args: SettingsArgs) -> Result<()> {
    let mut settings = repolens_core::read_settings();
    let changed = args.provider.is_some() || args.model.is_some() || args.api_key.is_some();

    if let Some(provider) = args.provider {
        settings.ai.provider = provider;
    }
    if let Some(model) = args.model {
        settings.ai.model = model;
    }
    if let Some(key) = args.api_key {
        settings.ai.api_key = key;
    }
    if changed {
        repolens_core::write_settings(&settings).context("failed to write settings")?;
        eprintln!("Wrote {}", repolens_core::settings_path().display());
    }

    // Mask API key, only show whether it is set
    let view = serde_json::json!({
        "provider": settings.ai.provider,
        "model": settings.ai.model,
        "hasKey": !settings.ai.api_key.is_empty(),
        "configured": repolens_core::ai_configured(&settings.ai),
        "analyzer": settings.analyzer,
    });
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

fn run_check(args: CheckArgs) -> Result<()> {
    let raw = std::fs::read_to_string(&args.diagram)
        .with_context(|| format!("failed to read {}", args.diagram.display()))?;
    let policy = repolens_core::read_settings().analyzer.budget.validation_node_policy;

    let repaired = clean_mermaid_code(&raw);
    let syntax = validate_syntax(&repaired);
    let completeness = validate_completeness(&repaired, args.files, policy);

    println!("type: {}", detect_diagram_type(&repaired));
    println!("{repaired}\n");
    for error in &syntax.errors {
        println!("syntax: {error}");
    }
    for issue in &completeness.errors {
        println!("completeness: {issue}");
    }

    if !syntax.valid {
        std::process::exit(1);
    }
    if completeness.valid {
        println!("ok");
    }
    Ok(())
}
