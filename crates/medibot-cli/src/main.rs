//! MediBot CLI - conversational medical triage

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use medibot_core::classifier::SpecialtyClassifier;
use medibot_core::config::{Config, MatcherMode};
use medibot_core::dialogue::LlmDialogueDriver;
use medibot_core::doctors::{self, DoctorCatalog, DoctorMatcher, ScoredDoctor};
use medibot_core::knowledge::KnowledgeGraph;
use medibot_core::llm::LlmClient;
use medibot_core::pipeline::{TriagePipeline, TriageResult};
use medibot_core::session::{SessionReply, TriageService};
use medibot_core::transcript::Transcript;
use rustyline::error::ReadlineError;
use tracing::{info, warn};

#[cfg(test)]
mod main_tests;

#[derive(Parser)]
#[command(name = "medibot")]
#[command(author, version, about = "Conversational medical triage assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Doctor catalog (overrides catalog.path)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive triage session
    Chat {
        /// Session identifier (random if omitted)
        #[arg(long)]
        session: Option<String>,
    },

    /// Classify symptom text with the knowledge graph only
    Classify {
        /// Symptom description
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Resolve a transcript to a specialty and doctor
    Resolve {
        /// Utterances, optionally prefixed with "Patient:" or "Nurse:"
        #[arg(required = true)]
        utterances: Vec<String>,
    },

    /// Browse and search the doctor catalog
    Doctors {
        #[command(subcommand)]
        action: DoctorsAction,
    },

    /// Inspect the knowledge graph
    Graph {
        #[command(subcommand)]
        action: GraphAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run health check
    Doctor,
}

#[derive(Subcommand)]
enum DoctorsAction {
    /// List every doctor in the catalog
    List,
    /// Find doctors for a specialty label
    Search {
        /// Specialty or free-text query
        query: String,
        /// Maximum number of results
        #[arg(short = 'k', long, default_value_t = 3)]
        top_k: usize,
        /// Matching strategy (lexical or semantic)
        #[arg(short, long)]
        mode: Option<String>,
    },
}

#[derive(Subcommand)]
enum GraphAction {
    /// Node and edge counts
    Stats,
    /// Every recognised symptom phrase
    Symptoms,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
    /// Reset to defaults
    Reset,
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("medibot=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let catalog = cli.catalog.as_deref();

    match cli.command {
        Commands::Chat { session } => cmd_chat(session, catalog, cli.quiet).await,

        Commands::Classify { text } => cmd_classify(&text.join(" "), cli.format),

        Commands::Resolve { utterances } => {
            cmd_resolve(&utterances, catalog, cli.format, cli.quiet).await
        }

        Commands::Doctors { action } => cmd_doctors(action, catalog, cli.format, cli.quiet).await,

        Commands::Graph { action } => cmd_graph(action, cli.format),

        Commands::Config { action } => cmd_config(action, cli.quiet),

        Commands::Doctor => cmd_doctor(catalog, cli.quiet).await,
    }
}

fn load_catalog(config: &Config, override_path: Option<&Path>) -> Arc<DoctorCatalog> {
    let path = override_path.unwrap_or(&config.catalog.path);
    Arc::new(DoctorCatalog::load_or_empty(path))
}

fn llm_client(config: &Config) -> anyhow::Result<Option<Arc<LlmClient>>> {
    match config.llm.resolved_api_key()? {
        Some(key) => {
            let client = LlmClient::new(config.llm.clone(), key)
                .context("Failed to create LLM client")?;
            Ok(Some(Arc::new(client)))
        }
        None => Ok(None),
    }
}

async fn build_pipeline(
    config: &Config,
    catalog: Arc<DoctorCatalog>,
    client: Option<Arc<LlmClient>>,
) -> anyhow::Result<TriagePipeline> {
    let graph = Arc::new(KnowledgeGraph::medical()?);
    let matcher = doctors::build_matcher(&config.matcher, catalog, client.clone()).await?;

    let mut pipeline =
        TriagePipeline::new(graph, matcher).with_default_specialty(&config.triage.default_specialty);
    match client {
        Some(client) => {
            let classifier = SpecialtyClassifier::new(client)
                .with_temperature(config.llm.diagnosis_temperature);
            pipeline = pipeline.with_fallback(classifier);
        }
        None => warn!("No API key configured; fallback classifier disabled"),
    }
    Ok(pipeline)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn describe_doctor(doctor: &ScoredDoctor) -> String {
    let name = doctor.record.name().unwrap_or("(unnamed)");
    format!(
        "{} - {} [{}] (score {:.2})",
        name, doctor.record.specialty, doctor.record.tags, doctor.score
    )
}

fn print_result(result: &TriageResult) {
    println!("Specialty: {}", result.specialty);
    let source = if result.defaulted {
        format!("{} (default)", result.confidence_source)
    } else {
        result.confidence_source.to_string()
    };
    println!("Source:    {}", source);
    if let Some(urgency) = &result.urgency {
        println!("Urgency:   {}", urgency);
    }
    if result.graph.is_match() {
        println!("Graph:     {}", result.graph.explanation());
    }
    match &result.doctor {
        Some(doctor) => {
            println!("Doctor:    {}", describe_doctor(doctor));
            println!("Action:    video call");
        }
        None => {
            println!("Doctor:    none available");
            println!("Action:    schedule a visit");
        }
    }
}

async fn cmd_chat(session: Option<String>, catalog: Option<&Path>, quiet: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let Some(client) = llm_client(&config)? else {
        bail!("Chat needs an LLM. Set MEDIBOT_API_KEY or GROQ_API_KEY.");
    };

    let pipeline = build_pipeline(&config, load_catalog(&config, catalog), Some(client.clone())).await?;
    let driver = LlmDialogueDriver::new(client)
        .with_max_questions(config.dialogue.max_questions)
        .with_temperature(config.llm.question_temperature);
    let service = TriageService::new(pipeline, Arc::new(driver));

    let session_id = session.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    info!(session_id = %session_id, "Starting triage chat");

    if !quiet {
        println!("MediBot triage. Describe how you feel. /reset starts over, /quit exits.");
        println!();
    }

    let mut editor = rustyline::DefaultEditor::new()?;
    loop {
        let line = match editor.readline("You: ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        editor.add_history_entry(line)?;

        match line {
            "/quit" | "/exit" => break,
            "/reset" => {
                service.reset(&session_id).await;
                println!("Session cleared.");
                continue;
            }
            _ => {}
        }

        match service.handle_message(&session_id, line).await? {
            SessionReply::Question { message } => println!("Nurse: {}", message),
            SessionReply::Diagnosis { message, result, .. } => {
                println!("Nurse: {}", message);
                println!();
                print_result(&result);
                println!();
            }
        }
    }

    Ok(())
}

fn cmd_classify(text: &str, format: OutputFormat) -> anyhow::Result<()> {
    let graph = KnowledgeGraph::medical()?;
    let result = graph.find_specialty(text)?;

    if format == OutputFormat::Json {
        return print_json(&result);
    }

    match &result.specialty {
        Some(specialty) => {
            println!("Specialty: {} (score {:.2})", specialty, result.score);
            println!("Symptoms:  {}", result.matched_symptoms.join(", "));
            println!();
            for (name, score) in &result.scores {
                println!("  {:<18} {:.2}", name, score);
            }
        }
        None => println!("No known symptom found."),
    }
    Ok(())
}

async fn cmd_resolve(
    utterances: &[String],
    catalog: Option<&Path>,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let config = Config::load()?;
    let client = llm_client(&config)?;
    let pipeline = build_pipeline(&config, load_catalog(&config, catalog), client).await?;

    let transcript = Transcript::from_lines(utterances);
    if !quiet && format == OutputFormat::Text {
        println!("{}", transcript.render());
        println!();
    }

    let result = pipeline.resolve(&transcript).await?;
    if format == OutputFormat::Json {
        print_json(&result)
    } else {
        print_result(&result);
        Ok(())
    }
}

async fn cmd_doctors(
    action: DoctorsAction,
    catalog: Option<&Path>,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    let catalog = load_catalog(&config, catalog);

    match action {
        DoctorsAction::List => {
            if format == OutputFormat::Json {
                return print_json(&catalog.records());
            }
            if catalog.is_empty() {
                println!("Catalog is empty.");
                return Ok(());
            }
            for record in catalog.iter() {
                println!(
                    "{:<22} {:<18} {}",
                    record.name().unwrap_or("(unnamed)"),
                    record.specialty,
                    record.tags
                );
            }
            if !quiet {
                println!();
                println!("{} doctors", catalog.len());
            }
        }
        DoctorsAction::Search { query, top_k, mode } => {
            if let Some(mode) = mode {
                config.matcher.mode = mode.parse::<MatcherMode>()?;
            }
            let client = match config.matcher.mode {
                MatcherMode::Semantic => llm_client(&config)?,
                MatcherMode::Lexical => None,
            };
            let matcher: Arc<dyn DoctorMatcher> =
                doctors::build_matcher(&config.matcher, catalog, client).await?;
            let hits = matcher.search(&query, top_k).await;

            if format == OutputFormat::Json {
                return print_json(&hits);
            }
            if hits.is_empty() {
                println!("No matching doctors for '{}'.", query);
            }
            for hit in &hits {
                println!("{}", describe_doctor(hit));
            }
        }
    }
    Ok(())
}

fn cmd_graph(action: GraphAction, format: OutputFormat) -> anyhow::Result<()> {
    let graph = KnowledgeGraph::medical()?;

    match action {
        GraphAction::Stats => {
            let stats = graph.stats();
            if format == OutputFormat::Json {
                return print_json(&stats);
            }
            println!("Symptoms:    {}", stats.symptoms);
            println!("Diseases:    {}", stats.diseases);
            println!("Specialties: {}", stats.specialties);
            println!("Edges:       {}", stats.edges);
        }
        GraphAction::Symptoms => {
            let symptoms = graph.symptoms();
            if format == OutputFormat::Json {
                return print_json(&symptoms);
            }
            for symptom in symptoms {
                println!("{}", symptom);
            }
        }
    }
    Ok(())
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let items = config.list()?;
            for (key, value) in items {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

async fn cmd_doctor(catalog: Option<&Path>, quiet: bool) -> anyhow::Result<()> {
    if !quiet {
        println!("MediBot Health Check");
        println!("====================");
        println!();
    }

    let mut all_ok = true;

    // Check configuration
    let config = match Config::load() {
        Ok(config) => {
            if !quiet {
                println!("[OK] Configuration: Valid");
            }
            config
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Configuration: Error - {}", e);
            }
            Config::default()
        }
    };

    // Check API key
    match config.llm.resolved_api_key() {
        Ok(Some(_)) => {
            if !quiet {
                let redacted = config.llm.redacted_api_key()?.unwrap_or_default();
                println!("[OK] API Key: Configured ({})", redacted);
            }
        }
        Ok(None) => {
            if !quiet {
                println!("[--] API Key: Not configured (chat and fallback classifier disabled)");
                println!("     Set MEDIBOT_API_KEY or GROQ_API_KEY environment variable");
            }
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] API Key: Error - {}", e);
            }
        }
    }

    // Check config file location
    if !quiet {
        match Config::config_path() {
            Ok(path) => {
                if path.exists() {
                    println!("[OK] Config file: {}", path.display());
                } else {
                    println!("[--] Config file: {} (using defaults)", path.display());
                }
            }
            Err(e) => {
                println!("[!!] Config file: Error - {}", e);
            }
        }
    }

    // Check knowledge graph
    match KnowledgeGraph::medical() {
        Ok(graph) => {
            if !quiet {
                let stats = graph.stats();
                println!(
                    "[OK] Knowledge graph: {} symptoms, {} specialties",
                    stats.symptoms, stats.specialties
                );
            }
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Knowledge graph: {}", e);
            }
        }
    }

    // Check doctor catalog
    let path = catalog.unwrap_or(&config.catalog.path);
    match DoctorCatalog::try_load(path) {
        Ok(catalog) if catalog.is_empty() => {
            all_ok = false;
            if !quiet {
                println!("[!!] Doctor catalog: {} has no doctors", path.display());
            }
        }
        Ok(catalog) => {
            if !quiet {
                println!(
                    "[OK] Doctor catalog: {} doctors in {} specialties",
                    catalog.len(),
                    catalog.specialties().len()
                );
                println!("     Path: {}", path.display());
            }
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Doctor catalog: {}", e);
                if let Some(hint) = e.suggestion() {
                    println!("     Try: {}", hint);
                }
            }
        }
    }

    // Summary
    if !quiet {
        println!();
        if all_ok {
            println!("All checks passed!");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }

    Ok(())
}
