use clap::{command, Parser};
use floip_expression::{config, Context, Engine, EngineConfig, Error, ExprResult};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Template to evaluate, e.g. "Hello @contact.name"
    template: Option<String>,

    /// Read the template from a file instead
    #[arg(short, long, conflicts_with = "template")]
    file: Option<PathBuf>,

    /// JSON file with the evaluation context
    #[arg(long)]
    context: Option<PathBuf>,

    /// Path to engine config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run the compiled form instead of walking the AST
    #[arg(long)]
    compiled: bool,

    /// Print the typed result as JSON
    #[arg(long)]
    typed: bool,

    /// Enable debug mode
    #[arg(short, long)]
    verbose: bool,
}

fn read_file(path: &PathBuf, what: &str) -> ExprResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| Error::config(format!("Failed to read {} file {:?}: {}", what, path, e)))
}

fn run(cli: &Cli) -> ExprResult<String> {
    let engine_config: EngineConfig = match &cli.config {
        Some(path) => config::from_file(path)?,
        None => EngineConfig::default(),
    };
    info!("config loaded.");
    debug!("config: {:?}", engine_config);

    let engine = Engine::new(engine_config)?;

    let context = match &cli.context {
        Some(path) => {
            let raw: serde_json::Value = serde_json::from_str(&read_file(path, "context")?)
                .map_err(|e| Error::config(format!("Failed to parse context file: {}", e)))?;
            engine.build_context(&raw)
        }
        None => Context::new(),
    };

    let template = match (&cli.template, &cli.file) {
        (Some(template), _) => template.clone(),
        (None, Some(path)) => read_file(path, "template")?,
        (None, None) => return Err(Error::config("No template given")),
    };

    let value = if cli.compiled {
        engine.compile_template(&template)?.run(&context)?
    } else {
        engine.evaluate(&template, &context)?
    };

    if cli.typed {
        serde_json::to_string(&value)
            .map_err(|e| Error::config(format!("Failed to serialize result: {}", e)))
    } else {
        Ok(value.to_display_string())
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
