//! get: the identifier query CLI
//!
//! Compiles query identifiers and runs them against a JSON fixture.
//!
//! # Usage
//!
//! ```bash
//! # Show how an identifier compiles
//! get explain UserByEmail a@example.com
//!
//! # Run it against the configured fixture
//! get --fixture store.json run UsersByStatus active -o limit=10
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use get::config::CONFIG_ENV;
use get::prelude::*;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "GET_LOG";

#[derive(Parser)]
#[command(name = "get")]
#[command(version)]
#[command(about = "Name the query, get the data", long_about = None)]
#[command(after_help = "EXAMPLES:
    get explain UserByEmail a@example.com
    get --fixture store.json run UsersByStatus active -o limit=10
    get --fixture store.json run PostsFromUser 1 -o via=posts --format json")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// JSON fixture for the memory adapter, overrides the configured one
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the parsed intent, plan and actions of an identifier
    Explain {
        identifier: String,
        /// Positional arguments
        args: Vec<String>,
        /// Options as key=value
        #[arg(short = 'o', long = "option")]
        options: Vec<String>,
    },
    /// Compile and run an identifier
    Run {
        identifier: String,
        /// Positional arguments
        args: Vec<String>,
        /// Options as key=value
        #[arg(short = 'o', long = "option")]
        options: Vec<String>,
        /// Raise not-found errors instead of printing nothing
        #[arg(long)]
        strict: bool,
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Show the verb reference
    Symbols,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("get=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Explain {
            identifier,
            args,
            options,
        } => explain(&cli, identifier, args, options),
        Commands::Run {
            identifier,
            args,
            options,
            strict,
            format,
        } => run(&cli, identifier, args, options, *strict, *format),
        Commands::Symbols => {
            show_symbols();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let path = cli.config.clone().or_else(FileConfig::default_path);
    let mut file = match path {
        Some(path) if path.exists() => FileConfig::load(&path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        _ => FileConfig::default(),
    };
    if let Some(fixture) = &cli.fixture {
        file.fixture = Some(fixture.clone());
    }
    Ok(file.into_config()?)
}

/// JSON when it parses, otherwise the raw string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn invocation(args: &[String], options: &[String]) -> Result<Invocation> {
    let mut invocation = Invocation::new();
    for arg in args {
        invocation = invocation.arg(parse_value(arg));
    }
    for option in options {
        let (key, value) = option
            .split_once('=')
            .with_context(|| format!("option '{option}' is not key=value"))?;
        invocation = invocation.option(key.trim(), parse_value(value));
    }
    Ok(invocation)
}

fn explain(cli: &Cli, identifier: &str, args: &[String], options: &[String]) -> Result<()> {
    println!("{} {}", "Identifier:".dimmed(), identifier.yellow());
    println!();

    let Some(intent) = get::parse(identifier)? else {
        println!("{}", "Not a query identifier.".yellow());
        return Ok(());
    };

    println!("{}", "Intent:".green().bold());
    println!("  {} {}", "Entity:".dimmed(), intent.result_entity.white());
    println!("  {} {}", "Verb:".dimmed(), intent.verb.to_string().cyan());
    if let Some(key) = &intent.key {
        println!("  {} {}", "Key:".dimmed(), key.white());
    }

    let engine = Engine::with_config(load_config(cli)?);
    let Some(plan) = engine.compile(identifier)? else {
        return Ok(());
    };

    println!();
    println!("{}", "Plan:".green().bold());
    println!("  {} {}", "Store:".dimmed(), plan.store.as_str().white());
    println!("  {} {}", "Target:".dimmed(), plan.target_entity.white());
    println!(
        "  {} {}",
        "Returns:".dimmed(),
        if plan.is_collection { "collection" } else { "single" }.cyan()
    );
    println!("  {} {}", "Builder:".dimmed(), serde_json::to_string(&plan.kind)?);

    let actions = plan.actions(&invocation(args, options)?)?;
    println!();
    println!("{}", "Actions:".green().bold());
    for action in &actions {
        println!(
            "  {} {}",
            action.name.to_string().cyan(),
            Value::Object(action.options.clone()).to_string().dimmed()
        );
    }
    Ok(())
}

fn run(
    cli: &Cli,
    identifier: &str,
    args: &[String],
    options: &[String],
    strict: bool,
    format: OutputFormat,
) -> Result<()> {
    let engine = Engine::with_config(load_config(cli)?);
    let query = engine
        .query(identifier)?
        .with_context(|| format!("'{identifier}' is not a query identifier"))?;
    let query = query.options(invocation(&[], options)?.options);
    let query = args
        .iter()
        .fold(query, |query, arg| query.arg(parse_value(arg)));

    let output = if strict {
        Some(query.run_strict()?)
    } else {
        query.run()?
    };

    match output {
        None => println!("{}", "(no results)".dimmed()),
        Some(output) => format_output(&output, format)?,
    }
    Ok(())
}

fn format_output(output: &Output, format: OutputFormat) -> Result<()> {
    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(output)?);
        return Ok(());
    }

    let rows: Vec<Entity> = match output {
        Output::Single(entity) => vec![entity.clone()],
        Output::Collection(collection) => collection.iter().collect(),
    };
    if rows.is_empty() {
        println!("{}", "(no results)".dimmed());
        return Ok(());
    }

    let columns: Vec<&String> = rows[0].attributes().keys().collect();
    let mut widths: HashMap<&String, usize> = columns.iter().map(|c| (*c, c.len())).collect();
    for row in &rows {
        for column in &columns {
            let len = val_to_string(&row[column.as_str()]).len();
            if let Some(w) = widths.get_mut(column) {
                *w = (*w).max(len);
            }
        }
    }

    let header: Vec<String> = columns
        .iter()
        .map(|c| format!("{:width$}", c, width = widths[*c]))
        .collect();
    println!("{}", header.join(" │ ").white().bold());

    let sep: Vec<String> = columns.iter().map(|c| "─".repeat(widths[*c])).collect();
    println!("{}", sep.join("─┼─").dimmed());

    for row in &rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| format!("{:width$}", val_to_string(&row[c.as_str()]), width = widths[*c]))
            .collect();
        println!("{}", cells.join(" │ "));
    }

    println!();
    let entity_type = match output {
        Output::Single(entity) => entity.entity_type().clone(),
        Output::Collection(collection) => collection.collection_type().clone(),
    };
    println!(
        "{} {} row(s)",
        entity_type.name().cyan(),
        rows.len().to_string().cyan()
    );
    Ok(())
}

fn val_to_string(val: &Value) -> String {
    match val {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => val.to_string(),
    }
}

fn show_symbols() {
    println!("{}", "get verb reference".cyan().bold());
    println!();

    let verbs = [
        ("By", "UserByEmail", "Field lookup", "find_first / find_all"),
        ("By", "UserById", "Primary key lookup", "get"),
        ("By", "UsersBy", "Open-ended lookup", "find_all(conditions)"),
        ("From", "PostsFromUser", "Ancestry walk", "ancestors(via)"),
        ("JoinedWith", "UsersJoinedWithPosts", "Join", "join(with)"),
        ("All", "AllUsers", "Every record", "find_all"),
        ("", "-o eager_load=posts", "Embed relations", "eager_load"),
    ];

    println!(
        "{:12} {:24} {:20} {}",
        "Verb".white().bold(),
        "Example".white().bold(),
        "Function".white().bold(),
        "Adapter call".white().bold()
    );
    println!("{}", "─".repeat(80).dimmed());

    for (verb, example, function, call) in verbs {
        println!(
            "{:12} {:24} {:20} {}",
            verb.cyan().bold(),
            example.yellow(),
            function.white(),
            call.dimmed()
        );
    }
}
