//! sforce CLI: inspect metadata and run lookups, queries and searches.

use std::env;
use std::path::Path;
use std::process;

use colored::Colorize;
use tracing_subscriber::EnvFilter;

use salesforce_orm::config::load_env_file;
use salesforce_orm::{Config, Connection, Record, ResourceType, Result, SearchScope};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// CLI command to execute.
enum Command {
    /// Print the field catalog of a type
    Describe { resource: String },
    /// Fetch one record by id
    Find { resource: String, id: String },
    /// Run a query
    Query {
        resource: String,
        select: Vec<String>,
        filters: Vec<(String, String)>,
        limit: Option<u64>,
    },
    /// Run a free-text search
    Search {
        resource: String,
        term: String,
        scope: SearchScope,
        select: Vec<String>,
    },
    Help,
}

fn print_usage() {
    eprintln!("sforce {} - CRM REST object mapper", VERSION);
    eprintln!();
    eprintln!("Usage: sforce describe <Type>");
    eprintln!("       sforce find <Type> <Id>");
    eprintln!("       sforce query <Type> [--select a,b] [--where Field=Value]... [--limit N]");
    eprintln!("       sforce search <Type> <term> [--in SCOPE] [--select a,b]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --select a,b    Comma-separated fields (default: all fields)");
    eprintln!("  --where F=V     Equality filter, may be repeated");
    eprintln!("  --limit N       Maximum number of rows");
    eprintln!("  --in SCOPE      ALL, NAME, EMAIL, PHONE or SIDEBAR (default: ALL)");
    eprintln!("  --help, -h      Show this help message");
    eprintln!();
    eprintln!("Credentials are read from SALESFORCE_* variables or a .env file.");
    eprintln!("Set RUST_LOG=debug to trace requests.");
}

fn usage_error(message: &str) -> ! {
    eprintln!("{}", message.red());
    print_usage();
    process::exit(64);
}

fn split_fields(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_args(args: &[String]) -> Command {
    let Some(command) = args.first() else {
        return Command::Help;
    };

    let positional = |i: usize, what: &str| -> String {
        match args.get(i) {
            Some(arg) if !arg.starts_with('-') => arg.clone(),
            _ => usage_error(&format!("{} command requires {}", command, what)),
        }
    };

    match command.as_str() {
        "--help" | "-h" | "help" => Command::Help,
        "describe" => Command::Describe {
            resource: positional(1, "a type name"),
        },
        "find" => Command::Find {
            resource: positional(1, "a type name"),
            id: positional(2, "a record id"),
        },
        "query" => {
            let resource = positional(1, "a type name");
            let mut select = Vec::new();
            let mut filters = Vec::new();
            let mut limit = None;

            let mut i = 2;
            while i < args.len() {
                let value = args.get(i + 1).map(|s| s.as_str());
                match (args[i].as_str(), value) {
                    ("--select", Some(list)) => select.extend(split_fields(list)),
                    ("--where", Some(pair)) => match pair.split_once('=') {
                        Some((field, value)) => {
                            filters.push((field.trim().to_string(), value.to_string()))
                        }
                        None => usage_error(&format!("Invalid --where filter: {}", pair)),
                    },
                    ("--limit", Some(n)) => match n.parse() {
                        Ok(n) => limit = Some(n),
                        Err(_) => usage_error(&format!("Invalid limit: {}", n)),
                    },
                    (flag, _) => usage_error(&format!("Unknown or incomplete option: {}", flag)),
                }
                i += 2;
            }

            Command::Query {
                resource,
                select,
                filters,
                limit,
            }
        }
        "search" => {
            let resource = positional(1, "a type name");
            let term = positional(2, "a search term");
            let mut scope = SearchScope::All;
            let mut select = Vec::new();

            let mut i = 3;
            while i < args.len() {
                let value = args.get(i + 1).map(|s| s.as_str());
                match (args[i].as_str(), value) {
                    ("--in", Some(name)) => match name.parse() {
                        Ok(s) => scope = s,
                        Err(e) => usage_error(&e.to_string()),
                    },
                    ("--select", Some(list)) => select.extend(split_fields(list)),
                    (flag, _) => usage_error(&format!("Unknown or incomplete option: {}", flag)),
                }
                i += 2;
            }

            Command::Search {
                resource,
                term,
                scope,
                select,
            }
        }
        other => usage_error(&format!("Unknown command: {}", other)),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = parse_args(&args);
    if let Command::Help = command {
        print_usage();
        return;
    }

    load_env_file(Path::new("."), ".env", false);

    if let Err(e) = run(command) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(if e.is_programmer_error() { 64 } else { 1 });
    }
}

fn connect() -> Result<Connection> {
    let config = Config::from_env()?;
    let auth = config.authenticator();
    Connection::open(&auth, config.api_version.clone())
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(command: Command) -> Result<()> {
    let conn = connect()?;

    match command {
        Command::Help => Ok(()),
        Command::Describe { resource } => {
            let metadata = conn.metadata(&ResourceType::resolve(&resource))?;
            for field in metadata.fields() {
                let flags = match (field.required, field.can_create, field.can_update) {
                    (true, _, _) => "required".yellow().to_string(),
                    (false, false, false) => "read-only".dimmed().to_string(),
                    _ => String::new(),
                };
                println!(
                    "{:<32} {:<12} {}",
                    field.name.bold(),
                    field.field_type.as_str(),
                    flags
                );
            }
            Ok(())
        }
        Command::Find { resource, id } => {
            let record = Record::find(&conn, &ResourceType::resolve(&resource), &id)?;
            print_json(&record.to_json())
        }
        Command::Query {
            resource,
            select,
            filters,
            limit,
        } => {
            let mut query = conn.query();
            query.select_all(&select).from(&resource);
            for (field, value) in &filters {
                query.where_clause(field, value.as_str());
            }
            if let Some(limit) = limit {
                query.limit(limit);
            }

            let result = query.execute()?;
            eprintln!("{}", result.to_string().green());
            print_json(&serde_json::Value::Array(result.records))
        }
        Command::Search {
            resource,
            term,
            scope,
            select,
        } => {
            let mut search = conn.search();
            search.from(&resource).scope(scope).find(&term);
            if select.is_empty() {
                let metadata = conn.metadata(&ResourceType::resolve(&resource))?;
                search.select_all(metadata.field_names());
            } else {
                search.select_all(&select);
            }

            let result = search.execute()?;
            eprintln!(
                "{}",
                format!("{} {} records", result.count(), result.resource).green()
            );
            print_json(&serde_json::Value::Array(result.records))
        }
    }
}
