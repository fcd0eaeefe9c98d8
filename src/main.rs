use abcd::{
    Backend, Config,
    cli::{self, CheckFormat, CheckOptions, CheckResult, CliError, QueryOptions},
};
use clap::{Parser as ClapParser, Subcommand};
use std::{
    io::{self, Read},
    path::PathBuf,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(ClapParser)]
#[command(name = "abcd")]
#[command(about = "abcd - Query atomistic structure databases")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to abcd.toml)
    #[arg(long, global = true, env = "ABCD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and type-check a query
    Check {
        /// The query to check
        query: String,

        /// Print canonical query text instead of the tree
        #[arg(long)]
        canonical: bool,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Compile a query to a backend's native filter
    Compile {
        /// The query to compile (empty selects every record)
        query: String,

        /// Target backend (defaults to the configured one)
        #[arg(short, long, value_enum)]
        backend: Option<Backend>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Print records matching a query
    Find {
        /// The query (empty selects every record)
        query: String,

        /// JSON records (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Backend executing the query (defaults to the configured one)
        #[arg(short, long, value_enum)]
        backend: Option<Backend>,

        #[arg(short, long)]
        limit: Option<usize>,

        #[arg(long, default_value_t = 0)]
        skip: usize,

        /// Sort key, `-field` for descending; repeatable
        #[arg(long)]
        sort: Vec<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Count records matching a query
    Count {
        /// The query (empty selects every record)
        query: String,

        /// JSON records (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Backend executing the query (defaults to the configured one)
        #[arg(short, long, value_enum)]
        backend: Option<Backend>,
    },

    /// List documentation categories
    Docs,

    /// Show documentation for a specific category
    Doc {
        /// Category name (use 'abcd docs' to list categories)
        category: String,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Check {
            query,
            canonical,
            pretty,
        } => {
            let options = CheckOptions {
                query,
                format: if canonical {
                    CheckFormat::Canonical
                } else {
                    CheckFormat::Ast
                },
            };
            match cli::execute_check(&options)? {
                CheckResult::Canonical(text) => println!("{}", text),
                CheckResult::Ast(tree) => print_json(&tree, pretty)?,
            }
        }
        Commands::Compile {
            query,
            backend,
            pretty,
        } => {
            let config = load_config(cli.config.as_ref())?;
            let backend = backend.unwrap_or(config.backend);
            let filter = cli::execute_compile(&query, backend, &config)?;
            print_json(&filter, pretty)?;
        }
        Commands::Find {
            query,
            input,
            backend,
            limit,
            skip,
            sort,
            pretty,
        } => {
            let config = with_backend(load_config(cli.config.as_ref())?, backend);
            let options = QueryOptions {
                query,
                input: read_input(input)?,
                limit,
                skip,
                sort,
            };
            let records = cli::execute_find(&options, &config)?;
            print_json(&serde_json::Value::Array(records), pretty)?;
        }
        Commands::Count {
            query,
            input,
            backend,
        } => {
            let config = with_backend(load_config(cli.config.as_ref())?, backend);
            let options = QueryOptions {
                query,
                input: read_input(input)?,
                ..Default::default()
            };
            println!("{}", cli::execute_count(&options, &config)?);
        }
        Commands::Docs => print!("{}", cli::get_docs_overview()),
        Commands::Doc { category } => print!("{}", cli::get_doc_category(&category)?),
    }
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<Config, CliError> {
    let config = match path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };
    Ok(config.map_err(abcd::Error::from)?)
}

fn with_backend(config: Config, backend: Option<Backend>) -> Config {
    match backend {
        Some(backend) => config.with_backend(backend),
        None => config,
    }
}

fn read_input(input: Option<String>) -> Result<Option<String>, CliError> {
    Ok(match input {
        Some(s) => Some(s),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer)
        }
        None => None,
    })
}

fn print_json(value: &serde_json::Value, pretty: bool) -> Result<(), CliError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }?;
    println!("{}", json);
    Ok(())
}
