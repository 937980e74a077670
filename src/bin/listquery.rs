//! listquery: build list queries from the command line
//!
//! # Usage
//!
//! ```bash
//! # Build a data query from request parameters
//! listquery build --base "select * from users" \
//!     --field name=u.name:filter,sort \
//!     --param 'filter=[{"field":"name","operator":"eq","value":"bob"}]'
//!
//! # Expand and rebind a hand-written query
//! listquery rebind "select * from t where id in (?)" --args '[[1,2,3]]' --dialect dollar
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use listquery::lexer::scan_clauses;
use listquery::prelude::*;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "listquery")]
#[command(version)]
#[command(about = "Build paged, filtered and sorted SQL from list request parameters", long_about = None)]
#[command(after_help = "EXAMPLES:
    listquery build --base 'select * from u' --field name=u.name:filter --param 'filter=[{\"field\":\"name\",\"operator\":\"eq\",\"value\":\"bob\"}]'
    listquery rebind 'select * from t where id in (?)' --args '[[1,2]]' --dialect dollar
    listquery scan 'select * from (select * from t where a = 1) s order by x'")]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum DialectArg {
    Question,
    Dollar,
    Named,
    At,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Question => Dialect::Question,
            DialectArg::Dollar => Dialect::Dollar,
            DialectArg::Named => Dialect::Named,
            DialectArg::At => Dialect::At,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build a data or count query for a set of request parameters
    Build {
        /// Base SELECT the clauses are appended to
        #[arg(short, long)]
        base: String,

        /// Registered field: name=column[:filter,sort,group]
        #[arg(short, long = "field")]
        fields: Vec<String>,

        /// Request parameter: key=value (first occurrence wins)
        #[arg(short, long = "param")]
        params: Vec<String>,

        /// Raw request query string, e.g. 'limit=10&offset=20'
        #[arg(short, long)]
        query: Option<String>,

        /// TOML config file (defaults to the user config dir when present)
        #[arg(short, long, env = "LISTQUERY_CONFIG")]
        config: Option<PathBuf>,

        /// Override the configured placeholder dialect
        #[arg(short, long, value_enum)]
        dialect: Option<DialectArg>,

        /// Build the count query instead of the data query
        #[arg(long)]
        count: bool,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Expand list arguments and rewrite placeholders
    Rebind {
        query: String,

        /// Arguments as a JSON array; nested arrays are IN lists
        #[arg(short, long, default_value = "[]")]
        args: String,

        #[arg(short, long, value_enum, default_value = "question")]
        dialect: DialectArg,
    },
    /// Show which top-level clauses a query already has
    Scan { query: String },
    /// Show the filter operator reference
    Operators,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Build {
            base,
            fields,
            params,
            query,
            config,
            dialect,
            count,
            format,
        } => run_build(BuildArgs {
            base,
            fields,
            params,
            query,
            config,
            dialect,
            count,
            format,
        }),
        Commands::Rebind { query, args, dialect } => run_rebind(&query, &args, dialect.into()),
        Commands::Scan { query } => {
            show_scan(&query);
            Ok(())
        }
        Commands::Operators => {
            show_operators();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "listquery=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

struct BuildArgs {
    base: String,
    fields: Vec<String>,
    params: Vec<String>,
    query: Option<String>,
    config: Option<PathBuf>,
    dialect: Option<DialectArg>,
    count: bool,
    format: OutputFormat,
}

fn run_build(args: BuildArgs) -> Result<()> {
    let mut config = load_config(args.config)?;
    if let Some(dialect) = args.dialect {
        config.dialect = dialect.into();
    }

    let mut builder = FieldRegistry::builder();
    for spec in &args.fields {
        let (name, field) = parse_field(spec)?;
        builder = builder.field(name, field);
    }
    let registry = builder.build();
    if registry.is_empty() {
        tracing::warn!("no fields registered; every descriptor will be rejected");
    }

    let mut request = args
        .query
        .as_deref()
        .map(QueryParams::parse)
        .unwrap_or_default();
    for param in &args.params {
        let (key, value) = param
            .split_once('=')
            .with_context(|| format!("parameter '{}' is not key=value", param))?;
        request.insert(key, value);
    }

    let built = if args.count {
        build_count_query(&args.base, &request, &registry, &config)
    } else {
        build_data_query(&args.base, &request, &registry, &config)
    };
    let (sql, values) = match built {
        Ok(built) => built,
        Err(e) => bail!("{} (status {})", e, e.status_code()),
    };

    match args.format {
        OutputFormat::Json => {
            let out = serde_json::json!({ "sql": sql, "args": values });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => print_query(&sql, &values, config.dialect),
    }
    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<QueryConfig> {
    if let Some(path) = path {
        return QueryConfig::load(&path).with_context(|| format!("loading {}", path.display()));
    }
    match QueryConfig::default_path() {
        Some(path) if path.exists() => {
            QueryConfig::load(&path).with_context(|| format!("loading {}", path.display()))
        }
        _ => Ok(QueryConfig::default()),
    }
}

/// `name=column[:filter,sort,group]`
fn parse_field(spec: &str) -> Result<(String, FieldConfig)> {
    let (name, rest) = spec
        .split_once('=')
        .with_context(|| format!("field '{}' is not name=column", spec))?;
    let (column, flags) = match rest.split_once(':') {
        Some((column, flags)) => (column, flags),
        None => (rest, "filter,sort,group"),
    };
    if name.trim().is_empty() || column.trim().is_empty() {
        bail!("field '{}' needs both a name and a column", spec);
    }

    let mut field = FieldConfig::new(column.trim());
    for flag in flags.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        field = match flag {
            "filter" => field.filterable(),
            "sort" => field.sortable(),
            "group" => field.groupable(),
            other => bail!("unknown field flag '{}' (expected filter, sort or group)", other),
        };
    }
    Ok((name.trim().to_string(), field))
}

fn run_rebind(query: &str, raw_args: &str, dialect: Dialect) -> Result<()> {
    let json: serde_json::Value = serde_json::from_str(raw_args).context("--args must be JSON")?;
    let args = match &json {
        serde_json::Value::Array(items) => items.iter().map(Value::from_json).collect(),
        other => bail!("--args must be a JSON array, got {}", other),
    };

    let (sql, values) = prepare(dialect, query, args)?;
    print_query(&sql, &values, dialect);
    Ok(())
}

fn print_query(sql: &str, args: &[Value], dialect: Dialect) {
    println!("{}", "Generated SQL:".green().bold());
    println!("{}", sql.white());

    if !args.is_empty() {
        println!();
        println!("{}", "Bindings:".cyan());
        for (i, arg) in args.iter().enumerate() {
            println!("  {} = {}", dialect.placeholder(i + 1), arg.to_string().yellow());
        }
    }
}

fn show_scan(query: &str) {
    let scan = scan_clauses(query);
    let mark = |present: bool| {
        if present {
            "yes".green().bold()
        } else {
            "no".dimmed()
        }
    };

    println!("{} {}", "Query:".dimmed(), query.yellow());
    println!("  {:10} {}", "where", mark(scan.has_where));
    println!("  {:10} {}", "group by", mark(scan.has_group));
    println!("  {:10} {}", "order by", mark(scan.has_order));
    println!("  {:10} {}", "limit", mark(scan.has_limit));
}

fn show_operators() {
    println!("{}", "Filter Operators".cyan().bold());
    println!();
    println!(
        "{:16} {:8} {}",
        "Operator".white().bold(),
        "Binds".white().bold(),
        "SQL".white().bold()
    );
    println!("{}", "─".repeat(60).dimmed());

    for op in Operator::ALL {
        let binds = if op.binds_value() { "yes" } else { "no" };
        println!(
            "{:16} {:8} {}",
            op.as_str().cyan().bold(),
            binds.yellow(),
            format!("col {}", op.template().unwrap_or_default()).dimmed()
        );
    }

    println!();
    println!(
        "{}",
        "A list value compiles to 'col in (?)' whatever the operator.".dimmed()
    );
}
