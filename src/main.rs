use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use trajcat::error::{CatalogError, Result};
use trajcat::settings::Settings;
use trajcat::Catalog;

#[derive(Parser, Debug)]
#[command(name = "trajcat")]
#[command(about = "Resolve quantities and times to data locations through a catalog")]
struct Args {
    /// Catalog locator, or a path to a catalog file
    #[arg(short, long, env = "TRAJCAT_CATALOG")]
    catalog: String,

    /// Settings file
    #[arg(short, long)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the candidate locations of a quantity at a time
    Query {
        quantity: String,
        /// yyyy-mm-ddThh:mm:ss
        valid_at: String,
        #[arg(long, default_value = "")]
        tag: String,
        /// attr=value[:priority], repeatable
        #[arg(long = "prefer")]
        prefer: Vec<String>,
        /// desired snapshot spacing in hours
        #[arg(long)]
        spacing: Option<f64>,
        #[arg(long)]
        json: bool,
    },
    /// Print the value of a variable
    Value { name: String },
    /// Print the coordinate values of a dimension
    Dimension { name: String },
    /// Print the attribute names
    Attributes,
}

fn parse_preference(text: &str) -> Result<(String, String, i32)> {
    let bad = || CatalogError::Settings(format!("bad preference '{text}', expected attr=value[:priority]"));
    let (attr, rest) = text.split_once('=').ok_or_else(bad)?;
    let (value, priority) = match rest.rsplit_once(':') {
        Some((value, p)) => (value, p.parse().map_err(|_| bad())?),
        None => (rest, 0),
    };
    Ok((attr.trim().to_owned(), value.trim().to_owned(), priority))
}

fn open(args: &Args, settings: Settings) -> Result<Catalog> {
    let path = PathBuf::from(&args.catalog);
    let mut catalog = Catalog::with_settings(&args.catalog, settings);
    if path.is_file() {
        catalog.load(Some(&path))?;
    } else {
        catalog.load(None)?;
    }
    Ok(catalog)
}

fn run(args: Args) -> Result<()> {
    let settings = Settings::load(args.settings.as_deref())?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let mut catalog = open(&args, settings)?;
    match &args.command {
        Command::Query { quantity, valid_at, tag, prefer, spacing, json } => {
            for p in prefer {
                let (attr, value, priority) = parse_preference(p)?;
                catalog.desire(&attr, &value, priority);
            }
            if let Some(hours) = spacing {
                catalog.set_time_spacing(*hours, None);
            }
            let found = catalog.query(quantity, valid_at, tag)?;
            if *json {
                let text = serde_json::to_string_pretty(&found).map_err(|e| CatalogError::Settings(e.to_string()))?;
                println!("{text}");
            } else {
                for c in &found {
                    println!("{}\t{}\t{}\t{}\t{}", c.target, c.pre_time, c.pre, c.post_time, c.post);
                }
            }
        }
        Command::Value { name } => println!("{}", catalog.variable_value(name)?),
        Command::Dimension { name } => match catalog.dimension_values(name) {
            Some(d) => {
                let values: Vec<String> = d.values.iter().map(|v| v.to_string()).collect();
                println!("{} [{}]: {}", d.quantity, d.units, values.join(", "));
            }
            None => return Err(CatalogError::UnknownReference(name.clone())),
        },
        Command::Attributes => {
            for (i, name) in catalog.attributes().iter().enumerate() {
                println!("{i}\t{name}");
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            warn!(error = %e, "trajcat failed");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
