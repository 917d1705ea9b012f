pub mod cli;
pub mod config;
pub mod fields;
pub mod filter;
pub mod item;
pub mod output;
pub mod select;

use anyhow::Context;
use colored::Colorize;

pub use cli::{Cli, OutputFormat, cli_parse};
pub use config::{ConfigError, QueryConfig, load_config};
pub use fields::{
    Amenable, CachePolicy, DuplicateFieldError, FieldDescriptor, FieldError, FieldLookup,
    FieldValue, MatcherType, Registry, ValueType,
};
pub use filter::{ConditionParser, Filter, FilterSyntaxError, parse};
pub use item::{Item, ItemAccessor, load_items, parse_items};
pub use select::{ItemFailure, Selection, select, select_strict, select_with};

/// Install the stderr log subscriber; `RUST_LOG` wins over the `-v` count.
fn init_logging(verbose: u8) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info,globset=warn"),
            2 => tracing_subscriber::EnvFilter::new("debug,globset=warn"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    // A second init (e.g. in tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Registry with the built-in fields plus the configured custom fields.
pub fn build_registry(config: &QueryConfig) -> Result<Registry, DuplicateFieldError> {
    let registry = Registry::with_builtins(&config.builtin_options())?;
    registry.register_all(config.custom_fields())?;
    Ok(registry)
}

pub fn run() -> anyhow::Result<()> {
    let cli = cli_parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref()).context("Failed to load config")?;
    let registry = build_registry(&config).context("Invalid custom field definitions")?;

    if cli.list_fields {
        println!("{}", output::format_field_list(&registry));
        return Ok(());
    }

    let Some(items_path) = cli.items.as_deref() else {
        anyhow::bail!("No items file given");
    };
    let items = load_items(items_path)?;
    tracing::info!("Loaded {} items from {}", items.len(), items_path.display());

    let default_field = cli
        .default_field
        .clone()
        .unwrap_or_else(|| config.default_field.clone());
    let matched = if cli.conditions.is_empty() {
        (0..items.len()).collect()
    } else {
        let filter = ConditionParser::new(&registry)
            .with_default_field(Some(default_field.as_str()))
            .parse_tokens(&cli.conditions)?;
        if cli.show_filter {
            eprintln!("{} {filter}", "Filter:".bold());
        }

        let selection = select_with(&filter, &items, cli.strict || config.strict)?;
        if !selection.is_clean() {
            let skipped = selection.errors.len();
            eprintln!(
                "{}",
                format!("Skipped {skipped} item(s) with unreadable fields").yellow()
            );
        }
        selection.matched
    };

    let fields = if cli.fields.is_empty() {
        &config.output_fields
    } else {
        &cli.fields
    };
    let rendered = match cli.output_format {
        OutputFormat::Text => output::format_items_text(&registry, &items, &matched, fields)?,
        OutputFormat::Json => output::format_items_json(&registry, &items, &matched, fields)?,
    };
    println!("{rendered}");

    Ok(())
}
