use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

/// Select download items from a JSON snapshot using filter conditions
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON (or JSON5) file holding an array of item objects
    #[arg(required_unless_present = "list_fields")]
    pub items: Option<PathBuf>,

    /// Filter conditions, e.g. 'ratio=+1' 'size>4g' '[' 'alias=foo' OR 'is_complete=no' ']'
    pub conditions: Vec<String>,

    /// Path to a TOML configuration file
    #[arg(short, long, env = "RTQUERY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Field compared against conditions without '=' (overrides the config)
    #[arg(short = 'd', long)]
    pub default_field: Option<String>,

    /// Output format
    #[arg(short = 'O', long, value_enum, default_value_t = OutputFormat::Text)]
    pub output_format: OutputFormat,

    /// Comma separated list of fields to show for each matched item
    #[arg(short = 'o', long, value_delimiter = ',')]
    pub fields: Vec<String>,

    /// Abort on the first item whose fields cannot be read
    #[arg(long)]
    pub strict: bool,

    /// Print the parsed filter in canonical form before the results
    #[arg(long)]
    pub show_filter: bool,

    /// List all known fields and exit
    #[arg(long)]
    pub list_fields: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// A table for humans
    Text,
    /// A JSON array of objects
    Json,
}

pub fn cli_parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_conditions_and_fields() {
        let cli = Cli::try_parse_from([
            "rtquery", "items.json", "size>1g", "OR", "alias=foo", "-o", "name,size", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.items, Some(PathBuf::from("items.json")));
        assert_eq!(cli.conditions, vec!["size>1g", "OR", "alias=foo"]);
        assert_eq!(cli.fields, vec!["name", "size"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.output_format, OutputFormat::Text);
    }

    #[test]
    fn test_list_fields_needs_no_items() {
        let cli = Cli::try_parse_from(["rtquery", "--list-fields"]).unwrap();
        assert!(cli.list_fields);
        assert!(cli.items.is_none());
        assert!(Cli::try_parse_from(["rtquery"]).is_err());
    }
}
