use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the config file (ingestor.toml). Defaults apply when it does not exist.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the live insider-activity dataset
    Insiders,

    /// Fetch daily prices for a list of symbols in rate-limited windows
    #[command(group(ArgGroup::new("input").required(true).args(["symbols", "symbols_file"])))]
    Prices {
        /// Comma-separated list of symbols (e.g. "AAPL,MSFT")
        #[arg(long)]
        symbols: Option<String>,

        /// File with one symbol per line (or comma-separated); `#` starts a comment
        #[arg(long, value_name = "FILE")]
        symbols_file: Option<PathBuf>,
    },

    /// Insiders, then prices for every traded symbol, then the merged dataset
    Run,

    /// Left-join an insider CSV with a price CSV on (Ticker, Date)
    Merge {
        #[arg(long, value_name = "FILE")]
        insiders: PathBuf,

        #[arg(long, value_name = "FILE")]
        prices: PathBuf,

        /// Output file; defaults to the configured output directory
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn prices_requires_a_symbol_source() {
        assert!(Cli::try_parse_from(["insider-ingestor", "prices"]).is_err());
        let cli =
            Cli::try_parse_from(["insider-ingestor", "prices", "--symbols", "AAA,BBB"]).unwrap();
        assert!(matches!(cli.command, Commands::Prices { symbols: Some(_), .. }));
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
    }
}
