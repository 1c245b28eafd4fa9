use clap::{ArgAction, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

use kb_core::SortBy;

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Increase verbosity. Can be used multiple times (e.g., -v, -vv).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index the knowledge base, watch it for changes and serve the HTTP API
    Serve {
        /// Knowledge base root (overrides the config file)
        #[arg(long)]
        root: Option<PathBuf>,
        /// Address to listen on (overrides the config file)
        #[arg(long)]
        listen: Option<SocketAddr>,
    },
    /// Index the knowledge base once and print statistics
    Index {
        /// 要索引的目录路径（可选，不提供则使用配置文件中的 root）
        root_path: Option<PathBuf>,
    },
    /// Index the knowledge base once and run a single query
    Search {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        category: Option<String>,
        /// Tag filter, may be repeated
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// relevance, date or size
        #[arg(long, default_value = "relevance", value_parser = parse_sort_by)]
        sort_by: SortBy,
        #[arg(long)]
        root: Option<PathBuf>,
    },
}

fn parse_sort_by(s: &str) -> Result<SortBy, String> {
    match s {
        "relevance" => Ok(SortBy::Relevance),
        "date" => Ok(SortBy::Date),
        "size" => Ok(SortBy::Size),
        other => Err(format!("unknown sort order '{other}' (expected relevance, date or size)")),
    }
}

impl Cli {
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_search_command() {
        let cli = Cli::try_parse_from([
            "kb-server", "-v", "search", "hello", "--limit", "5", "--tag", "a", "--tag", "b",
            "--sort-by", "date",
        ])
        .unwrap();
        assert_eq!(cli.log_level(), tracing::Level::DEBUG);
        match cli.command {
            Some(Commands::Search { query, limit, tags, sort_by, offset, .. }) => {
                assert_eq!(query, "hello");
                assert_eq!(limit, Some(5));
                assert_eq!(offset, 0);
                assert_eq!(tags, vec!["a", "b"]);
                assert_eq!(sort_by, SortBy::Date);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[rstest]
    #[case("relevance", Some(SortBy::Relevance))]
    #[case("size", Some(SortBy::Size))]
    #[case("newest", None)]
    fn test_parse_sort_by(#[case] input: &str, #[case] expected: Option<SortBy>) {
        assert_eq!(parse_sort_by(input).ok(), expected);
    }

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::try_parse_from(["kb-server", "serve", "--listen", "0.0.0.0:8080"]).unwrap();
        match cli.command {
            Some(Commands::Serve { root, listen }) => {
                assert!(root.is_none());
                assert_eq!(listen.unwrap().port(), 8080);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
