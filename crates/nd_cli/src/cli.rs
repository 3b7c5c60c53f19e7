use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use nd_inference::{Credentials, HumanDuration};

#[derive(Parser, Debug)]
#[command(author, version, about = "Filter, tag and group news articles", long_about = None)]
pub struct Cli {
    /// JSON feed: an array of {title, content, publication_date, url?} records
    #[arg(long, short, global = true, default_value = "articles.json")]
    pub input: PathBuf,

    /// JSON file with tagging options
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply the date and keyword filters and list articles passing all of them
    Filters(FilterArgs),
    /// Judge articles against a natural-language filter with an AI provider
    Tag(TagArgs),
    /// Group articles whose embeddings are close
    Group(GroupArgs),
    /// List articles similar to the one with the given title
    Similar(SimilarArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct DateRange {
    /// First publication day to keep (YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub start: Option<NaiveDate>,
    /// Last publication day to keep (YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub end: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct FilterArgs {
    #[command(flatten)]
    pub dates: DateRange,
    /// Case-insensitive title keyword, repeatable
    #[arg(long = "keyword", short)]
    pub keywords: Vec<String>,
}

#[derive(Args, Debug)]
pub struct TagArgs {
    /// Name the judgments are stored under
    #[arg(long, default_value = "ai_filter")]
    pub name: String,
    /// The filter, in plain words
    #[arg(long)]
    pub prompt: String,
    /// openai, claude, vertex, ollama, deepseek or dummy
    #[arg(long, default_value = "dummy")]
    pub provider: String,
    #[command(flatten)]
    pub dates: DateRange,
    /// Overrides the configured concurrency
    #[arg(long)]
    pub concurrency: Option<usize>,
    /// Overrides the configured request timeout (e.g. 30s, 1m)
    #[arg(long)]
    pub timeout: Option<HumanDuration>,
    /// Write the matching articles as JSON
    #[arg(long)]
    pub export: Option<PathBuf>,
    #[command(flatten)]
    pub credentials: CredentialArgs,
}

#[derive(Args, Clone, Default)]
pub struct CredentialArgs {
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub claude_api_key: Option<String>,
    #[arg(long, env = "DEEPSEEK_API_KEY", hide_env_values = true)]
    pub deepseek_api_key: Option<String>,
    #[arg(long, env = "VERTEX_PROJECT")]
    pub vertex_project: Option<String>,
    #[arg(long, env = "VERTEX_LOCATION")]
    pub vertex_location: Option<String>,
    #[arg(long, env = "VERTEX_ACCESS_TOKEN", hide_env_values = true)]
    pub vertex_access_token: Option<String>,
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,
}

impl fmt::Debug for CredentialArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&Credentials::from(self.clone()), f)
    }
}

impl From<CredentialArgs> for Credentials {
    fn from(args: CredentialArgs) -> Self {
        Credentials {
            openai_api_key: args.openai_api_key,
            claude_api_key: args.claude_api_key,
            deepseek_api_key: args.deepseek_api_key,
            vertex_project: args.vertex_project,
            vertex_location: args.vertex_location,
            vertex_access_token: args.vertex_access_token,
            ollama_url: args.ollama_url,
        }
    }
}

#[derive(Args, Debug)]
pub struct GroupArgs {
    /// Cosine similarity a member must exceed to join a group
    #[arg(long, default_value_t = 0.8)]
    pub threshold: f32,
    /// Also print the average-linkage merge steps
    #[arg(long)]
    pub dendrogram: bool,
}

#[derive(Args, Debug)]
pub struct SimilarArgs {
    /// Exact title of the reference article
    #[arg(long)]
    pub title: String,
    #[arg(long, default_value_t = 0.8)]
    pub threshold: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_tag_command() {
        let cli = Cli::try_parse_from([
            "nd",
            "--input",
            "feed.json",
            "-vv",
            "tag",
            "--prompt",
            "articles about vaccines",
            "--provider",
            "Ollama (local)",
            "--start",
            "2024-05-01",
            "--timeout",
            "45s",
        ])
        .unwrap();

        assert_eq!(cli.input, PathBuf::from("feed.json"));
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Tag(args) => {
                assert_eq!(args.name, "ai_filter");
                assert_eq!(args.provider, "Ollama (local)");
                assert_eq!(args.dates.start, NaiveDate::from_ymd_opt(2024, 5, 1));
                assert_eq!(args.timeout, Some(HumanDuration::from_secs(45)));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_filters_with_keywords() {
        let cli = Cli::try_parse_from(["nd", "filters", "-k", "covid", "--keyword", "vaccine", "--end", "2024-06-30"]).unwrap();
        match cli.command {
            Commands::Filters(args) => {
                assert_eq!(args.keywords, vec!["covid", "vaccine"]);
                assert!(args.dates.start.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
