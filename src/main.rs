use clap::{Parser, Subcommand};
use std::path::PathBuf;
use testcase_reviewer::Result;
use testcase_reviewer::commands::{build_index, review_file};
use testcase_reviewer::config::{Config, get_config_dir, run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "testcase-reviewer")]
#[command(about = "Reviews exported test cases against QA guidelines using retrieval-augmented generation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure LLM backends, guideline source, and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Build (or load) the persistent guideline vector index
    Index {
        /// Remove any existing index and rebuild from the guideline file
        #[arg(long)]
        force: bool,
    },
    /// Review a Zephyr export file (.csv or .json)
    Review {
        /// Path to the exported test cases
        file: PathBuf,
        /// Acceptance criteria, one per line
        #[arg(long)]
        acceptance_criteria: Option<String>,
        /// User story the test cases belong to
        #[arg(long)]
        user_story: Option<String>,
        /// Where to write the markdown report (default: output.md)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Index { force } => {
            let config = Config::load(get_config_dir()?)?;
            build_index(&config, force).await?;
        }
        Commands::Review {
            file,
            acceptance_criteria,
            user_story,
            output,
        } => {
            let config = Config::load(get_config_dir()?)?;
            review_file(&config, &file, acceptance_criteria, user_story, output).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["testcase-reviewer", "index"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            matches!(parsed.command, Commands::Index { .. });
        }
    }

    #[test]
    fn review_command_with_file() {
        let cli = Cli::try_parse_from(["testcase-reviewer", "review", "export.csv"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Review { file, output, .. } = parsed.command {
                assert_eq!(file, PathBuf::from("export.csv"));
                assert_eq!(output, None);
            }
        }
    }

    #[test]
    fn review_command_with_criteria() {
        let cli = Cli::try_parse_from([
            "testcase-reviewer",
            "review",
            "export.json",
            "--acceptance-criteria",
            "- user can log in",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Review {
                acceptance_criteria,
                ..
            } = parsed.command
            {
                assert_eq!(acceptance_criteria, Some("- user can log in".to_string()));
            }
        }
    }

    #[test]
    fn index_force_flag() {
        let cli = Cli::try_parse_from(["testcase-reviewer", "index", "--force"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Index { force } = parsed.command {
                assert!(force);
            }
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["testcase-reviewer", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["testcase-reviewer", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn review_requires_file() {
        let cli = Cli::try_parse_from(["testcase-reviewer", "review"]);
        assert!(cli.is_err());
    }
}
