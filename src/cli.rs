//! The command line interface for running studies.
use crate::log;
use crate::settings::Settings;
use crate::study::{StudyType, YearReport, run_study, validate_study};
use crate::year::{find_year_dirs, parse_year_str};
use ::log::{info, warn};
use anyhow::{Context, Result, ensure};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for running studies.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options shared by the run and validate commands
#[derive(Args)]
pub struct StudyOpts {
    /// The study to run
    #[arg(short, long, value_enum, default_value_t = StudyType::UnconstrainedExpansion)]
    pub study: StudyType,
    /// The years to run: "all" or a semicolon-separated list such as "2024;2025"
    #[arg(short, long, default_value = "all")]
    pub years: String,
}

/// Options for the run command
#[derive(Args)]
pub struct RunOpts {
    /// Which study and years to run
    #[command(flatten)]
    pub study: StudyOpts,
    /// Whether to replace results for years which have already been solved
    #[arg(long)]
    pub overwrite: bool,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run a study on a case.
    Run {
        /// Path to the case folder.
        case_dir: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Build the models for a study without solving them.
    Validate {
        /// Path to the case folder.
        case_dir: PathBuf,
        /// Which study and years to validate
        #[command(flatten)]
        opts: StudyOpts,
    },
    /// List the study years of a case.
    Years {
        /// Path to the case folder.
        case_dir: PathBuf,
    },
    /// Manage the program settings file.
    Settings {
        /// The available subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { case_dir, opts } => handle_run_command(&case_dir, &opts, None).map(drop),
            Self::Validate { case_dir, opts } => {
                handle_validate_command(&case_dir, &opts, None).map(drop)
            }
            Self::Years { case_dir } => handle_years_command(&case_dir),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start a study
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ powerplan --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Work out which years of the case to use
fn select_years(case_dir: &Path, years: &str) -> Result<Vec<u32>> {
    let case_years = find_year_dirs(case_dir)?;
    ensure!(
        !case_years.is_empty(),
        "No year folders found in {}",
        case_dir.display()
    );

    parse_year_str(years, &case_years)
}

/// Handle the `run` command.
pub fn handle_run_command(
    case_dir: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<Vec<YearReport>> {
    // Load program settings, if not provided
    let mut settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // This setting can be overridden by command-line argument
    if opts.overwrite {
        settings.overwrite = true;
    }

    log::init(Some(settings.log_level.as_str()), Some(case_dir))
        .context("Failed to initialise logging.")?;

    let years = select_years(case_dir, &opts.study.years)?;
    info!("Case folder: {}", case_dir.display());
    info!("Years: {years:?}");

    // NB: We have to wait until the logger is initialised to display this warning
    if settings.overwrite {
        warn!("Existing results will be overwritten");
    }

    let reports = run_study(case_dir, &years, opts.study.study, &settings)?;
    info!("Study complete!");

    Ok(reports)
}

/// Handle the `validate` command.
pub fn handle_validate_command(
    case_dir: &Path,
    opts: &StudyOpts,
    settings: Option<Settings>,
) -> Result<Vec<YearReport>> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // Initialise program logger (we won't save log files when running the validate command)
    log::init(Some(settings.log_level.as_str()), None)
        .context("Failed to initialise logging.")?;

    let years = select_years(case_dir, &opts.years)?;
    let reports = validate_study(case_dir, &years, opts.study, &settings)
        .context("Failed to validate case.")?;
    info!("Case validation successful!");

    Ok(reports)
}

/// Handle the `years` command.
fn handle_years_command(case_dir: &Path) -> Result<()> {
    for year in find_year_dirs(case_dir)? {
        println!("{year}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_select_years() {
        let dir = tempdir().unwrap();
        assert!(select_years(dir.path(), "all").is_err());

        for year in ["2024", "2025"] {
            fs::create_dir(dir.path().join(year)).unwrap();
        }
        assert_eq!(select_years(dir.path(), "all").unwrap(), [2024, 2025]);
        assert_eq!(select_years(dir.path(), "2025").unwrap(), [2025]);
    }

    #[test]
    fn test_cli_parses_study() {
        let cli = Cli::try_parse_from([
            "powerplan",
            "run",
            "case",
            "--study",
            "optimum-expansion",
            "--years",
            "2024;2025",
        ])
        .unwrap();
        let Some(Commands::Run { case_dir, opts }) = cli.command else {
            panic!("Expected run command");
        };
        assert_eq!(case_dir, Path::new("case"));
        assert_eq!(opts.study.study, StudyType::OptimumExpansion);
        assert_eq!(opts.study.years, "2024;2025");
        assert!(!opts.overwrite);
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }
}
