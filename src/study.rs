//! Running a multi-year study over a case folder.
//!
//! A case folder holds one subfolder per study year. Each study type reads the network from one
//! subfolder of the year folder and writes its results to another, so study types are run in
//! sequence: unconstrained expansion, then optimum expansion, then incremental demand expansion.
use crate::coupling::couple_linked_capacities;
use crate::hydro::add_hydro_turbine_efficiency;
use crate::network::Network;
use crate::optimisation::{LinearModel, create_model, solve, write_solution};
use crate::reserves::{RESERVES_FILE_NAME, ReserveRequirements, build_reserve_constraints};
use crate::settings::Settings;
use crate::summary::{add_summaries, write_statistics};
use anyhow::{Context, Result, ensure};
use clap::ValueEnum;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use strum::Display;

mod prepare;
pub use prepare::Preparation;
pub mod report;
pub use report::YearReport;

/// Input files which are copied alongside the results
const COPIED_FILE_NAMES: [&str; 2] = [RESERVES_FILE_NAME, crate::demand::LOAD_INCREASE_FILE_NAME];

/// The kinds of study which can be run on a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, ValueEnum)]
pub enum StudyType {
    /// Optimise capacities from the original inputs
    #[strum(to_string = "unconstrained expansion")]
    UnconstrainedExpansion,
    /// Re-optimise, with minimum capacities following the previous year's results
    #[strum(to_string = "optimum expansion")]
    OptimumExpansion,
    /// Fix the optimised capacities, then optimise again with extra demand
    #[strum(to_string = "incremental demand expansion")]
    IncrementalDemandExpansion,
}

impl StudyType {
    /// The name of the year subfolder the network is read from
    pub fn input_folder(self) -> &'static str {
        match self {
            Self::UnconstrainedExpansion => "Inputs",
            Self::OptimumExpansion => "Results_uc",
            Self::IncrementalDemandExpansion => "Results_opt",
        }
    }

    /// The name of the year subfolder results are written to
    pub fn results_folder(self) -> &'static str {
        match self {
            Self::UnconstrainedExpansion => "Results_uc",
            Self::OptimumExpansion => "Results_opt",
            Self::IncrementalDemandExpansion => "Results_opti",
        }
    }
}

/// The input and results folders for one study year
#[derive(Debug, Clone, PartialEq)]
pub struct YearPaths {
    /// The study year
    pub year: u32,
    /// Where the network is read from
    pub input_dir: PathBuf,
    /// Where the results are written
    pub results_dir: PathBuf,
}

impl YearPaths {
    /// The folders for a year of the given study
    pub fn new(case_dir: &Path, year: u32, study_type: StudyType) -> Self {
        let year_dir = case_dir.join(year.to_string());
        Self {
            year,
            input_dir: year_dir.join(study_type.input_folder()),
            results_dir: year_dir.join(study_type.results_folder()),
        }
    }
}

/// Read the reserve requirements for a year, using no requirements if the file is absent
fn load_requirements(input_dir: &Path) -> Result<ReserveRequirements> {
    match ReserveRequirements::from_dir(input_dir)? {
        Some(requirements) => Ok(requirements),
        None => {
            warn!(
                "No {RESERVES_FILE_NAME} in {}: no reserve constraints will be added",
                input_dir.display()
            );
            Ok(ReserveRequirements::default())
        }
    }
}

/// Load and prepare the network for one year and build its model, including every extra
/// constraint
fn build_year(
    paths: &YearPaths,
    study_type: StudyType,
    settings: &Settings,
) -> Result<(Network, LinearModel, YearReport)> {
    let mut network = Network::from_csv_folder(&paths.input_dir)?;
    info!(
        "Loaded network for {} from {}",
        paths.year,
        paths.input_dir.display()
    );
    let preparation = prepare::prepare(study_type, &mut network, paths)
        .with_context(|| format!("Failed to prepare network for {}", paths.year))?;

    let mut model = create_model(&network)?;
    let hydro = add_hydro_turbine_efficiency(&network, &mut model)?;
    let coupling = couple_linked_capacities(&network, &mut model)?;
    let requirements = load_requirements(&paths.input_dir)?;
    let reserves = build_reserve_constraints(
        &network,
        &mut model,
        &requirements,
        &settings.reserve_options(),
    )?;
    info!(
        "Model for {} has {} variables and {} constraints",
        paths.year,
        model.num_columns(),
        model.num_rows()
    );

    let report = YearReport {
        year: paths.year,
        study_type,
        preparation,
        hydro,
        coupling,
        reserves,
        objective: None,
    };

    Ok((network, model, report))
}

/// Copy an input file to the results folder, if it exists
fn copy_input_file(paths: &YearPaths, file_name: &str) -> Result<()> {
    let from = paths.input_dir.join(file_name);
    if !from.is_file() {
        info!(
            "The file {file_name} does not exist in {}",
            paths.input_dir.display()
        );
        return Ok(());
    }

    let to = paths.results_dir.join(file_name);
    fs::copy(&from, &to)
        .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;

    Ok(())
}

/// Run one year of a study: build, solve and write the results
pub fn run_year(
    case_dir: &Path,
    year: u32,
    study_type: StudyType,
    settings: &Settings,
) -> Result<YearReport> {
    let paths = YearPaths::new(case_dir, year, study_type);
    ensure!(
        settings.overwrite || !Network::exists_at(&paths.results_dir),
        "Results for {year} already exist at {}. Enable overwrite to replace them.",
        paths.results_dir.display()
    );

    let (mut network, model, mut report) = build_year(&paths, study_type, settings)?;
    let solution = solve(&model, &settings.solver_options())
        .with_context(|| format!("Failed to solve model for {year}"))?;
    info!("Solved {year} with objective {}", solution.objective());
    write_solution(&mut network, &model, &solution)?;
    add_summaries(&mut network)?;

    network.export_to_csv_folder(&paths.results_dir)?;
    write_statistics(&network, &paths.results_dir)?;
    for file_name in COPIED_FILE_NAMES {
        copy_input_file(&paths, file_name)?;
    }
    info!("Results for {year} written to {}", paths.results_dir.display());

    report.objective = Some(solution.objective());
    Ok(report)
}

/// Run a study for each of the given years, in order
pub fn run_study(
    case_dir: &Path,
    years: &[u32],
    study_type: StudyType,
    settings: &Settings,
) -> Result<Vec<YearReport>> {
    info!(
        "Running {study_type}: {} to {}",
        study_type.input_folder(),
        study_type.results_folder()
    );

    years
        .iter()
        .map(|&year| {
            info!("Starting {study_type} for {year}");
            let report = run_year(case_dir, year, study_type, settings)
                .with_context(|| format!("Study failed for {year}"))?;
            report.log();
            Ok(report)
        })
        .collect()
}

/// Build the models for each of the given years without solving or writing anything
pub fn validate_study(
    case_dir: &Path,
    years: &[u32],
    study_type: StudyType,
    settings: &Settings,
) -> Result<Vec<YearReport>> {
    years
        .iter()
        .map(|&year| {
            let paths = YearPaths::new(case_dir, year, study_type);
            let (_, _, report) = build_year(&paths, study_type, settings)
                .with_context(|| format!("Validation failed for {year}"))?;
            report.log();
            Ok(report)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(StudyType::UnconstrainedExpansion, "Inputs", "Results_uc")]
    #[case(StudyType::OptimumExpansion, "Results_uc", "Results_opt")]
    #[case(StudyType::IncrementalDemandExpansion, "Results_opt", "Results_opti")]
    fn test_year_paths(#[case] study_type: StudyType, #[case] input: &str, #[case] results: &str) {
        let paths = YearPaths::new(Path::new("case"), 2025, study_type);
        assert_eq!(paths.input_dir, Path::new("case/2025").join(input));
        assert_eq!(paths.results_dir, Path::new("case/2025").join(results));
    }

    #[test]
    fn test_load_requirements_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_requirements(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_copy_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let paths = YearPaths::new(dir.path(), 2024, StudyType::UnconstrainedExpansion);
        fs::create_dir_all(&paths.input_dir).unwrap();
        fs::create_dir_all(&paths.results_dir).unwrap();
        fs::write(paths.input_dir.join(RESERVES_FILE_NAME), "level_area,value_mw\n").unwrap();

        for file_name in COPIED_FILE_NAMES {
            copy_input_file(&paths, file_name).unwrap();
        }
        assert!(paths.results_dir.join(RESERVES_FILE_NAME).is_file());
        assert!(
            !paths
                .results_dir
                .join(crate::demand::LOAD_INCREASE_FILE_NAME)
                .exists()
        );
    }
}
