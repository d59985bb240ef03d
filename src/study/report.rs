//! What happened in each year of a study.
use super::{Preparation, StudyType};
use crate::coupling::{CouplingOutcome, CouplingReport};
use crate::outcome::Outcome;
use crate::reserves::ReserveReport;
use log::info;

/// The names of the constraints added by a coupling builder
fn coupled(outcome: &Outcome<CouplingReport>) -> impl Iterator<Item = &str> {
    outcome
        .applied()
        .into_iter()
        .flat_map(|report| report.added.iter().map(String::as_str))
}

/// The outcome of every step of one study year
#[derive(Debug, Clone, PartialEq)]
pub struct YearReport {
    /// The study year
    pub year: u32,
    /// The study that was run
    pub study_type: StudyType,
    /// Changes made to the network before building the model
    pub preparation: Preparation,
    /// Hydro turbine efficiency constraints added
    pub hydro: Outcome<Vec<String>>,
    /// Capacity coupling constraints added
    pub coupling: CouplingOutcome,
    /// Reserve variables and constraints added
    pub reserves: Outcome<ReserveReport>,
    /// The objective value, if the model was solved
    pub objective: Option<f64>,
}

impl YearReport {
    /// The names of all constraint blocks added on top of the base formulation
    pub fn added_constraints(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .hydro
            .applied()
            .map(|added| added.iter().map(String::as_str).collect())
            .unwrap_or_default();
        names.extend(coupled(&self.coupling.batteries));
        names.extend(coupled(&self.coupling.links));
        if let Some(reserves) = self.reserves.applied() {
            names.extend(reserves.constraint_names());
        }

        names
    }

    /// Write a summary of the report to the log
    pub fn log(&self) {
        let year = self.year;
        let steps = [
            ("hydro turbine efficiency", self.hydro.skip_reason()),
            ("link-battery coupling", self.coupling.batteries.skip_reason()),
            ("link-link coupling", self.coupling.links.skip_reason()),
            ("reserves", self.reserves.skip_reason()),
        ];
        for (step, reason) in steps {
            if let Some(reason) = reason {
                info!("{year}: skipped {step}: {reason}");
            }
        }

        if let Some(reserves) = self.reserves.applied() {
            for key in &reserves.skipped {
                info!("{year}: no reserve requirement for {key}");
            }
        }
        info!(
            "{year}: added {} constraint blocks",
            self.added_constraints().len()
        );
        if let Some(objective) = self.objective {
            info!("{year}: objective {objective}");
        }
    }
}
