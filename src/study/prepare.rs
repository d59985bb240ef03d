//! Changes made to a network before its model is built, depending on the study type.
use super::{StudyType, YearPaths};
use crate::capacity::{
    ComponentAsset, ContinuityReport, fix_n_minus_capacities, make_all_non_extendable,
    make_extendable, remove_proxy_plant,
};
use crate::demand::{
    LOAD_INCREASE_FILE_NAME, LoadIncrease, increase_load_fixed, read_load_increases,
};
use crate::id::AssetID;
use crate::network::Network;
use crate::outcome::{Outcome, SkipReason};
use anyhow::Result;
use log::warn;

/// What was done to the network before building the model
#[derive(Debug, Clone, PartialEq)]
pub enum Preparation {
    /// The network was used as read
    Unchanged,
    /// Minimum capacities were carried over from the previous year
    Continuity(ContinuityReport),
    /// Capacities were fixed and demand increased
    IncrementalDemand {
        /// Assets made extendable through the `make_ext` column
        made_extendable: Vec<ComponentAsset>,
        /// The load increases applied
        load_increases: Outcome<Vec<LoadIncrease>>,
        /// Proxy plant removed
        removed_proxies: Outcome<Vec<AssetID>>,
    },
}

/// Prepare a network for the given study type
pub fn prepare(
    study_type: StudyType,
    network: &mut Network,
    paths: &YearPaths,
) -> Result<Preparation> {
    match study_type {
        StudyType::UnconstrainedExpansion => Ok(Preparation::Unchanged),
        StudyType::OptimumExpansion => {
            let report = fix_n_minus_capacities(&paths.results_dir, network, paths.year)?;
            Ok(Preparation::Continuity(report))
        }
        StudyType::IncrementalDemandExpansion => {
            make_all_non_extendable(network)?;
            let made_extendable = make_extendable(network)?;
            let load_increases = match read_load_increases(&paths.input_dir)? {
                Some(increases) => {
                    increase_load_fixed(network, &increases)?;
                    Outcome::Applied(increases)
                }
                None => {
                    let file_path = paths.input_dir.join(LOAD_INCREASE_FILE_NAME);
                    warn!("No load increases: {} not found", file_path.display());
                    SkipReason::MissingFile(file_path).into()
                }
            };
            let removed_proxies = remove_proxy_plant(network)?;

            Ok(Preparation::IncrementalDemand {
                made_extendable,
                load_increases,
                removed_proxies,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::network;
    use crate::network::ComponentType;
    use rstest::rstest;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    /// Make the fixture network look solved
    fn solved(mut network: Network) -> Network {
        for (component, id, attr, value) in [
            (ComponentType::Link, "Lk1", "p_nom_opt", 80.0),
            (ComponentType::StorageUnit, "SU1", "p_nom_opt", 5.0),
        ] {
            network
                .table_mut(component)
                .set(id, attr, value.into())
                .unwrap();
        }
        network
    }

    #[rstest]
    fn test_prepare_unchanged(mut network: Network) {
        let original = network.clone();
        let paths = YearPaths::new(Path::new("case"), 2024, StudyType::UnconstrainedExpansion);
        assert_eq!(
            prepare(StudyType::UnconstrainedExpansion, &mut network, &paths).unwrap(),
            Preparation::Unchanged
        );
        assert_eq!(network, original);
    }

    #[rstest]
    fn test_prepare_continuity_first_year(mut network: Network) {
        let dir = tempdir().unwrap();
        let paths = YearPaths::new(dir.path(), 2024, StudyType::OptimumExpansion);
        let Preparation::Continuity(report) =
            prepare(StudyType::OptimumExpansion, &mut network, &paths).unwrap()
        else {
            panic!("Expected continuity report");
        };
        assert_eq!(
            report.prior,
            Outcome::Skipped(SkipReason::PriorYearMissing(
                dir.path().join("2023").join("Results_opt")
            ))
        );
    }

    #[rstest]
    fn test_prepare_incremental_demand(network: Network) {
        let mut network = solved(network);
        let dir = tempdir().unwrap();
        let paths = YearPaths::new(dir.path(), 2024, StudyType::IncrementalDemandExpansion);
        fs::create_dir_all(&paths.input_dir).unwrap();
        fs::write(
            paths.input_dir.join(LOAD_INCREASE_FILE_NAME),
            "inc_load,value_mw\nL1,1\n",
        )
        .unwrap();

        let preparation =
            prepare(StudyType::IncrementalDemandExpansion, &mut network, &paths).unwrap();
        let Preparation::IncrementalDemand {
            made_extendable,
            load_increases,
            removed_proxies,
        } = preparation
        else {
            panic!("Expected incremental demand preparation");
        };
        assert!(made_extendable.is_empty());
        assert!(load_increases.is_applied());
        assert!(!removed_proxies.is_applied());

        let links = network.table(ComponentType::Link);
        assert_eq!(links.get_f64("Lk1", "p_nom").unwrap(), 80.0);
        assert!(!links.is_extendable("Lk1").unwrap());
        assert_eq!(
            network
                .series(ComponentType::Load, "p_set")
                .unwrap()
                .get("L1")
                .unwrap(),
            [11.0, 21.0]
        );
    }

    #[rstest]
    fn test_prepare_incremental_demand_no_file(network: Network) {
        let mut network = solved(network);
        let dir = tempdir().unwrap();
        let paths = YearPaths::new(dir.path(), 2024, StudyType::IncrementalDemandExpansion);
        let Preparation::IncrementalDemand { load_increases, .. } =
            prepare(StudyType::IncrementalDemandExpansion, &mut network, &paths).unwrap()
        else {
            panic!("Expected incremental demand preparation");
        };
        assert_eq!(
            load_increases.skip_reason(),
            Some(&SkipReason::MissingFile(
                paths.input_dir.join(LOAD_INCREASE_FILE_NAME)
            ))
        );
    }
}
