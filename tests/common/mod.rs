//! A small two-year case written to a temporary folder, shared by the integration tests.
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// The required reserve for level 1 in area 1 in 2024 (MW)
#[allow(dead_code)]
pub const RESERVE_REQUIREMENT: f64 = 8.0;

/// Write a file inside the case folder, creating folders as needed
fn write(case_dir: &Path, relative_path: &str, contents: &str) {
    let file_path = case_dir.join(relative_path);
    fs::create_dir_all(file_path.parent().unwrap()).unwrap();
    fs::write(file_path, contents).unwrap();
}

/// Write the network shared by both years into `dir`
fn write_network(dir: &Path) {
    write(dir, "snapshots.csv", "snapshot,weightings\nt1,1\nt2,1\n");
    write(dir, "buses.csv", "name,carrier\nB1,AC\nB2,AC\n");
    write(dir, "loads.csv", "name,bus,p_set\nL1,B1,0\nL2,B2,5\n");
    write(dir, "loads-p_set.csv", "snapshot,L1\nt1,10\nt2,20\n");
    write(
        dir,
        "generators.csv",
        "name,bus,carrier,p_nom,marginal_cost\nG1,B1,gas,100,5\n",
    );
    write(
        dir,
        "links.csv",
        "name,bus0,bus1,carrier,p_nom,p_nom_extendable,capital_cost,reserve_area,reserve_level_1\n\
         Lk1,B1,B2,DC,40,True,1,reserve_area_1,1\n\
         Lk2,B2,B1,DC,50,False,0,reserve_area_2,0.4\n",
    );
}

/// Create a case with study years 2024 and 2025.
///
/// G1 at B1 serves L1 directly and L2 at B2 through the extendable link Lk1; Lk2 can carry power
/// back. Only 2024 has a reserve requirement, which forces Lk1 to carry (and so be built to) at
/// least [`RESERVE_REQUIREMENT`] MW. 2025 has a load increase file.
#[allow(dead_code)]
pub fn create_case() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let case_dir = dir.path();
    for year in ["2024", "2025"] {
        write_network(&case_dir.join(year).join("Inputs"));
    }
    write(
        case_dir,
        "2024/Inputs/reserves.csv",
        &format!("level_area,value_mw\nreserve_level_1_reserve_area_1,{RESERVE_REQUIREMENT}\n"),
    );
    write(
        case_dir,
        "2025/Inputs/inc_load.csv",
        "inc_load,value_mw\nL2,2\n",
    );

    dir
}
