//! Multi-year capacity expansion studies on networks of power system components.
//!
//! Each study year's network is read from a folder of CSV files, turned into a linear programme,
//! extended with reserve, capacity coupling and hydro turbine constraints, solved with HiGHS and
//! written back out with the results.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod capacity;
pub mod cli;
pub mod coupling;
pub mod demand;
pub mod hydro;
pub mod id;
pub mod input;
pub mod log;
pub mod network;
pub mod optimisation;
pub mod outcome;
pub mod reserves;
pub mod settings;
pub mod study;
pub mod summary;
pub mod year;

#[cfg(test)]
mod fixture;

/// Get the config folder for the program.
///
/// This will be something like:
///
/// * Linux: `~/.config/powerplan`
/// * macOS: `~/Library/Application Support/powerplan`
/// * Windows: `C:\Users\{user}\AppData\Roaming\powerplan`
pub fn get_powerplan_config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_default();
    path.push("powerplan");

    path
}
