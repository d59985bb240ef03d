//! Code for working with study years.
use crate::input::is_sorted_and_unique;
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use std::fs;
use std::path::Path;

/// Find the study years of a case: the subfolders of `case_dir` whose names are integers.
///
/// Years are returned in ascending order.
pub fn find_year_dirs(case_dir: &Path) -> Result<Vec<u32>> {
    let entries = fs::read_dir(case_dir)
        .with_context(|| format!("Could not read case folder {}", case_dir.display()))?;

    let mut years = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(year) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.parse::<u32>().ok())
        {
            years.push(year);
        }
    }
    years.sort_unstable();

    Ok(years)
}

/// Parse a string of years separated by semicolons into a vector of u32 years.
///
/// The string can be either "all" (case-insensitive), a single year, or a semicolon-separated list
/// of years (e.g. "2024;2025" or "2024; 2025"). Listed years are sorted and duplicates removed.
///
/// # Arguments
///
/// - `s` - Input string to parse
/// - `valid_years` - The years for which the case has data
pub fn parse_year_str(s: &str, valid_years: &[u32]) -> Result<Vec<u32>> {
    let s = s.trim();
    ensure!(!s.is_empty(), "No years provided");
    ensure!(
        is_sorted_and_unique(valid_years),
        "Case years must be in order and unique"
    );

    if s.eq_ignore_ascii_case("all") {
        return Ok(valid_years.to_vec());
    }

    let parse_and_validate_year = |s: &str| {
        let year = s.trim().parse::<u32>().ok()?;
        valid_years.contains(&year).then_some(year)
    };
    let years: Vec<_> = s
        .split(';')
        .map(|y| parse_and_validate_year(y).with_context(|| format!("Invalid year: {y}")))
        .try_collect()?;

    Ok(years.into_iter().sorted_unstable().dedup().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    #[case("2024", &[2024, 2025], &[2024])]
    #[case("all", &[2024, 2025], &[2024,2025])]
    #[case("ALL", &[2024, 2025], &[2024,2025])]
    #[case(" ALL ", &[2024, 2025], &[2024,2025])]
    #[case("2024;2025", &[2024, 2025], &[2024,2025])]
    #[case("  2024;  2025", &[2024, 2025], &[2024,2025])] // whitespace should be stripped
    #[case("2025;2024;2025", &[2024, 2025], &[2024,2025])]
    fn test_parse_year_str_valid(
        #[case] input: &str,
        #[case] case_years: &[u32],
        #[case] expected: &[u32],
    ) {
        assert_eq!(parse_year_str(input, case_years).unwrap(), expected);
    }

    #[rstest]
    #[case("", &[2024], "No years provided")]
    #[case("2025", &[2024], "Invalid year: 2025")]
    #[case("a;2024", &[2024], "Invalid year: a")]
    #[case("2024;;2025", &[2024, 2025], "Invalid year: ")]
    fn test_parse_year_str_invalid(
        #[case] input: &str,
        #[case] case_years: &[u32],
        #[case] error_msg: &str,
    ) {
        assert_error!(parse_year_str(input, case_years), error_msg);
    }

    #[test]
    fn test_find_year_dirs() {
        let dir = tempdir().unwrap();
        for name in ["2025", "2024", "Inputs", "2023x"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("2026"), "not a folder").unwrap();

        assert_eq!(find_year_dirs(dir.path()).unwrap(), [2024, 2025]);
        assert!(find_year_dirs(&dir.path().join("missing")).is_err());
    }
}
