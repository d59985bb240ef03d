//! Reading and writing networks as folders of CSV files.
//!
//! The layout is one `{list_name}.csv` file per component type (first column is the asset name),
//! one `{list_name}-{attr}.csv` file per time-varying attribute (first column is the snapshot,
//! other columns are assets) and an optional `snapshots.csv`.
use super::{ComponentType, Network, SeriesTable, Value};
use crate::input::input_err_msg;
use anyhow::{Context, Result, ensure};
use std::fs;
use std::path::Path;
use strum::IntoEnumIterator;

const SNAPSHOTS_FILE_NAME: &str = "snapshots.csv";
const NETWORK_FILE_NAME: &str = "network.csv";

/// Import a network from `dir`
pub fn import_from_csv_folder(dir: &Path) -> Result<Network> {
    ensure!(dir.is_dir(), "Directory {} does not exist", dir.display());

    let mut network = match read_snapshots(&dir.join(SNAPSHOTS_FILE_NAME))? {
        Some((snapshots, weightings)) => {
            let mut network = Network::new(snapshots);
            network.set_weightings(weightings)?;
            network
        }
        None => Network::default(),
    };

    for component in ComponentType::iter() {
        let file_path = dir.join(format!("{}.csv", component.list_name()));
        if file_path.is_file() {
            read_component_table(&mut network, component, &file_path)
                .with_context(|| input_err_msg(&file_path))?;
        }
    }

    for entry in fs::read_dir(dir)? {
        let file_path = entry?.path();
        let Some((component, attr)) = parse_series_file_name(&file_path) else {
            continue;
        };

        let series = read_series(&network, &file_path).with_context(|| input_err_msg(&file_path))?;
        *network.series_mut(component, &attr) = series;
    }

    Ok(network)
}

/// Work out which component and attribute a time-series file is for, from its name
fn parse_series_file_name(file_path: &Path) -> Option<(ComponentType, String)> {
    if file_path.extension()? != "csv" {
        return None;
    }
    let stem = file_path.file_stem()?.to_str()?;
    let (list_name, attr) = stem.split_once('-')?;
    let component = ComponentType::from_list_name(list_name)?;
    (!attr.is_empty()).then(|| (component, attr.to_string()))
}

/// Read snapshot labels and weightings, if the file exists
fn read_snapshots(file_path: &Path) -> Result<Option<(Vec<String>, Vec<f64>)>> {
    if !file_path.is_file() {
        return Ok(None);
    }

    let mut reader = csv::Reader::from_path(file_path).with_context(|| input_err_msg(file_path))?;
    let headers = reader.headers()?.clone();
    let weighting_idx = headers
        .iter()
        .position(|h| h == "weightings" || h == "objective");

    let mut snapshots = Vec::new();
    let mut weightings = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| input_err_msg(file_path))?;
        let label = record.get(0).unwrap_or_default().to_string();
        let weighting = match weighting_idx.and_then(|idx| record.get(idx)) {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid weighting for snapshot {label}: {raw}"))?,
            None => 1.0,
        };
        snapshots.push(label);
        weightings.push(weighting);
    }
    ensure!(
        !snapshots.is_empty(),
        "{} must contain at least one snapshot",
        file_path.display()
    );

    Ok(Some((snapshots, weightings)))
}

/// Read a static component table into the network
fn read_component_table(
    network: &mut Network,
    component: ComponentType,
    file_path: &Path,
) -> Result<()> {
    let mut reader = csv::Reader::from_path(file_path)?;
    let headers = reader.headers()?.clone();
    let table = network.table_mut(component);
    for record in reader.records() {
        let record = record?;
        let name = record.get(0).unwrap_or_default().trim();
        ensure!(!name.is_empty(), "Empty {component} name");

        let values = headers
            .iter()
            .zip(record.iter())
            .skip(1)
            .map(|(column, raw)| (column, Value::parse(raw)));
        table.insert_row(name.into(), values)?;
    }

    Ok(())
}

/// Read a time-series file
fn read_series(network: &Network, file_path: &Path) -> Result<SeriesTable> {
    let mut reader = csv::Reader::from_path(file_path)?;
    let headers = reader.headers()?.clone();
    let num_assets = headers.len().saturating_sub(1);

    let mut columns = vec![Vec::with_capacity(network.num_snapshots()); num_assets];
    let mut num_rows = 0;
    for record in reader.records() {
        let record = record?;
        let label = record.get(0).unwrap_or_default();
        let expected = network.snapshots().get(num_rows);
        ensure!(
            expected.is_some_and(|s| s == label),
            "Unexpected snapshot {label} in row {}",
            num_rows + 1
        );

        for (column, raw) in columns.iter_mut().zip(record.iter().skip(1)) {
            let value = match Value::parse(raw) {
                Value::Number(value) => value,
                Value::Missing => f64::NAN,
                other => anyhow::bail!("Invalid value in time series: {other}"),
            };
            column.push(value);
        }
        num_rows += 1;
    }
    ensure!(
        num_rows == network.num_snapshots(),
        "Expected {} snapshots, found {num_rows}",
        network.num_snapshots()
    );

    let mut series = SeriesTable::new(network.num_snapshots());
    for (name, values) in headers.iter().skip(1).zip(columns) {
        series.insert(name.into(), values)?;
    }

    Ok(series)
}

/// Export a network to `dir`, creating it if needed
pub fn export_to_csv_folder(network: &Network, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;

    let mut writer = csv::Writer::from_path(dir.join(SNAPSHOTS_FILE_NAME))?;
    writer.write_record(["snapshot", "weightings"])?;
    for (snapshot, weighting) in network.snapshots().iter().zip(network.weightings()) {
        writer.write_record([snapshot.clone(), weighting.to_string()])?;
    }
    writer.flush()?;

    if let Some(objective) = network.objective() {
        let mut writer = csv::Writer::from_path(dir.join(NETWORK_FILE_NAME))?;
        writer.write_record(["name", "objective"])?;
        writer.write_record([String::new(), objective.to_string()])?;
        writer.flush()?;
    }

    for table in network.iter_tables() {
        let file_path = dir.join(format!("{}.csv", table.component().list_name()));
        let mut writer = csv::Writer::from_path(&file_path)?;
        writer.write_record(std::iter::once("name").chain(table.columns()))?;
        for (id, row) in table.rows() {
            writer.write_record(
                std::iter::once(id.to_string()).chain(row.iter().map(Value::to_string)),
            )?;
        }
        writer.flush()?;
    }

    for (component, attr, series) in network.iter_series() {
        if series.is_empty() {
            continue;
        }

        let file_path = dir.join(format!("{}-{attr}.csv", component.list_name()));
        let mut writer = csv::Writer::from_path(&file_path)?;
        writer.write_record(
            std::iter::once("snapshot").chain(series.iter().map(|(id, _)| id.as_str())),
        )?;
        for (t, snapshot) in network.snapshots().iter().enumerate() {
            writer.write_record(
                std::iter::once(snapshot.clone())
                    .chain(series.iter().map(|(_, values)| Value::from(values[t]).to_string())),
            )?;
        }
        writer.flush()?;
    }

    Ok(())
}
