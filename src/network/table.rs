//! Static component data held as a table of assets by attribute.
use super::component::ComponentType;
use crate::id::AssetID;
use anyhow::{Context, Result, bail, ensure};
use indexmap::{IndexMap, IndexSet};
use std::fmt;

/// A single cell of a [`ComponentTable`]
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// No value given
    Missing,
    /// A boolean flag
    Bool(bool),
    /// A number
    Number(f64),
    /// Free text, usually a name or a reference to another asset
    Text(String),
}

impl Value {
    /// Interpret a raw CSV cell
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Self::Missing;
        }
        if raw.eq_ignore_ascii_case("true") {
            return Self::Bool(true);
        }
        if raw.eq_ignore_ascii_case("false") {
            return Self::Bool(false);
        }
        match raw.parse::<f64>() {
            Ok(value) if value.is_nan() => Self::Missing,
            Ok(value) => Self::Number(value),
            Err(_) => Self::Text(raw.to_string()),
        }
    }

    /// Whether this cell is empty
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// The text this cell refers to, if it holds a usable reference.
    ///
    /// Empty cells, numbers (including zero) and the text `"0"` do not count as references.
    pub fn as_reference(&self) -> Option<&str> {
        match self {
            Self::Text(text) if !text.is_empty() && text != "0" => Some(text),
            _ => None,
        }
    }

    /// Whether this cell holds the flag value one (or `True`)
    pub fn is_one(&self) -> bool {
        match self {
            Self::Bool(value) => *value,
            Self::Number(value) => (*value - 1.0).abs() < f64::EPSILON,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => Ok(()),
            Self::Bool(true) => write!(f, "True"),
            Self::Bool(false) => write!(f, "False"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(text) => write!(f, "{text}"),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        if value.is_nan() {
            Self::Missing
        } else {
            Self::Number(value)
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// The static attributes of every asset of one component type.
///
/// Rows are kept in insertion order, as are columns. Columns not present in the input data are
/// created on first write.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentTable {
    component: ComponentType,
    columns: IndexSet<String>,
    rows: IndexMap<AssetID, Vec<Value>>,
}

impl ComponentTable {
    /// Create an empty table for the given component type
    pub fn new(component: ComponentType) -> Self {
        Self {
            component,
            columns: IndexSet::new(),
            rows: IndexMap::new(),
        }
    }

    /// The component type held in this table
    pub fn component(&self) -> ComponentType {
        self.component
    }

    /// The number of assets
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no assets
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over asset IDs in order
    pub fn ids(&self) -> impl Iterator<Item = &AssetID> {
        self.rows.keys()
    }

    /// The asset IDs and their row data
    pub(crate) fn rows(&self) -> &IndexMap<AssetID, Vec<Value>> {
        &self.rows
    }

    /// Iterate over column names in order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// Whether the table has the given column
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    /// Whether the table has a row for the given asset
    pub fn contains(&self, id: &str) -> bool {
        self.rows.contains_key(id)
    }

    /// Get the stored copy of an asset ID
    pub fn get_id(&self, id: &str) -> Option<&AssetID> {
        self.rows.get_key_value(id).map(|(key, _)| key)
    }

    /// Add a new asset row.
    ///
    /// Columns not yet in the table are added; other columns are left empty for this row.
    pub fn insert_row<I, S>(&mut self, id: AssetID, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, Value)>,
        S: AsRef<str>,
    {
        ensure!(
            !self.rows.contains_key(&id),
            "Duplicate {} ID: {id}",
            self.component
        );
        self.rows
            .insert(id.clone(), vec![Value::Missing; self.columns.len()]);
        for (column, value) in values {
            self.set(&id, column.as_ref(), value)?;
        }

        Ok(())
    }

    /// Get a cell, or `None` if either the asset or the column does not exist
    pub fn get(&self, id: &str, column: &str) -> Option<&Value> {
        let idx = self.columns.get_index_of(column)?;
        self.rows.get(id).map(|row| &row[idx])
    }

    /// Set a cell, creating the column if needed
    pub fn set(&mut self, id: &str, column: &str, value: Value) -> Result<()> {
        ensure!(
            self.rows.contains_key(id),
            "Unknown {} ID: {id}",
            self.component
        );
        let (idx, added) = self.columns.insert_full(column.to_string());
        if added {
            for row in self.rows.values_mut() {
                row.push(Value::Missing);
            }
        }
        self.rows[id][idx] = value;

        Ok(())
    }

    /// Set a cell for every asset, creating the column if needed
    pub fn set_column<F>(&mut self, column: &str, mut f: F) -> Result<()>
    where
        F: FnMut(&AssetID) -> Result<Value>,
    {
        let ids: Vec<_> = self.rows.keys().cloned().collect();
        for id in ids {
            let value = f(&id)?;
            self.set(&id, column, value)?;
        }

        Ok(())
    }

    /// Iterate over the cells of a column.
    ///
    /// Yields nothing if the column does not exist.
    pub fn iter_column<'a>(
        &'a self,
        column: &str,
    ) -> impl Iterator<Item = (&'a AssetID, &'a Value)> + use<'a> {
        let idx = self.columns.get_index_of(column);
        self.rows
            .iter()
            .filter_map(move |(id, row)| idx.map(|idx| (id, &row[idx])))
    }

    /// Get a numeric attribute, falling back on the component type's default if absent
    pub fn get_f64(&self, id: &str, column: &str) -> Result<f64> {
        ensure!(self.contains(id), "Unknown {} ID: {id}", self.component);
        match self.get(id, column).unwrap_or(&Value::Missing) {
            Value::Number(value) => Ok(*value),
            Value::Bool(value) => Ok(if *value { 1.0 } else { 0.0 }),
            Value::Missing => self.component.default_value(column).with_context(|| {
                format!("No value for {column} of {} {id}", self.component)
            }),
            Value::Text(text) => bail!(
                "Expected a number for {column} of {} {id}, found \"{text}\"",
                self.component
            ),
        }
    }

    /// Get a numeric attribute, returning `None` if it is absent and has no default
    pub fn get_f64_opt(&self, id: &str, column: &str) -> Result<Option<f64>> {
        match self.get(id, column).unwrap_or(&Value::Missing) {
            Value::Missing if self.component.default_value(column).is_none() => Ok(None),
            _ => self.get_f64(id, column).map(Some),
        }
    }

    /// Get a boolean attribute. Absent values are `false`.
    pub fn get_bool(&self, id: &str, column: &str) -> Result<bool> {
        ensure!(self.contains(id), "Unknown {} ID: {id}", self.component);
        match self.get(id, column).unwrap_or(&Value::Missing) {
            Value::Missing => Ok(false),
            Value::Bool(value) => Ok(*value),
            Value::Number(value) => Ok(*value != 0.0),
            Value::Text(text) => bail!(
                "Expected a boolean for {column} of {} {id}, found \"{text}\"",
                self.component
            ),
        }
    }

    /// Get a text attribute, if present
    pub fn get_str(&self, id: &str, column: &str) -> Option<&str> {
        match self.get(id, column)? {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The IDs of assets for which the predicate holds
    pub fn select<F>(&self, mut predicate: F) -> Vec<AssetID>
    where
        F: FnMut(&AssetID) -> bool,
    {
        self.rows.keys().filter(|id| predicate(id)).cloned().collect()
    }

    /// The IDs of assets whose capacity may be optimised.
    ///
    /// Empty for component types without a nominal capacity.
    pub fn extendable_ids(&self) -> Result<Vec<AssetID>> {
        let Some(attr) = self.component.capacity_attr() else {
            return Ok(Vec::new());
        };

        let mut ids = Vec::new();
        for id in self.rows.keys() {
            if self.get_bool(id, attr.extendable())? {
                ids.push(id.clone());
            }
        }

        Ok(ids)
    }

    /// Whether the given asset's capacity may be optimised
    pub fn is_extendable(&self, id: &str) -> Result<bool> {
        match self.component.capacity_attr() {
            Some(attr) => self.get_bool(id, attr.extendable()),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::{fixture, rstest};

    #[fixture]
    fn links() -> ComponentTable {
        let mut table = ComponentTable::new(ComponentType::Link);
        table
            .insert_row(
                "Lk1".into(),
                [
                    ("bus0", Value::from("B1")),
                    ("p_nom", Value::from(100.0)),
                    ("p_nom_extendable", Value::from(true)),
                ],
            )
            .unwrap();
        table
            .insert_row(
                "Lk2".into(),
                [("bus0", Value::from("B2")), ("p_nom", Value::from(50.0))],
            )
            .unwrap();
        table
    }

    #[rstest]
    #[case("", Value::Missing)]
    #[case("  ", Value::Missing)]
    #[case("nan", Value::Missing)]
    #[case("True", Value::Bool(true))]
    #[case("false", Value::Bool(false))]
    #[case("1.5", Value::Number(1.5))]
    #[case("inf", Value::Number(f64::INFINITY))]
    #[case("0", Value::Number(0.0))]
    #[case("reserve_area_1", Value::Text("reserve_area_1".into()))]
    fn test_value_parse(#[case] raw: &str, #[case] expected: Value) {
        assert_eq!(Value::parse(raw), expected);
    }

    #[rstest]
    #[case(Value::Text("Lk2".into()), Some("Lk2"))]
    #[case(Value::Text("0".into()), None)]
    #[case(Value::Text(String::new()), None)]
    #[case(Value::Number(0.0), None)]
    #[case(Value::Missing, None)]
    fn test_value_as_reference(#[case] value: Value, #[case] expected: Option<&str>) {
        assert_eq!(value.as_reference(), expected);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::Number(100.0).to_string(), "100");
        assert_eq!(Value::Missing.to_string(), "");
    }

    #[rstest]
    fn test_insert_row_adds_columns(links: ComponentTable) {
        assert_eq!(
            links.columns().collect::<Vec<_>>(),
            ["bus0", "p_nom", "p_nom_extendable"]
        );
        assert_eq!(links.get("Lk2", "p_nom_extendable"), Some(&Value::Missing));
    }

    #[rstest]
    fn test_insert_row_duplicate(mut links: ComponentTable) {
        assert_error!(
            links.insert_row("Lk1".into(), [("p_nom", Value::from(1.0))]),
            "Duplicate Link ID: Lk1"
        );
    }

    #[rstest]
    fn test_get_f64(links: ComponentTable) {
        assert_eq!(links.get_f64("Lk1", "p_nom").unwrap(), 100.0);
        // Absent columns fall back on defaults
        assert_eq!(links.get_f64("Lk1", "efficiency").unwrap(), 1.0);
        assert_eq!(links.get_f64("Lk1", "p_nom_max").unwrap(), f64::INFINITY);
        assert_error!(
            links.get_f64("Lk1", "reserve_level_1"),
            "No value for reserve_level_1 of Link Lk1"
        );
        assert_error!(
            links.get_f64("Lk1", "bus0"),
            "Expected a number for bus0 of Link Lk1, found \"B1\""
        );
        assert_eq!(links.get_f64_opt("Lk1", "reserve_level_1").unwrap(), None);
    }

    #[rstest]
    fn test_set_creates_column(mut links: ComponentTable) {
        links.set("Lk2", "p_nom_opt", Value::from(20.0)).unwrap();
        assert_eq!(links.get("Lk1", "p_nom_opt"), Some(&Value::Missing));
        assert_eq!(links.get_f64("Lk2", "p_nom_opt").unwrap(), 20.0);
        assert!(links.set("Lk3", "p_nom", Value::from(1.0)).is_err());
    }

    #[rstest]
    fn test_extendable_ids(links: ComponentTable) {
        assert_eq!(links.extendable_ids().unwrap(), [AssetID::new("Lk1")]);
        assert!(links.is_extendable("Lk1").unwrap());
        assert!(!links.is_extendable("Lk2").unwrap());
    }

    #[rstest]
    fn test_select_and_iter_column(links: ComponentTable) {
        let selected = links.select(|id| links.get_str(id, "bus0") == Some("B2"));
        assert_eq!(selected, [AssetID::new("Lk2")]);
        assert_eq!(links.iter_column("bus0").count(), 2);
        assert_eq!(links.iter_column("not_a_column").count(), 0);
    }
}
