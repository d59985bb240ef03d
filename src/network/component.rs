//! Component types and the attributes they carry.
use strum::{Display, EnumIter, IntoEnumIterator};

/// The kinds of component held in a [`Network`](super::Network).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
pub enum ComponentType {
    /// An electrical node
    Bus,
    /// A demand attached to a bus
    Load,
    /// A generator attached to a bus
    Generator,
    /// A passive AC line between two buses
    Line,
    /// A transformer between two buses
    Transformer,
    /// A controllable, directed flow between two buses (with efficiency)
    Link,
    /// A generic energy store attached to a bus
    Store,
    /// A storage unit with a fixed energy-to-power ratio
    StorageUnit,
}

/// The nominal capacity attribute of a component type.
///
/// Each variant knows the names of the bound, flag and result columns that go with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapacityAttr {
    /// Nominal power (MW)
    PNom,
    /// Nominal apparent power (MVA)
    SNom,
    /// Nominal energy (MWh)
    ENom,
}

impl CapacityAttr {
    /// The capacity column itself, e.g. `p_nom`
    pub fn name(self) -> &'static str {
        match self {
            Self::PNom => "p_nom",
            Self::SNom => "s_nom",
            Self::ENom => "e_nom",
        }
    }

    /// The minimum capacity bound column, e.g. `p_nom_min`
    pub fn min(self) -> &'static str {
        match self {
            Self::PNom => "p_nom_min",
            Self::SNom => "s_nom_min",
            Self::ENom => "e_nom_min",
        }
    }

    /// The maximum capacity bound column, e.g. `p_nom_max`
    pub fn max(self) -> &'static str {
        match self {
            Self::PNom => "p_nom_max",
            Self::SNom => "s_nom_max",
            Self::ENom => "e_nom_max",
        }
    }

    /// The optimised capacity column, e.g. `p_nom_opt`
    pub fn opt(self) -> &'static str {
        match self {
            Self::PNom => "p_nom_opt",
            Self::SNom => "s_nom_opt",
            Self::ENom => "e_nom_opt",
        }
    }

    /// The flag column saying whether the capacity may be optimised, e.g. `p_nom_extendable`
    pub fn extendable(self) -> &'static str {
        match self {
            Self::PNom => "p_nom_extendable",
            Self::SNom => "s_nom_extendable",
            Self::ENom => "e_nom_extendable",
        }
    }
}

impl ComponentType {
    /// The plural name used for files and tables, e.g. `storage_units`
    pub fn list_name(self) -> &'static str {
        match self {
            Self::Bus => "buses",
            Self::Load => "loads",
            Self::Generator => "generators",
            Self::Line => "lines",
            Self::Transformer => "transformers",
            Self::Link => "links",
            Self::Store => "stores",
            Self::StorageUnit => "storage_units",
        }
    }

    /// The nominal capacity attribute for this component type, if it has one
    pub fn capacity_attr(self) -> Option<CapacityAttr> {
        match self {
            Self::Generator | Self::Link | Self::StorageUnit => Some(CapacityAttr::PNom),
            Self::Line | Self::Transformer => Some(CapacityAttr::SNom),
            Self::Store => Some(CapacityAttr::ENom),
            Self::Bus | Self::Load => None,
        }
    }

    /// Iterate over the component types which have a nominal capacity, paired with it
    pub fn iter_with_capacity() -> impl Iterator<Item = (ComponentType, CapacityAttr)> {
        Self::iter().filter_map(|c| c.capacity_attr().map(|attr| (c, attr)))
    }

    /// The value used for a numeric attribute which is absent from the input data.
    ///
    /// Returns `None` for attributes without a standard default.
    pub fn default_value(self, attr: &str) -> Option<f64> {
        let common = match attr {
            "p_nom" | "s_nom" | "e_nom" => Some(0.0),
            "p_nom_min" | "s_nom_min" | "e_nom_min" => Some(0.0),
            "p_nom_max" | "s_nom_max" | "e_nom_max" => Some(f64::INFINITY),
            "marginal_cost" | "capital_cost" => Some(0.0),
            "standing_loss" => Some(0.0),
            "p_set" => Some(0.0),
            _ => None,
        };
        if common.is_some() {
            return common;
        }

        match (self, attr) {
            (Self::Generator | Self::Link, "p_min_pu") => Some(0.0),
            (Self::Generator | Self::Link | Self::StorageUnit, "p_max_pu") => Some(1.0),
            (Self::StorageUnit, "p_min_pu") => Some(-1.0),
            (Self::Link, "efficiency") => Some(1.0),
            (Self::Line | Self::Transformer, "s_max_pu") => Some(1.0),
            (Self::StorageUnit, "max_hours") => Some(1.0),
            (Self::StorageUnit, "efficiency_store" | "efficiency_dispatch") => Some(1.0),
            (Self::StorageUnit, "state_of_charge_initial" | "inflow") => Some(0.0),
            (Self::Store, "e_min_pu" | "e_initial") => Some(0.0),
            (Self::Store, "e_max_pu") => Some(1.0),
            _ => None,
        }
    }

    /// Look up a component type by its plural name
    pub fn from_list_name(name: &str) -> Option<Self> {
        Self::iter().find(|c| c.list_name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ComponentType::Generator, Some("p_nom"))]
    #[case(ComponentType::Link, Some("p_nom"))]
    #[case(ComponentType::StorageUnit, Some("p_nom"))]
    #[case(ComponentType::Line, Some("s_nom"))]
    #[case(ComponentType::Transformer, Some("s_nom"))]
    #[case(ComponentType::Store, Some("e_nom"))]
    #[case(ComponentType::Bus, None)]
    #[case(ComponentType::Load, None)]
    fn test_capacity_attr(#[case] component: ComponentType, #[case] expected: Option<&str>) {
        assert_eq!(component.capacity_attr().map(CapacityAttr::name), expected);
    }

    #[test]
    fn test_capacity_attr_columns() {
        let attr = CapacityAttr::ENom;
        assert_eq!(attr.min(), "e_nom_min");
        assert_eq!(attr.max(), "e_nom_max");
        assert_eq!(attr.opt(), "e_nom_opt");
        assert_eq!(attr.extendable(), "e_nom_extendable");
    }

    #[test]
    fn test_iter_with_capacity() {
        assert_eq!(ComponentType::iter_with_capacity().count(), 6);
    }

    #[test]
    fn test_default_value() {
        assert_eq!(
            ComponentType::StorageUnit.default_value("p_min_pu"),
            Some(-1.0)
        );
        assert_eq!(ComponentType::Link.default_value("p_min_pu"), Some(0.0));
        assert_eq!(
            ComponentType::Link.default_value("p_nom_max"),
            Some(f64::INFINITY)
        );
        assert_eq!(ComponentType::Link.default_value("reserve_area"), None);
    }

    #[test]
    fn test_from_list_name() {
        assert_eq!(
            ComponentType::from_list_name("storage_units"),
            Some(ComponentType::StorageUnit)
        );
        assert_eq!(ComponentType::from_list_name("widgets"), None);
    }
}
