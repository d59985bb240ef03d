//! Fixtures for tests

use crate::network::{ComponentType, Network, Value};
use crate::reserves::ReserveRequirements;
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Add an asset to one of the network's tables
pub fn add_asset(
    network: &mut Network,
    component: ComponentType,
    id: &str,
    values: Vec<(&str, Value)>,
) {
    network
        .table_mut(component)
        .insert_row(id.into(), values)
        .unwrap();
}

/// A small two-bus network over two snapshots.
///
/// G1 at B1 (100 MW, marginal cost 5) serves load L1 (10 then 20 MW). Lk1 (B1 to B2) is
/// extendable and Lk2 (B2 to B1) is fixed at 50 MW. SU1 is an extendable battery at B2 and S1 a
/// fixed store at B2.
#[fixture]
pub fn network() -> Network {
    let mut network = Network::new(vec!["t1".into(), "t2".into()]);
    for bus in ["B1", "B2"] {
        add_asset(&mut network, ComponentType::Bus, bus, vec![("carrier", "AC".into())]);
    }
    add_asset(
        &mut network,
        ComponentType::Load,
        "L1",
        vec![("bus", "B1".into())],
    );
    network
        .series_mut(ComponentType::Load, "p_set")
        .insert("L1".into(), vec![10.0, 20.0])
        .unwrap();
    add_asset(
        &mut network,
        ComponentType::Generator,
        "G1",
        vec![
            ("bus", "B1".into()),
            ("carrier", "gas".into()),
            ("p_nom", 100.0.into()),
            ("marginal_cost", 5.0.into()),
        ],
    );
    add_asset(
        &mut network,
        ComponentType::Link,
        "Lk1",
        vec![
            ("bus0", "B1".into()),
            ("bus1", "B2".into()),
            ("carrier", "DC".into()),
            ("p_nom", 100.0.into()),
            ("p_nom_extendable", true.into()),
            ("capital_cost", 1.0.into()),
            ("reserve_area", "reserve_area_1".into()),
            ("reserve_level_1", 0.5.into()),
        ],
    );
    add_asset(
        &mut network,
        ComponentType::Link,
        "Lk2",
        vec![
            ("bus0", "B2".into()),
            ("bus1", "B1".into()),
            ("carrier", "DC".into()),
            ("p_nom", 50.0.into()),
            ("p_nom_extendable", false.into()),
            ("reserve_area", "reserve_area_2".into()),
            ("reserve_level_1", 0.4.into()),
        ],
    );
    add_asset(
        &mut network,
        ComponentType::StorageUnit,
        "SU1",
        vec![
            ("bus", "B2".into()),
            ("carrier", "battery".into()),
            ("p_nom", 0.0.into()),
            ("p_nom_extendable", true.into()),
            ("max_hours", 4.0.into()),
            ("capital_cost", 2.0.into()),
        ],
    );
    add_asset(
        &mut network,
        ComponentType::Store,
        "S1",
        vec![
            ("bus", "B2".into()),
            ("carrier", "water".into()),
            ("e_nom", 100.0.into()),
        ],
    );

    network
}

/// Reserve requirements covering only level 1 of area 1
#[fixture]
pub fn requirements() -> ReserveRequirements {
    ReserveRequirements::from_entries([("reserve_level_1_reserve_area_1".to_string(), 50.0)])
        .unwrap()
}
