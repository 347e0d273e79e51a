use accessor_core::description::{Direction, PortDeclaration};
use proptest::prelude::*;
use proptest::strategy::Just;

/// Strategy for generating valid port names (never a lifecycle key)
pub fn port_name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_]{0,15}".prop_filter("Lifecycle keys are reserved", |name| {
        name != "init" && name != "wrapup"
    })
}

/// Strategy for generating names that are not identifiers
pub fn invalid_port_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[0-9][A-Za-z0-9_]{0,8}",
        "_[A-Za-z0-9_]{0,8}",
        "[A-Za-z]{1,4}[ .\\-/][A-Za-z]{1,4}",
    ]
}

/// Strategy for generating a set of distinct port names
pub fn port_names_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set(port_name_strategy(), 1..6)
        .prop_map(|names| names.into_iter().collect())
}

pub fn direction_strategy() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Input), Just(Direction::Output)]
}

/// Port declarations with one or both directions
pub fn port_declaration_strategy() -> impl Strategy<Value = PortDeclaration> {
    (port_name_strategy(), 0u8..3).prop_map(|(name, shape)| match shape {
        0 => PortDeclaration::input(name),
        1 => PortDeclaration::output(name),
        _ => PortDeclaration::new(name, &[Direction::Input, Direction::Output]),
    })
}

/// Number of handlers bound to one port
pub fn handler_count_strategy() -> impl Strategy<Value = usize> {
    1usize..8
}

/// Values written to input ports
pub fn port_value_strategy() -> impl Strategy<Value = serde_json::Value> {
    prop_oneof![
        any::<bool>().prop_map(serde_json::Value::from),
        (-1_000i64..1_000).prop_map(serde_json::Value::from),
        "[a-z]{0,12}".prop_map(serde_json::Value::from),
        Just(serde_json::json!({"hue": 4_000, "sat": 200})),
    ]
}
