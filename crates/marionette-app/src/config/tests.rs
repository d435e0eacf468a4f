use std::sync::Arc;

use super::*;

#[test]
fn test_missing_config_is_an_invariant_violation() {
    let depot = salvo::Depot::new();
    assert!(matches!(
        get_config_from_depot(&depot),
        Err(AppError::CoreError(
            marionette_core::error::CoreError::InvariantViolation(_)
        ))
    ));
}

#[test]
fn test_injected_config_is_shared() {
    let settings = Arc::new(Settings::default());
    let mut depot = salvo::Depot::new();
    depot.inject(Arc::clone(&settings));

    let found = get_config_from_depot(&depot).expect("config injected");
    assert!(Arc::ptr_eq(&found, &settings));
}
