use super::*;

#[test]
fn merge_only_overrides_present_fields() {
    let mut config = CoordinatorConfig::default();
    let original_idle = config.idle_after_ms;

    config.merge(PartialCoordinatorConfig {
        batch_window_ms: Some(5_000),
        ..Default::default()
    });

    assert_eq!(config.batch_window_ms, 5_000);
    assert_eq!(config.idle_after_ms, original_idle);
}

#[test]
fn duration_accessors_convert_millis() {
    let config = CoordinatorConfig { batch_window_ms: 1_500, ..Default::default() };
    assert_eq!(config.batch_window().as_millis(), 1_500);
}
