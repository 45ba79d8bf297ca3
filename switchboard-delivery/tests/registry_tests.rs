// ABOUTME: Tests for UI driver selection through the driver registry.
// ABOUTME: Covers preference filtering, priority order, and failure reporting.

use std::sync::Arc;
use switchboard_delivery::testing::RecordingDriver;
use switchboard_delivery::{DriverKind, DriverPreference, DriverRegistry, UiDriver};

fn recording() -> anyhow::Result<Arc<dyn UiDriver>> {
    Ok(Arc::new(RecordingDriver::new()) as Arc<dyn UiDriver>)
}

#[test]
fn test_default_registry_order() {
    assert_eq!(
        DriverRegistry::default().available(),
        vec![DriverKind::Xdotool, DriverKind::Noop]
    );
}

#[test]
fn test_noop_preference_skips_xdotool() {
    let (kind, driver) = DriverRegistry::default()
        .select(DriverPreference::Noop)
        .unwrap();
    assert_eq!(kind, DriverKind::Noop);
    assert_eq!(driver.name(), "noop");
}

#[test]
fn test_auto_falls_through_failing_factories() {
    let registry = DriverRegistry::new()
        .register(DriverKind::Xdotool, || Err(anyhow::anyhow!("xdotool not installed")))
        .register(DriverKind::Noop, recording);

    let (kind, driver) = registry.select(DriverPreference::Auto).unwrap();
    assert_eq!(kind, DriverKind::Noop);
    assert_eq!(driver.name(), "recording");
}

#[test]
fn test_reregistering_replaces_factory() {
    let registry = DriverRegistry::new()
        .register(DriverKind::Noop, || Err(anyhow::anyhow!("first")))
        .register(DriverKind::Noop, recording);
    assert_eq!(registry.available(), vec![DriverKind::Noop]);
    assert!(registry.select(DriverPreference::Noop).is_ok());
}

#[test]
fn test_failures_are_listed() {
    let registry = DriverRegistry::new()
        .register(DriverKind::Xdotool, || Err(anyhow::anyhow!("xdotool not installed")));

    let err = registry.select(DriverPreference::Auto).err().unwrap();
    assert!(err.to_string().contains("xdotool: xdotool not installed"));

    let err = registry.select(DriverPreference::Noop).err().unwrap();
    assert!(err.to_string().contains("No UI driver registered"));
}

#[test]
fn test_preference_parsing() {
    assert_eq!("AUTO".parse::<DriverPreference>().unwrap(), DriverPreference::Auto);
    assert_eq!("none".parse::<DriverPreference>().unwrap(), DriverPreference::Noop);
    assert!("selenium".parse::<DriverPreference>().is_err());
}
