//! Supervisor command handling against the fake launcher.
//!
//! Covers the module lifecycle, device-level gating and the publish-now
//! request, driven through raw wire payloads the way the network worker
//! delivers them.

use smarthome::app::commands::{Command, CommandPolicy};
use smarthome::app::events::AppEvent;
use smarthome::app::service::Outcome;
use smarthome::error::{DecodeError, ModuleError};
use smarthome::state::{DeviceId, DeviceLevel, ModuleId, ModuleSet};

use crate::mock_hw::{booted, ownership_holds, LaunchCall};

fn set(ids: &[ModuleId]) -> ModuleSet {
    ids.iter().copied().collect()
}

fn level(raw: u8) -> DeviceLevel {
    DeviceLevel::from_raw(raw)
}

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn boot_starts_display_and_pins_network_link() {
    let (sup, sink) = booted(CommandPolicy::PERMISSIVE);

    assert_eq!(sup.present(), set(&[ModuleId::Display, ModuleId::NetworkLink]));
    assert!(sup.registry().is_resident(ModuleId::NetworkLink));
    assert_eq!(sup.launcher().calls, vec![LaunchCall::Start(ModuleId::Display)]);
    for d in DeviceId::ALL {
        assert_eq!(sup.shared().devices.get(d), DeviceLevel::DISCONNECTED);
    }
    assert_eq!(sink.last(), Some(&AppEvent::Booted(sup.present())));
}

#[test]
fn duplicate_start_that_cannot_be_undone_is_reported() {
    let (mut sup, mut sink) = booted(CommandPolicy::PERMISSIVE);
    sup.launcher_mut().fail_stop.insert(ModuleId::Display);
    sup.launcher_mut().clear_calls();
    sink.clear();

    // A second boot starts Display while the first worker is still registered.
    sup.boot(&mut sink);

    assert_eq!(
        sup.launcher().calls,
        vec![LaunchCall::Start(ModuleId::Display), LaunchCall::Stop(ModuleId::Display)]
    );
    assert!(sink.events.contains(&AppEvent::ModuleStopFailed(ModuleId::Display)));
    assert!(!sink.events.contains(&AppEvent::ModuleStarted(ModuleId::Display)));
    assert!(sup.registry().is_present(ModuleId::Display));
}

// ── ModuleControl ─────────────────────────────────────────────

/// Scenario A. The literal vector `"00001000"` carries a 0 in the Display
/// position and would stop the display (see `unrequested_display_is_stopped`),
/// so the display digit is set here to keep it running.
#[test]
fn scenario_a_starting_actuator_board_closes_its_devices() {
    let (mut sup, mut sink) = booted(CommandPolicy::PERMISSIVE);

    // Display stays requested, ActuatorLED is added, everything else off.
    let outcome = sup.handle_payload(b"00011000", &mut sink).unwrap();
    let Outcome::Modules(report) = outcome else {
        panic!("expected a module report");
    };

    assert_eq!(report.started, set(&[ModuleId::ActuatorLed]));
    assert!(report.stopped.is_empty());
    assert!(report.is_success());
    assert_eq!(
        sup.present(),
        set(&[ModuleId::Display, ModuleId::NetworkLink, ModuleId::ActuatorLed])
    );
    for d in [
        DeviceId::RedIndicator,
        DeviceId::GreenIndicator,
        DeviceId::YellowIndicator,
        DeviceId::Buzzer,
    ] {
        assert_eq!(sup.shared().devices.get(d), DeviceLevel::CLOSED);
    }
    for d in [
        DeviceId::MotionGreen,
        DeviceId::MotionRed,
        DeviceId::MotionBlue,
        DeviceId::ClimateFan,
        DeviceId::ClimatePump,
    ] {
        assert_eq!(sup.shared().devices.get(d), DeviceLevel::DISCONNECTED);
    }
    assert!(ownership_holds(&sup));
}

#[test]
fn unrequested_display_is_stopped() {
    let (mut sup, mut sink) = booted(CommandPolicy::PERMISSIVE);

    sup.handle_payload(b"00001000", &mut sink).unwrap();

    assert!(!sup.registry().is_present(ModuleId::Display));
    assert!(sup.registry().is_present(ModuleId::ActuatorLed));
    assert!(sink.events.contains(&AppEvent::ModuleStopped(ModuleId::Display)));
}

#[test]
fn stopping_an_absent_module_is_a_no_op() {
    let (mut sup, mut sink) = booted(CommandPolicy::PERMISSIVE);
    let devices_before = sup.shared().devices.snapshot();
    sup.launcher_mut().clear_calls();

    // Gas off (already off), Display kept.
    let Outcome::Modules(report) = sup.handle_payload(b"00010000", &mut sink).unwrap() else {
        panic!("expected a module report");
    };

    assert!(!report.changed());
    assert!(report.is_success());
    assert_eq!(sup.present(), set(&[ModuleId::Display, ModuleId::NetworkLink]));
    assert_eq!(sup.shared().devices.snapshot(), devices_before);
    assert!(sup.launcher().calls.is_empty());
}

#[test]
fn same_command_twice_is_idempotent() {
    let (mut sup, mut sink) = booted(CommandPolicy::PERMISSIVE);
    let cmd = Command::modules(&[ModuleId::Fire, ModuleId::Display, ModuleId::TempHumidity]);

    sup.apply(cmd, &mut sink);
    let present = sup.present();
    let calls = sup.launcher().calls.len();

    let Outcome::Modules(second) = sup.apply(cmd, &mut sink) else {
        panic!("expected a module report");
    };
    assert!(!second.changed());
    assert_eq!(sup.present(), present);
    assert_eq!(sup.launcher().calls.len(), calls);
}

#[test]
fn network_link_cannot_be_stopped_or_started() {
    let (mut sup, mut sink) = booted(CommandPolicy::PERMISSIVE);

    // Every bit clear, NetworkLink included.
    sup.handle_payload(b"00000000", &mut sink).unwrap();
    assert!(sup.registry().is_present(ModuleId::NetworkLink));
    assert!(!sink.events.contains(&AppEvent::ModuleStopped(ModuleId::NetworkLink)));
    assert!(sink.events.contains(&AppEvent::ExemptModuleSkipped(ModuleId::NetworkLink)));

    sup.handle_payload(b"00000100", &mut sink).unwrap();
    assert!(sup.registry().is_present(ModuleId::NetworkLink));
    assert!(!sup.launcher().calls.contains(&LaunchCall::Start(ModuleId::NetworkLink)));
    assert!(!sup.launcher().calls.contains(&LaunchCall::Stop(ModuleId::NetworkLink)));
}

#[test]
fn start_failure_leaves_module_absent_and_others_proceed() {
    let (mut sup, mut sink) = booted(CommandPolicy::PERMISSIVE);
    sup.launcher_mut().fail_start.insert(ModuleId::Gas);

    let cmd = Command::modules(&[ModuleId::Display, ModuleId::Gas, ModuleId::MotionLight]);
    let Outcome::Modules(report) = sup.apply(cmd, &mut sink) else {
        panic!("expected a module report");
    };

    assert!(!report.is_success());
    assert_eq!(report.failures.as_slice(), &[ModuleError::StartFailed(ModuleId::Gas)]);
    assert_eq!(report.started, set(&[ModuleId::MotionLight]));
    assert!(!sup.registry().is_present(ModuleId::Gas));
    assert!(sink.events.contains(&AppEvent::ModuleStartFailed(ModuleId::Gas)));
    assert!(ownership_holds(&sup));
}

#[test]
fn stop_failure_leaves_module_running() {
    let (mut sup, mut sink) = booted(CommandPolicy::PERMISSIVE);
    sup.apply(Command::modules(&[ModuleId::Display, ModuleId::MotionLight]), &mut sink);
    sup.launcher_mut().fail_stop.insert(ModuleId::MotionLight);

    let Outcome::Modules(report) = sup.apply(Command::modules(&[ModuleId::Display]), &mut sink) else {
        panic!("expected a module report");
    };

    assert_eq!(report.failures.as_slice(), &[ModuleError::StopFailed(ModuleId::MotionLight)]);
    assert!(sup.registry().is_present(ModuleId::MotionLight));
    assert_eq!(sup.shared().devices.get(DeviceId::MotionRed), DeviceLevel::CLOSED);
    assert!(ownership_holds(&sup));

    // Retry once the worker cooperates.
    sup.launcher_mut().fail_stop = ModuleSet::EMPTY;
    sup.apply(Command::modules(&[ModuleId::Display]), &mut sink);
    assert!(!sup.registry().is_present(ModuleId::MotionLight));
    assert!(ownership_holds(&sup));
}

#[test]
fn crashed_worker_is_reaped_before_the_next_command() {
    let (mut sup, mut sink) = booted(CommandPolicy::PERMISSIVE);
    sup.apply(Command::modules(&[ModuleId::Display, ModuleId::TempHumidity]), &mut sink);
    sup.launcher().crash(ModuleId::TempHumidity);

    // Asking for the same set restarts the dead module.
    let Outcome::Modules(report) = sup.apply(
        Command::modules(&[ModuleId::Display, ModuleId::TempHumidity]),
        &mut sink,
    ) else {
        panic!("expected a module report");
    };

    assert_eq!(report.exited, set(&[ModuleId::TempHumidity]));
    assert_eq!(report.started, set(&[ModuleId::TempHumidity]));
    assert!(sink.events.contains(&AppEvent::ModuleExited(ModuleId::TempHumidity)));
    assert!(sup.registry().is_present(ModuleId::TempHumidity));
}

#[test]
fn reconcile_releases_devices_of_dead_workers() {
    let (mut sup, mut sink) = booted(CommandPolicy::PERMISSIVE);
    sup.apply(Command::modules(&[ModuleId::Display, ModuleId::ActuatorLed]), &mut sink);
    sup.launcher().crash(ModuleId::ActuatorLed);

    let exited = sup.reconcile(&mut sink);

    assert_eq!(exited, set(&[ModuleId::ActuatorLed]));
    assert_eq!(sup.shared().devices.get(DeviceId::Buzzer), DeviceLevel::DISCONNECTED);
    assert!(ownership_holds(&sup));
}

#[test]
fn shutdown_stops_everything_but_the_link() {
    let (mut sup, mut sink) = booted(CommandPolicy::PERMISSIVE);
    sup.apply(
        Command::modules(&[ModuleId::Display, ModuleId::Fire, ModuleId::ActuatorLed]),
        &mut sink,
    );

    let report = sup.shutdown(&mut sink);

    assert_eq!(report.stopped, set(&[ModuleId::Fire, ModuleId::Display, ModuleId::ActuatorLed]));
    assert_eq!(sup.present(), set(&[ModuleId::NetworkLink]));
    assert!(ownership_holds(&sup));
}

// ── DeviceControl ─────────────────────────────────────────────

#[test]
fn device_levels_are_written_literally_when_permissive() {
    let (mut sup, mut sink) = booted(CommandPolicy::PERMISSIVE);
    sup.apply(Command::modules(&[ModuleId::Display, ModuleId::ActuatorLed]), &mut sink);

    // RedIndicator=9 (Disconnected as a value), Buzzer=5.
    let Outcome::Devices(report) = sup.handle_payload(b"2900500000", &mut sink).unwrap() else {
        panic!("expected a device report");
    };

    assert_eq!(sup.shared().devices.get(DeviceId::Buzzer), level(5));
    assert_eq!(sup.shared().devices.get(DeviceId::RedIndicator), level(9));
    assert!(report.changed.contains(DeviceId::Buzzer));
    assert!(report.changed.contains(DeviceId::RedIndicator));
    assert!(!report.changed.contains(DeviceId::GreenIndicator));
    assert!(report.rejected.is_empty());
}

#[test]
fn devices_of_stopped_modules_are_ignored() {
    let (mut sup, mut sink) = booted(CommandPolicy::PERMISSIVE);
    sup.apply(Command::modules(&[ModuleId::Display, ModuleId::MotionLight]), &mut sink);

    let Outcome::Devices(report) = sup.handle_payload(b"2111111111", &mut sink).unwrap() else {
        panic!("expected a device report");
    };

    for d in [DeviceId::MotionGreen, DeviceId::MotionRed, DeviceId::MotionBlue] {
        assert_eq!(sup.shared().devices.get(d), DeviceLevel::MIN_ON);
        assert!(report.changed.contains(d));
    }
    for d in [DeviceId::RedIndicator, DeviceId::Buzzer, DeviceId::ClimateFan] {
        assert_eq!(sup.shared().devices.get(d), DeviceLevel::DISCONNECTED);
        assert!(report.ignored.contains(d));
    }
}

#[test]
fn strict_policy_refuses_sentinel_and_short_payloads() {
    let (mut sup, mut sink) = booted(CommandPolicy::STRICT);
    sup.apply(Command::modules(&[ModuleId::Display, ModuleId::ActuatorLed]), &mut sink);

    let Outcome::Devices(report) = sup.handle_payload(b"2900500000", &mut sink).unwrap() else {
        panic!("expected a device report");
    };
    assert!(report.rejected.contains(DeviceId::RedIndicator));
    assert_eq!(sup.shared().devices.get(DeviceId::RedIndicator), DeviceLevel::CLOSED);
    assert_eq!(sup.shared().devices.get(DeviceId::Buzzer), level(5));

    let before = sup.shared().devices.snapshot();
    assert_eq!(
        sup.handle_payload(b"2005", &mut sink),
        Err(DecodeError::WrongWidth { expected: 9, found: 3 })
    );
    assert_eq!(sup.shared().devices.snapshot(), before);
}

// ── PublishRequest / rejects ──────────────────────────────────

#[test]
fn publish_request_raises_the_flag() {
    let (mut sup, mut sink) = booted(CommandPolicy::PERMISSIVE);

    assert_eq!(sup.handle_payload(b"1junk", &mut sink), Ok(Outcome::PublishRequested));
    assert!(sup.shared().telemetry.publish_requested());
    assert_eq!(sink.last(), Some(&AppEvent::PublishRequested));
}

#[test]
fn unknown_code_changes_nothing() {
    let (mut sup, mut sink) = booted(CommandPolicy::PERMISSIVE);
    let present = sup.present();
    let devices = sup.shared().devices.snapshot();

    assert_eq!(
        sup.handle_payload(b"7000", &mut sink),
        Err(DecodeError::UnknownCommandCode(b'7'))
    );
    assert_eq!(sup.present(), present);
    assert_eq!(sup.shared().devices.snapshot(), devices);
    assert_eq!(
        sink.last(),
        Some(&AppEvent::CommandRejected(DecodeError::UnknownCommandCode(b'7')))
    );
}
