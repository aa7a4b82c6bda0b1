//! Network worker: periodic and on-demand reports, inbound command drain.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use smarthome::adapters::loopback::LoopbackLink;
use smarthome::app::commands::CommandPolicy;
use smarthome::app::events::AppEvent;
use smarthome::app::ports::LinkPort;
use smarthome::config::SystemConfig;
use smarthome::drivers::watchdog::Watchdog;
use smarthome::link::LinkEngine;
use smarthome::state::{DeviceId, DeviceLevel, ModuleId};

use crate::mock_hw::{booted, FakeLauncher, RecordingSink};
use smarthome::app::service::Supervisor;

fn engine(sup: &Supervisor<FakeLauncher>) -> LinkEngine<LoopbackLink> {
    let mut link = LoopbackLink::new();
    link.connect().unwrap();
    LinkEngine::new(link, sup.shared().clone(), &SystemConfig::default())
}

fn settle(engine: &mut LinkEngine<LoopbackLink>, sup: &mut Supervisor<FakeLauncher>, sink: &mut RecordingSink) -> Instant {
    // The first poll always reports; consume it.
    let t0 = Instant::now();
    engine.poll(t0, sup, sink);
    engine.link_mut().take_published();
    t0
}

#[test]
fn first_poll_reports_immediately() {
    let (mut sup, mut sink) = booted(CommandPolicy::PERMISSIVE);
    let mut engine = engine(&sup);

    let summary = engine.poll(Instant::now(), &mut sup, &mut sink);

    assert!(summary.published);
    assert_eq!(engine.link().published(), &[b"0,0,0,0,0,0".to_vec()]);
    assert!(sink.events.contains(&AppEvent::ReportPublished { bytes: 11, forced: false }));
}

#[test]
fn reports_follow_the_interval() {
    let (mut sup, mut sink) = booted(CommandPolicy::PERMISSIVE);
    let mut engine = engine(&sup);
    let t0 = settle(&mut engine, &mut sup, &mut sink);

    assert!(!engine.poll(t0 + Duration::from_millis(500), &mut sup, &mut sink).published);
    assert!(engine.poll(t0 + Duration::from_millis(1000), &mut sup, &mut sink).published);
    assert!(!engine.poll(t0 + Duration::from_millis(1500), &mut sup, &mut sink).published);
    assert_eq!(engine.link().published().len(), 1);
}

#[test]
fn publish_request_is_served_on_the_next_cycle() {
    let (mut sup, mut sink) = booted(CommandPolicy::PERMISSIVE);
    let mut engine = engine(&sup);
    let t0 = settle(&mut engine, &mut sup, &mut sink);

    sup.shared().telemetry.set_gas(321);
    assert!(engine.link().inject(b"1"));

    // This cycle drains the request; the report goes out on the next one.
    let first = engine.poll(t0 + Duration::from_millis(10), &mut sup, &mut sink);
    assert_eq!(first.commands, 1);
    assert!(sup.shared().telemetry.publish_requested());

    let second = engine.poll(t0 + Duration::from_millis(20), &mut sup, &mut sink);
    assert!(second.published);
    assert!(!sup.shared().telemetry.publish_requested());
    assert_eq!(engine.link().published(), &[b"0,321,0,0,0,0".to_vec()]);
    assert!(sink.events.contains(&AppEvent::ReportPublished { bytes: 13, forced: true }));
}

#[test]
fn inbound_commands_reach_the_supervisor_in_order() {
    let (mut sup, mut sink) = booted(CommandPolicy::PERMISSIVE);
    let mut engine = engine(&sup);
    let t0 = settle(&mut engine, &mut sup, &mut sink);

    engine.link().inject(b"00011000");
    engine.link().inject(b"2000700000");
    let summary = engine.poll(t0 + Duration::from_millis(10), &mut sup, &mut sink);

    assert_eq!(summary.commands, 2);
    assert!(sup.registry().is_present(ModuleId::ActuatorLed));
    assert_eq!(sup.shared().devices.get(DeviceId::Buzzer), DeviceLevel::from_raw(7));
}

#[test]
fn bad_payload_does_not_stop_the_drain() {
    let (mut sup, mut sink) = booted(CommandPolicy::PERMISSIVE);
    let mut engine = engine(&sup);
    let t0 = settle(&mut engine, &mut sup, &mut sink);

    engine.link().inject(b"9");
    engine.link().inject(b"1");
    let summary = engine.poll(t0 + Duration::from_millis(10), &mut sup, &mut sink);

    assert_eq!(summary.commands, 2);
    assert!(sup.shared().telemetry.publish_requested());
    assert_eq!(sink.count(|e| matches!(e, AppEvent::CommandRejected(_))), 1);
}

#[test]
fn publish_failure_is_reported_and_retried_at_the_next_interval() {
    let (mut sup, mut sink) = booted(CommandPolicy::PERMISSIVE);
    let mut engine = engine(&sup);
    let t0 = settle(&mut engine, &mut sup, &mut sink);

    engine.link_mut().set_fail_publish(true);
    engine.poll(t0 + Duration::from_millis(1000), &mut sup, &mut sink);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::ReportFailed(_))), 1);

    engine.link_mut().set_fail_publish(false);
    assert!(engine.poll(t0 + Duration::from_millis(2000), &mut sup, &mut sink).published);
    assert_eq!(engine.link().published().len(), 1);
}

#[test]
fn run_loop_feeds_the_watchdog_until_stopped() {
    let (mut sup, mut sink) = booted(CommandPolicy::PERMISSIVE);
    let mut engine = engine(&sup);
    engine.link().inject(b"1");
    let watchdog = Watchdog::new(100);
    let stop = AtomicBool::new(false);

    std::thread::scope(|s| {
        s.spawn(|| {
            std::thread::sleep(Duration::from_millis(50));
            stop.store(true, Ordering::Release);
        });
        engine.run(&mut sup, &mut sink, Duration::from_millis(2), &stop, || watchdog.feed());
    });

    assert!(watchdog.feeds() > 1);
    assert!(!watchdog.expired(Instant::now()));
    assert!(sink.events.contains(&AppEvent::PublishRequested));
    assert!(!engine.link().published().is_empty());
}
