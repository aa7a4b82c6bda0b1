//! Real worker threads on the simulated board.
//!
//! These drive the supervisor through [`ThreadLauncher`], so every start
//! spawns a thread and every stop waits for it to exit and tear down.

use std::sync::Arc;
use std::time::{Duration, Instant};

use smarthome::adapters::hardware::SimBoard;
use smarthome::adapters::launcher::ThreadLauncher;
use smarthome::app::commands::Command;
use smarthome::app::events::AppEvent;
use smarthome::app::ports::WorkerLauncher;
use smarthome::app::service::Supervisor;
use smarthome::config::SystemConfig;
use smarthome::pins;
use smarthome::state::{DeviceId, DeviceLevel, ModuleId, SharedState};
use smarthome::workers::display::TITLE;

use crate::mock_hw::{ownership_holds, RecordingSink};

const WAIT: Duration = Duration::from_secs(2);

fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

fn system() -> (Supervisor<ThreadLauncher>, Arc<SimBoard>, RecordingSink) {
    system_with(SystemConfig::default().stop_timeout_ms)
}

fn system_with(stop_timeout_ms: u32) -> (Supervisor<ThreadLauncher>, Arc<SimBoard>, RecordingSink) {
    let config = Arc::new(SystemConfig {
        sensing_period_ms: 5,
        display_period_ms: 5,
        stop_timeout_ms,
        ..Default::default()
    });
    let shared = Arc::new(SharedState::new());
    let board = Arc::new(SimBoard::new());
    let launcher = ThreadLauncher::new(config.clone(), shared.clone(), board.clone());
    let mut sup = Supervisor::new(launcher, shared, config.command_policy);
    let mut sink = RecordingSink::new();
    sup.boot(&mut sink);
    (sup, board, sink)
}

#[test]
fn display_draws_the_title_after_boot() {
    let (mut sup, board, mut sink) = system();

    assert!(wait_until(|| board.display_row(0) == TITLE));

    sup.shutdown(&mut sink);
    assert!(board.display_row(0).is_empty());
}

#[test]
fn buzzer_follows_device_level_until_stopped() {
    let (mut sup, board, mut sink) = system();
    sup.apply(Command::modules(&[ModuleId::Display, ModuleId::ActuatorLed]), &mut sink);
    assert!(ownership_holds(&sup));

    sup.apply(
        Command::devices(&[(DeviceId::Buzzer, DeviceLevel::from_raw(5))]),
        &mut sink,
    );
    let duty = SystemConfig::default().buzzer_duty_percent;
    assert!(wait_until(|| board.pwm_duty(pins::BUZZER_GPIO) == Some(duty)));

    sup.apply(Command::modules(&[ModuleId::Display]), &mut sink);

    // Teardown has run by the time stop returns.
    assert_eq!(board.pwm_duty(pins::BUZZER_GPIO), None);
    assert_eq!(sup.shared().devices.get(DeviceId::Buzzer), DeviceLevel::DISCONNECTED);
    assert!(ownership_holds(&sup));
    sup.shutdown(&mut sink);
}

#[test]
fn gas_alarm_requests_a_report_and_readings_reset_on_stop() {
    let (mut sup, board, mut sink) = system();
    board.set_adc(pins::GAS_ADC_CHANNEL, 900);
    sup.apply(Command::modules(&[ModuleId::Display, ModuleId::Gas]), &mut sink);

    let shared = sup.shared().clone();
    assert!(wait_until(|| shared.telemetry.snapshot().gas == 900));
    assert!(wait_until(|| shared.telemetry.publish_requested()));
    assert!(board.pwm_duty(pins::BUZZER_GPIO).is_some());

    sup.apply(Command::modules(&[ModuleId::Display]), &mut sink);
    assert_eq!(shared.telemetry.snapshot().gas, 0);
    assert_eq!(board.pwm_duty(pins::BUZZER_GPIO), None);
    sup.shutdown(&mut sink);
}

#[test]
fn climate_board_starts_without_a_sensor() {
    let (mut sup, board, mut sink) = system();
    board.set_sht40(None);
    sup.apply(Command::modules(&[ModuleId::Display, ModuleId::TempHumidity]), &mut sink);
    assert!(sup.registry().is_present(ModuleId::TempHumidity));

    sup.apply(
        Command::devices(&[(DeviceId::ClimateFan, DeviceLevel::MAX_ON)]),
        &mut sink,
    );
    assert!(wait_until(|| board.pwm_duty(pins::CLIMATE_PWM_GPIO).is_some()));

    sup.shutdown(&mut sink);
    assert_eq!(board.pwm_duty(pins::CLIMATE_PWM_GPIO), None);
    assert!(!board.output(pins::CLIMATE_POWER_GPIO));
    assert!(ownership_holds(&sup));
}

fn worker_exited(sup: &Supervisor<ThreadLauncher>, id: ModuleId) -> bool {
    sup.registry().handle(id).is_some_and(|h| !sup.launcher().is_alive(h))
}

#[test]
fn wedged_worker_stays_registered_until_it_exits() {
    let (mut sup, board, mut sink) = system_with(20);
    sup.apply(Command::modules(&[ModuleId::Display, ModuleId::MotionLight]), &mut sink);
    assert!(sup.registry().is_present(ModuleId::MotionLight));

    board.set_adc_stall(true);
    assert!(wait_until(|| board.stalled_reads() > 0));

    sup.apply(Command::modules(&[ModuleId::Display]), &mut sink);

    assert!(sink.events.contains(&AppEvent::ModuleStopFailed(ModuleId::MotionLight)));
    assert!(sup.registry().is_present(ModuleId::MotionLight));
    assert_eq!(sup.shared().devices.get(DeviceId::MotionBlue), DeviceLevel::CLOSED);
    assert!(ownership_holds(&sup));

    // The stop flag is already raised, so the worker exits once the read returns.
    board.set_adc_stall(false);
    assert!(wait_until(|| worker_exited(&sup, ModuleId::MotionLight)));

    sup.apply(Command::modules(&[ModuleId::Display]), &mut sink);

    assert!(sink.events.contains(&AppEvent::ModuleExited(ModuleId::MotionLight)));
    assert!(!sup.registry().is_present(ModuleId::MotionLight));
    assert_eq!(sup.shared().devices.get(DeviceId::MotionBlue), DeviceLevel::DISCONNECTED);
    assert!(ownership_holds(&sup));
    sup.shutdown(&mut sink);
}

#[test]
fn panicked_worker_is_reaped_with_outputs_forced_off() {
    let (mut sup, board, mut sink) = system();
    sup.apply(Command::modules(&[ModuleId::Display, ModuleId::MotionLight]), &mut sink);
    sup.apply(
        Command::devices(&[(DeviceId::MotionBlue, DeviceLevel::MAX_ON)]),
        &mut sink,
    );
    assert!(wait_until(|| board.pwm_duty(pins::LAMP_GPIOS[2]) == Some(100)));

    board.set_adc_panic(true);
    assert!(wait_until(|| worker_exited(&sup, ModuleId::MotionLight)));
    board.set_adc_panic(false);

    sup.apply(Command::modules(&[ModuleId::Display]), &mut sink);

    assert!(sink.events.contains(&AppEvent::ModuleExited(ModuleId::MotionLight)));
    assert!(!sup.registry().is_present(ModuleId::MotionLight));
    assert_eq!(board.pwm_duty(pins::LAMP_GPIOS[2]), None);
    assert_eq!(sup.shared().devices.get(DeviceId::MotionBlue), DeviceLevel::DISCONNECTED);
    assert_eq!(sup.shared().telemetry.snapshot().motion, 0);
    assert!(ownership_holds(&sup));
    sup.shutdown(&mut sink);
}
