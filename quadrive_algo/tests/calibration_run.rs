mod common;

use common::Bank;
use quadrive_algo::config::TICK_HZ;
use quadrive_algo::drive::{CalibrateStep, DriveMode, DriveStep};
use quadrive_algo::motors::{MotorState, MOTORS_NUMBER, PWM_MAX};
use quadrive_algo::Chassis;

const TICKS_PER_MS: u32 = TICK_HZ / 1000;

/// Four wheels that turn once their duty reaches a per-motor threshold, with an edge
/// period inversely proportional to the duty.
struct Plant {
    threshold: [u16; MOTORS_NUMBER],
    last_edge: [Option<u32>; MOTORS_NUMBER],
    now: u32,
}

impl Plant {
    fn new(threshold: [u16; MOTORS_NUMBER]) -> Self {
        Self {
            threshold,
            last_edge: [None; MOTORS_NUMBER],
            now: 0,
        }
    }

    fn period(pwm: u8) -> u32 {
        40_000 / pwm as u32
    }

    fn run(&mut self, chassis: &mut Chassis<Bank>, ms: u32) {
        for _ in 0..ms {
            self.now += TICKS_PER_MS;
            for motor in 0..MOTORS_NUMBER {
                let pwm = chassis.driver.pwm[motor];
                let turning = chassis.driver.state[motor] == MotorState::Forward
                    && pwm as u16 >= self.threshold[motor];
                if !turning {
                    self.last_edge[motor] = None;
                    continue;
                }
                match self.last_edge[motor] {
                    None => self.last_edge[motor] = Some(self.now),
                    Some(last) if self.now - last >= Self::period(pwm) => {
                        chassis.tacho_edge(motor, self.now);
                        self.last_edge[motor] = Some(self.now);
                    }
                    Some(_) => {}
                }
            }
        }
    }
}

/// Runs the control loop until the handler is removed, returning the visited steps.
fn calibrate(chassis: &mut Chassis<Bank>, plant: &mut Plant, max_passes: usize) -> Vec<DriveStep> {
    chassis.controller.set_action(DriveMode::Calibrate);
    let mut steps = vec![chassis.controller.step()];
    for _ in 0..max_passes {
        let delay = chassis.control(plant.now);
        let step = chassis.controller.step();
        if steps.last() != Some(&step) {
            steps.push(step);
        }
        if !chassis.is_busy() {
            break;
        }
        plant.run(chassis, delay);
    }
    steps
}

#[test]
fn calibration_visits_every_step_once_in_order() {
    let mut chassis = Chassis::new(Bank::new());
    let mut plant = Plant::new([40, 55, 70, 85]);

    let steps = calibrate(&mut chassis, &mut plant, 10_000);
    assert_eq!(
        steps,
        vec![
            DriveStep::Init,
            DriveStep::Calibrate(CalibrateStep::StaticMinPwmRampUp),
            DriveStep::Calibrate(CalibrateStep::StaticMinPwmMeasure),
            DriveStep::Calibrate(CalibrateStep::MinPeriodRampUp),
            DriveStep::Calibrate(CalibrateStep::MinPeriodMeasure),
            DriveStep::Calibrate(CalibrateStep::DynamicMinPwmRampDown),
            DriveStep::Calibrate(CalibrateStep::DynamicMinPwmMeasure),
            DriveStep::Nop,
        ]
    );
    assert_eq!(chassis.controller.mode(), DriveMode::Disabled);
    assert_eq!(chassis.driver.pwm, [0; MOTORS_NUMBER]);
    assert_eq!(chassis.driver.state, [MotorState::Idle; MOTORS_NUMBER]);
}

#[test]
fn calibration_derives_a_usable_model() {
    let mut chassis = Chassis::new(Bank::new());
    let threshold = [40, 55, 70, 85];
    let mut plant = Plant::new(threshold);
    calibrate(&mut chassis, &mut plant, 10_000);

    for (motor, cal) in chassis.controller.calibration().motors().iter().enumerate() {
        let thr = threshold[motor];
        assert!(cal.static_min_pwm as u16 >= thr, "motor {motor}: {cal:?}");
        assert!(cal.min_period as u32 >= Plant::period(PWM_MAX), "motor {motor}: {cal:?}");
        assert!(cal.min_period < cal.dynamic_max_period, "motor {motor}: {cal:?}");
        assert!(
            (cal.dynamic_min_pwm as u16 + 25 >= thr) && (cal.dynamic_min_pwm as u16) < thr + 10,
            "motor {motor}: {cal:?}"
        );

        // Slower wheel needs less duty
        assert!(cal.m < 0.0, "motor {motor}: {cal:?}");
        assert_eq!(cal.pwm_for_period(cal.min_period), PWM_MAX);
        let low = cal.pwm_for_period(cal.dynamic_max_period) as i16;
        assert!((low - cal.dynamic_min_pwm as i16).abs() <= 1, "motor {motor}: {cal:?}");
    }
}

#[test]
fn jammed_motor_holds_the_ramp_until_disabled() {
    let mut chassis = Chassis::new(Bank::new());
    // motor 3 never turns
    let mut plant = Plant::new([40, 40, 40, 1_000]);

    let steps = calibrate(&mut chassis, &mut plant, 500);
    assert_eq!(
        steps.last(),
        Some(&DriveStep::Calibrate(CalibrateStep::StaticMinPwmRampUp))
    );
    assert!(chassis.is_busy());
    assert_eq!(chassis.driver.pwm[3], PWM_MAX);

    chassis.controller.set_action(DriveMode::Disabled);
    assert!(!chassis.is_busy());
    assert_eq!(chassis.control(plant.now), 250);
}

#[test]
fn rerun_starts_from_a_clean_slate() {
    let mut chassis = Chassis::new(Bank::new());
    let mut plant = Plant::new([60, 60, 60, 60]);
    calibrate(&mut chassis, &mut plant, 10_000);

    // stale values from an earlier run must not survive a new one
    if let Some(cal) = chassis.controller.calibration_mut().motor_mut(0) {
        cal.min_period = 1;
        cal.dynamic_max_period = 0x7FFF;
        cal.target_period = 900;
    }
    let steps = calibrate(&mut chassis, &mut plant, 10_000);
    assert_eq!(steps.last(), Some(&DriveStep::Nop));

    let cal = chassis.controller.calibration().motor(0).unwrap();
    assert!(cal.min_period as u32 >= Plant::period(PWM_MAX));
    assert!(cal.dynamic_max_period < 0x7FFF);
    assert!(cal.dynamic_min_pwm as u16 + 25 >= 60);
    assert_eq!(cal.target_period, 900);
}
