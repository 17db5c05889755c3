// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

#![no_std]
#![no_main]

use cortex_m::delay::Delay;
use cortex_m_rt::entry;

use hal::{
    self,
    clocks::Clocks,
    gpio::{Pin, Pull},
    pac,
};

use quadrive_algo::motors::MotorId;
use quadrive_algo::{MotorState, MotorsDriver, MOTORS_NUMBER};
use quadrive_drivers::{motors::MotorBank, pinout, pwm};

use defmt_rtt as _;
// global logger
use panic_probe as _;

const DUTY_STEPS: [u8; 3] = [64, 128, 255];
const SAMPLE_MS: u32 = 500;
const SAMPLE_PERIOD_US: u32 = 50;

/// Bring-up: spins every motor both ways at a few duties and logs its hall edge count
#[entry]
fn main() -> ! {
    // Set up CPU peripherals
    let cp = cortex_m::Peripherals::take().unwrap();
    // Set up microcontroller peripherals
    let dp = pac::Peripherals::take().unwrap();

    let clock_cfg = Clocks::default();
    clock_cfg.setup().unwrap();

    let mut delay = Delay::new(cp.SYST, clock_cfg.systick());

    let mut standby = pinout::driver::STANDBY.init();
    standby.set_high();

    let mut bank = MotorBank::new(pwm::MotorPwm::new(dp.TIM2, &clock_cfg, pwm::PWM_FREQ));

    let sensors: [Pin; MOTORS_NUMBER] = core::array::from_fn(|motor| {
        let mut pin = pinout::tacho::TACHO[motor].init();
        pin.pull(Pull::Up);
        pin
    });

    let mut led_green = pinout::led::GRN.init();

    loop {
        for id in MotorId::ALL {
            let motor = id.index();
            for state in [MotorState::Forward, MotorState::Backward] {
                for duty in DUTY_STEPS {
                    bank.set_raw(motor, duty, state);
                    let edges = count_edges(&sensors[motor], &mut delay, SAMPLE_MS);
                    defmt::info!(
                        "MOTOR {}: {} at {} -> {} edges in {} ms",
                        id,
                        state,
                        duty,
                        edges,
                        SAMPLE_MS
                    );
                }
                bank.set_raw(motor, 0, MotorState::Idle);
                delay.delay_ms(SAMPLE_MS);
            }
            led_green.toggle();
        }
    }
}

/// Polls a hall output for `ms` and counts its rising edges.
fn count_edges(pin: &Pin, delay: &mut Delay, ms: u32) -> u32 {
    let mut edges = 0;
    let mut level = pin.is_high();
    for _ in 0..ms * 1000 / SAMPLE_PERIOD_US {
        delay.delay_us(SAMPLE_PERIOD_US);
        let high = pin.is_high();
        if high && !level {
            edges += 1;
        }
        level = high;
    }
    edges
}

// same panicking *behavior* as `panic-probe` but doesn't print a panic message
// this prevents the panic message being printed *twice* when `defmt::panic` is invoked
#[defmt::panic_handler]
fn panic() -> ! {
    cortex_m::asm::udf()
}
