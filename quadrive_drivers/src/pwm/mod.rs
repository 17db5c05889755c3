// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use hal::{
    clocks::Clocks,
    pac::TIM2,
    timer::{
        Alignment, CaptureCompareDma, CountDir, OutputCompare, TimChannel, Timer, TimerConfig,
        UpdateReqSrc,
    },
};

use quadrive_algo::motors::PWM_MAX;

use super::pinout;

/// Bridge input frequency (Hz), above the audible range.
pub const PWM_FREQ: u16 = 20_000;

/// Four edge aligned PWM outputs on TIM2, one per motor.
pub struct MotorPwm {
    tim: Timer<TIM2>,
}

impl MotorPwm {
    pub fn new(tim2: TIM2, clock_cfg: &Clocks, freq: u16) -> Self {
        let mut timer = Timer::new_tim2(
            tim2,
            freq as f32,
            TimerConfig {
                one_pulse_mode: false,
                update_request_source: UpdateReqSrc::Any,
                auto_reload_preload: true,
                alignment: Alignment::Edge,
                capture_compare_dma: CaptureCompareDma::Update,
                direction: CountDir::Up,
            },
            clock_cfg,
        );
        timer.enable();

        MotorPwm { tim: timer }
    }

    /// Enables all four outputs at zero duty and hands the pins to the timer.
    pub fn begin(&mut self) {
        for motor in 0..pinout::driver::MOTORS.len() {
            if let Some(channel) = Self::channel(motor) {
                self.tim.enable_pwm_output(channel, OutputCompare::Pwm1, 0.0);
            }
        }
        for motor in pinout::driver::MOTORS.iter() {
            motor.pwm.init();
        }
    }

    /// Sets the duty of `motor` on the 0..=255 scale.
    pub fn set_duty(&mut self, motor: usize, duty: u8) {
        let Some(channel) = Self::channel(motor) else {
            return;
        };
        let period = self.tim.get_max_duty();
        self.tim.set_duty(channel, Self::duty2period(duty, period));
    }

    fn channel(motor: usize) -> Option<TimChannel> {
        match motor {
            0 => Some(TimChannel::C1),
            1 => Some(TimChannel::C2),
            2 => Some(TimChannel::C3),
            3 => Some(TimChannel::C4),
            _ => None,
        }
    }

    fn duty2period(duty: u8, period: u32) -> u32 {
        duty as u32 * period / PWM_MAX as u32
    }
}
