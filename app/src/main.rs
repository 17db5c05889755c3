// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

#![no_main]
#![no_std]

use defmt_rtt as _;
use panic_probe as _;

use hal::{self, clocks::Clocks, pac};

use quadrive_algo::{config, BufferRegistry, Chassis, MotorRegisters, TwiSlave};
use quadrive_drivers::{i2c_slave::I2cSlave, motors::MotorBank};

use rtic_monotonics::systick::prelude::*;

systick_monotonic!(Mono, config::TICK_HZ);

/// Number of register buffers the bus can dispatch to.
const REGISTRY_SIZE: usize = 2;

type Engine = TwiSlave<'static, Chassis<MotorBank>, REGISTRY_SIZE>;

/// The slave peripheral together with its protocol engine.
pub struct Bus {
    i2c: I2cSlave,
    engine: Engine,
}

impl Bus {
    fn serve(&mut self, chassis: &mut Chassis<MotorBank>) {
        let engine = &mut self.engine;
        self.i2c.service(|event| engine.handle(event, chassis));
    }
}

#[rtic::app(device = pac, peripherals = true, dispatchers = [TIM7])]
mod app {
    use super::*;

    use hal::gpio::Pin;
    use rtic::Mutex;

    use quadrive_algo::motors::MotorId;
    use quadrive_drivers::{pinout, pwm, tacho};

    #[shared]
    struct Shared {
        chassis: Chassis<MotorBank>,
        #[lock_free]
        bus: Bus,
    }

    #[local]
    struct Local {
        led_busy: Pin,
    }

    #[init(local = [motor_registers: MotorRegisters = MotorRegisters::new()])]
    fn init(cx: init::Context) -> (Shared, Local) {
        let dp = cx.device;
        let clock_cfg = Clocks::default();
        clock_cfg.setup().unwrap();

        let sysclk_freq = clock_cfg.sysclk(); // System clock frequency in Hz
        defmt::debug!("SYSTEM: Clock frequency is {} MHz", sysclk_freq / 1000000);
        Mono::start(cx.core.SYST, sysclk_freq);

        let mut standby = pinout::driver::STANDBY.init();
        standby.set_high();

        let motor_pwm = pwm::MotorPwm::new(dp.TIM2, &clock_cfg, pwm::PWM_FREQ);
        let chassis = Chassis::new(MotorBank::new(motor_pwm));
        tacho::init();

        let mut registry = BufferRegistry::new();
        cx.local
            .motor_registers
            .attach(&mut registry)
            .expect("Register map does not fit the registry");
        let bus = Bus {
            i2c: I2cSlave::new(dp.I2C1, config::SLAVE),
            engine: TwiSlave::new(registry),
        };

        let mut led_ready = pinout::led::BLU.init();
        led_ready.set_high();
        let mut led_busy = pinout::led::GRN.init();
        led_busy.set_low();

        control_loop::spawn().ok();
        defmt::info!("SYSTEM: chassis ready");

        (Shared { chassis, bus }, Local { led_busy })
    }

    #[task(binds = I2C1_EV, priority = 3, shared = [chassis, bus])]
    fn i2c1_ev(mut cx: i2c1_ev::Context) {
        let bus = cx.shared.bus;
        cx.shared.chassis.lock(|chassis| bus.serve(chassis));
    }

    #[task(binds = I2C1_ER, priority = 3, shared = [chassis, bus])]
    fn i2c1_er(mut cx: i2c1_er::Context) {
        let bus = cx.shared.bus;
        cx.shared.chassis.lock(|chassis| bus.serve(chassis));
    }

    #[task(binds = EXTI0, priority = 2, shared = [chassis])]
    fn tacho_left_rear(cx: tacho_left_rear::Context) {
        tacho_edge(MotorId::LeftRear, cx.shared.chassis);
    }

    #[task(binds = EXTI1, priority = 2, shared = [chassis])]
    fn tacho_right_rear(cx: tacho_right_rear::Context) {
        tacho_edge(MotorId::RightRear, cx.shared.chassis);
    }

    #[task(binds = EXTI2, priority = 2, shared = [chassis])]
    fn tacho_right_front(cx: tacho_right_front::Context) {
        tacho_edge(MotorId::RightFront, cx.shared.chassis);
    }

    #[task(binds = EXTI3, priority = 2, shared = [chassis])]
    fn tacho_left_front(cx: tacho_left_front::Context) {
        tacho_edge(MotorId::LeftFront, cx.shared.chassis);
    }

    fn tacho_edge(id: MotorId, mut chassis: impl Mutex<T = Chassis<MotorBank>>) {
        let motor = id.index();
        tacho::clear(motor);
        let now = Mono::now().ticks();
        chassis.lock(|chassis| chassis.tacho_edge(motor, now));
    }

    // Runs the drive mode handler and sleeps for as long as it asks
    #[task(priority = 1, shared = [chassis], local = [led_busy])]
    async fn control_loop(mut cx: control_loop::Context) {
        loop {
            let now = Mono::now().ticks();
            let (delay_ms, busy) = cx
                .shared
                .chassis
                .lock(|chassis| (chassis.control(now), chassis.is_busy()));

            if busy {
                cx.local.led_busy.toggle();
            } else {
                cx.local.led_busy.set_low();
            }

            Mono::delay(delay_ms.millis()).await;
        }
    }
}

#[defmt::panic_handler]
fn panic() -> ! {
    cortex_m::asm::udf()
}
