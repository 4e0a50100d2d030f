//! Mini ECU v2 application image.
//!
//! Linked at 0x0800_8000, entered by the first-stage bootloader. Interrupt
//! handlers only move bytes and frames into channels; all interpretation
//! happens in the async tasks. CAN1 runs in loopback, so every telemetry
//! frame the tick task transmits comes straight back through the RX path,
//! making the node a self-contained demo ECU.

#![cfg_attr(target_arch = "arm", no_std)]
#![cfg_attr(target_arch = "arm", no_main)]

#[cfg(target_arch = "arm")]
use panic_halt as _;

#[cfg(target_arch = "arm")]
#[rtic::app(device = stm32f4xx_hal::pac, peripherals = true, dispatchers = [EXTI1, EXTI2])]
mod app {
    use bxcan::filter::Mask32;
    use bxcan::{Fifo, Frame, Id, Interrupt, StandardId};
    use rtic_sync::channel::{Receiver, Sender};
    use rtic_sync::make_channel;
    use stm32f4xx_hal::{
        can::Can,
        gpio::{self, Output, PushPull},
        pac::{CAN1, TIM2, USART2},
        prelude::*,
        rcc::Config,
        serial::{self, config::Config as SerialConfig, Rx, Serial, Tx},
        timer,
    };

    use mini_ecu_app::cli::{self, Action, Console};
    use mini_ecu_app::logger::Filter;
    use mini_ecu_app::telemetry;
    use mini_ecu_app::vehicle::VehicleState;
    use mini_ecu_app::{log_info, log_warn};

    /// Control tick period; the physics gains assume this value.
    const TICK_MS: u32 = 100;
    /// Dashboard redraw every N ticks (500 ms).
    const DASH_REFRESH_TICKS: u32 = 5;

    const CLI_EVENT_CAP: usize = 16;
    const CAN_RX_CAP: usize = 8;

    /// Work items for the CLI task.
    pub enum CliEvent {
        Byte(u8),
        Refresh,
    }

    /// A received CAN frame, decoupled from the driver's types.
    pub struct CanRxFrame {
        id: u16,
        data: [u8; 8],
        len: usize,
    }

    #[shared]
    struct Shared {
        vehicle: VehicleState,
        console_tx: Tx<USART2>,
        log: Filter,
        can_log: bool,
    }

    #[local]
    struct Local {
        console_rx: Rx<USART2>,
        cli_sender: Sender<'static, CliEvent, CLI_EVENT_CAP>,
        tick_sender: Sender<'static, CliEvent, CLI_EVENT_CAP>,
        can_sender: Sender<'static, CanRxFrame, CAN_RX_CAP>,
        can_tx: bxcan::Tx<Can<CAN1>>,
        can_rx: bxcan::Rx0<Can<CAN1>>,
        timer: timer::CounterMs<TIM2>,
        led: gpio::PA5<Output<PushPull>>,
        tick_count: u32,
    }

    #[init]
    fn init(ctx: init::Context) -> (Shared, Local) {
        let dp = ctx.device;

        let rcc = dp.RCC.constrain();
        let mut rcc = rcc.freeze(Config::hsi().sysclk(16.MHz()).pclk1(8.MHz()));

        let gpioa = dp.GPIOA.split(&mut rcc);
        let led = gpioa.pa5.into_push_pull_output();

        // Console on USART2 (PA2/PA3), same line and settings the
        // bootloader used, so one terminal follows the whole boot.
        let tx_pin = gpioa.pa2.into_alternate();
        let rx_pin = gpioa.pa3.into_alternate();
        let mut serial = Serial::new(
            dp.USART2,
            (tx_pin, rx_pin),
            SerialConfig::default().baudrate(115200.bps()),
            &mut rcc,
        )
        .unwrap();
        serial.listen(serial::Event::RxNotEmpty);
        let (mut console_tx, console_rx) = serial.split();

        // CAN1 on PB8/PB9 in loopback: transmitted frames are received
        // back by this node, no transceiver or bus needed.
        let gpiob = dp.GPIOB.split(&mut rcc);
        let can_rx_pin = gpiob.pb8.into_alternate();
        let can_tx_pin = gpiob.pb9.into_alternate();
        let can = dp.CAN1.can((can_tx_pin, can_rx_pin), &mut rcc);
        let mut can = bxcan::Can::builder(can)
            // 125 kbit/s at the 8 MHz APB1 clock.
            .set_bit_timing(0x001c_0003)
            .set_loopback(true)
            .enable();
        can.modify_filters()
            .enable_bank(0, Fifo::Fifo0, Mask32::accept_all());
        can.enable_interrupt(Interrupt::Fifo0MessagePending);
        let (can_tx, can_rx, _can_rx1) = can.split();

        let mut timer = dp.TIM2.counter_ms(&mut rcc);
        timer.start(TICK_MS.millis()).unwrap();
        timer.listen(timer::Event::Update);

        let vehicle = VehicleState::new();
        cli::render_greeting(&mut console_tx, &vehicle).ok();

        let (cli_sender, cli_receiver) = make_channel!(CliEvent, CLI_EVENT_CAP);
        let tick_sender = cli_sender.clone();
        let (can_sender, can_receiver) = make_channel!(CanRxFrame, CAN_RX_CAP);

        cli_task::spawn(cli_receiver).ok();
        can_task::spawn(can_receiver).ok();

        (
            Shared {
                vehicle,
                console_tx,
                log: Filter::default(),
                can_log: false,
            },
            Local {
                console_rx,
                cli_sender,
                tick_sender,
                can_sender,
                can_tx,
                can_rx,
                timer,
                led,
                tick_count: 0,
            },
        )
    }

    #[idle]
    fn idle(_ctx: idle::Context) -> ! {
        loop {
            cortex_m::asm::wfi();
        }
    }

    /// Console RX: push bytes into the CLI channel. A full channel drops
    /// the byte, same as a full ring buffer would.
    #[task(binds = USART2, priority = 2, local = [console_rx, cli_sender])]
    fn usart2_rx(ctx: usart2_rx::Context) {
        while let Ok(byte) = ctx.local.console_rx.read() {
            ctx.local.cli_sender.try_send(CliEvent::Byte(byte)).ok();
        }
    }

    /// 100 ms control tick: advance the physics, transmit telemetry, and
    /// every fifth tick blink the heartbeat LED and request a dashboard
    /// redraw.
    #[task(
        binds = TIM2,
        priority = 2,
        local = [can_tx, timer, led, tick_count, tick_sender],
        shared = [vehicle]
    )]
    fn tick(mut ctx: tick::Context) {
        ctx.local.timer.clear_flags(timer::Flag::Update);

        let payload = ctx.shared.vehicle.lock(|vehicle| {
            vehicle.update(TICK_MS as f32 / 1000.0);
            telemetry::encode(vehicle)
        });

        let id = StandardId::new(telemetry::TELEMETRY_STD_ID).unwrap();
        ctx.local.can_tx.transmit(&Frame::new_data(id, payload)).ok();

        *ctx.local.tick_count += 1;
        if *ctx.local.tick_count >= DASH_REFRESH_TICKS {
            *ctx.local.tick_count = 0;
            ctx.local.led.toggle();
            ctx.local.tick_sender.try_send(CliEvent::Refresh).ok();
        }
    }

    /// CAN RX FIFO 0: drain frames into the CAN task's channel.
    #[task(binds = CAN1_RX0, priority = 2, local = [can_rx, can_sender])]
    fn can1_rx0(ctx: can1_rx0::Context) {
        while let Ok(frame) = ctx.local.can_rx.receive() {
            if let Id::Standard(id) = frame.id() {
                let mut msg = CanRxFrame {
                    id: id.as_raw(),
                    data: [0; 8],
                    len: 0,
                };
                if let Some(data) = frame.data() {
                    msg.len = data.len();
                    msg.data[..msg.len].copy_from_slice(data);
                }
                ctx.local.can_sender.try_send(msg).ok();
            }
        }
    }

    /// CLI interpreter and dashboard renderer.
    #[task(priority = 1, shared = [vehicle, console_tx, log, can_log])]
    async fn cli_task(
        mut ctx: cli_task::Context,
        mut receiver: Receiver<'static, CliEvent, CLI_EVENT_CAP>,
    ) {
        let mut console = Console::new();

        while let Ok(event) = receiver.recv().await {
            match event {
                CliEvent::Byte(byte) => {
                    let action = ctx.shared.console_tx.lock(|tx| console.feed(tx, byte));
                    match action {
                        Some(Action::SetSpeed(speed)) => {
                            ctx.shared.vehicle.lock(|v| v.set_target_speed(speed));
                            (&mut ctx.shared.log, &mut ctx.shared.console_tx).lock(|log, tx| {
                                log_info!(log, tx, "CLI", "Set target speed to {:.1} km/h", speed)
                            });
                        }
                        Some(Action::InjectCoolantOverheat) => {
                            ctx.shared.vehicle.lock(|v| {
                                let (speed, rpm) = (v.speed_kph, v.engine_rpm);
                                v.force(speed, rpm, 115.0);
                            });
                            (&mut ctx.shared.log, &mut ctx.shared.console_tx).lock(|log, tx| {
                                log_warn!(log, tx, "CLI", "Injected coolant overheat")
                            });
                        }
                        Some(Action::CanLogging(enable)) => {
                            ctx.shared.can_log.lock(|flag| *flag = enable);
                            (&mut ctx.shared.log, &mut ctx.shared.console_tx).lock(|log, tx| {
                                if enable {
                                    log_info!(log, tx, "CLI", "CAN RX logging enabled")
                                } else {
                                    log_info!(log, tx, "CLI", "CAN RX logging disabled")
                                }
                            });
                        }
                        Some(Action::ShowHelp) | None => {}
                    }
                }
                CliEvent::Refresh => {
                    (&mut ctx.shared.vehicle, &mut ctx.shared.console_tx).lock(|vehicle, tx| {
                        cli::render_dashboard(tx, vehicle).ok();
                    });
                }
            }
        }
    }

    /// Thread-level CAN RX processing: decode telemetry loopback frames
    /// and log them when `log on` is active.
    #[task(priority = 1, shared = [console_tx, log, can_log])]
    async fn can_task(
        mut ctx: can_task::Context,
        mut receiver: Receiver<'static, CanRxFrame, CAN_RX_CAP>,
    ) {
        while let Ok(msg) = receiver.recv().await {
            if !ctx.shared.can_log.lock(|flag| *flag) {
                continue;
            }

            (&mut ctx.shared.log, &mut ctx.shared.console_tx).lock(|log, tx| {
                match telemetry::decode(&msg.data[..msg.len]) {
                    Some(t) => log_info!(
                        log,
                        tx,
                        "CAN",
                        "RX 0x{:03X} spd={:.1} km/h rpm={} temp={:.1} C",
                        msg.id,
                        t.speed_kph,
                        t.engine_rpm,
                        t.coolant_temp_c
                    ),
                    None => log_info!(log, tx, "CAN", "RX 0x{:03X} dlc={}", msg.id, msg.len),
                }
            });
        }
    }
}

#[cfg(not(target_arch = "arm"))]
fn main() {}
