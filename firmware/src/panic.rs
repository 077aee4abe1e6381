use embedded_hal::digital::v2::OutputPin;
use rp_pico::{
    hal::{self, Clock},
    pac,
};

/// (on, off) in units of 200ms: three short, three long, three short.
const PANIC_PATTERN: [(u8, u8); 9] = [
    (1, 1),
    (1, 1),
    (1, 3),
    (3, 1),
    (3, 1),
    (3, 3),
    (1, 1),
    (1, 1),
    (1, 8),
];
const UNIT_MS: u32 = 200;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    cortex_m::interrupt::disable();
    defmt::error!("{}", defmt::Display2Format(info));

    let core = unsafe { pac::CorePeripherals::steal() };
    let mut pac = unsafe { pac::Peripherals::steal() };

    // Stop the capture engines so they do not keep writing into memory.
    pac.DMA.chan_abort.write(|w| unsafe { w.bits(0xfff) });
    pac.PIO0.ctrl.write(|w| unsafe { w.bits(0) });

    let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);
    let Ok(clocks) = hal::clocks::init_clocks_and_plls(
        rp_pico::XOSC_CRYSTAL_FREQ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    ) else {
        loop {
            cortex_m::asm::wfi();
        }
    };

    // The single-cycle I/O block controls our GPIO pins
    let sio = hal::Sio::new(pac.SIO);
    let pins = rp_pico::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    let mut delay = cortex_m::delay::Delay::new(core.SYST, clocks.system_clock.freq().to_Hz());
    let mut led_pin = pins.led.into_push_pull_output();

    loop {
        for (on, off) in PANIC_PATTERN {
            let _ = led_pin.set_high();
            delay.delay_ms(on as u32 * UNIT_MS);
            let _ = led_pin.set_low();
            delay.delay_ms(off as u32 * UNIT_MS);
        }
    }
}
