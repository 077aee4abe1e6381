#![no_std]
#![no_main]

mod copy_engine;
mod led;
mod panic;
mod sequencer;
mod usb;

use defmt::info;
use defmt::warn;
use defmt_rtt as _;
use fugit::ExtU64;

// The macro for our start-up function
use rp_pico::entry;

// Pull in any important traits
use rp_pico::hal;
use rp_pico::hal::pac;

use mic_capture::{decode_into, CaptureContext, Clock, Instant, SampleRing};

use crate::copy_engine::CopyEngine;

struct TimerClock<'a>(&'a hal::Timer);

impl Clock for TimerClock<'_> {
    fn now(&self) -> Instant {
        self.0.get_counter()
    }
}

/// Entry point to our bare-metal application.
///
/// The `#[entry]` macro ensures the Cortex-M start-up code calls this function
/// as soon as all global variables are initialised.
///
/// Sets up the ADC sequencer, the copy engine and USB, then captures and decodes blocks
/// forever. Sending happens from the USB interrupt.
#[entry]
fn main() -> ! {
    run()
}

fn run() -> ! {
    let mut pac = pac::Peripherals::take().unwrap();

    // Set up the watchdog driver - needed by the clock setup code
    let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);

    // Configure the clocks
    //
    // The default is to generate a 125 MHz system clock, which the sequencer divider assumes
    let clocks = hal::clocks::init_clocks_and_plls(
        rp_pico::XOSC_CRYSTAL_FREQ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .ok()
    .unwrap();

    // The single-cycle I/O block controls our GPIO pins
    let sio = hal::Sio::new(pac.SIO);

    // Set the pins up according to their function on this particular board
    let pins = rp_pico::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    // ADC lines, numbers match config::PIN_*
    let _cs = pins.gpio2.into_mode::<hal::gpio::FunctionPio0>();
    let _sclk = pins.gpio3.into_mode::<hal::gpio::FunctionPio0>();
    let _din = pins.gpio4.into_mode::<hal::gpio::FunctionPio0>();
    let _dout = pins.gpio5.into_mode::<hal::gpio::FunctionPio0>();

    let sequencer = sequencer::setup_sequencer(pac.PIO0, &mut pac.RESETS);
    let copy_engine = CopyEngine::new(
        pac.DMA,
        &mut pac.RESETS,
        0,
        sequencer.fifo_address(),
        sequencer.dreq(),
    );

    let ring: &'static mut SampleRing = cortex_m::singleton!(: SampleRing = SampleRing::new())
        .unwrap();
    let (mut writer, reader) = ring.split();

    usb::setup_usb(
        pac.USBCTRL_REGS,
        pac.USBCTRL_DPRAM,
        clocks.usb_clock,
        &mut pac.RESETS,
        reader,
    );

    let mut timer = hal::Timer::new(pac.TIMER, &mut pac.RESETS);
    led::setup_status_led(&mut timer, pins.led.into_push_pull_output());
    let clock = TimerClock(&timer);

    info!(
        "capturing {} samples x {} channels per block at {} Hz",
        config::SAMPLES_PER_BLOCK,
        config::NUM_CHANNELS,
        config::SAMPLE_RATE
    );

    let timeout = (config::CAPTURE_TIMEOUT_MILLIS as u64 * 1_000).micros();
    let mut capture = CaptureContext::new(sequencer, copy_engine);
    let mut published: u32 = 0;
    // False after a stalled cycle: the front buffer was not replaced and is already published.
    let mut front_is_new = true;

    // ----------------------------------------------------------------------------
    // Main loop! -----------------------------------------------------------------
    // ----------------------------------------------------------------------------
    loop {
        capture.start_capture();

        // Decode the previous cycle while the hardware fills the other buffer.
        if front_is_new {
            writer.publish_with(|block| decode_into(capture.front(), block));
            usb::notify_block_published();

            published = published.wrapping_add(1);
            if published % config::HEARTBEAT_BLOCKS == 0 {
                led::show(led::Signal::Heartbeat);
            }
        }

        front_is_new = match capture.wait_for_capture_complete_timeout(timeout, &clock) {
            Ok(()) => true,
            Err(e) => {
                warn!("{}, restarting capture", e);
                led::show(led::Signal::CaptureStall);
                false
            }
        };
    }
}
