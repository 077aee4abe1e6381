use core::cell::RefCell;

use embedded_hal::digital::v2::OutputPin;
use fugit::ExtU32;
use fugit::MicrosDurationU32;
use rp_pico::hal;

use cortex_m::interrupt::Mutex;
use hal::gpio::Pin;
use hal::gpio::PushPullOutput;
use hal::timer::Alarm;
use hal::timer::Alarm1;
use pac::interrupt;
use rp_pico::pac;

pub type LedPin = Pin<rp_pico::hal::gpio::pin::bank0::Gpio25, PushPullOutput>;

const MAX_SEQUENCE_LEN: usize = 4;
const STEP_MILLIS: u32 = 10;

/// What the status LED is currently telling. Plays in the background from the alarm interrupt.
#[derive(Clone, Copy)]
pub enum Signal {
    /// A short flash, shown every `HEARTBEAT_BLOCKS` captured blocks.
    Heartbeat,
    /// Two long flashes, a capture cycle timed out.
    CaptureStall,
}

impl Signal {
    /// Positive: on for n steps, negative: off for n steps, zero: done.
    fn sequence(self) -> [i8; MAX_SEQUENCE_LEN] {
        match self {
            Signal::Heartbeat => [3, 0, 0, 0],
            Signal::CaptureStall => [40, -20, 40, 0],
        }
    }
}

struct Steps {
    data: [i8; MAX_SEQUENCE_LEN],
    pos: usize,
}

impl Steps {
    fn next(&mut self) -> Option<(bool, MicrosDurationU32)> {
        let step = *self.data.get(self.pos)?;
        if step == 0 {
            return None;
        }
        self.pos += 1;
        let duration = (step.unsigned_abs() as u32 * STEP_MILLIS * 1_000).micros();
        Some((step > 0, duration))
    }
}

struct TimerIrqData {
    alarm: Alarm1,
    led: LedPin,
    steps: Steps,
}

static TIMER_IRQ_DATA: Mutex<RefCell<Option<TimerIrqData>>> = Mutex::new(RefCell::new(None));

pub fn setup_status_led(timer: &mut hal::Timer, led: LedPin) {
    unsafe {
        pac::NVIC::unmask(pac::Interrupt::TIMER_IRQ_1);
    }

    let mut alarm1 = timer.alarm_1().unwrap();
    alarm1.enable_interrupt();
    cortex_m::interrupt::free(|cs| {
        TIMER_IRQ_DATA.borrow(cs).replace(Some(TimerIrqData {
            alarm: alarm1,
            led,
            steps: Steps {
                data: [0; MAX_SEQUENCE_LEN],
                pos: 0,
            },
        }));
    });
}

/// Replace whatever is playing with `signal`.
pub fn show(signal: Signal) {
    cortex_m::interrupt::free(|cs| {
        let data = TIMER_IRQ_DATA.borrow(cs);
        let mut data = data.borrow_mut();
        let Some(data) = data.as_mut() else {
            return;
        };
        data.steps = Steps {
            data: signal.sequence(),
            pos: 0,
        };
        data.alarm.schedule(100u32.micros()).unwrap();
    });
}

#[interrupt]
fn TIMER_IRQ_1() {
    cortex_m::interrupt::free(|cs| {
        let data = TIMER_IRQ_DATA.borrow(cs);
        let mut data = data.borrow_mut();
        let data = data.as_mut().unwrap();

        data.alarm.clear_interrupt();

        if let Some((on, duration)) = data.steps.next() {
            if on {
                let _ = data.led.set_high();
            } else {
                let _ = data.led.set_low();
            }
            data.alarm.schedule(duration).unwrap();
        } else {
            let _ = data.led.set_low();
        }
    })
}
