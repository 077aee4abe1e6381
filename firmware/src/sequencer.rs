use pio::Instruction;
use pio::InstructionOperands;
use pio::JmpCondition;
use pio::MovDestination;
use pio::MovOperation;
use pio::MovSource;
use pio_proc::pio_file;
use rp_pico::hal;
use rp_pico::hal::pac;

// Import pio crates
use hal::pio::PIOExt;
use hal::pio::Running;
use hal::pio::Rx;
use hal::pio::StateMachine;
use hal::pio::Stopped;
use hal::pio::SM0;

use mic_capture::SequencerControl;

type SeqSm = (pac::PIO0, SM0);

const PIO0_RXF0_OFFSET: usize = 0x020;
const DREQ_PIO0_RX0: u8 = 4;

enum State {
    Stopped(StateMachine<SeqSm, Stopped>),
    Running(StateMachine<SeqSm, Running>),
    Switching,
}

/// PIO0 SM0 running the MCP3002 program.
pub struct Sequencer {
    state: State,
    rx: Rx<SeqSm>,
    program_start: u8,
}

/// Install the program and configure the state machine. It stays stopped until the first
/// `enable`.
pub fn setup_sequencer(pio: pac::PIO0, resets: &mut pac::RESETS) -> Sequencer {
    let (mut pio0, sm0, _, _, _) = pio.split(resets);

    let program = pio_file!("./src/mcp3002.pio", select_program("mcp3002"));
    let installed = pio0.install(&program.program).unwrap();
    let program_start = installed.offset();

    let (mut sm, rx, _tx) = hal::pio::PIOBuilder::from_program(installed)
        .side_set_pin_base(config::PIN_CS)
        .set_pins(config::PIN_DIN, 1)
        .out_pins(config::PIN_DIN, 1)
        .in_pin_base(config::PIN_DOUT)
        .clock_divisor_fixed_point(config::SEQUENCER_CLKDIV_INT, config::SEQUENCER_CLKDIV_FRAC)
        .in_shift_direction(hal::pio::ShiftDirection::Left)
        .autopush(true)
        .push_threshold(config::PUSH_THRESHOLD_BITS)
        .buffers(hal::pio::Buffers::OnlyRx) // Joined FIFO, 8 words of slack for the DMA
        .build(sm0);

    sm.set_pindirs([
        (config::PIN_CS, hal::pio::PinDir::Output),
        (config::PIN_SCLK, hal::pio::PinDir::Output),
        (config::PIN_DIN, hal::pio::PinDir::Output),
        (config::PIN_DOUT, hal::pio::PinDir::Input),
    ]);

    Sequencer {
        state: State::Stopped(sm),
        rx,
        program_start,
    }
}

impl Sequencer {
    /// Address of the receive queue head, the fixed read address of the copy engine.
    pub fn fifo_address(&self) -> *const u32 {
        (pac::PIO0::ptr() as usize + PIO0_RXF0_OFFSET) as *const u32
    }

    /// Data request line raised while the receive queue holds words.
    pub fn dreq(&self) -> u8 {
        DREQ_PIO0_RX0
    }

    fn stop(&mut self) -> StateMachine<SeqSm, Stopped> {
        match core::mem::replace(&mut self.state, State::Switching) {
            State::Running(sm) => sm.stop(),
            State::Stopped(sm) => sm,
            State::Switching => unreachable!(),
        }
    }
}

impl SequencerControl for Sequencer {
    fn clear(&mut self) {
        let mut sm = self.stop();

        // Words of an aborted or overrun cycle must not end up at the start of the next buffer.
        while self.rx.read().is_some() {}

        // Neither may half a word in the ISR. Every cycle starts on the same ADC channel.
        let operands = [
            InstructionOperands::MOV {
                destination: MovDestination::ISR,
                op: MovOperation::None,
                source: MovSource::NULL,
            },
            InstructionOperands::MOV {
                destination: MovDestination::Y,
                op: MovOperation::None,
                source: MovSource::NULL,
            },
            InstructionOperands::JMP {
                condition: JmpCondition::Always,
                address: self.program_start,
            },
        ];
        for operands in operands {
            sm.exec_instruction(Instruction {
                operands,
                delay: 0,
                side_set: Some(0b01), // keep CS high
            });
        }
        self.state = State::Stopped(sm);
    }

    fn enable(&mut self) {
        let sm = self.stop();
        self.state = State::Running(sm.start());
    }

    fn disable(&mut self) {
        let sm = self.stop();
        self.state = State::Stopped(sm);
    }
}
