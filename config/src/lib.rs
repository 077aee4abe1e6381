#![no_std]

// ----------------------------------------------------------------------------
// Configurable
// ----------------------------------------------------------------------------
pub const SAMPLES_PER_BLOCK: usize = 32;
pub const NUM_BLOCKS: usize = 4; // Ring of decoded blocks, at least 3
pub const CAPTURE_TIMEOUT_MILLIS: u32 = 100;
pub const HEARTBEAT_BLOCKS: u32 = 64;

pub const PIN_CS: u8 = 2; // SCLK must be PIN_CS + 1 (side-set)
pub const PIN_SCLK: u8 = 3;
pub const PIN_DIN: u8 = 4; // Pico -> ADC
pub const PIN_DOUT: u8 = 5; // ADC -> Pico

pub const USB_VID: u16 = 0x16c0;
pub const USB_PID: u16 = 0x05dc;

// ----------------------------------------------------------------------------
// Should probably not be changed:
// ----------------------------------------------------------------------------
pub const NUM_CHANNELS: usize = 6;
pub const BITS_PER_SAMPLE: u32 = 10;
pub const FIELDS_PER_WORD: usize = 3;
pub const CHUNK_SIZE: usize = 64;
pub const CLOCK_RATE: u32 = 125_000_000;
pub const SEQUENCER_CLKDIV_INT: u16 = 15; // 15.625
pub const SEQUENCER_CLKDIV_FRAC: u8 = 160; // 0.625 * 256
pub const SEQUENCER_CYCLES_PER_CONVERSION: u32 = 64; //Also change in mcp3002.pio

pub const CMD_GRANT_CREDIT: u8 = 0x01;
pub const CMD_PACKET_LEN: usize = 2;

// ----------------------------------------------------------------------------
// Derived from other values:
// ----------------------------------------------------------------------------
pub const RAW_WORDS_PER_BLOCK: usize = 2 * SAMPLES_PER_BLOCK;
pub const SAMPLES_PER_DECODED_BLOCK: usize = SAMPLES_PER_BLOCK * NUM_CHANNELS;
pub const BLOCK_SIZE_BYTES: usize = SAMPLES_PER_DECODED_BLOCK * core::mem::size_of::<u16>();
pub const CHUNKS_PER_BLOCK: usize = (BLOCK_SIZE_BYTES + CHUNK_SIZE - 1) / CHUNK_SIZE;

pub const SAMPLE_MASK: u32 = (1 << BITS_PER_SAMPLE) - 1;
pub const ZERO_SAMPLE: u16 = 1 << (BITS_PER_SAMPLE - 1);
pub const PUSH_THRESHOLD_BITS: u8 = (BITS_PER_SAMPLE as usize * FIELDS_PER_WORD) as u8;

// Fixed point divider in 1/256 steps, integer math only
pub const SEQUENCER_CLOCK_HZ: u32 = (CLOCK_RATE as u64 * 256
    / (SEQUENCER_CLKDIV_INT as u64 * 256 + SEQUENCER_CLKDIV_FRAC as u64))
    as u32;
pub const SAMPLE_RATE: u32 = SEQUENCER_CLOCK_HZ
    / (SEQUENCER_CYCLES_PER_CONVERSION * (FIELDS_PER_WORD as u32 * 2));

const _: () = assert!(NUM_BLOCKS >= 3);
const _: () = assert!(NUM_BLOCKS <= 255);
const _: () = assert!(FIELDS_PER_WORD * 2 == NUM_CHANNELS);
