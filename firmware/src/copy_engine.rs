use core::sync::atomic::compiler_fence;
use core::sync::atomic::Ordering;

use rp_pico::hal::pac;

use mic_capture::CopyEngineControl;
use mic_capture::RawWord;

// CTRL_TRIG layout
const CTRL_EN: u32 = 1 << 0;
const CTRL_DATA_SIZE_WORD: u32 = 2 << 2;
const CTRL_INCR_WRITE: u32 = 1 << 5;
const CTRL_CHAIN_TO_SHIFT: u32 = 11;
const CTRL_TREQ_SEL_SHIFT: u32 = 15;
const CTRL_BUSY: u32 = 1 << 24;

/// One DMA channel copying from a fixed peripheral address into memory, paced by a DREQ.
pub struct CopyEngine {
    dma: pac::DMA,
    channel: u8,
    source: *const u32,
    dreq: u8,
}

impl CopyEngine {
    pub fn new(
        dma: pac::DMA,
        resets: &mut pac::RESETS,
        channel: u8,
        source: *const u32,
        dreq: u8,
    ) -> Self {
        resets.reset.modify(|_, w| w.dma().clear_bit());
        while resets.reset_done.read().dma().bit_is_clear() {}

        Self {
            dma,
            channel,
            source,
            dreq,
        }
    }

    fn ctrl(&self) -> u32 {
        CTRL_EN
            | CTRL_DATA_SIZE_WORD
            | CTRL_INCR_WRITE
            // Chaining to itself means no chaining
            | (self.channel as u32) << CTRL_CHAIN_TO_SHIFT
            | (self.dreq as u32) << CTRL_TREQ_SEL_SHIFT
    }
}

impl CopyEngineControl for CopyEngine {
    unsafe fn start(&mut self, dest: *mut RawWord, len: usize) {
        let ch = &self.dma.ch[self.channel as usize];
        ch.ch_read_addr.write(|w| w.bits(self.source as u32));
        ch.ch_write_addr.write(|w| w.bits(dest as u32));
        ch.ch_trans_count.write(|w| w.bits(len as u32));

        compiler_fence(Ordering::SeqCst);
        ch.ch_ctrl_trig.write(|w| w.bits(self.ctrl()));
    }

    fn is_busy(&self) -> bool {
        let ch = &self.dma.ch[self.channel as usize];
        let busy = ch.ch_ctrl_trig.read().bits() & CTRL_BUSY != 0;
        if !busy {
            compiler_fence(Ordering::SeqCst);
        }
        busy
    }

    fn abort(&mut self) {
        let mask = 1 << self.channel;
        self.dma.chan_abort.write(|w| unsafe { w.bits(mask) });
        while self.dma.chan_abort.read().bits() & mask != 0 {}
        compiler_fence(Ordering::SeqCst);
    }
}
