use std::io::{Read, Seek, Write};

use anyhow::Context;
use log::warn;
use mic_capture::assemble::BlockAssembler;
use mic_capture::DecodedBlock;

const READ_SIZE: usize = 4096;

pub fn wav_spec() -> hound::WavSpec {
    hound::WavSpec {
        channels: config::NUM_CHANNELS as u16,
        sample_rate: config::SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

/// 10 bit unsigned around `ZERO_SAMPLE` to full scale signed 16 bit.
pub fn to_pcm16(sample: u16) -> i16 {
    let shift = 16 - config::BITS_PER_SAMPLE;
    ((sample as i32 - config::ZERO_SAMPLE as i32) << shift) as i16
}

/// Convert a raw dump of the data endpoint to WAV. `progress` gets the number of bytes read so
/// far. Returns the number of complete blocks written.
pub fn dump_to_wav<W: Write + Seek>(
    mut source: impl Read,
    destination: W,
    mut progress: impl FnMut(u64),
) -> anyhow::Result<usize> {
    let mut writer =
        hound::WavWriter::new(destination, wav_spec()).context("failed to start wav file")?;

    let mut assembler = BlockAssembler::new();
    let mut buf = [0u8; READ_SIZE];
    let mut read_total = 0u64;
    let mut blocks = 0;
    let mut ready = Vec::new();

    loop {
        let n = match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("failed to read dump"),
        };
        read_total += n as u64;

        assembler.push(&buf[..n], |block: DecodedBlock| ready.push(block));
        for block in ready.drain(..) {
            for v in block.0 {
                writer
                    .write_sample(to_pcm16(v))
                    .context("failed to write samples")?;
            }
            blocks += 1;
        }
        progress(read_total);
    }

    if assembler.pending() != 0 {
        warn!(
            "dump ends with {} bytes of an incomplete block, dropped",
            assembler.pending()
        );
    }

    writer.finalize().context("failed to finish wav file")?;
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn block_with(seed: u16) -> DecodedBlock {
        let mut block = DecodedBlock::ZERO;
        for (i, v) in block.0.iter_mut().enumerate() {
            *v = (seed + i as u16 * 5) % 1024;
        }
        block
    }

    #[test]
    fn pcm_scaling() {
        assert_eq!(to_pcm16(config::ZERO_SAMPLE), 0);
        assert_eq!(to_pcm16(0), i16::MIN);
        assert_eq!(to_pcm16(1023), 511 << 6);
    }

    #[test]
    fn dump_becomes_six_channel_wav() {
        let blocks = [block_with(1), block_with(2), block_with(3)];
        let mut dump: Vec<u8> = blocks.iter().flat_map(|b| b.as_bytes().to_vec()).collect();
        dump.extend_from_slice(&[0x55; 17]);

        let mut out = Cursor::new(Vec::new());
        let mut last_progress = 0;
        let written = dump_to_wav(&dump[..], &mut out, |p| last_progress = p).unwrap();
        assert_eq!(written, 3);
        assert_eq!(last_progress, dump.len() as u64);

        let reader = hound::WavReader::new(Cursor::new(out.into_inner())).unwrap();
        assert_eq!(reader.spec().channels, 6);
        assert_eq!(reader.spec().sample_rate, config::SAMPLE_RATE);
        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        let expected: Vec<i16> = blocks
            .iter()
            .flat_map(|b| b.0.iter().map(|v| to_pcm16(*v)))
            .collect();
        assert_eq!(samples, expected);
    }

    #[test]
    fn empty_dump() {
        let mut out = Cursor::new(Vec::new());
        assert_eq!(dump_to_wav(std::io::empty(), &mut out, |_| {}).unwrap(), 0);
    }
}
