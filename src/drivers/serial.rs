use std::io::{self, Read};
use std::time::Duration;

use serialport::SerialPort;

use crate::drivers::source::is_valid_sample_rate;
use crate::drivers::{MonitorError, SampleBatch, SampleSource};
use crate::types::Sample;

const READ_TIMEOUT: Duration = Duration::from_millis(50);
const READ_CHUNK_BYTES: usize = 1024;

/// Turns a byte stream of little-endian `u16` words into samples,
/// carrying an odd trailing byte over to the next read.
#[derive(Debug, Default)]
pub struct WordDecoder {
    pending: Option<u8>,
}

impl WordDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, bytes: &[u8]) -> Vec<Sample> {
        let mut samples = Vec::with_capacity((bytes.len() + 1) / 2);
        let mut rest = bytes;
        if let Some(low) = self.pending.take() {
            match rest.split_first() {
                Some((&high, tail)) => {
                    samples.push(Sample::from_le_bytes([low, high]));
                    rest = tail;
                }
                None => {
                    self.pending = Some(low);
                    return samples;
                }
            }
        }
        let mut words = rest.chunks_exact(2);
        samples.extend(words.by_ref().map(|w| Sample::from_le_bytes([w[0], w[1]])));
        self.pending = words.remainder().first().copied();
        samples
    }
}

/// ADC samples streamed over a serial link by the acquisition board.
pub struct SerialSource {
    port: Box<dyn SerialPort>,
    sample_rate_hz: f32,
    decoder: WordDecoder,
    buf: Vec<u8>,
}

impl SerialSource {
    pub fn open(port_name: &str, baud_rate: u32, sample_rate_hz: f32) -> Result<Self, MonitorError> {
        if !is_valid_sample_rate(sample_rate_hz) {
            return Err(MonitorError::InvalidSampleRate);
        }
        let port = serialport::new(port_name, baud_rate)
            .timeout(READ_TIMEOUT)
            .open()?;
        log::info!("serial sample source open on {port_name} at {baud_rate} baud");
        Ok(Self {
            port,
            sample_rate_hz,
            decoder: WordDecoder::new(),
            buf: vec![0; READ_CHUNK_BYTES],
        })
    }
}

impl SampleSource for SerialSource {
    fn next_batch(&mut self) -> Result<Option<SampleBatch>, MonitorError> {
        match self.port.read(&mut self.buf) {
            Ok(0) => Ok(None),
            Ok(n) => {
                let samples = self.decoder.decode(&self.buf[..n]);
                Ok(Some(SampleBatch::new(self.sample_rate_hz, samples)))
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                Ok(Some(SampleBatch::new(self.sample_rate_hz, Vec::new())))
            }
            Err(e) => Err(e.into()),
        }
    }
}
