//! Output encoding and block sinks

use crate::types::Sample;

/// Offset-binary mapping from signed samples to `0..resolution` codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    resolution: u32,
}

impl OutputFormat {
    /// `resolution` is clamped to `2..=65536`
    pub fn new(resolution: u32) -> Self {
        Self {
            resolution: resolution.clamp(2, 1 << 16),
        }
    }

    #[inline]
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Encode a signed sample as an unsigned code
    #[inline]
    pub fn encode(&self, sample: Sample) -> u16 {
        let unsigned = (sample as u16 ^ 0x8000) as u32;
        ((unsigned * (self.resolution - 1)) >> 16) as u16
    }

    /// Recover a signed sample from a code (exact up to the code step)
    #[inline]
    pub fn decode(&self, code: u16) -> Sample {
        let max = (self.resolution - 1) as u64;
        let code = (code as u64).min(max);
        let unsigned = (((code << 16) + max / 2) / max).min(u16::MAX as u64) as u16;
        (unsigned ^ 0x8000) as Sample
    }

    /// Code for a zero sample, used as silence
    #[inline]
    pub fn midpoint(&self) -> u16 {
        self.encode(0)
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(4096)
    }
}

/// Destination for rendered blocks
pub trait BlockSink {
    /// The next block waiting to be filled, or `None` while the consumer
    /// still holds every block
    fn next_block(&mut self) -> Option<&mut [u16]>;

    /// Hand the block returned by `next_block` to the consumer
    fn commit(&mut self);
}

/// Two blocks alternating between the renderer and the consumer
#[derive(Debug, Clone)]
pub struct DoubleBuffer {
    halves: [Vec<u16>; 2],
    ready: [bool; 2],
    write: usize,
    read: usize,
}

impl DoubleBuffer {
    /// Two blocks of `block_size` codes, pre-filled with `fill`
    pub fn new(block_size: usize, fill: u16) -> Self {
        Self {
            halves: [vec![fill; block_size], vec![fill; block_size]],
            ready: [false; 2],
            write: 0,
            read: 0,
        }
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.halves[0].len()
    }

    /// Take the oldest committed block, freeing it for the renderer
    pub fn consume(&mut self) -> Option<&[u16]> {
        let idx = self.read;
        if !self.ready[idx] {
            return None;
        }
        self.ready[idx] = false;
        self.read ^= 1;
        Some(self.halves[idx].as_slice())
    }

    /// Number of committed blocks not yet consumed
    pub fn pending(&self) -> usize {
        self.ready.iter().filter(|&&r| r).count()
    }
}

impl BlockSink for DoubleBuffer {
    fn next_block(&mut self) -> Option<&mut [u16]> {
        if self.ready[self.write] {
            None
        } else {
            Some(self.halves[self.write].as_mut_slice())
        }
    }

    fn commit(&mut self) {
        self.ready[self.write] = true;
        self.write ^= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_range() {
        let fmt = OutputFormat::new(4096);
        assert_eq!(fmt.encode(Sample::MIN), 0);
        assert_eq!(fmt.encode(Sample::MAX), 4094);
        assert_eq!(fmt.midpoint(), 2047);
        assert!(fmt.encode(100) >= fmt.encode(99));
    }

    #[test]
    fn test_decode_inverts_encode() {
        for &resolution in &[256u32, 4096, 65536] {
            let fmt = OutputFormat::new(resolution);
            let step = (65536 / resolution) as i32 + 1;
            for s in (i16::MIN as i32..=i16::MAX as i32).step_by(97) {
                let back = fmt.decode(fmt.encode(s as Sample)) as i32;
                assert!(
                    (back - s).abs() <= step,
                    "{} -> {} -> {} at resolution {}",
                    s,
                    fmt.encode(s as Sample),
                    back,
                    resolution
                );
            }
        }
    }

    #[test]
    fn test_double_buffer_ping_pong() {
        let mut buf = DoubleBuffer::new(4, 0);
        assert!(buf.consume().is_none());

        buf.next_block().unwrap().fill(1);
        buf.commit();
        buf.next_block().unwrap().fill(2);
        buf.commit();
        assert!(buf.next_block().is_none(), "both halves held by the consumer");
        assert_eq!(buf.pending(), 2);

        assert_eq!(buf.consume().unwrap(), &[1, 1, 1, 1]);
        buf.next_block().unwrap().fill(3);
        buf.commit();
        assert_eq!(buf.consume().unwrap(), &[2, 2, 2, 2]);
        assert_eq!(buf.consume().unwrap(), &[3, 3, 3, 3]);
        assert!(buf.consume().is_none());
    }
}
