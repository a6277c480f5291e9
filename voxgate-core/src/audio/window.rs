//! Fixed-size windowing over a `PcmBuffer`.
//!
//! `chunks` borrows the source buffer and yields windows lazily; calling it
//! again restarts from the beginning. Each window copies only its own frames.

use super::{PcmBuffer, Samples};

/// What to do with a final window shorter than the requested size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TailPolicy {
    /// Discard it.
    Drop,
    /// Yield it as-is.
    #[default]
    Short,
    /// Yield it padded with silence to the full size.
    Pad,
}

/// Iterator returned by [`PcmBuffer::chunks`].
#[derive(Debug, Clone)]
pub struct PcmChunks<'a> {
    source: &'a PcmBuffer,
    size: usize,
    hop: usize,
    pos: usize,
    tail: TailPolicy,
    done: bool,
}

impl PcmBuffer {
    /// Windows of `size` frames, consecutive windows sharing `overlap`
    /// frames. A trailing partial window is handled per `tail`.
    ///
    /// `size == 0` yields nothing; `overlap` is capped at `size - 1` so the
    /// sequence always advances and stays finite.
    pub fn chunks(&self, size: usize, overlap: usize, tail: TailPolicy) -> PcmChunks<'_> {
        let hop = size.saturating_sub(overlap.min(size.saturating_sub(1))).max(1);
        PcmChunks {
            source: self,
            size,
            hop,
            pos: 0,
            tail,
            done: size == 0,
        }
    }
}

impl<'a> Iterator for PcmChunks<'a> {
    type Item = PcmBuffer;

    fn next(&mut self) -> Option<PcmBuffer> {
        if self.done {
            return None;
        }
        let frames = self.source.frames();
        if self.pos >= frames {
            self.done = true;
            return None;
        }

        let remaining = frames - self.pos;
        if remaining >= self.size {
            let window = self.window(self.pos, self.size);
            self.pos += self.hop;
            // A window that already reached the end leaves nothing new for a
            // shorter overlapping tail.
            if self.pos + self.size > frames && self.pos - self.hop + self.size == frames {
                self.done = true;
            }
            return Some(window);
        }

        self.done = true;
        match self.tail {
            TailPolicy::Drop => None,
            TailPolicy::Short => Some(self.window(self.pos, remaining)),
            TailPolicy::Pad => Some(pad_to(self.window(self.pos, remaining), self.size)),
        }
    }
}

impl<'a> PcmChunks<'a> {
    fn window(&self, start: usize, len: usize) -> PcmBuffer {
        let out = self.source.slice_frames(start, len);
        match self.source.time_base() {
            Some(tb) => {
                let base = self.source.pts().unwrap_or(0);
                let offset = (start as f64 / self.source.sample_rate() as f64 / tb).round() as i64;
                out.with_timestamps(Some(base + offset), None, Some(tb))
            }
            None => out,
        }
    }
}

fn pad_to(window: PcmBuffer, size: usize) -> PcmBuffer {
    let frames = window.frames();
    if frames >= size {
        return window;
    }
    let channels = window.channels() as usize;
    let samples = match window.samples() {
        Samples::Int16(v) => Samples::Int16(pad_planar(v, channels, frames, size)),
        Samples::Float32(v) => Samples::Float32(pad_planar(v, channels, frames, size)),
    };
    window.with_samples(samples)
}

fn pad_planar<S: Copy + Default>(data: &[S], channels: usize, frames: usize, size: usize) -> Vec<S> {
    let mut out = Vec::with_capacity(size * channels);
    for c in 0..channels {
        out.extend_from_slice(&data[c * frames..(c + 1) * frames]);
        out.resize((c + 1) * size, S::default());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> PcmBuffer {
        PcmBuffer::from_i16((0..n as i16).collect(), 16_000, 1).unwrap()
    }

    fn firsts(chunks: PcmChunks<'_>) -> Vec<(i16, usize)> {
        chunks
            .map(|c| (c.as_i16().unwrap()[0], c.frames()))
            .collect()
    }

    #[test]
    fn tail_policies() {
        let pcm = ramp(10);
        assert_eq!(
            firsts(pcm.chunks(4, 0, TailPolicy::Drop)),
            vec![(0, 4), (4, 4)]
        );
        assert_eq!(
            firsts(pcm.chunks(4, 0, TailPolicy::Short)),
            vec![(0, 4), (4, 4), (8, 2)]
        );
        let padded: Vec<PcmBuffer> = pcm.chunks(4, 0, TailPolicy::Pad).collect();
        assert_eq!(padded.len(), 3);
        assert_eq!(padded[2].as_i16().unwrap(), &[8, 9, 0, 0]);
    }

    #[test]
    fn overlap_advances_by_hop() {
        let pcm = ramp(10);
        assert_eq!(
            firsts(pcm.chunks(4, 2, TailPolicy::Drop)),
            vec![(0, 4), (2, 4), (4, 4), (6, 4)]
        );
    }

    #[test]
    fn exact_multiple_has_no_tail() {
        let pcm = ramp(8);
        assert_eq!(
            firsts(pcm.chunks(4, 0, TailPolicy::Pad)),
            vec![(0, 4), (4, 4)]
        );
    }

    #[test]
    fn iteration_is_restartable_and_finite() {
        let pcm = ramp(7);
        let a: Vec<PcmBuffer> = pcm.chunks(3, 5, TailPolicy::Short).collect();
        let b: Vec<PcmBuffer> = pcm.chunks(3, 5, TailPolicy::Short).collect();
        assert_eq!(a, b);
        assert!(a.len() <= 7);
        assert_eq!(pcm.chunks(0, 0, TailPolicy::Short).count(), 0);
    }

    #[test]
    fn stereo_padding_pads_each_channel() {
        let pcm = PcmBuffer::from_i16(vec![1, 2, 3, -1, -2, -3], 8_000, 2).unwrap();
        let chunks: Vec<PcmBuffer> = pcm.chunks(2, 0, TailPolicy::Pad).collect();
        assert_eq!(chunks[0].as_i16().unwrap(), &[1, 2, -1, -2]);
        assert_eq!(chunks[1].as_i16().unwrap(), &[3, 0, -3, 0]);
    }

    #[test]
    fn windows_carry_sample_timestamps() {
        let pcm = ramp(8).with_timestamps(Some(100), None, Some(1.0 / 16_000.0));
        let pts: Vec<Option<i64>> = pcm.chunks(4, 0, TailPolicy::Drop).map(|c| c.pts()).collect();
        assert_eq!(pts, vec![Some(100), Some(104)]);
    }
}
