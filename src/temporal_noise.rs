/*
 * Copyright (c) Radzivon Bartoshyk, 11/2024. All rights reserved.
 *
 * Redistribution and use in source and binary forms, with or without modification,
 * are permitted provided that the following conditions are met:
 *
 * 1.  Redistributions of source code must retain the above copyright notice, this
 * list of conditions and the following disclaimer.
 *
 * 2.  Redistributions in binary form must reproduce the above copyright notice,
 * this list of conditions and the following disclaimer in the documentation
 * and/or other materials provided with the distribution.
 *
 * 3.  Neither the name of the copyright holder nor the names of its
 * contributors may be used to endorse or promote products derived from
 * this software without specific prior written permission.
 *
 * THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS"
 * AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE
 * IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
 * DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE
 * FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR CONSEQUENTIAL
 * DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
 * SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER
 * CAUSED AND ON ANY THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY,
 * OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
 * OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.
 */
#![forbid(unsafe_code)]

/// Per plane history of the temporal noise reducer, kept across frames.
#[derive(Debug, Clone, Default)]
pub struct TemporalHistory {
    blurred: Vec<u8>,
    blurred_stride: usize,
    /// Energy of every block on the previous frame with a one block margin on each side.
    past: Vec<u32>,
    past_stride: usize,
}

impl TemporalHistory {
    /// History for a plane of `width` x `height` samples, both rounded up to whole blocks.
    pub fn new(width: usize, height: usize) -> TemporalHistory {
        let blocks_x = width.div_ceil(8);
        let blocks_y = height.div_ceil(8);
        let blurred_stride = blocks_x * 8;
        let past_stride = blocks_x + 2;
        TemporalHistory {
            blurred: vec![0u8; blurred_stride * blocks_y * 8],
            blurred_stride,
            past: vec![0u32; past_stride * (blocks_y + 2)],
            past_stride,
        }
    }

    pub fn blocks(&self) -> (usize, usize) {
        if self.blurred_stride == 0 {
            return (0, 0);
        }
        (
            self.blurred_stride / 8,
            self.blurred.len() / (self.blurred_stride * 8),
        )
    }

    /// Previous frame energy of block (`block_x`, `block_y`).
    pub fn energy(&self, block_x: usize, block_y: usize) -> u32 {
        self.past[(block_y + 1) * self.past_stride + block_x + 1]
    }

    #[inline]
    fn past_index(&self, block_x: usize, block_y: usize) -> usize {
        (block_y + 1) * self.past_stride + block_x + 1
    }
}

/// Filters the 8x8 block at `block` against its history, `max_noise` holds the
/// three ascending energy thresholds.
///
/// Both the block and its history receive the blended result.
pub fn reduce_temporal_noise(
    buf: &mut [u8],
    block: usize,
    stride: usize,
    history: &mut TemporalHistory,
    block_x: usize,
    block_y: usize,
    max_noise: &[i32; 3],
) {
    let history_origin = block_y * 8 * history.blurred_stride + block_x * 8;
    let history_stride = history.blurred_stride;

    let mut energy = 0i32;
    for y in 0..8 {
        let src = &buf[block + y * stride..block + y * stride + 8];
        let reference =
            &history.blurred[history_origin + y * history_stride..history_origin + y * history_stride + 8];
        for (&cur, &r) in src.iter().zip(reference.iter()) {
            let diff = r as i32 - cur as i32;
            energy += diff * diff;
        }
    }

    let index = history.past_index(block_x, block_y);
    let neighbours = history.past[index - history.past_stride] as i64
        + history.past[index - 1] as i64
        + history.past[index + 1] as i64
        + history.past[index + history.past_stride] as i64;
    let smoothed = ((4 * energy as i64 + neighbours + 4) >> 3) as i32;
    history.past[index] = energy as u32;

    for y in 0..8 {
        let src = &mut buf[block + y * stride..block + y * stride + 8];
        let reference = &mut history.blurred
            [history_origin + y * history_stride..history_origin + y * history_stride + 8];
        for (cur, r) in src.iter_mut().zip(reference.iter_mut()) {
            let c = *cur as u32;
            let p = *r as u32;
            let v = if smoothed > max_noise[1] {
                if smoothed < max_noise[2] {
                    (p + c + 1) >> 1
                } else {
                    c
                }
            } else if smoothed < max_noise[0] {
                (p * 7 + c + 4) >> 3
            } else {
                (p * 3 + c + 2) >> 2
            };
            *cur = v as u8;
            *r = v as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    const STRIDE: usize = 16;
    const THRESHOLDS: [i32; 3] = [700, 1500, 3000];

    #[test]
    fn test_first_frame_resets_history() {
        let mut rng = rand::rng();
        let mut history = TemporalHistory::new(16, 16);
        let mut buf: Vec<u8> = (0..STRIDE * 16).map(|_| rng.random_range(100..=255u8)).collect();
        let before = buf.clone();
        reduce_temporal_noise(&mut buf, 8, STRIDE, &mut history, 1, 0, &THRESHOLDS);
        assert_eq!(buf, before);
        assert!(history.energy(1, 0) > 64 * 100 * 100 - 1);
        for y in 0..8 {
            assert_eq!(
                &history.blurred[y * 16 + 8..y * 16 + 16],
                &before[y * STRIDE + 8..y * STRIDE + 16]
            );
        }
    }

    #[test]
    fn test_static_content_is_stable() {
        let mut history = TemporalHistory::new(8, 8);
        for _ in 0..4 {
            let mut buf = vec![90u8; STRIDE * 8];
            reduce_temporal_noise(&mut buf, 0, STRIDE, &mut history, 0, 0, &THRESHOLDS);
            assert!(buf[..8].iter().all(|&v| v == 90));
        }
        assert_eq!(history.energy(0, 0), 0);
    }

    #[test]
    fn test_small_noise_is_heavily_blended() {
        let mut history = TemporalHistory::new(8, 8);
        let mut first = vec![100u8; STRIDE * 8];
        reduce_temporal_noise(&mut first, 0, STRIDE, &mut history, 0, 0, &THRESHOLDS);
        // energy 64 * 9 = 576, smoothed (4 * 576 + 4) >> 3 = 288 < 700
        let mut second = vec![103u8; STRIDE * 8];
        reduce_temporal_noise(&mut second, 0, STRIDE, &mut history, 0, 0, &THRESHOLDS);
        assert_eq!(second[0], ((100 * 7 + 103 + 4) >> 3) as u8);
        assert_eq!(history.energy(0, 0), 576);
    }

    #[test]
    fn test_medium_noise_blends_halfway() {
        let mut history = TemporalHistory::new(8, 8);
        let mut first = vec![100u8; STRIDE * 8];
        reduce_temporal_noise(&mut first, 0, STRIDE, &mut history, 0, 0, &THRESHOLDS);
        // energy 64 * 64 = 4096, smoothed 2048 sits between 1500 and 3000
        let mut second = vec![108u8; STRIDE * 8];
        reduce_temporal_noise(&mut second, 0, STRIDE, &mut history, 0, 0, &THRESHOLDS);
        assert_eq!(second[0], 104);
    }

    #[test]
    fn test_neighbour_energy_contributes() {
        let mut history = TemporalHistory::new(24, 8);
        let mut buf = vec![0u8; 24 * 8];
        for x in 0..8 {
            for y in 0..8 {
                buf[y * 24 + x] = 200;
            }
        }
        reduce_temporal_noise(&mut buf, 0, 24, &mut history, 0, 0, &THRESHOLDS);
        assert_eq!(history.energy(0, 0), 64 * 200 * 200);
        // the middle block is unchanged, yet its left neighbour pushes it over the top threshold
        let mut block = vec![0u8; 24 * 8];
        reduce_temporal_noise(&mut block, 8, 24, &mut history, 1, 0, &THRESHOLDS);
        assert_eq!(history.energy(1, 0), 0);
        assert!(block.iter().all(|&v| v == 0));
    }
}
