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

/// Blocks with a smaller interior range are never deringed.
pub const DERING_THRESHOLD: i32 = 20;

/// Marks samples of one 10 sample window row that sit inside a run of three
/// above average (bits `0..10`) or three not above average (bits `16..26`) samples.
#[inline(always)]
fn row_pattern(row: &[u8], avg: i32) -> u32 {
    let mut t = row
        .iter()
        .take(10)
        .enumerate()
        .fold(0u32, |acc, (i, &v)| acc | (((v as i32 > avg) as u32) << i));
    t |= (!t) << 16;
    t & (t << 1) & (t >> 1)
}

/// Deringing of the 8x8 block whose 10x10 neighbourhood starts at `top_left`.
///
/// Interior samples lying in a uniform 3x3 area relative to the block
/// average are replaced by their `(1,2,1; 2,4,2; 1,2,1) / 16` weighted mean,
/// never moving further than `qp / 2 + 1` from their value. Samples are
/// updated in place, so later samples see already filtered neighbours.
pub fn dering(buf: &mut [u8], top_left: usize, stride: usize, qp: i32) {
    let mut min = 255i32;
    let mut max = 0i32;
    for y in 1..9 {
        let row = top_left + y * stride;
        for &v in &buf[row + 1..row + 9] {
            min = min.min(v as i32);
            max = max.max(v as i32);
        }
    }
    if max - min < DERING_THRESHOLD {
        return;
    }
    let avg = (min + max + 1) >> 1;
    let qp2 = (qp / 2 + 1).max(0);

    let mut patterns = [0u32; 10];
    for (y, pattern) in patterns.iter_mut().enumerate() {
        let row = top_left + y * stride;
        *pattern = row_pattern(&buf[row..row + 10], avg);
    }

    let mut uniform = [0u32; 8];
    for (y, dst) in uniform.iter_mut().enumerate() {
        let t = patterns[y] & patterns[y + 1] & patterns[y + 2];
        *dst = t | (t >> 16);
    }

    for (y, &t) in uniform.iter().enumerate() {
        let row = top_left + (y + 1) * stride;
        for x in 1..9 {
            if t & (1 << x) == 0 {
                continue;
            }
            let at = row + x;
            let above = at - stride;
            let below = at + stride;
            let f = buf[above - 1] as i32
                + 2 * buf[above] as i32
                + buf[above + 1] as i32
                + 2 * buf[at - 1] as i32
                + 4 * buf[at] as i32
                + 2 * buf[at + 1] as i32
                + buf[below - 1] as i32
                + 2 * buf[below] as i32
                + buf[below + 1] as i32;
            let f = (f + 8) >> 4;
            let v = buf[at] as i32;
            buf[at] = f.clamp(v - qp2, v + qp2) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    const STRIDE: usize = 12;

    #[test]
    fn test_dering_noop_below_threshold() {
        let mut rng = rand::rng();
        for _ in 0..500 {
            let base = rng.random_range(0..=235u8);
            let mut buf: Vec<u8> = (0..STRIDE * 11)
                .map(|_| base + rng.random_range(0..20u8))
                .collect();
            let before = buf.clone();
            dering(&mut buf, 1, STRIDE, rng.random_range(1..32));
            assert_eq!(buf, before);
        }
    }

    #[test]
    fn test_dering_change_bounded_by_qp() {
        let mut rng = rand::rng();
        for _ in 0..2000 {
            let mut buf: Vec<u8> = (0..STRIDE * 11).map(|_| rng.random::<u8>()).collect();
            let qp = rng.random_range(1..32);
            let before = buf.clone();
            dering(&mut buf, 0, STRIDE, qp);
            for (i, (&a, &b)) in before.iter().zip(buf.iter()).enumerate() {
                let (y, x) = (i / STRIDE, i % STRIDE);
                if !(1..9).contains(&y) || !(1..9).contains(&x) {
                    assert_eq!(a, b, "halo sample at {}x{} changed", x, y);
                }
                assert!((a as i32 - b as i32).abs() <= qp / 2 + 1);
            }
        }
    }

    #[test]
    fn test_dering_keeps_strong_edge() {
        let mut rng = rand::rng();
        let mut buf = vec![0u8; STRIDE * 10];
        for y in 0..10 {
            for x in 0..10 {
                let base = if x < 5 { 40 } else { 200 };
                buf[y * STRIDE + x] = base + rng.random_range(0..=3u8);
            }
        }
        let before = buf.clone();
        dering(&mut buf, 0, STRIDE, 8);
        for y in 0..10 {
            assert_eq!(buf[y * STRIDE + 4], before[y * STRIDE + 4]);
            assert_eq!(buf[y * STRIDE + 5], before[y * STRIDE + 5]);
        }
        for y in 1..9 {
            for x in [1usize, 2, 3, 6, 7, 8] {
                let delta = buf[y * STRIDE + x] as i32 - before[y * STRIDE + x] as i32;
                assert!(delta.abs() <= 3);
            }
        }
    }

    #[test]
    fn test_dering_smooths_ringing() {
        let mut buf = vec![0u8; STRIDE * 10];
        for y in 0..10 {
            for x in 0..10 {
                buf[y * STRIDE + x] = if x < 3 { 30 } else { 180 };
            }
        }
        buf[4 * STRIDE + 6] = 190;
        dering(&mut buf, 0, STRIDE, 20);
        // the surrounding 3x3 area is uniformly above average, so the spike is pulled towards 180
        assert_eq!(buf[4 * STRIDE + 6], 183);
    }
}
