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
use crate::mode::FilterFlags;
use crate::numerics::{average_u8, average_u8_floor, clip_pixel, median3_u8};
#[cfg(all(target_arch = "aarch64", target_feature = "neon"))]
use crate::neon::{neon_deinterlace_blend, neon_deinterlace_linear, neon_deinterlace_median};
#[cfg(all(any(target_arch = "x86", target_arch = "x86_64"), feature = "sse"))]
use crate::sse::{sse_deinterlace_blend, sse_deinterlace_linear, sse_deinterlace_median};
use crate::yuv_support::KernelVariant;

/// Deinterlacing algorithm, at most one is active per plane.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Deinterlacer {
    /// Odd lines become the rounded up average of their neighbours.
    LinearInterpolate,
    /// Every line becomes a `(1,2,1)/4` blend, stateful.
    LinearBlend,
    /// Odd lines become the median of themselves and their neighbours.
    Median,
    /// Odd lines are rebuilt with a `(-1,9,9,-1)/16` cubic.
    CubicInterpolate,
    /// Odd lines get the `(-1,4,2,4,-1)/8` filter, stateful.
    FfmpegFiveTap,
    /// Every line gets the `(-1,2,6,2,-1)/8` low-pass, stateful.
    LowPassFiveTap,
}

impl Deinterlacer {
    /// Picks the deinterlacer for a plane, when several are requested the
    /// first of linear, blend, median, cubic, ffmpeg and low-pass wins.
    pub fn from_flags(flags: FilterFlags) -> Option<Deinterlacer> {
        const PRIORITY: [(FilterFlags, Deinterlacer); 6] = [
            (FilterFlags::LINEAR_IPOL_DEINT_FILTER, Deinterlacer::LinearInterpolate),
            (FilterFlags::LINEAR_BLEND_DEINT_FILTER, Deinterlacer::LinearBlend),
            (FilterFlags::MEDIAN_DEINT_FILTER, Deinterlacer::Median),
            (FilterFlags::CUBIC_IPOL_DEINT_FILTER, Deinterlacer::CubicInterpolate),
            (FilterFlags::FFMPEG_DEINT_FILTER, Deinterlacer::FfmpegFiveTap),
            (FilterFlags::LOWPASS5_DEINT_FILTER, Deinterlacer::LowPassFiveTap),
        ];
        PRIORITY
            .iter()
            .find(|(flag, _)| flags.contains(*flag))
            .map(|&(_, kind)| kind)
    }

    /// Whether the filter carries lines between consecutive blocks of a row.
    pub const fn is_stateful(self) -> bool {
        matches!(
            self,
            Deinterlacer::LinearBlend | Deinterlacer::FfmpegFiveTap | Deinterlacer::LowPassFiveTap
        )
    }
}

/// Lines carried from one block row to the next, one entry per plane column.
///
/// Stateful deinterlacers must visit the blocks of a plane in raster order,
/// column `x` reads what the block above it left in `x..x + 8`.
#[derive(Debug, Clone, Default)]
pub struct DeinterlaceState {
    pub(crate) line: Vec<u8>,
    pub(crate) second_line: Vec<u8>,
}

impl DeinterlaceState {
    pub fn new(width: usize) -> DeinterlaceState {
        let len = width + 16;
        DeinterlaceState {
            line: vec![0u8; len],
            second_line: vec![0u8; len],
        }
    }

    pub fn width(&self) -> usize {
        self.line.len().saturating_sub(16)
    }
}

/// Rows `5, 7, 9, 11` become the average of the rows around them.
pub fn deinterlace_linear(buf: &mut [u8], block: usize, stride: usize) {
    let src = block + 4 * stride;
    for x in 0..8 {
        for k in [1usize, 3, 5, 7] {
            let above = buf[src + (k - 1) * stride + x];
            let below = buf[src + (k + 1) * stride + x];
            buf[src + k * stride + x] = average_u8(above, below);
        }
    }
}

/// Rows `6, 8, 10, 12` are rebuilt from the even rows `3..=15`.
pub fn deinterlace_cubic(buf: &mut [u8], block: usize, stride: usize) {
    let src = block + 3 * stride;
    for x in 0..8 {
        let at = |row: usize| src + row * stride + x;
        for k in [3usize, 5, 7, 9] {
            let v = -(buf[at(k - 3)] as i32) + 9 * buf[at(k - 1)] as i32 + 9 * buf[at(k + 1)] as i32
                - buf[at(k + 3)] as i32;
            buf[at(k)] = clip_pixel(v >> 4);
        }
    }
}

/// `(1,2,1)/4` vertical blend of rows `4..12`, `tmp` holds the unfiltered row above.
pub fn deinterlace_blend(buf: &mut [u8], block: usize, stride: usize, tmp: &mut [u8]) {
    let src = block + 4 * stride;
    for x in 0..8 {
        let mut previous = tmp[x];
        for k in 0..8 {
            let current = buf[src + k * stride + x];
            let next = buf[src + (k + 1) * stride + x];
            buf[src + k * stride + x] = average_u8(current, average_u8_floor(previous, next));
            previous = current;
        }
        tmp[x] = previous;
    }
}

/// Rows `5, 7, 9, 11` become the median of themselves and both neighbours.
pub fn deinterlace_median(buf: &mut [u8], block: usize, stride: usize) {
    let src = block + 4 * stride;
    for x in 0..8 {
        for k in [1usize, 3, 5, 7] {
            let above = buf[src + (k - 1) * stride + x];
            let current = buf[src + k * stride + x];
            let below = buf[src + (k + 1) * stride + x];
            buf[src + k * stride + x] = median3_u8(above, current, below);
        }
    }
}

pub fn deinterlace_ffmpeg(buf: &mut [u8], block: usize, stride: usize, tmp: &mut [u8]) {
    let src = block + 4 * stride;
    for x in 0..8 {
        let at = |row: usize| src + row * stride + x;
        // `previous` always holds the unfiltered odd row two above the one being rebuilt
        let mut previous = tmp[x] as i32;
        for k in [1usize, 3, 5, 7] {
            let current = buf[at(k)] as i32;
            let v = -previous + 4 * buf[at(k - 1)] as i32 + 2 * current + 4 * buf[at(k + 1)] as i32
                - buf[at(k + 2)] as i32
                + 4;
            buf[at(k)] = clip_pixel(v >> 3);
            previous = current;
        }
        tmp[x] = previous as u8;
    }
}

pub fn deinterlace_lowpass5(
    buf: &mut [u8],
    block: usize,
    stride: usize,
    tmp: &mut [u8],
    tmp2: &mut [u8],
) {
    let src = block + 4 * stride;
    for x in 0..8 {
        let at = |row: usize| src + row * stride + x;
        // two unfiltered rows above the current one
        let mut above2 = tmp[x] as i32;
        let mut above1 = tmp2[x] as i32;
        for k in 0..8 {
            let current = buf[at(k)] as i32;
            let v = -(above2 + buf[at(k + 2)] as i32) + 2 * (above1 + buf[at(k + 1)] as i32)
                + 6 * current
                + 4;
            buf[at(k)] = clip_pixel(v >> 3);
            above2 = above1;
            above1 = current;
        }
        tmp[x] = above2 as u8;
        tmp2[x] = above1 as u8;
    }
}

/// Deinterlaces the block at `block`, `x` is the block column in the plane.
pub fn deinterlace_block(
    kind: Deinterlacer,
    buf: &mut [u8],
    block: usize,
    stride: usize,
    state: &mut DeinterlaceState,
    x: usize,
    variant: KernelVariant,
) {
    // Callers may pass any variant, vector kernels need the CPU check.
    let _use_vector = variant.supported() == KernelVariant::VectorOptimized;
    let _window_range = block + 4 * stride..block + 12 * stride + 8;
    match kind {
        Deinterlacer::LinearInterpolate => {
            #[cfg(all(any(target_arch = "x86", target_arch = "x86_64"), feature = "sse"))]
            {
                if _use_vector {
                    let window = &mut buf[_window_range.clone()];
                    unsafe {
                        sse_deinterlace_linear(window, stride);
                    }
                    return;
                }
            }
            #[cfg(all(target_arch = "aarch64", target_feature = "neon"))]
            {
                if _use_vector {
                    let window = &mut buf[_window_range.clone()];
                    neon_deinterlace_linear(window, stride);
                    return;
                }
            }
            deinterlace_linear(buf, block, stride);
        }
        Deinterlacer::LinearBlend => {
            let tmp = &mut state.line[x..x + 8];
            #[cfg(all(any(target_arch = "x86", target_arch = "x86_64"), feature = "sse"))]
            {
                if _use_vector {
                    let window = &mut buf[_window_range.clone()];
                    unsafe {
                        sse_deinterlace_blend(window, stride, tmp);
                    }
                    return;
                }
            }
            #[cfg(all(target_arch = "aarch64", target_feature = "neon"))]
            {
                if _use_vector {
                    let window = &mut buf[_window_range.clone()];
                    neon_deinterlace_blend(window, stride, tmp);
                    return;
                }
            }
            deinterlace_blend(buf, block, stride, tmp);
        }
        Deinterlacer::Median => {
            #[cfg(all(any(target_arch = "x86", target_arch = "x86_64"), feature = "sse"))]
            {
                if _use_vector {
                    let window = &mut buf[_window_range.clone()];
                    unsafe {
                        sse_deinterlace_median(window, stride);
                    }
                    return;
                }
            }
            #[cfg(all(target_arch = "aarch64", target_feature = "neon"))]
            {
                if _use_vector {
                    let window = &mut buf[_window_range.clone()];
                    neon_deinterlace_median(window, stride);
                    return;
                }
            }
            deinterlace_median(buf, block, stride);
        }
        Deinterlacer::CubicInterpolate => deinterlace_cubic(buf, block, stride),
        Deinterlacer::FfmpegFiveTap => {
            deinterlace_ffmpeg(buf, block, stride, &mut state.line[x..x + 8]);
        }
        Deinterlacer::LowPassFiveTap => {
            let DeinterlaceState { line, second_line } = state;
            deinterlace_lowpass5(
                buf,
                block,
                stride,
                &mut line[x..x + 8],
                &mut second_line[x..x + 8],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    const STRIDE: usize = 24;
    const ROWS: usize = 16;

    fn random_window(rng: &mut impl Rng) -> Vec<u8> {
        (0..STRIDE * ROWS).map(|_| rng.random::<u8>()).collect()
    }

    fn assert_rows_untouched(before: &[u8], after: &[u8], rows: &[usize]) {
        for &row in rows {
            assert_eq!(
                &before[row * STRIDE..(row + 1) * STRIDE],
                &after[row * STRIDE..(row + 1) * STRIDE],
                "row {} must stay untouched",
                row
            );
        }
    }

    #[test]
    fn test_priority() {
        let all = FilterFlags::LINEAR_IPOL_DEINT_FILTER
            | FilterFlags::LINEAR_BLEND_DEINT_FILTER
            | FilterFlags::MEDIAN_DEINT_FILTER
            | FilterFlags::CUBIC_IPOL_DEINT_FILTER
            | FilterFlags::FFMPEG_DEINT_FILTER
            | FilterFlags::LOWPASS5_DEINT_FILTER;
        assert_eq!(
            Deinterlacer::from_flags(all),
            Some(Deinterlacer::LinearInterpolate)
        );
        assert_eq!(
            Deinterlacer::from_flags(FilterFlags::FFMPEG_DEINT_FILTER | FilterFlags::CUBIC_IPOL_DEINT_FILTER),
            Some(Deinterlacer::CubicInterpolate)
        );
        assert_eq!(
            Deinterlacer::from_flags(FilterFlags::V_DEBLOCK | FilterFlags::DERING),
            None
        );
    }

    #[test]
    fn test_linear_interpolation() {
        let mut rng = rand::rng();
        let mut buf = random_window(&mut rng);
        let before = buf.clone();
        deinterlace_linear(&mut buf, 0, STRIDE);
        for row in [5usize, 7, 9, 11] {
            for x in 0..8 {
                let expected =
                    (before[(row - 1) * STRIDE + x] as u32 + before[(row + 1) * STRIDE + x] as u32 + 1) >> 1;
                assert_eq!(buf[row * STRIDE + x] as u32, expected);
            }
            assert_eq!(
                &buf[row * STRIDE + 8..(row + 1) * STRIDE],
                &before[row * STRIDE + 8..(row + 1) * STRIDE]
            );
        }
        assert_rows_untouched(&before, &buf, &[0, 1, 2, 3, 4, 6, 8, 10, 12, 13, 14, 15]);
    }

    #[test]
    fn test_cubic_interpolation() {
        let mut buf = vec![0u8; STRIDE * ROWS];
        for row in 0..ROWS {
            for x in 0..8 {
                buf[row * STRIDE + x] = (row * 10) as u8;
            }
        }
        let before = buf.clone();
        deinterlace_cubic(&mut buf, 0, STRIDE);
        // a linear ramp is reproduced exactly
        assert_eq!(buf, before);

        let mut buf = vec![100u8; STRIDE * ROWS];
        for x in 0..8 {
            buf[7 * STRIDE + x] = 0;
            buf[9 * STRIDE + x] = 0;
        }
        deinterlace_cubic(&mut buf, 0, STRIDE);
        // (-100 - 100) >> 4 saturates to zero, (-100 + 900) >> 4 = 50
        assert_eq!(buf[8 * STRIDE], 0);
        assert_eq!(buf[6 * STRIDE], 50);
        assert_eq!(buf[10 * STRIDE], 50);
        assert_eq!(buf[12 * STRIDE], 106);
    }

    #[test]
    fn test_blend_threads_state() {
        let mut buf = vec![0u8; STRIDE * ROWS];
        for row in 0..ROWS {
            for x in 0..8 {
                buf[row * STRIDE + x] = if row % 2 == 0 { 200 } else { 0 };
            }
        }
        let mut tmp = [0u8; 8];
        deinterlace_blend(&mut buf, 0, STRIDE, &mut tmp);
        // even rows (200 over 0 and 0) -> 100, odd rows (0 over 200 and 200) -> 100
        for row in 4..12 {
            assert_eq!(buf[row * STRIDE], 100, "row {}", row);
        }
        assert_eq!(tmp, [0u8; 8]);
        assert_eq!(buf[12 * STRIDE], 200);
    }

    #[test]
    fn test_median_removes_combing() {
        let mut buf = vec![50u8; STRIDE * ROWS];
        for x in 0..8 {
            buf[7 * STRIDE + x] = 250;
        }
        deinterlace_median(&mut buf, 0, STRIDE);
        assert!(buf.iter().all(|&v| v == 50));
    }

    #[test]
    fn test_ffmpeg_constant_identity() {
        let mut buf = vec![77u8; STRIDE * ROWS];
        let mut tmp = [77u8; 8];
        deinterlace_ffmpeg(&mut buf, 0, STRIDE, &mut tmp);
        assert!(buf.iter().all(|&v| v == 77));
        assert_eq!(tmp, [77u8; 8]);
    }

    #[test]
    fn test_ffmpeg_carries_last_odd_row() {
        let mut rng = rand::rng();
        let mut buf = random_window(&mut rng);
        let before = buf.clone();
        let mut tmp = [0u8; 8];
        deinterlace_ffmpeg(&mut buf, 0, STRIDE, &mut tmp);
        assert_eq!(&tmp[..], &before[11 * STRIDE..11 * STRIDE + 8]);
        assert_rows_untouched(&before, &buf, &[0, 1, 2, 3, 4, 6, 8, 10, 12, 13, 14, 15]);
        let x = 3;
        let p = |row: usize| before[row * STRIDE + x] as i32;
        let expected = (-p(5) + 4 * p(6) + 2 * p(7) + 4 * p(8) - p(9) + 4) >> 3;
        assert_eq!(buf[7 * STRIDE + x], expected.clamp(0, 255) as u8);
    }

    #[test]
    fn test_lowpass5_constant_identity_and_state() {
        let mut buf = vec![33u8; STRIDE * ROWS];
        let mut tmp = [33u8; 8];
        let mut tmp2 = [33u8; 8];
        deinterlace_lowpass5(&mut buf, 0, STRIDE, &mut tmp, &mut tmp2);
        assert!(buf.iter().all(|&v| v == 33));

        let mut rng = rand::rng();
        let mut buf = random_window(&mut rng);
        let before = buf.clone();
        deinterlace_lowpass5(&mut buf, 0, STRIDE, &mut tmp, &mut tmp2);
        assert_eq!(&tmp[..], &before[10 * STRIDE..10 * STRIDE + 8]);
        assert_eq!(&tmp2[..], &before[11 * STRIDE..11 * STRIDE + 8]);
        let x = 5;
        let p = |row: usize| before[row * STRIDE + x] as i32;
        let expected = (-(p(7) + p(11)) + 2 * (p(8) + p(10)) + 6 * p(9) + 4) >> 3;
        assert_eq!(buf[9 * STRIDE + x], expected.clamp(0, 255) as u8);
        assert_rows_untouched(&before, &buf, &[0, 1, 2, 3, 12, 13, 14, 15]);
    }

    #[test]
    fn test_forced_vector_variant_is_safe_on_any_cpu() {
        let mut rng = rand::rng();
        for kind in [
            Deinterlacer::LinearInterpolate,
            Deinterlacer::LinearBlend,
            Deinterlacer::Median,
        ] {
            let buf = random_window(&mut rng);
            let mut generic = buf.clone();
            let mut forced = buf.clone();
            let mut generic_state = DeinterlaceState::new(16);
            let mut forced_state = DeinterlaceState::new(16);
            deinterlace_block(
                kind,
                &mut generic,
                8,
                STRIDE,
                &mut generic_state,
                8,
                KernelVariant::Generic,
            );
            deinterlace_block(
                kind,
                &mut forced,
                8,
                STRIDE,
                &mut forced_state,
                8,
                KernelVariant::VectorOptimized,
            );
            assert_eq!(generic, forced, "{:?}", kind);
            assert_eq!(generic_state.line, forced_state.line);
        }
    }

    #[test]
    fn test_vector_kernels_match_generic() {
        let variant = KernelVariant::detect(crate::yuv_support::ContextFlags::CPU_CAPS_AUTO);
        let mut rng = rand::rng();
        for kind in [
            Deinterlacer::LinearInterpolate,
            Deinterlacer::LinearBlend,
            Deinterlacer::Median,
        ] {
            for _ in 0..200 {
                let buf = random_window(&mut rng);
                let mut generic = buf.clone();
                let mut vector = buf.clone();
                let mut generic_state = DeinterlaceState::new(16);
                let seed: Vec<u8> = (0..8).map(|_| rng.random::<u8>()).collect();
                generic_state.line[8..16].copy_from_slice(&seed);
                let mut vector_state = generic_state.clone();
                deinterlace_block(
                    kind,
                    &mut generic,
                    8,
                    STRIDE,
                    &mut generic_state,
                    8,
                    KernelVariant::Generic,
                );
                deinterlace_block(kind, &mut vector, 8, STRIDE, &mut vector_state, 8, variant);
                assert_eq!(generic, vector, "{:?}", kind);
                assert_eq!(generic_state.line, vector_state.line);
            }
        }
    }
}
