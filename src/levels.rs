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
use crate::mode::PostProcessMode;
use crate::numerics::clip_pixel;

/// Luminance histogram accumulated over all processed frames.
#[derive(Debug, Clone)]
pub struct LuminanceHistogram {
    bins: [u64; 256],
}

impl LuminanceHistogram {
    /// Flat distribution every bin starts with.
    pub fn seed(width: usize, height: usize) -> u64 {
        (width * height / 64 * 15 / 256) as u64
    }

    pub fn new(width: usize, height: usize) -> LuminanceHistogram {
        LuminanceHistogram {
            bins: [Self::seed(width, height); 256],
        }
    }

    #[inline]
    pub fn record(&mut self, value: u8) {
        self.bins[value as usize] += 1;
    }

    /// Restores the black bin, the very first decoded frame is usually black.
    pub fn reseed_black(&mut self, width: usize, height: usize) {
        self.bins[0] = Self::seed(width, height);
    }

    pub fn bins(&self) -> &[u64; 256] {
        &self.bins
    }

    pub fn total(&self) -> u64 {
        self.bins.iter().sum()
    }

    /// Black and white points leaving at most `max_clipped` of the mass outside.
    pub fn clip_points(&self, max_clipped: f64) -> (i32, i32) {
        let sum = self.total();
        let max_clipped = (sum as f64 * max_clipped) as u64;

        let mut clipped = sum;
        let mut black = 255i32;
        while black > 0 {
            if clipped < max_clipped {
                break;
            }
            clipped = clipped.saturating_sub(self.bins[black as usize]);
            black -= 1;
        }

        let mut clipped = sum;
        let mut white = 0i32;
        while white < 256 {
            if clipped < max_clipped {
                break;
            }
            clipped = clipped.saturating_sub(self.bins[white as usize]);
            white += 1;
        }
        (black, white)
    }
}

/// Brightness correction of one luma plane and the matching QP scale.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LevelCorrection {
    pub black: i32,
    pub white: i32,
    pub scale: f64,
    enabled: bool,
    /// Scale in 8.8 fixed point.
    packed_scale: u16,
    offset: i32,
    /// QP multiplier in 16.16 fixed point.
    qp_correction: i64,
}

impl Default for LevelCorrection {
    fn default() -> Self {
        LevelCorrection::identity()
    }
}

impl LevelCorrection {
    pub const fn identity() -> LevelCorrection {
        LevelCorrection {
            black: 0,
            white: 255,
            scale: 1.0,
            enabled: false,
            packed_scale: 256,
            offset: 0,
            qp_correction: 1 << 16,
        }
    }

    /// Derives the stretch of `[black, white]` onto the allowed luma range.
    ///
    /// When `level_fix` is off samples are copied as is, the clip points are still reported.
    pub fn from_histogram(
        histogram: &LuminanceHistogram,
        mode: &PostProcessMode,
        level_fix: bool,
    ) -> LevelCorrection {
        let (black, white) = histogram.clip_points(mode.max_clipped_threshold);
        let range = (white - black).max(1);
        let scale = (mode.max_allowed_y - mode.min_allowed_y) as f64 / range as f64;
        if !level_fix {
            return LevelCorrection {
                black,
                white,
                scale,
                ..LevelCorrection::identity()
            };
        }
        let packed_scale = (scale * 256.0 + 0.5) as u16;
        let offset = ((black * packed_scale as i32) >> 8) - mode.min_allowed_y;
        LevelCorrection {
            black,
            white,
            scale,
            enabled: true,
            packed_scale,
            offset,
            qp_correction: (scale * 65536.0 + 0.5) as i64,
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn apply(&self, value: u8) -> u8 {
        let stretched = ((value as i64 * 257 * self.packed_scale as i64) >> 16) - self.offset as i64;
        clip_pixel(stretched)
    }

    /// Scales a quantizer with the contrast stretch.
    #[inline]
    pub fn correct_qp(&self, qp: i32) -> i32 {
        ((qp as i64 * self.qp_correction + (1 << 15)) >> 16) as i32
    }

    pub fn copy_row(&self, src: &[u8], dst: &mut [u8]) {
        if !self.enabled {
            dst.copy_from_slice(src);
            return;
        }
        for (dst, &src) in dst.iter_mut().zip(src.iter()) {
            *dst = self.apply(src);
        }
    }
}
