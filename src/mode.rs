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
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// Set of filters enabled for one plane kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct FilterFlags(u32);

impl FilterFlags {
    pub const V_DEBLOCK: FilterFlags = FilterFlags(0x01);
    pub const H_DEBLOCK: FilterFlags = FilterFlags(0x02);
    pub const DERING: FilterFlags = FilterFlags(0x04);
    /// Automatic brightness and contrast correction, luma only.
    pub const LEVEL_FIX: FilterFlags = FilterFlags(0x08);
    pub const V_X1_FILTER: FilterFlags = FilterFlags(0x0200);
    pub const V_A_DEBLOCK: FilterFlags = FilterFlags(0x0400);
    pub const H_X1_FILTER: FilterFlags = FilterFlags(0x2000);
    pub const H_A_DEBLOCK: FilterFlags = FilterFlags(0x4000);
    pub const LINEAR_IPOL_DEINT_FILTER: FilterFlags = FilterFlags(0x1_0000);
    pub const LINEAR_BLEND_DEINT_FILTER: FilterFlags = FilterFlags(0x2_0000);
    pub const CUBIC_IPOL_DEINT_FILTER: FilterFlags = FilterFlags(0x4_0000);
    pub const MEDIAN_DEINT_FILTER: FilterFlags = FilterFlags(0x8_0000);
    pub const TEMP_NOISE_FILTER: FilterFlags = FilterFlags(0x10_0000);
    pub const FORCE_QUANT: FilterFlags = FilterFlags(0x20_0000);
    pub const FFMPEG_DEINT_FILTER: FilterFlags = FilterFlags(0x40_0000);
    pub const LOWPASS5_DEINT_FILTER: FilterFlags = FilterFlags(0x80_0000);

    #[inline]
    pub const fn empty() -> FilterFlags {
        FilterFlags(0)
    }

    #[inline]
    pub const fn from_bits(bits: u32) -> FilterFlags {
        FilterFlags(bits)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn contains(self, other: FilterFlags) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    #[inline]
    pub const fn intersects(self, other: FilterFlags) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub fn insert(&mut self, other: FilterFlags) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: FilterFlags) {
        self.0 &= !other.0;
    }
}

impl BitOr for FilterFlags {
    type Output = FilterFlags;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        FilterFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for FilterFlags {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for FilterFlags {
    type Output = FilterFlags;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        FilterFlags(self.0 & rhs.0)
    }
}

impl Not for FilterFlags {
    type Output = FilterFlags;

    #[inline]
    fn not(self) -> Self::Output {
        FilterFlags(!self.0)
    }
}

/// Compiled filter chain.
///
/// Produced by [crate::FilterChainCompiler] and read by every
/// [crate::postprocess] call. Thresholds are shared by luma and chroma.
#[derive(Debug, Clone, PartialEq)]
pub struct PostProcessMode {
    pub luma: FilterFlags,
    pub chroma: FilterFlags,
    /// Base of the per-QP flatness offset, `((non_b_qp * base_dc_diff) >> 8) + 1`.
    pub base_dc_diff: i32,
    /// Amount of near-equal sample pairs a block needs to count as flat.
    pub flatness_threshold: i32,
    /// Ascending energy thresholds of the temporal noise reducer.
    pub max_tmp_noise: [i32; 3],
    pub min_allowed_y: i32,
    pub max_allowed_y: i32,
    /// Fraction of histogram mass clipped at each end by brightness correction.
    pub max_clipped_threshold: f64,
    pub forced_quant: i32,
}

impl Default for PostProcessMode {
    fn default() -> Self {
        PostProcessMode {
            luma: FilterFlags::empty(),
            chroma: FilterFlags::empty(),
            max_tmp_noise: [700, 1500, 3000],
            max_allowed_y: 234,
            min_allowed_y: 16,
            base_dc_diff: 256 / 8,
            flatness_threshold: 56 - 16 - 1,
            max_clipped_threshold: 0.01,
            forced_quant: 0,
        }
    }
}

impl PostProcessMode {
    /// Compiles `name` with the built-in filter and preset tables.
    pub fn from_name_and_quality(
        name: &str,
        quality: i32,
    ) -> Result<PostProcessMode, crate::PostProcessError> {
        crate::FilterChainCompiler::default().compile(name, quality)
    }

    /// Filters active for the plane kind.
    #[inline]
    pub fn flags(&self, is_chroma: bool) -> FilterFlags {
        if is_chroma {
            self.chroma
        } else {
            self.luma
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_operations() {
        let mut flags = FilterFlags::V_DEBLOCK | FilterFlags::DERING;
        assert!(flags.contains(FilterFlags::DERING));
        assert!(!flags.contains(FilterFlags::H_DEBLOCK));
        flags.remove(FilterFlags::DERING);
        assert_eq!(flags, FilterFlags::V_DEBLOCK);
        flags |= FilterFlags::LEVEL_FIX;
        assert_eq!(flags.bits(), 0x09);
        assert!(!FilterFlags::empty().contains(FilterFlags::empty()));
    }

    #[test]
    fn test_default_thresholds() {
        let mode = PostProcessMode::default();
        assert_eq!(mode.base_dc_diff, 32);
        assert_eq!(mode.flatness_threshold, 39);
        assert_eq!(mode.max_tmp_noise, [700, 1500, 3000]);
        assert!(mode.luma.is_empty());
        assert!(mode.chroma.is_empty());
    }
}
