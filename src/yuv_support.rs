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
use crate::pp_error::PostProcessError;
use std::ops::BitOr;

/// Declares how chroma planes are subsampled relative to luma.
///
/// Shifts are applied as `luma >> shift`, odd dimensions are truncated.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum ChromaSubsampling {
    #[default]
    Yuv420 = 0,
    Yuv422 = 1,
    Yuv411 = 2,
    Yuv444 = 3,
    Yuv440 = 4,
}

impl TryFrom<u8> for ChromaSubsampling {
    type Error = PostProcessError;

    #[inline]
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ChromaSubsampling::Yuv420),
            1 => Ok(ChromaSubsampling::Yuv422),
            2 => Ok(ChromaSubsampling::Yuv411),
            3 => Ok(ChromaSubsampling::Yuv444),
            4 => Ok(ChromaSubsampling::Yuv440),
            _ => Err(PostProcessError::UnknownChromaSubsampling(value)),
        }
    }
}

impl ChromaSubsampling {
    #[inline]
    pub const fn h_shift(self) -> u32 {
        match self {
            ChromaSubsampling::Yuv420 | ChromaSubsampling::Yuv422 => 1,
            ChromaSubsampling::Yuv411 => 2,
            ChromaSubsampling::Yuv444 | ChromaSubsampling::Yuv440 => 0,
        }
    }

    #[inline]
    pub const fn v_shift(self) -> u32 {
        match self {
            ChromaSubsampling::Yuv420 | ChromaSubsampling::Yuv440 => 1,
            ChromaSubsampling::Yuv422 | ChromaSubsampling::Yuv411 | ChromaSubsampling::Yuv444 => 0,
        }
    }

    /// Maps raw horizontal/vertical shifts back to a known layout.
    pub const fn from_shifts(h_shift: u32, v_shift: u32) -> Option<ChromaSubsampling> {
        match (h_shift, v_shift) {
            (1, 1) => Some(ChromaSubsampling::Yuv420),
            (1, 0) => Some(ChromaSubsampling::Yuv422),
            (2, 0) => Some(ChromaSubsampling::Yuv411),
            (0, 0) => Some(ChromaSubsampling::Yuv444),
            (0, 1) => Some(ChromaSubsampling::Yuv440),
            _ => None,
        }
    }

    /// Chroma plane dimensions for a luma plane of `width`x`height`.
    #[inline]
    pub const fn chroma_size(self, width: u32, height: u32) -> (u32, u32) {
        (width >> self.h_shift(), height >> self.v_shift())
    }
}

/// Creation flags of a [crate::PostProcessContext].
///
/// Bit layout is compatible with the classic libpostproc integer flags:
/// CPU capability bits in the high half, an explicit chroma format in the low byte.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct ContextFlags(u32);

impl ContextFlags {
    pub const CPU_CAPS_MMX: ContextFlags = ContextFlags(0x8000_0000);
    pub const CPU_CAPS_MMX2: ContextFlags = ContextFlags(0x2000_0000);
    pub const CPU_CAPS_3DNOW: ContextFlags = ContextFlags(0x4000_0000);
    pub const CPU_CAPS_ALTIVEC: ContextFlags = ContextFlags(0x1000_0000);
    pub const CPU_CAPS_AUTO: ContextFlags = ContextFlags(0x0008_0000);
    pub const FORMAT: ContextFlags = ContextFlags(0x0000_0008);
    pub const FORMAT_420: ContextFlags = ContextFlags(0x0000_0011 | 0x8);
    pub const FORMAT_422: ContextFlags = ContextFlags(0x0000_0001 | 0x8);
    pub const FORMAT_411: ContextFlags = ContextFlags(0x0000_0002 | 0x8);
    pub const FORMAT_444: ContextFlags = ContextFlags(0x0000_0000 | 0x8);
    pub const FORMAT_440: ContextFlags = ContextFlags(0x0000_0010 | 0x8);

    const CPU_CAPS_ANY: u32 = 0x8000_0000 | 0x2000_0000 | 0x4000_0000 | 0x1000_0000 | 0x0008_0000;

    #[inline]
    pub const fn empty() -> ContextFlags {
        ContextFlags(0)
    }

    #[inline]
    pub const fn from_bits(bits: u32) -> ContextFlags {
        ContextFlags(bits)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: ContextFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true when the caller allows any vector optimized kernels.
    #[inline]
    pub const fn requests_vector_kernels(self) -> bool {
        self.0 & Self::CPU_CAPS_ANY != 0
    }

    /// Chroma layout; 4:2:0 unless [ContextFlags::FORMAT] is set.
    ///
    /// Unknown shift combinations fall back to 4:2:0.
    pub fn subsampling(self) -> ChromaSubsampling {
        if self.0 & Self::FORMAT.0 == 0 {
            return ChromaSubsampling::Yuv420;
        }
        let h_shift = self.0 & 0x3;
        let v_shift = (self.0 >> 4) & 0x3;
        ChromaSubsampling::from_shifts(h_shift, v_shift).unwrap_or(ChromaSubsampling::Yuv420)
    }
}

impl BitOr for ContextFlags {
    type Output = ContextFlags;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        ContextFlags(self.0 | rhs.0)
    }
}

impl From<ChromaSubsampling> for ContextFlags {
    fn from(value: ChromaSubsampling) -> Self {
        match value {
            ChromaSubsampling::Yuv420 => ContextFlags::FORMAT_420,
            ChromaSubsampling::Yuv422 => ContextFlags::FORMAT_422,
            ChromaSubsampling::Yuv411 => ContextFlags::FORMAT_411,
            ChromaSubsampling::Yuv444 => ContextFlags::FORMAT_444,
            ChromaSubsampling::Yuv440 => ContextFlags::FORMAT_440,
        }
    }
}

/// Picture type flags passed along with every frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct PictureType(u32);

impl PictureType {
    /// QP values are stored with doubled precision.
    pub const QP2: PictureType = PictureType(0x10);
    pub const I: PictureType = PictureType(1);
    pub const P: PictureType = PictureType(2);
    pub const B: PictureType = PictureType(3);

    #[inline]
    pub const fn from_bits(bits: u32) -> PictureType {
        PictureType(bits)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_b_frame(self) -> bool {
        self.0 & 7 == 3
    }

    #[inline]
    pub const fn has_double_scale_qp(self) -> bool {
        self.0 & Self::QP2.0 != 0
    }
}

impl BitOr for PictureType {
    type Output = PictureType;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        PictureType(self.0 | rhs.0)
    }
}

/// Kernel family used for filters that have vector implementations.
///
/// Both families are numerically identical, vector kernels only change speed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum KernelVariant {
    #[default]
    Generic,
    VectorOptimized,
}

impl KernelVariant {
    /// Picks the best variant the running CPU supports, limited by the caller flags.
    pub fn detect(flags: ContextFlags) -> KernelVariant {
        #[allow(unused_mut)]
        let mut variant = KernelVariant::Generic;
        if !flags.requests_vector_kernels() {
            return variant;
        }
        #[cfg(all(any(target_arch = "x86", target_arch = "x86_64"), feature = "sse"))]
        {
            if std::arch::is_x86_feature_detected!("sse4.1") {
                variant = KernelVariant::VectorOptimized;
            }
        }
        #[cfg(all(target_arch = "aarch64", target_feature = "neon"))]
        {
            variant = KernelVariant::VectorOptimized;
        }
        variant
    }

    /// Downgrades vector kernels the running CPU lacks to generic ones.
    #[inline]
    pub fn supported(self) -> KernelVariant {
        match self {
            KernelVariant::VectorOptimized => KernelVariant::detect(ContextFlags::CPU_CAPS_AUTO),
            KernelVariant::Generic => KernelVariant::Generic,
        }
    }
}

/// Diagnostic output level of a context.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub enum Verbosity {
    #[default]
    Quiet,
    /// Dumps effective QP tables for every frame at trace level.
    Verbose,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subsampling_try_from_u8() {
        for sampling in [
            ChromaSubsampling::Yuv420,
            ChromaSubsampling::Yuv422,
            ChromaSubsampling::Yuv411,
            ChromaSubsampling::Yuv444,
            ChromaSubsampling::Yuv440,
        ] {
            assert_eq!(ChromaSubsampling::try_from(sampling as u8), Ok(sampling));
        }
        for value in 5..=u8::MAX {
            assert_eq!(
                ChromaSubsampling::try_from(value),
                Err(PostProcessError::UnknownChromaSubsampling(value))
            );
        }
    }

    #[test]
    fn test_subsampling_from_flags() {
        assert_eq!(ContextFlags::empty().subsampling(), ChromaSubsampling::Yuv420);
        assert_eq!(
            ContextFlags::FORMAT_422.subsampling(),
            ChromaSubsampling::Yuv422
        );
        assert_eq!(
            ContextFlags::FORMAT_411.subsampling(),
            ChromaSubsampling::Yuv411
        );
        assert_eq!(
            ContextFlags::FORMAT_444.subsampling(),
            ChromaSubsampling::Yuv444
        );
        assert_eq!(
            ContextFlags::FORMAT_440.subsampling(),
            ChromaSubsampling::Yuv440
        );
        assert_eq!(
            (ContextFlags::CPU_CAPS_MMX | ContextFlags::FORMAT_420).subsampling(),
            ChromaSubsampling::Yuv420
        );
    }

    #[test]
    fn test_subsampling_round_trip_through_flags() {
        for value in 0u8..5 {
            let sampling = ChromaSubsampling::try_from(value).unwrap();
            assert_eq!(ContextFlags::from(sampling).subsampling(), sampling);
        }
    }

    #[test]
    fn test_chroma_size_truncates() {
        assert_eq!(ChromaSubsampling::Yuv420.chroma_size(33, 17), (16, 8));
        assert_eq!(ChromaSubsampling::Yuv411.chroma_size(33, 17), (8, 17));
        assert_eq!(ChromaSubsampling::Yuv440.chroma_size(33, 17), (33, 8));
    }

    #[test]
    fn test_picture_type() {
        assert!(PictureType::B.is_b_frame());
        assert!((PictureType::B | PictureType::QP2).is_b_frame());
        assert!(!PictureType::P.is_b_frame());
        assert!((PictureType::I | PictureType::QP2).has_double_scale_qp());
        assert!(!PictureType::I.has_double_scale_qp());
    }

    #[test]
    fn test_generic_without_caps() {
        assert_eq!(
            KernelVariant::detect(ContextFlags::FORMAT_420),
            KernelVariant::Generic
        );
    }
}
