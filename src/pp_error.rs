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
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq)]
pub struct MismatchedSize {
    pub expected: usize,
    pub received: usize,
}

/// Filter chain that failed to compile.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FilterChainRejection {
    /// Unknown names, unconsumed options and substitution overflows together.
    pub errors: usize,
    pub chain: String,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum PostProcessError {
    InvalidFilterChain(FilterChainRejection),
    PointerOverflow,
    ZeroBaseSize,
    PlaneSizeMismatch(MismatchedSize),
    PlaneStrideMismatch(MismatchedSize),
    QpTableSizeMismatch(MismatchedSize),
    UnknownChromaSubsampling(u8),
}

impl Display for PostProcessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PostProcessError::InvalidFilterChain(rejection) => f.write_fmt(format_args!(
                "{} errors in postprocess string \"{}\"",
                rejection.errors, rejection.chain
            )),
            PostProcessError::PointerOverflow => {
                f.write_str("Image size overflow pointer capabilities")
            }
            PostProcessError::ZeroBaseSize => f.write_str("Zero sized images is not supported"),
            PostProcessError::PlaneSizeMismatch(size) => f.write_fmt(format_args!(
                "Plane have invalid size, it must be at least {}, but it was {}",
                size.expected, size.received
            )),
            PostProcessError::PlaneStrideMismatch(size) => f.write_fmt(format_args!(
                "Plane stride must be at least {}, but it was {}",
                size.expected, size.received
            )),
            PostProcessError::QpTableSizeMismatch(size) => f.write_fmt(format_args!(
                "QP table must have at least {} entries, but it has {}",
                size.expected, size.received
            )),
            PostProcessError::UnknownChromaSubsampling(value) => {
                f.write_fmt(format_args!("Unknown chroma subsampling value {}", value))
            }
        }
    }
}

impl Error for PostProcessError {}

#[inline]
pub(crate) fn check_overflow_v2(v0: usize, v1: usize) -> Result<(), PostProcessError> {
    let (_, overflow) = v0.overflowing_mul(v1);
    if overflow {
        return Err(PostProcessError::PointerOverflow);
    }
    Ok(())
}

/// Minimal amount of elements a strided plane of `rows` rows must hold.
#[inline]
pub(crate) fn plane_min_len(stride: usize, width: usize, rows: usize) -> usize {
    if rows == 0 || width == 0 {
        return 0;
    }
    stride * (rows - 1) + width
}

#[inline]
pub(crate) fn check_plane<V>(
    data: &[V],
    stride: u32,
    width: u32,
    height: u32,
) -> Result<(), PostProcessError> {
    check_overflow_v2(stride as usize, height as usize)?;
    if (stride as usize) < (width as usize) {
        return Err(PostProcessError::PlaneStrideMismatch(MismatchedSize {
            expected: width as usize,
            received: stride as usize,
        }));
    }
    let expected = plane_min_len(stride as usize, width as usize, height as usize);
    if data.len() < expected {
        return Err(PostProcessError::PlaneSizeMismatch(MismatchedSize {
            expected,
            received: data.len(),
        }));
    }
    Ok(())
}

#[inline]
pub(crate) fn check_base_size(width: u32, height: u32) -> Result<(), PostProcessError> {
    if width == 0 || height == 0 {
        return Err(PostProcessError::ZeroBaseSize);
    }
    check_overflow_v2(width as usize, height as usize)
}

#[inline]
pub(crate) fn check_qp_table(
    len: usize,
    qp_stride: usize,
    mb_width: usize,
    mb_height: usize,
) -> Result<(), PostProcessError> {
    check_overflow_v2(qp_stride, mb_height)?;
    if qp_stride != 0 && qp_stride < mb_width {
        return Err(PostProcessError::QpTableSizeMismatch(MismatchedSize {
            expected: mb_width,
            received: qp_stride,
        }));
    }
    let expected = if qp_stride == 0 {
        mb_width
    } else {
        plane_min_len(qp_stride, mb_width, mb_height)
    };
    if len < expected {
        return Err(PostProcessError::QpTableSizeMismatch(MismatchedSize {
            expected,
            received: len,
        }));
    }
    Ok(())
}
