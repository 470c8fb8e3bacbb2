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
use crate::numerics::is_near;

/// Adjacent sample pairs per line counted by the block classifier.
pub const CLASSIFY_PAIRS: usize = 7;
/// Adjacent sample pairs per line counted by the accurate deblocker.
///
/// The accurate filter also looks across both block boundaries while
/// sharing the flatness threshold tuned for [CLASSIFY_PAIRS].
pub const ACCURATE_PAIRS: usize = 9;

/// Eight parallel 1-D lines crossing one block edge.
///
/// `origin` addresses sample `p[0]` of the first line, the edge lies between
/// `p[3]` and `p[4]`. Filters read `p[-1]..=p[8]`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EdgeLines {
    pub origin: usize,
    /// Distance between consecutive samples of one line.
    pub step: usize,
    /// Distance between the first samples of two neighbouring lines.
    pub advance: usize,
}

impl EdgeLines {
    /// Lines crossing the horizontal edge under the block at `block`.
    #[inline]
    pub const fn vertical(block: usize, stride: usize) -> EdgeLines {
        EdgeLines {
            origin: block + 4 * stride,
            step: stride,
            advance: 1,
        }
    }

    /// Lines crossing the vertical edge left of the block at `block`.
    ///
    /// `block` must be at least 5 samples away from the row start.
    #[inline]
    pub const fn horizontal(block: usize, stride: usize) -> EdgeLines {
        EdgeLines {
            origin: block - 4,
            step: 1,
            advance: stride,
        }
    }

    #[inline(always)]
    pub(crate) const fn line(&self, index: usize) -> usize {
        self.origin + index * self.advance
    }
}

/// Quantizer state of the block being filtered.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DeblockParams {
    pub qp: i32,
    /// QP of the last non-B frame, drives flatness detection.
    pub non_b_qp: i32,
    pub base_dc_diff: i32,
    pub flatness_threshold: i32,
}

impl DeblockParams {
    pub fn new(qp: i32, non_b_qp: i32, mode: &PostProcessMode) -> DeblockParams {
        DeblockParams {
            qp,
            non_b_qp,
            base_dc_diff: mode.base_dc_diff,
            flatness_threshold: mode.flatness_threshold,
        }
    }

    /// Largest difference two samples may have to count as equal.
    #[inline(always)]
    pub const fn dc_offset(&self) -> i32 {
        ((self.non_b_qp * self.base_dc_diff) >> 8) + 1
    }
}

/// Filtering decision for one block edge.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BlockClass {
    /// Not flat, left untouched.
    Skip,
    /// Flat and within `2 * QP` range, smoothed with the 9-tap low-pass.
    LowPass,
    /// Flat but a sample pair exceeds `2 * QP`, gets the edge preserving correction.
    EdgeFilter,
}

impl BlockClass {
    /// Legacy integer encoding, `1` low-pass, `0` edge filter, `2` skip.
    #[inline]
    pub const fn code(self) -> u8 {
        match self {
            BlockClass::LowPass => 1,
            BlockClass::EdgeFilter => 0,
            BlockClass::Skip => 2,
        }
    }
}

/// Counts near-equal adjacent pairs `(p[i], p[i + 1])` for `i in 0..7` over all lines.
pub fn count_flat_pairs(buf: &[u8], lines: EdgeLines, dc_offset: i32) -> i32 {
    let mut num_eq = 0;
    for l in 0..8 {
        let origin = lines.line(l);
        for i in 0..CLASSIFY_PAIRS {
            let a = buf[origin + i * lines.step] as i32;
            let b = buf[origin + (i + 1) * lines.step] as i32;
            if is_near(a, b, dc_offset) {
                num_eq += 1;
            }
        }
    }
    num_eq
}

#[inline]
pub fn is_flat(buf: &[u8], lines: EdgeLines, params: &DeblockParams) -> bool {
    count_flat_pairs(buf, lines, params.dc_offset()) > params.flatness_threshold
}

/// Sparse range check, every line compares one distant sample pair.
///
/// Lines `4k + j` compare `p[2j]` against `p[(2j + 5) % 8]`.
pub fn is_min_max_ok(buf: &[u8], lines: EdgeLines, qp: i32) -> bool {
    const PAIRS: [(usize, usize); 4] = [(0, 5), (2, 7), (4, 1), (6, 3)];
    for l in 0..8 {
        let origin = lines.line(l);
        let (i, j) = PAIRS[l & 3];
        let a = buf[origin + i * lines.step] as i32;
        let b = buf[origin + j * lines.step] as i32;
        if (a - b).abs() > 2 * qp {
            return false;
        }
    }
    true
}

/// Decides how the edge described by `lines` must be filtered.
pub fn classify(buf: &[u8], lines: EdgeLines, params: &DeblockParams) -> BlockClass {
    if !is_flat(buf, lines, params) {
        return BlockClass::Skip;
    }
    if is_min_max_ok(buf, lines, params.qp) {
        BlockClass::LowPass
    } else {
        BlockClass::EdgeFilter
    }
}
