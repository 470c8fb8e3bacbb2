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
use crate::classify::{classify, BlockClass, DeblockParams, EdgeLines, ACCURATE_PAIRS};
use crate::mode::FilterFlags;
use crate::numerics::{clip_pixel, is_near, sign_or_negative};

/// Deblocking algorithm selected for one edge direction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DeblockKind {
    /// Experimental piecewise linear filter.
    X1,
    /// Classification followed by low-pass or edge correction.
    Classified,
    /// Per line classification, see [ACCURATE_PAIRS].
    Accurate,
}

impl DeblockKind {
    /// Filter for horizontal block edges, deblocked along columns.
    pub fn vertical_from(flags: FilterFlags) -> Option<DeblockKind> {
        if flags.contains(FilterFlags::V_X1_FILTER) {
            Some(DeblockKind::X1)
        } else if flags.contains(FilterFlags::V_DEBLOCK) {
            Some(DeblockKind::Classified)
        } else if flags.contains(FilterFlags::V_A_DEBLOCK) {
            Some(DeblockKind::Accurate)
        } else {
            None
        }
    }

    /// Filter for vertical block edges, deblocked along rows.
    pub fn horizontal_from(flags: FilterFlags) -> Option<DeblockKind> {
        if flags.contains(FilterFlags::H_X1_FILTER) {
            Some(DeblockKind::X1)
        } else if flags.contains(FilterFlags::H_DEBLOCK) {
            Some(DeblockKind::Classified)
        } else if flags.contains(FilterFlags::H_A_DEBLOCK) {
            Some(DeblockKind::Accurate)
        } else {
            None
        }
    }
}

#[inline(always)]
fn load_line(buf: &[u8], origin: usize, step: usize) -> [i32; 10] {
    let mut p = [0i32; 10];
    p[0] = buf[origin - step] as i32;
    for (i, dst) in p.iter_mut().skip(1).enumerate() {
        *dst = buf[origin + i * step] as i32;
    }
    p
}

fn low_pass_line(buf: &mut [u8], origin: usize, step: usize, qp: i32) {
    // p[0] is the sample in front of the line, p[9] the one after it.
    let p = load_line(buf, origin, step);
    let first = if (p[0] - p[1]).abs() < qp { p[0] } else { p[1] };
    let last = if (p[9] - p[8]).abs() < qp { p[9] } else { p[8] };
    let x = &p[1..9];

    let mut sums = [0i32; 10];
    sums[0] = 4 * first + x[0] + x[1] + x[2] + 4;
    sums[1] = sums[0] - first + x[3];
    sums[2] = sums[1] - first + x[4];
    sums[3] = sums[2] - first + x[5];
    sums[4] = sums[3] - first + x[6];
    sums[5] = sums[4] - x[0] + x[7];
    sums[6] = sums[5] - x[1] + last;
    sums[7] = sums[6] - x[2] + last;
    sums[8] = sums[7] - x[3] + last;
    sums[9] = sums[8] - x[4] + last;

    for i in 0..8 {
        buf[origin + i * step] = ((sums[i] + sums[i + 2] + 2 * x[i]) >> 4) as u8;
    }
}

fn default_filter_line(buf: &mut [u8], origin: usize, step: usize, qp: i32) {
    let p = load_line(buf, origin, step);
    let x = &p[1..9];
    let middle_energy = 5 * (x[4] - x[3]) + 2 * (x[2] - x[5]);
    if middle_energy.abs() >= 8 * qp {
        return;
    }
    let q = (x[3] - x[4]) / 2;
    let left_energy = 5 * (x[2] - x[1]) + 2 * (x[0] - x[3]);
    let right_energy = 5 * (x[6] - x[5]) + 2 * (x[4] - x[7]);

    let mut d = (middle_energy.abs() - left_energy.abs().min(right_energy.abs())).max(0);
    d = (5 * d + 32) >> 6;
    d *= sign_or_negative(-middle_energy);

    d = if q > 0 { d.clamp(0, q) } else { d.clamp(q, 0) };

    buf[origin + 3 * step] = clip_pixel(x[3] - d);
    buf[origin + 4 * step] = clip_pixel(x[4] + d);
}

fn x1_line(buf: &mut [u8], origin: usize, step: usize, qp: i32) {
    let at = |i: usize| origin + i * step;
    let a = buf[at(2)] as i32 - buf[at(3)] as i32;
    let b = buf[at(3)] as i32 - buf[at(4)] as i32;
    let c = buf[at(4)] as i32 - buf[at(5)] as i32;

    let d = (b.abs() - ((a.abs() + c.abs()) >> 1)).max(0);
    if d >= 2 * qp {
        return;
    }
    let v = d * sign_or_negative(-b);
    const UPDATES: [(usize, i32, i32); 6] = [(1, 1, 3), (2, 1, 2), (3, 3, 3), (4, -3, 3), (5, -1, 2), (6, -1, 3)];
    for (index, weight, shift) in UPDATES {
        let delta = if weight < 0 {
            -((-weight * v) >> shift)
        } else {
            (weight * v) >> shift
        };
        buf[at(index)] = clip_pixel(buf[at(index)] as i32 + delta);
    }
}

fn accurate_line(buf: &mut [u8], origin: usize, step: usize, params: &DeblockParams) {
    let p = load_line(buf, origin, step);
    let dc_offset = params.dc_offset();
    let num_eq = (0..ACCURATE_PAIRS)
        .filter(|&i| is_near(p[i], p[i + 1], dc_offset))
        .count() as i32;
    if num_eq > params.flatness_threshold {
        // Flat lines spanning more than 2 * QP are real gradients.
        let x = &p[1..9];
        let max = x.iter().copied().max().unwrap_or(0);
        let min = x.iter().copied().min().unwrap_or(0);
        if max - min < 2 * params.qp {
            low_pass_line(buf, origin, step, params.qp);
        }
    } else {
        default_filter_line(buf, origin, step, params.qp);
    }
}

/// 9-tap `(1,1,2,2,4,2,2,1,1)/16` smoothing of all eight lines.
///
/// Samples outside the lines replace the outermost ones when they differ by less than `qp`.
pub fn low_pass(buf: &mut [u8], lines: EdgeLines, qp: i32) {
    for l in 0..8 {
        low_pass_line(buf, lines.line(l), lines.step, qp);
    }
}

/// Moves `p[3]` and `p[4]` towards each other, never past their midpoint.
pub fn default_filter(buf: &mut [u8], lines: EdgeLines, qp: i32) {
    for l in 0..8 {
        default_filter_line(buf, lines.line(l), lines.step, qp);
    }
}

/// Spreads the step between `p[3]` and `p[4]` over `p[1]..=p[6]` with
/// `1/8, 1/4, 3/8` weights, when the step is small relative to `qp`.
pub fn x1_filter(buf: &mut [u8], lines: EdgeLines, qp: i32) {
    for l in 0..8 {
        x1_line(buf, lines.line(l), lines.step, qp);
    }
}

/// Classifies and filters each line on its own.
pub fn accurate_deblock(buf: &mut [u8], lines: EdgeLines, params: &DeblockParams) {
    for l in 0..8 {
        accurate_line(buf, lines.line(l), lines.step, params);
    }
}

/// Deblocks one edge with the selected algorithm.
pub fn deblock_edge(buf: &mut [u8], lines: EdgeLines, params: &DeblockParams, kind: DeblockKind) {
    match kind {
        DeblockKind::X1 => x1_filter(buf, lines, params.qp),
        DeblockKind::Classified => match classify(buf, lines, params) {
            BlockClass::LowPass => low_pass(buf, lines, params.qp),
            BlockClass::EdgeFilter => default_filter(buf, lines, params.qp),
            BlockClass::Skip => {}
        },
        DeblockKind::Accurate => accurate_deblock(buf, lines, params),
    }
}
