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
use std::arch::aarch64::*;

// `window` starts at row 4 of the block and spans 9 rows of 8 samples.

#[inline(always)]
fn load_row(window: &[u8], offset: usize) -> uint8x8_t {
    let row = &window[offset..offset + 8];
    unsafe { vld1_u8(row.as_ptr()) }
}

#[inline(always)]
fn store_row(window: &mut [u8], offset: usize, v: uint8x8_t) {
    let row = &mut window[offset..offset + 8];
    unsafe { vst1_u8(row.as_mut_ptr(), v) }
}

pub(crate) fn neon_deinterlace_linear(window: &mut [u8], stride: usize) {
    unsafe {
        for k in [1usize, 3, 5, 7] {
            let above = load_row(window, (k - 1) * stride);
            let below = load_row(window, (k + 1) * stride);
            store_row(window, k * stride, vrhadd_u8(above, below));
        }
    }
}

pub(crate) fn neon_deinterlace_blend(window: &mut [u8], stride: usize, tmp: &mut [u8]) {
    unsafe {
        let mut previous = load_row(tmp, 0);
        let mut current = load_row(window, 0);
        for k in 0..8 {
            let next = load_row(window, (k + 1) * stride);
            let blended = vrhadd_u8(current, vhadd_u8(previous, next));
            store_row(window, k * stride, blended);
            previous = current;
            current = next;
        }
        store_row(tmp, 0, previous);
    }
}

pub(crate) fn neon_deinterlace_median(window: &mut [u8], stride: usize) {
    unsafe {
        for k in [1usize, 3, 5, 7] {
            let a = load_row(window, (k - 1) * stride);
            let b = load_row(window, k * stride);
            let c = load_row(window, (k + 1) * stride);
            let median = vmax_u8(vmin_u8(a, b), vmin_u8(vmax_u8(a, b), c));
            store_row(window, k * stride, median);
        }
    }
}
