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
use crate::sse::sse_support::{
    _mm_avg_floor_epu8, _mm_load_block_row, _mm_median3_epu8, _mm_store_block_row,
};
#[cfg(target_arch = "x86")]
use std::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

// `window` starts at row 4 of the block and spans 9 rows of 8 samples.

#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn sse_deinterlace_linear(window: &mut [u8], stride: usize) {
    for k in [1usize, 3, 5, 7] {
        let above = _mm_load_block_row(window, (k - 1) * stride);
        let below = _mm_load_block_row(window, (k + 1) * stride);
        _mm_store_block_row(window, k * stride, _mm_avg_epu8(above, below));
    }
}

#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn sse_deinterlace_blend(window: &mut [u8], stride: usize, tmp: &mut [u8]) {
    let mut previous = _mm_load_block_row(tmp, 0);
    let mut current = _mm_load_block_row(window, 0);
    for k in 0..8 {
        let next = _mm_load_block_row(window, (k + 1) * stride);
        let blended = _mm_avg_epu8(current, _mm_avg_floor_epu8(previous, next));
        _mm_store_block_row(window, k * stride, blended);
        previous = current;
        current = next;
    }
    _mm_store_block_row(tmp, 0, previous);
}

#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn sse_deinterlace_median(window: &mut [u8], stride: usize) {
    for k in [1usize, 3, 5, 7] {
        let above = _mm_load_block_row(window, (k - 1) * stride);
        let current = _mm_load_block_row(window, k * stride);
        let below = _mm_load_block_row(window, (k + 1) * stride);
        _mm_store_block_row(window, k * stride, _mm_median3_epu8(above, current, below));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_avg_floor_matches_scalar() {
        if !std::arch::is_x86_feature_detected!("sse4.1") {
            return;
        }
        let mut rng = rand::rng();
        for _ in 0..1000 {
            let a: Vec<u8> = (0..8).map(|_| rng.random::<u8>()).collect();
            let b: Vec<u8> = (0..8).map(|_| rng.random::<u8>()).collect();
            let mut out = [0u8; 8];
            unsafe {
                let va = _mm_load_block_row(&a, 0);
                let vb = _mm_load_block_row(&b, 0);
                _mm_store_block_row(&mut out, 0, _mm_avg_floor_epu8(va, vb));
            }
            for i in 0..8 {
                assert_eq!(out[i] as u32, (a[i] as u32 + b[i] as u32) >> 1);
            }
        }
    }
}
