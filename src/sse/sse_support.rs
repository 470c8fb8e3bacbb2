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
#[cfg(target_arch = "x86")]
use std::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

/// Loads the 8 samples of one block row into the low half of a register.
#[inline]
#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn _mm_load_block_row(window: &[u8], offset: usize) -> __m128i {
    _mm_loadl_epi64(window[offset..offset + 8].as_ptr() as *const __m128i)
}

#[inline]
#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn _mm_store_block_row(window: &mut [u8], offset: usize, v: __m128i) {
    _mm_storel_epi64(window[offset..offset + 8].as_mut_ptr() as *mut __m128i, v);
}

/// Rounded down unsigned byte average, `_mm_avg_epu8` rounds up.
#[inline]
#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn _mm_avg_floor_epu8(a: __m128i, b: __m128i) -> __m128i {
    let odd = _mm_and_si128(_mm_xor_si128(a, b), _mm_set1_epi8(1));
    _mm_sub_epi8(_mm_avg_epu8(a, b), odd)
}

#[inline]
#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn _mm_median3_epu8(a: __m128i, b: __m128i, c: __m128i) -> __m128i {
    _mm_max_epu8(_mm_min_epu8(a, b), _mm_min_epu8(_mm_max_epu8(a, b), c))
}
