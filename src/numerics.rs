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
use num_traits::AsPrimitive;

#[inline(always)]
/// Byte average rounded up, `(a + b + 1) >> 1` without widening
pub(crate) fn average_u8(a: u8, b: u8) -> u8 {
    (a | b) - ((a ^ b) >> 1)
}

#[inline(always)]
/// Byte average rounded down, `(a + b) >> 1` without widening
pub(crate) fn average_u8_floor(a: u8, b: u8) -> u8 {
    (a & b) + ((a ^ b) >> 1)
}

#[inline(always)]
/// Saturates any integer into the 8-bit pixel range
pub(crate) fn clip_pixel<V: AsPrimitive<i64>>(v: V) -> u8 {
    v.as_().clamp(0, 255) as u8
}

#[inline(always)]
pub(crate) fn median3_u8(a: u8, b: u8, c: u8) -> u8 {
    a.min(b).max(a.max(b).min(c))
}

#[inline(always)]
/// `|a - b| <= offset` as used by flatness counting
pub(crate) fn is_near(a: i32, b: i32, offset: i32) -> bool {
    (a - b).abs() <= offset
}

#[inline(always)]
/// Sign that maps zero to -1
pub(crate) fn sign_or_negative(v: i32) -> i32 {
    if v > 0 {
        1
    } else {
        -1
    }
}
