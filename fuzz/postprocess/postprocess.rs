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

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use postproc::{
    postprocess, ChromaSubsampling, ContextFlags, FilterFlags, PictureType, PostProcessContext,
    PostProcessMode, QpTable, YuvPlanarImage, YuvPlanarImageMut,
};

#[derive(Arbitrary, Debug)]
struct Input {
    width: u8,
    height: u8,
    subsampling: u8,
    luma_flags: u32,
    chroma_flags: u32,
    picture: u8,
    qp: i8,
    frames: u8,
    seed: u8,
}

fuzz_target!(|input: Input| {
    if input.width == 0 || input.height == 0 {
        return;
    }
    let subsampling = match input.subsampling % 5 {
        0 => ChromaSubsampling::Yuv420,
        1 => ChromaSubsampling::Yuv422,
        2 => ChromaSubsampling::Yuv411,
        3 => ChromaSubsampling::Yuv444,
        _ => ChromaSubsampling::Yuv440,
    };
    let width = input.width as u32;
    let height = input.height as u32;
    let (chroma_width, chroma_height) = subsampling.chroma_size(width, height);

    let y_plane: Vec<u8> = (0..width * height)
        .map(|i| (i as u8).wrapping_mul(input.seed).wrapping_add(i as u8 >> 3))
        .collect();
    let chroma: Vec<u8> = (0..chroma_width * chroma_height)
        .map(|i| (i as u8).wrapping_add(input.seed))
        .collect();

    let src = YuvPlanarImage {
        y_plane: &y_plane,
        y_stride: width,
        u_plane: &chroma,
        u_stride: chroma_width,
        v_plane: &chroma,
        v_stride: chroma_width,
        width,
        height,
    };
    let mut dst = YuvPlanarImageMut::<u8>::alloc(width, height, subsampling);

    let mode = PostProcessMode {
        luma: FilterFlags::from_bits(input.luma_flags),
        chroma: FilterFlags::from_bits(input.chroma_flags),
        forced_quant: input.qp as i32,
        ..PostProcessMode::default()
    };

    let mb_width = width.div_ceil(16) as usize;
    let qp = vec![input.qp; mb_width * height.div_ceil(16) as usize];
    let picture = PictureType::from_bits(input.picture as u32 & 0x13);

    let mut context = PostProcessContext::new(
        width,
        height,
        ContextFlags::from(subsampling) | ContextFlags::CPU_CAPS_AUTO,
    )
    .unwrap();
    for _ in 0..(input.frames % 4) + 1 {
        postprocess(
            &src,
            &mut dst,
            Some(QpTable {
                values: &qp,
                stride: mb_width,
            }),
            &mode,
            &mut context,
            picture,
        )
        .unwrap();
    }
});
