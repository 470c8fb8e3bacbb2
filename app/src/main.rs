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
use image::{GrayImage, ImageReader};
use postproc::{
    postprocess, BufferStoreMut, ChromaSubsampling, ContextFlags, PictureType, PostProcessContext,
    PostProcessMode, QpTable, Verbosity, YuvPlanarImage, YuvPlanarImageMut, PP_QUALITY_MAX,
};
use rand::Rng;
use std::time::Instant;

fn main() {
    let mut args = std::env::args().skip(1);
    let input = args.next().unwrap_or_else(|| "./assets/bench.jpg".to_string());
    let chain = args.next().unwrap_or_else(|| "de".to_string());
    let qp_value: i8 = args.next().and_then(|v| v.parse().ok()).unwrap_or(8);

    let img = ImageReader::open(&input).unwrap().decode().unwrap();
    let luma = img.to_luma8();
    let (width, height) = luma.dimensions();

    let (chroma_width, chroma_height) = ChromaSubsampling::Yuv420.chroma_size(width, height);
    let chroma = vec![128u8; chroma_width as usize * chroma_height as usize];

    let src = YuvPlanarImage {
        y_plane: luma.as_raw(),
        y_stride: width,
        u_plane: &chroma,
        u_stride: chroma_width,
        v_plane: &chroma,
        v_stride: chroma_width,
        width,
        height,
    };

    let mut dst = YuvPlanarImageMut::<u8>::alloc(width, height, ChromaSubsampling::Yuv420);

    let mode = PostProcessMode::from_name_and_quality(&chain, PP_QUALITY_MAX).unwrap();
    println!("chain {}: luma {:?}, chroma {:?}", chain, mode.luma, mode.chroma);

    let mut context = PostProcessContext::new(
        width,
        height,
        ContextFlags::FORMAT_420 | ContextFlags::CPU_CAPS_AUTO,
    )
    .unwrap();
    context.set_verbosity(Verbosity::Quiet);
    println!("kernels {:?}", context.kernel_variant());

    let mb_width = width.div_ceil(16) as usize;
    let mb_height = height.div_ceil(16) as usize;
    let mut rng = rand::rng();
    let qp: Vec<i8> = (0..mb_width * mb_height)
        .map(|_| qp_value.saturating_add(rng.random_range(-1..=1i8)).max(1))
        .collect();

    for frame in 0..4 {
        let picture = if frame == 0 {
            PictureType::I
        } else {
            PictureType::P
        };
        let start_time = Instant::now();
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
        println!("postprocess frame {} time: {:?}", frame, start_time.elapsed());
    }

    let (black, white) = context.histogram().clip_points(mode.max_clipped_threshold);
    println!("luminance clip points {}..{}", black, white);

    let y_plane = match dst.y_plane {
        BufferStoreMut::Owned(v) => v,
        BufferStoreMut::Borrowed(v) => v.to_vec(),
    };
    let output = GrayImage::from_raw(width, height, y_plane).unwrap();
    output.save("postprocessed.png").unwrap();
}
