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
use criterion::{criterion_group, criterion_main, Criterion};
use image::ImageReader;
use postproc::{
    postprocess, ChromaSubsampling, ContextFlags, KernelVariant, PictureType, PostProcessContext,
    PostProcessMode, QpTable, YuvPlanarImage, YuvPlanarImageMut, PP_QUALITY_MAX,
};

pub fn criterion_benchmark(c: &mut Criterion) {
    let img = ImageReader::open("../assets/bench.jpg")
        .unwrap()
        .decode()
        .unwrap();
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

    let mb_width = width.div_ceil(16) as usize;
    let qp = vec![6i8; mb_width * height.div_ceil(16) as usize];
    let table = QpTable {
        values: &qp,
        stride: mb_width,
    };

    for chain in ["de", "fa", "ac", "de,tn", "lb", "ci", "fd", "l5", "md", "li"] {
        let mode = PostProcessMode::from_name_and_quality(chain, PP_QUALITY_MAX).unwrap();
        for variant in [KernelVariant::Generic, KernelVariant::VectorOptimized] {
            let mut context = PostProcessContext::new(
                width,
                height,
                ContextFlags::FORMAT_420 | ContextFlags::CPU_CAPS_AUTO,
            )
            .unwrap();
            context.set_kernel_variant(variant);
            c.bench_function(&format!("postproc {} {:?}", chain, variant), |b| {
                b.iter(|| {
                    postprocess(
                        &src,
                        &mut dst,
                        Some(table),
                        &mode,
                        &mut context,
                        PictureType::P,
                    )
                    .unwrap();
                })
            });
        }
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
