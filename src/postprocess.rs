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
use crate::classify::{DeblockParams, EdgeLines};
use crate::context::{PlaneScratch, PostProcessContext, WORK_TOP_ROWS};
use crate::deblock::{deblock_edge, DeblockKind};
use crate::deinterlace::{deinterlace_block, Deinterlacer};
use crate::dering::dering;
use crate::images::{YuvPlanarImage, YuvPlanarImageMut};
use crate::levels::LevelCorrection;
use crate::mode::{FilterFlags, PostProcessMode};
use crate::pp_error::{check_base_size, check_qp_table, MismatchedSize};
use crate::temporal_noise::reduce_temporal_noise;
use crate::yuv_support::{KernelVariant, PictureType, Verbosity};
use crate::PostProcessError;
use log::{debug, trace};

/// Quantizers of one frame, one signed entry per 16x16 luma macroblock.
#[derive(Debug, Copy, Clone)]
pub struct QpTable<'a> {
    pub values: &'a [i8],
    /// Entries per macroblock row, `0` reuses the first row for the whole frame.
    pub stride: usize,
}

/// Rows copied ahead of the block being filtered so every filter finds
/// unfiltered source samples below it.
pub(crate) fn copy_ahead(flags: FilterFlags) -> usize {
    if flags.contains(FilterFlags::CUBIC_IPOL_DEINT_FILTER) {
        8
    } else if flags.intersects(
        FilterFlags::LINEAR_BLEND_DEINT_FILTER
            | FilterFlags::FFMPEG_DEINT_FILTER
            | FilterFlags::LOWPASS5_DEINT_FILTER,
    ) {
        6
    } else if flags.intersects(
        FilterFlags::V_DEBLOCK
            | FilterFlags::LINEAR_IPOL_DEINT_FILTER
            | FilterFlags::MEDIAN_DEINT_FILTER
            | FilterFlags::V_A_DEBLOCK,
    ) {
        5
    } else if flags.contains(FilterFlags::V_X1_FILTER) {
        3
    } else if flags.contains(FilterFlags::DERING) {
        1
    } else {
        0
    }
}

/// Everything a plane pass reads besides its samples.
struct PlaneSettings<'a> {
    flags: FilterFlags,
    mode: &'a PostProcessMode,
    qp: &'a [i8],
    non_b_qp: &'a [i8],
    qp_stride: usize,
    mb_width: usize,
    mb_height: usize,
    qp_h_shift: u32,
    qp_v_shift: u32,
    levels: LevelCorrection,
    variant: KernelVariant,
}

impl PlaneSettings<'_> {
    fn quantizers(&self, x: usize, y: usize) -> (i32, i32) {
        let col = (x >> self.qp_h_shift).min(self.mb_width - 1);
        let row = (y >> self.qp_v_shift).min(self.mb_height - 1);
        let index = row * self.qp_stride + col;
        let qp = self.qp[index].max(0) as i32;
        let non_b_qp = self.non_b_qp[index].max(0) as i32;
        (self.levels.correct_qp(qp), self.levels.correct_qp(non_b_qp))
    }
}

struct PlaneSource<'a> {
    data: &'a [u8],
    stride: usize,
    width: usize,
    height: usize,
}

/// Copies 8 rows of one block column starting at picture row `first_row`,
/// reads outside the picture repeat its last row and column.
///
/// The last block column also extends its right sample into the margin.
fn copy_source_block(
    src: &PlaneSource,
    work: &mut [u8],
    work_stride: usize,
    x: usize,
    first_row: usize,
    levels: &LevelCorrection,
) {
    let mut samples = [0u8; 8];
    for row in first_row..first_row + 8 {
        let src_row = row.min(src.height - 1) * src.stride;
        for (i, dst) in samples.iter_mut().enumerate() {
            *dst = src.data[src_row + (x + i).min(src.width - 1)];
        }
        let offset = (row + WORK_TOP_ROWS) * work_stride + x;
        levels.copy_row(&samples, &mut work[offset..offset + 8]);
        if x + 8 >= src.width {
            let edge = work[offset + 7];
            work[offset + 8..offset + 16].fill(edge);
        }
    }
}

/// Runs the filter pipeline over one plane, blocks strictly in raster order.
fn process_plane(
    src: &PlaneSource,
    dst: &mut [u8],
    dst_stride: usize,
    settings: &PlaneSettings,
    scratch: &mut PlaneScratch,
) {
    let (width, height) = (src.width, src.height);
    let stride = scratch.prepare_work(width, height);
    let PlaneScratch {
        work,
        deinterlace,
        temporal,
        ..
    } = scratch;

    let flags = settings.flags;
    let deinterlacer = Deinterlacer::from_flags(flags);
    let vertical = DeblockKind::vertical_from(flags);
    let horizontal = DeblockKind::horizontal_from(flags);
    let ahead = copy_ahead(flags);
    let row_start = |y: usize| (y + WORK_TOP_ROWS) * stride;

    // Block row above the picture, only staged and deinterlaced.
    for x in (0..width).step_by(8) {
        copy_source_block(src, work, stride, x, 0, &settings.levels);
        let first = row_start(0) + x;
        let span = if x + 8 >= width { 16 } else { 8 };
        for row in 0..WORK_TOP_ROWS {
            work.copy_within(first..first + span, row * stride + x);
        }
        if let Some(kind) = deinterlacer {
            deinterlace_block(kind, work, x, stride, deinterlace, x, settings.variant);
        }
    }

    let blocks_width = width.div_ceil(8) * 8;
    for y in (0..height).step_by(8) {
        let mut qp = 0;
        for x in (0..width).step_by(8) {
            let (block_qp, non_b_qp) = settings.quantizers(x, y);
            qp = block_qp;
            let params = DeblockParams::new(qp, non_b_qp, settings.mode);

            copy_source_block(src, work, stride, x, y + ahead, &settings.levels);

            let block = row_start(y) + x;
            if let Some(kind) = deinterlacer {
                deinterlace_block(kind, work, block, stride, deinterlace, x, settings.variant);
            }

            if y + 8 < height {
                if let Some(kind) = vertical {
                    deblock_edge(work, EdgeLines::vertical(block, stride), &params, kind);
                }
            }

            if x >= 8 {
                if let Some(kind) = horizontal {
                    deblock_edge(work, EdgeLines::horizontal(block, stride), &params, kind);
                }
                if flags.contains(FilterFlags::DERING) && y > 0 {
                    dering(work, block - stride - 8, stride, qp);
                }
                if flags.contains(FilterFlags::TEMP_NOISE_FILTER) {
                    reduce_temporal_noise(
                        work,
                        block - 8,
                        stride,
                        temporal,
                        x / 8 - 1,
                        y / 8,
                        &settings.mode.max_tmp_noise,
                    );
                }
            }
        }

        // the last block of the row has no right neighbour to trigger it
        let block = row_start(y) + blocks_width;
        if flags.contains(FilterFlags::DERING) && y > 0 {
            dering(work, block - stride - 8, stride, qp);
        }
        if flags.contains(FilterFlags::TEMP_NOISE_FILTER) {
            reduce_temporal_noise(
                work,
                block - 8,
                stride,
                temporal,
                blocks_width / 8 - 1,
                y / 8,
                &settings.mode.max_tmp_noise,
            );
        }
    }

    for y in 0..height {
        let src_row = row_start(y);
        dst[y * dst_stride..y * dst_stride + width]
            .copy_from_slice(&work[src_row..src_row + width]);
    }
}

fn copy_plane(
    src: &[u8],
    src_stride: usize,
    dst: &mut [u8],
    dst_stride: usize,
    width: usize,
    height: usize,
) {
    for (src, dst) in src
        .chunks(src_stride)
        .zip(dst.chunks_mut(dst_stride))
        .take(height)
    {
        dst[..width].copy_from_slice(&src[..width]);
    }
}

/// Post-processes one decoded frame from `src` into `dst`.
///
/// `qp` holds the decoder quantizers, without one every macroblock uses QP 1
/// unless the mode forces a quantizer. Both images must share the size the
/// chroma layout of `context` implies. Planes are read from `src` only, so
/// `dst` may hold stale data.
pub fn postprocess(
    src: &YuvPlanarImage<u8>,
    dst: &mut YuvPlanarImageMut<u8>,
    qp: Option<QpTable>,
    mode: &PostProcessMode,
    context: &mut PostProcessContext,
    picture: PictureType,
) -> Result<(), PostProcessError> {
    check_base_size(src.width, src.height)?;
    if dst.width != src.width || dst.height != src.height {
        return Err(PostProcessError::PlaneSizeMismatch(MismatchedSize {
            expected: src.width as usize * src.height as usize,
            received: dst.width as usize * dst.height as usize,
        }));
    }
    let subsampling = context.subsampling();
    src.check_constraints(subsampling)?;
    dst.check_constraints(subsampling)?;

    let width = src.width as usize;
    let height = src.height as usize;
    let mb_width = width.div_ceil(16);
    let mb_height = height.div_ceil(16);

    let forced = qp.is_none() || mode.luma.contains(FilterFlags::FORCE_QUANT);
    let caller_stride = match qp {
        Some(table) if !forced => {
            check_qp_table(table.values.len(), table.stride, mb_width, mb_height)?;
            table.stride
        }
        _ => 0,
    };
    let min_stride = (src.y_stride as usize).max(dst.y_stride as usize);
    context.reserve(
        src.width,
        src.height,
        min_stride,
        caller_stride.max(mb_width),
    );

    let level_fix = mode.luma.contains(FilterFlags::LEVEL_FIX);
    context.frame_num += 1;
    if context.frame_num == 1 {
        context.histogram.reseed_black(width, height);
    }
    let levels = LevelCorrection::from_histogram(&context.histogram, mode, level_fix);

    let qp_stride = context.allocated_qp_stride();
    let halve = picture.has_double_scale_qp() && !forced;
    let forced_value = if mode.luma.contains(FilterFlags::FORCE_QUANT) {
        mode.forced_quant.clamp(i8::MIN as i32, i8::MAX as i32) as i8
    } else {
        1
    };
    for value in context.forced_qp.iter_mut().take(mb_width) {
        *value = forced_value;
    }
    for row in 0..mb_height {
        for col in 0..mb_width {
            let value = match qp {
                Some(table) if !forced => table.values[row * table.stride + col],
                _ => context.forced_qp[col],
            };
            let value = if halve {
                ((value as u8) >> 1) as i8
            } else {
                value
            };
            context.std_qp[row * qp_stride + col] = value;
            if !picture.is_b_frame() {
                context.non_b_qp[row * qp_stride + col] = value & 0x3F;
            }
        }
    }

    if context.verbosity() == Verbosity::Verbose {
        for row in 0..mb_height {
            trace!(
                "QP row {}: {:?}",
                row,
                &context.std_qp[row * qp_stride..row * qp_stride + mb_width]
            );
        }
    }
    debug!(
        "using npp filters 0x{:X}/0x{:X}",
        mode.luma.bits(),
        mode.chroma.bits()
    );

    let variant = context.kernel_variant();
    let PostProcessContext {
        planes,
        histogram,
        std_qp,
        non_b_qp,
        ..
    } = context;
    let [luma_scratch, u_scratch, v_scratch] = planes;

    let luma_settings = PlaneSettings {
        flags: mode.luma,
        mode,
        qp: std_qp,
        non_b_qp,
        qp_stride,
        mb_width,
        mb_height,
        qp_h_shift: 4,
        qp_v_shift: 4,
        levels,
        variant,
    };
    let luma_source = PlaneSource {
        data: src.y_plane,
        stride: src.y_stride as usize,
        width,
        height,
    };
    process_plane(
        &luma_source,
        dst.y_plane.as_mut(),
        dst.y_stride as usize,
        &luma_settings,
        luma_scratch,
    );

    for y in (0..height).step_by(8) {
        let row = (y + 12).min(height - 1) * luma_source.stride;
        for x in (0..width).step_by(8) {
            histogram.record(luma_source.data[row + (x + 4).min(width - 1)]);
        }
    }

    let (chroma_width, chroma_height) = subsampling.chroma_size(src.width, src.height);
    let (chroma_width, chroma_height) = (chroma_width as usize, chroma_height as usize);
    if chroma_width == 0 || chroma_height == 0 {
        return Ok(());
    }

    if mode.chroma.is_empty() {
        copy_plane(
            src.u_plane,
            src.u_stride as usize,
            dst.u_plane.as_mut(),
            dst.u_stride as usize,
            chroma_width,
            chroma_height,
        );
        copy_plane(
            src.v_plane,
            src.v_stride as usize,
            dst.v_plane.as_mut(),
            dst.v_stride as usize,
            chroma_width,
            chroma_height,
        );
        return Ok(());
    }

    let chroma_settings = PlaneSettings {
        flags: mode.chroma,
        qp_h_shift: 4 - subsampling.h_shift(),
        qp_v_shift: 4 - subsampling.v_shift(),
        levels: LevelCorrection::identity(),
        ..luma_settings
    };
    let u_source = PlaneSource {
        data: src.u_plane,
        stride: src.u_stride as usize,
        width: chroma_width,
        height: chroma_height,
    };
    let v_source = PlaneSource {
        data: src.v_plane,
        stride: src.v_stride as usize,
        width: chroma_width,
        height: chroma_height,
    };
    let (u_stride, v_stride) = (dst.u_stride as usize, dst.v_stride as usize);
    let (u_dst, v_dst) = (dst.u_plane.as_mut(), dst.v_plane.as_mut());

    #[cfg(feature = "rayon")]
    {
        rayon::join(
            || process_plane(&u_source, u_dst, u_stride, &chroma_settings, u_scratch),
            || process_plane(&v_source, v_dst, v_stride, &chroma_settings, v_scratch),
        );
    }
    #[cfg(not(feature = "rayon"))]
    {
        process_plane(&u_source, u_dst, u_stride, &chroma_settings, u_scratch);
        process_plane(&v_source, v_dst, v_stride, &chroma_settings, v_scratch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::BufferStoreMut;
    use crate::yuv_support::{ChromaSubsampling, ContextFlags};
    use rand::Rng;

    struct Frame {
        y: Vec<u8>,
        u: Vec<u8>,
        v: Vec<u8>,
        width: u32,
        height: u32,
    }

    impl Frame {
        fn filled(width: u32, height: u32, mut sample: impl FnMut(usize, usize) -> u8) -> Frame {
            let (cw, ch) = chroma_size(width, height);
            let mut y = vec![0u8; (width * height) as usize];
            for row in 0..height as usize {
                for col in 0..width as usize {
                    y[row * width as usize + col] = sample(col, row);
                }
            }
            let mut rng = rand::rng();
            let u = (0..cw * ch).map(|_| rng.random::<u8>()).collect();
            let v = (0..cw * ch).map(|_| rng.random::<u8>()).collect();
            Frame {
                y,
                u,
                v,
                width,
                height,
            }
        }

        fn image(&self) -> YuvPlanarImage<u8> {
            let (cw, _) = chroma_size(self.width, self.height);
            YuvPlanarImage {
                y_plane: &self.y,
                y_stride: self.width,
                u_plane: &self.u,
                u_stride: cw as u32,
                v_plane: &self.v,
                v_stride: cw as u32,
                width: self.width,
                height: self.height,
            }
        }
    }

    fn chroma_size(width: u32, height: u32) -> (usize, usize) {
        let (cw, ch) = ChromaSubsampling::Yuv420.chroma_size(width, height);
        (cw as usize, ch as usize)
    }

    fn output(width: u32, height: u32) -> YuvPlanarImageMut<'static, u8> {
        let (cw, ch) = chroma_size(width, height);
        YuvPlanarImageMut {
            y_plane: BufferStoreMut::Owned(vec![0u8; (width * height) as usize]),
            y_stride: width,
            u_plane: BufferStoreMut::Owned(vec![0u8; cw * ch]),
            u_stride: cw as u32,
            v_plane: BufferStoreMut::Owned(vec![0u8; cw * ch]),
            v_stride: cw as u32,
            width,
            height,
        }
    }

    fn run(
        frame: &Frame,
        qp: Option<QpTable>,
        mode: &PostProcessMode,
        context: &mut PostProcessContext,
        picture: PictureType,
    ) -> YuvPlanarImageMut<'static, u8> {
        let mut dst = output(frame.width, frame.height);
        postprocess(&frame.image(), &mut dst, qp, mode, context, picture).unwrap();
        dst
    }

    fn context(width: u32, height: u32) -> PostProcessContext {
        PostProcessContext::new(width, height, ContextFlags::FORMAT_420).unwrap()
    }

    #[test]
    fn test_copy_ahead_follows_deepest_reader() {
        assert_eq!(copy_ahead(FilterFlags::empty()), 0);
        assert_eq!(copy_ahead(FilterFlags::DERING), 1);
        assert_eq!(copy_ahead(FilterFlags::V_X1_FILTER | FilterFlags::DERING), 3);
        assert_eq!(copy_ahead(FilterFlags::V_DEBLOCK | FilterFlags::V_X1_FILTER), 5);
        assert_eq!(copy_ahead(FilterFlags::LOWPASS5_DEINT_FILTER | FilterFlags::V_DEBLOCK), 6);
        assert_eq!(
            copy_ahead(FilterFlags::CUBIC_IPOL_DEINT_FILTER | FilterFlags::LINEAR_BLEND_DEINT_FILTER),
            8
        );
    }

    #[test]
    fn test_flat_frame_passes_default_chain() {
        let frame = Frame::filled(48, 32, |_, _| 128);
        let mode = PostProcessMode::from_name_and_quality("de", 6).unwrap();
        let qp = vec![8i8; 3 * 2];
        let mut context = context(48, 32);
        let dst = run(
            &frame,
            Some(QpTable {
                values: &qp,
                stride: 3,
            }),
            &mode,
            &mut context,
            PictureType::I,
        );
        assert!(dst.y_plane.borrow().iter().all(|&v| v == 128));
    }

    #[test]
    fn test_empty_mode_is_identity_on_odd_sizes() {
        let mut rng = rand::rng();
        let frame = Frame::filled(37, 21, |_, _| rng.random::<u8>());
        let mut context = context(37, 21);
        let dst = run(
            &frame,
            None,
            &PostProcessMode::default(),
            &mut context,
            PictureType::P,
        );
        assert_eq!(dst.y_plane.borrow(), frame.y.as_slice());
        assert_eq!(dst.u_plane.borrow(), frame.u.as_slice());
        assert_eq!(dst.v_plane.borrow(), frame.v.as_slice());
    }

    #[test]
    fn test_chroma_is_copied_without_chroma_filters() {
        let mut rng = rand::rng();
        let frame = Frame::filled(32, 32, |_, _| rng.random::<u8>());
        let mode = PostProcessMode {
            luma: FilterFlags::H_DEBLOCK | FilterFlags::V_DEBLOCK | FilterFlags::DERING,
            ..PostProcessMode::default()
        };
        let mut context = context(32, 32);
        let dst = run(&frame, None, &mode, &mut context, PictureType::I);
        assert_eq!(dst.u_plane.borrow(), frame.u.as_slice());
        assert_eq!(dst.v_plane.borrow(), frame.v.as_slice());
    }

    #[test]
    fn test_linear_interpolation_rebuilds_odd_rows() {
        let frame = Frame::filled(32, 32, |_, row| if row % 2 == 0 { 100 } else { 200 });
        let mode = PostProcessMode {
            luma: FilterFlags::LINEAR_IPOL_DEINT_FILTER,
            ..PostProcessMode::default()
        };
        let mut context = context(32, 32);
        let dst = run(&frame, None, &mode, &mut context, PictureType::I);
        let luma = dst.y_plane.borrow();
        for row in 0..31 {
            assert!(
                luma[row * 32..row * 32 + 32].iter().all(|&v| v == 100),
                "row {}",
                row
            );
        }
        // the row below the picture repeats the last odd row
        assert!(luma[31 * 32..].iter().all(|&v| v == 150));
    }

    #[test]
    fn test_static_frames_survive_temporal_noise_reducer() {
        let mut rng = rand::rng();
        let frame = Frame::filled(40, 24, |_, _| rng.random_range(64..=255u8));
        let mode = PostProcessMode {
            luma: FilterFlags::TEMP_NOISE_FILTER,
            ..PostProcessMode::default()
        };
        let mut context = context(40, 24);
        for _ in 0..3 {
            let dst = run(&frame, None, &mode, &mut context, PictureType::P);
            assert_eq!(dst.y_plane.borrow(), frame.y.as_slice());
        }
        assert_eq!(context.frame_num(), 2);
    }

    #[test]
    fn test_qp_tables_follow_picture_type() {
        let frame = Frame::filled(32, 32, |_, _| 60);
        let mode = PostProcessMode::default();
        let mut context = context(32, 32);

        let qp = [10i8; 2];
        let table = QpTable {
            values: &qp,
            stride: 0,
        };
        run(&frame, Some(table), &mode, &mut context, PictureType::I);
        assert_eq!(context.std_qp[0], 10);
        assert_eq!(context.non_b_qp[0], 10);

        let qp_b = [20i8; 2];
        let table = QpTable {
            values: &qp_b,
            stride: 0,
        };
        run(&frame, Some(table), &mode, &mut context, PictureType::B);
        assert_eq!(context.std_qp[0], 20);
        assert_eq!(context.non_b_qp[0], 10);

        let halved = PictureType::from_bits(PictureType::QP2.bits() | PictureType::P.bits());
        run(&frame, Some(table), &mode, &mut context, halved);
        assert_eq!(context.std_qp[1], 10);
        assert_eq!(context.non_b_qp[1], 10);
    }

    #[test]
    fn test_forced_quantizer_ignores_table() {
        let frame = Frame::filled(32, 16, |_, _| 90);
        let mode = PostProcessMode {
            luma: FilterFlags::FORCE_QUANT | FilterFlags::H_DEBLOCK,
            forced_quant: 12,
            ..PostProcessMode::default()
        };
        let mut context = context(32, 16);
        let short = [3i8; 1];
        let table = QpTable {
            values: &short,
            stride: 0,
        };
        run(&frame, Some(table), &mode, &mut context, PictureType::I);
        assert_eq!(&context.std_qp[..2], &[12, 12]);

        run(&frame, None, &PostProcessMode::default(), &mut context, PictureType::I);
        assert_eq!(&context.std_qp[..2], &[1, 1]);
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let frame = Frame::filled(32, 32, |_, _| 0);
        let mut context = context(32, 32);
        let mode = PostProcessMode::default();

        let mut small = output(32, 16);
        assert!(matches!(
            postprocess(&frame.image(), &mut small, None, &mode, &mut context, PictureType::I),
            Err(PostProcessError::PlaneSizeMismatch(_))
        ));

        let qp = [1i8; 3];
        let mut dst = output(32, 32);
        let table = QpTable {
            values: &qp,
            stride: 2,
        };
        assert!(matches!(
            postprocess(&frame.image(), &mut dst, Some(table), &mode, &mut context, PictureType::I),
            Err(PostProcessError::QpTableSizeMismatch(_))
        ));
        assert_eq!(context.frame_num(), -1);
    }

    #[test]
    fn test_context_grows_with_frames() {
        let mut context = context(16, 16);
        let frame = Frame::filled(64, 48, |x, y| (x * 3 + y) as u8);
        let mode = PostProcessMode {
            luma: FilterFlags::H_DEBLOCK | FilterFlags::V_DEBLOCK,
            chroma: FilterFlags::H_DEBLOCK,
            ..PostProcessMode::default()
        };
        run(&frame, None, &mode, &mut context, PictureType::I);
        assert_eq!((context.width(), context.height()), (64, 48));
        assert!(context.allocated_stride() >= 64);
        assert!(context.allocated_qp_stride() >= 4);
        assert_eq!(context.frame_num(), 0);

        let stride = context.allocated_stride();
        let qp_stride = context.allocated_qp_stride();
        let smaller = Frame::filled(24, 16, |x, y| (x + y) as u8);
        run(&smaller, None, &mode, &mut context, PictureType::P);
        assert_eq!(context.allocated_stride(), stride);
        assert_eq!(context.allocated_qp_stride(), qp_stride);
        assert_eq!(context.frame_num(), 1);
    }

    fn uniform_qp(width: u32, height: u32, value: i8) -> Vec<i8> {
        vec![value; (width as usize).div_ceil(16) * (height as usize).div_ceil(16)]
    }

    #[test]
    fn test_deblocking_keeps_flat_frame() {
        let frame = Frame::filled(48, 32, |_, _| 128);
        let qp = uniform_qp(48, 32, 16);
        for luma in [
            FilterFlags::H_DEBLOCK | FilterFlags::V_DEBLOCK,
            FilterFlags::H_A_DEBLOCK | FilterFlags::V_A_DEBLOCK,
            FilterFlags::H_X1_FILTER | FilterFlags::V_X1_FILTER,
        ] {
            let mode = PostProcessMode {
                luma,
                ..PostProcessMode::default()
            };
            let mut context = context(48, 32);
            let table = QpTable {
                values: &qp,
                stride: 3,
            };
            let dst = run(&frame, Some(table), &mode, &mut context, PictureType::I);
            assert!(dst.y_plane.borrow().iter().all(|&v| v == 128), "{:?}", luma);
        }
    }

    #[test]
    fn test_accurate_deblocking_corrects_block_edge() {
        let frame = Frame::filled(32, 16, |col, _| match col {
            0..=6 => 16,
            7 => 20,
            _ => 30,
        });
        let mode = PostProcessMode {
            luma: FilterFlags::H_A_DEBLOCK,
            ..PostProcessMode::default()
        };
        let qp = uniform_qp(32, 16, 16);
        let table = QpTable {
            values: &qp,
            stride: 0,
        };
        let mut context = context(32, 16);
        let dst = run(&frame, Some(table), &mode, &mut context, PictureType::I);
        let luma = dst.y_plane.borrow();
        for row in 0..16 {
            let line = &luma[row * 32..row * 32 + 32];
            assert_eq!(&line[..7], &[16u8; 7]);
            // p[3] and p[4] move towards each other by (5 * 22 + 32) >> 6 = 2
            assert_eq!(line[7], 22, "row {}", row);
            assert_eq!(line[8], 28, "row {}", row);
            assert!(line[9..].iter().all(|&v| v == 30));
        }
    }

    #[test]
    fn test_level_fix_stretches_to_allowed_range() {
        let mut rng = rand::rng();
        let frame = Frame::filled(64, 32, |_, _| rng.random_range(100..=140u8));
        let mode = PostProcessMode {
            luma: FilterFlags::LEVEL_FIX,
            ..PostProcessMode::default()
        };
        let mut context = context(64, 32);
        for _ in 0..100_000 {
            context.histogram.record(100);
            context.histogram.record(140);
        }
        let levels = LevelCorrection::from_histogram(context.histogram(), &mode, true);
        assert!(levels.is_enabled());
        assert_eq!((levels.black, levels.white), (99, 141));

        let dst = run(&frame, None, &mode, &mut context, PictureType::I);
        let luma = dst.y_plane.borrow();
        for (&src, &out) in frame.y.iter().zip(luma.iter()) {
            assert_eq!(out, levels.apply(src));
        }
        assert_eq!(levels.apply(100), 24);
        assert_eq!(levels.apply(140), 232);
        assert_eq!(dst.u_plane.borrow(), frame.u.as_slice());
    }

    #[test]
    fn test_level_fix_off_copies_luma() {
        let mut rng = rand::rng();
        let frame = Frame::filled(64, 32, |_, _| rng.random_range(100..=140u8));
        let mut context = context(64, 32);
        for _ in 0..100_000 {
            context.histogram.record(100);
            context.histogram.record(140);
        }
        let dst = run(
            &frame,
            None,
            &PostProcessMode::default(),
            &mut context,
            PictureType::I,
        );
        assert_eq!(dst.y_plane.borrow(), frame.y.as_slice());
    }

    #[test]
    fn test_dering_pulls_spike_towards_neighbours() {
        let mut frame = Frame::filled(32, 32, |col, _| if col <= 10 { 30 } else { 180 });
        frame.y[12 * 32 + 14] = 190;
        let mode = PostProcessMode {
            luma: FilterFlags::DERING,
            ..PostProcessMode::default()
        };
        let qp = uniform_qp(32, 32, 16);
        let table = QpTable {
            values: &qp,
            stride: 0,
        };
        let mut context = context(32, 32);
        let dst = run(&frame, Some(table), &mode, &mut context, PictureType::I);
        let luma = dst.y_plane.borrow();
        let spike = luma[12 * 32 + 14];
        assert!((181..=184).contains(&spike), "spike {}", spike);
        for row in 0..32 {
            // the edge is not inside a uniform area
            assert_eq!(luma[row * 32 + 10], 30);
            assert_eq!(luma[row * 32 + 11], 180);
        }

        let plain = Frame::filled(32, 32, |col, _| if col <= 10 { 30 } else { 180 });
        let mut context = self::context(32, 32);
        let dst = run(&plain, Some(table), &mode, &mut context, PictureType::I);
        assert_eq!(dst.y_plane.borrow(), plain.y.as_slice());
    }
}
