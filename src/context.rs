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
use crate::deinterlace::DeinterlaceState;
use crate::levels::LuminanceHistogram;
use crate::pp_error::check_base_size;
use crate::temporal_noise::TemporalHistory;
use crate::yuv_support::{ChromaSubsampling, ContextFlags, KernelVariant, Verbosity};
use crate::PostProcessError;
use log::debug;

/// Scratch state private to one plane.
#[derive(Debug, Clone, Default)]
pub(crate) struct PlaneScratch {
    /// Padded copy of the plane the filters run on, 8 rows above the picture.
    pub(crate) work: Vec<u8>,
    pub(crate) deinterlace: DeinterlaceState,
    pub(crate) temporal: TemporalHistory,
}

/// Rows of the work buffer above the first picture row.
pub(crate) const WORK_TOP_ROWS: usize = 8;

impl PlaneScratch {
    fn new(width: usize, height: usize) -> PlaneScratch {
        PlaneScratch {
            work: Vec::new(),
            deinterlace: DeinterlaceState::new(width),
            temporal: TemporalHistory::new(width, height),
        }
    }

    /// Makes room for a `width` x `height` plane, returns the work stride.
    ///
    /// The buffer holds whole blocks plus a 16 sample margin on the right and
    /// 16 rows below the last block row for look-ahead reads.
    pub(crate) fn prepare_work(&mut self, width: usize, height: usize) -> usize {
        let stride = width.div_ceil(8) * 8 + 16;
        let rows = WORK_TOP_ROWS + height.div_ceil(8) * 8 + 16;
        if self.work.len() < stride * rows {
            self.work.resize(stride * rows, 0);
        }
        stride
    }
}

/// Persistent post-processing state, one per video stream.
///
/// Holds the temporal noise history, the luminance histogram and the QP tables
/// of the last non-B frame, so one context must never be shared between streams.
#[derive(Debug, Clone)]
pub struct PostProcessContext {
    width: u32,
    height: u32,
    subsampling: ChromaSubsampling,
    variant: KernelVariant,
    verbosity: Verbosity,
    stride: usize,
    qp_stride: usize,
    allocated_height: usize,
    pub(crate) planes: [PlaneScratch; 3],
    pub(crate) histogram: LuminanceHistogram,
    pub(crate) frame_num: i64,
    pub(crate) non_b_qp: Vec<i8>,
    pub(crate) std_qp: Vec<i8>,
    pub(crate) forced_qp: Vec<i8>,
}

impl PostProcessContext {
    /// Creates a context for frames of `width` x `height` luma samples.
    ///
    /// Buffers grow automatically when later frames need wider strides or
    /// bigger QP tables.
    pub fn new(width: u32, height: u32, flags: ContextFlags) -> Result<Self, PostProcessError> {
        check_base_size(width, height)?;
        let stride = (width as usize).div_ceil(16) * 16;
        let qp_stride = (width as usize).div_ceil(16) + 2;
        let mut context = PostProcessContext {
            width,
            height,
            subsampling: flags.subsampling(),
            variant: KernelVariant::detect(flags),
            verbosity: Verbosity::default(),
            stride: 0,
            qp_stride: 0,
            allocated_height: 0,
            planes: Default::default(),
            histogram: LuminanceHistogram::new(width as usize, height as usize),
            frame_num: -1,
            non_b_qp: Vec::new(),
            std_qp: Vec::new(),
            forced_qp: Vec::new(),
        };
        context.allocate(width, height, stride, qp_stride);
        debug!(
            "postprocess context {}x{}, {:?}, {:?} kernels",
            width, height, context.subsampling, context.variant
        );
        Ok(context)
    }

    fn allocate(&mut self, width: u32, height: u32, stride: usize, qp_stride: usize) {
        let mb_width = (width as usize).div_ceil(16);
        let mb_height = (height as usize).div_ceil(16);
        let height = height as usize;

        self.stride = stride;
        self.qp_stride = qp_stride;
        self.allocated_height = height;
        self.histogram = LuminanceHistogram::new(width as usize, height);

        let (chroma_width, chroma_height) = (
            stride >> self.subsampling.h_shift(),
            height >> self.subsampling.v_shift(),
        );
        self.planes = [
            PlaneScratch::new(stride, height),
            PlaneScratch::new(chroma_width, chroma_height),
            PlaneScratch::new(chroma_width, chroma_height),
        ];

        self.non_b_qp = vec![0i8; qp_stride * mb_height];
        self.std_qp = vec![0i8; qp_stride * mb_height];
        self.forced_qp = vec![0i8; mb_width];
    }

    /// Grows the buffers for a frame, never shrinks them.
    ///
    /// Growing discards the temporal history and the histogram.
    pub(crate) fn reserve(&mut self, width: u32, height: u32, min_stride: usize, qp_stride: usize) {
        if self.stride >= min_stride
            && self.qp_stride >= qp_stride
            && self.allocated_height >= height as usize
            && self.forced_qp.len() >= (width as usize).div_ceil(16)
        {
            return;
        }
        self.width = width;
        self.height = height;
        let stride = self.stride.max(min_stride).max(width as usize);
        let qp_stride = self.qp_stride.max(qp_stride);
        let height = (height as usize).max(self.allocated_height) as u32;
        debug!(
            "growing postprocess buffers for {}x{} to stride {}, qp stride {}, height {}",
            self.width, self.height, stride, qp_stride, height
        );
        self.allocate(width, height, stride, qp_stride);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn subsampling(&self) -> ChromaSubsampling {
        self.subsampling
    }

    pub fn kernel_variant(&self) -> KernelVariant {
        self.variant
    }

    /// Overrides the detected kernels, mostly useful to compare implementations.
    ///
    /// Vector kernels the running CPU lacks fall back to generic ones.
    pub fn set_kernel_variant(&mut self, variant: KernelVariant) {
        self.variant = variant.supported();
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn set_verbosity(&mut self, verbosity: Verbosity) {
        self.verbosity = verbosity;
    }

    pub fn allocated_stride(&self) -> usize {
        self.stride
    }

    pub fn allocated_qp_stride(&self) -> usize {
        self.qp_stride
    }

    /// Index of the last processed frame, `-1` before the first one.
    pub fn frame_num(&self) -> i64 {
        self.frame_num
    }

    pub fn histogram(&self) -> &LuminanceHistogram {
        &self.histogram
    }
}
