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
#![cfg_attr(docsrs, feature(doc_cfg))]
mod classify;
mod context;
mod deblock;
mod deinterlace;
mod dering;
mod filter_chain;
mod images;
mod levels;
mod mode;
#[cfg(all(target_arch = "aarch64", target_feature = "neon"))]
mod neon;
mod numerics;
mod postprocess;
mod pp_error;
#[cfg(all(any(target_arch = "x86", target_arch = "x86_64"), feature = "sse"))]
mod sse;
mod temporal_noise;
mod yuv_support;

pub use pp_error::FilterChainRejection;
pub use pp_error::MismatchedSize;
pub use pp_error::PostProcessError;

pub use yuv_support::ChromaSubsampling;
pub use yuv_support::ContextFlags;
pub use yuv_support::KernelVariant;
pub use yuv_support::PictureType;
pub use yuv_support::Verbosity;

pub use images::BufferStoreMut;
pub use images::YuvPlanarImage;
pub use images::YuvPlanarImageMut;

pub use mode::FilterFlags;
pub use mode::PostProcessMode;

pub use filter_chain::FilterChainCompiler;
pub use filter_chain::FilterDescriptor;
pub use filter_chain::FilterPreset;
pub use filter_chain::PP_HELP;
pub use filter_chain::PP_QUALITY_MAX;

pub use classify::classify;
pub use classify::count_flat_pairs;
pub use classify::is_flat;
pub use classify::is_min_max_ok;
pub use classify::BlockClass;
pub use classify::DeblockParams;
pub use classify::EdgeLines;

pub use deblock::accurate_deblock;
pub use deblock::deblock_edge;
pub use deblock::default_filter;
pub use deblock::low_pass;
pub use deblock::x1_filter;
pub use deblock::DeblockKind;

pub use dering::dering;
pub use dering::DERING_THRESHOLD;

pub use deinterlace::deinterlace_blend;
pub use deinterlace::deinterlace_block;
pub use deinterlace::deinterlace_cubic;
pub use deinterlace::deinterlace_ffmpeg;
pub use deinterlace::deinterlace_linear;
pub use deinterlace::deinterlace_lowpass5;
pub use deinterlace::deinterlace_median;
pub use deinterlace::DeinterlaceState;
pub use deinterlace::Deinterlacer;

pub use temporal_noise::reduce_temporal_noise;
pub use temporal_noise::TemporalHistory;

pub use levels::LevelCorrection;
pub use levels::LuminanceHistogram;

pub use context::PostProcessContext;
pub use postprocess::postprocess;
pub use postprocess::QpTable;
