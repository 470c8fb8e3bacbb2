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
use crate::mode::{FilterFlags, PostProcessMode};
use crate::pp_error::{FilterChainRejection, PostProcessError};
use log::{debug, error};

/// Highest quality value that still changes which filters `autoq` enables.
pub const PP_QUALITY_MAX: i32 = 6;

/// Capacity of the working buffer the chain is expanded in, terminator included.
const MODE_BUFFER_SIZE: usize = 500;
/// Options collected per filter token before the remainder is ignored.
const OPTIONS_ARRAY_SIZE: usize = 10;
/// Effective quality of a filter without `autoq`.
const ALWAYS_ON_QUALITY: i32 = 1_000_000;

const FILTER_DELIMITERS: &[u8] = b",/";
const OPTION_DELIMITER: u8 = b':';

pub const PP_HELP: &str = "Available postprocessing filters:
Filters                        Options
short  long name       short   long option     Description
*      *               a       autoq           CPU power dependent enabler
                       c       chrom           chrominance filtering enabled
                       y       nochrom         chrominance filtering disabled
                       n       noluma          luma filtering disabled
hb     hdeblock        (2 threshold)           horizontal deblocking filter
       1. difference factor: default=32, higher -> more deblocking
       2. flatness threshold: default=39, lower -> more deblocking
                       the h & v deblocking filters share these
                       so you can't set different thresholds for h / v
vb     vdeblock        (2 threshold)           vertical deblocking filter
ha     ahdeblock       (2 threshold)           horizontal deblocking filter
va     avdeblock       (2 threshold)           vertical deblocking filter
h1     x1hdeblock                              experimental h deblock filter 1
v1     x1vdeblock                              experimental v deblock filter 1
dr     dering                                  deringing filter
al     autolevels                              automatic brightness / contrast
                       f        fullyrange     stretch luminance to (0..255)
lb     linblenddeint                           linear blend deinterlacer
li     linipoldeint                            linear interpolating deinterlace
ci     cubicipoldeint                          cubic interpolating deinterlacer
md     mediandeint                             median deinterlacer
fd     ffmpegdeint                             ffmpeg deinterlacer
l5     lowpass5                                FIR lowpass deinterlacer
de     default                                 hb:a,vb:a,dr:a
fa     fast                                    h1:a,v1:a,dr:a
ac                                             ha:a:128:7,va:a,dr:a
tn     tmpnoise        (3 threshold)           temporal noise reducer
                     1. <= 2. <= 3.            larger -> stronger filtering
fq     forcequant      <quantizer>             force quantizer
Usage:
<filterName>[:<option>[:<option>...]][[,|/][-]<filterName>[:<option>...]]...
long form example:
vdeblock:autoq/hdeblock:autoq/linblenddeint    default,-vdeblock
short form example:
vb:a/hb:a/lb                                   de,-vb
more examples:
tn:64:128:256
";

/// One row of the filter table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FilterDescriptor {
    pub short_name: &'static str,
    pub long_name: &'static str,
    /// Whether chroma is filtered when neither `chrom` nor `nochrom` is given.
    pub chroma_default: bool,
    pub min_luma_quality: i32,
    pub min_chroma_quality: i32,
    pub mask: FilterFlags,
}

impl FilterDescriptor {
    const fn new(
        short_name: &'static str,
        long_name: &'static str,
        chroma_default: bool,
        min_luma_quality: i32,
        min_chroma_quality: i32,
        mask: FilterFlags,
    ) -> FilterDescriptor {
        FilterDescriptor {
            short_name,
            long_name,
            chroma_default,
            min_luma_quality,
            min_chroma_quality,
            mask,
        }
    }

    #[inline]
    fn is_named(&self, name: &[u8]) -> bool {
        self.short_name.as_bytes() == name || self.long_name.as_bytes() == name
    }
}

/// Named macro expanded in place before filter lookup.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FilterPreset {
    pub name: &'static str,
    pub expansion: &'static str,
}

pub static FILTERS: [FilterDescriptor; 16] = [
    FilterDescriptor::new("hb", "hdeblock", true, 1, 3, FilterFlags::H_DEBLOCK),
    FilterDescriptor::new("vb", "vdeblock", true, 2, 4, FilterFlags::V_DEBLOCK),
    FilterDescriptor::new("h1", "x1hdeblock", true, 1, 3, FilterFlags::H_X1_FILTER),
    FilterDescriptor::new("v1", "x1vdeblock", true, 2, 4, FilterFlags::V_X1_FILTER),
    FilterDescriptor::new("ha", "ahdeblock", true, 1, 3, FilterFlags::H_A_DEBLOCK),
    FilterDescriptor::new("va", "avdeblock", true, 2, 4, FilterFlags::V_A_DEBLOCK),
    FilterDescriptor::new("dr", "dering", true, 5, 6, FilterFlags::DERING),
    FilterDescriptor::new("al", "autolevels", false, 1, 2, FilterFlags::LEVEL_FIX),
    FilterDescriptor::new(
        "lb",
        "linblenddeint",
        true,
        1,
        4,
        FilterFlags::LINEAR_BLEND_DEINT_FILTER,
    ),
    FilterDescriptor::new(
        "li",
        "linipoldeint",
        true,
        1,
        4,
        FilterFlags::LINEAR_IPOL_DEINT_FILTER,
    ),
    FilterDescriptor::new(
        "ci",
        "cubicipoldeint",
        true,
        1,
        4,
        FilterFlags::CUBIC_IPOL_DEINT_FILTER,
    ),
    FilterDescriptor::new("md", "mediandeint", true, 1, 4, FilterFlags::MEDIAN_DEINT_FILTER),
    FilterDescriptor::new("fd", "ffmpegdeint", true, 1, 4, FilterFlags::FFMPEG_DEINT_FILTER),
    FilterDescriptor::new("l5", "lowpass5", true, 1, 4, FilterFlags::LOWPASS5_DEINT_FILTER),
    FilterDescriptor::new("tn", "tmpnoise", true, 7, 8, FilterFlags::TEMP_NOISE_FILTER),
    FilterDescriptor::new("fq", "forcequant", true, 0, 0, FilterFlags::FORCE_QUANT),
];

pub static PRESETS: [FilterPreset; 5] = [
    FilterPreset {
        name: "default",
        expansion: "hb:a,vb:a,dr:a",
    },
    FilterPreset {
        name: "de",
        expansion: "hb:a,vb:a,dr:a",
    },
    FilterPreset {
        name: "fast",
        expansion: "h1:a,v1:a,dr:a",
    },
    FilterPreset {
        name: "fa",
        expansion: "h1:a,v1:a,dr:a",
    },
    FilterPreset {
        name: "ac",
        expansion: "ha:a:128:7,va:a,dr:a",
    },
];

/// Compiles textual filter chains into a [PostProcessMode].
///
/// Tables are plain data, a compiler can be built over custom ones.
#[derive(Debug, Copy, Clone)]
pub struct FilterChainCompiler<'a> {
    filters: &'a [FilterDescriptor],
    presets: &'a [FilterPreset],
}

impl Default for FilterChainCompiler<'static> {
    fn default() -> Self {
        FilterChainCompiler {
            filters: &FILTERS,
            presets: &PRESETS,
        }
    }
}

/// Parses a leading integer the way C `strtol` with base 0 does.
///
/// Returns `None` when no digit was consumed.
pub(crate) fn parse_leading_integer(s: &[u8]) -> Option<i32> {
    let mut i = 0usize;
    while i < s.len() && s[i].is_ascii_whitespace() {
        i += 1;
    }
    let mut negative = false;
    if i < s.len() && (s[i] == b'+' || s[i] == b'-') {
        negative = s[i] == b'-';
        i += 1;
    }
    let mut radix = 10u32;
    if i + 1 < s.len() && s[i] == b'0' && (s[i + 1] == b'x' || s[i + 1] == b'X') {
        if i + 2 < s.len() && s[i + 2].is_ascii_hexdigit() {
            radix = 16;
            i += 2;
        }
    } else if i < s.len() && s[i] == b'0' {
        radix = 8;
    }
    let start = i;
    let mut value: i64 = 0;
    while i < s.len() {
        let digit = match (s[i] as char).to_digit(radix) {
            Some(digit) => digit as i64,
            None => break,
        };
        value = (value * radix as i64 + digit).min(i32::MAX as i64 + 1);
        i += 1;
    }
    if i == start {
        return None;
    }
    let value = if negative { -value } else { value };
    Some(value.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
}

impl<'a> FilterChainCompiler<'a> {
    pub fn new(filters: &'a [FilterDescriptor], presets: &'a [FilterPreset]) -> Self {
        FilterChainCompiler { filters, presets }
    }

    /// Compiles `name` with `quality` used by every `autoq` filter.
    ///
    /// Any unknown filter, unconsumed option or preset that does not fit the
    /// working buffer rejects the whole chain.
    pub fn compile(&self, name: &str, quality: i32) -> Result<PostProcessMode, PostProcessError> {
        let mut mode = PostProcessMode::default();
        let mut errors = 0usize;

        let bytes = name.as_bytes();
        let mut buffer: Vec<u8> = bytes[..bytes.len().min(MODE_BUFFER_SIZE - 1)].to_vec();

        debug!("pp: {}", name);

        let mut pos = 0usize;
        loop {
            while pos < buffer.len() && FILTER_DELIMITERS.contains(&buffer[pos]) {
                pos += 1;
            }
            if pos >= buffer.len() {
                break;
            }
            let token_start = pos;
            while pos < buffer.len() && !FILTER_DELIMITERS.contains(&buffer[pos]) {
                pos += 1;
            }
            let token = buffer[token_start..pos].to_vec();
            let rest_start = pos;

            let mut parts = token
                .split(|&b| b == OPTION_DELIMITER)
                .filter(|part| !part.is_empty());
            let mut filter_name: &[u8] = parts.next().unwrap_or(&[]);

            debug!(
                "pp: {}::{}",
                String::from_utf8_lossy(&token),
                String::from_utf8_lossy(filter_name)
            );

            let mut enable = true;
            if let Some(stripped) = filter_name.strip_prefix(b"-") {
                enable = false;
                filter_name = stripped;
            }

            let mut q = ALWAYS_ON_QUALITY;
            let mut chrom: Option<bool> = None;
            let mut luma = true;
            let mut options: Vec<&[u8]> = Vec::with_capacity(OPTIONS_ARRAY_SIZE);

            for option in parts {
                debug!("pp: option: {}", String::from_utf8_lossy(option));
                match option {
                    b"autoq" | b"a" => q = quality,
                    b"nochrom" | b"y" => chrom = Some(false),
                    b"chrom" | b"c" => chrom = Some(true),
                    b"noluma" | b"n" => luma = false,
                    _ => options.push(option),
                }
                if options.len() >= OPTIONS_ARRAY_SIZE - 1 {
                    break;
                }
            }
            let mut unknown_options = options.len();
            let mut filter_name_ok = false;

            if let Some(preset) = self
                .presets
                .iter()
                .find(|preset| preset.name.as_bytes() == filter_name)
            {
                let expansion = preset.expansion.as_bytes();
                let tail: &[u8] = if rest_start < buffer.len() {
                    &buffer[rest_start + 1..]
                } else {
                    &[]
                };
                // The delimiter in front of the tail is always rewritten to ','.
                let tail_len = tail.len() + 1;
                if rest_start + tail_len + expansion.len() >= MODE_BUFFER_SIZE {
                    errors += 1;
                } else {
                    let mut expanded =
                        Vec::with_capacity(rest_start + expansion.len() + tail_len);
                    expanded.extend_from_slice(&buffer[..rest_start]);
                    expanded.extend_from_slice(expansion);
                    expanded.push(b',');
                    expanded.extend_from_slice(tail);
                    buffer = expanded;
                    pos = rest_start;
                    filter_name_ok = true;
                }
            }

            if let Some(filter) = self.filters.iter().find(|f| f.is_named(filter_name)) {
                mode.luma.remove(filter.mask);
                mode.chroma.remove(filter.mask);
                filter_name_ok = true;

                if enable {
                    if q >= filter.min_luma_quality && luma {
                        mode.luma.insert(filter.mask);
                    }
                    if chrom.unwrap_or(filter.chroma_default) && q >= filter.min_chroma_quality {
                        mode.chroma.insert(filter.mask);
                    }
                    unknown_options -= Self::apply_filter_options(&mut mode, filter.mask, &options);
                }
            }

            if !filter_name_ok {
                errors += 1;
            }
            errors += unknown_options;
        }

        debug!(
            "pp: lumMode={:X}, chromMode={:X}",
            mode.luma.bits(),
            mode.chroma.bits()
        );

        if errors != 0 {
            error!("{} errors in postprocess string \"{}\"", errors, name);
            return Err(PostProcessError::InvalidFilterChain(FilterChainRejection {
                errors,
                chain: name.to_string(),
            }));
        }
        Ok(mode)
    }

    /// Consumes filter specific options, returns how many were used.
    fn apply_filter_options(mode: &mut PostProcessMode, mask: FilterFlags, options: &[&[u8]]) -> usize {
        let mut consumed = 0usize;
        if mask == FilterFlags::LEVEL_FIX {
            mode.min_allowed_y = 16;
            mode.max_allowed_y = 234;
            for &option in options {
                if option == b"fullyrange" || option == b"f" {
                    mode.min_allowed_y = 0;
                    mode.max_allowed_y = 255;
                    consumed += 1;
                }
            }
        } else if mask == FilterFlags::TEMP_NOISE_FILTER {
            let mut noises = 0usize;
            for &option in options {
                if let Some(value) = parse_leading_integer(option) {
                    mode.max_tmp_noise[noises] = value;
                    noises += 1;
                    consumed += 1;
                    if noises >= 3 {
                        break;
                    }
                }
            }
        } else if mask == FilterFlags::V_DEBLOCK
            || mask == FilterFlags::H_DEBLOCK
            || mask == FilterFlags::V_A_DEBLOCK
            || mask == FilterFlags::H_A_DEBLOCK
        {
            for (index, &option) in options.iter().take(2).enumerate() {
                let Some(value) = parse_leading_integer(option) else {
                    break;
                };
                consumed += 1;
                if index == 0 {
                    mode.base_dc_diff = value;
                } else {
                    mode.flatness_threshold = value;
                }
            }
        } else if mask == FilterFlags::FORCE_QUANT {
            mode.forced_quant = 15;
            if let Some(value) = options.first().and_then(|o| parse_leading_integer(o)) {
                mode.forced_quant = value;
                consumed += 1;
            }
        }
        consumed
    }
}
