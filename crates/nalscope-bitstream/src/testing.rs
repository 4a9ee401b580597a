//! Bitstream writers for tests and benchmarks
//!
//! Produces bit-exact HEVC parameter sets, slice headers and Annex-B
//! streams matching what the parsers in [`crate::hevc`] read.

use crate::hevc::slice::ceil_log2;

/// MSB-first bit writer
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    bytes: Vec<u8>,
    used: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_bits(&mut self, value: u64, n: usize) -> &mut Self {
        for i in (0..n).rev() {
            let bit = (value >> i) & 1 == 1;
            self.push_bit(bit);
        }
        self
    }

    pub fn put_flag(&mut self, flag: bool) -> &mut Self {
        self.push_bit(flag);
        self
    }

    pub fn put_ue(&mut self, value: u64) -> &mut Self {
        let code = value + 1;
        let len = 64 - code.leading_zeros() as usize;
        self.put_bits(0, len - 1);
        self.put_bits(code, len)
    }

    pub fn put_se(&mut self, value: i64) -> &mut Self {
        let code = if value > 0 {
            (value as u64) * 2 - 1
        } else {
            value.unsigned_abs() * 2
        };
        self.put_ue(code)
    }

    /// `rbsp_trailing_bits()`: a stop bit then zeros to the byte boundary
    pub fn put_trailing_bits(&mut self) -> &mut Self {
        self.push_bit(true);
        while !self.is_byte_aligned() {
            self.push_bit(false);
        }
        self
    }

    pub fn is_byte_aligned(&self) -> bool {
        self.used == 0
    }

    pub fn bit_len(&self) -> usize {
        if self.used == 0 {
            self.bytes.len() * 8
        } else {
            (self.bytes.len() - 1) * 8 + self.used as usize
        }
    }

    /// Finished bytes; a partial last byte is zero padded
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    fn push_bit(&mut self, bit: bool) {
        if self.used == 0 {
            self.bytes.push(0);
        }
        if bit {
            if let Some(last) = self.bytes.last_mut() {
                *last |= 0x80 >> self.used;
            }
        }
        self.used = (self.used + 1) % 8;
    }
}

/// Insert emulation prevention bytes into an RBSP
pub fn escape(rbsp: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rbsp.len() + rbsp.len() / 2);
    let mut zeros = 0;
    for &byte in rbsp {
        if zeros >= 2 && byte <= 3 {
            out.push(0x03);
            zeros = 0;
        }
        out.push(byte);
        if byte == 0 {
            zeros += 1;
        } else {
            zeros = 0;
        }
    }
    out
}

/// Two byte header plus escaped payload, without a start code
pub fn nal_unit(nal_unit_type: u8, temporal_id_plus1: u8, rbsp: &[u8]) -> Vec<u8> {
    let mut unit = vec![(nal_unit_type & 0x3F) << 1, temporal_id_plus1 & 0x07];
    unit.extend_from_slice(&escape(rbsp));
    unit
}

/// Annex-B byte stream assembled from NAL units
#[derive(Debug, Default, Clone)]
pub struct StreamBuilder {
    data: Vec<u8>,
}

impl StreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a unit behind a three byte start code
    pub fn unit(mut self, unit: &[u8]) -> Self {
        self.data.extend_from_slice(&[0, 0, 1]);
        self.data.extend_from_slice(unit);
        self
    }

    /// Append a unit behind a four byte start code (`zero_byte` + prefix)
    pub fn long_unit(mut self, unit: &[u8]) -> Self {
        self.data.extend_from_slice(&[0, 0, 0, 1]);
        self.data.extend_from_slice(unit);
        self
    }

    /// Append raw bytes, e.g. garbage or `trailing_zero_8bits`
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.data.extend_from_slice(bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn build(self) -> Vec<u8> {
        self.data
    }
}

fn put_profile_tier_level(w: &mut BitWriter, max_sub_layers_minus1: u8) {
    w.put_bits(0, 2); // general_profile_space
    w.put_flag(false); // general_tier_flag
    w.put_bits(1, 5); // general_profile_idc: Main
    w.put_bits(0x6000_0000, 32);
    w.put_flag(true).put_flag(false).put_flag(false).put_flag(true);
    w.put_bits(0, 43).put_bits(0, 1);
    w.put_bits(93, 8); // level 3.1
    for _ in 0..max_sub_layers_minus1 {
        w.put_flag(false).put_flag(false);
    }
    if max_sub_layers_minus1 > 0 {
        for _ in max_sub_layers_minus1..8 {
            w.put_bits(0, 2);
        }
    }
}

fn put_sub_layer_ordering(w: &mut BitWriter, max_sub_layers_minus1: u8) {
    w.put_flag(true);
    for _ in 0..=max_sub_layers_minus1 {
        w.put_ue(4).put_ue(2).put_ue(0);
    }
}

#[derive(Debug, Clone)]
pub struct VpsParams {
    pub vps_id: u8,
    pub max_sub_layers_minus1: u8,
    /// `(num_units_in_tick, time_scale)`
    pub timing: Option<(u32, u32)>,
}

impl Default for VpsParams {
    fn default() -> Self {
        Self {
            vps_id: 0,
            max_sub_layers_minus1: 0,
            timing: None,
        }
    }
}

pub fn write_vps(params: &VpsParams) -> Vec<u8> {
    let mut w = BitWriter::new();
    w.put_bits(u64::from(params.vps_id), 4);
    w.put_flag(true).put_flag(true);
    w.put_bits(0, 6);
    w.put_bits(u64::from(params.max_sub_layers_minus1), 3);
    w.put_flag(true);
    w.put_bits(0xFFFF, 16);
    put_profile_tier_level(&mut w, params.max_sub_layers_minus1);
    put_sub_layer_ordering(&mut w, params.max_sub_layers_minus1);
    w.put_bits(0, 6); // vps_max_layer_id
    w.put_ue(0); // vps_num_layer_sets_minus1
    match params.timing {
        Some((num_units_in_tick, time_scale)) => {
            w.put_flag(true);
            w.put_bits(u64::from(num_units_in_tick), 32);
            w.put_bits(u64::from(time_scale), 32);
            w.put_flag(false);
            w.put_ue(0);
        }
        None => {
            w.put_flag(false);
        }
    }
    w.put_flag(false); // vps_extension_flag
    w.put_trailing_bits();
    w.into_bytes()
}

#[derive(Debug, Clone)]
pub struct SpsParams {
    pub sps_id: u8,
    pub vps_id: u8,
    pub max_sub_layers_minus1: u8,
    pub chroma_format_idc: u8,
    pub width: u32,
    pub height: u32,
    /// left, right, top, bottom
    pub conformance_window: Option<[u32; 4]>,
    pub bit_depth_luma_minus8: u8,
    pub log2_max_pic_order_cnt_lsb_minus4: u8,
    pub log2_min_luma_coding_block_size_minus3: u8,
    pub log2_diff_max_min_luma_coding_block_size: u8,
}

impl Default for SpsParams {
    fn default() -> Self {
        Self {
            sps_id: 0,
            vps_id: 0,
            max_sub_layers_minus1: 0,
            chroma_format_idc: 1,
            width: 64,
            height: 64,
            conformance_window: None,
            bit_depth_luma_minus8: 0,
            log2_max_pic_order_cnt_lsb_minus4: 0,
            log2_min_luma_coding_block_size_minus3: 0,
            log2_diff_max_min_luma_coding_block_size: 1,
        }
    }
}

impl SpsParams {
    fn ctb_log2(&self) -> u32 {
        u32::from(self.log2_min_luma_coding_block_size_minus3)
            + 3
            + u32::from(self.log2_diff_max_min_luma_coding_block_size)
    }

    pub fn pic_size_in_ctbs(&self) -> u32 {
        let ctb = 1 << self.ctb_log2();
        let size = u64::from(self.width.div_ceil(ctb)) * u64::from(self.height.div_ceil(ctb));
        u32::try_from(size).unwrap_or(u32::MAX)
    }

    pub fn log2_max_pic_order_cnt_lsb(&self) -> usize {
        usize::from(self.log2_max_pic_order_cnt_lsb_minus4) + 4
    }
}

pub fn write_sps(params: &SpsParams) -> Vec<u8> {
    let mut w = BitWriter::new();
    w.put_bits(u64::from(params.vps_id), 4);
    w.put_bits(u64::from(params.max_sub_layers_minus1), 3);
    w.put_flag(true);
    put_profile_tier_level(&mut w, params.max_sub_layers_minus1);
    w.put_ue(u64::from(params.sps_id));
    w.put_ue(u64::from(params.chroma_format_idc));
    if params.chroma_format_idc == 3 {
        w.put_flag(false);
    }
    w.put_ue(u64::from(params.width));
    w.put_ue(u64::from(params.height));
    match params.conformance_window {
        Some(offsets) => {
            w.put_flag(true);
            for offset in offsets {
                w.put_ue(u64::from(offset));
            }
        }
        None => {
            w.put_flag(false);
        }
    }
    w.put_ue(u64::from(params.bit_depth_luma_minus8));
    w.put_ue(u64::from(params.bit_depth_luma_minus8));
    w.put_ue(u64::from(params.log2_max_pic_order_cnt_lsb_minus4));
    put_sub_layer_ordering(&mut w, params.max_sub_layers_minus1);
    w.put_ue(u64::from(params.log2_min_luma_coding_block_size_minus3));
    w.put_ue(u64::from(params.log2_diff_max_min_luma_coding_block_size));
    let ctb_log2 = params.ctb_log2();
    w.put_ue(0); // log2_min_luma_transform_block_size_minus2
    w.put_ue(u64::from(ctb_log2.min(5) - 2));
    w.put_ue(1).put_ue(1);
    // scaling lists, AMP, SAO, PCM and the rest are not parsed
    w.put_flag(false);
    w.put_trailing_bits();
    w.into_bytes()
}

#[derive(Debug, Clone)]
pub struct PpsParams {
    pub pps_id: u8,
    pub sps_id: u8,
    pub dependent_slice_segments_enabled: bool,
    pub output_flag_present: bool,
    pub num_extra_slice_header_bits: u8,
    pub init_qp_minus26: i64,
    /// `(num_tile_columns_minus1, num_tile_rows_minus1)` with uniform spacing
    pub tiles: Option<(u32, u32)>,
    /// `(beta_offset_div2, tc_offset_div2)`
    pub deblocking: Option<(i64, i64)>,
}

impl Default for PpsParams {
    fn default() -> Self {
        Self {
            pps_id: 0,
            sps_id: 0,
            dependent_slice_segments_enabled: false,
            output_flag_present: false,
            num_extra_slice_header_bits: 0,
            init_qp_minus26: 0,
            tiles: None,
            deblocking: None,
        }
    }
}

pub fn write_pps(params: &PpsParams) -> Vec<u8> {
    let mut w = BitWriter::new();
    w.put_ue(u64::from(params.pps_id));
    w.put_ue(u64::from(params.sps_id));
    w.put_flag(params.dependent_slice_segments_enabled);
    w.put_flag(params.output_flag_present);
    w.put_bits(u64::from(params.num_extra_slice_header_bits), 3);
    w.put_flag(false).put_flag(false);
    w.put_ue(0).put_ue(0);
    w.put_se(params.init_qp_minus26);
    w.put_flag(false).put_flag(false);
    w.put_flag(false); // cu_qp_delta_enabled_flag
    w.put_se(0).put_se(0);
    w.put_flag(false).put_flag(false).put_flag(false).put_flag(false);
    w.put_flag(params.tiles.is_some());
    w.put_flag(false);
    if let Some((columns, rows)) = params.tiles {
        w.put_ue(u64::from(columns)).put_ue(u64::from(rows));
        w.put_flag(true).put_flag(true);
    }
    w.put_flag(true);
    match params.deblocking {
        Some((beta, tc)) => {
            w.put_flag(true);
            w.put_flag(false).put_flag(false);
            w.put_se(beta).put_se(tc);
        }
        None => {
            w.put_flag(false);
        }
    }
    w.put_flag(false).put_flag(false); // scaling list, lists_modification_present
    w.put_ue(0); // log2_parallel_merge_level_minus2
    w.put_flag(false).put_flag(false);
    w.put_trailing_bits();
    w.into_bytes()
}

#[derive(Debug, Clone)]
pub struct SliceParams {
    pub nal_unit_type: u8,
    pub first_slice_segment_in_pic: bool,
    pub pps_id: u8,
    pub dependent_slice_segment: bool,
    pub slice_segment_address: u32,
    pub slice_type: u8,
    pub pic_order_cnt_lsb: u32,
}

impl Default for SliceParams {
    fn default() -> Self {
        Self {
            nal_unit_type: 1,
            first_slice_segment_in_pic: true,
            pps_id: 0,
            dependent_slice_segment: false,
            slice_segment_address: 0,
            slice_type: 1,
            pic_order_cnt_lsb: 0,
        }
    }
}

/// Slice segment header followed by a few filler bytes of slice data
pub fn write_slice(params: &SliceParams, sps: &SpsParams, pps: &PpsParams) -> Vec<u8> {
    let mut w = BitWriter::new();
    w.put_flag(params.first_slice_segment_in_pic);
    if (16..=23).contains(&params.nal_unit_type) {
        w.put_flag(false);
    }
    w.put_ue(u64::from(params.pps_id));
    let mut dependent = false;
    if !params.first_slice_segment_in_pic {
        if pps.dependent_slice_segments_enabled {
            dependent = params.dependent_slice_segment;
            w.put_flag(dependent);
        }
        w.put_bits(
            u64::from(params.slice_segment_address),
            ceil_log2(sps.pic_size_in_ctbs()),
        );
    }
    if !dependent {
        for _ in 0..pps.num_extra_slice_header_bits {
            w.put_flag(false);
        }
        w.put_ue(u64::from(params.slice_type));
        if pps.output_flag_present {
            w.put_flag(true);
        }
        if !matches!(params.nal_unit_type, 19 | 20) {
            w.put_bits(
                u64::from(params.pic_order_cnt_lsb),
                sps.log2_max_pic_order_cnt_lsb(),
            );
        }
    }
    w.put_trailing_bits();
    w.put_bits(0xA5C3, 16);
    w.into_bytes()
}

pub fn vps_unit(params: &VpsParams) -> Vec<u8> {
    nal_unit(32, 1, &write_vps(params))
}

pub fn sps_unit(params: &SpsParams) -> Vec<u8> {
    nal_unit(33, 1, &write_sps(params))
}

pub fn pps_unit(params: &PpsParams) -> Vec<u8> {
    nal_unit(34, 1, &write_pps(params))
}

pub fn slice_unit(params: &SliceParams, sps: &SpsParams, pps: &PpsParams) -> Vec<u8> {
    nal_unit(params.nal_unit_type, 1, &write_slice(params, sps, pps))
}

/// Parameter sets followed by one single-slice picture per `(nal_unit_type, lsb)`
pub fn simple_stream(pictures: &[(u8, u32)]) -> Vec<u8> {
    let sps = SpsParams::default();
    let pps = PpsParams::default();
    let mut stream = StreamBuilder::new()
        .long_unit(&vps_unit(&VpsParams::default()))
        .long_unit(&sps_unit(&sps))
        .long_unit(&pps_unit(&pps));
    for &(nal_unit_type, lsb) in pictures {
        let slice = SliceParams {
            nal_unit_type,
            slice_type: if (16..=23).contains(&nal_unit_type) { 2 } else { 1 },
            pic_order_cnt_lsb: lsb,
            ..Default::default()
        };
        stream = stream.unit(&slice_unit(&slice, &sps, &pps));
    }
    stream.build()
}
