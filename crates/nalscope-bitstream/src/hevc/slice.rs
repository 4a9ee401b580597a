//! HEVC slice segment header parsing

use super::nal::NalHeader;
use super::ParameterSets;
use crate::check::Options;
use crate::error::{BitstreamError, Result};
use crate::reader::SymbolReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum SliceType {
    B,
    P,
    I,
}

impl SliceType {
    pub fn from_u64(value: u64) -> Option<Self> {
        match value {
            0 => Some(SliceType::B),
            1 => Some(SliceType::P),
            2 => Some(SliceType::I),
            _ => None,
        }
    }
}

/// Fields of `slice_segment_header()` up to `slice_pic_order_cnt_lsb`
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct SliceHeader {
    pub first_slice_segment_in_pic_flag: bool,
    pub no_output_of_prior_pics_flag: Option<bool>,
    pub slice_pic_parameter_set_id: u32,
    /// SPS resolved through the PPS
    pub seq_parameter_set_id: u32,
    pub dependent_slice_segment_flag: bool,
    pub slice_segment_address: u32,
    /// Absent for dependent slice segments
    pub slice_type: Option<SliceType>,
    pub pic_output_flag: bool,
    pub colour_plane_id: Option<u8>,
    /// Inferred as 0 for IDR pictures, absent for dependent slice segments
    pub slice_pic_order_cnt_lsb: Option<u32>,
    /// Width of `slice_pic_order_cnt_lsb` in the active SPS
    pub log2_max_pic_order_cnt_lsb: u32,
}

/// A parsed slice segment together with its computed picture order
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Slice {
    pub header: SliceHeader,
    pub pic_order_cnt_msb: Option<i32>,
    pub pic_order_cnt_val: Option<i32>,
}

/// Ceil(Log2(value)), 0 for values up to 1
pub(crate) fn ceil_log2(value: u32) -> usize {
    if value <= 1 {
        0
    } else {
        (u32::BITS - (value - 1).leading_zeros()) as usize
    }
}

/// Parse a slice segment header, resolving its PPS and SPS from `sets`
pub fn parse_slice_header(
    reader: &mut SymbolReader,
    nal: &NalHeader,
    sets: &ParameterSets,
) -> Result<SliceHeader> {
    let nal_type = nal.nal_unit_type;

    let first_slice_segment_in_pic_flag =
        reader.read_flag("first_slice_segment_in_pic_flag", &Options::NONE)?;
    let no_output_of_prior_pics_flag = if nal_type.is_irap() {
        Some(reader.read_flag("no_output_of_prior_pics_flag", &Options::NONE)?)
    } else {
        None
    };
    let slice_pic_parameter_set_id = reader.read_ue_u32(
        "slice_pic_parameter_set_id",
        &Options::new().with_range(0, 63),
    )?;

    let pps = sets
        .get_pps(slice_pic_parameter_set_id)
        .ok_or(BitstreamError::MissingReference {
            kind: "PPS",
            id: u64::from(slice_pic_parameter_set_id),
        })?;
    let sps = sets
        .get_sps(pps.pps_seq_parameter_set_id)
        .ok_or(BitstreamError::MissingReference {
            kind: "SPS",
            id: u64::from(pps.pps_seq_parameter_set_id),
        })?;

    let mut dependent_slice_segment_flag = false;
    let mut slice_segment_address = 0;
    if !first_slice_segment_in_pic_flag {
        if pps.dependent_slice_segments_enabled_flag {
            dependent_slice_segment_flag =
                reader.read_flag("dependent_slice_segment_flag", &Options::NONE)?;
        }
        let pic_size = sps.pic_size_in_ctbs()?;
        slice_segment_address = reader.read_bits(
            "slice_segment_address",
            ceil_log2(pic_size),
            &Options::new().with_range(0, i64::from(pic_size) - 1),
        )? as u32;
    }

    let mut slice_type = None;
    let mut pic_output_flag = true;
    let mut colour_plane_id = None;
    let mut slice_pic_order_cnt_lsb = None;
    if !dependent_slice_segment_flag {
        for i in 0..pps.num_extra_slice_header_bits {
            reader.read_flag(&format!("slice_reserved_flag[{}]", i), &Options::NONE)?;
        }
        let raw_type = reader.read_ue(
            "slice_type",
            &Options::new()
                .with_meaning_map([(0, "B"), (1, "P"), (2, "I")])
                .with_range(0, 2),
        )?;
        slice_type = SliceType::from_u64(raw_type);
        if pps.output_flag_present_flag {
            pic_output_flag = reader.read_flag("pic_output_flag", &Options::NONE)?;
        }
        if sps.separate_colour_plane_flag {
            colour_plane_id = Some(
                reader.read_bits("colour_plane_id", 2, &Options::new().with_range(0, 2))? as u8,
            );
        }
        slice_pic_order_cnt_lsb = if nal_type.is_idr() {
            Some(0)
        } else {
            Some(reader.read_bits(
                "slice_pic_order_cnt_lsb",
                sps.log2_max_pic_order_cnt_lsb() as usize,
                &Options::NONE,
            )? as u32)
        };
    }

    Ok(SliceHeader {
        first_slice_segment_in_pic_flag,
        no_output_of_prior_pics_flag,
        slice_pic_parameter_set_id,
        seq_parameter_set_id: pps.pps_seq_parameter_set_id,
        dependent_slice_segment_flag,
        slice_segment_address,
        slice_type,
        pic_output_flag,
        colour_plane_id,
        slice_pic_order_cnt_lsb,
        log2_max_pic_order_cnt_lsb: sps.log2_max_pic_order_cnt_lsb(),
    })
}
