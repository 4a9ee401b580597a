//! HEVC Sequence Parameter Set (SPS) parsing

use super::ptl::{parse_profile_tier_level, parse_sub_layer_ordering, ProfileTierLevel, SubLayerOrdering};
use crate::check::Options;
use crate::error::{BitstreamError, Result};
use crate::reader::SymbolReader;

/// Largest luma width or height any level allows: Sqrt(MaxLumaPs * 8) at level 6.2
pub const MAX_PIC_DIMENSION: u32 = 16888;

/// `chroma_format_idc` names
pub const CHROMA_FORMATS: [(i64, &str); 4] = [(0, "4:0:0"), (1, "4:2:0"), (2, "4:2:2"), (3, "4:4:4")];

/// Display name of a `chroma_format_idc` value
pub fn chroma_format_name(chroma_format_idc: u8) -> &'static str {
    CHROMA_FORMATS
        .iter()
        .find(|(idc, _)| *idc == i64::from(chroma_format_idc))
        .map_or("reserved", |(_, name)| name)
}

/// SubWidthC and SubHeightC for a ChromaArrayType (Table 6-1)
fn chroma_subsampling(chroma_array_type: u8) -> (u32, u32) {
    match chroma_array_type {
        1 => (2, 2),
        2 => (2, 1),
        _ => (1, 1),
    }
}

/// Conformance cropping window, in chroma sample units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ConformanceWindow {
    pub left_offset: u32,
    pub right_offset: u32,
    pub top_offset: u32,
    pub bottom_offset: u32,
}

/// Sequence Parameter Set
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Sps {
    pub sps_video_parameter_set_id: u32,
    pub sps_max_sub_layers_minus1: u8,
    pub sps_temporal_id_nesting_flag: bool,
    pub profile_tier_level: ProfileTierLevel,
    pub sps_seq_parameter_set_id: u32,
    pub chroma_format_idc: u8,
    pub separate_colour_plane_flag: bool,
    pub pic_width_in_luma_samples: u32,
    pub pic_height_in_luma_samples: u32,
    pub conformance_window: Option<ConformanceWindow>,
    pub bit_depth_luma_minus8: u8,
    pub bit_depth_chroma_minus8: u8,
    pub log2_max_pic_order_cnt_lsb_minus4: u8,
    pub sub_layer_ordering: Vec<SubLayerOrdering>,
    pub log2_min_luma_coding_block_size_minus3: u8,
    pub log2_diff_max_min_luma_coding_block_size: u8,
    pub log2_min_luma_transform_block_size_minus2: u8,
    pub log2_diff_max_min_luma_transform_block_size: u8,
    pub max_transform_hierarchy_depth_inter: u8,
    pub max_transform_hierarchy_depth_intra: u8,
}

impl Sps {
    /// Number of bits of `slice_pic_order_cnt_lsb`
    pub fn log2_max_pic_order_cnt_lsb(&self) -> u32 {
        u32::from(self.log2_max_pic_order_cnt_lsb_minus4) + 4
    }

    /// MaxPicOrderCntLsb
    pub fn max_pic_order_cnt_lsb(&self) -> u32 {
        1 << self.log2_max_pic_order_cnt_lsb()
    }

    pub fn bit_depth_luma(&self) -> u8 {
        self.bit_depth_luma_minus8 + 8
    }

    pub fn bit_depth_chroma(&self) -> u8 {
        self.bit_depth_chroma_minus8 + 8
    }

    /// CtbLog2SizeY
    pub fn ctb_log2_size(&self) -> u32 {
        u32::from(self.log2_min_luma_coding_block_size_minus3)
            + 3
            + u32::from(self.log2_diff_max_min_luma_coding_block_size)
    }

    pub fn ctb_size(&self) -> u32 {
        1 << self.ctb_log2_size()
    }

    pub fn pic_width_in_ctbs(&self) -> u32 {
        self.pic_width_in_luma_samples.div_ceil(self.ctb_size())
    }

    pub fn pic_height_in_ctbs(&self) -> u32 {
        self.pic_height_in_luma_samples.div_ceil(self.ctb_size())
    }

    /// PicSizeInCtbsY
    pub fn pic_size_in_ctbs(&self) -> Result<u32> {
        let size = u64::from(self.pic_width_in_ctbs()) * u64::from(self.pic_height_in_ctbs());
        u32::try_from(size).map_err(|_| BitstreamError::Overflow("PicSizeInCtbsY"))
    }

    /// ChromaArrayType (0 when colour planes are coded separately)
    pub fn chroma_array_type(&self) -> u8 {
        if self.separate_colour_plane_flag {
            0
        } else {
            self.chroma_format_idc
        }
    }

    pub fn chroma_format_name(&self) -> &'static str {
        chroma_format_name(self.chroma_format_idc)
    }

    /// Output frame size after applying the conformance window
    pub fn cropped_size(&self) -> (u32, u32) {
        let Some(window) = self.conformance_window else {
            return (self.pic_width_in_luma_samples, self.pic_height_in_luma_samples);
        };
        let (sub_width, sub_height) = chroma_subsampling(self.chroma_array_type());
        let crop = |size: u32, sub: u32, first: u32, second: u32| {
            let removed = u64::from(sub) * (u64::from(first) + u64::from(second));
            u32::try_from(u64::from(size).saturating_sub(removed)).unwrap_or(size)
        };
        (
            crop(
                self.pic_width_in_luma_samples,
                sub_width,
                window.left_offset,
                window.right_offset,
            ),
            crop(
                self.pic_height_in_luma_samples,
                sub_height,
                window.top_offset,
                window.bottom_offset,
            ),
        )
    }
}

/// Parse `seq_parameter_set_rbsp()` up to `max_transform_hierarchy_depth_intra`
pub fn parse_sps(reader: &mut SymbolReader) -> Result<Sps> {
    let sps_video_parameter_set_id =
        reader.read_bits("sps_video_parameter_set_id", 4, &Options::NONE)? as u32;
    let sps_max_sub_layers_minus1 = reader.read_bits(
        "sps_max_sub_layers_minus1",
        3,
        &Options::new().with_range(0, 6),
    )? as u8;
    let sps_temporal_id_nesting_flag =
        reader.read_flag("sps_temporal_id_nesting_flag", &Options::NONE)?;

    let profile_tier_level = parse_profile_tier_level(reader, sps_max_sub_layers_minus1)?;

    let sps_seq_parameter_set_id = reader.read_ue_u32(
        "sps_seq_parameter_set_id",
        &Options::new().with_range(0, 15),
    )?;
    let chroma_format_idc = reader.read_ue(
        "chroma_format_idc",
        &Options::new()
            .with_meaning_map(CHROMA_FORMATS)
            .with_range(0, 3),
    )? as u8;
    let separate_colour_plane_flag = if chroma_format_idc == 3 {
        reader.read_flag("separate_colour_plane_flag", &Options::NONE)?
    } else {
        false
    };

    let dimension = Options::new().with_range(1, i64::from(MAX_PIC_DIMENSION));
    let pic_width_in_luma_samples = reader.read_ue_u32("pic_width_in_luma_samples", &dimension)?;
    let pic_height_in_luma_samples =
        reader.read_ue_u32("pic_height_in_luma_samples", &dimension)?;

    let conformance_window = if reader.read_flag("conformance_window_flag", &Options::NONE)? {
        // SubWidthC * (left + right) < width, likewise for the vertical offsets
        let chroma_array_type = if separate_colour_plane_flag { 0 } else { chroma_format_idc };
        let (sub_width, sub_height) = chroma_subsampling(chroma_array_type);
        let max_horizontal = i64::from((pic_width_in_luma_samples - 1) / sub_width);
        let max_vertical = i64::from((pic_height_in_luma_samples - 1) / sub_height);

        reader.enter_sub_level("conformance_window");
        let left_offset = reader.read_ue_u32(
            "conf_win_left_offset",
            &Options::new().with_max(max_horizontal),
        )?;
        let right_offset = reader.read_ue_u32(
            "conf_win_right_offset",
            &Options::new().with_max(max_horizontal - i64::from(left_offset)),
        )?;
        let top_offset = reader.read_ue_u32(
            "conf_win_top_offset",
            &Options::new().with_max(max_vertical),
        )?;
        let bottom_offset = reader.read_ue_u32(
            "conf_win_bottom_offset",
            &Options::new().with_max(max_vertical - i64::from(top_offset)),
        )?;
        reader.exit_sub_level();
        Some(ConformanceWindow {
            left_offset,
            right_offset,
            top_offset,
            bottom_offset,
        })
    } else {
        None
    };

    let bit_depth_luma_minus8 =
        reader.read_ue("bit_depth_luma_minus8", &Options::new().with_range(0, 8))? as u8;
    let bit_depth_chroma_minus8 =
        reader.read_ue("bit_depth_chroma_minus8", &Options::new().with_range(0, 8))? as u8;
    let log2_max_pic_order_cnt_lsb_minus4 = reader.read_ue(
        "log2_max_pic_order_cnt_lsb_minus4",
        &Options::new().with_range(0, 12),
    )? as u8;

    let ordering_present =
        reader.read_flag("sps_sub_layer_ordering_info_present_flag", &Options::NONE)?;
    let sub_layer_ordering =
        parse_sub_layer_ordering(reader, "sps", sps_max_sub_layers_minus1, ordering_present)?;

    let log2_min_luma_coding_block_size_minus3 = reader.read_ue(
        "log2_min_luma_coding_block_size_minus3",
        &Options::new().with_range(0, 3),
    )? as u8;
    let log2_diff_max_min_luma_coding_block_size = reader.read_ue(
        "log2_diff_max_min_luma_coding_block_size",
        &Options::new().with_range(0, 3),
    )? as u8;
    let log2_min_luma_transform_block_size_minus2 = reader.read_ue(
        "log2_min_luma_transform_block_size_minus2",
        &Options::new().with_range(0, 3),
    )? as u8;
    let log2_diff_max_min_luma_transform_block_size = reader.read_ue(
        "log2_diff_max_min_luma_transform_block_size",
        &Options::new().with_range(0, 3),
    )? as u8;

    // CtbLog2SizeY - MinTbLog2SizeY bounds the transform tree depth
    let ctb_log2 = i64::from(log2_min_luma_coding_block_size_minus3)
        + 3
        + i64::from(log2_diff_max_min_luma_coding_block_size);
    let min_tb_log2 = i64::from(log2_min_luma_transform_block_size_minus2) + 2;
    let max_depth = (ctb_log2 - min_tb_log2).max(0);
    let max_transform_hierarchy_depth_inter = reader.read_ue(
        "max_transform_hierarchy_depth_inter",
        &Options::new().with_range(0, max_depth),
    )? as u8;
    let max_transform_hierarchy_depth_intra = reader.read_ue(
        "max_transform_hierarchy_depth_intra",
        &Options::new().with_range(0, max_depth),
    )? as u8;

    Ok(Sps {
        sps_video_parameter_set_id,
        sps_max_sub_layers_minus1,
        sps_temporal_id_nesting_flag,
        profile_tier_level,
        sps_seq_parameter_set_id,
        chroma_format_idc,
        separate_colour_plane_flag,
        pic_width_in_luma_samples,
        pic_height_in_luma_samples,
        conformance_window,
        bit_depth_luma_minus8,
        bit_depth_chroma_minus8,
        log2_max_pic_order_cnt_lsb_minus4,
        sub_layer_ordering,
        log2_min_luma_coding_block_size_minus3,
        log2_diff_max_min_luma_coding_block_size,
        log2_min_luma_transform_block_size_minus2,
        log2_diff_max_min_luma_transform_block_size,
        max_transform_hierarchy_depth_inter,
        max_transform_hierarchy_depth_intra,
    })
}
