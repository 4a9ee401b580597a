//! HEVC Picture Parameter Set (PPS) parsing

use super::ParameterSets;
use crate::check::Options;
use crate::error::Result;
use crate::reader::SymbolReader;

/// Tile partitioning of a picture
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct TileLayout {
    pub num_tile_columns_minus1: u32,
    pub num_tile_rows_minus1: u32,
    pub uniform_spacing_flag: bool,
    /// Explicit sizes, empty with uniform spacing
    pub column_width_minus1: Vec<u32>,
    pub row_height_minus1: Vec<u32>,
    pub loop_filter_across_tiles_enabled_flag: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct DeblockingControl {
    pub deblocking_filter_override_enabled_flag: bool,
    pub pps_deblocking_filter_disabled_flag: bool,
    pub pps_beta_offset_div2: i32,
    pub pps_tc_offset_div2: i32,
}

/// Picture Parameter Set
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Pps {
    pub pps_pic_parameter_set_id: u32,
    pub pps_seq_parameter_set_id: u32,
    pub dependent_slice_segments_enabled_flag: bool,
    pub output_flag_present_flag: bool,
    pub num_extra_slice_header_bits: u8,
    pub sign_data_hiding_enabled_flag: bool,
    pub cabac_init_present_flag: bool,
    pub num_ref_idx_l0_default_active_minus1: u32,
    pub num_ref_idx_l1_default_active_minus1: u32,
    pub init_qp_minus26: i32,
    pub constrained_intra_pred_flag: bool,
    pub transform_skip_enabled_flag: bool,
    pub cu_qp_delta_enabled_flag: bool,
    pub diff_cu_qp_delta_depth: u32,
    pub pps_cb_qp_offset: i32,
    pub pps_cr_qp_offset: i32,
    pub pps_slice_chroma_qp_offsets_present_flag: bool,
    pub weighted_pred_flag: bool,
    pub weighted_bipred_flag: bool,
    pub transquant_bypass_enabled_flag: bool,
    pub tiles_enabled_flag: bool,
    pub entropy_coding_sync_enabled_flag: bool,
    pub tiles: Option<TileLayout>,
    pub pps_loop_filter_across_slices_enabled_flag: bool,
    pub deblocking: Option<DeblockingControl>,
}

impl Pps {
    /// SliceQpY before any slice level delta
    pub fn init_qp(&self) -> i32 {
        26 + self.init_qp_minus26
    }
}

/// Parse `pic_parameter_set_rbsp()` up to the deblocking filter control
///
/// The referenced SPS, when already known, tightens the range of
/// `init_qp_minus26` and bounds the transform and tile fields.
pub fn parse_pps(reader: &mut SymbolReader, sets: &ParameterSets) -> Result<Pps> {
    let pps_pic_parameter_set_id = reader.read_ue_u32(
        "pps_pic_parameter_set_id",
        &Options::new().with_range(0, 63),
    )?;
    let pps_seq_parameter_set_id = reader.read_ue_u32(
        "pps_seq_parameter_set_id",
        &Options::new().with_range(0, 15),
    )?;
    let sps = sets.get_sps(pps_seq_parameter_set_id);

    let dependent_slice_segments_enabled_flag =
        reader.read_flag("dependent_slice_segments_enabled_flag", &Options::NONE)?;
    let output_flag_present_flag =
        reader.read_flag("output_flag_present_flag", &Options::NONE)?;
    let num_extra_slice_header_bits =
        reader.read_bits("num_extra_slice_header_bits", 3, &Options::NONE)? as u8;
    let sign_data_hiding_enabled_flag =
        reader.read_flag("sign_data_hiding_enabled_flag", &Options::NONE)?;
    let cabac_init_present_flag = reader.read_flag("cabac_init_present_flag", &Options::NONE)?;
    let num_ref_idx_l0_default_active_minus1 = reader.read_ue_u32(
        "num_ref_idx_l0_default_active_minus1",
        &Options::new().with_range(0, 14),
    )?;
    let num_ref_idx_l1_default_active_minus1 = reader.read_ue_u32(
        "num_ref_idx_l1_default_active_minus1",
        &Options::new().with_range(0, 14),
    )?;

    let qp_bd_offset = sps.map_or(0, |sps| 6 * i64::from(sps.bit_depth_luma_minus8));
    let init_qp_minus26 = reader.read_se(
        "init_qp_minus26",
        &Options::new().with_range(-(26 + qp_bd_offset), 25),
    )? as i32;

    let constrained_intra_pred_flag =
        reader.read_flag("constrained_intra_pred_flag", &Options::NONE)?;
    let transform_skip_enabled_flag =
        reader.read_flag("transform_skip_enabled_flag", &Options::NONE)?;
    let cu_qp_delta_enabled_flag = reader.read_flag("cu_qp_delta_enabled_flag", &Options::NONE)?;
    let diff_cu_qp_delta_depth = if cu_qp_delta_enabled_flag {
        let options = match sps {
            Some(sps) => Options::new()
                .with_range(0, i64::from(sps.log2_diff_max_min_luma_coding_block_size)),
            None => Options::NONE,
        };
        reader.read_ue_u32("diff_cu_qp_delta_depth", &options)?
    } else {
        0
    };

    let pps_cb_qp_offset =
        reader.read_se("pps_cb_qp_offset", &Options::new().with_range(-12, 12))? as i32;
    let pps_cr_qp_offset =
        reader.read_se("pps_cr_qp_offset", &Options::new().with_range(-12, 12))? as i32;
    let pps_slice_chroma_qp_offsets_present_flag =
        reader.read_flag("pps_slice_chroma_qp_offsets_present_flag", &Options::NONE)?;
    let weighted_pred_flag = reader.read_flag("weighted_pred_flag", &Options::NONE)?;
    let weighted_bipred_flag = reader.read_flag("weighted_bipred_flag", &Options::NONE)?;
    let transquant_bypass_enabled_flag =
        reader.read_flag("transquant_bypass_enabled_flag", &Options::NONE)?;
    let tiles_enabled_flag = reader.read_flag("tiles_enabled_flag", &Options::NONE)?;
    let entropy_coding_sync_enabled_flag =
        reader.read_flag("entropy_coding_sync_enabled_flag", &Options::NONE)?;

    let tiles = if tiles_enabled_flag {
        reader.enter_sub_level("tiles");
        let max_columns = sps.map_or(i64::from(u32::MAX), |sps| {
            i64::from(sps.pic_width_in_ctbs()) - 1
        });
        let max_rows = sps.map_or(i64::from(u32::MAX), |sps| {
            i64::from(sps.pic_height_in_ctbs()) - 1
        });
        let num_tile_columns_minus1 = reader.read_ue_u32(
            "num_tile_columns_minus1",
            &Options::new().with_range(0, max_columns),
        )?;
        let num_tile_rows_minus1 = reader.read_ue_u32(
            "num_tile_rows_minus1",
            &Options::new().with_range(0, max_rows),
        )?;
        let uniform_spacing_flag = reader.read_flag("uniform_spacing_flag", &Options::NONE)?;

        let mut column_width_minus1 = Vec::new();
        let mut row_height_minus1 = Vec::new();
        if !uniform_spacing_flag {
            for i in 0..num_tile_columns_minus1 {
                column_width_minus1.push(
                    reader.read_ue_u32(&format!("column_width_minus1[{}]", i), &Options::NONE)?,
                );
            }
            for i in 0..num_tile_rows_minus1 {
                row_height_minus1.push(
                    reader.read_ue_u32(&format!("row_height_minus1[{}]", i), &Options::NONE)?,
                );
            }
        }
        let loop_filter_across_tiles_enabled_flag =
            reader.read_flag("loop_filter_across_tiles_enabled_flag", &Options::NONE)?;
        reader.exit_sub_level();

        Some(TileLayout {
            num_tile_columns_minus1,
            num_tile_rows_minus1,
            uniform_spacing_flag,
            column_width_minus1,
            row_height_minus1,
            loop_filter_across_tiles_enabled_flag,
        })
    } else {
        None
    };

    let pps_loop_filter_across_slices_enabled_flag =
        reader.read_flag("pps_loop_filter_across_slices_enabled_flag", &Options::NONE)?;

    let deblocking = if reader.read_flag("deblocking_filter_control_present_flag", &Options::NONE)? {
        reader.enter_sub_level("deblocking_filter_control");
        let deblocking_filter_override_enabled_flag =
            reader.read_flag("deblocking_filter_override_enabled_flag", &Options::NONE)?;
        let pps_deblocking_filter_disabled_flag =
            reader.read_flag("pps_deblocking_filter_disabled_flag", &Options::NONE)?;
        let (pps_beta_offset_div2, pps_tc_offset_div2) = if !pps_deblocking_filter_disabled_flag {
            let beta = reader.read_se("pps_beta_offset_div2", &Options::new().with_range(-6, 6))?;
            let tc = reader.read_se("pps_tc_offset_div2", &Options::new().with_range(-6, 6))?;
            (beta as i32, tc as i32)
        } else {
            (0, 0)
        };
        reader.exit_sub_level();
        Some(DeblockingControl {
            deblocking_filter_override_enabled_flag,
            pps_deblocking_filter_disabled_flag,
            pps_beta_offset_div2,
            pps_tc_offset_div2,
        })
    } else {
        None
    };

    Ok(Pps {
        pps_pic_parameter_set_id,
        pps_seq_parameter_set_id,
        dependent_slice_segments_enabled_flag,
        output_flag_present_flag,
        num_extra_slice_header_bits,
        sign_data_hiding_enabled_flag,
        cabac_init_present_flag,
        num_ref_idx_l0_default_active_minus1,
        num_ref_idx_l1_default_active_minus1,
        init_qp_minus26,
        constrained_intra_pred_flag,
        transform_skip_enabled_flag,
        cu_qp_delta_enabled_flag,
        diff_cu_qp_delta_depth,
        pps_cb_qp_offset,
        pps_cr_qp_offset,
        pps_slice_chroma_qp_offsets_present_flag,
        weighted_pred_flag,
        weighted_bipred_flag,
        transquant_bypass_enabled_flag,
        tiles_enabled_flag,
        entropy_coding_sync_enabled_flag,
        tiles,
        pps_loop_filter_across_slices_enabled_flag,
        deblocking,
    })
}
