//! HEVC Video Parameter Set (VPS) parsing

use super::ptl::{parse_profile_tier_level, parse_sub_layer_ordering, ProfileTierLevel, SubLayerOrdering};
use crate::check::Options;
use crate::error::Result;
use crate::reader::SymbolReader;

/// VPS timing information
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct VpsTiming {
    pub num_units_in_tick: u32,
    pub time_scale: u32,
    pub num_ticks_poc_diff_one_minus1: Option<u32>,
    pub num_hrd_parameters: u32,
}

impl VpsTiming {
    /// Pictures per second implied by the tick length
    pub fn frame_rate(&self) -> Option<f64> {
        if self.num_units_in_tick == 0 {
            return None;
        }
        Some(f64::from(self.time_scale) / f64::from(self.num_units_in_tick))
    }
}

/// Video Parameter Set
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Vps {
    pub vps_video_parameter_set_id: u32,
    pub vps_base_layer_internal_flag: bool,
    pub vps_base_layer_available_flag: bool,
    /// Greater than zero for scalable or multiview streams
    pub vps_max_layers_minus1: u8,
    pub vps_max_sub_layers_minus1: u8,
    pub vps_temporal_id_nesting_flag: bool,
    pub profile_tier_level: ProfileTierLevel,
    pub sub_layer_ordering: Vec<SubLayerOrdering>,
    pub vps_max_layer_id: u8,
    pub vps_num_layer_sets_minus1: u32,
    /// `layer_id_included_flag` per layer set, starting at layer set 1
    pub layer_id_included: Vec<Vec<bool>>,
    pub timing: Option<VpsTiming>,
}

/// Parse `video_parameter_set_rbsp()` up to the HRD parameters
pub fn parse_vps(reader: &mut SymbolReader) -> Result<Vps> {
    let vps_video_parameter_set_id =
        reader.read_bits("vps_video_parameter_set_id", 4, &Options::NONE)? as u32;
    let vps_base_layer_internal_flag =
        reader.read_flag("vps_base_layer_internal_flag", &Options::NONE)?;
    let vps_base_layer_available_flag =
        reader.read_flag("vps_base_layer_available_flag", &Options::NONE)?;
    let vps_max_layers_minus1 = reader.read_bits(
        "vps_max_layers_minus1",
        6,
        &Options::new().with_meaning("Number of layers minus 1"),
    )? as u8;
    let vps_max_sub_layers_minus1 = reader.read_bits(
        "vps_max_sub_layers_minus1",
        3,
        &Options::new().with_range(0, 6),
    )? as u8;
    let vps_temporal_id_nesting_flag =
        reader.read_flag("vps_temporal_id_nesting_flag", &Options::NONE)?;
    reader.read_bits(
        "vps_reserved_0xffff_16bits",
        16,
        &Options::new().with_equal(0xFFFF),
    )?;

    let profile_tier_level = parse_profile_tier_level(reader, vps_max_sub_layers_minus1)?;

    let ordering_present =
        reader.read_flag("vps_sub_layer_ordering_info_present_flag", &Options::NONE)?;
    let sub_layer_ordering =
        parse_sub_layer_ordering(reader, "vps", vps_max_sub_layers_minus1, ordering_present)?;

    let vps_max_layer_id =
        reader.read_bits("vps_max_layer_id", 6, &Options::new().with_range(0, 62))? as u8;
    let vps_num_layer_sets_minus1 = reader.read_ue_u32(
        "vps_num_layer_sets_minus1",
        &Options::new().with_range(0, 1023),
    )?;

    let mut layer_id_included = Vec::with_capacity(vps_num_layer_sets_minus1 as usize);
    for i in 1..=vps_num_layer_sets_minus1 {
        reader.enter_sub_level(&format!("layer_set {}", i));
        let mut flags = Vec::with_capacity(vps_max_layer_id as usize + 1);
        for j in 0..=vps_max_layer_id {
            flags.push(reader.read_flag(
                &format!("layer_id_included_flag[{}][{}]", i, j),
                &Options::NONE,
            )?);
        }
        reader.exit_sub_level();
        layer_id_included.push(flags);
    }

    let timing_present = reader.read_flag("vps_timing_info_present_flag", &Options::NONE)?;
    let timing = if timing_present {
        let num_units_in_tick = reader.read_bits(
            "vps_num_units_in_tick",
            32,
            &Options::new().with_min(1),
        )? as u32;
        let time_scale =
            reader.read_bits("vps_time_scale", 32, &Options::new().with_min(1))? as u32;
        let poc_proportional =
            reader.read_flag("vps_poc_proportional_to_timing_flag", &Options::NONE)?;
        let num_ticks_poc_diff_one_minus1 = if poc_proportional {
            Some(reader.read_ue_u32(
                "vps_num_ticks_poc_diff_one_minus1",
                &Options::new().with_max(i64::from(u32::MAX) - 1),
            )?)
        } else {
            None
        };
        let num_hrd_parameters = reader.read_ue_u32(
            "vps_num_hrd_parameters",
            &Options::new().with_max(i64::from(vps_num_layer_sets_minus1) + 1),
        )?;
        Some(VpsTiming {
            num_units_in_tick,
            time_scale,
            num_ticks_poc_diff_one_minus1,
            num_hrd_parameters,
        })
    } else {
        None
    };

    Ok(Vps {
        vps_video_parameter_set_id,
        vps_base_layer_internal_flag,
        vps_base_layer_available_flag,
        vps_max_layers_minus1,
        vps_max_sub_layers_minus1,
        vps_temporal_id_nesting_flag,
        profile_tier_level,
        sub_layer_ordering,
        vps_max_layer_id,
        vps_num_layer_sets_minus1,
        layer_id_included,
        timing,
    })
}
