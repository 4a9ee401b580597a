//! HEVC profile_tier_level() and sub-layer ordering info

use crate::check::Options;
use crate::error::Result;
use crate::reader::SymbolReader;

/// Profile fields shared by the general and sub-layer parts
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ProfileInfo {
    pub profile_space: u8,
    pub tier_flag: bool,
    pub profile_idc: u8,
    pub profile_compatibility_flags: u32,
    pub progressive_source_flag: bool,
    pub interlaced_source_flag: bool,
    pub non_packed_constraint_flag: bool,
    pub frame_only_constraint_flag: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct SubLayerInfo {
    pub profile: Option<ProfileInfo>,
    pub level_idc: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ProfileTierLevel {
    pub general: ProfileInfo,
    pub general_level_idc: u8,
    pub sub_layers: Vec<SubLayerInfo>,
}

impl ProfileTierLevel {
    /// Level as a decimal number (general_level_idc is 30 times the level)
    pub fn level(&self) -> f32 {
        f32::from(self.general_level_idc) / 30.0
    }
}

fn profile_options() -> Options {
    Options::new().with_meaning_map([
        (1, "Main"),
        (2, "Main 10"),
        (3, "Main Still Picture"),
        (4, "Format Range Extensions"),
        (5, "High Throughput"),
        (6, "Multiview Main"),
        (7, "Scalable Main"),
        (8, "3D Main"),
        (9, "Screen Content Coding Extensions"),
    ])
}

fn parse_profile(reader: &mut SymbolReader, prefix: &str) -> Result<ProfileInfo> {
    let profile_space =
        reader.read_bits(&format!("{}_profile_space", prefix), 2, &Options::NONE)? as u8;
    let tier_flag = reader.read_flag(
        &format!("{}_tier_flag", prefix),
        &Options::new().with_meaning_map([(0, "Main tier"), (1, "High tier")]),
    )?;
    let profile_idc =
        reader.read_bits(&format!("{}_profile_idc", prefix), 5, &profile_options())? as u8;
    let profile_compatibility_flags = reader.read_bits(
        &format!("{}_profile_compatibility_flags", prefix),
        32,
        &Options::NONE,
    )? as u32;
    let progressive_source_flag =
        reader.read_flag(&format!("{}_progressive_source_flag", prefix), &Options::NONE)?;
    let interlaced_source_flag =
        reader.read_flag(&format!("{}_interlaced_source_flag", prefix), &Options::NONE)?;
    let non_packed_constraint_flag =
        reader.read_flag(&format!("{}_non_packed_constraint_flag", prefix), &Options::NONE)?;
    let frame_only_constraint_flag =
        reader.read_flag(&format!("{}_frame_only_constraint_flag", prefix), &Options::NONE)?;
    // Constraint flags whose layout depends on the profile
    reader.read_bits(&format!("{}_reserved_zero_43bits", prefix), 43, &Options::NONE)?;
    reader.read_flag(&format!("{}_reserved_zero_bit", prefix), &Options::NONE)?;

    Ok(ProfileInfo {
        profile_space,
        tier_flag,
        profile_idc,
        profile_compatibility_flags,
        progressive_source_flag,
        interlaced_source_flag,
        non_packed_constraint_flag,
        frame_only_constraint_flag,
    })
}

/// Parse `profile_tier_level(1, max_sub_layers_minus1)`
pub fn parse_profile_tier_level(
    reader: &mut SymbolReader,
    max_sub_layers_minus1: u8,
) -> Result<ProfileTierLevel> {
    reader.enter_sub_level("profile_tier_level");

    let general = parse_profile(reader, "general")?;
    let general_level_idc = reader.read_bits(
        "general_level_idc",
        8,
        &Options::new().with_meaning("Level times 30"),
    )? as u8;

    let count = max_sub_layers_minus1 as usize;
    let mut present = Vec::with_capacity(count);
    for i in 0..count {
        let profile =
            reader.read_flag(&format!("sub_layer_profile_present_flag[{}]", i), &Options::NONE)?;
        let level =
            reader.read_flag(&format!("sub_layer_level_present_flag[{}]", i), &Options::NONE)?;
        present.push((profile, level));
    }

    if count > 0 {
        for i in count..8 {
            reader.read_bits(
                &format!("reserved_zero_2bits[{}]", i),
                2,
                &Options::new().with_equal(0),
            )?;
        }
    }

    let mut sub_layers = Vec::with_capacity(count);
    for (i, &(profile_present, level_present)) in present.iter().enumerate() {
        reader.enter_sub_level(&format!("sub_layer {}", i));
        let profile = if profile_present {
            Some(parse_profile(reader, "sub_layer")?)
        } else {
            None
        };
        let level_idc = if level_present {
            Some(reader.read_bits("sub_layer_level_idc", 8, &Options::NONE)? as u8)
        } else {
            None
        };
        reader.exit_sub_level();
        sub_layers.push(SubLayerInfo { profile, level_idc });
    }

    reader.exit_sub_level();

    Ok(ProfileTierLevel {
        general,
        general_level_idc,
        sub_layers,
    })
}

/// DPB sizing for one temporal sub-layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct SubLayerOrdering {
    pub max_dec_pic_buffering_minus1: u32,
    pub max_num_reorder_pics: u32,
    pub max_latency_increase_plus1: u32,
}

/// Parse the sub-layer ordering loop shared by VPS and SPS
///
/// When the info is not present for every sub-layer only the highest one is
/// signalled; the returned vector then holds a single entry.
pub fn parse_sub_layer_ordering(
    reader: &mut SymbolReader,
    prefix: &str,
    max_sub_layers_minus1: u8,
    info_present: bool,
) -> Result<Vec<SubLayerOrdering>> {
    let start = if info_present { 0 } else { max_sub_layers_minus1 };
    let mut ordering = Vec::new();

    for i in start..=max_sub_layers_minus1 {
        let max_dec_pic_buffering_minus1 = reader.read_ue_u32(
            &format!("{}_max_dec_pic_buffering_minus1[{}]", prefix, i),
            &Options::new().with_max(15),
        )?;
        let max_num_reorder_pics = reader.read_ue_u32(
            &format!("{}_max_num_reorder_pics[{}]", prefix, i),
            &Options::new().with_max(i64::from(max_dec_pic_buffering_minus1)),
        )?;
        let max_latency_increase_plus1 = reader.read_ue_u32(
            &format!("{}_max_latency_increase_plus1[{}]", prefix, i),
            &Options::new().with_max(i64::from(u32::MAX) - 1),
        )?;
        ordering.push(SubLayerOrdering {
            max_dec_pic_buffering_minus1,
            max_num_reorder_pics,
            max_latency_increase_plus1,
        });
    }

    Ok(ordering)
}
