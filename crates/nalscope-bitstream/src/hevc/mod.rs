//! HEVC (H.265) syntax
//!
//! NAL unit classification, parameter sets, slice segment headers and
//! picture order count derivation. Parsers take a [`SymbolReader`] and the
//! active [`ParameterSets`] and return plain records.
//!
//! [`SymbolReader`]: crate::reader::SymbolReader

pub mod nal;
pub mod poc;
pub mod pps;
pub mod ptl;
pub mod slice;
pub mod sps;
pub mod vps;

pub use nal::{NalHeader, NalUnit, NalUnitType};
pub use poc::{DecodingOrderTracker, PicOrder, TrackerState};
pub use pps::{parse_pps, Pps};
pub use slice::{parse_slice_header, Slice, SliceHeader, SliceType};
pub use sps::{chroma_format_name, parse_sps, ConformanceWindow, Sps, MAX_PIC_DIMENSION};
pub use vps::{parse_vps, Vps};

use std::collections::BTreeMap;

/// Active parameter sets, keyed by id
///
/// Inserting a set with an id already present replaces the old one.
#[derive(Debug, Clone, Default)]
pub struct ParameterSets {
    vps: BTreeMap<u32, Vps>,
    sps: BTreeMap<u32, Sps>,
    pps: BTreeMap<u32, Pps>,
}

impl ParameterSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the replaced VPS, if any
    pub fn insert_vps(&mut self, vps: Vps) -> Option<Vps> {
        self.vps.insert(vps.vps_video_parameter_set_id, vps)
    }

    pub fn insert_sps(&mut self, sps: Sps) -> Option<Sps> {
        self.sps.insert(sps.sps_seq_parameter_set_id, sps)
    }

    pub fn insert_pps(&mut self, pps: Pps) -> Option<Pps> {
        self.pps.insert(pps.pps_pic_parameter_set_id, pps)
    }

    pub fn get_vps(&self, id: u32) -> Option<&Vps> {
        self.vps.get(&id)
    }

    pub fn get_sps(&self, id: u32) -> Option<&Sps> {
        self.sps.get(&id)
    }

    pub fn get_pps(&self, id: u32) -> Option<&Pps> {
        self.pps.get(&id)
    }

    pub fn vps_count(&self) -> usize {
        self.vps.len()
    }

    pub fn sps_count(&self) -> usize {
        self.sps.len()
    }

    pub fn pps_count(&self) -> usize {
        self.pps.len()
    }

    pub fn sps_iter(&self) -> impl Iterator<Item = &Sps> {
        self.sps.values()
    }

    pub fn is_empty(&self) -> bool {
        self.vps.is_empty() && self.sps.is_empty() && self.pps.is_empty()
    }

    pub fn clear(&mut self) {
        self.vps.clear();
        self.sps.clear();
        self.pps.clear();
    }
}

/// Result of parsing one NAL unit
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "serialize", serde(tag = "kind", rename_all = "snake_case"))]
pub enum ParsedUnit {
    Vps(Box<Vps>),
    Sps(Box<Sps>),
    Pps(Box<Pps>),
    Slice(Box<Slice>),
    /// Units whose payload is not parsed (SEI, AUD, EOS, ...)
    Other { nal_unit_type: NalUnitType },
}

impl ParsedUnit {
    pub fn kind(&self) -> &'static str {
        match self {
            ParsedUnit::Vps(_) => "VPS",
            ParsedUnit::Sps(_) => "SPS",
            ParsedUnit::Pps(_) => "PPS",
            ParsedUnit::Slice(_) => "Slice",
            ParsedUnit::Other { .. } => "Other",
        }
    }

    pub fn as_slice(&self) -> Option<&Slice> {
        match self {
            ParsedUnit::Slice(slice) => Some(slice),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitCursor;
    use crate::error::BitstreamError;
    use crate::reader::SymbolReader;
    use crate::testing::*;
    use crate::tree::SyntaxTree;
    use assert_matches::assert_matches;

    fn reader(rbsp: Vec<u8>) -> SymbolReader<'static> {
        SymbolReader::new(BitCursor::from_rbsp(rbsp))
    }

    fn sets_with(sps: &SpsParams, pps: &PpsParams) -> ParameterSets {
        let mut sets = ParameterSets::new();
        sets.insert_sps(parse_sps(&mut reader(write_sps(sps))).unwrap());
        let parsed = parse_pps(&mut reader(write_pps(pps)), &sets).unwrap();
        sets.insert_pps(parsed);
        sets
    }

    #[test]
    fn test_parse_vps_with_timing() {
        let params = VpsParams {
            vps_id: 3,
            max_sub_layers_minus1: 2,
            timing: Some((1001, 60000)),
        };
        let vps = parse_vps(&mut reader(write_vps(&params))).unwrap();
        assert_eq!(vps.vps_video_parameter_set_id, 3);
        assert_eq!(vps.vps_max_sub_layers_minus1, 2);
        assert_eq!(vps.profile_tier_level.general.profile_idc, 1);
        assert_eq!(vps.profile_tier_level.sub_layers.len(), 2);
        assert_eq!(vps.sub_layer_ordering.len(), 3);
        let timing = vps.timing.unwrap();
        assert_eq!(timing.time_scale, 60000);
        assert!((timing.frame_rate().unwrap() - 59.94).abs() < 0.01);
    }

    #[test]
    fn test_parse_sps_derived_values() {
        let params = SpsParams {
            sps_id: 2,
            width: 1920,
            height: 1080,
            conformance_window: Some([0, 0, 0, 4]),
            log2_max_pic_order_cnt_lsb_minus4: 4,
            log2_min_luma_coding_block_size_minus3: 0,
            log2_diff_max_min_luma_coding_block_size: 3,
            ..Default::default()
        };
        let sps = parse_sps(&mut reader(write_sps(&params))).unwrap();
        assert_eq!(sps.sps_seq_parameter_set_id, 2);
        assert_eq!(sps.chroma_format_idc, 1);
        assert_eq!(sps.log2_max_pic_order_cnt_lsb(), 8);
        assert_eq!(sps.max_pic_order_cnt_lsb(), 256);
        assert_eq!(sps.ctb_size(), 64);
        assert_eq!(sps.pic_width_in_ctbs(), 30);
        assert_eq!(sps.pic_height_in_ctbs(), 17);
        assert_eq!(sps.pic_size_in_ctbs().unwrap(), 510);
        assert_eq!(sps.cropped_size(), (1920, 1072));
        assert_eq!(sps.bit_depth_luma(), 8);
    }

    #[test]
    fn test_sps_accepts_largest_level_dimensions() {
        let params = SpsParams {
            width: 16888,
            height: 16888,
            conformance_window: Some([0, 4, 0, 4]),
            log2_min_luma_coding_block_size_minus3: 0,
            log2_diff_max_min_luma_coding_block_size: 1,
            ..Default::default()
        };
        let sps = parse_sps(&mut reader(write_sps(&params))).unwrap();
        assert_eq!(sps.pic_width_in_ctbs(), 1056);
        assert_eq!(sps.pic_size_in_ctbs().unwrap(), 1056 * 1056);
        assert_eq!(sps.cropped_size(), (16880, 16880));
    }

    #[test]
    fn test_sps_rejects_dimensions_above_level_limit() {
        for width in [16889, u32::MAX] {
            let params = SpsParams {
                width,
                ..Default::default()
            };
            let err = parse_sps(&mut reader(write_sps(&params))).unwrap_err();
            assert_matches!(err.root_cause(), BitstreamError::SemanticRange { symbol, .. } if symbol == "pic_width_in_luma_samples");
        }
    }

    #[test]
    fn test_sps_conformance_window_must_leave_samples() {
        // 4:2:0 at 64 wide: 2 * (left + right) must stay below 64
        let fits = SpsParams {
            conformance_window: Some([16, 15, 0, 0]),
            ..Default::default()
        };
        let sps = parse_sps(&mut reader(write_sps(&fits))).unwrap();
        assert_eq!(sps.cropped_size(), (2, 64));

        let too_wide = SpsParams {
            conformance_window: Some([16, 16, 0, 0]),
            ..Default::default()
        };
        let err = parse_sps(&mut reader(write_sps(&too_wide))).unwrap_err();
        assert_matches!(err.root_cause(), BitstreamError::SemanticRange { symbol, .. } if symbol == "conf_win_right_offset");

        let too_tall = SpsParams {
            conformance_window: Some([0, 0, u32::MAX, 0]),
            ..Default::default()
        };
        let err = parse_sps(&mut reader(write_sps(&too_tall))).unwrap_err();
        assert_matches!(err.root_cause(), BitstreamError::SemanticRange { symbol, .. } if symbol == "conf_win_top_offset");
    }

    #[test]
    fn test_sps_derived_sizes_do_not_overflow() {
        let mut sps = parse_sps(&mut reader(write_sps(&SpsParams::default()))).unwrap();
        sps.pic_width_in_luma_samples = u32::MAX;
        sps.pic_height_in_luma_samples = u32::MAX;
        sps.conformance_window = Some(ConformanceWindow {
            left_offset: u32::MAX,
            right_offset: u32::MAX,
            top_offset: 0,
            bottom_offset: 0,
        });

        assert_matches!(sps.pic_size_in_ctbs(), Err(BitstreamError::Overflow("PicSizeInCtbsY")));
        assert_eq!(sps.cropped_size(), (0, u32::MAX));
    }

    #[test]
    fn test_chroma_format_names() {
        assert_eq!(chroma_format_name(0), "4:0:0");
        assert_eq!(chroma_format_name(3), "4:4:4");
        assert_eq!(chroma_format_name(7), "reserved");
    }

    #[test]
    fn test_parse_sps_logs_tree() {
        let mut tree = SyntaxTree::new("sps");
        {
            let root = tree.root();
            let cursor = BitCursor::from_rbsp(write_sps(&SpsParams::default()));
            let mut reader = SymbolReader::with_tree(cursor, &mut tree, root, None);
            parse_sps(&mut reader).unwrap();
        }
        let ptl = tree.find("profile_tier_level").unwrap();
        assert_eq!(tree.node(ptl).parent(), Some(tree.root()));
        let idc = tree.find("general_profile_idc").unwrap();
        assert_eq!(tree.node(idc).meaning, "Main");
        let chroma = tree.find("chroma_format_idc").unwrap();
        assert_eq!(tree.node(chroma).meaning, "4:2:0");
        assert!(!tree.has_errors());
    }

    #[test]
    fn test_sps_rejects_out_of_range_bit_depth() {
        let params = SpsParams {
            bit_depth_luma_minus8: 9,
            ..Default::default()
        };
        let err = parse_sps(&mut reader(write_sps(&params))).unwrap_err();
        assert_matches!(err.root_cause(), BitstreamError::SemanticRange { symbol, .. } if symbol == "bit_depth_luma_minus8");
    }

    #[test]
    fn test_pps_qp_range_follows_sps_bit_depth() {
        let sps = SpsParams {
            bit_depth_luma_minus8: 2,
            ..Default::default()
        };
        let mut sets = ParameterSets::new();
        sets.insert_sps(parse_sps(&mut reader(write_sps(&sps))).unwrap());

        let pps = PpsParams {
            init_qp_minus26: -38,
            ..Default::default()
        };
        let parsed = parse_pps(&mut reader(write_pps(&pps)), &sets).unwrap();
        assert_eq!(parsed.init_qp(), -12);

        let too_low = PpsParams {
            init_qp_minus26: -39,
            ..Default::default()
        };
        let err = parse_pps(&mut reader(write_pps(&too_low)), &sets).unwrap_err();
        assert_matches!(err.root_cause(), BitstreamError::SemanticRange { .. });
    }

    #[test]
    fn test_pps_tiles_and_deblocking() {
        let pps = PpsParams {
            tiles: Some((1, 1)),
            deblocking: Some((-2, 3)),
            ..Default::default()
        };
        let sets = sets_with(&SpsParams::default(), &pps);
        let parsed = sets.get_pps(0).unwrap();
        let tiles = parsed.tiles.as_ref().unwrap();
        assert_eq!(tiles.num_tile_columns_minus1, 1);
        assert!(tiles.uniform_spacing_flag);
        let deblocking = parsed.deblocking.unwrap();
        assert_eq!(deblocking.pps_beta_offset_div2, -2);
        assert_eq!(deblocking.pps_tc_offset_div2, 3);
    }

    #[test]
    fn test_slice_header_fields() {
        let sps = SpsParams::default();
        let pps = PpsParams {
            dependent_slice_segments_enabled: true,
            output_flag_present: true,
            num_extra_slice_header_bits: 2,
            ..Default::default()
        };
        let sets = sets_with(&sps, &pps);
        let params = SliceParams {
            first_slice_segment_in_pic: false,
            slice_segment_address: 9,
            slice_type: 0,
            pic_order_cnt_lsb: 13,
            ..Default::default()
        };
        let nal = NalHeader::from_bytes(&[0x02, 0x01]).unwrap();
        let header =
            parse_slice_header(&mut reader(write_slice(&params, &sps, &pps)), &nal, &sets)
                .unwrap();
        assert_eq!(header.slice_segment_address, 9);
        assert_eq!(header.slice_type, Some(SliceType::B));
        assert_eq!(header.slice_pic_order_cnt_lsb, Some(13));
        assert_eq!(header.log2_max_pic_order_cnt_lsb, 4);
        assert!(header.pic_output_flag);
        assert!(!header.dependent_slice_segment_flag);
    }

    #[test]
    fn test_dependent_slice_has_no_order() {
        let sps = SpsParams::default();
        let pps = PpsParams {
            dependent_slice_segments_enabled: true,
            ..Default::default()
        };
        let sets = sets_with(&sps, &pps);
        let params = SliceParams {
            first_slice_segment_in_pic: false,
            dependent_slice_segment: true,
            slice_segment_address: 4,
            ..Default::default()
        };
        let nal = NalHeader::from_bytes(&[0x02, 0x01]).unwrap();
        let header =
            parse_slice_header(&mut reader(write_slice(&params, &sps, &pps)), &nal, &sets)
                .unwrap();
        assert!(header.dependent_slice_segment_flag);
        assert_eq!(header.slice_type, None);
        assert_eq!(header.slice_pic_order_cnt_lsb, None);
    }

    #[test]
    fn test_idr_slice_infers_zero_lsb() {
        let sps = SpsParams::default();
        let pps = PpsParams::default();
        let sets = sets_with(&sps, &pps);
        let params = SliceParams {
            nal_unit_type: 19,
            slice_type: 2,
            ..Default::default()
        };
        let nal = NalHeader::from_bytes(&[0x26, 0x01]).unwrap();
        let header =
            parse_slice_header(&mut reader(write_slice(&params, &sps, &pps)), &nal, &sets)
                .unwrap();
        assert_eq!(header.no_output_of_prior_pics_flag, Some(false));
        assert_eq!(header.slice_pic_order_cnt_lsb, Some(0));
        assert_eq!(header.slice_type, Some(SliceType::I));
    }

    #[test]
    fn test_slice_missing_pps() {
        let sps = SpsParams::default();
        let pps = PpsParams::default();
        let sets = sets_with(&sps, &pps);
        let params = SliceParams {
            pps_id: 5,
            ..Default::default()
        };
        let other = PpsParams {
            pps_id: 5,
            ..Default::default()
        };
        let nal = NalHeader::from_bytes(&[0x02, 0x01]).unwrap();
        let err =
            parse_slice_header(&mut reader(write_slice(&params, &sps, &other)), &nal, &sets)
                .unwrap_err();
        assert_matches!(err, BitstreamError::MissingReference { kind: "PPS", id: 5 });
    }

    #[test]
    fn test_parameter_sets_last_write_wins() {
        let mut sets = ParameterSets::new();
        let small = parse_sps(&mut reader(write_sps(&SpsParams::default()))).unwrap();
        let large = parse_sps(&mut reader(write_sps(&SpsParams {
            width: 128,
            ..Default::default()
        })))
        .unwrap();
        assert!(sets.insert_sps(small).is_none());
        let replaced = sets.insert_sps(large).unwrap();
        assert_eq!(replaced.pic_width_in_luma_samples, 64);
        assert_eq!(sets.get_sps(0).unwrap().pic_width_in_luma_samples, 128);
        assert_eq!(sets.sps_count(), 1);
        sets.clear();
        assert!(sets.is_empty());
    }
}
