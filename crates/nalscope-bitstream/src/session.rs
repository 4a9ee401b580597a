//! Decoding session: per-file parsing state
//!
//! A [`DecodingSession`] owns everything that carries from one NAL unit to
//! the next: the active parameter sets, the index of retained units, the
//! running POC list and the decoding order tracker. Loading a new file means
//! calling [`DecodingSession::reset`].

use std::collections::BTreeMap;

use crate::bits::BitCursor;
use crate::error::{BitstreamError, Result};
use crate::hevc::{
    parse_pps, parse_slice_header, parse_sps, parse_vps, DecodingOrderTracker, NalHeader,
    NalUnit, NalUnitType, ParameterSets, ParsedUnit, Slice,
};
use crate::reader::SymbolReader;
use crate::scanner::{ByteSource, NalUnitScanner};
use crate::tree::{NodeId, SyntaxTree};

/// A unit that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct UnitError {
    pub position: u64,
    pub message: String,
}

/// Outcome of scanning a whole source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ScanSummary {
    /// Units found, including the ones that failed to parse
    pub units: usize,
    /// Units per NAL unit type name
    pub counts: BTreeMap<String, usize>,
    /// Pictures (first slice segments) seen
    pub pictures: usize,
    /// Units whose payload was cut at the configured maximum
    pub truncated: usize,
    pub errors: Vec<UnitError>,
}

impl ScanSummary {
    pub fn count(&self, nal_type: NalUnitType) -> usize {
        self.counts.get(&nal_type.name()).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DecodingSession {
    parameter_sets: ParameterSets,
    units: Vec<NalUnit>,
    poc_list: Vec<i32>,
    tracker: DecodingOrderTracker,
}

impl DecodingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all tables, the unit index, the POC list and the tracker state
    pub fn reset(&mut self) {
        self.parameter_sets.clear();
        self.units.clear();
        self.poc_list.clear();
        self.tracker.reset();
    }

    pub fn parameter_sets(&self) -> &ParameterSets {
        &self.parameter_sets
    }

    /// Retained units (parameter sets and random access points) by position
    pub fn units(&self) -> &[NalUnit] {
        &self.units
    }

    /// POC values in decoding order
    pub fn poc_list(&self) -> &[i32] {
        &self.poc_list
    }

    pub fn tracker(&self) -> &DecodingOrderTracker {
        &self.tracker
    }

    pub fn random_access_points(&self) -> impl Iterator<Item = &NalUnit> {
        self.units.iter().filter(|unit| unit.nal_type().is_irap())
    }

    /// The last random access point at or before `position`
    pub fn last_random_access_before(&self, position: u64) -> Option<&NalUnit> {
        self.random_access_points()
            .take_while(|unit| unit.position <= position)
            .last()
    }

    /// Append a POC unless it repeats the last inserted value
    pub fn add_poc(&mut self, poc: i32) -> bool {
        if self.poc_list.last() == Some(&poc) {
            return false;
        }
        self.poc_list.push(poc);
        true
    }

    fn retain(&mut self, unit: NalUnit) {
        if !unit.is_retained() {
            return;
        }
        match self
            .units
            .binary_search_by_key(&unit.position, |known| known.position)
        {
            Ok(index) => self.units[index] = unit,
            Err(index) => self.units.insert(index, unit),
        }
    }

    /// Parse one escaped NAL unit (header included) found at `position`
    ///
    /// With a tree, the unit is logged in a new group under the given anchor.
    pub fn parse_nal_unit(
        &mut self,
        position: u64,
        data: &[u8],
        tree: Option<(&mut SyntaxTree, NodeId)>,
    ) -> Result<ParsedUnit> {
        let cursor = BitCursor::new(data);
        let mut reader = match tree {
            Some((tree, anchor)) => SymbolReader::with_tree(
                cursor,
                tree,
                anchor,
                Some(&format!("NAL unit at {}", position)),
            ),
            None => SymbolReader::new(cursor),
        };

        reader.enter_sub_level("nal_unit_header");
        let header = NalHeader::parse(&mut reader)
            .map_err(|e| BitstreamError::MalformedHeader(e.to_string()))?;
        reader.exit_sub_level();

        let nal_type = header.nal_unit_type;
        reader.describe_level(nal_type.name());

        let parsed = match nal_type {
            NalUnitType::VpsNut => {
                reader.enter_sub_level("video_parameter_set_rbsp");
                let vps = parse_vps(&mut reader)?;
                #[cfg(feature = "tracing")]
                tracing::debug!("VPS {} at {}", vps.vps_video_parameter_set_id, position);
                self.parameter_sets.insert_vps(vps.clone());
                ParsedUnit::Vps(Box::new(vps))
            }
            NalUnitType::SpsNut => {
                reader.enter_sub_level("seq_parameter_set_rbsp");
                let sps = parse_sps(&mut reader)?;
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    "SPS {} at {}: {}x{}",
                    sps.sps_seq_parameter_set_id,
                    position,
                    sps.pic_width_in_luma_samples,
                    sps.pic_height_in_luma_samples
                );
                self.parameter_sets.insert_sps(sps.clone());
                ParsedUnit::Sps(Box::new(sps))
            }
            NalUnitType::PpsNut => {
                reader.enter_sub_level("pic_parameter_set_rbsp");
                let pps = parse_pps(&mut reader, &self.parameter_sets)?;
                #[cfg(feature = "tracing")]
                tracing::debug!("PPS {} at {}", pps.pps_pic_parameter_set_id, position);
                self.parameter_sets.insert_pps(pps.clone());
                ParsedUnit::Pps(Box::new(pps))
            }
            t if t.is_slice() => {
                reader.enter_sub_level("slice_segment_header");
                let slice_header =
                    match parse_slice_header(&mut reader, &header, &self.parameter_sets) {
                        Ok(slice_header) => slice_header,
                        Err(e) => {
                            if first_slice_segment_flag(data) != Some(false) {
                                self.tracker.invalidate_current();
                            }
                            return Err(e);
                        }
                    };
                let order = self.tracker.compute(
                    &header,
                    &slice_header,
                    slice_header.log2_max_pic_order_cnt_lsb,
                );
                if let Some(order) = order {
                    let added = self.add_poc(order.pic_order_cnt_val);
                    if !added && slice_header.first_slice_segment_in_pic_flag {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(
                            "Duplicate POC {} at {}",
                            order.pic_order_cnt_val,
                            position
                        );
                    }
                }
                ParsedUnit::Slice(Box::new(Slice {
                    header: slice_header,
                    pic_order_cnt_msb: order.map(|o| o.pic_order_cnt_msb),
                    pic_order_cnt_val: order.map(|o| o.pic_order_cnt_val),
                }))
            }
            NalUnitType::EosNut => {
                self.tracker.end_of_sequence();
                ParsedUnit::Other { nal_unit_type: nal_type }
            }
            other => ParsedUnit::Other {
                nal_unit_type: other,
            },
        };

        self.retain(NalUnit { position, header });
        Ok(parsed)
    }

    /// Drive `scanner` to the end of its source, parsing every unit
    ///
    /// Unit level failures are recorded in the summary and scanning resumes
    /// at the next start code. Only source errors end the scan early.
    pub fn scan<S: ByteSource>(
        &mut self,
        scanner: &mut NalUnitScanner<S>,
        mut tree: Option<&mut SyntaxTree>,
        max_units: Option<usize>,
    ) -> Result<ScanSummary> {
        let mut summary = ScanSummary::default();

        while max_units.map_or(true, |max| summary.units < max) {
            let Some(raw) = scanner.next_unit()? else {
                break;
            };
            summary.units += 1;
            if raw.truncated {
                summary.truncated += 1;
            }

            let anchor = tree.as_deref_mut().map(|tree| {
                let root = tree.root();
                (tree, root)
            });
            match self.parse_nal_unit(raw.position, &raw.data, anchor) {
                Ok(unit) => {
                    let name = match &unit {
                        ParsedUnit::Vps(_) => NalUnitType::VpsNut.name(),
                        ParsedUnit::Sps(_) => NalUnitType::SpsNut.name(),
                        ParsedUnit::Pps(_) => NalUnitType::PpsNut.name(),
                        ParsedUnit::Slice(_) | ParsedUnit::Other { .. } => raw
                            .header()
                            .map(|header| header.nal_unit_type.name())
                            .unwrap_or_default(),
                    };
                    if let ParsedUnit::Slice(slice) = &unit {
                        if slice.header.first_slice_segment_in_pic_flag {
                            summary.pictures += 1;
                        }
                    }
                    *summary.counts.entry(name).or_insert(0) += 1;
                }
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Unit at {}: {}", raw.position, e);
                    if let Ok(header) = raw.header() {
                        *summary.counts.entry(header.nal_unit_type.name()).or_insert(0) += 1;
                    }
                    summary.errors.push(UnitError {
                        position: raw.position,
                        message: describe_error(&e),
                    });
                }
            }
        }

        Ok(summary)
    }
}

/// `first_slice_segment_in_pic_flag` of an escaped slice unit
///
/// The flag is the first payload bit after the two byte header.
fn first_slice_segment_flag(data: &[u8]) -> Option<bool> {
    let payload = data.get(2..)?;
    BitCursor::new(payload)
        .read_bits(1)
        .ok()
        .map(|(bit, _)| bit == 1)
}

/// Error text including the innermost cause of wrapped read failures
fn describe_error(error: &BitstreamError) -> String {
    let cause = error.root_cause();
    if std::ptr::eq(cause, error) {
        error.to_string()
    } else {
        format!("{}: {}", error, cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    #[test]
    fn test_parse_units_updates_tables() {
        let mut session = DecodingSession::new();
        let sps = SpsParams::default();
        let pps = PpsParams::default();

        let parsed = session.parse_nal_unit(0, &sps_unit(&sps), None).unwrap();
        assert_eq!(parsed.kind(), "SPS");
        session.parse_nal_unit(20, &pps_unit(&pps), None).unwrap();
        let slice = SliceParams {
            nal_unit_type: 19,
            slice_type: 2,
            ..Default::default()
        };
        let parsed = session
            .parse_nal_unit(40, &slice_unit(&slice, &sps, &pps), None)
            .unwrap();

        assert_eq!(parsed.as_slice().unwrap().pic_order_cnt_val, Some(0));
        assert_eq!(session.parameter_sets().sps_count(), 1);
        assert_eq!(session.units().len(), 3);
        assert_eq!(session.random_access_points().count(), 1);
        assert_eq!(session.poc_list(), &[0]);
    }

    #[test]
    fn test_missing_pps_is_reported() {
        let mut session = DecodingSession::new();
        let sps = SpsParams::default();
        let pps = PpsParams::default();
        session.parse_nal_unit(0, &sps_unit(&sps), None).unwrap();
        let err = session
            .parse_nal_unit(10, &slice_unit(&SliceParams::default(), &sps, &pps), None)
            .unwrap_err();
        assert!(matches!(
            err,
            BitstreamError::MissingReference { kind: "PPS", id: 0 }
        ));
        assert!(session.poc_list().is_empty());
    }

    #[test]
    fn test_failed_parameter_set_is_not_retained() {
        let mut session = DecodingSession::new();
        let broken = SpsParams {
            bit_depth_luma_minus8: 9,
            ..Default::default()
        };
        assert!(session.parse_nal_unit(0, &sps_unit(&broken), None).is_err());
        assert!(session.units().is_empty());
        assert_eq!(session.parameter_sets().sps_count(), 0);

        session
            .parse_nal_unit(30, &sps_unit(&SpsParams::default()), None)
            .unwrap();
        let positions: Vec<_> = session.units().iter().map(|u| u.position).collect();
        assert_eq!(positions, vec![30]);
    }

    #[test]
    fn test_failed_first_slice_clears_picture_order() {
        let mut session = DecodingSession::new();
        let sps = SpsParams::default();
        let pps = PpsParams::default();
        session.parse_nal_unit(0, &sps_unit(&sps), None).unwrap();
        session.parse_nal_unit(20, &pps_unit(&pps), None).unwrap();
        let idr = SliceParams {
            nal_unit_type: 19,
            slice_type: 2,
            ..Default::default()
        };
        session
            .parse_nal_unit(40, &slice_unit(&idr, &sps, &pps), None)
            .unwrap();

        let orphan = SliceParams {
            pps_id: 5,
            pic_order_cnt_lsb: 7,
            ..Default::default()
        };
        let err = session
            .parse_nal_unit(60, &slice_unit(&orphan, &sps, &pps), None)
            .unwrap_err();
        assert!(matches!(
            err,
            BitstreamError::MissingReference { kind: "PPS", id: 5 }
        ));
        assert_eq!(session.units().len(), 3);

        let rest = SliceParams {
            first_slice_segment_in_pic: false,
            slice_segment_address: 1,
            pic_order_cnt_lsb: 7,
            ..Default::default()
        };
        let parsed = session
            .parse_nal_unit(80, &slice_unit(&rest, &sps, &pps), None)
            .unwrap();
        assert_eq!(parsed.as_slice().unwrap().pic_order_cnt_val, None);
        assert_eq!(session.poc_list(), &[0]);
    }

    #[test]
    fn test_add_poc_rejects_only_repeat_of_last() {
        let mut session = DecodingSession::new();
        assert!(session.add_poc(4));
        assert!(!session.add_poc(4));
        assert!(session.add_poc(2));
        assert!(session.add_poc(4));
        assert_eq!(session.poc_list(), &[4, 2, 4]);
    }

    #[test]
    fn test_unit_tree_group_named_by_position() {
        let mut session = DecodingSession::new();
        let mut tree = SyntaxTree::new("stream");
        let root = tree.root();
        session
            .parse_nal_unit(7, &sps_unit(&SpsParams::default()), Some((&mut tree, root)))
            .unwrap();

        let group = tree.children(root)[0];
        assert_eq!(tree.node(group).name, "NAL unit at 7");
        assert_eq!(tree.node(group).value, "SPS_NUT");
        let header = tree.find_child(group, "nal_unit_header").unwrap();
        assert_eq!(tree.children(header).len(), 4);
        assert!(tree.find_child(group, "seq_parameter_set_rbsp").is_some());
    }

    #[test]
    fn test_last_random_access_before() {
        let stream = simple_stream(&[(19, 0), (1, 1), (21, 8), (1, 9)]);
        let mut session = DecodingSession::new();
        let mut scanner = NalUnitScanner::new(stream);
        let summary = session.scan(&mut scanner, None, None).unwrap();
        assert!(summary.errors.is_empty());

        let points: Vec<_> = session.random_access_points().map(|u| u.position).collect();
        assert_eq!(points.len(), 2);
        assert_eq!(
            session.last_random_access_before(points[1] - 1).unwrap().position,
            points[0]
        );
        assert_eq!(
            session.last_random_access_before(u64::MAX).unwrap().nal_type(),
            NalUnitType::CraNut
        );
        assert!(session.last_random_access_before(0).is_none());
    }
}
