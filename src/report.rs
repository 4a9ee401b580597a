//! Text and JSON rendering of inspection reports

use std::fmt::Write;

use anyhow::Result;

use crate::inspect::InspectionReport;
use crate::source::InfoItem;

/// Which optional sections to print
#[derive(Debug, Clone, Copy)]
pub struct TextSections {
    pub poc: bool,
    pub tree: bool,
}

impl Default for TextSections {
    fn default() -> Self {
        Self {
            poc: true,
            tree: false,
        }
    }
}

pub fn render_info(items: &[InfoItem]) -> String {
    let mut out = String::new();
    for item in items {
        let _ = writeln!(out, "{}: {}", item.name, item.text);
    }
    out
}

pub fn render_text(report: &InspectionReport, sections: TextSections) -> String {
    let mut out = render_info(&report.file);
    let _ = writeln!(out, "Format: {}", report.format);

    let _ = writeln!(out, "\nSequences: {}", report.sequences.len());
    for seq in &report.sequences {
        let _ = writeln!(
            out,
            "  [{}] {}x{} {} {}/{} bit, profile {} level {:.1}",
            seq.id,
            seq.width,
            seq.height,
            seq.chroma_format,
            seq.bit_depth_luma,
            seq.bit_depth_chroma,
            seq.profile_idc,
            seq.level
        );
    }

    let summary = &report.summary;
    let _ = writeln!(
        out,
        "\nNAL Units: {} ({} pictures, {} truncated)",
        summary.units, summary.pictures, summary.truncated
    );
    for (name, count) in &summary.counts {
        let _ = writeln!(out, "  {:<14} {}", name, count);
    }

    let _ = writeln!(out, "\nRetained Units: {}", report.retained.len());
    for unit in &report.retained {
        let _ = write!(out, "  @{} {}", unit.position, unit.nal_type().name());
        if unit.layer_id() != 0 {
            let _ = write!(out, " layer {}", unit.layer_id());
        }
        if unit.header.temporal_id() != 0 {
            let _ = write!(out, " tid {}", unit.header.temporal_id());
        }
        out.push('\n');
    }

    if sections.poc {
        let pocs: Vec<String> = report.poc.iter().map(|poc| poc.to_string()).collect();
        let _ = writeln!(out, "\nPOC Sequence: {}", pocs.join(" "));
    }

    if !summary.errors.is_empty() {
        let _ = writeln!(out, "\nErrors: {}", summary.errors.len());
        for error in &summary.errors {
            let _ = writeln!(out, "  @{}: {}", error.position, error.message);
        }
    }

    if sections.tree {
        if let Some(ref tree) = report.tree {
            out.push('\n');
            out.push_str(&tree.render());
        }
    }

    out
}

pub fn render_json(report: &InspectionReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::{InspectionReport, SequenceInfo};
    use crate::source::InputFormat;
    use nalscope_bitstream::{NalHeader, NalUnit, NalUnitType, ScanSummary, UnitError};

    fn sample_report() -> InspectionReport {
        let mut summary = ScanSummary {
            units: 3,
            pictures: 1,
            ..Default::default()
        };
        summary.counts.insert("SPS_NUT".to_string(), 1);
        summary.counts.insert("IDR_W_RADL".to_string(), 1);
        summary.errors.push(UnitError {
            position: 40,
            message: "Malformed NAL unit header".to_string(),
        });

        InspectionReport {
            file: vec![InfoItem {
                name: "File Path".to_string(),
                text: "clip.hevc".to_string(),
            }],
            format: InputFormat::AnnexBHevc,
            summary,
            sequences: vec![SequenceInfo {
                id: 0,
                width: 1920,
                height: 1080,
                chroma_format: "4:2:0".to_string(),
                bit_depth_luma: 10,
                bit_depth_chroma: 10,
                profile_idc: 2,
                level_idc: 123,
                level: 4.1,
                log2_max_pic_order_cnt_lsb: 8,
            }],
            retained: vec![NalUnit {
                position: 20,
                header: NalHeader {
                    nal_unit_type: NalUnitType::IdrWRadl,
                    nuh_layer_id: 0,
                    nuh_temporal_id_plus1: 1,
                },
            }],
            poc: vec![0, 4, 2],
            tree: None,
        }
    }

    #[test]
    fn test_text_sections() {
        let text = render_text(&sample_report(), TextSections::default());
        assert!(text.contains("File Path: clip.hevc"));
        assert!(text.contains("Format: Annex-B HEVC"));
        assert!(text.contains("[0] 1920x1080 4:2:0 10/10 bit, profile 2 level 4.1"));
        assert!(text.contains("NAL Units: 3 (1 pictures, 0 truncated)"));
        assert!(text.contains("@20 IDR_W_RADL"));
        assert!(text.contains("POC Sequence: 0 4 2"));
        assert!(text.contains("@40: Malformed NAL unit header"));
    }

    #[test]
    fn test_poc_section_can_be_hidden() {
        let sections = TextSections {
            poc: false,
            tree: true,
        };
        let text = render_text(&sample_report(), sections);
        assert!(!text.contains("POC Sequence"));
    }

    #[test]
    fn test_json_report() {
        let json = render_json(&sample_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["poc"], serde_json::json!([0, 4, 2]));
        assert_eq!(value["summary"]["units"], 3);
        assert_eq!(value["sequences"][0]["width"], 1920);
        assert!(value.get("tree").is_none());
    }
}
