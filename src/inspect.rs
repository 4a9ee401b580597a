//! Scan a file on disk into an inspection report

use std::path::Path;

use anyhow::{Context, Result};
use nalscope_bitstream::hevc::Sps;
use nalscope_bitstream::{DecodingSession, NalUnit, NalUnitScanner, ScanSummary, SyntaxTree};
use serde::Serialize;

use crate::config::ScannerConfig;
use crate::source::{FileSource, InfoItem, InputFormat};

/// Knobs for one scan
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub buffer_size: usize,
    pub max_payload_bytes: usize,
    pub max_units: Option<usize>,
    /// Keep the annotated syntax tree of every unit
    pub build_tree: bool,
}

impl From<&ScannerConfig> for ScanOptions {
    fn from(config: &ScannerConfig) -> Self {
        Self {
            buffer_size: config.buffer_size,
            max_payload_bytes: config.max_payload_bytes,
            max_units: config.max_units,
            build_tree: false,
        }
    }
}

/// Key properties of one active SPS
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceInfo {
    pub id: u32,
    pub width: u32,
    pub height: u32,
    pub chroma_format: String,
    pub bit_depth_luma: u8,
    pub bit_depth_chroma: u8,
    pub profile_idc: u8,
    pub level_idc: u8,
    pub level: f32,
    pub log2_max_pic_order_cnt_lsb: u32,
}

impl From<&Sps> for SequenceInfo {
    fn from(sps: &Sps) -> Self {
        let (width, height) = sps.cropped_size();
        Self {
            id: sps.sps_seq_parameter_set_id,
            width,
            height,
            chroma_format: sps.chroma_format_name().to_string(),
            bit_depth_luma: sps.bit_depth_luma(),
            bit_depth_chroma: sps.bit_depth_chroma(),
            profile_idc: sps.profile_tier_level.general.profile_idc,
            level_idc: sps.profile_tier_level.general_level_idc,
            level: sps.profile_tier_level.level(),
            log2_max_pic_order_cnt_lsb: sps.log2_max_pic_order_cnt_lsb(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InspectionReport {
    pub file: Vec<InfoItem>,
    pub format: InputFormat,
    pub summary: ScanSummary,
    pub sequences: Vec<SequenceInfo>,
    /// Parameter sets and random access points, by position
    pub retained: Vec<NalUnit>,
    pub poc: Vec<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree: Option<SyntaxTree>,
}

/// Decide whether a file can be scanned as Annex-B HEVC
pub fn check_format(path: &Path, format: InputFormat) -> Result<()> {
    match format {
        InputFormat::AnnexBHevc => Ok(()),
        InputFormat::Invalid => {
            tracing::warn!(
                "Unknown file extension for {:?}, scanning as Annex-B HEVC",
                path
            );
            Ok(())
        }
        InputFormat::AnnexBAvc | InputFormat::AnnexBVvc => {
            anyhow::bail!("{} streams are not supported, only Annex-B HEVC", format)
        }
        InputFormat::Container => {
            anyhow::bail!("Container files must be demuxed to an Annex-B HEVC stream first")
        }
    }
}

/// Scan `path` to the end and collect the results
pub fn inspect_file(path: &Path, options: &ScanOptions) -> Result<InspectionReport> {
    if !path.exists() {
        anyhow::bail!("Input file does not exist: {:?}", path);
    }

    let source = FileSource::open(path)?;
    let format = source.format();
    check_format(path, format)?;
    let file = source.file_info();

    tracing::info!("Scanning {:?}", path);

    let mut scanner = NalUnitScanner::new(source)
        .with_buffer_size(options.buffer_size)
        .with_max_payload(options.max_payload_bytes);
    let mut session = DecodingSession::new();
    let mut tree = options.build_tree.then(|| {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "stream".to_string());
        SyntaxTree::new(name)
    });

    let summary = session
        .scan(&mut scanner, tree.as_mut(), options.max_units)
        .with_context(|| format!("Failed to scan {:?}", path))?;

    tracing::info!(
        "Scanned {} units ({} pictures, {} errors)",
        summary.units,
        summary.pictures,
        summary.errors.len()
    );

    Ok(InspectionReport {
        file,
        format,
        sequences: session
            .parameter_sets()
            .sps_iter()
            .map(SequenceInfo::from)
            .collect(),
        retained: session.units().to_vec(),
        poc: session.poc_list().to_vec(),
        summary,
        tree,
    })
}
