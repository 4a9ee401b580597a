//! HEVC NAL unit header and unit records

use crate::bits::BitCursor;
use crate::check::Options;
use crate::error::{BitstreamError, Result};
use crate::reader::SymbolReader;

/// HEVC NAL unit types (ITU-T H.265 Table 7-1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum NalUnitType {
    /// Coded slice of trailing picture
    TrailN,
    TrailR,
    /// Coded slice of TSA picture
    TsaN,
    TsaR,
    /// Coded slice of STSA picture
    StsaN,
    StsaR,
    /// Coded slice of RADL picture
    RadlN,
    RadlR,
    /// Coded slice of RASL picture
    RaslN,
    RaslR,
    /// Reserved non-IRAP VCL types 10..=15
    ReservedVcl(u8),
    /// Coded slice of BLA picture
    BlaWLp,
    BlaWRadl,
    BlaNLp,
    /// Coded slice of IDR picture
    IdrWRadl,
    IdrNLp,
    /// Coded slice of CRA picture
    CraNut,
    /// Reserved IRAP VCL types 22 and 23
    ReservedIrap(u8),
    /// Reserved VCL types 24..=31
    ReservedVclOther(u8),
    VpsNut,
    SpsNut,
    PpsNut,
    AudNut,
    EosNut,
    EobNut,
    FdNut,
    PrefixSeiNut,
    SuffixSeiNut,
    /// Reserved non-VCL types 41..=47
    ReservedNonVcl(u8),
    /// Unspecified types 48..=63
    Unspecified(u8),
}

impl From<u8> for NalUnitType {
    fn from(value: u8) -> Self {
        match value {
            0 => NalUnitType::TrailN,
            1 => NalUnitType::TrailR,
            2 => NalUnitType::TsaN,
            3 => NalUnitType::TsaR,
            4 => NalUnitType::StsaN,
            5 => NalUnitType::StsaR,
            6 => NalUnitType::RadlN,
            7 => NalUnitType::RadlR,
            8 => NalUnitType::RaslN,
            9 => NalUnitType::RaslR,
            10..=15 => NalUnitType::ReservedVcl(value),
            16 => NalUnitType::BlaWLp,
            17 => NalUnitType::BlaWRadl,
            18 => NalUnitType::BlaNLp,
            19 => NalUnitType::IdrWRadl,
            20 => NalUnitType::IdrNLp,
            21 => NalUnitType::CraNut,
            22 | 23 => NalUnitType::ReservedIrap(value),
            24..=31 => NalUnitType::ReservedVclOther(value),
            32 => NalUnitType::VpsNut,
            33 => NalUnitType::SpsNut,
            34 => NalUnitType::PpsNut,
            35 => NalUnitType::AudNut,
            36 => NalUnitType::EosNut,
            37 => NalUnitType::EobNut,
            38 => NalUnitType::FdNut,
            39 => NalUnitType::PrefixSeiNut,
            40 => NalUnitType::SuffixSeiNut,
            41..=47 => NalUnitType::ReservedNonVcl(value),
            v => NalUnitType::Unspecified(v),
        }
    }
}

impl NalUnitType {
    pub fn type_id(&self) -> u8 {
        match *self {
            NalUnitType::TrailN => 0,
            NalUnitType::TrailR => 1,
            NalUnitType::TsaN => 2,
            NalUnitType::TsaR => 3,
            NalUnitType::StsaN => 4,
            NalUnitType::StsaR => 5,
            NalUnitType::RadlN => 6,
            NalUnitType::RadlR => 7,
            NalUnitType::RaslN => 8,
            NalUnitType::RaslR => 9,
            NalUnitType::BlaWLp => 16,
            NalUnitType::BlaWRadl => 17,
            NalUnitType::BlaNLp => 18,
            NalUnitType::IdrWRadl => 19,
            NalUnitType::IdrNLp => 20,
            NalUnitType::CraNut => 21,
            NalUnitType::VpsNut => 32,
            NalUnitType::SpsNut => 33,
            NalUnitType::PpsNut => 34,
            NalUnitType::AudNut => 35,
            NalUnitType::EosNut => 36,
            NalUnitType::EobNut => 37,
            NalUnitType::FdNut => 38,
            NalUnitType::PrefixSeiNut => 39,
            NalUnitType::SuffixSeiNut => 40,
            NalUnitType::ReservedVcl(v)
            | NalUnitType::ReservedIrap(v)
            | NalUnitType::ReservedVclOther(v)
            | NalUnitType::ReservedNonVcl(v)
            | NalUnitType::Unspecified(v) => v,
        }
    }

    pub fn name(&self) -> String {
        let name = match self {
            NalUnitType::TrailN => "TRAIL_N",
            NalUnitType::TrailR => "TRAIL_R",
            NalUnitType::TsaN => "TSA_N",
            NalUnitType::TsaR => "TSA_R",
            NalUnitType::StsaN => "STSA_N",
            NalUnitType::StsaR => "STSA_R",
            NalUnitType::RadlN => "RADL_N",
            NalUnitType::RadlR => "RADL_R",
            NalUnitType::RaslN => "RASL_N",
            NalUnitType::RaslR => "RASL_R",
            NalUnitType::BlaWLp => "BLA_W_LP",
            NalUnitType::BlaWRadl => "BLA_W_RADL",
            NalUnitType::BlaNLp => "BLA_N_LP",
            NalUnitType::IdrWRadl => "IDR_W_RADL",
            NalUnitType::IdrNLp => "IDR_N_LP",
            NalUnitType::CraNut => "CRA_NUT",
            NalUnitType::VpsNut => "VPS_NUT",
            NalUnitType::SpsNut => "SPS_NUT",
            NalUnitType::PpsNut => "PPS_NUT",
            NalUnitType::AudNut => "AUD_NUT",
            NalUnitType::EosNut => "EOS_NUT",
            NalUnitType::EobNut => "EOB_NUT",
            NalUnitType::FdNut => "FD_NUT",
            NalUnitType::PrefixSeiNut => "PREFIX_SEI_NUT",
            NalUnitType::SuffixSeiNut => "SUFFIX_SEI_NUT",
            NalUnitType::ReservedIrap(v) => return format!("RSV_IRAP_VCL{}", v),
            NalUnitType::ReservedVcl(v) | NalUnitType::ReservedVclOther(v) => {
                return format!("RSV_VCL{}", v)
            }
            NalUnitType::ReservedNonVcl(v) => return format!("RSV_NVCL{}", v),
            NalUnitType::Unspecified(v) => return format!("UNSPEC{}", v),
        };
        name.to_string()
    }

    /// Video coding layer (slice data) unit
    pub fn is_vcl(&self) -> bool {
        self.type_id() < 32
    }

    /// Slice segment whose syntax this crate parses
    pub fn is_slice(&self) -> bool {
        matches!(self.type_id(), 0..=9 | 16..=21)
    }

    /// Intra random access point (BLA, IDR, CRA and reserved IRAP types)
    pub fn is_irap(&self) -> bool {
        matches!(self.type_id(), 16..=23)
    }

    pub fn is_idr(&self) -> bool {
        matches!(self, NalUnitType::IdrWRadl | NalUnitType::IdrNLp)
    }

    pub fn is_bla(&self) -> bool {
        matches!(
            self,
            NalUnitType::BlaWLp | NalUnitType::BlaWRadl | NalUnitType::BlaNLp
        )
    }

    pub fn is_cra(&self) -> bool {
        matches!(self, NalUnitType::CraNut)
    }

    pub fn is_radl(&self) -> bool {
        matches!(self, NalUnitType::RadlN | NalUnitType::RadlR)
    }

    pub fn is_rasl(&self) -> bool {
        matches!(self, NalUnitType::RaslN | NalUnitType::RaslR)
    }

    /// Sub-layer non-reference picture (even VCL types below 16)
    pub fn is_sub_layer_non_reference(&self) -> bool {
        let id = self.type_id();
        id < 16 && id % 2 == 0
    }

    pub fn is_parameter_set(&self) -> bool {
        matches!(
            self,
            NalUnitType::VpsNut | NalUnitType::SpsNut | NalUnitType::PpsNut
        )
    }
}

/// The two byte HEVC NAL unit header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct NalHeader {
    pub nal_unit_type: NalUnitType,
    pub nuh_layer_id: u8,
    pub nuh_temporal_id_plus1: u8,
}

impl NalHeader {
    /// Parse `nal_unit_header()`, logging each field
    pub fn parse(reader: &mut SymbolReader) -> Result<Self> {
        reader.read_flag("forbidden_zero_bit", &Options::new().with_equal(0))?;

        let type_options = Options::new().with_meaning_map(
            (0u8..64).map(|id| (i64::from(id), NalUnitType::from(id).name())),
        );
        let nal_unit_type = reader.read_bits("nal_unit_type", 6, &type_options)? as u8;
        let nuh_layer_id = reader.read_bits("nuh_layer_id", 6, &Options::NONE)? as u8;
        let nuh_temporal_id_plus1 =
            reader.read_bits("nuh_temporal_id_plus1", 3, &Options::new().with_min(1))? as u8;

        Ok(Self {
            nal_unit_type: NalUnitType::from(nal_unit_type),
            nuh_layer_id,
            nuh_temporal_id_plus1,
        })
    }

    /// Classify a unit from its raw bytes without logging
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 2 {
            return Err(BitstreamError::MalformedHeader(format!(
                "{} bytes, a header needs 2",
                data.len()
            )));
        }
        let mut reader = SymbolReader::new(BitCursor::from_rbsp(data[..2].to_vec()));
        Self::parse(&mut reader)
            .map_err(|e| BitstreamError::MalformedHeader(e.to_string()))
    }

    pub fn temporal_id(&self) -> u8 {
        self.nuh_temporal_id_plus1.saturating_sub(1)
    }
}

/// A discovered NAL unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct NalUnit {
    /// Byte position of the start code prefix in the file
    pub position: u64,
    pub header: NalHeader,
}

impl NalUnit {
    pub fn nal_type(&self) -> NalUnitType {
        self.header.nal_unit_type
    }

    pub fn layer_id(&self) -> u8 {
        self.header.nuh_layer_id
    }

    pub fn temporal_id_plus1(&self) -> u8 {
        self.header.nuh_temporal_id_plus1
    }

    /// Units needed to start decoding at a position: parameter sets and IRAPs
    pub fn is_retained(&self) -> bool {
        let nal_type = self.nal_type();
        nal_type.is_parameter_set() || nal_type.is_irap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nal_type_from_u8() {
        assert_eq!(NalUnitType::from(33), NalUnitType::SpsNut);
        assert_eq!(NalUnitType::from(39), NalUnitType::PrefixSeiNut);
        assert_eq!(NalUnitType::from(12), NalUnitType::ReservedVcl(12));
        assert_eq!(NalUnitType::from(62), NalUnitType::Unspecified(62));
        for id in 0u8..64 {
            assert_eq!(NalUnitType::from(id).type_id(), id);
        }
    }

    #[test]
    fn test_type_predicates() {
        assert!(NalUnitType::from(19).is_irap());
        assert!(NalUnitType::from(23).is_irap());
        assert!(!NalUnitType::from(1).is_irap());
        assert!(NalUnitType::TrailN.is_sub_layer_non_reference());
        assert!(NalUnitType::ReservedVcl(14).is_sub_layer_non_reference());
        assert!(!NalUnitType::TrailR.is_sub_layer_non_reference());
        assert!(!NalUnitType::ReservedIrap(22).is_slice());
        assert!(NalUnitType::CraNut.is_slice());
        assert_eq!(NalUnitType::ReservedNonVcl(41).name(), "RSV_NVCL41");
    }

    #[test]
    fn test_header_from_bytes() {
        // SPS: type 33, layer 0, tid+1 = 1
        let header = NalHeader::from_bytes(&[0x42, 0x01]).unwrap();
        assert_eq!(header.nal_unit_type, NalUnitType::SpsNut);
        assert_eq!(header.nuh_layer_id, 0);
        assert_eq!(header.temporal_id(), 0);

        // layer id spans both bytes: type 1, layer 33, tid+1 = 3
        let header = NalHeader::from_bytes(&[0x03, 0x0B]).unwrap();
        assert_eq!(header.nal_unit_type, NalUnitType::TrailR);
        assert_eq!(header.nuh_layer_id, 33);
        assert_eq!(header.nuh_temporal_id_plus1, 3);
    }

    #[test]
    fn test_header_rejects_forbidden_bit_and_zero_tid() {
        assert!(matches!(
            NalHeader::from_bytes(&[0xC2, 0x01]),
            Err(BitstreamError::MalformedHeader(_))
        ));
        assert!(matches!(
            NalHeader::from_bytes(&[0x42, 0x00]),
            Err(BitstreamError::MalformedHeader(_))
        ));
        assert!(NalHeader::from_bytes(&[0x42]).is_err());
    }
}
