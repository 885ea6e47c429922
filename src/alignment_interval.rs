//! Representation of one alignment of an assembled contig to the reference
//!

use std::fmt;
use std::str::FromStr;

use rust_htslib::bam::record::Cigar;
use strum::{Display, EnumString};

use crate::cigar::{
    cigar_to_string, get_cigar_read_offset, get_cigar_ref_offset, get_leading_clip_len,
    get_trailing_clip_len, get_unclipped_read_len, has_aligned_segments, is_clip, is_unsupported,
    parse_cigar_string,
};
use crate::errors::{Result, invalid_arg};
use crate::sa_tag_parser::SplitReadSegment;

/// Field separator used in the packed string representation of an alignment interval
const PACKED_STRING_SEPARATOR: char = '_';

/// Packed string value of a missing edit distance or alignment score
const PACKED_STRING_MISSING_VALUE: &str = "*";

/// Describes how an alignment interval was derived from the aligner output
///
#[derive(Clone, Copy, Debug, Default, Display, EnumString, Eq, PartialEq)]
pub enum AlnModType {
    /// Unmodified aligner output
    #[default]
    #[strum(serialize = "O")]
    Original,

    /// Clipped to remove contig overlap with another alignment
    #[strum(serialize = "H")]
    ClippedForOverlapRemoval,

    #[strum(serialize = "E")]
    ExtractedFromLargerAlignment,

    /// One ungapped fragment of a gapped alignment
    #[strum(serialize = "S")]
    SplitFromGappedAlignment,
}

/// Reference span of an alignment in 1-based fully closed coordinates
///
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RefSpan {
    pub chrom: String,
    pub start: i64,
    pub end: i64,
}

impl RefSpan {
    pub fn new(chrom: &str, start: i64, end: i64) -> Self {
        Self {
            chrom: chrom.to_string(),
            start,
            end,
        }
    }

    pub fn size(&self) -> i64 {
        self.end + 1 - self.start
    }
}

impl fmt::Display for RefSpan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chrom, self.start, self.end)
    }
}

/// One alignment of an assembled contig
///
/// The cigar is always stored in the 5' to 3' direction of the contig, so for reverse-strand
/// alignments it is the reverse of the cigar found in the bam record. Contig coordinates are 1-based
/// and fully closed, in the same 5' to 3' orientation.
///
/// Intervals are treated as immutable values: all modification routines return new instances.
///
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AlignmentInterval {
    pub ref_span: RefSpan,
    pub start_in_contig: usize,
    pub end_in_contig: usize,
    pub cigar: Vec<Cigar>,
    pub is_fwd_strand: bool,
    pub mapq: u8,

    /// Alignment edit distance, None if unknown or no longer valid after modification
    pub nm: Option<u32>,

    /// Aligner score, None if unknown
    pub alignment_score: Option<i32>,

    pub aln_mod_type: AlnModType,
}

impl AlignmentInterval {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ref_span: RefSpan,
        start_in_contig: usize,
        end_in_contig: usize,
        cigar: Vec<Cigar>,
        is_fwd_strand: bool,
        mapq: u8,
        nm: Option<u32>,
        alignment_score: Option<i32>,
        aln_mod_type: AlnModType,
    ) -> Self {
        Self {
            ref_span,
            start_in_contig,
            end_in_contig,
            cigar,
            is_fwd_strand,
            mapq,
            nm,
            alignment_score,
            aln_mod_type,
        }
    }

    /// Build an interval from one SA tag segment
    ///
    /// The segment cigar is given in reference orientation, it is reversed here for reverse-strand
    /// segments so that the contig coordinates are always expressed in the 5' to 3' direction.
    ///
    pub fn from_sa_segment(segment: &SplitReadSegment) -> Result<Self> {
        let cigar = if segment.is_fwd_strand {
            segment.cigar.clone()
        } else {
            segment.cigar.iter().rev().copied().collect()
        };
        Self::from_aligned_cigar(
            &segment.rname,
            segment.pos,
            cigar,
            segment.is_fwd_strand,
            segment.mapq,
            Some(segment.nm),
            None,
        )
    }

    /// Build an original interval from a zero-indexed reference start position and a cigar already
    /// oriented in the 5' to 3' direction of the contig
    ///
    pub(crate) fn from_aligned_cigar(
        chrom: &str,
        pos: i64,
        cigar: Vec<Cigar>,
        is_fwd_strand: bool,
        mapq: u8,
        nm: Option<u32>,
        alignment_score: Option<i32>,
    ) -> Result<Self> {
        if !has_aligned_segments(&cigar) {
            invalid_arg!(
                "Alignment to {chrom}:{} has no aligned segments in cigar '{}'",
                pos + 1,
                cigar_to_string(&cigar)
            );
        }
        let start = pos + 1;
        let end = pos + get_cigar_ref_offset(&cigar);
        let start_in_contig = get_leading_clip_len(&cigar) + 1;
        let end_in_contig = get_unclipped_read_len(&cigar) - get_trailing_clip_len(&cigar);
        Ok(Self::new(
            RefSpan::new(chrom, start, end),
            start_in_contig,
            end_in_contig,
            cigar,
            is_fwd_strand,
            mapq,
            nm,
            alignment_score,
            AlnModType::Original,
        ))
    }

    /// Number of contig bases covered by the alignment
    pub fn get_read_span_len(&self) -> usize {
        (self.end_in_contig + 1).saturating_sub(self.start_in_contig)
    }

    pub fn get_ref_span_len(&self) -> i64 {
        self.ref_span.size()
    }

    /// Full contig length implied by the cigar, including all clipping
    pub fn get_unclipped_contig_len(&self) -> usize {
        get_unclipped_read_len(&self.cigar)
    }

    /// Check the consistency of the contig span, reference span and cigar
    ///
    pub fn validate(&self) -> Result<()> {
        if self.start_in_contig < 1 || self.start_in_contig > self.end_in_contig {
            invalid_arg!("Invalid contig span in alignment: {self}");
        }
        if self.ref_span.start < 1 || self.ref_span.start > self.ref_span.end {
            invalid_arg!("Invalid reference span in alignment: {self}");
        }
        if !has_aligned_segments(&self.cigar) {
            invalid_arg!("Alignment cigar has no aligned segments: {self}");
        }
        if self.cigar.iter().any(is_unsupported) {
            invalid_arg!("Alignment cigar contains skip or padding operations: {self}");
        }

        // Aligned read length excludes the clipping runs on either end
        let leading_clip_count = self.cigar.iter().take_while(|x| is_clip(x)).count();
        let trailing_clip_count = self.cigar[leading_clip_count..]
            .iter()
            .rev()
            .take_while(|x| is_clip(x))
            .count();
        let aligned_cigar = &self.cigar[leading_clip_count..self.cigar.len() - trailing_clip_count];
        let is_del = |c: Option<&Cigar>| matches!(c, Some(Cigar::Del(_)));
        if is_del(aligned_cigar.first()) || is_del(aligned_cigar.last()) {
            invalid_arg!("Alignment cigar has a deletion on the edge of the aligned region: {self}");
        }

        let cigar_read_len = get_cigar_read_offset(aligned_cigar, true);
        if cigar_read_len != self.get_read_span_len() {
            invalid_arg!(
                "Contig span length {} does not match cigar aligned read length {cigar_read_len}: {self}",
                self.get_read_span_len()
            );
        }

        let cigar_ref_len = get_cigar_ref_offset(&self.cigar);
        if cigar_ref_len != self.get_ref_span_len() {
            invalid_arg!(
                "Reference span length {} does not match cigar reference length {cigar_ref_len}: {self}",
                self.get_ref_span_len()
            );
        }
        Ok(())
    }

    /// Compact single-string summary of the alignment
    ///
    /// Format is "contigStart_contigEnd_chrom:refStart-refEnd_strand_cigar_mapq_nm_as_modType", where
    /// a missing nm or alignment score is written as "*".
    ///
    pub fn to_packed_string(&self) -> String {
        fn optional_field<T: ToString>(x: Option<T>) -> String {
            x.map_or(PACKED_STRING_MISSING_VALUE.to_string(), |x| x.to_string())
        }
        let strand = if self.is_fwd_strand { '+' } else { '-' };
        let nm = optional_field(self.nm);
        let alignment_score = optional_field(self.alignment_score);
        let sep = PACKED_STRING_SEPARATOR;
        format!(
            "{}{sep}{}{sep}{}{sep}{strand}{sep}{}{sep}{}{sep}{nm}{sep}{alignment_score}{sep}{}",
            self.start_in_contig,
            self.end_in_contig,
            self.ref_span,
            cigar_to_string(&self.cigar),
            self.mapq,
            self.aln_mod_type,
        )
    }

    /// Parse the format written by `to_packed_string`
    ///
    /// The parsed alignment is validated before it is returned.
    ///
    pub fn from_packed_string(s: &str) -> Result<Self> {
        fn parse_field<T: FromStr>(s: &str, field: &str, label: &str) -> Result<T> {
            match field.parse::<T>() {
                Ok(x) => Ok(x),
                Err(_) => invalid_arg!("Can't parse {label} from packed alignment string: '{s}'"),
            }
        }

        fn parse_optional_field<T: FromStr>(s: &str, field: &str, label: &str) -> Result<Option<T>> {
            if field == PACKED_STRING_MISSING_VALUE {
                Ok(None)
            } else {
                parse_field(s, field, label).map(Some)
            }
        }

        // The chromosome name may itself contain the separator, so parse fixed fields from both ends
        let fields = s.split(PACKED_STRING_SEPARATOR).collect::<Vec<_>>();
        if fields.len() < 9 {
            invalid_arg!("Unexpected field count in packed alignment string: '{s}'");
        }
        let nfields = fields.len();
        let start_in_contig = parse_field::<usize>(s, fields[0], "contig start")?;
        let end_in_contig = parse_field::<usize>(s, fields[1], "contig end")?;
        let region = fields[2..nfields - 6].join(&PACKED_STRING_SEPARATOR.to_string());
        let tail = &fields[nfields - 6..];

        let ref_span = {
            let (chrom, range) = match region.rsplit_once(':') {
                Some(x) => x,
                None => invalid_arg!("Can't parse reference span from packed alignment string: '{s}'"),
            };
            let (start, end) = match range.split_once('-') {
                Some(x) => x,
                None => invalid_arg!("Can't parse reference span from packed alignment string: '{s}'"),
            };
            RefSpan::new(
                chrom,
                parse_field(s, start, "reference start")?,
                parse_field(s, end, "reference end")?,
            )
        };

        let is_fwd_strand = match tail[0] {
            "+" => true,
            "-" => false,
            _ => invalid_arg!("Can't parse strand from packed alignment string: '{s}'"),
        };
        let cigar = parse_cigar_string(tail[1])?;
        let mapq = parse_field::<u8>(s, tail[2], "mapq")?;
        let nm = parse_optional_field::<u32>(s, tail[3], "nm")?;
        let alignment_score = parse_optional_field::<i32>(s, tail[4], "alignment score")?;
        let aln_mod_type = parse_field::<AlnModType>(s, tail[5], "modification type")?;

        let interval = Self::new(
            ref_span,
            start_in_contig,
            end_in_contig,
            cigar,
            is_fwd_strand,
            mapq,
            nm,
            alignment_score,
            aln_mod_type,
        );
        interval.validate()?;
        Ok(interval)
    }
}

impl fmt::Display for AlignmentInterval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_packed_string())
    }
}

/// Number of contig bases shared by the contig spans of two alignments
///
pub fn overlap_on_contig(a: &AlignmentInterval, b: &AlignmentInterval) -> usize {
    let start = std::cmp::max(a.start_in_contig, b.start_in_contig);
    let end = std::cmp::min(a.end_in_contig, b.end_in_contig);
    if end >= start { end + 1 - start } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_interval() -> AlignmentInterval {
        AlignmentInterval::new(
            RefSpan::new("chr1", 1001, 1110),
            21,
            135,
            parse_cigar_string("20S100M10I5D5M25S").unwrap(),
            true,
            60,
            Some(12),
            Some(88),
            AlnModType::Original,
        )
    }

    #[test]
    fn test_aln_mod_type_codes() {
        assert_eq!(AlnModType::Original.to_string(), "O");
        assert_eq!(AlnModType::ClippedForOverlapRemoval.to_string(), "H");
        assert_eq!(AlnModType::ExtractedFromLargerAlignment.to_string(), "E");
        assert_eq!(AlnModType::SplitFromGappedAlignment.to_string(), "S");
        assert_eq!(
            "S".parse::<AlnModType>().unwrap(),
            AlnModType::SplitFromGappedAlignment
        );
        assert!("Q".parse::<AlnModType>().is_err());
    }

    #[test]
    fn test_span_lengths() {
        let interval = get_test_interval();
        assert_eq!(interval.get_read_span_len(), 115);
        assert_eq!(interval.get_ref_span_len(), 110);
        assert_eq!(interval.get_unclipped_contig_len(), 160);
        assert!(interval.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let mut interval = get_test_interval();
        interval.end_in_contig = 136;
        assert!(matches!(
            interval.validate(),
            Err(crate::errors::AlnError::InvalidArgument(_))
        ));

        let mut interval = get_test_interval();
        interval.ref_span.end = 1100;
        assert!(interval.validate().is_err());

        // Hard clipped bases shift the contig span but not the aligned length
        let interval = AlignmentInterval::new(
            RefSpan::new("chr1", 11, 20),
            16,
            25,
            parse_cigar_string("10H5S10M3S2H").unwrap(),
            false,
            60,
            None,
            None,
            AlnModType::Original,
        );
        assert!(interval.validate().is_ok());
    }

    #[test]
    fn test_validate_edge_deletion() {
        let get_interval = |cigar: &str, start_in_contig, end_in_contig, ref_end| {
            AlignmentInterval::new(
                RefSpan::new("chr1", 1001, ref_end),
                start_in_contig,
                end_in_contig,
                parse_cigar_string(cigar).unwrap(),
                true,
                60,
                None,
                None,
                AlnModType::ClippedForOverlapRemoval,
            )
        };

        // Deletion next to a clipped end
        let interval = get_interval("20S5D80M", 21, 100, 1085);
        assert!(matches!(
            interval.validate(),
            Err(crate::errors::AlnError::InvalidArgument(_))
        ));
        let interval = get_interval("80M5D20S", 1, 80, 1085);
        assert!(interval.validate().is_err());

        // Deletion on an unclipped end
        let interval = get_interval("80M5D", 1, 80, 1085);
        assert!(interval.validate().is_err());

        let interval = get_interval("20S80M", 21, 100, 1080);
        assert!(interval.validate().is_ok());
    }

    #[test]
    fn test_get_read_span_len_on_malformed_span() {
        let mut interval = get_test_interval();
        interval.start_in_contig = 200;
        assert_eq!(interval.get_read_span_len(), 0);
        assert!(interval.validate().is_err());
    }

    #[test]
    fn test_packed_string() {
        let interval = get_test_interval();
        let packed = interval.to_packed_string();
        assert_eq!(packed, "21_135_chr1:1001-1110_+_20S100M10I5D5M25S_60_12_88_O");
        assert_eq!(AlignmentInterval::from_packed_string(&packed).unwrap(), interval);
        assert_eq!(format!("{interval}"), packed);

        let mut interval = get_test_interval();
        interval.ref_span.chrom = "chrUn_KI270588v1".to_string();
        interval.nm = None;
        interval.alignment_score = None;
        interval.is_fwd_strand = false;
        let packed = interval.to_packed_string();
        assert_eq!(
            packed,
            "21_135_chrUn_KI270588v1:1001-1110_-_20S100M10I5D5M25S_60_*_*_O"
        );
        assert_eq!(AlignmentInterval::from_packed_string(&packed).unwrap(), interval);

        // Negative scores are kept distinct from a missing score
        for alignment_score in [-1, -5] {
            let mut interval = get_test_interval();
            interval.nm = Some(0);
            interval.alignment_score = Some(alignment_score);
            let packed = interval.to_packed_string();
            assert!(packed.ends_with(&format!("_60_0_{alignment_score}_O")));
            let parsed = AlignmentInterval::from_packed_string(&packed).unwrap();
            assert_eq!(parsed.alignment_score, Some(alignment_score));
            assert_eq!(parsed, interval);
        }

        assert!(AlignmentInterval::from_packed_string("21_130_chr1:1001-1105_+").is_err());
        assert!(
            AlignmentInterval::from_packed_string("21_130_chr1:1001-1105_*_100M_60_0_0_O").is_err()
        );
        assert!(
            AlignmentInterval::from_packed_string("21_120_chr1:1001-1100_+_100M_60_x_0_O").is_err()
        );
    }

    #[test]
    fn test_packed_string_with_invalid_span() {
        // Contig start of 0 is not a valid 1-based position
        assert!(matches!(
            AlignmentInterval::from_packed_string("0_100_chr1:1001-1100_+_100M_60_*_*_O"),
            Err(crate::errors::AlnError::InvalidArgument(_))
        ));

        // Contig span doesn't match the cigar
        assert!(
            AlignmentInterval::from_packed_string("1_90_chr1:1001-1100_+_100M_60_*_*_O").is_err()
        );
        assert!(
            AlignmentInterval::from_packed_string("1_100_chr1:1001-1100_+_100M_60_*_*_O").is_ok()
        );
    }

    #[test]
    fn test_from_sa_segment() {
        let segment = SplitReadSegment {
            rname: "chr2".to_string(),
            pos: 99,
            cigar: parse_cigar_string("10S20M5D15M30S").unwrap(),
            is_fwd_strand: false,
            mapq: 40,
            nm: 7,
        };
        let interval = AlignmentInterval::from_sa_segment(&segment).unwrap();
        assert_eq!(interval.ref_span, RefSpan::new("chr2", 100, 139));
        assert_eq!(cigar_to_string(&interval.cigar), "30S15M5D20M10S");
        assert_eq!(interval.start_in_contig, 31);
        assert_eq!(interval.end_in_contig, 65);
        assert_eq!(interval.nm, Some(7));
        assert_eq!(interval.alignment_score, None);
        assert_eq!(interval.aln_mod_type, AlnModType::Original);
        assert!(interval.validate().is_ok());
    }

    #[test]
    fn test_overlap_on_contig() {
        let a = get_test_interval();
        let mut b = get_test_interval();
        b.start_in_contig = 126;
        b.end_in_contig = 200;
        assert_eq!(overlap_on_contig(&a, &b), 10);
        assert_eq!(overlap_on_contig(&b, &a), 10);

        b.start_in_contig = 136;
        assert_eq!(overlap_on_contig(&a, &b), 0);
    }
}
