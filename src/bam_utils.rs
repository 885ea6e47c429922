//! Conversion of contig alignment bam records into alignment intervals
//!

use rust_htslib::bam::{self, record::Aux};

use crate::alignment_interval::AlignmentInterval;
use crate::errors::{Result, invalid_arg};
use crate::sa_tag_parser::parse_sa_aux_val;

pub const SA_AUX_TAG: &[u8] = b"SA";
pub const NM_AUX_TAG: &[u8] = b"NM";
pub const AS_AUX_TAG: &[u8] = b"AS";

pub fn get_qname(record: &bam::Record) -> String {
    String::from_utf8_lossy(record.qname()).to_string()
}

/// Retrieve an int aux tag from bam file
///
/// Returns None if the tag is missing, and an error if the tag has a non-int value
///
pub fn get_optional_int_aux_tag(record: &bam::Record, aux_tag: &[u8]) -> Result<Option<i64>> {
    let aux_val = match record.aux(aux_tag) {
        Ok(x) => x,
        Err(_) => return Ok(None),
    };
    Ok(Some(match aux_val {
        Aux::U8(val) => val as i64,
        Aux::U16(val) => val as i64,
        Aux::U32(val) => val as i64,
        Aux::I8(val) => val as i64,
        Aux::I16(val) => val as i64,
        Aux::I32(val) => val as i64,
        _ => invalid_arg!(
            "Unexpected {} tag format in read {}: {:?}",
            String::from_utf8_lossy(aux_tag),
            get_qname(record),
            aux_val
        ),
    }))
}

/// Retrieve a string aux tag from bam file
///
/// Returns None if the tag is missing, and an error if the tag has a non-string value
///
pub fn get_optional_string_aux_tag(
    record: &bam::Record,
    aux_tag: &[u8],
) -> Result<Option<String>> {
    match record.aux(aux_tag) {
        Ok(Aux::String(val)) => Ok(Some(val.to_string())),
        Ok(aux_val) => invalid_arg!(
            "Unexpected {} tag format in read {}: {:?}",
            String::from_utf8_lossy(aux_tag),
            get_qname(record),
            aux_val
        ),
        Err(_) => Ok(None),
    }
}

/// Build the alignment interval for a single mapped bam record
///
/// The record cigar is reversed for reverse-strand records so that the interval is expressed in the
/// 5' to 3' direction of the contig.
///
pub fn get_alignment_interval_from_record(
    header: &bam::HeaderView,
    record: &bam::Record,
) -> Result<AlignmentInterval> {
    if record.is_unmapped() || record.tid() < 0 {
        invalid_arg!("Can't build alignment from unmapped read {}", get_qname(record));
    }
    let chrom = String::from_utf8_lossy(header.tid2name(record.tid() as u32)).to_string();
    let is_fwd_strand = !record.is_reverse();
    let cigar = if is_fwd_strand {
        record.cigar().iter().copied().collect::<Vec<_>>()
    } else {
        record.cigar().iter().rev().copied().collect::<Vec<_>>()
    };

    let nm = get_optional_int_aux_tag(record, NM_AUX_TAG)?.and_then(|x| u32::try_from(x).ok());
    let alignment_score =
        get_optional_int_aux_tag(record, AS_AUX_TAG)?.and_then(|x| i32::try_from(x).ok());

    AlignmentInterval::from_aligned_cigar(
        &chrom,
        record.pos(),
        cigar,
        is_fwd_strand,
        record.mapq(),
        nm,
        alignment_score,
    )
}

/// Get all alignment intervals of the contig represented by one bam record
///
/// This includes the record's own alignment and any split alignments described in its SA tag. The
/// intervals are sorted by their start position on the contig.
///
pub fn get_contig_alignment_intervals(
    header: &bam::HeaderView,
    record: &bam::Record,
) -> Result<Vec<AlignmentInterval>> {
    let mut intervals = vec![get_alignment_interval_from_record(header, record)?];
    let contig_len = intervals[0].get_unclipped_contig_len();

    if let Some(sa_aux_val) = get_optional_string_aux_tag(record, SA_AUX_TAG)? {
        for sa_segment in parse_sa_aux_val(&sa_aux_val)? {
            let interval = AlignmentInterval::from_sa_segment(&sa_segment)?;
            if interval.get_unclipped_contig_len() != contig_len {
                invalid_arg!(
                    "Split alignment segment implies contig length {} instead of {contig_len} in read {}",
                    interval.get_unclipped_contig_len(),
                    get_qname(record)
                );
            }
            intervals.push(interval);
        }
    }

    intervals.sort_by_key(|x| (x.start_in_contig, x.end_in_contig));
    Ok(intervals)
}
