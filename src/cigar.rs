//! CIGAR operation classification and offset utilities
//!
//! All alignments handled here use the rust-htslib `Cigar` element type. The match-like elements
//! (`M`, `=`, `X`) are all treated as alignment matches.
//!

use rust_htslib::bam::record::{Cigar, CigarString};

use crate::errors::{Result, invalid_arg};

/// Is the cigar element any clip type?
///
pub fn is_clip(c: &Cigar) -> bool {
    matches!(c, Cigar::SoftClip(_) | Cigar::HardClip(_))
}

/// Is the cigar element any of the alignment match types?
///
pub fn is_alignment_match(c: &Cigar) -> bool {
    matches!(c, Cigar::Match(_) | Cigar::Equal(_) | Cigar::Diff(_))
}

pub fn is_indel(c: &Cigar) -> bool {
    matches!(c, Cigar::Ins(_) | Cigar::Del(_))
}

/// Skip and padding elements are not supported by the alignment modification routines
///
pub fn is_unsupported(c: &Cigar) -> bool {
    matches!(c, Cigar::RefSkip(_) | Cigar::Pad(_))
}

/// Does the cigar element consume read bases?
///
/// Hard-clipped bases are not included.
///
pub fn consumes_read_bases(c: &Cigar) -> bool {
    use Cigar::*;
    matches!(c, Match(_) | Equal(_) | Diff(_) | Ins(_) | SoftClip(_))
}

pub fn consumes_ref_bases(c: &Cigar) -> bool {
    use Cigar::*;
    matches!(c, Match(_) | Equal(_) | Diff(_) | Del(_) | RefSkip(_))
}

pub fn get_cigarseg_read_offset(c: &Cigar, ignore_hard_clip: bool) -> usize {
    match c {
        Cigar::HardClip(len) => {
            if ignore_hard_clip {
                0
            } else {
                *len as usize
            }
        }
        _ => {
            if consumes_read_bases(c) {
                c.len() as usize
            } else {
                0
            }
        }
    }
}

pub fn get_cigarseg_ref_offset(c: &Cigar) -> i64 {
    if consumes_ref_bases(c) {
        c.len() as i64
    } else {
        0
    }
}

/// Report the read offset of the cigar alignment
///
pub fn get_cigar_read_offset(cigar: &[Cigar], ignore_hard_clip: bool) -> usize {
    cigar
        .iter()
        .map(|c| get_cigarseg_read_offset(c, ignore_hard_clip))
        .sum()
}

/// Report the reference offset of the cigar alignment
///
pub fn get_cigar_ref_offset(cigar: &[Cigar]) -> i64 {
    cigar.iter().map(get_cigarseg_ref_offset).sum()
}

/// Total read length implied by the cigar, including hard-clipped bases
///
pub fn get_unclipped_read_len(cigar: &[Cigar]) -> usize {
    get_cigar_read_offset(cigar, false)
}

/// Total soft and hard clip length on the left end of the cigar
///
pub fn get_leading_clip_len(cigar: &[Cigar]) -> usize {
    cigar
        .iter()
        .take_while(|x| is_clip(x))
        .map(|x| x.len() as usize)
        .sum()
}

/// Total soft and hard clip length on the right end of the cigar
///
pub fn get_trailing_clip_len(cigar: &[Cigar]) -> usize {
    cigar
        .iter()
        .rev()
        .take_while(|x| is_clip(x))
        .map(|x| x.len() as usize)
        .sum()
}

/// Return true if the CIGAR string contains any aligned (M/X/=) segments
///
pub fn has_aligned_segments(cigar: &[Cigar]) -> bool {
    cigar.iter().any(is_alignment_match)
}

/// Return a copy of the cigar element with its length replaced
///
pub fn with_len(c: &Cigar, len: u32) -> Cigar {
    use Cigar::*;
    match c {
        Match(_) => Match(len),
        Ins(_) => Ins(len),
        Del(_) => Del(len),
        RefSkip(_) => RefSkip(len),
        SoftClip(_) => SoftClip(len),
        HardClip(_) => HardClip(len),
        Pad(_) => Pad(len),
        Equal(_) => Equal(len),
        Diff(_) => Diff(len),
    }
}

/// Compress CIGAR string down to canonical format:
///
/// 1. Convert any matching adjacent cigar elements into a single element
/// 2. Remove any zero-length elements
///
pub fn compress_cigar(cigar_in: &[Cigar]) -> Vec<Cigar> {
    let mut cigar_out: Vec<Cigar> = Vec::with_capacity(cigar_in.len());
    for new_elem in cigar_in.iter().filter(|x| x.len() > 0) {
        match cigar_out.last_mut() {
            Some(last_elem)
                if std::mem::discriminant(last_elem) == std::mem::discriminant(new_elem) =>
            {
                *last_elem = with_len(last_elem, last_elem.len() + new_elem.len());
            }
            _ => cigar_out.push(*new_elem),
        }
    }
    cigar_out
}

/// Convert CIGAR in string format into a cigar element list
///
pub fn parse_cigar_string(cigar_str: &str) -> Result<Vec<Cigar>> {
    match CigarString::try_from(cigar_str.as_bytes()) {
        Ok(x) => Ok(x.0),
        Err(e) => invalid_arg!("Can't parse CIGAR string '{cigar_str}': {e}"),
    }
}

pub fn cigar_to_string(cigar: &[Cigar]) -> String {
    CigarString(cigar.to_vec()).to_string()
}
