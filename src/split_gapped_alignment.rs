//! Split a gapped contig alignment into ungapped alignment fragments
//!

use rust_htslib::bam::record::Cigar;

use crate::alignment_interval::{AlignmentInterval, AlnModType, RefSpan};
use crate::cigar::{consumes_read_bases, consumes_ref_bases, is_alignment_match, is_indel};
use crate::errors::{Result, invalid_arg};

/// Boundaries of one ungapped alignment block found while scanning the cigar
///
/// Contig and reference end positions are exclusive. Reference positions use the signed scan
/// convention described in `split_gapped_alignment`.
///
struct AlignmentBlock {
    start_contig: usize,
    start_index: usize,
    start_ref: i64,
    end_contig: usize,
    end_index: usize,
    end_ref: i64,
}

/// Split a gapped alignment into multiple alignments at each insertion or deletion at least
/// `sensitivity` bases long
///
/// Each fragment keeps the contig-length cigar format of the input, for instance with sensitivity
/// 50, "10M10D10M60I10M10I10M50D10M" is split into:
/// - "10M10D10M100S"
/// - "80S10M10I10M10S"
/// - "110S10M"
///
/// Hard clips on either end of the input are copied to every fragment, with soft-clip added as
/// needed between the hard clip and the fragment's alignment block, so that "1H2S3M5I10M20D6M7S8H"
/// split at every gap gives "1H2S3M28S8H", "1H10S10M13S8H" and "1H20S6M7S8H".
///
/// Indels shorter than `sensitivity` stay inside the fragment's alignment block.
///
/// Returns the input alignment alone if it is not split into at least two fragments.
///
/// # Arguments
/// * `unclipped_contig_len` - Full length of the contig, including all clipped bases
///
pub fn split_gapped_alignment(
    input: &AlignmentInterval,
    sensitivity: u32,
    unclipped_contig_len: usize,
) -> Result<Vec<AlignmentInterval>> {
    if sensitivity == 0 {
        invalid_arg!("Gap split sensitivity must be at least 1: {input}");
    }

    let cigar = &input.cigar;
    if cigar.len() <= 1 {
        return Ok(vec![input.clone()]);
    }

    let is_hard_clip = |c: &Cigar| matches!(c, Cigar::HardClip(_));
    let leading_hard_clip = cigar.first().copied().filter(is_hard_clip);
    let trailing_hard_clip = cigar.last().copied().filter(is_hard_clip);

    let mut contig_offset = leading_hard_clip.map_or(0, |x| x.len() as usize);
    let scan_start = if leading_hard_clip.is_some() { 1 } else { 0 };
    let scan_end = cigar.len() - if trailing_hard_clip.is_some() { 1 } else { 0 };

    // Reverse strand reference positions are negated so that they increase along the contig
    let mut ref_offset = if input.is_fwd_strand {
        input.ref_span.start
    } else {
        -input.ref_span.end
    };

    let get_fragment = |block: &AlignmentBlock| {
        let mut fragment_cigar = Vec::new();

        let mut leading_soft_clip_len = block.start_contig;
        if let Some(c) = leading_hard_clip {
            fragment_cigar.push(c);
            leading_soft_clip_len -= c.len() as usize;
        }
        if leading_soft_clip_len > 0 {
            fragment_cigar.push(Cigar::SoftClip(leading_soft_clip_len as u32));
        }

        fragment_cigar.extend_from_slice(&cigar[block.start_index..block.end_index]);

        let mut trailing_soft_clip_len = unclipped_contig_len as i64 - block.end_contig as i64;
        if let Some(c) = trailing_hard_clip {
            trailing_soft_clip_len -= c.len() as i64;
        }
        if trailing_soft_clip_len > 0 {
            fragment_cigar.push(Cigar::SoftClip(trailing_soft_clip_len as u32));
        }
        if let Some(c) = trailing_hard_clip {
            fragment_cigar.push(c);
        }

        let chrom = &input.ref_span.chrom;
        let ref_span = if input.is_fwd_strand {
            RefSpan::new(chrom, block.start_ref, block.end_ref - 1)
        } else {
            RefSpan::new(chrom, -block.end_ref + 1, -block.start_ref)
        };

        AlignmentInterval::new(
            ref_span,
            block.start_contig + 1,
            block.end_contig,
            fragment_cigar,
            input.is_fwd_strand,
            input.mapq,
            None,
            None,
            AlnModType::SplitFromGappedAlignment,
        )
    };

    let mut fragments = Vec::new();
    let mut open_block: Option<AlignmentBlock> = None;
    for (index, c) in cigar.iter().enumerate().take(scan_end).skip(scan_start) {
        let len = c.len() as usize;
        if is_alignment_match(c) {
            let block = open_block.get_or_insert(AlignmentBlock {
                start_contig: contig_offset,
                start_index: index,
                start_ref: ref_offset,
                end_contig: contig_offset,
                end_index: index,
                end_ref: ref_offset,
            });
            block.end_contig = contig_offset + len;
            block.end_index = index + 1;
            block.end_ref = ref_offset + len as i64;
        } else if is_indel(c) && c.len() >= sensitivity {
            if let Some(block) = open_block.take() {
                fragments.push(get_fragment(&block));
            }
        }

        if consumes_read_bases(c) {
            contig_offset += len;
        }
        if consumes_ref_bases(c) {
            ref_offset += len as i64;
        }
    }

    if let Some(block) = open_block.take() {
        fragments.push(get_fragment(&block));
    }

    if fragments.len() < 2 {
        return Ok(vec![input.clone()]);
    }
    Ok(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cigar::{cigar_to_string, get_unclipped_read_len, parse_cigar_string};
    use crate::errors::AlnError;

    fn get_interval(
        cigar: &str,
        start_in_contig: usize,
        end_in_contig: usize,
        ref_start: i64,
        ref_end: i64,
        is_fwd_strand: bool,
    ) -> AlignmentInterval {
        AlignmentInterval::new(
            RefSpan::new("chr1", ref_start, ref_end),
            start_in_contig,
            end_in_contig,
            parse_cigar_string(cigar).unwrap(),
            is_fwd_strand,
            60,
            Some(3),
            Some(100),
            AlnModType::Original,
        )
    }

    fn split_cigars(fragments: &[AlignmentInterval]) -> Vec<String> {
        fragments.iter().map(|x| cigar_to_string(&x.cigar)).collect()
    }

    #[test]
    fn test_split_at_every_gap() {
        let interval = get_interval(
            "397S118M2D26M6I50M7I26M1I8M13D72M398S",
            398,
            711,
            1001,
            1315,
            true,
        );
        let contig_len = get_unclipped_read_len(&interval.cigar);
        assert_eq!(contig_len, 1109);

        let fragments = split_gapped_alignment(&interval, 1, contig_len).unwrap();
        assert_eq!(
            split_cigars(&fragments),
            vec![
                "397S118M594S",
                "515S26M568S",
                "547S50M512S",
                "604S26M479S",
                "631S8M470S",
                "639S72M398S",
            ]
        );

        for fragment in fragments.iter() {
            assert_eq!(get_unclipped_read_len(&fragment.cigar), contig_len);
            assert_eq!(fragment.aln_mod_type, AlnModType::SplitFromGappedAlignment);
            assert_eq!(fragment.mapq, 60);
            assert_eq!(fragment.nm, None);
            assert_eq!(fragment.alignment_score, None);
            assert!(fragment.validate().is_ok());
        }

        assert_eq!(fragments[0].ref_span, RefSpan::new("chr1", 1001, 1118));
        assert_eq!((fragments[0].start_in_contig, fragments[0].end_in_contig), (398, 515));
        assert_eq!(fragments[1].ref_span, RefSpan::new("chr1", 1121, 1146));
        assert_eq!(fragments[5].ref_span, RefSpan::new("chr1", 1244, 1315));
        assert_eq!((fragments[5].start_in_contig, fragments[5].end_in_contig), (640, 711));
    }

    #[test]
    fn test_split_at_large_gaps_only() {
        let interval = get_interval("10M10D10M60I10M10I10M50D10M", 1, 120, 1, 110, true);
        let fragments = split_gapped_alignment(&interval, 50, 120).unwrap();
        assert_eq!(
            split_cigars(&fragments),
            vec!["10M10D10M100S", "80S10M10I10M10S", "110S10M"]
        );

        let ref_spans = fragments.iter().map(|x| x.ref_span.clone()).collect::<Vec<_>>();
        assert_eq!(
            ref_spans,
            vec![
                RefSpan::new("chr1", 1, 30),
                RefSpan::new("chr1", 31, 50),
                RefSpan::new("chr1", 101, 110),
            ]
        );

        let contig_spans = fragments
            .iter()
            .map(|x| (x.start_in_contig, x.end_in_contig))
            .collect::<Vec<_>>();
        assert_eq!(contig_spans, vec![(1, 20), (81, 110), (111, 120)]);
    }

    #[test]
    fn test_split_reverse_strand() {
        let interval = get_interval("10M10D10M60I10M10I10M50D10M", 1, 120, 1001, 1110, false);
        let fragments = split_gapped_alignment(&interval, 50, 120).unwrap();
        assert_eq!(fragments.len(), 3);

        // The 5' end of the contig is aligned to the reference end
        assert_eq!(fragments[0].ref_span, RefSpan::new("chr1", 1081, 1110));
        assert_eq!(fragments[1].ref_span, RefSpan::new("chr1", 1061, 1080));
        assert_eq!(fragments[2].ref_span, RefSpan::new("chr1", 1001, 1010));
        assert!(fragments.iter().all(|x| !x.is_fwd_strand));
    }

    #[test]
    fn test_split_with_hard_clips() {
        let interval = get_interval("1H2S3M5I10M20D6M7S8H", 4, 27, 1001, 1039, true);
        let fragments = split_gapped_alignment(&interval, 1, 42).unwrap();
        assert_eq!(
            split_cigars(&fragments),
            vec!["1H2S3M28S8H", "1H10S10M13S8H", "1H20S6M7S8H"]
        );
        let contig_spans = fragments
            .iter()
            .map(|x| (x.start_in_contig, x.end_in_contig))
            .collect::<Vec<_>>();
        assert_eq!(contig_spans, vec![(4, 6), (12, 21), (22, 27)]);
        assert_eq!(fragments[2].ref_span, RefSpan::new("chr1", 1034, 1039));
    }

    #[test]
    fn test_no_split_returns_input() {
        let interval = get_interval("10S50M5I30M2D40M10S", 11, 135, 1001, 1122, true);
        let fragments = split_gapped_alignment(&interval, 6, 145).unwrap();
        assert_eq!(fragments, vec![interval.clone()]);

        // A large gap next to the alignment edge doesn't produce two blocks
        let interval = get_interval("10S50M80I10S", 11, 140, 1001, 1050, true);
        let fragments = split_gapped_alignment(&interval, 1, 150).unwrap();
        assert_eq!(fragments, vec![interval.clone()]);

        let interval = get_interval("100M", 1, 100, 1001, 1100, true);
        let fragments = split_gapped_alignment(&interval, 1, 100).unwrap();
        assert_eq!(fragments, vec![interval]);
    }

    #[test]
    fn test_no_aligned_block_returns_input() {
        let interval = get_interval("10S5I10S", 11, 15, 1001, 1001, true);
        let fragments = split_gapped_alignment(&interval, 10, 25).unwrap();
        assert_eq!(fragments, vec![interval]);
    }

    #[test]
    fn test_zero_sensitivity() {
        let interval = get_interval("10M5I10M", 1, 25, 1001, 1020, true);
        assert!(matches!(
            split_gapped_alignment(&interval, 0, 25),
            Err(AlnError::InvalidArgument(_))
        ));
    }
}
