//! Remove contig overlap between adjacent alignments of the same contig
//!

use crate::alignment_interval::{AlignmentInterval, overlap_on_contig};
use crate::clip_alignment::clip_alignment_interval;
use crate::errors::Result;

/// Select which of two overlapping alignments gives up the shared contig bases
///
/// The alignment with lower mapping quality yields, and on a tie the one with the shorter contig
/// span. If still tied the second alignment yields.
///
fn first_alignment_yields(first: &AlignmentInterval, second: &AlignmentInterval) -> bool {
    if first.mapq != second.mapq {
        first.mapq < second.mapq
    } else {
        first.get_read_span_len() < second.get_read_span_len()
    }
}

/// Clip the overlapping contig bases out of one of two alignments
///
/// The alignments must be ordered by contig start position. The yielding alignment is clipped on
/// the end facing the other alignment, which is the 3' end for the first alignment and the 5' end
/// for the second. Alignments with no overlap on the contig are returned unchanged.
///
/// Returns an error if the yielding alignment would be clipped away entirely.
///
pub fn remove_contig_overlap(
    first: &AlignmentInterval,
    second: &AlignmentInterval,
) -> Result<(AlignmentInterval, AlignmentInterval)> {
    let overlap = overlap_on_contig(first, second);
    if overlap == 0 {
        return Ok((first.clone(), second.clone()));
    }

    if first_alignment_yields(first, second) {
        let first = clip_alignment_interval(first, overlap, true)?;
        Ok((first, second.clone()))
    } else {
        let second = clip_alignment_interval(second, overlap, false)?;
        Ok((first.clone(), second))
    }
}

/// Remove contig overlap between each adjacent pair in a list of alignments from one contig
///
/// Alignments are processed in contig start order, with each alignment compared to the (possibly
/// already clipped) alignment before it.
///
pub fn remove_all_contig_overlaps(
    alignments: &[AlignmentInterval],
) -> Result<Vec<AlignmentInterval>> {
    let mut sorted_alignments = alignments.to_vec();
    sorted_alignments.sort_by_key(|x| (x.start_in_contig, x.end_in_contig));

    let mut result: Vec<AlignmentInterval> = Vec::with_capacity(sorted_alignments.len());
    for alignment in sorted_alignments {
        match result.pop() {
            Some(last) => {
                let (last, alignment) = remove_contig_overlap(&last, &alignment)?;
                result.push(last);
                result.push(alignment);
            }
            None => result.push(alignment),
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment_interval::{AlnModType, RefSpan};
    use crate::cigar::{cigar_to_string, parse_cigar_string};
    use crate::errors::AlnError;

    fn get_interval(
        cigar: &str,
        start_in_contig: usize,
        end_in_contig: usize,
        ref_start: i64,
        ref_end: i64,
        mapq: u8,
    ) -> AlignmentInterval {
        AlignmentInterval::new(
            RefSpan::new("chr1", ref_start, ref_end),
            start_in_contig,
            end_in_contig,
            parse_cigar_string(cigar).unwrap(),
            true,
            mapq,
            Some(0),
            Some(100),
            AlnModType::Original,
        )
    }

    #[test]
    fn test_no_overlap() {
        let first = get_interval("100M100S", 1, 100, 1001, 1100, 60);
        let second = get_interval("100S100M", 101, 200, 5001, 5100, 60);
        let (a, b) = remove_contig_overlap(&first, &second).unwrap();
        assert_eq!(a, first);
        assert_eq!(b, second);
    }

    #[test]
    fn test_lower_mapq_yields() {
        let first = get_interval("110M90S", 1, 110, 1001, 1110, 20);
        let second = get_interval("100S100M", 101, 200, 5001, 5100, 60);
        let (a, b) = remove_contig_overlap(&first, &second).unwrap();
        assert_eq!(cigar_to_string(&a.cigar), "100M100S");
        assert_eq!(a.end_in_contig, 100);
        assert_eq!(a.ref_span, RefSpan::new("chr1", 1001, 1100));
        assert_eq!(a.aln_mod_type, AlnModType::ClippedForOverlapRemoval);
        assert_eq!(b, second);

        let first = get_interval("110M90S", 1, 110, 1001, 1110, 60);
        let second = get_interval("100S100M", 101, 200, 5001, 5100, 20);
        let (a, b) = remove_contig_overlap(&first, &second).unwrap();
        assert_eq!(a, first);
        assert_eq!(cigar_to_string(&b.cigar), "110S90M");
        assert_eq!(b.start_in_contig, 111);
        assert_eq!(b.ref_span, RefSpan::new("chr1", 5011, 5100));
    }

    #[test]
    fn test_shorter_alignment_yields_on_mapq_tie() {
        let first = get_interval("60M140S", 1, 60, 1001, 1060, 60);
        let second = get_interval("50S150M", 51, 200, 5001, 5150, 60);
        let (a, b) = remove_contig_overlap(&first, &second).unwrap();
        assert_eq!(cigar_to_string(&a.cigar), "50M150S");
        assert_eq!(a.end_in_contig, 50);
        assert_eq!(b, second);
    }

    #[test]
    fn test_contained_alignment_fails() {
        let first = get_interval("200M", 1, 200, 1001, 1200, 60);
        let second = get_interval("50S50M100S", 51, 100, 5001, 5050, 10);
        assert!(matches!(
            remove_contig_overlap(&first, &second),
            Err(AlnError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_remove_all_contig_overlaps() {
        let alignments = vec![
            get_interval("100S100M100S", 101, 200, 3001, 3100, 60),
            get_interval("110M190S", 1, 110, 1001, 1110, 20),
            get_interval("190S110M", 191, 300, 5001, 5110, 20),
        ];
        let result = remove_all_contig_overlaps(&alignments).unwrap();
        let cigars = result
            .iter()
            .map(|x| cigar_to_string(&x.cigar))
            .collect::<Vec<_>>();
        assert_eq!(cigars, vec!["100M200S", "100S100M100S", "200S100M"]);
        assert_eq!(result[2].ref_span, RefSpan::new("chr1", 5011, 5110));
    }
}
