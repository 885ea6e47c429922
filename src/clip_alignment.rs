//! Clip a requested number of contig bases from either end of an alignment
//!
//! Clipping has to track three coordinate systems at once: contig positions, cigar elements and
//! reference positions. The new cigar and reference span are computed first, and the new contig
//! span is then derived from both the requested clip length and the new cigar, because a clip can
//! remove an entire alignment block together with its neighboring indel.
//!

use rust_htslib::bam::record::Cigar;

use crate::alignment_interval::{AlignmentInterval, AlnModType, RefSpan};
use crate::cigar::{
    cigar_to_string, compress_cigar, consumes_read_bases, consumes_ref_bases,
    get_leading_clip_len, get_trailing_clip_len, get_unclipped_read_len, has_aligned_segments,
    is_alignment_match, is_indel, is_unsupported,
};
use crate::errors::{Result, inconsistent, invalid_arg};

/// Clip `clip_len` contig bases from one end of `input`
///
/// Returns a new alignment with the cigar, reference span and contig span recomputed. The edit
/// distance of the new alignment is unset because it is not recomputed, while the alignment score
/// and mapping quality are copied from the input.
///
/// # Arguments
/// * `clip_len` - Number of contig bases to clip, must be less than the contig span of `input`
/// * `clip_from_3p_end` - Clip from the 3' end of the contig if true, otherwise the 5' end
///
pub fn clip_alignment_interval(
    input: &AlignmentInterval,
    clip_len: usize,
    clip_from_3p_end: bool,
) -> Result<AlignmentInterval> {
    if input.start_in_contig < 1 || input.start_in_contig > input.end_in_contig {
        invalid_arg!("Invalid contig span in input alignment: {input}");
    }
    if clip_len >= input.get_read_span_len() {
        invalid_arg!(
            "Requested clip length {clip_len} would clip away the whole input alignment: {input}"
        );
    }

    let (ref_span, cigar) = compute_new_ref_span_and_cigar(input, clip_len, clip_from_3p_end)?;
    let (start_in_contig, end_in_contig) = compute_new_read_span(
        input.start_in_contig,
        input.end_in_contig,
        &cigar,
        clip_len,
        clip_from_3p_end,
    );

    Ok(AlignmentInterval::new(
        ref_span,
        start_in_contig,
        end_in_contig,
        cigar,
        input.is_fwd_strand,
        input.mapq,
        None,
        input.alignment_score,
        AlnModType::ClippedForOverlapRemoval,
    ))
}

/// Find the new contig span after clipping
///
/// The new span can't be found by subtracting the clip length alone. Given cigar "20S100M10I..."
/// clipped by 105 bases from the 5' end, the whole 100M block is clipped together with the
/// following insertion, so the new start is 131 rather than 21 + 105 = 126.
///
fn compute_new_read_span(
    start_in_contig: usize,
    end_in_contig: usize,
    new_cigar: &[Cigar],
    clip_len: usize,
    clip_from_3p_end: bool,
) -> (usize, usize) {
    if clip_from_3p_end {
        let end = std::cmp::min(
            end_in_contig - clip_len,
            get_unclipped_read_len(new_cigar) - get_trailing_clip_len(new_cigar),
        );
        (start_in_contig, end)
    } else {
        let start = std::cmp::max(
            start_in_contig + clip_len,
            get_leading_clip_len(new_cigar) + 1,
        );
        (start, end_in_contig)
    }
}

/// Find the new reference span and cigar after clipping
///
/// Returns an error if the input cigar contains skip or padding elements.
///
fn compute_new_ref_span_and_cigar(
    input: &AlignmentInterval,
    clip_len: usize,
    clip_from_3p_end: bool,
) -> Result<(RefSpan, Vec<Cigar>)> {
    if input.cigar.iter().any(is_unsupported) {
        invalid_arg!(
            "Input alignment contains padding or skip operations, which are not supported: {input}"
        );
    }

    let error_context = || {
        format!(
            "{input} clip length: {clip_len} clip from end: {} of contig",
            if clip_from_3p_end { 3 } else { 5 }
        )
    };

    let (left_clip, middle, right_clip) = split_cigar_by_left_and_right_clipping(input)?;

    // Walk the alignment block from the clipped end:
    let block = if clip_from_3p_end {
        middle.iter().rev().copied().collect::<Vec<_>>()
    } else {
        middle.to_vec()
    };

    let mut read_bases_consumed = 0;
    let mut ref_bases_consumed = 0;
    let mut new_block = Vec::with_capacity(block.len() + 1);
    for (index, c) in block.iter().enumerate() {
        let len = c.len() as usize;
        if consumes_read_bases(c) {
            if read_bases_consumed + len < clip_len {
                read_bases_consumed += len;
            } else {
                // Only a match or insertion can straddle the clip boundary
                let is_match = is_alignment_match(c);
                if !is_match && !matches!(c, Cigar::Ins(_)) {
                    inconsistent!(
                        "Clip boundary falls in cigar element '{}' which is neither a match nor an insertion. Input cigar: {} {}",
                        cigar_to_string(&[*c]),
                        cigar_to_string(&input.cigar),
                        error_context()
                    );
                }

                new_block.push(Cigar::SoftClip(clip_len as u32));
                let leftover_len = (read_bases_consumed + len - clip_len) as u32;
                if leftover_len > 0 {
                    new_block.push(if is_match {
                        Cigar::Match(leftover_len)
                    } else {
                        Cigar::SoftClip(leftover_len)
                    });
                }
                new_block.extend_from_slice(&block[index + 1..]);

                if is_match {
                    ref_bases_consumed += (clip_len - read_bases_consumed) as i64;
                }
                break;
            }
        }
        if consumes_ref_bases(c) {
            ref_bases_consumed += len as i64;
        }
    }

    if new_block.len() < 2 {
        inconsistent!(
            "Alignment contains no or only one cigar element after clipping, the whole alignment may have been clipped away. {}",
            error_context()
        );
    }

    // A clip can remove a whole alignment block next to one or more indels, e.g. "30M5I2D..." clipped
    // by 30 bases gives "30S5I2D...". Fold every such indel into the clipped region so that the new
    // cigar starts with an alignment block: "30S5I2D" becomes "35S" with a 2 base reference shift.
    let mut new_block = compress_cigar(&new_block);
    while new_block.len() > 1
        && matches!(new_block[0], Cigar::SoftClip(_))
        && is_indel(&new_block[1])
    {
        if new_block.len() < 3 {
            inconsistent!(
                "Alignment contains no aligned bases after clipping, the whole alignment may have been clipped away. {}",
                error_context()
            );
        }
        let indel = new_block.remove(1);
        match indel {
            Cigar::Del(len) => {
                ref_bases_consumed += len as i64;
            }
            _ => {
                new_block[0] = Cigar::SoftClip(new_block[0].len() + indel.len());
            }
        }
    }
    if !has_aligned_segments(&new_block) {
        inconsistent!(
            "Alignment contains no aligned bases after clipping, the whole alignment may have been clipped away. {}",
            error_context()
        );
    }

    if clip_from_3p_end {
        new_block.reverse();
    }

    let new_cigar = {
        let mut x = left_clip.to_vec();
        x.extend(new_block);
        x.extend_from_slice(right_clip);
        compress_cigar(&x)
    };

    // Clipping the 3' end of a forward alignment or the 5' end of a reverse alignment moves the
    // reference end, otherwise the reference start moves
    let span = &input.ref_span;
    let new_ref_span = if clip_from_3p_end == input.is_fwd_strand {
        RefSpan::new(&span.chrom, span.start, span.end - ref_bases_consumed)
    } else {
        RefSpan::new(&span.chrom, span.start + ref_bases_consumed, span.end)
    };

    Ok((new_ref_span, new_cigar))
}

/// Split the alignment cigar into three parts:
/// 1. Cigar elements before the contig start position of the alignment
/// 2. Cigar elements of the alignment block itself
/// 3. Cigar elements after the contig end position of the alignment
///
/// Hard-clipped bases are counted as contig positions here, so that the partition is consistent
/// with the contig span.
///
/// For example, an alignment with cigar "10H20S5M15I25M35D45M30S40H" with contig span 31-120 is
/// split into ([10H, 20S], [5M, 15I, 25M, 35D, 45M], [30S, 40H]).
///
fn split_cigar_by_left_and_right_clipping(
    input: &AlignmentInterval,
) -> Result<(&[Cigar], &[Cigar], &[Cigar])> {
    let cigar = input.cigar.as_slice();

    let mut read_pos = 0;
    let mut middle_start = cigar.len();
    let mut right_start = cigar.len();
    for (index, c) in cigar.iter().enumerate() {
        if read_pos < input.start_in_contig - 1 {
            // left clipping
        } else if read_pos < input.end_in_contig {
            middle_start = std::cmp::min(middle_start, index);
        } else {
            right_start = index;
            break;
        }
        if consumes_read_bases(c) || matches!(c, Cigar::HardClip(_)) {
            read_pos += c.len() as usize;
        }
    }
    let middle_start = std::cmp::min(middle_start, right_start);

    if middle_start == right_start {
        inconsistent!("Cigar elements corresponding to the alignment block are empty: {input}");
    }

    Ok((
        &cigar[..middle_start],
        &cigar[middle_start..right_start],
        &cigar[right_start..],
    ))
}
