//! > **Clipping and gap-splitting of assembled contig alignments**
//!
//! Contig alignments are represented as [`AlignmentInterval`]s, which can be clipped on either end
//! of the contig while keeping a consistent cigar and reference span, or split into multiple
//! alignments at large insertions and deletions.
//!

pub use crate::alignment_interval::{AlignmentInterval, AlnModType, RefSpan};
pub use crate::clip_alignment::clip_alignment_interval;
pub use crate::errors::{AlnError, Result};
pub use crate::overlap::{remove_all_contig_overlaps, remove_contig_overlap};
pub use crate::split_gapped_alignment::split_gapped_alignment;

pub mod alignment_interval;
pub mod bam_utils;
pub mod cigar;
pub mod clip_alignment;
pub mod errors;
pub mod overlap;
pub mod sa_tag_parser;
pub mod split_gapped_alignment;
