/// Minimum indel length that splits a gapped alignment
pub const SPLIT_SENSITIVITY: u32 = 50;

/// Minimum MAPQ of the primary contig alignment record. All records pass by default.
pub const MIN_CONTIG_MAPQ: u8 = 0;
