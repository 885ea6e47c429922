use rust_htslib::bam::record::Cigar;

use crate::cigar::parse_cigar_string;
use crate::errors::{Result, invalid_arg};

/// Object to directly represent one segment from a BAM split alignment
#[derive(Debug, PartialEq)]
pub struct SplitReadSegment {
    /// reference sequence name
    pub rname: String,

    /// reference zero-indexed alignment start position
    pub pos: i64,

    /// Alignment in the reference orientation, as given in the SA tag
    pub cigar: Vec<Cigar>,

    pub is_fwd_strand: bool,

    /// mapping quality
    pub mapq: u8,

    /// alignment edit distance
    pub nm: u32,
}

/// Parse one segment from the bam SA aux tag string into a split alignment object
///
pub fn parse_sa_segment(seg: &str) -> Result<SplitReadSegment> {
    let sa_fields = seg.split_terminator(',').collect::<Vec<_>>();
    if sa_fields.len() != 6 {
        invalid_arg!("Unexpected segment in bam SA tag: '{seg}'");
    }

    fn parse_field<T: std::str::FromStr>(seg: &str, field: &str, label: &str) -> Result<T> {
        match field.parse::<T>() {
            Ok(x) => Ok(x),
            Err(_) => invalid_arg!("Can't parse {label} from bam SA tag segment: '{seg}'"),
        }
    }

    let rname = sa_fields[0].to_string();
    let pos = parse_field::<i64>(seg, sa_fields[1], "position")? - 1;
    let is_fwd_strand = match sa_fields[2] {
        "+" => true,
        "-" => false,
        _ => invalid_arg!("Can't parse strand from bam SA tag segment: '{seg}'"),
    };
    let cigar = parse_cigar_string(sa_fields[3])?;
    let mapq = parse_field::<u8>(seg, sa_fields[4], "mapping quality")?;
    let nm = parse_field::<u32>(seg, sa_fields[5], "edit distance")?;
    Ok(SplitReadSegment {
        rname,
        pos,
        cigar,
        is_fwd_strand,
        mapq,
        nm,
    })
}

/// Split the bam SA aux tag into each supplementary alignment, and parse each into a split alignment object
///
/// This routine checks the SA tag syntax, but doesn't check that contig names are restricted to an
/// expected set. All such checks are left to the client.
///
pub fn parse_sa_aux_val(sa_aux_val: &str) -> Result<Vec<SplitReadSegment>> {
    sa_aux_val
        .split_terminator(';')
        .map(parse_sa_segment)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sa_aux_val() {
        let test_val = "chr3,10001,+,5535S10=1D39=2X11438S,60,192;\
        chr3,10001,+,3073S15=2D20=2X11=1X5=1I23=1X5=14798S,22,44;\
        chr4,106872270,-,23=1I226=1I195=1X147=1D1021=7362S,60,19;";

        let result = parse_sa_aux_val(test_val).unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result[2].rname, "chr4");
        assert_eq!(result[1].pos, 10_000);
        assert_eq!(result[1].mapq, 22);
        assert_eq!(result[0].nm, 192);
        assert!(!result[2].is_fwd_strand);
    }

    #[test]
    fn test_parse_malformed_sa_segment() {
        assert!(parse_sa_segment("chr3,10001,+,100M,60").is_err());
        assert!(parse_sa_segment("chr3,10001,?,100M,60,0").is_err());
        assert!(parse_sa_segment("chr3,x,+,100M,60,0").is_err());
        assert!(parse_sa_segment("chr3,10001,+,100Q,60,0").is_err());
        assert!(parse_sa_aux_val("chr3,10001,+,100M,60,0;chr4,1,+,5M,300,0;").is_err());
    }
}
