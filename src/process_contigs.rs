//! Read contig alignments, modify them and write the results for each command
//!

use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::Instant;

use camino::Utf8Path;
use itertools::Itertools;
use log::{debug, info, warn};
use rayon::prelude::*;
use rust_htslib::bam::{self, Read};
use thousands::Separable;
use tigmod::alignment_interval::{AlignmentInterval, AlnModType};
use tigmod::bam_utils::{get_contig_alignment_intervals, get_qname};
use tigmod::overlap::remove_all_contig_overlaps;
use tigmod::split_gapped_alignment::split_gapped_alignment;
use unwrap::unwrap;

use crate::cli;
use crate::run_stats::{InputStats, ModificationStats, RunStats, write_run_stats};

pub const CONTIG_ALIGNMENTS_FILENAME: &str = "contig.alignments.tsv";

/// Modifications applied to the alignments of every contig
pub struct ContigModSettings {
    /// If set, split gapped alignments at every indel of at least this size
    pub split_sensitivity: Option<u32>,

    pub remove_overlap: bool,
}

/// All alignments of one contig
pub struct ContigAlignments {
    pub contig_name: String,
    pub alignments: Vec<AlignmentInterval>,
}

/// Get the contig alignments from a single bam record, if the record is eligible
///
/// Only primary mapped records are used, the supplementary alignments of each contig are found
/// from the primary record's SA tag.
///
fn get_record_contig_alignments(
    header: &bam::HeaderView,
    record: &bam::Record,
    min_mapq: u8,
    stats: &mut InputStats,
) -> Option<ContigAlignments> {
    stats.total_record_count += 1;
    if record.is_unmapped() || record.is_secondary() || record.is_supplementary() {
        stats.skipped_record_count += 1;
        return None;
    }
    if record.mapq() < min_mapq {
        stats.low_mapq_record_count += 1;
        return None;
    }

    let contig_name = get_qname(record);
    match get_contig_alignment_intervals(header, record) {
        Ok(alignments) => Some(ContigAlignments {
            contig_name,
            alignments,
        }),
        Err(err) => {
            warn!("Skipping contig {contig_name}: {err}");
            stats.invalid_record_count += 1;
            None
        }
    }
}

/// Read all eligible contig alignments from the input alignment file
///
fn read_contig_alignments(
    bam_filename: &str,
    thread_count: usize,
    min_mapq: u8,
) -> (Vec<ContigAlignments>, InputStats) {
    info!("Reading contig alignments from file: '{bam_filename}'");

    let mut bam_reader = unwrap!(
        bam::Reader::from_path(bam_filename),
        "Unable to open alignment file: '{bam_filename}'"
    );
    unwrap!(
        bam_reader.set_threads(thread_count),
        "Unable to set decompression threads for alignment file: '{bam_filename}'"
    );
    let header = bam_reader.header().clone();

    let mut contigs = Vec::new();
    let mut stats = InputStats::default();
    for record in bam_reader.records() {
        let record = unwrap!(
            record,
            "Unable to parse record from alignment file: '{bam_filename}'"
        );
        if let Some(x) = get_record_contig_alignments(&header, &record, min_mapq, &mut stats) {
            contigs.push(x);
        }
    }

    info!(
        "Found {} contigs in {} alignment records",
        contigs.len().separate_with_commas(),
        stats.total_record_count.separate_with_commas()
    );

    (contigs, stats)
}

/// Apply all requested modifications to one contig's alignments
///
/// Output alignments are sorted by contig start position.
///
pub fn modify_contig_alignments(
    alignments: &[AlignmentInterval],
    mod_settings: &ContigModSettings,
) -> tigmod::Result<Vec<AlignmentInterval>> {
    let mut alignments = match mod_settings.split_sensitivity {
        Some(sensitivity) => alignments
            .iter()
            .map(|x| split_gapped_alignment(x, sensitivity, x.get_unclipped_contig_len()))
            .flatten_ok()
            .collect::<tigmod::Result<Vec<_>>>()?,
        None => alignments.to_vec(),
    };

    if mod_settings.remove_overlap {
        alignments = remove_all_contig_overlaps(&alignments)?;
    } else {
        alignments.sort_by_key(|x| (x.start_in_contig, x.end_in_contig));
    }

    for alignment in alignments.iter() {
        alignment.validate()?;
    }
    Ok(alignments)
}

fn process_contig(
    contig: &ContigAlignments,
    mod_settings: &ContigModSettings,
) -> (Option<ContigAlignments>, ModificationStats) {
    let mut stats = ModificationStats {
        contig_count: 1,
        input_alignment_count: contig.alignments.len(),
        ..Default::default()
    };

    match modify_contig_alignments(&contig.alignments, mod_settings) {
        Ok(alignments) => {
            let mod_type_count =
                |t: AlnModType| alignments.iter().filter(|x| x.aln_mod_type == t).count();
            stats.output_alignment_count = alignments.len();
            stats.split_alignment_count = mod_type_count(AlnModType::SplitFromGappedAlignment);
            stats.clipped_alignment_count = mod_type_count(AlnModType::ClippedForOverlapRemoval);

            debug!(
                "Contig {} alignments modified from [{}] to [{}]",
                contig.contig_name,
                contig.alignments.iter().join(", "),
                alignments.iter().join(", ")
            );

            let contig = ContigAlignments {
                contig_name: contig.contig_name.clone(),
                alignments,
            };
            (Some(contig), stats)
        }
        Err(err) => {
            warn!("Failed to modify alignments for contig {}: {err}", contig.contig_name);
            stats.failed_contig_count = 1;
            (None, stats)
        }
    }
}

/// Modify the alignments of all contigs in parallel
///
/// Contigs which can't be modified are dropped from the output. Output order matches input order.
///
fn process_all_contigs(
    thread_count: usize,
    contigs: &[ContigAlignments],
    mod_settings: &ContigModSettings,
) -> (Vec<ContigAlignments>, ModificationStats) {
    info!("Modifying alignments for {} contigs", contigs.len().separate_with_commas());

    let worker_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build()
        .unwrap();

    let results = worker_pool.install(|| {
        contigs
            .par_iter()
            .map(|x| process_contig(x, mod_settings))
            .collect::<Vec<_>>()
    });

    let mut modified_contigs = Vec::new();
    let mut stats = ModificationStats::default();
    for (contig, contig_stats) in results {
        stats.merge(&contig_stats);
        modified_contigs.extend(contig);
    }

    info!(
        "Wrote {} alignments from {} input alignments, {} contigs failed modification",
        stats.output_alignment_count.separate_with_commas(),
        stats.input_alignment_count.separate_with_commas(),
        stats.failed_contig_count.separate_with_commas()
    );

    (modified_contigs, stats)
}

fn get_contig_line(contig: &ContigAlignments) -> String {
    std::iter::once(contig.contig_name.clone())
        .chain(contig.alignments.iter().map(|x| x.to_packed_string()))
        .join("\t")
}

/// Write each contig's alignments as one line of tab-separated packed alignment strings
///
fn write_contig_alignments(output_dir: &Utf8Path, contigs: &[ContigAlignments]) {
    let filename = output_dir.join(CONTIG_ALIGNMENTS_FILENAME);
    info!("Writing modified contig alignments to file: '{filename}'");

    let f = unwrap!(
        File::create(&filename),
        "Unable to create contig alignments file: '{filename}'"
    );
    let mut f = BufWriter::new(f);

    writeln!(f, "#contig_name\talignments").unwrap();
    for contig in contigs.iter() {
        writeln!(f, "{}", get_contig_line(contig)).unwrap();
    }
}

fn process_contig_alignment_file(
    shared_settings: &cli::SharedSettings,
    bam_filename: &str,
    min_mapq: u8,
    mod_settings: &ContigModSettings,
    output_dir: &Utf8Path,
) {
    let start = Instant::now();

    let (contigs, input_stats) =
        read_contig_alignments(bam_filename, shared_settings.thread_count, min_mapq);

    let (modified_contigs, modification_stats) =
        process_all_contigs(shared_settings.thread_count, &contigs, mod_settings);

    write_contig_alignments(output_dir, &modified_contigs);

    let run_stats = RunStats {
        input_stats,
        modification_stats,
        total_runtime_secs: start.elapsed().as_secs_f64(),
    };
    write_run_stats(output_dir, &run_stats);
}

pub fn run_split(shared_settings: &cli::SharedSettings, settings: &cli::SplitSettings) {
    cli::write_split_settings(&settings.output_dir, settings);

    let mod_settings = ContigModSettings {
        split_sensitivity: Some(settings.sensitivity),
        remove_overlap: false,
    };
    process_contig_alignment_file(
        shared_settings,
        &settings.bam_filename,
        settings.min_mapq,
        &mod_settings,
        &settings.output_dir,
    );
}

pub fn run_remove_overlap(
    shared_settings: &cli::SharedSettings,
    settings: &cli::RemoveOverlapSettings,
) {
    cli::write_remove_overlap_settings(&settings.output_dir, settings);

    let mod_settings = ContigModSettings {
        split_sensitivity: settings.split_sensitivity,
        remove_overlap: true,
    };
    process_contig_alignment_file(
        shared_settings,
        &settings.bam_filename,
        settings.min_mapq,
        &mod_settings,
        &settings.output_dir,
    );
}
