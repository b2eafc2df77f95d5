//! Console reports: conversion banner and summary, `info` output

use crate::convert::ConversionSummary;
use blf_decoder::formats::blf::ObjectKind;
use blf_decoder::{FileHeader, ReaderStats};
use std::path::Path;

const RULE: &str = "───────────────────────────────────────────────";

pub fn print_conversion_start(input: &Path, output: &Path, include_errors: bool) {
    println!("Converting BLF file: {}", input.display());
    println!("Output file: {}", output.display());
    println!("Include error frames: {}", include_errors);
    println!("{}", RULE);
}

pub fn print_summary(summary: &ConversionSummary) {
    println!("\nConversion completed successfully!");
    print_counts(summary);
}

/// Summary after a failed conversion; the rows already written stay on disk
pub fn print_partial_summary(summary: &ConversionSummary) {
    println!("\nConversion stopped early.");
    print_counts(summary);
    if summary.output.exists() {
        println!("Output may be incomplete: {}", summary.output.display());
    }
}

fn print_counts(summary: &ConversionSummary) {
    println!("Messages processed: {}", summary.messages_written);
    if summary.error_frames_skipped > 0 {
        println!("Error frames skipped: {}", summary.error_frames_skipped);
    }
    if summary.records_filtered > 0 {
        println!("Records filtered: {}", summary.records_filtered);
    }
    println!("Output file: {}", summary.output.display());
}

pub fn print_file_info(path: &Path, header: &FileHeader, stats: &ReaderStats) {
    let (major, minor, build, patch) = header.format_version();

    println!("═══════════════════════════════════════════════");
    println!("  BLF File: {}", path.display());
    println!("═══════════════════════════════════════════════\n");
    println!("  Format version:    {}.{}.{}.{}", major, minor, build, patch);
    println!(
        "  Application:       id {} v{}.{} build {}",
        header.application_id,
        header.application_version.0,
        header.application_version.1,
        header.application_build
    );
    println!("  Compression level: {}", header.compression_level);
    println!("  File size:         {} bytes", header.file_size);
    println!("  Uncompressed size: {} bytes", header.uncompressed_size);
    println!("  Object count:      {}", header.object_count);
    match (&header.measurement_start, &header.measurement_stop) {
        (Some(start), Some(stop)) => println!("  Measurement:       {} .. {}", start, stop),
        (Some(start), None) => println!("  Measurement start: {}", start),
        _ => println!("  Measurement:       (no start time)"),
    }

    println!("\n{}", RULE);
    println!("  Containers:        {}", stats.containers);
    if stats.containers_skipped > 0 {
        println!("  Skipped:           {}", stats.containers_skipped);
    }
    println!("  Inflated bytes:    {}", stats.uncompressed_bytes);
    println!("  Records:           {}", stats.records);
    if stats.out_of_order_timestamps > 0 {
        println!("  Out-of-order:      {}", stats.out_of_order_timestamps);
    }

    println!("\n  Objects by type:");
    for (object_type, count) in &stats.objects_by_type {
        println!("    {:>4} {:<28} {}", object_type, object_type_name(*object_type), count);
    }
}

fn object_type_name(object_type: u32) -> String {
    match ObjectKind::from_type(object_type) {
        ObjectKind::Unknown(_) => "(unsupported)".to_string(),
        kind => format!("{:?}", kind),
    }
}
