//! Standalone BLF dump tool
//!
//! Prints the records of a BLF file one per line, followed by a summary of
//! record kinds and the most frequent arbitration IDs.
//!
//! Usage:
//!   cargo run -p blf-decoder --example decode_log -- <log_file.blf> [--channel <n>] [--limit <count>] [--verbose]
//!
//! Example:
//!   cargo run -p blf-decoder --example decode_log -- trace.blf --channel 0 --limit 100

use blf_decoder::{Decoder, DecoderConfig, Record};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

#[derive(Default)]
struct DumpStats {
    total_records: usize,
    can_frames: usize,
    fd_frames: usize,
    remote_frames: usize,
    error_frames: usize,
    unique_ids: HashMap<u32, usize>,
}

impl DumpStats {
    fn update(&mut self, record: &Record) {
        self.total_records += 1;
        match record {
            Record::Can(_) => self.can_frames += 1,
            Record::CanFd(_) => self.fd_frames += 1,
            Record::Remote(_) => self.remote_frames += 1,
            Record::Error(_) => self.error_frames += 1,
        }
        if let Some(id) = record.arbitration_id() {
            *self.unique_ids.entry(id).or_insert(0) += 1;
        }
    }

    fn print_summary(&self) {
        println!("\n=== DECODING SUMMARY ===");
        println!("Total records: {}", self.total_records);
        println!("CAN frames: {}", self.can_frames);
        println!("CAN-FD frames: {}", self.fd_frames);
        println!("Remote frames: {}", self.remote_frames);
        println!("Error frames: {}", self.error_frames);
        println!("Unique arbitration IDs: {}", self.unique_ids.len());

        if !self.unique_ids.is_empty() {
            println!("\nTop 10 Most Frequent IDs:");
            let mut sorted: Vec<_> = self.unique_ids.iter().collect();
            sorted.sort_by(|a, b| b.1.cmp(a.1));
            for (id, count) in sorted.iter().take(10) {
                println!("  0x{:03X}: {} times", id, count);
            }
        }
    }
}

fn print_record(record: &Record, verbose: bool) {
    let data = record
        .data()
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ");

    match record {
        Record::Can(msg) => println!(
            "[{:.6}s] CH{} 0x{:03X} {} [{}] {}",
            msg.timestamp, msg.channel, msg.arbitration_id, msg.direction, msg.dlc, data
        ),
        Record::CanFd(msg) => println!(
            "[{:.6}s] CH{} 0x{:03X} {} FD{}{} [{}] {}",
            msg.timestamp,
            msg.channel,
            msg.arbitration_id,
            msg.direction,
            if msg.bitrate_switch { " BRS" } else { "" },
            if msg.error_state_indicator { " ESI" } else { "" },
            msg.dlc,
            data
        ),
        Record::Remote(frame) => println!(
            "[{:.6}s] CH{} 0x{:03X} {} REMOTE [{}]",
            frame.timestamp, frame.channel, frame.arbitration_id, frame.direction, frame.dlc
        ),
        Record::Error(frame) => {
            if verbose {
                println!(
                    "[{:.6}s] CH{} ERROR FRAME{}",
                    frame.timestamp,
                    frame.channel,
                    frame
                        .diagnostic_code
                        .map(|c| format!(" (ECC 0x{:02X})", c))
                        .unwrap_or_default()
                );
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <log_file.blf> [--channel <n>] [--limit <count>] [--verbose]", args[0]);
        eprintln!("\nExample:");
        eprintln!("  {} trace.blf --channel 0 --limit 100", args[0]);
        std::process::exit(1);
    }

    let log_file = PathBuf::from(&args[1]);
    let mut channels = Vec::new();
    let mut limit: Option<usize> = None;
    let mut verbose = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--channel" => {
                i += 1;
                if i < args.len() {
                    channels.push(args[i].parse()?);
                }
            }
            "--limit" => {
                i += 1;
                if i < args.len() {
                    limit = Some(args[i].parse()?);
                }
            }
            "--verbose" | "-v" => {
                verbose = true;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
            }
        }
        i += 1;
    }

    println!("=== BLF Decoder ===");
    println!("Log file: {:?}", log_file);
    if let Some(n) = limit {
        println!("Limit: {} records", n);
    }
    println!("Verbose: {}", verbose);
    println!();

    let mut config = DecoderConfig::new();
    if !channels.is_empty() {
        config = config.with_channel_filter(channels);
    }
    let decoder = Decoder::with_config(config);

    println!("=== DECODING LOG FILE ===\n");
    let mut records = decoder.decode_file(&log_file)?;
    let mut stats = DumpStats::default();

    for result in records.by_ref() {
        match result {
            Ok(record) => {
                if let Some(max) = limit {
                    if stats.total_records >= max {
                        println!("\n... (limit of {} records reached)", max);
                        break;
                    }
                }
                stats.update(&record);
                print_record(&record, verbose);
            }
            Err(e) => {
                eprintln!("Error decoding record: {}", e);
                break;
            }
        }
    }

    stats.print_summary();
    println!("Containers read: {}", records.stats().containers);

    Ok(())
}
