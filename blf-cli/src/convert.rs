//! BLF to CSV / JSON-lines conversion

use crate::output::{OutputFormat, RecordWriter};
use blf_decoder::{Decoder, DecoderError};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    pub include_errors: bool,
    pub format: OutputFormat,
    pub progress_interval: u64,
}

/// Counters reported after a conversion, complete or not
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionSummary {
    pub output: PathBuf,
    pub messages_written: u64,
    pub error_frames_skipped: u64,
    pub records_filtered: u64,
    pub containers: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("Input file {0:?} does not exist")]
    InputNotFound(PathBuf),

    #[error("{} at {}: {source}", .source.kind(), describe_offset(.source.offset()))]
    Decode {
        source: DecoderError,
        summary: ConversionSummary,
    },

    #[error("Failed to write {path:?}: {source}")]
    Output { path: PathBuf, source: io::Error },
}

fn describe_offset(offset: Option<u64>) -> String {
    match offset {
        Some(offset) => format!("offset {}", offset),
        None => "unknown offset".to_string(),
    }
}

/// Default output path: the input with its extension replaced
pub fn default_output_path(input: &Path, format: OutputFormat) -> PathBuf {
    input.with_extension(format.extension())
}

/// Decode `input` and write one row per record to `output`.
///
/// Stops at the first decode error. Rows written up to that point are
/// flushed and the file is left in place.
pub fn convert(
    input: &Path,
    output: &Path,
    decoder: &Decoder,
    options: &ConvertOptions,
) -> Result<ConversionSummary, ConvertError> {
    if !input.exists() {
        return Err(ConvertError::InputNotFound(input.to_path_buf()));
    }

    let mut summary = ConversionSummary {
        output: output.to_path_buf(),
        ..Default::default()
    };
    let output_error = |source: io::Error| ConvertError::Output {
        path: output.to_path_buf(),
        source,
    };

    let mut records = decoder
        .decode_file(input)
        .map_err(|source| ConvertError::Decode {
            source,
            summary: summary.clone(),
        })?;

    let file = File::create(output).map_err(output_error)?;
    let mut writer = RecordWriter::new(BufWriter::new(file), options.format);
    writer.write_header().map_err(output_error)?;

    let mut failure = None;
    for record in records.by_ref() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                failure = Some(e);
                break;
            }
        };

        if record.is_error_frame() && !options.include_errors {
            summary.error_frames_skipped += 1;
            continue;
        }

        writer.write_record(&record).map_err(output_error)?;
        summary.messages_written += 1;

        if options.progress_interval > 0 && summary.messages_written % options.progress_interval == 0 {
            log::info!("Processed {} messages...", summary.messages_written);
        }
    }
    writer.flush().map_err(output_error)?;

    summary.records_filtered = records.filtered();
    summary.containers = records.stats().containers;

    match failure {
        Some(source) => Err(ConvertError::Decode { source, summary }),
        None => Ok(summary),
    }
}
