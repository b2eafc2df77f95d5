//! Record writers
//!
//! CSV rows follow the column layout of python-can based converters, so the
//! output can be diffed against theirs: booleans are `True`/`False`, the
//! `dlc` column holds the payload length and data bytes are space-separated
//! uppercase hex.

use blf_decoder::{dlc_to_byte_length, Record};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

pub const CSV_HEADER: &str =
    "timestamp,channel,arbitration_id,is_extended_id,is_remote_frame,is_error_frame,dlc,data";

/// Output file format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    /// One JSON object per line
    Jsonl,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Jsonl => "jsonl",
        }
    }
}

/// Writes records in the selected format
pub struct RecordWriter<W: Write> {
    out: W,
    format: OutputFormat,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format }
    }

    pub fn write_header(&mut self) -> io::Result<()> {
        match self.format {
            OutputFormat::Csv => writeln!(self.out, "{}", CSV_HEADER),
            OutputFormat::Jsonl => Ok(()),
        }
    }

    pub fn write_record(&mut self, record: &Record) -> io::Result<()> {
        match self.format {
            OutputFormat::Csv => writeln!(self.out, "{}", format_csv_row(record)),
            OutputFormat::Jsonl => {
                serde_json::to_writer(&mut self.out, record)?;
                self.out.write_all(b"\n")
            }
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

pub fn format_csv_row(record: &Record) -> String {
    let dlc = dlc_to_byte_length(record.dlc()).unwrap_or(record.data().len());
    format!(
        "{:.6},{},0x{:X},{},{},{},{},{}",
        record.timestamp(),
        record.channel(),
        record.arbitration_id().unwrap_or(0),
        py_bool(record.is_extended_id()),
        py_bool(record.is_remote_frame()),
        py_bool(record.is_error_frame()),
        dlc,
        format_data(record.data())
    )
}

/// Space-separated two-digit uppercase hex
pub fn format_data(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

fn py_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blf_decoder::{CanFdMessage, CanMessage, Direction, ErrorFrame, RemoteFrame};

    fn can_message() -> Record {
        Record::Can(CanMessage {
            timestamp: 1_714_157_541.5,
            channel: 0,
            arbitration_id: 0x123,
            is_extended_id: false,
            direction: Direction::Rx,
            dlc: 4,
            data: vec![0x01, 0x02, 0x03, 0x04],
        })
    }

    #[test]
    fn test_can_row() {
        assert_eq!(
            format_csv_row(&can_message()),
            "1714157541.500000,0,0x123,False,False,False,4,01 02 03 04"
        );
    }

    #[test]
    fn test_fd_row_uses_byte_length() {
        let record = Record::CanFd(CanFdMessage {
            timestamp: 0.25,
            channel: 1,
            arbitration_id: 0x18DA_F110,
            is_extended_id: true,
            direction: Direction::Tx,
            bitrate_switch: true,
            error_state_indicator: false,
            dlc: 9,
            data: vec![0xAB; 12],
        });
        let row = format_csv_row(&record);
        assert!(row.starts_with("0.250000,1,0x18DAF110,True,False,False,12,AB AB"));
    }

    #[test]
    fn test_error_and_remote_rows() {
        let error = Record::Error(ErrorFrame {
            timestamp: 2.0,
            channel: 3,
            diagnostic_code: None,
        });
        assert_eq!(format_csv_row(&error), "2.000000,3,0x0,False,False,True,0,");

        let remote = Record::Remote(RemoteFrame {
            timestamp: 3.0,
            channel: 0,
            arbitration_id: 0x7FF,
            is_extended_id: false,
            direction: Direction::Rx,
            dlc: 2,
        });
        assert_eq!(format_csv_row(&remote), "3.000000,0,0x7FF,False,True,False,2,");
    }

    #[test]
    fn test_writer_formats() {
        let mut csv = RecordWriter::new(Vec::new(), OutputFormat::Csv);
        csv.write_header().unwrap();
        csv.write_record(&can_message()).unwrap();
        let text = String::from_utf8(csv.out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines.len(), 2);

        let mut jsonl = RecordWriter::new(Vec::new(), OutputFormat::Jsonl);
        jsonl.write_header().unwrap();
        jsonl.write_record(&can_message()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&jsonl.out).unwrap();
        assert_eq!(value["kind"], "Can");
        assert_eq!(value["arbitration_id"], 0x123);
    }
}
