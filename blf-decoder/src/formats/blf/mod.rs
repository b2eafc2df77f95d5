//! BLF (Binary Logging Format) parser
//!
//! Vector's BLF files are read at three levels, all parsed through
//! [`ByteCursor`]:
//! - `header`: the `LOGG` file header and the `LOBJ` object headers
//! - `container`: log containers and their zlib payloads
//! - `objects`: CAN, CAN-FD and error frame bodies
//!
//! [`BlfReader`] drives all three and yields [`Record`](crate::types::Record)s
//! lazily, one container in memory at a time.

mod container;
mod cursor;
mod header;
mod objects;
mod reader;

pub use container::{CompressionMethod, LogContainer};
pub use cursor::ByteCursor;
pub use header::FileHeader;
pub use objects::ObjectKind;
pub use reader::{BlfReader, ReaderStats};
