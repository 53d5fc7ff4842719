//! Chunked copy of entry contents.
//!
//! Entry bodies are pulled through a fixed-size buffer so a single read never
//! asks the tar reader for more than one chunk at a time.

use std::io;
use std::io::Read;
use std::io::Write;

use crate::QuotaResource;
use crate::ResolveError;

/// Chunk size for entry copies (32 KB).
const COPY_BUFFER_SIZE: usize = 32 * 1024;

/// Reusable copy buffer.
///
/// One buffer is allocated per staging run and shared by every entry.
#[derive(Debug)]
pub struct CopyBuffer {
    buf: Box<[u8]>,
}

impl CopyBuffer {
    /// Creates a new zeroed copy buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: vec![0u8; COPY_BUFFER_SIZE].into_boxed_slice(),
        }
    }

    /// Returns the buffer size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.buf.len()
    }
}

impl Default for CopyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies data from reader to writer in buffer-sized chunks.
///
/// # Errors
///
/// Returns an error if reading or writing fails, or if the byte count would
/// overflow `u64`.
///
/// # Examples
///
/// ```
/// use modsrc_core::archive::copy::{CopyBuffer, copy_with_buffer};
///
/// # fn main() -> Result<(), modsrc_core::ResolveError> {
/// let mut buffer = CopyBuffer::new();
/// let mut input = std::io::Cursor::new(b"variable \"region\" {}".to_vec());
/// let mut output = Vec::new();
///
/// let copied = copy_with_buffer(&mut input, &mut output, &mut buffer)?;
/// assert_eq!(copied, 20);
/// # Ok(())
/// # }
/// ```
pub fn copy_with_buffer<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
    buffer: &mut CopyBuffer,
) -> Result<u64, ResolveError> {
    let mut total: u64 = 0;

    loop {
        let bytes_read = match reader.read(&mut buffer.buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ResolveError::Io(e)),
        };

        writer.write_all(&buffer.buf[..bytes_read])?;

        total = total
            .checked_add(bytes_read as u64)
            .ok_or(ResolveError::QuotaExceeded {
                resource: QuotaResource::IntegerOverflow,
            })?;
    }

    Ok(total)
}
