//! Binary layout of a module trace file.
//!
//! ```text
//! magic "ZKTR" | version: u16 | module name: u16 length + utf8
//! column count: u32
//! per column: name: u16 length + utf8 | width: u8 | length: u32
//! column bytes, in header order
//! ```
//!
//! All integers are big-endian.

use std::io::{self, Write};

use bytes::{Buf, BufMut, BytesMut};

use super::{ColumnHeader, TraceTable};

pub const FILE_MAGIC: &[u8; 4] = b"ZKTR";
pub const FILE_VERSION: u16 = 1;

fn invalid_data(reason: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, reason.into())
}

fn put_name(buf: &mut BytesMut, name: &str) -> io::Result<()> {
    let len = u16::try_from(name.len())
        .map_err(|_| invalid_data(format!("name too long: {name}")))?;
    buf.put_u16(len);
    buf.put_slice(name.as_bytes());
    Ok(())
}

fn put_count(buf: &mut BytesMut, count: usize, what: &str) -> io::Result<()> {
    let count =
        u32::try_from(count).map_err(|_| invalid_data(format!("{what} is too long")))?;
    buf.put_u32(count);
    Ok(())
}

impl TraceTable {
    /// Serialises the header block of the table.
    pub fn header_bytes(&self) -> io::Result<BytesMut> {
        let mut buf = BytesMut::new();
        buf.put_slice(FILE_MAGIC);
        buf.put_u16(FILE_VERSION);
        put_name(&mut buf, self.module)?;
        put_count(&mut buf, self.headers.len(), self.module)?;
        for header in &self.headers {
            put_name(&mut buf, &header.name)?;
            let width = u8::try_from(header.bytes_per_element)
                .map_err(|_| invalid_data(format!("{} is too wide", header.name)))?;
            buf.put_u8(width);
            put_count(&mut buf, header.length, &header.name)?;
        }
        Ok(buf)
    }

    /// Writes the header block, then every column in header order.
    pub fn write_to<W: Write>(&self, mut out: W) -> io::Result<()> {
        out.write_all(&self.header_bytes()?)?;
        for column in &self.columns {
            out.write_all(column)?;
        }
        out.flush()
    }
}

fn take_name(buf: &mut &[u8]) -> io::Result<String> {
    if buf.remaining() < 2 {
        return Err(invalid_data("truncated name length"));
    }
    let len = buf.get_u16() as usize;
    if buf.remaining() < len {
        return Err(invalid_data("truncated name"));
    }
    let name = std::str::from_utf8(&buf[..len])
        .map_err(|e| invalid_data(e.to_string()))?
        .to_string();
    buf.advance(len);
    Ok(name)
}

/// Decodes the header block of a trace file, returning the module name and the
/// column headers.
pub fn read_headers(mut buf: &[u8]) -> io::Result<(String, Vec<ColumnHeader>)> {
    if buf.remaining() < FILE_MAGIC.len() + 2 || &buf[..FILE_MAGIC.len()] != FILE_MAGIC {
        return Err(invalid_data("not a trace file"));
    }
    buf.advance(FILE_MAGIC.len());
    let version = buf.get_u16();
    if version != FILE_VERSION {
        return Err(invalid_data(format!("unsupported version {version}")));
    }
    let module = take_name(&mut buf)?;

    if buf.remaining() < 4 {
        return Err(invalid_data("truncated column count"));
    }
    let count = buf.get_u32() as usize;
    let mut headers = Vec::with_capacity(count);
    for _ in 0..count {
        let name = take_name(&mut buf)?;
        if buf.remaining() < 5 {
            return Err(invalid_data(format!("truncated header of {name}")));
        }
        let bytes_per_element = buf.get_u8() as usize;
        let length = buf.get_u32() as usize;
        headers.push(ColumnHeader {
            name,
            bytes_per_element,
            length,
        });
    }
    Ok((module, headers))
}
