//! Length-prefix framing over a TCP byte stream
//!
//! TCP has no message boundaries, unlike the UDP datagrams or firmware
//! serial bytes this idiom was built for elsewhere. Each payload is
//! prefixed with its length as a 4-byte big-endian `u32` so `read_frame`
//! always returns exactly one logical message.

use std::io::{self, Read, Write};

use crate::constants::MAX_FRAME_LEN;

/// Write `payload` as one length-prefixed frame
pub fn write_frame<W: Write>(w: &mut W, payload: &[u8]) -> io::Result<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "frame too large"))?;
    w.write_all(&len.to_be_bytes())?;
    w.write_all(payload)?;
    Ok(())
}

/// Read one length-prefixed frame, blocking until it fully arrives
///
/// Returns `Ok(None)` on a clean EOF at a frame boundary (peer closed
/// the connection between frames). Any other I/O error, including EOF
/// mid-frame, is propagated.
pub fn read_frame<R: Read>(r: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut len_bytes = [0u8; 4];
    match read_exact_or_eof(r, &mut len_bytes)? {
        false => return Ok(None),
        true => {}
    }

    let len = u32::from_be_bytes(len_bytes);
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame length {len} exceeds maximum {MAX_FRAME_LEN}"),
        ));
    }

    let mut payload = vec![0u8; len as usize];
    r.read_exact(&mut payload)?;
    Ok(Some(payload))
}

/// Like `Read::read_exact`, but returns `Ok(false)` instead of erroring
/// when zero bytes are available before any are read (a clean boundary
/// EOF), and still errors on a partial read.
fn read_exact_or_eof<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    let mut read = 0;
    while read < buf.len() {
        match r.read(&mut buf[read..]) {
            Ok(0) if read == 0 => return Ok(false),
            Ok(0) => {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "eof mid-frame"))
            }
            Ok(n) => read += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}
