use byteorder::{ByteOrder, LittleEndian};

use std::io::{Read, Write};

use failure::Error;

use crate::errors::SrpError;

// Nothing in the protocol comes close; larger prefixes are treated as garbage.
pub const MAX_MESSAGE_LEN: usize = 1 << 20;

const PREFIX_LEN: usize = 4;

/// Length-prefixed frames over a byte stream. `receive` returns `None` once
/// the peer has closed the stream.
pub trait Communicate {
    fn send(&mut self, message: &[u8]) -> Result<(), Error>;
    fn receive(&mut self) -> Result<Option<Vec<u8>>, Error>;
}

// Returns false if the stream ends before `buf` is full.
fn fill<T: Read>(stream: &mut T, buf: &mut [u8]) -> Result<bool, Error> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..])? {
            0 => return Ok(false),
            k => filled += k,
        }
    }
    Ok(true)
}

impl<T: Read + Write> Communicate for T {
    fn receive(&mut self) -> Result<Option<Vec<u8>>, Error> {
        let mut prefix = [0u8; PREFIX_LEN];
        if !fill(self, &mut prefix)? {
            return Ok(None);
        }
        let length = LittleEndian::read_u32(&prefix) as usize;
        if length > MAX_MESSAGE_LEN {
            return Err(SrpError::MalformedMessage("frame length").into());
        }
        let mut message = vec![0; length];
        Ok(if fill(self, &mut message)? {
            Some(message)
        } else {
            None
        })
    }

    fn send(&mut self, message: &[u8]) -> Result<(), Error> {
        if message.len() > MAX_MESSAGE_LEN {
            return Err(SrpError::MalformedMessage("frame length").into());
        }
        let mut prefix = [0u8; PREFIX_LEN];
        LittleEndian::write_u32(&mut prefix, message.len() as u32);
        self.write_all(&prefix)?;
        self.write_all(message)?;
        self.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn frames_round_trip() {
        let mut stream = Cursor::new(Vec::new());
        stream.send(b"first").unwrap();
        stream.send(b"").unwrap();
        stream.send(&[7; 300]).unwrap();
        stream.set_position(0);
        assert_eq!(stream.receive().unwrap(), Some(b"first".to_vec()));
        assert_eq!(stream.receive().unwrap(), Some(Vec::new()));
        assert_eq!(stream.receive().unwrap(), Some(vec![7; 300]));
        assert_eq!(stream.receive().unwrap(), None);
    }

    #[test]
    fn length_prefix_is_little_endian() {
        let mut stream = Cursor::new(Vec::new());
        stream.send(&[1, 2, 3]).unwrap();
        assert_eq!(stream.into_inner(), vec![3, 0, 0, 0, 1, 2, 3]);
    }

    #[test]
    fn truncated_frame_reads_as_closed() {
        let mut stream = Cursor::new(vec![5, 0, 0, 0, 1, 2]);
        assert_eq!(stream.receive().unwrap(), None);
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut stream = Cursor::new(vec![0xff, 0xff, 0xff, 0x7f]);
        let err = stream.receive().unwrap_err();
        assert_eq!(
            err.downcast_ref::<SrpError>(),
            Some(&SrpError::MalformedMessage("frame length"))
        );
    }
}
