//! Flat, byte-addressable memory backing a running program's code and data.

use byteorder::{ByteOrder, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;
use util::Endian;

use crate::error::{Error, Result};

/// Minimal addressable-storage interface the decode/execute core runs
/// against. Exists separately from `Memory` so tests can swap in a smaller
/// or instrumented backing store without touching `Core`.
pub trait Storage {
    fn length(&self) -> u32;

    fn check_range(&self, addr: u32, len: u32) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        let end = addr.checked_add(len).ok_or_else(|| Error::Execute {
            message: format!("address {:#x} overflows with length {}", addr, len),
        })?;
        if end > self.length() {
            return Err(Error::Execute {
                message: format!(
                    "address range {:#x}..{:#x} outside memory of size {:#x}",
                    addr,
                    end,
                    self.length()
                ),
            });
        }
        Ok(())
    }

    fn borrow_slice(&self, addr: u32, len: u32) -> Result<&[u8]>;
    fn borrow_slice_mut(&mut self, addr: u32, len: u32) -> Result<&mut [u8]>;

    fn read_byte(&self, addr: u32) -> Result<u8> {
        Ok(self.borrow_slice(addr, 1)?[0])
    }

    fn write_byte(&mut self, addr: u32, value: u8) -> Result<()> {
        self.borrow_slice_mut(addr, 1)?[0] = value;
        Ok(())
    }

    fn read_word(&self, addr: u32) -> Result<u32> {
        let slice = self.borrow_slice(addr, 4)?;
        Ok(Endian::read_u32(slice))
    }

    fn write_word(&mut self, addr: u32, value: u32) -> Result<()> {
        let slice = self.borrow_slice_mut(addr, 4)?;
        Endian::write_u32(slice, value);
        Ok(())
    }
}

/// A `Vec<u8>`-backed address space, zero-initialized at construction.
#[derive(Clone, Debug)]
pub struct Memory {
    bytes: Vec<u8>,
}

impl Memory {
    pub fn new(len: u32) -> Memory {
        Memory {
            bytes: vec![0; len as usize],
        }
    }

    /// Builds memory from an already-assembled image: `data` is placed at
    /// address zero, `code` follows immediately after, and the remainder up
    /// to `total_len` is zeroed.
    pub fn from_image(data: &[u8], code: &[u8], total_len: u32) -> Result<Memory> {
        let needed = data.len() + code.len();
        if needed as u32 > total_len {
            return Err(Error::Codec {
                message: format!(
                    "image of {} bytes does not fit in {} bytes of memory",
                    needed, total_len
                ),
            });
        }
        let mut bytes = vec![0u8; total_len as usize];
        bytes[..data.len()].copy_from_slice(data);
        bytes[data.len()..needed].copy_from_slice(code);
        Ok(Memory { bytes })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Reads a little-endian word via an explicit `Cursor`, mirroring how
    /// the binary codec decodes header fields; exercised where borrowing a
    /// live slice isn't convenient (e.g. from a snapshot for DUMPMEM).
    pub fn read_word_cursor(&self, addr: u32) -> Result<u32> {
        self.check_range(addr, 4)?;
        let mut cur = Cursor::new(&self.bytes[addr as usize..addr as usize + 4]);
        Ok(cur.read_u32::<Endian>()?)
    }
}

impl Storage for Memory {
    fn length(&self) -> u32 {
        self.bytes.len() as u32
    }

    fn borrow_slice(&self, addr: u32, len: u32) -> Result<&[u8]> {
        self.check_range(addr, len)?;
        Ok(&self.bytes[addr as usize..(addr + len) as usize])
    }

    fn borrow_slice_mut(&mut self, addr: u32, len: u32) -> Result<&mut [u8]> {
        self.check_range(addr, len)?;
        Ok(&mut self.bytes[addr as usize..(addr + len) as usize])
    }
}

/// Writes a little-endian word into any `WriteBytesExt` sink, used by the
/// binary codec when streaming rather than borrowing in place.
pub fn write_word<W: WriteBytesExt>(w: &mut W, value: u32) -> Result<()> {
    w.write_u32::<Endian>(value)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn out_of_range_read_is_execute_error() {
        let mem = Memory::new(16);
        match mem.read_word(14) {
            Err(Error::Execute { .. }) => {}
            other => panic!("expected Execute error, got {:?}", other),
        }
    }

    #[test]
    fn word_round_trip() {
        let mut mem = Memory::new(16);
        mem.write_word(4, 0xdead_beef).unwrap();
        assert_eq!(mem.read_word(4).unwrap(), 0xdead_beef);
        assert_eq!(mem.read_byte(4).unwrap(), 0xef);
        assert_eq!(mem.read_byte(7).unwrap(), 0xde);
    }

    #[test]
    fn from_image_lays_out_data_then_code() {
        let mem = Memory::from_image(&[1, 2], &[3, 4, 5], 16).unwrap();
        assert_eq!(&mem.as_slice()[0..5], &[1, 2, 3, 4, 5]);
        assert_eq!(mem.as_slice()[5], 0);
    }

    #[test]
    fn from_image_rejects_oversized_input() {
        assert!(Memory::from_image(&[0; 10], &[0; 10], 8).is_err());
    }
}
