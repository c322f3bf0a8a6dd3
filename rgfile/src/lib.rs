//! Codec for the "rg" binary image format: an 8-byte magic+lengths header
//! followed by a data blob and a code blob, both written verbatim.

use byteorder::{ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::prelude::*;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use util::Endian;

use rg::error::{Error, Result};

const MAGIC: [u8; 2] = *b"rg";
const HEADER_SIZE: u32 = 8;

/// A loaded or about-to-be-written image: raw data blob and raw code blob,
/// already lowered to base-opcode 4-byte instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub data: Vec<u8>,
    pub code: Vec<u8>,
}

impl Image {
    pub fn from(data: Vec<u8>, code: Vec<u8>) -> Image {
        Image { data, code }
    }

    /// The entry address equals the data size: the entry jump sits at the
    /// start of code, which sits immediately after data.
    pub fn entry(&self) -> u32 {
        self.data.len() as u32
    }
}

/// Reads an image. A buffer without the `"rg"` magic is accepted as bare
/// code with `data_size = 0` (compat mode); `code_size % 4 != 0` is a
/// rejected file in either case.
pub fn read<R: Read>(reader: &mut R) -> Result<Image> {
    let mut header = [0u8; HEADER_SIZE as usize];
    let n = reader.read(&mut header)?;

    if n >= 2 && header[0..2] == MAGIC {
        if n < HEADER_SIZE as usize {
            return Err(Error::Codec {
                message: "truncated header".to_string(),
            });
        }
        let code_size = u16::from_le_bytes([header[2], header[3]]) as usize;
        let data_size = u16::from_le_bytes([header[4], header[5]]) as usize;
        // header[6..8] is reserved; readers ignore it.

        let mut data = vec![0u8; data_size];
        reader.read_exact(&mut data)?;

        let mut code = vec![0u8; code_size];
        reader.read_exact(&mut code)?;

        if code_size % 4 != 0 {
            return Err(Error::Codec {
                message: format!("code size {} is not a multiple of 4", code_size),
            });
        }

        Ok(Image { data, code })
    } else {
        let mut code = Vec::from(&header[..n]);
        reader.read_to_end(&mut code)?;
        if code.len() % 4 != 0 {
            return Err(Error::Codec {
                message: format!("bare code size {} is not a multiple of 4", code.len()),
            });
        }
        Ok(Image { data: Vec::new(), code })
    }
}

/// Writes the full 8-byte header unless `compat` is set, in which case only
/// the data and code blobs are emitted.
pub fn write<W: Write>(writer: &mut W, image: &Image, compat: bool) -> Result<()> {
    if !compat {
        writer.write_all(&MAGIC)?;
        writer.write_u16::<Endian>(image.code.len() as u16)?;
        writer.write_u16::<Endian>(image.data.len() as u16)?;
        writer.write_u16::<Endian>(0)?;
    }
    writer.write_all(&image.data)?;
    writer.write_all(&image.code)?;
    Ok(())
}

pub trait ReadImageExt: Read + Sized {
    fn read_image(&mut self) -> Result<Image> {
        read(self)
    }
}

impl<R: Read + Sized> ReadImageExt for R {}

pub trait WriteImageExt: Write + Sized {
    fn write_image(&mut self, image: &Image, compat: bool) -> Result<()> {
        write(self, image, compat)
    }
}

impl<W: Write + Sized> WriteImageExt for W {}

pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Image> {
    BufReader::new(File::open(path)?).read_image()
}

pub fn write_file<P: AsRef<Path>>(path: P, image: &Image, compat: bool) -> Result<()> {
    BufWriter::new(File::create(path)?).write_image(image, compat)
}
