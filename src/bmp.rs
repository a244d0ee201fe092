//! Minimal uncompressed BMP codec
//!
//! Backs the reference comparer and converter binaries used by the test
//! suite. Only 8-bit palettized and 24-bit images with a 40-byte
//! information header are supported.

use std::io;
use std::path::Path;
use thiserror::Error;

const SIGNATURE: u16 = 0x4D42;
const FILE_HEADER_LEN: usize = 14;
const INFO_HEADER_LEN: usize = 40;
const PIXEL_ARRAY_OFFSET: usize = FILE_HEADER_LEN + INFO_HEADER_LEN;
const PALETTE_ENTRIES: usize = 256;
const PALETTE_LEN: usize = PALETTE_ENTRIES * 4;

#[derive(Error, Debug)]
pub enum BmpError {
    #[error("The file could not be read: {0}")]
    Io(#[from] io::Error),

    #[error("The signature {0:#06x} does not match 0x4D42")]
    Signature(u16),

    #[error("The file ends inside the {0}")]
    Truncated(&'static str),

    #[error("Unsupported version of the DIB header (size {0}, requires 40)")]
    DibVersion(u32),

    #[error("Only 8-bit and 24-bit images are supported (got {0})")]
    BitDepth(u16),

    #[error("Compressed BMP files are not supported")]
    Compressed,

    #[error("Pixel data offset {0} overlaps the headers")]
    DataOffset(usize),

    #[error("The image has no pixels ({0}x{1})")]
    Empty(u32, u32),
}

/// A decoded bitmap
///
/// Everything before the pixel array is kept verbatim, so an unmodified
/// image serializes back to the same bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    prefix: Vec<u8>,
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    bit_count: u16,
}

fn u16_at(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn u32_at(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn stride(width: u32, bit_count: u16) -> usize {
    let row = width as usize * (bit_count as usize / 8);
    (row + 3) & !3
}

impl Bitmap {
    /// Read and decode a file
    pub fn read(path: &Path) -> Result<Self, BmpError> {
        Self::parse(&std::fs::read(path)?)
    }

    /// Decode a complete file image
    pub fn parse(bytes: &[u8]) -> Result<Self, BmpError> {
        if bytes.len() < 2 {
            return Err(BmpError::Truncated("signature"));
        }
        let signature = u16_at(bytes, 0);
        if signature != SIGNATURE {
            return Err(BmpError::Signature(signature));
        }
        if bytes.len() < FILE_HEADER_LEN {
            return Err(BmpError::Truncated("file header"));
        }
        if bytes.len() < PIXEL_ARRAY_OFFSET {
            return Err(BmpError::Truncated("information header"));
        }

        let info_size = u32_at(bytes, 14);
        if info_size as usize != INFO_HEADER_LEN {
            return Err(BmpError::DibVersion(info_size));
        }
        let bit_count = u16_at(bytes, 28);
        if bit_count != 8 && bit_count != 24 {
            return Err(BmpError::BitDepth(bit_count));
        }
        if u32_at(bytes, 30) != 0 {
            return Err(BmpError::Compressed);
        }

        let width = (u32_at(bytes, 18) as i32).unsigned_abs();
        let height = (u32_at(bytes, 22) as i32).unsigned_abs();
        if width == 0 || height == 0 {
            return Err(BmpError::Empty(width, height));
        }
        let data_offset = u32_at(bytes, 10) as usize;
        let min_offset = if bit_count == 8 {
            PIXEL_ARRAY_OFFSET + PALETTE_LEN
        } else {
            PIXEL_ARRAY_OFFSET
        };
        if data_offset < min_offset {
            return Err(BmpError::DataOffset(data_offset));
        }

        let image_size = stride(width, bit_count) * height as usize;
        let end = data_offset
            .checked_add(image_size)
            .filter(|&end| end <= bytes.len())
            .ok_or(BmpError::Truncated("pixel data"))?;

        Ok(Self {
            prefix: bytes[..data_offset].to_vec(),
            pixels: bytes[data_offset..end].to_vec(),
            width,
            height,
            bit_count,
        })
    }

    /// Build a bottom-up 24-bit image, `color(x, y)` giving `[b, g, r]`
    pub fn rgb24(width: u32, height: u32, color: impl Fn(u32, u32) -> [u8; 3]) -> Self {
        let row_len = stride(width, 24);
        let mut pixels = vec![0u8; row_len * height as usize];
        for y in 0..height {
            for x in 0..width {
                let at = y as usize * row_len + x as usize * 3;
                pixels[at..at + 3].copy_from_slice(&color(x, y));
            }
        }

        let mut prefix = Vec::with_capacity(PIXEL_ARRAY_OFFSET);
        let file_size = (PIXEL_ARRAY_OFFSET + pixels.len()) as u32;
        prefix.extend_from_slice(&SIGNATURE.to_le_bytes());
        prefix.extend_from_slice(&file_size.to_le_bytes());
        prefix.extend_from_slice(&0u32.to_le_bytes());
        prefix.extend_from_slice(&(PIXEL_ARRAY_OFFSET as u32).to_le_bytes());
        prefix.extend_from_slice(&(INFO_HEADER_LEN as u32).to_le_bytes());
        prefix.extend_from_slice(&(width as i32).to_le_bytes());
        prefix.extend_from_slice(&(height as i32).to_le_bytes());
        prefix.extend_from_slice(&1u16.to_le_bytes());
        prefix.extend_from_slice(&24u16.to_le_bytes());
        prefix.extend_from_slice(&0u32.to_le_bytes());
        prefix.extend_from_slice(&(pixels.len() as u32).to_le_bytes());
        prefix.extend_from_slice(&[0u8; 16]);

        Self {
            prefix,
            pixels,
            width,
            height,
            bit_count: 24,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bit_count(&self) -> u16 {
        self.bit_count
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.prefix.clone();
        bytes.extend_from_slice(&self.pixels);
        bytes
    }

    pub fn write(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.to_bytes())
    }

    /// Turn the image into its negative
    ///
    /// 8-bit images invert the palette, 24-bit images every pixel. Row
    /// padding and the palette's reserved byte are left alone, so inverting
    /// twice restores the original bytes.
    pub fn invert(&mut self) {
        if self.bit_count == 8 {
            let palette = &mut self.prefix[PIXEL_ARRAY_OFFSET..PIXEL_ARRAY_OFFSET + PALETTE_LEN];
            for entry in palette.chunks_exact_mut(4) {
                for channel in &mut entry[..3] {
                    *channel ^= 0xFF;
                }
            }
        } else {
            let row_len = stride(self.width, self.bit_count);
            if row_len == 0 {
                return;
            }
            let used = self.width as usize * 3;
            for row in self.pixels.chunks_exact_mut(row_len) {
                for byte in &mut row[..used] {
                    *byte ^= 0xFF;
                }
            }
        }
    }

    /// Whether two images can be compared pixel by pixel
    pub fn same_format(&self, other: &Bitmap) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Coordinates of the first pixel whose colour differs
    ///
    /// Only meaningful for images of the same format.
    pub fn first_difference(&self, other: &Bitmap) -> Option<(u32, u32)> {
        (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| (x, y)))
            .find(|&(x, y)| self.color(x, y) != other.color(x, y))
    }

    fn color(&self, x: u32, y: u32) -> [u8; 3] {
        let row = y as usize * stride(self.width, self.bit_count);
        if self.bit_count == 8 {
            let index = self.pixels[row + x as usize] as usize;
            let at = PIXEL_ARRAY_OFFSET + index * 4;
            [self.prefix[at], self.prefix[at + 1], self.prefix[at + 2]]
        } else {
            let at = row + x as usize * 3;
            [self.pixels[at], self.pixels[at + 1], self.pixels[at + 2]]
        }
    }
}
