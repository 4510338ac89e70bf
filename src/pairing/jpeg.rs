//! Exif vendor block of the still image
//!
//! The identifier lives in a MakerNote inside the Exif IFD:
//!
//! ```text
//! APP1 "Exif\0\0" -> TIFF (MM) -> IFD0 [0x8769] -> Exif IFD [0x927C]
//!     -> "Apple iOS\0" 00 01 "MM" + IFD { 17: ASCII id, 21: SRATIONAL time }
//! ```
//!
//! The TIFF structure is read and written with `kamadak-exif`. Offsets inside
//! the vendor block are relative to the start of the block.

use std::io::Cursor;

use exif::experimental::Writer;
use exif::{Field, In, Tag, Value};

use crate::error::{MediaError, MediaResult};

const MARKER_PREFIX: u8 = 0xFF;
const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;

const EXIF_HEADER: &[u8] = b"Exif\0\0";
const VENDOR_SIGNATURE: &[u8] = b"Apple iOS\0";
const VENDOR_VERSION: [u8; 2] = [0x00, 0x01];
/// Signature, version and byte order mark
const VENDOR_HEADER_LEN: usize = 14;

pub const TAG_CONTENT_IDENTIFIER: u16 = 17;
pub const TAG_STILL_IMAGE_TIME: u16 = 21;

const TYPE_ASCII: u16 = 2;
const TYPE_RATIONAL: u16 = 5;
const TYPE_SRATIONAL: u16 = 10;

/// Denominator used when writing the still-image time
const TIME_DENOMINATOR: i32 = 1000;

/// Linkage fields carried by a still
#[derive(Debug, Clone, PartialEq)]
pub struct StillMetadata {
    pub content_identifier: Option<String>,
    pub still_image_time: Option<f64>,
}

/// Replace the Exif segment of `jpeg` with one carrying the identifier and
/// still-image time. A JFIF APP0 segment stays in front.
pub fn embed(jpeg: &[u8], content_identifier: &str, still_image_time: f64) -> MediaResult<Vec<u8>> {
    let segments = split_header(jpeg)?;
    let app1 = exif_segment(vendor_block(content_identifier, still_image_time))?;

    let mut out = Vec::with_capacity(jpeg.len() + app1.len());
    out.extend_from_slice(&[MARKER_PREFIX, SOI]);

    let mut inserted = false;
    for segment in &segments.header {
        if !inserted && segment.marker != APP0 {
            out.extend_from_slice(&app1);
            inserted = true;
        }
        if segment.marker == APP1 && segment.payload(jpeg).starts_with(EXIF_HEADER) {
            continue;
        }
        out.extend_from_slice(&jpeg[segment.start..segment.end]);
    }
    if !inserted {
        out.extend_from_slice(&app1);
    }
    out.extend_from_slice(&jpeg[segments.body_start..]);
    Ok(out)
}

/// Read the linkage fields. `None` when the still has no vendor block.
pub fn read(jpeg: &[u8]) -> MediaResult<Option<StillMetadata>> {
    if !looks_like_jpeg(jpeg) {
        return Err(MediaError::metadata("Not a JPEG stream (missing SOI)"));
    }
    let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(jpeg)) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    match exif.get_field(Tag::MakerNote, In::PRIMARY).map(|field| &field.value) {
        Some(Value::Undefined(block, _)) => read_vendor_block(block),
        _ => Ok(None),
    }
}

/// Check the start-of-image signature
pub fn looks_like_jpeg(bytes: &[u8]) -> bool {
    bytes.starts_with(&[MARKER_PREFIX, SOI, MARKER_PREFIX])
}

struct Segment {
    marker: u8,
    start: usize,
    end: usize,
}

impl Segment {
    fn payload<'a>(&self, jpeg: &'a [u8]) -> &'a [u8] {
        &jpeg[self.start + 4..self.end]
    }
}

struct Header {
    header: Vec<Segment>,
    body_start: usize,
}

/// Split the marker segments that precede the scan data
fn split_header(jpeg: &[u8]) -> MediaResult<Header> {
    if !jpeg.starts_with(&[MARKER_PREFIX, SOI]) {
        return Err(MediaError::metadata("Not a JPEG stream (missing SOI)"));
    }

    let mut header = Vec::new();
    let mut pos = 2;
    loop {
        // Fill bytes before a marker
        while jpeg.get(pos) == Some(&MARKER_PREFIX) && jpeg.get(pos + 1) == Some(&MARKER_PREFIX) {
            pos += 1;
        }
        let (Some(&prefix), Some(&marker)) = (jpeg.get(pos), jpeg.get(pos + 1)) else {
            return Err(MediaError::metadata("JPEG ends before image data"));
        };
        if prefix != MARKER_PREFIX {
            return Err(MediaError::metadata(format!(
                "Expected JPEG marker at byte {}",
                pos
            )));
        }
        if marker == SOS || marker == EOI {
            return Ok(Header {
                header,
                body_start: pos,
            });
        }
        if (0xD0..=0xD7).contains(&marker) || marker == 0x01 {
            pos += 2;
            continue;
        }
        let length = jpeg
            .get(pos + 2..pos + 4)
            .map(|b| u16::from_be_bytes([b[0], b[1]]) as usize)
            .ok_or_else(|| MediaError::metadata("Truncated JPEG segment length"))?;
        let end = pos + 2 + length;
        if length < 2 || end > jpeg.len() {
            return Err(MediaError::metadata(format!(
                "JPEG segment 0x{:02X} has invalid length {}",
                marker, length
            )));
        }
        header.push(Segment {
            marker,
            start: pos,
            end,
        });
        pos = end;
    }
}

/// Build the complete APP1 segment around a MakerNote, marker included
fn exif_segment(note: Vec<u8>) -> MediaResult<Vec<u8>> {
    let maker_note = Field {
        tag: Tag::MakerNote,
        ifd_num: In::PRIMARY,
        value: Value::Undefined(note, 0),
    };
    let mut writer = Writer::new();
    writer.push_field(&maker_note);
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, false)?;
    let tiff = tiff.into_inner();

    let length = 2 + EXIF_HEADER.len() + tiff.len();
    let length = u16::try_from(length)
        .map_err(|_| MediaError::metadata("Exif segment exceeds 64 KiB"))?;

    let mut segment = Vec::with_capacity(length as usize + 2);
    segment.extend_from_slice(&[MARKER_PREFIX, APP1]);
    segment.extend_from_slice(&length.to_be_bytes());
    segment.extend_from_slice(EXIF_HEADER);
    segment.extend_from_slice(&tiff);
    Ok(segment)
}

/// Vendor MakerNote with the identifier and the still-image time
fn vendor_block(content_identifier: &str, still_image_time: f64) -> Vec<u8> {
    let mut ascii = content_identifier.as_bytes().to_vec();
    ascii.push(0);

    let numerator = (still_image_time * TIME_DENOMINATOR as f64).round() as i32;
    let mut rational = Vec::with_capacity(8);
    rational.extend_from_slice(&numerator.to_be_bytes());
    rational.extend_from_slice(&TIME_DENOMINATOR.to_be_bytes());

    let ifd_len = 2 + 2 * 12 + 4;
    let mut data_offset = (VENDOR_HEADER_LEN + ifd_len) as u32;

    let ascii_field = if ascii.len() <= 4 {
        let mut inline = [0u8; 4];
        inline[..ascii.len()].copy_from_slice(&ascii);
        inline
    } else {
        let offset = data_offset;
        data_offset += padded_len(ascii.len()) as u32;
        offset.to_be_bytes()
    };
    let rational_offset = data_offset;

    let mut block = Vec::new();
    block.extend_from_slice(VENDOR_SIGNATURE);
    block.extend_from_slice(&VENDOR_VERSION);
    block.extend_from_slice(b"MM");
    block.extend_from_slice(&2u16.to_be_bytes());
    for (tag, field_type, count, value) in [
        (TAG_CONTENT_IDENTIFIER, TYPE_ASCII, ascii.len() as u32, ascii_field),
        (TAG_STILL_IMAGE_TIME, TYPE_SRATIONAL, 1, rational_offset.to_be_bytes()),
    ] {
        block.extend_from_slice(&tag.to_be_bytes());
        block.extend_from_slice(&field_type.to_be_bytes());
        block.extend_from_slice(&count.to_be_bytes());
        block.extend_from_slice(&value);
    }
    block.extend_from_slice(&0u32.to_be_bytes());
    if ascii.len() > 4 {
        block.extend_from_slice(&ascii);
        block.resize(block.len() + padded_len(ascii.len()) - ascii.len(), 0);
    }
    block.extend_from_slice(&rational);
    block
}

fn padded_len(len: usize) -> usize {
    len + len % 2
}

/// Parse the vendor IFD. `None` when the MakerNote belongs to another vendor.
fn read_vendor_block(block: &[u8]) -> MediaResult<Option<StillMetadata>> {
    if !block.starts_with(VENDOR_SIGNATURE) || block.len() < VENDOR_HEADER_LEN {
        return Ok(None);
    }
    let order = ByteOrder::from_mark(&block[12..14])?;

    let mut metadata = StillMetadata {
        content_identifier: None,
        still_image_time: None,
    };
    let count = order.u16(block, VENDOR_HEADER_LEN)? as usize;
    for i in 0..count {
        let entry = Entry::parse(block, order, VENDOR_HEADER_LEN + 2 + i * 12)?;
        match (entry.tag, entry.field_type) {
            (TAG_CONTENT_IDENTIFIER, TYPE_ASCII) => {
                let bytes = entry.data(block, order, 1)?;
                let text = bytes.split(|&b| b == 0).next().unwrap_or_default();
                metadata.content_identifier = Some(String::from_utf8_lossy(text).into_owned());
            }
            (TAG_STILL_IMAGE_TIME, TYPE_SRATIONAL) => {
                let bytes = entry.data(block, order, 8)?;
                let num = order.u32(bytes, 0)? as i32;
                let den = order.u32(bytes, 4)? as i32;
                if den != 0 {
                    metadata.still_image_time = Some(num as f64 / den as f64);
                }
            }
            (TAG_STILL_IMAGE_TIME, TYPE_RATIONAL) => {
                let bytes = entry.data(block, order, 8)?;
                let num = order.u32(bytes, 0)?;
                let den = order.u32(bytes, 4)?;
                if den != 0 {
                    metadata.still_image_time = Some(num as f64 / den as f64);
                }
            }
            _ => {}
        }
    }
    Ok(Some(metadata))
}

#[derive(Clone, Copy)]
enum ByteOrder {
    Big,
    Little,
}

impl ByteOrder {
    fn from_mark(mark: &[u8]) -> MediaResult<Self> {
        match mark {
            b"MM" => Ok(ByteOrder::Big),
            b"II" => Ok(ByteOrder::Little),
            _ => Err(MediaError::metadata("Unknown vendor block byte order")),
        }
    }

    fn u16(self, bytes: &[u8], at: usize) -> MediaResult<u16> {
        let b = bytes
            .get(at..at + 2)
            .ok_or_else(|| MediaError::metadata("Vendor field out of bounds"))?;
        Ok(match self {
            ByteOrder::Big => u16::from_be_bytes([b[0], b[1]]),
            ByteOrder::Little => u16::from_le_bytes([b[0], b[1]]),
        })
    }

    fn u32(self, bytes: &[u8], at: usize) -> MediaResult<u32> {
        let b = bytes
            .get(at..at + 4)
            .ok_or_else(|| MediaError::metadata("Vendor field out of bounds"))?;
        Ok(match self {
            ByteOrder::Big => u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
            ByteOrder::Little => u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
        })
    }
}

/// One 12-byte entry of the vendor IFD
struct Entry {
    tag: u16,
    field_type: u16,
    count: u32,
    /// Position of the 4-byte value field inside the block
    value_at: usize,
}

impl Entry {
    fn parse(block: &[u8], order: ByteOrder, at: usize) -> MediaResult<Self> {
        Ok(Self {
            tag: order.u16(block, at)?,
            field_type: order.u16(block, at + 2)?,
            count: order.u32(block, at + 4)?,
            value_at: at + 8,
        })
    }

    /// Raw value bytes, inline or at the stored offset
    fn data<'a>(&self, block: &'a [u8], order: ByteOrder, unit: usize) -> MediaResult<&'a [u8]> {
        let len = unit * self.count as usize;
        let start = if len <= 4 {
            self.value_at
        } else {
            order.u32(block, self.value_at)? as usize
        };
        block
            .get(start..start + len)
            .ok_or_else(|| MediaError::metadata(format!("Tag {} data out of bounds", self.tag)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// SOI, JFIF APP0, a stale Exif APP1, SOS with two data bytes, EOI
    fn sample_jpeg() -> Vec<u8> {
        let mut jpeg = vec![0xFF, 0xD8];
        jpeg.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
        jpeg.extend_from_slice(b"JFIF\0\x01\x01\x00\x00\x01\x00\x01\x00\x00");
        jpeg.extend_from_slice(&[0xFF, 0xE1, 0x00, 0x0A]);
        jpeg.extend_from_slice(b"Exif\0\0MM");
        jpeg.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02, 0x12, 0x34]);
        jpeg.extend_from_slice(&[0xFF, 0xD9]);
        jpeg
    }

    #[test]
    fn test_embed_then_read_identifier() {
        let id = "5B0C3B8A-1C2D-4E5F-8A9B-0C1D2E3F4A5B";
        let tagged = embed(&sample_jpeg(), id, 0.0).unwrap();
        let meta = read(&tagged).unwrap().unwrap();
        assert_eq!(meta.content_identifier.as_deref(), Some(id));
        assert_eq!(meta.still_image_time, Some(0.0));
    }

    #[test]
    fn test_embed_keeps_jfif_first_and_scan_data() {
        let source = sample_jpeg();
        let tagged = embed(&source, "ABC", 0.0).unwrap();
        assert_eq!(&tagged[2..4], &[0xFF, 0xE0]);
        assert!(tagged.ends_with(&[0xFF, 0xDA, 0x00, 0x02, 0x12, 0x34, 0xFF, 0xD9]));
        // Stale Exif segment replaced, not duplicated
        let exif_count = tagged.windows(6).filter(|w| *w == EXIF_HEADER).count();
        assert_eq!(exif_count, 1);
    }

    #[test]
    fn test_embed_is_repeatable() {
        let once = embed(&sample_jpeg(), "FIRST-ID", 0.0).unwrap();
        let twice = embed(&once, "SECOND-ID", 0.0).unwrap();
        let meta = read(&twice).unwrap().unwrap();
        assert_eq!(meta.content_identifier.as_deref(), Some("SECOND-ID"));
    }

    #[test]
    fn test_short_identifier_stored_inline() {
        let tagged = embed(&sample_jpeg(), "ab", 1.5).unwrap();
        let meta = read(&tagged).unwrap().unwrap();
        assert_eq!(meta.content_identifier.as_deref(), Some("ab"));
        assert_eq!(meta.still_image_time, Some(1.5));
    }

    #[test]
    fn test_vendor_block_layout() {
        let block = vendor_block("ID", 0.0);
        assert!(block.starts_with(b"Apple iOS\0\x00\x01MM"));
        // Two entries in the vendor IFD
        assert_eq!(&block[14..16], &[0x00, 0x02]);
    }

    #[test]
    fn test_foreign_maker_note_is_none() {
        let mut jpeg = vec![0xFF, 0xD8];
        jpeg.extend_from_slice(&exif_segment(b"Nikon\0\x02\x10\x00\x00".to_vec()).unwrap());
        jpeg.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02, 0xFF, 0xD9]);
        assert_eq!(read(&jpeg).unwrap(), None);
    }

    #[test]
    fn test_maker_note_is_readable_by_exif_reader() {
        let tagged = embed(&sample_jpeg(), "READER-ID", 0.0).unwrap();
        let exif = exif::Reader::new()
            .read_from_container(&mut Cursor::new(&tagged))
            .unwrap();
        let field = exif.get_field(Tag::MakerNote, In::PRIMARY).unwrap();
        match &field.value {
            Value::Undefined(block, _) => assert!(block.starts_with(VENDOR_SIGNATURE)),
            other => panic!("unexpected MakerNote value {:?}", other),
        }
    }

    #[test]
    fn test_read_without_exif_is_none() {
        let plain = [0xFF, 0xD8, 0xFF, 0xDA, 0x00, 0x02, 0xFF, 0xD9];
        assert_eq!(read(&plain).unwrap(), None);
    }

    #[test]
    fn test_rejects_non_jpeg() {
        assert!(embed(b"\x00\x00\x00\x18ftypqt  ", "X", 0.0).is_err());
        assert!(!looks_like_jpeg(b"GIF89a"));
        assert!(looks_like_jpeg(&sample_jpeg()));
    }
}
