//! Minimal EXIF reader for focal-length tags.
//!
//! Accepts a full JPEG, an APP1 payload starting with `Exif\0\0`, or a bare
//! TIFF block in either byte order. Only the two focal-length tags are read.

use crate::error::{EngineError, EngineResult};

const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_FOCAL_LENGTH: u16 = 0x920A;
const TAG_FOCAL_LENGTH_35MM: u16 = 0xA405;

const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_RATIONAL: u16 = 5;

const EXIF_HEADER: &[u8] = b"Exif\0\0";
const IFD_ENTRY_LEN: usize = 12;

/// Focal-length tags found in an image's metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExifFocal {
    /// `FocalLength` in millimetres (physical lens)
    pub focal_length_mm: Option<f64>,
    /// `FocalLengthIn35mmFilm` in millimetres
    pub focal_length_35mm: Option<f64>,
}

impl ExifFocal {
    pub fn is_empty(&self) -> bool {
        self.focal_length_mm.is_none() && self.focal_length_35mm.is_none()
    }
}

/// Read focal-length tags from metadata bytes.
///
/// Missing tags are not an error; structurally broken metadata is.
pub fn read_focal(bytes: &[u8]) -> EngineResult<ExifFocal> {
    let tiff = Tiff::new(locate_tiff(bytes)?)?;

    let ifd0 = tiff.u32_at(4)? as usize;
    let mut focal = ExifFocal::default();

    // Some writers put the tags directly into IFD0.
    tiff.scan_ifd(ifd0, &mut focal)?;

    if let Some(entry) = tiff.find_entry(ifd0, TAG_EXIF_IFD)? {
        if entry.kind != TYPE_LONG {
            return Err(EngineError::exif("Exif IFD pointer is not a LONG"));
        }
        let exif_ifd = tiff.u32_at(entry.value_offset)? as usize;
        tiff.scan_ifd(exif_ifd, &mut focal)?;
    }

    Ok(focal)
}

/// Find the TIFF block inside JPEG, APP1 or bare TIFF bytes.
fn locate_tiff(bytes: &[u8]) -> EngineResult<&[u8]> {
    if bytes.starts_with(&[0xFF, 0xD8]) {
        return find_app1(bytes);
    }
    if let Some(rest) = bytes.strip_prefix(EXIF_HEADER) {
        return Ok(rest);
    }
    if bytes.starts_with(b"II") || bytes.starts_with(b"MM") {
        return Ok(bytes);
    }
    Err(EngineError::exif("unrecognized metadata container"))
}

fn find_app1(jpeg: &[u8]) -> EngineResult<&[u8]> {
    let mut pos = 2;
    while pos + 4 <= jpeg.len() {
        if jpeg[pos] != 0xFF {
            return Err(EngineError::exif(format!("bad JPEG marker at {}", pos)));
        }
        let marker = jpeg[pos + 1];
        // Start of scan or end of image: no metadata beyond this point.
        if marker == 0xDA || marker == 0xD9 {
            break;
        }
        let len = u16::from_be_bytes([jpeg[pos + 2], jpeg[pos + 3]]) as usize;
        if len < 2 || pos + 2 + len > jpeg.len() {
            return Err(EngineError::exif("truncated JPEG segment"));
        }
        let data = &jpeg[pos + 4..pos + 2 + len];
        if marker == 0xE1 {
            if let Some(tiff) = data.strip_prefix(EXIF_HEADER) {
                return Ok(tiff);
            }
        }
        pos += 2 + len;
    }
    Err(EngineError::exif("no APP1 Exif segment"))
}

#[derive(Debug, Clone, Copy)]
struct IfdEntry {
    tag: u16,
    kind: u16,
    /// Offset of the 4-byte value field within the TIFF block
    value_offset: usize,
}

struct Tiff<'a> {
    data: &'a [u8],
    little_endian: bool,
}

impl<'a> Tiff<'a> {
    fn new(data: &'a [u8]) -> EngineResult<Self> {
        let little_endian = if data.starts_with(b"II") {
            true
        } else if data.starts_with(b"MM") {
            false
        } else {
            return Err(EngineError::exif("missing TIFF byte order"));
        };
        let tiff = Self {
            data,
            little_endian,
        };
        if tiff.u16_at(2)? != 42 {
            return Err(EngineError::exif("bad TIFF magic"));
        }
        Ok(tiff)
    }

    fn bytes<const N: usize>(&self, offset: usize) -> EngineResult<[u8; N]> {
        self.data
            .get(offset..offset + N)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| EngineError::exif(format!("read past end at {}", offset)))
    }

    fn u16_at(&self, offset: usize) -> EngineResult<u16> {
        let b = self.bytes::<2>(offset)?;
        Ok(if self.little_endian {
            u16::from_le_bytes(b)
        } else {
            u16::from_be_bytes(b)
        })
    }

    fn u32_at(&self, offset: usize) -> EngineResult<u32> {
        let b = self.bytes::<4>(offset)?;
        Ok(if self.little_endian {
            u32::from_le_bytes(b)
        } else {
            u32::from_be_bytes(b)
        })
    }

    fn entries(&self, ifd: usize) -> EngineResult<Vec<IfdEntry>> {
        let count = self.u16_at(ifd)? as usize;
        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            let at = ifd + 2 + i * IFD_ENTRY_LEN;
            entries.push(IfdEntry {
                tag: self.u16_at(at)?,
                kind: self.u16_at(at + 2)?,
                value_offset: at + 8,
            });
        }
        Ok(entries)
    }

    fn find_entry(&self, ifd: usize, tag: u16) -> EngineResult<Option<IfdEntry>> {
        Ok(self.entries(ifd)?.into_iter().find(|e| e.tag == tag))
    }

    fn scan_ifd(&self, ifd: usize, focal: &mut ExifFocal) -> EngineResult<()> {
        for entry in self.entries(ifd)? {
            match (entry.tag, entry.kind) {
                (TAG_FOCAL_LENGTH, TYPE_RATIONAL) => {
                    let at = self.u32_at(entry.value_offset)? as usize;
                    let num = self.u32_at(at)?;
                    let den = self.u32_at(at + 4)?;
                    if den != 0 {
                        focal.focal_length_mm = Some(num as f64 / den as f64);
                    }
                }
                (TAG_FOCAL_LENGTH_35MM, TYPE_SHORT) => {
                    let value = self.u16_at(entry.value_offset)?;
                    // Zero means "unknown" in the EXIF standard.
                    if value > 0 {
                        focal.focal_length_35mm = Some(value as f64);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// TIFF block with an Exif sub-IFD holding both focal tags.
    pub(crate) fn build_tiff(big_endian: bool, focal_mm: (u32, u32), focal_35: u16) -> Vec<u8> {
        let u16b = |v: u16| if big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
        let u32b = |v: u32| if big_endian { v.to_be_bytes() } else { v.to_le_bytes() };

        let mut out = Vec::new();
        out.extend_from_slice(if big_endian { b"MM" } else { b"II" });
        out.extend_from_slice(&u16b(42));
        out.extend_from_slice(&u32b(8));

        // IFD0 at 8: one entry pointing at the Exif IFD (26)
        out.extend_from_slice(&u16b(1));
        out.extend_from_slice(&u16b(TAG_EXIF_IFD));
        out.extend_from_slice(&u16b(TYPE_LONG));
        out.extend_from_slice(&u32b(1));
        out.extend_from_slice(&u32b(26));
        out.extend_from_slice(&u32b(0));

        // Exif IFD at 26: two entries, rational stored at 56
        out.extend_from_slice(&u16b(2));
        out.extend_from_slice(&u16b(TAG_FOCAL_LENGTH));
        out.extend_from_slice(&u16b(TYPE_RATIONAL));
        out.extend_from_slice(&u32b(1));
        out.extend_from_slice(&u32b(56));
        out.extend_from_slice(&u16b(TAG_FOCAL_LENGTH_35MM));
        out.extend_from_slice(&u16b(TYPE_SHORT));
        out.extend_from_slice(&u32b(1));
        out.extend_from_slice(&u16b(focal_35));
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&u32b(0));

        assert_eq!(out.len(), 56);
        out.extend_from_slice(&u32b(focal_mm.0));
        out.extend_from_slice(&u32b(focal_mm.1));
        out
    }

    fn wrap_jpeg(tiff: &[u8]) -> Vec<u8> {
        let mut jpeg = vec![0xFF, 0xD8];
        // An unrelated APP0 segment first
        jpeg.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00]);
        let len = (2 + EXIF_HEADER.len() + tiff.len()) as u16;
        jpeg.extend_from_slice(&[0xFF, 0xE1]);
        jpeg.extend_from_slice(&len.to_be_bytes());
        jpeg.extend_from_slice(EXIF_HEADER);
        jpeg.extend_from_slice(tiff);
        jpeg.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02]);
        jpeg
    }

    #[test]
    fn test_reads_little_endian_tiff() {
        let focal = read_focal(&build_tiff(false, (425, 100), 26)).unwrap();
        assert!((focal.focal_length_mm.unwrap() - 4.25).abs() < 1e-9);
        assert_eq!(focal.focal_length_35mm, Some(26.0));
    }

    #[test]
    fn test_reads_big_endian_inside_jpeg() {
        let jpeg = wrap_jpeg(&build_tiff(true, (9, 1), 77));
        let focal = read_focal(&jpeg).unwrap();
        assert_eq!(focal.focal_length_mm, Some(9.0));
        assert_eq!(focal.focal_length_35mm, Some(77.0));
    }

    #[test]
    fn test_app1_payload_and_zero_tag() {
        let mut payload = EXIF_HEADER.to_vec();
        payload.extend_from_slice(&build_tiff(false, (5, 0), 0));
        let focal = read_focal(&payload).unwrap();
        assert!(focal.is_empty());
    }

    #[test]
    fn test_malformed_metadata_is_error() {
        assert!(read_focal(b"not metadata").is_err());
        assert!(read_focal(b"II\x2a\x00\xff\x00\x00\x00").is_err());
        let mut truncated = build_tiff(false, (425, 100), 26);
        truncated.truncate(30);
        assert!(matches!(read_focal(&truncated), Err(EngineError::Exif(_))));
    }
}
