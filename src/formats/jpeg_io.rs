//! JPEG section scanning and assembly

use crate::{
    error::{Error, Result},
    segment::{Marker, Section, EOI, MAX_SECTION_PAYLOAD, SOI, SOS},
    structure::Structure,
};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

/// Fill bytes (0xFF) tolerated before a marker code
const MAX_FILL_BYTES: usize = 10;

/// JPEG section scanner
///
/// Splits an in-memory JPEG into its marker sections up to the start of
/// scan, and writes a [`Structure`] back out.
#[derive(Debug, Default, Clone, Copy)]
pub struct JpegIO;

impl JpegIO {
    pub fn new() -> Self {
        Self
    }

    /// True if `header` starts with the SOI marker
    pub fn detect(header: &[u8]) -> bool {
        header.len() >= 2 && header[0] == 0xFF && header[1] == SOI
    }

    /// Scan `data` into sections and a scan tail
    pub fn parse(&self, data: &[u8]) -> Result<Structure> {
        if !Self::detect(data) {
            return Err(Error::NotAJpeg);
        }

        let mut structure = Structure::new();
        let mut source = Cursor::new(data);
        source.set_position(2);

        loop {
            let offset = source.position() as usize;
            let marker = read_marker(&mut source, offset)?;

            if marker == SOS || marker == EOI {
                // Tail keeps the marker itself
                let start = source.position() as usize - 2;
                log::debug!(
                    "{} at {}: {} bytes of scan data kept as-is",
                    Marker::from_byte(marker).label(),
                    start,
                    data.len() - start
                );
                structure.set_scan(data[start..].to_vec());
                break;
            }

            let kind = Marker::from_byte(marker);
            if !kind.has_length() {
                log::debug!("{} at {}", kind.label(), offset);
                structure.push(Section::new(kind, Vec::new()));
                continue;
            }

            let length_at = source.position() as usize;
            let declared = source
                .read_u16::<BigEndian>()
                .map_err(|_| premature_end(length_at))? as usize;
            if declared < 2 {
                return Err(Error::InvalidSegment {
                    offset,
                    reason: format!(
                        "{} declares length {} (minimum 2)",
                        kind.label(),
                        declared
                    ),
                });
            }
            let remaining = data.len() - length_at;
            if declared > remaining {
                return Err(Error::TruncatedSection {
                    marker,
                    offset,
                    declared,
                    remaining,
                });
            }

            let mut payload = vec![0u8; declared - 2];
            source.read_exact(&mut payload)?;
            let kind = Marker::classify(marker, &payload);
            log::debug!("{} at {}: {} bytes", kind.label(), offset, payload.len());
            structure.push(Section::new(kind, payload));
        }

        Ok(structure)
    }

    /// Write SOI, every section and the scan tail
    ///
    /// An empty scan tail is written as a bare EOI.
    pub fn write<W: Write>(&self, structure: &Structure, writer: &mut W) -> Result<()> {
        writer.write_u8(0xFF)?;
        writer.write_u8(SOI)?;

        for section in structure.sections() {
            writer.write_u8(0xFF)?;
            writer.write_u8(section.marker.to_byte())?;
            if !section.marker.has_length() {
                continue;
            }
            if section.data.len() > MAX_SECTION_PAYLOAD {
                return Err(Error::DataTooLarge {
                    size: section.data.len(),
                    max: MAX_SECTION_PAYLOAD,
                });
            }
            writer.write_u16::<BigEndian>((section.data.len() + 2) as u16)?;
            writer.write_all(&section.data)?;
        }

        if structure.scan().is_empty() {
            writer.write_u8(0xFF)?;
            writer.write_u8(EOI)?;
        } else {
            writer.write_all(structure.scan())?;
        }
        Ok(())
    }

    /// [`write`](Self::write) into a fresh buffer
    pub fn assemble(&self, structure: &Structure) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(structure.total_size());
        self.write(structure, &mut out)?;
        Ok(out)
    }
}

/// Read `0xFF`, skip fill bytes, return the marker code
fn read_marker(source: &mut Cursor<&[u8]>, offset: usize) -> Result<u8> {
    let prefix = source.read_u8().map_err(|_| premature_end(offset))?;
    if prefix != 0xFF {
        return Err(Error::InvalidSegment {
            offset,
            reason: format!("Expected 0xFF, got 0x{:02X}", prefix),
        });
    }

    let mut fill = 0;
    loop {
        let marker = source.read_u8().map_err(|_| premature_end(offset))?;
        if marker != 0xFF {
            return Ok(marker);
        }
        fill += 1;
        if fill > MAX_FILL_BYTES {
            return Err(Error::InvalidSegment {
                offset,
                reason: format!("more than {} fill bytes before marker", MAX_FILL_BYTES),
            });
        }
    }
}

fn premature_end(offset: usize) -> Error {
    Error::InvalidSegment {
        offset,
        reason: "data ends before start of scan".into(),
    }
}
