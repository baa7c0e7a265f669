//! Ordered section list of a scanned JPEG

use crate::segment::{Marker, Section};

/// Sections between SOI and the scan, plus the opaque scan tail
///
/// The tail starts at the SOS (or EOI) marker and runs to the end of the
/// buffer. It is never parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Structure {
    sections: Vec<Section>,
    scan: Vec<u8>,
}

impl Structure {
    /// Create an empty structure
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a section at the end
    pub fn push(&mut self, section: Section) {
        self.sections.push(section);
    }

    /// Insert at `index`, clamped to the end of the list
    pub fn insert(&mut self, index: usize, section: Section) {
        let index = index.min(self.sections.len());
        self.sections.insert(index, section);
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Trailing payload from the SOS or EOI marker on
    pub fn scan(&self) -> &[u8] {
        &self.scan
    }

    pub fn set_scan(&mut self, scan: Vec<u8>) {
        self.scan = scan;
    }

    /// First section of this kind
    pub fn find(&self, marker: Marker) -> Option<&Section> {
        self.sections.iter().find(|s| s.marker == marker)
    }

    pub fn position(&self, marker: Marker) -> Option<usize> {
        self.sections.iter().position(|s| s.marker == marker)
    }

    /// Remove every section of this kind; true if any was removed
    pub fn remove(&mut self, marker: Marker) -> bool {
        let before = self.sections.len();
        self.sections.retain(|s| s.marker != marker);
        self.sections.len() != before
    }

    /// Remove sections of non-standard kinds; true if any was removed
    pub fn remove_unknown(&mut self) -> bool {
        let before = self.sections.len();
        self.sections.retain(|s| {
            let keep = s.marker.is_standard();
            if !keep {
                log::debug!("dropping {} section ({} bytes)", s.marker, s.data.len());
            }
            keep
        });
        self.sections.len() != before
    }

    /// Insert an Exif section after a leading APP0, else first
    ///
    /// Any Exif section already present is removed.
    pub fn insert_exif(&mut self, section: Section) {
        self.remove(Marker::Exif);
        let index = match self.sections.first() {
            Some(first) if first.marker == Marker::Jfif => 1,
            _ => 0,
        };
        self.sections.insert(index, section);
    }

    /// Index just past the leading run of APPn sections
    pub fn after_app_sections(&self) -> usize {
        self.sections
            .iter()
            .position(|s| !s.marker.is_app())
            .unwrap_or(self.sections.len())
    }

    /// Encoded size: SOI, every section and the scan tail
    pub fn total_size(&self) -> usize {
        2 + self
            .sections
            .iter()
            .map(Section::encoded_len)
            .sum::<usize>()
            + self.scan.len()
    }
}
