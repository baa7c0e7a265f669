//! Container format handlers

pub mod jpeg_io;

pub use jpeg_io::JpegIO;
