//! Archive bundling of artifacts.

use std::io::{Cursor, Write};

use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::error::{Error, Result};

/// Packs named byte blobs into one archive blob.
pub trait Bundler {
    /// Bundles `entries`, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be built.
    fn bundle(&self, entries: &[(&str, &[u8])]) -> Result<Vec<u8>>;
}

/// Deflate-compressed zip bundler.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipBundler;

impl Bundler for ZipBundler {
    fn bundle(&self, entries: &[(&str, &[u8])]) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (name, bytes) in entries {
            writer.start_file(*name, options)?;
            writer
                .write_all(bytes)
                .map_err(|e| Error::Archive(format!("writing {name}: {e}")))?;
        }
        Ok(writer.finish()?.into_inner())
    }
}
