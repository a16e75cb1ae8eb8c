//! Archive member extraction
//!
//! Pulls a single named executable out of a verified tar.gz, tar.zst, tar or
//! zip archive. Nothing else in the archive is written to disk.

use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

use binst_schema::ArtifactFormat;
use thiserror::Error;
use zip::ZipArchive;
use zstd::stream::read::Decoder as ZstdDecoder;

/// Failure pulling the executable out of a verified archive.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Reading the archive or writing the member failed.
    #[error("Archive IO error: {0}")]
    Io(#[from] io::Error),

    /// The archive is corrupt or unsupported.
    #[error("Archive error: {0}")]
    Archive(String),

    /// No regular file with the executable's name.
    #[error("Executable '{0}' not found in archive")]
    MissingExecutable(String),

    /// Called with [`ArtifactFormat::Binary`].
    #[error("Format '{0}' is not an archive")]
    NotAnArchive(ArtifactFormat),
}

/// Copy the archive member whose file name is `name` into `out`.
///
/// The first regular file with a matching final path component wins, so
/// both `bap` and `bap-0.1.0/bin/bap` are found. Returns the number of
/// bytes written.
pub fn extract_executable<W: Write>(
    archive: &mut File,
    format: ArtifactFormat,
    name: &str,
    out: &mut W,
) -> Result<u64, ExtractError> {
    archive.seek(SeekFrom::Start(0))?;

    let written = match format {
        ArtifactFormat::TarGz => {
            let decoder = flate2::read::GzDecoder::new(BufReader::new(&*archive));
            copy_from_tar(decoder, name, out)?
        }
        ArtifactFormat::TarZst => {
            let decoder = ZstdDecoder::new(&*archive)?;
            copy_from_tar(decoder, name, out)?
        }
        ArtifactFormat::Tar => copy_from_tar(BufReader::new(&*archive), name, out)?,
        ArtifactFormat::Zip => copy_from_zip(archive, name, out)?,
        ArtifactFormat::Binary => return Err(ExtractError::NotAnArchive(format)),
    };

    tracing::debug!("Extracted {name} ({written} bytes) from {format} archive");
    Ok(written)
}

fn matches_name(path: &Path, name: &str) -> bool {
    path.file_name() == Some(OsStr::new(name))
}

fn copy_from_tar<R: Read, W: Write>(reader: R, name: &str, out: &mut W) -> Result<u64, ExtractError> {
    let mut archive = tar::Archive::new(reader);

    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        if matches_name(&entry.path()?, name) {
            return Ok(io::copy(&mut entry, out)?);
        }
    }

    Err(ExtractError::MissingExecutable(name.to_string()))
}

fn copy_from_zip<W: Write>(file: &File, name: &str, out: &mut W) -> Result<u64, ExtractError> {
    let mut archive = ZipArchive::new(file).map_err(|e| ExtractError::Archive(e.to_string()))?;

    for i in 0..archive.len() {
        let mut member = archive
            .by_index(i)
            .map_err(|e| ExtractError::Archive(e.to_string()))?;
        if member.is_dir() {
            continue;
        }
        // Skip entries whose names would escape the archive root.
        let Some(path) = member.enclosed_name() else {
            continue;
        };
        if matches_name(&path, name) {
            return Ok(io::copy(&mut member, out)?);
        }
    }

    Err(ExtractError::MissingExecutable(name.to_string()))
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Archive builders shared by the extraction and installer tests.

    use std::io::Write;

    /// tar with `entries` as (path, contents) pairs, mode 0755.
    pub(crate) fn tar_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, path, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    pub(crate) fn tar_gz_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&tar_bytes(entries)).unwrap();
        encoder.finish().unwrap()
    }

    pub(crate) fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default().unix_permissions(0o755);
        for (path, data) in entries {
            writer.start_file(*path, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }
}
