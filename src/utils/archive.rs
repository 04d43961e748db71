//! tar.gz archive creation, verification and extraction
//!
//! Directory trees are walked in file-name order so the member order of an
//! archive depends only on the source contents.

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A source path and the name it gets inside the archive
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub source: PathBuf,
    pub name: PathBuf,
}

impl ArchiveEntry {
    /// Store `source` under its own base name
    pub fn from_path(source: &Path) -> Result<Self> {
        let name = source
            .file_name()
            .with_context(|| format!("Path has no file name: {:?}", source))?;

        Ok(Self {
            source: source.to_path_buf(),
            name: PathBuf::from(name),
        })
    }

    pub fn named(source: &Path, name: &str) -> Self {
        Self {
            source: source.to_path_buf(),
            name: PathBuf::from(name),
        }
    }
}

/// Archive each source under its base name into a gzip-compressed tarball
pub fn create_archive(sources: &[PathBuf], output: &Path) -> Result<u64> {
    let entries = sources
        .iter()
        .map(|s| ArchiveEntry::from_path(s))
        .collect::<Result<Vec<_>>>()?;

    create_archive_from_entries(&entries, output)
}

/// Build a tar.gz at `output` from explicit entries, returning its size in bytes
///
/// Fails if any source cannot be read while the archive is being written.
/// The partially written output is left in place.
pub fn create_archive_from_entries(entries: &[ArchiveEntry], output: &Path) -> Result<u64> {
    create_archive_excluding(entries, output, &[])
}

/// Like [`create_archive_from_entries`], leaving out everything below `excluded`
///
/// The output file itself is always left out, so a source tree that contains
/// the destination cannot feed the archive into itself.
pub fn create_archive_excluding(
    entries: &[ArchiveEntry],
    output: &Path,
    excluded: &[PathBuf],
) -> Result<u64> {
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    let file = File::create(output)
        .with_context(|| format!("Failed to create archive: {:?}", output))?;

    // Compared against canonical walk paths; the output only resolves once created
    let mut skip: Vec<PathBuf> = excluded
        .iter()
        .filter_map(|p| fs::canonicalize(p).ok())
        .collect();
    skip.push(
        fs::canonicalize(output).with_context(|| format!("Failed to resolve {:?}", output))?,
    );

    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);

    for entry in entries {
        append_entry(&mut builder, entry, &skip)
            .with_context(|| format!("Failed to archive {:?}", entry.source))?;
    }

    let encoder = builder.into_inner().context("Failed to finish tar stream")?;
    let writer = encoder.finish().context("Failed to finish gzip stream")?;
    let file = writer
        .into_inner()
        .map_err(|e| e.into_error())
        .context("Failed to flush archive")?;
    file.sync_all().context("Failed to sync archive")?;

    let size = fs::metadata(output)?.len();
    debug!("Created archive {:?} ({} bytes)", output, size);
    Ok(size)
}

fn is_skipped(path: &Path, skip: &[PathBuf]) -> bool {
    skip.iter().any(|s| path.starts_with(s))
}

fn append_entry<W: io::Write>(
    builder: &mut tar::Builder<W>,
    entry: &ArchiveEntry,
    skip: &[PathBuf],
) -> Result<()> {
    let meta = fs::symlink_metadata(&entry.source)
        .with_context(|| format!("Cannot read {:?}", entry.source))?;

    if !meta.is_dir() {
        let resolved = fs::canonicalize(&entry.source).unwrap_or_else(|_| entry.source.clone());
        if is_skipped(&resolved, skip) {
            warn!("Not archiving {:?}: it lies inside the backup destination", entry.source);
            return Ok(());
        }
        builder.append_path_with_name(&entry.source, &entry.name)?;
        return Ok(());
    }

    // Walk the resolved directory so excluded paths compare by prefix
    let root = fs::canonicalize(&entry.source)
        .with_context(|| format!("Failed to resolve {:?}", entry.source))?;
    let walker = WalkDir::new(&root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|item| {
            let keep = !is_skipped(item.path(), skip);
            if !keep {
                debug!("Excluding {:?} from archive", item.path());
            }
            keep
        });

    for item in walker {
        let item = item?;
        let relative = item
            .path()
            .strip_prefix(&root)
            .context("Walked outside of archive source")?;
        let name = if relative.as_os_str().is_empty() {
            entry.name.clone()
        } else {
            entry.name.join(relative)
        };

        if item.file_type().is_dir() {
            builder.append_dir(&name, item.path())?;
        } else {
            builder.append_path_with_name(item.path(), &name)?;
        }
    }

    Ok(())
}

/// Read every member of the archive through the decompressor without writing to disk
pub fn verify_archive(file: &Path) -> bool {
    match read_all_members(file) {
        Ok(count) => {
            debug!("Archive {:?} verified ({} members)", file, count);
            true
        }
        Err(e) => {
            warn!("Archive verification failed for {:?}: {}", file, e);
            false
        }
    }
}

fn read_all_members(file: &Path) -> Result<usize> {
    let reader = File::open(file)?;
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    let mut count = 0;

    for member in archive.entries()? {
        let mut member = member?;
        io::copy(&mut member, &mut io::sink())?;
        count += 1;
    }

    Ok(count)
}

/// Member paths of an archive, in archive order
pub fn list_archive(file: &Path) -> Result<Vec<PathBuf>> {
    let reader = File::open(file).with_context(|| format!("Failed to open {:?}", file))?;
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    let mut names = Vec::new();

    for member in archive.entries()? {
        names.push(member?.path()?.into_owned());
    }

    Ok(names)
}

/// Unpack an archive into `destination`
pub fn extract_archive(file: &Path, destination: &Path) -> Result<()> {
    fs::create_dir_all(destination)
        .with_context(|| format!("Failed to create directory: {:?}", destination))?;

    let reader = File::open(file).with_context(|| format!("Failed to open {:?}", file))?;
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    archive
        .unpack(destination)
        .with_context(|| format!("Failed to extract {:?}", file))?;

    Ok(())
}
