//! Archive packaging of written format files
//!
//! All functions here block; exporters call them through
//! `tokio::task::spawn_blocking`.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

fn options() -> FileOptions {
    FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644)
}

/// Files in `dir` whose stem is `stem`, sorted by name
///
/// Collects the sidecar files of a shapefile (`.shp`, `.shx`, `.dbf`,
/// `.prj`, ...).
pub fn files_with_stem(dir: &Path, stem: &str) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.file_stem().is_some_and(|s| s == stem) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Zips `files` flat into `archive`, named by their file names
pub fn zip_files(files: &[PathBuf], archive: &Path) -> io::Result<()> {
    let mut writer = ZipWriter::new(File::create(archive)?);

    for path in files {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported file name: {}", path.display()),
            ));
        };
        writer.start_file(name, options())?;
        io::copy(&mut BufReader::new(File::open(path)?), &mut writer)?;
    }

    writer.finish()?;
    Ok(())
}

/// Zips the tree below `dir` into `archive`, entries under `prefix/`
///
/// Files for which `skip` returns true are left out.
pub fn zip_directory(
    dir: &Path,
    prefix: &str,
    archive: &Path,
    skip: impl Fn(&Path) -> bool,
) -> io::Result<()> {
    let mut writer = ZipWriter::new(File::create(archive)?);
    writer.add_directory(format!("{prefix}/"), options())?;
    add_tree(&mut writer, dir, prefix, &skip)?;
    writer.finish()?;
    Ok(())
}

fn add_tree(
    writer: &mut ZipWriter<File>,
    dir: &Path,
    prefix: &str,
    skip: &impl Fn(&Path) -> bool,
) -> io::Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|e| e.map(|e| e.path()))
        .collect::<io::Result<_>>()?;
    entries.sort();

    for path in entries {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let entry_name = format!("{prefix}/{name}");

        if path.is_dir() {
            writer.add_directory(format!("{entry_name}/"), options())?;
            add_tree(writer, &path, &entry_name, skip)?;
        } else if !skip(&path) {
            writer.start_file(entry_name, options())?;
            io::copy(&mut BufReader::new(File::open(&path)?), writer)?;
        }
    }

    Ok(())
}

/// Whether `path` is a geodatabase lock file
pub fn is_lock_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("lock"))
}
