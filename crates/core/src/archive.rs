//! Reproducible `.tar.gz` streams for embedded directories.

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::{Compression, GzBuilder};

/// Collect every regular file under `dir`, recursively, sorted by
/// (parent directory, file name).
///
/// Symlinked directories are not descended into. A symlink to a regular
/// file is collected and archived with the content of its target.
pub fn collect_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk(dir, &mut files)?;
    files.sort_by(|a, b| {
        a.parent()
            .cmp(&b.parent())
            .then_with(|| a.file_name().cmp(&b.file_name()))
    });
    Ok(files)
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let path = entry.path();
        if file_type.is_dir() {
            walk(&path, out)?;
        } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
            out.push(path);
        }
    }
    Ok(())
}

/// Write `files` as a gzip'd tar stream into `out` and return the writer.
///
/// Entries are named by their path relative to `base_dir`; names longer
/// than the header field go through the GNU long-name extension.
/// `mutate_header` runs on each header after its metadata is filled in and
/// before the checksum is computed.
pub fn write_tar_gz<W, F>(
    out: W,
    base_dir: &Path,
    files: &[PathBuf],
    mut mutate_header: F,
) -> std::io::Result<W>
where
    W: Write,
    F: FnMut(&mut tar::Header),
{
    let gz: GzEncoder<W> = GzBuilder::new().mtime(0).write(out, Compression::default());
    let mut tar = tar::Builder::new(gz);

    for path in files {
        let relative = path.strip_prefix(base_dir).unwrap_or(path);
        let archive_name = relative.to_string_lossy().replace('\\', "/");

        let mut file = std::fs::File::open(path)?;
        let metadata = file.metadata()?;

        let mut header = tar::Header::new_gnu();
        header.set_metadata(&metadata);
        mutate_header(&mut header);

        tar.append_data(&mut header, &archive_name, &mut file)?;
    }

    tar.into_inner()?.finish()
}

/// Header mutation that strips ownership and timestamps so that identical
/// content yields an identical archive.
pub fn anonymize_header(header: &mut tar::Header) {
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(0);
    // Names only fail when too long for the field; empty always fits.
    let _ = header.set_username("");
    let _ = header.set_groupname("");
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::fs;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b/nested")).unwrap();
        fs::write(dir.path().join("z.txt"), "z").unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("b/nested/c.txt"), "c").unwrap();
        fs::write(dir.path().join("b/a.txt"), "ba").unwrap();
        dir
    }

    #[test]
    fn collect_files_sorts_by_directory_then_name() {
        let dir = fixture();
        let files = collect_files(dir.path()).unwrap();
        let relative: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(relative, vec!["a.txt", "z.txt", "b/a.txt", "b/nested/c.txt"]);
    }

    #[test]
    fn archive_is_reproducible_and_readable() {
        let dir = fixture();
        let files = collect_files(dir.path()).unwrap();

        let first = write_tar_gz(Vec::new(), dir.path(), &files, anonymize_header).unwrap();
        let second = write_tar_gz(Vec::new(), dir.path(), &files, anonymize_header).unwrap();
        assert_eq!(first, second);

        let mut archive = tar::Archive::new(GzDecoder::new(first.as_slice()));
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| {
                let entry = e.unwrap();
                assert_eq!(entry.header().uid().unwrap(), 0);
                assert_eq!(entry.header().mtime().unwrap(), 0);
                entry.path().unwrap().to_string_lossy().into_owned()
            })
            .collect();
        assert_eq!(names, vec!["a.txt", "z.txt", "b/a.txt", "b/nested/c.txt"]);
    }

    fn entries(archive: &[u8]) -> Vec<(String, Vec<u8>)> {
        use std::io::Read;

        let mut archive = tar::Archive::new(GzDecoder::new(archive));
        archive
            .entries()
            .unwrap()
            .map(|e| {
                let mut entry = e.unwrap();
                let name = entry.path().unwrap().to_string_lossy().into_owned();
                let mut content = Vec::new();
                entry.read_to_end(&mut content).unwrap();
                (name, content)
            })
            .collect()
    }

    #[test]
    fn long_relative_paths_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let relative = format!("{}/{}/file.txt", "a".repeat(60), "b".repeat(60));
        assert!(relative.len() > 100);
        let path = dir.path().join(&relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "deep").unwrap();

        let files = collect_files(dir.path()).unwrap();
        let archive = write_tar_gz(Vec::new(), dir.path(), &files, anonymize_header).unwrap();
        assert_eq!(entries(&archive), vec![(relative, b"deep".to_vec())]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_followed() {
        use std::os::unix::fs::symlink;

        let dir = fixture();
        symlink(dir.path(), dir.path().join("loop")).unwrap();
        symlink(dir.path().join("b"), dir.path().join("b_again")).unwrap();
        symlink(dir.path().join("a.txt"), dir.path().join("a_link.txt")).unwrap();

        let files = collect_files(dir.path()).unwrap();
        let archive = write_tar_gz(Vec::new(), dir.path(), &files, anonymize_header).unwrap();
        let archived = entries(&archive);
        let names: Vec<&str> = archived.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec!["a.txt", "a_link.txt", "z.txt", "b/a.txt", "b/nested/c.txt"]
        );
        assert_eq!(archived[1].1, b"a");
    }
}
