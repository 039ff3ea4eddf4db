use crate::core::timestamp::RunTimestamp;
use crate::errors::ArchiveError;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const ZSTD_LEVEL: i32 = 3;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ArchiveFormat {
    TarGz,
    TarZst,
}

impl ArchiveFormat {
    pub(crate) fn from_id(id: &str) -> Option<Self> {
        match id {
            "tar.gz" => Some(Self::TarGz),
            "tar.zst" => Some(Self::TarZst),
            _ => None,
        }
    }

    pub(crate) fn extension(&self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::TarZst => "tar.zst",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Archive {
    pub(crate) path: PathBuf,
    pub(crate) file_name: String,
    pub(crate) timestamp: RunTimestamp,
    pub(crate) size: u64,
}

pub(crate) fn archive_file_name(
    project_name: &str,
    timestamp: &RunTimestamp,
    format: ArchiveFormat,
) -> String {
    format!("{}-{}.{}", project_name, timestamp, format.extension())
}

/// Turns a directory into one compressed archive in an ephemeral directory.
///
/// There is no locking: if the source changes while it is being read the
/// archive contains whatever was on disk at the time each file was visited.
pub(crate) struct Archiver {
    temp_dir: PathBuf,
    format: ArchiveFormat,
}

impl Archiver {
    pub(crate) fn new(temp_dir: impl Into<PathBuf>, format: ArchiveFormat) -> Self {
        Self {
            temp_dir: temp_dir.into(),
            format,
        }
    }

    /// Captures the wall clock once and archives `source_dir` under that timestamp.
    pub(crate) async fn create_archive(
        &self,
        source_dir: &Path,
        project_name: &str,
    ) -> Result<Archive, ArchiveError> {
        self.create_archive_at(source_dir, project_name, RunTimestamp::now())
            .await
    }

    pub(crate) async fn create_archive_at(
        &self,
        source_dir: &Path,
        project_name: &str,
        timestamp: RunTimestamp,
    ) -> Result<Archive, ArchiveError> {
        let source = resolve_source(source_dir)?;
        let root_name = source
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| project_name.to_string());

        let file_name = archive_file_name(project_name, &timestamp, self.format);
        let path = self.temp_dir.join(&file_name);
        let format = self.format;

        tracing::debug!(source = %source.display(), archive = %path.display(), "creating archive");

        let destination = path.clone();
        let size = tokio::task::spawn_blocking(move || {
            write_archive(&source, &root_name, &destination, format)
        })
        .await
        .map_err(|e| ArchiveError::Task(e.to_string()))?
        .map_err(|source| ArchiveError::Io {
            path: path.clone(),
            source,
        })?;

        Ok(Archive {
            path,
            file_name,
            timestamp,
            size,
        })
    }
}

fn resolve_source(source_dir: &Path) -> Result<PathBuf, ArchiveError> {
    let source = std::fs::canonicalize(source_dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ArchiveError::SourceMissing(source_dir.to_path_buf()),
        _ => ArchiveError::Io {
            path: source_dir.to_path_buf(),
            source: e,
        },
    })?;

    if !source.is_dir() {
        return Err(ArchiveError::NotADirectory(source_dir.to_path_buf()));
    }

    Ok(source)
}

fn write_archive(
    source: &Path,
    root_name: &str,
    destination: &Path,
    format: ArchiveFormat,
) -> std::io::Result<u64> {
    let writer = BufWriter::new(File::create(destination)?);

    let mut writer = match format {
        ArchiveFormat::TarGz => {
            let encoder = GzEncoder::new(writer, Compression::default());
            append_tree(encoder, source, root_name)?.finish()?
        }
        ArchiveFormat::TarZst => {
            let encoder = zstd::stream::write::Encoder::new(writer, ZSTD_LEVEL)?;
            append_tree(encoder, source, root_name)?.finish()?
        }
    };
    writer.flush()?;
    drop(writer);

    Ok(std::fs::metadata(destination)?.len())
}

fn append_tree<W: Write>(writer: W, source: &Path, root_name: &str) -> std::io::Result<W> {
    let mut builder = tar::Builder::new(writer);
    builder.follow_symlinks(false);
    builder.append_dir_all(root_name, source)?;
    builder.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn entry_names<R: Read>(reader: R) -> Vec<String> {
        let mut archive = tar::Archive::new(reader);
        let mut names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|entry| {
                entry
                    .unwrap()
                    .path()
                    .unwrap()
                    .to_string_lossy()
                    .trim_end_matches('/')
                    .to_string()
            })
            .collect();
        names.sort();
        names
    }

    fn project_fixture() -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        let project = root.path().join("website");
        std::fs::create_dir_all(project.join("assets")).unwrap();
        std::fs::write(project.join("index.html"), "<h1>hi</h1>").unwrap();
        std::fs::write(project.join("assets").join("app.js"), "console.log(1)").unwrap();
        root
    }

    #[tokio::test]
    async fn gzip_archive_keeps_directory_base_name_as_root() {
        let root = project_fixture();
        let temp = tempfile::tempdir().unwrap();
        let archiver = Archiver::new(temp.path(), ArchiveFormat::TarGz);

        let archive = archiver
            .create_archive(&root.path().join("website"), "site")
            .await
            .unwrap();

        assert_eq!(archive.file_name, format!("site-{}.tar.gz", archive.timestamp));
        assert_eq!(archive.path, temp.path().join(&archive.file_name));
        assert!(archive.size > 0);

        let file = File::open(&archive.path).unwrap();
        assert_eq!(
            entry_names(GzDecoder::new(file)),
            vec![
                "website",
                "website/assets",
                "website/assets/app.js",
                "website/index.html"
            ]
        );
    }

    #[tokio::test]
    async fn zstd_archive_uses_its_own_extension() {
        let root = project_fixture();
        let temp = tempfile::tempdir().unwrap();
        let archiver = Archiver::new(temp.path(), ArchiveFormat::TarZst);
        let timestamp = RunTimestamp::from_datetime(
            chrono::NaiveDate::from_ymd_opt(2024, 5, 6)
                .unwrap()
                .and_hms_opt(7, 8, 9)
                .unwrap(),
        );

        let archive = archiver
            .create_archive_at(&root.path().join("website"), "site", timestamp)
            .await
            .unwrap();

        assert_eq!(archive.file_name, "site-20240506-070809.tar.zst");

        let file = File::open(&archive.path).unwrap();
        let decoder = zstd::stream::read::Decoder::new(file).unwrap();
        assert!(entry_names(decoder).contains(&"website/index.html".to_string()));
    }

    #[tokio::test]
    async fn missing_source_is_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let archiver = Archiver::new(temp.path(), ArchiveFormat::TarGz);

        let err = archiver
            .create_archive(&temp.path().join("nope"), "site")
            .await
            .unwrap_err();

        assert!(matches!(err, ArchiveError::SourceMissing(_)));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn file_source_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("notes.txt");
        std::fs::write(&file, "x").unwrap();
        let archiver = Archiver::new(temp.path(), ArchiveFormat::TarGz);

        let err = archiver.create_archive(&file, "site").await.unwrap_err();

        assert!(matches!(err, ArchiveError::NotADirectory(_)));
    }

    #[test]
    fn format_ids_round_trip_to_extensions() {
        assert_eq!(ArchiveFormat::from_id("tar.gz"), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::from_id("tar.zst").map(|f| f.extension()), Some("tar.zst"));
        assert_eq!(ArchiveFormat::from_id("zip"), None);
    }
}
