use chrono::{DateTime, TimeZone};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io;
use std::path::Path;

use crate::classifier::CaptureKind;

/// Minute granularity, shared by the raw dump and its archive.
pub fn timestamp<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%Y-%m-%d-%H-%M").to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpNames {
    pub dump_file: String,
    pub archive_file: String,
}

pub fn dump_names(instance: &str, kind: CaptureKind, timestamp: &str) -> DumpNames {
    let dump_file = match kind {
        CaptureKind::Thread => format!("{}_threaddump_{}.txt", instance, timestamp),
        CaptureKind::Heap => format!("{}_heapdump_{}.hprof", instance, timestamp),
    };
    DumpNames {
        dump_file,
        archive_file: format!("{}_{}_dumps_{}.tar.gz", instance, kind, timestamp),
    }
}

/// Writes `src` into a gzipped tarball at `dest` under `entry_name`.
pub fn create_tar_gz(src: &Path, entry_name: &str, dest: &Path) -> io::Result<()> {
    let encoder = GzEncoder::new(File::create(dest)?, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.append_path_with_name(src, entry_name)?;
    builder.into_inner()?.finish()?;
    Ok(())
}
