//! Transfer worker - spooled uploads and chunked streaming downloads

use futures_util::StreamExt;
use log::{debug, info};
use node_rpc::NodeClient;
use reqwest::Body;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWrite, AsyncWriteExt};
use tokio_util::io::{ReaderStream, StreamReader};

use super::types::{SPOOL_PREFIX, SPOOL_SUFFIX, STAGING_PREFIX, STAGING_SUFFIX};
use crate::config::DOWNLOAD_CHUNK_SIZE;
use crate::error::TransferError;
use crate::hash::ContentHash;

#[derive(Debug)]
pub(crate) enum CopyError {
    Read(io::Error),
    Write(io::Error),
}

/// Copy `reader` into `writer` in full `chunk_size` writes; only the last may be shorter
pub(crate) async fn copy_in_chunks<R, W>(
    reader: &mut R,
    writer: &mut W,
    chunk_size: usize,
) -> Result<u64, CopyError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buffer = vec![0u8; chunk_size];
    let mut total = 0u64;

    loop {
        let mut filled = 0;
        while filled < chunk_size {
            let read = reader
                .read(&mut buffer[filled..])
                .await
                .map_err(CopyError::Read)?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        if filled == 0 {
            break;
        }

        writer
            .write_all(&buffer[..filled])
            .await
            .map_err(CopyError::Write)?;
        total += filled as u64;

        if filled < chunk_size {
            break;
        }
    }

    writer.flush().await.map_err(CopyError::Write)?;
    Ok(total)
}

fn spool_file(spool_dir: Option<&Path>) -> io::Result<NamedTempFile> {
    let mut builder = Builder::new();
    builder.prefix(SPOOL_PREFIX).suffix(SPOOL_SUFFIX);
    match spool_dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
}

/// Spool `source` to a temp file and add it to the node as one object.
/// The spool file is removed when this returns or is dropped mid-way.
pub(crate) async fn upload_internal<R>(
    node: &NodeClient,
    mut source: R,
    spool_dir: Option<&Path>,
) -> Result<ContentHash, TransferError>
where
    R: AsyncRead + Unpin,
{
    let spool = spool_file(spool_dir).map_err(|e| {
        TransferError::SourceUnavailable(format!("Failed to create spool file: {}", e))
    })?;
    let file_name = spool
        .path()
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| SPOOL_PREFIX.to_string());

    let handle = spool.as_file().try_clone().map_err(|e| {
        TransferError::SourceUnavailable(format!("Failed to open spool file: {}", e))
    })?;
    let mut file = File::from_std(handle);

    let spooled = tokio::io::copy(&mut source, &mut file)
        .await
        .map_err(|e| TransferError::SourceUnavailable(format!("Failed to read source: {}", e)))?;
    file.flush()
        .await
        .map_err(|e| TransferError::SourceUnavailable(format!("Failed to write spool: {}", e)))?;
    file.seek(SeekFrom::Start(0))
        .await
        .map_err(|e| TransferError::SourceUnavailable(format!("Failed to rewind spool: {}", e)))?;
    debug!("transfer_upload: spooled {} bytes to {}", spooled, file_name);

    let body = Body::wrap_stream(ReaderStream::new(file));
    let added = node.add(body, &file_name, Some(spooled)).await?;

    let hash = ContentHash::parse(&added.hash).map_err(|_| {
        TransferError::NetworkFailure(format!("Node returned unexpected hash: {}", added.hash))
    })?;
    info!("transfer_upload: {} size={}", hash, spooled);

    drop(spool);
    Ok(hash)
}

/// Stream the object for `hash` into `writer`, returning the bytes written
pub(crate) async fn download_internal<W>(
    node: &NodeClient,
    hash: &ContentHash,
    writer: &mut W,
) -> Result<u64, TransferError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let stream = node.cat(hash.as_str()).await?;
    let mut reader = StreamReader::new(stream.map(|chunk| chunk.map_err(io::Error::other)));

    match copy_in_chunks(&mut reader, writer, DOWNLOAD_CHUNK_SIZE).await {
        Ok(written) => {
            info!("transfer_download: {} bytes={}", hash, written);
            Ok(written)
        }
        Err(CopyError::Read(e)) => Err(TransferError::NetworkFailure(format!(
            "Failed to read chunk: {}",
            e
        ))),
        Err(CopyError::Write(e)) => Err(TransferError::SinkUnavailable(format!(
            "Failed to write destination: {}",
            e
        ))),
    }
}

fn sink_error(path: &Path, e: io::Error) -> TransferError {
    TransferError::SinkUnavailable(format!("{}: {}", path.display(), e))
}

/// Download target staged in a temp file beside the destination.
/// `commit` renames it over the destination; dropping it first removes the
/// temp file and leaves any existing destination untouched.
pub(crate) struct StagedFile {
    temp: NamedTempFile,
    file: File,
    destination: PathBuf,
}

impl StagedFile {
    pub(crate) async fn create(destination: &Path) -> Result<Self, TransferError> {
        if tokio::fs::metadata(destination)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
        {
            return Err(TransferError::SinkUnavailable(format!(
                "{}: is a directory",
                destination.display()
            )));
        }

        let parent = match destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => parent.to_path_buf(),
            None => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|e| sink_error(&parent, e))?;

        let temp = Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(STAGING_SUFFIX)
            .tempfile_in(&parent)
            .map_err(|e| sink_error(&parent, e))?;
        let handle = temp
            .as_file()
            .try_clone()
            .map_err(|e| sink_error(temp.path(), e))?;

        Ok(Self {
            temp,
            file: File::from_std(handle),
            destination: destination.to_path_buf(),
        })
    }

    pub(crate) fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }

    /// Replace the destination with the staged bytes; callers flush first
    pub(crate) fn commit(self) -> Result<(), TransferError> {
        let Self {
            temp,
            file,
            destination,
        } = self;
        drop(file);
        temp.persist(&destination)
            .map_err(|e| sink_error(&destination, e.error))?;
        debug!("transfer_download: committed {}", destination.display());
        Ok(())
    }
}
