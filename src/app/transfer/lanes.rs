//! Sequential reader over the lane files of one logical input

use std::io::{self, SeekFrom};
use std::path::PathBuf;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Reads an ordered list of files as one byte stream
///
/// Only one file is open at a time and nothing beyond the requested chunk
/// is buffered.
#[derive(Debug)]
pub struct LaneReader {
    files: Vec<(PathBuf, u64)>,
    total: u64,
    index: usize,
    offset: u64,
    current: Option<File>,
}

impl LaneReader {
    /// Stat every file up front
    pub async fn open(paths: &[PathBuf]) -> io::Result<Self> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let size = tokio::fs::metadata(path).await?.len();
            files.push((path.clone(), size));
        }
        let total = files.iter().map(|(_, size)| size).sum();
        Ok(Self {
            files,
            total,
            index: 0,
            offset: 0,
            current: None,
        })
    }

    /// Combined size of all files
    pub fn total_size(&self) -> u64 {
        self.total
    }

    async fn current_file(&mut self) -> io::Result<Option<&mut File>> {
        if self.current.is_none() {
            let Some((path, _)) = self.files.get(self.index) else {
                return Ok(None);
            };
            let mut file = File::open(path).await?;
            if self.offset > 0 {
                file.seek(SeekFrom::Start(self.offset)).await?;
            }
            self.current = Some(file);
        }
        Ok(self.current.as_mut())
    }

    fn next_file(&mut self) {
        self.index += 1;
        self.offset = 0;
        self.current = None;
    }

    /// Read up to `len` bytes, crossing file boundaries
    ///
    /// Returns fewer bytes only at the end of the last file.
    pub async fn read_chunk(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buffer = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            let Some(file) = self.current_file().await? else {
                break;
            };
            let read = file.read(&mut buffer[filled..]).await?;
            if read == 0 {
                self.next_file();
                continue;
            }
            filled += read;
            self.offset += read as u64;
        }
        buffer.truncate(filled);
        Ok(buffer)
    }

    /// Read an exact chunk, failing if the files are shorter than stated
    pub async fn read_exact_chunk(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let chunk = self.read_chunk(len).await?;
        if chunk.len() != len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {} bytes, read {}", len, chunk.len()),
            ));
        }
        Ok(chunk)
    }

    /// Advance `len` bytes without reading them
    pub async fn skip(&mut self, mut len: u64) -> io::Result<()> {
        while len > 0 && self.index < self.files.len() {
            let left = self.files[self.index].1.saturating_sub(self.offset);
            if len >= left {
                len -= left;
                self.next_file();
                continue;
            }
            self.offset += len;
            len = 0;
            let offset = self.offset;
            if let Some(file) = self.current.as_mut() {
                file.seek(SeekFrom::Start(offset)).await?;
            }
        }
        Ok(())
    }

    /// Read everything that is left
    pub async fn read_to_end(&mut self) -> io::Result<Vec<u8>> {
        let mut data = Vec::new();
        loop {
            let chunk = self.read_chunk(64 * 1024).await?;
            if chunk.is_empty() {
                return Ok(data);
            }
            data.extend_from_slice(&chunk);
        }
    }
}
