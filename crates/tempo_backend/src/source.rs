//! 带起始偏移的文件字节流
//!
//! 把文件 `[skip, len)` 区间映射为从 0 开始的连续字节流，
//! 供没有原生 seek 的后端按字节偏移模拟跳转。

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use symphonia::core::io::MediaSource;

/// 从文件中间开始的字节流
pub struct OffsetSource {
    file: File,
    /// 文件内的起始偏移
    start: u64,
    /// 可见长度
    len: u64,
    position: u64,
}

impl OffsetSource {
    /// 打开文件并跳过前 `skip` 个字节。偏移超过文件长度时得到空流。
    pub fn open(path: &Path, skip: u64) -> std::io::Result<Self> {
        let mut file = File::open(path)?;
        let total = file.metadata()?.len();
        let start = skip.min(total);
        file.seek(SeekFrom::Start(start))?;

        Ok(Self {
            file,
            start,
            len: total - start,
            position: 0,
        })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 实际跳过的字节数
    pub fn skipped(&self) -> u64 {
        self.start
    }
}

impl Read for OffsetSource {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.position >= self.len {
            return Ok(0);
        }
        let available = (self.len - self.position) as usize;
        let to_read = buf.len().min(available);
        let read = self.file.read(&mut buf[..to_read])?;
        self.position += read as u64;
        Ok(read)
    }
}

impl Seek for OffsetSource {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => self.len as i64 + offset,
            SeekFrom::Current(offset) => self.position as i64 + offset,
        };

        if new_pos < 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seek to negative position",
            ));
        }

        let new_pos = (new_pos as u64).min(self.len);
        self.file.seek(SeekFrom::Start(self.start + new_pos))?;
        self.position = new_pos;
        Ok(self.position)
    }
}

impl MediaSource for OffsetSource {
    fn is_seekable(&self) -> bool {
        true
    }

    fn byte_len(&self) -> Option<u64> {
        Some(self.len)
    }
}
