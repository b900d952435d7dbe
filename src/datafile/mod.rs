//! Generic datafile container: header, item/data directories, lazy
//! per-block decompression.
//!
//! A datafile is one header, three (or four, version 4) directory tables,
//! an item region, and a trailing raw-data region. Items are typed records
//! addressed through the directories; raw data blocks are opaque payloads
//! referenced by index from item fields and materialized on demand.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::Path;

use flate2::read::ZlibDecoder;
use tracing::{debug, warn};

use crate::codec::BinaryReader;
use crate::error::{Error, Result};

pub const MAGIC: [u8; 4] = *b"DATA";
/// Byte-swapped magic written by historic big-endian builds.
pub const MAGIC_SWAPPED: [u8; 4] = *b"ATAD";

/// Only version 4 carries the uncompressed-size table and zlib blocks.
pub const VERSION_COMPRESSED: i32 = 4;

const HEADER_SIZE: usize = 36;
const ITEM_TYPE_ENTRY_SIZE: usize = 12;
const ITEM_HEADER_SIZE: usize = 8;

/// Fixed datafile header. All fields are little-endian `i32` on disk.
#[derive(Debug, Clone, Copy)]
pub struct Header {
    pub version: i32,
    pub size: i32,
    pub swaplen: i32,
    pub num_item_types: i32,
    pub num_items: i32,
    pub num_raw_data: i32,
    pub item_size: i32,
    pub data_size: i32,
}

impl Header {
    fn read(reader: &mut BinaryReader) -> Result<Self> {
        let magic = reader.read_bytes(4)?;
        if magic != MAGIC && magic != MAGIC_SWAPPED {
            return Err(Error::MalformedHeader("bad magic"));
        }
        Ok(Self {
            version: reader.read_i32_le()?,
            size: reader.read_i32_le()?,
            swaplen: reader.read_i32_le()?,
            num_item_types: reader.read_i32_le()?,
            num_items: reader.read_i32_le()?,
            num_raw_data: reader.read_i32_le()?,
            item_size: reader.read_i32_le()?,
            data_size: reader.read_i32_le()?,
        })
    }

    /// Byte size of everything between the header and the raw-data region:
    /// item-type table, item offsets, data offsets, the version-4 size
    /// table, and the item region itself.
    fn directory_size(&self) -> u64 {
        let mut size = self.num_item_types as u64 * ITEM_TYPE_ENTRY_SIZE as u64;
        size += (self.num_items as u64 + self.num_raw_data as u64) * 4;
        if self.version == VERSION_COMPRESSED {
            size += self.num_raw_data as u64 * 4;
        }
        size + self.item_size as u64
    }

    fn validate(&self) -> Result<()> {
        if self.num_item_types < 0
            || self.num_items < 0
            || self.num_raw_data < 0
            || self.item_size < 0
        {
            return Err(Error::MalformedHeader("negative count"));
        }
        if self.directory_size() > i32::MAX as u64 {
            return Err(Error::MalformedHeader("directory size overflows 31 bits"));
        }
        Ok(())
    }
}

/// One typed record from the item region.
pub struct Item<'a> {
    pub type_id: u16,
    pub id: u16,
    pub payload: &'a [u8],
}

enum BlockSlot {
    Unloaded,
    Loaded(Vec<u8>),
    /// Short read or corrupt compression; never retried.
    Failed,
}

/// Open datafile with its directory tables resident and raw-data blocks
/// loaded lazily from the file.
pub struct Datafile {
    file: File,
    header: Header,
    buffer: Vec<u8>,
    item_types: Range<usize>,
    item_offsets: Range<usize>,
    data_offsets: Range<usize>,
    data_sizes: Range<usize>,
    items: Range<usize>,
    data_start: u64,
    blocks: Vec<BlockSlot>,
}

impl Datafile {
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let mut header_bytes = [0u8; HEADER_SIZE];
        let got = read_full(&mut file, &mut header_bytes)?;
        if got < HEADER_SIZE {
            return Err(Error::TruncatedFile {
                expected: HEADER_SIZE,
                actual: got,
            });
        }
        let header = Header::read(&mut BinaryReader::new(&header_bytes))?;
        header.validate()?;

        let size = header.directory_size() as usize;
        let mut buffer = vec![0u8; size];
        let got = read_full(&mut file, &mut buffer)?;
        if got < size {
            return Err(Error::TruncatedFile {
                expected: size,
                actual: got,
            });
        }

        let item_types = 0..header.num_item_types as usize * ITEM_TYPE_ENTRY_SIZE;
        let item_offsets = item_types.end..item_types.end + header.num_items as usize * 4;
        let data_offsets = item_offsets.end..item_offsets.end + header.num_raw_data as usize * 4;
        let data_sizes = if header.version == VERSION_COMPRESSED {
            data_offsets.end..data_offsets.end + header.num_raw_data as usize * 4
        } else {
            data_offsets.end..data_offsets.end
        };
        let items = data_sizes.end..data_sizes.end + header.item_size as usize;

        debug!(
            version = header.version,
            item_types = header.num_item_types,
            items = header.num_items,
            raw_data = header.num_raw_data,
            "opened datafile"
        );

        Ok(Self {
            file,
            header,
            buffer,
            item_types,
            item_offsets,
            data_offsets,
            data_sizes,
            items,
            data_start: (HEADER_SIZE + size) as u64,
            blocks: (0..header.num_raw_data).map(|_| BlockSlot::Unloaded).collect(),
        })
    }

    pub fn version(&self) -> i32 {
        self.header.version
    }

    pub fn num_items(&self) -> usize {
        self.header.num_items as usize
    }

    pub fn num_data_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// File offset where the raw-data region begins.
    pub fn data_start(&self) -> u64 {
        self.data_start
    }

    /// Look up the item range registered for a type tag. An absent tag is
    /// `(0, 0)`, not an error; callers must treat a zero count as "no such
    /// item category".
    pub fn item_type(&self, tag: i32) -> (usize, usize) {
        for i in 0..self.header.num_item_types as usize {
            let base = self.item_types.start + i * ITEM_TYPE_ENTRY_SIZE;
            if self.i32_at(base) == tag {
                let start = self.i32_at(base + 4);
                let num = self.i32_at(base + 8);
                return (start.max(0) as usize, num.max(0) as usize);
            }
        }
        (0, 0)
    }

    /// Decode an item through the offset directory. The payload slice is
    /// bounds-checked against the item region; a directory entry pointing
    /// outside it is reported as `CorruptItem` rather than trusted.
    pub fn item(&self, index: usize) -> Result<Item<'_>> {
        if index >= self.num_items() {
            return Err(Error::CorruptItem { index });
        }
        let offset = self.i32_at(self.item_offsets.start + index * 4) as i64;
        let end = if index == self.num_items() - 1 {
            self.header.item_size as i64
        } else {
            self.i32_at(self.item_offsets.start + (index + 1) * 4) as i64
        };
        let region = self.header.item_size as i64;
        if offset < 0 || end < offset + ITEM_HEADER_SIZE as i64 || end > region {
            return Err(Error::CorruptItem { index });
        }

        let base = self.items.start + offset as usize;
        let word = &self.buffer[base..base + 4];
        let type_and_id = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
        let payload = &self.buffer[base + ITEM_HEADER_SIZE..self.items.start + end as usize];
        Ok(Item {
            type_id: ((type_and_id >> 16) & 0xffff) as u16,
            id: (type_and_id & 0xffff) as u16,
            payload,
        })
    }

    /// Materialize a raw-data block, memoized. Returns `None` for out of
    /// range references and for blocks that failed to load or decompress;
    /// a failed block stays failed for the lifetime of this datafile.
    pub fn data(&mut self, index: i32) -> Option<&[u8]> {
        if index < 0 || index as usize >= self.blocks.len() {
            return None;
        }
        let index = index as usize;
        if matches!(self.blocks[index], BlockSlot::Unloaded) {
            let slot = match self.load_block(index) {
                Some(bytes) => BlockSlot::Loaded(bytes),
                None => BlockSlot::Failed,
            };
            self.blocks[index] = slot;
        }
        match &self.blocks[index] {
            BlockSlot::Loaded(bytes) => Some(bytes),
            _ => None,
        }
    }

    fn load_block(&mut self, index: usize) -> Option<Vec<u8>> {
        let offset = self.i32_at(self.data_offsets.start + index * 4);
        let end = if index == self.blocks.len() - 1 {
            self.header.data_size
        } else {
            self.i32_at(self.data_offsets.start + (index + 1) * 4)
        };
        if offset < 0 || end < offset {
            warn!(index, offset, end, "raw data block directory is inconsistent");
            return None;
        }

        let stored_size = (end - offset) as usize;
        let mut stored = vec![0u8; stored_size];
        let read = self
            .file
            .seek(SeekFrom::Start(self.data_start + offset as u64))
            .and_then(|_| read_full(&mut self.file, &mut stored));
        match read {
            Ok(n) if n == stored_size => {}
            Ok(n) => {
                warn!(index, expected = stored_size, actual = n, "short read on raw data block");
                return None;
            }
            Err(err) => {
                warn!(index, %err, "read of raw data block failed");
                return None;
            }
        }

        if self.header.version != VERSION_COMPRESSED {
            return Some(stored);
        }

        let declared = self.i32_at(self.data_sizes.start + index * 4);
        if declared < 0 {
            warn!(index, declared, "raw data block declares negative uncompressed size");
            return None;
        }
        let declared = declared as usize;
        let mut inflated = Vec::with_capacity(declared);
        // The take bound keeps a lying size field from ballooning memory;
        // any overrun shows up as a length mismatch below.
        let result = ZlibDecoder::new(&stored[..])
            .take(declared as u64 + 1)
            .read_to_end(&mut inflated);
        match result {
            Ok(_) if inflated.len() == declared => Some(inflated),
            Ok(_) => {
                warn!(
                    index,
                    declared,
                    actual = inflated.len(),
                    "raw data block inflated to the wrong size"
                );
                None
            }
            Err(err) => {
                warn!(index, %err, "raw data block failed to inflate");
                None
            }
        }
    }

    fn i32_at(&self, offset: usize) -> i32 {
        let word = &self.buffer[offset..offset + 4];
        i32::from_le_bytes([word[0], word[1], word[2], word[3]])
    }
}

fn read_full(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    use super::{HEADER_SIZE, VERSION_COMPRESSED};

    /// Builds synthetic datafiles byte by byte for tests.
    pub struct DatafileBuilder {
        pub version: i32,
        items: Vec<(i32, u16, Vec<u8>)>,
        blocks: Vec<Vec<u8>>,
    }

    impl DatafileBuilder {
        pub fn new(version: i32) -> Self {
            Self {
                version,
                items: Vec::new(),
                blocks: Vec::new(),
            }
        }

        /// Payload is the item body without the 8-byte item header.
        pub fn item(&mut self, type_tag: i32, id: u16, payload: Vec<u8>) -> &mut Self {
            self.items.push((type_tag, id, payload));
            self
        }

        pub fn item_i32s(&mut self, type_tag: i32, id: u16, words: &[i32]) -> &mut Self {
            let payload = words.iter().flat_map(|w| w.to_le_bytes()).collect();
            self.item(type_tag, id, payload)
        }

        /// Registers a raw-data block; returns its index for item fields.
        pub fn block(&mut self, payload: &[u8]) -> i32 {
            self.blocks.push(payload.to_vec());
            (self.blocks.len() - 1) as i32
        }

        pub fn build(&self) -> Vec<u8> {
            // item region + offsets, grouped into one type table entry per tag
            let mut item_bytes = Vec::new();
            let mut item_offsets = Vec::new();
            let mut type_table: Vec<(i32, i32, i32)> = Vec::new();
            for (index, (type_tag, id, payload)) in self.items.iter().enumerate() {
                match type_table.last_mut() {
                    Some((tag, _, num)) if *tag == *type_tag => *num += 1,
                    _ => type_table.push((*type_tag, index as i32, 1)),
                }
                item_offsets.push(item_bytes.len() as i32);
                let type_and_id = ((*type_tag as u32) << 16) | *id as u32;
                item_bytes.extend_from_slice(&type_and_id.to_le_bytes());
                item_bytes.extend_from_slice(&(payload.len() as i32).to_le_bytes());
                item_bytes.extend_from_slice(payload);
            }

            let mut data_bytes = Vec::new();
            let mut data_offsets = Vec::new();
            let mut data_sizes = Vec::new();
            for block in &self.blocks {
                data_offsets.push(data_bytes.len() as i32);
                data_sizes.push(block.len() as i32);
                if self.version == VERSION_COMPRESSED {
                    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                    encoder.write_all(block).unwrap();
                    data_bytes.extend_from_slice(&encoder.finish().unwrap());
                } else {
                    data_bytes.extend_from_slice(block);
                }
            }

            let mut directory_size = type_table.len() * 12;
            directory_size += (item_offsets.len() + data_offsets.len()) * 4;
            if self.version == VERSION_COMPRESSED {
                directory_size += data_sizes.len() * 4;
            }
            directory_size += item_bytes.len();

            let mut out = Vec::new();
            out.extend_from_slice(b"DATA");
            let file_size = HEADER_SIZE + directory_size + data_bytes.len();
            for word in [
                self.version,
                (file_size - 16) as i32,
                (file_size - 16 - data_bytes.len()) as i32,
                type_table.len() as i32,
                item_offsets.len() as i32,
                data_offsets.len() as i32,
                item_bytes.len() as i32,
                data_bytes.len() as i32,
            ] {
                out.extend_from_slice(&word.to_le_bytes());
            }
            for (tag, start, num) in &type_table {
                out.extend_from_slice(&tag.to_le_bytes());
                out.extend_from_slice(&start.to_le_bytes());
                out.extend_from_slice(&num.to_le_bytes());
            }
            for offset in &item_offsets {
                out.extend_from_slice(&offset.to_le_bytes());
            }
            for offset in &data_offsets {
                out.extend_from_slice(&offset.to_le_bytes());
            }
            if self.version == VERSION_COMPRESSED {
                for size in &data_sizes {
                    out.extend_from_slice(&size.to_le_bytes());
                }
            }
            out.extend_from_slice(&item_bytes);
            out.extend_from_slice(&data_bytes);
            out
        }
    }

    pub fn write_temp(bytes: &[u8]) -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let path = std::env::temp_dir().join(format!(
            "ddmap-test-{}-{}.map",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::write(&path, bytes).unwrap();
        path
    }
}
