//! sfnt container: table directory reading and font serialization

use std::collections::BTreeMap;

use super::FontError;

/// A four-byte table tag, e.g. `*b"glyf"`
pub type Tag = [u8; 4];

const TRUETYPE_VERSION: u32 = 0x0001_0000;
const CHECKSUM_MAGIC: u32 = 0xB1B0_AFBA;
/// Offset of `checkSumAdjustment` within `head`
const HEAD_CHECKSUM_ADJUSTMENT: usize = 8;

pub(crate) fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

pub(crate) fn read_i16(data: &[u8], offset: usize) -> Option<i16> {
    read_u16(data, offset).map(|v| v as i16)
}

pub(crate) fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

pub(crate) fn write_u16(data: &mut [u8], offset: usize, value: u16) {
    data[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
}

/// Split a TrueType font into its tables, keyed by tag
pub fn read_tables(data: &[u8]) -> Result<BTreeMap<Tag, Vec<u8>>, FontError> {
    let version = read_u32(data, 0).ok_or(FontError::Truncated("offset table"))?;
    if version != TRUETYPE_VERSION && &version.to_be_bytes() != b"true" {
        return Err(FontError::Unsupported(format!("sfnt version {version:#010x}")));
    }

    let num_tables = read_u16(data, 4).ok_or(FontError::Truncated("offset table"))? as usize;
    let mut tables = BTreeMap::new();

    for i in 0..num_tables {
        let record = 12 + i * 16;
        let tag: Tag = data
            .get(record..record + 4)
            .and_then(|t| t.try_into().ok())
            .ok_or(FontError::Truncated("table directory"))?;
        let offset = read_u32(data, record + 8).ok_or(FontError::Truncated("table directory"))? as usize;
        let length = read_u32(data, record + 12).ok_or(FontError::Truncated("table directory"))? as usize;

        let bytes = offset
            .checked_add(length)
            .and_then(|end| data.get(offset..end))
            .ok_or_else(|| FontError::TableOutOfBounds(tag_name(&tag)))?;
        tables.insert(tag, bytes.to_vec());
    }

    Ok(tables)
}

/// Serialize tables into a TrueType font, fixing up checksums
///
/// Tables are written in tag order, each padded to a four-byte boundary.
pub fn write_tables(tables: &BTreeMap<Tag, Vec<u8>>) -> Vec<u8> {
    let num_tables = tables.len() as u16;
    let mut entry_selector = 0u16;
    while (1u32 << (entry_selector + 1)) <= num_tables as u32 {
        entry_selector += 1;
    }
    let search_range = (1u16 << entry_selector) * 16;
    let range_shift = num_tables * 16 - search_range;

    let mut font = Vec::new();
    font.extend_from_slice(&TRUETYPE_VERSION.to_be_bytes());
    font.extend_from_slice(&num_tables.to_be_bytes());
    font.extend_from_slice(&search_range.to_be_bytes());
    font.extend_from_slice(&entry_selector.to_be_bytes());
    font.extend_from_slice(&range_shift.to_be_bytes());

    let directory_start = font.len();
    font.resize(directory_start + tables.len() * 16, 0);

    let mut head_offset = None;
    for (i, (tag, data)) in tables.iter().enumerate() {
        let offset = font.len();
        let mut padded = data.clone();
        if tag == b"head" && padded.len() >= HEAD_CHECKSUM_ADJUSTMENT + 4 {
            padded[HEAD_CHECKSUM_ADJUSTMENT..HEAD_CHECKSUM_ADJUSTMENT + 4].fill(0);
            head_offset = Some(offset);
        }
        let checksum = table_checksum(&padded);
        padded.resize((padded.len() + 3) & !3, 0);
        font.extend_from_slice(&padded);

        let record = directory_start + i * 16;
        font[record..record + 4].copy_from_slice(tag);
        font[record + 4..record + 8].copy_from_slice(&checksum.to_be_bytes());
        font[record + 8..record + 12].copy_from_slice(&(offset as u32).to_be_bytes());
        font[record + 12..record + 16].copy_from_slice(&(data.len() as u32).to_be_bytes());
    }

    if let Some(offset) = head_offset {
        let adjustment = CHECKSUM_MAGIC.wrapping_sub(table_checksum(&font));
        let at = offset + HEAD_CHECKSUM_ADJUSTMENT;
        font[at..at + 4].copy_from_slice(&adjustment.to_be_bytes());
    }

    font
}

fn table_checksum(data: &[u8]) -> u32 {
    data.chunks(4).fold(0u32, |sum, chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum.wrapping_add(u32::from_be_bytes(word))
    })
}

pub(crate) fn tag_name(tag: &Tag) -> String {
    String::from_utf8_lossy(tag).trim_end().to_string()
}
