//! Class-file header reading.
//!
//! Decodes just enough of the JVM class-file format to learn a class's
//! declared name, its supertypes and the annotations on its declaration.
//! Nothing in the class is executed; field and method tables are skipped.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{ClassFormatError, ScanError};
use crate::names::{descriptor_to_class_name, internal_to_class_name};
use crate::resource::Resource;

const MAGIC: u32 = 0xCAFE_BABE;
const MAX_ELEMENT_NESTING: usize = 64;

const RUNTIME_VISIBLE_ANNOTATIONS: &str = "RuntimeVisibleAnnotations";
const RUNTIME_INVISIBLE_ANNOTATIONS: &str = "RuntimeInvisibleAnnotations";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassMetadata {
    pub class_name: String,
    pub super_class_name: Option<String>,
    pub interface_names: Vec<String>,
    pub access_flags: u16,
    pub major_version: u16,
    pub minor_version: u16,
    pub annotation_types: Vec<String>,
    pub invisible_annotation_types: Vec<String>,
    pub content_hash: String,
}

impl ClassMetadata {
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Exact canonical-name membership test; meta-annotations are not followed.
    pub fn has_annotation(&self, canonical_name: &str) -> bool {
        self.annotation_types.iter().any(|a| a == canonical_name)
    }
}

pub trait MetadataReader: Send + Sync {
    fn read(&self, resource: &Resource) -> Result<ClassMetadata, ScanError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClassFileReader {
    include_invisible: bool,
}

impl ClassFileReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also treat class-retention annotations as present.
    pub fn including_invisible() -> Self {
        Self {
            include_invisible: true,
        }
    }
}

impl MetadataReader for ClassFileReader {
    fn read(&self, resource: &Resource) -> Result<ClassMetadata, ScanError> {
        let bytes = resource.read_bytes()?;
        let mut metadata = parse_class_file(&bytes).map_err(|source| ScanError::ClassFormat {
            location: resource.location(),
            source,
        })?;
        if self.include_invisible {
            for name in metadata.invisible_annotation_types.clone() {
                if !metadata.annotation_types.contains(&name) {
                    metadata.annotation_types.push(name);
                }
            }
        }
        Ok(metadata)
    }
}

pub fn hash_content(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

// Utf8 entries stay undecoded; string literals may hold lone surrogates.
#[derive(Debug, Clone, Copy)]
enum Constant<'a> {
    Utf8(&'a [u8]),
    Class(u16),
    Other,
    // second slot of a long or double
    Unusable,
}

struct ConstantPool<'a>(Vec<Constant<'a>>);

impl<'a> ConstantPool<'a> {
    fn raw_utf8(&self, index: u16) -> Result<&'a [u8], ClassFormatError> {
        match self.0.get(index as usize) {
            Some(Constant::Utf8(raw)) => Ok(*raw),
            _ => Err(ClassFormatError::BadConstant {
                index,
                expected: "Utf8 entry",
            }),
        }
    }

    fn utf8(&self, index: u16) -> Result<String, ClassFormatError> {
        decode_modified_utf8(self.raw_utf8(index)?).ok_or(ClassFormatError::BadUtf8(index))
    }

    fn class_name(&self, index: u16) -> Result<String, ClassFormatError> {
        match self.0.get(index as usize) {
            Some(Constant::Class(name_index)) => Ok(internal_to_class_name(&self.utf8(*name_index)?)),
            _ => Err(ClassFormatError::BadConstant {
                index,
                expected: "Class entry",
            }),
        }
    }

    fn annotation_type(&self, index: u16) -> Result<String, ClassFormatError> {
        descriptor_to_class_name(&self.utf8(index)?).ok_or(ClassFormatError::BadConstant {
            index,
            expected: "class descriptor",
        })
    }
}

struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ClassFormatError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or(ClassFormatError::Truncated {
                offset: self.pos,
                wanted: n,
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, ClassFormatError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, ClassFormatError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, ClassFormatError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn skip(&mut self, n: usize) -> Result<(), ClassFormatError> {
        self.take(n).map(|_| ())
    }
}

pub fn parse_class_file(bytes: &[u8]) -> Result<ClassMetadata, ClassFormatError> {
    let mut r = ByteReader::new(bytes);

    let magic = r.u32()?;
    if magic != MAGIC {
        return Err(ClassFormatError::BadMagic(magic));
    }
    let minor_version = r.u16()?;
    let major_version = r.u16()?;

    let pool = read_constant_pool(&mut r)?;

    let access_flags = r.u16()?;
    let class_name = pool.class_name(r.u16()?)?;
    let super_index = r.u16()?;
    let super_class_name = if super_index == 0 {
        None
    } else {
        Some(pool.class_name(super_index)?)
    };

    let interface_count = r.u16()?;
    let mut interface_names = Vec::with_capacity(interface_count as usize);
    for _ in 0..interface_count {
        interface_names.push(pool.class_name(r.u16()?)?);
    }

    // fields, then methods
    for _ in 0..2 {
        let member_count = r.u16()?;
        for _ in 0..member_count {
            r.skip(6)?;
            skip_attributes(&mut r)?;
        }
    }

    let mut annotation_types = Vec::new();
    let mut invisible_annotation_types = Vec::new();
    let attribute_count = r.u16()?;
    for _ in 0..attribute_count {
        let name = pool.raw_utf8(r.u16()?)?;
        let len = r.u32()? as usize;
        let body = r.take(len)?;
        if name == RUNTIME_VISIBLE_ANNOTATIONS.as_bytes() {
            read_annotations(&mut ByteReader::new(body), &pool, &mut annotation_types)?;
        } else if name == RUNTIME_INVISIBLE_ANNOTATIONS.as_bytes() {
            read_annotations(
                &mut ByteReader::new(body),
                &pool,
                &mut invisible_annotation_types,
            )?;
        }
    }

    Ok(ClassMetadata {
        class_name,
        super_class_name,
        interface_names,
        access_flags,
        major_version,
        minor_version,
        annotation_types,
        invisible_annotation_types,
        content_hash: hash_content(bytes),
    })
}

fn read_constant_pool<'a>(r: &mut ByteReader<'a>) -> Result<ConstantPool<'a>, ClassFormatError> {
    let count = r.u16()?;
    let mut entries = Vec::with_capacity(count as usize);
    entries.push(Constant::Unusable);

    let mut index = 1u16;
    while index < count {
        let tag = r.u8()?;
        let (constant, slots) = match tag {
            1 => {
                let len = r.u16()? as usize;
                (Constant::Utf8(r.take(len)?), 1)
            }
            3 | 4 => {
                r.skip(4)?;
                (Constant::Other, 1)
            }
            5 | 6 => {
                r.skip(8)?;
                (Constant::Other, 2)
            }
            7 => (Constant::Class(r.u16()?), 1),
            8 | 16 | 19 | 20 => {
                r.skip(2)?;
                (Constant::Other, 1)
            }
            9..=12 | 17 | 18 => {
                r.skip(4)?;
                (Constant::Other, 1)
            }
            15 => {
                r.skip(3)?;
                (Constant::Other, 1)
            }
            _ => return Err(ClassFormatError::UnknownConstantTag { tag, index }),
        };
        entries.push(constant);
        if slots == 2 {
            entries.push(Constant::Unusable);
        }
        index = index.saturating_add(slots);
    }

    Ok(ConstantPool(entries))
}

fn skip_attributes(r: &mut ByteReader<'_>) -> Result<(), ClassFormatError> {
    let count = r.u16()?;
    for _ in 0..count {
        r.skip(2)?;
        let len = r.u32()? as usize;
        r.skip(len)?;
    }
    Ok(())
}

fn read_annotations(
    r: &mut ByteReader<'_>,
    pool: &ConstantPool<'_>,
    out: &mut Vec<String>,
) -> Result<(), ClassFormatError> {
    let count = r.u16()?;
    for _ in 0..count {
        let type_name = pool.annotation_type(r.u16()?)?;
        skip_element_pairs(r, 0)?;
        if !out.contains(&type_name) {
            out.push(type_name);
        }
    }
    Ok(())
}

fn skip_element_pairs(r: &mut ByteReader<'_>, depth: usize) -> Result<(), ClassFormatError> {
    let pairs = r.u16()?;
    for _ in 0..pairs {
        r.skip(2)?;
        skip_element_value(r, depth)?;
    }
    Ok(())
}

fn skip_element_value(r: &mut ByteReader<'_>, depth: usize) -> Result<(), ClassFormatError> {
    if depth >= MAX_ELEMENT_NESTING {
        return Err(ClassFormatError::NestingTooDeep(MAX_ELEMENT_NESTING));
    }
    let tag = r.u8()? as char;
    match tag {
        'B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z' | 's' | 'c' => r.skip(2),
        'e' => r.skip(4),
        '@' => {
            r.skip(2)?;
            skip_element_pairs(r, depth + 1)
        }
        '[' => {
            let n = r.u16()?;
            for _ in 0..n {
                skip_element_value(r, depth + 1)?;
            }
            Ok(())
        }
        other => Err(ClassFormatError::UnknownElementTag(other)),
    }
}

/// Decodes the JVM's modified UTF-8 (two-byte NUL, surrogate pairs encoded
/// as separate three-byte sequences).
fn decode_modified_utf8(raw: &[u8]) -> Option<String> {
    let mut units: Vec<u16> = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let b0 = raw[i] as u16;
        if b0 & 0x80 == 0 {
            units.push(b0);
            i += 1;
        } else if b0 & 0xE0 == 0xC0 {
            let b1 = *raw.get(i + 1)? as u16;
            if b1 & 0xC0 != 0x80 {
                return None;
            }
            units.push(((b0 & 0x1F) << 6) | (b1 & 0x3F));
            i += 2;
        } else if b0 & 0xF0 == 0xE0 {
            let b1 = *raw.get(i + 1)? as u16;
            let b2 = *raw.get(i + 2)? as u16;
            if b1 & 0xC0 != 0x80 || b2 & 0xC0 != 0x80 {
                return None;
            }
            units.push(((b0 & 0x0F) << 12) | ((b1 & 0x3F) << 6) | (b2 & 0x3F));
            i += 3;
        } else {
            return None;
        }
    }
    String::from_utf16(&units).ok()
}
