//! Constant pool model.
//!
//! Entries are stored exactly as they appear in the class file (UTF-8 entries
//! keep their raw modified-UTF-8 bytes) so that re-encoding is lossless.
//! Index 0 and the second slot of every `Long`/`Double` hold
//! [`Constant::Unusable`].

use crate::error::{ClassFileError, Result};
use crate::reader::{put_u16, put_u32, ByteReader};

pub const TAG_UTF8: u8 = 1;
pub const TAG_INTEGER: u8 = 3;
pub const TAG_FLOAT: u8 = 4;
pub const TAG_LONG: u8 = 5;
pub const TAG_DOUBLE: u8 = 6;
pub const TAG_CLASS: u8 = 7;
pub const TAG_STRING: u8 = 8;
pub const TAG_FIELDREF: u8 = 9;
pub const TAG_METHODREF: u8 = 10;
pub const TAG_INTERFACE_METHODREF: u8 = 11;
pub const TAG_NAME_AND_TYPE: u8 = 12;
pub const TAG_METHOD_HANDLE: u8 = 15;
pub const TAG_METHOD_TYPE: u8 = 16;
pub const TAG_DYNAMIC: u8 = 17;
pub const TAG_INVOKE_DYNAMIC: u8 = 18;
pub const TAG_MODULE: u8 = 19;
pub const TAG_PACKAGE: u8 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    Utf8(Vec<u8>),
    Integer(u32),
    Float(u32),
    Long(u64),
    Double(u64),
    Class {
        name_index: u16,
    },
    String {
        string_index: u16,
    },
    Fieldref {
        class_index: u16,
        name_and_type_index: u16,
    },
    Methodref {
        class_index: u16,
        name_and_type_index: u16,
    },
    InterfaceMethodref {
        class_index: u16,
        name_and_type_index: u16,
    },
    NameAndType {
        name_index: u16,
        descriptor_index: u16,
    },
    MethodHandle {
        reference_kind: u8,
        reference_index: u16,
    },
    MethodType {
        descriptor_index: u16,
    },
    Dynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
    InvokeDynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
    Module {
        name_index: u16,
    },
    Package {
        name_index: u16,
    },
    /// Slot 0 and the upper half of a two-slot constant.
    Unusable,
}

impl Constant {
    fn is_wide(&self) -> bool {
        matches!(self, Constant::Long(_) | Constant::Double(_))
    }
}

/// Which kind of symbolic member reference a constant denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Field,
    Method,
    InterfaceMethod,
}

/// A resolved `Fieldref`/`Methodref`/`InterfaceMethodref`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    pub kind: RefKind,
    pub class_name: String,
    pub name: String,
    pub descriptor: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self {
            entries: vec![Constant::Unusable],
        }
    }
}

impl ConstantPool {
    pub(crate) fn parse(r: &mut ByteReader<'_>) -> Result<Self> {
        let count = r.u16()?;
        let mut entries = Vec::with_capacity(count as usize);
        entries.push(Constant::Unusable);

        while entries.len() < count as usize {
            let index = entries.len() as u16;
            let tag = r.u8()?;
            let constant = match tag {
                TAG_UTF8 => {
                    let len = r.u16()? as usize;
                    Constant::Utf8(r.take(len)?.to_vec())
                }
                TAG_INTEGER => Constant::Integer(r.u32()?),
                TAG_FLOAT => Constant::Float(r.u32()?),
                TAG_LONG => Constant::Long(r.u64()?),
                TAG_DOUBLE => Constant::Double(r.u64()?),
                TAG_CLASS => Constant::Class {
                    name_index: r.u16()?,
                },
                TAG_STRING => Constant::String {
                    string_index: r.u16()?,
                },
                TAG_FIELDREF => Constant::Fieldref {
                    class_index: r.u16()?,
                    name_and_type_index: r.u16()?,
                },
                TAG_METHODREF => Constant::Methodref {
                    class_index: r.u16()?,
                    name_and_type_index: r.u16()?,
                },
                TAG_INTERFACE_METHODREF => Constant::InterfaceMethodref {
                    class_index: r.u16()?,
                    name_and_type_index: r.u16()?,
                },
                TAG_NAME_AND_TYPE => Constant::NameAndType {
                    name_index: r.u16()?,
                    descriptor_index: r.u16()?,
                },
                TAG_METHOD_HANDLE => Constant::MethodHandle {
                    reference_kind: r.u8()?,
                    reference_index: r.u16()?,
                },
                TAG_METHOD_TYPE => Constant::MethodType {
                    descriptor_index: r.u16()?,
                },
                TAG_DYNAMIC => Constant::Dynamic {
                    bootstrap_method_attr_index: r.u16()?,
                    name_and_type_index: r.u16()?,
                },
                TAG_INVOKE_DYNAMIC => Constant::InvokeDynamic {
                    bootstrap_method_attr_index: r.u16()?,
                    name_and_type_index: r.u16()?,
                },
                TAG_MODULE => Constant::Module {
                    name_index: r.u16()?,
                },
                TAG_PACKAGE => Constant::Package {
                    name_index: r.u16()?,
                },
                tag => return Err(ClassFileError::UnknownConstantTag { tag, index }),
            };
            let wide = constant.is_wide();
            entries.push(constant);
            if wide {
                entries.push(Constant::Unusable);
            }
        }

        // A trailing long/double may not overflow the declared count.
        if entries.len() != count as usize {
            return Err(ClassFileError::BadConstantIndex(count));
        }

        Ok(Self { entries })
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        put_u16(out, self.entries.len() as u16);
        for constant in &self.entries {
            match constant {
                Constant::Unusable => {}
                Constant::Utf8(bytes) => {
                    out.push(TAG_UTF8);
                    put_u16(out, bytes.len() as u16);
                    out.extend_from_slice(bytes);
                }
                Constant::Integer(v) => {
                    out.push(TAG_INTEGER);
                    put_u32(out, *v);
                }
                Constant::Float(v) => {
                    out.push(TAG_FLOAT);
                    put_u32(out, *v);
                }
                Constant::Long(v) => {
                    out.push(TAG_LONG);
                    out.extend_from_slice(&v.to_be_bytes());
                }
                Constant::Double(v) => {
                    out.push(TAG_DOUBLE);
                    out.extend_from_slice(&v.to_be_bytes());
                }
                Constant::Class { name_index } => {
                    out.push(TAG_CLASS);
                    put_u16(out, *name_index);
                }
                Constant::String { string_index } => {
                    out.push(TAG_STRING);
                    put_u16(out, *string_index);
                }
                Constant::Fieldref {
                    class_index,
                    name_and_type_index,
                } => {
                    out.push(TAG_FIELDREF);
                    put_u16(out, *class_index);
                    put_u16(out, *name_and_type_index);
                }
                Constant::Methodref {
                    class_index,
                    name_and_type_index,
                } => {
                    out.push(TAG_METHODREF);
                    put_u16(out, *class_index);
                    put_u16(out, *name_and_type_index);
                }
                Constant::InterfaceMethodref {
                    class_index,
                    name_and_type_index,
                } => {
                    out.push(TAG_INTERFACE_METHODREF);
                    put_u16(out, *class_index);
                    put_u16(out, *name_and_type_index);
                }
                Constant::NameAndType {
                    name_index,
                    descriptor_index,
                } => {
                    out.push(TAG_NAME_AND_TYPE);
                    put_u16(out, *name_index);
                    put_u16(out, *descriptor_index);
                }
                Constant::MethodHandle {
                    reference_kind,
                    reference_index,
                } => {
                    out.push(TAG_METHOD_HANDLE);
                    out.push(*reference_kind);
                    put_u16(out, *reference_index);
                }
                Constant::MethodType { descriptor_index } => {
                    out.push(TAG_METHOD_TYPE);
                    put_u16(out, *descriptor_index);
                }
                Constant::Dynamic {
                    bootstrap_method_attr_index,
                    name_and_type_index,
                } => {
                    out.push(TAG_DYNAMIC);
                    put_u16(out, *bootstrap_method_attr_index);
                    put_u16(out, *name_and_type_index);
                }
                Constant::InvokeDynamic {
                    bootstrap_method_attr_index,
                    name_and_type_index,
                } => {
                    out.push(TAG_INVOKE_DYNAMIC);
                    put_u16(out, *bootstrap_method_attr_index);
                    put_u16(out, *name_and_type_index);
                }
                Constant::Module { name_index } => {
                    out.push(TAG_MODULE);
                    put_u16(out, *name_index);
                }
                Constant::Package { name_index } => {
                    out.push(TAG_PACKAGE);
                    put_u16(out, *name_index);
                }
            }
        }
    }

    /// Number of slots, including the unusable slot 0.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    /// Iterate `(index, constant)` over usable slots.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &Constant)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, c)| !matches!(c, Constant::Unusable))
            .map(|(i, c)| (i as u16, c))
    }

    pub fn get(&self, index: u16) -> Result<&Constant> {
        match self.entries.get(index as usize) {
            Some(Constant::Unusable) | None => Err(ClassFileError::BadConstantIndex(index)),
            Some(c) => Ok(c),
        }
    }

    pub fn utf8(&self, index: u16) -> Result<String> {
        match self.get(index)? {
            Constant::Utf8(bytes) => {
                decode_modified_utf8(bytes).ok_or(ClassFileError::InvalidUtf8(index))
            }
            _ => Err(ClassFileError::UnexpectedConstant {
                index,
                expected: "Utf8",
            }),
        }
    }

    /// Internal name referenced by a `Class` constant (e.g. `java/lang/Object`).
    pub fn class_name(&self, index: u16) -> Result<String> {
        match self.get(index)? {
            Constant::Class { name_index } => self.utf8(*name_index),
            _ => Err(ClassFileError::UnexpectedConstant {
                index,
                expected: "Class",
            }),
        }
    }

    pub fn name_and_type(&self, index: u16) -> Result<(String, String)> {
        match self.get(index)? {
            Constant::NameAndType {
                name_index,
                descriptor_index,
            } => Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?)),
            _ => Err(ClassFileError::UnexpectedConstant {
                index,
                expected: "NameAndType",
            }),
        }
    }

    /// Resolve a field or method reference to its symbolic parts.
    pub fn member_ref(&self, index: u16) -> Result<MemberRef> {
        let (kind, class_index, nat_index) = match self.get(index)? {
            Constant::Fieldref {
                class_index,
                name_and_type_index,
            } => (RefKind::Field, *class_index, *name_and_type_index),
            Constant::Methodref {
                class_index,
                name_and_type_index,
            } => (RefKind::Method, *class_index, *name_and_type_index),
            Constant::InterfaceMethodref {
                class_index,
                name_and_type_index,
            } => (RefKind::InterfaceMethod, *class_index, *name_and_type_index),
            _ => {
                return Err(ClassFileError::UnexpectedConstant {
                    index,
                    expected: "member reference",
                })
            }
        };
        let (name, descriptor) = self.name_and_type(nat_index)?;
        Ok(MemberRef {
            kind,
            class_name: self.class_name(class_index)?,
            name,
            descriptor,
        })
    }

    /// Append a constant and return its index.
    pub fn push(&mut self, constant: Constant) -> u16 {
        let index = self.entries.len() as u16;
        let wide = constant.is_wide();
        self.entries.push(constant);
        if wide {
            self.entries.push(Constant::Unusable);
        }
        index
    }

    fn find_or_push(&mut self, constant: Constant) -> u16 {
        match self.entries.iter().position(|c| *c == constant) {
            Some(i) => i as u16,
            None => self.push(constant),
        }
    }

    pub fn intern_utf8(&mut self, s: &str) -> u16 {
        self.find_or_push(Constant::Utf8(encode_modified_utf8(s)))
    }

    pub fn intern_class(&mut self, internal_name: &str) -> u16 {
        let name_index = self.intern_utf8(internal_name);
        self.find_or_push(Constant::Class { name_index })
    }

    pub fn intern_string(&mut self, s: &str) -> u16 {
        let string_index = self.intern_utf8(s);
        self.find_or_push(Constant::String { string_index })
    }

    pub fn intern_name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.intern_utf8(name);
        let descriptor_index = self.intern_utf8(descriptor);
        self.find_or_push(Constant::NameAndType {
            name_index,
            descriptor_index,
        })
    }

    pub fn intern_member_ref(
        &mut self,
        kind: RefKind,
        class: &str,
        name: &str,
        descriptor: &str,
    ) -> u16 {
        let class_index = self.intern_class(class);
        let name_and_type_index = self.intern_name_and_type(name, descriptor);
        let constant = match kind {
            RefKind::Field => Constant::Fieldref {
                class_index,
                name_and_type_index,
            },
            RefKind::Method => Constant::Methodref {
                class_index,
                name_and_type_index,
            },
            RefKind::InterfaceMethod => Constant::InterfaceMethodref {
                class_index,
                name_and_type_index,
            },
        };
        self.find_or_push(constant)
    }
}

/// Decode JVM modified UTF-8 (`\0` as `C0 80`, supplementary characters as
/// surrogate pairs).
pub fn decode_modified_utf8(bytes: &[u8]) -> Option<String> {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return Some(s.to_string());
    }

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b & 0x80 == 0 {
            units.push(b as u16);
            i += 1;
        } else if b & 0xe0 == 0xc0 {
            let b2 = *bytes.get(i + 1)?;
            if b2 & 0xc0 != 0x80 {
                return None;
            }
            units.push((((b & 0x1f) as u16) << 6) | (b2 & 0x3f) as u16);
            i += 2;
        } else if b & 0xf0 == 0xe0 {
            let b2 = *bytes.get(i + 1)?;
            let b3 = *bytes.get(i + 2)?;
            if b2 & 0xc0 != 0x80 || b3 & 0xc0 != 0x80 {
                return None;
            }
            units.push(
                (((b & 0x0f) as u16) << 12) | (((b2 & 0x3f) as u16) << 6) | (b3 & 0x3f) as u16,
            );
            i += 3;
        } else {
            return None;
        }
    }
    String::from_utf16(&units).ok()
}

pub fn encode_modified_utf8(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for unit in s.encode_utf16() {
        match unit {
            0x0001..=0x007f => out.push(unit as u8),
            0x0000 | 0x0080..=0x07ff => {
                out.push(0xc0 | ((unit >> 6) as u8 & 0x1f));
                out.push(0x80 | (unit as u8 & 0x3f));
            }
            _ => {
                out.push(0xe0 | ((unit >> 12) as u8 & 0x0f));
                out.push(0x80 | ((unit >> 6) as u8 & 0x3f));
                out.push(0x80 | (unit as u8 & 0x3f));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modified_utf8_nul_and_supplementary() {
        let s = "a\0b\u{1F600}";
        let encoded = encode_modified_utf8(s);
        assert_eq!(&encoded[1..3], &[0xc0, 0x80]);
        // surrogate pair: two three-byte sequences
        assert_eq!(encoded.len(), 1 + 2 + 1 + 6);
        assert_eq!(decode_modified_utf8(&encoded).as_deref(), Some(s));
    }

    #[test]
    fn test_long_takes_two_slots() {
        let mut pool = ConstantPool::default();
        let long = pool.push(Constant::Long(7));
        let next = pool.intern_utf8("x");
        assert_eq!(long, 1);
        assert_eq!(next, 3);
        assert!(pool.get(2).is_err());
        assert_eq!(pool.len(), 4);
    }

    #[test]
    fn test_interning_reuses_entries() {
        let mut pool = ConstantPool::default();
        let a = pool.intern_member_ref(RefKind::Field, "Foo", "x", "I");
        let b = pool.intern_member_ref(RefKind::Field, "Foo", "x", "I");
        assert_eq!(a, b);
        let resolved = pool.member_ref(a).unwrap();
        assert_eq!(resolved.class_name, "Foo");
        assert_eq!(resolved.name, "x");
        assert_eq!(resolved.descriptor, "I");
        assert_eq!(resolved.kind, RefKind::Field);
    }

    #[test]
    fn test_wrong_constant_kind() {
        let mut pool = ConstantPool::default();
        let utf8 = pool.intern_utf8("Foo");
        assert_eq!(
            pool.class_name(utf8).unwrap_err(),
            ClassFileError::UnexpectedConstant {
                index: utf8,
                expected: "Class"
            }
        );
    }
}
