//! Structural model of a class file and its lossless (de)serialization.

use crate::code::CodeAttribute;
use crate::constant_pool::ConstantPool;
use crate::error::{ClassFileError, Result};
use crate::reader::{put_u16, put_u32, ByteReader};

pub const MAGIC: u32 = 0xcafe_babe;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_PROTECTED: u16 = 0x0004;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_SYNCHRONIZED: u16 = 0x0020;
pub const ACC_NATIVE: u16 = 0x0100;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;

pub const CODE: &str = "Code";

/// A raw attribute: name index plus undecoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name_index: u16,
    pub info: Vec<u8>,
}

/// A `field_info` or `method_info` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub access_flags: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<Attribute>,
}

impl MemberInfo {
    pub fn has_flag(&self, flag: u16) -> bool {
        self.access_flags & flag != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: u16,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<MemberInfo>,
    pub methods: Vec<MemberInfo>,
    pub attributes: Vec<Attribute>,
}

impl ClassFile {
    /// Decode a complete class file. The whole buffer must be consumed.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(bytes);
        let magic = r.u32()?;
        if magic != MAGIC {
            return Err(ClassFileError::BadMagic(magic));
        }
        let minor_version = r.u16()?;
        let major_version = r.u16()?;
        let constant_pool = ConstantPool::parse(&mut r)?;
        let access_flags = r.u16()?;
        let this_class = r.u16()?;
        let super_class = r.u16()?;

        let interface_count = r.u16()?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interfaces.push(r.u16()?);
        }

        let fields = parse_members(&mut r)?;
        let methods = parse_members(&mut r)?;
        let attributes = parse_attributes(&mut r)?;

        if r.remaining() != 0 {
            return Err(ClassFileError::TrailingBytes(r.remaining()));
        }

        let class = Self {
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        };
        // The declared name is the artifact key; refuse classes without one.
        class.this_class_name()?;
        Ok(class)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        put_u32(&mut out, MAGIC);
        put_u16(&mut out, self.minor_version);
        put_u16(&mut out, self.major_version);
        self.constant_pool.write(&mut out);
        put_u16(&mut out, self.access_flags);
        put_u16(&mut out, self.this_class);
        put_u16(&mut out, self.super_class);
        put_u16(&mut out, self.interfaces.len() as u16);
        for i in &self.interfaces {
            put_u16(&mut out, *i);
        }
        write_members(&mut out, &self.fields);
        write_members(&mut out, &self.methods);
        write_attributes(&mut out, &self.attributes);
        out
    }

    /// Internal name of the declared class, e.g. `com/example/Foo`.
    pub fn this_class_name(&self) -> Result<String> {
        self.constant_pool.class_name(self.this_class)
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags & ACC_INTERFACE != 0
    }

    pub fn member_name(&self, member: &MemberInfo) -> Result<String> {
        self.constant_pool.utf8(member.name_index)
    }

    pub fn member_descriptor(&self, member: &MemberInfo) -> Result<String> {
        self.constant_pool.utf8(member.descriptor_index)
    }

    pub fn attribute_name(&self, attribute: &Attribute) -> Result<String> {
        self.constant_pool.utf8(attribute.name_index)
    }

    fn method(&self, index: usize) -> Result<&MemberInfo> {
        self.methods.get(index).ok_or(ClassFileError::MemberOutOfRange {
            what: "method",
            index,
        })
    }

    fn code_slot(&self, method: &MemberInfo) -> Option<usize> {
        method
            .attributes
            .iter()
            .position(|a| self.attribute_name(a).is_ok_and(|n| n == CODE))
    }

    /// Decoded `Code` attribute of a method, `None` for abstract/native ones.
    pub fn code(&self, method_index: usize) -> Result<Option<CodeAttribute>> {
        let method = self.method(method_index)?;
        match self.code_slot(method) {
            Some(slot) => CodeAttribute::parse(&method.attributes[slot].info).map(Some),
            None => Ok(None),
        }
    }

    /// Replace the `Code` attribute of a method that already has one.
    pub fn set_code(&mut self, method_index: usize, code: &CodeAttribute) -> Result<()> {
        let slot = self
            .code_slot(self.method(method_index)?)
            .ok_or_else(|| {
                ClassFileError::MalformedCode(format!("method {method_index} has no Code attribute"))
            })?;
        self.methods[method_index].attributes[slot].info = code.to_bytes();
        Ok(())
    }

    /// Drop class-level attributes whose name is in `names`.
    pub fn remove_attributes(&mut self, names: &[&str]) -> usize {
        let pool = &self.constant_pool;
        let before = self.attributes.len();
        self.attributes
            .retain(|a| !pool.utf8(a.name_index).is_ok_and(|n| names.contains(&n.as_str())));
        before - self.attributes.len()
    }
}

fn parse_members(r: &mut ByteReader<'_>) -> Result<Vec<MemberInfo>> {
    let count = r.u16()?;
    let mut members = Vec::with_capacity(count as usize);
    for _ in 0..count {
        members.push(MemberInfo {
            access_flags: r.u16()?,
            name_index: r.u16()?,
            descriptor_index: r.u16()?,
            attributes: parse_attributes(r)?,
        });
    }
    Ok(members)
}

fn write_members(out: &mut Vec<u8>, members: &[MemberInfo]) {
    put_u16(out, members.len() as u16);
    for m in members {
        put_u16(out, m.access_flags);
        put_u16(out, m.name_index);
        put_u16(out, m.descriptor_index);
        write_attributes(out, &m.attributes);
    }
}

pub(crate) fn parse_attributes(r: &mut ByteReader<'_>) -> Result<Vec<Attribute>> {
    let count = r.u16()?;
    let mut attributes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name_index = r.u16()?;
        let len = r.u32()? as usize;
        attributes.push(Attribute {
            name_index,
            info: r.take(len)?.to_vec(),
        });
    }
    Ok(attributes)
}

pub(crate) fn write_attributes(out: &mut Vec<u8>, attributes: &[Attribute]) {
    put_u16(out, attributes.len() as u16);
    for a in attributes {
        put_u16(out, a.name_index);
        put_u32(out, a.info.len() as u32);
        out.extend_from_slice(&a.info);
    }
}
