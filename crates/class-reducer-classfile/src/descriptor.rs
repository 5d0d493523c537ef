//! Field and method descriptor parsing.

use crate::error::{ClassFileError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
    Object(String),
    Array(Box<FieldType>),
}

impl FieldType {
    pub fn parse(descriptor: &str) -> Result<Self> {
        let (ty, rest) = parse_field_type(descriptor, descriptor)?;
        if !rest.is_empty() {
            return Err(ClassFileError::BadDescriptor(descriptor.to_string()));
        }
        Ok(ty)
    }

    /// `long` and `double` occupy two operand stack slots (category 2).
    pub fn is_wide(&self) -> bool {
        matches!(self, FieldType::Long | FieldType::Double)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub params: Vec<FieldType>,
    /// `None` for `void`.
    pub ret: Option<FieldType>,
}

impl MethodDescriptor {
    pub fn parse(descriptor: &str) -> Result<Self> {
        let bad = || ClassFileError::BadDescriptor(descriptor.to_string());
        let mut rest = descriptor.strip_prefix('(').ok_or_else(bad)?;
        let mut params = Vec::new();
        while !rest.starts_with(')') {
            if rest.is_empty() {
                return Err(bad());
            }
            let (ty, tail) = parse_field_type(rest, descriptor)?;
            params.push(ty);
            rest = tail;
        }
        let ret_desc = &rest[1..];
        let ret = if ret_desc == "V" {
            None
        } else {
            Some(FieldType::parse(ret_desc).map_err(|_| bad())?)
        };
        Ok(Self { params, ret })
    }

    pub fn is_void(&self) -> bool {
        self.ret.is_none()
    }
}

fn parse_field_type<'a>(s: &'a str, whole: &str) -> Result<(FieldType, &'a str)> {
    let bad = || ClassFileError::BadDescriptor(whole.to_string());
    let mut chars = s.chars();
    let ty = match chars.next().ok_or_else(bad)? {
        'B' => FieldType::Byte,
        'C' => FieldType::Char,
        'D' => FieldType::Double,
        'F' => FieldType::Float,
        'I' => FieldType::Int,
        'J' => FieldType::Long,
        'S' => FieldType::Short,
        'Z' => FieldType::Boolean,
        'L' => {
            let body = &s[1..];
            let end = body.find(';').ok_or_else(bad)?;
            if end == 0 {
                return Err(bad());
            }
            return Ok((FieldType::Object(body[..end].to_string()), &body[end + 1..]));
        }
        '[' => {
            let (inner, rest) = parse_field_type(&s[1..], whole)?;
            return Ok((FieldType::Array(Box::new(inner)), rest));
        }
        _ => return Err(bad()),
    };
    Ok((ty, chars.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_descriptor() {
        let d = MethodDescriptor::parse("(IJ[Ljava/lang/String;D)V").unwrap();
        assert!(d.is_void());
        assert_eq!(d.params.len(), 4);
        assert!(d.params[1].is_wide());
        assert_eq!(
            d.params[2],
            FieldType::Array(Box::new(FieldType::Object("java/lang/String".into())))
        );
        assert!(d.params[3].is_wide());

        let r = MethodDescriptor::parse("()Ljava/lang/Object;").unwrap();
        assert_eq!(r.ret, Some(FieldType::Object("java/lang/Object".into())));
    }

    #[test]
    fn test_bad_descriptors() {
        for bad in ["", "I", "(I", "(Q)V", "(L;)V", "()", "()VV", "(Ljava/lang/String)V"] {
            assert!(MethodDescriptor::parse(bad).is_err(), "{bad} should fail");
        }
        assert!(FieldType::parse("II").is_err());
        assert!(FieldType::parse("[[J").is_ok());
    }
}
