//! Minimal class assembler for fixtures and samples.
//!
//! ```ignore
//! let mut b = ClassBuilder::new("demo/Sample");
//! b.default_constructor();
//! let callee = b.method_ref("demo/Sample", "log", "()V");
//! b.method(ACC_PUBLIC | ACC_STATIC, "main", "([Ljava/lang/String;)V", 1, 1,
//!     [&insn(INVOKESTATIC, callee)[..], &[RETURN]].concat());
//! let bytes = b.build();
//! ```

use crate::class_file::{
    Attribute, ClassFile, MemberInfo, ACC_PUBLIC, ACC_SYNCHRONIZED, CODE,
};
use crate::code::CodeAttribute;
use crate::constant_pool::{ConstantPool, RefKind};
use crate::opcodes::{ALOAD_0, INVOKESPECIAL, RETURN};

pub const OBJECT: &str = "java/lang/Object";
const ACC_SUPER: u16 = ACC_SYNCHRONIZED;

/// Encode a three-byte instruction with a `u16` operand.
pub fn insn(opcode: u8, index: u16) -> [u8; 3] {
    let [hi, lo] = index.to_be_bytes();
    [opcode, hi, lo]
}

pub struct ClassBuilder {
    class: ClassFile,
}

impl ClassBuilder {
    /// Public class extending `java.lang.Object`, class-file version 52.0.
    pub fn new(internal_name: &str) -> Self {
        let mut constant_pool = ConstantPool::default();
        let this_class = constant_pool.intern_class(internal_name);
        let super_class = constant_pool.intern_class(OBJECT);
        Self {
            class: ClassFile {
                minor_version: 0,
                major_version: 52,
                constant_pool,
                access_flags: ACC_PUBLIC | ACC_SUPER,
                this_class,
                super_class,
                interfaces: Vec::new(),
                fields: Vec::new(),
                methods: Vec::new(),
                attributes: Vec::new(),
            },
        }
    }

    pub fn access(&mut self, flags: u16) -> &mut Self {
        self.class.access_flags = flags;
        self
    }

    pub fn pool(&mut self) -> &mut ConstantPool {
        &mut self.class.constant_pool
    }

    pub fn field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        self.pool()
            .intern_member_ref(RefKind::Field, owner, name, descriptor)
    }

    pub fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        self.pool()
            .intern_member_ref(RefKind::Method, owner, name, descriptor)
    }

    pub fn interface_method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        self.pool()
            .intern_member_ref(RefKind::InterfaceMethod, owner, name, descriptor)
    }

    pub fn source_file(&mut self, file_name: &str) -> &mut Self {
        let name_index = self.pool().intern_utf8("SourceFile");
        let value = self.pool().intern_utf8(file_name);
        self.class.attributes.push(Attribute {
            name_index,
            info: value.to_be_bytes().to_vec(),
        });
        self
    }

    pub fn field(&mut self, flags: u16, name: &str, descriptor: &str) -> &mut Self {
        let name_index = self.pool().intern_utf8(name);
        let descriptor_index = self.pool().intern_utf8(descriptor);
        self.class.fields.push(MemberInfo {
            access_flags: flags,
            name_index,
            descriptor_index,
            attributes: Vec::new(),
        });
        self
    }

    pub fn method(
        &mut self,
        flags: u16,
        name: &str,
        descriptor: &str,
        max_stack: u16,
        max_locals: u16,
        code: Vec<u8>,
    ) -> &mut Self {
        let code_name = self.pool().intern_utf8(CODE);
        let body = CodeAttribute {
            max_stack,
            max_locals,
            code,
            exception_table: Vec::new(),
            attributes: Vec::new(),
        };
        self.push_method(
            flags,
            name,
            descriptor,
            vec![Attribute {
                name_index: code_name,
                info: body.to_bytes(),
            }],
        )
    }

    /// A method without a body (abstract or native, depending on `flags`).
    pub fn bodiless_method(&mut self, flags: u16, name: &str, descriptor: &str) -> &mut Self {
        self.push_method(flags, name, descriptor, Vec::new())
    }

    /// `public <init>()V` calling `Object.<init>`.
    pub fn default_constructor(&mut self) -> &mut Self {
        let super_init = self.method_ref(OBJECT, "<init>", "()V");
        let mut code = vec![ALOAD_0];
        code.extend_from_slice(&insn(INVOKESPECIAL, super_init));
        code.push(RETURN);
        self.method(ACC_PUBLIC, "<init>", "()V", 1, 1, code)
    }

    /// Attach a `LineNumberTable` to the most recently added method body.
    pub fn line_numbers(&mut self, entries: &[(u16, u16)]) -> &mut Self {
        let name_index = self.pool().intern_utf8("LineNumberTable");
        let mut info = (entries.len() as u16).to_be_bytes().to_vec();
        for (pc, line) in entries {
            info.extend_from_slice(&pc.to_be_bytes());
            info.extend_from_slice(&line.to_be_bytes());
        }
        if let Some(method) = self.class.methods.last_mut() {
            if let Some(code_attr) = method.attributes.first_mut() {
                if let Ok(mut body) = CodeAttribute::parse(&code_attr.info) {
                    body.attributes.push(Attribute { name_index, info });
                    code_attr.info = body.to_bytes();
                }
            }
        }
        self
    }

    fn push_method(
        &mut self,
        flags: u16,
        name: &str,
        descriptor: &str,
        attributes: Vec<Attribute>,
    ) -> &mut Self {
        let name_index = self.pool().intern_utf8(name);
        let descriptor_index = self.pool().intern_utf8(descriptor);
        self.class.methods.push(MemberInfo {
            access_flags: flags,
            name_index,
            descriptor_index,
            attributes,
        });
        self
    }

    pub fn finish(&self) -> ClassFile {
        self.class.clone()
    }

    pub fn build(&self) -> Vec<u8> {
        self.class.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_file::ACC_STATIC;
    use crate::opcodes::INVOKESTATIC;

    #[test]
    fn test_built_class_parses() {
        let mut b = ClassBuilder::new("demo/Built");
        b.default_constructor();
        let callee = b.method_ref("demo/Built", "helper", "()V");
        let mut code = insn(INVOKESTATIC, callee).to_vec();
        code.push(RETURN);
        b.method(ACC_PUBLIC | ACC_STATIC, "run", "()V", 0, 0, code)
            .line_numbers(&[(0, 10), (3, 11)]);
        b.method(ACC_STATIC, "helper", "()V", 0, 0, vec![RETURN]);

        let class = ClassFile::parse(&b.build()).unwrap();
        assert_eq!(class.this_class_name().unwrap(), "demo/Built");
        assert_eq!(class.methods.len(), 3);
        let run = class.code(1).unwrap().unwrap();
        assert_eq!(run.attributes.len(), 1);
        let callee_ref = class.constant_pool.member_ref(callee).unwrap();
        assert_eq!(callee_ref.name, "helper");
    }
}
