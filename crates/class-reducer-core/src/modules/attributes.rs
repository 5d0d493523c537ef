//! Debug-information stripping.

use anyhow::Result;
use class_reducer_classfile::ClassFile;
use tracing::debug;

use super::method_bodies;
use crate::module::WholeReducer;

const CLASS_DEBUG_ATTRIBUTES: &[&str] = &["SourceFile", "SourceDebugExtension"];
const CODE_DEBUG_ATTRIBUTES: &[&str] = &[
    "LineNumberTable",
    "LocalVariableTable",
    "LocalVariableTypeTable",
];

/// Drops class-level source attributes and the debug tables of every method
/// body in one step.
pub struct StripDebugAttributes;

impl WholeReducer for StripDebugAttributes {
    fn apply(&self, mut class: ClassFile) -> Result<ClassFile> {
        let mut removed = class.remove_attributes(CLASS_DEBUG_ATTRIBUTES);
        for (index, mut code) in method_bodies(&class)? {
            let count = code.remove_attributes(&class.constant_pool, CODE_DEBUG_ATTRIBUTES);
            if count > 0 {
                class.set_code(index, &code)?;
                removed += count;
            }
        }
        debug!("Removing {} debug attributes", removed);
        Ok(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use class_reducer_classfile::class_file::ACC_PUBLIC;
    use class_reducer_classfile::opcodes::{NOP, RETURN};
    use class_reducer_classfile::ClassBuilder;

    #[test]
    fn test_strips_class_and_code_debug_attributes() {
        let mut b = ClassBuilder::new("demo/Debug");
        b.source_file("Debug.java");
        b.method(ACC_PUBLIC, "run", "()V", 0, 1, vec![NOP, RETURN])
            .line_numbers(&[(0, 3), (1, 4)]);
        let class = b.finish();
        assert_eq!(class.code(0).unwrap().unwrap().attributes.len(), 1);

        let stripped = StripDebugAttributes.apply(class).unwrap();
        assert!(stripped.attributes.is_empty());
        let code = stripped.code(0).unwrap().unwrap();
        assert!(code.attributes.is_empty());
        assert_eq!(code.code, vec![NOP, RETURN]);
    }

    #[test]
    fn test_already_stripped_class_is_unchanged() {
        let mut b = ClassBuilder::new("demo/Bare");
        b.method(ACC_PUBLIC, "run", "()V", 0, 1, vec![RETURN]);
        let class = b.finish();
        let before = class.to_bytes();
        assert_eq!(StripDebugAttributes.apply(class).unwrap().to_bytes(), before);
    }
}
