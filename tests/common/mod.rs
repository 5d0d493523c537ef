//! Shared fixtures for CLI tests.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use class_reducer_classfile::class_file::{ACC_PRIVATE, ACC_PUBLIC, ACC_STATIC};
use class_reducer_classfile::opcodes::{INVOKESTATIC, RETURN};
use class_reducer_classfile::{insn, ClassBuilder};
use tempfile::TempDir;

pub const SAMPLE: &str = "demo/Sample";

/// A class with something for most modules to remove: debug info, a
/// write-only field, empty methods and a void call.
pub fn sample_class() -> Vec<u8> {
    let mut b = ClassBuilder::new(SAMPLE);
    b.source_file("Sample.java");
    b.field(ACC_PRIVATE, "count", "I");
    b.default_constructor();
    let log = b.method_ref(SAMPLE, "log", "()V");
    let mut main = insn(INVOKESTATIC, log).to_vec();
    main.push(RETURN);
    b.method(
        ACC_PUBLIC | ACC_STATIC,
        "main",
        "([Ljava/lang/String;)V",
        0,
        1,
        main,
    )
    .line_numbers(&[(0, 5), (3, 6)]);
    b.method(ACC_STATIC, "log", "()V", 0, 0, vec![RETURN]);
    b.method(ACC_PRIVATE, "unused", "()V", 0, 1, vec![RETURN]);
    b.build()
}

/// Temp working directory holding `demo/Sample.class`.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let class = dir.path().join("demo/Sample.class");
        fs::create_dir_all(class.parent().unwrap()).unwrap();
        fs::write(&class, sample_class()).unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    pub fn output(&self) -> PathBuf {
        self.path().join("out/demo/Sample.class")
    }
}
