//! End-to-end reduction sessions against real shell scripts.
#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use class_reducer_classfile::class_file::{ACC_PRIVATE, ACC_PUBLIC, ACC_STATIC};
use class_reducer_classfile::opcodes::RETURN;
use class_reducer_classfile::{ClassBuilder, ClassFile};
use class_reducer_core::{
    Artifact, ArtifactStore, ConfigError, Context, Registry, ReductionState, Session, TestSuite,
    Verdict,
};
use tempfile::TempDir;

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

fn artifact(name: &str, bytes: Vec<u8>) -> Artifact {
    Artifact::from_bytes(PathBuf::from(format!("{}.class", name)), bytes).unwrap()
}

fn context(root: &Path) -> Context {
    Context::new(
        root.join("out"),
        root.join(".tmp"),
        Registry::ordered(Registry::all()),
    )
    .with_timeout(Duration::from_secs(10))
    .with_seed_check(false)
}

fn with_write_only_field(name: &str) -> Vec<u8> {
    let mut b = ClassBuilder::new(name);
    b.field(ACC_PRIVATE, "scratch", "I");
    b.build()
}

#[test]
fn test_minimal_input_runs_no_tests() -> Result<()> {
    let root = TempDir::new()?;
    let ctx = context(root.path());
    let suite = TestSuite::new(
        vec![script(root.path(), "ok.sh", "exit 0\n")],
        ctx.timeout,
    )?;
    let bytes = ClassBuilder::new("demo/Empty").build();
    let store = ArtifactStore::new(vec![artifact("demo/Empty", bytes.clone())])?;

    let report = Session::new(&ctx, &suite, &store).run()?;
    assert_eq!(report.artifacts.len(), 1);
    assert_eq!(report.artifacts[0].stats.tests_run, 0);
    assert_eq!(report.artifacts[0].final_state, ReductionState::Exhausted);
    assert_eq!(fs::read(root.path().join("out/demo/Empty.class"))?, bytes);
    Ok(())
}

#[test]
fn test_single_write_only_field_is_removed() -> Result<()> {
    let root = TempDir::new()?;
    let ctx = context(root.path());
    let suite = TestSuite::new(
        vec![script(root.path(), "ok.sh", "test -f demo/Holder.class\n")],
        ctx.timeout,
    )?;
    let store = ArtifactStore::new(vec![artifact(
        "demo/Holder",
        with_write_only_field("demo/Holder"),
    )])?;

    let report = Session::new(&ctx, &suite, &store).run()?;
    let reduced = fs::read(root.path().join("out/demo/Holder.class"))?;
    let class = ClassFile::parse(&reduced)?;
    assert!(class.fields.is_empty());
    assert_eq!(report.artifacts[0].stats.tests_run, 1);
    assert_eq!(report.artifacts[0].stats.accepted, 1);
    assert!(report.artifacts[0].is_reduced());
    // Scratch directories are cleaned up.
    assert!(!root.path().join(".tmp").exists());
    Ok(())
}

#[test]
fn test_always_failing_suite_keeps_input() -> Result<()> {
    let root = TempDir::new()?;
    let ctx = context(root.path());
    let suite = TestSuite::new(
        vec![script(root.path(), "never.sh", "exit 1\n")],
        ctx.timeout,
    )?;
    let mut b = ClassBuilder::new("demo/Stubborn");
    b.field(ACC_PRIVATE | ACC_STATIC, "x", "J");
    b.method(ACC_PUBLIC, "noop", "()V", 0, 1, vec![RETURN]);
    let bytes = b.build();
    let store = ArtifactStore::new(vec![artifact("demo/Stubborn", bytes.clone())])?;

    let report = Session::new(&ctx, &suite, &store).run()?;
    let stats = &report.artifacts[0].stats;
    assert_eq!(stats.accepted, 0);
    assert_eq!(stats.rejected, stats.tests_run);
    assert!(stats.tests_run > 0);
    assert_eq!(fs::read(root.path().join("out/demo/Stubborn.class"))?, bytes);
    Ok(())
}

#[test]
fn test_uninteresting_seed_is_reported() -> Result<()> {
    let root = TempDir::new()?;
    let ctx = context(root.path()).with_seed_check(true);
    let suite = TestSuite::new(
        vec![script(root.path(), "never.sh", "exit 2\n")],
        ctx.timeout,
    )?;
    let store = ArtifactStore::new(vec![artifact(
        "demo/Seed",
        with_write_only_field("demo/Seed"),
    )])?;

    let err = Session::new(&ctx, &suite, &store).run().unwrap_err();
    match err.downcast_ref::<ConfigError>() {
        Some(ConfigError::UninterestingSeed { script, verdict }) => {
            assert_eq!(script, "never.sh");
            assert_eq!(*verdict, Verdict::Failure { code: Some(2) });
        }
        other => panic!("unexpected error: {:?}", other),
    }
    Ok(())
}

#[test]
fn test_parallel_artifacts_see_each_other() -> Result<()> {
    let root = TempDir::new()?;
    let ctx = context(root.path()).with_jobs(2).with_seed_check(true);
    let suite = TestSuite::new(
        vec![script(
            root.path(),
            "both.sh",
            "test -f demo/A.class && test -f demo/B.class\n",
        )],
        ctx.timeout,
    )?;
    let store = ArtifactStore::new(vec![
        artifact("demo/A", with_write_only_field("demo/A")),
        artifact("demo/B", with_write_only_field("demo/B")),
    ])?;

    let report = Session::new(&ctx, &suite, &store).run()?;
    assert!(report.seed_verified);
    assert_eq!(report.artifacts.len(), 2);
    for name in ["A", "B"] {
        let bytes = fs::read(root.path().join(format!("out/demo/{}.class", name)))?;
        assert!(ClassFile::parse(&bytes)?.fields.is_empty());
    }
    Ok(())
}

#[test]
fn test_keep_temp_preserves_scratch_dirs() -> Result<()> {
    let root = TempDir::new()?;
    let ctx = context(root.path()).with_keep_temp(true);
    let suite = TestSuite::new(
        vec![script(root.path(), "ok.sh", "exit 0\n")],
        ctx.timeout,
    )?;
    let store = ArtifactStore::new(vec![artifact(
        "demo/Kept",
        with_write_only_field("demo/Kept"),
    )])?;

    Session::new(&ctx, &suite, &store).run()?;
    let scratch: Vec<_> = fs::read_dir(root.path().join(".tmp"))?.collect();
    assert_eq!(scratch.len(), 1);
    Ok(())
}
