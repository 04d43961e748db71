//! Unit tests for the archive codec and checksum sidecars

use snapshotter::utils::archive::{create_archive, extract_archive, list_archive, verify_archive};
use snapshotter::utils::checksum::{check_sidecar, digest, sidecar_path, verify_sidecar, write_sidecar, ChecksumStatus};
use std::fs;
use std::path::PathBuf;
use test_utils::TestContext;

fn build_artifact(ctx: &TestContext) -> PathBuf {
    ctx.create_file("etc/app/app.conf", "port = 8080\n");
    ctx.create_file("etc/app/conf.d/tls.conf", "tls = on\n");
    ctx.create_file("etc/hosts", "127.0.0.1 localhost\n");

    let output = ctx.temp_dir().join("out/filesystem-backup-20250101-000000.tar.gz");
    create_archive(
        &[ctx.temp_dir().join("etc/app"), ctx.temp_dir().join("etc/hosts")],
        &output,
    )
    .unwrap();
    output
}

#[test]
fn test_archive_contents_under_base_names() {
    let ctx = TestContext::new();
    let artifact = build_artifact(&ctx);

    let names = list_archive(&artifact).unwrap();
    assert!(names.contains(&PathBuf::from("app/app.conf")));
    assert!(names.contains(&PathBuf::from("app/conf.d/tls.conf")));
    assert!(names.contains(&PathBuf::from("hosts")));
    assert!(verify_archive(&artifact));
}

#[test]
fn test_identical_sources_give_identical_member_order() {
    let ctx = TestContext::new();
    let first = build_artifact(&ctx);
    let second = ctx.temp_dir().join("out/second.tar.gz");
    create_archive(
        &[ctx.temp_dir().join("etc/app"), ctx.temp_dir().join("etc/hosts")],
        &second,
    )
    .unwrap();

    assert_eq!(list_archive(&first).unwrap(), list_archive(&second).unwrap());
}

#[test]
fn test_checksum_round_trip_and_mutation() {
    let ctx = TestContext::new();
    let artifact = build_artifact(&ctx);

    let sum = digest(&artifact).unwrap();
    let sidecar = write_sidecar(&artifact, &sum).unwrap();
    assert_eq!(sidecar, sidecar_path(&artifact));
    assert!(verify_sidecar(&artifact));

    let mut bytes = fs::read(&artifact).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    fs::write(&artifact, bytes).unwrap();

    assert!(!verify_sidecar(&artifact));
    match check_sidecar(&artifact).unwrap() {
        ChecksumStatus::Mismatch { expected, actual } => {
            assert_eq!(expected, sum);
            assert_ne!(actual, sum);
        }
        other => panic!("expected mismatch, got {:?}", other),
    }
}

#[test]
fn test_extract_restores_files() {
    let ctx = TestContext::new();
    let artifact = build_artifact(&ctx);
    let restore = ctx.create_subdir("restore");

    extract_archive(&artifact, &restore).unwrap();

    assert_eq!(fs::read_to_string(restore.join("app/conf.d/tls.conf")).unwrap(), "tls = on\n");
    assert_eq!(fs::read_to_string(restore.join("hosts")).unwrap(), "127.0.0.1 localhost\n");
}
