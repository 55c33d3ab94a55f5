// Copyright (C) 2022 Yehowshua Immanuel
// This program is distributed under both the GPLV3 license
// and the YEHOWSHUA license, both of which can be found at
// the root of the folder containing the sources for this program.
#![cfg(unix)]

use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::OnceLock;

use tempfile::TempDir;

use files::*;

// Stands in for addr2line: `[-f] -e <image> <address>`.
const STUB: &str = r#"#!/bin/sh
if [ "$1" = "-f" ]; then
    echo "func_$4"
    shift
fi
echo "$(basename "$2"):$3"
"#;

/// One stub and config for every test. Writing an executable while another
/// test forks can leave it busy, so it is written once up front.
fn workspace() -> &'static TempDir {
    static DIR: OnceLock<TempDir> = OnceLock::new();
    DIR.get_or_init(|| {
        let dir = tempfile::tempdir().unwrap();
        let stub = dir.path().join("addr2line");
        fs::write(&stub, STUB).unwrap();
        fs::set_permissions(&stub, fs::Permissions::from_mode(0o755)).unwrap();

        let config = format!("[resolver]\ncommand = \"{}\"\n{IMAGES_TOML}", stub.display());
        fs::write(dir.path().join("config.toml"), config).unwrap();

        let broken = format!("[resolver]\ncommand = \"{}\"\n{IMAGES_TOML}", dir.path().join("missing").display());
        fs::write(dir.path().join("broken.toml"), broken).unwrap();
        dir
    })
}

fn config_path(name: &str) -> PathBuf {
    workspace().path().join(name)
}

fn trace(file_name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(file_name)
}

fn run(args: &[&str], stdin: Option<&str>) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_vcd-symtrace"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to run vcd-symtrace");
    let mut input = child.stdin.take().unwrap();
    input.write_all(stdin.unwrap_or("").as_bytes()).unwrap();
    drop(input);
    child.wait_with_output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn extract_with_functions() {
    let config = config_path("config.toml");
    let pc = trace(PC_TRACE);
    let output = run(&["--config", config.to_str().unwrap(), "extract", pc.to_str().unwrap()], None);

    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "pc @ 110: 9ffc1000\n\
         func_0x9ffc1000\n\
         u-boot:0x9ffc1000\n\
         pc @ 120: 8005f500\n\
         func_0x8005f500\n\
         u-boot:0x8005f500\n\
         pc @ 130: 80000000\n\
         func_0x80000000\n\
         fw.elf:0x80000000\n\
         pc @ 140: 80000000\n"
    );
}

#[test]
fn writes_and_seek_flags() {
    let config = config_path("config.toml");
    let writes = trace(WRITES_TRACE);
    let output = run(
        &["-c", config.to_str().unwrap(), "extract", "--events", "writes", writes.to_str().unwrap()],
        None,
    );
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "mem[0x1000] = deadbeef (time 120 mask f)\nmem[0x2000] = deadbeef (time 130 mask f)\n"
    );

    // the default seek anchor is the pc selector, which this trace lacks
    let output = run(
        &[
            "-c",
            config.to_str().unwrap(),
            "extract",
            "--events",
            "writes",
            "--seek-offset",
            "0x10000",
            writes.to_str().unwrap(),
        ],
        None,
    );
    assert!(output.status.success());
    assert_eq!(stdout(&output).lines().count(), 2);

    let pc = trace(PC_TRACE);
    let output = run(
        &["-c", config.to_str().unwrap(), "extract", "--seek-offset", "0x10000", pc.to_str().unwrap()],
        None,
    );
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn annotate_echoes_the_trace() {
    let config = config_path("config.toml");
    let pc = trace(PC_TRACE);
    let output = run(&["--config", config.to_str().unwrap(), "annotate", pc.to_str().unwrap()], None);
    assert!(output.status.success());

    let out = stdout(&output);
    assert!(out.starts_with("$date\n"));
    assert!(out.contains("u-boot:0x9ffc1000\n#110\n"));
    assert!(out.ends_with("#150\n"));
}

#[test]
fn pc_log_from_stdin() {
    let config = config_path("config.toml");
    let output = run(
        &["--config", config.to_str().unwrap(), "pc-log"],
        Some("boot\n> pc: 80000000\n> pc: a0000500\n"),
    );
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "boot\n\
         fw.elf:0x80000000 @ 80000000\n\
         > pc: 80000000\n\
         u-boot:0x8005f500 @ 8005f500\n\
         > pc: a0000500\n"
    );
}

#[test]
fn broken_resolver_still_succeeds() {
    let config = config_path("broken.toml");
    let pc = trace(PC_TRACE);
    let output = run(&["--config", config.to_str().unwrap(), "extract", pc.to_str().unwrap()], None);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "pc @ 110: 9ffc1000\n??\npc @ 120: 8005f500\npc @ 130: 80000000\npc @ 140: 80000000\n"
    );
}

#[test]
fn failures_exit_non_zero() {
    let config = config_path("config.toml");
    let config = config.to_str().unwrap();

    let output = run(&["--config", config, "extract", "/nonexistent/trace.vcd"], None);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());

    let pc = trace(PC_TRACE);
    let output = run(&["--config", config, "extract", "--events", "writes", pc.to_str().unwrap()], None);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("io_storeValid"));

    let output = run(&["--config", "/nonexistent/config.toml", "pc-log"], None);
    assert!(!output.status.success());
}
