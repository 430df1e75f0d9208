//! End-to-end scenarios: build source files, inspect the emitted image,
//! and execute it through `lang run`.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn lang() -> Command {
    Command::cargo_bin("lang").expect("lang binary not built")
}

/// Write `source` into the directory and `lang build` it, returning the
/// image path.
fn build(dir: &TempDir, source: &str) -> PathBuf {
    let source_path = dir.path().join("program.lng");
    std::fs::write(&source_path, source).expect("writing source failed");

    lang().arg("build").arg(&source_path).assert().success();

    let image_path = dir.path().join("program.lng.vm");
    assert!(image_path.exists(), "no image written");
    image_path
}

#[test]
fn test_hello_world_build_and_run() {
    let dir = TempDir::new().expect("tempdir failed");
    let image = build(&dir, "fn main() { write(\"hi\"); return 0; }");

    let bytes = std::fs::read(&image).expect("reading image failed");
    assert_eq!(&bytes[..5], &[0x2E, 0x6C, 0x6E, 0x67, 0x00], "bad signature");

    // The data section interns both the literal and the entry point
    // name as NUL-terminated strings.
    assert!(
        bytes.windows(3).any(|w| w == b"hi\x00"),
        "\"hi\" not in data section",
    );
    assert!(
        bytes.windows(5).any(|w| w == b"main\x00"),
        "\"main\" not in data section",
    );

    lang()
        .arg("run")
        .arg(&image)
        .assert()
        .code(0)
        .stdout("hi\n");
}

#[test]
fn test_arithmetic_precedence() {
    let dir = TempDir::new().expect("tempdir failed");
    let image = build(&dir, "fn main() { write(1 + 2 * 3); return 0; }");

    lang().arg("run").arg(&image).assert().code(0).stdout("7\n");
}

#[test]
fn test_recursive_factorial() {
    let dir = TempDir::new().expect("tempdir failed");
    let image = build(
        &dir,
        "fn fact(n) { if (n <= 1) return 1; return n * fact(n - 1); }
         fn main() { write(fact(5)); return 0; }",
    );

    lang().arg("run").arg(&image).assert().code(0).stdout("120\n");
}

#[test]
fn test_while_loop_with_mutation() {
    let dir = TempDir::new().expect("tempdir failed");
    let image = build(
        &dir,
        "fn main() { let i = 0; while (i < 3) { write(i); i += 1; } return 0; }",
    );

    lang()
        .arg("run")
        .arg(&image)
        .assert()
        .code(0)
        .stdout("0\n1\n2\n");
}

#[test]
fn test_list_operations() {
    let dir = TempDir::new().expect("tempdir failed");
    let image = build(
        &dir,
        "fn main() {
             let xs = [1, 2, 3];
             append(xs, 4);
             write(length(xs));
             write(xs[3]);
             return 0;
         }",
    );

    lang()
        .arg("run")
        .arg(&image)
        .assert()
        .code(0)
        .stdout("4\n4\n");
}

#[test]
fn test_division_by_zero_panics() {
    let dir = TempDir::new().expect("tempdir failed");
    let image = build(&dir, "fn main() { write(1/0); return 0; }");

    lang()
        .arg("run")
        .arg(&image)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("panic: division by zero"));
}

#[test]
fn test_panic_reports_call_trace() {
    let dir = TempDir::new().expect("tempdir failed");
    let image = build(
        &dir,
        "fn boom() { write(1/0); return 0; }
         fn main() { boom(); return 0; }",
    );

    lang()
        .arg("run")
        .arg(&image)
        .assert()
        .code(1)
        .stderr(
            predicate::str::contains("panic: division by zero")
                .and(predicate::str::contains("call function boom")),
        );
}

#[test]
fn test_exit_built_in_sets_exit_code() {
    let dir = TempDir::new().expect("tempdir failed");
    let image = build(&dir, "fn main() { exit(7); return 0; }");

    lang().arg("run").arg(&image).assert().code(7);
}

#[test]
fn test_redeclaration_is_a_compile_error() {
    let dir = TempDir::new().expect("tempdir failed");
    let source_path = dir.path().join("bad.lng");
    std::fs::write(
        &source_path,
        "fn main() { let x = 1; let x = 2; return 0; }",
    )
    .expect("writing source failed");

    lang()
        .arg("build")
        .arg(&source_path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error: redeclaration of x"));
}

#[test]
fn test_undefined_function_is_a_compile_error() {
    let dir = TempDir::new().expect("tempdir failed");
    let source_path = dir.path().join("bad.lng");
    std::fs::write(&source_path, "fn main() { foo(); return 0; }")
        .expect("writing source failed");

    lang()
        .arg("build")
        .arg(&source_path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error: foo is undefined"));
}

#[test]
fn test_missing_entry_point_is_a_compile_error() {
    let dir = TempDir::new().expect("tempdir failed");
    let source_path = dir.path().join("bad.lng");
    std::fs::write(&source_path, "fn helper() { return 1; }")
        .expect("writing source failed");

    lang()
        .arg("build")
        .arg(&source_path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error: no entry point"));
}

#[test]
fn test_compile_error_carries_position() {
    let dir = TempDir::new().expect("tempdir failed");
    let source_path = dir.path().join("bad.lng");
    std::fs::write(&source_path, "fn main() { let x = @; return 0; }")
        .expect("writing source failed");

    lang()
        .arg("build")
        .arg(&source_path)
        .assert()
        .code(1)
        .stderr(
            predicate::str::contains("bad.lng:1:21")
                .and(predicate::str::contains("illegal character")),
        );
}

#[test]
fn test_uninitialized_warning_does_not_fail_build() {
    let dir = TempDir::new().expect("tempdir failed");
    let source_path = dir.path().join("warn.lng");
    std::fs::write(&source_path, "fn main() { let x; write(x); return 0; }")
        .expect("writing source failed");

    lang()
        .arg("build")
        .arg(&source_path)
        .assert()
        .code(0)
        .stderr(predicate::str::contains("warning").and(predicate::str::contains("x")));
}

#[test]
fn test_asm_prints_disassembly() {
    let dir = TempDir::new().expect("tempdir failed");
    let source_path = dir.path().join("program.lng");
    std::fs::write(&source_path, "fn main() { write(\"hi\"); return 0; }")
        .expect("writing source failed");

    lang()
        .arg("asm")
        .arg(&source_path)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("DATA")
                .and(predicate::str::contains("CODE"))
                .and(predicate::str::contains("// string \"hi\""))
                .and(predicate::str::contains("cal"))
                .and(predicate::str::contains("ext")),
        );
}

#[test]
fn test_build_twice_produces_identical_images() {
    let dir = TempDir::new().expect("tempdir failed");
    let source = "fn fact(n) { if (n <= 1) return 1; return n * fact(n - 1); }
                  fn main() { write(fact(5)); return 0; }";

    let image = build(&dir, source);
    let first = std::fs::read(&image).expect("reading image failed");

    let image = build(&dir, source);
    let second = std::fs::read(&image).expect("reading image failed");

    assert_eq!(first, second);
}

#[test]
fn test_do_while_and_compound_assignment() {
    let dir = TempDir::new().expect("tempdir failed");
    let image = build(
        &dir,
        "fn main() {
             let total = 0;
             let i = 1;
             do {
                 total += i;
                 i += 1;
             } while (i <= 4);
             write(total);
             return 0;
         }",
    );

    lang().arg("run").arg(&image).assert().code(0).stdout("10\n");
}

#[test]
fn test_globals_and_nested_scopes() {
    let dir = TempDir::new().expect("tempdir failed");
    let image = build(
        &dir,
        "let base = 100;
         fn offset(n) { return base + n; }
         fn main() {
             let x = offset(1);
             { let y = offset(2); write(y); }
             write(x);
             return 0;
         }",
    );

    lang()
        .arg("run")
        .arg(&image)
        .assert()
        .code(0)
        .stdout("102\n101\n");
}
