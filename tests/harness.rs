use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

const CONVH: &str = env!("CARGO_BIN_EXE_convh");

// Stand-in for gcc: logs argv and copies the "source" script to the -o path.
const FAKE_CC: &str = r#"#!/bin/sh
echo "$@" >> cc.log
src=""
out=""
while [ $# -gt 0 ]; do
    case "$1" in
        -o) out="$2"; shift ;;
        -*) ;;
        *) src="$1" ;;
    esac
    shift
done
[ -f "$src" ] || { echo "cc: $src: No such file or directory" >&2; exit 1; }
cp "$src" "$out" && chmod +x "$out"
"#;

fn write_exec(path: &Path, body: &str) {
    fs::write(path, body).expect("write fixture");
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod fixture");
}

fn driver(dir: &Path, args: &[&str]) -> Output {
    Command::new(CONVH)
        .arg("-C")
        .arg(dir)
        .args(args)
        .stdin(Stdio::null())
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|_| panic!("{CONVH} not found"))
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).expect("utf-8 stdout")
}

fn ok_missing_boom() -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    write_exec(&dir.path().join("a"), "#!/bin/sh\necho ok\n");
    write_exec(&dir.path().join("c"), "#!/bin/sh\necho boom\nexit 1\n");
    dir
}

const ABC: [&str; 6] = ["-t", "a.c=./a", "-t", "b.c=./b", "-t", "c.c=./c"];

#[test]
fn reports_each_target_in_order_and_exits_zero() {
    let dir = ok_missing_boom();
    let mut args = vec!["--skip-build"];
    args.extend(ABC);
    let output = driver(dir.path(), &args);

    assert!(output.status.success());
    let out = stdout_of(&output);
    let lines: Vec<&str> = out.lines().filter(|l| !l.is_empty()).collect();
    assert_eq!(lines.len(), 4, "{out}");
    assert_eq!(lines[0], "Running tests...");
    assert_eq!(lines[1], "./a : ok");
    assert!(lines[2].starts_with("./b : failed to spawn ./b:"), "{}", lines[2]);
    assert!(lines[2].contains("No such file or directory"));
    assert_eq!(lines[3], "./c : boom");
}

#[test]
fn builds_then_runs_with_fixed_arguments() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_exec(&dir.path().join("fakecc"), FAKE_CC);
    fs::write(dir.path().join("a.c"), "#!/bin/sh\necho \"a $*\"\n").expect("write source");
    fs::write(dir.path().join("c.c"), "#!/bin/sh\necho \"c $#\" >&2\nexit 2\n").expect("write source");

    let mut args = vec!["--compiler", "./fakecc"];
    args.extend(ABC);
    let output = driver(dir.path(), &args);

    assert!(output.status.success());
    similar_asserts::assert_eq!(
        stdout_of(&output),
        format!(
            "Finished compiling.\n\
             Running tests...\n\
             ./a : a 16 16 1 32 32 20\n\n\
             ./b : failed to spawn ./b: {}\n\
             ./c : c 6\n\n",
            std::io::Error::from_raw_os_error(2)
        )
    );

    let log = fs::read_to_string(dir.path().join("cc.log")).expect("compiler log");
    similar_asserts::assert_eq!(
        log,
        "-O3 -fopenmp -msse4 a.c -o ./a\n\
         -O3 -fopenmp -msse4 b.c -o ./b\n\
         -O3 -fopenmp -msse4 c.c -o ./c\n"
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cc: b.c: No such file or directory"), "{stderr}");
}

#[test]
fn compiler_inherits_stdin_but_kernels_do_not() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_exec(
        &dir.path().join("readcc"),
        "#!/bin/sh\nread line && echo \"$line\" >> stdin.log\nexit 0\n",
    );
    write_exec(
        &dir.path().join("a"),
        "#!/bin/sh\nif read line; then echo \"got $line\"; else echo none; fi\n",
    );

    let mut child = Command::new(CONVH)
        .arg("-C")
        .arg(dir.path())
        .args(["--compiler", "./readcc", "-t", "a.c=./a"])
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap_or_else(|_| panic!("{CONVH} not found"));
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"hello\nworld\n")
        .expect("write stdin");
    let output = child.wait_with_output().expect("wait");

    assert!(output.status.success());
    let log = fs::read_to_string(dir.path().join("stdin.log")).expect("compiler read stdin");
    assert_eq!(log, "hello\n");
    similar_asserts::assert_eq!(
        stdout_of(&output),
        "Finished compiling.\nRunning tests...\n./a : none\n\n"
    );
}

#[test]
fn strict_build_attributes_failures_to_the_compiler() {
    let dir = ok_missing_boom();
    let mut args = vec!["--strict-build", "--compiler", "no-such-compiler"];
    args.extend(ABC);
    let output = driver(dir.path(), &args);

    assert!(output.status.success());
    let out = stdout_of(&output);
    let lines: Vec<&str> = out.lines().collect();
    similar_asserts::assert_eq!(
        lines,
        vec![
            "Finished compiling.",
            "Running tests...",
            "./a : build failed: compiler `no-such-compiler` not found",
            "./b : build failed: compiler `no-such-compiler` not found",
            "./c : build failed: compiler `no-such-compiler` not found",
        ]
    );
}

#[test]
fn default_targets_without_sources_still_exit_zero() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = driver(dir.path(), &["--compiler", "no-such-compiler"]);

    assert!(output.status.success());
    let out = stdout_of(&output);
    let labels: Vec<&str> = out
        .lines()
        .filter_map(|l| l.split_once(" : ").map(|(label, _)| label))
        .collect();
    assert_eq!(
        labels,
        ["./conv-harness_David", "./conv-harness_SSE", "./conv-harness_OpenMP_Without_If"]
    );
}

#[test]
fn malformed_target_is_a_usage_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = driver(dir.path(), &["-t", "only-a-source.c"]);

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}
