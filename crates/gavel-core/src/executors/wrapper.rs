//! Program wrapping for sandboxed execution.
//!
//! The candidate's source is treated as opaque text: a language driver is
//! appended after it. The driver reads a JSON argument array from stdin, calls
//! `solution`, prints the JSON result and then a `TIME_MS=<n>` sentinel line.
//! A missing entry point or a thrown exception is reported on stderr with exit
//! status 1.

use crate::language::Language;

const PYTHON_DRIVER: &str = include_str!("drivers/python_driver.py");
const NODE_DRIVER: &str = include_str!("drivers/node_driver.js");
// Declares `public class Main` plus a small JSON codec; the candidate's
// `Solution` class sits before it in the same compilation unit.
const JAVA_HARNESS: &str = include_str!("drivers/JavaHarness.java");

pub fn driver_for(language: Language) -> &'static str {
    match language {
        Language::Python => PYTHON_DRIVER,
        Language::JavaScript => NODE_DRIVER,
        Language::Java => JAVA_HARNESS,
    }
}

/// Produce the full program text to write into the sandbox workspace.
pub fn generate(language: Language, source_code: &str) -> String {
    let driver = driver_for(language);
    let mut program = String::with_capacity(source_code.len() + driver.len() + 2);
    program.push_str(source_code);
    if !source_code.ends_with('\n') {
        program.push('\n');
    }
    program.push_str(driver);
    program
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::process::{Command, Stdio};
    use tempfile::tempdir;

    const ADD_PY: &str = "def solution(a, b):\n    return a + b";

    fn interpreter_available(bin: &str) -> bool {
        Command::new(bin)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn run_local(bin: &str, file: &std::path::Path, stdin: &str) -> std::process::Output {
        let mut child = Command::new(bin)
            .arg(file)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        child.stdin.take().unwrap().write_all(stdin.as_bytes()).unwrap();
        child.wait_with_output().unwrap()
    }

    #[test]
    fn test_candidate_code_precedes_driver() {
        let program = generate(Language::Python, ADD_PY);
        let code_at = program.find("def solution").unwrap();
        let driver_at = program.find("TIME_MS=").unwrap();
        assert!(code_at < driver_at);
        assert!(program.starts_with(ADD_PY));
    }

    #[test]
    fn test_source_is_not_modified() {
        let weird = "  # -*- odd -*-\n\tdef solution(): return '\"TIME_MS=5\"'\n";
        let program = generate(Language::Python, weird);
        assert!(program.starts_with(weird));
    }

    #[test]
    fn test_every_driver_emits_sentinel_and_looks_up_solution() {
        for lang in Language::ALL {
            let program = generate(lang, "");
            assert!(program.contains("TIME_MS="), "{} driver lacks sentinel", lang);
            assert!(program.contains("solution"), "{} driver lacks entry lookup", lang);
        }
    }

    #[test]
    fn test_java_harness_declares_main_class() {
        let program = generate(Language::Java, "class Solution { int solution(int a) { return a; } }");
        assert!(program.contains("public class Main"));
        assert!(program.contains("Class.forName(\"Solution\")"));
    }

    #[test]
    fn test_python_driver_protocol_when_interpreter_present() {
        if !interpreter_available("python3") {
            return;
        }
        let dir = tempdir().unwrap();
        let file = dir.path().join("main.py");
        std::fs::write(&file, generate(Language::Python, ADD_PY)).unwrap();

        let out = run_local("python3", &file, "[2,3]");
        assert!(out.status.success());
        let stdout = String::from_utf8_lossy(&out.stdout);
        let lines: Vec<&str> = stdout.lines().collect();
        assert_eq!(lines[0], "5");
        assert!(lines[1].starts_with("TIME_MS="));
    }

    #[test]
    fn test_python_driver_missing_entry_point_exits_cleanly() {
        if !interpreter_available("python3") {
            return;
        }
        let dir = tempdir().unwrap();
        let file = dir.path().join("main.py");
        std::fs::write(&file, generate(Language::Python, "def helper():\n    pass")).unwrap();

        let out = run_local("python3", &file, "");
        assert_eq!(out.status.code(), Some(1));
        assert!(out.stdout.is_empty());
        let stderr = String::from_utf8_lossy(&out.stderr);
        assert!(stderr.contains("Entry point 'solution' was not found"));
        assert!(!stderr.contains("Traceback"));
    }

    #[test]
    fn test_node_driver_protocol_when_interpreter_present() {
        if !interpreter_available("node") {
            return;
        }
        let dir = tempdir().unwrap();
        let file = dir.path().join("main.js");
        std::fs::write(
            &file,
            generate(Language::JavaScript, "function solution(a, b) { return a + b }"),
        )
        .unwrap();

        let out = run_local("node", &file, "[2,3]");
        assert!(out.status.success());
        let stdout = String::from_utf8_lossy(&out.stdout);
        assert_eq!(stdout.lines().next(), Some("5"));
        assert!(stdout.lines().any(|l| l.starts_with("TIME_MS=")));
    }

    fn java_available() -> bool {
        interpreter_available("javac") && interpreter_available("java")
    }

    /// Compile the wrapped program and run it under an ASCII locale.
    fn run_java(code: &str, stdin: &str) -> std::process::Output {
        let dir = tempdir().unwrap();
        let source = dir.path().join("Main.java");
        std::fs::write(&source, generate(Language::Java, code)).unwrap();

        let compiled = Command::new("javac")
            .args(["-encoding", "UTF-8", "-d"])
            .arg(dir.path())
            .arg(&source)
            .status()
            .unwrap();
        assert!(compiled.success(), "javac rejected:\n{}", code);

        let mut child = Command::new("java")
            .env("LC_ALL", "C")
            .env("LANG", "C")
            .args(["-Dstdout.encoding=US-ASCII", "-Dsun.stdout.encoding=US-ASCII", "-cp"])
            .arg(dir.path())
            .arg("Main")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        child.stdin.take().unwrap().write_all(stdin.as_bytes()).unwrap();
        child.wait_with_output().unwrap()
    }

    #[test]
    fn test_java_harness_protocol_when_jdk_present() {
        if !java_available() {
            return;
        }
        let cases = [
            (
                "class Solution { int solution(int a, int b) { return a + b; } }",
                "[2,3]",
                "5",
            ),
            (
                "class Solution { int[] solution(int[] xs) { java.util.Arrays.sort(xs); return xs; } }",
                "[[3,1,2]]",
                "[1, 2, 3]",
            ),
            (
                "import java.util.*;\nclass Solution {\n    List<Integer> solution(List<Integer> xs) {\n        Collections.reverse(xs);\n        return xs;\n    }\n}",
                "[[1,2,3]]",
                "[3, 2, 1]",
            ),
            (
                "class Solution { static String solution(String s) { return new StringBuilder(s).reverse().toString(); } }",
                "[\"abc\"]",
                "\"cba\"",
            ),
            (
                "import java.util.*;\nclass Solution {\n    Map<String, Integer> solution(String s) {\n        Map<String, Integer> counts = new TreeMap<>();\n        for (char c : s.toCharArray()) {\n            counts.merge(String.valueOf(c), 1, Integer::sum);\n        }\n        return counts;\n    }\n}",
                "[\"aab\"]",
                "{\"a\": 2, \"b\": 1}",
            ),
        ];

        for (code, stdin, expected) in cases {
            let out = run_java(code, stdin);
            let stderr = String::from_utf8_lossy(&out.stderr);
            assert!(out.status.success(), "{} failed: {}", code, stderr);
            let stdout = String::from_utf8(out.stdout).unwrap();
            let lines: Vec<&str> = stdout.lines().collect();
            assert_eq!(lines[0], expected, "{}", code);
            assert!(lines[1].starts_with("TIME_MS="));
        }
    }

    #[test]
    fn test_java_harness_writes_utf8_under_ascii_locale() {
        if !java_available() {
            return;
        }
        let out = run_java(
            "class Solution { String solution(String s) { return s; } }",
            "[\"\u{e9}t\u{e9}\"]",
        );
        assert!(out.status.success());
        let stdout = String::from_utf8(out.stdout).unwrap();
        assert_eq!(stdout.lines().next(), Some("\"\u{e9}t\u{e9}\""));
    }

    #[test]
    fn test_java_harness_missing_solution_class() {
        if !java_available() {
            return;
        }
        let out = run_java("class Helper {}", "[1]");
        assert_eq!(out.status.code(), Some(1));
        assert!(out.stdout.is_empty());
        let stderr = String::from_utf8_lossy(&out.stderr);
        assert!(stderr.contains("Entry point class 'Solution' was not found"));
    }
}
