use executor_core::capture::{capture, capture_in, SPAWN_FAILURE};
use executor_core::Command;

#[tokio::test]
async fn echo_captures_output() {
    let result = capture(&Command::new(["echo", "hi"])).await;
    assert_eq!(result.output(), ["hi"]);
    assert!(result.error().is_empty());
    assert_eq!(result.returncode(), 0);
    assert!(result.pid().is_some());
    assert!(result.success());
}

#[tokio::test]
async fn stderr_and_return_code() {
    let result = capture(&Command::new(["sh", "-c", "echo out; echo oops >&2; exit 3"])).await;
    assert_eq!(result.output(), ["out"]);
    assert_eq!(result.error(), ["oops"]);
    assert_eq!(result.returncode(), 3);
    assert!(!result.success());
}

#[tokio::test]
async fn multiline_output_is_split() {
    let result = capture(&Command::new(["printf", "a\\nb\\nc\\n"])).await;
    assert_eq!(result.output(), ["a", "b", "c"]);
}

#[tokio::test]
async fn missing_executable_is_reported_not_raised() {
    let result = capture(&Command::new(["definitely-not-a-real-binary-qme"])).await;
    assert_eq!(result.returncode(), SPAWN_FAILURE);
    assert_ne!(result.returncode(), 0);
    assert_eq!(result.pid(), None);
    assert!(result.output().is_empty());
    assert!(result.error()[0].contains("definitely-not-a-real-binary-qme"));
}

#[tokio::test]
async fn runs_in_given_directory() {
    let dir = tempfile::tempdir().unwrap();
    let result = capture_in(&Command::new(["pwd"]), Some(dir.path())).await;
    let expected = dir.path().canonicalize().unwrap();
    let reported = std::path::PathBuf::from(&result.output()[0])
        .canonicalize()
        .unwrap();
    assert_eq!(reported, expected);
}
