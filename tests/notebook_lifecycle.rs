//! Lifecycle tests driving a notebook through repeated processing passes.
//!
//! These tests call [`runbook::run::process_file`] the way the CLI does to
//! verify end-to-end behavior: evaluation, strategy-gated re-evaluation,
//! cleaning, backup rotation, and byte-exact round trips of untouched text.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use runbook::core::document::Document;
use runbook::core::strategy::Strategy;
use runbook::io::store::backup_path;
use runbook::run::{Mode, Options, process_file};

const TIMEOUT: Duration = Duration::from_secs(10);

fn options(mode: Mode) -> Options {
    Options {
        mode,
        timeout: TIMEOUT,
    }
}

fn seed(dir: &Path, text: &str) -> PathBuf {
    let path = dir.join("notes.md");
    fs::write(&path, text).expect("seed notebook");
    path
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).expect("read")
}

/// Full lifecycle: author → evaluate → retry failures → clean → evaluate all.
///
/// Notebook structure:
/// ```text
/// prose
/// ├── block 1: echo greeting        (succeeds)
/// ├── block 2: cat of missing file  (fails, then the file appears)
/// └── prose tail
/// ```
///
/// Sequence:
/// 1. Default pass evaluates both fresh blocks; block 2 records a failure.
/// 2. `non-zero` pass retries only block 2, which now succeeds; block 1's
///    recorded output is untouched.
/// 3. Another `non-zero` pass selects nothing and leaves the file alone.
/// 4. `clean` strips both annotations, restoring the authored shape.
#[test]
fn full_lifecycle_evaluates_retries_and_cleans() {
    let temp = tempfile::tempdir().expect("tempdir");
    let data = temp.path().join("data.txt");
    let authored = format!(
        "# Demo\n\n```echo greeting\n```\n\n```cat {data}\n```\n\nDone.\n",
        data = data.display()
    );
    let path = seed(temp.path(), &authored);

    // Pass 1: both blocks are fresh, the cat fails (no data file yet).
    let report = process_file(&path, &options(Mode::Evaluate(Strategy::Empty)), |_, _| {})
        .expect("pass 1");
    assert!(report.rewritten);
    assert_eq!(report.eval.selected, 2);
    assert_eq!(report.eval.failures, 1);

    let after_first = read(&path);
    assert!(after_first.contains("    greeting\n"));
    assert!(after_first.contains("::: {.output exit_code=\"0\"}"));
    assert!(after_first.contains("::: {.output exit_code=\"1\"}"));
    assert_eq!(read(&backup_path(&path)), authored);

    // Pass 2: the data file exists now, so retrying failures fixes block 2.
    fs::write(&data, "recovered\n").expect("write data");
    let report = process_file(
        &path,
        &options(Mode::Evaluate(Strategy::NonZero)),
        |_, _| {},
    )
    .expect("pass 2");
    assert!(report.rewritten);
    assert_eq!(report.eval.selected, 1);
    assert_eq!(report.eval.failures, 0);

    let after_second = read(&path);
    assert!(after_second.contains("    greeting\n"));
    assert!(after_second.contains("    recovered\n"));
    assert!(!after_second.contains("exit_code=\"1\""));
    // The backup rotated to the previous generation.
    assert_eq!(read(&backup_path(&path)), after_first);

    // Pass 3: nothing failing, nothing fresh. The file must not be touched.
    let report = process_file(
        &path,
        &options(Mode::Evaluate(Strategy::NonZero)),
        |_, _| {},
    )
    .expect("pass 3");
    assert!(!report.rewritten);
    assert_eq!(read(&path), after_second);
    assert_eq!(read(&backup_path(&path)), after_first);

    // Pass 4: clean restores the authored shape.
    let report = process_file(&path, &options(Mode::Clean), |_, _| {}).expect("pass 4");
    assert!(report.rewritten);
    assert_eq!(read(&path), authored);
}

/// Evaluating must only ever touch the annotations: prose, fences, spacing
/// and a missing final newline all survive a pass byte for byte.
#[test]
fn evaluation_preserves_every_byte_outside_annotations() {
    let temp = tempfile::tempdir().expect("tempdir");
    // Built from escaped lines so the trailing spaces on the third line
    // survive editors and formatters that trim line ends.
    let authored = concat!(
        "# Title\n",
        "\n",
        "Some prose with trailing spaces  \n",
        "\n",
        "````echo fenced\n",
        "body that looks like prose\n",
        "````\n",
        "\n",
        " indented prose\n",
        "very last line without newline",
    );
    let path = seed(temp.path(), authored);

    process_file(&path, &options(Mode::Evaluate(Strategy::All)), |_, _| {}).expect("evaluate");

    let rewritten = read(&path);
    let annotation = "::: {.output exit_code=\"0\"}\n    fenced\n:::\n";
    let expected = authored.replace(
        "````echo fenced\nbody that looks like prose\n````\n",
        &format!("````echo fenced\nbody that looks like prose\n````\n{annotation}"),
    );
    assert_eq!(rewritten, expected);

    // And a parse of the rewritten file still round-trips exactly.
    let doc = Document::parse(&rewritten).expect("reparse");
    assert_eq!(doc.to_string(), rewritten);
}

/// A fresh evaluation of an already-annotated notebook parses the recorded
/// output it finds and replaces it wholesale, never nesting annotations.
#[test]
fn reevaluation_never_stacks_annotations() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = seed(temp.path(), "```printf 'x\\ny\\n'\n```\n");

    for _ in 0..3 {
        process_file(&path, &options(Mode::Evaluate(Strategy::All)), |_, _| {})
            .expect("evaluate");
    }

    let rewritten = read(&path);
    assert_eq!(
        rewritten,
        "```printf 'x\\ny\\n'\n```\n::: {.output exit_code=\"0\"}\n    x\n    y\n:::\n"
    );
    assert_eq!(rewritten.matches(":::").count(), 2);
}
