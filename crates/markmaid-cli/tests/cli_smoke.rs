use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};

fn repo_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("expected crates/<name> layout")
        .to_path_buf()
}

fn fixture(parts: &[&str]) -> PathBuf {
    let path = parts
        .iter()
        .fold(repo_root().join("fixtures"), |p, part| p.join(part));
    assert!(path.exists(), "fixture missing: {}", path.display());
    path
}

fn cli() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo_bin!("markmaid-cli"));
    cmd.current_dir(repo_root());
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).expect("utf-8 output")
}

#[test]
fn cli_renders_markdown_file() {
    let input = fixture(&["markdown", "basic.md"]);
    let html = stdout_of(cli().arg(&input));

    assert!(html.contains("<h1>Quarterly report</h1>"), "{html}");
    assert!(html.contains("<table>"), "{html}");
    assert!(
        html.contains("<a data-href=\"https://example.com/dashboard\">dashboard</a>"),
        "{html}"
    );
    assert!(html.contains("<pre class=\"mermaid\" id=\"mermaid-0\""), "{html}");
    assert!(html.contains("A[\"`Collect\ndata`\"]"), "{html}");
    assert!(!html.contains("alert"), "{html}");
}

#[test]
fn cli_highlights_search_matches() {
    let input = fixture(&["markdown", "basic.md"]);
    let html = stdout_of(cli().args(["--search", "growth", "--select", "2"]).arg(&input));

    assert!(
        html.contains("<mark class=\"search-highlight\" data-match=\"1\">Growth</mark>"),
        "{html}"
    );
    assert!(
        html.contains("<mark class=\"search-highlight current\" data-match=\"2\">Growth</mark>"),
        "{html}"
    );
}

#[test]
fn cli_reads_stdin_and_writes_out_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = tmp.path().join("out.html");

    cli()
        .args(["--out", out.to_string_lossy().as_ref(), "-"])
        .write_stdin("hello *world*")
        .assert()
        .success();

    let html = fs::read_to_string(&out).expect("read output");
    assert_eq!(html, "<p>hello <em>world</em></p>\n");
}

#[test]
fn cli_reads_data_view_with_settings() {
    let input = fixture(&["data_view", "column.json"]);
    let settings = fixture(&["settings", "strict.json"]);
    let html = stdout_of(
        cli()
            .args(["--data-view", "--settings"])
            .arg(&settings)
            .arg(&input),
    );

    assert!(html.contains("<h2>Notes</h2>"), "{html}");
    assert!(html.contains("<p>42</p>"), "{html}");
    assert!(html.contains("<pre class=\"mermaid\" id=\"mermaid-0\""), "{html}");
}

#[test]
fn cli_viewer_mode_shows_empty_message() {
    let html = stdout_of(cli().args(["--viewer", "-"]).write_stdin("   \n"));
    assert!(html.contains("<h4>No Markdown Content</h4>"), "{html}");
}

#[test]
fn cli_viewer_mode_wraps_document() {
    let html = stdout_of(
        cli()
            .args(["--viewer", "--viewport-width", "320", "--search", "cat", "-"])
            .write_stdin("cat and cat"),
    );
    assert!(html.contains("width: 320px; height: 600px"), "{html}");
    assert!(html.contains("<span class=\"search-status\">1/2</span>"), "{html}");
}

#[test]
fn cli_lists_normalized_diagrams() {
    let input = fixture(&["markdown", "basic.md"]);
    let out = stdout_of(cli().arg("diagrams").arg(&input));
    let json: serde_json::Value = serde_json::from_str(&out).expect("json output");

    let diagrams = json.as_array().expect("array");
    assert_eq!(diagrams.len(), 1);
    assert_eq!(diagrams[0]["id"], "mermaid-0");
    assert!(
        diagrams[0]["raw"]
            .as_str()
            .is_some_and(|raw| raw.contains("Collect<br>data"))
    );
    assert!(
        diagrams[0]["source"]
            .as_str()
            .is_some_and(|src| src.contains("A[\"`Collect\ndata`\"]"))
    );
}

#[test]
fn cli_sanitizes_html() {
    let html = stdout_of(
        cli()
            .arg("sanitize")
            .write_stdin("<p onclick=\"x()\">ok</p><iframe src=\"https://x.test\"></iframe>"),
    );
    assert_eq!(html, "<p>ok</p>");
}

#[test]
fn cli_rejects_bad_settings() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let settings = tmp.path().join("bad.json");
    fs::write(&settings, r#"{ "mermaid": { "securityLevel": "yolo" } }"#).expect("write settings");

    cli()
        .args(["--settings", settings.to_string_lossy().as_ref(), "-"])
        .write_stdin("x")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn cli_usage_exit_code() {
    cli().arg("--nope").assert().failure().code(2);
}
