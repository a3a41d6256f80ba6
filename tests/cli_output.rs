use std::path::PathBuf;
use std::process::Command;

use serde_json::Value;

struct Workspace {
    root: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let root = std::env::temp_dir().join(format!("docrank-cli-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(root.join("docs")).expect("create docs dir");
        Self { root }
    }

    fn write(&self, name: &str, body: &str) {
        std::fs::write(self.root.join("docs").join(name), body).expect("write document");
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

#[test]
fn rank_prints_only_json_on_stdout_with_logging_enabled() {
    let workspace = Workspace::new();
    workspace.write(
        "a-report.txt",
        "The annual report shows revenue growth. Profit exceeded the forecast.",
    );
    workspace.write("b-menu.txt", "Lunch menu for the team offsite.");

    let output = Command::new(env!("CARGO_BIN_EXE_docrank-cli"))
        .current_dir(&workspace.root)
        .env("RUST_LOG", "info")
        .env("DOCRANK_LOG_FILE", workspace.root.join("docrank.log"))
        .env("AUDIT_LOG_ENABLED", "true")
        .env_remove("AUDIT_LOG_FILE")
        .args(["rank", "--target", "annual revenue report"])
        .arg(workspace.root.join("docs"))
        .output()
        .expect("run docrank-cli");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "cli failed: {stderr}");

    let json: Value = serde_json::from_slice(&output.stdout).expect("stdout is a JSON document");
    assert_eq!(json["total_files"], 2);
    assert_eq!(json["successful_files"], 2);
    let items = json["items"].as_array().expect("items array");
    assert_eq!(items.len(), 2);
    assert!(
        items[0]["filename"]
            .as_str()
            .is_some_and(|name| name.ends_with("a-report.txt"))
    );

    assert!(stderr.contains("Batch processed"), "stderr: {stderr}");
}
