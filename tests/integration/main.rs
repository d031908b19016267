//! Integration tests for Agentpack

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const TENANT_BUNDLE: &str = r#"{
        "kind": "declarative",
        "name": "acme-support",
        "version": "2.0.0",
        "agents": [
            {"id": "frontdesk", "name": "Front Desk", "type": "chat", "tools": ["lookup_order"]}
        ],
        "tools": [
            {"name": "lookup_order", "description": "Find an order by number"}
        ]
    }"#;

    /// Isolated config, registry and cache directory
    struct Workspace {
        temp: TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let bundle = temp.path().join("acme-support.json");
            std::fs::write(&bundle, TENANT_BUNDLE).unwrap();

            std::fs::write(
                temp.path().join("packages.toml"),
                format!(
                    "[packages.acme-support]\nbundle_path = \"file://{}\"\n\n\
                     [packages.broken]\nbundle_path = \"file://{}\"\n",
                    bundle.display(),
                    temp.path().join("missing.json").display()
                ),
            )
            .unwrap();

            std::fs::write(
                temp.path().join("config.toml"),
                format!(
                    "[disk]\ndir = \"{}\"\n\n[registry]\npath = \"{}\"\n",
                    temp.path().join("packages").display(),
                    temp.path().join("packages.toml").display()
                ),
            )
            .unwrap();

            Self { temp }
        }

        fn config_path(&self) -> PathBuf {
            self.temp.path().join("config.toml")
        }

        fn cache_dir(&self) -> PathBuf {
            self.temp.path().join("packages")
        }

        fn cmd(&self) -> Command {
            let mut cmd = agentpack();
            cmd.arg("--config").arg(self.config_path());
            cmd
        }
    }

    fn agentpack() -> Command {
        let mut cmd = cargo_bin_cmd!("agentpack");
        cmd.env_remove("AGENTPACK_CONFIG").env_remove("RUST_LOG");
        cmd
    }

    fn stdout_json(cmd: &mut Command) -> serde_json::Value {
        let output = cmd.output().unwrap();
        assert!(output.status.success(), "command failed: {:?}", output);
        serde_json::from_slice(&output.stdout).unwrap()
    }

    #[test]
    fn help_displays() {
        agentpack()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Tiered chatbot package loader"));
    }

    #[test]
    fn version_displays() {
        agentpack()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("agentpack"));
    }

    #[test]
    fn config_path_honors_flag() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[disk]").and(predicate::str::contains("ttl_secs")));
    }

    #[test]
    fn config_init_writes_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        agentpack()
            .arg("--config")
            .arg(&path)
            .args(["config", "init"])
            .assert()
            .success();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("[memory]"));
    }

    #[test]
    fn invalid_config_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[memory]\nttl_secs = 0\n").unwrap();

        agentpack()
            .arg("--config")
            .arg(&path)
            .arg("builtins")
            .assert()
            .failure()
            .stderr(predicate::str::contains("ttl_secs"));
    }

    #[test]
    fn builtins_listed() {
        agentpack()
            .args(["builtins", "--format", "plain"])
            .assert()
            .success()
            .stdout(
                predicate::str::contains("support-assistant")
                    .and(predicate::str::contains("voice-receptionist")),
            );
    }

    #[test]
    fn resolve_builtin_skips_loader() {
        let ws = Workspace::new();
        let json = stdout_json(ws.cmd().args(["resolve", "support-assistant", "--json", "--stats"]));

        assert_eq!(json["source"], "builtin");
        assert_eq!(json["stats"]["memoryCacheMisses"], 0);
        assert!(!ws.cache_dir().join("support-assistant.json").exists());
    }

    #[test]
    fn resolve_remote_then_disk() {
        let ws = Workspace::new();

        let first = stdout_json(ws.cmd().args(["resolve", "acme-support", "--json", "--stats"]));
        assert_eq!(first["source"], "loader");
        assert_eq!(first["metadata"]["name"], "acme-support");
        assert_eq!(first["stats"]["remoteLoads"], 1);
        assert!(ws.cache_dir().join("acme-support.json").exists());
        assert!(ws.cache_dir().join("manifest.json").exists());

        let second = stdout_json(ws.cmd().args(["resolve", "acme-support", "--json", "--stats"]));
        assert_eq!(second["stats"]["diskCacheHits"], 1);
        assert_eq!(second["stats"]["remoteLoads"], 0);
    }

    #[test]
    fn resolve_unknown_fails() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["resolve", "nobody"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Package not found"));
    }

    #[test]
    fn resolve_unreachable_bundle_fails() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["resolve", "broken"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Package not found"));
        assert!(!ws.cache_dir().join("broken.json").exists());
    }

    #[test]
    fn cache_list_and_invalidate() {
        let ws = Workspace::new();
        ws.cmd().args(["resolve", "acme-support"]).assert().success();

        ws.cmd()
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("acme-support"));

        ws.cmd().args(["invalidate", "acme-support"]).assert().success();

        ws.cmd()
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("acme-support").not());
        assert!(!ws.cache_dir().join("acme-support.json").exists());
    }

    #[test]
    fn cache_list_json_has_manifest_fields() {
        let ws = Workspace::new();
        ws.cmd().args(["resolve", "acme-support"]).assert().success();

        let entries = stdout_json(ws.cmd().args(["cache", "list", "--format", "json"]));
        let entry = &entries[0];
        assert_eq!(entry["packageId"], "acme-support");
        assert_eq!(entry["checksum"].as_str().unwrap().len(), 64);
        assert!(entry["cachedAt"].is_i64());
    }

    #[test]
    fn cache_info_and_cleanup() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["cache", "info"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Disk cache"));

        ws.cmd()
            .args(["cache", "cleanup"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing to clean up"));
    }

    #[test]
    fn cache_maintenance_fails_when_disk_unusable() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let config = temp.path().join("config.toml");
        std::fs::write(
            &config,
            format!("[disk]\ndir = \"{}\"\n", blocker.join("packages").display()),
        )
        .unwrap();

        for action in [&["cache", "cleanup"][..], &["cache", "clear", "--yes"][..]] {
            agentpack()
                .arg("--config")
                .arg(&config)
                .args(action)
                .assert()
                .failure()
                .stderr(predicate::str::contains("Disk cache disabled"));
        }

        agentpack()
            .arg("--config")
            .arg(&config)
            .args(["cache", "info"])
            .assert()
            .success()
            .stdout(predicate::str::contains("no (directory unusable or disabled)"));
    }

    #[test]
    fn cache_clear_with_yes() {
        let ws = Workspace::new();
        ws.cmd().args(["resolve", "acme-support"]).assert().success();

        ws.cmd()
            .args(["cache", "clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Cleared 1 package(s)"));
        assert!(!ws.cache_dir().join("acme-support.json").exists());
    }

    #[test]
    fn preload_reports_failures() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["preload", "acme-support", "broken"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("1 of 2 package(s) failed"));
        assert!(ws.cache_dir().join("acme-support.json").exists());
    }

    #[test]
    fn preload_plain_output_lists_each_package_once() {
        let ws = Workspace::new();
        let output = ws
            .cmd()
            .args(["preload", "acme-support", "broken"])
            .output()
            .unwrap();
        let stdout = String::from_utf8_lossy(&output.stdout);

        assert_eq!(stdout.matches("acme-support").count(), 1, "stdout: {}", stdout);
        assert_eq!(stdout.matches("broken").count(), 1, "stdout: {}", stdout);
        assert!(stdout.contains("[OK] acme-support"));
        assert!(stdout.contains("[FAIL] broken"));
    }

    #[test]
    fn invalidate_rejects_traversal() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["invalidate", "../etc"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid package id"));
    }
}
