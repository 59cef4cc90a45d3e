//! Integration tests for preview-cache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn preview_cache() -> Command {
        cargo_bin_cmd!("preview-cache")
    }

    /// Config that keeps everything in memory and off the real state dir
    fn write_config(dir: &Path) -> PathBuf {
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            "[general]\njournal = false\n\n[cache]\nstore = \"memory\"\nproject_root = \"/project\"\n",
        )
        .unwrap();
        path
    }

    fn write_site(dir: &Path) -> PathBuf {
        let site = dir.join("site");
        std::fs::create_dir_all(site.join("css")).unwrap();
        std::fs::write(site.join("index.html"), "<h1>hi</h1>").unwrap();
        std::fs::write(site.join("css").join("main.css"), "h1{}").unwrap();
        site
    }

    #[test]
    fn help_displays() {
        preview_cache()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("path-to-URL cache"));
    }

    #[test]
    fn version_displays() {
        preview_cache()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("preview-cache"));
    }

    #[test]
    fn config_path() {
        preview_cache()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_uses_file() {
        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path());

        preview_cache()
            .arg("--config")
            .arg(&config)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"))
            .stdout(predicate::str::contains("store = \"memory\""));
    }

    #[test]
    fn config_init_respects_existing_file() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("nested").join("config.toml");

        preview_cache()
            .arg("--config")
            .arg(&config)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration initialized"));
        assert!(config.exists());

        preview_cache()
            .arg("--config")
            .arg(&config)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--force"));
    }

    #[test]
    fn invalid_config_is_reported() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config.toml");
        std::fs::write(&config, "[cache]\nmode = \"sideways\"\n").unwrap();

        preview_cache()
            .arg("--config")
            .arg(&config)
            .arg("status")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn status_reports_selection() {
        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path());

        preview_cache()
            .arg("--config")
            .arg(&config)
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("persistent store"))
            .stdout(predicate::str::contains(
                "http://localhost:8000/dist/vfs/project/",
            ));
    }

    #[test]
    fn scan_ephemeral_plain() {
        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path());
        let site = write_site(temp.path());

        preview_cache()
            .arg("--config")
            .arg(&config)
            .arg("scan")
            .arg(&site)
            .args(["--mode", "ephemeral", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("/project/index.html\tblob:http://localhost:8000/"))
            .stdout(predicate::str::contains("/project/css/main.css\t"));
    }

    #[test]
    fn scan_persistent_json() {
        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path());
        let site = write_site(temp.path());

        let output = preview_cache()
            .arg("--config")
            .arg(&config)
            .arg("scan")
            .arg(&site)
            .args(["--root", "/7/projects/30", "--mode", "persistent", "--format", "json"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(json["provider"], "persistent");
        assert_eq!(
            json["base_address"],
            "http://localhost:8000/dist/vfs/7/projects/30/"
        );
        let imported = json["imported"].as_array().unwrap();
        assert_eq!(imported.len(), 2);
        assert_eq!(
            imported[1]["address"],
            "http://localhost:8000/dist/vfs/7/projects/30/index.html"
        );
    }

    #[test]
    fn scan_missing_dir_fails() {
        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path());

        preview_cache()
            .arg("--config")
            .arg(&config)
            .arg("scan")
            .arg(temp.path().join("nope"))
            .args(["--mode", "ephemeral"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unsupported import source"));
    }
}
