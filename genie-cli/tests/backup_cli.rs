use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;

use assert_cmd::prelude::*;
use git2::{Repository, RepositoryInitOptions, Signature};
use predicates::prelude::*;
use predicates::str::contains;
use serde_json::json;
use tempfile::TempDir;

/// Run the binary with no ambient workspace credentials.
fn genie_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("genie-backup"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("DATABRICKS_HOST")
        .env_remove("DATABRICKS_TOKEN")
        .env_remove("DATABRICKS_CONFIG_PROFILE")
        .env_remove("DATABRICKS_CONFIG_FILE")
        .current_dir(home);
    cmd
}

/// Answer one request per canned body with `200 OK`, in order.
fn serve(bodies: Vec<String>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    thread::spawn(move || {
        for body in bodies {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone"));
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("header");
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().expect("length");
                    }
                }
            }
            let mut discard = vec![0u8; content_length];
            reader.read_exact(&mut discard).expect("body");
            let mut stream = stream;
            let reply = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(reply.as_bytes()).expect("write");
        }
    });
    format!("http://{addr}")
}

/// Bare remote on `main` holding a single README commit.
fn seeded_remote(dir: &Path) -> PathBuf {
    let path = dir.join("remote.git");
    let mut opts = RepositoryInitOptions::new();
    opts.bare(true).initial_head("main");
    let bare = Repository::init_opts(&path, &opts).expect("init bare");

    let blob = bare.blob(b"backups\n").expect("blob");
    let mut builder = bare.treebuilder(None).expect("treebuilder");
    builder.insert("README.md", blob, 0o100644).expect("insert");
    let tree = bare.find_tree(builder.write().expect("tree")).expect("find tree");
    let sig = Signature::now("human", "human@example.com").expect("sig");
    bare.commit(Some("refs/heads/main"), &sig, &sig, "init", &tree, &[])
        .expect("commit");
    path
}

#[test]
fn help_lists_subcommands() {
    let home = TempDir::new().expect("home");
    genie_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("backup"))
        .stdout(contains("verify"))
        .stdout(contains("bootstrap"));
}

#[test]
fn backup_requires_space_and_secret_arguments() {
    let home = TempDir::new().expect("home");
    genie_cmd(home.path())
        .args(["backup", "--space-id", "abc123"])
        .assert()
        .failure()
        .stderr(contains("--secret-scope"));
}

#[test]
fn disposable_clone_without_repo_url_is_rejected() {
    let home = TempDir::new().expect("home");
    genie_cmd(home.path())
        .args([
            "backup",
            "--space-id",
            "abc123",
            "--secret-scope",
            "scope",
            "--secret-key",
            "git-pat",
            "--strategy",
            "disposable-clone",
        ])
        .assert()
        .failure()
        .stderr(contains("repository url"));
}

#[test]
fn missing_workspace_credentials_are_reported() {
    let home = TempDir::new().expect("home");
    genie_cmd(home.path())
        .args([
            "backup",
            "--space-id",
            "abc123",
            "--secret-scope",
            "scope",
            "--secret-key",
            "git-pat",
        ])
        .assert()
        .failure()
        .stderr(contains("DATABRICKS_HOST"));
}

#[test]
fn backup_publishes_then_reports_up_to_date() {
    let home = TempDir::new().expect("home");
    let remote = seeded_remote(home.path());
    let serialized = json!({"version": 2, "data_sources": {"tables": [{"identifier": "c.s.users"}]}})
        .to_string();
    let space = json!({"space_id": "abc123", "serialized_space": serialized}).to_string();
    // base64("ghp_cli_token")
    let secret = json!({"key": "git-pat", "value": "Z2hwX2NsaV90b2tlbg=="}).to_string();

    let run = |host: String| {
        genie_cmd(home.path())
            .env("DATABRICKS_HOST", host)
            .env("DATABRICKS_TOKEN", "dapi-stub-token")
            .args([
                "backup",
                "--space-id",
                "abc123",
                "--secret-scope",
                "scope",
                "--secret-key",
                "git-pat",
                "--repo-url",
                remote.to_str().expect("utf-8 path"),
            ])
            .assert()
    };

    run(serve(vec![space.clone(), secret.clone()]))
        .success()
        .stdout(contains("Successfully pushed"));
    run(serve(vec![space, secret]))
        .success()
        .stdout(contains("No changes to commit"));

    let bare = Repository::open_bare(&remote).expect("open remote");
    let tip = bare
        .find_reference("refs/heads/main")
        .and_then(|r| r.peel_to_commit())
        .expect("tip");
    assert_eq!(
        tip.message(),
        Some("Backup: Automated Genie config update for Space abc123")
    );
    assert_eq!(tip.author().name(), Some("genie-backup-bot"));
    let entry = tip
        .tree()
        .expect("tree")
        .get_path(Path::new("genie_configs/space_abc123.json"))
        .expect("snapshot committed");
    let blob = bare.find_blob(entry.id()).expect("blob");
    let text = std::str::from_utf8(blob.content()).expect("utf-8");
    assert!(text.starts_with("{\n  \"data_sources\""));
    assert!(predicate::str::contains("c.s.users").eval(text));
}
