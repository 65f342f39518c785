//! Zip archive tests

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use zipdeploy::deploy::archive::build_zip;
use zipdeploy::errors::DeployError;
use zipdeploy::utils::sha256_hex;

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Create `<root>/api` with a few nested files and an empty directory
fn create_api_dir(root: &Path) -> std::path::PathBuf {
    let api = root.join("api");
    write(&api.join("host.json"), r#"{"version": "2.0"}"#);
    write(&api.join("requirements.txt"), "azure-functions\n");
    write(&api.join("HttpTrigger").join("__init__.py"), "def main(req): ...\n");
    write(
        &api.join("HttpTrigger").join("nested").join("function.json"),
        r#"{"bindings": []}"#,
    );
    fs::create_dir_all(api.join("empty").join("deeper")).unwrap();
    api
}

fn read_entries(path: &Path) -> BTreeMap<String, String> {
    let file = fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut entries = BTreeMap::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        let mut contents = String::new();
        entry.read_to_string(&mut contents).unwrap();
        let previous = entries.insert(entry.name().to_string(), contents);
        assert!(previous.is_none(), "duplicate entry {}", entry.name());
    }
    entries
}

#[tokio::test]
async fn test_archive_preserves_top_level_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let api = create_api_dir(tmp.path());
    let output = tmp.path().join("out.zip");

    let summary = build_zip(&api, &output).await.unwrap();
    let entries = read_entries(&output);

    let names: Vec<_> = entries.keys().cloned().collect();
    assert_eq!(
        names,
        vec![
            "api/HttpTrigger/__init__.py",
            "api/HttpTrigger/nested/function.json",
            "api/host.json",
            "api/requirements.txt",
        ]
    );
    assert_eq!(entries["api/host.json"], r#"{"version": "2.0"}"#);
    assert_eq!(summary.entries, 4);
    assert_eq!(summary.path, output);
}

#[tokio::test]
async fn test_archive_summary_matches_file() {
    let tmp = tempfile::tempdir().unwrap();
    let api = create_api_dir(tmp.path());
    let output = tmp.path().join("out.zip");

    let summary = build_zip(&api, &output).await.unwrap();
    let bytes = fs::read(&output).unwrap();

    assert_eq!(summary.size_bytes, bytes.len() as u64);
    assert_eq!(summary.sha256, sha256_hex(&bytes));
}

#[tokio::test]
async fn test_archive_uses_real_directory_name() {
    let tmp = tempfile::tempdir().unwrap();
    let api = create_api_dir(tmp.path());
    let output = tmp.path().join("out.zip");

    // `api/.` still names the entries after `api`
    build_zip(&api.join("."), &output).await.unwrap();
    let entries = read_entries(&output);
    assert!(entries.keys().all(|name| name.starts_with("api/")));
    assert_eq!(entries.len(), 4);
}

#[tokio::test]
async fn test_empty_directory_gives_empty_archive() {
    let tmp = tempfile::tempdir().unwrap();
    let api = tmp.path().join("api");
    fs::create_dir_all(api.join("only").join("dirs")).unwrap();
    let output = tmp.path().join("out.zip");

    let summary = build_zip(&api, &output).await.unwrap();
    assert_eq!(summary.entries, 0);
    assert!(read_entries(&output).is_empty());
}

#[tokio::test]
async fn test_output_inside_source_is_skipped() {
    let tmp = tempfile::tempdir().unwrap();
    let api = create_api_dir(tmp.path());
    let output = api.join("deploy.zip");

    let summary = build_zip(&api, &output).await.unwrap();
    let entries = read_entries(&output);
    assert_eq!(summary.entries, 4);
    assert!(!entries.contains_key("api/deploy.zip"));
}

#[tokio::test]
async fn test_missing_source_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let output = tmp.path().join("out.zip");

    let result = build_zip(&tmp.path().join("missing"), &output).await;
    assert!(matches!(result, Err(DeployError::IoError(_))));
    assert!(!output.exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_archive_keeps_mode_and_mtime() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = tempfile::tempdir().unwrap();
    let api = tmp.path().join("api");
    write(&api.join("run.sh"), "#!/bin/sh\necho ok\n");
    write(&api.join("host.json"), "{}");
    fs::set_permissions(api.join("run.sh"), fs::Permissions::from_mode(0o755)).unwrap();
    let output = tmp.path().join("out.zip");

    build_zip(&api, &output).await.unwrap();

    let mut archive = zip::ZipArchive::new(fs::File::open(&output).unwrap()).unwrap();
    let script = archive.by_name("api/run.sh").unwrap();
    assert_eq!(script.unix_mode().unwrap() & 0o777, 0o755);
    let mtime = script.last_modified().unwrap();
    assert_ne!(mtime, zip::DateTime::default());
    assert!(mtime.year() >= 2020);
    drop(script);

    let config = archive.by_name("api/host.json").unwrap();
    assert_eq!(config.unix_mode().unwrap() & 0o111, 0);
}
