use std::fs;

use qrbatch_engine::{ensure_output_dir, AtomicFileWriter, DirectorySaver, FileSaver, PersistError};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out").join("zips");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing_file() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("qrcode-1.png", [0x89u8, b'P', b'N', b'G']).unwrap();
    assert_eq!(first.file_name().unwrap(), "qrcode-1.png");
    assert_eq!(fs::read(&first).unwrap(), vec![0x89, b'P', b'N', b'G']);

    let second = writer.write("qrcode-1.png", b"again").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"again");
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    let result = writer.write("batch.zip", b"data");
    assert!(matches!(result, Err(PersistError::OutputDir(_))));
    assert!(!file_path.with_file_name("batch.zip").exists());
}

#[test]
fn rejects_names_that_escape_the_directory() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());
    for name in ["", ".", "..", "../evil.zip", "sub/dir.png", "a\\b.png"] {
        assert!(
            matches!(writer.write(name, b"x"), Err(PersistError::InvalidName(_))),
            "{name:?} accepted"
        );
    }
}

#[test]
fn directory_saver_leaves_only_the_target_file() {
    let temp = TempDir::new().unwrap();
    let saver = DirectorySaver::new(temp.path());

    let path = saver.save("qrcodes_batch_5.zip", b"PK").unwrap();
    assert_eq!(path, temp.path().join("qrcodes_batch_5.zip"));

    let names: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["qrcodes_batch_5.zip".to_string()]);
}
