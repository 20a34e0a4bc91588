use std::fs;
use std::io::Write;
use tempfile::TempDir;

use specqa_core::data_processor::DataProcessor;

#[test]
fn process_directory_single_small_file() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let file_path = dir.join("dm8se.txt");
    let mut f = fs::File::create(&file_path).unwrap();
    writeln!(f, "DM8SE: 125W continuous power").unwrap();

    let processor = DataProcessor::new();
    let chunks = processor.process_directory(dir).expect("process");

    assert_eq!(chunks.len(), 1, "one small paragraph becomes one chunk");
    assert_eq!(chunks[0].text, "DM8SE: 125W continuous power");
    assert_eq!(chunks[0].metadata.source, "dm8se");
    assert_eq!(chunks[0].metadata.page, 1);
    assert_eq!(chunks[0].metadata.content_type(), "text");
}

#[test]
fn process_directory_limited_two_files_limit_one() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("a.txt"), "alpha bravo").unwrap();
    fs::write(dir.join("b.txt"), "charlie delta").unwrap();
    fs::write(dir.join("notes.md"), "ignored").unwrap();

    let processor = DataProcessor::new();
    let chunks = processor
        .process_directory_limited(dir, 1)
        .expect("process limited");

    // Only chunks from one document should be present
    let mut sources = std::collections::HashSet::new();
    for c in &chunks { sources.insert(c.metadata.source.clone()); }
    assert_eq!(sources.len(), 1, "limited to one source document");
    assert!(sources.contains("a"), "files are visited in sorted order");
}

#[test]
fn process_directory_empty_dir_yields_nothing() {
    let tmp = TempDir::new().unwrap();
    let chunks = DataProcessor::new().process_directory(tmp.path()).expect("process");
    assert!(chunks.is_empty());
}
