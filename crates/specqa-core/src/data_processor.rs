use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::types::{Chunk, ChunkMetadata};

const FORM_FEED: char = '\x0c';

/// A line break, any blank or whitespace-only lines, and the next line break.
static BLANK_LINES: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\n\s*\n").ok());

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub max_tokens: usize,
    pub overlap_percent: f32,
    pub words_per_window: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_tokens: 500, overlap_percent: 0.2, words_per_window: 300 }
    }
}

/// Turns a directory of extracted `.txt` manuals into chunks.
///
/// Each file is one source document. Pages are separated by form feeds
/// (what most PDF-to-text tools emit), paragraphs by blank lines.
#[derive(Default)]
pub struct DataProcessor {
    chunking_config: ChunkingConfig,
}

impl DataProcessor {
    pub fn new() -> Self { Self::default() }

    pub fn with_config(chunking_config: ChunkingConfig) -> Self { Self { chunking_config } }

    pub fn process_directory(&self, data_dir: &Path) -> Result<Vec<Chunk>> {
        self.process_files(data_dir, self.list_txt_files(data_dir))
    }

    pub fn process_directory_limited(&self, data_dir: &Path, limit: usize) -> Result<Vec<Chunk>> {
        let mut files = self.list_txt_files(data_dir);
        if files.len() > limit {
            files.truncate(limit);
            info!(limit, "limited ingestion to first files");
        }
        self.process_files(data_dir, files)
    }

    fn process_files(&self, data_dir: &Path, files: Vec<PathBuf>) -> Result<Vec<Chunk>> {
        if files.is_empty() {
            warn!(dir = %data_dir.display(), "no .txt files found");
            return Ok(vec![]);
        }
        let mut all_chunks = Vec::new();
        for (file_index, file_path) in files.iter().enumerate() {
            debug!(file = %file_path.display(), n = file_index + 1, of = files.len(), "processing file");
            let content = self.read_file_content(file_path)?;
            let source = Self::source_name(file_path);
            all_chunks.extend(self.chunk_document(&content, &source));
        }
        info!(files = files.len(), chunks = all_chunks.len(), "processed documents");
        Ok(all_chunks)
    }

    /// Split one document's text into chunks with `source`/`page` metadata.
    pub fn chunk_document(&self, content: &str, source: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let content = content.replace("\r\n", "\n").replace('\r', "\n");
        for (page_index, page) in content.split(FORM_FEED).enumerate() {
            let page_no = u32::try_from(page_index + 1).unwrap_or(u32::MAX);
            for paragraph in split_paragraphs(page) {
                let paragraph = normalize_whitespace(paragraph);
                if paragraph.is_empty() { continue; }
                let pieces = if self.count_tokens(&paragraph) <= self.chunking_config.max_tokens {
                    vec![paragraph]
                } else {
                    self.split_paragraph_with_overlap(&paragraph)
                };
                for text in pieces {
                    let metadata = ChunkMetadata::new(source, page_no)
                        .with("content_type", "text")
                        .with("processor", "text");
                    chunks.push(Chunk::new(text, metadata));
                }
            }
        }
        chunks
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
        }
    }

    fn source_name(file_path: &Path) -> String {
        file_path
            .file_stem()
            .map_or_else(|| file_path.to_string_lossy().to_string(), |s| s.to_string_lossy().to_string())
    }

    fn count_tokens(&self, text: &str) -> usize {
        let word_count = text.split_whitespace().count();
        (word_count as f32 / 0.75) as usize
    }

    fn split_paragraph_with_overlap(&self, paragraph: &str) -> Vec<String> {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        let words_per_chunk = self.chunking_config.words_per_window.max(1);
        let overlap_words = ((words_per_chunk as f32 * self.chunking_config.overlap_percent) as usize)
            .min(words_per_chunk - 1);
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + words_per_chunk).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end >= words.len() { break; }
            start = end - overlap_words;
        }
        chunks
    }

    fn list_txt_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut txt_files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().to_path_buf())
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("txt"))
            .collect();
        txt_files.sort();
        txt_files
    }
}

fn split_paragraphs(page: &str) -> Vec<&str> {
    match BLANK_LINES.as_ref() {
        Some(re) => re.split(page).collect(),
        None => page.split("\n\n").collect(),
    }
}

/// Collapse every whitespace run to a single space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_follow_form_feeds() {
        let processor = DataProcessor::new();
        let chunks = processor.chunk_document("Intro text\n\nMore intro\x0cPage two   body", "dm8se");
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].metadata.page, 1);
        assert_eq!(chunks[1].metadata.page, 1);
        assert_eq!(chunks[2].metadata.page, 2);
        assert_eq!(chunks[2].text, "Page two body");
        assert!(chunks.iter().all(|c| c.metadata.source == "dm8se" && c.id.is_empty()));
    }

    #[test]
    fn crlf_and_whitespace_only_lines_separate_paragraphs() {
        let processor = DataProcessor::new();
        let chunks = processor.chunk_document("First para\r\n\r\nSecond para\n  \t\nThird\rpara", "dm8se");
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["First para", "Second para", "Third para"]);
    }

    #[test]
    fn long_paragraphs_are_windowed_with_overlap() {
        let processor = DataProcessor::with_config(ChunkingConfig {
            max_tokens: 10,
            overlap_percent: 0.5,
            words_per_window: 4,
        });
        let paragraph = (0..10).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let chunks = processor.chunk_document(&paragraph, "long");
        assert_eq!(chunks[0].text, "w0 w1 w2 w3");
        assert_eq!(chunks[1].text, "w2 w3 w4 w5");
        assert!(chunks.last().expect("chunks").text.ends_with("w9"));
    }
}
