//! Document ingestion: walk a data directory, chunk text with a sliding
//! window, and write the ordered JSONL corpus consumed by the index.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::types::{Chunk, IngestStats};

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Window size in characters.
    pub window: usize,
    /// Overlap carried between consecutive windows, in characters.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { window: 600, overlap: 120 }
    }
}

#[derive(Default)]
pub struct Ingestor {
    chunking: ChunkingConfig,
}

impl Ingestor {
    pub fn new() -> Self { Self::default() }

    pub fn with_chunking(chunking: ChunkingConfig) -> Self {
        Self { chunking }
    }

    /// Walk `data_dir` for text documents, chunk each one, and return the
    /// ordered chunk sequence. Sources are paths relative to `data_dir`.
    pub fn process_directory(&self, data_dir: &Path) -> Result<(Vec<Chunk>, IngestStats)> {
        let files = list_text_files(data_dir);
        let mut all_chunks = Vec::new();
        let mut stats = IngestStats {
            documents: 0,
            chunks: 0,
            bytes_read: 0,
            sources: Vec::new(),
        };
        for file_path in &files {
            let content = read_file_content(file_path)?;
            let source = relative_source(file_path, data_dir);
            let chunks = self.chunk_document(&content, &source);
            if chunks.is_empty() {
                continue;
            }
            stats.documents += 1;
            stats.chunks += chunks.len();
            stats.bytes_read += content.len();
            stats.sources.push(source);
            all_chunks.extend(chunks);
        }
        info!(
            documents = stats.documents,
            chunks = stats.chunks,
            "processed {}",
            data_dir.display()
        );
        Ok((all_chunks, stats))
    }

    /// Chunk one document into offset-addressable windows. Whitespace runs
    /// are collapsed first, so offsets refer to the cleaned text.
    pub fn chunk_document(&self, content: &str, source: &str) -> Vec<Chunk> {
        let clean = collapse_whitespace(content);
        let chars: Vec<char> = clean.chars().collect();
        let mut chunks = Vec::new();
        if chars.is_empty() {
            return chunks;
        }
        let window = self.chunking.window.max(1);
        let mut start = 0usize;
        while start < chars.len() {
            let mut end = (start + window).min(chars.len());
            // Snap to a sentence boundary if one falls past the window midpoint.
            if let Some(dot) = rfind_char(&chars, '.', start, end) {
                if dot > start + window / 2 {
                    end = dot + 1;
                }
            }
            let text: String = chars[start..end].iter().collect();
            let text = text.trim().to_string();
            if !text.is_empty() {
                chunks.push(Chunk {
                    source: source.to_string(),
                    start,
                    end,
                    text,
                });
            }
            if end == chars.len() {
                break;
            }
            // Overlap never rewinds past the previous start, so the walk
            // always advances.
            start = end.saturating_sub(self.chunking.overlap).max(start + 1);
        }
        chunks
    }
}

/// Write chunks as one JSON record per line, in order.
pub fn write_corpus(chunks: &[Chunk], corpus_path: &Path) -> Result<()> {
    if let Some(parent) = corpus_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = fs::File::create(corpus_path)
        .with_context(|| format!("create {}", corpus_path.display()))?;
    for chunk in chunks {
        serde_json::to_writer(&mut out, chunk)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Read an ordered JSONL corpus. Blank lines are skipped.
pub fn load_corpus(corpus_path: &Path) -> Result<Vec<Chunk>> {
    let data = fs::read_to_string(corpus_path)
        .with_context(|| format!("read {}", corpus_path.display()))?;
    let mut chunks = Vec::new();
    for line in data.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let chunk = serde_json::from_str::<Chunk>(line)?;
        chunk.validate()?;
        chunks.push(chunk);
    }
    Ok(chunks)
}

/// Walk a directory, chunk every document, and persist the corpus.
pub fn ingest(data_dir: &Path, corpus_path: &Path) -> Result<IngestStats> {
    let ingestor = Ingestor::new();
    let (chunks, stats) = ingestor.process_directory(data_dir)?;
    write_corpus(&chunks, corpus_path)?;
    Ok(stats)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn rfind_char(chars: &[char], needle: char, start: usize, end: usize) -> Option<usize> {
    chars[start..end]
        .iter()
        .rposition(|&c| c == needle)
        .map(|i| start + i)
}

fn read_file_content(file_path: &Path) -> Result<String> {
    match fs::read_to_string(file_path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
    }
}

fn relative_source(file_path: &Path, data_dir: &Path) -> String {
    let relative = file_path.strip_prefix(data_dir).unwrap_or(file_path);
    relative.to_string_lossy().to_string()
}

fn list_text_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        match path.extension().and_then(|s| s.to_str()) {
            Some("txt") | Some("md") => files.push(path.to_path_buf()),
            _ => {}
        }
    }
    files.sort();
    files
}
