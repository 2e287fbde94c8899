//! Directory loading: walk a folder and turn every eligible file into a
//! [`Document`]
//!
//! Files whose extension appears in the [`FileExtractor`] are handed to that
//! parser; everything else goes through the default readers (PDF extraction,
//! plain-text `.docx` reading, or UTF-8 text).

use crate::config::{DocumentsConfig, ResultType};
use crate::error::{LoadError, RagError};
use crate::parser::{DocxParser, FileExtractor, extract_pdf_to_markdown, mime_type_for};
use crate::types::{Document, DocumentMetadata};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Trait for anything that can produce the document set for one request
#[async_trait::async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load_data(&self) -> Result<Vec<Document>, RagError>;
}

pub struct DirectoryLoader {
    pub(crate) input_dir: PathBuf,
    pub(crate) file_extractor: FileExtractor,
    pub(crate) recursive: bool,
    pub(crate) exclude_hidden: bool,
    pub(crate) required_exts: Vec<String>,
    pub(crate) num_files_limit: Option<usize>,
    pub(crate) max_file_size: u64,
    pub(crate) raise_on_error: bool,
}

impl DirectoryLoader {
    pub fn new(input_dir: impl AsRef<Path>) -> Self {
        Self {
            input_dir: input_dir.as_ref().to_path_buf(),
            file_extractor: FileExtractor::new(),
            recursive: false,
            exclude_hidden: true,
            required_exts: Vec::new(),
            num_files_limit: None,
            max_file_size: u64::MAX,
            raise_on_error: false,
        }
    }

    pub fn from_config(config: &DocumentsConfig, file_extractor: FileExtractor) -> Self {
        Self::new(&config.data_dir)
            .with_file_extractor(file_extractor)
            .with_recursive(config.recursive)
            .with_exclude_hidden(config.exclude_hidden)
            .with_required_exts(config.required_extensions.clone())
            .with_num_files_limit(config.num_files_limit)
            .with_max_file_size(config.max_file_size)
            .with_raise_on_error(config.raise_on_error)
    }

    pub fn with_file_extractor(mut self, file_extractor: FileExtractor) -> Self {
        self.file_extractor = file_extractor
            .into_iter()
            .map(|(ext, parser)| (ext.to_lowercase(), parser))
            .collect();
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_exclude_hidden(mut self, exclude_hidden: bool) -> Self {
        self.exclude_hidden = exclude_hidden;
        self
    }

    pub fn with_required_exts(mut self, exts: Vec<String>) -> Self {
        self.required_exts = exts.into_iter().map(|e| e.to_lowercase()).collect();
        self
    }

    pub fn with_num_files_limit(mut self, limit: Option<usize>) -> Self {
        self.num_files_limit = limit;
        self
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn with_raise_on_error(mut self, raise_on_error: bool) -> Self {
        self.raise_on_error = raise_on_error;
        self
    }

    /// Collect the files to load, in sorted path order
    pub fn input_files(&self) -> Result<Vec<PathBuf>, RagError> {
        let dir_display = self.input_dir.display().to_string();
        if !self.input_dir.exists() {
            return Err(LoadError::DirectoryNotFound(dir_display).into());
        }
        if !self.input_dir.is_dir() {
            return Err(LoadError::NotADirectory(dir_display).into());
        }

        let mut walker = WalkDir::new(&self.input_dir)
            .min_depth(1)
            .sort_by_file_name();
        if !self.recursive {
            walker = walker.max_depth(1);
        }

        let exclude_hidden = self.exclude_hidden;
        let mut files = Vec::new();
        for entry in walker
            .into_iter()
            .filter_entry(|e| !(exclude_hidden && e.depth() > 0 && is_hidden(e.file_name())))
        {
            let entry = entry.map_err(|e| LoadError::WalkFailed(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();

            if !self.required_exts.is_empty() {
                let ext = dotted_extension(path);
                if !self.required_exts.iter().any(|r| Some(r) == ext.as_ref()) {
                    continue;
                }
            }

            if let Ok(metadata) = entry.metadata()
                && metadata.len() > self.max_file_size
            {
                tracing::debug!("Skipping large file: {:?}", path);
                continue;
            }

            files.push(path.to_path_buf());

            if self.num_files_limit.is_some_and(|limit| files.len() >= limit) {
                break;
            }
        }

        if files.is_empty() {
            return Err(LoadError::NoFilesFound(dir_display).into());
        }
        Ok(files)
    }

    /// Read one file through its parser or the default readers.
    ///
    /// `Ok(None)` means the file was deliberately skipped (binary content).
    async fn load_file(&self, path: &Path) -> Result<Option<String>, RagError> {
        if let Some(ext) = dotted_extension(path)
            && let Some(parser) = self.file_extractor.get(&ext)
        {
            tracing::debug!("Parsing {:?} with configured parser", path);
            return parser.parse(path).await.map(Some);
        }

        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || read_with_default_reader(&owned))
            .await
            .map_err(|e| LoadError::FileReadFailed {
                file: path.display().to_string(),
                reason: format!("reader task failed: {}", e),
            })?
    }
}

#[async_trait::async_trait]
impl DocumentLoader for DirectoryLoader {
    async fn load_data(&self) -> Result<Vec<Document>, RagError> {
        let files = self.input_files()?;
        tracing::info!(
            "Loading {} files from {}",
            files.len(),
            self.input_dir.display()
        );

        let mut documents = Vec::with_capacity(files.len());
        for path in &files {
            match self.load_file(path).await {
                Ok(Some(text)) => documents.push(Document::new(text, file_metadata(path))),
                Ok(None) => {}
                // An unreachable or stalled parser service fails the whole load
                Err(e) if e.is_upstream() => {
                    tracing::error!("Parser service failed on {:?}: {}", path, e);
                    return Err(e);
                }
                Err(e) if self.raise_on_error => {
                    tracing::error!("Failed to load file {:?}: {}", path, e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!("Failed to load file {:?}: {}. Skipping...", path, e);
                }
            }
        }

        tracing::info!("Loaded {} documents", documents.len());
        Ok(documents)
    }
}

/// Default readers for files without a configured parser
fn read_with_default_reader(path: &Path) -> Result<Option<String>, RagError> {
    match dotted_extension(path).as_deref() {
        Some(".pdf") => extract_pdf_to_markdown(path).map(Some),
        Some(".docx") => {
            let bytes = fs::read(path)?;
            DocxParser::new(ResultType::Text)
                .parse_bytes(&bytes)
                .map(Some)
                .map_err(|reason| {
                    LoadError::FileReadFailed {
                        file: path.display().to_string(),
                        reason,
                    }
                    .into()
                })
        }
        _ => {
            let bytes = fs::read(path)?;
            if !is_text(&bytes) {
                tracing::debug!("Skipping binary file: {:?}", path);
                return Ok(None);
            }
            Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
        }
    }
}

/// Simple heuristic: more than 30% control bytes means binary
fn is_text(content: &[u8]) -> bool {
    if content.is_empty() {
        return true;
    }
    if content.contains(&0) {
        return false;
    }
    let non_printable = content
        .iter()
        .filter(|&&b| b < 0x20 && b != b'\n' && b != b'\r' && b != b'\t')
        .count();
    (non_printable as f64 / content.len() as f64) < 0.3
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.'))
}

/// Lower-case extension with leading dot, e.g. ".docx"
pub(crate) fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
}

fn file_metadata(path: &Path) -> DocumentMetadata {
    let absolute = crate::paths::PlatformPaths::absolutize(path);
    let meta = fs::metadata(path).ok();
    let format_date = |time: std::io::Result<std::time::SystemTime>| {
        time.ok()
            .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d").to_string())
    };

    DocumentMetadata {
        file_path: absolute.to_string_lossy().to_string(),
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        file_type: mime_type_for(path).to_string(),
        file_size: meta.as_ref().map(|m| m.len()).unwrap_or(0),
        creation_date: meta.as_ref().and_then(|m| format_date(m.created())),
        last_modified_date: meta.as_ref().and_then(|m| format_date(m.modified())),
    }
}
