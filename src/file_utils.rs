use anyhow::{Result, Context};
use std::fs;
use std::path::{Path, PathBuf};

use crate::subtitle_processor::{OutputFormat, SourceFormat};

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    // @generates: Output path for a bilingual subtitle next to its source
    // @params: input_file, target_language, format
    pub fn generate_output_path<P: AsRef<Path>>(
        input_file: P,
        target_language: &str,
        format: OutputFormat,
    ) -> PathBuf {
        let input_file = input_file.as_ref();

        // Get the file stem (filename without extension)
        let stem = input_file.file_stem().unwrap_or_default();

        let mut output_filename = stem.to_string_lossy().to_string();
        output_filename.push('.');
        output_filename.push_str(target_language);
        output_filename.push('.');
        output_filename.push_str(format.extension());

        match input_file.parent() {
            Some(parent) => parent.join(output_filename),
            None => PathBuf::from(output_filename),
        }
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Detect the subtitle format from the extension, falling back to the content
    pub fn detect_subtitle_format<P: AsRef<Path>>(path: P, content: &str) -> SourceFormat {
        path.as_ref()
            .extension()
            .and_then(|ext| SourceFormat::from_extension(&ext.to_string_lossy()))
            .unwrap_or_else(|| SourceFormat::sniff(content))
    }
}
