use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use regex::Regex;
use once_cell::sync::Lazy;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::SubtitleError;
use crate::file_utils::FileManager;

// @module: Subtitle parsing and bilingual rendering

// @const: SRT timing line, `,` or `.` before the milliseconds
static SRT_TIMING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(\d+):(\d{2}):(\d{2})[,.](\d{3})",
        r"\s*-->\s*",
        r"(\d+):(\d{2}):(\d{2})[,.](\d{3})",
    ))
    .unwrap()
});

// @const: WebVTT timing line, hours optional
static VTT_TIMING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?:(\d+):)?(\d{2}):(\d{2})\.(\d{3})",
        r"\s+-->\s+",
        r"(?:(\d+):)?(\d{2}):(\d{2})\.(\d{3})",
    ))
    .unwrap()
});

// @const: WebVTT inline markup such as <i> or <v Speaker>
static VTT_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

// @const: ASS override blocks such as {\i1}
static ASS_OVERRIDE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^}]*\}").unwrap());

/// Header written at the top of every ASS document
const ASS_HEADER: &str = "[Script Info]\n\
ScriptType: v4.00+\n\
Collisions: Normal\n\
PlayDepth: 0\n\
\n\
[V4+ Styles]\n\
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
Style: Chinese,Arial,20,&H00FFFFFF,&H000000FF,&H00000000,&H00000000,0,0,0,0,100,100,0,0,1,2,0,2,10,10,10,1\n\
Style: English,Arial,16,&H0080B2C2,&H000000FF,&H00000000,&H00000000,0,0,0,0,100,100,0,0,1,2,0,2,10,10,10,1\n\
\n\
[Events]\n\
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n";

/// Output document format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Srt,
    Ass,
}

impl OutputFormat {
    /// Case-insensitive parse that falls back to SRT for anything unrecognized
    pub fn from_str_lossy(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "ass" => OutputFormat::Ass,
            "srt" => OutputFormat::Srt,
            other => {
                if !other.is_empty() {
                    warn!("Unknown output format '{}', using srt", value);
                }
                OutputFormat::Srt
            }
        }
    }

    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Srt => "srt",
            OutputFormat::Ass => "ass",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Input document format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Srt,
    WebVtt,
    Ass,
}

impl SourceFormat {
    /// Format implied by a file extension, if any
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "srt" => Some(SourceFormat::Srt),
            "vtt" => Some(SourceFormat::WebVtt),
            "ass" | "ssa" => Some(SourceFormat::Ass),
            _ => None,
        }
    }

    /// Guess the format from the document itself
    pub fn sniff(content: &str) -> Self {
        let head = content.trim_start_matches('\u{feff}').trim_start();
        if head.starts_with("WEBVTT") {
            SourceFormat::WebVtt
        } else if head.starts_with("[Script Info]") || content.contains("\nDialogue:") {
            SourceFormat::Ass
        } else {
            SourceFormat::Srt
        }
    }
}

// @struct: One timed subtitle line
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleItem {
    // @field: 1-based display order
    pub index: usize,

    // @field: Offset from track start
    pub start_at: Duration,

    // @field: Offset from track start, never before start_at
    pub end_at: Duration,

    // @field: Source text, lines joined with '\n'
    pub text: String,

    // @field: Translated text once assigned
    pub translated: Option<String>,
}

impl SubtitleItem {
    pub fn new(
        index: usize,
        start_at: Duration,
        end_at: Duration,
        text: impl Into<String>,
    ) -> Self {
        SubtitleItem {
            index,
            start_at,
            end_at: end_at.max(start_at),
            text: text.into(),
            translated: None,
        }
    }

    /// Translation to render next to the source, if there is one worth showing
    pub fn bilingual_text(&self) -> Option<&str> {
        self.translated.as_deref().filter(|t| !t.is_empty())
    }
}

/// Format a duration as an SRT timestamp (HH:MM:SS,mmm)
pub fn format_srt_time(d: Duration) -> String {
    let ms = d.as_millis();
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Format a duration as an ASS timestamp (H:MM:SS.cc)
pub fn format_ass_time(d: Duration) -> String {
    let ms = d.as_millis();
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let centis = (ms / 10) % 100;

    format!("{}:{:02}:{:02}.{:02}", hours, minutes, seconds, centis)
}

/// Escape text for an ASS Dialogue field
pub fn escape_ass_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '{' => escaped.push_str("\\{"),
            '}' => escaped.push_str("\\}"),
            '\n' => escaped.push_str("\\N"),
            '\r' => {}
            other => escaped.push(other),
        }
    }
    escaped
}

/// Render items as SRT: translation above source when present
pub fn render_srt(items: &[SubtitleItem]) -> String {
    let mut out = String::new();
    for item in items {
        out.push_str(&format!("{}\n", item.index));
        out.push_str(&format!(
            "{} --> {}\n",
            format_srt_time(item.start_at),
            format_srt_time(item.end_at)
        ));
        if let Some(translated) = item.bilingual_text() {
            out.push_str(translated);
            out.push('\n');
        }
        out.push_str(&item.text);
        out.push_str("\n\n");
    }
    out
}

/// Render items as ASS with one Dialogue line per item
pub fn render_ass(items: &[SubtitleItem]) -> String {
    let mut out = String::from(ASS_HEADER);
    for item in items {
        let start = format_ass_time(item.start_at);
        let end = format_ass_time(item.end_at);
        let source = format!("{{\\rEnglish}}{}", escape_ass_text(&item.text));

        let (style, text) = match item.bilingual_text() {
            Some(translated) => (
                "Chinese",
                format!("{{\\rChinese}}{}\\N{}", escape_ass_text(translated), source),
            ),
            None => ("English", source),
        };

        out.push_str(&format!("Dialogue: 0,{},{},{},,0,0,0,,{}\n", start, end, style, text));
    }
    out
}

/// Render items in the requested format
pub fn render(items: &[SubtitleItem], format: OutputFormat) -> String {
    match format {
        OutputFormat::Srt => render_srt(items),
        OutputFormat::Ass => render_ass(items),
    }
}

/// Ordered subtitle items read from one file
#[derive(Debug, Clone)]
pub struct SubtitleCollection {
    /// Source filename
    pub source_file: PathBuf,

    /// Items sorted by start time and numbered from 1
    pub items: Vec<SubtitleItem>,
}

impl SubtitleCollection {
    /// Create a collection, sorting by start time and renumbering
    pub fn new(source_file: PathBuf, mut items: Vec<SubtitleItem>) -> Self {
        items.sort_by_key(|item| item.start_at);
        for (i, item) in items.iter_mut().enumerate() {
            item.index = i + 1;
        }
        SubtitleCollection { source_file, items }
    }

    /// Parse a subtitle file, detecting the format from extension or content
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, SubtitleError> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let content = String::from_utf8_lossy(&bytes);
        let format = FileManager::detect_subtitle_format(path, &content);
        debug!("Parsing {:?} as {:?}", path, format);

        let items = Self::parse_str(&content, format)?;
        Ok(Self::new(path.to_path_buf(), items))
    }

    /// Parse a document in a known format
    pub fn parse_str(
        content: &str,
        format: SourceFormat,
    ) -> Result<Vec<SubtitleItem>, SubtitleError> {
        let content = content
            .trim_start_matches('\u{feff}')
            .replace("\r\n", "\n")
            .replace('\r', "\n");
        match format {
            SourceFormat::Srt => parse_cues(&content, &SRT_TIMING_REGEX, false),
            SourceFormat::WebVtt => parse_cues(&content, &VTT_TIMING_REGEX, true),
            SourceFormat::Ass => parse_ass(&content),
        }
    }

    /// File name used to give the summarizer a hint about the title
    pub fn file_name(&self) -> String {
        self.source_file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Render the collection in the requested format
    pub fn render(&self, format: OutputFormat) -> String {
        render(&self.items, format)
    }
}

impl fmt::Display for SubtitleCollection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", render_srt(&self.items))
    }
}

/// Duration from `H:MM:SS` plus a fractional part scaled to milliseconds
fn duration_from_parts(
    hours: u64,
    minutes: u64,
    seconds: u64,
    millis: u64,
) -> Result<Duration, SubtitleError> {
    let invalid = || {
        SubtitleError::Parse(format!(
            "Invalid time components {}:{:02}:{:02}.{:03}",
            hours, minutes, seconds, millis
        ))
    };
    if minutes >= 60 || seconds >= 60 || millis >= 1000 {
        return Err(invalid());
    }

    let total = hours
        .checked_mul(3_600_000)
        .and_then(|ms| ms.checked_add(minutes * 60_000 + seconds * 1_000 + millis))
        .ok_or_else(invalid)?;
    Ok(Duration::from_millis(total))
}

fn capture_u64(caps: &regex::Captures, idx: usize) -> Result<u64, SubtitleError> {
    match caps.get(idx) {
        // Optional VTT hour group
        None => Ok(0),
        Some(m) => m.as_str().parse().map_err(|_| {
            SubtitleError::Parse(format!("Time component out of range: {}", m.as_str()))
        }),
    }
}

fn timing_from_captures(caps: &regex::Captures) -> Result<(Duration, Duration), SubtitleError> {
    let part = |idx| capture_u64(caps, idx);
    let start = duration_from_parts(part(1)?, part(2)?, part(3)?, part(4)?)?;
    let end = duration_from_parts(part(5)?, part(6)?, part(7)?, part(8)?)?;
    Ok((start, end))
}

/// Parse blank-line separated cue blocks (SRT and WebVTT share this layout)
fn parse_cues(
    content: &str,
    timing: &Regex,
    vtt: bool,
) -> Result<Vec<SubtitleItem>, SubtitleError> {
    let mut items = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    let mut line_no = 0;

    let mut flush = |block: &mut Vec<&str>, line_no: usize| -> Result<(), SubtitleError> {
        if block.is_empty() {
            return Ok(());
        }
        let lines = std::mem::take(block);

        if vtt {
            let first = lines[0].trim();
            let header_blocks = ["WEBVTT", "NOTE", "STYLE", "REGION"];
            if header_blocks.iter().any(|prefix| first.starts_with(prefix)) {
                return Ok(());
            }
        }

        let Some(pos) = lines.iter().position(|l| timing.is_match(l)) else {
            warn!("Skipping block without timing ending at line {}: {:?}", line_no, lines[0]);
            return Ok(());
        };

        let caps = timing
            .captures(lines[pos])
            .ok_or_else(|| SubtitleError::Parse(format!("Unreadable timing at line {}", line_no)))?;
        let (start, end) = timing_from_captures(&caps)?;
        if end < start {
            warn!("Cue ending before it starts near line {}, clamping", line_no);
        }

        let text_lines: Vec<String> = lines[pos + 1..]
            .iter()
            .map(|l| {
                let l = l.trim_end();
                if vtt { VTT_TAG_REGEX.replace_all(l, "").to_string() } else { l.to_string() }
            })
            .collect();
        let text = text_lines.join("\n");
        if text.trim().is_empty() {
            warn!("Skipping empty cue near line {}", line_no);
            return Ok(());
        }

        items.push(SubtitleItem::new(items.len() + 1, start, end, text));
        Ok(())
    };

    for line in content.lines() {
        line_no += 1;
        if line.trim().is_empty() {
            flush(&mut block, line_no)?;
        } else {
            block.push(line);
        }
    }
    flush(&mut block, line_no)?;

    if items.is_empty() {
        warn!("No subtitle cues found");
    }
    Ok(items)
}

/// Parse an ASS/SSA time (H:MM:SS.cc)
fn parse_ass_time(value: &str) -> Result<Duration, SubtitleError> {
    let bad = || SubtitleError::Parse(format!("Invalid ASS timestamp: {}", value));
    let mut parts = value.trim().split(':');
    let hours: u64 = parts.next().and_then(|h| h.parse().ok()).ok_or_else(bad)?;
    let minutes: u64 = parts.next().and_then(|m| m.parse().ok()).ok_or_else(bad)?;
    let (secs, frac) = parts.next().and_then(|s| s.split_once('.')).ok_or_else(bad)?;
    let seconds: u64 = secs.parse().map_err(|_| bad())?;
    let centis: u64 = frac.parse().map_err(|_| bad())?;
    let millis = match frac.len() {
        1 => centis * 100,
        2 => centis * 10,
        _ => centis,
    };
    duration_from_parts(hours, minutes, seconds, millis)
}

/// Strip override blocks and turn ASS line breaks into plain text
fn unescape_ass_text(text: &str) -> String {
    ASS_OVERRIDE_REGEX
        .replace_all(text, "")
        .replace("\\N", "\n")
        .replace("\\n", "\n")
        .replace("\\h", " ")
}

/// Parse the [Events] section of an ASS/SSA script
fn parse_ass(content: &str) -> Result<Vec<SubtitleItem>, SubtitleError> {
    let mut items = Vec::new();
    let mut in_events = false;
    let mut columns: Vec<String> = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            in_events = trimmed.eq_ignore_ascii_case("[Events]");
            continue;
        }
        if !in_events {
            continue;
        }

        if let Some(format) = trimmed.strip_prefix("Format:") {
            columns = format.split(',').map(|c| c.trim().to_ascii_lowercase()).collect();
            continue;
        }

        let Some(fields) = trimmed.strip_prefix("Dialogue:") else {
            continue;
        };
        if columns.is_empty() {
            return Err(SubtitleError::Parse(format!(
                "Dialogue before Format line at line {}",
                line_no + 1
            )));
        }

        let values: Vec<&str> = fields.trim_start().splitn(columns.len(), ',').collect();
        let column = |name: &str| {
            columns.iter().position(|c| c == name).and_then(|i| values.get(i).copied())
        };

        let (Some(start), Some(end), Some(text)) = (column("start"), column("end"), column("text"))
        else {
            warn!("Skipping incomplete Dialogue at line {}", line_no + 1);
            continue;
        };

        let text = unescape_ass_text(text);
        if text.trim().is_empty() {
            continue;
        }
        let (start_at, end_at) = (parse_ass_time(start)?, parse_ass_time(end)?);
        items.push(SubtitleItem::new(items.len() + 1, start_at, end_at, text));
    }

    if items.is_empty() {
        warn!("No Dialogue lines found");
    }
    Ok(items)
}
