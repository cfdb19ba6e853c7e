//! CLI output formatting.
//!
//! # Output Format
//!
//! ## List formats
//!
//! ```text
//! +--- Can decode?
//! |+-- Can encode?
//! ||   === Format name (aliases) ===
//! DE   jpeg (jpg, jfif, jpi)
//! D-   webp
//! -E   avif
//! ```
//!
//! ## Batch
//!
//! Identify lines go to stdout, failures to stderr. Both lead with the input
//! name unless names are turned off:
//!
//! ```text
//! photo.png: 1920x1080, hash: 9187201950435737471, comment: dusk
//! broken.png: ReadImage: Image error: Format error decoding Png: ...
//! ```
//!
//! Successful conversions print nothing, so `-` can stream image bytes to
//! stdout.
//!
//! # Architecture
//!
//! `format_*` functions return strings for testability; `print_*` wrappers
//! write them out.

use crate::batch::BatchEvent;
use crate::codec::CodecSummary;

// ============================================================================
// Formats
// ============================================================================

fn flag(set: bool, mark: char) -> char {
    if set { mark } else { '-' }
}

/// Capability table for `--list-formats`.
pub fn format_codec_table(codecs: &[CodecSummary]) -> Vec<String> {
    let mut lines = vec![
        "+--- Can decode?".to_string(),
        "|+-- Can encode?".to_string(),
        "||   === Format name (aliases) ===".to_string(),
    ];
    for codec in codecs {
        let mut line = format!(
            "{}{}   {}",
            flag(codec.can_decode, 'D'),
            flag(codec.can_encode, 'E'),
            codec.name
        );
        if !codec.aliases.is_empty() {
            line.push_str(&format!(" ({})", codec.aliases.join(", ")));
        }
        lines.push(line);
    }
    lines
}

pub fn print_codec_table(codecs: &[CodecSummary]) {
    for line in format_codec_table(codecs) {
        println!("{}", line);
    }
}

/// One-line format list appended to `--version`.
pub fn format_supported_formats(codecs: &[CodecSummary]) -> String {
    let names: Vec<&str> = codecs.iter().map(|c| c.name.as_str()).collect();
    format!("Supported formats: {}", names.join(" "))
}

// ============================================================================
// Batch
// ============================================================================

/// Where a batch line is printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventLine {
    Stdout(String),
    Stderr(String),
}

/// Display line for a batch event, if it has one.
pub fn format_batch_event(event: &BatchEvent, show_names: bool) -> Option<EventLine> {
    let prefix = |input: &str| {
        if show_names {
            format!("{}: ", input)
        } else {
            String::new()
        }
    };
    match event {
        BatchEvent::Identified { input, line } => {
            Some(EventLine::Stdout(format!("{}{}", prefix(input), line)))
        }
        BatchEvent::Converted { .. } => None,
        BatchEvent::Failed {
            input,
            stage,
            error,
        } => Some(EventLine::Stderr(format!(
            "{}{}: {}",
            prefix(input),
            stage.label(),
            error
        ))),
    }
}

pub fn print_batch_event(event: &BatchEvent, show_names: bool) {
    match format_batch_event(event, show_names) {
        Some(EventLine::Stdout(line)) => println!("{}", line),
        Some(EventLine::Stderr(line)) => eprintln!("{}", line),
        None => {}
    }
}
