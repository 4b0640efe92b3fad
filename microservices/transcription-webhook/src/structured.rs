//! Best-effort cleanup of transcript text that arrives in structured form.
//!
//! CloudTalk sometimes delivers a transcript as CSV rows
//! (`timestamp,channel,text`) or as a list of `{speaker, text}` segments.
//! Both are flattened into one labeled line per speaker turn.

use serde_json::Value;

const TIME_COLUMNS: &[&str] = &["timestamp", "time", "start", "start_time", "starttime"];
const CHANNEL_COLUMNS: &[&str] = &["channel", "speaker", "speaker_channel"];
const TEXT_COLUMNS: &[&str] = &["text", "transcript", "content", "sentence"];

/// Reformat CSV-shaped transcripts, returning the input unchanged when it
/// does not look like one or no row can be parsed.
pub fn format_transcript(text: &str) -> String {
    reformat_rows(text).unwrap_or_else(|| text.to_string())
}

/// `Some(labeled lines)` when `text` starts with a recognised header row and
/// at least one data row parses.
pub fn reformat_rows(text: &str) -> Option<String> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = split_csv_line(lines.next()?);
    let header: Vec<String> = header.iter().map(|h| h.trim().to_ascii_lowercase()).collect();

    let column = |names: &[&str]| header.iter().position(|h| names.contains(&h.as_str()));
    column(TIME_COLUMNS)?;
    let channel_idx = column(CHANNEL_COLUMNS)?;
    let text_idx = column(TEXT_COLUMNS)?;

    let mut turns: Vec<(String, String)> = Vec::new();
    for line in lines {
        let fields = split_csv_line(line);
        let (Some(channel), Some(spoken)) = (fields.get(channel_idx), fields.get(text_idx)) else {
            continue;
        };
        let spoken = spoken.trim();
        if spoken.is_empty() {
            continue;
        }

        let label = speaker_label(channel);
        match turns.last_mut() {
            Some((last_label, last_text)) if *last_label == label => {
                last_text.push(' ');
                last_text.push_str(spoken);
            }
            _ => turns.push((label, spoken.to_string())),
        }
    }

    if turns.is_empty() {
        return None;
    }

    Some(
        turns
            .into_iter()
            .map(|(label, spoken)| format!("{}: {}", label, spoken))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

/// Join `[{speaker, text}]` segments into `speaker: text` lines.
pub fn join_segments(segments: &[Value]) -> Option<String> {
    let lines: Vec<String> = segments
        .iter()
        .filter_map(|segment| {
            let text = segment.get("text").and_then(Value::as_str)?.trim();
            if text.is_empty() {
                return None;
            }
            let speaker = match segment.get("speaker") {
                Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
                Some(Value::Number(n)) => speaker_label(&n.to_string()),
                _ => "Speaker".to_string(),
            };
            Some(format!("{}: {}", speaker, text))
        })
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn speaker_label(channel: &str) -> String {
    let channel = channel.trim();
    match channel.to_ascii_lowercase().as_str() {
        "0" | "a" | "agent" => "Agent".to_string(),
        "1" | "b" | "client" | "customer" | "caller" => "Client".to_string(),
        _ => format!("Speaker {}", channel),
    }
}

/// Split one CSV line, honouring double-quoted fields and `""` escapes.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim_end_matches('\r').chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
