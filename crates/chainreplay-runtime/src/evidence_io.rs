use std::path::Path;

use chainreplay_types::{canonical_parse, canonical_stringify, EvidencePack};

use crate::error::{Error, Result};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const CASE_FILE: &str = "incident-case.jsonl";
pub const EVENTS_FILE: &str = "events.jsonl";

/// Write the three evidence artifacts into a directory. Every line is
/// canonical JSON, newline-terminated, so the on-disk bytes hash to the
/// manifest values.
pub fn write_evidence_pack(dir: &Path, pack: &EvidencePack) -> Result<()> {
    std::fs::create_dir_all(dir)?;

    let manifest_value = serde_json::to_value(&pack.manifest)?;
    let mut manifest = canonical_stringify(&manifest_value);
    manifest.push('\n');
    std::fs::write(dir.join(MANIFEST_FILE), manifest)?;

    let mut case_line = canonical_stringify(&pack.case_data);
    case_line.push('\n');
    std::fs::write(dir.join(CASE_FILE), case_line)?;

    let mut events = String::new();
    for event in &pack.events {
        events.push_str(&canonical_stringify(event));
        events.push('\n');
    }
    std::fs::write(dir.join(EVENTS_FILE), events)?;

    Ok(())
}

/// Read an evidence pack back from its artifact directory.
pub fn read_evidence_pack(dir: &Path) -> Result<EvidencePack> {
    let manifest_raw = std::fs::read_to_string(dir.join(MANIFEST_FILE))?;
    let manifest_value = canonical_parse(manifest_raw.trim_end())
        .map_err(|e| Error::EvidenceIntegrity(vec![format!("manifest unreadable: {}", e)]))?;
    let manifest = serde_json::from_value(manifest_value)
        .map_err(|e| Error::EvidenceIntegrity(vec![format!("manifest invalid: {}", e)]))?;

    let case_raw = std::fs::read_to_string(dir.join(CASE_FILE))?;
    let case_data = canonical_parse(case_raw.trim_end())
        .map_err(|e| Error::EvidenceIntegrity(vec![format!("case unreadable: {}", e)]))?;

    let events_raw = std::fs::read_to_string(dir.join(EVENTS_FILE))?;
    let mut events = Vec::new();
    for (line_no, line) in events_raw.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let event = canonical_parse(line).map_err(|e| {
            Error::EvidenceIntegrity(vec![format!("event line {}: {}", line_no + 1, e)])
        })?;
        events.push(event);
    }

    Ok(EvidencePack {
        manifest,
        case_data,
        events,
    })
}
