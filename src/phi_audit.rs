// Static scan of every source file for tracing calls that carry patient
// data, token maps, prompt text or credentials. Log lines may only carry
// opaque ids, record types, counts and error kinds.

use std::fs;
use std::path::Path;

/// Field names and interpolations that MUST NOT appear in tracing macro arguments.
const PHI_PATTERNS: &[&str] = &[
    // Identifiers and contact data
    "user_id",
    "userId",
    "patient_name",
    "email",
    "phone",
    "address",
    "date_of_birth",
    // Record content
    "symptom",
    "stuff_consumed",
    "food_consumed",
    "reported",
    "pre_existing_conditions",
    "conditions()",
    "fields",
    "notes",
    // Prompt and generation content
    "token_map",
    "prompt.text",
    "generated_text",
    "cleaned",
    "system_prompt",
    // Credentials
    "api_key",
    // Error Display/Debug can quote offending values; log `e.kind()` instead
    "= %e,",
    "= ?e,",
    "= %err,",
    "= ?err,",
    "= %error,",
    "= ?error,",
];

/// Files that name the patterns outside of tracing calls.
const ALLOWLIST: &[&str] = &["phi_audit.rs"];

const TRACING_MACROS: &[&str] = &[
    "tracing::info!",
    "tracing::warn!",
    "tracing::error!",
    "tracing::debug!",
    "tracing::trace!",
];

#[test]
fn no_phi_in_tracing_calls() {
    let src_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    assert!(src_dir.exists(), "Source directory not found: {}", src_dir.display());

    let mut violations = Vec::new();
    scan_directory(&src_dir, &src_dir, &mut violations);

    if !violations.is_empty() {
        let report = violations
            .iter()
            .map(|(file, line_num, line, pattern)| {
                format!("  {file}:{line_num}: found '{pattern}' in: {}", line.trim())
            })
            .collect::<Vec<_>>()
            .join("\n");
        panic!(
            "PHI AUDIT FAILED: {} violation(s) found in tracing calls:\n{report}\n\n\
             Fix: log opaque ids, counts or error kinds instead.",
            violations.len()
        );
    }
}

#[test]
fn scanner_detects_known_violation() {
    let source = "fn f() {\n    tracing::info!(\n        symptom = %record.symptom,\n        \"logged\"\n    );\n}\n";
    let hits = violations_in(source);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0, 2);
    assert_eq!(hits[0].2, "symptom");
}

#[test]
fn scanner_passes_clean_tracing() {
    let source = r#"tracing::info!(record_id = %event.record_id, error_kind = e.kind(), "Insight generated");"#;
    assert!(violations_in(source).is_empty());
}

#[test]
fn scanner_rejects_error_display() {
    let source = r#"tracing::warn!(record_id = %id, error = %e, "Profile lookup failed");"#;
    let hits = violations_in(source);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].2, "= %e,");
}

#[test]
fn scanner_ignores_non_tracing_lines() {
    let source = "let symptom = record.fields.get(\"symptom\");\n";
    assert!(violations_in(source).is_empty());
}

fn scan_directory(root: &Path, dir: &Path, violations: &mut Vec<(String, usize, String, String)>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            scan_directory(root, &path, violations);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            let filename = path.file_name().unwrap_or_default().to_string_lossy();
            if ALLOWLIST.iter().any(|a| filename.contains(a)) {
                continue;
            }
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            let relative = path.strip_prefix(root).unwrap_or(&path).display().to_string();
            for (line, call, pattern) in violations_in(&content) {
                violations.push((relative.clone(), line, call, pattern.to_string()));
            }
        }
    }
}

/// (1-indexed start line, full call text, matched pattern) per violation.
fn violations_in(content: &str) -> Vec<(usize, String, &'static str)> {
    let lines: Vec<&str> = content.lines().collect();
    let mut found = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let trimmed = lines[i].trim();
        if !TRACING_MACROS.iter().any(|m| trimmed.starts_with(m)) {
            i += 1;
            continue;
        }

        // Collect the full macro call, which may span lines.
        let mut call = String::from(trimmed);
        let mut depth = paren_delta(trimmed);
        let mut j = i + 1;
        while depth > 0 && j < lines.len() {
            let next = lines[j].trim();
            call.push(' ');
            call.push_str(next);
            depth += paren_delta(next);
            j += 1;
        }

        for pattern in PHI_PATTERNS {
            if call.contains(pattern) {
                found.push((i + 1, call.clone(), *pattern));
            }
        }
        i = j;
    }
    found
}

fn paren_delta(line: &str) -> i32 {
    line.chars().fold(0, |depth, ch| match ch {
        '(' => depth + 1,
        ')' => depth - 1,
        _ => depth,
    })
}
