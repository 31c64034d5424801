//! Stored file naming.

use chrono::{DateTime, Utc};

/// Stem used when nothing usable survives sanitizing.
const FALLBACK_STEM: &str = "archivo";

/// Longest sanitized stem kept in a stored name.
const MAX_STEM_LEN: usize = 60;

/// Longest sanitized prefix kept in a stored name.
const MAX_PREFIX_LEN: usize = 50;

/// Longest sanitized extension kept in a stored name.
const MAX_EXT_LEN: usize = 10;

/// Fold the accented Latin letters used in Spanish names to plain ASCII.
pub fn fold_accents(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'Á' | 'À' | 'Ä' | 'Â' => 'A',
        'É' | 'È' | 'Ë' | 'Ê' => 'E',
        'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
        'Ó' | 'Ò' | 'Ö' | 'Ô' => 'O',
        'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
        'Ñ' => 'N',
        other => other,
    }
}

/// Reduce a client-supplied name to `[A-Za-z0-9._-]`, without leading dots.
///
/// Accented letters are folded, whitespace becomes `_`, path separators and
/// everything else are dropped.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(fold_accents)
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                Some(c)
            } else if c.is_whitespace() {
                Some('_')
            } else {
                None
            }
        })
        .collect();

    cleaned.trim_start_matches('.').to_string()
}

/// Split a name into stem and lowercased extension.
pub fn split_extension(name: &str) -> (String, Option<String>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            (stem.to_string(), Some(ext.to_ascii_lowercase()))
        }
        _ => (name.to_string(), None),
    }
}

fn truncated(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Build a stored name: `{prefix}_{stem}_{YYYYmmdd_HHMMSS}_{8 hex}.{ext}`.
///
/// An empty prefix is omitted. The hex suffix comes from a fresh UUID, so two
/// calls in the same second still differ.
pub fn stored_file_name(prefix: &str, original_name: &str, at: DateTime<Utc>) -> String {
    let base = original_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let (raw_stem, raw_ext) = split_extension(base);
    let ext = raw_ext
        .map(|e| truncated(&sanitize_file_name(&e), MAX_EXT_LEN))
        .filter(|e| !e.is_empty());

    let mut stem = truncated(&sanitize_file_name(&raw_stem), MAX_STEM_LEN);
    if stem.is_empty() {
        stem = FALLBACK_STEM.to_string();
    }

    let prefix = truncated(&sanitize_file_name(prefix), MAX_PREFIX_LEN);
    let suffix = &uuid::Uuid::new_v4().simple().to_string()[..8];
    let timestamp = at.format("%Y%m%d_%H%M%S");

    let mut name = if prefix.is_empty() {
        format!("{}_{}_{}", stem, timestamp, suffix)
    } else {
        format!("{}_{}_{}_{}", prefix, stem, timestamp, suffix)
    };
    if let Some(ext) = ext {
        name.push('.');
        name.push_str(&ext);
    }
    name
}

/// A name is safe to join onto a store directory if it is a single plain component.
pub fn is_safe_stored_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}
