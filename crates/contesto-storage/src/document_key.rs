//! Deterministic storage keys for fine documents.
//!
//! Key layout: `{owner-slug}/{timestamp}-{token}-{name}.{ext}`, all
//! ASCII. Slugging strips diacritics so storage paths never carry
//! fragile characters.

use rand::distr::Alphanumeric;
use rand::Rng;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const DEFAULT_FOLDER_SLUG: &str = "utilisateur";
const DEFAULT_FILE_BASE: &str = "document";
const DEFAULT_FILE_EXTENSION: &str = "bin";

fn remove_diacritics(value: &str) -> String {
    value.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Lowercase, replace non-alphanumeric runs with a single `-`, trim
/// leading and trailing dashes.
fn sanitize_slug_part(value: &str) -> String {
    let ascii = remove_diacritics(value).to_lowercase();
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;
    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn split_original_file_name(original_file_name: &str) -> (String, String) {
    let trimmed = original_file_name.trim();
    if trimmed.is_empty() {
        return (
            DEFAULT_FILE_BASE.to_string(),
            DEFAULT_FILE_EXTENSION.to_string(),
        );
    }

    match trimmed.rfind('.') {
        Some(dot) if dot > 0 && dot < trimmed.len() - 1 => (
            trimmed[..dot].to_string(),
            trimmed[dot + 1..].to_string(),
        ),
        _ => (trimmed.to_string(), DEFAULT_FILE_EXTENSION.to_string()),
    }
}

fn create_short_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}

fn build_key(
    first_name: &str,
    last_name: &str,
    original_file_name: &str,
    timestamp_ms: i64,
    token: &str,
) -> String {
    let folder_slug = {
        let slug = sanitize_slug_part(&format!("{}-{}", first_name, last_name));
        if slug.is_empty() {
            DEFAULT_FOLDER_SLUG.to_string()
        } else {
            slug
        }
    };

    let (base, extension) = split_original_file_name(original_file_name);
    let safe_base = {
        let slug = sanitize_slug_part(&base);
        if slug.is_empty() {
            DEFAULT_FILE_BASE.to_string()
        } else {
            slug
        }
    };
    let safe_extension = {
        let ext: String = remove_diacritics(&extension)
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        if ext.is_empty() {
            DEFAULT_FILE_EXTENSION.to_string()
        } else {
            ext
        }
    };

    format!(
        "{}/{}-{}-{}.{}",
        folder_slug, timestamp_ms, token, safe_base, safe_extension
    )
}

/// Build the storage key for a fine document, folded under a slug of
/// the owner's name and made unique with a millisecond timestamp plus
/// a short random token.
pub fn build_fine_document_key(
    first_name: &str,
    last_name: &str,
    original_file_name: &str,
) -> String {
    build_key(
        first_name,
        last_name,
        original_file_name,
        chrono::Utc::now().timestamp_millis(),
        &create_short_token(),
    )
}
