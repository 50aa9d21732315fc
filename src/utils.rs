// src/utils.rs
use anyhow::Result;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Strip accents and keep `[A-Za-z0-9_]`, turning whitespace into underscores.
pub fn sanitize_filename(input: &str) -> String {
    let ascii: String = input
        .trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    let mut out = String::with_capacity(ascii.len());
    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if (c.is_whitespace() || c == '_' || c == '-') && !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

/// `<Name>_CV_<year>.pdf`, or `cv.pdf` when the name has nothing usable.
pub fn pdf_filename(name: &str, year: i32) -> String {
    let base = sanitize_filename(name);
    if base.is_empty() {
        "cv.pdf".to_string()
    } else {
        format!("{}_CV_{}.pdf", base, year)
    }
}

/// Get file extension in lowercase
pub fn get_file_extension(filename: &str) -> Option<String> {
    std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Validate file extension against allowed types
pub fn validate_file_extension(filename: &str, allowed: &[&str]) -> Result<()> {
    let ext = get_file_extension(filename)
        .ok_or_else(|| anyhow::anyhow!("File has no extension: {}", filename))?;

    if !allowed.contains(&ext.as_str()) {
        anyhow::bail!(
            "Unsupported file extension: {}. Allowed: {:?}",
            ext,
            allowed
        );
    }

    Ok(())
}
