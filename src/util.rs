//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Model replies sometimes wrap JSON in Markdown fences (```json ... ```).
/// Returns the inner payload, trimmed.
pub fn strip_code_fences(s: &str) -> &str {
  let t = s.trim();
  let Some(rest) = t.strip_prefix("```") else { return t };
  // Drop the info string ("json", "JSON", ...) up to the first newline.
  let rest = match rest.find('\n') {
    Some(nl) => &rest[nl + 1..],
    None => rest,
  };
  rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Round half away from zero to `decimals` places.
pub fn round_to(x: f64, decimals: i32) -> f64 {
  let factor = 10f64.powi(decimals);
  (x * factor).round() / factor
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut end = max;
  while !s.is_char_boundary(end) { end -= 1; }
  format!("{}… ({} bytes total)", &s[..end], s.len())
}
