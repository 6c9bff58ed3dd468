//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// Substitution is a single pass per key; values are never re-expanded.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;
  while let Some(start) = rest.find('{') {
    out.push_str(&rest[..start]);
    let after = &rest[start + 1..];
    let replaced = after.find('}').and_then(|end| {
      let key = &after[..end];
      pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| (*v, end))
    });
    match replaced {
      Some((value, end)) => {
        out.push_str(value);
        rest = &after[end + 1..];
      }
      None => {
        out.push('{');
        rest = after;
      }
    }
  }
  out.push_str(rest);
  out
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with whole model responses.
pub fn trunc_for_log(s: &str, max_chars: usize) -> String {
  match s.char_indices().nth(max_chars) {
    None => s.to_string(),
    Some((cut, _)) => format!("{}… ({} bytes total)", &s[..cut], s.len()),
  }
}
