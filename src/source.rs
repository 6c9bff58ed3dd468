//! The text to learn from, and the learning objective that goes with it.

use std::path::Path;

use tracing::debug;

use crate::error::SourceError;

/// Validated workflow input. Neither field is blank.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceText {
  text: String,
  objective: String,
}

impl SourceText {
  pub fn new(text: impl Into<String>, objective: impl Into<String>) -> Result<Self, SourceError> {
    let objective = objective.into().trim().to_string();
    if objective.is_empty() {
      return Err(SourceError::EmptyObjective);
    }
    Ok(Self { text: text.into(), objective })
  }

  pub fn text(&self) -> &str {
    &self.text
  }

  pub fn objective(&self) -> &str {
    &self.objective
  }
}

/// Read a UTF-8 text file verbatim, rejecting missing, non-file and blank inputs.
pub fn load_source(path: &Path) -> Result<String, SourceError> {
  if !path.exists() {
    return Err(SourceError::NotFound(path.to_path_buf()));
  }
  if !path.is_file() {
    return Err(SourceError::NotAFile(path.to_path_buf()));
  }
  let text = std::fs::read_to_string(path)
    .map_err(|source| SourceError::Read { path: path.to_path_buf(), source })?;
  if text.trim().is_empty() {
    return Err(SourceError::Empty(path.to_path_buf()));
  }
  debug!(path = %path.display(), bytes = text.len(), "Loaded source text");
  Ok(text)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reads_text_verbatim() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "  keep my spacing\n").expect("write");
    assert_eq!(load_source(&path).expect("load"), "  keep my spacing\n");
  }

  #[test]
  fn rejects_missing_paths_and_directories() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("nope.txt");
    assert!(matches!(load_source(&missing), Err(SourceError::NotFound(_))));
    let err = load_source(dir.path()).expect_err("dir");
    assert!(err.to_string().starts_with("path is not a file"));
  }

  #[test]
  fn rejects_blank_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    for (name, content) in [("empty.txt", ""), ("ws.txt", "   \n\t  ")] {
      let path = dir.path().join(name);
      std::fs::write(&path, content).expect("write");
      let err = load_source(&path).expect_err("blank");
      assert!(err.to_string().starts_with("input file is empty"), "{err}");
    }
  }

  #[test]
  fn rejects_non_utf8() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bin.dat");
    std::fs::write(&path, [0xff, 0xfe, 0x00]).expect("write");
    assert!(matches!(load_source(&path), Err(SourceError::Read { .. })));
  }

  #[test]
  fn objective_is_trimmed_and_required() {
    let src = SourceText::new("text", "  basic biology ").expect("source");
    assert_eq!(src.objective(), "basic biology");
    assert_eq!(src.text(), "text");
    assert!(matches!(SourceText::new("text", " "), Err(SourceError::EmptyObjective)));
  }
}
