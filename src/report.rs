//! Markdown preview of a finalized flashcard set.

use std::fmt::Write as _;
use std::path::Path;

use crate::domain::FlashcardList;
use crate::error::OutputError;

pub fn render_markdown(cards: &FlashcardList) -> String {
  let mut out = String::new();
  out.push_str("# Flashcards Preview\n\n");
  let _ = write!(out, "Total cards: {}\n\n", cards.len());
  out.push_str("---\n\n");
  for (idx, card) in cards.iter().enumerate() {
    let _ = write!(
      out,
      "## Card {}\n\n**Q:** {}\n\n**A:** {}\n\n---\n\n",
      idx + 1,
      card.question(),
      card.answer()
    );
  }
  out
}

pub fn write_markdown(cards: &FlashcardList, path: &Path) -> Result<(), OutputError> {
  std::fs::write(path, render_markdown(cards))
    .map_err(|source| OutputError { path: path.to_path_buf(), source })
}
