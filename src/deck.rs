//! Packaging a finalized flashcard set as an Anki-importable text deck.
//!
//! Uses Anki's plain-text import headers, so File > Import picks the separator,
//! note type and target deck without further prompting.

use std::path::Path;

use crate::domain::FlashcardList;
use crate::error::OutputError;

pub fn render_deck(cards: &FlashcardList, deck_name: &str) -> String {
  let mut out = String::new();
  out.push_str("#separator:tab\n");
  out.push_str("#html:true\n");
  out.push_str("#notetype:Basic\n");
  out.push_str(&format!("#deck:{}\n", header_value(deck_name)));
  out.push_str("#columns:Front\tBack\n");
  for card in cards {
    out.push_str(&escape_field(card.question()));
    out.push('\t');
    out.push_str(&escape_field(card.answer()));
    out.push('\n');
  }
  out
}

pub fn write_deck(cards: &FlashcardList, deck_name: &str, path: &Path) -> Result<(), OutputError> {
  std::fs::write(path, render_deck(cards, deck_name))
    .map_err(|source| OutputError { path: path.to_path_buf(), source })
}

/// HTML-escape a field and keep it on one line.
fn escape_field(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  let mut chars = s.chars().peekable();
  while let Some(ch) = chars.next() {
    match ch {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '\t' => out.push(' '),
      '\r' => {
        if chars.peek() != Some(&'\n') {
          out.push_str("<br>");
        }
      }
      '\n' => out.push_str("<br>"),
      c => out.push(c),
    }
  }
  out
}

fn header_value(s: &str) -> String {
  s.replace(['\r', '\n', '\t'], " ").trim().to_string()
}
