//! Maps free-form model output onto a legal direction.
//!
//! Passes run in priority order and the first match wins. When the text
//! yields nothing a positional fallback picks a legal move, so the only
//! failure is an empty legal set.

use derive_more::{Display, Error};
use llm2048_board::{Direction, LegalMoves};
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::{debug, instrument, warn};

/// Which pass produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ResolvedBy {
    /// A whole token equalled a legal direction name.
    #[display("exact token")]
    ExactToken,
    /// A legal direction name appeared inside the text.
    #[display("substring")]
    Substring,
    /// The text shared at least one letter with a legal direction name.
    #[display("character overlap")]
    CharacterOverlap,
    /// Nothing in the text was usable.
    #[display("fallback")]
    Fallback,
}

/// A direction together with the pass that chose it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// The chosen legal direction.
    pub direction: Direction,
    /// The pass that matched.
    pub pass: ResolvedBy,
}

/// Raised only when the legal set is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
#[display("no legal moves to resolve against")]
pub struct NoLegalMoves;

/// Model output after cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    /// Upper-case words with markup and punctuation removed.
    pub tokens: Vec<String>,
    /// Tokens joined by single spaces.
    pub text: String,
}

type Pass = fn(&Normalized, LegalMoves) -> Option<Direction>;

/// Text passes in priority order.
const PASSES: [(ResolvedBy, Pass); 3] = [
    (ResolvedBy::ExactToken, exact_token),
    (ResolvedBy::Substring, substring),
    (ResolvedBy::CharacterOverlap, character_overlap),
];

/// Fallback preference; corner-building moves first.
const FALLBACK_ORDER: [Direction; 3] = [Direction::Right, Direction::Down, Direction::Left];

/// Resolves `raw` against `legal`.
#[instrument(skip(raw, rng), fields(raw_len = raw.len(), legal = %legal))]
pub fn resolve<R: Rng + ?Sized>(
    raw: &str,
    legal: LegalMoves,
    rng: &mut R,
) -> Result<Resolution, NoLegalMoves> {
    if legal.is_empty() {
        warn!("Resolver called with no legal moves");
        return Err(NoLegalMoves);
    }

    let normalized = normalize(raw);
    for (pass, matcher) in PASSES {
        if let Some(direction) = matcher(&normalized, legal) {
            debug!(%direction, %pass, "Resolved model output");
            return Ok(Resolution { direction, pass });
        }
    }

    let direction = fallback(legal, rng);
    warn!(%direction, text = %normalized.text, "Model output unusable, using fallback");
    Ok(Resolution {
        direction,
        pass: ResolvedBy::Fallback,
    })
}

/// Upper-cases, drops reasoning blocks and markup, and splits into words.
pub fn normalize(raw: &str) -> Normalized {
    let stripped = strip_think_blocks(raw);
    let cleaned: String = stripped
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                ' '
            }
        })
        .collect();
    let tokens: Vec<String> = cleaned.split_whitespace().map(str::to_string).collect();
    let text = tokens.join(" ");
    Normalized { tokens, text }
}

/// Removes `<think>...</think>` spans; an unterminated span runs to the end.
fn strip_think_blocks(raw: &str) -> String {
    const OPEN: &str = "<think>";
    const CLOSE: &str = "</think>";

    let lower = raw.to_ascii_lowercase();
    let mut out = String::with_capacity(raw.len());
    let mut cursor = 0;
    while let Some(start) = lower[cursor..].find(OPEN).map(|i| i + cursor) {
        out.push_str(&raw[cursor..start]);
        match lower[start..].find(CLOSE) {
            Some(end) => cursor = start + end + CLOSE.len(),
            None => return out,
        }
    }
    out.push_str(&raw[cursor..]);
    out
}

fn exact_token(normalized: &Normalized, legal: LegalMoves) -> Option<Direction> {
    normalized
        .tokens
        .iter()
        .find_map(|token| legal.iter().find(|d| d.name() == token.as_str()))
}

fn substring(normalized: &Normalized, legal: LegalMoves) -> Option<Direction> {
    legal.iter().find(|d| normalized.text.contains(d.name()))
}

fn character_overlap(normalized: &Normalized, legal: LegalMoves) -> Option<Direction> {
    legal
        .iter()
        .find(|d| d.name().chars().any(|c| normalized.text.contains(c)))
}

fn fallback<R: Rng + ?Sized>(legal: LegalMoves, rng: &mut R) -> Direction {
    FALLBACK_ORDER
        .into_iter()
        .find(|&d| legal.contains(d))
        .or_else(|| legal.to_vec().choose(rng).copied())
        .unwrap_or(Direction::Up)
}
