//! Rendering solver failures for humans.
//!
//! The solver returns structured errors and never prints. Whatever drives it
//! (the REPL, the file checker) converts each error into a [`Report`]: a
//! stable code, a headline phrased in terms of the user's types, optional
//! context notes, and an optional source span the driver supplies. Nothing
//! here inspects solver internals, so inference variables never leak into
//! user-facing text.

use std::fmt;

// ---------------------------------------------------------------------------
// Spans
// ---------------------------------------------------------------------------

/// A byte range in the source being checked.
///
/// The solver knows nothing about source text; the driver records where the
/// failing constraint came from and attaches it to the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: u32,
    pub len: u32,
}

impl Span {
    pub fn new(start: u32, len: u32) -> Self {
        Self { start, len }
    }

    pub fn end(self) -> u32 {
        self.start + self.len
    }
}

// ---------------------------------------------------------------------------
// Codes
// ---------------------------------------------------------------------------

/// Stable identifiers for everything the solver can complain about.
///
/// Codes are part of the tool's interface — tests and editor integrations
/// match on them — so variants are never renumbered, only appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Code {
    /// Equality or subtyping constraints cannot hold together.
    Mismatch,
    /// Only an infinitely nested type could satisfy the constraints.
    Cyclic,
    /// A concrete base type lacks a required qualifier.
    UnqualifiedBase,
    /// No type built with the given constructor can carry the qualifier.
    UnqualifiedShape,
    /// A qualifier was demanded of a variable that must stay fully general.
    RigidVariable,
    /// A type synonym was referenced but never defined.
    UndefinedSynonym,
}

impl Code {
    /// The identifier printed in brackets, e.g. `T0203`.
    pub fn id(self) -> &'static str {
        match self {
            Code::Mismatch => "T0201",
            Code::Cyclic => "T0202",
            Code::UnqualifiedBase => "T0203",
            Code::UnqualifiedShape => "T0204",
            Code::RigidVariable => "T0205",
            Code::UndefinedSynonym => "T0206",
        }
    }

    /// One advisory line appended to every rendered report.
    pub fn hint(self) -> &'static str {
        match self {
            Code::Mismatch => {
                "check that both sides of the offending expression can share a type"
            }
            Code::Cyclic => {
                "a type would have to contain itself; name an intermediate type to break the cycle"
            }
            Code::UnqualifiedBase => {
                "switch to a base type with the capability, for instance Int rather than Nat when subtracting"
            }
            Code::UnqualifiedShape => {
                "apply the operation to a value whose type supports it"
            }
            Code::RigidVariable => {
                "add the qualifier to the definition's type signature instead"
            }
            Code::UndefinedSynonym => "define the synonym before using it, or fix the spelling",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// A solver failure ready to show.
///
/// There is exactly one report per failed solve — the solver stops at its
/// first unsatisfiable constraint — so this type doubles as the error the
/// driver propagates. `Display` is the compact one-line form; [`render`]
/// produces the full block.
///
/// [`render`]: Report::render
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[{}] {}", .code.id(), .headline)]
pub struct Report {
    pub code: Code,
    /// What went wrong, in terms of the user's types.
    pub headline: String,
    /// Extra context lines, most specific first.
    pub notes: Vec<String>,
    /// Where in the source, when the driver knows.
    pub span: Option<Span>,
}

impl Report {
    pub fn new(code: Code, headline: impl Into<String>) -> Self {
        Self {
            code,
            headline: headline.into(),
            notes: Vec::new(),
            span: None,
        }
    }

    /// Append a context line.
    pub fn note(mut self, line: impl Into<String>) -> Self {
        self.notes.push(line.into());
        self
    }

    /// Attach the source range the failing constraint came from.
    pub fn at(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// The full multi-line form: headline, span, notes, then the code's
    /// hint.
    pub fn render(&self) -> String {
        let mut out = format!("error[{}]: {}", self.code.id(), self.headline);
        if let Some(span) = self.span {
            out.push_str(&format!("\n  --> bytes {}..{}", span.start, span.end()));
        }
        for note in &self.notes {
            out.push_str("\n  note: ");
            out.push_str(note);
        }
        out.push_str("\n  help: ");
        out.push_str(self.code.hint());
        out
    }
}
