// Pretty diagnostic reporting against constraint source text using ariadne

use crate::checker::diagnostics::{Diagnostic, Severity};
use ariadne::{Color, Label, Report, ReportKind, Source};

/// Report a diagnostic with the constraint text it refers to highlighted.
///
/// `source` is the textual form of the operation specification (as parsed,
/// or the pretty-printed constraint when synthesis built it). The label is
/// placed over the diagnostic's subject fragment when it occurs in the text,
/// over the whole constraint otherwise.
pub fn report_diagnostic(operation: &str, source: &str, diag: &Diagnostic) {
    build_report(source, diag)
        .eprint(Source::from(source))
        .expect("Failed to print diagnostic report");
    eprintln!("  --> operation `{}`", operation);
}

fn subject_span(source: &str, diag: &Diagnostic) -> std::ops::Range<usize> {
    match diag.subject().and_then(|s| source.find(s).map(|at| (at, s.len()))) {
        Some((start, len)) => start..start + len,
        None => 0..source.len(),
    }
}

fn build_report<'a>(source: &str, diag: &Diagnostic) -> Report<'a, std::ops::Range<usize>> {
    let span = subject_span(source, diag);
    let (kind, color) = match diag.severity() {
        Severity::Error => (ReportKind::Error, Color::Red),
        Severity::Warning => (ReportKind::Warning, Color::Yellow),
    };

    let mut report = Report::build(kind, span.clone())
        .with_code(diag.code())
        .with_message(diag.to_string())
        .with_label(
            Label::new(span)
                .with_message(label_text(diag))
                .with_color(color),
        );

    if let Some(help) = help_text(diag) {
        report = report.with_help(help);
    }
    report.finish()
}

fn label_text(diag: &Diagnostic) -> String {
    match diag {
        Diagnostic::UnresolvedName { .. } => "not found in this scope".to_string(),
        Diagnostic::TypeMismatch {
            expected, found, ..
        } => match found {
            Some(found) => format!("expected {}, found `{}`", expected, found),
            None => format!("expected {}", expected),
        },
        Diagnostic::MissingResultType { .. } => "declare a result type".to_string(),
        Diagnostic::EmptyWriteFrame { .. } => "no attribute is assigned here".to_string(),
        Diagnostic::ImplicitLocal { name } => {
            format!("`{}` is declared here implicitly", name)
        }
        Diagnostic::SynthesisGap { .. } => "left as an explicit placeholder".to_string(),
        Diagnostic::AmbiguousMerge { reason, .. } => reason.clone(),
        Diagnostic::NonTotalPrecondition { .. } => {
            "a definedness guard was added around the body".to_string()
        }
    }
}

fn help_text(diag: &Diagnostic) -> Option<String> {
    match diag {
        Diagnostic::UnresolvedName { name, scope } => Some(format!(
            "Declare `{}` as a parameter, attribute or entity visible from {}",
            name, scope
        )),
        Diagnostic::ImplicitLocal { name } => Some(format!(
            "Declare `{}` explicitly if the implicit local is intended",
            name
        )),
        Diagnostic::EmptyWriteFrame { .. } => Some(
            "An update operation should constrain at least one attribute in its postcondition"
                .to_string(),
        ),
        _ => None,
    }
}
