//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use blocksync_testkit::MARKDOWN_FIXTURES;

/// Concatenates every markdown fixture `copies` times into one document.
pub fn large_document(copies: usize) -> String {
    let mut out = String::new();
    for i in 0..copies {
        out.push_str(&format!("# Section {i}\n\n"));
        for (_, body) in MARKDOWN_FIXTURES {
            out.push_str(body);
            out.push('\n');
        }
    }
    out
}

/// Source text of `lines` numbered lines, for code splitting.
pub fn code_text(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("let value_{i} = compute({i}, \"some padding text\");"))
        .collect::<Vec<_>>()
        .join("\n")
}
