//! Code block language names.

/// Language name for unlabeled code.
pub const PLAIN_TEXT: &str = "plain text";

const ALIASES: &[(&str, &str)] = &[
    ("tsx", "typescript"),
    ("jsx", "javascript"),
    ("ts", "typescript"),
    ("js", "javascript"),
    ("py", "python"),
    ("rb", "ruby"),
    ("sh", "shell"),
    ("bash", "shell"),
    ("zsh", "shell"),
    ("yml", "yaml"),
    ("md", "markdown"),
    ("dockerfile", "docker"),
    ("rs", "rust"),
    ("cs", "c#"),
    ("cpp", "c++"),
    ("h", "c"),
    ("hpp", "c++"),
    ("kt", "kotlin"),
    ("tf", "hcl"),
    ("vim", "vimscript"),
    ("text", PLAIN_TEXT),
    ("txt", PLAIN_TEXT),
    ("plaintext", PLAIN_TEXT),
];

// Language values the remote store accepts.
const KNOWN: &[&str] = &[
    "abap", "arduino", "basic", "c", "clojure", "coffeescript", "c++", "c#", "css", "dart",
    "diff", "docker", "elixir", "elm", "erlang", "flow", "fortran", "f#", "gherkin", "glsl",
    "go", "graphql", "groovy", "haskell", "hcl", "html", "java", "javascript", "json", "julia",
    "kotlin", "latex", "less", "lisp", "livescript", "lua", "makefile", "markdown", "markup",
    "matlab", "mermaid", "nix", "objective-c", "ocaml", "pascal", "perl", "php", PLAIN_TEXT,
    "powershell", "prolog", "protobuf", "python", "r", "reason", "ruby", "rust", "sass",
    "scala", "scheme", "scss", "shell", "sql", "svelte", "swift", "typescript", "vb.net",
    "verilog", "vhdl", "vimscript", "visual basic", "vue", "webassembly", "xml", "yaml",
];

/// Resolves a fence info string to a language the remote store accepts.
///
/// Aliases map to their canonical name; empty and unknown names map to
/// [`PLAIN_TEXT`].
pub fn normalize_language(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    if let Some((_, canonical)) = ALIASES.iter().find(|(alias, _)| *alias == lower) {
        return (*canonical).to_string();
    }
    if KNOWN.contains(&lower.as_str()) {
        lower
    } else {
        PLAIN_TEXT.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve() {
        assert_eq!(normalize_language("ts"), "typescript");
        assert_eq!(normalize_language("PY"), "python");
        assert_eq!(normalize_language(" bash "), "shell");
        assert_eq!(normalize_language("cpp"), "c++");
    }

    #[test]
    fn known_names_pass_through() {
        assert_eq!(normalize_language("rust"), "rust");
        assert_eq!(normalize_language("Go"), "go");
        assert_eq!(normalize_language("plain text"), PLAIN_TEXT);
    }

    #[test]
    fn empty_and_unknown_are_plain_text() {
        assert_eq!(normalize_language(""), PLAIN_TEXT);
        assert_eq!(normalize_language("brainfudge"), PLAIN_TEXT);
    }
}
