//! A hand-maintained table of standard-library import paths to their
//! declared package name, and the reverse index the Auto-Importer consults
//! (spec.md §4.2).
//!
//! This intentionally includes packages whose declared name collides with
//! another package's (`rand`, `template`, `scanner`, `parser`) — the
//! ambiguity is the point: `RevStdlib` surfaces it so the Auto-Importer can
//! refuse to guess.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// `(import path, package name)`.
const STDLIB: &[(&str, &str)] = &[
    ("bufio", "bufio"),
    ("bytes", "bytes"),
    ("context", "context"),
    ("crypto", "crypto"),
    ("crypto/aes", "aes"),
    ("crypto/hmac", "hmac"),
    ("crypto/md5", "md5"),
    ("crypto/rand", "rand"),
    ("crypto/sha1", "sha1"),
    ("crypto/sha256", "sha256"),
    ("encoding", "encoding"),
    ("encoding/base64", "base64"),
    ("encoding/binary", "binary"),
    ("encoding/csv", "csv"),
    ("encoding/gob", "gob"),
    ("encoding/hex", "hex"),
    ("encoding/json", "json"),
    ("errors", "errors"),
    ("flag", "flag"),
    ("fmt", "fmt"),
    ("go/ast", "ast"),
    ("go/build", "build"),
    ("go/parser", "parser"),
    ("go/scanner", "scanner"),
    ("go/token", "token"),
    ("go/types", "types"),
    ("html", "html"),
    ("html/template", "template"),
    ("io", "io"),
    ("io/fs", "fs"),
    ("io/ioutil", "ioutil"),
    ("log", "log"),
    ("math", "math"),
    ("math/big", "big"),
    ("math/bits", "bits"),
    ("math/rand", "rand"),
    ("net", "net"),
    ("net/http", "http"),
    ("net/url", "url"),
    ("os", "os"),
    ("os/exec", "exec"),
    ("path", "path"),
    ("path/filepath", "filepath"),
    ("reflect", "reflect"),
    ("regexp", "regexp"),
    ("runtime", "runtime"),
    ("sort", "sort"),
    ("strconv", "strconv"),
    ("strings", "strings"),
    ("sync", "sync"),
    ("sync/atomic", "atomic"),
    ("syscall", "syscall"),
    ("testing", "testing"),
    ("text/scanner", "scanner"),
    ("text/template", "template"),
    ("time", "time"),
    ("unicode", "unicode"),
    ("unicode/utf8", "utf8"),
];

static STDLIB_BY_PATH: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| STDLIB.iter().copied().collect());

static STDLIB_BY_NAME: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    let mut rev: HashMap<&'static str, Vec<&'static str>> = HashMap::new();
    for (path, name) in STDLIB {
        rev.entry(name).or_default().push(path);
    }
    rev
});

/// `Stdlib`: import path -> declared package name.
pub fn package_name(import_path: &str) -> Option<&'static str> {
    STDLIB_BY_PATH.get(import_path).copied()
}

/// `RevStdlib`: declared package name -> every stdlib import path that
/// exposes it. The Auto-Importer only trusts this when the result has
/// exactly one entry.
pub fn paths_for_name(name: &str) -> &'static [&'static str] {
    static EMPTY: &[&str] = &[];
    STDLIB_BY_NAME.get(name).map(|v| v.as_slice()).unwrap_or(EMPTY)
}

/// The single unambiguous stdlib import path that would bring `name` into
/// scope, if one exists.
pub fn unambiguous_import_for_name(name: &str) -> Option<&'static str> {
    match paths_for_name(name) {
        [only] => Some(*only),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unambiguous_name_resolves() {
        assert_eq!(unambiguous_import_for_name("fmt"), Some("fmt"));
        assert_eq!(unambiguous_import_for_name("ioutil"), Some("io/ioutil"));
    }

    #[test]
    fn ambiguous_names_are_not_auto_importable() {
        assert_eq!(unambiguous_import_for_name("rand"), None);
        assert_eq!(unambiguous_import_for_name("template"), None);
        assert_eq!(unambiguous_import_for_name("scanner"), None);
    }
}
