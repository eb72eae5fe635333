//! end-to-end instrumentation tests

use gosloppy_rs::patch::{render_file, ParsedFile};
use gosloppy_rs::resolver::ImportResolver;
use gosloppy_rs::scope::walk;
use gosloppy_rs::visitors::autoimport::AutoImporter;
use gosloppy_rs::visitors::must_transform::MustTransform;
use gosloppy_rs::visitors::unused::{patch_unused_imports, UnusedFinder};
use std::io::Write;

fn write_source(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    path
}

fn instrument(path: &std::path::Path) -> String {
    let parsed = ParsedFile::parse(path).unwrap();
    let resolver = ImportResolver::new(vec![]);

    let mut unused = UnusedFinder::new();
    walk(&parsed, &mut unused);
    let used_imports = unused.used_imports().clone();
    let mut batch = unused.into_patch_batch();
    patch_unused_imports(&mut batch, &parsed, &resolver, &used_imports);

    let mut auto_importer = AutoImporter::new(&parsed, &resolver);
    walk(&parsed, &mut auto_importer);
    for patch in auto_importer.into_patch_batch().iter() {
        batch.append_no_contradict(patch.clone());
    }

    let mut must_transform = MustTransform::new(&parsed, "must".to_string());
    walk(&parsed, &mut must_transform);
    let (must_patches, _diagnostics) = must_transform.into_parts();
    for patch in must_patches.iter() {
        batch.append_no_contradict(patch.clone());
    }

    String::from_utf8(render_file(&parsed, &batch).unwrap()).unwrap()
}

#[test]
fn unused_local_variable_is_patched_so_the_file_still_compiles() {
    let dir = tempfile::tempdir().unwrap();
    let src = r#"package main

func main() {
	x := 1
	println("hello")
}
"#;
    let path = write_source(&dir, "main.go", src);
    let rendered = instrument(&path);
    assert!(rendered.contains("x := 1"));
    assert!(rendered.contains("_ = x"));
}

#[test]
fn unused_import_is_patched_with_a_blank_reference() {
    let dir = tempfile::tempdir().unwrap();
    let src = r#"package main

import "fmt"

func main() {
	println("hello")
}
"#;
    let path = write_source(&dir, "main.go", src);
    let rendered = instrument(&path);
    assert!(rendered.contains("_ \"fmt\""));
}

#[test]
fn must_short_var_decl_is_rewritten_to_explicit_error_handling() {
    let dir = tempfile::tempdir().unwrap();
    let src = r#"package main

import "os"

func main() {
	f := must(os.Open("x.txt"))
	_ = f
}
"#;
    let path = write_source(&dir, "main.go", src);
    let rendered = instrument(&path);
    assert!(rendered.contains("!= nil { panic("));
    assert!(!rendered.contains("must(os.Open"));
}

#[test]
fn used_variable_and_import_are_left_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let src = r#"package main

import "fmt"

func main() {
	x := 1
	fmt.Println(x)
}
"#;
    let path = write_source(&dir, "main.go", src);
    let rendered = instrument(&path);
    assert!(!rendered.contains("_ = x"));
    assert!(!rendered.contains("_ \"fmt\""));
}
