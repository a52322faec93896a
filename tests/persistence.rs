//! End-to-end: transaction file to snapshot files and back.

use std::collections::BTreeMap;
use std::path::Path;

use schematree::{
    build_from_path, load, save, BuildConfig, Error, Format, ModelRegistry, SchemaTree,
};

const CORPUS: &str = "\
P31\tP21\tP569\ts/Q5\to/Q6581097
P31\tP21\ts/Q5
P31\tP17\to/Q6256
P31\tP21\tP569\tP570\ts/Q5
P17\tP131
P31\ts/Q5\ts/Q5

P31\tP569\ts/Q5
";

fn write_corpus(directory: &Path) -> std::path::PathBuf {
    let path = directory.join("people.tsv");
    std::fs::write(&path, CORPUS).unwrap();
    path
}

/// Support of every node, keyed by the names on its path.
fn supports(tree: &SchemaTree) -> BTreeMap<Vec<String>, u32> {
    tree.preorder()
        .map(|node| {
            let path = node.path();
            let names = tree.dictionary().names(&path).map(str::to_string).collect();
            (names, node.support())
        })
        .collect()
}

#[test]
fn snapshot_files_round_trip() {
    let directory = tempfile::tempdir().unwrap();
    let input = write_corpus(directory.path());
    let tree = build_from_path(&input, &BuildConfig::default().with_workers(4)).unwrap();
    assert_eq!(tree.transactions(), 8);
    assert_eq!(tree.dictionary().resolve("P31").unwrap().count(), 6);

    for format in Format::ALL {
        let path = directory.path().join(format.file_name("people"));
        save(&tree, &path, format).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded.dictionary(), tree.dictionary());
        assert_eq!(loaded.len(), tree.len());
        assert_eq!(supports(&loaded), supports(&tree));
        for item in tree.dictionary().items() {
            assert_eq!(loaded.header_chain(item.id()).count(), tree.header_chain(item.id()).count());
            assert_eq!(loaded.item_support(item.id()), item.count());
        }

        let context = loaded.build_instance(["P31", "P21"], ["s/Q5"]);
        assert_eq!(loaded.support_of(&context), 3);
        let p569 = loaded.dictionary().resolve("P569").unwrap().id();
        assert_eq!(loaded.joint_support(p569, &context), 2);
    }
}

#[test]
fn corrupt_files_fail_to_load() {
    let directory = tempfile::tempdir().unwrap();
    let input = write_corpus(directory.path());
    let tree = build_from_path(&input, &BuildConfig::default()).unwrap();

    for format in Format::ALL {
        let path = directory.path().join(format.file_name("broken"));
        save(&tree, &path, format).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[.. bytes.len() - 6]).unwrap();
        assert!(matches!(load(&path), Err(Error::Truncated { .. } | Error::Corrupt { .. })));
    }
    assert!(matches!(load(directory.path().join("missing.schemaTree.typed.seq")), Err(Error::Io(_))));
}

#[test]
fn registry_serves_models_by_property() {
    let directory = tempfile::tempdir().unwrap();
    let input = write_corpus(directory.path());
    let models = directory.path().join("models");
    std::fs::create_dir(&models).unwrap();

    let tree = build_from_path(&input, &BuildConfig::default()).unwrap();
    save(&tree, models.join(Format::Sequential.file_name("P569")), Format::Sequential).unwrap();
    save(&tree, models.join(Format::Structured.file_name("P17")), Format::Structured).unwrap();
    std::fs::write(models.join("people.tsv"), CORPUS).unwrap();

    let registry = ModelRegistry::load_dir(&models).unwrap();
    assert_eq!(registry.len(), 2);

    let (model, instance) = registry
        .qualifier_instance("P569", ["P21", "P9999"], ["Q5"], Vec::<&str>::new())
        .unwrap();
    let names: Vec<&str> = model.dictionary().names(&instance).collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"P21") && names.contains(&"s/Q5"));
    assert_eq!(model.support_of(&instance), 3);
    assert!(registry.qualifier_instance("P570", ["P21"], ["Q5"], ["Q6"]).is_none());
}

#[test]
fn bad_tokens_abort_the_build() {
    let directory = tempfile::tempdir().unwrap();
    let input = directory.path().join("bad.tsv");
    std::fs::write(&input, "P31\ts/Q5\nP31\tQ5\n").unwrap();
    let result = build_from_path(&input, &BuildConfig::default());
    assert!(matches!(result, Err(Error::UnrecognizedToken { line: 2, ref token }) if token == "Q5"));
}
