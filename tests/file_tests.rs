use std::fs;

use l10nmerge::codec::{cache_to_file, load_from_file, read_file, write_file};
use l10nmerge::config::ParseOptions;
use l10nmerge::error::Error;
use l10nmerge::formats::Dialect;
use tempfile::TempDir;

#[test]
fn test_write_then_read_preserves_bytes() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source.properties");
    let copy = temp_dir.path().join("copy.properties");
    let content = "# note\r\nkey = caf\\u00e9 \\\n    au lait\r\n\r\nbroken line\n";
    fs::write(&source, content).unwrap();

    let resource = read_file(&source, &ParseOptions::default()).unwrap();
    assert_eq!(resource.dialect, Dialect::Properties);
    assert_eq!(resource.get("key").unwrap().val, "café au lait");
    assert_eq!(resource.junk().count(), 1);

    write_file(&resource, &copy).unwrap();
    assert_eq!(fs::read(&copy).unwrap(), content.as_bytes());
}

#[test]
fn test_read_legacy_encoded_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("legacy.dtd");
    fs::write(&path, b"<!ENTITY greeting \"Gr\xFC\xDFe\">\n").unwrap();

    let options = ParseOptions::default().with_encoding("iso-8859-1");
    let resource = read_file(&path, &options).unwrap();
    assert_eq!(resource.get("greeting").unwrap().val, "Grüße");

    let out = temp_dir.path().join("out.dtd");
    write_file(&resource, &out).unwrap();
    assert_eq!(fs::read(&out).unwrap(), fs::read(&path).unwrap());

    let err = read_file(&path, &ParseOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Encoding(_)));
}

#[test]
fn test_read_file_errors() {
    let temp_dir = TempDir::new().unwrap();

    let unknown = temp_dir.path().join("notes.txt");
    fs::write(&unknown, "hello").unwrap();
    assert!(matches!(
        read_file(&unknown, &ParseOptions::default()),
        Err(Error::UnknownDialect(_))
    ));

    let missing = temp_dir.path().join("missing.ftl");
    assert!(matches!(
        read_file(&missing, &ParseOptions::default()),
        Err(Error::Io(_))
    ));
}

#[test]
fn test_cache_and_load_resources() {
    let temp_dir = TempDir::new().unwrap();
    let ftl = temp_dir.path().join("app.ftl");
    let ini = temp_dir.path().join("updater.ini");
    fs::write(&ftl, "# Comment\nhello = Hello\n    .title = Hi\n").unwrap();
    fs::write(&ini, "[Strings]\nTitle=Update\n").unwrap();

    let resources = vec![
        read_file(&ftl, &ParseOptions::default()).unwrap(),
        read_file(&ini, &ParseOptions::default()).unwrap(),
    ];
    let cache = temp_dir.path().join("cache.json");
    cache_to_file(&resources, &cache).unwrap();

    let loaded = load_from_file(&cache).unwrap();
    assert_eq!(loaded, resources);
    assert_eq!(loaded[0].get("hello").unwrap().attributes[0].raw_val, "Hi");
    assert_eq!(loaded[1].get("Strings.Title").unwrap().val, "Update");
}

#[test]
fn test_load_from_invalid_cache() {
    let temp_dir = TempDir::new().unwrap();
    let cache = temp_dir.path().join("cache.json");
    fs::write(&cache, "{ not json").unwrap();
    assert!(matches!(load_from_file(&cache), Err(Error::Json(_))));
}
