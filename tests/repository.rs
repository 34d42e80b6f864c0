//! Repository tests: search-path resolution, version selection, dependency
//! closures and cross-namespace lookups, all against scratch directories.

mod common;

use common::{ObjectSpec, ScratchDir, TypelibBuilder};
use typescope::schema::BlobType;
use typescope::{Error, Info, Repository};

#[test]
fn require_loads_from_the_search_path() {
    let dir = ScratchDir::new("require");
    let data = TypelibBuilder::new("Solo", "1.0").build();
    dir.write_typelib("Solo", "1.0", &data);

    let repository = Repository::new();
    repository.prepend_search_path(dir.path());

    let typelib = repository.require("Solo", Some("1.0")).unwrap();
    assert_eq!(typelib.namespace(), "Solo");
    assert!(repository.is_registered("Solo"));
    assert_eq!(repository.version("Solo").as_deref(), Some("1.0"));
    assert_eq!(repository.loaded_namespaces(), ["Solo".to_string()]);
    assert!(repository.get_typelib("Solo").is_some());
}

#[test]
fn missing_namespace_is_reported() {
    let repository = Repository::new();
    match repository.require("Nowhere", Some("1.0")) {
        Err(Error::TypelibNotFound { namespace, version }) => {
            assert_eq!(namespace, "Nowhere");
            assert_eq!(version.as_deref(), Some("1.0"));
        }
        other => panic!("expected TypelibNotFound, got {other:?}"),
    }
}

#[test]
fn unversioned_require_picks_the_highest_version() {
    let dir = ScratchDir::new("highest");
    for version in ["1.0", "2.4", "2.14"] {
        let data = TypelibBuilder::new("Multi", version).build();
        dir.write_typelib("Multi", version, &data);
    }

    let repository = Repository::new();
    repository.prepend_search_path(dir.path());

    // 2.14 beats 2.4 numerically, not lexically
    let typelib = repository.require("Multi", None).unwrap();
    assert_eq!(typelib.nsversion(), "2.14");
}

#[test]
fn version_ties_favor_the_earlier_directory() {
    let first = ScratchDir::new("tie-first");
    let second = ScratchDir::new("tie-second");
    let a = TypelibBuilder::new("Tie", "1.0").c_prefix("First").build();
    let b = TypelibBuilder::new("Tie", "1.0").c_prefix("Second").build();
    first.write_typelib("Tie", "1.0", &a);
    second.write_typelib("Tie", "1.0", &b);

    let repository = Repository::new();
    // prepend puts the newest entry first: `first` must end up ahead
    repository.prepend_search_path(second.path());
    repository.prepend_search_path(first.path());

    let typelib = repository.require("Tie", None).unwrap();
    assert_eq!(typelib.c_prefix(), Some("First"));
}

#[test]
fn second_version_conflicts() {
    let dir = ScratchDir::new("conflict");
    for version in ["1.0", "2.0"] {
        let data = TypelibBuilder::new("Pinned", version).build();
        dir.write_typelib("Pinned", version, &data);
    }

    let repository = Repository::new();
    repository.prepend_search_path(dir.path());
    repository.require("Pinned", Some("1.0")).unwrap();

    match repository.require("Pinned", Some("2.0")) {
        Err(Error::VersionConflict {
            namespace,
            loaded,
            requested,
        }) => {
            assert_eq!(namespace, "Pinned");
            assert_eq!(loaded, "1.0");
            assert_eq!(requested, "2.0");
        }
        other => panic!("expected VersionConflict, got {other:?}"),
    }

    // unversioned and matching requires still succeed
    assert!(repository.require("Pinned", None).is_ok());
    assert!(repository.require("Pinned", Some("1.0")).is_ok());
}

#[test]
fn dependencies_load_recursively() {
    let dir = ScratchDir::new("deps");

    let mut base = TypelibBuilder::new("Base", "2.0");
    base.add_enum("Kind", None, &[("A", 0), ("B", 1)]);
    dir.write_typelib("Base", "2.0", &base.build());

    let middle = TypelibBuilder::new("Middle", "1.0").dependency("Base-2.0");
    dir.write_typelib("Middle", "1.0", &middle.build());

    let app = TypelibBuilder::new("App", "1.0").dependency("Middle-1.0");
    dir.write_typelib("App", "1.0", &app.build());

    let repository = Repository::new();
    repository.prepend_search_path(dir.path());
    repository.require("App", None).unwrap();

    assert!(repository.is_registered("Middle"));
    assert!(repository.is_registered("Base"));
    assert_eq!(repository.version("Base").as_deref(), Some("2.0"));
    assert_eq!(
        repository.dependencies("App").unwrap()[0].namespace,
        "Middle"
    );
}

#[test]
fn remote_entries_resolve_across_namespaces() {
    let dir = ScratchDir::new("remote");

    let mut base = TypelibBuilder::new("Base", "1.0");
    base.add_enum("Kind", None, &[("A", 0)]);
    dir.write_typelib("Base", "1.0", &base.build());

    let mut app = TypelibBuilder::new("App", "1.0").dependency("Base-1.0");
    app.remote_entry(BlobType::Enum, "Kind", "Base");
    dir.write_typelib("App", "1.0", &app.build());

    let repository = Repository::new();
    repository.prepend_search_path(dir.path());
    repository.require("App", None).unwrap();

    // looking the name up through App lands in Base
    let info = repository.find_by_name("App", "Kind").unwrap();
    assert_eq!(info.namespace(), "Base");
    assert_eq!(info.kind(), BlobType::Enum);
}

#[test]
fn references_into_unloaded_namespaces_stay_unresolved() {
    let mut builder = TypelibBuilder::new("Lonely", "1.0");
    builder.add_object(
        "Widget",
        "LonelyWidget",
        ObjectSpec {
            interfaces: vec![2], // the remote entry below
            ..ObjectSpec::default()
        },
    );
    builder.remote_entry(BlobType::Interface, "Paintable", "Gone");

    let repository = Repository::new();
    let typelib = typescope::Typelib::from_bytes(builder.build()).unwrap();
    repository.register(typelib).unwrap();

    let info = repository.find_by_name("Lonely", "Widget").unwrap();
    let widget = info.expect_object().unwrap();
    match widget.interface(0).unwrap() {
        Info::Unresolved(unresolved) => {
            assert_eq!(unresolved.namespace, "Gone");
            assert_eq!(unresolved.name, "Paintable");
        }
        other => panic!("expected an unresolved reference, got {other:?}"),
    }
}

#[test]
fn require_private_searches_the_extra_directory() {
    let dir = ScratchDir::new("private");
    let data = TypelibBuilder::new("Hidden", "1.0").build();
    dir.write_typelib("Hidden", "1.0", &data);

    let repository = Repository::new();
    // not on the search path: a plain require cannot see it
    assert!(repository.require("Hidden", None).is_err());

    let typelib = repository
        .require_private(dir.path(), "Hidden", Some("1.0"))
        .unwrap();
    assert_eq!(typelib.namespace(), "Hidden");
    assert!(repository.is_registered("Hidden"));
}

#[test]
fn runtime_type_names_resolve_via_the_c_prefix() {
    let mut builder = TypelibBuilder::new("Ui", "1.0").c_prefix("Ui");
    builder.add_object("Window", "UiWindow", ObjectSpec::default());

    let repository = Repository::new();
    repository
        .register(typescope::Typelib::from_bytes(builder.build()).unwrap())
        .unwrap();

    let info = repository.find_by_runtime_type_name("UiWindow").unwrap();
    assert_eq!(info.name(), "Window");
    assert_eq!(info.kind(), BlobType::Object);

    // second lookup is served from the cache
    let again = repository.find_by_runtime_type_name("UiWindow").unwrap();
    assert_eq!(info, again);

    assert!(repository.find_by_runtime_type_name("UiMissing").is_none());
}

#[test]
fn runtime_type_names_resolve_without_a_prefix_match() {
    // gtype name does not start with the namespace's C prefix, forcing the
    // exhaustive scan
    let mut builder = TypelibBuilder::new("Odd", "1.0").c_prefix("Odd");
    builder.add_enum("Direction", Some("CompassDirection"), &[("NORTH", 0)]);

    let repository = Repository::new();
    repository
        .register(typescope::Typelib::from_bytes(builder.build()).unwrap())
        .unwrap();

    let info = repository
        .find_by_runtime_type_name("CompassDirection")
        .unwrap();
    assert_eq!(info.name(), "Direction");
}

#[test]
fn error_domains_resolve_to_their_enum() {
    let mut builder = TypelibBuilder::new("Io", "1.0");
    builder.add_error_enum("FileError", "io-file-error", &[("NOENT", 1), ("ACCES", 2)]);

    let repository = Repository::new();
    repository
        .register(typescope::Typelib::from_bytes(builder.build()).unwrap())
        .unwrap();

    let file_error = repository.find_by_error_domain("io-file-error").unwrap();
    assert_eq!(file_error.name(), "FileError");
    assert_eq!(file_error.find_value("ACCES").unwrap().value(), 2);

    // cache hit returns the same info
    let again = repository.find_by_error_domain("io-file-error").unwrap();
    assert_eq!(file_error, again);

    assert!(repository.find_by_error_domain("io-other-error").is_none());
}

#[test]
fn isolated_repositories_do_not_share_state() {
    let mut builder = TypelibBuilder::new("Private", "1.0");
    builder.add_enum("Kind", None, &[("A", 0)]);

    let first = Repository::new();
    first
        .register(typescope::Typelib::from_bytes(builder.build()).unwrap())
        .unwrap();

    let second = Repository::new();
    assert!(first.is_registered("Private"));
    assert!(!second.is_registered("Private"));
}
