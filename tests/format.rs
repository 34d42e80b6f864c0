//! End-to-end format tests: buffers assembled by the test builder must pass
//! validation whole, and damaged variants must be rejected.

mod common;

use common::{ty, ArgSpec, InterfaceSpec, ObjectSpec, TypelibBuilder};
use typescope::schema::{header::HEADER_SIZE, BlobType};
use typescope::{validate::validate, Error, Typelib};

/// A typelib exercising every entity kind at once.
fn rich_typelib() -> Vec<u8> {
    let mut builder = TypelibBuilder::new("Demo", "1.0")
        .c_prefix("Demo")
        .shared_library("libdemo.so.1")
        .dependency("Base-2.0");

    let sig_add = builder.signature(
        ty::int32(),
        0,
        &[ArgSpec::input("a", ty::int32()), ArgSpec::input("b", ty::int32())],
    );
    builder.add_function("add", "demo_add", sig_add);

    let sig_notify = builder.signature(ty::void(), 0, &[ArgSpec::input("data", ty::utf8())]);
    builder.add_callback("NotifyFunc", sig_notify);

    builder.add_enum("Color", None, &[("RED", 0), ("GREEN", 1), ("BLUE", 2)]);
    builder.add_flags("IoFlags", &[("READ", 1), ("WRITE", 2)]);
    builder.add_error_enum("FileError", "demo-file-error", &[("NOENT", 1), ("ACCES", 2)]);

    builder.add_constant("ANSWER", ty::int32(), &42i32.to_ne_bytes());
    builder.add_constant("GREETING", ty::utf8(), b"hello\0");

    let sig_dist = builder.signature(ty::double(), 0, &[ArgSpec::input("self", ty::utf8())]);
    builder.add_struct(
        "Point",
        8,
        &[("x", ty::int32(), 0), ("y", ty::int32(), 4)],
        &[("distance", "demo_point_distance", sig_dist)],
    );

    builder.add_union(
        "Number",
        8,
        &[("as_int", ty::int32(), 0), ("as_double", ty::double(), 0)],
    );

    // entry 10: the interface; entry 11: the object implementing it
    let sig_draw = builder.signature(ty::void(), 0, &[]);
    builder.add_interface(
        "Drawable",
        "DemoDrawable",
        InterfaceSpec {
            methods: vec![("draw", "demo_drawable_draw", sig_draw)],
            ..InterfaceSpec::default()
        },
    );

    let sig_show = builder.signature(ty::void(), 0, &[]);
    let sig_changed = builder.signature(ty::void(), 0, &[ArgSpec::input("value", ty::int32())]);
    builder.add_object(
        "Window",
        "DemoWindow",
        ObjectSpec {
            interfaces: vec![10],
            fields: vec![("width", ty::int32(), 0)],
            properties: vec![("title", 0b110, ty::utf8())],
            methods: vec![("show", "demo_window_show", sig_show)],
            signals: vec![("changed", 1 << 2, sig_changed)],
            vfuncs: vec![("show", 8, sig_show)],
            constants: vec![("DEFAULT_WIDTH", ty::int32(), 640i32.to_ne_bytes().to_vec())],
            ..ObjectSpec::default()
        },
    );

    builder.remote_entry(BlobType::Enum, "BaseKind", "Base");
    builder.build()
}

#[test]
fn rich_typelib_validates() {
    let data = rich_typelib();
    validate(&data).unwrap();
}

#[test]
fn rich_typelib_loads() {
    let typelib = Typelib::from_bytes(rich_typelib()).unwrap();
    assert_eq!(typelib.namespace(), "Demo");
    assert_eq!(typelib.nsversion(), "1.0");
    assert_eq!(typelib.c_prefix(), Some("Demo"));
    assert_eq!(typelib.shared_library(), &["libdemo.so.1".to_string()]);
    assert_eq!(typelib.dependencies().len(), 1);
    assert_eq!(typelib.dependencies()[0].namespace, "Base");
    assert_eq!(typelib.dependencies()[0].version, "2.0");
    assert_eq!(typelib.n_entries(), 12);
    assert_eq!(typelib.n_local_entries(), 11);
}

#[test]
fn indexed_typelib_validates() {
    let mut builder = TypelibBuilder::new("Indexed", "1.0").with_index();
    let sig = builder.signature(ty::void(), 0, &[]);
    for name in ["alpha", "beta", "gamma", "delta", "epsilon"] {
        builder.add_function(name, &format!("ix_{name}"), sig);
    }
    let data = builder.build();
    validate(&data).unwrap();
}

/// Every truncated prefix must be rejected, even when the declared size is
/// patched to agree with the truncation.
#[test]
fn every_truncation_is_rejected() {
    let data = rich_typelib();

    for len in 0..data.len() {
        let mut cut = data[..len].to_vec();
        if len >= HEADER_SIZE {
            cut[40..44].copy_from_slice(&(len as u32).to_ne_bytes());
        }
        assert!(
            validate(&cut).is_err(),
            "truncation to {len} bytes was accepted"
        );
    }
}

#[test]
fn locals_first_partition_is_enforced() {
    let data = rich_typelib();
    let typelib = Typelib::from_bytes(data.clone()).unwrap();
    let directory = typelib.header().directory as usize;
    let n_entries = usize::from(typelib.n_entries());
    drop(typelib);

    // swap the first (local) and last (non-local) directory records
    let mut damaged = data;
    let first = directory;
    let last = directory + (n_entries - 1) * 12;
    for byte in 0..12 {
        damaged.swap(first + byte, last + byte);
    }

    match validate(&damaged) {
        Err(Error::InvalidDirectory(message)) => {
            assert!(message.contains("partition"), "unexpected message: {message}")
        }
        other => panic!("expected a directory error, got {other:?}"),
    }
}

#[test]
fn unsorted_attribute_table_is_rejected() {
    let mut builder = TypelibBuilder::new("Attrs", "1.0");
    let sig = builder.signature(ty::void(), 0, &[]);
    let first = builder.add_function("first", "at_first", sig);
    let second = builder.add_function("second", "at_second", sig);
    builder.attribute(first, "doc.line", "the first function");
    builder.attribute(second, "doc.line", "the second function");
    let data = builder.build();
    validate(&data).unwrap();

    let typelib = Typelib::from_bytes(data.clone()).unwrap();
    let table = typelib.header().attributes as usize;
    drop(typelib);

    // swap the two attribute records so targets run backwards
    let mut damaged = data;
    for byte in 0..12 {
        damaged.swap(table + byte, table + 12 + byte);
    }

    match validate(&damaged) {
        Err(Error::Malformed { message, .. }) => {
            assert!(message.contains("sorted"), "unexpected message: {message}")
        }
        other => panic!("expected a sort-order error, got {other:?}"),
    }
}

#[test]
fn setter_getter_conflict_is_rejected() {
    let mut builder = TypelibBuilder::new("Conflict", "1.0");
    let sig = builder.signature(ty::void(), 0, &[]);
    // setter and getter bits together are contradictory
    let position = builder.function_blob("broken", "cf_broken", 0b110, 1, sig);
    builder.entry(BlobType::Function, "broken", position);

    assert!(validate(&builder.build()).is_err());
}

#[test]
fn interface_index_zero_is_rejected() {
    let mut builder = TypelibBuilder::new("BadIface", "1.0");
    builder.add_object(
        "Thing",
        "BadThing",
        ObjectSpec {
            interfaces: vec![0],
            ..ObjectSpec::default()
        },
    );

    assert!(validate(&builder.build()).is_err());
}

#[test]
fn parent_must_be_an_object() {
    let mut builder = TypelibBuilder::new("BadParent", "1.0");
    let sig = builder.signature(ty::void(), 0, &[]);
    builder.add_function("boot", "bp_boot", sig); // entry 1
    builder.add_object(
        "Thing",
        "BadParentThing",
        ObjectSpec {
            parent: 1,
            ..ObjectSpec::default()
        },
    );

    assert!(validate(&builder.build()).is_err());
}

#[test]
fn objects_can_derive_from_objects() {
    let mut builder = TypelibBuilder::new("Tree", "1.0");
    builder.add_object("Base", "TreeBase", ObjectSpec::default()); // entry 1
    builder.add_object(
        "Leaf",
        "TreeLeaf",
        ObjectSpec {
            parent: 1,
            ..ObjectSpec::default()
        },
    );

    validate(&builder.build()).unwrap();
}

#[test]
fn implemented_interfaces_must_be_interfaces() {
    let mut builder = TypelibBuilder::new("BadImpl", "1.0");
    builder.add_enum("Kind", None, &[("A", 0)]); // entry 1
    builder.add_object(
        "Thing",
        "BadImplThing",
        ObjectSpec {
            interfaces: vec![1],
            ..ObjectSpec::default()
        },
    );

    assert!(validate(&builder.build()).is_err());
}

#[test]
fn class_struct_must_be_a_struct() {
    let mut builder = TypelibBuilder::new("BadClass", "1.0");
    builder.add_enum("Kind", None, &[("A", 0)]); // entry 1
    builder.add_object(
        "Thing",
        "BadClassThing",
        ObjectSpec {
            gtype_struct: 1,
            ..ObjectSpec::default()
        },
    );

    assert!(validate(&builder.build()).is_err());
}

#[test]
fn prerequisites_must_be_objects_or_interfaces() {
    let mut builder = TypelibBuilder::new("BadPrereq", "1.0");
    let sig = builder.signature(ty::void(), 0, &[]);
    builder.add_function("boot", "bq_boot", sig); // entry 1
    builder.add_interface(
        "Closeable",
        "BadPrereqCloseable",
        InterfaceSpec {
            prerequisites: vec![1],
            ..InterfaceSpec::default()
        },
    );

    assert!(validate(&builder.build()).is_err());
}

#[test]
fn empty_namespace_still_validates() {
    let data = TypelibBuilder::new("Empty", "1.0").build();
    validate(&data).unwrap();

    let typelib = Typelib::from_bytes(data).unwrap();
    assert_eq!(typelib.n_entries(), 0);
    assert!(typelib.lookup_entry("anything").is_none());
}
