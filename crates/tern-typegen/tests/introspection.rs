//! End-to-end tests: build a store with `tern-typegen`, decode it with
//! `tern-rtti`, and check the reflection surface against the language
//! rules.

use tern_rtti::{ChanDir, DescriptorStore, GcLayout, Kind};
use tern_typegen::{FieldDef, StoreBuilder, WordSize};

fn store(data: &[u8]) -> DescriptorStore<'_> {
    DescriptorStore::new(data).unwrap()
}

#[test]
fn named_type_name_and_package() {
    let mut b = StoreBuilder::new(WordSize::W64);
    let i32t = b.basic(Kind::Int32).unwrap();
    let enc = b.named("encoding/base64", "Encoding", i32t, 0).unwrap();
    let data = b.finish();

    let t = store(&data).type_at(enc);
    assert!(t.is_named());
    // The package path itself contains dots; the name must still come out
    // clean.
    assert_eq!(t.name(), "Encoding");
    assert_eq!(t.pkg_path(), "encoding/base64");
    assert_eq!(t.to_string(), "encoding/base64.Encoding");
    assert_eq!(t.kind(), Kind::Int32);
    assert_eq!(t.underlying().kind(), Kind::Int32);
    assert!(!t.underlying().is_named());
}

#[test]
fn named_type_without_package() {
    let mut b = StoreBuilder::new(WordSize::W64);
    let int = b.basic(Kind::Int).unwrap();
    let point = b.named("", "Celsius", int, 2).unwrap();
    let data = b.finish();

    let t = store(&data).type_at(point);
    assert_eq!(t.name(), "Celsius");
    assert_eq!(t.pkg_path(), "");
    assert_eq!(t.to_string(), "Celsius");
    assert_eq!(t.num_method(), 2);
}

#[test]
fn struct_rendering_and_field_order() {
    let mut b = StoreBuilder::new(WordSize::W64);
    let int = b.basic(Kind::Int).unwrap();
    let s = b
        .struct_type("main", &[FieldDef::new("A", int), FieldDef::new("B", int)])
        .unwrap();
    let data = b.finish();

    let t = store(&data).type_at(s);
    assert_eq!(t.to_string(), "struct { A int; B int }");
    assert_eq!(t.num_field(), 2);
    assert_eq!(t.field(0).name, "A");
    assert_eq!(t.field(1).name, "B");
}

#[test]
fn field_offsets_are_monotonic_and_within_size() {
    let mut b = StoreBuilder::new(WordSize::W64);
    let i8t = b.basic(Kind::Int8).unwrap();
    let i16t = b.basic(Kind::Int16).unwrap();
    let i32t = b.basic(Kind::Int32).unwrap();
    let i64t = b.basic(Kind::Int64).unwrap();
    let s = b
        .struct_type(
            "main",
            &[
                FieldDef::new("A", i8t),
                FieldDef::new("B", i64t),
                FieldDef::new("C", i16t),
                FieldDef::new("D", i32t),
                FieldDef::new("E", i8t),
            ],
        )
        .unwrap();
    let data = b.finish();

    let t = store(&data).type_at(s);
    let mut prev = 0;
    for i in 0..t.num_field() {
        let f = t.field(i);
        assert!(f.offset >= prev, "field {i} offset went backwards");
        assert!(f.offset + f.ty.size() <= t.size());
        assert_eq!(f.offset % f.ty.align(), 0, "field {i} misaligned");
        prev = f.offset;
    }
    assert_eq!(t.size() % t.align(), 0);
}

#[test]
fn exported_and_tagged_fields() {
    let mut b = StoreBuilder::new(WordSize::W64);
    let str_t = b.basic(Kind::String).unwrap();
    let s = b
        .struct_type(
            "main",
            &[
                FieldDef::new("Name", str_t).with_tag(r#"json:"name,omitempty""#),
                FieldDef::new("secret", str_t),
            ],
        )
        .unwrap();
    let data = b.finish();

    let t = store(&data).type_at(s);
    let name = t.field(0);
    assert!(name.is_exported());
    assert_eq!(name.pkg_path, "");
    let tag = name.tag.unwrap();
    assert_eq!(tag.get("json"), "name,omitempty");
    assert_eq!(tag.lookup("xml"), None);

    let secret = t.field(1);
    assert!(!secret.is_exported());
    assert_eq!(secret.pkg_path, "main");
    assert!(secret.tag.is_none());
}

#[test]
fn embedded_field_promotion() {
    let mut b = StoreBuilder::new(WordSize::W64);
    let int = b.basic(Kind::Int).unwrap();
    let base_struct = b
        .struct_type("main", &[FieldDef::new("X", int), FieldDef::new("Y", int)])
        .unwrap();
    let base = b.named("main", "Base", base_struct, 0).unwrap();
    let outer = b
        .struct_type(
            "main",
            &[
                FieldDef::new("Base", base).embedded(),
                FieldDef::new("Z", int),
            ],
        )
        .unwrap();
    let data = b.finish();

    let t = store(&data).type_at(outer);
    let y = t.field_by_name("Y").unwrap();
    assert_eq!(y.name, "Y");
    assert_eq!(y.index, vec![0, 1]);
    assert_eq!(t.field_by_index(&[0, 1]).name, "Y");
    assert!(t.field_by_name("W").is_none());
}

#[test]
fn embedded_through_pointer() {
    let mut b = StoreBuilder::new(WordSize::W64);
    let int = b.basic(Kind::Int).unwrap();
    let base_struct = b.struct_type("main", &[FieldDef::new("X", int)]).unwrap();
    let base = b.named("main", "Base", base_struct, 0).unwrap();
    let pbase = b.pointer_to(base).unwrap();
    let outer = b
        .struct_type("main", &[FieldDef::new("Base", pbase).embedded()])
        .unwrap();
    let data = b.finish();

    let t = store(&data).type_at(outer);
    let x = t.field_by_name("X").unwrap();
    assert_eq!(x.index, vec![0, 0]);
    assert_eq!(t.field_by_index(&[0, 0]).name, "X");
}

#[test]
fn shallow_field_shadows_embedded() {
    let mut b = StoreBuilder::new(WordSize::W64);
    let int = b.basic(Kind::Int).unwrap();
    let base_struct = b.struct_type("main", &[FieldDef::new("X", int)]).unwrap();
    let base = b.named("main", "Base", base_struct, 0).unwrap();
    let outer = b
        .struct_type(
            "main",
            &[
                FieldDef::new("Base", base).embedded(),
                FieldDef::new("X", int),
            ],
        )
        .unwrap();
    let data = b.finish();

    let t = store(&data).type_at(outer);
    let x = t.field_by_name("X").unwrap();
    assert_eq!(x.index, vec![1]);
}

#[test]
fn ambiguous_embedded_fields_cancel() {
    let mut b = StoreBuilder::new(WordSize::W64);
    let int = b.basic(Kind::Int).unwrap();
    let s1 = b.struct_type("main", &[FieldDef::new("N", int)]).unwrap();
    let a = b.named("main", "A", s1, 0).unwrap();
    let s2 = b
        .struct_type("main", &[FieldDef::new("N", int), FieldDef::new("M", int)])
        .unwrap();
    let bt = b.named("main", "B", s2, 0).unwrap();
    let outer = b
        .struct_type(
            "main",
            &[FieldDef::new("A", a).embedded(), FieldDef::new("B", bt).embedded()],
        )
        .unwrap();
    let data = b.finish();

    let t = store(&data).type_at(outer);
    // N exists in both embedded structs at the same depth.
    assert!(t.field_by_name("N").is_none());
    // M is unambiguous.
    assert_eq!(t.field_by_name("M").unwrap().index, vec![1, 1]);
}

#[test]
fn composite_rendering() {
    let mut b = StoreBuilder::new(WordSize::W64);
    let int = b.basic(Kind::Int).unwrap();
    let str_t = b.basic(Kind::String).unwrap();

    let m = b.map_of(str_t, int).unwrap();
    let sl = b.slice_of(int).unwrap();
    let arr = b.array_of(int, 4).unwrap();
    let ch = b.chan_of(ChanDir::Both, int).unwrap();
    let recv = b.chan_of(ChanDir::Recv, int).unwrap();
    let send = b.chan_of(ChanDir::Send, int).unwrap();
    let nested = b.chan_of(ChanDir::Both, recv).unwrap();
    let iface = b.empty_interface();
    let data = b.finish();

    let s = store(&data);
    assert_eq!(s.type_at(m).to_string(), "map[string]int");
    assert_eq!(s.type_at(sl).to_string(), "[]int");
    assert_eq!(s.type_at(arr).to_string(), "[4]int");
    assert_eq!(s.type_at(ch).to_string(), "chan int");
    assert_eq!(s.type_at(recv).to_string(), "<-chan int");
    assert_eq!(s.type_at(send).to_string(), "chan<- int");
    assert_eq!(s.type_at(nested).to_string(), "chan (<-chan int)");
    assert_eq!(s.type_at(iface).to_string(), "interface {}");
}

#[test]
fn composite_accessors() {
    let mut b = StoreBuilder::new(WordSize::W64);
    let int = b.basic(Kind::Int).unwrap();
    let str_t = b.basic(Kind::String).unwrap();
    let m = b.map_of(str_t, int).unwrap();
    let arr = b.array_of(int, 4).unwrap();
    let ch = b.chan_of(ChanDir::Recv, int).unwrap();
    let data = b.finish();

    let s = store(&data);
    assert_eq!(s.type_at(m).key().kind(), Kind::String);
    assert_eq!(s.type_at(m).elem().kind(), Kind::Int);
    assert_eq!(s.type_at(arr).len(), 4);
    assert_eq!(s.type_at(arr).slice_of().kind(), Kind::Slice);
    assert_eq!(s.type_at(arr).slice_of().elem().kind(), Kind::Int);
    assert_eq!(s.type_at(ch).chan_dir(), ChanDir::Recv);
}

#[test]
fn sizes_follow_the_word_size() {
    for word in [WordSize::W32, WordSize::W64] {
        let w = word.bytes();
        let mut b = StoreBuilder::new(word);
        let int = b.basic(Kind::Int).unwrap();
        let str_t = b.basic(Kind::String).unwrap();
        let c128 = b.basic(Kind::Complex128).unwrap();
        let p = b.pointer_to(int).unwrap();
        let sl = b.slice_of(int).unwrap();
        let m = b.map_of(int, int).unwrap();
        let arr = b.array_of(int, 3).unwrap();
        let iface = b.empty_interface();
        let f = b.func_type();
        let data = b.finish();

        let s = store(&data);
        assert_eq!(s.word_size(), w);
        assert_eq!(s.type_at(int).size(), w);
        assert_eq!(s.type_at(p).size(), w);
        assert_eq!(s.type_at(m).size(), w);
        assert_eq!(s.type_at(str_t).size(), 2 * w);
        assert_eq!(s.type_at(iface).size(), 2 * w);
        assert_eq!(s.type_at(f).size(), 2 * w);
        assert_eq!(s.type_at(sl).size(), 3 * w);
        assert_eq!(s.type_at(arr).size(), 3 * w);
        assert_eq!(s.type_at(c128).size(), 16);
        assert_eq!(s.type_at(c128).align(), 8);
    }
}

#[test]
fn bits_of_arithmetic_types() {
    let mut b = StoreBuilder::new(WordSize::W64);
    let i32t = b.basic(Kind::Int32).unwrap();
    let u64t = b.basic(Kind::Uint64).unwrap();
    let f32t = b.basic(Kind::Float32).unwrap();
    let data = b.finish();

    let s = store(&data);
    assert_eq!(s.type_at(i32t).bits(), 32);
    assert_eq!(s.type_at(u64t).bits(), 64);
    assert_eq!(s.type_at(f32t).bits(), 32);
}

#[test]
fn pointer_identity_roundtrip() {
    let mut b = StoreBuilder::new(WordSize::W64);
    let int = b.basic(Kind::Int).unwrap();
    let s_ref = b.struct_type("main", &[FieldDef::new("A", int)]).unwrap();
    let p_ref = b.pointer_to(s_ref).unwrap();
    let data = b.finish();

    let s = store(&data);
    let t = s.type_at(s_ref);
    let p = t.pointer_to();
    // The store carries a real record for the first pointer level.
    assert_eq!(p.type_ref(), p_ref);
    assert_eq!(p.type_ref().tag(), 0);
    assert_eq!(p.elem(), t);

    // Further levels are synthesized in the reference itself.
    let pp = p.pointer_to();
    assert_eq!(pp.type_ref().tag(), 1);
    assert_eq!(pp.elem(), p);
    assert_eq!(pp.elem().pointer_to(), pp);
}

#[test]
fn assignability() {
    let mut b = StoreBuilder::new(WordSize::W64);
    let int = b.basic(Kind::Int).unwrap();
    let str_t = b.basic(Kind::String).unwrap();
    let celsius = b.named("main", "Celsius", int, 0).unwrap();
    let kelvin = b.named("main", "Kelvin", int, 0).unwrap();
    let iface = b.empty_interface();
    let data = b.finish();

    let s = store(&data);
    let (int, str_t) = (s.type_at(int), s.type_at(str_t));
    let (celsius, kelvin) = (s.type_at(celsius), s.type_at(kelvin));
    let iface = s.type_at(iface);

    assert!(int.assignable_to(int));
    assert!(!int.assignable_to(str_t));
    // A named type and its underlying type convert freely in one step.
    assert!(celsius.assignable_to(int));
    assert!(int.assignable_to(celsius));
    // Two distinct named types do not, even with the same underlying type.
    assert!(!celsius.assignable_to(kelvin));
    // Everything is assignable to the empty interface.
    assert!(int.assignable_to(iface));
    assert!(celsius.assignable_to(iface));
    assert!(int.implements(iface));
}

#[test]
#[should_panic(expected = "call of Implements on int type")]
fn implements_requires_an_interface() {
    let mut b = StoreBuilder::new(WordSize::W64);
    let int = b.basic(Kind::Int).unwrap();
    let data = b.finish();
    let s = store(&data);
    s.type_at(int).implements(s.type_at(int));
}

#[test]
fn overflow_checks() {
    let mut b = StoreBuilder::new(WordSize::W64);
    let i8t = b.basic(Kind::Int8).unwrap();
    let u8t = b.basic(Kind::Uint8).unwrap();
    let f32t = b.basic(Kind::Float32).unwrap();
    let f64t = b.basic(Kind::Float64).unwrap();
    let c64 = b.basic(Kind::Complex64).unwrap();
    let c128 = b.basic(Kind::Complex128).unwrap();
    let data = b.finish();

    let s = store(&data);
    assert!(!s.type_at(i8t).overflow_int(127));
    assert!(s.type_at(i8t).overflow_int(128));
    assert!(!s.type_at(i8t).overflow_int(-128));
    assert!(s.type_at(i8t).overflow_int(-129));
    assert!(!s.type_at(u8t).overflow_uint(255));
    assert!(s.type_at(u8t).overflow_uint(256));
    assert!(!s.type_at(f32t).overflow_float(f32::MAX as f64));
    assert!(s.type_at(f32t).overflow_float(f32::MAX as f64 * 2.0));
    assert!(!s.type_at(f64t).overflow_float(f64::MAX));
    assert!(s.type_at(c64).overflow_complex(0.0, f32::MAX as f64 * 2.0));
    assert!(!s.type_at(c128).overflow_complex(f64::MAX, f64::MAX));
}

#[test]
fn gc_layout_classification() {
    let mut b = StoreBuilder::new(WordSize::W64);
    let int = b.basic(Kind::Int).unwrap();
    let f64t = b.basic(Kind::Float64).unwrap();
    let str_t = b.basic(Kind::String).unwrap();
    let up = b.basic(Kind::UnsafePointer).unwrap();
    let p = b.pointer_to(int).unwrap();
    let sl = b.slice_of(int).unwrap();
    let m = b.map_of(int, int).unwrap();
    let ch = b.chan_of(ChanDir::Both, int).unwrap();
    let st = b.struct_type("main", &[FieldDef::new("P", p)]).unwrap();
    let celsius = b.named("main", "Celsius", int, 0).unwrap();
    let data = b.finish();

    let s = store(&data);
    assert_eq!(s.type_at(int).gc_layout(), GcLayout::NoPointers);
    assert_eq!(s.type_at(f64t).gc_layout(), GcLayout::NoPointers);
    assert_eq!(s.type_at(celsius).gc_layout(), GcLayout::NoPointers);
    assert_eq!(s.type_at(str_t).gc_layout(), GcLayout::StringLayout);
    assert_eq!(s.type_at(up).gc_layout(), GcLayout::SinglePointer);
    assert_eq!(s.type_at(p).gc_layout(), GcLayout::SinglePointer);
    assert_eq!(s.type_at(m).gc_layout(), GcLayout::SinglePointer);
    assert_eq!(s.type_at(ch).gc_layout(), GcLayout::SinglePointer);
    assert_eq!(s.type_at(sl).gc_layout(), GcLayout::SliceLayout);
    // Aggregates need a precise map the descriptors do not carry.
    assert_eq!(s.type_at(st).gc_layout(), GcLayout::Unknown);
}

#[test]
#[should_panic(expected = "call of Key on slice type")]
fn key_on_non_map() {
    let mut b = StoreBuilder::new(WordSize::W64);
    let int = b.basic(Kind::Int).unwrap();
    let sl = b.slice_of(int).unwrap();
    let data = b.finish();
    store(&data).type_at(sl).key();
}

#[test]
#[should_panic(expected = "call of Len on int type")]
fn len_on_non_array() {
    let mut b = StoreBuilder::new(WordSize::W64);
    let int = b.basic(Kind::Int).unwrap();
    let data = b.finish();
    store(&data).type_at(int).len();
}

#[test]
#[should_panic(expected = "call of NumField on map type")]
fn num_field_on_non_struct() {
    let mut b = StoreBuilder::new(WordSize::W64);
    let int = b.basic(Kind::Int).unwrap();
    let m = b.map_of(int, int).unwrap();
    let data = b.finish();
    store(&data).type_at(m).num_field();
}

#[test]
fn named_struct_keeps_field_access() {
    let mut b = StoreBuilder::new(WordSize::W64);
    let int = b.basic(Kind::Int).unwrap();
    let raw = b
        .struct_type("main", &[FieldDef::new("A", int), FieldDef::new("B", int)])
        .unwrap();
    let point = b.named("main", "Point", raw, 1).unwrap();
    let data = b.finish();

    let t = store(&data).type_at(point);
    assert_eq!(t.kind(), Kind::Struct);
    assert_eq!(t.num_field(), 2);
    assert_eq!(t.field(1).name, "B");
    assert_eq!(t.num_method(), 1);
    assert_eq!(t.to_string(), "main.Point");
    assert_eq!(t.underlying().to_string(), "struct { A int; B int }");
}

#[test]
fn header_validation() {
    let mut b = StoreBuilder::new(WordSize::W32);
    b.basic(Kind::Int).unwrap();
    let mut data = b.finish();
    assert!(DescriptorStore::new(&data).is_ok());

    data[4] = 9; // version
    assert!(matches!(
        DescriptorStore::new(&data),
        Err(tern_rtti::StoreError::UnsupportedVersion(9))
    ));
    data[4] = 1;
    data[5] = 2; // word size
    assert!(matches!(
        DescriptorStore::new(&data),
        Err(tern_rtti::StoreError::UnsupportedWordSize(2))
    ));
    data[0] = b'X';
    assert!(matches!(
        DescriptorStore::new(&data),
        Err(tern_rtti::StoreError::BadMagic)
    ));
}

#[test]
fn stores_stay_reasonably_small() {
    // A representative program's worth of types should stay well under the
    // kilobyte range that flash-constrained targets care about.
    let mut b = StoreBuilder::new(WordSize::W32);
    let int = b.basic(Kind::Int).unwrap();
    let str_t = b.basic(Kind::String).unwrap();
    for i in 0..16 {
        let s = b
            .struct_type(
                "main",
                &[
                    FieldDef::new("Name", str_t).with_tag(r#"json:"name""#),
                    FieldDef::new("Count", int),
                ],
            )
            .unwrap();
        let _ = b.named("main", &format!("T{i}"), s, 0).unwrap();
        let _ = b.slice_of(int).unwrap();
    }
    let data = b.finish();
    // The anonymous struct, the slice, and the basics all intern to single
    // records; only the named wrappers repeat.
    assert!(data.len() < 1024, "store grew to {} bytes", data.len());
}
