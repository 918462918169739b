//! The descriptor store builder.
//!
//! Interns one canonical record per distinct static type and emits the
//! byte table decoded by `tern-rtti`. The compiler back end drives this
//! once per build; the emitted buffer is linked into the program as an
//! immutable table.

use rustc_hash::FxHashMap;

use tern_rtti::kind::{FLAG_BINARY, FLAG_COMPARABLE, FLAG_NAMED, KIND_MASK};
use tern_rtti::layout;
use tern_rtti::{ChanDir, DescriptorStore, Kind, TypeRef};

use crate::error::BuildError;

/// Target word size of the program the store describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordSize {
    /// 32-bit targets.
    W32,
    /// 64-bit targets.
    W64,
}

impl WordSize {
    /// The word size in bytes.
    pub fn bytes(self) -> usize {
        match self {
            WordSize::W32 => 4,
            WordSize::W64 => 8,
        }
    }

    /// The word size of the host, for stores whose values are inspected in
    /// the same address space.
    pub fn host() -> WordSize {
        match std::mem::size_of::<usize>() {
            4 => WordSize::W32,
            8 => WordSize::W64,
            n => panic!("unsupported host word size {n}"),
        }
    }
}

/// One field of a struct type under construction.
#[derive(Debug, Clone)]
pub struct FieldDef {
    name: String,
    ty: TypeRef,
    tag: Option<String>,
    anonymous: bool,
    embedded: bool,
}

impl FieldDef {
    /// A plain field with the given name and type.
    pub fn new(name: impl Into<String>, ty: TypeRef) -> FieldDef {
        FieldDef {
            name: name.into(),
            ty,
            tag: None,
            anonymous: false,
            embedded: false,
        }
    }

    /// Attach a tag string to the field.
    pub fn with_tag(mut self, tag: impl Into<String>) -> FieldDef {
        self.tag = Some(tag.into());
        self
    }

    /// Mark the field as an embedded (and therefore anonymous) field.
    pub fn embedded(mut self) -> FieldDef {
        self.anonymous = true;
        self.embedded = true;
        self
    }
}

/// Interning key: one entry per distinct static type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TypeKey {
    Basic(u8),
    Pointer(u32),
    Slice(u32),
    Chan(u16, u32),
    Map(u32, u32),
    Array(u32, u32),
    EmptyInterface,
    Named(String),
    Struct(String, Vec<FieldKey>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FieldKey {
    name: String,
    ty: u32,
    tag: Option<String>,
    flags: u8,
}

/// Builder for one descriptor store.
pub struct StoreBuilder {
    data: Vec<u8>,
    word_size: usize,
    types: FxHashMap<TypeKey, TypeRef>,
    strings: FxHashMap<String, u32>,
}

impl StoreBuilder {
    /// Start an empty store for the given target word size.
    pub fn new(word: WordSize) -> StoreBuilder {
        let mut data = Vec::new();
        data.extend_from_slice(&layout::MAGIC);
        data.push(layout::VERSION);
        data.push(word.bytes() as u8);
        data.extend_from_slice(&[0, 0]);
        StoreBuilder {
            data,
            word_size: word.bytes(),
            types: FxHashMap::default(),
            strings: FxHashMap::default(),
        }
    }

    /// The finished store bytes.
    pub fn finish(self) -> Vec<u8> {
        self.data
    }

    /// A read view over everything emitted so far.
    pub fn view(&self) -> DescriptorStore<'_> {
        match DescriptorStore::new(&self.data) {
            Ok(view) => view,
            Err(_) => unreachable!("the builder always writes a valid header"),
        }
    }

    // ---- low-level emission ----

    fn align4(&mut self) {
        while self.data.len() % 4 != 0 {
            self.data.push(0);
        }
    }

    fn start_record(&mut self) -> u32 {
        self.align4();
        self.data.len() as u32
    }

    fn put_u8(&mut self, v: u8) {
        self.data.push(v);
    }

    fn put_u16(&mut self, v: u16) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    fn put_u32(&mut self, v: u32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    fn put_uvarint32(&mut self, mut v: u32) {
        while v >= 0x80 {
            self.data.push((v as u8 & 0x7f) | 0x80);
            v >>= 7;
        }
        self.data.push(v as u8);
    }

    fn put_str_z(&mut self, s: &str) {
        self.data.extend_from_slice(s.as_bytes());
        self.data.push(0);
    }

    fn patch_u32(&mut self, at: usize, v: u32) {
        self.data[at..at + 4].copy_from_slice(&v.to_le_bytes());
    }

    /// Intern a null-terminated string; the empty string is reference 0.
    fn intern_string(&mut self, s: &str) -> Result<u32, BuildError> {
        if s.is_empty() {
            return Ok(0);
        }
        if s.contains('\0') {
            return Err(BuildError::NulInString);
        }
        if let Some(&off) = self.strings.get(s) {
            return Ok(off);
        }
        let off = self.data.len() as u32;
        self.put_str_z(s);
        self.strings.insert(s.to_owned(), off);
        Ok(off)
    }

    // ---- record inspection (for flag folding and layout) ----

    fn check_ref(&self, r: TypeRef) -> Result<(), BuildError> {
        if r.is_null() {
            return Err(BuildError::NullRef);
        }
        if r.tag() != 0 {
            return Err(BuildError::TaggedRef);
        }
        let off = r.raw() as usize;
        if off < layout::HEADER_LEN || off >= self.data.len() {
            return Err(BuildError::DanglingRef(r.raw()));
        }
        Ok(())
    }

    fn meta_of(&self, r: TypeRef) -> u8 {
        self.data[r.base().raw() as usize]
    }

    fn u32_at(&self, at: usize) -> u32 {
        u32::from_le_bytes([
            self.data[at],
            self.data[at + 1],
            self.data[at + 2],
            self.data[at + 3],
        ])
    }

    /// The comparable and binary-hashable flags of an already-built record.
    fn flags_of(&self, r: TypeRef) -> (bool, bool) {
        let meta = self.meta_of(r);
        (meta & FLAG_COMPARABLE != 0, meta & FLAG_BINARY != 0)
    }

    /// Resolve a reference to its non-named record.
    fn resolve_underlying(&self, mut r: TypeRef) -> TypeRef {
        while self.meta_of(r) & FLAG_NAMED != 0 {
            let base = r.base().raw() as usize;
            r = TypeRef::from_raw(self.u32_at(base + layout::ELEM));
        }
        r
    }

    /// Emit the pointer record of a freshly written record and backpatch
    /// its `ptr_to` slot, so the decoder never synthesizes the first level.
    fn attach_pointer(&mut self, target: TypeRef, ptr_to_at: usize) -> Result<(), BuildError> {
        let p = self.pointer_to(target)?;
        self.patch_u32(ptr_to_at, p.raw());
        Ok(())
    }

    // ---- type constructors ----

    /// The canonical descriptor of a basic kind.
    pub fn basic(&mut self, kind: Kind) -> Result<TypeRef, BuildError> {
        if !kind.is_basic() {
            return Err(BuildError::NotBasic(kind));
        }
        let key = TypeKey::Basic(kind as u8);
        if let Some(&r) = self.types.get(&key) {
            return Ok(r);
        }

        let binary = !matches!(
            kind,
            Kind::Float32 | Kind::Float64 | Kind::Complex64 | Kind::Complex128 | Kind::String
        );
        let mut meta = kind as u8 | FLAG_COMPARABLE;
        if binary {
            meta |= FLAG_BINARY;
        }

        let off = self.start_record();
        self.put_u8(meta);
        self.put_u32(0); // ptr_to, patched below

        let r = TypeRef::from_offset(off);
        self.types.insert(key, r);
        self.attach_pointer(r, off as usize + layout::BASIC_PTR_TO)?;
        Ok(r)
    }

    /// The canonical descriptor of `*elem`.
    pub fn pointer_to(&mut self, elem: TypeRef) -> Result<TypeRef, BuildError> {
        self.check_ref(elem)?;
        let key = TypeKey::Pointer(elem.raw());
        if let Some(&r) = self.types.get(&key) {
            return Ok(r);
        }

        let off = self.start_record();
        self.put_u8(Kind::Pointer as u8 | FLAG_COMPARABLE | FLAG_BINARY);
        self.put_u16(0); // num_method
        self.put_u32(elem.raw());

        let r = TypeRef::from_offset(off);
        self.types.insert(key, r);
        Ok(r)
    }

    /// The canonical descriptor of `[]elem`.
    pub fn slice_of(&mut self, elem: TypeRef) -> Result<TypeRef, BuildError> {
        self.check_ref(elem)?;
        let key = TypeKey::Slice(elem.raw());
        if let Some(&r) = self.types.get(&key) {
            return Ok(r);
        }

        let off = self.start_record();
        self.put_u8(Kind::Slice as u8);
        self.put_u16(0);
        self.put_u32(0); // ptr_to
        self.put_u32(elem.raw());

        let r = TypeRef::from_offset(off);
        self.types.insert(key, r);
        self.attach_pointer(r, off as usize + layout::PTR_TO)?;
        Ok(r)
    }

    /// The canonical descriptor of a channel of `elem` with the given
    /// direction.
    pub fn chan_of(&mut self, dir: ChanDir, elem: TypeRef) -> Result<TypeRef, BuildError> {
        self.check_ref(elem)?;
        let key = TypeKey::Chan(dir as u16, elem.raw());
        if let Some(&r) = self.types.get(&key) {
            return Ok(r);
        }

        let off = self.start_record();
        self.put_u8(Kind::Chan as u8 | FLAG_COMPARABLE | FLAG_BINARY);
        self.put_u16(dir as u16); // direction in the method-count slot
        self.put_u32(0); // ptr_to
        self.put_u32(elem.raw());

        let r = TypeRef::from_offset(off);
        self.types.insert(key, r);
        self.attach_pointer(r, off as usize + layout::PTR_TO)?;
        Ok(r)
    }

    /// The canonical descriptor of `map[key]elem`.
    pub fn map_of(&mut self, key_ty: TypeRef, elem: TypeRef) -> Result<TypeRef, BuildError> {
        self.check_ref(key_ty)?;
        self.check_ref(elem)?;
        let key = TypeKey::Map(key_ty.raw(), elem.raw());
        if let Some(&r) = self.types.get(&key) {
            return Ok(r);
        }

        let off = self.start_record();
        self.put_u8(Kind::Map as u8);
        self.put_u16(0);
        self.put_u32(0); // ptr_to
        self.put_u32(elem.raw());
        self.put_u32(key_ty.raw());

        let r = TypeRef::from_offset(off);
        self.types.insert(key, r);
        self.attach_pointer(r, off as usize + layout::PTR_TO)?;
        Ok(r)
    }

    /// The canonical descriptor of `[len]elem`, interning the corresponding
    /// slice type alongside it.
    pub fn array_of(&mut self, elem: TypeRef, len: u32) -> Result<TypeRef, BuildError> {
        self.check_ref(elem)?;
        let slice = self.slice_of(elem)?;
        let key = TypeKey::Array(elem.raw(), len);
        if let Some(&r) = self.types.get(&key) {
            return Ok(r);
        }

        // Arrays inherit comparability byte for byte from their element.
        let (comparable, binary) = self.flags_of(elem);
        let mut meta = Kind::Array as u8;
        if comparable {
            meta |= FLAG_COMPARABLE;
        }
        if binary {
            meta |= FLAG_BINARY;
        }

        let off = self.start_record();
        self.put_u8(meta);
        self.put_u16(0);
        self.put_u32(0); // ptr_to
        self.put_u32(elem.raw());
        self.put_u32(len);
        self.put_u32(slice.raw());

        let r = TypeRef::from_offset(off);
        self.types.insert(key, r);
        self.attach_pointer(r, off as usize + layout::PTR_TO)?;
        Ok(r)
    }

    /// The canonical descriptor of the empty interface.
    pub fn empty_interface(&mut self) -> TypeRef {
        if let Some(&r) = self.types.get(&TypeKey::EmptyInterface) {
            return r;
        }
        let r = self.emit_interface(0);
        self.types.insert(TypeKey::EmptyInterface, r);
        r
    }

    /// A descriptor for an interface with the given method count. Method
    /// sets are not recorded, so distinct non-empty interfaces get distinct
    /// records; the empty interface is canonical.
    pub fn interface_type(&mut self, num_methods: u16) -> TypeRef {
        if num_methods == 0 {
            return self.empty_interface();
        }
        self.emit_interface(num_methods)
    }

    fn emit_interface(&mut self, num_methods: u16) -> TypeRef {
        let off = self.start_record();
        self.put_u8(Kind::Interface as u8 | FLAG_COMPARABLE);
        self.put_u16(num_methods);
        self.put_u32(0); // ptr_to

        let r = TypeRef::from_offset(off);
        // An interface reference is always in range for attach_pointer.
        if let Err(err) = self.attach_pointer(r, off as usize + layout::PTR_TO) {
            unreachable!("pointer to fresh interface record: {err}");
        }
        r
    }

    /// A descriptor for a function type. Signatures are not recorded, so
    /// every call yields a fresh record.
    pub fn func_type(&mut self) -> TypeRef {
        let off = self.start_record();
        self.put_u8(Kind::Func as u8);
        self.put_u32(0); // ptr_to

        let r = TypeRef::from_offset(off);
        if let Err(err) = self.attach_pointer(r, off as usize + layout::BASIC_PTR_TO) {
            unreachable!("pointer to fresh func record: {err}");
        }
        r
    }

    /// The canonical descriptor of a named type.
    ///
    /// The underlying reference is resolved through any named layers so the
    /// stored underlying type is reached in exactly one hop. Redeclaring a
    /// name with a different underlying type is an error.
    pub fn named(
        &mut self,
        pkg: &str,
        name: &str,
        underlying: TypeRef,
        num_methods: u16,
    ) -> Result<TypeRef, BuildError> {
        self.check_ref(underlying)?;
        if name.is_empty() || name.contains('.') || name.contains('\0') {
            return Err(BuildError::InvalidName(name.to_owned()));
        }

        let u = self.resolve_underlying(underlying);
        let full = format!("{pkg}.{name}");

        let key = TypeKey::Named(full.clone());
        if let Some(&r) = self.types.get(&key) {
            let stored = self.u32_at(r.raw() as usize + layout::ELEM);
            if stored != u.raw() {
                return Err(BuildError::DuplicateNamed(full));
            }
            return Ok(r);
        }

        let (comparable, binary) = self.flags_of(u);
        let mut meta = (self.meta_of(u) & KIND_MASK) | FLAG_NAMED;
        if comparable {
            meta |= FLAG_COMPARABLE;
        }
        if binary {
            meta |= FLAG_BINARY;
        }

        let pkg_ref = self.intern_string(pkg)?;
        let off = self.start_record();
        self.put_u8(meta);
        self.put_u16(num_methods);
        self.put_u32(0); // ptr_to
        self.put_u32(u.raw());
        self.put_u32(pkg_ref);
        self.put_str_z(&full);

        let r = TypeRef::from_offset(off);
        self.types.insert(key, r);
        self.attach_pointer(r, off as usize + layout::PTR_TO)?;
        Ok(r)
    }

    /// The canonical descriptor of a struct type.
    ///
    /// Field offsets and the total size are computed here, once, with
    /// C-style layout: each field aligned to its type, the struct padded to
    /// its largest field alignment. Fields are recorded in declaration
    /// order.
    pub fn struct_type(&mut self, pkg: &str, fields: &[FieldDef]) -> Result<TypeRef, BuildError> {
        if fields.len() > u16::MAX as usize {
            return Err(BuildError::TooManyFields(fields.len()));
        }

        let mut offsets = Vec::with_capacity(fields.len());
        let mut size = 0usize;
        let mut max_align = 1usize;
        let mut comparable = true;
        // Byte-wise comparison additionally requires a gap-free layout.
        let mut binary = true;

        for field in fields {
            self.check_ref(field.ty)?;
            if field.name.is_empty() || field.name.contains('.') || field.name.contains('\0') {
                return Err(BuildError::InvalidName(field.name.clone()));
            }
            if let Some(tag) = &field.tag {
                if tag.len() > u8::MAX as usize {
                    return Err(BuildError::TagTooLong(field.name.clone()));
                }
            }

            let view = self.view();
            let fty = view.type_at(field.ty);
            let (fsize, falign) = (fty.size(), fty.align());
            let (fcomparable, fbinary) = self.flags_of(field.ty);
            comparable &= fcomparable;
            binary &= fbinary;

            let offset = align_up(size, falign);
            if offset != size {
                binary = false;
            }
            offsets.push(offset);
            size = offset + fsize;
            max_align = max_align.max(falign);
        }
        let padded = align_up(size, max_align);
        if padded != size {
            binary = false;
        }
        if padded > u32::MAX as usize {
            return Err(BuildError::StructTooLarge(padded));
        }

        let field_keys: Vec<FieldKey> = fields
            .iter()
            .map(|f| FieldKey {
                name: f.name.clone(),
                ty: f.ty.raw(),
                tag: f.tag.clone(),
                flags: field_flags(f),
            })
            .collect();
        let key = TypeKey::Struct(pkg.to_owned(), field_keys);
        if let Some(&r) = self.types.get(&key) {
            return Ok(r);
        }

        let mut meta = Kind::Struct as u8;
        if comparable {
            meta |= FLAG_COMPARABLE;
        }
        if binary {
            meta |= FLAG_BINARY;
        }

        let pkg_ref = self.intern_string(pkg)?;
        let off = self.start_record();
        self.put_u8(meta);
        self.put_u16(0); // num_method; methods attach to a named wrapper
        self.put_u32(0); // ptr_to
        self.put_u32(pkg_ref);
        self.put_u32(padded as u32);
        self.put_u16(fields.len() as u16);
        for (field, &offset) in fields.iter().zip(&offsets) {
            self.put_u32(field.ty.raw());
            self.put_u8(field_flags(field));
            self.put_uvarint32(offset as u32);
            self.put_str_z(&field.name);
            if let Some(tag) = &field.tag {
                self.put_u8(tag.len() as u8);
                self.data.extend_from_slice(tag.as_bytes());
            }
        }

        let r = TypeRef::from_offset(off);
        self.types.insert(key, r);
        self.attach_pointer(r, off as usize + layout::PTR_TO)?;
        Ok(r)
    }
}

fn field_flags(field: &FieldDef) -> u8 {
    let mut flags = 0;
    if field.anonymous {
        flags |= layout::FIELD_ANONYMOUS;
    }
    if field.tag.is_some() {
        flags |= layout::FIELD_HAS_TAG;
    }
    if field.name.chars().next().is_some_and(char::is_uppercase) {
        flags |= layout::FIELD_EXPORTED;
    }
    if field.embedded {
        flags |= layout::FIELD_EMBEDDED;
    }
    flags
}

fn align_up(offset: usize, align: usize) -> usize {
    (offset + align - 1) & !(align - 1)
}
