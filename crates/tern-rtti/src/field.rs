//! Struct field records: sequential walking and breadth-first lookup.
//!
//! Field records are variable length, so locating the n'th field means
//! decoding records 0..n-1 first; lookups are O(n) by design, trading time
//! for the table bytes an offset index would cost.

use crate::error::kind_misuse;
use crate::kind::Kind;
use crate::layout;
use crate::store::{uvarint32, DescriptorStore, TypeRef};
use crate::tag::StructTag;
use crate::ty::Type;

/// One field of a struct type.
#[derive(Debug, Clone)]
pub struct StructField<'a> {
    /// The field name.
    pub name: &'a str,
    /// The package path qualifying an unexported field name; empty for
    /// exported fields.
    pub pkg_path: &'a str,
    /// The field's type.
    pub ty: Type<'a>,
    /// The field's tag, if it has one.
    pub tag: Option<StructTag<'a>>,
    /// Byte offset of the field within the struct.
    pub offset: usize,
    /// Index sequence locating the field, one entry per nesting level.
    pub index: Vec<usize>,
    /// Whether the field is anonymous.
    pub anonymous: bool,
}

impl StructField<'_> {
    /// Whether the field is exported.
    pub fn is_exported(&self) -> bool {
        self.pkg_path.is_empty()
    }
}

/// A decoded field record, without the per-field package resolution that
/// [`StructField`] performs.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RawField<'a> {
    pub ty: TypeRef,
    pub flags: u8,
    pub offset: u32,
    pub name: &'a str,
    pub tag: Option<&'a str>,
}

impl RawField<'_> {
    pub(crate) fn is_exported(&self) -> bool {
        self.flags & layout::FIELD_EXPORTED != 0
    }

    fn is_embedded(&self) -> bool {
        self.flags & layout::FIELD_EMBEDDED != 0
    }
}

/// Sequential decoder over the inline field records of one struct
/// descriptor.
pub(crate) struct FieldIter<'a> {
    store: DescriptorStore<'a>,
    cursor: usize,
    remaining: u16,
}

impl<'a> Iterator for FieldIter<'a> {
    type Item = RawField<'a>;

    fn next(&mut self) -> Option<RawField<'a>> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let data = self.store.as_bytes();
        let ty = TypeRef::from_raw(self.store.u32_at(self.cursor));
        let flags = data[self.cursor + 4];
        let mut pos = self.cursor + 5;

        let (offset, varint_len) = uvarint32(&data[pos..]);
        pos += varint_len;

        let name = self.store.str_z(pos);
        pos += name.len() + 1;

        let tag = if flags & layout::FIELD_HAS_TAG != 0 {
            let len = data[pos] as usize;
            pos += 1;
            let bytes = &data[pos..pos + len];
            pos += len;
            match std::str::from_utf8(bytes) {
                Ok(s) => Some(s),
                Err(_) => panic!("rtti: corrupt tag data"),
            }
        } else {
            None
        };

        self.cursor = pos;
        Some(RawField {
            ty,
            flags,
            offset,
            name,
            tag,
        })
    }
}

impl<'a> Type<'a> {
    /// The underlying struct record, verified to be of struct kind.
    fn struct_base(&self, method: &'static str) -> Type<'a> {
        let u = self.underlying();
        if u.kind() != Kind::Struct {
            kind_misuse(method, u.kind());
        }
        u
    }

    /// Iterate the raw field records of this struct descriptor.
    pub(crate) fn raw_fields(&self) -> FieldIter<'a> {
        let u = self.struct_base("Field");
        FieldIter {
            store: self.store(),
            cursor: u.base() + layout::STRUCT_FIELDS,
            remaining: self.store().u16_at(u.base() + layout::STRUCT_NUM_FIELD),
        }
    }

    fn struct_pkg(&self) -> u32 {
        let u = self.struct_base("Field");
        self.store().u32_at(u.base() + layout::STRUCT_PKG)
    }

    /// Resolve a raw field against its containing struct. The struct-level
    /// package string is read only for unexported fields.
    fn make_field(&self, raw: RawField<'a>, index: Vec<usize>) -> StructField<'a> {
        let pkg_path = if raw.is_exported() {
            ""
        } else {
            self.store().interned_str(self.struct_pkg())
        };
        StructField {
            name: raw.name,
            pkg_path,
            ty: self.store().type_at(raw.ty),
            tag: raw.tag.map(StructTag::new),
            offset: raw.offset as usize,
            index,
            anonymous: raw.flags & layout::FIELD_ANONYMOUS != 0,
        }
    }

    /// The number of fields of a struct type. Aborts for other kinds.
    pub fn num_field(&self) -> usize {
        let u = self.struct_base("NumField");
        self.store().u16_at(u.base() + layout::STRUCT_NUM_FIELD) as usize
    }

    /// The i'th field of a struct type, in declaration order.
    ///
    /// Aborts for non-struct kinds and for an out-of-range index.
    pub fn field(&self, i: usize) -> StructField<'a> {
        match self.raw_fields().nth(i) {
            Some(raw) => self.make_field(raw, vec![i]),
            None => panic!("rtti: field index out of range"),
        }
    }

    /// The struct field with the given name, searching embedded structs
    /// breadth first. `None` when absent or ambiguous.
    pub fn field_by_name(&self, name: &str) -> Option<StructField<'a>> {
        self.field_by_name_func(|n| n == name)
    }

    /// The struct field whose name satisfies `matches`, searching embedded
    /// structs breadth first.
    ///
    /// The search stops at the shallowest nesting depth producing any match.
    /// If several fields at that depth match, they cancel each other and the
    /// result is `None`, mirroring embedding shadow rules; an exhausted
    /// search is also `None`. Aborts for non-struct kinds.
    pub fn field_by_name_func<F>(&self, mut matches: F) -> Option<StructField<'a>>
    where
        F: FnMut(&str) -> bool,
    {
        self.struct_base("FieldByNameFunc");

        // Structs still to scan at the current depth, with the index path
        // that reached each one.
        let mut queue: Vec<(Type<'a>, Vec<usize>)> = vec![(*self, Vec::new())];

        while !queue.is_empty() {
            let mut found: Vec<(Type<'a>, RawField<'a>, Vec<usize>)> = Vec::new();
            let mut next_level: Vec<(Type<'a>, Vec<usize>)> = Vec::new();

            for (holder, path) in &queue {
                for (i, raw) in holder.raw_fields().enumerate() {
                    let mut index = path.clone();
                    index.push(i);

                    if matches(raw.name) {
                        found.push((*holder, raw, index.clone()));
                    }

                    let field_ty = self.store().type_at(raw.ty);
                    let embedded_struct = match field_ty.kind() {
                        Kind::Struct => Some(field_ty),
                        Kind::Pointer if field_ty.elem().kind() == Kind::Struct => {
                            Some(field_ty.elem())
                        }
                        _ => None,
                    };
                    if raw.is_embedded() {
                        if let Some(inner) = embedded_struct {
                            next_level.push((inner, index));
                        }
                    }
                }
            }

            // Multiple hits at the shallowest matching depth shadow each
            // other out.
            if found.len() > 1 {
                return None;
            }
            if let Some((holder, raw, index)) = found.pop() {
                return Some(holder.make_field(raw, index));
            }

            queue = next_level;
        }

        None
    }

    /// The nested field corresponding to an index sequence, equivalent to
    /// calling [`Type::field`] successively and descending through pointers
    /// to structs. Aborts if the sequence leaves struct territory.
    pub fn field_by_index(&self, index: &[usize]) -> StructField<'a> {
        let mut holder = *self;
        let mut field = None;
        for &i in index {
            if holder.kind() == Kind::Pointer && holder.elem().kind() == Kind::Struct {
                holder = holder.elem();
            } else if holder.underlying().kind() != Kind::Struct {
                kind_misuse("FieldByIndex", holder.kind());
            }
            let f = holder.field(i);
            holder = f.ty;
            field = Some(f);
        }
        match field {
            Some(mut f) => {
                f.index = index.to_vec();
                f
            }
            None => panic!("rtti: empty field index"),
        }
    }
}
