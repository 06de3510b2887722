//! Buffers are described as an ordered list of scalar fields, one 32-bit word per field.
//!
//! Offsets follow declaration order. There is no padding since every scalar has the same size
//! and alignment.

use core::fmt::Display;

/// The type of a single buffer word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// Unsigned 32-bit integer.
    U32,
    /// Signed 32-bit integer.
    I32,
    /// IEEE-754 single precision float.
    F32,
}

impl Display for ScalarType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ScalarType::U32 => f.write_str("uint"),
            ScalarType::I32 => f.write_str("int"),
            ScalarType::F32 => f.write_str("float"),
        }
    }
}

/// A named scalar field.
#[derive(new, Clone, Debug, PartialEq, Eq)]
pub struct Field {
    /// The field name, nested fields are joined with a dot.
    pub name: String,
    /// The scalar type of the field.
    pub ty: ScalarType,
}

/// An ordered list of fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StructLayout {
    fields: Vec<Field>,
}

impl StructLayout {
    /// Creates an empty struct.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a scalar field.
    pub fn with_field<S: Into<String>>(mut self, name: S, ty: ScalarType) -> Self {
        self.fields.push(Field::new(name.into(), ty));
        self
    }

    /// Appends every field of `other`, prefixed by `name`.
    pub fn with_struct(mut self, name: &str, other: &StructLayout) -> Self {
        for field in other.fields.iter() {
            self.fields
                .push(Field::new(format!("{name}.{}", field.name), field.ty));
        }
        self
    }

    /// The fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The size of the struct in words.
    pub fn size_words(&self) -> usize {
        self.fields.len()
    }

    /// The word offset of the given field.
    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    /// The word offset of the first field of the nested struct `name`.
    pub fn offset_of_struct(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| {
            field
                .name
                .strip_prefix(name)
                .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}

impl Display for StructLayout {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("struct {")?;
        for field in self.fields.iter() {
            write!(f, " {} {};", field.ty, field.name)?;
        }
        f.write_str(" }")
    }
}

/// A header struct followed by an unsized array of structs.
#[derive(new, Clone, Debug, PartialEq, Eq)]
pub struct ArrayLayout {
    /// Fields stored once at the start of the buffer.
    pub header: StructLayout,
    /// The struct repeated for each array element.
    pub element: StructLayout,
}

impl ArrayLayout {
    /// The size in words of a buffer holding `len` array elements.
    pub fn size_words(&self, len: usize) -> usize {
        self.header.size_words() + len * self.element.size_words()
    }

    /// The word offset of the array element at `index`.
    pub fn element_offset(&self, index: usize) -> usize {
        self.header.size_words() + index * self.element.size_words()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn nested_fields_follow_declaration_order() {
        let value = StructLayout::new()
            .with_field("count", ScalarType::U32)
            .with_field("sum", ScalarType::F32);
        let descriptor = StructLayout::new()
            .with_struct("aggregate", &value)
            .with_struct("prefix", &value)
            .with_field("state", ScalarType::U32);

        assert_eq!(descriptor.size_words(), 5);
        assert_eq!(descriptor.offset_of("aggregate.sum"), Some(1));
        assert_eq!(descriptor.offset_of("prefix.count"), Some(2));
        assert_eq!(descriptor.offset_of("state"), Some(4));
        assert_eq!(descriptor.offset_of("missing"), None);
        assert_eq!(descriptor.offset_of_struct("prefix"), Some(2));
        assert_eq!(descriptor.offset_of_struct("state"), None);
        assert_eq!(descriptor.offset_of_struct("pre"), None);
        assert_eq!(
            descriptor.to_string(),
            "struct { uint aggregate.count; float aggregate.sum; uint prefix.count; float prefix.sum; uint state; }"
        );
    }

    #[test]
    fn array_offsets_skip_header() {
        let layout = ArrayLayout::new(
            StructLayout::new().with_field("counter", ScalarType::U32),
            StructLayout::new()
                .with_field("a", ScalarType::F32)
                .with_field("b", ScalarType::U32),
        );

        assert_eq!(layout.size_words(0), 1);
        assert_eq!(layout.size_words(3), 7);
        assert_eq!(layout.element_offset(2), 5);
    }
}
