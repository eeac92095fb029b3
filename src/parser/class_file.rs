use nom::combinator::map;
use nom::multi::length_count;
use nom::sequence::{pair, tuple};

use crate::error::ClassFormatError;
use crate::model::class_file::{AttributeInfo, ClassFile, CodeBlock, FieldInfo, MethodInfo, MAGIC};
use crate::model::class_file::attributes::{ExceptionTableEntry, LineNumberInfo};
use crate::model::class_file::constant_pool::{self, ConstantPool, ConstantPoolInfo, Tag};
use crate::util::modified_utf8;

use super::reader::{fail, finish, read_u1, read_u2, read_u4, read_u4_prefixed, read_utf8_bytes,
                    Input, ParseResult};

pub type ConstantPoolIndex = constant_pool::constant_pool_index;

fn magic(input: Input) -> ParseResult<u32> {
    match read_u4(input) {
        Ok((rest, MAGIC)) => Ok((rest, MAGIC)),
        Ok((_, found)) => fail(ClassFormatError::BadMagic { found }),
        Err(e) => {
            // fewer than four bytes: only a prefix of the magic is a truncation
            if MAGIC.to_be_bytes().starts_with(input) {
                Err(e)
            } else {
                let mut bytes = [0; 4];
                bytes[..input.len()].copy_from_slice(input);
                fail(ClassFormatError::BadMagic { found: u32::from_be_bytes(bytes) })
            }
        },
    }
}

/// Parses a constant pool index and verifies that the entry it refers to has the given tag.
fn cp_index_tag<'a>(input: Input<'a>, constant_pool: &ConstantPool, tag: Tag)
                    -> ParseResult<'a, ConstantPoolIndex> {
    let (input, index) = read_u2(input)?;
    match constant_pool.get_tagged(index, tag) {
        Ok(_) => Ok((input, index)),
        Err(e) => fail(e),
    }
}

/// Like `cp_index_tag`, but zero is also accepted.
fn maybe_cp_index_tag<'a>(input: Input<'a>, constant_pool: &ConstantPool, tag: Tag)
                          -> ParseResult<'a, ConstantPoolIndex> {
    let (rest, index) = read_u2(input)?;
    if index == 0 {
        Ok((rest, index))
    } else {
        cp_index_tag(input, constant_pool, tag)
    }
}

fn cp_info(input: Input, index: ConstantPoolIndex) -> ParseResult<ConstantPoolInfo> {
    let (input, tag) = map(read_u1, Tag::from)(input)?;
    match tag {
        Tag::Class => map(read_u2, |name_index| ConstantPoolInfo::Class { name_index })(input),

        Tag::FieldRef => map(pair(read_u2, read_u2),
                             |(class_index, name_and_type_index)| ConstantPoolInfo::FieldRef {
                                 class_index,
                                 name_and_type_index,
                             })(input),

        Tag::MethodRef => map(pair(read_u2, read_u2),
                              |(class_index, name_and_type_index)| ConstantPoolInfo::MethodRef {
                                  class_index,
                                  name_and_type_index,
                              })(input),

        Tag::InterfaceMethodRef => map(pair(read_u2, read_u2),
                                       |(class_index, name_and_type_index)|
                                       ConstantPoolInfo::InterfaceMethodRef {
                                           class_index,
                                           name_and_type_index,
                                       })(input),

        Tag::String => map(read_u2,
                           |string_index| ConstantPoolInfo::String { string_index })(input),

        Tag::Integer => map(read_u4, |bytes| ConstantPoolInfo::Integer { bytes })(input),

        Tag::Float => map(read_u4, |bytes| ConstantPoolInfo::Float { bytes })(input),

        Tag::Long => map(pair(read_u4, read_u4),
                         |(high_bytes, low_bytes)| ConstantPoolInfo::Long {
                             high_bytes,
                             low_bytes,
                         })(input),

        Tag::Double => map(pair(read_u4, read_u4),
                           |(high_bytes, low_bytes)| ConstantPoolInfo::Double {
                               high_bytes,
                               low_bytes,
                           })(input),

        Tag::NameAndType => map(pair(read_u2, read_u2),
                                |(name_index, descriptor_index)| ConstantPoolInfo::NameAndType {
                                    name_index,
                                    descriptor_index,
                                })(input),

        Tag::Utf8 => {
            let (input, bytes) = read_utf8_bytes(input)?;
            match modified_utf8::from_modified_utf8(bytes) {
                Ok(value) => Ok((input, ConstantPoolInfo::Utf8 { value })),
                Err(_) => fail(ClassFormatError::MalformedUtf8 { index }),
            }
        },

        Tag::MethodHandle => map(pair(map(read_u1, constant_pool::reference_kind::Tag::from),
                                      read_u2),
                                 |(reference_kind, reference_index)|
                                 ConstantPoolInfo::MethodHandle {
                                     reference_kind,
                                     reference_index,
                                 })(input),

        Tag::MethodType => map(read_u2, |descriptor_index| ConstantPoolInfo::MethodType {
            descriptor_index
        })(input),

        Tag::InvokeDynamic => map(pair(read_u2, read_u2),
                                  |(bootstrap_method_attr_index, name_and_type_index)|
                                  ConstantPoolInfo::InvokeDynamic {
                                      bootstrap_method_attr_index,
                                      name_and_type_index,
                                  })(input),

        Tag::Unknown(tag) => fail(ClassFormatError::UnknownTag { tag, index }),
    }
}

/// Reads `constant_pool_count` and then the entries for indices `1..constant_pool_count`. A long
/// or double consumes its own index and the next one.
fn constant_pool(input: Input) -> ParseResult<ConstantPool> {
    let (mut input, count) = read_u2(input)?;
    let mut constant_pool = ConstantPool::new();
    // u32, so that a wide entry at index 65534 can't overflow
    let mut next: u32 = 1;
    while next < u32::from(count) {
        let index = next as ConstantPoolIndex;
        let (rest, info) = cp_info(input, index)?;
        let width = if info.is_wide() { 2 } else { 1 };
        if next + width > u32::from(count) {
            return fail(ClassFormatError::IndexOutOfRange { index: index + 1, count });
        }
        trace!("constant pool #{}: {:?}", index, info);
        constant_pool.push(info);
        next += width;
        input = rest;
    }
    if let Err(e) = constant_pool.check_references() {
        return fail(e);
    }
    Ok((input, constant_pool))
}

fn exception_table_entry<'a>(input: Input<'a>, constant_pool: &ConstantPool)
                             -> ParseResult<'a, ExceptionTableEntry> {
    let (input, (start_pc, end_pc, handler_pc)) = tuple((read_u2, read_u2, read_u2))(input)?;
    let (input, catch_type) = maybe_cp_index_tag(input, constant_pool, Tag::Class)?;
    Ok((input, ExceptionTableEntry { start_pc, end_pc, handler_pc, catch_type }))
}

fn line_number_info(input: Input) -> ParseResult<LineNumberInfo> {
    map(pair(read_u2, read_u2),
        |(start_pc, line_number)| LineNumberInfo { start_pc, line_number })(input)
}

fn code<'a>(input: Input<'a>, constant_pool: &ConstantPool) -> ParseResult<'a, CodeBlock> {
    let (input, max_stack) = read_u2(input)?;
    let (input, max_locals) = read_u2(input)?;
    let (input, code) = read_u4_prefixed(input)?;
    let (input, exception_table) = length_count(
        read_u2, |i| exception_table_entry(i, constant_pool))(input)?;
    let (input, attributes) = attributes(input, constant_pool)?;
    Ok((input, CodeBlock {
        max_stack,
        max_locals,
        code: code.to_vec(),
        exception_table,
        attributes,
    }))
}

/// Decodes the body of an attribute, which is exactly `attribute_length` bytes long.
fn attribute_info<'a>(body: Input<'a>, attribute_name: &str,
                      attribute_name_index: ConstantPoolIndex, constant_pool: &ConstantPool)
                      -> ParseResult<'a, AttributeInfo> {
    match attribute_name {
        "Code" => map(|i| code(i, constant_pool), AttributeInfo::Code)(body),

        "ConstantValue" => map(read_u2, |constant_value_index| AttributeInfo::ConstantValue {
            constant_value_index
        })(body),

        "SourceFile" => map(|i| cp_index_tag(i, constant_pool, Tag::Utf8),
                            |sourcefile_index| AttributeInfo::SourceFile {
                                sourcefile_index
                            })(body),

        "LineNumberTable" => map(length_count(read_u2, line_number_info),
                                 |line_number_table| AttributeInfo::LineNumberTable {
                                     line_number_table
                                 })(body),

        "Exceptions" => map(length_count(read_u2, |i| cp_index_tag(i, constant_pool, Tag::Class)),
                            |exception_index_table| AttributeInfo::Exceptions {
                                exception_index_table
                            })(body),

        _ => Ok((&body[body.len()..], AttributeInfo::Unknown {
            attribute_name_index,
            info: body.to_vec(),
        })),
    }
}

fn attribute<'a>(input: Input<'a>, constant_pool: &ConstantPool) -> ParseResult<'a, AttributeInfo> {
    let (input, attribute_name_index) = cp_index_tag(input, constant_pool, Tag::Utf8)?;
    let (input, body) = read_u4_prefixed(input)?;
    let attribute_name = match constant_pool.resolve_utf8(attribute_name_index) {
        Ok(name) => name,
        Err(e) => return fail(e),
    };
    let (rest, attribute) = attribute_info(body, attribute_name, attribute_name_index,
                                           constant_pool)?;
    if !rest.is_empty() {
        return fail(ClassFormatError::AttributeLength {
            name: String::from(attribute_name),
            declared: body.len() as u32,
            consumed: body.len() - rest.len(),
        });
    }
    Ok((input, attribute))
}

fn attributes<'a>(input: Input<'a>, constant_pool: &ConstantPool)
                  -> ParseResult<'a, Vec<AttributeInfo>> {
    length_count(read_u2, |i| attribute(i, constant_pool))(input)
}

fn field<'a>(input: Input<'a>, constant_pool: &ConstantPool) -> ParseResult<'a, FieldInfo> {
    let (input, access_flags) = read_u2(input)?;
    let (input, name_index) = cp_index_tag(input, constant_pool, Tag::Utf8)?;
    let (input, descriptor_index) = cp_index_tag(input, constant_pool, Tag::Utf8)?;
    let (input, attributes) = attributes(input, constant_pool)?;
    Ok((input, FieldInfo { access_flags, name_index, descriptor_index, attributes }))
}

fn method<'a>(input: Input<'a>, constant_pool: &ConstantPool) -> ParseResult<'a, MethodInfo> {
    let (input, access_flags) = read_u2(input)?;
    let (input, name_index) = cp_index_tag(input, constant_pool, Tag::Utf8)?;
    let (input, descriptor_index) = cp_index_tag(input, constant_pool, Tag::Utf8)?;
    let (input, attributes) = attributes(input, constant_pool)?;
    Ok((input, MethodInfo { access_flags, name_index, descriptor_index, attributes }))
}

fn class_file(input: Input) -> ParseResult<ClassFile> {
    let (input, _) = magic(input)?;
    let (input, minor_version) = read_u2(input)?;
    let (input, major_version) = read_u2(input)?;
    let (input, constant_pool) = constant_pool(input)?;
    let (input, access_flags) = read_u2(input)?;
    let (input, this_class) = cp_index_tag(input, &constant_pool, Tag::Class)?;
    let (input, super_class) = maybe_cp_index_tag(input, &constant_pool, Tag::Class)?;
    let (input, interfaces) = length_count(
        read_u2, |i| cp_index_tag(i, &constant_pool, Tag::Class))(input)?;
    let (input, fields) = length_count(read_u2, |i| field(i, &constant_pool))(input)?;
    let (input, methods) = length_count(read_u2, |i| method(i, &constant_pool))(input)?;
    let (input, attributes) = attributes(input, &constant_pool)?;
    Ok((input, ClassFile {
        minor_version,
        major_version,
        constant_pool,
        access_flags,
        this_class,
        super_class,
        interfaces,
        fields,
        methods,
        attributes,
    }))
}

/// Parses a complete class file. Trailing bytes after the class-level attributes are rejected.
pub fn parse_class_file(input: Input) -> Result<ClassFile, ClassFormatError> {
    let (rest, class_file) = finish(class_file(input))?;
    if !rest.is_empty() {
        return Err(ClassFormatError::TrailingBytes { count: rest.len() });
    }
    Ok(class_file)
}
