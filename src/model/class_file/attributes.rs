use super::u1;
use super::u2;
use super::constant_pool_index;

/// Each `ExceptionTableEntry` describes one exception handler in the `code`
/// array. The order of the handlers in an `exception_table` array is
/// significant (§2.10). Entries are retained for inspection; control transfer
/// through them is not implemented.
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionTableEntry {
    /// The (inclusive) start of the range in the `code` array at which the
    /// exception handler is active.
    pub start_pc: u2,
    /// The (exclusive) end of the range in the `code` array at which the
    /// exception handler is active.
    pub end_pc: u2,
    /// The start of the exception handler.
    pub handler_pc: u2,
    /// Zero (catch everything) or an index of a `ConstantPoolInfo::Class`.
    pub catch_type: constant_pool_index,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineNumberInfo {
    pub start_pc: u2,
    pub line_number: u2,
}

/// The body of a `Code` attribute: the instructions of one method plus the sizing metadata the
/// interpreter needs to build a frame for it.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeBlock {
    /// The maximum depth of the operand stack, in words (longs and doubles count twice).
    pub max_stack: u2,
    /// The number of local variable slots, including those holding the arguments.
    pub max_locals: u2,
    pub code: Vec<u1>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: Vec<AttributeInfo>,
}

impl CodeBlock {
    /// The line table nested in this block, if there is one.
    pub fn line_numbers(&self) -> Option<&[LineNumberInfo]> {
        self.attributes.iter().filter_map(|attribute| match *attribute {
            AttributeInfo::LineNumberTable { ref line_number_table } =>
                Some(line_number_table.as_slice()),
            _ => None,
        }).next()
    }

    /// Maps a program counter to a source line using the nested line table.
    pub fn line_number_at(&self, pc: usize) -> Option<u2> {
        self.line_numbers().and_then(|table| {
            table.iter()
                .filter(|entry| entry.start_pc as usize <= pc)
                .max_by_key(|entry| entry.start_pc)
                .map(|entry| entry.line_number)
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeInfo {
    ConstantValue { constant_value_index: constant_pool_index },
    Code(CodeBlock),
    Exceptions { exception_index_table: Vec<constant_pool_index> },
    SourceFile { sourcefile_index: constant_pool_index },
    LineNumberTable { line_number_table: Vec<LineNumberInfo> },
    /// Any attribute whose name isn't recognized, kept as the raw bytes of its body.
    Unknown { attribute_name_index: constant_pool_index, info: Vec<u1> },
}
