use rustc_hash::FxHashMap;

use crate::bitcode::tag::operands;

/// A scalar integer type declared in the type block
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntegerType {
    pub type_id: u32,
    pub bit_width: u32,
}

/// An array whose elements are integers of at most 32 bits, i.e. a potential string type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArrayType {
    pub type_id: u32,
    pub length: u32,
    pub element_width_bytes: u32,
}

const MAX_ELEMENT_BITS: u32 = 32;

/// The type table of one bitcode module.
///
/// Type ids are not printed in the dump, they are implied by the declaration order.
/// Every declaration consumes one id, including the ones that are not interesting to us.
#[derive(Debug, Default)]
pub struct TypeTable {
    next_id: u32,
    integers: FxHashMap<u32, IntegerType>,
    arrays: FxHashMap<u32, ArrayType>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one tag of the type block
    pub fn feed(&mut self, line: &str, tag_name: &str, attr_start: usize) {
        let type_id = self.next_id;
        let mut ops = operands(line, attr_start);

        match tag_name {
            /* Not a type declaration */
            "NUMENTRY" => return,

            /* Names the struct declared by the next tag */
            "STRUCT_NAME" => return,

            "INTEGER" => {
                if let Some(bit_width) = ops.next().and_then(|x| u32::try_from(x).ok()) {
                    self.integers.insert(type_id, IntegerType {
                        type_id,
                        bit_width,
                    });
                }
            },

            "ARRAY" => {
                if let (Some(length), Some(element_type)) = (ops.next(), ops.next()) {
                    let element = u32::try_from(element_type).ok().and_then(|x| self.integers.get(&x));

                    if let (Ok(length), Some(element)) = (u32::try_from(length), element) {
                        let element_width_bytes = element.bit_width / 8;

                        if element.bit_width <= MAX_ELEMENT_BITS && element_width_bytes > 0 {
                            self.arrays.insert(type_id, ArrayType {
                                type_id,
                                length,
                                element_width_bytes,
                            });
                        }
                    }
                }
            },

            _ => {},
        }

        self.next_id += 1;
    }

    pub fn lookup_array(&self, type_id: u32) -> Option<ArrayType> {
        self.arrays.get(&type_id).copied()
    }

    pub fn lookup_integer(&self, type_id: u32) -> Option<IntegerType> {
        self.integers.get(&type_id).copied()
    }

    /// Number of type ids handed out so far
    pub fn len(&self) -> u32 {
        self.next_id
    }

    pub fn is_empty(&self) -> bool {
        self.next_id == 0
    }
}
