use crate::{
    bitcode::{
        tag::operands,
        types::{
            ArrayType,
            TypeTable,
        },
    },
    error::StrataError,
};

/// Append `value` as a little-endian integer of `width` bytes
pub fn pack_le(value: u64, width: u32, out: &mut Vec<u8>) -> bool {
    let width = width as usize;

    if width == 0 || width > 8 || (width < 8 && value >> (width * 8) != 0) {
        return false;
    }

    out.extend_from_slice(&value.to_le_bytes()[..width]);
    true
}

/// Decodes the string-like records of a constants block.
///
/// `SETTYPE` records select the type of all following constants. Only records whose type
/// is an integer array with elements no wider than the char width limit are decoded.
#[derive(Debug)]
pub struct ConstantBlockParser {
    active_array_type: Option<ArrayType>,
    char_width_limit: u32,
}

impl ConstantBlockParser {
    pub fn new(char_width_limit: u32) -> Self {
        Self {
            active_array_type: None,
            char_width_limit,
        }
    }

    pub fn active_array_type(&self) -> Option<ArrayType> {
        self.active_array_type
    }

    /// Process one tag of the constants block.
    /// Returns the bytes of the constant if the tag was a string record of a string type.
    pub fn feed(&mut self, types: &TypeTable, line: &str, tag_name: &str, attr_start: usize) -> Result<Option<Vec<u8>>, StrataError> {
        match tag_name {
            "SETTYPE" => {
                self.active_array_type = operands(line, attr_start).next().and_then(|x| u32::try_from(x).ok()).and_then(|x| types.lookup_array(x));
                Ok(None)
            },
            "CSTRING" | "STRING" | "DATA" => match self.active_array_type {
                Some(array) if array.element_width_bytes <= self.char_width_limit => self.decode(array, line, tag_name, attr_start).map(Some),
                _ => Ok(None),
            },
            _ => Ok(None),
        }
    }

    fn decode(&self, array: ArrayType, line: &str, tag_name: &str, attr_start: usize) -> Result<Vec<u8>, StrataError> {
        let width = array.element_width_bytes;
        let mut bytes = Vec::with_capacity((array.length as usize + 1) * width as usize);

        for value in operands(line, attr_start) {
            if !pack_le(value, width, &mut bytes) {
                return Err(StrataError::OperandOverflow {
                    record: tag_name.to_string(),
                    value,
                    width,
                });
            }
        }

        let declared = array.length as usize * width as usize;
        let decoded = bytes.len();

        let valid = if tag_name == "CSTRING" {
            bytes.resize(decoded + width as usize, 0);

            /* The declared length either counts the characters or the characters plus terminator */
            bytes.len() == declared + width as usize || bytes.len() == declared
        } else {
            decoded == declared
        };

        if valid {
            Ok(bytes)
        } else {
            Err(StrataError::MalformedConstantRecord {
                record: tag_name.to_string(),
                expected: declared,
                actual: bytes.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;
    use crate::bitcode::tag::scan_tag;

    fn table(lines: &[&str]) -> TypeTable {
        let mut table = TypeTable::new();

        for line in lines {
            let tag = scan_tag(line).unwrap();
            table.feed(line, tag.name, tag.attr_start);
        }

        table
    }

    fn feed(parser: &mut ConstantBlockParser, types: &TypeTable, line: &str) -> Result<Option<Vec<u8>>, StrataError> {
        let tag = scan_tag(line).unwrap();
        parser.feed(types, line, tag.name, tag.attr_start)
    }

    #[test]
    fn test_cstring() {
        let types = table(&["<INTEGER op0=8/>", "<ARRAY op0=3 op1=0/>"]);
        let mut parser = ConstantBlockParser::new(2);

        assert_eq!(feed(&mut parser, &types, "<SETTYPE op0=1/>").unwrap(), None);
        assert_eq!(feed(&mut parser, &types, "<CSTRING op0=70 op1=111 op2=111/>").unwrap(), Some(vec![0x46, 0x6F, 0x6F, 0x00]));
    }

    #[test]
    fn test_cstring_counting_terminator() {
        /* [4 x i8] c"Foo\00" */
        let types = table(&["<INTEGER op0=8/>", "<ARRAY op0=4 op1=0/>"]);
        let mut parser = ConstantBlockParser::new(2);

        feed(&mut parser, &types, "<SETTYPE abbrevid=4 op0=1/>").unwrap();
        assert_eq!(feed(&mut parser, &types, "<CSTRING abbrevid=6 op0=70 op1=111 op2=111/> record string = 'Foo'").unwrap(), Some(b"Foo\0".to_vec()));
    }

    #[test]
    fn test_wide_string() {
        let types = table(&["<INTEGER op0=16/>", "<ARRAY op0=2 op1=0/>"]);
        let mut parser = ConstantBlockParser::new(2);

        feed(&mut parser, &types, "<SETTYPE op0=1/>").unwrap();
        assert_eq!(feed(&mut parser, &types, "<STRING op0=72 op1=960/>").unwrap(), Some(vec![72, 0, 0xc0, 0x03]));
        assert_eq!(feed(&mut parser, &types, "<CSTRING op0=72 op1=105/>").unwrap(), Some(vec![72, 0, 105, 0, 0, 0]));
    }

    #[test]
    fn test_too_wide() {
        let types = table(&["<INTEGER op0=32/>", "<ARRAY op0=2 op1=0/>"]);
        let mut parser = ConstantBlockParser::new(2);

        feed(&mut parser, &types, "<SETTYPE op0=1/>").unwrap();
        assert_eq!(feed(&mut parser, &types, "<DATA op0=1 op1=2/>").unwrap(), None);

        let mut parser = ConstantBlockParser::new(4);
        feed(&mut parser, &types, "<SETTYPE op0=1/>").unwrap();
        assert_eq!(feed(&mut parser, &types, "<DATA op0=1 op1=2/>").unwrap(), Some(vec![1, 0, 0, 0, 2, 0, 0, 0]));
    }

    #[test]
    fn test_untyped_records_skipped() {
        let types = table(&["<INTEGER op0=8/>", "<ARRAY op0=3 op1=0/>"]);
        let mut parser = ConstantBlockParser::new(2);

        assert_eq!(feed(&mut parser, &types, "<CSTRING op0=70 op1=111 op2=111/>").unwrap(), None);

        /* Scalar type */
        feed(&mut parser, &types, "<SETTYPE op0=0/>").unwrap();
        assert_eq!(parser.active_array_type(), None);
        assert_eq!(feed(&mut parser, &types, "<INTEGER op0=2/>").unwrap(), None);
        assert_eq!(feed(&mut parser, &types, "<STRING op0=70/>").unwrap(), None);

        /* Unknown type */
        feed(&mut parser, &types, "<SETTYPE op0=77/>").unwrap();
        assert_eq!(feed(&mut parser, &types, "<STRING op0=70/>").unwrap(), None);
    }

    #[test]
    fn test_length_mismatch() {
        let types = table(&["<INTEGER op0=8/>", "<ARRAY op0=3 op1=0/>"]);
        let mut parser = ConstantBlockParser::new(2);

        feed(&mut parser, &types, "<SETTYPE op0=1/>").unwrap();
        assert!(matches!(feed(&mut parser, &types, "<STRING op0=70 op1=111/>"), Err(StrataError::MalformedConstantRecord { expected: 3, actual: 2, .. })));
        assert!(matches!(feed(&mut parser, &types, "<CSTRING op0=70/>"), Err(StrataError::MalformedConstantRecord { .. })));
        assert!(matches!(feed(&mut parser, &types, "<DATA op0=1 op1=2 op2=256/>"), Err(StrataError::OperandOverflow { value: 256, .. })));
    }

    #[test]
    fn test_record_lengths() {
        for (bits, width) in [(8, 1), (16, 2)] {
            for length in 1..6u32 {
                let integer = format!("<INTEGER op0={bits}/>");
                let array = format!("<ARRAY op0={length} op1=0/>");
                let types = table(&[&integer, &array]);
                let ops = (0..length).map(|i| format!("op{i}={}", 65 + i)).collect::<Vec<_>>().join(" ");
                let mut parser = ConstantBlockParser::new(2);

                feed(&mut parser, &types, "<SETTYPE op0=1/>").unwrap();

                let cstring = feed(&mut parser, &types, &format!("<CSTRING {ops}/>")).unwrap().unwrap();
                assert_eq!(cstring.len() as u32, length * width + width);

                let string = feed(&mut parser, &types, &format!("<STRING {ops}/>")).unwrap().unwrap();
                assert_eq!(string.len() as u32, length * width);
            }
        }
    }

    #[test]
    fn test_pack_roundtrip() {
        let mut rng = rand::thread_rng();

        for width in [1u32, 2, 4] {
            let max = (1u64 << (width * 8)) - 1;
            let values = (0..64).map(|_| rng.gen_range(0..=max)).collect::<Vec<u64>>();
            let mut bytes = Vec::new();

            for value in &values {
                assert!(pack_le(*value, width, &mut bytes));
            }

            let decoded = bytes
                .chunks(width as usize)
                .map(|chunk| {
                    let mut buf = [0u8; 8];
                    buf[..chunk.len()].copy_from_slice(chunk);
                    u64::from_le_bytes(buf)
                })
                .collect::<Vec<_>>();
            assert_eq!(decoded, values);
        }
    }

    #[test]
    fn test_pack_overflow() {
        let mut bytes = Vec::new();
        assert!(!pack_le(256, 1, &mut bytes));
        assert!(!pack_le(1, 0, &mut bytes));
        assert!(pack_le(u64::MAX, 8, &mut bytes));
        assert_eq!(bytes, vec![0xff; 8]);
    }
}
