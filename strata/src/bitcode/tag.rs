/*
Lines of an llvm-bcanalyzer dump look like this (leading whitespace already stripped):

<TYPE_BLOCK_ID_NEW NumWords=84 BlockCodeSize=4>
<ARRAY abbrevid=9 op0=4 op1=1/>
<CSTRING abbrevid=6 op0=102 op1=111 op2=111/> record string = 'foo'
</CONSTANTS_BLOCK>

This is not a real grammar. Anything that does not look like a tag is ignored by the callers.
*/

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagKind {
    Opening,
    Closing,
    SelfClosing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tag<'a> {
    pub kind: TagKind,
    pub name: &'a str,
    /// Index into the line where the attributes start
    pub attr_start: usize,
}

const OPERAND_PREFIX: &str = "op";

fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// Parse the tag at the start of `line`.
/// Returns `None` if the line does not start with `<NAME`, `</NAME` or lacks the closing `>`.
pub fn scan_tag(line: &str) -> Option<Tag<'_>> {
    let bytes = line.as_bytes();

    if bytes.first() != Some(&b'<') {
        return None;
    }

    let (kind, name_start) = if bytes.get(1) == Some(&b'/') { (TagKind::Closing, 2) } else { (TagKind::Opening, 1) };
    let mut name_end = name_start;

    while name_end < bytes.len() && is_name_char(bytes[name_end]) {
        name_end += 1;
    }

    if name_end == name_start {
        return None;
    }

    /* The name must be followed by attributes or the end of the tag */
    if !matches!(bytes.get(name_end), Some(b' ' | b'\t' | b'/' | b'>')) {
        return None;
    }

    let close = name_end + line[name_end..].find('>')?;
    let kind = if kind == TagKind::Opening && bytes[close - 1] == b'/' { TagKind::SelfClosing } else { kind };

    Some(Tag {
        kind,
        name: &line[name_start..name_end],
        attr_start: name_end,
    })
}

/// Iterator over the values of the `opN=value` attributes of a tag
#[derive(Clone, Debug)]
pub struct Operands<'a> {
    attrs: std::str::SplitAsciiWhitespace<'a>,
}

impl<'a> Iterator for Operands<'a> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        for attr in self.attrs.by_ref() {
            let Some((key, value)) = attr.split_once('=') else {
                continue;
            };

            /* Skips abbrevid= and any other non-operand attribute */
            let is_operand = key.strip_prefix(OPERAND_PREFIX).map(|n| !n.is_empty() && n.bytes().all(|c| c.is_ascii_digit())).unwrap_or(false);

            if !is_operand {
                continue;
            }

            /* An unparsable value ends the operand list, callers verify the count */
            return value.parse().ok();
        }

        None
    }
}

/// The operands of the tag whose attributes start at `attr_start`.
/// Only the text up to the end of the tag is considered, trailing text like
/// `record string = 'op0=1'` is never mistaken for operands.
pub fn operands(line: &str, attr_start: usize) -> Operands<'_> {
    let attrs = line.get(attr_start..).unwrap_or("");
    let end = attrs.find('>').unwrap_or(attrs.len());
    let attrs = attrs[..end].strip_suffix('/').unwrap_or(&attrs[..end]);

    Operands {
        attrs: attrs.split_ascii_whitespace(),
    }
}
