use crate::{
    error::StrataError,
    resolver::PositionsByPath,
};

/// A string literal of the linked binary, attributed to one object file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StringLiteral {
    pub address: u64,
    pub size: u64,
    pub object_path: String,
    /// All object paths that contributed exactly this literal (including this one).
    /// Empty if the literal is not shared.
    pub aliases: Vec<String>,
}

impl StringLiteral {
    pub fn end_address(&self) -> u64 {
        self.address + self.size
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Literals that were completely covered by a previous literal
    pub removed: usize,
    pub removed_bytes: u64,
    pub aliases: usize,
}

fn dedupe(mut literals: Vec<StringLiteral>, stats: &mut MergeStats) -> Vec<StringLiteral> {
    /* Deterministic order even in the presence of aliases */
    literals.sort_by(|a, b| a.address.cmp(&b.address).then(b.size.cmp(&a.size)).then_with(|| a.object_path.cmp(&b.object_path)));

    let mut ret = Vec::<StringLiteral>::with_capacity(literals.len());
    let mut groups = Vec::<(usize, usize)>::new();

    for mut literal in literals {
        let Some(prev) = ret.last() else {
            ret.push(literal);
            continue;
        };

        let padding = literal.address as i128 - prev.end_address() as i128;

        if prev.address == literal.address && prev.size == literal.size {
            stats.aliases += 1;

            match groups.last_mut() {
                Some((_, end)) if *end == ret.len() => *end += 1,
                _ => groups.push((ret.len() - 1, ret.len() + 1)),
            }
        } else if padding + literal.size as i128 <= 0 {
            /* Substring of the previous literal */
            stats.removed += 1;
            stats.removed_bytes += literal.size;
            continue;
        } else if padding < 0 {
            /* Overlaps the previous literal */
            let overlap = padding.unsigned_abs() as u64;
            literal.address += overlap;
            literal.size -= overlap;
        }

        ret.push(literal);
    }

    for (start, end) in groups {
        let paths = ret[start..end].iter().map(|x| x.object_path.clone()).collect::<Vec<_>>();

        for literal in &mut ret[start..end] {
            literal.aliases = paths.clone();
        }
    }

    ret.sort_by(|a, b| a.address.cmp(&b.address).then_with(|| a.object_path.cmp(&b.object_path)));
    ret
}

/// Turn the matches inside every string section into literals with absolute addresses.
///
/// `section_addresses[i]` is the address of the section that `positions[i]` was resolved against.
/// Identical literals from different objects become aliases, literals contained in the previous
/// one are dropped and overlapping literals are trimmed so that no byte is attributed twice.
pub fn create_merge_string_replacements(section_addresses: &[u64], positions: &[PositionsByPath]) -> Result<(Vec<Vec<StringLiteral>>, MergeStats), StrataError> {
    if section_addresses.len() != positions.len() {
        return Err(StrataError::MismatchedSections {
            expected: section_addresses.len(),
            actual: positions.len(),
        });
    }

    let mut stats = MergeStats::default();
    let mut ret = Vec::with_capacity(positions.len());

    for (base, positions_by_path) in section_addresses.iter().zip(positions) {
        let mut literals = Vec::new();

        for (object_path, matches) in positions_by_path {
            for m in matches {
                literals.push(StringLiteral {
                    address: base + m.offset,
                    size: m.length,
                    object_path: object_path.clone(),
                    aliases: Vec::new(),
                });
            }
        }

        ret.push(dedupe(literals, &mut stats));
    }

    Ok((ret, stats))
}
