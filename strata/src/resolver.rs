use std::collections::BTreeMap;

use memchr::memmem::Finder;

/// Where a literal's bytes were found inside one string section of the linked binary
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchResult {
    pub offset: u64,
    pub length: u64,
}

/// The matches of one string section, grouped by the source path of the literals
pub type PositionsByPath = BTreeMap<String, Vec<MatchResult>>;

/// A match is exact if it starts at a string boundary
fn is_boundary(haystack: &[u8], offset: usize) -> bool {
    offset == 0 || haystack[offset - 1] == 0
}

/// Attributes literals to the string sections of a linked binary.
///
/// Merged string sections do not remember where their strings came from, so a literal is
/// attributed to the first occurrence that starts at a string boundary. If there is none,
/// the first occurrence of any kind is taken. Identical strings are indistinguishable and
/// always land on the same occurrence.
pub struct StringResolver<'a, H: AsRef<[u8]>> {
    haystacks: &'a [H],
}

impl<'a, H: AsRef<[u8]>> StringResolver<'a, H> {
    pub fn new(haystacks: &'a [H]) -> Self {
        Self {
            haystacks,
        }
    }

    /// Locate a single literal: `(haystack index, offset)`
    pub fn locate(&self, needle: &[u8]) -> Option<(usize, usize)> {
        if needle.is_empty() {
            return None;
        }

        let finder = Finder::new(needle);
        let mut first_match = None;

        for (idx, haystack) in self.haystacks.iter().enumerate() {
            let haystack = haystack.as_ref();
            let mut start = 0;

            while let Some(offset) = haystack.get(start..).and_then(|x| finder.find(x)).map(|x| x + start) {
                if is_boundary(haystack, offset) {
                    return Some((idx, offset));
                }

                if first_match.is_none() {
                    first_match = Some((idx, offset));
                }

                /* Overlapping occurrences are not considered */
                start = offset + needle.len();
            }
        }

        first_match
    }

    /// Locate every literal and group the matches by haystack and source path.
    /// Literals that occur nowhere were optimized away and produce no result.
    pub fn resolve<I, P, N>(&self, needles: I) -> Vec<PositionsByPath>
    where
        I: IntoIterator<Item = (P, N)>,
        P: AsRef<str>,
        N: AsRef<[u8]>,
    {
        let mut ret = vec![PositionsByPath::new(); self.haystacks.len()];

        for (path, needle) in needles {
            let needle = needle.as_ref();

            if let Some((idx, offset)) = self.locate(needle) {
                ret[idx].entry(path.as_ref().to_string()).or_default().push(MatchResult {
                    offset: offset as u64,
                    length: needle.len() as u64,
                });
            }
        }

        ret
    }
}

/// Resolve all literals of all paths against `haystacks`
pub fn resolve_literals<H: AsRef<[u8]>>(literals: &BTreeMap<String, Vec<Vec<u8>>>, haystacks: &[H]) -> Vec<PositionsByPath> {
    let needles = literals.iter().flat_map(|(path, values)| values.iter().map(move |value| (path.as_str(), value.as_slice())));
    StringResolver::new(haystacks).resolve(needles)
}
