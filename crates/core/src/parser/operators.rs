//! Content stream operator table.
//!
//! The lexer uses it to split keywords that are prefixes of one another
//! (`f` / `f*` / `false`), the inline image scanner and the content parser
//! use the argument counts.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

/// Operand count of a content stream operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpSpec {
    pub num_args: usize,
    /// When set, anything from zero to `num_args` operands is accepted.
    pub variable_args: bool,
}

impl OpSpec {
    const fn fixed(num_args: usize) -> Option<Self> {
        Some(Self {
            num_args,
            variable_args: false,
        })
    }

    const fn variable(num_args: usize) -> Option<Self> {
        Some(Self {
            num_args,
            variable_args: true,
        })
    }

    /// True if `count` operands satisfy this operator.
    pub const fn accepts(&self, count: usize) -> bool {
        if self.variable_args {
            count <= self.num_args
        } else {
            count == self.num_args
        }
    }
}

/// Known keywords. `None` entries are prefixes of longer keywords (`BM` of
/// `BMC`, `fals` of `false`) that are not operators themselves.
pub type KnownCommands = FxHashMap<&'static str, Option<OpSpec>>;

pub static KNOWN_COMMANDS: Lazy<KnownCommands> = Lazy::new(|| {
    let entries: &[(&'static str, Option<OpSpec>)] = &[
        // graphics state
        ("w", OpSpec::fixed(1)),
        ("J", OpSpec::fixed(1)),
        ("j", OpSpec::fixed(1)),
        ("M", OpSpec::fixed(1)),
        ("d", OpSpec::fixed(2)),
        ("ri", OpSpec::fixed(1)),
        ("i", OpSpec::fixed(1)),
        ("gs", OpSpec::fixed(1)),
        ("q", OpSpec::fixed(0)),
        ("Q", OpSpec::fixed(0)),
        ("cm", OpSpec::fixed(6)),
        // path construction
        ("m", OpSpec::fixed(2)),
        ("l", OpSpec::fixed(2)),
        ("c", OpSpec::fixed(6)),
        ("v", OpSpec::fixed(4)),
        ("y", OpSpec::fixed(4)),
        ("h", OpSpec::fixed(0)),
        ("re", OpSpec::fixed(4)),
        // path painting
        ("S", OpSpec::fixed(0)),
        ("s", OpSpec::fixed(0)),
        ("f", OpSpec::fixed(0)),
        ("F", OpSpec::fixed(0)),
        ("f*", OpSpec::fixed(0)),
        ("B", OpSpec::fixed(0)),
        ("B*", OpSpec::fixed(0)),
        ("b", OpSpec::fixed(0)),
        ("b*", OpSpec::fixed(0)),
        ("n", OpSpec::fixed(0)),
        // clipping
        ("W", OpSpec::fixed(0)),
        ("W*", OpSpec::fixed(0)),
        // text objects
        ("BT", OpSpec::fixed(0)),
        ("ET", OpSpec::fixed(0)),
        // text state
        ("Tc", OpSpec::fixed(1)),
        ("Tw", OpSpec::fixed(1)),
        ("Tz", OpSpec::fixed(1)),
        ("TL", OpSpec::fixed(1)),
        ("Tf", OpSpec::fixed(2)),
        ("Tr", OpSpec::fixed(1)),
        ("Ts", OpSpec::fixed(1)),
        // text positioning
        ("Td", OpSpec::fixed(2)),
        ("TD", OpSpec::fixed(2)),
        ("Tm", OpSpec::fixed(6)),
        ("T*", OpSpec::fixed(0)),
        // text showing
        ("Tj", OpSpec::fixed(1)),
        ("TJ", OpSpec::fixed(1)),
        ("'", OpSpec::fixed(1)),
        ("\"", OpSpec::fixed(3)),
        // type 3 fonts
        ("d0", OpSpec::fixed(2)),
        ("d1", OpSpec::fixed(6)),
        // color
        ("CS", OpSpec::fixed(1)),
        ("cs", OpSpec::fixed(1)),
        ("SC", OpSpec::variable(4)),
        ("SCN", OpSpec::variable(33)),
        ("sc", OpSpec::variable(4)),
        ("scn", OpSpec::variable(33)),
        ("G", OpSpec::fixed(1)),
        ("g", OpSpec::fixed(1)),
        ("RG", OpSpec::fixed(3)),
        ("rg", OpSpec::fixed(3)),
        ("K", OpSpec::fixed(4)),
        ("k", OpSpec::fixed(4)),
        // shading
        ("sh", OpSpec::fixed(1)),
        // inline images
        ("BI", OpSpec::fixed(0)),
        ("ID", OpSpec::fixed(0)),
        ("EI", OpSpec::fixed(1)),
        // XObjects
        ("Do", OpSpec::fixed(1)),
        // marked content
        ("MP", OpSpec::fixed(1)),
        ("DP", OpSpec::fixed(2)),
        ("BMC", OpSpec::fixed(1)),
        ("BDC", OpSpec::fixed(2)),
        ("EMC", OpSpec::fixed(0)),
        // compatibility
        ("BX", OpSpec::fixed(0)),
        ("EX", OpSpec::fixed(0)),
        // prefixes only
        ("BM", None),
        ("BD", None),
        ("true", None),
        ("fa", None),
        ("fal", None),
        ("fals", None),
        ("false", None),
        ("nu", None),
        ("nul", None),
        ("null", None),
    ];
    entries.iter().copied().collect()
});

/// Operand spec of `cmd`, `None` for unknown keywords and bare prefixes.
pub fn op_spec(cmd: &str) -> Option<OpSpec> {
    KNOWN_COMMANDS.get(cmd).copied().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_are_known_but_not_operators() {
        assert!(KNOWN_COMMANDS.contains_key("fals"));
        assert_eq!(op_spec("fals"), None);
        assert_eq!(op_spec("Tf").map(|s| s.num_args), Some(2));
    }

    #[test]
    fn variable_operators_accept_fewer_operands() {
        let scn = op_spec("scn").unwrap();
        assert!(scn.accepts(0));
        assert!(scn.accepts(4));
        assert!(!scn.accepts(34));
        assert!(!op_spec("cm").unwrap().accepts(5));
    }
}
