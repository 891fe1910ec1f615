//! Canonical modes.
//!
//! Surface `ModeExpr`s are canonicalised into `Mode` values by the mode
//! checker: SYNMODE names disappear, NEWMODE names survive as `Novel`
//! wrappers carrying a key unique to the defining declaration.

use std::fmt;

use crate::ast::ParamDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Int,
    Bool,
    Char,
    Time,
    Duration,
}

impl Primitive {
    pub fn as_str(self) -> &'static str {
        match self {
            Primitive::Int => "INT",
            Primitive::Bool => "BOOL",
            Primitive::Char => "CHAR",
            Primitive::Time => "TIME",
            Primitive::Duration => "DURATION",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Mode {
    Primitive(Primitive),
    CharString(u32),
    BitString(u32),
    Enumeration(Vec<String>),
    /// Discrete subrange; `base` is the root discrete mode.
    Range {
        lo: i64,
        hi: i64,
        base: Box<Mode>,
    },
    PowerSet(Box<Mode>),
    Reference(Box<Mode>),
    Structure(Vec<(String, Mode)>),
    Array {
        lo: i64,
        hi: i64,
        index: Box<Mode>,
        elem: Box<Mode>,
    },
    Procedure {
        params: Vec<(ParamDir, Mode)>,
        result: Option<Box<Mode>>,
    },
    Process {
        name: String,
        params: Vec<Mode>,
    },
    Instance,
    Signal {
        name: String,
        payload: Vec<Mode>,
    },
    Buffer {
        capacity: Option<u32>,
        elem: Box<Mode>,
    },
    Event,
    /// A NEWMODE. Two novel modes are compatible only with equal keys.
    Novel {
        name: String,
        key: String,
        inner: Box<Mode>,
    },
    /// Produced after an error; compatible with everything.
    Unknown,
}

/// Bounds of the predefined INT mode.
pub const INT_BOUNDS: (i64, i64) = (i32::MIN as i64, i32::MAX as i64);

/// Largest discrete cardinality treated as finite for POWERSET and
/// CASE exhaustiveness.
pub const MAX_SMALL_CARDINALITY: u64 = 4096;

/// Largest element count of an ARRAY, CHARS, BOOLS or BUFFER mode.
pub const MAX_ARRAY_LENGTH: u32 = i32::MAX as u32;

impl Mode {
    pub fn int() -> Mode {
        Mode::Primitive(Primitive::Int)
    }

    pub fn bool() -> Mode {
        Mode::Primitive(Primitive::Bool)
    }

    pub fn char() -> Mode {
        Mode::Primitive(Primitive::Char)
    }

    pub fn duration() -> Mode {
        Mode::Primitive(Primitive::Duration)
    }

    pub fn range(lo: i64, hi: i64) -> Mode {
        Mode::Range {
            lo,
            hi,
            base: Box::new(Mode::int()),
        }
    }

    /// Predefined mode names other than the primitives.
    pub fn predefined(upper: &str) -> Option<Mode> {
        Some(match upper {
            "INT" => Mode::int(),
            "BOOL" => Mode::bool(),
            "CHAR" => Mode::char(),
            "TIME" => Mode::Primitive(Primitive::Time),
            "DURATION" => Mode::duration(),
            "INSTANCE" => Mode::Instance,
            "BYTE" => Mode::range(-128, 127),
            "UBYTE" => Mode::range(0, 255),
            "UINT" => Mode::range(0, 65_535),
            "LONG" => Mode::range(i64::MIN, i64::MAX),
            "ULONG" => Mode::range(0, u32::MAX as i64),
            _ => return None,
        })
    }

    /// Remove NEWMODE wrappers.
    pub fn strip(&self) -> &Mode {
        let mut mode = self;
        while let Mode::Novel { inner, .. } = mode {
            mode = inner;
        }
        mode
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.strip(), Mode::Unknown)
    }

    /// Root discrete mode: the base of a range, otherwise itself.
    pub fn root(&self) -> &Mode {
        match self.strip() {
            Mode::Range { base, .. } => base.root(),
            other => other,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.root(), Mode::Primitive(Primitive::Int))
    }

    pub fn is_bool(&self) -> bool {
        matches!(self.root(), Mode::Primitive(Primitive::Bool))
    }

    pub fn is_duration(&self) -> bool {
        matches!(self.strip(), Mode::Primitive(Primitive::Duration))
    }

    pub fn is_discrete(&self) -> bool {
        matches!(
            self.root(),
            Mode::Primitive(Primitive::Int | Primitive::Bool | Primitive::Char) | Mode::Enumeration(_)
        )
    }

    pub fn is_char_like(&self) -> bool {
        matches!(self.root(), Mode::Primitive(Primitive::Char) | Mode::CharString(_))
    }

    /// Inclusive value bounds of a discrete mode. Enumerations use
    /// ordinals, BOOL is 0..1 and CHAR is 0..255.
    pub fn discrete_bounds(&self) -> Option<(i64, i64)> {
        match self.strip() {
            Mode::Primitive(Primitive::Int) => Some(INT_BOUNDS),
            Mode::Primitive(Primitive::Bool) => Some((0, 1)),
            Mode::Primitive(Primitive::Char) => Some((0, 255)),
            Mode::Enumeration(names) => Some((0, names.len() as i64 - 1)),
            Mode::Range { lo, hi, .. } => Some((*lo, *hi)),
            _ => None,
        }
    }

    pub fn cardinality(&self) -> Option<u64> {
        let (lo, hi) = self.discrete_bounds()?;
        Some(u64::try_from(hi as i128 - lo as i128 + 1).unwrap_or(u64::MAX))
    }

    /// Whether every value of `self` lies within `other`'s bounds.
    pub fn bounds_within(&self, other: &Mode) -> bool {
        match (self.discrete_bounds(), other.discrete_bounds()) {
            (Some((lo, hi)), Some((olo, ohi))) => olo <= lo && hi <= ohi,
            _ => true,
        }
    }

    /// Structure field by name.
    pub fn field(&self, name: &str) -> Option<&Mode> {
        match self.strip() {
            Mode::Structure(fields) => fields
                .iter()
                .find(|(field, _)| field.eq_ignore_ascii_case(name))
                .map(|(_, mode)| mode),
            _ => None,
        }
    }

    /// Enumeration literal names, looking through ranges and novelty.
    pub fn set_elements(&self) -> Option<&[String]> {
        match self.root() {
            Mode::Enumeration(names) => Some(names),
            _ => None,
        }
    }

    /// Name of a NEWMODE, if this is one.
    pub fn novel_name(&self) -> Option<&str> {
        match self {
            Mode::Novel { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Symmetric compatibility: whether values of one mode may be assigned
/// to, compared with or passed as the other. Range bounds are checked
/// separately.
pub fn compatible(a: &Mode, b: &Mode) -> bool {
    match (a, b) {
        (Mode::Unknown, _) | (_, Mode::Unknown) => true,
        (Mode::Novel { key: ka, .. }, Mode::Novel { key: kb, .. }) => ka == kb,
        (Mode::Novel { inner, .. }, other) | (other, Mode::Novel { inner, .. }) => {
            compatible(inner, other)
        }
        (Mode::Range { base, .. }, other) | (other, Mode::Range { base, .. }) => {
            compatible(base, other)
        }
        (Mode::Primitive(p), Mode::Primitive(q)) => p == q,
        (Mode::CharString(_), Mode::CharString(_)) => true,
        (Mode::Primitive(Primitive::Char), Mode::CharString(_))
        | (Mode::CharString(_), Mode::Primitive(Primitive::Char)) => true,
        (Mode::BitString(n), Mode::BitString(m)) => n == m,
        (Mode::Enumeration(x), Mode::Enumeration(y)) => x == y,
        (Mode::PowerSet(x), Mode::PowerSet(y)) => compatible(x, y),
        (Mode::Reference(x), Mode::Reference(y)) => compatible(x, y),
        (Mode::Structure(x), Mode::Structure(y)) => {
            x.len() == y.len()
                && x.iter()
                    .zip(y)
                    .all(|((nx, mx), (ny, my))| nx.eq_ignore_ascii_case(ny) && compatible(mx, my))
        }
        (
            Mode::Array {
                lo: la,
                hi: ha,
                elem: ea,
                ..
            },
            Mode::Array {
                lo: lb,
                hi: hb,
                elem: eb,
                ..
            },
        ) => ha - la == hb - lb && compatible(ea, eb),
        (
            Mode::Procedure {
                params: pa,
                result: ra,
            },
            Mode::Procedure {
                params: pb,
                result: rb,
            },
        ) => {
            pa.len() == pb.len()
                && pa
                    .iter()
                    .zip(pb)
                    .all(|((da, ma), (db, mb))| da == db && compatible(ma, mb))
                && match (ra, rb) {
                    (None, None) => true,
                    (Some(x), Some(y)) => compatible(x, y),
                    _ => false,
                }
        }
        (Mode::Instance, Mode::Instance) => true,
        (Mode::Buffer { elem: x, .. }, Mode::Buffer { elem: y, .. }) => compatible(x, y),
        (Mode::Event, Mode::Event) => true,
        (Mode::Signal { name: x, .. }, Mode::Signal { name: y, .. }) => x == y,
        _ => false,
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Primitive(p) => f.write_str(p.as_str()),
            Mode::CharString(n) => write!(f, "CHARS({n})"),
            Mode::BitString(n) => write!(f, "BOOLS({n})"),
            Mode::Enumeration(names) => write!(f, "SET({})", names.join(", ")),
            Mode::Range { lo, hi, base } => match base.strip() {
                Mode::Primitive(Primitive::Int) => write!(f, "RANGE({lo}:{hi})"),
                _ => write!(f, "{base}({lo}:{hi})"),
            },
            Mode::PowerSet(base) => write!(f, "POWERSET {base}"),
            Mode::Reference(inner) => write!(f, "REF {inner}"),
            Mode::Structure(fields) => {
                f.write_str("STRUCT(")?;
                for (i, (name, mode)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name} {mode}")?;
                }
                f.write_str(")")
            }
            Mode::Array { lo, hi, elem, .. } => write!(f, "ARRAY({lo}:{hi}) {elem}"),
            Mode::Procedure { params, result } => {
                f.write_str("PROC(")?;
                for (i, (dir, mode)) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match dir {
                        ParamDir::In => write!(f, "{mode}")?,
                        _ => write!(f, "{mode} {}", dir.as_str())?,
                    }
                }
                f.write_str(")")?;
                if let Some(result) = result {
                    write!(f, " RETURNS ({result})")?;
                }
                Ok(())
            }
            Mode::Process { name, params } => {
                write!(f, "PROCESS {name}(")?;
                write_list(f, params)?;
                f.write_str(")")
            }
            Mode::Instance => f.write_str("INSTANCE"),
            Mode::Signal { name, payload } => {
                write!(f, "SIGNAL {name}")?;
                if !payload.is_empty() {
                    f.write_str(" = (")?;
                    write_list(f, payload)?;
                    f.write_str(")")?;
                }
                Ok(())
            }
            Mode::Buffer { capacity, elem } => match capacity {
                Some(n) => write!(f, "BUFFER({n}) {elem}"),
                None => write!(f, "BUFFER {elem}"),
            },
            Mode::Event => f.write_str("EVENT"),
            Mode::Novel { name, .. } => f.write_str(name),
            Mode::Unknown => f.write_str("<unknown>"),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, modes: &[Mode]) -> fmt::Result {
    for (i, mode) in modes.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{mode}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn novel(name: &str, inner: Mode) -> Mode {
        Mode::Novel {
            name: name.into(),
            key: format!("m::{name}"),
            inner: Box::new(inner),
        }
    }

    #[test]
    fn ranges_share_their_base() {
        assert!(compatible(&Mode::range(0, 9), &Mode::int()));
        assert!(compatible(&Mode::range(0, 9), &Mode::range(100, 200)));
        assert!(!compatible(&Mode::range(0, 9), &Mode::bool()));
    }

    #[test]
    fn novel_modes_are_distinct() {
        let a = novel("a", Mode::int());
        let b = novel("b", Mode::int());
        assert!(compatible(&a, &a.clone()));
        assert!(!compatible(&a, &b));
        assert!(compatible(&a, &Mode::int()));
    }

    #[test]
    fn display_forms() {
        let m = Mode::Array {
            lo: 1,
            hi: 10,
            index: Box::new(Mode::range(1, 10)),
            elem: Box::new(Mode::CharString(8)),
        };
        assert_eq!(m.to_string(), "ARRAY(1:10) CHARS(8)");
        let s = Mode::Structure(vec![("x".into(), Mode::int()), ("ok".into(), Mode::bool())]);
        assert_eq!(s.to_string(), "STRUCT(x INT, ok BOOL)");
        assert_eq!(novel("point", s).to_string(), "point");
    }

    #[test]
    fn bounds_and_cardinality() {
        let e = Mode::Enumeration(vec!["idle".into(), "busy".into(), "done".into()]);
        assert_eq!(e.discrete_bounds(), Some((0, 2)));
        assert_eq!(Mode::range(5, 10).cardinality(), Some(6));
        assert!(Mode::range(1, 3).bounds_within(&Mode::range(0, 255)));
        assert!(!Mode::int().bounds_within(&Mode::range(0, 255)));
        assert_eq!(Mode::predefined("LONG").and_then(|m| m.cardinality()), Some(u64::MAX));
    }
}
