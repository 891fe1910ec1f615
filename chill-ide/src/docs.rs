//! Hover text for keywords and predefined names.

use chill_core::lexer::Keyword;

/// Short description of a keyword, if it has one worth showing.
pub fn keyword(kw: Keyword) -> Option<&'static str> {
    let text = match kw {
        Keyword::Module => "`name: MODULE ... END name;` a compilation unit and its visibility boundary.",
        Keyword::Grant => "`GRANT a, b;` makes names of this module visible to other units.",
        Keyword::Seize => "`SEIZE a, b;` imports names granted by another unit.",
        Keyword::Dcl => "`DCL x, y mode [:= value];` declares locations.",
        Keyword::Newmode => "`NEWMODE m = mode;` introduces a mode that is only compatible with itself.",
        Keyword::Synmode => "`SYNMODE m = mode;` introduces a transparent alias for a mode.",
        Keyword::Syn => "`SYN name [mode] = constant;` names a constant value.",
        Keyword::Proc => "`p: PROC (params) [RETURNS (mode)]; ... END p;` a procedure.",
        Keyword::Process => "`p: PROCESS (params); ... END p;` a process definition, started with START.",
        Keyword::Region => "`r: REGION ... END r;` mutual exclusion; procedures inside run one at a time.",
        Keyword::Signal => "`SIGNAL s = (modes) [TO process];` a typed message for RECEIVE CASE.",
        Keyword::Send => "`SEND s(values) [TO instance];` sends a signal, or `SEND buffer(value);`.",
        Keyword::Receive => "`RECEIVE CASE (s IN x): ...; ESAC;` waits for one of the listed signals.",
        Keyword::Start => "`START p(args)` creates a process instance; yields an INSTANCE value.",
        Keyword::Stop => "`STOP;` terminates the executing process.",
        Keyword::Delay => "`DELAY d;` suspends for a DURATION, or `DELAY e;` waits on an EVENT.",
        Keyword::Continue => "`CONTINUE e;` wakes one process delayed on the EVENT `e`.",
        Keyword::Buffer => "`BUFFER (n) mode` a bounded queue of values shared between processes.",
        Keyword::Event => "`EVENT` a synchronisation point used with DELAY and CONTINUE.",
        Keyword::If => "`IF c THEN ... ELSIF c THEN ... ELSE ... FI;` conditional action.",
        Keyword::Case => "`CASE e OF (v): ...; ELSE ...; ESAC;` selects an alternative by value.",
        Keyword::Do => "`DO [FOR ...] [WHILE c]; ... OD;` a loop or a bracketed action list.",
        Keyword::For => "`DO FOR i := a TO b [BY s]; ... OD;` counts over a range.",
        Keyword::Ever => "`DO FOR EVER; ... OD;` loops until EXIT, RETURN or STOP.",
        Keyword::While => "`DO WHILE c; ... OD;` loops while the condition holds.",
        Keyword::Exit => "`EXIT label;` leaves the labelled loop or block.",
        Keyword::Return => "`RETURN [value];` leaves the enclosing procedure.",
        Keyword::Result => "`RESULT value;` sets the value returned when the procedure ends.",
        Keyword::Set => "`SET(a, b, c)` an enumerated mode.",
        Keyword::Range => "`RANGE(lo:hi)` a discrete subrange of INT.",
        Keyword::Powerset => "`POWERSET mode` a set of values of a small discrete mode.",
        Keyword::Ref => "`REF mode` a reference to a location.",
        Keyword::Struct => "`STRUCT (a mode, b mode)` a record.",
        Keyword::Array => "`ARRAY (lo:hi) mode` a fixed-size array.",
        Keyword::Chars => "`CHARS(n)` a character string of at most n characters.",
        Keyword::Bools => "`BOOLS(n)` a bit string of n bits.",
        Keyword::In => "Parameter passed by value; also `s IN x` binds signal values in RECEIVE CASE.",
        Keyword::Out => "Parameter whose value is written back to the caller.",
        Keyword::Inout => "Parameter read and written through the caller's location.",
        Keyword::Loc => "Parameter passed as a location.",
        Keyword::Mod => "Integer modulus; the result has the sign of the right operand.",
        Keyword::Rem => "Integer remainder; the result has the sign of the left operand.",
        Keyword::AndIf => "Short-circuit AND.",
        Keyword::OrIf => "Short-circuit OR.",
        Keyword::Init => "`DCL x mode INIT := value;` initial value of a location.",
        Keyword::Static => "`DCL x STATIC mode;` a location that keeps its value between calls.",
        _ => return None,
    };
    Some(text)
}

/// Short description of a predefined name, given in upper case.
pub fn predefined(upper: &str) -> Option<&'static str> {
    let text = match upper {
        "INT" => "Signed 32-bit integer mode.",
        "BOOL" => "Boolean mode with values TRUE and FALSE.",
        "CHAR" => "Single character mode.",
        "DURATION" => "Length of time, in milliseconds. Built with `n SECS` or `SECS(n)`.",
        "TIME" => "Absolute time, in seconds.",
        "INSTANCE" => "Handle of a started process.",
        "BYTE" | "UBYTE" | "UINT" | "LONG" | "ULONG" => "Implementation integer mode.",
        "TRUE" | "FALSE" => "BOOL literal.",
        "NULL" => "The empty reference, compatible with every REF mode.",
        "WRITETEXT" => "`WRITETEXT('format', args)` formatted output to stdout; `%C` prints the next argument, `%/` a newline.",
        "NUM" => "`NUM(v)` the ordinal number of a discrete value.",
        "SUCC" => "`SUCC(v)` the next value of a discrete mode.",
        "PRED" => "`PRED(v)` the previous value of a discrete mode.",
        "ABS" => "`ABS(i)` absolute value of an integer.",
        "SIZE" => "`SIZE(x)` storage size in bytes of a location or mode.",
        "LENGTH" => "`LENGTH(s)` current length of a character string.",
        "UPPER" => "`UPPER(m)` the greatest value of a discrete mode or array index.",
        "LOWER" => "`LOWER(m)` the smallest value of a discrete mode or array index.",
        "CARD" => "`CARD(p)` number of members of a powerset value.",
        "MAX" => "`MAX(a, b, ...)` greatest of the integer values.",
        "MIN" => "`MIN(a, b, ...)` smallest of the integer values.",
        "INCL" => "`INCL(p, e)` adds member `e` to the powerset location `p`.",
        "EXCL" => "`EXCL(p, e)` removes member `e` from the powerset location `p`.",
        "MILLISECS" | "SECS" | "SECONDS" | "MINUTES" | "HOURS" | "DAYS" => {
            "Duration unit: `n SECS` or `SECS(n)`."
        }
        _ => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chill_core::lexer::PREDEFINED_NAMES;

    #[test]
    fn core_keywords_are_documented() {
        for kw in [Keyword::Dcl, Keyword::Receive, Keyword::Region, Keyword::Newmode] {
            assert!(keyword(kw).is_some(), "{kw}");
        }
    }

    #[test]
    fn documented_names_are_predefined() {
        for name in ["INT", "WRITETEXT", "SECS", "NULL", "CARD"] {
            assert!(PREDEFINED_NAMES.contains(&name));
            assert!(predefined(name).is_some(), "{name}");
        }
        assert_eq!(predefined("int"), None);
    }
}
