use chill_core::lexer::{self, reconstruct, TokenKind};
use chill_core::span::FileId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// Fragments are concatenated without separators, so random inputs also
// exercise tokens that run into each other.
const FRAGMENTS: &[&str] = &[
    "DCL", "dcl", "x", "counter_1", "MODULE", "END", "PROC", "RECEIVE", "CASE", "ESAC",
    "42", "1_000", "B'1010'", "H'FF'", "O'17'", "D'99'", "H'FG'", "B'10",
    "'a'", "'it''s'", "'unterminated", "''",
    ":=", "/=", "//", "<=", ">=", "->", "+", "-", "*", "/", "=", "<", ">",
    "(", ")", "[", "]", ",", ";", ":", ".",
    " ", "  ", "\t", "\n", "\r\n",
    "-- line comment", "/* block */", "/* multi\nline */", "/* open",
    "@", "?", "é", "✓",
];

fn random_source(rng: &mut StdRng) -> String {
    let len = rng.gen_range(0..60);
    let mut src = String::new();
    for _ in 0..len {
        src.push_str(FRAGMENTS[rng.gen_range(0..FRAGMENTS.len())]);
    }
    src
}

fn assert_lossless(src: &str) {
    let lex = lexer::lex(FileId(0), src);
    assert!(matches!(lex.tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)));
    let rebuilt = reconstruct(&lex.tokens, &lex.trivia);
    assert_eq!(rebuilt, src, "lossless lexing failed for {src:?}");
}

#[test]
fn fixed_inputs_are_lossless() {
    for src in [
        "",
        "m: MODULE\n  DCL x INT := 5; -- five\nEND m;\n",
        "/* header */\nMODULE p;\nSYN s = 'text with ''quote''';\nEND p;",
        "DCL b BOOLS(8) := B'1010_1010';\r\n",
        "x := H'7FFFFFFF' + O'777' // 'tail",
        "@@ unknown ✓ characters",
        "/* never closed",
    ] {
        assert_lossless(src);
    }
}

#[test]
fn random_inputs_are_lossless() {
    let mut rng = StdRng::seed_from_u64(0x0c41_11);
    for _ in 0..500 {
        let src = random_source(&mut rng);
        assert_lossless(&src);
    }
}

#[test]
fn token_positions_match_line_index() {
    let src = "m: MODULE\n  DCL x INT;\n  x := 1;\nEND m;\n";
    let lex = lexer::lex(FileId(0), src);
    let index = chill_core::span::LineIndex::new(src);
    for token in &lex.tokens {
        assert_eq!(index.position(token.span.start), token.pos, "{token:?}");
    }
}
