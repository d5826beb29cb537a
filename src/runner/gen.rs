//! Per-file runner generation.
//!
//! Scans one test source for `TEST_GROUP`, `TEST`, and `IGNORE_TEST`
//! macros and produces the companion runner source: every preprocessor
//! directive mirrored in textual order, one `TEST_GROUP_RUNNER` body per
//! group, one `RUN_TEST_CASE` line per case.
//!
//! Recognition is a strict token-level state machine. Any unexpected token
//! resets it, so malformed or half-edited declarations are simply skipped
//! rather than rejected. Comment tokens are dropped before they reach the
//! machine, which is what keeps commented-out tests out of the output.

use crate::lexer::{Token, Tokenizer};
use crate::runner::{TestGroupSet, GENERATED_BANNER};

/// Directives mirrored into the generated file. Conditional-compilation
/// lines pass through so conditionally compiled tests stay conditionally
/// invoked.
const MIRRORED_DIRECTIVES: &[&[u8]] = &[
    b"include", b"define", b"undef", b"if", b"elif", b"ifdef", b"ifndef", b"else", b"endif",
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Idle,
    /// After `TEST_GROUP`, awaiting `(`.
    GroupLparen,
    /// Awaiting the group name.
    GroupName,
    /// Awaiting the closing `)` of a group declaration.
    GroupRparen { group: String },
    /// After `TEST` / `IGNORE_TEST`, awaiting `(`.
    CaseLparen,
    /// Awaiting the group argument of a case.
    CaseGroup,
    /// Awaiting the `,` between group and case name.
    CaseComma { group: String },
    /// Awaiting the case name.
    CaseName { group: String },
    /// Awaiting the closing `)` of a case declaration.
    CaseRparen { group: String, case: String },
}

/// Generate the runner source for one test file, accumulating every group
/// it declares into `groups`.
pub fn runner_source(input: &[u8], groups: &mut TestGroupSet) -> String {
    let mut out = String::from(GENERATED_BANNER);
    let mut tokenizer = Tokenizer::new(input);
    let mut state = State::Idle;
    let mut body_open = false;

    while let Some(token) = tokenizer.next() {
        if token.is_comment() {
            continue;
        }

        if let Some(word) = token.directive_word() {
            if MIRRORED_DIRECTIVES.contains(&word) {
                let rest = tokenizer.rest_of_directive();
                out.push_str(&String::from_utf8_lossy(token.text()));
                out.push_str(&String::from_utf8_lossy(rest));
                out.push('\n');
            }
            state = State::Idle;
            continue;
        }

        state = match state {
            State::Idle => dispatch(&token),
            State::GroupLparen => {
                if token.is_punct(b'(') {
                    State::GroupName
                } else {
                    dispatch(&token)
                }
            }
            State::GroupName => {
                if token.is_word() {
                    State::GroupRparen {
                        group: String::from_utf8_lossy(token.text()).into_owned(),
                    }
                } else {
                    dispatch(&token)
                }
            }
            State::GroupRparen { group } => {
                if token.is_punct(b')') {
                    open_group_body(&mut out, &mut body_open, &group);
                    groups.insert(&group);
                    State::Idle
                } else {
                    dispatch(&token)
                }
            }
            State::CaseLparen => {
                if token.is_punct(b'(') {
                    State::CaseGroup
                } else {
                    dispatch(&token)
                }
            }
            State::CaseGroup => {
                if token.is_word() {
                    State::CaseComma {
                        group: String::from_utf8_lossy(token.text()).into_owned(),
                    }
                } else {
                    dispatch(&token)
                }
            }
            State::CaseComma { group } => {
                if token.is_punct(b',') {
                    State::CaseName { group }
                } else {
                    dispatch(&token)
                }
            }
            State::CaseName { group } => {
                if token.is_word() {
                    State::CaseRparen {
                        group,
                        case: String::from_utf8_lossy(token.text()).into_owned(),
                    }
                } else {
                    dispatch(&token)
                }
            }
            State::CaseRparen { group, case } => {
                if token.is_punct(b')') {
                    out.push_str(&format!(
                        "    RUN_TEST_CASE({group}, {case}); /* TEST_{group}_{case}_ */\n"
                    ));
                    State::Idle
                } else {
                    dispatch(&token)
                }
            }
        };
    }

    if body_open {
        out.push_str("}\n");
    }
    out
}

/// Start of a recognizable declaration, from any position.
fn dispatch(token: &Token<'_>) -> State {
    match token.text() {
        b"TEST_GROUP" => State::GroupLparen,
        b"TEST" | b"IGNORE_TEST" => State::CaseLparen,
        _ => State::Idle,
    }
}

/// Close any open body, then open a new `TEST_GROUP_RUNNER` body separated
/// by a single blank line.
fn open_group_body(out: &mut String, body_open: &mut bool, group: &str) {
    if *body_open {
        out.push_str("}\n");
    }
    out.push('\n');
    out.push_str(&format!("TEST_GROUP_RUNNER({group}) {{\n"));
    *body_open = true;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(input: &str) -> (String, TestGroupSet) {
        let mut groups = TestGroupSet::new();
        let source = runner_source(input.as_bytes(), &mut groups);
        (source, groups)
    }

    #[test]
    fn test_basic_group_and_case() {
        let (source, groups) = generate(
            "#include \"unity_fixture.h\"\n\
             TEST_GROUP(g);\n\
             TEST_SETUP(g) {}\n\
             TEST_TEAR_DOWN(g) {}\n\
             TEST(g, t) {}\n",
        );

        assert_eq!(
            source,
            "/* AUTOGENERATED FILE. DO NOT EDIT. */\n\
             #include \"unity_fixture.h\"\n\
             \n\
             TEST_GROUP_RUNNER(g) {\n\
             \x20   RUN_TEST_CASE(g, t); /* TEST_g_t_ */\n\
             }\n"
        );
        assert_eq!(groups.iter().collect::<Vec<_>>(), ["g"]);
    }

    #[test]
    fn test_ignored_cases_still_registered() {
        let (source, _) = generate("TEST_GROUP(g);\nIGNORE_TEST(g, skipped) {}\n");
        assert!(source.contains("RUN_TEST_CASE(g, skipped); /* TEST_g_skipped_ */"));
    }

    #[test]
    fn test_commented_out_cases_are_dropped() {
        let (source, _) = generate(
            "TEST_GROUP(g);\n\
             // TEST(g, line_commented) {}\n\
             /* TEST(g, block_commented) {} */\n",
        );

        assert!(!source.contains("RUN_TEST_CASE"));
        assert!(source.contains("TEST_GROUP_RUNNER(g) {\n}\n"));
    }

    #[test]
    fn test_conditional_directives_surround_cases() {
        let (source, _) = generate(
            "#include \"unity_fixture.h\"\n\
             TEST_GROUP(g);\n\
             #ifdef HAS_FPU\n\
             TEST(g, floats) {}\n\
             #endif\n\
             TEST(g, ints) {}\n",
        );

        let expected = "/* AUTOGENERATED FILE. DO NOT EDIT. */\n\
             #include \"unity_fixture.h\"\n\
             \n\
             TEST_GROUP_RUNNER(g) {\n\
             #ifdef HAS_FPU\n\
             \x20   RUN_TEST_CASE(g, floats); /* TEST_g_floats_ */\n\
             #endif\n\
             \x20   RUN_TEST_CASE(g, ints); /* TEST_g_ints_ */\n\
             }\n";
        assert_eq!(source, expected);
    }

    #[test]
    fn test_two_groups_in_one_file() {
        let (source, groups) = generate(
            "TEST_GROUP(first);\n\
             TEST(first, a) {}\n\
             TEST_GROUP(second);\n\
             TEST(second, b) {}\n",
        );

        assert_eq!(
            source,
            "/* AUTOGENERATED FILE. DO NOT EDIT. */\n\
             \n\
             TEST_GROUP_RUNNER(first) {\n\
             \x20   RUN_TEST_CASE(first, a); /* TEST_first_a_ */\n\
             }\n\
             \n\
             TEST_GROUP_RUNNER(second) {\n\
             \x20   RUN_TEST_CASE(second, b); /* TEST_second_b_ */\n\
             }\n"
        );
        assert_eq!(groups.iter().collect::<Vec<_>>(), ["first", "second"]);
    }

    #[test]
    fn test_back_to_back_groups_keep_empty_body() {
        let (source, groups) = generate("TEST_GROUP(a);\nTEST_GROUP(b);\nTEST(b, t) {}\n");

        assert!(source.contains("TEST_GROUP_RUNNER(a) {\n}\n"));
        assert!(source.contains("RUN_TEST_CASE(b, t);"));
        assert_eq!(groups.iter().collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn test_malformed_declarations_reset_quietly() {
        let (source, groups) = generate(
            "TEST_GROUP(;\n\
             TEST(g t) {}\n\
             TEST(g, ) {}\n\
             TEST_GROUP(ok);\n\
             TEST(ok, fine) {}\n",
        );

        assert_eq!(groups.iter().collect::<Vec<_>>(), ["ok"]);
        assert!(source.contains("RUN_TEST_CASE(ok, fine);"));
        assert!(!source.contains("RUN_TEST_CASE(g"));
    }

    #[test]
    fn test_string_literals_cannot_fake_macros() {
        let (source, groups) = generate("const char *s = \"TEST_GROUP(fake)\";\n");
        assert!(groups.is_empty());
        assert!(!source.contains("TEST_GROUP_RUNNER"));
    }

    #[test]
    fn test_no_groups_yields_banner_only() {
        let (source, groups) = generate("int add(int a, int b) { return a + b; }\n");
        assert_eq!(source, GENERATED_BANNER);
        assert!(groups.is_empty());
    }
}
