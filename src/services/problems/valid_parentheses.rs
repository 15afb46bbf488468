use crate::models::Difficulty;
use crate::services::catalog::{Example, Handler, Problem, TestVector};
use serde_json::json;

const STARTER_CODE: &str = r#"function validParentheses(s) {
  // Write your code here
};"#;

const STATEMENT: &str = r#"Given a string `s` containing just the characters `'('`, `')'`, `'{'`, `'}'`,
`'['` and `']'`, determine if the input string is valid.

An input string is valid if:

1. Open brackets must be closed by the same type of brackets.
2. Open brackets must be closed in the correct order.
3. Every close bracket has a corresponding open bracket of the same type."#;

const CONSTRAINTS: &str = r#"- `1 ≤ s.length ≤ 10^4`
- `s` consists of parentheses only `'()[]{}'`."#;

pub fn problem() -> Problem {
    let cases = [
        ("()", true),
        ("()[]{}", true),
        ("(]", false),
        ("([)]", false),
        ("{[]}", true),
    ];

    Problem {
        id: "valid-parentheses",
        title: "20. Valid Parentheses",
        difficulty: Difficulty::Easy,
        category: "Stack",
        problem_statement: STATEMENT,
        examples: vec![
            Example::new(1, r#"s = "()""#, "true", None),
            Example::new(2, r#"s = "()[]{}""#, "true", None),
            Example::new(3, r#"s = "(]""#, "false", None),
            Example::new(4, r#"s = "([)]""#, "false", None),
        ],
        constraints: CONSTRAINTS,
        order: 4,
        starter_code: STARTER_CODE,
        starter_function_name: "function validParentheses(",
        companies: vec!["AMAZON".to_string()],
        handler: Handler::new(
            cases
                .iter()
                .map(|(s, valid)| TestVector::new(vec![json!(s)], json!(valid)))
                .collect(),
        ),
    }
}
