use crate::models::Difficulty;
use crate::services::catalog::{Example, Handler, Problem, TestVector};
use serde_json::json;

const STARTER_CODE: &str = r#"function isPalindrome(x) {
  // Write your code here
};"#;

const STATEMENT: &str = r#"Given an integer `x`, return `true` if `x` is a *palindrome*, and `false` otherwise."#;

const CONSTRAINTS: &str = "- `-2^31 ≤ x ≤ 2^31 - 1`";

pub fn problem() -> Problem {
    let inputs = [121, -121, 10, 0, 1221];
    let answers = [true, false, false, true, true];

    Problem {
        id: "palindrome-number",
        title: "9. Palindrome Number",
        difficulty: Difficulty::Easy,
        category: "Math",
        problem_statement: STATEMENT,
        examples: vec![
            Example::new(
                1,
                "x = 121",
                "true",
                Some("121 reads the same forward and backward, so it is a palindrome."),
            ),
            Example::new(
                2,
                "x = -121",
                "false",
                Some("-121 reads as 121- backward, so it is not a palindrome."),
            ),
            Example::new(
                3,
                "x = 10",
                "false",
                Some("10 reads as 01 backward, so it is not a palindrome."),
            ),
        ],
        constraints: CONSTRAINTS,
        order: 1,
        starter_code: STARTER_CODE,
        starter_function_name: "function isPalindrome(",
        companies: Vec::new(),
        handler: Handler::new(
            inputs
                .iter()
                .zip(answers.iter())
                .map(|(x, answer)| TestVector::new(vec![json!(x)], json!(answer)))
                .collect(),
        ),
    }
}
