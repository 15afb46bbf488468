use crate::models::Difficulty;
use crate::services::catalog::{Example, Handler, Problem, TestVector};
use serde_json::json;

const STARTER_CODE: &str = r#"function factorial(n){
  // Write your code here
};"#;

const STATEMENT: &str = r#"Given a non-negative integer `n`, return the factorial of `n`.

The factorial of `n` is the product of all positive integers less than or equal to `n`.
The factorial of 0 is defined as 1."#;

const CONSTRAINTS: &str = "- `0 ≤ n ≤ 10`";

pub fn problem() -> Problem {
    let inputs = [0, 1, 3, 5, 7];
    let outputs = [1, 1, 6, 120, 5040];

    Problem {
        id: "factorial",
        title: "Factorial",
        difficulty: Difficulty::Easy,
        category: "Math",
        problem_statement: STATEMENT,
        examples: vec![
            Example::new(1, "n = 0", "1", Some("The factorial of 0 is 1 by definition.")),
            Example::new(2, "n = 3", "6", Some("3! = 3 × 2 × 1 = 6")),
            Example::new(3, "n = 5", "120", Some("5! = 5 × 4 × 3 × 2 × 1 = 120")),
        ],
        constraints: CONSTRAINTS,
        order: 2,
        starter_code: STARTER_CODE,
        starter_function_name: "function factorial(",
        companies: Vec::new(),
        handler: Handler::new(
            inputs
                .iter()
                .zip(outputs.iter())
                .map(|(n, out)| TestVector::new(vec![json!(n)], json!(out)))
                .collect(),
        ),
    }
}
