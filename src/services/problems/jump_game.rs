use crate::models::Difficulty;
use crate::services::catalog::{Example, Handler, Problem, TestVector};
use serde_json::json;

const STARTER_CODE: &str = r#"function canJump(nums) {
  // Write your code here
};"#;

const STATEMENT: &str = r#"You are given an integer array `nums`. You are initially positioned at the
**first index** and each element in the array represents your maximum jump length at
that position.

Return `true` *if you can reach the last index, or* `false` *otherwise*."#;

const CONSTRAINTS: &str = r#"- `1 ≤ nums.length ≤ 10^4`
- `0 ≤ nums[i] ≤ 10^5`"#;

pub fn problem() -> Problem {
    Problem {
        id: "jump-game",
        title: "55. Jump Game",
        difficulty: Difficulty::Medium,
        category: "Dynamic Programming",
        problem_statement: STATEMENT,
        examples: vec![
            Example::new(
                1,
                "nums = [2,3,1,1,4]",
                "true",
                Some("Jump 1 step from index 0 to 1, then 3 steps to the last index."),
            ),
            Example::new(
                2,
                "nums = [3,2,1,0,4]",
                "false",
                Some(
                    "You will always arrive at index 3 no matter what. Its maximum jump \
                     length is 0, which makes it impossible to reach the last index.",
                ),
            ),
        ],
        constraints: CONSTRAINTS,
        order: 5,
        starter_code: STARTER_CODE,
        starter_function_name: "function canJump(",
        companies: vec!["GOOGLE".to_string()],
        handler: Handler::new(vec![
            TestVector::new(vec![json!([2, 3, 1, 1, 4])], json!(true)),
            TestVector::new(vec![json!([3, 2, 1, 0, 4])], json!(false)),
            TestVector::new(vec![json!([2, 0, 0])], json!(true)),
            TestVector::new(vec![json!([2, 5, 0, 0])], json!(true)),
            TestVector::new(vec![json!([1, 0, 1, 0])], json!(false)),
        ]),
    }
}
