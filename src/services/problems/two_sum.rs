use crate::models::Difficulty;
use crate::services::catalog::{Example, Handler, Problem, TestVector};
use serde_json::json;

const STARTER_CODE: &str = r#"function twoSum(nums, target) {
  // Write your code here
};"#;

const STATEMENT: &str = r#"Given an array of integers `nums` and an integer `target`, return *indices of the
two numbers such that they add up to* `target`.

You may assume that each input would have **exactly one solution**, and you may not use
the same element twice.

You can return the answer in any order."#;

const CONSTRAINTS: &str = r#"- `2 ≤ nums.length ≤ 10`
- `-10^9 ≤ nums[i] ≤ 10^9`
- `-10^9 ≤ target ≤ 10^9`
- **Only one valid answer exists.**"#;

pub fn problem() -> Problem {
    Problem {
        id: "two-sum",
        title: "1. Two Sum",
        difficulty: Difficulty::Easy,
        category: "Array",
        problem_statement: STATEMENT,
        examples: vec![
            Example::new(
                1,
                "nums = [2,7,11,15], target = 9",
                "[0,1]",
                Some("Because nums[0] + nums[1] == 9, we return [0, 1]."),
            ),
            Example::new(2, "nums = [3,2,4], target = 6", "[1,2]", None),
            Example::new(3, "nums = [3,3], target = 6", "[0,1]", None),
        ],
        constraints: CONSTRAINTS,
        order: 3,
        starter_code: STARTER_CODE,
        starter_function_name: "function twoSum(",
        companies: vec!["AMAZON".to_string(), "GOOGLE".to_string()],
        // 期望输出按下标升序
        handler: Handler::new(vec![
            TestVector::new(vec![json!([2, 7, 11, 15]), json!(9)], json!([0, 1])),
            TestVector::new(vec![json!([3, 2, 4]), json!(6)], json!([1, 2])),
            TestVector::new(vec![json!([3, 3]), json!(6)], json!([0, 1])),
        ]),
    }
}
