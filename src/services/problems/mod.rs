// 内置题目
// 每道题一个文件，`all()` 的顺序即定义顺序

pub mod factorial;
pub mod jump_game;
pub mod palindrome_number;
pub mod two_sum;
pub mod valid_parentheses;

use crate::services::catalog::Problem;

pub fn all() -> Vec<Problem> {
    vec![
        two_sum::problem(),
        palindrome_number::problem(),
        factorial::problem(),
        valid_parentheses::problem(),
        jump_game::problem(),
    ]
}
