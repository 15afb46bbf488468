//! 题库目录
//! 内置题目在启动时构建一次，之后只读；提供按 id 查找、排序列表和上一题/下一题导航

use crate::models::Difficulty;
use crate::services::problems;
use pulldown_cmark::{html, Options, Parser};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;

/// 题面中的示例，仅用于展示
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Example {
    pub id: u32,
    pub input_text: &'static str,
    pub output_text: &'static str,
    pub explanation: Option<&'static str>,
}

impl Example {
    pub fn new(
        id: u32,
        input_text: &'static str,
        output_text: &'static str,
        explanation: Option<&'static str>,
    ) -> Self {
        Self {
            id,
            input_text,
            output_text,
            explanation,
        }
    }
}

/// 一组固定的测试输入与期望输出
#[derive(Debug, Clone, PartialEq)]
pub struct TestVector {
    /// 按位置传给候选函数的参数
    pub args: Vec<Value>,
    pub expected: Value,
}

impl TestVector {
    pub fn new(args: Vec<Value>, expected: Value) -> Self {
        Self { args, expected }
    }
}

/// 判题处理器：持有某道题的全部测试向量
#[derive(Debug, Clone, PartialEq)]
pub struct Handler {
    vectors: Vec<TestVector>,
}

impl Handler {
    pub fn new(vectors: Vec<TestVector>) -> Self {
        Self { vectors }
    }

    pub fn vectors(&self) -> &[TestVector] {
        &self.vectors
    }
}

/// 内置题目定义
#[derive(Debug, Clone)]
pub struct Problem {
    pub id: &'static str,
    pub title: &'static str,
    pub difficulty: Difficulty,
    pub category: &'static str,
    /// Markdown
    pub problem_statement: &'static str,
    pub examples: Vec<Example>,
    /// Markdown
    pub constraints: &'static str,
    /// 导航顺序，应为 1..N 的排列
    pub order: u32,
    pub starter_code: &'static str,
    /// 提交代码必须原样包含的函数签名片段
    pub starter_function_name: &'static str,
    /// 为空表示 "general"
    pub companies: Vec<String>,
    pub handler: Handler,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("duplicate problem id '{0}'")]
    DuplicateId(String),
}

/// 题库
#[derive(Debug)]
pub struct Catalog {
    problems: Vec<Problem>,
    index: HashMap<&'static str, usize>,
}

static BUILTIN: OnceLock<Result<Catalog, CatalogError>> = OnceLock::new();

impl Catalog {
    /// 构建题库；id 必须唯一，order 不做检查
    pub fn new(problems: Vec<Problem>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(problems.len());
        for (pos, problem) in problems.iter().enumerate() {
            if index.insert(problem.id, pos).is_some() {
                return Err(CatalogError::DuplicateId(problem.id.to_string()));
            }
        }

        Ok(Self { problems, index })
    }

    /// 进程级内置题库
    pub fn builtin() -> Result<&'static Catalog, CatalogError> {
        BUILTIN
            .get_or_init(|| {
                let catalog = Catalog::new(problems::all());
                if let Ok(c) = &catalog {
                    log::info!("problem catalog loaded with {} problems", c.len());
                }
                catalog
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn lookup(&self, id: &str) -> Option<&Problem> {
        self.index.get(id).map(|&pos| &self.problems[pos])
    }

    /// 按 order 排序的全部题目，order 相同时保持定义顺序
    pub fn all(&self) -> Vec<&Problem> {
        let mut sorted: Vec<&Problem> = self.problems.iter().collect();
        sorted.sort_by_key(|p| p.order);
        sorted
    }

    /// 下一题；越过末尾时回到 order == 1 的题目
    pub fn next(&self, id: &str) -> Option<&Problem> {
        self.step(id, true)
    }

    /// 上一题；越过开头时回到 order == N 的题目
    pub fn previous(&self, id: &str) -> Option<&Problem> {
        self.step(id, false)
    }

    // 只按 order 值相等查找，不取最小/最大值。
    // order 稀疏或重复时找不到回绕目标，停留在当前题目。
    fn step(&self, id: &str, forward: bool) -> Option<&Problem> {
        let current = self.lookup(id)?;
        let target = if forward {
            current.order.checked_add(1)
        } else {
            current.order.checked_sub(1)
        };

        let found = target.and_then(|order| self.find_by_order(order));
        if found.is_some() {
            return found;
        }

        let wrap_order = if forward { 1 } else { self.problems.len() as u32 };
        Some(self.find_by_order(wrap_order).unwrap_or(current))
    }

    fn find_by_order(&self, order: u32) -> Option<&Problem> {
        self.problems.iter().find(|p| p.order == order)
    }
}

/// 把 Markdown 渲染为 HTML
pub fn render_markdown(content: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let parser = Parser::new_ext(content, options);
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);

    html_output
}

/// 题面与约束渲染结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedStatement {
    pub statement_html: String,
    pub constraints_html: String,
}

pub fn render_statement(problem: &Problem) -> RenderedStatement {
    RenderedStatement {
        statement_html: render_markdown(problem.problem_statement),
        constraints_html: render_markdown(problem.constraints),
    }
}

fn signature_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"function\s+([A-Za-z_$][A-Za-z0-9_$]*)\s*\(").expect("signature pattern is valid")
    })
}

/// 从签名片段中取出函数名，例如 `"function factorial("` 得到 `factorial`
pub fn entry_point(problem: &Problem) -> Option<&'static str> {
    signature_pattern()
        .captures(problem.starter_function_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
