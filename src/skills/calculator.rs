//! 计算器技能：从自然语言中提取算式并求值
//!
//! 例如「帮我算一下1+1等于多少」提取出 `1+1`。支持 + - * / 与括号，
//! `×`/`÷` 归一化为 `*`/`/`。解析失败或除零时返回带 error 的结果。

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::memory::ConversationContext;
use crate::skills::{Skill, SkillResult};

/// 计算器技能
#[derive(Debug, Default)]
pub struct CalculatorSkill;

/// 从混合文本中提取最长的连续算式片段（数字、运算符、小数点、括号）
fn extract_expression(input: &str) -> Option<String> {
    let normalized: String = input
        .chars()
        .map(|c| match c {
            '×' => '*',
            '÷' => '/',
            '（' => '(',
            '）' => ')',
            _ => c,
        })
        .collect();

    let mut best = String::new();
    let mut current = String::new();
    for c in normalized.chars() {
        if c.is_ascii_digit() || "+-*/().".contains(c) {
            current.push(c);
        } else {
            if current.len() > best.len() {
                best = current.clone();
            }
            current.clear();
        }
    }
    if current.len() > best.len() {
        best = current;
    }

    // 纯数字或纯符号不算算式
    let has_digit = best.chars().any(|c| c.is_ascii_digit());
    let has_op = best.chars().any(|c| "+-*/".contains(c));
    if has_digit && has_op {
        Some(best)
    } else {
        None
    }
}

/// 递归下降求值：expr := term (('+'|'-') term)*，term := factor (('*'|'/') factor)*
struct Parser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Parser<'a> {
    fn new(expr: &'a str) -> Self {
        Self {
            chars: expr.chars().peekable(),
        }
    }

    fn parse(mut self) -> Result<f64, String> {
        let value = self.expr()?;
        if self.chars.peek().is_some() {
            return Err(format!("算式中存在无法解析的部分: {}", self.rest()));
        }
        Ok(value)
    }

    fn rest(&mut self) -> String {
        self.chars.by_ref().collect()
    }

    fn expr(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        while let Some(&op) = self.chars.peek() {
            match op {
                '+' => {
                    self.chars.next();
                    value += self.term()?;
                }
                '-' => {
                    self.chars.next();
                    value -= self.term()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.factor()?;
        while let Some(&op) = self.chars.peek() {
            match op {
                '*' => {
                    self.chars.next();
                    value *= self.factor()?;
                }
                '/' => {
                    self.chars.next();
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err("除数不能为零".to_string());
                    }
                    value /= divisor;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, String> {
        match self.chars.peek() {
            Some('(') => {
                self.chars.next();
                let value = self.expr()?;
                match self.chars.next() {
                    Some(')') => Ok(value),
                    _ => Err("括号不匹配".to_string()),
                }
            }
            Some('-') => {
                self.chars.next();
                Ok(-self.factor()?)
            }
            Some(c) if c.is_ascii_digit() || *c == '.' => {
                let mut number = String::new();
                while let Some(&c) = self.chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        number.push(c);
                        self.chars.next();
                    } else {
                        break;
                    }
                }
                number
                    .parse::<f64>()
                    .map_err(|_| format!("无法解析数字: {}", number))
            }
            other => Err(format!("算式格式错误: {:?}", other)),
        }
    }
}

/// 整数结果去掉小数部分，其余保留
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[async_trait]
impl Skill for CalculatorSkill {
    fn name(&self) -> &str {
        "calculator_skill"
    }

    async fn execute(&self, user_input: &str, _context: &ConversationContext) -> SkillResult {
        let Some(expression) = extract_expression(user_input) else {
            return SkillResult::failed(
                "抱歉，我没有在你的话里找到可以计算的算式。",
                "no arithmetic expression found",
            );
        };

        match Parser::new(&expression).parse() {
            Ok(value) => {
                let answer = format_number(value);
                SkillResult::ok(format!("{} = {}", expression, answer))
                    .with_meta("expression", Value::String(expression))
                    .with_meta("result", json!(value))
            }
            Err(e) => SkillResult::failed(format!("抱歉，这个算式我算不了：{}", e), e.clone())
                .with_meta("expression", Value::String(expression)),
        }
    }
}
