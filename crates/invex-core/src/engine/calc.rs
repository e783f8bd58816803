//! Derived-field calculations over extracted rows.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{trace, warn};

use crate::config::{CalcKind, FieldCalculation, ResultType};
use crate::models::{ExtractedRow, FieldValue};

/// Applies a block's configured calculations to a row after extraction.
#[derive(Debug, Default)]
pub struct CalculationEvaluator {
    calculations: Vec<FieldCalculation>,
}

impl CalculationEvaluator {
    /// Build the evaluator for one block; lower priority runs first.
    pub fn for_block(all: &[FieldCalculation], block_name: &str) -> Self {
        let mut calculations: Vec<FieldCalculation> = all
            .iter()
            .filter(|c| c.block_name == block_name)
            .cloned()
            .collect();
        calculations.sort_by_key(|c| c.priority);
        Self { calculations }
    }

    pub fn is_empty(&self) -> bool {
        self.calculations.is_empty()
    }

    /// Run every calculation against the row, in priority order.
    ///
    /// A calculation is skipped when its target already exists (if so
    /// configured), when any source field is absent, or when any source
    /// value is not numeric. The target is written only on success.
    pub fn apply(&self, row: &mut ExtractedRow) {
        for calc in &self.calculations {
            if calc.apply_only_if_missing && row.contains_field(&calc.target_field) {
                continue;
            }

            let Some(sources) = resolve_sources(row, &calc.source_fields) else {
                trace!(
                    "skipping calculation for '{}': missing or non-numeric source",
                    calc.target_field
                );
                continue;
            };

            let Some(computed) = compute(calc, &sources) else {
                continue;
            };

            let value = match calc.result_type {
                ResultType::Integer => match computed.trunc().to_i64() {
                    Some(v) => FieldValue::Integer(v),
                    None => continue,
                },
                ResultType::Real => FieldValue::Real(computed),
            };

            trace!("calculated {} = {}", calc.target_field, value);
            row.insert(calc.target_field.clone(), value);
        }
    }
}

/// All declared sources, present and numeric, or `None`.
fn resolve_sources<'a>(
    row: &ExtractedRow,
    names: &'a [String],
) -> Option<Vec<(&'a str, Decimal)>> {
    let mut sources = Vec::with_capacity(names.len());
    for name in names {
        let value = row.get(name)?.as_decimal()?;
        sources.push((name.as_str(), value));
    }
    Some(sources)
}

fn compute(calc: &FieldCalculation, sources: &[(&str, Decimal)]) -> Option<Decimal> {
    if sources.is_empty() {
        return None;
    }

    match calc.kind {
        CalcKind::Multiply => Some(
            sources
                .iter()
                .fold(Decimal::ONE, |acc, (_, v)| acc * *v),
        ),
        CalcKind::Add => Some(
            sources
                .iter()
                .fold(Decimal::ZERO, |acc, (_, v)| acc + *v),
        ),
        CalcKind::Subtract => {
            let rest = sources[1..]
                .iter()
                .fold(Decimal::ZERO, |acc, (_, v)| acc + *v);
            Some(sources[0].1 - rest)
        }
        CalcKind::Divide => {
            let mut acc = sources[0].1;
            for (_, divisor) in &sources[1..] {
                if divisor.is_zero() {
                    trace!("skipping '{}': division by zero", calc.target_field);
                    return None;
                }
                acc /= *divisor;
            }
            Some(acc)
        }
        CalcKind::Percentage => {
            // (first * second) / 100; any further sources are ignored.
            let (_, first) = sources.first()?;
            let (_, second) = sources.get(1)?;
            Some(*first * *second / Decimal::ONE_HUNDRED)
        }
        CalcKind::Custom => {
            let formula = calc.formula.as_deref()?;
            let mut substituted = formula.to_string();
            for (name, value) in sources {
                substituted = substituted.replace(&format!("{{{}}}", name), &value.to_string());
            }
            if substituted.contains('{') {
                warn!(
                    "formula for '{}' has unresolved placeholders: {}",
                    calc.target_field, formula
                );
                return None;
            }
            formula::evaluate(&substituted)
        }
    }
}

/// Minimal arithmetic expression evaluator for custom formulas.
///
/// Supports `+ - * /`, parentheses and unary minus with standard operator
/// precedence. Division by zero and malformed input evaluate to `None`.
mod formula {
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Token {
        Number(Decimal),
        Plus,
        Minus,
        Star,
        Slash,
        LParen,
        RParen,
    }

    pub fn evaluate(input: &str) -> Option<Decimal> {
        let tokens = tokenize(input)?;
        let mut parser = Parser { tokens: &tokens, pos: 0 };
        let value = parser.expression()?;
        // Trailing garbage means the formula was not fully understood.
        if parser.pos == tokens.len() {
            Some(value)
        } else {
            None
        }
    }

    fn tokenize(input: &str) -> Option<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut chars = input.chars().peekable();

        while let Some(&c) = chars.peek() {
            match c {
                ' ' | '\t' => {
                    chars.next();
                }
                '+' => {
                    chars.next();
                    tokens.push(Token::Plus);
                }
                '-' => {
                    chars.next();
                    tokens.push(Token::Minus);
                }
                '*' => {
                    chars.next();
                    tokens.push(Token::Star);
                }
                '/' => {
                    chars.next();
                    tokens.push(Token::Slash);
                }
                '(' => {
                    chars.next();
                    tokens.push(Token::LParen);
                }
                ')' => {
                    chars.next();
                    tokens.push(Token::RParen);
                }
                c if c.is_ascii_digit() || c == '.' => {
                    let mut number = String::new();
                    while let Some(&c) = chars.peek() {
                        if c.is_ascii_digit() || c == '.' {
                            number.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    tokens.push(Token::Number(Decimal::from_str(&number).ok()?));
                }
                _ => return None,
            }
        }

        Some(tokens)
    }

    struct Parser<'a> {
        tokens: &'a [Token],
        pos: usize,
    }

    impl Parser<'_> {
        fn peek(&self) -> Option<Token> {
            self.tokens.get(self.pos).copied()
        }

        fn advance(&mut self) -> Option<Token> {
            let token = self.peek()?;
            self.pos += 1;
            Some(token)
        }

        fn expression(&mut self) -> Option<Decimal> {
            let mut value = self.term()?;
            while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
                self.pos += 1;
                let rhs = self.term()?;
                value = match op {
                    Token::Plus => value + rhs,
                    _ => value - rhs,
                };
            }
            Some(value)
        }

        fn term(&mut self) -> Option<Decimal> {
            let mut value = self.factor()?;
            while let Some(op @ (Token::Star | Token::Slash)) = self.peek() {
                self.pos += 1;
                let rhs = self.factor()?;
                value = match op {
                    Token::Star => value * rhs,
                    _ => {
                        if rhs.is_zero() {
                            return None;
                        }
                        value / rhs
                    }
                };
            }
            Some(value)
        }

        fn factor(&mut self) -> Option<Decimal> {
            match self.advance()? {
                Token::Number(value) => Some(value),
                Token::Minus => Some(-self.factor()?),
                Token::LParen => {
                    let value = self.expression()?;
                    match self.advance()? {
                        Token::RParen => Some(value),
                        _ => None,
                    }
                }
                _ => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;

    use super::*;

    fn calc(kind: CalcKind, target: &str, sources: &[&str]) -> FieldCalculation {
        FieldCalculation {
            block_name: "invoice".to_string(),
            target_field: target.to_string(),
            kind,
            source_fields: sources.iter().map(|s| s.to_string()).collect(),
            formula: None,
            result_type: ResultType::Real,
            apply_only_if_missing: true,
            priority: 10,
        }
    }

    fn row(fields: &[(&str, FieldValue)]) -> ExtractedRow {
        let mut row = ExtractedRow::new();
        for (name, value) in fields {
            row.insert(*name, value.clone());
        }
        row
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_multiply() {
        let evaluator = CalculationEvaluator {
            calculations: vec![calc(CalcKind::Multiply, "fct", &["spots", "duration"])],
        };
        let mut r = row(&[
            ("spots", FieldValue::Integer(24)),
            ("duration", FieldValue::Integer(30)),
        ]);

        evaluator.apply(&mut r);
        assert_eq!(r.get("fct"), Some(&FieldValue::Real(dec("720"))));
    }

    #[test]
    fn test_subtract_is_first_minus_rest() {
        let evaluator = CalculationEvaluator {
            calculations: vec![calc(CalcKind::Subtract, "net", &["gross", "tax", "discount"])],
        };
        let mut r = row(&[
            ("gross", FieldValue::Integer(100)),
            ("tax", FieldValue::Integer(18)),
            ("discount", FieldValue::Integer(2)),
        ]);

        evaluator.apply(&mut r);
        assert_eq!(r.get("net"), Some(&FieldValue::Real(dec("80"))));
    }

    #[test]
    fn test_divide_by_zero_leaves_target_unset() {
        let evaluator = CalculationEvaluator {
            calculations: vec![calc(CalcKind::Divide, "rate", &["a", "b"])],
        };
        let mut r = row(&[
            ("a", FieldValue::Integer(10)),
            ("b", FieldValue::Integer(0)),
        ]);

        evaluator.apply(&mut r);
        assert!(!r.contains_field("rate"));
    }

    #[test]
    fn test_percentage_ignores_extra_sources() {
        let evaluator = CalculationEvaluator {
            calculations: vec![calc(CalcKind::Percentage, "tax", &["amount", "rate", "junk"])],
        };
        let mut r = row(&[
            ("amount", FieldValue::Integer(500)),
            ("rate", FieldValue::Integer(18)),
            ("junk", FieldValue::Integer(999)),
        ]);

        evaluator.apply(&mut r);
        assert_eq!(r.get("tax"), Some(&FieldValue::Real(dec("90"))));
    }

    #[test]
    fn test_missing_source_skips_silently() {
        let evaluator = CalculationEvaluator {
            calculations: vec![calc(CalcKind::Add, "total", &["a", "b"])],
        };
        let mut r = row(&[("a", FieldValue::Integer(10))]);

        evaluator.apply(&mut r);
        assert!(!r.contains_field("total"));
    }

    #[test]
    fn test_non_numeric_source_skips_silently() {
        let evaluator = CalculationEvaluator {
            calculations: vec![calc(CalcKind::Add, "total", &["a", "b"])],
        };
        let mut r = row(&[
            ("a", FieldValue::Integer(10)),
            ("b", FieldValue::Text("N/A".to_string())),
        ]);

        evaluator.apply(&mut r);
        assert!(!r.contains_field("total"));
    }

    #[test]
    fn test_apply_only_if_missing_is_idempotent() {
        let evaluator = CalculationEvaluator {
            calculations: vec![calc(CalcKind::Multiply, "fct", &["spots", "fct"])],
        };
        let mut r = row(&[
            ("spots", FieldValue::Integer(2)),
            ("fct", FieldValue::Integer(10)),
        ]);

        evaluator.apply(&mut r);
        let once = r.clone();
        evaluator.apply(&mut r);

        assert_eq!(r, once);
        assert_eq!(r.get("fct"), Some(&FieldValue::Integer(10)));
    }

    #[test]
    fn test_overwrite_when_not_only_if_missing() {
        let mut c = calc(CalcKind::Multiply, "fct", &["spots", "duration"]);
        c.apply_only_if_missing = false;
        let evaluator = CalculationEvaluator {
            calculations: vec![c],
        };
        let mut r = row(&[
            ("spots", FieldValue::Integer(2)),
            ("duration", FieldValue::Integer(3)),
            ("fct", FieldValue::Integer(999)),
        ]);

        evaluator.apply(&mut r);
        assert_eq!(r.get("fct"), Some(&FieldValue::Real(dec("6"))));
    }

    #[test]
    fn test_integer_result_truncates_toward_zero() {
        let mut c = calc(CalcKind::Divide, "ratio", &["a", "b"]);
        c.result_type = ResultType::Integer;
        let evaluator = CalculationEvaluator {
            calculations: vec![c],
        };
        let mut r = row(&[
            ("a", FieldValue::Integer(-7)),
            ("b", FieldValue::Integer(2)),
        ]);

        evaluator.apply(&mut r);
        assert_eq!(r.get("ratio"), Some(&FieldValue::Integer(-3)));
    }

    #[test]
    fn test_priority_orders_chained_calculations() {
        let mut first = calc(CalcKind::Multiply, "fct", &["spots", "duration"]);
        first.priority = 1;
        let mut second = calc(CalcKind::Multiply, "amount", &["fct", "rate"]);
        second.priority = 2;

        let evaluator = CalculationEvaluator::for_block(
            &[second, first],
            "invoice",
        );
        let mut r = row(&[
            ("spots", FieldValue::Integer(4)),
            ("duration", FieldValue::Integer(10)),
            ("rate", FieldValue::Integer(2)),
        ]);

        evaluator.apply(&mut r);
        assert_eq!(r.get("amount"), Some(&FieldValue::Real(dec("80"))));
    }

    #[test]
    fn test_for_block_filters_other_blocks() {
        let mut other = calc(CalcKind::Add, "x", &["a"]);
        other.block_name = "summary".to_string();

        let evaluator = CalculationEvaluator::for_block(&[other], "invoice");
        assert!(evaluator.is_empty());
    }

    #[test]
    fn test_custom_formula_with_parentheses() {
        let mut c = calc(CalcKind::Custom, "adjusted", &["rate", "spots"]);
        c.formula = Some("({rate} + 10) * {spots}".to_string());
        let evaluator = CalculationEvaluator {
            calculations: vec![c],
        };
        let mut r = row(&[
            ("rate", FieldValue::Real(dec("73.10"))),
            ("spots", FieldValue::Integer(2)),
        ]);

        evaluator.apply(&mut r);
        assert_eq!(r.get("adjusted"), Some(&FieldValue::Real(dec("166.20"))));
    }

    #[test]
    fn test_custom_formula_with_unresolved_placeholder() {
        let mut c = calc(CalcKind::Custom, "x", &["a"]);
        c.formula = Some("{a} + {missing}".to_string());
        let evaluator = CalculationEvaluator {
            calculations: vec![c],
        };
        let mut r = row(&[("a", FieldValue::Integer(1))]);

        evaluator.apply(&mut r);
        assert!(!r.contains_field("x"));
    }

    mod formula_tests {
        use super::super::formula::evaluate;
        use super::dec;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_operator_precedence() {
            assert_eq!(evaluate("2 + 3 * 4"), Some(dec("14")));
            assert_eq!(evaluate("10 - 4 / 2"), Some(dec("8")));
        }

        #[test]
        fn test_parentheses() {
            assert_eq!(evaluate("(2 + 3) * 4"), Some(dec("20")));
            assert_eq!(evaluate("((1))"), Some(dec("1")));
        }

        #[test]
        fn test_left_to_right_division() {
            assert_eq!(evaluate("100 / 5 / 2"), Some(dec("10")));
        }

        #[test]
        fn test_unary_minus() {
            assert_eq!(evaluate("-5 + 8"), Some(dec("3")));
            assert_eq!(evaluate("3 * -2"), Some(dec("-6")));
        }

        #[test]
        fn test_decimals() {
            assert_eq!(evaluate("73.10 * 2"), Some(dec("146.20")));
        }

        #[test]
        fn test_division_by_zero() {
            assert_eq!(evaluate("1 / 0"), None);
        }

        #[test]
        fn test_malformed_input() {
            assert_eq!(evaluate("2 +"), None);
            assert_eq!(evaluate("(2 + 3"), None);
            assert_eq!(evaluate("2 3"), None);
            assert_eq!(evaluate("abc"), None);
            assert_eq!(evaluate(""), None);
        }
    }
}
