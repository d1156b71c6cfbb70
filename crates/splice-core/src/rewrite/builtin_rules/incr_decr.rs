// Increment/decrement and compound assignment forms
use super::BuiltinRule;
use crate::ast::BinaryOp;

pub const GROUP: &str = "incr_decr";

/// Operators rewritten from `$x = $x OP $y` to `$x OP= $y`
pub const COMPOUND_OPERATORS: [BinaryOp; 12] = [
    BinaryOp::Mul,
    BinaryOp::Div,
    BinaryOp::Add,
    BinaryOp::Sub,
    BinaryOp::Pow,
    BinaryOp::Mod,
    BinaryOp::ShiftLeft,
    BinaryOp::ShiftRight,
    BinaryOp::Concat,
    BinaryOp::BitOr,
    BinaryOp::BitAnd,
    BinaryOp::BitXor,
];

pub fn rules() -> Vec<BuiltinRule> {
    let mut rules = vec![
        // prefix steps in loop headers
        BuiltinRule::new(GROUP, "for ($init; $cond; $v++) $body;", "for ($init; $cond; ++$v) $body;"),
        BuiltinRule::new(GROUP, "for ($init; $cond; $v--) $body;", "for ($init; $cond; --$v) $body;"),
        BuiltinRule::new(GROUP, "$x += 1", "++$x"),
        BuiltinRule::new(GROUP, "$x -= 1", "--$x"),
    ];
    rules.extend(COMPOUND_OPERATORS.iter().map(|op| {
        let symbol = op.symbol();
        BuiltinRule::new(
            GROUP,
            format!("$x = $x {symbol} $y"),
            format!("$x {symbol}= $y"),
        )
    }));
    rules
}
