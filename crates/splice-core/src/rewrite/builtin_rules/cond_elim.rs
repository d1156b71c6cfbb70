// Boolean short-circuit folding around literal `true` / `false` operands
use super::BuiltinRule;

pub const GROUP: &str = "cond_elim";

pub fn rules() -> Vec<BuiltinRule> {
    [
        ("true && $x", "$x"),
        ("$x && true", "$x"),
        ("true || $x", "true"),
        ("$x || true", "true"),
        ("false && $x", "false"),
        ("$x && false", "false"),
        ("false || $x", "$x"),
        ("$x || false", "$x"),
    ]
    .into_iter()
    .map(|(from, to)| BuiltinRule::new(GROUP, from, to))
    .collect()
}
