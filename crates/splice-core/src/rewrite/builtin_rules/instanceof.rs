// `is_a` calls as `instanceof` expressions
use super::BuiltinRule;

pub const GROUP: &str = "instanceof";

pub fn rules() -> Vec<BuiltinRule> {
    vec![BuiltinRule::new(GROUP, "is_a($x, $y)", "$x instanceof $y")]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::builtin_rules::rewrite_with;

    #[test]
    fn test_is_a_becomes_instanceof() {
        assert_eq!(
            rewrite_with(rules(), "if (is_a(obj, Widget)) draw(obj);"),
            "if (obj instanceof Widget) draw(obj);"
        );
    }

    #[test]
    fn test_other_arities_untouched() {
        let source = "ok = is_a(obj, Widget, true);";
        assert_eq!(rewrite_with(rules(), source), source);
    }
}
