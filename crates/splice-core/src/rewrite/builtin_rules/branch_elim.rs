// Constant branch elimination for `if` without `else`
use super::BuiltinRule;

pub const GROUP: &str = "branch_elim";

pub fn rules() -> Vec<BuiltinRule> {
    vec![
        BuiltinRule::new(GROUP, "if (true) { $body; }", "$body;"),
        BuiltinRule::new(GROUP, "if (false) { $body; }", "{}"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::builtin_rules::rewrite_with;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_true_branch_is_inlined() {
        assert_eq!(rewrite_with(rules(), "if (true) { go(); }"), "go();");
        assert_eq!(rewrite_with(rules(), "if (true) go();"), "go();");
        assert_eq!(
            rewrite_with(rules(), "if (true) { a(); b(); }"),
            "{\n    a();\n    b();\n}"
        );
    }

    #[test]
    fn test_false_branch_is_dropped() {
        assert_eq!(rewrite_with(rules(), "if (false) { a(); b(); }\nc();"), "{}\nc();");
    }

    #[test]
    fn test_branches_with_else_are_kept() {
        let source = "if (true) a(); else b();";
        assert_eq!(rewrite_with(rules(), source), source);
    }

    #[test]
    fn test_nested_branches() {
        let source = "while (x) { if (true) { if (true) step(); } }";
        assert_eq!(rewrite_with(rules(), source), "while (x) {\n    step();\n}");
    }
}
