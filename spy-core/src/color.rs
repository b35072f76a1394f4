//! Blue/red color lattice (`spec.md` §3.4).
//!
//! Every AST expression and every variable slot carries a color. Blue means
//! known at compile time (the interpreter can fully evaluate it during
//! redshift and fold it into the residual program); red means run-time
//! only (it survives into the residual AST). The lattice has exactly two
//! elements and one non-trivial rule: anything touching red becomes red.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Color {
    Blue,
    Red,
}

impl Color {
    /// Combines the colors of two sub-expressions into the color of their
    /// parent. Implements the color-monotonicity invariant of `spec.md`
    /// §8: "if any sub-expression is red, the expression is red."
    #[must_use]
    pub fn join(self, other: Color) -> Color {
        if self == Color::Red || other == Color::Red { Color::Red } else { Color::Blue }
    }

    /// Folds the colors of an arbitrary number of sub-expressions, e.g. a
    /// call's argument list or a struct literal's fields.
    #[must_use]
    pub fn join_all(colors: impl IntoIterator<Item = Color>) -> Color {
        colors.into_iter().fold(Color::Blue, Color::join)
    }

    #[must_use]
    pub fn is_blue(self) -> bool {
        matches!(self, Color::Blue)
    }

    #[must_use]
    pub fn is_red(self) -> bool {
        matches!(self, Color::Red)
    }

    /// A blue-to-red conversion is implicit (`spec.md` §3.4): a blue value
    /// is simply usable wherever a red one is expected. The reverse
    /// (`to_blue`) is deliberately not provided — it is a compile error,
    /// modeled by callers checking `is_blue()` themselves and raising a
    /// `StaticError` rather than silently downgrading.
    #[must_use]
    pub fn to_red(self) -> Color {
        Color::Red
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Color::Blue => "blue",
            Color::Red => "red",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_is_red_if_either_operand_is_red() {
        assert_eq!(Color::Blue.join(Color::Blue), Color::Blue);
        assert_eq!(Color::Blue.join(Color::Red), Color::Red);
        assert_eq!(Color::Red.join(Color::Blue), Color::Red);
        assert_eq!(Color::Red.join(Color::Red), Color::Red);
    }

    #[test]
    fn join_all_of_only_blue_colors_is_blue() {
        let colors = vec![Color::Blue, Color::Blue, Color::Blue];
        assert_eq!(Color::join_all(colors), Color::Blue);
    }

    #[test]
    fn join_all_with_one_red_is_red() {
        let colors = vec![Color::Blue, Color::Red, Color::Blue];
        assert_eq!(Color::join_all(colors), Color::Red);
    }

    #[test]
    fn empty_join_all_defaults_to_blue() {
        assert_eq!(Color::join_all(std::iter::empty()), Color::Blue);
    }
}
