/// An evaluated builtin argument.
///
/// String literals passed directly at a call site stay textual; every other
/// argument expression is evaluated to a number. This is how `puts_oled` and
/// `text_oled` tell a literal string from a length or color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Number(i32),
    Text(String),
}

impl Arg {
    /// Numeric view of the argument; text counts as 0.
    pub fn as_number(&self) -> i32 {
        match self {
            Arg::Number(n) => *n,
            Arg::Text(_) => 0,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Arg::Number(_) => None,
            Arg::Text(s) => Some(s),
        }
    }

    pub fn is_truthy(&self) -> bool {
        self.as_number() != 0
    }
}
